//! Reader for the line oriented `key = value` files used for camera models and
//! run settings.
//!
//! ```text
//! # comments start with `#`, `//` or `%`
//! _W = 1280
//! _DISORT =
//! 0.0 0.000
//! 0.1 0.002   // rows without `=` continue the previous term
//! ```
//!
//! Every term holds a table of string values: the words after the `=` form
//! the first row and each following line without an `=` adds a row. The value
//! `NULL` marks a term as unset.
//!
//! Single values are read with [`ConfigFile::get`], which rejects terms holding
//! more than one word. Values can therefore not contain whitespace, a path such
//! as `/my dir/cam.txt` is an error rather than being cut at the space.

use crate::ConfigError;
use log::*;
use std::path::Path;
use std::str::FromStr;

/// Words that start a comment.
const COMMENT_MARKERS: [&str; 3] = ["#", "//", "%"];

/// Placeholder value for an unset term.
pub const NULL_VALUE: &str = "NULL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTerm {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl ConfigTerm {
    /// The first value of the first row.
    pub fn first(&self) -> Option<&str> {
        self.rows.first().and_then(|row| row.first()).map(String::as_str)
    }

    /// Terms without a value or with the value `NULL` are unset.
    pub fn is_set(&self) -> bool {
        !matches!(self.first(), None | Some(NULL_VALUE))
    }
}

/// A parsed config file. Lookups return the first term with a given name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    terms: Vec<ConfigTerm>,
}

impl FromStr for ConfigFile {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, ConfigError> {
        let mut terms: Vec<ConfigTerm> = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let code = strip_comment(line);
            if let Some((name, values)) = code.split_once('=') {
                let name = name.trim();
                if name.is_empty() || name.contains(char::is_whitespace) {
                    return Err(ConfigError::Syntax {
                        line: index + 1,
                        reason: format!("`{}` is not a valid term name", name),
                    });
                }
                terms.push(ConfigTerm {
                    name: name.to_owned(),
                    rows: Vec::new(),
                });
                push_row(&mut terms, values);
            } else if !code.trim().is_empty() {
                if terms.is_empty() {
                    debug!("line {}: ignoring values before the first term", index + 1);
                    continue;
                }
                push_row(&mut terms, code);
            }
        }
        Ok(Self { terms })
    }
}

fn strip_comment(line: &str) -> &str {
    let mut offset = 0;
    for word in line.split_whitespace() {
        // Words are yielded in order, so searching from `offset` finds this one.
        let start = offset + line[offset..].find(word).unwrap_or(0);
        if COMMENT_MARKERS.iter().any(|marker| word.starts_with(marker)) {
            return &line[..start];
        }
        offset = start + word.len();
    }
    line
}

fn push_row(terms: &mut [ConfigTerm], values: &str) {
    let row: Vec<String> = values.split_whitespace().map(str::to_owned).collect();
    if row.is_empty() {
        return;
    }
    if let Some(term) = terms.last_mut() {
        term.rows.push(row);
    }
}

impl ConfigFile {
    /// Reads and parses a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        text.parse()
    }

    pub fn terms(&self) -> &[ConfigTerm] {
        &self.terms
    }

    pub fn term(&self, name: &str) -> Option<&ConfigTerm> {
        self.terms.iter().find(|term| term.name == name)
    }

    /// Whether the term exists and is not `NULL`.
    pub fn is_set(&self, name: &str) -> bool {
        self.term(name).map_or(false, ConfigTerm::is_set)
    }

    /// Parses the single value of a term.
    ///
    /// Missing and `NULL` terms are reported as [`ConfigError::MissingKey`],
    /// terms with more than one word as [`ConfigError::MultipleValues`].
    pub fn get<T: FromStr>(&self, name: &str) -> Result<T, ConfigError> {
        let term = self
            .term(name)
            .filter(|term| term.is_set())
            .ok_or_else(|| ConfigError::MissingKey(name.to_owned()))?;
        match term.rows.as_slice() {
            [row] if row.len() == 1 => parse_value(name, &row[0]),
            rows => Err(ConfigError::MultipleValues {
                key: name.to_owned(),
                count: rows.iter().map(Vec::len).sum(),
            }),
        }
    }

    /// Like [`ConfigFile::get`], but missing and `NULL` terms give `default`.
    pub fn get_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, ConfigError> {
        if self.is_set(name) {
            self.get(name)
        } else {
            Ok(default)
        }
    }

    /// Parses every row of a term.
    pub fn get_rows<T: FromStr>(&self, name: &str) -> Result<Vec<Vec<T>>, ConfigError> {
        let term = self
            .term(name)
            .ok_or_else(|| ConfigError::MissingKey(name.to_owned()))?;
        term.rows
            .iter()
            .map(|row| row.iter().map(|value| parse_value(name, value)).collect())
            .collect()
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Parse {
        key: name.to_owned(),
        value: value.to_owned(),
    })
}
