//! Converts a camera model file into another camera model type.
//!
//! Everything is driven by a run config, a `key = value` file read with
//! [`ConfigFile`]. See [`HELP`] for the terms it understands.

use cv_fisheye::{
    curve_offset_error, CameraModel, CameraModelKind, ConfigError, ConfigFile, CurveError,
    CurveGrid, FitError, KannalaBrandtFitter,
};
use log::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HELP: &str = "\
-------------------------------------------------------
Usage: camera-model-transfer [--order N] <run-config>
-------------------------------------------------------
The run config contains the following terms, NULL leaves a term unset:
# _help                 print this message, [true] or [false]
# _path_to_ori_model    required, path to the model to convert,
                        paths may not contain whitespace
# _path_to_save_model   optional, path to save the converted model,
                        by default <_path_to_ori_model>_<_target_model_type>
# _target_model_type    required, target model type, one of
                        1. UNIVERSAL
                        2. KANNALA_BRANDT
# _show_offset          report the distortion curve offset between the
                        original and the converted model, [true] or [false]
# _log_level            0 errors only, 1 results, 2 everything,
                        RUST_LOG takes precedence
# _curve_size           curve size used when sampling Kannala-Brandt models,
                        by default 1001
# _curve_step           curve step in degrees used when sampling
                        Kannala-Brandt models, by default 0.1
-------------------------------------------------------";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("please provide `{0}` in the run config")]
    MissingSetting(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not sample camera model: {0}")]
    Curve(#[from] CurveError),
    #[error("could not complete the transform: {0}")]
    Fit(#[from] FitError),
}

impl TransferError {
    /// Whether the user should be shown [`HELP`].
    pub fn wants_help(&self) -> bool {
        matches!(self, Self::MissingSetting(_) | Self::Config(ConfigError::UnsupportedModel(_)))
    }
}

/// Prints [`HELP`] at most once.
#[derive(Debug, Default)]
pub struct HelpPrinter {
    printed: bool,
}

impl HelpPrinter {
    /// Writes the help text unless it was written before. Returns whether it wrote.
    pub fn print_to<W: Write>(&mut self, mut writer: W) -> io::Result<bool> {
        if self.printed {
            return Ok(false);
        }
        writeln!(writer, "{}", HELP)?;
        self.printed = true;
        Ok(true)
    }

    pub fn print(&mut self) {
        if let Err(e) = self.print_to(io::stdout().lock()) {
            error!("unable to print help: {}", e);
        }
    }
}

/// Settings read from the run config.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSettings {
    pub help: bool,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub target: CameraModelKind,
    pub show_offset: bool,
    pub log_level: u8,
    pub grid: CurveGrid,
}

impl TransferSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TransferError> {
        Self::from_config(&ConfigFile::load(path)?)
    }

    pub fn from_config(config: &ConfigFile) -> Result<Self, TransferError> {
        let required = |name: &'static str| {
            if config.is_set(name) {
                Ok(name)
            } else {
                Err(TransferError::MissingSetting(name))
            }
        };
        let source: PathBuf = config.get(required("_path_to_ori_model")?)?;
        let target: CameraModelKind = config
            .get::<String>(required("_target_model_type")?)?
            .parse()?;
        let destination = if config.is_set("_path_to_save_model") {
            config.get("_path_to_save_model")?
        } else {
            PathBuf::from(format!("{}_{}", source.display(), target))
        };
        let default_grid = CurveGrid::default();
        Ok(Self {
            help: config.get_or("_help", false)?,
            source,
            destination,
            target,
            show_offset: config.get_or("_show_offset", false)?,
            log_level: config.get_or("_log_level", 1)?,
            grid: CurveGrid {
                size: config.get_or("_curve_size", default_grid.size)?,
                step: config.get_or("_curve_step", default_grid.step)?,
            },
        })
    }

    /// Default log filter for `_log_level`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level {
            0 => LevelFilter::Error,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub model: CameraModel,
    /// Offset between the original and converted distortion curves, if requested.
    pub offset: Option<f64>,
}

/// Loads the source model, converts it and saves the result.
///
/// A Kannala-Brandt source is sampled into a universal model first. Kannala-Brandt
/// targets are fitted with `order` coefficients.
pub fn run(settings: &TransferSettings, order: usize) -> Result<TransferReport, TransferError> {
    let source = CameraModel::load(&settings.source)?;
    let universal = source.to_universal(settings.grid)?;

    info!("converting to {}", settings.target);
    let model: CameraModel = match settings.target {
        CameraModelKind::Universal => universal.clone().into(),
        CameraModelKind::KannalaBrandt => KannalaBrandtFitter::new(order).fit(&universal)?.into(),
    };
    model.save(&settings.destination)?;

    let offset = if settings.show_offset {
        let converted = model.to_universal(settings.grid)?;
        let offset = curve_offset_error(&universal.curve, &converted.curve);
        info!("the distortion curve offset error is {}", offset);
        Some(offset)
    } else {
        None
    };
    Ok(TransferReport { model, offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cv_fisheye::{DistortionCurve, Skew, UniversalModel};
    use cv_fisheye::nalgebra::{Point2, Vector2};

    fn write_universal(dir: &Path) -> PathBuf {
        let curve = DistortionCurve::from_fn(CurveGrid::default(), |t| {
            t - 0.05 * t.powi(3) + 0.01 * t.powi(5)
        })
        .unwrap();
        let model = UniversalModel {
            width: 1280,
            height: 720,
            optical_center: Point2::new(640.0, 360.0),
            skew: Skew::identity(),
            fov: Vector2::new(1.3, 0.9),
            curve,
        };
        let path = dir.join("camera.txt");
        CameraModel::from(model).save(&path).unwrap();
        path
    }

    fn settings(text: &str) -> Result<TransferSettings, TransferError> {
        TransferSettings::from_config(&text.parse().unwrap())
    }

    #[test]
    fn settings_defaults() {
        let s = settings("_path_to_ori_model = cam\n_target_model_type = KANNALA_BRANDT\n_path_to_save_model = NULL\n").unwrap();
        assert_eq!(s.destination, PathBuf::from("cam_KANNALA_BRANDT"));
        assert_eq!(s.target, CameraModelKind::KannalaBrandt);
        assert!(!s.help);
        assert!(!s.show_offset);
        assert_eq!(s.grid, CurveGrid::default());
        assert_eq!(s.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn settings_overrides() {
        let s = settings(
            "_help = true\n_path_to_ori_model = a\n_path_to_save_model = b\n\
             _target_model_type = UNIVERSAL\n_show_offset = true\n_log_level = 2\n\
             _curve_size = 501\n_curve_step = 0.2\n",
        )
        .unwrap();
        assert!(s.help && s.show_offset);
        assert_eq!(s.destination, PathBuf::from("b"));
        assert_eq!(s.grid, CurveGrid { size: 501, step: 0.2 });
        assert_eq!(s.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn settings_require_source_and_target() {
        let e = settings("_path_to_ori_model = NULL\n_target_model_type = UNIVERSAL\n").unwrap_err();
        assert!(matches!(e, TransferError::MissingSetting("_path_to_ori_model")));
        assert!(e.wants_help());
        let e = settings("_path_to_ori_model = a\n").unwrap_err();
        assert!(matches!(e, TransferError::MissingSetting("_target_model_type")));
        let e = settings("_path_to_ori_model = a\n_target_model_type = PINHOLE\n").unwrap_err();
        assert!(e.wants_help());
    }

    #[test]
    fn paths_with_spaces_are_rejected() {
        let e = settings("_path_to_ori_model = /my dir/cam.txt\n_target_model_type = UNIVERSAL\n")
            .unwrap_err();
        assert!(matches!(
            e,
            TransferError::Config(ConfigError::MultipleValues { ref key, count: 2 })
                if key == "_path_to_ori_model"
        ));
    }

    #[test]
    fn help_is_printed_once() {
        let mut help = HelpPrinter::default();
        let mut out = Vec::new();
        assert!(help.print_to(&mut out).unwrap());
        assert!(!help.print_to(&mut out).unwrap());
        assert_eq!(String::from_utf8(out).unwrap().matches("Usage:").count(), 1);
    }

    #[test]
    fn converts_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_universal(dir.path());
        let mut s = TransferSettings {
            help: false,
            source: source.clone(),
            destination: dir.path().join("kb.txt"),
            target: CameraModelKind::KannalaBrandt,
            show_offset: true,
            log_level: 1,
            grid: CurveGrid::default(),
        };
        let report = run(&s, 3).unwrap();
        assert_eq!(report.model.kind(), CameraModelKind::KannalaBrandt);
        // The source file stores six decimals.
        assert!(report.offset.unwrap() < 1e-6);
        assert_eq!(CameraModel::load(&s.destination).unwrap().kind(), CameraModelKind::KannalaBrandt);

        // Back from the saved Kannala-Brandt file.
        s.source = s.destination.clone();
        s.destination = dir.path().join("uni.txt");
        s.target = CameraModelKind::Universal;
        let report = run(&s, 5).unwrap();
        assert_relative_eq!(report.offset.unwrap(), 0.0);
        match CameraModel::load(&s.destination).unwrap() {
            CameraModel::Universal(model) => assert_eq!(model.curve.len(), 1001),
            other => panic!("expected a universal model, got {:?}", other.kind()),
        }
    }

    #[test]
    fn missing_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = TransferSettings {
            help: false,
            source: dir.path().join("nope"),
            destination: dir.path().join("out"),
            target: CameraModelKind::Universal,
            show_offset: false,
            log_level: 0,
            grid: CurveGrid::default(),
        };
        assert!(matches!(
            run(&s, 5),
            Err(TransferError::Config(ConfigError::Io { .. }))
        ));
    }
}
