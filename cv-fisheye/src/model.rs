use crate::{
    ConfigError, ConfigFile, CurveError, CurveGrid, CurveSample, DistortionCurve,
    KannalaBrandtModel, Skew, UniversalModel,
};
use derive_more::From;
use log::*;
use nalgebra::{Point2, Vector2};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// The supported camera model families, named as in the `_TYPE` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraModelKind {
    Universal,
    KannalaBrandt,
}

impl CameraModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Universal => "UNIVERSAL",
            Self::KannalaBrandt => "KANNALA_BRANDT",
        }
    }
}

impl fmt::Display for CameraModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraModelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "UNIVERSAL" => Ok(Self::Universal),
            "KANNALA_BRANDT" => Ok(Self::KannalaBrandt),
            other => Err(ConfigError::UnsupportedModel(other.to_owned())),
        }
    }
}

/// Either kind of camera model as stored in a model file.
#[derive(Debug, Clone, PartialEq, From)]
pub enum CameraModel {
    Universal(UniversalModel),
    KannalaBrandt(KannalaBrandtModel),
}

impl CameraModel {
    pub fn kind(&self) -> CameraModelKind {
        match self {
            Self::Universal(_) => CameraModelKind::Universal,
            Self::KannalaBrandt(_) => CameraModelKind::KannalaBrandt,
        }
    }

    /// Loads a model file, see [`CameraModel::from_config`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading camera model from {}", path.display());
        Self::from_config(&ConfigFile::load(path)?)
    }

    /// Reads a model from its config terms.
    ///
    /// The `_TYPE` term selects the model. Universal models need `_W`, `_H`,
    /// `_CU`, `_CV`, `_C`, `_D`, `_E`, `_FOV_AT_CU`, `_FOV_AT_CV`,
    /// `_DISORT_STEP`, `_DISORT_SIZE` and the `_DISORT` table of
    /// `angle radius` rows. Kannala-Brandt models need `_W`, `_H`, `_CU`,
    /// `_CV`, `_MU`, `_MV` and the coefficients `_K1`, `_K2`, … which are read
    /// up to the first missing index.
    pub fn from_config(config: &ConfigFile) -> Result<Self, ConfigError> {
        match config.get::<String>("_TYPE")?.parse()? {
            CameraModelKind::Universal => Ok(Self::Universal(read_universal(config)?)),
            CameraModelKind::KannalaBrandt => Ok(Self::KannalaBrandt(read_kannala_brandt(config)?)),
        }
    }

    /// Converts to a universal model, sampling Kannala-Brandt models on `grid`.
    pub fn to_universal(&self, grid: CurveGrid) -> Result<UniversalModel, CurveError> {
        match self {
            Self::Universal(model) => Ok(model.clone()),
            Self::KannalaBrandt(model) => model.extract(grid),
        }
    }

    /// Writes the model file format, including a commented header.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(
            writer,
            "# Following are all parameters required to describe a camera's intrinsic"
        )?;
        writeln!(writer, "# _TYPE             parameter type")?;
        writeln!(writer, "# _W                image width, in pixel")?;
        writeln!(writer, "# _H                image height, in pixel")?;
        writeln!(writer, "# _CU               optic center, u, in pixel")?;
        writeln!(writer, "# _CV               optic center, v, in pixel")?;
        match self {
            Self::Universal(model) => write_universal(&mut writer, model)?,
            Self::KannalaBrandt(model) => write_kannala_brandt(&mut writer, model)?,
        }
        writer.flush()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        info!("saving {} model to {}", self.kind(), path.display());
        let io_error = |source| ConfigError::Io {
            path: path.to_owned(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        self.write(BufWriter::new(file)).map_err(io_error)
    }
}

fn read_universal(config: &ConfigFile) -> Result<UniversalModel, ConfigError> {
    let size: usize = config.get("_DISORT_SIZE")?;
    let rows = config.get_rows::<f64>("_DISORT")?;
    if rows.len() != size {
        return Err(ConfigError::MalformedCurve(format!(
            "_DISORT_SIZE is {} but _DISORT has {} rows",
            size,
            rows.len()
        )));
    }
    let samples = rows
        .iter()
        .enumerate()
        .map(|(index, row)| match *row.as_slice() {
            [angle, radius] => Ok(CurveSample::new(angle, radius)),
            _ => Err(ConfigError::MalformedCurve(format!(
                "row {} has {} values instead of 2",
                index,
                row.len()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let curve = DistortionCurve::new(config.get("_DISORT_STEP")?, samples)?;
    if !curve.is_monotonic() {
        warn!("distortion curve radii are not monotonic, lookups may fail");
    }
    Ok(UniversalModel {
        width: config.get("_W")?,
        height: config.get("_H")?,
        optical_center: Point2::new(config.get("_CU")?, config.get("_CV")?),
        skew: Skew {
            c: config.get("_C")?,
            d: config.get("_D")?,
            e: config.get("_E")?,
        },
        fov: Vector2::new(config.get("_FOV_AT_CU")?, config.get("_FOV_AT_CV")?),
        curve,
    })
}

fn read_kannala_brandt(config: &ConfigFile) -> Result<KannalaBrandtModel, ConfigError> {
    let coefficients = (1..)
        .map(|index| format!("_K{}", index))
        .take_while(|name| config.is_set(name))
        .map(|name| config.get::<f64>(&name))
        .collect::<Result<Vec<_>, _>>()?;
    if coefficients.is_empty() {
        return Err(ConfigError::MissingKey("_K1".to_owned()));
    }
    Ok(KannalaBrandtModel {
        width: config.get("_W")?,
        height: config.get("_H")?,
        polynomial: coefficients.into(),
        optical_center: Point2::new(config.get("_CU")?, config.get("_CV")?),
        pixel_density: Vector2::new(config.get("_MU")?, config.get("_MV")?),
    })
}

fn write_universal<W: Write>(writer: &mut W, model: &UniversalModel) -> io::Result<()> {
    writeln!(writer, "# _C                skew parameter, c")?;
    writeln!(writer, "# _D                skew parameter, d")?;
    writeln!(writer, "# _E                skew parameter, e")?;
    writeln!(writer, "# _FOV_AT_CU        fov, at optic center, u, in rad")?;
    writeln!(writer, "# _FOV_AT_CV        fov, at optic center, v, in rad")?;
    writeln!(writer, "# _DISORT_STEP      distortion angle step, in degree")?;
    writeln!(writer, "# _DISORT_SIZE      distortion curve size")?;
    writeln!(
        writer,
        "# _DISORT           distortion curve, angle in degree and radius in mm per row"
    )?;
    writeln!(writer, "_TYPE = {}", CameraModelKind::Universal)?;
    writeln!(writer, "_W = {}", model.width)?;
    writeln!(writer, "_H = {}", model.height)?;
    writeln!(writer, "_CU = {:.6}", model.optical_center.x)?;
    writeln!(writer, "_CV = {:.6}", model.optical_center.y)?;
    writeln!(writer, "_C = {:.6}", model.skew.c)?;
    writeln!(writer, "_D = {:.6}", model.skew.d)?;
    writeln!(writer, "_E = {:.6}", model.skew.e)?;
    writeln!(writer, "_FOV_AT_CU = {:.6}", model.fov.x)?;
    writeln!(writer, "_FOV_AT_CV = {:.6}", model.fov.y)?;
    writeln!(writer, "_DISORT_STEP = {:.6}", model.curve.step())?;
    writeln!(writer, "_DISORT_SIZE = {}", model.curve.len())?;
    writeln!(writer, "_DISORT = ")?;
    for sample in model.curve.samples() {
        writeln!(writer, "{:.6} {:.6}", sample.angle, sample.radius)?;
    }
    Ok(())
}

fn write_kannala_brandt<W: Write>(writer: &mut W, model: &KannalaBrandtModel) -> io::Result<()> {
    writeln!(writer, "# _K1 .. _Kn        polynomial coefficients, _K1 is fixed to 1")?;
    writeln!(writer, "# _MU               pixels per mm, u")?;
    writeln!(writer, "# _MV               pixels per mm, v")?;
    writeln!(writer, "_TYPE = {}", CameraModelKind::KannalaBrandt)?;
    writeln!(writer, "_W = {}", model.width)?;
    writeln!(writer, "_H = {}", model.height)?;
    for (index, k) in model.polynomial.iter().enumerate() {
        writeln!(writer, "_K{} = {:.6}", index + 1, k)?;
    }
    writeln!(writer, "_CU = {:.6}", model.optical_center.x)?;
    writeln!(writer, "_CV = {:.6}", model.optical_center.y)?;
    writeln!(writer, "_MU = {:.6}", model.pixel_density.x)?;
    writeln!(writer, "_MV = {:.6}", model.pixel_density.y)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const UNIVERSAL: &str = "\
_TYPE = UNIVERSAL
_W = 1280
_H = 960
_CU = 640.5
_CV = 480.25
_C = 1.0
_D = 0.0
_E = 0.0
_FOV_AT_CU = 1.2
_FOV_AT_CV = 0.9
_DISORT_STEP = 1.0
_DISORT_SIZE = 3
_DISORT =
0.0 0.0
1.0 0.2
2.0 0.5
";

    const KANNALA_BRANDT: &str = "\
_TYPE = KANNALA_BRANDT
_W = 640
_H = 480
_K1 = 1.000000
_K2 = -0.050000
_K3 = 0.010000
_CU = 320.0
_CV = 240.0
_MU = 200.0
_MV = 210.0
";

    #[test]
    fn kind_names() {
        assert_eq!("UNIVERSAL".parse::<CameraModelKind>().unwrap(), CameraModelKind::Universal);
        assert_eq!(
            "KANNALA_BRANDT".parse::<CameraModelKind>().unwrap(),
            CameraModelKind::KannalaBrandt
        );
        assert!(matches!(
            "PINHOLE".parse::<CameraModelKind>(),
            Err(ConfigError::UnsupportedModel(_))
        ));
        assert_eq!(CameraModelKind::KannalaBrandt.to_string(), "KANNALA_BRANDT");
    }

    #[test]
    fn reads_universal() {
        let model = CameraModel::from_config(&UNIVERSAL.parse().unwrap()).unwrap();
        let model = match model {
            CameraModel::Universal(model) => model,
            other => panic!("unexpected {:?}", other.kind()),
        };
        assert_eq!((model.width, model.height), (1280, 960));
        assert_eq!(model.optical_center, Point2::new(640.5, 480.25));
        assert_eq!(model.skew, Skew::identity());
        assert_eq!(model.fov, Vector2::new(1.2, 0.9));
        assert_eq!(model.curve.step(), 1.0);
        assert_eq!(model.curve.samples()[2], CurveSample::new(2.0, 0.5));
    }

    #[test]
    fn reads_kannala_brandt() {
        let model = CameraModel::from_config(&KANNALA_BRANDT.parse().unwrap()).unwrap();
        assert_eq!(model.kind(), CameraModelKind::KannalaBrandt);
        if let CameraModel::KannalaBrandt(kb) = &model {
            assert_eq!(kb.polynomial.coefficients(), &[1.0, -0.05, 0.01]);
            assert_eq!(kb.pixel_density, Vector2::new(200.0, 210.0));
        }
        let uni = model.to_universal(CurveGrid::default()).unwrap();
        assert_eq!(uni.curve.len(), 1001);
    }

    #[test]
    fn curve_size_must_match() {
        let text = UNIVERSAL.replace("_DISORT_SIZE = 3", "_DISORT_SIZE = 4");
        assert!(matches!(
            CameraModel::from_config(&text.parse().unwrap()),
            Err(ConfigError::MalformedCurve(_))
        ));
        let text = UNIVERSAL.replace("1.0 0.2", "1.0 0.2 7.0");
        assert!(matches!(
            CameraModel::from_config(&text.parse().unwrap()),
            Err(ConfigError::MalformedCurve(_))
        ));
        let text = UNIVERSAL.replace("2.0 0.5", "2.0 inf");
        assert!(matches!(
            CameraModel::from_config(&text.parse().unwrap()),
            Err(ConfigError::Curve(CurveError::NonFinite { index: 2, .. }))
        ));
        let text = UNIVERSAL.replace("_CU = 640.5\n", "");
        assert!(matches!(
            CameraModel::from_config(&text.parse().unwrap()),
            Err(ConfigError::MissingKey(key)) if key == "_CU"
        ));
    }

    #[test]
    fn written_models_read_back() {
        for text in [UNIVERSAL, KANNALA_BRANDT] {
            let model = CameraModel::from_config(&text.parse().unwrap()).unwrap();
            let mut bytes = Vec::new();
            model.write(&mut bytes).unwrap();
            let written = String::from_utf8(bytes).unwrap();
            assert!(written.starts_with("# Following"));
            let reread = CameraModel::from_config(&written.parse().unwrap()).unwrap();
            assert_eq!(reread, model);
        }
    }

    #[test]
    fn writes_six_decimals() {
        let model = CameraModel::from_config(&KANNALA_BRANDT.parse().unwrap()).unwrap();
        let mut bytes = Vec::new();
        model.write(&mut bytes).unwrap();
        let written = String::from_utf8(bytes).unwrap();
        assert!(written.contains("\n_K2 = -0.050000\n"));
        assert!(written.contains("\n_MU = 200.000000\n"));
        assert!(written.contains("\n_W = 640\n"));
        let reread: ConfigFile = written.parse().unwrap();
        assert_relative_eq!(reread.get::<f64>("_K3").unwrap(), 0.01);
    }
}
