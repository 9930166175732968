use crate::board::BoardState;
use crate::board_locator::{self, LocatorError, locate_board};
use crate::classifier::{self, ClassifierError, SquareClassifier};
use crate::templates::{TemplateError, TemplateSet};
use Error::*;
use log::{debug, info};
use opencv::{core::ToInputArray, imgcodecs::imwrite_def, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum Error {
    /// The photo could not be decoded.
    LoadError(String),
    /// No quadrilateral large enough to be the board was found.
    NotFound,
    EmptyTemplateSet,
    OtherOpenCVError(opencv::Error),
    InvalidConfig(String),
    TemplateLoadError(TemplateError),
    ConfigFileError(PathBuf, std::io::Error),
    IoError(PathBuf, std::io::Error),
    SerdeError(serde_json::Error),
    SaveError(PathBuf, Option<opencv::Error>),
    InternalClassificationError(ClassifierError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError(msg) => write!(f, "{msg}"),
            NotFound => write!(f, "Chessboard not found in the image."),
            EmptyTemplateSet => write!(f, "No templates available to classify the fields."),
            OtherOpenCVError(_) => write!(f, "Generic OpenCV Error"),
            InvalidConfig(reason) => write!(f, "{reason}"),
            TemplateLoadError(e) => write!(f, "{e}"),
            ConfigFileError(path, _) => {
                write!(f, "Could not read the config file '{}'", path.display())
            }
            IoError(path, _) => write!(f, "Could not access '{}'", path.display()),
            SerdeError(_) => write!(f, "Failed to deserialize the config file"),
            SaveError(path, _) => write!(f, "Could not save image to '{}'", path.display()),
            InternalClassificationError(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OtherOpenCVError(e) | SaveError(_, Some(e)) => Some(e),
            TemplateLoadError(e) => Some(e),
            ConfigFileError(_, e) | IoError(_, e) => Some(e),
            SerdeError(e) => Some(e),
            InternalClassificationError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LocatorError> for Error {
    fn from(e: LocatorError) -> Self {
        match e {
            LocatorError::OpenCVError(e) => OtherOpenCVError(e),
            LocatorError::NotFound => NotFound,
            LocatorError::InvalidConfig(_) => InvalidConfig(e.to_string()),
            LocatorError::LoadError(_, _) => LoadError(e.to_string()),
        }
    }
}

impl From<ClassifierError> for Error {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::OpenCVError(e) => OtherOpenCVError(e),
            ClassifierError::EmptyTemplateSet => EmptyTemplateSet,
            ClassifierError::InvalidConfig(_) => InvalidConfig(e.to_string()),
            e => InternalClassificationError(e),
        }
    }
}

impl From<TemplateError> for Error {
    fn from(e: TemplateError) -> Self {
        match e {
            TemplateError::OpenCVError(e) => OtherOpenCVError(e),
            e => TemplateLoadError(e),
        }
    }
}

/// Default to [`OtherOpenCVError`] unless `map_err` is used explicitly.
impl From<opencv::Error> for Error {
    fn from(e: opencv::Error) -> Self {
        OtherOpenCVError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        SerdeError(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration of the whole pipeline. Every field falls back to its default when missing in a
/// config file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locator: board_locator::Config,
    pub classifier: classifier::Config,
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigFileError(path.to_path_buf(), e))?;
        let config = serde_json::from_str::<Config>(&content)?;
        debug!("loaded config from '{}': {:?}", path.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.locator.validate()?;
        self.classifier.validate()?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ScanResult {
    /// The cropped board, `canonical_size`✕`canonical_size`.
    pub board_image: Mat,
    pub board: BoardState,
}

impl ScanResult {
    /// The FEN piece placement field of the detected board.
    pub fn fen(&self) -> String {
        self.board.to_fen()
    }
}

/// Run the whole pipeline on a decoded photo.
pub fn scan<M>(image: &M, templates: &TemplateSet, config: &Config) -> Result<ScanResult>
where
    M: MatTrait + ToInputArray,
{
    config.validate()?;
    if templates.is_empty() {
        return Err(EmptyTemplateSet);
    }

    let board_image = locate_board(image, &config.locator)?;
    let board = SquareClassifier::new(config.classifier).classify(&board_image, templates)?;
    info!("detected board: {}", board.to_fen());

    Ok(ScanResult { board_image, board })
}

/// Load the photo at `path` and run the whole pipeline on it.
pub fn scan_file(path: &Path, templates: &TemplateSet, config: &Config) -> Result<ScanResult> {
    let image = board_locator::load_image(path)?;
    scan(&image, templates, config)
}

/// Write an image; the format is derived from the file extension.
pub fn save_image<M>(path: &Path, image: &M) -> Result<()>
where
    M: ToInputArray,
{
    let path_str = path.to_string_lossy();
    let written =
        imwrite_def(&path_str, image).map_err(|e| SaveError(path.to_path_buf(), Some(e)))?;
    if !written {
        return Err(SaveError(path.to_path_buf(), None));
    }
    Ok(())
}

/// Write the margin-trimmed crop of every field to `dir` as `<field>.png`, e.g. `a8.png`.
pub fn save_fields<M>(dir: &Path, board_image: &M, config: &classifier::Config) -> Result<()>
where
    M: MatTrait + ToInputArray,
{
    fs::create_dir_all(dir).map_err(|e| IoError(dir.to_path_buf(), e))?;
    let fields = SquareClassifier::new(*config).extract_fields(board_image)?;
    for (pos, field) in fields.iter() {
        save_image(&dir.join(format!("{pos}.png")), field)?;
    }
    debug!("saved {} fields to '{}'", fields.len(), dir.display());
    Ok(())
}
