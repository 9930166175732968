//! Reference patterns the fields are compared against.

use crate::classifier::{self, SquareLabel};
use crate::util::binary_pattern;
use TemplateError::*;
use log::{debug, warn};
use opencv::{
    core::ToInputArray,
    imgcodecs::{IMREAD_GRAYSCALE, imread},
    prelude::*,
};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum TemplateError {
    OpenCVError(opencv::Error),
    IoError(PathBuf, std::io::Error),
    UnreadableImage(PathBuf),
}

impl From<opencv::Error> for TemplateError {
    fn from(value: opencv::Error) -> Self {
        OpenCVError(value)
    }
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenCVError(_) => write!(f, "OpenCV internal error"),
            IoError(path, _) => write!(f, "Could not read templates from '{}'", path.display()),
            UnreadableImage(path) => {
                write!(f, "Could not load template image '{}'", path.display())
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenCVError(err) => Some(err),
            IoError(_, err) => Some(err),
            UnreadableImage(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Debug)]
pub struct Template {
    name: String,
    /// `None` if the name is not one of the known labels.
    label: Option<SquareLabel>,
    pattern: Mat,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<SquareLabel> {
        self.label
    }

    /// The binary pattern, `target_size`✕`target_size` of the set it belongs to.
    pub fn pattern(&self) -> &Mat {
        &self.pattern
    }
}

/// Templates keyed by name. Iteration is in name order, which decides ties between templates
/// with the same score.
#[derive(Debug)]
pub struct TemplateSet {
    target_size: i32,
    binary_threshold: f64,
    templates: BTreeMap<String, Template>,
}

impl TemplateSet {
    /// An empty set whose patterns get prepared the same way the classifier prepares fields.
    pub fn new(config: &classifier::Config) -> Self {
        Self {
            target_size: config.target_size,
            binary_threshold: config.binary_threshold,
            templates: BTreeMap::new(),
        }
    }

    /// Add (or replace) a template from a raw image of any size and colour depth.
    pub fn insert<M>(&mut self, name: impl Into<String>, image: &M) -> Result<()>
    where
        M: ToInputArray,
    {
        let name = name.into();
        let label = match name.parse::<SquareLabel>() {
            Ok(label) => Some(label),
            Err(e) => {
                warn!("{}; fields matching it will be reported as empty", e);
                None
            }
        };
        let pattern = binary_pattern(image, self.target_size, self.binary_threshold)?;

        debug!("prepared template '{}'", name);
        self.templates.insert(
            name.clone(),
            Template {
                name,
                label,
                pattern,
            },
        );
        Ok(())
    }

    pub fn target_size(&self) -> i32 {
        self.target_size
    }

    pub fn binary_threshold(&self) -> f64 {
        self.binary_threshold
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    /// Names of the templates which do not map to a known label.
    pub fn unrecognized(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|template| template.label.is_none())
            .map(Template::name)
    }
}

fn is_template_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png") || ext.eq_ignore_ascii_case("jpg"))
}

/// Load every `.png` / `.jpg` in `dir`, named after the file stem (`pawn_wb.png` → `pawn_wb`).
pub fn load_templates(dir: &Path, config: &classifier::Config) -> Result<TemplateSet> {
    let entries = fs::read_dir(dir).map_err(|e| IoError(dir.to_path_buf(), e))?;

    let mut templates = TemplateSet::new(config);
    for entry in entries {
        let path = entry.map_err(|e| IoError(dir.to_path_buf(), e))?.path();
        if !path.is_file() || !is_template_image(&path) {
            continue;
        }
        let (Some(name), Some(path_str)) = (
            path.file_stem().and_then(|stem| stem.to_str()),
            path.to_str(),
        ) else {
            return Err(UnreadableImage(path));
        };

        let image = imread(path_str, IMREAD_GRAYSCALE)?;
        if image.empty() {
            return Err(UnreadableImage(path));
        }
        templates.insert(name, &image)?;
    }

    debug!(
        "loaded {} templates from '{}'",
        templates.len(),
        dir.display()
    );
    Ok(templates)
}
