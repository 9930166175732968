use crate::board::{BoardError, BoardState, FieldPosition, PieceCode, PieceColour, PieceKind};
use crate::matcher::{AbsDiffMatcher, Matcher};
use crate::templates::{Template, TemplateSet};
use crate::util::{binary_pattern, field_roi};
use ClassifierError::*;
use log::{debug, warn};
use opencv::{
    core::{Size, ToInputArray},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug)]
pub enum ClassifierError {
    OpenCVError(opencv::Error),
    EmptyTemplateSet,
    /// The templates were prepared with another target size or threshold than the fields.
    TemplatePreparationMismatch(String),
    UnknownLabel(String),
    InvalidConfig(String),
}

impl From<opencv::Error> for ClassifierError {
    fn from(value: opencv::Error) -> Self {
        OpenCVError(value)
    }
}

impl Display for ClassifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenCVError(_) => write!(f, "OpenCV internal error"),
            EmptyTemplateSet => write!(f, "No templates available to classify the fields"),
            TemplatePreparationMismatch(reason) => write!(f, "Incompatible templates: {reason}"),
            UnknownLabel(label) => write!(f, "Unknown template label '{label}'"),
            InvalidConfig(reason) => write!(f, "Invalid classifier configuration: {reason}"),
        }
    }
}

impl std::error::Error for ClassifierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenCVError(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[derive(Debug, Default, Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub enum DebugFieldConfig {
    #[default]
    None,
    All,
    Specific(FieldPosition),
}

impl DebugFieldConfig {
    pub fn matches(&self, other: &FieldPosition) -> bool {
        match self {
            DebugFieldConfig::None => false,
            DebugFieldConfig::All => true,
            DebugFieldConfig::Specific(pos) => pos == other,
        }
    }
}

impl FromStr for DebugFieldConfig {
    type Err = BoardError;

    /// `none`, `all` or a field in algebraic notation.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(DebugFieldConfig::None),
            "all" => Ok(DebugFieldConfig::All),
            pos => Ok(DebugFieldConfig::Specific(pos.parse()?)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Edge length of the (square) patterns which get compared.
    pub target_size: i32,
    /// Intensities above this become white in the binary patterns, all others black.
    pub binary_threshold: f64,
    /// Share of the field height removed at the top and at the bottom of each field.
    pub margin_ratio_vertical: f64,
    /// Share of the field width removed at the left and at the right of each field.
    pub margin_ratio_horizontal: f64,
    /// Whether specific fields should be debugged or not.
    #[serde(skip)]
    pub debug_field: DebugFieldConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_size: 50,
            binary_threshold: 128.0,
            margin_ratio_vertical: 0.1,
            margin_ratio_horizontal: 0.2,
            debug_field: DebugFieldConfig::None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.target_size <= 0 {
            return Err(InvalidConfig(format!(
                "target size must be positive, was {}",
                self.target_size
            )));
        }
        if !(0.0..=u8::MAX as f64).contains(&self.binary_threshold) {
            return Err(InvalidConfig(format!(
                "binary threshold must be between 0 and 255, was {}",
                self.binary_threshold
            )));
        }
        for (name, ratio) in [
            ("vertical", self.margin_ratio_vertical),
            ("horizontal", self.margin_ratio_horizontal),
        ] {
            if !(0.0..0.5).contains(&ratio) {
                return Err(InvalidConfig(format!(
                    "{name} margin ratio must be in [0, 0.5), was {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// Colour of the field underneath a piece (or of an empty field).
#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub enum SquareShade {
    Light,
    Dark,
}

impl SquareShade {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'w' => Some(SquareShade::Light),
            'b' => Some(SquareShade::Dark),
            _ => None,
        }
    }

    fn to_char(self) -> char {
        match self {
            SquareShade::Light => 'w',
            SquareShade::Dark => 'b',
        }
    }
}

fn colour_from_char(c: char) -> Option<PieceColour> {
    match c {
        'w' => Some(PieceColour::White),
        'b' => Some(PieceColour::Black),
        _ => None,
    }
}

fn colour_to_char(colour: PieceColour) -> char {
    match colour {
        PieceColour::White => 'w',
        PieceColour::Black => 'b',
    }
}

fn kind_name(kind: PieceKind) -> &'static str {
    match kind {
        PieceKind::Pawn => "pawn",
        PieceKind::Knight => "knight",
        PieceKind::Bishop => "bishop",
        PieceKind::Rook => "rook",
        PieceKind::Queen => "queen",
        PieceKind::King => "king",
    }
}

/// What a template shows. Parsed from template names such as `empty_w` (empty light field) or
/// `pawn_wb` (white pawn on a dark field).
#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub enum SquareLabel {
    Empty(SquareShade),
    Piece(PieceColour, PieceKind, SquareShade),
}

impl SquareLabel {
    /// All 26 known labels.
    pub fn all() -> impl Iterator<Item = SquareLabel> {
        let shades = [SquareShade::Light, SquareShade::Dark];
        let empties = shades.into_iter().map(SquareLabel::Empty);
        let pieces = PieceKind::ALL.into_iter().flat_map(move |kind| {
            [PieceColour::White, PieceColour::Black]
                .into_iter()
                .flat_map(move |colour| {
                    shades
                        .into_iter()
                        .map(move |shade| SquareLabel::Piece(colour, kind, shade))
                })
        });
        empties.chain(pieces)
    }

    pub fn piece_code(&self) -> PieceCode {
        match self {
            SquareLabel::Empty(_) => PieceCode::EMPTY,
            SquareLabel::Piece(colour, kind, _) => PieceCode::new(*colour, *kind),
        }
    }
}

impl FromStr for SquareLabel {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || UnknownLabel(s.to_string());
        let (name, suffix) = s.split_once('_').ok_or_else(unknown)?;
        let suffix = suffix.chars().collect::<Vec<_>>();

        if name == "empty" {
            return match suffix.as_slice() {
                [shade] => Ok(SquareLabel::Empty(
                    SquareShade::from_char(*shade).ok_or_else(unknown)?,
                )),
                _ => Err(unknown()),
            };
        }

        let kind = PieceKind::ALL
            .into_iter()
            .find(|kind| kind_name(*kind) == name)
            .ok_or_else(unknown)?;
        match suffix.as_slice() {
            [colour, shade] => Ok(SquareLabel::Piece(
                colour_from_char(*colour).ok_or_else(unknown)?,
                kind,
                SquareShade::from_char(*shade).ok_or_else(unknown)?,
            )),
            _ => Err(unknown()),
        }
    }
}

impl Display for SquareLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SquareLabel::Empty(shade) => write!(f, "empty_{}", shade.to_char()),
            SquareLabel::Piece(colour, kind, shade) => write!(
                f,
                "{}_{}{}",
                kind_name(*kind),
                colour_to_char(*colour),
                shade.to_char()
            ),
        }
    }
}

/// Assigns a piece code to every field of a canonical board image by picking the template with
/// the lowest score.
#[derive(Debug, Clone)]
pub struct SquareClassifier<S = AbsDiffMatcher> {
    config: Config,
    matcher: S,
}

impl SquareClassifier {
    pub fn new(config: Config) -> Self {
        Self::with_matcher(config, AbsDiffMatcher)
    }
}

impl<S> SquareClassifier<S>
where
    S: Matcher,
{
    pub fn with_matcher(config: Config, matcher: S) -> Self {
        Self { config, matcher }
    }

    pub fn classify<M>(&self, image: &M, templates: &TemplateSet) -> Result<BoardState>
    where
        M: MatTrait + ToInputArray,
    {
        self.config.validate()?;
        if templates.is_empty() {
            return Err(EmptyTemplateSet);
        }
        if templates.target_size() != self.config.target_size {
            return Err(TemplatePreparationMismatch(format!(
                "prepared with size {} but fields use {}",
                templates.target_size(),
                self.config.target_size
            )));
        }
        if templates.binary_threshold() != self.config.binary_threshold {
            return Err(TemplatePreparationMismatch(format!(
                "prepared with threshold {} but fields use {}",
                templates.binary_threshold(),
                self.config.binary_threshold
            )));
        }

        let image_size = image.size()?;
        let mut result = BoardState::empty();
        for pos in FieldPosition::all() {
            let code = self.classify_field(image, image_size, &pos, templates)?;
            debug!("field {} classified as '{}'", pos, code);
            result.set(&pos, code);
        }

        debug!("{}", result);
        Ok(result)
    }

    /// The margin-trimmed colour crops of all fields, row-major.
    pub fn extract_fields<M>(&self, image: &M) -> Result<Vec<(FieldPosition, Mat)>>
    where
        M: MatTrait + ToInputArray,
    {
        let image_size = image.size()?;
        FieldPosition::all()
            .map(|pos| {
                let field = image.roi(self.field_roi(&pos, image_size))?.try_clone()?;
                Ok((pos, field))
            })
            .collect()
    }

    fn field_roi(&self, pos: &FieldPosition, image_size: Size) -> opencv::core::Rect2i {
        field_roi(
            pos,
            image_size,
            self.config.margin_ratio_vertical,
            self.config.margin_ratio_horizontal,
        )
    }

    fn field_pattern<M>(&self, image: &M, image_size: Size, pos: &FieldPosition) -> Result<Mat>
    where
        M: MatTrait + ToInputArray,
    {
        let field = image.roi(self.field_roi(pos, image_size))?;
        Ok(binary_pattern(
            &field,
            self.config.target_size,
            self.config.binary_threshold,
        )?)
    }

    /// The template with the lowest score. On equal scores the first template (in label order)
    /// wins.
    fn best_match<'t>(
        &self,
        pattern: &Mat,
        templates: &'t TemplateSet,
        pos: &FieldPosition,
    ) -> Result<Option<(&'t Template, f64)>> {
        let mut best: Option<(&Template, f64)> = None;
        for template in templates.iter() {
            let score = self.matcher.score(pattern, template.pattern())?;
            if self.config.debug_field.matches(pos) {
                debug!("field {}: score {} for '{}'", pos, score, template.name());
            }
            if best.is_none_or(|(_, best_score)| score < best_score) {
                best = Some((template, score));
            }
        }
        Ok(best)
    }

    fn classify_field<M>(
        &self,
        image: &M,
        image_size: Size,
        pos: &FieldPosition,
        templates: &TemplateSet,
    ) -> Result<PieceCode>
    where
        M: MatTrait + ToInputArray,
    {
        let pattern = self.field_pattern(image, image_size, pos)?;

        #[cfg(feature = "show_debug_screens")]
        if self.config.debug_field.matches(pos) {
            use opencv::highgui::{imshow, wait_key_def};

            imshow(pos.to_string().as_str(), &pattern)?;
            wait_key_def()?;
        }

        let (template, score) = self
            .best_match(&pattern, templates, pos)?
            .ok_or(EmptyTemplateSet)?;

        match template.label() {
            Some(label) => {
                debug!(
                    "field {} best matches '{}' with score {}",
                    pos, label, score
                );
                Ok(label.piece_code())
            }
            None => {
                warn!(
                    "field {} best matches template '{}' which has no known label, treating the field as empty",
                    pos,
                    template.name()
                );
                Ok(PieceCode::EMPTY)
            }
        }
    }
}
