use crate::util::to_grayscale;
use LocatorError::*;
use log::debug;
use opencv::{
    core::{Point2i, Rect2i, Size, ToInputArray, Vector},
    imgcodecs::{IMREAD_COLOR, imread},
    imgproc::{
        CHAIN_APPROX_SIMPLE, INTER_AREA, RETR_EXTERNAL, approx_poly_dp, arc_length, bounding_rect,
        canny_def, contour_area_def, find_contours_def, gaussian_blur_def, resize,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::Path;

#[derive(Debug)]
pub enum LocatorError {
    OpenCVError(opencv::Error),
    /// The image could not be decoded. Carries the source (path) if known.
    LoadError(Option<String>, Option<opencv::Error>),
    NotFound,
    InvalidConfig(String),
}

impl From<opencv::Error> for LocatorError {
    fn from(value: opencv::Error) -> Self {
        OpenCVError(value)
    }
}

impl Display for LocatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenCVError(_) => write!(f, "OpenCV internal error"),
            LoadError(Some(path), _) => write!(
                f,
                "Could not load image '{path}'. Please check the path."
            ),
            LoadError(None, _) => write!(f, "Could not load image: no image data"),
            NotFound => write!(f, "Chessboard not found in the image."),
            InvalidConfig(reason) => write!(f, "Invalid locator configuration: {reason}"),
        }
    }
}

impl std::error::Error for LocatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenCVError(err) | LoadError(_, Some(err)) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LocatorError>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Edge length of the gaussian blur kernel applied before edge detection. Must be odd.
    pub blur_kernel_size: i32,
    /// Lower hysteresis threshold of the canny edge detector.
    pub canny_low_threshold: f64,
    /// Upper hysteresis threshold of the canny edge detector.
    pub canny_high_threshold: f64,
    /// Contours enclosing less than this many px² are never considered to be the board.
    pub min_board_area: f64,
    /// Polygon approximation tolerance as share of the contour perimeter.
    pub approx_epsilon_ratio: f64,
    /// Edge length of the (square) board image produced by the locator.
    pub canonical_size: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            canny_low_threshold: 50.0,
            canny_high_threshold: 150.0,
            min_board_area: 10_000.0,
            approx_epsilon_ratio: 0.02,
            canonical_size: 400,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel_size <= 0 || self.blur_kernel_size % 2 == 0 {
            return Err(InvalidConfig(format!(
                "blur kernel size must be odd and positive, was {}",
                self.blur_kernel_size
            )));
        }
        if self.canny_low_threshold > self.canny_high_threshold {
            return Err(InvalidConfig(format!(
                "canny thresholds are inverted: {} > {}",
                self.canny_low_threshold, self.canny_high_threshold
            )));
        }
        if self.approx_epsilon_ratio <= 0.0 {
            return Err(InvalidConfig(format!(
                "approximation ratio must be positive, was {}",
                self.approx_epsilon_ratio
            )));
        }
        // every one of the 8 fields per line needs at least one pixel
        if self.canonical_size < 8 {
            return Err(InvalidConfig(format!(
                "canonical size must be at least 8, was {}",
                self.canonical_size
            )));
        }
        Ok(())
    }
}

/// Decode an image file as BGR.
pub fn load_image(path: &Path) -> Result<Mat> {
    let path_str = path.to_string_lossy().to_string();
    let image = imread(&path_str, IMREAD_COLOR)
        .map_err(|e| LoadError(Some(path_str.clone()), Some(e)))?;
    if image.empty() {
        return Err(LoadError(Some(path_str), None));
    }
    debug!(
        "loaded '{}' ({}✕{})",
        path.display(),
        image.cols(),
        image.rows()
    );
    Ok(image)
}

#[derive(Debug)]
struct BoardCandidate {
    contour: Vector<Point2i>,
    area: f64,
}

fn edge_map(image: &Mat, config: &Config) -> Result<Mat> {
    let gray = to_grayscale(image)?;

    let mut blurred = Mat::default();
    gaussian_blur_def(
        &gray,
        &mut blurred,
        Size::new(config.blur_kernel_size, config.blur_kernel_size),
        0.0,
    )?;

    let mut edges = Mat::default();
    canny_def(
        &blurred,
        &mut edges,
        config.canny_low_threshold,
        config.canny_high_threshold,
    )?;
    Ok(edges)
}

/// Outer contours which are large enough and can be approximated by a quadrilateral.
fn board_candidates(edges: &Mat, config: &Config) -> Result<Vec<BoardCandidate>> {
    let mut contours = Vector::<Vector<Point2i>>::new();
    find_contours_def(edges, &mut contours, RETR_EXTERNAL, CHAIN_APPROX_SIMPLE)?;

    let mut candidates = Vec::new();
    for contour in contours.iter() {
        let area = contour_area_def(&contour)?;
        if area < config.min_board_area {
            continue;
        }

        let perimeter = arc_length(&contour, true)?;
        let mut polygon = Vector::<Point2i>::new();
        approx_poly_dp(
            &contour,
            &mut polygon,
            config.approx_epsilon_ratio * perimeter,
            true,
        )?;
        if polygon.len() == 4 {
            candidates.push(BoardCandidate { contour, area });
        }
    }

    debug!(
        "found {} contours, {} of them are board candidates",
        contours.len(),
        candidates.len()
    );
    Ok(candidates)
}

/// Find the axis-aligned bounding box of the board, if there is one.
///
/// The board is the largest contour which is a quadrilateral. No perspective correction is
/// done, so the box only fits well if the board is photographed roughly from above.
pub fn find_board_region<M>(image: &M, config: &Config) -> Result<Option<Rect2i>>
where
    M: MatTrait + ToInputArray,
{
    if image.empty() {
        return Err(LoadError(None, None));
    }
    let mut owned = Mat::default();
    image.copy_to(&mut owned)?;

    let edges = edge_map(&owned, config)?;
    let candidates = board_candidates(&edges, config)?;

    // on equal areas the first candidate is kept
    let board = candidates
        .into_iter()
        .fold(None, |best, candidate| match best {
            Some(best) if best.area >= candidate.area => Some(best),
            _ => Some(candidate),
        });

    let Some(board) = board else {
        return Ok(None);
    };

    let rect = bounding_rect(&board.contour)?;
    let x1 = rect.x.clamp(0, owned.cols());
    let y1 = rect.y.clamp(0, owned.rows());
    let x2 = (rect.x + rect.width).clamp(x1, owned.cols());
    let y2 = (rect.y + rect.height).clamp(y1, owned.rows());
    let rect = Rect2i::new(x1, y1, x2 - x1, y2 - y1);

    debug!("board with area {} px² found at {:?}", board.area, rect);
    Ok(Some(rect))
}

/// Crop the board out of the photo and scale it to `canonical_size`✕`canonical_size`.
pub fn locate_board<M>(image: &M, config: &Config) -> Result<Mat>
where
    M: MatTrait + ToInputArray,
{
    config.validate()?;

    let Some(region) = find_board_region(image, config)? else {
        debug!("failed to find a quadrilateral contour large enough to be the board");
        return Err(NotFound);
    };

    let board = image.roi(region)?;
    let mut board_image = Mat::default();
    resize(
        &board,
        &mut board_image,
        Size::new(config.canonical_size, config.canonical_size),
        0.0,
        0.0,
        INTER_AREA,
    )?;

    #[cfg(feature = "show_debug_screens")]
    crate::util::resize_and_show("board", &board_image)?;

    Ok(board_image)
}
