//! Reads the piece placement of a chessboard from a photo.
//!
//! The pipeline has three stages:
//! 1. [`board_locator`] finds the board (the largest quadrilateral contour) and crops it to a
//!    fixed-size square image,
//! 2. [`classifier`] splits that image into 8✕8 fields and matches each one against a
//!    [`TemplateSet`],
//! 3. [`fen`] encodes the resulting [`BoardState`] as the piece placement field of a FEN string.
//!
//! [`scan`] runs all of them.

pub mod board;
pub mod board_locator;
pub mod classifier;
pub mod fen;
pub mod matcher;
pub mod scanner;
pub mod templates;
mod util;

pub use board::{BoardState, FieldPosition, PieceCode};
pub use scanner::{Config, Error, ScanResult, scan, scan_file};
pub use templates::{TemplateSet, load_templates};
