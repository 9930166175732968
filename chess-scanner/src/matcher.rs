//! Dissimilarity scores between the binary pattern of a field and a template pattern.

use opencv::{
    Result,
    core::{absdiff, count_non_zero, sum_elems},
    imgproc::{TM_CCORR_NORMED, match_template_def},
    prelude::*,
};

/// Scores how different a field pattern is from a template pattern. Lower is more similar; both
/// patterns have the same size.
pub trait Matcher {
    fn score(&self, pattern: &Mat, template: &Mat) -> Result<f64>;
}

/// Sum of the absolute per-pixel differences.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AbsDiffMatcher;

impl Matcher for AbsDiffMatcher {
    fn score(&self, pattern: &Mat, template: &Mat) -> Result<f64> {
        let mut diff = Mat::default();
        absdiff(pattern, template, &mut diff)?;
        Ok(sum_elems(&diff)?[0])
    }
}

/// `1 - r` where `r` is the normalized cross-correlation of the two patterns.
///
/// An all-black pattern has no norm to normalize by: two all-black patterns score 0, an
/// all-black one against any other pattern scores 1.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationMatcher;

impl Matcher for CorrelationMatcher {
    fn score(&self, pattern: &Mat, template: &Mat) -> Result<f64> {
        let pattern_black = count_non_zero(pattern)? == 0;
        let template_black = count_non_zero(template)? == 0;
        if pattern_black || template_black {
            return Ok(if pattern_black && template_black { 0.0 } else { 1.0 });
        }

        let mut result = Mat::default();
        match_template_def(pattern, template, &mut result, TM_CCORR_NORMED)?;
        let correlation = *result.at_2d::<f32>(0, 0)?;
        Ok(1.0 - correlation as f64)
    }
}
