use crate::board::{BOARD_SIZE, FieldPosition};
use opencv::{
    Result,
    core::{Rect2i, Size, ToInputArray},
    imgproc::{
        COLOR_BGR2GRAY, COLOR_BGRA2GRAY, INTER_LINEAR, THRESH_BINARY, cvt_color_def, resize,
        threshold,
    },
    prelude::*,
};

#[cfg(feature = "show_debug_screens")]
pub fn resize_and_show<M>(window_name: &str, image: &M) -> Result<()>
where
    M: ToInputArray,
{
    use opencv::highgui::imshow;

    let mut out = Mat::default();
    resize(image, &mut out, Size::default(), 0.5, 0.5, INTER_LINEAR)?;
    imshow(window_name, &out)?;
    Ok(())
}

/// Single channel intensity version of a BGR(A) image. Single channel images are copied as-is.
pub fn to_grayscale(image: &Mat) -> Result<Mat> {
    let mut gray = Mat::default();
    match image.channels() {
        1 => image.copy_to(&mut gray)?,
        4 => cvt_color_def(image, &mut gray, COLOR_BGRA2GRAY)?,
        _ => cvt_color_def(image, &mut gray, COLOR_BGR2GRAY)?,
    }
    Ok(gray)
}

/// Resize to `target_size`✕`target_size`, convert to intensity and binarize: pixels brighter than
/// `binary_threshold` become 255, all others 0.
pub fn binary_pattern<M>(image: &M, target_size: i32, binary_threshold: f64) -> Result<Mat>
where
    M: ToInputArray,
{
    let mut resized = Mat::default();
    resize(
        image,
        &mut resized,
        Size::new(target_size, target_size),
        0.0,
        0.0,
        INTER_LINEAR,
    )?;

    let gray = to_grayscale(&resized)?;

    let mut binary = Mat::default();
    threshold(
        &gray,
        &mut binary,
        binary_threshold,
        u8::MAX as f64,
        THRESH_BINARY,
    )?;
    Ok(binary)
}

/// The region of a field in an image of the whole board, with the given share of the field
/// height (resp. width) removed on the top and bottom (resp. left and right).
pub fn field_roi(
    pos: &FieldPosition,
    image_size: Size,
    margin_ratio_vertical: f64,
    margin_ratio_horizontal: f64,
) -> Rect2i {
    let field_height = image_size.height / BOARD_SIZE as i32;
    let field_width = image_size.width / BOARD_SIZE as i32;
    let margin_v = (field_height as f64 * margin_ratio_vertical) as i32;
    let margin_h = (field_width as f64 * margin_ratio_horizontal) as i32;

    let y1 = (pos.row() as i32 * field_height + margin_v).clamp(0, image_size.height);
    let y2 = ((pos.row() as i32 + 1) * field_height - margin_v).clamp(y1, image_size.height);
    let x1 = (pos.col() as i32 * field_width + margin_h).clamp(0, image_size.width);
    let x2 = ((pos.col() as i32 + 1) * field_width - margin_h).clamp(x1, image_size.width);

    Rect2i::new(x1, y1, x2 - x1, y2 - y1)
}

#[cfg(test)]
pub mod test_support {
    use opencv::{
        core::{CV_8UC3, Rect2i, Scalar},
        prelude::*,
    };

    pub fn filled_image(rows: i32, cols: i32, value: f64) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(value)).unwrap()
    }

    pub fn filled_gray_image(rows: i32, cols: i32, value: f64) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, u8::opencv_type(), Scalar::all(value)).unwrap()
    }

    pub fn fill(image: &mut Mat, region: Rect2i, value: f64) {
        let mut roi = image.roi_mut(region).unwrap();
        roi.set_to_def(&Scalar::all(value)).unwrap();
    }

    /// A "photo" of an 8✕8 board with light (255) and dark (0) fields of `field_px` pixels,
    /// top left field light, placed at (`offset`, `offset`) on a uniform grey background.
    pub fn board_photo(image_edge: i32, offset: i32, field_px: i32) -> Mat {
        let mut image = filled_image(image_edge, image_edge, 100.0);
        for row in 0..8 {
            for col in 0..8 {
                let value = if (row + col) % 2 == 0 { 255.0 } else { 0.0 };
                fill(
                    &mut image,
                    Rect2i::new(
                        offset + col * field_px,
                        offset + row * field_px,
                        field_px,
                        field_px,
                    ),
                    value,
                );
            }
        }
        image
    }
}
