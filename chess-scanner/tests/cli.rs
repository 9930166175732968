use assert_cmd::Command;
use opencv::{
    core::{CV_8UC3, Rect2i, Scalar},
    imgcodecs::imwrite_def,
    prelude::*,
};
use predicates::prelude::*;
use std::path::Path;
use tempfile::{TempDir, tempdir};

fn filled_image(rows: i32, cols: i32, typ: i32, value: f64) -> Mat {
    Mat::new_rows_cols_with_default(rows, cols, typ, Scalar::all(value)).unwrap()
}

fn write_image(path: &Path, image: &Mat) {
    assert!(imwrite_def(path.to_str().unwrap(), image).unwrap());
}

/// An 8✕8 board of 50 px fields, top left field light, on a grey 640✕640 background.
fn board_photo() -> Mat {
    let mut image = filled_image(640, 640, CV_8UC3, 100.0);
    for row in 0..8 {
        for col in 0..8 {
            let value = if (row + col) % 2 == 0 { 255.0 } else { 0.0 };
            let field = Rect2i::new(120 + col * 50, 120 + row * 50, 50, 50);
            image
                .roi_mut(field)
                .unwrap()
                .set_to_def(&Scalar::all(value))
                .unwrap();
        }
    }
    image
}

/// A directory with the two empty field templates.
fn empty_field_templates() -> TempDir {
    let dir = tempdir().unwrap();
    write_image(
        &dir.path().join("empty_w.png"),
        &filled_image(50, 50, u8::opencv_type(), 255.0),
    );
    write_image(
        &dir.path().join("empty_b.png"),
        &filled_image(50, 50, u8::opencv_type(), 0.0),
    );
    dir
}

fn chess_scanner() -> Command {
    let mut cmd = Command::cargo_bin("chess-scanner").unwrap();
    // keeps stderr down to the messages of the binary itself
    cmd.env("RUST_LOG", "off").env("OPENCV_LOG_LEVEL", "ERROR");
    cmd
}

#[test]
fn test_no_arguments() {
    chess_scanner()
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_two_images() {
    chess_scanner()
        .args(["first.jpg", "second.jpg"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_help() {
    chess_scanner()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--templates"));
}

#[test]
fn test_missing_image() {
    let templates = empty_field_templates();
    let image = templates.path().join("missing.jpg");

    chess_scanner()
        .arg(&image)
        .arg("--templates")
        .arg(templates.path())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::starts_with("Error:").and(predicate::str::contains("missing.jpg")));
}

#[test]
fn test_image_without_board() {
    let templates = empty_field_templates();
    let image = templates.path().join("blank.png");
    write_image(&image, &filled_image(480, 640, CV_8UC3, 255.0));

    chess_scanner()
        .arg(&image)
        .arg("--templates")
        .arg(templates.path())
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error: Chessboard not found"));
}

#[test]
fn test_empty_board() {
    let templates = empty_field_templates();
    let work = tempdir().unwrap();
    let image = work.path().join("board.png");
    write_image(&image, &board_photo());

    chess_scanner()
        .arg(&image)
        .arg("--templates")
        .arg(templates.path())
        .assert()
        .success()
        .stdout("8/8/8/8/8/8/8/8\n");
}

#[test]
fn test_save_board_and_fields() {
    let templates = empty_field_templates();
    let work = tempdir().unwrap();
    let image = work.path().join("board.png");
    write_image(&image, &board_photo());
    let board = work.path().join("cropped.png");
    let fields = work.path().join("fields");

    chess_scanner()
        .arg(&image)
        .arg("--templates")
        .arg(templates.path())
        .arg("--save-board")
        .arg(&board)
        .arg("--save-fields")
        .arg(&fields)
        .assert()
        .success()
        .stdout(predicate::str::ends_with("8/8/8/8/8/8/8/8\n"));

    assert!(board.is_file());
    assert_eq!(64, std::fs::read_dir(&fields).unwrap().count());
}
