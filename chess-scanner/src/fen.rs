//! Serializes a [`BoardState`] into the piece placement field of a FEN string.
//!
//! Only the first FEN field is produced: side to move, castling rights, en passant target and
//! the move clocks cannot be derived from a single photo.

use crate::board::{BOARD_SIZE, BoardState};

/// Encode the board, row 0 first, ranks separated by `/`.
pub fn encode(board: &BoardState) -> String {
    (0..BOARD_SIZE)
        .map(|row| encode_row(board, row))
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_row(board: &BoardState, row: u8) -> String {
    let mut out = String::new();
    let mut empty_count = 0u8;

    for code in board.row(row) {
        match code.fen_char() {
            Some(c) => {
                if empty_count > 0 {
                    out.push(char::from(b'0' + empty_count));
                    empty_count = 0;
                }
                out.push(c);
            }
            None => empty_count += 1,
        }
    }

    if empty_count > 0 {
        out.push(char::from(b'0' + empty_count));
    }

    out
}
