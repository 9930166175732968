use BoardError::*;
use array2d::Array2D;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Number of fields per rank and per file.
pub const BOARD_SIZE: u8 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    IndexOutOfBounds(usize, usize, usize),
    InvalidPosition(String),
    InvalidPieceCode(i8),
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexOutOfBounds(actual, min, max) => write!(
                f,
                "index out of bounds! Was {actual} but must be between {min} and {max}"
            ),
            InvalidPosition(pos) => write!(f, "Invalid position '{pos}'"),
            InvalidPieceCode(code) => write!(
                f,
                "Invalid piece code {code}, must be between -{max} and {max}",
                max = PieceCode::MAX_MAGNITUDE
            ),
        }
    }
}

impl std::error::Error for BoardError {}

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub enum PieceColour {
    White,
    Black,
}

impl PieceColour {
    fn sign(self) -> i8 {
        match self {
            PieceColour::White => 1,
            PieceColour::Black => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub enum PieceKind {
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 4,
    Queen = 5,
    King = 6,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    fn from_magnitude(magnitude: i8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| *kind as i8 == magnitude)
    }

    /// The lowercase FEN letter of this piece.
    pub fn fen_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

/// Occupant of a single field: 0 is empty, the sign is the colour (positive for white) and the
/// magnitude the piece kind (1 = pawn up to 6 = king).
#[derive(Debug, Default, Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct PieceCode(i8);

impl PieceCode {
    pub const EMPTY: PieceCode = PieceCode(0);
    pub const MAX_MAGNITUDE: i8 = 6;

    pub fn new(colour: PieceColour, kind: PieceKind) -> Self {
        Self(colour.sign() * kind as i8)
    }

    pub fn value(self) -> i8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn colour(self) -> Option<PieceColour> {
        match self.0 {
            0 => None,
            v if v > 0 => Some(PieceColour::White),
            _ => Some(PieceColour::Black),
        }
    }

    pub fn kind(self) -> Option<PieceKind> {
        PieceKind::from_magnitude(self.0.abs())
    }

    /// The FEN letter of the piece: uppercase for white, lowercase for black. `None` if empty.
    pub fn fen_char(self) -> Option<char> {
        let c = self.kind()?.fen_char();
        match self.colour()? {
            PieceColour::White => Some(c.to_ascii_uppercase()),
            PieceColour::Black => Some(c),
        }
    }
}

impl TryFrom<i8> for PieceCode {
    type Error = BoardError;

    fn try_from(value: i8) -> Result<Self> {
        if !(-Self::MAX_MAGNITUDE..=Self::MAX_MAGNITUDE).contains(&value) {
            return Err(InvalidPieceCode(value));
        }
        Ok(Self(value))
    }
}

impl Display for PieceCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fen_char().unwrap_or(' '))
    }
}

/// Represents a field on the board.
#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct FieldPosition {
    /// row, counted from the top of the image (rank 8).
    row: u8,
    /// column, counted from the left (file a).
    col: u8,
}

impl FieldPosition {
    /// Create based on position in the image, indexed with (0,0) in the top left field.
    pub fn try_new(row: u8, col: u8) -> Result<Self> {
        if row > BOARD_SIZE - 1 {
            return Err(IndexOutOfBounds(row as usize, 0, BOARD_SIZE as usize - 1));
        }
        if col > BOARD_SIZE - 1 {
            return Err(IndexOutOfBounds(col as usize, 0, BOARD_SIZE as usize - 1));
        }
        Ok(Self { row, col })
    }

    /// All fields in row-major order, starting at the top left.
    pub fn all() -> impl Iterator<Item = FieldPosition> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| FieldPosition { row, col }))
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }

    /// Whether this is a dark field, presuming the top left field is a light one.
    pub fn is_dark_field(&self) -> bool {
        (self.row + self.col) % 2 == 1
    }
}

impl FromStr for FieldPosition {
    type Err = BoardError;

    /// Parses algebraic notation, e.g. `e4`.
    fn from_str(pos: &str) -> Result<Self> {
        let bytes = pos.as_bytes();
        if bytes.len() != 2 {
            return Err(InvalidPosition(pos.to_string()));
        }

        let file = bytes[0].to_ascii_lowercase();
        let rank = bytes[1];
        if !(b'a'..b'a' + BOARD_SIZE).contains(&file) || !(b'1'..b'1' + BOARD_SIZE).contains(&rank)
        {
            return Err(InvalidPosition(pos.to_string()));
        }

        Self::try_new(BOARD_SIZE - 1 - (rank - b'1'), file - b'a')
    }
}

impl Display for FieldPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let file = char::from(b'a' + self.col);
        let rank = char::from(b'1' + BOARD_SIZE - 1 - self.row);
        write!(f, "{}{}", file, rank)
    }
}

/// The 8✕8 grid of piece codes. Row 0 is the top of the image and becomes rank 8 in FEN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoardState(Array2D<PieceCode>);

impl BoardState {
    pub fn empty() -> Self {
        Self(Array2D::filled_with(
            PieceCode::EMPTY,
            BOARD_SIZE as _,
            BOARD_SIZE as _,
        ))
    }

    /// Build a board from raw piece codes, row 0 first.
    pub fn from_codes(codes: [[i8; BOARD_SIZE as usize]; BOARD_SIZE as usize]) -> Result<Self> {
        let mut board = Self::empty();
        for pos in FieldPosition::all() {
            let code = codes[pos.row() as usize][pos.col() as usize];
            board.set(&pos, PieceCode::try_from(code)?);
        }
        Ok(board)
    }

    pub fn get(&self, pos: &FieldPosition) -> PieceCode {
        self.0[(pos.row() as usize, pos.col() as usize)]
    }

    pub fn set(&mut self, pos: &FieldPosition, code: PieceCode) {
        self.0[(pos.row() as usize, pos.col() as usize)] = code;
    }

    pub fn field_iter(&self) -> impl Iterator<Item = (FieldPosition, PieceCode)> + '_ {
        FieldPosition::all().map(|pos| (pos, self.get(&pos)))
    }

    /// The piece codes of a single row, left to right.
    pub fn row(&self, row: u8) -> impl Iterator<Item = PieceCode> + '_ {
        (0..BOARD_SIZE).map(move |col| self.get(&FieldPosition { row, col }))
    }

    /// The FEN piece placement field of this board.
    pub fn to_fen(&self) -> String {
        crate::fen::encode(self)
    }

    fn print_column_header(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "   ")?;
        for col in 0..BOARD_SIZE {
            write!(f, " {}  ", char::from(b'a' + col))?;
        }
        writeln!(f)?;
        Ok(())
    }

    fn print_row(&self, f: &mut Formatter<'_>, row: u8) -> std::fmt::Result {
        let rank = char::from(b'1' + BOARD_SIZE - 1 - row);
        write!(f, "{} |", rank)?;
        for code in self.row(row) {
            write!(f, " {} |", code)?;
        }
        write!(f, " {} ", rank)?;
        writeln!(f)?;
        Ok(())
    }

    fn print_row_separator(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  |{}", "---|".repeat(BOARD_SIZE as usize))
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::empty()
    }
}

impl Display for BoardState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        self.print_column_header(f)?;
        self.print_row_separator(f)?;
        for row in 0..BOARD_SIZE {
            self.print_row(f, row)?;
            self.print_row_separator(f)?;
        }
        self.print_column_header(f)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_code_new() {
        assert_eq!(1, PieceCode::new(PieceColour::White, PieceKind::Pawn).value());
        assert_eq!(-6, PieceCode::new(PieceColour::Black, PieceKind::King).value());
        assert_eq!(4, PieceCode::new(PieceColour::White, PieceKind::Rook).value());
    }

    #[test]
    fn test_piece_code_try_from() {
        for value in -6..=6 {
            assert_eq!(value, PieceCode::try_from(value).unwrap().value());
        }
        assert_eq!(Err(InvalidPieceCode(7)), PieceCode::try_from(7));
        assert_eq!(Err(InvalidPieceCode(-7)), PieceCode::try_from(-7));
    }

    #[test]
    fn test_piece_code_fen_char() {
        assert_eq!(None, PieceCode::EMPTY.fen_char());
        assert_eq!(Some('N'), PieceCode::try_from(2).unwrap().fen_char());
        assert_eq!(Some('q'), PieceCode::try_from(-5).unwrap().fen_char());
    }

    #[test]
    fn test_field_position_try_new() {
        let pos = FieldPosition::try_new(0, 0).unwrap();
        assert_eq!("a8", pos.to_string());
        let pos = FieldPosition::try_new(7, 7).unwrap();
        assert_eq!("h1", pos.to_string());
        assert_eq!(Err(IndexOutOfBounds(8, 0, 7)), FieldPosition::try_new(8, 0));
        assert_eq!(Err(IndexOutOfBounds(9, 0, 7)), FieldPosition::try_new(0, 9));
    }

    #[test]
    fn test_field_position_from_str() {
        let pos = "e4".parse::<FieldPosition>().unwrap();
        assert_eq!(4, pos.row());
        assert_eq!(4, pos.col());
        assert_eq!("e4", pos.to_string());

        let pos = "A8".parse::<FieldPosition>().unwrap();
        assert_eq!((0, 0), (pos.row(), pos.col()));

        assert!("i1".parse::<FieldPosition>().is_err());
        assert!("a9".parse::<FieldPosition>().is_err());
        assert!("a".parse::<FieldPosition>().is_err());
        assert!("a10".parse::<FieldPosition>().is_err());
    }

    #[test]
    fn test_field_position_is_dark_field() {
        assert!(!FieldPosition::try_new(0, 0).unwrap().is_dark_field());
        assert!(FieldPosition::try_new(0, 1).unwrap().is_dark_field());
        assert!(FieldPosition::try_new(7, 0).unwrap().is_dark_field());
        assert!(!FieldPosition::try_new(7, 7).unwrap().is_dark_field());
    }

    #[test]
    fn test_field_position_all() {
        let positions = FieldPosition::all().collect::<Vec<_>>();
        assert_eq!(64, positions.len());
        assert_eq!(FieldPosition::try_new(0, 0).unwrap(), positions[0]);
        assert_eq!(FieldPosition::try_new(0, 1).unwrap(), positions[1]);
        assert_eq!(FieldPosition::try_new(7, 7).unwrap(), positions[63]);
    }

    #[test]
    fn test_board_state_from_codes() {
        let mut codes = [[0; 8]; 8];
        codes[0][1] = -2;
        codes[7][4] = 6;
        let board = BoardState::from_codes(codes).unwrap();

        assert_eq!(64, board.field_iter().count());
        assert_eq!(-2, board.get(&"b8".parse().unwrap()).value());
        assert_eq!(6, board.get(&"e1".parse().unwrap()).value());
        assert_eq!(
            2,
            board.field_iter().filter(|(_, code)| !code.is_empty()).count()
        );
    }

    #[test]
    fn test_board_state_from_codes_rejects_invalid_codes() {
        let mut codes = [[0; 8]; 8];
        codes[3][3] = 12;
        assert_eq!(Err(InvalidPieceCode(12)), BoardState::from_codes(codes));
    }

    #[test]
    fn test_board_state_display() {
        let mut board = BoardState::empty();
        board.set(
            &"a8".parse().unwrap(),
            PieceCode::new(PieceColour::Black, PieceKind::Rook),
        );
        let printed = board.to_string();
        assert!(printed.contains("8 | r |   |"));
        assert!(printed.contains(" a   b   c "));
    }
}
