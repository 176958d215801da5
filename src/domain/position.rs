//! Textual starting-position notation for hex-board layouts.
//!
//! A position is written as one line per row. Cells are separated by single
//! spaces and odd rows carry one leading space, so the text lines up as a hex
//! offset grid:
//!
//! ```text
//! r n la k
//!  p p p
//! . . . .
//!  P P P
//! R N La K
//! ```
//!
//! `.` is an empty cell. A piece is one letter, optionally followed by a
//! lowercase variant letter. Upper-case pieces belong to [`Side::Upper`],
//! lower-case pieces to [`Side::Lower`]. Row 0 is the first line of the text.
//! Dimensions are inferred from the rows and never stored separately.

use std::{fmt, str::FromStr};

use nonempty::NonEmpty;

/// One of the two players, identified by the case of its piece letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Pieces written with an upper-case letter.
    Upper,
    /// Pieces written with a lower-case letter.
    Lower,
}

impl Side {
    /// The other player.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Upper => Self::Lower,
            Self::Lower => Self::Upper,
        }
    }
}

/// A piece token such as `K`, `p` or `La`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    letter: char,
    variant: Option<char>,
    side: Side,
}

impl Piece {
    /// Create a piece.
    ///
    /// `letter` is normalised to upper case and `variant` to lower case; the
    /// owning side is carried separately.
    ///
    /// # Errors
    ///
    /// Returns an error if either character is not an ASCII letter.
    pub fn new(letter: char, variant: Option<char>, side: Side) -> Result<Self, InvalidPiece> {
        if !letter.is_ascii_alphabetic() || variant.is_some_and(|v| !v.is_ascii_alphabetic()) {
            return Err(InvalidPiece);
        }
        Ok(Self {
            letter: letter.to_ascii_uppercase(),
            variant: variant.map(|v| v.to_ascii_lowercase()),
            side,
        })
    }

    /// The piece letter, always upper case.
    #[must_use]
    pub const fn letter(&self) -> char {
        self.letter
    }

    /// The variant letter, if any, always lower case.
    #[must_use]
    pub const fn variant(&self) -> Option<char> {
        self.variant
    }

    /// The owning side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// The same piece owned by the other side.
    #[must_use]
    pub const fn swapped(self) -> Self {
        Self {
            side: self.side.opponent(),
            ..self
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.side {
            Side::Upper => self.letter,
            Side::Lower => self.letter.to_ascii_lowercase(),
        };
        write!(f, "{letter}")?;
        if let Some(variant) = self.variant {
            write!(f, "{variant}")?;
        }
        Ok(())
    }
}

/// Returned by [`Piece::new`] for non-letter input.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("piece letters must be ASCII letters")]
pub struct InvalidPiece;

/// A single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// `.`
    Empty,
    /// A piece token.
    Piece(Piece),
}

impl Cell {
    fn parse(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('.'), None, None) => Some(Self::Empty),
            (Some(letter), variant, None) if letter.is_ascii_alphabetic() => {
                if variant.is_some_and(|v| !v.is_ascii_lowercase()) {
                    return None;
                }
                let side = if letter.is_ascii_uppercase() {
                    Side::Upper
                } else {
                    Side::Lower
                };
                Piece::new(letter, variant, side).ok().map(Self::Piece)
            }
            _ => None,
        }
    }

    /// The piece in this cell, if any.
    #[must_use]
    pub const fn piece(&self) -> Option<&Piece> {
        match self {
            Self::Empty => None,
            Self::Piece(piece) => Some(piece),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "."),
            Self::Piece(piece) => fmt::Display::fmt(piece, f),
        }
    }
}

/// A parsed position: a non-empty list of rows of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    rows: NonEmpty<Vec<Cell>>,
}

impl Position {
    /// Build a position from rows.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::Empty`] if there are no rows, and
    /// [`PositionError::EmptyRow`] if any row has no cells.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, PositionError> {
        if let Some(row) = rows.iter().position(Vec::is_empty) {
            return Err(PositionError::EmptyRow { row });
        }
        NonEmpty::from_vec(rows)
            .map(|rows| Self { rows })
            .ok_or(PositionError::Empty)
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of cells in row `row`, or `None` if the row doesn't exist.
    #[must_use]
    pub fn row_len(&self, row: usize) -> Option<usize> {
        self.rows.get(row).map(Vec::len)
    }

    /// The width of the widest row.
    #[must_use]
    pub fn max_row_len(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or_default()
    }

    /// The rows, top first.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// The cell at `(row, col)`.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)
    }

    /// Every piece with its `(row, col)` location, in reading order.
    pub fn pieces(&self) -> impl Iterator<Item = (usize, usize, &Piece)> {
        self.rows.iter().enumerate().flat_map(|(r, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(c, cell)| cell.piece().map(|piece| (r, c, piece)))
        })
    }

    /// Number of pieces owned by `side`.
    #[must_use]
    pub fn count(&self, side: Side) -> usize {
        self.pieces().filter(|(_, _, p)| p.side() == side).count()
    }

    /// The same layout seen from the other player: row order reversed and
    /// piece ownership swapped.
    ///
    /// Row offsets are positional, so a position with an even number of rows
    /// changes which physical rows are indented. The cells themselves are
    /// preserved.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        let mut rows: Vec<Vec<Cell>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Cell::Empty => Cell::Empty,
                        Cell::Piece(piece) => Cell::Piece(piece.swapped()),
                    })
                    .collect()
            })
            .collect();
        rows.reverse();
        NonEmpty::from_vec(rows).map_or_else(|| self.clone(), |rows| Self { rows })
    }
}

/// Parse a position from its textual notation.
///
/// # Errors
///
/// See [`PositionError`].
pub fn parse_position(input: &str) -> Result<Position, PositionError> {
    let lines: Vec<&str> = input.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|line| !line.is_empty());
    let end = lines.iter().rposition(|line| !line.is_empty());
    let (Some(start), Some(end)) = (start, end) else {
        return Err(PositionError::Empty);
    };

    let rows = lines[start..=end]
        .iter()
        .enumerate()
        .map(|(row, line)| parse_row(row, line))
        .collect::<Result<Vec<_>, _>>()?;

    Position::from_rows(rows)
}

fn parse_row(row: usize, line: &str) -> Result<Vec<Cell>, PositionError> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let expected = row % 2;
    if indent != expected {
        return Err(PositionError::Indentation {
            row,
            expected,
            found: indent,
        });
    }

    let mut cells = Vec::new();
    let mut column = indent + 1;
    for token in line[indent..].split(' ') {
        if token.is_empty() {
            return Err(PositionError::EmptyToken { row, column });
        }
        let cell = Cell::parse(token).ok_or_else(|| PositionError::InvalidToken {
            row,
            column,
            token: token.to_string(),
        })?;
        cells.push(cell);
        column += token.len() + 1;
    }
    Ok(cells)
}

/// Serialize a position to its canonical textual notation.
///
/// Rows are joined with `\n`, odd rows get one leading space and there is no
/// trailing newline.
#[must_use]
pub fn serialize_position(position: &Position) -> String {
    position.to_string()
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.rows.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            if index % 2 == 1 {
                write!(f, " ")?;
            }
            for (col, cell) in row.iter().enumerate() {
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{cell}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_position(s)
    }
}

/// Errors raised while parsing the position notation.
///
/// Rows are 0-based; columns are 1-based character offsets within the line.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PositionError {
    /// The input contained no rows.
    #[error("position is empty")]
    Empty,

    /// A row contained no cells.
    #[error("row {row} has no cells")]
    EmptyRow {
        /// The row index.
        row: usize,
    },

    /// A row had the wrong number of leading spaces.
    #[error("row {row}: expected {expected} leading space(s), found {found}")]
    Indentation {
        /// The row index.
        row: usize,
        /// Leading spaces required for this row.
        expected: usize,
        /// Leading spaces present.
        found: usize,
    },

    /// Two separators appeared next to each other.
    #[error("row {row}, column {column}: cells must be separated by a single space")]
    EmptyToken {
        /// The row index.
        row: usize,
        /// Column where the empty token starts.
        column: usize,
    },

    /// A token was not `.`, a letter, or a letter plus a lowercase variant.
    #[error("row {row}, column {column}: invalid cell '{token}'")]
    InvalidToken {
        /// The row index.
        row: usize,
        /// Column where the token starts.
        column: usize,
        /// The offending token.
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    const SAMPLE: &str = "r n la k\n p p p\n. . . .\n P P P\nR N La K";

    #[test]
    fn parses_sample() {
        let position = parse_position(SAMPLE).unwrap();

        assert_eq!(position.row_count(), 5);
        assert_eq!(position.row_len(0), Some(4));
        assert_eq!(position.row_len(1), Some(3));
        assert_eq!(position.max_row_len(), 4);
        assert_eq!(position.count(Side::Upper), 7);
        assert_eq!(position.count(Side::Lower), 7);

        let lance = position.cell(4, 2).and_then(Cell::piece).unwrap();
        assert_eq!(lance.letter(), 'L');
        assert_eq!(lance.variant(), Some('a'));
        assert_eq!(lance.side(), Side::Upper);

        let black_lance = position.cell(0, 2).and_then(Cell::piece).unwrap();
        assert_eq!(black_lance.side(), Side::Lower);
        assert_eq!(black_lance.to_string(), "la");

        assert_eq!(position.cell(2, 0), Some(&Cell::Empty));
        assert_eq!(position.cell(9, 0), None);
    }

    #[test]
    fn serialize_is_canonical() {
        let position = parse_position(SAMPLE).unwrap();
        assert_eq!(serialize_position(&position), SAMPLE);
    }

    #[test]
    fn surrounding_blank_lines_and_trailing_spaces_are_ignored() {
        let input = "\n\nK .  \n . k\n\n";
        let position: Position = input.parse().unwrap();
        assert_eq!(position.to_string(), "K .\n . k");
    }

    #[test]
    fn pieces_are_listed_in_reading_order() {
        let position = parse_position("K .\n . q").unwrap();
        let found: Vec<(usize, usize, String)> = position
            .pieces()
            .map(|(r, c, p)| (r, c, p.to_string()))
            .collect();
        assert_eq!(
            found,
            [(0, 0, "K".to_string()), (1, 1, "q".to_string())]
        );
    }

    #[test]
    fn mirrored_flips_rows_and_sides() {
        let position = parse_position("K .\n . q\nP").unwrap();
        let mirrored = position.mirrored();
        assert_eq!(mirrored.to_string(), "p\n . Q\nk .");
        assert_eq!(mirrored.mirrored(), position);
    }

    #[test_case("", PositionError::Empty; "empty input")]
    #[test_case("\n  \n", PositionError::Empty; "only whitespace")]
    #[test_case(" K", PositionError::Indentation { row: 0, expected: 0, found: 1 }; "even row indented")]
    #[test_case("K\nK", PositionError::Indentation { row: 1, expected: 1, found: 0 }; "odd row not indented")]
    #[test_case("K\n  K", PositionError::Indentation { row: 1, expected: 1, found: 2 }; "odd row over indented")]
    #[test_case("K  .", PositionError::EmptyToken { row: 0, column: 3 }; "double space")]
    #[test_case("K LA", PositionError::InvalidToken { row: 0, column: 3, token: "LA".to_string() }; "uppercase variant")]
    #[test_case(". Kab", PositionError::InvalidToken { row: 0, column: 3, token: "Kab".to_string() }; "three letters")]
    #[test_case("K\n 1", PositionError::InvalidToken { row: 1, column: 2, token: "1".to_string() }; "digit")]
    #[test_case("..", PositionError::InvalidToken { row: 0, column: 1, token: "..".to_string() }; "double dot")]
    fn rejects(input: &str, expected: PositionError) {
        assert_eq!(parse_position(input), Err(expected));
    }

    #[test]
    fn from_rows_rejects_empty_rows() {
        assert_eq!(Position::from_rows(vec![]), Err(PositionError::Empty));
        assert_eq!(
            Position::from_rows(vec![vec![Cell::Empty], vec![]]),
            Err(PositionError::EmptyRow { row: 1 })
        );
    }

    #[test]
    fn piece_normalises_case() {
        let piece = Piece::new('l', Some('B'), Side::Lower).unwrap();
        assert_eq!(piece.letter(), 'L');
        assert_eq!(piece.variant(), Some('b'));
        assert_eq!(piece.to_string(), "lb");
        assert_eq!(Piece::new('1', None, Side::Upper), Err(InvalidPiece));
    }
}
