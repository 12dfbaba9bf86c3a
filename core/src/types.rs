/// Single coordinate axis used for the grid size and for positions.
pub type Coord = u8;

/// Count type used for mine counts and total-cell counts.
pub type CellCount = u16;

/// Two-dimensional coordinates `(row, column)`.
pub type Coord2 = (Coord, Coord);

/// Smallest grid that can hold at least one mine and one safe cell.
pub const MIN_GRID_SIZE: Coord = 2;

/// Largest grid, bounded so every column keeps a single-letter label.
pub const MAX_GRID_SIZE: Coord = 26;

pub const GRID_SIZE_PRESETS: [Coord; 3] = [3, 5, 7];

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    let a = a as CellCount;
    let b = b as CellCount;
    a.saturating_mul(b)
}

/// Human label of a cell: column letter followed by the 1-based row, `(0, 0)` is `A1`.
pub fn cell_label((row, col): Coord2) -> String {
    let letter = char::from(b'A'.saturating_add(col));
    format!("{}{}", letter, u16::from(row) + 1)
}

/// Inverse of [`cell_label`], case-insensitive. Bounds are not checked against any grid.
pub fn parse_cell_label(label: &str) -> Option<Coord2> {
    let label = label.trim();
    let mut chars = label.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if !letter.is_ascii_uppercase() {
        return None;
    }
    let col = letter as u8 - b'A';
    let row: u16 = chars.as_str().parse().ok()?;
    let row = Coord::try_from(row.checked_sub(1)?).ok()?;
    Some((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_use_column_letter_and_one_based_row() {
        assert_eq!(cell_label((0, 0)), "A1");
        assert_eq!(cell_label((4, 2)), "C5");
        assert_eq!(cell_label((9, 25)), "Z10");
    }

    #[test]
    fn parse_label_accepts_lowercase_and_rejects_garbage() {
        assert_eq!(parse_cell_label("c5"), Some((4, 2)));
        assert_eq!(parse_cell_label(" A1 "), Some((0, 0)));
        assert_eq!(parse_cell_label("A0"), None);
        assert_eq!(parse_cell_label("11"), None);
        assert_eq!(parse_cell_label(""), None);
    }

    #[test]
    fn mult_saturates() {
        assert_eq!(mult(5, 5), 25);
        assert_eq!(mult(Coord::MAX, Coord::MAX), 65025);
    }
}
