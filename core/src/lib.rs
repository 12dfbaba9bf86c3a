use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use analysis::*;
pub use cell::*;
pub use engine::*;
pub use error::*;
pub use generator::*;
pub use history::*;
pub use prediction::*;
pub use probability::*;
pub use session::*;
pub use settings::*;
pub use types::*;

mod analysis;
mod cell;
mod engine;
mod error;
mod generator;
mod history;
mod prediction;
mod probability;
mod session;
mod settings;
mod types;

/// Normalized size and mine count of a round. The grid is always square.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub size: Coord,
    pub mines: CellCount,
}

impl GameConfig {
    pub const fn new_unchecked(size: Coord, mines: CellCount) -> Self {
        Self { size, mines }
    }

    /// Clamps the size into `[MIN_GRID_SIZE, MAX_GRID_SIZE]` and the mines into `[1, size² - 1]`.
    pub fn new(size: Coord, mines: CellCount) -> Self {
        let clamped_size = size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE);
        let clamped_mines = mines.clamp(1, max_mines(clamped_size));
        if clamped_size != size || clamped_mines != mines {
            log::warn!(
                "Adjusted game config from {}x{} with {} mines to {}x{} with {} mines",
                size,
                size,
                mines,
                clamped_size,
                clamped_size,
                clamped_mines
            );
        }
        Self::new_unchecked(clamped_size, clamped_mines)
    }

    /// Same mine count at another size, lowered if it no longer fits but never raised.
    pub fn resized(self, size: Coord) -> Self {
        Self::new(size, self.mines)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size, self.size)
    }

    pub const fn safe_cells(&self) -> CellCount {
        self.total_cells() - self.mines
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new_unchecked(5, 3)
    }
}

/// Largest mine count that still leaves one safe cell.
pub const fn max_mines(size: Coord) -> CellCount {
    mult(size, size).saturating_sub(1)
}

/// The hidden content of every cell for one round. Immutable once generated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MineLayout {
    grid: Array2<CellContent>,
    mine_count: CellCount,
}

impl MineLayout {
    pub fn from_grid(grid: Array2<CellContent>) -> Result<Self> {
        let (rows, cols) = grid.dim();
        if rows != cols || rows == 0 || rows > usize::from(Coord::MAX) {
            return Err(GameError::InvalidBoardShape);
        }
        let mine_count = grid.iter().filter(|cell| cell.is_mine()).count();
        let mine_count = CellCount::try_from(mine_count).map_err(|_| GameError::TooManyMines)?;
        Ok(Self { grid, mine_count })
    }

    pub fn from_mine_coords(size: Coord, mine_coords: &[Coord2]) -> Result<Self> {
        let mut grid = Array2::from_elem((size, size).to_nd_index(), CellContent::Safe);

        for &coords in mine_coords {
            if coords.0 >= size || coords.1 >= size {
                return Err(GameError::InvalidCoords);
            }
            grid[coords.to_nd_index()] = CellContent::Mine;
        }

        let layout = Self::from_grid(grid)?;
        if layout.mine_count > max_mines(size) {
            return Err(GameError::TooManyMines);
        }
        Ok(layout)
    }

    pub fn game_config(&self) -> GameConfig {
        GameConfig::new_unchecked(self.size(), self.mine_count)
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let size = self.size();
        if coords.0 < size && coords.1 < size {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn size(&self) -> Coord {
        // from_grid guarantees the side fits in a Coord
        self.grid.nrows() as Coord
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn total_cells(&self) -> CellCount {
        mult(self.size(), self.size())
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.mine_count
    }

    pub fn content_at(&self, coords: Coord2) -> CellContent {
        self.grid[coords.to_nd_index()]
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Coord2, CellContent)> + '_ {
        self.grid
            .indexed_iter()
            .map(|((row, col), &cell)| ((row as Coord, col as Coord), cell))
    }
}

impl Index<Coord2> for MineLayout {
    type Output = CellContent;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.grid[coords.to_nd_index()]
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            HitMine => true,
            Won => true,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::HitMine | Self::Won)
    }
}
