use serde::{Deserialize, Serialize};

/// What a grid cell hides.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellContent {
    Mine,
    Safe,
}

impl CellContent {
    pub const fn is_mine(self) -> bool {
        matches!(self, Self::Mine)
    }

    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Safe)
    }
}

impl Default for CellContent {
    fn default() -> Self {
        Self::Safe
    }
}
