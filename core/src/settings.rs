use serde::{Deserialize, Serialize};

use crate::*;

/// User-adjustable game settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid_size: Coord,
    pub num_mines: CellCount,
    /// Fixed layout seed for reproducible play, entropy when unset.
    pub seed: Option<u64>,
}

impl Settings {
    pub fn game_config(&self) -> GameConfig {
        GameConfig::new(self.grid_size, self.num_mines)
    }

    pub fn layout_generator(&self) -> RandomLayoutGenerator {
        match self.seed {
            Some(seed) => RandomLayoutGenerator::new(seed),
            None => RandomLayoutGenerator::from_entropy(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        let config = GameConfig::default();
        Self {
            grid_size: config.size,
            num_mines: config.mines,
            seed: None,
        }
    }
}
