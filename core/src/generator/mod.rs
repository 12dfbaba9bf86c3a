use crate::*;
pub use random::*;

mod random;

/// Produces the hidden layout of a new round.
pub trait LayoutGenerator {
    /// Must place exactly `config.mines` mines on a `config.size` square grid.
    fn generate(&mut self, config: GameConfig) -> MineLayout;
}

/// Fixed layouts handed out in order, then repeated from the start. Useful for scripted play.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedLayoutGenerator {
    layouts: Vec<MineLayout>,
    next: usize,
}

impl FixedLayoutGenerator {
    /// # Panics
    /// If `layouts` is empty.
    pub fn new(layouts: Vec<MineLayout>) -> Self {
        assert!(!layouts.is_empty(), "at least one layout is required");
        Self { layouts, next: 0 }
    }
}

impl LayoutGenerator for FixedLayoutGenerator {
    fn generate(&mut self, config: GameConfig) -> MineLayout {
        let layout = self.layouts[self.next % self.layouts.len()].clone();
        self.next += 1;
        if layout.game_config() != config {
            log::warn!(
                "Fixed layout {:?} does not match requested {:?}",
                layout.game_config(),
                config
            );
        }
        layout
    }
}
