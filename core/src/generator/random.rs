use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::SmallRng;

use crate::*;

/// Retry budget per mine before rejection sampling gives way to picking among free cells.
const ATTEMPTS_PER_MINE: u32 = 1_000;

/// Uniform placement without replacement: pick a random cell, retry when it already holds a mine.
#[derive(Clone, Debug)]
pub struct RandomLayoutGenerator {
    rng: SmallRng,
}

impl RandomLayoutGenerator {
    pub fn new(seed: u64) -> Self {
        log::debug!("layout seed: {}", seed);
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }
}

impl LayoutGenerator for RandomLayoutGenerator {
    fn generate(&mut self, config: GameConfig) -> MineLayout {
        let size = config.size;
        let mut grid = Array2::from_elem((size, size).to_nd_index(), CellContent::Safe);
        let target = config.mines.min(max_mines(size));
        if target != config.mines {
            log::warn!(
                "Requested {} mines but a {}x{} grid fits at most {}",
                config.mines,
                size,
                size,
                target
            );
        }

        let budget = u32::from(target).saturating_mul(ATTEMPTS_PER_MINE);
        let mut attempts = 0u32;
        let mut placed: CellCount = 0;
        while placed < target && attempts < budget {
            attempts += 1;
            let coords = (
                self.rng.random_range(0..size),
                self.rng.random_range(0..size),
            );
            let cell = &mut grid[coords.to_nd_index()];
            if cell.is_safe() {
                *cell = CellContent::Mine;
                placed += 1;
                log::trace!("Placed mine at {:?}", coords);
            }
        }

        if placed < target {
            log::warn!(
                "Rejection sampling stopped after {} attempts, placing {} remaining mines directly",
                attempts,
                target - placed
            );
            let mut free: Vec<[usize; 2]> = grid
                .indexed_iter()
                .filter(|(_, cell)| cell.is_safe())
                .map(|((row, col), _)| [row, col])
                .collect();
            while placed < target && !free.is_empty() {
                let pick = self.rng.random_range(0..free.len());
                grid[free.swap_remove(pick)] = CellContent::Mine;
                placed += 1;
            }
        }

        match MineLayout::from_grid(grid) {
            Ok(layout) => layout,
            // the grid is square by construction
            Err(err) => unreachable!("generated grid rejected: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_exact_mine_count_for_every_valid_config() {
        let mut generator = RandomLayoutGenerator::new(7);
        for size in MIN_GRID_SIZE..=7 {
            for mines in 1..=max_mines(size) {
                let layout = generator.generate(GameConfig::new(size, mines));
                assert_eq!(layout.size(), size);
                assert_eq!(layout.mine_count(), mines, "{size}x{size} with {mines}");
                let safe = layout.iter().filter(|(_, cell)| cell.is_safe()).count();
                assert_eq!(safe, usize::from(mult(size, size) - mines));
            }
        }
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let config = GameConfig::new(5, 3);
        let a = RandomLayoutGenerator::new(42).generate(config);
        let b = RandomLayoutGenerator::new(42).generate(config);
        assert_eq!(a, b);
    }

    #[test]
    fn consecutive_rounds_draw_fresh_layouts() {
        let config = GameConfig::new(7, 10);
        let mut generator = RandomLayoutGenerator::new(3);
        let layouts: Vec<_> = (0..5).map(|_| generator.generate(config)).collect();
        assert!(layouts.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn oversized_request_is_capped_to_leave_a_safe_cell() {
        let config = GameConfig::new_unchecked(3, 50);
        let layout = RandomLayoutGenerator::new(1).generate(config);
        assert_eq!(layout.mine_count(), 8);
    }

    #[test]
    fn fixed_generator_cycles() {
        let a = MineLayout::from_mine_coords(2, &[(0, 0)]).unwrap();
        let b = MineLayout::from_mine_coords(2, &[(1, 1)]).unwrap();
        let mut generator = FixedLayoutGenerator::new(vec![a.clone(), b.clone()]);
        let config = GameConfig::new(2, 1);

        assert_eq!(generator.generate(config), a);
        assert_eq!(generator.generate(config), b);
        assert_eq!(generator.generate(config), a);
    }
}
