use chrono::Utc;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    #[default]
    InProgress,
    Won,
    Lost,
}

impl RoundStatus {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }

    pub const fn is_victory(self) -> bool {
        matches!(self, Self::Won)
    }

    pub const fn outcome(self) -> Option<Outcome> {
        match self {
            Self::InProgress => None,
            Self::Won => Some(Outcome::Win),
            Self::Lost => Some(Outcome::Loss),
        }
    }
}

/// Identity of a round, strictly increasing across `new_game` calls of one engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId(u64);

impl RoundId {
    pub const fn get(self) -> u64 {
        self.0
    }

    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Snapshot of a round. Transitions build a new value instead of mutating this one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    layout: MineLayout,
    revealed: Array2<bool>,
    revealed_count: CellCount,
    revealed_safe: CellCount,
    status: RoundStatus,
}

impl GameState {
    pub fn new(layout: MineLayout) -> Self {
        let size = layout.size();
        Self {
            layout,
            revealed: Array2::from_elem((size, size).to_nd_index(), false),
            revealed_count: 0,
            revealed_safe: 0,
            status: RoundStatus::InProgress,
        }
    }

    pub fn grid_size(&self) -> Coord {
        self.layout.size()
    }

    pub fn num_mines(&self) -> CellCount {
        self.layout.mine_count()
    }

    pub fn config(&self) -> GameConfig {
        self.layout.game_config()
    }

    pub fn layout(&self) -> &MineLayout {
        &self.layout
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn is_game_over(&self) -> bool {
        self.status.is_finished()
    }

    /// Only meaningful once [`is_game_over`](Self::is_game_over) holds.
    pub fn is_victory(&self) -> bool {
        self.status.is_victory()
    }

    pub fn contains(&self, coords: Coord2) -> bool {
        self.layout.validate_coords(coords).is_ok()
    }

    pub fn content_at(&self, coords: Coord2) -> CellContent {
        self.layout.content_at(coords)
    }

    pub fn is_revealed(&self, coords: Coord2) -> bool {
        self.revealed[coords.to_nd_index()]
    }

    pub fn total_cells(&self) -> CellCount {
        self.layout.total_cells()
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count
    }

    pub fn revealed_safe_count(&self) -> CellCount {
        self.revealed_safe
    }

    pub fn remaining_cells(&self) -> CellCount {
        self.total_cells() - self.revealed_count
    }

    pub fn unrevealed_safe_count(&self) -> CellCount {
        self.layout.safe_cell_count() - self.revealed_safe
    }

    /// State after revealing `coords`, or `None` when the reveal is a no-op
    /// (round already over or cell already revealed).
    pub fn after_reveal(&self, coords: Coord2) -> Result<Option<Self>> {
        let coords = self.layout.validate_coords(coords)?;

        if self.status.is_finished() || self.is_revealed(coords) {
            return Ok(None);
        }

        let mut next = self.clone();
        next.revealed[coords.to_nd_index()] = true;
        next.revealed_count += 1;

        next.status = match self.layout[coords] {
            CellContent::Mine => RoundStatus::Lost,
            CellContent::Safe => {
                next.revealed_safe += 1;
                if next.unrevealed_safe_count() == 0 {
                    RoundStatus::Won
                } else {
                    RoundStatus::InProgress
                }
            }
        };
        log::trace!("revealed {:?}, status now {:?}", coords, next.status);

        Ok(Some(next))
    }
}

/// Owns the live [`GameState`] and the finished-round log.
#[derive(Clone, Debug)]
pub struct GameEngine<G = RandomLayoutGenerator> {
    generator: G,
    config: GameConfig,
    round: RoundId,
    state: Option<GameState>,
    history: HistoryLog,
}

impl<G: LayoutGenerator> GameEngine<G> {
    /// An engine with no round yet, [`new_game`](Self::new_game) starts one.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            config: GameConfig::default(),
            round: RoundId::default(),
            state: None,
            history: HistoryLog::new(),
        }
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn status(&self) -> Option<RoundStatus> {
        self.state.as_ref().map(GameState::status)
    }

    /// Replaces the current round with a fresh layout. Out-of-range values are clamped.
    pub fn new_game(&mut self, size: Coord, mines: CellCount) -> RoundId {
        self.start(GameConfig::new(size, mines))
    }

    /// Starts over at `size`, keeping the mine count unless it no longer fits.
    pub fn change_grid_size(&mut self, size: Coord) -> RoundId {
        self.start(self.config.resized(size))
    }

    pub fn restart(&mut self) -> RoundId {
        self.start(self.config)
    }

    fn start(&mut self, config: GameConfig) -> RoundId {
        let layout = self.generator.generate(config);
        self.config = layout.game_config();
        self.state = Some(GameState::new(layout));
        self.round = self.round.next();
        log::debug!(
            "round {} started: {}x{} with {} mines",
            self.round.get(),
            self.config.size,
            self.config.size,
            self.config.mines
        );
        self.round
    }

    /// Reveals one cell. Repeated reveals and reveals after the round ended are no-ops.
    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let Some(state) = self.state.as_ref() else {
            return Ok(RevealOutcome::NoChange);
        };

        let Some(next) = state.after_reveal(coords)? else {
            return Ok(RevealOutcome::NoChange);
        };

        let outcome = match next.status() {
            RoundStatus::InProgress => RevealOutcome::Revealed,
            RoundStatus::Won => RevealOutcome::Won,
            RoundStatus::Lost => RevealOutcome::HitMine,
        };
        if let Some(result) = next.status().outcome() {
            self.history.record(next.config(), result, Utc::now());
        }
        self.state = Some(next);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord, mines: &[Coord2]) -> MineLayout {
        MineLayout::from_mine_coords(size, mines).unwrap()
    }

    fn engine_with(layouts: Vec<MineLayout>) -> GameEngine<FixedLayoutGenerator> {
        let config = layouts[0].game_config();
        let mut engine = GameEngine::new(FixedLayoutGenerator::new(layouts));
        engine.new_game(config.size, config.mines);
        engine
    }

    fn safe_cells(state: &GameState) -> Vec<Coord2> {
        state
            .layout()
            .iter()
            .filter(|(_, cell)| cell.is_safe())
            .map(|(coords, _)| coords)
            .collect()
    }

    #[test]
    fn reveal_before_any_round_is_no_change() {
        let mut engine = GameEngine::new(RandomLayoutGenerator::new(1));
        assert_eq!(engine.reveal((0, 0)).unwrap(), RevealOutcome::NoChange);
        assert!(engine.state().is_none());
    }

    #[test]
    fn hitting_a_mine_loses_and_logs_once() {
        let mut engine = engine_with(vec![layout(3, &[(1, 1)])]);

        assert_eq!(engine.reveal((0, 0)).unwrap(), RevealOutcome::Revealed);
        assert_eq!(engine.reveal((1, 1)).unwrap(), RevealOutcome::HitMine);

        let state = engine.state().unwrap();
        assert!(state.is_game_over());
        assert!(!state.is_victory());
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history().latest().unwrap().outcome, Outcome::Loss);
    }

    #[test]
    fn revealing_last_safe_cell_wins() {
        let mut engine = engine_with(vec![layout(2, &[(0, 0)])]);

        assert_eq!(engine.reveal((0, 1)).unwrap(), RevealOutcome::Revealed);
        assert_eq!(engine.reveal((1, 0)).unwrap(), RevealOutcome::Revealed);
        assert_eq!(engine.reveal((1, 1)).unwrap(), RevealOutcome::Won);

        let state = engine.state().unwrap();
        assert!(state.is_game_over());
        assert!(state.is_victory());
        assert!(!state.is_revealed((0, 0)));
        assert_eq!(engine.history().latest().unwrap().outcome, Outcome::Win);
    }

    #[test]
    fn repeated_reveal_is_idempotent() {
        let mut engine = engine_with(vec![layout(3, &[(2, 2)])]);

        assert_eq!(engine.reveal((0, 0)).unwrap(), RevealOutcome::Revealed);
        let before = engine.state().cloned();
        assert_eq!(engine.reveal((0, 0)).unwrap(), RevealOutcome::NoChange);
        assert_eq!(engine.state().cloned(), before);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn no_reveal_accepted_after_round_ends() {
        let mut engine = engine_with(vec![layout(2, &[(0, 0)])]);

        engine.reveal((0, 0)).unwrap();
        let finished = engine.state().cloned();

        assert_eq!(engine.reveal((1, 1)).unwrap(), RevealOutcome::NoChange);
        assert_eq!(engine.reveal((0, 0)).unwrap(), RevealOutcome::NoChange);
        assert_eq!(engine.state().cloned(), finished);
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn out_of_range_reveal_is_an_error_without_side_effects() {
        let mut engine = engine_with(vec![layout(2, &[(0, 0)])]);

        assert_eq!(engine.reveal((2, 0)), Err(GameError::InvalidCoords));
        assert_eq!(engine.state().unwrap().revealed_count(), 0);
    }

    #[test]
    fn transitions_do_not_touch_previous_snapshot() {
        let state = GameState::new(layout(2, &[(0, 0)]));

        let next = state.after_reveal((1, 1)).unwrap().unwrap();

        assert!(!state.is_revealed((1, 1)));
        assert!(next.is_revealed((1, 1)));
        assert_eq!(next.revealed_count(), 1);
        assert_eq!(next.unrevealed_safe_count(), 2);
    }

    #[test]
    fn random_rounds_win_by_revealing_every_safe_cell() {
        let mut engine = GameEngine::new(RandomLayoutGenerator::new(99));
        engine.new_game(3, 1);

        let cells = safe_cells(engine.state().unwrap());
        assert_eq!(cells.len(), 8);
        let (last, rest) = cells.split_last().unwrap();
        for &coords in rest {
            assert_eq!(engine.reveal(coords).unwrap(), RevealOutcome::Revealed);
        }
        assert_eq!(engine.reveal(*last).unwrap(), RevealOutcome::Won);
        assert!(engine.state().unwrap().is_victory());
    }

    #[test]
    fn new_game_advances_round_and_resets_board() {
        let mut engine = GameEngine::new(RandomLayoutGenerator::new(5));
        let first = engine.new_game(5, 3);
        engine.reveal((0, 0)).unwrap();
        let second = engine.new_game(5, 3);

        assert!(second > first);
        assert_eq!(engine.state().unwrap().revealed_count(), 0);
        assert_eq!(engine.status(), Some(RoundStatus::InProgress));
    }

    #[test]
    fn new_game_clamps_invalid_mine_count() {
        let mut engine = GameEngine::new(RandomLayoutGenerator::new(5));
        engine.new_game(3, 9);
        assert_eq!(engine.config(), GameConfig::new_unchecked(3, 8));
        assert_eq!(engine.state().unwrap().num_mines(), 8);
    }

    #[test]
    fn change_grid_size_keeps_mines_when_they_fit() {
        let mut engine = GameEngine::new(RandomLayoutGenerator::new(5));
        engine.new_game(5, 3);

        engine.change_grid_size(3);
        assert_eq!(engine.config(), GameConfig::new_unchecked(3, 3));
        assert_eq!(engine.state().unwrap().grid_size(), 3);

        engine.new_game(5, 20);
        engine.change_grid_size(3);
        assert_eq!(engine.config().mines, 8);
    }
}
