use core::fmt;

use crate::*;

pub const CREDENTIAL_PICKER_UNAVAILABLE: &str =
    "API key selection is not available in this environment.";

/// Capabilities injected by the host, resolved once at startup.
pub struct SessionConfig {
    pub settings: Settings,
    pub analyzer: Box<dyn Analyzer>,
    pub credential_picker: Option<Box<dyn CredentialPicker>>,
}

impl SessionConfig {
    pub fn new(settings: Settings, analyzer: impl Analyzer + 'static) -> Self {
        Self {
            settings,
            analyzer: Box::new(analyzer),
            credential_picker: None,
        }
    }

    pub fn with_credential_picker(mut self, picker: impl CredentialPicker + 'static) -> Self {
        self.credential_picker = Some(Box::new(picker));
        self
    }
}

/// What the presentation layer should draw for one cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CellView<'a> {
    Hidden {
        prediction: Option<&'a Prediction>,
    },
    /// Unrevealed but shown through the debug reveal toggle.
    Exposed {
        content: CellContent,
        prediction: Option<&'a Prediction>,
    },
    Revealed(CellContent),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SessionStats {
    pub confidence: f64,
    pub prediction_count: usize,
    pub revealed_count: CellCount,
    pub remaining_cells: CellCount,
    pub status: Option<RoundStatus>,
}

/// The game as the player sees it: the engine plus the prediction overlay and analysis lifecycle.
pub struct Session<G = RandomLayoutGenerator> {
    engine: GameEngine<G>,
    predictions: PredictionReconciler,
    analysis: AnalysisState,
    last_request: RequestId,
    analyzer: Box<dyn Analyzer>,
    credential_picker: Option<Box<dyn CredentialPicker>>,
    debug_reveal: bool,
    settings_open: bool,
}

impl Session<RandomLayoutGenerator> {
    /// Creates the session and starts the first round from the configured settings.
    pub fn new(config: SessionConfig) -> Self {
        let generator = config.settings.layout_generator();
        Self::with_generator(config, generator)
    }
}

impl<G: LayoutGenerator> Session<G> {
    pub fn with_generator(config: SessionConfig, generator: G) -> Self {
        let SessionConfig {
            settings,
            analyzer,
            credential_picker,
        } = config;
        let mut session = Self {
            engine: GameEngine::new(generator),
            predictions: PredictionReconciler::new(),
            analysis: AnalysisState::Idle,
            last_request: RequestId::default(),
            analyzer,
            credential_picker,
            debug_reveal: false,
            settings_open: false,
        };
        let config = settings.game_config();
        session.start_new_round(config.size, config.mines);
        session
    }

    pub fn engine(&self) -> &GameEngine<G> {
        &self.engine
    }

    pub fn state(&self) -> Option<&GameState> {
        self.engine.state()
    }

    pub fn config(&self) -> GameConfig {
        self.engine.config()
    }

    pub fn round(&self) -> RoundId {
        self.engine.round()
    }

    pub fn history(&self) -> &HistoryLog {
        self.engine.history()
    }

    pub fn predictions(&self) -> &PredictionReconciler {
        &self.predictions
    }

    pub fn analysis(&self) -> &AnalysisState {
        &self.analysis
    }

    pub fn is_analyzing(&self) -> bool {
        self.analysis.is_pending()
    }

    pub fn analysis_text(&self) -> Option<&str> {
        self.analysis.text()
    }

    pub fn error_message(&self) -> Option<String> {
        self.analysis.failure().map(|failure| failure.to_string())
    }

    pub fn debug_reveal(&self) -> bool {
        self.debug_reveal
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    pub fn confidence(&self) -> f64 {
        safe_confidence(self.state())
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.state();
        SessionStats {
            confidence: self.confidence(),
            prediction_count: self.predictions.len(),
            revealed_count: state.map_or(0, GameState::revealed_count),
            remaining_cells: state.map_or(0, GameState::remaining_cells),
            status: state.map(GameState::status),
        }
    }

    /// Read-only view of a cell, `None` outside the grid.
    pub fn cell_view(&self, coords: Coord2) -> Option<CellView<'_>> {
        let state = self.state()?;
        if !state.contains(coords) {
            return None;
        }
        let content = state.content_at(coords);
        if state.is_revealed(coords) {
            return Some(CellView::Revealed(content));
        }
        let prediction = self.predictions.lookup(coords, state);
        Some(if self.debug_reveal {
            CellView::Exposed {
                content,
                prediction,
            }
        } else {
            CellView::Hidden { prediction }
        })
    }

    pub fn start_new_round(&mut self, size: Coord, mines: CellCount) -> RoundId {
        let round = self.engine.new_game(size, mines);
        self.on_new_round(round)
    }

    /// New round with the current size and mine count.
    pub fn restart(&mut self) -> RoundId {
        let round = self.engine.restart();
        self.on_new_round(round)
    }

    pub fn change_grid_size(&mut self, size: Coord) -> RoundId {
        let round = self.engine.change_grid_size(size);
        self.on_new_round(round)
    }

    pub fn change_mine_count(&mut self, mines: CellCount) -> RoundId {
        self.start_new_round(self.config().size, mines)
    }

    fn on_new_round(&mut self, round: RoundId) -> RoundId {
        self.predictions.on_new_round(round);
        if let Some(ticket) = self.analysis.live_ticket() {
            log::debug!("abandoning analysis request {}", ticket.request.get());
        }
        self.analysis = AnalysisState::Idle;
        round
    }

    pub fn reveal_cell(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let outcome = self.engine.reveal(coords)?;
        if outcome.has_update() {
            self.predictions.on_reveal(coords);
        }
        Ok(outcome)
    }

    /// Issues an analysis of `image` for the current round.
    ///
    /// Predictions, summary and error are cleared up front, and any request still in flight is
    /// superseded: its response will be discarded by [`apply_analysis`](Self::apply_analysis).
    pub fn request_analysis(&mut self, image: ImagePayload) -> PendingAnalysis {
        self.last_request = self.last_request.next();
        let ticket = AnalysisTicket {
            round: self.round(),
            request: self.last_request,
        };
        if let Some(previous) = self.analysis.live_ticket() {
            log::debug!(
                "analysis request {} supersedes {}",
                ticket.request.get(),
                previous.request.get()
            );
        }
        self.predictions.clear();
        self.analysis = AnalysisState::Pending(ticket);

        log::debug!("issuing analysis request {:?} for {:?}", ticket, image);
        let call = self.analyzer.analyze(image, self.config().size);
        PendingAnalysis::new(ticket, call)
    }

    /// Applies a completed analysis if it still belongs to the live request.
    pub fn apply_analysis(&mut self, response: AnalysisResponse) -> AnalysisApplied {
        let AnalysisResponse { ticket, result } = response;

        if self.analysis.live_ticket() != Some(ticket) || ticket.round != self.round() {
            log::debug!("discarding stale analysis response {:?}", ticket);
            return AnalysisApplied::Discarded;
        }

        match result {
            Ok(report) => {
                let count = match self.engine.state() {
                    Some(state) => {
                        self.predictions
                            .set_predictions(ticket.round, state, report.predictions)
                    }
                    None => 0,
                };
                let text = if report.analysis_text.trim().is_empty() {
                    DEFAULT_ANALYSIS_TEXT.to_string()
                } else {
                    report.analysis_text
                };
                self.analysis = AnalysisState::Ready { text };
                AnalysisApplied::Predictions(count)
            }
            Err(err) => {
                let failure = err.failure();
                log::error!("analysis request {} failed: {}", ticket.request.get(), err);
                self.fail_analysis(failure);
                AnalysisApplied::Failed(failure)
            }
        }
    }

    /// Marks the analysis as failed without a response, e.g. when the image could not be read.
    /// Any request still in flight is dropped along with the current predictions.
    pub fn fail_analysis(&mut self, failure: AnalysisFailure) {
        if failure.needs_credentials() {
            self.settings_open = true;
        }
        self.predictions.clear();
        self.analysis = AnalysisState::Failed(failure);
    }

    /// Asks the host to let the user pick credentials.
    pub fn select_credentials(&self) -> CredentialPrompt {
        match &self.credential_picker {
            Some(picker) => CredentialPrompt::Picker(picker.open()),
            None => {
                log::warn!("no credential picker available");
                CredentialPrompt::Unavailable(CREDENTIAL_PICKER_UNAVAILABLE)
            }
        }
    }

    /// The user went through the picker, the previous error no longer applies.
    pub fn credentials_selected(&mut self) {
        if matches!(self.analysis, AnalysisState::Failed(_)) {
            self.analysis = AnalysisState::Idle;
        }
    }

    /// Flips the show-all display toggle. Never affects the board.
    pub fn toggle_debug_reveal(&mut self) -> bool {
        self.debug_reveal = !self.debug_reveal;
        self.debug_reveal
    }

    pub fn open_settings(&mut self) {
        self.settings_open = true;
    }

    pub fn close_settings(&mut self) {
        self.settings_open = false;
    }
}

impl<G: fmt::Debug> fmt::Debug for Session<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("engine", &self.engine)
            .field("predictions", &self.predictions)
            .field("analysis", &self.analysis)
            .field("last_request", &self.last_request)
            .field("debug_reveal", &self.debug_reveal)
            .field("settings_open", &self.settings_open)
            .finish_non_exhaustive()
    }
}
