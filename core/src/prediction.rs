use serde::{Deserialize, Serialize};

use crate::*;

/// Advisory "likely safe" annotation for one unrevealed cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub coords: Coord2,
    /// Confidence in `[0, 100]`.
    pub probability: f64,
    pub reason: String,
}

impl Prediction {
    /// Validates a collaborator entry against the board it is meant for.
    fn from_raw(raw: RawPrediction, state: &GameState) -> Option<Self> {
        let coords = (
            Coord::try_from(raw.row).ok()?,
            Coord::try_from(raw.col).ok()?,
        );
        if !state.contains(coords) || state.is_revealed(coords) || !raw.probability.is_finite() {
            return None;
        }
        Some(Self {
            coords,
            probability: raw.probability.clamp(0.0, 100.0),
            reason: raw.reason,
        })
    }
}

/// The prediction set currently shown, scoped to a single round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PredictionReconciler {
    round: Option<RoundId>,
    entries: Vec<Prediction>,
}

impl PredictionReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn round(&self) -> Option<RoundId> {
        self.round
    }

    /// Replaces the held set wholesale. Entries for another round are dropped entirely;
    /// entries that are out of range, already revealed, duplicated or non-finite are skipped.
    /// Returns how many entries were kept.
    pub fn set_predictions(
        &mut self,
        round: RoundId,
        state: &GameState,
        predictions: impl IntoIterator<Item = RawPrediction>,
    ) -> usize {
        if self.round != Some(round) {
            log::debug!(
                "dropping predictions for round {}, current round is {:?}",
                round.get(),
                self.round.map(RoundId::get)
            );
            return 0;
        }

        self.entries.clear();
        let mut skipped = 0;
        for raw in predictions {
            match Prediction::from_raw(raw, state) {
                Some(prediction) if self.find(prediction.coords).is_none() => {
                    self.entries.push(prediction);
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!("skipped {} unusable predictions", skipped);
        }
        log::debug!("holding {} predictions", self.entries.len());
        self.entries.len()
    }

    /// Drops the entry for a cell that just got revealed, keeping the order of the rest.
    pub fn on_reveal(&mut self, coords: Coord2) {
        self.entries.retain(|prediction| prediction.coords != coords);
    }

    /// Forgets everything and scopes the set to `round`.
    pub fn on_new_round(&mut self, round: RoundId) {
        self.round = Some(round);
        self.entries.clear();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The prediction for a still-unrevealed cell.
    pub fn lookup(&self, coords: Coord2, state: &GameState) -> Option<&Prediction> {
        if !state.contains(coords) || state.is_revealed(coords) {
            return None;
        }
        self.find(coords)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Prediction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, coords: Coord2) -> Option<&Prediction> {
        self.entries
            .iter()
            .find(|prediction| prediction.coords == coords)
    }
}
