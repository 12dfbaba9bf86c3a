use serde::{Deserialize, Serialize};

use crate::*;

/// Share of the still-hidden cells that are safe, as a percentage.
///
/// Pure board combinatorics under the uniform layout assumption, predictions do not factor in.
/// Zero without a state and once no hidden cell remains.
pub fn safe_confidence(state: Option<&GameState>) -> f64 {
    let Some(state) = state else {
        return 0.0;
    };

    let remaining = state.remaining_cells();
    if remaining == 0 {
        return 0.0;
    }

    let total_safe = state.layout().safe_cell_count();
    let unrevealed_safe = total_safe - state.revealed_safe_count();
    (f64::from(unrevealed_safe) / f64::from(remaining)) * 100.0
}

/// Coarse bucket of a confidence value, for coloring.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn of(confidence: f64) -> Self {
        if confidence > 80.0 {
            Self::High
        } else if confidence > 50.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}
