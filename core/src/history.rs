use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::*;

/// How many finished rounds the log keeps.
pub const HISTORY_CAPACITY: usize = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Win => "WIN",
            Self::Loss => "LOSS",
        }
    }
}

/// One finished round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub grid_size: Coord,
    pub num_mines: CellCount,
    pub outcome: Outcome,
}

/// Finished rounds, most recent first, capped at [`HISTORY_CAPACITY`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    items: VecDeque<HistoryItem>,
    next_id: u64,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends `item`, evicting the oldest entries beyond capacity.
    pub fn append(&mut self, item: HistoryItem) {
        self.next_id = self.next_id.max(item.id.saturating_add(1));
        self.items.push_front(item);
        self.items.truncate(HISTORY_CAPACITY);
    }

    /// Builds and appends the entry for a round that just ended.
    pub fn record(
        &mut self,
        config: GameConfig,
        outcome: Outcome,
        timestamp: DateTime<Utc>,
    ) -> &HistoryItem {
        let item = HistoryItem {
            id: self.next_id,
            timestamp,
            grid_size: config.size,
            num_mines: config.mines,
            outcome,
        };
        log::debug!(
            "round #{} ended: {} on {}x{} with {} mines",
            item.id,
            outcome.as_str(),
            item.grid_size,
            item.grid_size,
            item.num_mines
        );
        self.append(item);
        &self.items[0]
    }

    /// Most recent first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &HistoryItem> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&HistoryItem> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn wins(&self) -> usize {
        self.count(Outcome::Win)
    }

    pub fn losses(&self) -> usize {
        self.count(Outcome::Loss)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome == outcome)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn keeps_ten_most_recent_newest_first() {
        let mut log = HistoryLog::new();
        let config = GameConfig::new(5, 3);

        for round in 0..11 {
            let outcome = if round % 2 == 0 { Outcome::Win } else { Outcome::Loss };
            log.record(config, outcome, t(round));
        }

        assert_eq!(log.len(), HISTORY_CAPACITY);
        let ids: Vec<u64> = log.iter().map(|item| item.id).collect();
        assert_eq!(ids, (1..=10u64).rev().collect::<Vec<_>>());
        assert!(log.iter().all(|item| item.timestamp != t(0)));
        assert_eq!(log.latest().map(|item| item.timestamp), Some(t(10)));
    }

    #[test]
    fn eviction_is_by_recency_not_id() {
        let mut log = HistoryLog::new();
        let config = GameConfig::new(3, 1);
        log.append(HistoryItem {
            id: 500,
            timestamp: t(0),
            grid_size: 3,
            num_mines: 1,
            outcome: Outcome::Win,
        });
        for round in 1..=10 {
            log.record(config, Outcome::Loss, t(round));
        }

        assert_eq!(log.len(), HISTORY_CAPACITY);
        assert!(log.iter().all(|item| item.id != 500));
        assert!(log.iter().all(|item| item.id > 500));
    }

    #[test]
    fn counts_outcomes() {
        let mut log = HistoryLog::new();
        let config = GameConfig::new(5, 3);
        log.record(config, Outcome::Win, t(1));
        log.record(config, Outcome::Loss, t(2));
        log.record(config, Outcome::Win, t(3));

        assert_eq!(log.wins(), 2);
        assert_eq!(log.losses(), 1);
        assert_eq!(log.latest().map(|item| item.outcome), Some(Outcome::Win));
    }
}
