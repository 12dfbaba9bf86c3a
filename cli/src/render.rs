use std::fmt::Write;

use game::{CellContent, CellView, ConfidenceTier, LayoutGenerator, RoundStatus, Session};
use mines_core as game;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Glyph {
    Hidden,
    Predicted,
    Gem,
    Bomb,
    ExposedSafe,
    ExposedMine,
}

impl Glyph {
    fn of(view: CellView<'_>) -> Self {
        match view {
            CellView::Hidden { prediction: None } => Self::Hidden,
            CellView::Hidden { prediction: Some(_) } => Self::Predicted,
            CellView::Exposed {
                content: CellContent::Mine,
                ..
            } => Self::ExposedMine,
            CellView::Exposed {
                prediction: Some(_),
                ..
            } => Self::Predicted,
            CellView::Exposed { .. } => Self::ExposedSafe,
            CellView::Revealed(CellContent::Safe) => Self::Gem,
            CellView::Revealed(CellContent::Mine) => Self::Bomb,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Hidden => '.',
            Self::Predicted => '*',
            Self::Gem => 'o',
            Self::Bomb => 'X',
            Self::ExposedSafe => '-',
            Self::ExposedMine => 'M',
        }
    }
}

pub const LEGEND: &str =
    ". hidden   * predicted safe   o gem   X mine   - / M shown by debug reveal";

fn tier_name(tier: ConfidenceTier) -> &'static str {
    match tier {
        ConfidenceTier::High => "high",
        ConfidenceTier::Medium => "medium",
        ConfidenceTier::Low => "low",
    }
}

fn status_name(status: Option<RoundStatus>) -> &'static str {
    match status {
        None => "not started",
        Some(RoundStatus::InProgress) => "in progress",
        Some(RoundStatus::Won) => "won",
        Some(RoundStatus::Lost) => "lost",
    }
}

/// Grid with column letters and 1-based row numbers.
pub fn board<G: LayoutGenerator>(session: &Session<G>) -> String {
    let size = session.config().size;
    let mut out = String::from("   ");
    for col in 0..size {
        out.push(' ');
        out.push(char::from(b'A' + col));
    }
    out.push('\n');

    for row in 0..size {
        let _ = write!(out, "{:>3}", u16::from(row) + 1);
        for col in 0..size {
            let glyph = session
                .cell_view((row, col))
                .map_or(Glyph::Hidden, Glyph::of);
            out.push(' ');
            out.push(glyph.as_char());
        }
        out.push('\n');
    }
    out
}

/// Round summary, analysis state and the prediction list.
pub fn status<G: LayoutGenerator>(session: &Session<G>) -> String {
    let config = session.config();
    let stats = session.stats();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Round {} | {}x{}, {} mines | {}",
        session.round().get(),
        config.size,
        config.size,
        config.mines,
        status_name(stats.status)
    );
    let _ = writeln!(
        out,
        "Revealed {}, remaining {}, safe odds {:.1}% ({})",
        stats.revealed_count,
        stats.remaining_cells,
        stats.confidence,
        tier_name(ConfidenceTier::of(stats.confidence))
    );

    if session.is_analyzing() {
        let _ = writeln!(out, "Analyzing...");
    }
    if let Some(text) = session.analysis_text() {
        let _ = writeln!(out, "Analysis: {}", text);
    }
    if let Some(message) = session.error_message() {
        let _ = writeln!(out, "Error: {}", message);
    }
    for prediction in session.predictions().iter() {
        let _ = writeln!(
            out,
            "  {:<4} {:>5.1}%  {}",
            game::cell_label(prediction.coords),
            prediction.probability,
            prediction.reason
        );
    }
    out
}

pub fn history<G: LayoutGenerator>(session: &Session<G>) -> String {
    let log = session.history();
    if log.is_empty() {
        return "No finished rounds yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Last {} rounds: {} won, {} lost", log.len(), log.wins(), log.losses());
    for item in log.iter() {
        let _ = writeln!(
            out,
            "  #{:<3} {:<4} {}x{} / {} mines  {}",
            item.id,
            item.outcome.as_str(),
            item.grid_size,
            item.grid_size,
            item.num_mines,
            item.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
    out
}
