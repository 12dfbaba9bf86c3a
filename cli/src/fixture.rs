use std::path::Path;

use anyhow::Context;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use mines_core::{AnalysisReport, Analyzer, AnalyzerError, Coord, ImagePayload};
use mines_protocol::{AnalysisPayload, decode_analysis};

use crate::wire::report_from_payload;

/// Answers every analysis with the same canned response, for offline play.
#[derive(Clone, Debug)]
pub struct FixtureAnalyzer {
    payload: AnalysisPayload,
}

impl FixtureAnalyzer {
    pub fn new(payload: AnalysisPayload) -> Self {
        Self { payload }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let payload = decode_analysis(&text)
            .with_context(|| format!("decoding fixture {}", path.display()))?;
        Ok(Self::new(payload))
    }
}

impl Analyzer for FixtureAnalyzer {
    fn analyze(
        &self,
        image: ImagePayload,
        grid_size: Coord,
    ) -> BoxFuture<'static, Result<AnalysisReport, AnalyzerError>> {
        log::debug!("fixture analysis of {:?} for a {}x{} grid", image, grid_size, grid_size);
        let report = report_from_payload(self.payload.clone());
        futures_util::future::ready(Ok(report)).boxed()
    }
}
