use mines_core::{AnalysisReport, AnalyzerError, RawPrediction};
use mines_protocol::{AnalysisPayload, ProtocolError};

/// Converts the decoded model answer into the core's collaborator report.
pub fn report_from_payload(payload: AnalysisPayload) -> AnalysisReport {
    let analysis_text = payload.analysis_text().to_string();
    let predictions = payload
        .into_predictions()
        .into_iter()
        .map(|prediction| RawPrediction {
            row: prediction.r,
            col: prediction.c,
            probability: prediction.p,
            reason: prediction.reason,
        })
        .collect();
    AnalysisReport {
        analysis_text,
        predictions,
    }
}

pub fn malformed(err: ProtocolError) -> AnalyzerError {
    AnalyzerError::Malformed(err.to_string())
}
