use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::*;

/// Summary used when the collaborator answers without one.
pub const DEFAULT_ANALYSIS_TEXT: &str = "Analysis complete. No notable pattern detected.";

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Encoded screenshot sent for analysis.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    mime_type: String,
    /// Base64 body without any data-URL prefix.
    data: String,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Accepts `data:<mime>;base64,<body>` or a bare base64 body.
    pub fn from_data_url(url: &str) -> Self {
        let Some(rest) = url.strip_prefix("data:") else {
            return Self::new(DEFAULT_IMAGE_MIME, url);
        };
        let Some((header, body)) = rest.split_once(',') else {
            return Self::new(DEFAULT_IMAGE_MIME, rest);
        };
        let mime_type = header.split(';').next().unwrap_or_default();
        let mime_type = if mime_type.is_empty() {
            DEFAULT_IMAGE_MIME
        } else {
            mime_type
        };
        Self::new(mime_type, body)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Prediction exactly as the collaborator sent it, not yet checked against any board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub row: i64,
    pub col: i64,
    pub probability: f64,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_text: String,
    pub predictions: Vec<RawPrediction>,
}

/// The image-analysis collaborator.
pub trait Analyzer {
    fn analyze(
        &self,
        image: ImagePayload,
        grid_size: Coord,
    ) -> BoxFuture<'static, core::result::Result<AnalysisReport, AnalyzerError>>;
}

/// Host capability that lets the user pick new credentials.
pub trait CredentialPicker {
    /// Resolves once the user closed the picker.
    fn open(&self) -> BoxFuture<'static, ()>;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Identity captured when an analysis is issued, compared again when its result comes back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisTicket {
    pub round: RoundId,
    pub request: RequestId,
}

/// An issued analysis call.
///
/// Awaiting it yields the [`AnalysisResponse`] to hand back to the session.
#[must_use = "the analysis result is lost unless the pending call is awaited and applied"]
pub struct PendingAnalysis {
    ticket: AnalysisTicket,
    call: BoxFuture<'static, core::result::Result<AnalysisReport, AnalyzerError>>,
}

impl PendingAnalysis {
    pub(crate) fn new(
        ticket: AnalysisTicket,
        call: BoxFuture<'static, core::result::Result<AnalysisReport, AnalyzerError>>,
    ) -> Self {
        Self { ticket, call }
    }

    pub fn ticket(&self) -> AnalysisTicket {
        self.ticket
    }
}

impl fmt::Debug for PendingAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAnalysis")
            .field("ticket", &self.ticket)
            .finish_non_exhaustive()
    }
}

impl Future for PendingAnalysis {
    type Output = AnalysisResponse;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let ticket = self.ticket;
        self.call
            .poll_unpin(cx)
            .map(|result| AnalysisResponse { ticket, result })
    }
}

/// Completed analysis call, stamped with the ticket it was issued under.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResponse {
    pub ticket: AnalysisTicket,
    pub result: core::result::Result<AnalysisReport, AnalyzerError>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum AnalysisState {
    #[default]
    Idle,
    Pending(AnalysisTicket),
    Ready {
        text: String,
    },
    Failed(AnalysisFailure),
}

impl AnalysisState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn live_ticket(&self) -> Option<AnalysisTicket> {
        match self {
            Self::Pending(ticket) => Some(*ticket),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Ready { text } => Some(text),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<AnalysisFailure> {
        match self {
            Self::Failed(failure) => Some(*failure),
            _ => None,
        }
    }
}

/// What applying an [`AnalysisResponse`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnalysisApplied {
    /// Predictions installed, with how many survived validation.
    Predictions(usize),
    Failed(AnalysisFailure),
    /// The response belonged to a superseded request or round.
    Discarded,
}

/// Outcome of asking the host for credential selection.
pub enum CredentialPrompt {
    /// Await the picker, then call [`Session::credentials_selected`].
    Picker(BoxFuture<'static, ()>),
    /// No picker available, show this notification instead.
    Unavailable(&'static str),
}

impl fmt::Debug for CredentialPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Picker(_) => f.write_str("Picker(..)"),
            Self::Unavailable(message) => f.debug_tuple("Unavailable").field(message).finish(),
        }
    }
}
