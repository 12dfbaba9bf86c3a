use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Too many mines")]
    TooManyMines,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
}

pub type Result<T> = core::result::Result<T, GameError>;

/// Failure raised by an [`Analyzer`](crate::Analyzer) implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("No API key configured")]
    MissingCredential,
    #[error("API key rejected: {0}")]
    InvalidCredential(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Malformed analysis response: {0}")]
    Malformed(String),
    #[error("Quota exceeded: {0}")]
    Quota(String),
    #[error("{0}")]
    Other(String),
}

impl AnalyzerError {
    /// Collapses collaborator errors into the two kinds the session surfaces.
    pub const fn failure(&self) -> AnalysisFailure {
        match self {
            Self::MissingCredential | Self::InvalidCredential(_) => AnalysisFailure::Credential,
            _ => AnalysisFailure::Generic,
        }
    }
}

/// Analysis failure as seen by the presentation layer.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnalysisFailure {
    /// Missing or invalid key, the user should pick credentials again.
    #[error("API key error. Please select a valid key in the settings.")]
    Credential,
    /// Network, parse or quota problem, the user may simply retry.
    #[error("AI analysis failed. Check your connection and your API key.")]
    Generic,
}

impl AnalysisFailure {
    pub const fn needs_credentials(self) -> bool {
        matches!(self, Self::Credential)
    }
}
