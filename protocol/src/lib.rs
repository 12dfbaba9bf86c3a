use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const RESPONSE_MIME_TYPE: &str = "application/json";

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Response was blocked: {0}")]
    EmptyResponse(String),
    #[error("Missing field `{0}`")]
    MissingField(&'static str),
}

pub type Result<T> = core::result::Result<T, ProtocolError>;

/// One suggested cell as the model writes it. Row and column are 0-based.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellPrediction {
    pub r: i64,
    pub c: i64,
    pub p: f64,
    #[serde(default)]
    pub reason: String,
}

/// Structured answer of the analysis model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    #[serde(default)]
    pub analysis_text: Option<String>,
    #[serde(default)]
    pub predictions: Option<Vec<CellPrediction>>,
}

impl AnalysisPayload {
    pub fn analysis_text(&self) -> &str {
        self.analysis_text.as_deref().unwrap_or_default()
    }

    pub fn into_predictions(self) -> Vec<CellPrediction> {
        self.predictions.unwrap_or_default()
    }
}

/// Decodes the model's JSON answer. Blank input reads as an empty object, and a surrounding
/// markdown code fence is tolerated.
pub fn decode_analysis(text: &str) -> Result<AnalysisPayload> {
    let text = strip_code_fence(text.trim());
    if text.is_empty() {
        return Ok(AnalysisPayload::default());
    }
    Ok(serde_json::from_str(text)?)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

/// Instruction sent next to the screenshot.
pub fn analysis_prompt(grid_size: u8) -> String {
    let last = grid_size.saturating_sub(1);
    format!(
        "You are a tactical analyst for the grid game \"Mines\". Analyze this screenshot of a \
         {grid_size}x{grid_size} grid and suggest the next safe cells.\n\
         \n\
         1. Locate the gems already found and any mines already revealed.\n\
         2. Look at the spatial distribution for clusters or safe diagonals, and find the \
         areas where the mine density looks lowest.\n\
         3. Avoid unrevealed cells adjacent to revealed mines.\n\
         4. Pick between 3 and 5 unrevealed cells with the best safety ratio.\n\
         \n\
         Answer with JSON only:\n\
         - \"analysisText\": a short strategic summary naming the detected pattern.\n\
         - \"predictions\": an array of {{ r, c, p, reason }} objects where r is the row \
         (0 to {last}), c the column (0 to {last}), p the confidence (75-99) and reason a short \
         tactical explanation.\n\
         \n\
         Row and column indices start at 0."
    )
}

/// JSON schema the model's answer must follow.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "analysisText": {
                "type": "STRING",
                "description": "Overall tactical summary of the detected patterns."
            },
            "predictions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "r": { "type": "INTEGER", "description": "Row index (0 to gridSize-1)" },
                        "c": { "type": "INTEGER", "description": "Column index (0 to gridSize-1)" },
                        "p": { "type": "NUMBER", "description": "Confidence from 0 to 100" },
                        "reason": { "type": "STRING", "description": "Short tactical reason" }
                    },
                    "required": ["r", "c", "p", "reason"]
                }
            }
        },
        "required": ["analysisText", "predictions"]
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

/// Body of a `models/{model}:generateContent` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Screenshot first, then the prompt, asking for schema-conforming JSON.
    pub fn analysis(mime_type: &str, data: &str, grid_size: u8) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline_data(mime_type, data),
                    Part::text(analysis_prompt(grid_size)),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: RESPONSE_MIME_TYPE.to_string(),
                response_schema: response_schema(),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.as_ref()?.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }

    /// Extracts the structured analysis. A candidate without text decodes as an empty analysis.
    pub fn into_analysis(self) -> Result<AnalysisPayload> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone())
        {
            return Err(ProtocolError::EmptyResponse(reason));
        }
        if self.candidates.is_none() {
            return Err(ProtocolError::MissingField("candidates"));
        }
        decode_analysis(&self.text().unwrap_or_default())
    }
}

/// Error envelope returned with non-success statuses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl ApiError {
    /// Best effort, `None` when the body is not the usual envelope.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .map(|envelope| envelope.error)
    }
}
