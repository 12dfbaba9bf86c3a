use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use mines_core::{AnalysisReport, Analyzer, AnalyzerError, Coord, ImagePayload};
use mines_protocol::{ApiError, GenerateContentRequest, GenerateContentResponse};

use crate::keys::KeyStore;
use crate::wire::{malformed, report_from_payload};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Message the service answers with when the key belongs to no known project.
const KEY_NOT_FOUND: &str = "Requested entity was not found";
const KEY_INVALID: &str = "API key not valid";

/// Analysis over a `generateContent` HTTP endpoint.
#[derive(Clone, Debug)]
pub struct GeminiAnalyzer {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    keys: KeyStore,
}

impl GeminiAnalyzer {
    pub fn new(endpoint: &str, model: &str, keys: KeyStore) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            keys,
        })
    }

    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Analyzer for GeminiAnalyzer {
    fn analyze(
        &self,
        image: ImagePayload,
        grid_size: Coord,
    ) -> BoxFuture<'static, Result<AnalysisReport, AnalyzerError>> {
        let http = self.http.clone();
        let url = self.url();
        // read per call so a key picked in the meantime is used
        let key = self.keys.get();

        async move {
            let key = key.ok_or(AnalyzerError::MissingCredential)?;
            let body = GenerateContentRequest::analysis(image.mime_type(), image.data(), grid_size);

            log::debug!("POST {}", url);
            let response = http
                .post(&url)
                .header(API_KEY_HEADER, key)
                .json(&body)
                .send()
                .await
                .map_err(|err| AnalyzerError::Network(err.to_string()))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| AnalyzerError::Network(err.to_string()))?;
            if !status.is_success() {
                return Err(classify_failure(status.as_u16(), &text));
            }

            let response: GenerateContentResponse = serde_json::from_str(&text)
                .map_err(|err| AnalyzerError::Malformed(err.to_string()))?;
            let payload = response.into_analysis().map_err(malformed)?;
            Ok(report_from_payload(payload))
        }
        .boxed()
    }
}

/// Maps a non-success answer onto the collaborator error taxonomy.
pub fn classify_failure(status: u16, body: &str) -> AnalyzerError {
    let message = ApiError::parse(body)
        .map(|error| error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    if matches!(status, 401 | 403)
        || message.contains(KEY_NOT_FOUND)
        || message.contains(KEY_INVALID)
    {
        AnalyzerError::InvalidCredential(message)
    } else if status == 429 {
        AnalyzerError::Quota(message)
    } else {
        AnalyzerError::Http { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use mines_core::{AnalysisFailure, RawPrediction};
    use serde_json::json;

    const MODEL: &str = "test-model";
    const KEY: &str = "test-key";
    const PATH: &str = "/models/test-model:generateContent";

    fn analyzer(server: &MockServer) -> GeminiAnalyzer {
        GeminiAnalyzer::new(&server.base_url(), MODEL, KeyStore::new(Some(KEY.to_string())))
            .unwrap()
    }

    async fn analyze(server: &MockServer) -> Result<AnalysisReport, AnalyzerError> {
        analyzer(server)
            .analyze(ImagePayload::new("image/png", "AAAA"), 5)
            .await
    }

    fn envelope(code: u16, message: &str) -> String {
        serde_json::json!({
            "error": { "code": code, "message": message, "status": "ERROR" }
        })
        .to_string()
    }

    #[test]
    fn unknown_entity_is_a_credential_error() {
        let err = classify_failure(404, &envelope(404, "Requested entity was not found."));
        assert_eq!(err.failure(), AnalysisFailure::Credential);
    }

    #[test]
    fn rejected_key_is_a_credential_error() {
        let err = classify_failure(
            400,
            &envelope(400, "API key not valid. Please pass a valid API key."),
        );
        assert!(matches!(err, AnalyzerError::InvalidCredential(_)));
        assert!(matches!(
            classify_failure(403, "forbidden"),
            AnalyzerError::InvalidCredential(message) if message == "forbidden"
        ));
    }

    #[test]
    fn rate_limit_is_quota() {
        let err = classify_failure(429, &envelope(429, "Resource has been exhausted"));
        assert_eq!(err, AnalyzerError::Quota("Resource has been exhausted".to_string()));
        assert_eq!(err.failure(), AnalysisFailure::Generic);
    }

    #[test]
    fn other_statuses_keep_code_and_raw_body() {
        assert_eq!(
            classify_failure(503, " upstream unavailable \n"),
            AnalyzerError::Http {
                status: 503,
                message: "upstream unavailable".to_string()
            }
        );
    }

    #[test]
    fn url_targets_model() {
        let analyzer = GeminiAnalyzer::new(
            "https://example.test/v1beta/",
            "some-model",
            KeyStore::default(),
        )
        .unwrap();
        assert_eq!(
            analyzer.url(),
            "https://example.test/v1beta/models/some-model:generateContent"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let analyzer =
            GeminiAnalyzer::new("http://127.0.0.1:9", "some-model", KeyStore::default()).unwrap();

        let result = analyzer
            .analyze(ImagePayload::new("image/png", "AAAA"), 5)
            .await;

        assert_eq!(result, Err(AnalyzerError::MissingCredential));
    }

    #[tokio::test]
    async fn posts_image_with_key_and_decodes_predictions() {
        let server = MockServer::start_async().await;
        let answer = json!({
            "analysisText": "Corners look quiet",
            "predictions": [{"r": 0, "c": 1, "p": 90, "reason": "open edge"}]
        });
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .header(API_KEY_HEADER, KEY)
                    .body_includes("AAAA");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": answer.to_string()}]},
                        "finishReason": "STOP"
                    }]
                }));
            })
            .await;

        let report = analyze(&server).await.unwrap();

        mock.assert_async().await;
        assert_eq!(report.analysis_text, "Corners look quiet");
        assert_eq!(
            report.predictions,
            vec![RawPrediction {
                row: 0,
                col: 1,
                probability: 90.0,
                reason: "open edge".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn unknown_entity_answer_asks_for_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(404).json_body(json!({
                    "error": {
                        "code": 404,
                        "message": "Requested entity was not found.",
                        "status": "NOT_FOUND"
                    }
                }));
            })
            .await;

        let err = analyze(&server).await.unwrap_err();

        assert_eq!(
            err,
            AnalyzerError::InvalidCredential("Requested entity was not found.".to_string())
        );
        assert_eq!(err.failure(), AnalysisFailure::Credential);
    }

    #[tokio::test]
    async fn rate_limited_answer_is_quota() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(429).body(envelope(429, "Resource has been exhausted"));
            })
            .await;

        let err = analyze(&server).await.unwrap_err();

        assert_eq!(err, AnalyzerError::Quota("Resource has been exhausted".to_string()));
        assert_eq!(err.failure(), AnalysisFailure::Generic);
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).body("<html>gateway</html>");
            })
            .await;

        let err = analyze(&server).await.unwrap_err();

        assert!(matches!(err, AnalyzerError::Malformed(_)), "{err:?}");
        assert_eq!(err.failure(), AnalysisFailure::Generic);
    }
}
