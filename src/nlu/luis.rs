use std::time::Duration;

use super::entities::RecognizerResponse;
use super::{EntityRecognizer, NluError};

/// HTTP client for a LUIS-style prediction endpoint.
///
/// The configured URL is the full application endpoint (app id and key
/// included); the utterance is appended as the `q` query parameter.
pub struct LuisClient {
    model_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl LuisClient {
    pub fn new(model_url: &str, timeout_secs: u64) -> Result<Self, NluError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NluError::HttpClient(e.to_string()))?;

        Ok(Self {
            model_url: model_url.trim().to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn model_url(&self) -> &str {
        &self.model_url
    }
}

impl EntityRecognizer for LuisClient {
    fn recognize(&self, utterance: &str) -> Result<RecognizerResponse, NluError> {
        let response = self
            .client
            .get(&self.model_url)
            .query(&[("q", utterance)])
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    NluError::Connection(self.model_url.clone())
                } else if e.is_timeout() {
                    NluError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
                } else {
                    NluError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Recognizer returned an error status");
            return Err(NluError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<RecognizerResponse>()
            .map_err(|e| NluError::ResponseParsing(e.to_string()))
    }
}

/// Recognizer returning a fixed response, for tests and offline runs.
pub struct MockRecognizer {
    response: RecognizerResponse,
}

impl MockRecognizer {
    pub fn new(response: RecognizerResponse) -> Self {
        Self { response }
    }

    /// Build from a raw JSON payload.
    pub fn from_json(json: &str) -> Result<Self, NluError> {
        let response =
            serde_json::from_str(json).map_err(|e| NluError::ResponseParsing(e.to_string()))?;
        Ok(Self::new(response))
    }
}

impl EntityRecognizer for MockRecognizer {
    fn recognize(&self, utterance: &str) -> Result<RecognizerResponse, NluError> {
        Ok(RecognizerResponse {
            query: utterance.to_string(),
            ..self.response.clone()
        })
    }
}
