use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ClassificationResult, Classifier, ClassifyError, ImagePayload};
use crate::config::HuggingFaceConfig;

/// Hosted image-classification model on the Hugging Face inference API.
pub struct HuggingFaceClassifier {
    client: Client,
    config: HuggingFaceConfig,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    label: Option<String>,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

impl HuggingFaceClassifier {
    pub fn new(config: HuggingFaceConfig, timeout: Duration) -> Result<Self, ClassifyError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ClassifyError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl Classifier for HuggingFaceClassifier {
    async fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ClassifyError> {
        let url = self.endpoint();
        debug!(%url, bytes = image.bytes.len(), "sending image to hugging face");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .header("Content-Type", image.content_type.as_str())
            .body(image.bytes.clone())
            .send()
            .await
            .map_err(|e| ClassifyError::Backend(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            warn!(status = status.as_u16(), %message, "hugging face request failed");
            return Err(ClassifyError::Backend(format!(
                "API error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let predictions: Vec<Prediction> = response
            .json()
            .await
            .map_err(|e| ClassifyError::Malformed(format!("Failed to parse response: {}", e)))?;
        debug!(?predictions, "hugging face predictions");

        top_prediction(predictions)
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

/// Highest-scoring prediction. Food-101 style labels use underscores
/// (`fried_rice`), which are turned back into spaces.
fn top_prediction(predictions: Vec<Prediction>) -> Result<ClassificationResult, ClassifyError> {
    let top = predictions
        .into_iter()
        .max_by(|a, b| {
            let a = a.score.unwrap_or(f64::NEG_INFINITY);
            let b = b.score.unwrap_or(f64::NEG_INFINITY);
            a.total_cmp(&b)
        })
        .ok_or_else(|| ClassifyError::Malformed("Could not recognize food in image".into()))?;

    let label = top
        .label
        .ok_or_else(|| ClassifyError::Malformed("prediction without label".into()))?;
    let score = top
        .score
        .ok_or_else(|| ClassifyError::Malformed("prediction without score".into()))?;
    ClassificationResult::new(label.replace('_', " "), score)
}
