//! Image classification boundary.
//!
//! A [`Classifier`] turns an image into a single top-ranked
//! [`ClassificationResult`]. Backends are picked from configuration at
//! startup and the rest of the service only ever sees the trait object.

mod chat;
mod huggingface;
pub mod image;
mod mock;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::nutrition::ReferenceTable;

pub use chat::ChatClassifier;
pub use huggingface::HuggingFaceClassifier;
pub use image::ImagePayload;
pub use mock::{MockClassifier, RandomClassifier};

/// Errors raised at the classifier boundary.
///
/// An unmatched label is not an error; it is handled by the resolver fallback.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The submitted image payload was missing or undecodable.
    #[error("invalid image: {0}")]
    InvalidInput(String),

    /// The backend was unreachable or answered with a non-success status.
    #[error("classifier backend error: {0}")]
    Backend(String),

    /// The backend answered but the body had no usable label.
    #[error("malformed classifier response: {0}")]
    Malformed(String),

    /// The backend did not answer in time.
    #[error("classification timed out after {0:?}")]
    Timeout(Duration),

    /// The backend could not be constructed from configuration.
    #[error("classifier configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f64,
}

impl ClassificationResult {
    /// Validate a backend answer: the label must be non-blank and the
    /// confidence a number, clamped into `[0, 1]`.
    pub fn new(label: impl Into<String>, confidence: f64) -> Result<Self, ClassifyError> {
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(ClassifyError::Malformed("empty label".into()));
        }
        if confidence.is_nan() {
            return Err(ClassifyError::Malformed("confidence is not a number".into()));
        }
        Ok(Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ClassifyError>;

    fn name(&self) -> &str;
}

/// Build the backend selected by `CLASSIFIER`.
pub fn from_config(
    config: &ClassifierConfig,
    table: Arc<ReferenceTable>,
) -> Result<Arc<dyn Classifier>, ClassifyError> {
    let classifier: Arc<dyn Classifier> = match config.kind {
        ClassifierKind::HuggingFace => {
            let hf = config.huggingface.clone().ok_or_else(|| {
                ClassifyError::Configuration("HUGGING_FACE_ACCESS_TOKEN is not set".into())
            })?;
            Arc::new(HuggingFaceClassifier::new(hf, config.timeout)?)
        }
        ClassifierKind::Chat => {
            let chat = config
                .chat
                .clone()
                .ok_or_else(|| ClassifyError::Configuration("CHAT_API_KEY is not set".into()))?;
            Arc::new(ChatClassifier::new(chat, config.timeout)?)
        }
        ClassifierKind::Mock => Arc::new(MockClassifier::fixed(
            config.mock.label.clone(),
            config.mock.confidence,
        )),
        ClassifierKind::Random => Arc::new(RandomClassifier::from_table(&table)),
    };
    info!(classifier = classifier.name(), "classifier ready");
    Ok(classifier)
}

/// Serves `router` on an ephemeral local port and returns its base URL.
#[cfg(test)]
pub(crate) async fn stub_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn result_rejects_blank_label() {
        assert!(matches!(
            ClassificationResult::new("  ", 0.9),
            Err(ClassifyError::Malformed(_))
        ));
        assert!(ClassificationResult::new("pizza", f64::NAN).is_err());
    }

    #[test]
    fn result_clamps_confidence() {
        let r = ClassificationResult::new(" pizza ", 1.7).unwrap();
        assert_eq!(r.label, "pizza");
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn builds_mock_by_default() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let table = Arc::new(ReferenceTable::builtin().unwrap());
        let c = from_config(&config.classifier, table).unwrap();
        assert_eq!(c.name(), "mock");
    }

    #[test]
    fn huggingface_without_token_is_a_configuration_error() {
        let mut config = AppConfig::from_lookup(|_| None).unwrap().classifier;
        config.kind = ClassifierKind::HuggingFace;
        let table = Arc::new(ReferenceTable::builtin().unwrap());
        let err = from_config(&config, table).err().unwrap();
        assert!(matches!(err, ClassifyError::Configuration(_)));
    }
}
