use std::time::Duration;

use async_trait::async_trait;
use rand::{seq::SliceRandom, Rng};
use tokio::time::sleep;

use super::{ClassificationResult, Classifier, ClassifyError, ImagePayload};
use crate::nutrition::ReferenceTable;

#[derive(Debug, Clone)]
enum Outcome {
    Label { label: String, confidence: f64 },
    Fail(String),
}

/// Deterministic classifier for local runs and tests.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    outcome: Outcome,
    delay: Option<Duration>,
}

impl MockClassifier {
    /// Always answers with `label` at `confidence`.
    pub fn fixed(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            outcome: Outcome::Label {
                label: label.into(),
                confidence,
            },
            delay: None,
        }
    }

    /// Always fails as if the backend were unreachable.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Fail(message.into()),
            delay: None,
        }
    }

    /// Sleep before answering; used to exercise timeouts and supersession.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _image: &ImagePayload) -> Result<ClassificationResult, ClassifyError> {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        match &self.outcome {
            Outcome::Label { label, confidence } => {
                ClassificationResult::new(label.clone(), *confidence)
            }
            Outcome::Fail(message) => Err(ClassifyError::Backend(message.clone())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Picks a random reference food; handy for demoing the UI without a model.
#[derive(Debug, Clone)]
pub struct RandomClassifier {
    names: Vec<String>,
}

impl RandomClassifier {
    pub fn from_table(table: &ReferenceTable) -> Self {
        Self {
            names: table.iter().map(|f| f.name.clone()).collect(),
        }
    }

    fn pick(&self) -> Option<(String, f64)> {
        let mut rng = rand::thread_rng();
        let name = self.names.choose(&mut rng)?.clone();
        Some((name, rng.gen_range(0.6..=0.95)))
    }
}

#[async_trait]
impl Classifier for RandomClassifier {
    async fn classify(&self, _image: &ImagePayload) -> Result<ClassificationResult, ClassifyError> {
        let (label, confidence) = self
            .pick()
            .ok_or_else(|| ClassifyError::Configuration("no foods to pick from".into()))?;
        ClassificationResult::new(label, confidence)
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn image() -> ImagePayload {
        ImagePayload::new(&b"img"[..], "image/jpeg")
    }

    #[tokio::test]
    async fn fixed_answers_label() {
        let c = MockClassifier::fixed("Pizza", 0.9);
        let r = c.classify(&image()).await.unwrap();
        assert_eq!(r.label, "Pizza");
        assert_eq!(r.confidence, 0.9);
    }

    #[tokio::test]
    async fn failing_is_backend_error() {
        let c = MockClassifier::failing("down");
        let err = c.classify(&image()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Backend(m) if m == "down"));
    }

    #[tokio::test]
    async fn delay_is_applied() {
        let c = MockClassifier::fixed("idli", 1.0).with_delay(Duration::from_millis(50));
        let start = Instant::now();
        c.classify(&image()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn random_picks_reference_food() {
        let table = ReferenceTable::builtin().unwrap();
        let c = RandomClassifier::from_table(&table);
        for _ in 0..20 {
            let r = c.classify(&image()).await.unwrap();
            assert!(table.get(&r.label).is_some());
            assert!((0.6..=0.95).contains(&r.confidence));
        }
    }
}
