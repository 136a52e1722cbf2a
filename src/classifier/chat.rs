use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ClassificationResult, Classifier, ClassifyError, ImagePayload};
use crate::config::ChatConfig;

const PROMPT: &str = "Identify the food in this image. \
Answer with only the common name of the dish, in lowercase, with no other words.";

/// Multimodal chat-completion model prompted to answer with a bare food name.
pub struct ChatClassifier {
    client: Client,
    config: ChatConfig,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ChatClassifier {
    pub fn new(config: ChatConfig, timeout: Duration) -> Result<Self, ClassifyError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ClassifyError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self { client, config })
    }

    fn build_request(&self, image: &ImagePayload) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_data_url(),
                        },
                    },
                ],
            }],
            max_tokens: 20,
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl Classifier for ChatClassifier {
    async fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ClassifyError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        let request = self.build_request(image);
        debug!(%url, model = %request.model, "sending image to chat model");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifyError::Backend(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            warn!(status = status.as_u16(), %message, "chat completion failed");
            return Err(ClassifyError::Backend(format!(
                "API error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::Malformed(format!("Failed to parse response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifyError::Malformed("no content in response".into()))?;
        let label = extract_label(&content)
            .ok_or_else(|| ClassifyError::Malformed(format!("no food name in {:?}", content)))?;

        ClassificationResult::new(label, self.config.label_confidence)
    }

    fn name(&self) -> &str {
        "chat"
    }
}

/// First line of the reply with surrounding quotes and punctuation removed.
fn extract_label(content: &str) -> Option<String> {
    let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    let label = line
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string();
    (!label.is_empty()).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    const PATH: &str = "/v1/chat/completions";

    async fn classifier_for(router: Router) -> ChatClassifier {
        let api_url = crate::classifier::stub_backend(router).await;
        ChatClassifier::new(
            ChatConfig {
                api_url,
                api_key: "k".into(),
                model: "vision-small".into(),
                label_confidence: 0.85,
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn image() -> ImagePayload {
        ImagePayload::new(&[0xFF, 0xD8, 0xFF][..], "image/jpeg")
    }

    #[tokio::test]
    async fn classify_over_http() {
        let router = Router::new().route(
            PATH,
            post(|Json(req): Json<serde_json::Value>| async move {
                assert_eq!(req["messages"][0]["content"][1]["type"], "image_url");
                Json(json!({ "choices": [{ "message": { "content": "Masala Dosa." } }] }))
            }),
        );
        let r = classifier_for(router).await.classify(&image()).await.unwrap();
        assert_eq!(r.label, "Masala Dosa");
        assert_eq!(r.confidence, 0.85);
    }

    #[tokio::test]
    async fn non_success_status_is_backend_error() {
        let router = Router::new().route(
            PATH,
            post(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": { "message": "overloaded" } })),
                )
            }),
        );
        let err = classifier_for(router).await.classify(&image()).await.unwrap_err();
        match err {
            ClassifyError::Backend(msg) => assert!(msg.contains("overloaded")),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unusable_bodies_are_malformed() {
        let garbage = Router::new().route(PATH, post(|| async { "not json" }));
        let err = classifier_for(garbage).await.classify(&image()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));

        let no_choices =
            Router::new().route(PATH, post(|| async { Json(json!({ "choices": [] })) }));
        let err = classifier_for(no_choices).await.classify(&image()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));

        let blank = Router::new().route(
            PATH,
            post(|| async { Json(json!({ "choices": [{ "message": { "content": " ... " } }] })) }),
        );
        let err = classifier_for(blank).await.classify(&image()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }

    #[test]
    fn test_extract_label() {
        assert_eq!(extract_label("pizza").as_deref(), Some("pizza"));
        assert_eq!(extract_label("  \"Masala Dosa.\"\n").as_deref(), Some("Masala Dosa"));
        assert_eq!(extract_label("\n\nbiryani\nextra").as_deref(), Some("biryani"));
        assert_eq!(extract_label("  ...  "), None);
        assert_eq!(extract_label(""), None);
    }

    #[test]
    fn request_carries_prompt_and_image() {
        let c = ChatClassifier::new(
            ChatConfig {
                api_url: "https://chat.example".into(),
                api_key: "k".into(),
                model: "vision-small".into(),
                label_confidence: 0.85,
            },
            Duration::from_secs(1),
        )
        .unwrap();
        let image = ImagePayload::new(&b"abcd"[..], "image/png");
        let json = serde_json::to_value(c.build_request(&image)).unwrap();

        assert_eq!(json["model"], "vision-small");
        let parts = &json["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,YWJjZA==");
    }

    #[test]
    fn response_without_choices_parses() {
        let r: ChatCompletionResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(r.choices.is_empty());
    }
}
