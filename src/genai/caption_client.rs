use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::{Result, StudioError},
    genai::{read_json, CaptionService},
    models::{
        caption::{GenerateContentRequest, GenerateContentResponse},
        CaptionRequest, ModelCategory, ModelInfo,
    },
};

#[derive(Clone)]
pub struct CaptionClient {
    http: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl CaptionClient {
    pub fn new(http: Client, api_base: &str, api_key: &str, model: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.trim_start_matches("models/").to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    pub fn supported_models() -> Vec<ModelInfo> {
        vec![
            ModelInfo::new(
                "gemini-2.5-flash",
                "Gemini 2.5 Flash",
                ModelCategory::Caption,
                "Fast multimodal model, default for captioning",
            ),
            ModelInfo::new(
                "gemini-2.5-pro",
                "Gemini 2.5 Pro",
                ModelCategory::Caption,
                "Slower, more detailed descriptions",
            ),
            ModelInfo::new(
                "gemini-2.0-flash",
                "Gemini 2.0 Flash",
                ModelCategory::Caption,
                "Previous generation multimodal model",
            ),
        ]
    }
}

#[async_trait]
impl CaptionService for CaptionClient {
    async fn caption(&self, request: CaptionRequest) -> Result<String> {
        let endpoint = self.endpoint();
        let payload = GenerateContentRequest::for_caption(&request);

        log::info!("Captioning image with model: {}", self.model);
        log::debug!(
            "Caption request: {} ({} bytes)",
            request.image.mime_type,
            request.image.size_bytes()
        );

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| StudioError::RequestError(format!("caption request failed: {}", e)))?;

        let body: GenerateContentResponse = read_json(response, "caption").await?;

        if let Some(text) = body.text() {
            return Ok(text);
        }

        let reason = body
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .or_else(|| {
                body.candidates
                    .into_iter()
                    .next()
                    .and_then(|candidate| candidate.finish_reason)
            })
            .unwrap_or_else(|| "empty response".to_string());

        Err(StudioError::ResponseError(format!(
            "model returned no caption ({})",
            reason
        )))
    }
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;
    use crate::{genai::fake::CannedApi, models::UploadedImage};

    fn request() -> CaptionRequest {
        let image = UploadedImage::from_bytes(b"abc", "image/png").unwrap();
        CaptionRequest::new(image, "Describe it")
    }

    #[actix_web::test]
    async fn test_caption_returned_verbatim() {
        let api = CannedApi::start(
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"  A fox in snow.\n"}]},"finishReason":"STOP"}]}"#,
        )
        .await;

        let caption = api.client().caption().caption(request()).await.unwrap();
        assert_eq!(caption, "  A fox in snow.\n");

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].0,
            "/v1beta/models/gemini-test:generateContent?key=test-key"
        );
        assert_eq!(
            requests[0].1["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(requests[0].1["contents"][0]["parts"][1]["text"], "Describe it");
        api.stop().await;
    }

    #[actix_web::test]
    async fn test_blocked_prompt_is_response_error() {
        let api = CannedApi::start(200, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).await;

        let err = api.client().caption().caption(request()).await.unwrap_err();
        match err {
            StudioError::ResponseError(message) => {
                assert_eq!(message, "model returned no caption (SAFETY)")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        api.stop().await;
    }

    #[actix_web::test]
    async fn test_empty_candidate_reports_finish_reason() {
        let api = CannedApi::start(
            200,
            r#"{"candidates":[{"content":{"parts":[]},"finishReason":"RECITATION"}]}"#,
        )
        .await;

        let err = api.client().caption().caption(request()).await.unwrap_err();
        assert!(
            matches!(&err, StudioError::ResponseError(message) if message.contains("RECITATION")),
            "unexpected error: {:?}",
            err
        );
        api.stop().await;
    }

    #[actix_web::test]
    async fn test_vendor_error_message_is_kept() {
        let api = CannedApi::start(
            403,
            r#"{"error":{"code":403,"message":"API key not valid.","status":"PERMISSION_DENIED"}}"#,
        )
        .await;

        let err = api.client().caption().caption(request()).await.unwrap_err();
        match err {
            StudioError::ApiError { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        api.stop().await;
    }
}
