use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::{Result, StudioError},
    genai::{read_json, ImageSynthesisService},
    models::{
        GeneratedImage, ImageGenerationRequest, ModelCategory, ModelInfo, PredictRequest,
        PredictResponse,
    },
};

#[derive(Clone)]
pub struct ImageClient {
    http: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl ImageClient {
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
        format!("{}/models/{}:predict", self.api_base, self.model)
    }

    pub fn supported_models() -> Vec<ModelInfo> {
        vec![
            ModelInfo::new(
                "imagen-4.0-generate-001",
                "Imagen 4",
                ModelCategory::Image,
                "Default text-to-image model",
            ),
            ModelInfo::new(
                "imagen-4.0-ultra-generate-001",
                "Imagen 4 Ultra",
                ModelCategory::Image,
                "Higher fidelity, slower",
            ),
            ModelInfo::new(
                "imagen-4.0-fast-generate-001",
                "Imagen 4 Fast",
                ModelCategory::Image,
                "Lower latency",
            ),
            ModelInfo::new(
                "imagen-3.0-generate-002",
                "Imagen 3",
                ModelCategory::Image,
                "Previous generation",
            ),
        ]
    }
}

#[async_trait]
impl ImageSynthesisService for ImageClient {
    async fn synthesize(&self, request: ImageGenerationRequest) -> Result<GeneratedImage> {
        let endpoint = self.endpoint();
        let payload = PredictRequest::from(&request);

        log::info!(
            "Generating {} image with model: {}",
            request.aspect_ratio,
            self.model
        );

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                StudioError::RequestError(format!(
                    "image request for {} failed: {}",
                    request.aspect_ratio, e
                ))
            })?;

        let body: PredictResponse = read_json(response, "image").await?;

        let mut filtered = None;
        for prediction in body.predictions {
            if let Some(data) = prediction.bytes_base64_encoded.filter(|d| !d.is_empty()) {
                let mime_type = prediction
                    .mime_type
                    .unwrap_or_else(|| request.output_mime_type.clone());
                return Ok(GeneratedImage::new(request.aspect_ratio, mime_type, data));
            }
            if prediction.rai_filtered_reason.is_some() {
                filtered = prediction.rai_filtered_reason;
            }
        }

        Err(StudioError::ResponseError(match filtered {
            Some(reason) => format!(
                "no image generated for {}: {}",
                request.aspect_ratio, reason
            ),
            None => format!("no image generated for {}", request.aspect_ratio),
        }))
    }
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;
    use crate::{genai::fake::CannedApi, models::AspectRatio};

    fn request() -> ImageGenerationRequest {
        ImageGenerationRequest::new("a lighthouse at dusk", AspectRatio::Widescreen)
    }

    #[actix_web::test]
    async fn test_first_prediction_with_bytes_wins() {
        let api = CannedApi::start(
            200,
            r#"{"predictions":[{"raiFilteredReason":"filtered"},{"bytesBase64Encoded":"iVBORw==","mimeType":"image/png"}]}"#,
        )
        .await;

        let image = api.client().image().synthesize(request()).await.unwrap();
        assert_eq!(image.aspect_ratio, AspectRatio::Widescreen);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "iVBORw==");

        let requests = api.requests();
        assert_eq!(requests[0].0, "/v1beta/models/imagen-test:predict?key=test-key");
        assert_eq!(requests[0].1["instances"][0]["prompt"], "a lighthouse at dusk");
        assert_eq!(requests[0].1["parameters"]["aspectRatio"], "16:9");
        assert_eq!(requests[0].1["parameters"]["sampleCount"], 1);
        api.stop().await;
    }

    #[actix_web::test]
    async fn test_missing_mime_type_falls_back_to_requested() {
        let api = CannedApi::start(200, r#"{"predictions":[{"bytesBase64Encoded":"/9j/"}]}"#).await;

        let image = api.client().image().synthesize(request()).await.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        api.stop().await;
    }

    #[actix_web::test]
    async fn test_filtered_prediction_names_the_ratio() {
        let api = CannedApi::start(
            200,
            r#"{"predictions":[{"raiFilteredReason":"blocked by safety filter"}]}"#,
        )
        .await;

        let err = api.client().image().synthesize(request()).await.unwrap_err();
        match err {
            StudioError::ResponseError(message) => assert_eq!(
                message,
                "no image generated for 16:9: blocked by safety filter"
            ),
            other => panic!("unexpected error: {:?}", other),
        }
        api.stop().await;
    }

    #[actix_web::test]
    async fn test_empty_predictions_is_response_error() {
        let api = CannedApi::start(200, r#"{}"#).await;

        let err = api.client().image().synthesize(request()).await.unwrap_err();
        match err {
            StudioError::ResponseError(message) => {
                assert_eq!(message, "no image generated for 16:9")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        api.stop().await;
    }
}
