pub mod caption_client;
pub mod image_client;
pub mod traits;

#[cfg(test)]
pub mod fake;

use crate::{
    config::GenAiConfig,
    error::{Result, StudioError},
    models::caption::ApiErrorResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub use caption_client::CaptionClient;
pub use image_client::ImageClient;
pub use traits::{CaptionService, ImageSynthesisService};

/// Both hosted-model clients, sharing one HTTP connection pool and one API key.
#[derive(Clone)]
pub struct GenAiClient {
    caption_client: CaptionClient,
    image_client: ImageClient,
}

impl GenAiClient {
    pub fn new(config: &GenAiConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StudioError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            caption_client: CaptionClient::new(
                http.clone(),
                &config.api_base,
                api_key,
                &config.caption_model,
            ),
            image_client: ImageClient::new(http, &config.api_base, api_key, &config.image_model),
        })
    }

    pub fn caption(&self) -> &CaptionClient {
        &self.caption_client
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn caption_service(&self) -> Arc<dyn CaptionService> {
        Arc::new(self.caption_client.clone())
    }

    pub fn image_service(&self) -> Arc<dyn ImageSynthesisService> {
        Arc::new(self.image_client.clone())
    }
}

/// Decodes a 2xx body as `T`; anything else becomes `ApiError` with the vendor's message.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    service: &str,
) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| StudioError::ResponseError(format!("{} response unreadable: {}", service, e)))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or_else(|_| truncate(&body, 300));
        log::error!("{} service returned {}: {}", service, status, message);
        return Err(StudioError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        StudioError::SerializationError(format!("{} response malformed: {}", service, e))
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push('…');
    out
}
