use async_trait::async_trait;

use crate::{
    error::Result,
    models::{CaptionRequest, GeneratedImage, ImageGenerationRequest},
};

/// Turns an image into a natural-language description.
#[async_trait]
pub trait CaptionService: Send + Sync {
    async fn caption(&self, request: CaptionRequest) -> Result<String>;
}

/// Produces exactly one image per request, tagged with the request's aspect ratio.
#[async_trait]
pub trait ImageSynthesisService: Send + Sync {
    async fn synthesize(&self, request: ImageGenerationRequest) -> Result<GeneratedImage>;
}
