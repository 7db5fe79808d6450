use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    config::{GenAiConfig, DEFAULT_CAPTION_INSTRUCTION, DEFAULT_OUTPUT_MIME_TYPE},
    error::Result,
    genai::{CaptionService, GenAiClient, ImageSynthesisService},
    logger,
    models::{CaptionRequest, GeneratedImage, ImageGenerationRequest, UploadedImage},
    studio::{GenerationJob, Studio},
};

/// Drives a `Studio` through its network-bound steps. The studio lock is released
/// while a hosted model is working, so the UI can keep reading state.
#[derive(Clone)]
pub struct Workflow {
    captioner: Arc<dyn CaptionService>,
    generator: Arc<dyn ImageSynthesisService>,
    caption_instruction: String,
    output_mime_type: String,
}

impl Workflow {
    pub fn new(
        captioner: Arc<dyn CaptionService>,
        generator: Arc<dyn ImageSynthesisService>,
    ) -> Self {
        Self {
            captioner,
            generator,
            caption_instruction: DEFAULT_CAPTION_INSTRUCTION.to_string(),
            output_mime_type: DEFAULT_OUTPUT_MIME_TYPE.to_string(),
        }
    }

    pub fn from_client(client: &GenAiClient, config: &GenAiConfig) -> Self {
        Self::new(client.caption_service(), client.image_service())
            .with_caption_instruction(&config.caption_instruction)
            .with_output_mime_type(&config.output_mime_type)
    }

    pub fn with_caption_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.caption_instruction = instruction.into();
        self
    }

    pub fn with_output_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.output_mime_type = mime_type.into();
        self
    }

    /// Upload, then caption. On failure the studio lands in the caption error state
    /// with the upload discarded, and the error is returned as well.
    pub async fn upload(&self, studio: &Mutex<Studio>, image: UploadedImage) -> Result<String> {
        let image = studio.lock().await.begin_upload(image)?;

        let outcome = {
            let _timer = logger::timer("caption");
            self.captioner
                .caption(CaptionRequest::new(image, self.caption_instruction.as_str()))
                .await
        };

        let mut studio = studio.lock().await;
        match outcome {
            Ok(caption) => {
                log::info!("📝 Caption received ({} chars)", caption.chars().count());
                studio.caption_succeeded(caption.clone())?;
                Ok(caption)
            }
            Err(e) => {
                log::error!("❌ Captioning failed: {}", e);
                studio.caption_failed(format!("Could not describe the image: {}", e))?;
                Err(e)
            }
        }
    }

    /// Runs one generation for every selected ratio. Returns the number of images shown.
    pub async fn generate(&self, studio: &Mutex<Studio>) -> Result<usize> {
        let job = studio.lock().await.begin_generation()?;
        log::info!(
            "🎨 Generating {} image(s): {}",
            job.ratios.len(),
            job.ratios
                .iter()
                .map(|ratio| ratio.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let outcome = {
            let _timer = logger::timer("generation");
            self.generate_all(&job).await
        };

        let mut studio = studio.lock().await;
        match outcome {
            Ok(images) => {
                let count = images.len();
                studio.generation_succeeded(images)?;
                Ok(count)
            }
            Err(e) => {
                studio.generation_failed(format!("Image generation failed: {}", e))?;
                Err(e)
            }
        }
    }

    /// Issues every request at once and waits for all of them. Any failure fails the
    /// whole batch; calls already in flight still run to completion.
    pub async fn generate_all(&self, job: &GenerationJob) -> Result<Vec<GeneratedImage>> {
        let calls = job.ratios.iter().map(|&ratio| {
            let request = ImageGenerationRequest::new(job.prompt.clone(), ratio)
                .with_output_mime_type(self.output_mime_type.as_str());
            async move {
                let result = self.generator.synthesize(request).await;
                if let Err(e) = &result {
                    log::error!("❌ {} generation failed: {}", ratio, e);
                }
                result
            }
        });

        join_all(calls).await.into_iter().collect()
    }
}
