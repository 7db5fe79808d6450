pub mod config;
pub mod error;
pub mod genai;
pub mod logger;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
pub mod studio;

pub use config::{GenAiConfig, ServerConfig, StudioConfig};
pub use error::{Result, StudioError};
pub use genai::{CaptionClient, CaptionService, GenAiClient, ImageClient, ImageSynthesisService};
pub use models::{
    AspectRatio, AspectRatioSelection, CaptionRequest, GeneratedImage, ImageGenerationRequest,
    UploadedImage,
};
pub use studio::{Studio, StudioSnapshot, Workflow, WorkflowState};
