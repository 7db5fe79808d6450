pub mod state;
pub mod workflow;

pub use state::{
    FailedStage, GalleryEntry, GenerationJob, SourcePreview, Studio, StudioSnapshot,
    WorkflowState,
};
pub use workflow::Workflow;
