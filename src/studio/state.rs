use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{Result, StudioError},
    models::{AspectRatio, AspectRatioSelection, GeneratedImage, UploadedImage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailedStage {
    Caption,
    Generation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkflowState {
    #[default]
    Idle,
    Analyzing,
    Ready,
    Generating,
    Displaying,
    Error { stage: FailedStage, message: String },
}

impl WorkflowState {
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowState::Analyzing | WorkflowState::Generating)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Analyzing => "analyzing",
            WorkflowState::Ready => "ready",
            WorkflowState::Generating => "generating",
            WorkflowState::Displaying => "displaying",
            WorkflowState::Error { .. } => "error",
        }
    }
}

/// What the generation step needs, taken out of the studio so no lock is held while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub prompt: String,
    pub ratios: Vec<AspectRatio>,
}

/// One browser session: the uploaded image, the editable prompt, the ratio picks and
/// the gallery. Every user action goes through a method here.
#[derive(Debug, Default)]
pub struct Studio {
    state: WorkflowState,
    image: Option<UploadedImage>,
    prompt: String,
    selection: AspectRatioSelection,
    results: Vec<GeneratedImage>,
    fullscreen: Option<AspectRatio>,
}

impl Studio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn selection(&self) -> &AspectRatioSelection {
        &self.selection
    }

    pub fn results(&self) -> &[GeneratedImage] {
        &self.results
    }

    pub fn uploaded_image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn fullscreen(&self) -> Option<AspectRatio> {
        self.fullscreen
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            WorkflowState::Error { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn image_for(&self, ratio: AspectRatio) -> Option<&GeneratedImage> {
        self.results.iter().find(|image| image.aspect_ratio == ratio)
    }

    /// A captioned image is on hand, so the prompt can be edited and generation run.
    fn has_caption(&self) -> bool {
        matches!(
            self.state,
            WorkflowState::Ready
                | WorkflowState::Displaying
                | WorkflowState::Error {
                    stage: FailedStage::Generation,
                    ..
                }
        )
    }

    pub fn can_generate(&self) -> bool {
        self.has_caption() && !self.prompt.trim().is_empty() && !self.selection.is_empty()
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        if self.is_busy() {
            return Err(StudioError::Busy(format!(
                "cannot {} while {}",
                action,
                self.state.name()
            )));
        }
        Ok(())
    }

    fn ensure_state(&self, expected: WorkflowState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(StudioError::InvalidState(format!(
                "cannot {} while {}",
                action,
                self.state.name()
            )));
        }
        Ok(())
    }

    /// Starts a fresh session around `image`. Returns the copy to be captioned.
    pub fn begin_upload(&mut self, image: UploadedImage) -> Result<UploadedImage> {
        self.ensure_idle("upload")?;

        self.prompt.clear();
        self.selection.clear();
        self.results.clear();
        self.fullscreen = None;
        self.image = Some(image.clone());
        self.state = WorkflowState::Analyzing;

        log::debug!("Upload accepted: {}", image.mime_type);
        Ok(image)
    }

    pub fn caption_succeeded(&mut self, caption: String) -> Result<()> {
        self.ensure_state(WorkflowState::Analyzing, "apply a caption")?;
        self.prompt = caption;
        self.state = WorkflowState::Ready;
        Ok(())
    }

    /// The upload is rolled back; the user starts over from a new upload.
    pub fn caption_failed(&mut self, message: impl Into<String>) -> Result<()> {
        self.ensure_state(WorkflowState::Analyzing, "record a caption failure")?;
        self.image = None;
        self.prompt.clear();
        self.state = WorkflowState::Error {
            stage: FailedStage::Caption,
            message: message.into(),
        };
        Ok(())
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) -> Result<()> {
        self.ensure_idle("edit the prompt")?;
        if !self.has_caption() {
            return Err(StudioError::InvalidState(
                "upload an image before editing the prompt".into(),
            ));
        }
        self.prompt = prompt.into();
        Ok(())
    }

    /// Returns whether `ratio` is selected after the toggle. Ratios are picked once a
    /// caption is on hand, since an upload starts from an empty selection.
    pub fn toggle_ratio(&mut self, ratio: AspectRatio) -> Result<bool> {
        self.ensure_idle("change aspect ratios")?;
        if !self.has_caption() {
            return Err(StudioError::InvalidState(
                "upload an image before choosing aspect ratios".into(),
            ));
        }
        Ok(self.selection.toggle(ratio))
    }

    /// Checks the generate gate and, if it passes, drops the previous gallery.
    pub fn begin_generation(&mut self) -> Result<GenerationJob> {
        self.ensure_idle("generate")?;
        if !self.has_caption() {
            return Err(StudioError::InvalidState(
                "upload and caption an image first".into(),
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(StudioError::InvalidState("the prompt is empty".into()));
        }
        if self.selection.is_empty() {
            return Err(StudioError::InvalidState(
                "select at least one aspect ratio".into(),
            ));
        }

        self.results.clear();
        self.fullscreen = None;
        self.state = WorkflowState::Generating;

        Ok(GenerationJob {
            prompt: self.prompt.clone(),
            ratios: self.selection.to_vec(),
        })
    }

    pub fn generation_succeeded(&mut self, images: Vec<GeneratedImage>) -> Result<()> {
        self.ensure_state(WorkflowState::Generating, "show results")?;
        self.results = images;
        self.state = WorkflowState::Displaying;
        Ok(())
    }

    /// Nothing from the failed run is kept. Prompt, ratios and image stay for a retry.
    pub fn generation_failed(&mut self, message: impl Into<String>) -> Result<()> {
        self.ensure_state(WorkflowState::Generating, "record a generation failure")?;
        self.results.clear();
        self.state = WorkflowState::Error {
            stage: FailedStage::Generation,
            message: message.into(),
        };
        Ok(())
    }

    pub fn open_fullscreen(&mut self, ratio: AspectRatio) -> Result<()> {
        if self.image_for(ratio).is_none() {
            return Err(StudioError::NotFound(format!("no {} image to show", ratio)));
        }
        self.fullscreen = Some(ratio);
        Ok(())
    }

    pub fn close_fullscreen(&mut self) {
        self.fullscreen = None;
    }

    pub fn snapshot(&self) -> StudioSnapshot {
        StudioSnapshot {
            state: self.state.clone(),
            busy: self.is_busy(),
            error: self.error_message().map(str::to_string),
            source: self.image.as_ref().map(|image| SourcePreview {
                mime_type: image.mime_type.clone(),
                file_name: image.file_name.clone(),
                data_url: format!("data:{};base64,{}", image.mime_type, image.data),
            }),
            prompt: self.prompt.clone(),
            selected_ratios: self.selection.to_vec(),
            can_generate: self.can_generate(),
            gallery: self.results.iter().map(GalleryEntry::from).collect(),
            fullscreen: self.fullscreen,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudioSnapshot {
    pub state: WorkflowState,
    pub busy: bool,
    pub error: Option<String>,
    pub source: Option<SourcePreview>,
    pub prompt: String,
    pub selected_ratios: Vec<AspectRatio>,
    pub can_generate: bool,
    pub gallery: Vec<GalleryEntry>,
    pub fullscreen: Option<AspectRatio>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcePreview {
    pub mime_type: String,
    pub file_name: Option<String>,
    pub data_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryEntry {
    pub id: String,
    pub aspect_ratio: AspectRatio,
    pub slug: String,
    pub mime_type: String,
    pub download_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&GeneratedImage> for GalleryEntry {
    fn from(image: &GeneratedImage) -> Self {
        Self {
            id: image.id.clone(),
            aspect_ratio: image.aspect_ratio,
            slug: image.aspect_ratio.slug(),
            mime_type: image.mime_type.clone(),
            download_name: image.download_name(),
            created_at: image.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> UploadedImage {
        UploadedImage::from_bytes(b"\x89PNG\r\n", "image/png").unwrap()
    }

    fn captioned(text: &str) -> Studio {
        let mut studio = Studio::new();
        studio.begin_upload(png()).unwrap();
        studio.caption_succeeded(text.to_string()).unwrap();
        studio
    }

    fn image(ratio: AspectRatio) -> GeneratedImage {
        GeneratedImage::new(ratio, "image/jpeg", "AAAA".into())
    }

    #[test]
    fn test_upload_clears_previous_session() {
        let mut studio = captioned("a cat");
        studio.toggle_ratio(AspectRatio::Square).unwrap();
        studio.begin_generation().unwrap();
        studio
            .generation_succeeded(vec![image(AspectRatio::Square)])
            .unwrap();
        studio.open_fullscreen(AspectRatio::Square).unwrap();

        studio.begin_upload(png()).unwrap();

        assert_eq!(studio.state(), &WorkflowState::Analyzing);
        assert_eq!(studio.prompt(), "");
        assert!(studio.selection().is_empty());
        assert!(studio.results().is_empty());
        assert_eq!(studio.fullscreen(), None);
        assert!(studio.uploaded_image().is_some());
    }

    #[test]
    fn test_caption_populates_prompt_exactly() {
        let studio = captioned("  A lighthouse, oil painting.\n");
        assert_eq!(studio.state(), &WorkflowState::Ready);
        assert_eq!(studio.prompt(), "  A lighthouse, oil painting.\n");
    }

    #[test]
    fn test_caption_failure_discards_upload() {
        let mut studio = Studio::new();
        studio.begin_upload(png()).unwrap();
        studio.caption_failed("vision service down").unwrap();

        assert!(studio.uploaded_image().is_none());
        assert_eq!(studio.error_message(), Some("vision service down"));
        assert!(!studio.can_generate());
        assert!(studio.set_prompt("typed anyway").is_err());

        // a new upload restarts cleanly
        studio.begin_upload(png()).unwrap();
        assert_eq!(studio.state(), &WorkflowState::Analyzing);
    }

    #[test]
    fn test_busy_refuses_actions() {
        let mut studio = Studio::new();
        studio.begin_upload(png()).unwrap();

        assert!(matches!(studio.begin_upload(png()), Err(StudioError::Busy(_))));
        assert!(matches!(
            studio.toggle_ratio(AspectRatio::Square),
            Err(StudioError::Busy(_))
        ));
        assert!(matches!(studio.set_prompt("x"), Err(StudioError::Busy(_))));
        assert!(matches!(studio.begin_generation(), Err(StudioError::Busy(_))));
    }

    #[test]
    fn test_generate_gate() {
        let mut studio = captioned("a cat");
        assert!(!studio.can_generate());
        assert!(studio.begin_generation().is_err());
        assert_eq!(studio.state(), &WorkflowState::Ready);

        studio.toggle_ratio(AspectRatio::Widescreen).unwrap();
        studio.set_prompt("   ").unwrap();
        assert!(!studio.can_generate());
        assert!(studio.begin_generation().is_err());

        studio.set_prompt("a cat on a sofa").unwrap();
        assert!(studio.can_generate());
        let job = studio.begin_generation().unwrap();
        assert_eq!(job.prompt, "a cat on a sofa");
        assert_eq!(job.ratios, vec![AspectRatio::Widescreen]);
        assert_eq!(studio.state(), &WorkflowState::Generating);
    }

    #[test]
    fn test_generate_requires_caption() {
        let mut studio = Studio::new();
        assert!(!studio.can_generate());
        assert!(matches!(
            studio.begin_generation(),
            Err(StudioError::InvalidState(_))
        ));
    }

    #[test]
    fn test_ratios_wait_for_a_caption() {
        let mut studio = Studio::new();
        assert!(matches!(
            studio.toggle_ratio(AspectRatio::Square),
            Err(StudioError::InvalidState(_))
        ));
        assert!(studio.selection().is_empty());

        studio.begin_upload(png()).unwrap();
        studio.caption_failed("vision service down").unwrap();
        assert!(matches!(
            studio.toggle_ratio(AspectRatio::Square),
            Err(StudioError::InvalidState(_))
        ));
        assert!(studio.selection().is_empty());

        studio.begin_upload(png()).unwrap();
        studio.caption_succeeded("a cat".into()).unwrap();
        assert!(studio.toggle_ratio(AspectRatio::Square).unwrap());
    }

    #[test]
    fn test_generation_failure_keeps_inputs() {
        let mut studio = captioned("a cat");
        studio.toggle_ratio(AspectRatio::Square).unwrap();
        studio.toggle_ratio(AspectRatio::Portrait).unwrap();
        studio.begin_generation().unwrap();
        studio.generation_failed("quota exceeded").unwrap();

        assert!(studio.results().is_empty());
        assert_eq!(studio.prompt(), "a cat");
        assert_eq!(studio.selection().len(), 2);
        assert!(studio.uploaded_image().is_some());
        assert!(studio.can_generate());
        assert_eq!(studio.begin_generation().unwrap().ratios.len(), 2);
    }

    #[test]
    fn test_regeneration_replaces_results() {
        let mut studio = captioned("a cat");
        studio.toggle_ratio(AspectRatio::Square).unwrap();
        studio.toggle_ratio(AspectRatio::Landscape).unwrap();
        studio.begin_generation().unwrap();
        studio
            .generation_succeeded(vec![
                image(AspectRatio::Square),
                image(AspectRatio::Landscape),
            ])
            .unwrap();
        assert_eq!(studio.results().len(), 2);

        studio.toggle_ratio(AspectRatio::Landscape).unwrap();
        let job = studio.begin_generation().unwrap();
        assert!(studio.results().is_empty());
        studio
            .generation_succeeded(vec![image(job.ratios[0])])
            .unwrap();

        assert_eq!(studio.state(), &WorkflowState::Displaying);
        assert_eq!(studio.results().len(), 1);
        assert!(studio.image_for(AspectRatio::Landscape).is_none());
    }

    #[test]
    fn test_fullscreen_targets_gallery_only() {
        let mut studio = captioned("a cat");
        assert!(matches!(
            studio.open_fullscreen(AspectRatio::Square),
            Err(StudioError::NotFound(_))
        ));

        studio.toggle_ratio(AspectRatio::Square).unwrap();
        studio.begin_generation().unwrap();
        studio
            .generation_succeeded(vec![image(AspectRatio::Square)])
            .unwrap();
        studio.open_fullscreen(AspectRatio::Square).unwrap();
        assert_eq!(studio.fullscreen(), Some(AspectRatio::Square));
        studio.close_fullscreen();
        assert_eq!(studio.fullscreen(), None);
    }

    #[test]
    fn test_out_of_order_completion_is_rejected() {
        let mut studio = captioned("a cat");
        assert!(studio.caption_succeeded("again".into()).is_err());
        assert!(studio.generation_succeeded(Vec::new()).is_err());
        assert!(studio.generation_failed("late").is_err());
        assert_eq!(studio.state(), &WorkflowState::Ready);
    }

    #[test]
    fn test_snapshot_serializes_state() {
        let mut studio = captioned("a cat");
        studio.toggle_ratio(AspectRatio::Vertical).unwrap();
        let json = serde_json::to_value(studio.snapshot()).unwrap();

        assert_eq!(json["state"]["status"], "ready");
        assert_eq!(json["prompt"], "a cat");
        assert_eq!(json["selected_ratios"], serde_json::json!(["9:16"]));
        assert_eq!(json["can_generate"], true);
        assert_eq!(json["source"]["mime_type"], "image/png");

        studio.begin_generation().unwrap();
        studio.generation_failed("boom").unwrap();
        let json = serde_json::to_value(studio.snapshot()).unwrap();
        assert_eq!(json["state"]["status"], "error");
        assert_eq!(json["state"]["stage"], "generation");
        assert_eq!(json["error"], "boom");
    }
}
