use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::{Result, StudioError};
use crate::models::AspectRatio;

/// Only `image/*` MIME types pass the upload filter.
pub fn is_image_mime(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.strip_prefix("image/") {
        Some(subtype) => !subtype.is_empty(),
        None => false,
    }
}

/// Best-effort MIME type from a file extension.
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(mime)
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpeg",
    }
}

/// The image a user handed in. Lives only for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub mime_type: String,
    pub data: String, // Base64 encoded
    pub file_name: Option<String>,
}

impl UploadedImage {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<Self> {
        if !is_image_mime(mime_type) {
            return Err(StudioError::UnsupportedMedia(format!(
                "'{}' is not an image type",
                mime_type
            )));
        }
        if bytes.is_empty() {
            return Err(StudioError::UnsupportedMedia("uploaded file is empty".into()));
        }

        Ok(Self {
            mime_type: mime_type.trim().to_ascii_lowercase(),
            data: BASE64.encode(bytes),
            file_name: None,
        })
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len() / 4 * 3
    }
}

/// Parameters for one synthesis call. One request is issued per aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub number_of_images: u32,
    pub output_mime_type: String,
}

impl ImageGenerationRequest {
    pub fn new(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio,
            number_of_images: 1,
            output_mime_type: crate::config::DEFAULT_OUTPUT_MIME_TYPE.to_string(),
        }
    }

    pub fn with_output_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.output_mime_type = mime_type.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: String,
    pub aspect_ratio: AspectRatio,
    pub mime_type: String,
    pub data: String, // Base64 encoded
    pub created_at: DateTime<Utc>,
}

impl GeneratedImage {
    pub fn new(aspect_ratio: AspectRatio, mime_type: impl Into<String>, data: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            aspect_ratio,
            mime_type: mime_type.into(),
            data,
            created_at: Utc::now(),
        }
    }

    /// Filename offered when the user saves the image, e.g. `generated-image-16-9.jpeg`.
    pub fn download_name(&self) -> String {
        format!(
            "generated-image-{}.{}",
            self.aspect_ratio.slug(),
            extension_for_mime(&self.mime_type)
        )
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn bytes(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(self.data.as_bytes())?)
    }
}

// Imagen predict wire types

#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub instances: Vec<PredictInstance<'a>>,
    pub parameters: PredictParameters<'a>,
}

#[derive(Debug, Serialize)]
pub struct PredictInstance<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters<'a> {
    pub sample_count: u32,
    pub aspect_ratio: &'static str,
    pub output_options: OutputOptions<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions<'a> {
    pub mime_type: &'a str,
}

impl<'a> From<&'a ImageGenerationRequest> for PredictRequest<'a> {
    fn from(request: &'a ImageGenerationRequest) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: &request.prompt,
            }],
            parameters: PredictParameters {
                sample_count: request.number_of_images,
                aspect_ratio: request.aspect_ratio.as_str(),
                output_options: OutputOptions {
                    mime_type: &request.output_mime_type,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
    pub rai_filtered_reason: Option<String>,
}
