use std::env;

use crate::error::{Result, StudioError};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CAPTION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_OUTPUT_MIME_TYPE: &str = "image/jpeg";
pub const DEFAULT_CAPTION_INSTRUCTION: &str = "Describe this image in rich visual detail so it can be \
used as a prompt for an image generation model. Cover the subject, composition, lighting, colors, \
and artistic style. Respond with the description only.";

#[derive(Debug, Clone)]
pub struct GenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub caption_model: String,
    pub image_model: String,
    pub caption_instruction: String,
    pub output_mime_type: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub genai: GenAiConfig,
    pub server: ServerConfig,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        GenAiConfig {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            caption_model: DEFAULT_CAPTION_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            caption_instruction: DEFAULT_CAPTION_INSTRUCTION.to_string(),
            output_mime_type: DEFAULT_OUTPUT_MIME_TYPE.to_string(),
        }
    }
}

impl GenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        GenAiConfig {
            api_key: non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("API_KEY")),
            api_base: non_empty_env("GENAI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            caption_model: non_empty_env("CAPTION_MODEL").unwrap_or(defaults.caption_model),
            image_model: non_empty_env("IMAGE_MODEL").unwrap_or(defaults.image_model),
            caption_instruction: non_empty_env("CAPTION_INSTRUCTION")
                .unwrap_or(defaults.caption_instruction),
            output_mime_type: non_empty_env("OUTPUT_MIME_TYPE")
                .unwrap_or(defaults.output_mime_type),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_models(
        mut self,
        caption_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        self.caption_model = caption_model.into();
        self.image_model = image_model.into();
        self
    }

    pub fn with_caption_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.caption_instruction = instruction.into();
        self
    }

    pub fn with_output_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.output_mime_type = mime_type.into();
        self
    }

    /// The API key, or a configuration error naming the variables that were checked.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            StudioError::ConfigError("GEMINI_API_KEY (or API_KEY) is not set".into())
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = non_empty_env("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(defaults.port);

        ServerConfig { host, port }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            genai: GenAiConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        StudioConfig {
            genai: GenAiConfig::from_env(),
            server: ServerConfig::from_env(),
        }
    }

    pub fn with_genai(mut self, config: GenAiConfig) -> Self {
        self.genai = config;
        self
    }

    pub fn with_server(mut self, config: ServerConfig) -> Self {
        self.server = config;
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
