//! In-memory services for exercising the workflow without network access.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::{
    error::{Result, StudioError},
    genai::{CaptionService, ImageSynthesisService},
    models::{AspectRatio, CaptionRequest, GeneratedImage, ImageGenerationRequest},
};

pub struct FakeCaptioner {
    reply: std::result::Result<String, String>,
    calls: Mutex<Vec<CaptionRequest>>,
}

impl FakeCaptioner {
    pub fn answering(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CaptionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionService for FakeCaptioner {
    async fn caption(&self, request: CaptionRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request);
        self.reply
            .clone()
            .map_err(|message| StudioError::ApiError {
                status: 500,
                message,
            })
    }
}

#[derive(Default)]
pub struct FakeGenerator {
    failing: HashSet<AspectRatio>,
    calls: Mutex<Vec<ImageGenerationRequest>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(ratio: AspectRatio) -> Self {
        Self {
            failing: HashSet::from([ratio]),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ImageGenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSynthesisService for FakeGenerator {
    async fn synthesize(&self, request: ImageGenerationRequest) -> Result<GeneratedImage> {
        self.calls.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.aspect_ratio) {
            return Err(StudioError::ApiError {
                status: 400,
                message: format!("refused {}", request.aspect_ratio),
            });
        }
        Ok(GeneratedImage::new(
            request.aspect_ratio,
            request.output_mime_type,
            "/9j/".to_string(),
        ))
    }
}

/// A local HTTP endpoint that answers every request with one canned status and body,
/// recording what it was sent.
#[cfg(feature = "server")]
pub struct CannedApi {
    pub api_base: String,
    seen: std::sync::Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    handle: actix_web::dev::ServerHandle,
}

#[cfg(feature = "server")]
impl CannedApi {
    pub async fn start(status: u16, body: &'static str) -> Self {
        use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};

        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let server = HttpServer::new(move || {
            let recorder = recorder.clone();
            App::new().default_service(web::to(move |req: HttpRequest, payload: web::Bytes| {
                let recorder = recorder.clone();
                async move {
                    let json = serde_json::from_slice(&payload).unwrap_or(serde_json::Value::Null);
                    recorder.lock().unwrap().push((req.uri().to_string(), json));
                    HttpResponse::build(StatusCode::from_u16(status).unwrap())
                        .content_type("application/json")
                        .body(body)
                }
            }))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            api_base: format!("http://{}/v1beta", addr),
            seen,
            handle,
        }
    }

    pub fn client(&self) -> crate::genai::GenAiClient {
        let config = crate::config::GenAiConfig::new()
            .with_api_key("test-key")
            .with_api_base(self.api_base.as_str())
            .with_models("gemini-test", "imagen-test");
        crate::genai::GenAiClient::new(&config).unwrap()
    }

    /// Request URIs (path and query) with their JSON bodies, in arrival order.
    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.seen.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}
