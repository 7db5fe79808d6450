//! Browser surface for the studio: a single page plus a small JSON API.
//!
//! The server keeps one `Studio` for the process, so one user drives one session
//! at a time, the same way a single browser tab would.

use actix_web::{
    http::header,
    web::{self, Data, Json, Path, Query},
    App, HttpRequest, HttpResponse, HttpServer,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    config::ServerConfig,
    error::{Result, StudioError},
    models::{AspectRatio, UploadedImage},
    studio::{Studio, Workflow},
};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Largest upload accepted, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Header carrying the original file name of an upload.
pub const FILE_NAME_HEADER: &str = "X-File-Name";

pub struct AppState {
    pub studio: Mutex<Studio>,
    pub workflow: Workflow,
}

impl AppState {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            studio: Mutex::new(Studio::new()),
            workflow,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PromptUpdate {
    pub prompt: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub download: bool,
}

#[derive(Debug, Serialize)]
struct RatioOption {
    value: AspectRatio,
    label: &'static str,
    slug: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index)).service(
        web::scope("/api")
            .route("/state", web::get().to(get_state))
            .route("/aspect-ratios", web::get().to(aspect_ratios))
            .route("/upload", web::post().to(upload))
            .route("/prompt", web::put().to(set_prompt))
            .route("/ratios/{ratio}/toggle", web::post().to(toggle_ratio))
            .route("/generate", web::post().to(generate))
            .route("/images/{ratio}", web::get().to(get_image))
            .route("/fullscreen/{ratio}", web::post().to(open_fullscreen))
            .route("/fullscreen", web::delete().to(close_fullscreen)),
    );
}

pub async fn run(config: &ServerConfig, workflow: Workflow) -> std::io::Result<()> {
    let state = Data::new(AppState::new(workflow));

    log::info!(
        "🌐 Studio listening on http://{}:{}",
        config.host,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .configure(configure)
    })
    .bind(config.bind_address())?
    .run()
    .await
}

fn parse_ratio(raw: &str) -> Result<AspectRatio> {
    raw.parse()
        .map_err(|_| StudioError::NotFound(format!("unknown aspect ratio '{}'", raw)))
}

async fn snapshot(state: &AppState) -> HttpResponse {
    HttpResponse::Ok().json(state.studio.lock().await.snapshot())
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

async fn get_state(state: Data<AppState>) -> HttpResponse {
    snapshot(&state).await
}

async fn aspect_ratios() -> HttpResponse {
    let options: Vec<RatioOption> = AspectRatio::ALL
        .into_iter()
        .map(|ratio| RatioOption {
            value: ratio,
            label: ratio.label(),
            slug: ratio.slug(),
        })
        .collect();
    HttpResponse::Ok().json(options)
}

async fn upload(state: Data<AppState>, req: HttpRequest, body: web::Bytes) -> Result<HttpResponse> {
    let mime_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let mut image = UploadedImage::from_bytes(&body, mime_type).map_err(|e| {
        log::warn!("⚠️  Upload rejected: {}", e);
        e
    })?;
    if let Some(name) = req
        .headers()
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|name| !name.is_empty())
    {
        image = image.with_file_name(name);
    }

    state.workflow.upload(&state.studio, image).await?;
    Ok(snapshot(&state).await)
}

async fn set_prompt(state: Data<AppState>, update: Json<PromptUpdate>) -> Result<HttpResponse> {
    state
        .studio
        .lock()
        .await
        .set_prompt(update.into_inner().prompt)?;
    Ok(snapshot(&state).await)
}

async fn toggle_ratio(state: Data<AppState>, ratio: Path<String>) -> Result<HttpResponse> {
    let ratio = parse_ratio(&ratio)?;
    state.studio.lock().await.toggle_ratio(ratio)?;
    Ok(snapshot(&state).await)
}

async fn generate(state: Data<AppState>) -> Result<HttpResponse> {
    state.workflow.generate(&state.studio).await?;
    Ok(snapshot(&state).await)
}

async fn get_image(
    state: Data<AppState>,
    ratio: Path<String>,
    query: Query<ImageQuery>,
) -> Result<HttpResponse> {
    let ratio = parse_ratio(&ratio)?;
    let studio = state.studio.lock().await;
    let image = studio
        .image_for(ratio)
        .ok_or_else(|| StudioError::NotFound(format!("no {} image in the gallery", ratio)))?;

    let disposition = if query.download { "attachment" } else { "inline" };
    Ok(HttpResponse::Ok()
        .content_type(image.mime_type.as_str())
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("{}; filename=\"{}\"", disposition, image.download_name()),
        ))
        .body(image.bytes()?))
}

async fn open_fullscreen(state: Data<AppState>, ratio: Path<String>) -> Result<HttpResponse> {
    let ratio = parse_ratio(&ratio)?;
    state.studio.lock().await.open_fullscreen(ratio)?;
    Ok(snapshot(&state).await)
}

async fn close_fullscreen(state: Data<AppState>) -> HttpResponse {
    state.studio.lock().await.close_fullscreen();
    snapshot(&state).await
}
