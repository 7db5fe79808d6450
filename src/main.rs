use clap::{Parser, Subcommand};
use reimagine::{
    logger::{self, LoggerConfig},
    models::{mime_from_path, AspectRatioSelection},
    AspectRatio, CaptionClient, GenAiClient, ImageClient, Studio, StudioConfig, StudioError,
    UploadedImage, Workflow,
};
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Debug, Parser)]
#[command(
    name = "reimagine",
    version,
    about = "Caption an image with a vision model and regenerate it across aspect ratios"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the browser studio (default)
    Serve(ServeArgs),
    /// Caption one image and generate it for the given ratios, without a browser
    Run(RunArgs),
    /// List known caption and image model ids
    Models,
}

#[derive(Debug, Default, Parser)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[arg(long)]
    image: PathBuf,
    /// Repeatable, e.g. `--ratio 16:9 --ratio 1:1`
    #[arg(long = "ratio", required = true)]
    ratios: Vec<AspectRatio>,
    /// Use this prompt instead of the generated caption
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(LoggerConfig::from_env())?;
    if !dotenv_loaded {
        log::debug!("No .env file found, using system environment variables");
    }

    let cli = Cli::parse();
    let mut config = StudioConfig::from_env();

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Models => {
            log::info!("📚 Caption models:");
            for model in CaptionClient::supported_models() {
                log::info!("  {} - {} ({})", model.id, model.name, model.description);
            }
            log::info!("🖼️  Image models:");
            for model in ImageClient::supported_models() {
                log::info!("  {} - {} ({})", model.id, model.name, model.description);
            }
            Ok(())
        }
        Command::Run(args) => {
            logger::log_config_info(&config);
            run_headless(&config, args).await
        }
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.server = config.server.with_host(host);
            }
            if let Some(port) = args.port {
                config.server = config.server.with_port(port);
            }
            serve(&config).await
        }
    }
}

#[cfg(feature = "server")]
async fn serve(config: &StudioConfig) -> Result<(), Box<dyn std::error::Error>> {
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), config);
    logger::log_config_info(config);

    let client = GenAiClient::new(&config.genai)?;
    let workflow = Workflow::from_client(&client, &config.genai);
    reimagine::server::run(&config.server, workflow).await?;
    Ok(())
}

#[cfg(not(feature = "server"))]
async fn serve(_config: &StudioConfig) -> Result<(), Box<dyn std::error::Error>> {
    Err(StudioError::ConfigError("built without the `server` feature; use `run`".into()).into())
}

async fn run_headless(
    config: &StudioConfig,
    args: RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = GenAiClient::new(&config.genai)?;
    let workflow = Workflow::from_client(&client, &config.genai);
    let studio = Mutex::new(Studio::new());

    let mime_type = mime_from_path(&args.image).ok_or_else(|| {
        StudioError::UnsupportedMedia(format!("{} is not an image file", args.image.display()))
    })?;
    let bytes = tokio::fs::read(&args.image).await?;
    let mut image = UploadedImage::from_bytes(&bytes, mime_type)?;
    if let Some(name) = args.image.file_name().and_then(|name| name.to_str()) {
        image = image.with_file_name(name);
    }

    let caption = workflow.upload(&studio, image).await?;
    log::info!("📝 Caption: {}", caption);

    {
        let mut studio = studio.lock().await;
        if let Some(prompt) = args.prompt {
            studio.set_prompt(prompt)?;
        }
        let wanted: AspectRatioSelection = args.ratios.into_iter().collect();
        for ratio in wanted.iter() {
            studio.toggle_ratio(ratio)?;
        }
    }

    workflow.generate(&studio).await?;

    tokio::fs::create_dir_all(&args.out).await?;
    let results = studio.lock().await.results().to_vec();
    for image in &results {
        let path = args.out.join(image.download_name());
        tokio::fs::write(&path, image.bytes()?).await?;
        log::info!("💾 {} saved to {}", image.aspect_ratio, path.display());
    }

    Ok(())
}
