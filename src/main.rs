//! open-vtt - Video to enhanced WebVTT subtitles
//!
//! Entry point: parses flags, sets up logging, loads configuration and runs
//! one of the serve, check, convert or self-test modes.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use open_vtt::check::run_check;
use open_vtt::cli::{Args, Mode};
use open_vtt::config::{Config, CONFIG_FILE};
use open_vtt::error::OpenVttError;
use open_vtt::media::MediaToolkitFactory;
use open_vtt::selftest::run_self_test;
use open_vtt::serve::serve;
use open_vtt::transcribe::TranscriberFactory;
use open_vtt::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let app_dir = std::env::current_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| app_dir.join(CONFIG_FILE));
    let config = Config::load(&config_path);

    let success = match args.mode() {
        Mode::Test => run_self_test(&app_dir).success(),
        Mode::Check => check(&config, &app_dir).await,
        Mode::Convert { video, output_vtt } => {
            convert(config, app_dir, &video, output_vtt.as_deref()).await
        }
        Mode::Serve { port } => match serve(&config, &app_dir, port).await {
            Ok(()) => true,
            Err(e) => {
                error!("Server failed: {}", e);
                false
            }
        },
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn check(config: &Config, app_dir: &Path) -> bool {
    let media = MediaToolkitFactory::create(config.media.clone());
    let transcriber =
        TranscriberFactory::detect(&config.transcription, Duration::from_secs(config.media.timeout_secs)).await;

    run_check(config, app_dir, media.as_ref(), transcriber.as_deref())
        .await
        .all_ok()
}

async fn convert(config: Config, app_dir: PathBuf, video: &Path, output_vtt: Option<&Path>) -> bool {
    info!("open-vtt Converter");

    let workflow = match Workflow::from_config(config, app_dir).await {
        Ok(workflow) => workflow,
        Err(e) => {
            error!("{}", e);
            if matches!(e, OpenVttError::MissingApiKey) {
                info!("Set the GEMINI_API_KEY environment variable or add it to secrets.json");
            }
            return false;
        }
    };

    match workflow.convert(video, output_vtt).await {
        Ok(_) => true,
        Err(e) => {
            error!("Conversion failed: {}", e);
            false
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".open-vtt").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "open-vtt.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("open-vtt.log").display()
    );

    Ok(())
}
