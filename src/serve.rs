use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{OpenVttError, Result};

/// Directories and the player page behind the local server
#[derive(Debug, Clone)]
pub struct ServeState {
    pub app_dir: PathBuf,
    pub media_dir: PathBuf,
    pub player: PathBuf,
}

/// `/` serves the player, `/media/*` the media directory.
///
/// Any other path is looked up in the media directory first (except `.html`
/// pages) and then in the application directory.
pub fn router(state: ServeState) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(&state.player))
        .nest_service("/media", ServeDir::new(&state.media_dir))
        .fallback(serve_static)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn serve_static(State(state): State<ServeState>, request: Request) -> Response {
    if request.uri().path().ends_with(".html") {
        return serve_from(&state.app_dir, request).await;
    }

    let retry = clone_request(&request);
    let response = serve_from(&state.media_dir, request).await;
    if response.status() != StatusCode::NOT_FOUND {
        return response;
    }

    serve_from(&state.app_dir, retry).await
}

async fn serve_from(root: &Path, request: Request) -> Response {
    match ServeDir::new(root).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

// GET requests carry no body, so method, URI and headers (Range included) are enough
fn clone_request(request: &Request) -> Request {
    let mut clone = Request::new(Body::empty());
    *clone.method_mut() = request.method().clone();
    *clone.uri_mut() = request.uri().clone();
    *clone.headers_mut() = request.headers().clone();
    clone
}

/// Number of `.mp4` and `.vtt` files directly inside `dir`
pub fn count_media(dir: &Path) -> (usize, usize) {
    let mut videos = 0;
    let mut subtitles = 0;

    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        match entry.path().extension().and_then(|e| e.to_str()) {
            Some("mp4") => videos += 1,
            Some("vtt") => subtitles += 1,
            _ => {}
        }
    }

    (videos, subtitles)
}

/// Serve the player and media until Ctrl+C or SIGTERM
pub async fn serve(config: &Config, app_dir: &Path, port: u16) -> Result<()> {
    let player = config.files.resolve_player(app_dir).ok_or_else(|| {
        OpenVttError::FileNotFound(format!("{} not found in {}", config.files.player, app_dir.display()))
    })?;
    let media_dir = config.files.resolve_media_dir(app_dir);

    let (videos, subtitles) = count_media(&media_dir);
    info!("Found {} video(s) and {} VTT file(s)", videos, subtitles);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Serving at http://localhost:{}", port);
    info!("Press Ctrl+C to stop");

    let state = ServeState {
        app_dir: app_dir.to_path_buf(),
        media_dir,
        player,
    };

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutdown signal received");
}
