//! filegate server binary.
//!
//! A small shared file drop: a fixed set of users from a JSON file log in with
//! a cookie and can upload, list, download and delete files kept as direct
//! children of one storage directory.

mod auth;
mod config;
mod credentials;
mod error;
mod files;
mod frontend;
mod http;
mod logging;
mod session;
mod storage;

use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, info_span};

use crate::auth::AuthContext;
use crate::config::{Args, SHUTDOWN_GRACE_SECS, ServerConfig};
use crate::credentials::CredentialStore;
use crate::session::PlainCredentialCodec;
use crate::storage::Storage;

shadow!(build);

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    let args = Args::parse();
    let config = match ServerConfig::load(&args) {
        Ok(config) => config,
        Err(err) => {
            error!(config = %args.config.display(), "{err}");
            return ExitCode::FAILURE;
        }
    };
    let credentials = match CredentialStore::load(&config.user_file) {
        Ok(store) => store,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        users = credentials.count().await,
        user_file = %config.user_file.display(),
        "credentials loaded"
    );

    let storage = Arc::new(Storage::new(config.file_dir.clone()));
    if let Err(err) = storage.ensure_root().await {
        error!(file_dir = %config.file_dir.display(), error = %err, "failed to create files directory");
        return ExitCode::FAILURE;
    }
    info!(file_dir = %storage.root_path().display(), "storage ready");
    let auth = Arc::new(AuthContext::new(
        credentials,
        Box::new(PlainCredentialCodec),
    ));

    let app = build_router(auth, storage, &args.static_dir);
    let handle = Handle::new();

    info!("🚀 Starting server on {}", config.addr);
    let server = axum_server::bind(config.addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                error!(error = %err, "server failed");
                return ExitCode::FAILURE;
            }
        }
        _ = shutdown_signal(handle) => {}
    }

    ExitCode::SUCCESS
}

fn build_router(auth: Arc<AuthContext>, storage: Arc<Storage>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(auth::main_page).post(auth::login))
        .route(
            "/upload",
            post(files::upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/files", get(files::list_files).post(files::list_files))
        .route("/delete", post(files::delete_file))
        .route("/download", get(files::download_file))
        .route("/logout", get(auth::logout).post(auth::logout))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(middleware::from_fn(auth::auth_middleware))
        .layer(middleware::from_fn(http::add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = http::client_origin(request);
                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(storage))
        .layer(Extension(auth))
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
