use std::{
    net::{Ipv6Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use axum::routing::get;
use context::ServerContext;
use log::info;
use studiocard_collab::Studio;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

mod auth;
mod context;
mod docs;
mod errors;
mod lessons;
mod public;
mod schemas;
mod serialized;
mod students;
mod teacher;
mod tracks;


pub use auth::TEACHER_LOGIN_PATH;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

/// Recordings and images can be larger than the default body limit
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

pub type Router = axum::Router<ServerContext>;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Could not listen on port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },
    #[error("Server stopped: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds the router of the whole api
pub fn app(studio: Arc<Studio>, storage_dir: impl Into<PathBuf>) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/students", students::router())
        .nest("/tracks", tracks::router())
        .nest("/lessons", lessons::router())
        .nest("/teacher", teacher::router())
        .merge(public::router());

    Router::new()
        .nest("/v1", version_one_router)
        .nest("/api", public::checkout_router())
        .route("/api.json", get(docs::docs))
        .nest_service("/storage", ServeDir::new(storage_dir.into()))
        .layer(cors)
        .with_state(ServerContext { studio })
}

/// Starts the studiocard server
pub async fn run_server(
    studio: Arc<Studio>,
    port: u16,
    storage_dir: impl Into<PathBuf>,
) -> Result<(), ServeError> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind { port, source })?;

    info!("Listening on port {}", port);

    axum::serve(listener, app(studio, storage_dir).into_make_service()).await?;
    Ok(())
}
