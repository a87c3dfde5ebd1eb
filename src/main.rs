use std::{env, path::PathBuf, sync::Arc, thread};

use colored::Colorize;
use log::{error, info, warn};
use studiocard_collab::{
    ArcedDatabase, Config, DatabaseError, FileStorage, MemoryDatabase, PgDatabase, Studio,
};
use studiocard_server::{run_server, ServeError, DEFAULT_PORT};
use thiserror::Error;
use tokio::runtime::{self, Runtime};
use url::Url;

mod logging;

/// Settings read from the environment
struct Settings {
    port: u16,
    database_url: Option<String>,
    storage_dir: PathBuf,
    public_url: Url,
    checkout_url: Option<Url>,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not prepare storage directory: {0}")]
    Storage(std::io::Error),

    #[error(transparent)]
    Serve(#[from] ServeError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl StartupError {
    fn hint(&self) -> String {
        match self {
            Self::Config(_) => "Check the STUDIOCARD_* environment variables and try again.".to_string(),
            Self::Database(_) => "This is a database error. Make sure DATABASE_URL points to a running Postgres instance, or unset it to use an in-memory database.".to_string(),
            Self::Storage(_) => "Make sure STUDIOCARD_STORAGE_DIR is writable.".to_string(),
            Self::Serve(_) => "Make sure nothing else is listening on STUDIOCARD_SERVER_PORT.".to_string(),
            Self::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

impl Settings {
    fn from_env() -> Result<Self, StartupError> {
        let port = match env::var("STUDIOCARD_SERVER_PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|_| StartupError::Config(format!("Port must be a number, got {port}")))?,
            Err(_) => DEFAULT_PORT,
        };

        let public_url = env::var("STUDIOCARD_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let checkout_url = env::var("STUDIOCARD_CHECKOUT_URL")
            .ok()
            .map(|url| parse_url("STUDIOCARD_CHECKOUT_URL", &url))
            .transpose()?;

        Ok(Self {
            port,
            database_url: env::var("DATABASE_URL").ok(),
            storage_dir: env::var("STUDIOCARD_STORAGE_DIR")
                .unwrap_or_else(|_| "./storage".to_string())
                .into(),
            public_url: parse_url("STUDIOCARD_PUBLIC_URL", &public_url)?,
            checkout_url,
        })
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url, StartupError> {
    Url::parse(value).map_err(|e| StartupError::Config(format!("{name} is not a url: {e}")))
}

struct App {
    settings: Settings,
    studio: Arc<Studio>,
    runtime: Runtime,
}

impl App {
    fn new() -> Result<Self, StartupError> {
        let settings = Settings::from_env()?;

        info!("Building async runtime...");
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("studiocard-async")
            .build()
            .map_err(|e| StartupError::Fatal(e.to_string()))?;

        let database: ArcedDatabase = match &settings.database_url {
            Some(url) => {
                info!("Connecting to database...");
                Arc::new(runtime.block_on(PgDatabase::new(url))?)
            }
            None => {
                warn!("DATABASE_URL is not set, using an in-memory database. Nothing will be kept after a restart.");
                Arc::new(MemoryDatabase::new())
            }
        };

        let mut config = Config::default();

        if let Some(url) = &settings.checkout_url {
            config.checkout_url = url.clone();
        }

        let bucket_dir = settings.storage_dir.join(&config.storage_bucket);
        std::fs::create_dir_all(&bucket_dir).map_err(StartupError::Storage)?;

        let public_base = settings
            .public_url
            .join(&format!("storage/{}/", config.storage_bucket))
            .map_err(|e| StartupError::Config(e.to_string()))?;

        let storage = Arc::new(FileStorage::new(bucket_dir, public_base));
        let studio = Arc::new(Studio::with_password_provider(config, database, storage));

        Ok(Self {
            settings,
            studio,
            runtime,
        })
    }

    fn run(self) -> Result<(), StartupError> {
        let events = self.studio.events();
        thread::Builder::new()
            .name("studiocard-events".to_string())
            .spawn(move || logging::log_events(events))
            .map_err(|e| StartupError::Fatal(e.to_string()))?;

        let Self {
            settings,
            studio,
            runtime,
        } = self;

        runtime.block_on(run_server(studio, settings.port, settings.storage_dir))?;
        Ok(())
    }
}

fn report(error: StartupError) {
    error!(
        "{} Read the error below to troubleshoot the issue.",
        "Studio.Card failed to start!".bold().red()
    );
    error!("{}", error);
    error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
}

fn main() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Could not initialize logging: {e}");
    }

    match App::new() {
        Ok(app) => {
            info!("Initialized successfully.");

            if let Err(e) = app.run() {
                report(e);
            }
        }
        Err(e) => report(e),
    }
}
