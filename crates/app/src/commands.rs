use std::error::Error;
use std::path::{Path, PathBuf};

use hub_core::Clock;
use hub_core::model::Category;
use services::config::{backend_from_env, fetch_backend_config};
use services::export::export_progress;
use services::{AppServices, ExportFormat, FlushOutcome, HubConfig, ProgressExport, TeardownReason};
use ui::{AppContext, BrowserLocation, RouteOutcome, RouteTable, Router};

use crate::args::{ArgsError, Connection, Credentials};

type BoxError = Box<dyn Error + Send + Sync>;

/// Backend parameters from `--config-url` or the environment, then local
/// overrides from the environment and finally from flags.
pub async fn load_config(connection: &Connection) -> Result<HubConfig, BoxError> {
    let backend = match &connection.config_url {
        Some(url) => fetch_backend_config(&reqwest::Client::new(), url).await?,
        None => backend_from_env()?,
    };
    let mut config = HubConfig::new(backend).with_overrides(|key| std::env::var(key).ok());
    if let Some(local_db) = &connection.local_db {
        config.local_db_url.clone_from(local_db);
    }
    Ok(config)
}

pub async fn connect(config: &HubConfig) -> Result<AppServices, BoxError> {
    // Create the SQLite file here so the libraries never touch the filesystem.
    prepare_sqlite_file(&config.local_db_url)?;
    Ok(AppServices::connect(config, Clock::default_clock()).await?)
}

/// Resolve `path` the way a fresh tab would, optionally signed in first,
/// and return the outcome with the HTML left on screen.
pub async fn render(
    services: AppServices,
    site_origin: &str,
    path: &str,
    credentials: Option<&Credentials>,
) -> Result<(RouteOutcome, String), BoxError> {
    let (location, _signals) = BrowserLocation::new(&format!("{site_origin}/"))?;
    let router = Router::new(AppContext::new(services.clone()), RouteTable::standard(), location);

    if let Some(credentials) = credentials {
        router
            .sign_in(&credentials.email, &credentials.password)
            .await?;
    }
    let outcome = router.navigate_to(path).await;
    let html = router.surface().html();

    router.shutdown(TeardownReason::TabClose).await;
    let flushed = services.events().flush().await;
    tracing::debug!(?flushed, "events flushed after render");
    Ok((outcome, html))
}

/// Sign in and render one category's progress.
pub async fn export(
    services: &AppServices,
    credentials: &Credentials,
    category: Category,
    format: ExportFormat,
) -> Result<ProgressExport, BoxError> {
    let user = services
        .auth()
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    let record = services.progress().ensure_loaded(category).await?;
    let document = export_progress(&user, &record, format, &services.clock())?;
    tracing::info!(user = %user.id, %category, file = %document.file_name, "progress exported");
    Ok(document)
}

pub async fn write_export(document: &ProgressExport, out: Option<&Path>) -> Result<PathBuf, BoxError> {
    let path = out.map_or_else(|| PathBuf::from(&document.file_name), Path::to_path_buf);
    tokio::fs::write(&path, &document.body).await?;
    Ok(path)
}

/// Deliver whatever a previous run left in the local event queue.
pub async fn flush(services: &AppServices) -> FlushOutcome {
    let queued = services.events().len().await;
    let outcome = services.events().flush().await;
    match outcome {
        FlushOutcome::Requeued(count) => {
            tracing::warn!(count, "event batch rejected, kept for the next run");
        }
        _ => tracing::info!(queued, ?outcome, "event queue flushed"),
    }
    outcome
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), BoxError> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
