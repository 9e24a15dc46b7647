#![forbid(unsafe_code)]

pub mod admin_service;
pub mod app_services;
pub mod auth_service;
pub mod autosave;
pub mod config;
pub mod error;
pub mod export;
pub mod profile_service;
pub mod progress_service;
pub mod state_store;
pub mod telemetry;

pub use hub_core::Clock;

pub use admin_service::{AdminService, InternOverview};
pub use app_services::AppServices;
pub use auth_service::{AuthService, SignUpOutcome};
pub use autosave::{AutoSaveConfig, AutoSaveCoordinator, SaveIndicator};
pub use config::{BackendConfig, HubConfig};
pub use error::{
    AdminError, AppServicesError, AuthError, ConfigError, ExportError, ProfileError,
    ProgressServiceError,
};
pub use export::{ExportFormat, ProgressExport};
pub use profile_service::ProfileService;
pub use progress_service::ProgressService;
pub use state_store::StateStore;
pub use telemetry::{EventQueue, FlushOutcome, PageTimeTracker, QueueConfig, TeardownReason};
