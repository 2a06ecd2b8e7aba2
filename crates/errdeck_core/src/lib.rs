//! App registry and error-deduplication engine for the errdeck error tracker.
//!
//! Client apps report exception occurrences; this crate issues app identity,
//! groups identical occurrences into problems and decides who is alerted.

pub mod config;
pub mod db;
pub mod github;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::app::{
    generate_api_key, is_generated_api_key, App, AppField, AppId, AppUpdate, AppValidationError,
    NewApp, ValidationReason, DEFAULT_EMAIL_AT_NOTICES,
};
pub use model::problem::{ErrId, ErrRecord, Fingerprint, Problem, ProblemId};
pub use model::user::{User, UserId, Watcher};
pub use repo::app_repo::{AppRepository, SqliteAppRepository};
pub use repo::error::{RepoError, RepoResult};
pub use repo::problem_repo::{ProblemRepository, SqliteProblemRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use service::app_service::{AppService, AppServiceError};
pub use service::dedup_service::{DedupOutcome, DedupService};
pub use service::ingest_service::{IngestError, IngestOutcome, IngestService};
pub use service::notification_service::{should_notify, NotificationService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
