//! App identity use-case service.
//!
//! # Responsibility
//! - Validate and create apps, assigning a unique api key at save time.
//! - Apply partial updates to mutable app settings.
//! - Authenticate inbound reports by api key.
//!
//! # Invariants
//! - Names must be non-blank and unique; caller-supplied api keys unique.
//! - A generated api key is only retried when the unique index rejects it;
//!   a stored key is never regenerated or rewritten.
//! - Repository unique violations that race past the pre-checks are mapped
//!   to the same field-level validation errors.

use crate::github;
use crate::model::app::{
    generate_api_key, App, AppField, AppId, AppUpdate, AppValidationError, NewApp,
};
use crate::repo::app_repo::AppRepository;
use crate::repo::error::{RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const MAX_API_KEY_ATTEMPTS: u32 = 5;

/// Errors from app identity operations.
#[derive(Debug)]
pub enum AppServiceError {
    /// Field-scoped rejection shown next to the offending form field.
    Validation(AppValidationError),
    AppNotFound(AppId),
    /// Every generated api key collided with an existing one.
    ApiKeyGenerationExhausted { attempts: u32 },
    Repo(RepoError),
}

impl Display for AppServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AppNotFound(id) => write!(f, "app not found: {id}"),
            Self::ApiKeyGenerationExhausted { attempts } => {
                write!(f, "could not generate a unique api key after {attempts} attempts")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AppValidationError> for AppServiceError {
    fn from(value: AppValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for AppServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "app", id } => Self::AppNotFound(id),
            RepoError::Duplicate {
                table: "apps",
                column: "name",
            } => Self::Validation(AppValidationError::duplicate(AppField::Name)),
            RepoError::Duplicate {
                table: "apps",
                column: "api_key",
            } => Self::Validation(AppValidationError::duplicate(AppField::ApiKey)),
            other => Self::Repo(other),
        }
    }
}

/// Identity manager over an app repository.
pub struct AppService<R: AppRepository> {
    repo: R,
}

impl<R: AppRepository> AppService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates and persists a new app.
    ///
    /// # Contract
    /// - Blank name -> `Validation{name, blank}`.
    /// - Name already used -> `Validation{name, duplicate}`.
    /// - Supplied api key already used -> `Validation{api_key, duplicate}`.
    /// - Without a supplied key, a 32-char lowercase hex key is generated.
    /// - `github_url` is normalized before persistence.
    pub fn create_app(&self, input: NewApp) -> Result<App, AppServiceError> {
        let started_at = Instant::now();
        let supplied_key = input
            .api_key
            .filter(|value| !value.trim().is_empty());

        if input.name.trim().is_empty() {
            return Err(AppValidationError::blank(AppField::Name).into());
        }
        if self.repo.find_app_by_name(&input.name)?.is_some() {
            return Err(AppValidationError::duplicate(AppField::Name).into());
        }
        if let Some(key) = supplied_key.as_deref() {
            if self.repo.find_app_by_api_key(key)?.is_some() {
                return Err(AppValidationError::duplicate(AppField::ApiKey).into());
            }
        }

        let mut app = App {
            id: Uuid::new_v4(),
            name: input.name,
            api_key: String::new(),
            github_url: github::normalize(&input.github_url),
            notify_all_users: input.notify_all_users,
            notify_on_errs: input.notify_on_errs,
            email_at_notices: normalize_thresholds(input.email_at_notices),
        };

        let key_source = if supplied_key.is_some() {
            "supplied"
        } else {
            "generated"
        };

        for attempt in 1..=MAX_API_KEY_ATTEMPTS {
            app.api_key = supplied_key.clone().unwrap_or_else(generate_api_key);
            match self.repo.create_app(&app) {
                Ok(_) => {
                    info!(
                        "event=app_create module=service status=ok app_id={} key_source={} attempts={} duration_ms={}",
                        app.id,
                        key_source,
                        attempt,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(app);
                }
                Err(RepoError::Duplicate {
                    table: "apps",
                    column: "api_key",
                }) if supplied_key.is_none() => {
                    warn!(
                        "event=app_create module=service status=retry app_id={} reason=api_key_collision attempt={}",
                        app.id, attempt
                    );
                }
                Err(err) => {
                    warn!(
                        "event=app_create module=service status=error app_id={} error={}",
                        app.id, err
                    );
                    return Err(err.into());
                }
            }
        }

        Err(AppServiceError::ApiKeyGenerationExhausted {
            attempts: MAX_API_KEY_ATTEMPTS,
        })
    }

    /// Applies a partial update. The api key is not updatable.
    pub fn update_app(&self, id: AppId, update: AppUpdate) -> Result<App, AppServiceError> {
        let mut app = self
            .repo
            .get_app(id)?
            .ok_or(AppServiceError::AppNotFound(id))?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(AppValidationError::blank(AppField::Name).into());
            }
            if let Some(existing) = self.repo.find_app_by_name(&name)? {
                if existing.id != id {
                    return Err(AppValidationError::duplicate(AppField::Name).into());
                }
            }
            app.name = name;
        }
        if let Some(github_url) = update.github_url {
            app.github_url = github::normalize(&github_url);
        }
        if let Some(notify_all_users) = update.notify_all_users {
            app.notify_all_users = notify_all_users;
        }
        if let Some(notify_on_errs) = update.notify_on_errs {
            app.notify_on_errs = notify_on_errs;
        }
        if let Some(thresholds) = update.email_at_notices {
            app.email_at_notices = normalize_thresholds(thresholds);
        }

        self.repo.update_app(&app)?;
        info!("event=app_update module=service status=ok app_id={}", app.id);
        Ok(app)
    }

    pub fn get_app(&self, id: AppId) -> RepoResult<Option<App>> {
        self.repo.get_app(id)
    }

    pub fn find_app_by_name(&self, name: &str) -> RepoResult<Option<App>> {
        self.repo.find_app_by_name(name)
    }

    /// Resolves the app owning `api_key`. Blank keys never match.
    pub fn authenticate(&self, api_key: &str) -> RepoResult<Option<App>> {
        if api_key.trim().is_empty() {
            return Ok(None);
        }
        self.repo.find_app_by_api_key(api_key)
    }

    pub fn list_apps(&self) -> RepoResult<Vec<App>> {
        self.repo.list_apps()
    }
}

/// Sorts thresholds ascending, dropping zeros and repeats.
pub fn normalize_thresholds(mut thresholds: Vec<u32>) -> Vec<u32> {
    thresholds.retain(|value| *value > 0);
    thresholds.sort_unstable();
    thresholds.dedup();
    thresholds
}
