//! App domain model and identity rules.
//!
//! # Responsibility
//! - Define the registered client application record.
//! - Own api key generation and the field-level validation error shape.
//!
//! # Invariants
//! - `name` is non-blank and unique across apps.
//! - `api_key` is unique across apps and immutable after creation.
//! - Generated api keys are 32 lowercase hexadecimal characters.
//! - `github_url` is either empty or already normalized.

use crate::github;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of an app.
pub type AppId = Uuid;

/// Length of a generated api key.
pub const API_KEY_LEN: usize = 32;

/// Notice counts at which a new notification is sent when an app does not
/// configure its own thresholds.
pub const DEFAULT_EMAIL_AT_NOTICES: [u32; 3] = [1, 10, 100];

/// Registered client application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub name: String,
    /// Credential presented by error reports. Never regenerated.
    pub api_key: String,
    /// Normalized `https://github.com/OWNER/REPO` or empty.
    pub github_url: String,
    /// Send alerts to every user instead of only this app's watchers.
    pub notify_all_users: bool,
    /// Master switch for err notifications.
    pub notify_on_errs: bool,
    /// Notice counts that trigger a notification.
    pub email_at_notices: Vec<u32>,
}

impl App {
    /// Returns whether a source repository is linked.
    pub fn has_repository(&self) -> bool {
        github::has_repository(&self.github_url)
    }

    /// Builds the browse URL of `path` on the linked repository.
    ///
    /// Only meaningful when [`App::has_repository`] is true.
    pub fn file_url(&self, path: &str) -> String {
        github::file_url(&self.github_url, path)
    }
}

/// Input for creating an app.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewApp {
    pub name: String,
    /// Caller-supplied key, used by fixtures and imports. Generated when `None`.
    pub api_key: Option<String>,
    /// Raw user input; normalized before persistence.
    pub github_url: String,
    pub notify_all_users: bool,
    pub notify_on_errs: bool,
    pub email_at_notices: Vec<u32>,
}

impl NewApp {
    /// Creates input with default notification settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: None,
            github_url: String::new(),
            notify_all_users: false,
            notify_on_errs: true,
            email_at_notices: DEFAULT_EMAIL_AT_NOTICES.to_vec(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_github_url(mut self, github_url: impl Into<String>) -> Self {
        self.github_url = github_url.into();
        self
    }

    pub fn with_notify_all_users(mut self, notify_all_users: bool) -> Self {
        self.notify_all_users = notify_all_users;
        self
    }
}

/// Partial update of mutable app settings.
///
/// There is deliberately no api key field: keys are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppUpdate {
    pub name: Option<String>,
    pub github_url: Option<String>,
    pub notify_all_users: Option<bool>,
    pub notify_on_errs: Option<bool>,
    pub email_at_notices: Option<Vec<u32>>,
}

/// App field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppField {
    Name,
    ApiKey,
}

impl AppField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ApiKey => "api_key",
        }
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    Blank,
    Duplicate,
}

/// Field-scoped rejection of an app create/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppValidationError {
    pub field: AppField,
    pub reason: ValidationReason,
}

impl AppValidationError {
    pub fn blank(field: AppField) -> Self {
        Self {
            field,
            reason: ValidationReason::Blank,
        }
    }

    pub fn duplicate(field: AppField) -> Self {
        Self {
            field,
            reason: ValidationReason::Duplicate,
        }
    }

    /// Message suitable for a field-level form error.
    pub fn message(&self) -> &'static str {
        match self.reason {
            ValidationReason::Blank => "can't be blank",
            ValidationReason::Duplicate => "is already taken",
        }
    }
}

impl Display for AppValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field.as_str(), self.message())
    }
}

impl Error for AppValidationError {}

/// Generates a fresh api key: 32 lowercase hex characters from a random v4
/// UUID.
pub fn generate_api_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Returns whether `value` has the shape of a generated api key.
pub fn is_generated_api_key(value: &str) -> bool {
    value.len() == API_KEY_LEN
        && value
            .bytes()
            .all(|byte| matches!(byte, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::{generate_api_key, is_generated_api_key, AppField, AppValidationError};

    #[test]
    fn generated_keys_are_lowercase_hex() {
        for _ in 0..64 {
            let key = generate_api_key();
            assert!(is_generated_api_key(&key), "unexpected key shape: {key}");
        }
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(generate_api_key(), generate_api_key());
    }

    #[test]
    fn key_shape_rejects_uppercase_and_wrong_length() {
        assert!(!is_generated_api_key("APIKEY"));
        assert!(!is_generated_api_key(&"A".repeat(32)));
        assert!(!is_generated_api_key(&"a".repeat(31)));
    }

    #[test]
    fn validation_error_renders_field_message() {
        let err = AppValidationError::duplicate(AppField::Name);
        assert_eq!(err.to_string(), "name is already taken");
        let err = AppValidationError::blank(AppField::Name);
        assert_eq!(err.to_string(), "name can't be blank");
    }
}
