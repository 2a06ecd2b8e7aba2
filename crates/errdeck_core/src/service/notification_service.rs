//! Notification recipient resolution.
//!
//! # Invariants
//! - `notify_all_users` selects the whole roster; otherwise only the app's
//!   watchers are returned.
//! - An app with no watchers yields an empty recipient list, not an error.

use crate::model::app::App;
use crate::model::user::User;
use crate::repo::error::RepoResult;
use crate::repo::user_repo::UserRepository;
use log::debug;

/// Resolves who should be alerted about an app's problems.
pub struct NotificationService<U: UserRepository> {
    users: U,
}

impl<U: UserRepository> NotificationService<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    /// Returns the recipients for `app`, unique and ordered by email.
    pub fn recipients(&self, app: &App) -> RepoResult<Vec<User>> {
        let recipients = if app.notify_all_users {
            self.users.all_users()?
        } else {
            self.users.watchers_of(app.id)?
        };

        debug!(
            "event=notify_resolve module=service status=ok app_id={} all_users={} recipients={}",
            app.id,
            app.notify_all_users,
            recipients.len()
        );
        Ok(recipients)
    }
}

/// Returns whether reaching `notices_count` occurrences should alert.
pub fn should_notify(app: &App, notices_count: u64) -> bool {
    app.notify_on_errs
        && app
            .email_at_notices
            .iter()
            .any(|threshold| u64::from(*threshold) == notices_count)
}
