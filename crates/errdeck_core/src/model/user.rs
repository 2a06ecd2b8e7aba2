//! Users and app watchers.
//!
//! Both are managed outside the dedup engine; core only reads them to
//! resolve notification recipients.

use crate::model::app::AppId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Person who can watch apps or receive global notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Subscription of one user to one app's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Watcher {
    pub app_id: AppId,
    pub user_id: UserId,
}
