//! Problem and err records plus the fingerprint that groups occurrences.
//!
//! # Invariants
//! - A problem belongs to exactly one app.
//! - An err belongs to exactly one problem of the same app.
//! - `(app, fingerprint)` identifies at most one err.

use crate::model::app::AppId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProblemId = Uuid;
pub type ErrId = Uuid;

/// Composite dedup key of an error occurrence, compared field by field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Exception class name.
    pub klass: String,
    pub component: String,
    pub action: String,
    pub environment: String,
}

impl Fingerprint {
    pub fn new(
        klass: impl Into<String>,
        component: impl Into<String>,
        action: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            klass: klass.into(),
            component: component.into(),
            action: action.into(),
            environment: environment.into(),
        }
    }
}

/// Deduplicated grouping of identical occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub app_id: AppId,
    /// Occurrences recorded against this problem.
    pub notices_count: u64,
    /// Epoch ms of the latest occurrence, if any was recorded.
    pub last_notice_at: Option<i64>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

/// Fingerprint record owned by one problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrRecord {
    pub id: ErrId,
    pub problem_id: ProblemId,
    /// Owning app, denormalized from the problem for fingerprint lookups.
    pub app_id: AppId,
    pub fingerprint: Fingerprint,
}
