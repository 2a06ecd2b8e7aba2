//! Occurrence ingestion: authenticate, deduplicate, count, resolve alerts.

use crate::model::app::App;
use crate::model::problem::{ErrRecord, Fingerprint};
use crate::model::user::User;
use crate::repo::app_repo::AppRepository;
use crate::repo::error::RepoError;
use crate::repo::problem_repo::ProblemRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::app_service::AppService;
use crate::service::dedup_service::DedupService;
use crate::service::notification_service::{should_notify, NotificationService};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors surfaced to the ingestion endpoint.
#[derive(Debug)]
pub enum IngestError {
    /// No app owns the presented api key.
    UnknownApiKey,
    /// Storage failure; the report can be retried.
    Repo(RepoError),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownApiKey => write!(f, "unknown api key"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownApiKey => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for IngestError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// What happened to one reported occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub app: App,
    pub err: ErrRecord,
    /// Whether this occurrence opened a new problem.
    pub created: bool,
    /// Occurrences recorded on the problem, including this one.
    pub notices_count: u64,
    /// Users to alert; empty when no notification is due.
    pub recipients: Vec<User>,
}

/// Ingestion pipeline wiring the identity, dedup and notification services.
pub struct IngestService<A, P, U>
where
    A: AppRepository,
    P: ProblemRepository,
    U: UserRepository,
{
    apps: AppService<A>,
    dedup: DedupService<P>,
    notifications: NotificationService<U>,
}

impl<A, P, U> IngestService<A, P, U>
where
    A: AppRepository,
    P: ProblemRepository,
    U: UserRepository,
{
    pub fn new(
        apps: AppService<A>,
        dedup: DedupService<P>,
        notifications: NotificationService<U>,
    ) -> Self {
        Self {
            apps,
            dedup,
            notifications,
        }
    }

    /// Records one occurrence reported with `api_key`.
    pub fn report(
        &self,
        api_key: &str,
        fingerprint: &Fingerprint,
    ) -> Result<IngestOutcome, IngestError> {
        let started_at = Instant::now();
        let Some(app) = self.apps.authenticate(api_key)? else {
            warn!("event=notice_ingest module=service status=rejected reason=unknown_api_key");
            return Err(IngestError::UnknownApiKey);
        };

        let outcome = self.dedup.find_or_create_err(&app, fingerprint)?;
        let problem = self.dedup.record_notice(&outcome.err)?;
        let recipients = if should_notify(&app, problem.notices_count) {
            self.notifications.recipients(&app)?
        } else {
            Vec::new()
        };

        info!(
            "event=notice_ingest module=service status=ok app_id={} problem_id={} created={} notices_count={} recipients={} duration_ms={}",
            app.id,
            problem.id,
            outcome.created,
            problem.notices_count,
            recipients.len(),
            started_at.elapsed().as_millis()
        );

        Ok(IngestOutcome {
            app,
            err: outcome.err,
            created: outcome.created,
            notices_count: problem.notices_count,
            recipients,
        })
    }
}
