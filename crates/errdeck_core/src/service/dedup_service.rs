//! Error deduplication use-case service.
//!
//! # Responsibility
//! - Match incoming occurrences against existing errs of one app.
//! - Create a problem plus err exactly once per distinct fingerprint.
//!
//! # Invariants
//! - Matching is exact equality on all four fingerprint fields, scoped to
//!   the given app.
//! - Get-or-create relies on the storage unique index: the create step either
//!   commits the problem/err pair or reports a conflict, after which the
//!   winner's err is re-read once and returned.
//! - Unrelated fingerprints and apps never share a lock held by this service.

use crate::model::app::App;
use crate::model::problem::{ErrRecord, Fingerprint, Problem};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::problem_repo::ProblemRepository;
use log::{debug, info, warn};
use std::time::Instant;

/// Result of a get-or-create lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupOutcome {
    pub err: ErrRecord,
    /// `true` only for the call that created the problem.
    pub created: bool,
}

/// Dedup engine over a problem repository.
pub struct DedupService<P: ProblemRepository> {
    repo: P,
}

impl<P: ProblemRepository> DedupService<P> {
    pub fn new(repo: P) -> Self {
        Self { repo }
    }

    /// Finds the err matching `fingerprint` within `app`.
    ///
    /// `Ok(None)` is the normal negative result.
    pub fn find_err(&self, app: &App, fingerprint: &Fingerprint) -> RepoResult<Option<ErrRecord>> {
        self.repo.find_err(app.id, fingerprint)
    }

    /// Returns the err for `fingerprint`, creating its problem on first sight.
    ///
    /// # Contract
    /// - Existing match -> `created = false`.
    /// - No match -> new problem + err committed together, `created = true`.
    /// - Concurrent first sightings resolve to one err; losers observe the
    ///   winner's err with `created = false`.
    /// - Storage failures propagate; no partial rows are left behind.
    pub fn find_or_create_err(
        &self,
        app: &App,
        fingerprint: &Fingerprint,
    ) -> RepoResult<DedupOutcome> {
        let started_at = Instant::now();

        if let Some(err) = self.repo.find_err(app.id, fingerprint)? {
            debug!(
                "event=err_dedup module=service status=ok app_id={} err_id={} created=false",
                app.id, err.id
            );
            return Ok(DedupOutcome {
                err,
                created: false,
            });
        }

        match self.repo.create_problem_with_err(app.id, fingerprint) {
            Ok(err) => {
                info!(
                    "event=err_dedup module=service status=ok app_id={} problem_id={} err_id={} created=true duration_ms={}",
                    app.id,
                    err.problem_id,
                    err.id,
                    started_at.elapsed().as_millis()
                );
                Ok(DedupOutcome { err, created: true })
            }
            Err(RepoError::Conflict(details)) => {
                warn!(
                    "event=err_dedup_conflict module=service status=retry app_id={} details={}",
                    app.id, details
                );
                match self.repo.find_err(app.id, fingerprint)? {
                    Some(err) => Ok(DedupOutcome {
                        err,
                        created: false,
                    }),
                    None => Err(RepoError::Conflict(details)),
                }
            }
            Err(err) => {
                warn!(
                    "event=err_dedup module=service status=error app_id={} error={}",
                    app.id, err
                );
                Err(err)
            }
        }
    }

    /// Counts one occurrence against the err's problem.
    pub fn record_notice(&self, err: &ErrRecord) -> RepoResult<Problem> {
        self.repo.record_notice(err.problem_id)
    }

    pub fn count_problems(&self, app: &App) -> RepoResult<u64> {
        self.repo.count_problems(app.id)
    }

    pub fn count_all_problems(&self) -> RepoResult<u64> {
        self.repo.count_all_problems()
    }
}
