//! Problem/err repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Look up errs by `(app, fingerprint)` through the unique fingerprint index.
//! - Create a problem and its err as one atomic unit.
//! - Track per-problem occurrence counters.
//!
//! # Invariants
//! - `create_problem_with_err` never leaves a problem without its err or an
//!   err without its problem; any failure rolls back both rows.
//! - A lost race on the fingerprint index surfaces as `RepoError::Conflict`.

use crate::model::app::AppId;
use crate::model::problem::{ErrRecord, Fingerprint, Problem, ProblemId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema::{
    constraint_violation, ensure_connection_ready, parse_uuid, ConstraintViolation,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const PROBLEM_COLUMNS: &[&str] = &[
    "uuid",
    "app_uuid",
    "notices_count",
    "last_notice_at",
    "created_at",
];
const ERR_COLUMNS: &[&str] = &[
    "uuid",
    "problem_uuid",
    "app_uuid",
    "klass",
    "component",
    "action",
    "environment",
];

/// Repository interface for problem/err persistence.
pub trait ProblemRepository {
    /// Returns the err matching `fingerprint` exactly within `app_id`.
    fn find_err(&self, app_id: AppId, fingerprint: &Fingerprint) -> RepoResult<Option<ErrRecord>>;
    /// Inserts a new problem owned by `app_id` plus its err in one transaction.
    fn create_problem_with_err(
        &self,
        app_id: AppId,
        fingerprint: &Fingerprint,
    ) -> RepoResult<ErrRecord>;
    fn get_problem(&self, id: ProblemId) -> RepoResult<Option<Problem>>;
    /// Atomically bumps `notices_count` and returns the updated problem.
    fn record_notice(&self, id: ProblemId) -> RepoResult<Problem>;
    fn count_problems(&self, app_id: AppId) -> RepoResult<u64>;
    fn count_all_problems(&self) -> RepoResult<u64>;
}

/// SQLite-backed problem/err repository.
pub struct SqliteProblemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProblemRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[("problems", PROBLEM_COLUMNS), ("errs", ERR_COLUMNS)])?;
        Ok(Self { conn })
    }
}

impl ProblemRepository for SqliteProblemRepository<'_> {
    fn find_err(&self, app_id: AppId, fingerprint: &Fingerprint) -> RepoResult<Option<ErrRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                uuid,
                problem_uuid,
                app_uuid,
                klass,
                component,
                action,
                environment
             FROM errs
             WHERE app_uuid = ?1
               AND klass = ?2
               AND component = ?3
               AND action = ?4
               AND environment = ?5
             ORDER BY created_at ASC, uuid ASC
             LIMIT 1;",
        )?;

        let row = stmt
            .query_row(
                params![
                    app_id.to_string(),
                    fingerprint.klass.as_str(),
                    fingerprint.component.as_str(),
                    fingerprint.action.as_str(),
                    fingerprint.environment.as_str(),
                ],
                |row| Ok(parse_err_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn create_problem_with_err(
        &self,
        app_id: AppId,
        fingerprint: &Fingerprint,
    ) -> RepoResult<ErrRecord> {
        let record = ErrRecord {
            id: Uuid::new_v4(),
            problem_id: Uuid::new_v4(),
            app_id,
            fingerprint: fingerprint.clone(),
        };

        // Write lock is held from BEGIN; competing workers wait on busy_timeout.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_problem_and_err(&tx, &record).map_err(|err| map_create_error(err, app_id))?;
        tx.commit()?;

        Ok(record)
    }

    fn get_problem(&self, id: ProblemId) -> RepoResult<Option<Problem>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, app_uuid, notices_count, last_notice_at, created_at
             FROM problems
             WHERE uuid = ?1;",
        )?;
        let row = stmt
            .query_row([id.to_string()], |row| Ok(parse_problem_row(row)))
            .optional()?;
        row.transpose()
    }

    fn record_notice(&self, id: ProblemId) -> RepoResult<Problem> {
        let mut stmt = self.conn.prepare(
            "UPDATE problems
             SET
                notices_count = notices_count + 1,
                last_notice_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
             RETURNING uuid, app_uuid, notices_count, last_notice_at, created_at;",
        )?;
        let row = stmt
            .query_row([id.to_string()], |row| Ok(parse_problem_row(row)))
            .optional()?;

        match row {
            Some(problem) => problem,
            None => Err(RepoError::NotFound {
                entity: "problem",
                id,
            }),
        }
    }

    fn count_problems(&self, app_id: AppId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM problems WHERE app_uuid = ?1;",
            [app_id.to_string()],
            |row| row.get(0),
        )?;
        to_count(count)
    }

    fn count_all_problems(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM problems;", [], |row| row.get(0))?;
        to_count(count)
    }
}

fn insert_problem_and_err(tx: &Transaction<'_>, record: &ErrRecord) -> rusqlite::Result<()> {
    let app_uuid = record.app_id.to_string();
    let problem_uuid = record.problem_id.to_string();

    tx.execute(
        "INSERT INTO problems (uuid, app_uuid) VALUES (?1, ?2);",
        params![problem_uuid.as_str(), app_uuid.as_str()],
    )?;
    tx.execute(
        "INSERT INTO errs (
            uuid,
            problem_uuid,
            app_uuid,
            klass,
            component,
            action,
            environment
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            record.id.to_string(),
            problem_uuid.as_str(),
            app_uuid.as_str(),
            record.fingerprint.klass.as_str(),
            record.fingerprint.component.as_str(),
            record.fingerprint.action.as_str(),
            record.fingerprint.environment.as_str(),
        ],
    )?;
    Ok(())
}

fn map_create_error(err: rusqlite::Error, app_id: AppId) -> RepoError {
    match constraint_violation(&err) {
        Some(ConstraintViolation::Unique(message)) if message.contains("errs.") => {
            RepoError::Conflict(format!("fingerprint already recorded for app {app_id}"))
        }
        Some(ConstraintViolation::ForeignKey) => RepoError::NotFound {
            entity: "app",
            id: app_id,
        },
        _ => err.into(),
    }
}

fn parse_err_row(row: &Row<'_>) -> RepoResult<ErrRecord> {
    let uuid_text: String = row.get("uuid")?;
    let problem_text: String = row.get("problem_uuid")?;
    let app_text: String = row.get("app_uuid")?;

    Ok(ErrRecord {
        id: parse_uuid(&uuid_text, "errs.uuid")?,
        problem_id: parse_uuid(&problem_text, "errs.problem_uuid")?,
        app_id: parse_uuid(&app_text, "errs.app_uuid")?,
        fingerprint: Fingerprint {
            klass: row.get("klass")?,
            component: row.get("component")?,
            action: row.get("action")?,
            environment: row.get("environment")?,
        },
    })
}

fn parse_problem_row(row: &Row<'_>) -> RepoResult<Problem> {
    let uuid_text: String = row.get("uuid")?;
    let app_text: String = row.get("app_uuid")?;
    let notices_count: i64 = row.get("notices_count")?;

    Ok(Problem {
        id: parse_uuid(&uuid_text, "problems.uuid")?,
        app_id: parse_uuid(&app_text, "problems.app_uuid")?,
        notices_count: to_count(notices_count)?,
        last_notice_at: row.get("last_notice_at")?,
        created_at: row.get("created_at")?,
    })
}

fn to_count(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative count `{value}`")))
}
