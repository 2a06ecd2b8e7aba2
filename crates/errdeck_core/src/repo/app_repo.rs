//! App repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist and look up apps by id, name and api key.
//! - Translate storage-level unique/immutability failures into semantic
//!   repository errors.
//!
//! # Invariants
//! - Name and api key uniqueness are enforced by unique indexes, never by an
//!   in-process check alone.
//! - `apps.api_key` is guarded by a trigger; any write that changes it fails
//!   with `RepoError::ImmutableField("api_key")`.

use crate::model::app::{App, AppId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema::{
    bool_to_int, constraint_violation, ensure_connection_ready, int_to_bool, parse_uuid,
    ConstraintViolation,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const APP_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    api_key,
    github_url,
    notify_all_users,
    notify_on_errs,
    email_at_notices
FROM apps";

const APP_COLUMNS: &[&str] = &[
    "uuid",
    "name",
    "api_key",
    "github_url",
    "notify_all_users",
    "notify_on_errs",
    "email_at_notices",
];

/// Repository interface for app persistence.
pub trait AppRepository {
    /// Inserts a fully-formed app, including its api key.
    fn create_app(&self, app: &App) -> RepoResult<AppId>;
    /// Rewrites mutable settings of an existing app.
    fn update_app(&self, app: &App) -> RepoResult<()>;
    fn get_app(&self, id: AppId) -> RepoResult<Option<App>>;
    fn find_app_by_name(&self, name: &str) -> RepoResult<Option<App>>;
    fn find_app_by_api_key(&self, api_key: &str) -> RepoResult<Option<App>>;
    /// Lists apps ordered by name.
    fn list_apps(&self) -> RepoResult<Vec<App>>;
}

/// SQLite-backed app repository.
pub struct SqliteAppRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAppRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[("apps", APP_COLUMNS)])?;
        Ok(Self { conn })
    }
}

impl AppRepository for SqliteAppRepository<'_> {
    fn create_app(&self, app: &App) -> RepoResult<AppId> {
        self.conn
            .execute(
                "INSERT INTO apps (
                    uuid,
                    name,
                    api_key,
                    github_url,
                    notify_all_users,
                    notify_on_errs,
                    email_at_notices
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    app.id.to_string(),
                    app.name.as_str(),
                    app.api_key.as_str(),
                    app.github_url.as_str(),
                    bool_to_int(app.notify_all_users),
                    bool_to_int(app.notify_on_errs),
                    encode_thresholds(&app.email_at_notices),
                ],
            )
            .map_err(map_app_write_error)?;

        Ok(app.id)
    }

    fn update_app(&self, app: &App) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE apps
                 SET
                    name = ?1,
                    api_key = ?2,
                    github_url = ?3,
                    notify_all_users = ?4,
                    notify_on_errs = ?5,
                    email_at_notices = ?6,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?7;",
                params![
                    app.name.as_str(),
                    app.api_key.as_str(),
                    app.github_url.as_str(),
                    bool_to_int(app.notify_all_users),
                    bool_to_int(app.notify_on_errs),
                    encode_thresholds(&app.email_at_notices),
                    app.id.to_string(),
                ],
            )
            .map_err(map_app_write_error)?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "app",
                id: app.id,
            });
        }

        Ok(())
    }

    fn get_app(&self, id: AppId) -> RepoResult<Option<App>> {
        self.query_one("uuid", id.to_string().as_str())
    }

    fn find_app_by_name(&self, name: &str) -> RepoResult<Option<App>> {
        self.query_one("name", name)
    }

    fn find_app_by_api_key(&self, api_key: &str) -> RepoResult<Option<App>> {
        self.query_one("api_key", api_key)
    }

    fn list_apps(&self) -> RepoResult<Vec<App>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{APP_SELECT_SQL} ORDER BY name ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut apps = Vec::new();
        while let Some(row) = rows.next()? {
            apps.push(parse_app_row(row)?);
        }
        Ok(apps)
    }
}

impl SqliteAppRepository<'_> {
    fn query_one(&self, column: &'static str, value: &str) -> RepoResult<Option<App>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{APP_SELECT_SQL} WHERE {column} = ?1;"))?;
        let row = stmt
            .query_row([value], |row| Ok(parse_app_row(row)))
            .optional()?;
        row.transpose()
    }
}

/// Encodes notification thresholds as a comma separated list.
pub(crate) fn encode_thresholds(thresholds: &[u32]) -> String {
    thresholds
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn parse_thresholds(value: &str) -> RepoResult<Vec<u32>> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }

    value
        .split(',')
        .map(|part| {
            part.trim().parse::<u32>().map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid threshold `{part}` in apps.email_at_notices"
                ))
            })
        })
        .collect()
}

fn parse_app_row(row: &Row<'_>) -> RepoResult<App> {
    let uuid_text: String = row.get("uuid")?;
    let thresholds_text: String = row.get("email_at_notices")?;

    Ok(App {
        id: parse_uuid(&uuid_text, "apps.uuid")?,
        name: row.get("name")?,
        api_key: row.get("api_key")?,
        github_url: row.get("github_url")?,
        notify_all_users: int_to_bool(row.get("notify_all_users")?, "apps.notify_all_users")?,
        notify_on_errs: int_to_bool(row.get("notify_on_errs")?, "apps.notify_on_errs")?,
        email_at_notices: parse_thresholds(&thresholds_text)?,
    })
}

fn map_app_write_error(err: rusqlite::Error) -> RepoError {
    match constraint_violation(&err) {
        Some(ConstraintViolation::Unique(message)) if message.contains("apps.name") => {
            RepoError::Duplicate {
                table: "apps",
                column: "name",
            }
        }
        Some(ConstraintViolation::Unique(message)) if message.contains("apps.api_key") => {
            RepoError::Duplicate {
                table: "apps",
                column: "api_key",
            }
        }
        Some(ConstraintViolation::Trigger(message)) if message.contains("api_key") => {
            RepoError::ImmutableField("api_key")
        }
        _ => err.into(),
    }
}
