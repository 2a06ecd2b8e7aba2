//! User/watcher repository contracts and SQLite implementation.
//!
//! Users and watchers are owned by the management surface; the engine only
//! reads them when resolving notification recipients.

use crate::model::app::AppId;
use crate::model::user::{User, UserId, Watcher};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema::{
    constraint_violation, ensure_connection_ready, parse_uuid, ConstraintViolation,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_COLUMNS: &[&str] = &["uuid", "email", "name"];
const WATCHER_COLUMNS: &[&str] = &["app_uuid", "user_uuid"];

/// Repository interface for users and app watchers.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    /// Case-insensitive lookup by email.
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Subscribes a user to an app. Re-subscribing is a no-op.
    fn add_watcher(&self, watcher: &Watcher) -> RepoResult<()>;
    /// Returns whether a subscription was removed.
    fn remove_watcher(&self, watcher: &Watcher) -> RepoResult<bool>;
    /// Full user roster ordered by email.
    fn all_users(&self) -> RepoResult<Vec<User>>;
    /// Users watching `app_id`, ordered by email.
    fn watchers_of(&self, app_id: AppId) -> RepoResult<Vec<User>>;
}

/// SQLite-backed user/watcher repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[("users", USER_COLUMNS), ("watchers", WATCHER_COLUMNS)])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        self.conn
            .execute(
                "INSERT INTO users (uuid, email, name) VALUES (?1, ?2, ?3);",
                params![user.id.to_string(), user.email.as_str(), user.name.as_str()],
            )
            .map_err(|err| match constraint_violation(&err) {
                Some(ConstraintViolation::Unique(message)) if message.contains("users.email") => {
                    RepoError::Duplicate {
                        table: "users",
                        column: "email",
                    }
                }
                _ => err.into(),
            })?;
        Ok(user.id)
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, email, name FROM users WHERE email = ?1 COLLATE NOCASE;")?;
        let row = stmt
            .query_row([email.trim()], |row| Ok(parse_user_row(row)))
            .optional()?;
        row.transpose()
    }

    fn add_watcher(&self, watcher: &Watcher) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO watchers (app_uuid, user_uuid) VALUES (?1, ?2);",
                params![watcher.app_id.to_string(), watcher.user_id.to_string()],
            )
            .map_err(|err| match constraint_violation(&err) {
                Some(ConstraintViolation::ForeignKey) => RepoError::InvalidReference(format!(
                    "watcher requires existing app {} and user {}",
                    watcher.app_id, watcher.user_id
                )),
                _ => err.into(),
            })?;
        Ok(())
    }

    fn remove_watcher(&self, watcher: &Watcher) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM watchers WHERE app_uuid = ?1 AND user_uuid = ?2;",
            params![watcher.app_id.to_string(), watcher.user_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn all_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, email, name
             FROM users
             ORDER BY email COLLATE NOCASE ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn watchers_of(&self, app_id: AppId) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.uuid AS uuid, u.email AS email, u.name AS name
             FROM watchers w
             INNER JOIN users u ON u.uuid = w.user_uuid
             WHERE w.app_uuid = ?1
             ORDER BY u.email COLLATE NOCASE ASC, u.uuid ASC;",
        )?;
        let mut rows = stmt.query([app_id.to_string()])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let uuid_text: String = row.get("uuid")?;
    Ok(User {
        id: parse_uuid(&uuid_text, "users.uuid")?,
        email: row.get("email")?,
        name: row.get("name")?,
    })
}
