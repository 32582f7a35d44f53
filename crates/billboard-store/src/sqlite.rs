// ABOUTME: SQLite-backed document store for the users and announcements collections.
// ABOUTME: A unit of work owns the connection lock and an open transaction until commit or drop.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use billboard_core::error::StoreError;
use billboard_core::model::{Announcement, User};
use billboard_core::query::{AnnouncementQuery, fold_case};
use billboard_core::store::{DocumentStore, UnitOfWork};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

/// Errors that can occur during SQLite store operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SqliteError> for StoreError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Sqlite(rusqlite::Error::SqliteFailure(ref code, ref msg))
                if code.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::Duplicate(msg.clone().unwrap_or_else(|| code.to_string()))
            }
            SqliteError::Sqlite(rusqlite::Error::FromSqlConversionFailure(_, _, e)) => {
                StoreError::Corrupt(e.to_string())
            }
            SqliteError::Json(e) => StoreError::Corrupt(e.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        avatar TEXT NOT NULL,
        all_announcements TEXT NOT NULL DEFAULT '[]'
    );

    CREATE TABLE IF NOT EXISTS announcements (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        announcement_type TEXT NOT NULL,
        photo TEXT NOT NULL,
        creator TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS announcements_by_type ON announcements(announcement_type);
    CREATE INDEX IF NOT EXISTS announcements_by_creator ON announcements(creator);";

const USER_COLUMNS: &str = "id, name, email, avatar, all_announcements";
const ANNOUNCEMENT_COLUMNS: &str = "id, title, description, announcement_type, photo, creator";

/// A DocumentStore over a single SQLite connection.
///
/// The connection sits behind an async mutex. Plain reads take the lock for
/// one statement; a unit of work keeps it until it commits, aborts, or drops.
/// There is no foreign key from `announcements.creator` to `users.id`: the
/// back-reference is maintained by the consistency manager, not the schema.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a store database at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, SqliteError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open a private in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, SqliteError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SqliteError> {
        // SQLite's lower() only folds ASCII; title search needs full Unicode folding.
        conn.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let text: Option<String> = ctx.get(0)?;
                Ok(text.map(|t| fold_case(&t)))
            },
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn ulid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Ulid> {
    let raw: String = row.get(idx)?;
    Ulid::from_string(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let set: String = row.get(4)?;
    let all_announcements = serde_json::from_str(&set)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(User {
        id: ulid_column(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        avatar: row.get(3)?,
        all_announcements,
    })
}

fn announcement_from_row(row: &Row<'_>) -> rusqlite::Result<Announcement> {
    Ok(Announcement {
        id: ulid_column(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        announcement_type: row.get(3)?,
        photo: row.get(4)?,
        creator: ulid_column(row, 5)?,
    })
}

fn select_user(conn: &Connection, id: Ulid) -> Result<Option<User>, SqliteError> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id.to_string()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

fn select_announcement(conn: &Connection, id: Ulid) -> Result<Option<Announcement>, SqliteError> {
    let announcement = conn
        .query_row(
            &format!("SELECT {} FROM announcements WHERE id = ?1", ANNOUNCEMENT_COLUMNS),
            params![id.to_string()],
            announcement_from_row,
        )
        .optional()?;
    Ok(announcement)
}

fn select_users(conn: &Connection) -> Result<Vec<User>, SqliteError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id ASC", USER_COLUMNS))?;
    let rows = stmt.query_map([], user_from_row)?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Insert or overwrite a full user document.
fn upsert_user(conn: &Connection, user: &User) -> Result<(), SqliteError> {
    conn.execute(
        "INSERT INTO users (id, name, email, avatar, all_announcements)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            email = excluded.email,
            avatar = excluded.avatar,
            all_announcements = excluded.all_announcements",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.avatar,
            serde_json::to_string(&user.all_announcements)?,
        ],
    )?;
    Ok(())
}

/// Build the WHERE clause and its bound values for a list query.
fn where_clause(query: &AnnouncementQuery) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(ref kind) = query.filter.announcement_type {
        values.push(Value::Text(kind.clone()));
        clauses.push(format!("announcement_type = ?{}", values.len()));
    }
    if let Some(ref needle) = query.filter.title_like {
        values.push(Value::Text(fold_case(needle)));
        clauses.push(format!("instr(fold_case(title), ?{}) > 0", values.len()));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn run_query(
    conn: &Connection,
    query: &AnnouncementQuery,
) -> Result<(Vec<Announcement>, u64), SqliteError> {
    let (filter_sql, mut values) = where_clause(query);

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM announcements{}", filter_sql),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    // Ties fall back to id order so paging is stable.
    let order_sql = match query.sort {
        Some(sort) => format!(
            " ORDER BY {} {}, id ASC",
            sort.field.column(),
            sort.order.keyword()
        ),
        None => " ORDER BY id ASC".to_string(),
    };

    // SQLite treats a negative LIMIT as "no limit".
    let limit = query
        .page
        .limit
        .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
        .unwrap_or(-1);
    let offset = i64::try_from(query.page.offset).unwrap_or(i64::MAX);
    values.push(Value::Integer(limit));
    let limit_idx = values.len();
    values.push(Value::Integer(offset));
    let offset_idx = values.len();

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM announcements{}{} LIMIT ?{} OFFSET ?{}",
        ANNOUNCEMENT_COLUMNS, filter_sql, order_sql, limit_idx, offset_idx
    ))?;
    let rows = stmt.query_map(params_from_iter(values.iter()), announcement_from_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok((items, u64::try_from(total).unwrap_or(0)))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find_user(&self, id: Ulid) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().await;
        Ok(select_user(&conn, id)?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email],
                user_from_row,
            )
            .optional()
            .map_err(SqliteError::from)?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock().await;
        Ok(select_users(&conn)?)
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!(
                "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
                USER_COLUMNS
            ),
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.avatar,
                serde_json::to_string(&user.all_announcements).map_err(SqliteError::from)?,
            ],
        )
        .map_err(SqliteError::from)?;
        Ok(())
    }

    async fn find_announcement(&self, id: Ulid) -> Result<Option<Announcement>, StoreError> {
        let conn = self.conn.lock().await;
        Ok(select_announcement(&conn, id)?)
    }

    async fn find_announcements(&self, ids: &[Ulid]) -> Result<Vec<Announcement>, StoreError> {
        let conn = self.conn.lock().await;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(announcement) = select_announcement(&conn, *id)? {
                found.push(announcement);
            }
        }
        Ok(found)
    }

    async fn query_announcements(
        &self,
        query: &AnnouncementQuery,
    ) -> Result<(Vec<Announcement>, u64), StoreError> {
        let conn = self.conn.lock().await;
        Ok(run_query(&conn, query)?)
    }

    async fn replace_announcement(&self, announcement: &Announcement) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE announcements
                 SET title = ?1, description = ?2, announcement_type = ?3, photo = ?4
                 WHERE id = ?5",
                params![
                    announcement.title,
                    announcement.description,
                    announcement.announcement_type,
                    announcement.photo,
                    announcement.id.to_string(),
                ],
            )
            .map_err(SqliteError::from)?;
        Ok(changed > 0)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let conn = Arc::clone(&self.conn).lock_owned().await;
        conn.execute_batch("BEGIN IMMEDIATE;")
            .map_err(SqliteError::from)?;
        Ok(Box::new(SqliteUnitOfWork { conn, open: true }))
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute_batch("PRAGMA optimize; PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(SqliteError::from)?;
        tracing::info!("sqlite store flushed");
        Ok(())
    }
}

/// An open SQLite transaction. Holding the owned guard keeps every other
/// statement on this store waiting until the transaction ends.
struct SqliteUnitOfWork {
    conn: OwnedMutexGuard<Connection>,
    open: bool,
}

impl SqliteUnitOfWork {
    fn finish(&mut self, statement: &str) -> Result<(), StoreError> {
        self.open = false;
        self.conn
            .execute_batch(statement)
            .map_err(SqliteError::from)?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn find_user(&mut self, id: Ulid) -> Result<Option<User>, StoreError> {
        Ok(select_user(&self.conn, id)?)
    }

    async fn insert_announcement(&mut self, announcement: &Announcement) -> Result<(), StoreError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO announcements ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    ANNOUNCEMENT_COLUMNS
                ),
                params![
                    announcement.id.to_string(),
                    announcement.title,
                    announcement.description,
                    announcement.announcement_type,
                    announcement.photo,
                    announcement.creator.to_string(),
                ],
            )
            .map_err(SqliteError::from)?;
        Ok(())
    }

    async fn delete_announcement(&mut self, id: Ulid) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM announcements WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(SqliteError::from)?;
        Ok(removed > 0)
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        Ok(upsert_user(&self.conn, user)?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut uow = self;
        if let Err(e) = uow.finish("COMMIT;") {
            // A failed COMMIT can leave the transaction open.
            if !uow.conn.is_autocommit() {
                let _ = uow.conn.execute_batch("ROLLBACK;");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        let mut uow = self;
        uow.finish("ROLLBACK;")
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if self.open {
            tracing::warn!("unit of work dropped while open; rolling back");
            if let Err(e) = self.conn.execute_batch("ROLLBACK;") {
                tracing::error!("rollback on drop failed: {}", e);
            }
        }
    }
}
