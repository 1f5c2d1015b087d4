//! SQLite-backed memo, ledger and settings store.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{ResurfaceError, ResurfaceResult};
use crate::traits::{MemoStore, ReviewLedger, UserSettingStore};
use crate::types::{
    Memo, MemoFilter, MemoId, MemoReview, MemoReviewFilter, MemoReviewSummary, MemoStatus,
    NewMemo, NewMemoReview, NewReviewSession, ReviewSession, ReviewSessionFilter, ReviewSource,
    ReviewUserSetting, UserId,
};

/// Single-connection SQLite store implementing every collaborator trait.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn timestamp(secs: i64) -> ResurfaceResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ResurfaceError::parse(format!("timestamp out of range: {}", secs)))
}

fn parse_source(raw: &str) -> ResurfaceResult<ReviewSource> {
    ReviewSource::from_str(raw)
        .map_err(|_| ResurfaceError::parse(format!("unknown review source '{}'", raw)))
}

/// Builds a `WHERE` clause with positional parameters.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Conditions {
    fn push(&mut self, clause: &str, value: impl Into<Value>) {
        self.values.push(value.into());
        self.clauses
            .push(clause.replace('?', &format!("?{}", self.values.len())));
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn limit_clause(limit: Option<usize>) -> String {
    limit.map(|l| format!(" LIMIT {}", l)).unwrap_or_default()
}

struct MemoRow {
    id: i32,
    creator_id: i32,
    content: Option<String>,
    tags: String,
    status: String,
    created_ts: i64,
    updated_ts: i64,
}

impl MemoRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            creator_id: row.get(1)?,
            content: row.get(2)?,
            tags: row.get(3)?,
            status: row.get(4)?,
            created_ts: row.get(5)?,
            updated_ts: row.get(6)?,
        })
    }

    fn into_memo(self) -> ResurfaceResult<Memo> {
        Ok(Memo {
            id: MemoId(self.id),
            creator_id: UserId(self.creator_id),
            content: self.content,
            tags: serde_json::from_str(&self.tags)?,
            status: MemoStatus::from_str(&self.status).map_err(|_| {
                ResurfaceError::parse(format!("unknown memo status '{}'", self.status))
            })?,
            created_at: timestamp(self.created_ts)?,
            updated_at: timestamp(self.updated_ts)?,
        })
    }
}

type SessionRow = (i32, i32, i64, i32, String);
type ReviewRow = (i32, i32, i32, i64, String, Option<i32>);

fn session_from_row(
    (id, user_id, completed_ts, memo_count, source): SessionRow,
) -> ResurfaceResult<ReviewSession> {
    Ok(ReviewSession {
        id,
        user_id: UserId(user_id),
        completed_at: timestamp(completed_ts)?,
        memo_count,
        source: parse_source(&source)?,
    })
}

fn review_from_row(
    (id, user_id, memo_id, reviewed_ts, source, session_id): ReviewRow,
) -> ResurfaceResult<MemoReview> {
    Ok(MemoReview {
        id,
        user_id: UserId(user_id),
        memo_id: MemoId(memo_id),
        reviewed_at: timestamp(reviewed_ts)?,
        source: parse_source(&source)?,
        session_id,
    })
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new(path: impl AsRef<Path>) -> ResurfaceResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> ResurfaceResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> ResurfaceResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ResurfaceError::database(e.to_string()))
    }

    fn init_schema(&self) -> ResurfaceResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS memo (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id INTEGER NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'NORMAL',
                created_ts INTEGER NOT NULL,
                updated_ts INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_memo_creator_status ON memo(creator_id, status);

            CREATE TABLE IF NOT EXISTS memo_review_session (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                completed_ts INTEGER NOT NULL,
                memo_count INTEGER NOT NULL,
                source TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_review_session_user ON memo_review_session(user_id, completed_ts);

            CREATE TABLE IF NOT EXISTS memo_review (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                memo_id INTEGER NOT NULL,
                reviewed_ts INTEGER NOT NULL,
                source TEXT NOT NULL,
                session_id INTEGER,
                FOREIGN KEY (session_id) REFERENCES memo_review_session(id)
            );

            CREATE INDEX IF NOT EXISTS idx_memo_review_user_memo ON memo_review(user_id, memo_id);

            CREATE TABLE IF NOT EXISTS user_review_setting (
                user_id INTEGER PRIMARY KEY,
                session_size INTEGER NOT NULL,
                include_tags TEXT NOT NULL DEFAULT '[]',
                exclude_tags TEXT NOT NULL DEFAULT '[]'
            );
        "#,
        )?;
        Ok(())
    }

    // =========================================================================
    // Memo Methods
    // =========================================================================

    /// Insert a memo with status `Normal`.
    pub fn create_memo(&self, memo: &NewMemo) -> ResurfaceResult<Memo> {
        let conn = self.conn()?;
        let ts = memo.created_at.timestamp();
        conn.execute(
            "INSERT INTO memo (creator_id, content, tags, status, created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                memo.creator_id.0,
                memo.content,
                serde_json::to_string(&memo.tags)?,
                MemoStatus::Normal.to_string(),
                ts,
            ],
        )?;
        let id = conn.last_insert_rowid() as i32;

        Ok(Memo {
            id: MemoId(id),
            creator_id: memo.creator_id,
            content: Some(memo.content.clone()),
            tags: memo.tags.clone(),
            status: MemoStatus::Normal,
            created_at: timestamp(ts)?,
            updated_at: timestamp(ts)?,
        })
    }

    /// Change a memo's status. Returns whether the memo exists.
    pub fn set_memo_status(&self, id: MemoId, status: MemoStatus) -> ResurfaceResult<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE memo SET status = ?1, updated_ts = ?2 WHERE id = ?3",
            params![status.to_string(), Utc::now().timestamp(), id.0],
        )?;
        Ok(updated > 0)
    }

    /// Delete a memo. Its review history is kept.
    pub fn delete_memo(&self, id: MemoId) -> ResurfaceResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM memo WHERE id = ?1", params![id.0])?;
        Ok(deleted > 0)
    }
}

impl MemoStore for SqliteStore {
    fn list_memos(&self, filter: &MemoFilter) -> ResurfaceResult<Vec<Memo>> {
        let mut conditions = Conditions::default();
        if let Some(creator_id) = filter.creator_id {
            conditions.push("creator_id = ?", creator_id.0);
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?", status.to_string());
        }
        if !filter.tags_any.is_empty() {
            // Tags are matched as a JSON array so the list can be bound as one value.
            conditions.push(
                "EXISTS (SELECT 1 FROM json_each(memo.tags) AS t
                         WHERE t.value IN (SELECT value FROM json_each(?)))",
                serde_json::to_string(&filter.tags_any)?,
            );
        }

        let content = if filter.include_content {
            "content"
        } else {
            "NULL"
        };
        let order = if filter.random {
            "RANDOM()"
        } else {
            "created_ts DESC, id DESC"
        };
        let query = format!(
            "SELECT id, creator_id, {}, tags, status, created_ts, updated_ts FROM memo{} ORDER BY {}{}",
            content,
            conditions.where_clause(),
            order,
            limit_clause(filter.limit)
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.values.iter()), MemoRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = rows.len(), random = filter.random, "Listed memos");
        rows.into_iter().map(MemoRow::into_memo).collect()
    }

    fn get_memo(&self, id: MemoId) -> ResurfaceResult<Option<Memo>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, creator_id, content, tags, status, created_ts, updated_ts
                 FROM memo WHERE id = ?1",
                params![id.0],
                MemoRow::from_row,
            )
            .optional()?;
        row.map(MemoRow::into_memo).transpose()
    }
}

impl ReviewLedger for SqliteStore {
    fn create_review_session(&self, session: &NewReviewSession) -> ResurfaceResult<ReviewSession> {
        let conn = self.conn()?;
        let completed_ts = session.completed_at.timestamp();
        conn.execute(
            "INSERT INTO memo_review_session (user_id, completed_ts, memo_count, source)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.user_id.0,
                completed_ts,
                session.memo_count,
                session.source.to_string(),
            ],
        )?;

        Ok(ReviewSession {
            id: conn.last_insert_rowid() as i32,
            user_id: session.user_id,
            completed_at: timestamp(completed_ts)?,
            memo_count: session.memo_count,
            source: session.source,
        })
    }

    fn create_memo_review(&self, review: &NewMemoReview) -> ResurfaceResult<MemoReview> {
        let conn = self.conn()?;
        let reviewed_ts = review.reviewed_at.timestamp();
        conn.execute(
            "INSERT INTO memo_review (user_id, memo_id, reviewed_ts, source, session_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                review.user_id.0,
                review.memo_id.0,
                reviewed_ts,
                review.source.to_string(),
                review.session_id,
            ],
        )?;

        Ok(MemoReview {
            id: conn.last_insert_rowid() as i32,
            user_id: review.user_id,
            memo_id: review.memo_id,
            reviewed_at: timestamp(reviewed_ts)?,
            source: review.source,
            session_id: review.session_id,
        })
    }

    fn batch_create_memo_reviews(&self, reviews: &[NewMemoReview]) -> ResurfaceResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO memo_review (user_id, memo_id, reviewed_ts, source, session_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for review in reviews {
                stmt.execute(params![
                    review.user_id.0,
                    review.memo_id.0,
                    review.reviewed_at.timestamp(),
                    review.source.to_string(),
                    review.session_id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(reviews.len())
    }

    fn record_session(
        &self,
        session: &NewReviewSession,
        reviews: &[NewMemoReview],
    ) -> ResurfaceResult<(ReviewSession, usize)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let completed_ts = session.completed_at.timestamp();
        tx.execute(
            "INSERT INTO memo_review_session (user_id, completed_ts, memo_count, source)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.user_id.0,
                completed_ts,
                session.memo_count,
                session.source.to_string(),
            ],
        )?;
        let session_id = tx.last_insert_rowid() as i32;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO memo_review (user_id, memo_id, reviewed_ts, source, session_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for review in reviews {
                stmt.execute(params![
                    review.user_id.0,
                    review.memo_id.0,
                    review.reviewed_at.timestamp(),
                    review.source.to_string(),
                    session_id,
                ])?;
            }
        }
        tx.commit()?;

        Ok((
            ReviewSession {
                id: session_id,
                user_id: session.user_id,
                completed_at: timestamp(completed_ts)?,
                memo_count: session.memo_count,
                source: session.source,
            },
            reviews.len(),
        ))
    }

    fn list_review_sessions(
        &self,
        filter: &ReviewSessionFilter,
    ) -> ResurfaceResult<Vec<ReviewSession>> {
        let mut conditions = Conditions::default();
        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?", user_id.0);
        }
        if let Some(after) = filter.completed_after {
            conditions.push("completed_ts >= ?", after.timestamp());
        }
        if let Some(source) = filter.source {
            conditions.push("source = ?", source.to_string());
        }

        let query = format!(
            "SELECT id, user_id, completed_ts, memo_count, source FROM memo_review_session{}
             ORDER BY completed_ts DESC, id DESC{}",
            conditions.where_clause(),
            limit_clause(filter.limit)
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.values.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<Result<Vec<SessionRow>, _>>()?;

        rows.into_iter().map(session_from_row).collect()
    }

    fn list_memo_reviews(&self, filter: &MemoReviewFilter) -> ResurfaceResult<Vec<MemoReview>> {
        let mut conditions = Conditions::default();
        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?", user_id.0);
        }
        if let Some(memo_id) = filter.memo_id {
            conditions.push("memo_id = ?", memo_id.0);
        }
        if let Some(after) = filter.reviewed_after {
            conditions.push("reviewed_ts >= ?", after.timestamp());
        }
        if let Some(source) = filter.source {
            conditions.push("source = ?", source.to_string());
        }

        let query = format!(
            "SELECT id, user_id, memo_id, reviewed_ts, source, session_id FROM memo_review{}
             ORDER BY reviewed_ts DESC, id DESC{}",
            conditions.where_clause(),
            limit_clause(filter.limit)
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.values.iter()), |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<Vec<ReviewRow>, _>>()?;

        rows.into_iter().map(review_from_row).collect()
    }

    fn list_memo_review_summaries(
        &self,
        user_id: UserId,
    ) -> ResurfaceResult<Vec<MemoReviewSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT memo_id, COUNT(*), MAX(reviewed_ts) FROM memo_review
             WHERE user_id = ?1 GROUP BY memo_id",
        )?;
        let rows = stmt
            .query_map(params![user_id.0], |row| {
                Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(memo_id, count, last_ts)| {
                Ok(MemoReviewSummary {
                    memo_id: MemoId(memo_id),
                    review_count: count as u32,
                    last_reviewed_at: timestamp(last_ts)?,
                })
            })
            .collect()
    }
}

impl UserSettingStore for SqliteStore {
    fn get_review_setting(&self, user_id: UserId) -> ResurfaceResult<Option<ReviewUserSetting>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT session_size, include_tags, exclude_tags
                 FROM user_review_setting WHERE user_id = ?1",
                params![user_id.0],
                |row| {
                    Ok((
                        row.get::<_, i32>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(session_size, include_tags, exclude_tags)| {
            Ok(ReviewUserSetting {
                session_size,
                include_tags: serde_json::from_str(&include_tags)?,
                exclude_tags: serde_json::from_str(&exclude_tags)?,
            })
        })
        .transpose()
    }

    fn upsert_review_setting(
        &self,
        user_id: UserId,
        setting: &ReviewUserSetting,
    ) -> ResurfaceResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_review_setting (user_id, session_size, include_tags, exclude_tags)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                session_size = excluded.session_size,
                include_tags = excluded.include_tags,
                exclude_tags = excluded.exclude_tags",
            params![
                user_id.0,
                setting.session_size,
                serde_json::to_string(&setting.include_tags)?,
                serde_json::to_string(&setting.exclude_tags)?,
            ],
        )?;
        Ok(())
    }
}
