//! Relational store — normalized score rows in `SQLite`.
//!
//! One row per (user, question) in `answer_scores`, one row per evaluated
//! category in `answer_category_scores`. A later run supersedes the
//! previous record via upsert; partial state is never observable because
//! every write runs in a single transaction.

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreError;

/// Process-wide relational connection pool.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;

/// Open (or create) the database file and build the pool.
pub fn open_pool(path: &str) -> Result<ConnectionPool, StoreError> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
    });
    let pool = r2d2::Pool::builder().build(manager)?;
    run_migrations(&*pool.get()?)?;
    Ok(pool)
}

/// In-memory pool for tests.
pub fn open_memory_pool() -> Result<ConnectionPool, StoreError> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = r2d2::Pool::builder().max_size(1).build(manager)?;
    run_migrations(&*pool.get()?)?;
    Ok(pool)
}

/// Idempotent schema migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS answer_scores (
             user_id          TEXT    NOT NULL,
             question_num     INTEGER NOT NULL,
             acoustic_score   INTEGER NOT NULL,
             total_score      INTEGER NOT NULL,
             performance_band TEXT    NOT NULL,
             created_at       TEXT    NOT NULL,
             PRIMARY KEY (user_id, question_num)
         );
         CREATE TABLE IF NOT EXISTS answer_category_scores (
             user_id      TEXT    NOT NULL,
             question_num INTEGER NOT NULL,
             category     TEXT    NOT NULL,
             score        INTEGER NOT NULL,
             PRIMARY KEY (user_id, question_num, category),
             FOREIGN KEY (user_id, question_num)
                 REFERENCES answer_scores (user_id, question_num)
                 ON DELETE CASCADE
         );",
    )?;
    Ok(())
}

/// Normalized totals for one scored answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    /// Candidate identifier.
    pub user_id: String,
    /// Question number.
    pub question_num: u8,
    /// Acoustic sub-score.
    pub acoustic_score: u8,
    /// Composite score.
    pub total_score: u8,
    /// Band label.
    pub performance_band: String,
    /// RFC3339 write timestamp.
    pub created_at: String,
}

/// One category sub-score row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryScoreRow {
    /// Category identifier.
    pub category: String,
    /// Awarded points.
    pub score: u8,
}

/// Score repository — stateless, every method takes `&Connection`.
pub struct ScoreRepo;

impl ScoreRepo {
    /// Upsert one answer's row-set inside a single transaction.
    ///
    /// Replaces any record a previous run left for the same
    /// (user, question) key, category rows included.
    pub fn upsert(
        conn: &mut Connection,
        row: &ScoreRow,
        categories: &[CategoryScoreRow],
    ) -> Result<(), StoreError> {
        let tx = conn.transaction()?;
        let _ = tx.execute(
            "INSERT INTO answer_scores
                 (user_id, question_num, acoustic_score, total_score, performance_band, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (user_id, question_num) DO UPDATE SET
                 acoustic_score = excluded.acoustic_score,
                 total_score = excluded.total_score,
                 performance_band = excluded.performance_band,
                 created_at = excluded.created_at",
            params![
                row.user_id,
                row.question_num,
                row.acoustic_score,
                row.total_score,
                row.performance_band,
                row.created_at,
            ],
        )?;
        let _ = tx.execute(
            "DELETE FROM answer_category_scores WHERE user_id = ?1 AND question_num = ?2",
            params![row.user_id, row.question_num],
        )?;
        for category in categories {
            let _ = tx.execute(
                "INSERT INTO answer_category_scores (user_id, question_num, category, score)
                 VALUES (?1, ?2, ?3, ?4)",
                params![row.user_id, row.question_num, category.category, category.score],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Fetch one answer's totals row.
    pub fn get(
        conn: &Connection,
        user_id: &str,
        question_num: u8,
    ) -> Result<Option<ScoreRow>, StoreError> {
        let row = conn
            .query_row(
                "SELECT user_id, question_num, acoustic_score, total_score,
                        performance_band, created_at
                 FROM answer_scores WHERE user_id = ?1 AND question_num = ?2",
                params![user_id, question_num],
                |row| {
                    Ok(ScoreRow {
                        user_id: row.get(0)?,
                        question_num: row.get(1)?,
                        acoustic_score: row.get(2)?,
                        total_score: row.get(3)?,
                        performance_band: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Fetch one answer's category rows, ordered by category id.
    pub fn categories(
        conn: &Connection,
        user_id: &str,
        question_num: u8,
    ) -> Result<Vec<CategoryScoreRow>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT category, score FROM answer_category_scores
             WHERE user_id = ?1 AND question_num = ?2 ORDER BY category",
        )?;
        let rows = stmt
            .query_map(params![user_id, question_num], |row| {
                Ok(CategoryScoreRow {
                    category: row.get(0)?,
                    score: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// True when the error is `SQLITE_BUSY`/`SQLITE_LOCKED` contention worth
/// retrying inside the gateway.
pub fn is_busy(error: &StoreError) -> bool {
    match error {
        StoreError::Relational(rusqlite::Error::SqliteFailure(code, _)) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
