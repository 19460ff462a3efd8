//! Trending ranking query.
//!
//! The score is computed per row at query time:
//!
//! ```text
//! (upvotes - downvotes) * 2 + views * 0.1 + share_count * 5 + recency_bonus
//! ```
//!
//! where the recency bonus is 10 below one day of age, 5 below three days,
//! 2 below seven days and 1 otherwise. Vote totals come from the vote table,
//! not from the denormalized counters on the meme row.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use sea_orm::{DatabaseConnection, DbBackend, FromQueryResult, Statement};

use crate::entities::meme::{self, MemeType};
use crate::repositories::meme::sql_bound;
use memehub_common::{AppError, AppResult};

/// Weight of the net vote count.
pub const VOTE_WEIGHT: f64 = 2.0;
/// Weight of a single view.
pub const VIEW_WEIGHT: f64 = 0.1;
/// Weight of a single share.
pub const SHARE_WEIGHT: f64 = 5.0;

/// Recency buckets: (maximum age in hours, bonus). Older memes get [`BASE_BONUS`].
const RECENCY_BUCKETS: [(i64, f64); 3] = [(24, 10.0), (72, 5.0), (168, 2.0)];
const BASE_BONUS: f64 = 1.0;

/// Bonus for a meme of the given age.
#[must_use]
pub fn recency_bonus(age: Duration) -> f64 {
    RECENCY_BUCKETS
        .iter()
        .find(|(hours, _)| age < Duration::hours(*hours))
        .map_or(BASE_BONUS, |(_, bonus)| *bonus)
}

/// Trending score, same formula as the ranking query.
#[must_use]
pub fn trending_score(upvotes: i64, downvotes: i64, views: i64, shares: i64, age: Duration) -> f64 {
    (upvotes - downvotes) as f64 * VOTE_WEIGHT
        + views as f64 * VIEW_WEIGHT
        + shares as f64 * SHARE_WEIGHT
        + recency_bonus(age)
}

static TRENDING_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        r#"
        SELECT m.*,
            COALESCE(c.comment_count, 0) AS comment_count,
            (
                (COALESCE(v.up, 0) - COALESCE(v.down, 0)) * {VOTE_WEIGHT:.1}
                + m.views * {VIEW_WEIGHT:.1}
                + m.share_count * {SHARE_WEIGHT:.1}
                + CASE
                    WHEN m.created_at > $2 THEN {b0:.1}
                    WHEN m.created_at > $3 THEN {b1:.1}
                    WHEN m.created_at > $4 THEN {b2:.1}
                    ELSE {BASE_BONUS:.1}
                  END
            )::double precision AS trending_score
        FROM meme m
        LEFT JOIN (
            SELECT meme_id,
                SUM(CASE WHEN vote_type = 'UPVOTE' THEN 1 ELSE 0 END) AS up,
                SUM(CASE WHEN vote_type = 'DOWNVOTE' THEN 1 ELSE 0 END) AS down
            FROM vote
            GROUP BY meme_id
        ) v ON v.meme_id = m.id
        LEFT JOIN (
            SELECT meme_id, COUNT(*) AS comment_count
            FROM comment
            GROUP BY meme_id
        ) c ON c.meme_id = m.id
        WHERE m.created_at >= $1
        ORDER BY trending_score DESC, m.created_at DESC, m.id DESC
        LIMIT $5 OFFSET $6
        "#,
        b0 = RECENCY_BUCKETS[0].1,
        b1 = RECENCY_BUCKETS[1].1,
        b2 = RECENCY_BUCKETS[2].1,
    )
});

/// A meme with its computed score.
#[derive(Debug, Clone)]
pub struct TrendingMeme {
    pub meme: meme::Model,
    pub trending_score: f64,
    pub comment_count: u64,
}

#[derive(Debug, FromQueryResult)]
struct TrendingRow {
    id: String,
    author_id: String,
    title: String,
    description: Option<String>,
    image_url: String,
    storage_key: Option<String>,
    meme_type: MemeType,
    upvotes: i32,
    downvotes: i32,
    views: i32,
    share_count: i32,
    created_at: sea_orm::prelude::DateTimeWithTimeZone,
    updated_at: Option<sea_orm::prelude::DateTimeWithTimeZone>,
    comment_count: i64,
    trending_score: f64,
}

impl From<TrendingRow> for TrendingMeme {
    fn from(row: TrendingRow) -> Self {
        Self {
            meme: meme::Model {
                id: row.id,
                author_id: row.author_id,
                title: row.title,
                description: row.description,
                image_url: row.image_url,
                storage_key: row.storage_key,
                meme_type: row.meme_type,
                upvotes: row.upvotes,
                downvotes: row.downvotes,
                views: row.views,
                share_count: row.share_count,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            trending_score: row.trending_score,
            comment_count: row.comment_count.max(0) as u64,
        }
    }
}

/// Read-only ranking queries.
#[derive(Clone)]
pub struct TrendingRepository {
    db: Arc<DatabaseConnection>,
}

impl TrendingRepository {
    /// Create a new trending repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Memes created at or after `since`, best score first.
    ///
    /// Ties fall back to newest first, then to the (time-ordered) ID.
    pub async fn find_ranked(
        &self,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<TrendingMeme>> {
        let cutoffs = RECENCY_BUCKETS.map(|(hours, _)| now - Duration::hours(hours));

        let rows = TrendingRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            TRENDING_SQL.as_str(),
            [
                since.into(),
                cutoffs[0].into(),
                cutoffs[1].into(),
                cutoffs[2].into(),
                sql_bound(limit).into(),
                sql_bound(offset).into(),
            ],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(TrendingMeme::from).collect())
    }
}
