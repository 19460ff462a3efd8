//! Meme repository.

use std::sync::Arc;

use crate::entities::{Meme, meme, meme_tag};
use memehub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Statement, TransactionTrait, sea_query::Expr,
};

/// Aggregate vote counters written back onto a meme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteCounters {
    /// Number of UPVOTE rows.
    pub upvotes: i32,
    /// Number of DOWNVOTE rows.
    pub downvotes: i32,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

const SEARCH_FILTER: &str = r#"
    FROM meme m
    JOIN "user" u ON u.id = m.author_id
    WHERE m.title ILIKE $1
        OR m.description ILIKE $1
        OR u.username ILIKE $1
        OR u.display_name ILIKE $1
        OR EXISTS (
            SELECT 1 FROM meme_tag mt
            JOIN tag t ON t.id = mt.tag_id
            WHERE mt.meme_id = m.id AND t.name ILIKE $1
        )
"#;

/// Build an `ILIKE` pattern matching `query` anywhere, with wildcards escaped.
#[must_use]
pub fn contains_pattern(query: &str) -> String {
    format!(
        "%{}%",
        query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    )
}

/// Convert a row count or offset into a SQL `BIGINT` bind value, saturating.
#[must_use]
pub fn sql_bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Meme repository for database operations.
#[derive(Clone)]
pub struct MemeRepository {
    db: Arc<DatabaseConnection>,
}

impl MemeRepository {
    /// Create a new meme repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Open a transaction.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a meme by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<meme::Model>> {
        Meme::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a meme by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<meme::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::MemeNotFound(id.to_string()))
    }

    /// Find memes by IDs (unordered).
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<meme::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Meme::find()
            .filter(meme::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Load a meme and hold its row lock until the transaction ends.
    ///
    /// Every vote and favorite toggle on a meme goes through this lock, so
    /// concurrent toggles on the same meme run one after another.
    pub async fn lock_for_update<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<meme::Model>> {
        Meme::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite the vote counters of a meme.
    pub async fn set_vote_counters<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        counters: VoteCounters,
    ) -> AppResult<()> {
        Meme::update_many()
            .col_expr(meme::Column::Upvotes, Expr::value(counters.upvotes.max(0)))
            .col_expr(meme::Column::Downvotes, Expr::value(counters.downvotes.max(0)))
            .filter(meme::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create a new meme.
    pub async fn create(&self, model: meme::ActiveModel) -> AppResult<meme::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a meme. Votes, favorites, comments and tag links cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Meme::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Newest memes first.
    pub async fn find_latest(&self, offset: u64, limit: u64) -> AppResult<Vec<meme::Model>> {
        Meme::find()
            .order_by_desc(meme::Column::CreatedAt)
            .order_by_desc(meme::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most upvoted memes first, newest breaking ties.
    pub async fn find_popular(&self, offset: u64, limit: u64) -> AppResult<Vec<meme::Model>> {
        Meme::find()
            .order_by_desc(meme::Column::Upvotes)
            .order_by_desc(meme::Column::CreatedAt)
            .order_by_desc(meme::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all memes.
    pub async fn count_all(&self) -> AppResult<u64> {
        Meme::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A user's memes, newest first.
    pub async fn find_by_author(
        &self,
        author_id: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<meme::Model>> {
        Meme::find()
            .filter(meme::Column::AuthorId.eq(author_id))
            .order_by_desc(meme::Column::CreatedAt)
            .order_by_desc(meme::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a user's memes.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Meme::find()
            .filter(meme::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Memes carrying a tag, newest first.
    pub async fn find_by_tag(
        &self,
        tag_id: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<meme::Model>> {
        Meme::find()
            .join(JoinType::InnerJoin, meme::Relation::MemeTags.def())
            .filter(meme_tag::Column::TagId.eq(tag_id))
            .order_by_desc(meme::Column::CreatedAt)
            .order_by_desc(meme::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count memes carrying a tag.
    pub async fn count_by_tag(&self, tag_id: &str) -> AppResult<u64> {
        Meme::find()
            .join(JoinType::InnerJoin, meme::Relation::MemeTags.def())
            .filter(meme_tag::Column::TagId.eq(tag_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count memes created at or after `since`.
    pub async fn count_created_since(
        &self,
        since: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<u64> {
        Meme::find()
            .filter(meme::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Case-insensitive search over title, description, tags and author names.
    pub async fn search(&self, query: &str, offset: u64, limit: u64) -> AppResult<Vec<meme::Model>> {
        let sql = format!(
            "SELECT m.* {SEARCH_FILTER} ORDER BY m.created_at DESC, m.id DESC LIMIT $2 OFFSET $3"
        );

        Meme::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                [
                    contains_pattern(query).into(),
                    sql_bound(limit).into(),
                    sql_bound(offset).into(),
                ],
            ))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count search matches.
    pub async fn count_search(&self, query: &str) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) AS count {SEARCH_FILTER}");

        let row = CountRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [contains_pattern(query).into()],
        ))
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map_or(0, |r| r.count.max(0) as u64))
    }

    /// Increment the view counter atomically (single UPDATE query, no fetch).
    pub async fn increment_views(&self, id: &str) -> AppResult<()> {
        Meme::update_many()
            .col_expr(meme::Column::Views, Expr::col(meme::Column::Views).add(1))
            .filter(meme::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment the share counter atomically and return the new value.
    pub async fn increment_share_count(&self, id: &str) -> AppResult<i32> {
        let result = Meme::update_many()
            .col_expr(
                meme::Column::ShareCount,
                Expr::col(meme::Column::ShareCount).add(1),
            )
            .filter(meme::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::MemeNotFound(id.to_string()));
        }

        Ok(self.get_by_id(id).await?.share_count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::meme::MemeType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn create_test_meme(id: &str, author_id: &str) -> meme::Model {
        meme::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            title: "Distracted boyfriend".to_string(),
            description: None,
            image_url: format!("/uploads/{id}.png"),
            storage_key: Some(format!("{id}.png")),
            meme_type: MemeType::Image,
            upvotes: 0,
            downvotes: 0,
            views: 0,
            share_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("cat"), "%cat%");
        assert_eq!(contains_pattern("100%_real"), "%100\\%\\_real%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_sql_bound_saturates() {
        assert_eq!(sql_bound(0), 0);
        assert_eq!(sql_bound(99_999_900), 99_999_900);
        assert_eq!(sql_bound(u64::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_search_with_huge_offset_binds_positive_values() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<meme::Model>::new()])
            .into_connection();
        let db = Arc::new(db);

        let repo = MemeRepository::new(db.clone());
        let memes = repo.search("cat", u64::MAX, 20).await.unwrap();
        assert!(memes.is_empty());
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let bound = format!("{log:?}");
        assert!(bound.contains(&i64::MAX.to_string()));
        assert!(!bound.contains("BigInt(Some(-"));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<meme::Model>::new()])
                .into_connection(),
        );

        let repo = MemeRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::MemeNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_latest() {
        let m1 = create_test_meme("m2", "u1");
        let m2 = create_test_meme("m1", "u1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[m1, m2]])
                .into_connection(),
        );

        let repo = MemeRepository::new(db);
        let memes = repo.find_latest(0, 10).await.unwrap();

        assert_eq!(memes.len(), 2);
        assert_eq!(memes[0].id, "m2");
    }

    #[tokio::test]
    async fn test_count_search() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "count" => Value::BigInt(Some(3)),
                }]])
                .into_connection(),
        );

        let repo = MemeRepository::new(db);
        assert_eq!(repo.count_search("cat").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_increment_share_count_returns_new_value() {
        let mut shared = create_test_meme("m1", "u1");
        shared.share_count = 4;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[shared]])
                .into_connection(),
        );

        let repo = MemeRepository::new(db);
        assert_eq!(repo.increment_share_count("m1").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_increment_share_count_missing_meme() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = MemeRepository::new(db);
        let result = repo.increment_share_count("missing").await;

        assert!(matches!(result, Err(AppError::MemeNotFound(_))));
    }
}
