//! Vote repository.
//!
//! Vote writes take a connection argument so they can run inside the
//! transaction that holds the meme row lock.

use std::sync::Arc;

use crate::entities::{Vote, vote};
use crate::repositories::meme::VoteCounters;
use crate::write_error;
use memehub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, QuerySelect, Set, sea_query::Expr,
};

#[derive(Debug, FromQueryResult)]
struct TallyRow {
    vote_type: vote::VoteType,
    count: i64,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The vote type a user currently holds on a meme, if any.
    pub async fn user_vote(
        &self,
        user_id: &str,
        meme_id: &str,
    ) -> AppResult<Option<vote::VoteType>> {
        Ok(Self::find_by_user_and_meme(self.db.as_ref(), user_id, meme_id)
            .await?
            .map(|v| v.vote_type))
    }

    /// Find the vote a user cast on a meme.
    pub async fn find_by_user_and_meme<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        meme_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::MemeId.eq(meme_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a vote.
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        model: vote::ActiveModel,
    ) -> AppResult<vote::Model> {
        model.insert(conn).await.map_err(write_error)
    }

    /// Delete a vote by ID.
    pub async fn delete<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<()> {
        Vote::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Flip an existing vote to `vote_type`.
    pub async fn change_type<C: ConnectionTrait>(
        conn: &C,
        existing: vote::Model,
        vote_type: vote::VoteType,
    ) -> AppResult<vote::Model> {
        let mut active: vote::ActiveModel = existing.into();
        active.vote_type = Set(vote_type);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count up- and downvotes on a meme straight from the vote table.
    pub async fn tally<C: ConnectionTrait>(conn: &C, meme_id: &str) -> AppResult<VoteCounters> {
        let rows = Vote::find()
            .select_only()
            .column(vote::Column::VoteType)
            .column_as(Expr::col(vote::Column::Id).count(), "count")
            .filter(vote::Column::MemeId.eq(meme_id))
            .group_by(vote::Column::VoteType)
            .into_model::<TallyRow>()
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut counters = VoteCounters::default();
        for row in rows {
            let count = i32::try_from(row.count.max(0)).unwrap_or(i32::MAX);
            match row.vote_type {
                vote::VoteType::Upvote => counters.upvotes = count,
                vote::VoteType::Downvote => counters.downvotes = count,
            }
        }
        Ok(counters)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn tally_row(vote_type: &str, count: i64) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! {
            "vote_type" => Value::String(Some(Box::new(vote_type.to_string()))),
            "count" => Value::BigInt(Some(count)),
        }
    }

    #[tokio::test]
    async fn test_find_by_user_and_meme() {
        let vote = vote::Model {
            id: "v1".to_string(),
            vote_type: vote::VoteType::Upvote,
            user_id: "u1".to_string(),
            meme_id: "m1".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[vote]])
            .into_connection();

        let found = VoteRepository::find_by_user_and_meme(&db, "u1", "m1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.vote_type, vote::VoteType::Upvote);
    }

    #[tokio::test]
    async fn test_user_vote_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<vote::Model>::new()])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        assert!(repo.user_vote("u1", "m1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tally_counts_both_types() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tally_row("UPVOTE", 7), tally_row("DOWNVOTE", 2)]])
            .into_connection();

        let counters = VoteRepository::tally(&db, "m1").await.unwrap();
        assert_eq!(
            counters,
            VoteCounters {
                upvotes: 7,
                downvotes: 2
            }
        );
    }

    #[tokio::test]
    async fn test_tally_without_votes_is_zero() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()])
            .into_connection();

        let counters = VoteRepository::tally(&db, "m1").await.unwrap();
        assert_eq!(counters, VoteCounters::default());
    }
}
