//! Vote service.
//!
//! A user holds at most one vote per meme. Casting the same type twice takes
//! the vote back, casting the other type flips it.

use chrono::Utc;
use memehub_common::{AppError, AppResult, IdGenerator};
use memehub_db::{
    entities::vote::{self, VoteType},
    repositories::{MemeRepository, VoteRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::notification::{NotificationService, NotifyEvent};

/// What a vote request does to the stored vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    /// No vote yet: record one.
    Create(VoteType),
    /// Same type again: take the vote back.
    Remove,
    /// Other type: flip the stored vote.
    Switch(VoteType),
}

impl VoteAction {
    /// Decide the action from the currently stored vote.
    #[must_use]
    pub fn resolve(existing: Option<VoteType>, requested: VoteType) -> Self {
        match existing {
            None => Self::Create(requested),
            Some(current) if current == requested => Self::Remove,
            Some(_) => Self::Switch(requested),
        }
    }

    /// The vote the user holds afterwards.
    #[must_use]
    pub const fn effective_vote(self) -> Option<VoteType> {
        match self {
            Self::Create(t) | Self::Switch(t) => Some(t),
            Self::Remove => None,
        }
    }
}

/// Counters after a vote, plus the caller's resulting vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub upvotes: i32,
    pub downvotes: i32,
    pub effective_vote: Option<VoteType>,
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    meme_repo: MemeRepository,
    vote_repo: VoteRepository,
    notification_service: Option<NotificationService>,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(meme_repo: MemeRepository, vote_repo: VoteRepository) -> Self {
        Self {
            meme_repo,
            vote_repo,
            notification_service: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification service used to tell authors about votes.
    pub fn set_notification_service(&mut self, notification_service: NotificationService) {
        self.notification_service = Some(notification_service);
    }

    /// Cast, flip or withdraw a vote.
    ///
    /// Runs in one transaction holding the meme's row lock, so concurrent
    /// votes on the same meme are applied one at a time. The counters are
    /// recounted from the vote table before commit.
    pub async fn cast_vote(
        &self,
        user_id: &str,
        meme_id: &str,
        vote_type: VoteType,
    ) -> AppResult<VoteOutcome> {
        let txn = self.meme_repo.begin().await?;

        let meme = MemeRepository::lock_for_update(&txn, meme_id)
            .await?
            .ok_or_else(|| AppError::MemeNotFound(meme_id.to_string()))?;

        let existing = VoteRepository::find_by_user_and_meme(&txn, user_id, meme_id).await?;
        let action = VoteAction::resolve(existing.as_ref().map(|v| v.vote_type), vote_type);

        match (action, existing) {
            (VoteAction::Create(t), _) => {
                let now = Utc::now();
                VoteRepository::create(
                    &txn,
                    vote::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        vote_type: Set(t),
                        user_id: Set(user_id.to_string()),
                        meme_id: Set(meme_id.to_string()),
                        created_at: Set(now.into()),
                        updated_at: Set(Some(now.into())),
                    },
                )
                .await?;
            }
            (VoteAction::Remove, Some(v)) => VoteRepository::delete(&txn, &v.id).await?,
            (VoteAction::Switch(t), Some(v)) => {
                VoteRepository::change_type(&txn, v, t).await?;
            }
            (_, None) => {
                return Err(AppError::Internal(
                    "Vote changed without a stored vote".to_string(),
                ));
            }
        }

        let counters = VoteRepository::tally(&txn, meme_id).await?;
        MemeRepository::set_vote_counters(&txn, meme_id, counters).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(user_id, meme_id, ?action, "Vote applied");

        if let (Some(notifications), Some(t)) = (&self.notification_service, action.effective_vote())
        {
            notifications.notify_in_background(
                user_id,
                &meme.author_id,
                NotifyEvent::Vote {
                    meme_id: meme_id.to_string(),
                    vote_type: t,
                },
            );
        }

        Ok(VoteOutcome {
            upvotes: counters.upvotes,
            downvotes: counters.downvotes,
            effective_vote: action.effective_vote(),
        })
    }

    /// The caller's current vote on a meme.
    pub async fn user_vote(&self, user_id: &str, meme_id: &str) -> AppResult<Option<VoteType>> {
        self.vote_repo.user_vote(user_id, meme_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::tests::test_meme;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> VoteService {
        let db = Arc::new(db);
        VoteService::new(MemeRepository::new(db.clone()), VoteRepository::new(db))
    }

    fn stored_vote(vote_type: VoteType) -> vote::Model {
        vote::Model {
            id: "v1".to_string(),
            vote_type,
            user_id: "voter".to_string(),
            meme_id: "m1".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn tally(up: i64, down: i64) -> Vec<BTreeMap<&'static str, Value>> {
        let mut rows = vec![];
        if up > 0 {
            rows.push(maplit::btreemap! {
                "vote_type" => Value::from("UPVOTE"),
                "count" => Value::BigInt(Some(up)),
            });
        }
        if down > 0 {
            rows.push(maplit::btreemap! {
                "vote_type" => Value::from("DOWNVOTE"),
                "count" => Value::BigInt(Some(down)),
            });
        }
        rows
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[test]
    fn test_resolve_three_way_toggle() {
        assert_eq!(
            VoteAction::resolve(None, VoteType::Upvote),
            VoteAction::Create(VoteType::Upvote)
        );
        assert_eq!(
            VoteAction::resolve(Some(VoteType::Upvote), VoteType::Upvote),
            VoteAction::Remove
        );
        assert_eq!(
            VoteAction::resolve(Some(VoteType::Upvote), VoteType::Downvote),
            VoteAction::Switch(VoteType::Downvote)
        );
        assert_eq!(VoteAction::Remove.effective_vote(), None);
        assert_eq!(
            VoteAction::Switch(VoteType::Downvote).effective_vote(),
            Some(VoteType::Downvote)
        );
    }

    #[tokio::test]
    async fn test_first_vote_creates() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_meme("m1", "author")]])
            .append_query_results([Vec::<vote::Model>::new()])
            .append_query_results([[stored_vote(VoteType::Upvote)]])
            .append_query_results([tally(1, 0)])
            .append_exec_results([exec(1)])
            .into_connection();

        let outcome = service(db)
            .cast_vote("voter", "m1", VoteType::Upvote)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            VoteOutcome {
                upvotes: 1,
                downvotes: 0,
                effective_vote: Some(VoteType::Upvote)
            }
        );
    }

    #[tokio::test]
    async fn test_same_vote_twice_withdraws() {
        let mut meme = test_meme("m1", "author");
        meme.upvotes = 1;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[meme]])
            .append_query_results([[stored_vote(VoteType::Upvote)]])
            .append_exec_results([exec(1)])
            .append_query_results([tally(0, 0)])
            .append_exec_results([exec(1)])
            .into_connection();

        let outcome = service(db)
            .cast_vote("voter", "m1", VoteType::Upvote)
            .await
            .unwrap();

        assert_eq!(outcome.upvotes, 0);
        assert_eq!(outcome.downvotes, 0);
        assert_eq!(outcome.effective_vote, None);
    }

    #[tokio::test]
    async fn test_opposite_vote_switches() {
        let mut meme = test_meme("m1", "author");
        meme.upvotes = 1;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[meme]])
            .append_query_results([[stored_vote(VoteType::Upvote)]])
            .append_query_results([[stored_vote(VoteType::Downvote)]])
            .append_query_results([tally(0, 1)])
            .append_exec_results([exec(1)])
            .into_connection();

        let outcome = service(db)
            .cast_vote("voter", "m1", VoteType::Downvote)
            .await
            .unwrap();

        assert_eq!(outcome.upvotes, 0);
        assert_eq!(outcome.downvotes, 1);
        assert_eq!(outcome.effective_vote, Some(VoteType::Downvote));
    }

    #[tokio::test]
    async fn test_vote_on_missing_meme() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<memehub_db::entities::meme::Model>::new()])
            .into_connection();

        let result = service(db).cast_vote("voter", "gone", VoteType::Upvote).await;

        assert!(matches!(result, Err(AppError::MemeNotFound(id)) if id == "gone"));
    }
}
