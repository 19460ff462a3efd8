//! Email verification service.

use chrono::{Duration, Utc};
use memehub_common::{AppError, AppResult, IdGenerator};
use memehub_db::{
    entities::verification_token,
    repositories::{UserRepository, VerificationTokenRepository},
};
use sea_orm::Set;

use crate::services::email::EmailService;

/// How long a verification link stays valid.
const TOKEN_TTL_HOURS: i64 = 24;

/// Email verification service for business logic.
#[derive(Clone)]
pub struct VerificationService {
    user_repo: UserRepository,
    token_repo: VerificationTokenRepository,
    email: EmailService,
    id_gen: IdGenerator,
}

impl VerificationService {
    /// Create a new verification service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        token_repo: VerificationTokenRepository,
        email: EmailService,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            email,
            id_gen: IdGenerator::new(),
        }
    }

    /// Issue a fresh token for the account and mail the link.
    ///
    /// Older tokens for the same account stop working. A delivery failure is
    /// logged and does not fail the call.
    pub async fn send_verification(&self, email: &str) -> AppResult<verification_token::Model> {
        let email = email.trim().to_lowercase();
        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::UserNotFound(email.clone()))?;

        if user.email_verified.is_some() {
            return Err(AppError::BadRequest("Email already verified".to_string()));
        }

        let replaced = self.token_repo.delete_by_user(&user.id).await?;
        if replaced > 0 {
            tracing::debug!(user_id = %user.id, replaced, "Replaced outstanding verification tokens");
        }

        let now = Utc::now();
        let token = self
            .token_repo
            .create(verification_token::ActiveModel {
                id: Set(self.id_gen.generate()),
                token: Set(self.id_gen.generate_verification_token()),
                user_id: Set(user.id.clone()),
                email: Set(user.email.clone()),
                expires_at: Set((now + Duration::hours(TOKEN_TTL_HOURS)).into()),
                created_at: Set(now.into()),
            })
            .await?;

        let verify_url = format!(
            "{}/auth/verify-email?token={}",
            self.email.site_url(),
            urlencoding::encode(&token.token)
        );

        if let Err(e) = self
            .email
            .send_verification(&user.email, user.shown_name(), &verify_url)
            .await
        {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to deliver verification email");
        }

        Ok(token)
    }

    /// Consume a token and mark its account verified.
    pub async fn verify(&self, token: &str) -> AppResult<()> {
        let stored = self
            .token_repo
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid verification token".to_string()))?;

        let now = Utc::now();
        if stored.is_expired(now.into()) {
            self.token_repo.delete(&stored.id).await?;
            return Err(AppError::BadRequest(
                "Verification token has expired".to_string(),
            ));
        }

        self.user_repo
            .mark_email_verified(&stored.user_id, now)
            .await?;
        self.token_repo.delete(&stored.id).await?;

        tracing::info!(user_id = %stored.user_id, "Email verified");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::tests::test_user;
    use memehub_common::config::EmailSettings;
    use memehub_db::entities::user;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> VerificationService {
        let db = Arc::new(db);
        let email =
            EmailService::from_settings(&EmailSettings::default(), "https://memehub.test").unwrap();
        VerificationService::new(
            UserRepository::new(db.clone()),
            VerificationTokenRepository::new(db),
            email,
        )
    }

    fn stored_token(expires_in: Duration) -> verification_token::Model {
        let now = Utc::now();
        verification_token::Model {
            id: "t1".to_string(),
            token: "abc".to_string(),
            user_id: "u1".to_string(),
            email: "alice@example.com".to_string(),
            expires_at: (now + expires_in).into(),
            created_at: now.into(),
        }
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[tokio::test]
    async fn test_send_unknown_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db).send_verification("nobody@example.com").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_send_already_verified() {
        let mut user = test_user("u1", "alice");
        user.email_verified = Some(Utc::now().into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .into_connection();

        let result = service(db).send_verification("alice@example.com").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_send_issues_day_long_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u1", "alice")]])
            .append_exec_results([exec(2)])
            .append_query_results([[stored_token(Duration::hours(24))]])
            .into_connection();

        let token = service(db)
            .send_verification("alice@example.com")
            .await
            .unwrap();

        let ttl = token.expires_at.signed_duration_since(token.created_at);
        assert_eq!(ttl, Duration::hours(24));
    }

    #[tokio::test]
    async fn test_verify_unknown_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<verification_token::Model>::new()])
            .into_connection();

        let result = service(db).verify("nope").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_verify_expired_token_is_deleted() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_token(Duration::hours(-1))]])
            .append_exec_results([exec(1)])
            .into_connection();

        let result = service(db).verify("abc").await;
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("expired")));
    }

    #[tokio::test]
    async fn test_verify_marks_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_token(Duration::hours(1))]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();

        service(db).verify("abc").await.unwrap();
    }
}
