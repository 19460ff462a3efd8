//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use memehub_common::{AppError, AppResult, IdGenerator};
use memehub_db::{
    entities::user,
    repositories::{FollowRepository, MemeRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::verification::VerificationService;

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 64))]
    pub username: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,

    #[validate(length(max = 128))]
    pub display_name: Option<String>,
}

/// Input for signing in.
#[derive(Debug, Deserialize, Validate)]
pub struct SignInInput {
    #[validate(length(min = 1))]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Public account fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: Option<String>,
    pub created_at: String,
}

impl From<&user::Model> for UserView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            email_verified: user.email_verified.map(|t| t.to_rfc3339()),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Memes, followers and following of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserCounts {
    pub memes: u64,
    pub followers: u64,
    pub following: u64,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    meme_repo: MemeRepository,
    follow_repo: FollowRepository,
    verification_service: Option<VerificationService>,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        meme_repo: MemeRepository,
        follow_repo: FollowRepository,
    ) -> Self {
        Self {
            user_repo,
            meme_repo,
            follow_repo,
            verification_service: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the verification service used to mail new accounts.
    pub fn set_verification_service(&mut self, verification_service: VerificationService) {
        self.verification_service = Some(verification_service);
    }

    /// Register a new account. Returns the user and its API token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<(user::Model, String)> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        let username = input.username.trim().to_string();

        if self
            .user_repo
            .find_by_email_or_username(&email, &username)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest("User already exists".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();
        let display_name = input
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| username.clone());

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            username: Set(username),
            display_name: Set(Some(display_name)),
            bio: Set(None),
            avatar_url: Set(None),
            password_hash: Set(password_hash),
            token: Set(token.clone()),
            email_verified: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        if let Some(verification) = &self.verification_service {
            let verification = verification.clone();
            let email = user.email.clone();
            tokio::spawn(async move {
                if let Err(e) = verification.send_verification(&email).await {
                    tracing::warn!(error = %e, %email, "Failed to send verification email");
                }
            });
        }

        Ok((user, token))
    }

    /// Check an email and password. Both failure modes look the same.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Authenticate by API token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// Count the user's memes, followers and followed accounts.
    pub async fn status_counts(&self, user_id: &str) -> AppResult<UserCounts> {
        Ok(UserCounts {
            memes: self.meme_repo.count_by_author(user_id).await?,
            followers: self.follow_repo.count_followers(user_id).await?,
            following: self.follow_repo.count_following(user_id).await?,
        })
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
