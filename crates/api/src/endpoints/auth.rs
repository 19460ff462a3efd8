//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use memehub_common::AppResult;
use memehub_core::{RegisterInput, SignInInput, UserCounts, UserView};
use memehub_db::entities::user;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::MaybeAuthUser,
    middleware::AppState,
    response::{Message, Success},
};

/// A user together with its API token.
#[derive(Serialize)]
pub struct SessionResponse {
    pub user: UserView,
    pub token: String,
}

impl SessionResponse {
    fn new(user: &user::Model, token: String) -> Self {
        Self {
            user: UserView::from(user),
            token,
        }
    }
}

/// Register a new account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<Json<SessionResponse>> {
    let (user, token) = state.user_service.register(input).await?;
    Ok(Json(SessionResponse::new(&user, token)))
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    Json(input): Json<SignInInput>,
) -> AppResult<Json<SessionResponse>> {
    input.validate()?;

    let user = state
        .user_service
        .authenticate(&input.email, &input.password)
        .await?;
    let token = user.token.clone();

    Ok(Json(SessionResponse::new(&user, token)))
}

/// Signed-in user with relation counts.
#[derive(Serialize)]
pub struct StatusUser {
    #[serde(flatten)]
    pub user: UserView,
    #[serde(rename = "_count")]
    pub count: UserCounts,
}

/// Session status.
#[derive(Serialize)]
pub struct StatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<StatusUser>,
}

/// Report whether the caller is signed in.
async fn status(
    State(state): State<AppState>,
    user: MaybeAuthUser,
) -> AppResult<Json<StatusResponse>> {
    let Some(user) = user.0 else {
        return Ok(Json(StatusResponse {
            authenticated: false,
            user: None,
        }));
    };

    let count = state.user_service.status_counts(&user.id).await?;

    Ok(Json(StatusResponse {
        authenticated: true,
        user: Some(StatusUser {
            user: UserView::from(&user),
            count,
        }),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendVerificationRequest {
    #[validate(email)]
    pub email: String,
}

/// Mail a fresh verification link.
async fn send_verification(
    State(state): State<AppState>,
    Json(req): Json<SendVerificationRequest>,
) -> AppResult<Success<Message>> {
    req.validate()?;

    state
        .verification_service
        .send_verification(&req.email.trim().to_lowercase())
        .await?;

    Ok(Success::message("Verification email sent"))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Confirm an email address.
async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> AppResult<Success<Message>> {
    state.verification_service.verify(req.token.trim()).await?;
    Ok(Success::message("Email verified successfully"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/signin", post(signin))
        .route("/status", get(status))
        .route("/send-verification", post(send_verification))
        .route("/verify-email", post(verify_email))
}
