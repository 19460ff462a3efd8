//! Vote endpoint.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use memehub_common::{AppError, AppResult};
use memehub_db::entities::vote::VoteType;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::Success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub meme_id: Option<String>,
    pub vote_type: Option<String>,
}

fn invalid_vote() -> AppError {
    AppError::BadRequest("Invalid vote data".to_string())
}

impl VoteRequest {
    /// Unpack a request body, treating any shape error as invalid vote data.
    fn from_body(body: Result<Json<Self>, JsonRejection>) -> AppResult<(String, VoteType)> {
        let Json(req) = body.map_err(|e| {
            tracing::debug!(error = %e, "Rejected vote body");
            invalid_vote()
        })?;
        req.parse()
    }

    fn parse(self) -> AppResult<(String, VoteType)> {
        let vote_type = match self.vote_type.as_deref() {
            Some("UPVOTE") => VoteType::Upvote,
            Some("DOWNVOTE") => VoteType::Downvote,
            _ => return Err(invalid_vote()),
        };
        let meme_id = self
            .meme_id
            .filter(|id| !id.is_empty())
            .ok_or_else(invalid_vote)?;
        Ok((meme_id, vote_type))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub upvotes: i32,
    pub downvotes: i32,
    pub user_vote: Option<VoteType>,
}

/// Cast, flip or withdraw the caller's vote.
async fn vote(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> AppResult<Success<VoteResponse>> {
    let (meme_id, vote_type) = VoteRequest::from_body(body)?;

    let outcome = state
        .vote_service
        .cast_vote(&user.id, &meme_id, vote_type)
        .await?;

    Ok(Success::new(VoteResponse {
        upvotes: outcome.upvotes,
        downvotes: outcome.downvotes,
        user_vote: outcome.effective_vote,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/vote", post(vote))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(meme_id: Option<&str>, vote_type: Option<&str>) -> VoteRequest {
        VoteRequest {
            meme_id: meme_id.map(ToString::to_string),
            vote_type: vote_type.map(ToString::to_string),
        }
    }

    #[test]
    fn test_parse_vote_request() {
        let (meme_id, vote_type) = request(Some("m1"), Some("DOWNVOTE")).parse().unwrap();
        assert_eq!(meme_id, "m1");
        assert_eq!(vote_type, VoteType::Downvote);
    }

    #[test]
    fn test_malformed_vote_is_rejected() {
        for req in [
            request(Some("m1"), Some("upvote")),
            request(Some("m1"), None),
            request(None, Some("UPVOTE")),
        ] {
            assert!(matches!(req.parse(), Err(AppError::BadRequest(msg)) if msg == "Invalid vote data"));
        }
    }
}
