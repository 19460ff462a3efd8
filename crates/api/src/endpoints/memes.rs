//! Meme endpoints.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use memehub_common::{AppError, AppResult};
use memehub_core::{
    FeedPage, FeedSort, MAX_UPLOAD_SIZE, MemeView, SearchPage, Timeframe, TrendingPage,
    UploadMemeInput, feed_timeframe,
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser, PageQuery},
    middleware::AppState,
    response::{Empty, Success},
};

use super::{comments, favorites, votes};

const FEED_PAGE_SIZE: u64 = 10;
const TRENDING_PAGE_SIZE: u64 = 10;
const SEARCH_PAGE_SIZE: u64 = 20;

/// Room for the multipart framing and text fields around the file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub sort: Option<String>,
    pub timeframe: Option<String>,
}

/// The main feed.
async fn feed(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<FeedPage>> {
    let sort = query
        .sort
        .as_deref()
        .map_or(Ok(FeedSort::default()), str::parse::<FeedSort>)?;
    let timeframe = feed_timeframe(query.timeframe.as_deref())?;

    let page = state
        .meme_service
        .feed(sort, timeframe, page.with_default(FEED_PAGE_SIZE))
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub timeframe: Option<String>,
}

/// Memes ranked by trending score.
async fn trending(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(query): Query<TrendingQuery>,
) -> AppResult<Json<TrendingPage>> {
    let timeframe = Timeframe::parse_or_default(query.timeframe.as_deref())?;

    let page = state
        .trending_service
        .get_trending(timeframe, page.with_default(TRENDING_PAGE_SIZE))
        .await?;
    Ok(Json(page))
}

/// A single meme. Counts the view.
async fn show(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MemeView>> {
    let meme = state
        .meme_service
        .get_and_record_view(&id, user.id())
        .await?;
    Ok(Json(meme))
}

/// Delete the caller's meme.
async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Success<Empty>> {
    state.meme_service.delete(&id, &user.id).await?;
    Ok(crate::response::ok())
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub meme: MemeView,
}

/// Upload a meme from a multipart form.
async fn upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> AppResult<Success<UploadResponse>> {
    let mut title = None;
    let mut description = None;
    let mut tags = Vec::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                file = Some((file_name, content_type, data.to_vec()));
            }
            "title" => title = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "tags" => tags = parse_tags(&read_text(field).await?)?,
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Title is required".to_string()))?;

    let meme = state
        .meme_service
        .upload(
            &user.id,
            UploadMemeInput {
                title,
                description,
                tags,
                file_name,
                content_type,
                data,
            },
        )
        .await?;

    Ok(Success::new(UploadResponse { meme }))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {e}")))
}

/// Tags arrive as a JSON array of strings.
fn parse_tags(raw: &str) -> AppResult<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(vec![]);
    }
    serde_json::from_str(raw)
        .map_err(|_| AppError::BadRequest("Tags must be a JSON array of strings".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeIdRequest {
    pub meme_id: Option<String>,
}

impl MemeIdRequest {
    /// Unpack a request body. A body of the wrong shape counts as a missing id.
    pub(super) fn from_body(body: Result<Json<Self>, JsonRejection>) -> AppResult<String> {
        body.map_or_else(
            |e| {
                tracing::debug!(error = %e, "Rejected meme id body");
                Err(AppError::BadRequest("Meme ID is required".to_string()))
            },
            |Json(req)| req.require(),
        )
    }

    pub(super) fn require(self) -> AppResult<String> {
        self.meme_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("Meme ID is required".to_string()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub share_count: i32,
}

/// Count a share.
async fn share(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    body: Result<Json<MemeIdRequest>, JsonRejection>,
) -> AppResult<Success<ShareResponse>> {
    let meme_id = MemeIdRequest::from_body(body)?;
    let share_count = state.meme_service.share(&meme_id, user.id()).await?;
    Ok(Success::new(ShareResponse { share_count }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search memes by text, tag and author.
async fn search(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<SearchPage>> {
    let results = state
        .meme_service
        .search(&query.q, page.with_default(SEARCH_PAGE_SIZE))
        .await?;
    Ok(Json(results))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(feed))
        .route("/trending", get(trending))
        .route("/search", get(search))
        .route("/share", post(share))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + MULTIPART_OVERHEAD)),
        )
        .route("/{id}", get(show).delete(delete))
        .merge(votes::router())
        .merge(favorites::router())
        .merge(comments::router())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags(r#"["Funny", "cats"]"#).unwrap(),
            vec!["Funny".to_string(), "cats".to_string()]
        );
        assert!(parse_tags("").unwrap().is_empty());
        assert!(matches!(parse_tags("funny,cats"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_meme_id_is_required() {
        let req = MemeIdRequest { meme_id: None };
        assert!(matches!(req.require(), Err(AppError::BadRequest(_))));

        let req = MemeIdRequest {
            meme_id: Some("m1".to_string()),
        };
        assert_eq!(req.require().unwrap(), "m1");
    }
}
