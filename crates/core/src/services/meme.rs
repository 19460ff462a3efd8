//! Meme service.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use memehub_common::{AppError, AppResult, IdGenerator, PageRequest, StorageService, generate_storage_key};
use memehub_db::{
    entities::meme::{self, MemeType},
    repositories::{FavoriteRepository, MemeRepository, VoteRepository},
};
use sea_orm::Set;
use serde::Serialize;
use validator::Validate;

use crate::services::{
    notification::{NotificationService, NotifyEvent},
    tag::TagService,
    trending::{Timeframe, TrendingService},
    view::{MemeView, MemeViewBuilder},
};

/// Largest accepted upload (50 MB).
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/webm",
    "video/mov",
    "video/quicktime",
];

/// Input for uploading a meme.
#[derive(Debug, Validate)]
pub struct UploadMemeInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub tags: Vec<String>,

    pub file_name: String,

    pub content_type: String,

    pub data: Vec<u8>,
}

/// Feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedSort {
    #[default]
    Latest,
    Popular,
    Trending,
}

impl FromStr for FeedSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(Self::Latest),
            "popular" => Ok(Self::Popular),
            "trending" => Ok(Self::Trending),
            other => Err(AppError::BadRequest(format!("Invalid sort: {other}"))),
        }
    }
}

impl fmt::Display for FeedSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Latest => "latest",
            Self::Popular => "popular",
            Self::Trending => "trending",
        })
    }
}

/// Timeframe for the trending feed. `all` widens to the monthly window.
pub fn feed_timeframe(value: Option<&str>) -> AppResult<Timeframe> {
    match value {
        Some("all") => Ok(Timeframe::Monthly),
        other => Timeframe::parse_or_default(other),
    }
}

/// One page of the main feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub memes: Vec<MemeView>,
    pub has_more: bool,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Search results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub memes: Vec<MemeView>,
    pub total: u64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl SearchPage {
    fn empty() -> Self {
        Self {
            memes: vec![],
            total: 0,
            has_more: false,
            query: None,
        }
    }
}

/// Meme service for business logic.
#[derive(Clone)]
pub struct MemeService {
    meme_repo: MemeRepository,
    vote_repo: VoteRepository,
    favorite_repo: FavoriteRepository,
    tag_service: TagService,
    trending_service: TrendingService,
    views: MemeViewBuilder,
    storage: StorageService,
    notification_service: Option<NotificationService>,
    id_gen: IdGenerator,
}

impl MemeService {
    /// Create a new meme service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        meme_repo: MemeRepository,
        vote_repo: VoteRepository,
        favorite_repo: FavoriteRepository,
        tag_service: TagService,
        trending_service: TrendingService,
        views: MemeViewBuilder,
        storage: StorageService,
    ) -> Self {
        Self {
            meme_repo,
            vote_repo,
            favorite_repo,
            tag_service,
            trending_service,
            views,
            storage,
            notification_service: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification service used to tell authors about shares.
    pub fn set_notification_service(&mut self, notification_service: NotificationService) {
        self.notification_service = Some(notification_service);
    }

    /// Store an uploaded file and create its meme.
    pub async fn upload(&self, author_id: &str, input: UploadMemeInput) -> AppResult<MemeView> {
        let title = input.title.trim().to_string();
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToString::to_string);
        let input = UploadMemeInput {
            title,
            description,
            ..input
        };
        input.validate()?;

        let content_type = input.content_type.to_ascii_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Invalid file type: {content_type}. Allowed types are images (JPEG, PNG, GIF, WebP) and videos (MP4, WebM, MOV)"
            )));
        }
        if input.data.is_empty() {
            return Err(AppError::BadRequest("File is empty".to_string()));
        }
        if input.data.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::BadRequest(format!(
                "File too large. Maximum size is {} MB",
                MAX_UPLOAD_SIZE / 1024 / 1024
            )));
        }

        let meme_type = MemeType::from_content_type(&content_type).ok_or_else(|| {
            AppError::BadRequest(format!("Unsupported content type: {content_type}"))
        })?;

        let key = generate_storage_key(&input.file_name);
        let stored = self.storage.upload(&key, &input.data, &content_type).await?;

        let model = meme::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            title: Set(input.title),
            description: Set(input.description),
            image_url: Set(stored.url),
            storage_key: Set(Some(stored.key.clone())),
            meme_type: Set(meme_type),
            upvotes: Set(0),
            downvotes: Set(0),
            views: Set(0),
            share_count: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let meme = match self.meme_repo.create(model).await {
            Ok(meme) => meme,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored.key).await {
                    tracing::warn!(error = %cleanup, key = %stored.key, "Failed to remove orphaned upload");
                }
                return Err(e);
            }
        };

        self.tag_service.tag_meme(&meme.id, &input.tags).await?;

        tracing::info!(meme_id = %meme.id, author_id, size = stored.size, "Meme uploaded");
        self.views.build_one(meme).await
    }

    /// A page of the main feed.
    pub async fn feed(
        &self,
        sort: FeedSort,
        timeframe: Timeframe,
        page: PageRequest,
    ) -> AppResult<FeedPage> {
        let (memes, total) = match sort {
            FeedSort::Latest => {
                let memes = self.meme_repo.find_latest(page.offset(), page.limit).await?;
                (self.views.build(memes).await?, self.meme_repo.count_all().await?)
            }
            FeedSort::Popular => {
                let memes = self.meme_repo.find_popular(page.offset(), page.limit).await?;
                (self.views.build(memes).await?, self.meme_repo.count_all().await?)
            }
            FeedSort::Trending => {
                let ranked = self.trending_service.get_trending(timeframe, page).await?;
                (ranked.memes, ranked.pagination.total)
            }
        };

        Ok(FeedPage {
            memes,
            has_more: page.has_more(total),
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    /// Read one meme and count the view. Signed-in callers also get their
    /// vote and favorite state.
    pub async fn get_and_record_view(&self, id: &str, viewer_id: Option<&str>) -> AppResult<MemeView> {
        let mut meme = self
            .meme_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::MemeNotFound(id.to_string()))?;

        self.meme_repo.increment_views(id).await?;
        meme.views += 1;

        let mut view = self.views.build_one(meme).await?;

        if let Some(viewer_id) = viewer_id {
            view.user_vote = Some(self.vote_repo.user_vote(viewer_id, id).await?);
            view.is_favorited = Some(self.favorite_repo.is_favorited(viewer_id, id).await?);
        }

        Ok(view)
    }

    /// Delete a meme. Only its author may do this.
    pub async fn delete(&self, id: &str, requester_id: &str) -> AppResult<()> {
        let meme = self
            .meme_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::MemeNotFound(id.to_string()))?;

        if meme.author_id != requester_id {
            return Err(AppError::Forbidden(
                "You can only delete your own memes".to_string(),
            ));
        }

        if let Some(key) = &meme.storage_key {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(error = %e, %key, "Failed to delete meme file");
            }
        }

        self.meme_repo.delete(id).await?;
        tracing::info!(meme_id = id, "Meme deleted");
        Ok(())
    }

    /// Count a share and return the new share count.
    pub async fn share(&self, id: &str, sharer_id: Option<&str>) -> AppResult<i32> {
        let meme = self
            .meme_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::MemeNotFound(id.to_string()))?;

        let share_count = self.meme_repo.increment_share_count(id).await?;

        if let (Some(notifications), Some(sharer_id)) = (&self.notification_service, sharer_id) {
            if sharer_id != meme.author_id {
                notifications.notify_in_background(
                    sharer_id,
                    &meme.author_id,
                    NotifyEvent::Share {
                        meme_id: id.to_string(),
                    },
                );
            }
        }

        Ok(share_count)
    }

    /// Case-insensitive search, newest first. An empty query matches nothing.
    pub async fn search(&self, query: &str, page: PageRequest) -> AppResult<SearchPage> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchPage::empty());
        }

        let memes = self
            .meme_repo
            .search(query, page.offset(), page.limit)
            .await?;
        let total = self.meme_repo.count_search(query).await?;

        Ok(SearchPage {
            memes: self.views.build(memes).await?,
            total,
            has_more: page.has_more(total),
            query: Some(query.to_string()),
        })
    }

    /// Raw search rows, for callers merging other sources.
    pub async fn search_views(&self, query: &str, limit: u64) -> AppResult<Vec<MemeView>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        let memes = self.meme_repo.search(query, 0, limit).await?;
        self.views.build(memes).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::tests::{test_meme, test_user};
    use memehub_common::{StorageBackend, UploadedFile};
    use memehub_db::repositories::{CommentRepository, TagRepository, TrendingRepository, UserRepository};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryStorage {
        files: Mutex<HashMap<String, usize>>,
    }

    #[async_trait::async_trait]
    impl StorageBackend for MemoryStorage {
        async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
            self.files.lock().unwrap().insert(key.to_string(), data.len());
            Ok(UploadedFile {
                key: key.to_string(),
                url: self.public_url(key),
                size: data.len() as u64,
                content_type: content_type.to_string(),
                md5: String::new(),
            })
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.files.lock().unwrap().remove(key);
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("/uploads/{key}")
        }

        async fn exists(&self, key: &str) -> AppResult<bool> {
            Ok(self.files.lock().unwrap().contains_key(key))
        }
    }

    fn service(db: DatabaseConnection, storage: Arc<MemoryStorage>) -> MemeService {
        let db = Arc::new(db);
        let views = MemeViewBuilder::new(
            UserRepository::new(db.clone()),
            TagRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
        );
        MemeService::new(
            MemeRepository::new(db.clone()),
            VoteRepository::new(db.clone()),
            FavoriteRepository::new(db.clone()),
            TagService::new(TagRepository::new(db.clone()), MemeRepository::new(db.clone()), views.clone()),
            TrendingService::new(TrendingRepository::new(db.clone()), MemeRepository::new(db), views.clone()),
            views,
            storage,
        )
    }

    fn upload_input(content_type: &str, size: usize) -> UploadMemeInput {
        UploadMemeInput {
            title: "  Distracted cat  ".to_string(),
            description: Some("   ".to_string()),
            tags: vec![],
            file_name: "cat.png".to_string(),
            content_type: content_type.to_string(),
            data: vec![0; size],
        }
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[test]
    fn test_feed_sort_parsing() {
        assert_eq!("popular".parse::<FeedSort>().unwrap(), FeedSort::Popular);
        assert!(matches!("hot".parse::<FeedSort>(), Err(AppError::BadRequest(_))));
        assert_eq!(feed_timeframe(Some("all")).unwrap(), Timeframe::Monthly);
        assert_eq!(feed_timeframe(None).unwrap(), Timeframe::Daily);
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_type() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let storage = Arc::new(MemoryStorage::default());

        let result = service(db, storage.clone())
            .upload("u1", upload_input("application/pdf", 10))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(storage.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db, Arc::new(MemoryStorage::default()))
            .upload("u1", upload_input("image/png", MAX_UPLOAD_SIZE + 1))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("too large")));
    }

    #[tokio::test]
    async fn test_upload_stores_file_and_meme() {
        let mut created = test_meme("m1", "u1");
        created.title = "Distracted cat".to_string();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[created]])
            .append_query_results([[test_user("u1", "alice")]])
            .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
            .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
            .into_connection();
        let storage = Arc::new(MemoryStorage::default());

        let view = service(db, storage.clone())
            .upload("u1", upload_input("image/png", 10))
            .await
            .unwrap();

        assert_eq!(view.title, "Distracted cat");
        assert_eq!(view.author.unwrap().username, "alice");
        assert_eq!(storage.files.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_stranger_is_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_meme("m1", "owner")]])
            .into_connection();

        let result = service(db, Arc::new(MemoryStorage::default()))
            .delete("m1", "stranger")
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_by_owner_removes_file() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_meme("m1", "owner")]])
            .append_exec_results([exec(1)])
            .into_connection();
        let storage = Arc::new(MemoryStorage::default());
        storage.files.lock().unwrap().insert("m1.png".to_string(), 3);

        service(db, storage.clone()).delete("m1", "owner").await.unwrap();

        assert!(storage.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_share_returns_new_count() {
        let mut shared = test_meme("m1", "owner");
        shared.share_count = 4;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_meme("m1", "owner")]])
            .append_exec_results([exec(1)])
            .append_query_results([[shared]])
            .into_connection();

        let count = service(db, Arc::new(MemoryStorage::default()))
            .share("m1", None)
            .await
            .unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_empty_search_skips_queries() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let page = service(db, Arc::new(MemoryStorage::default()))
            .search("   ", PageRequest::new(None, None, 10))
            .await
            .unwrap();

        assert!(page.memes.is_empty());
        assert_eq!(page.total, 0);
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("query").is_none());
        assert_eq!(json["hasMore"], false);
    }

    #[tokio::test]
    async fn test_view_counts_and_adds_viewer_state() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_meme("m1", "owner")]])
            .append_exec_results([exec(1)])
            .append_query_results([Vec::<memehub_db::entities::user::Model>::new()])
            .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
            .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
            .append_query_results([Vec::<memehub_db::entities::vote::Model>::new()])
            .append_query_results([Vec::<memehub_db::entities::favorite::Model>::new()])
            .into_connection();

        let view = service(db, Arc::new(MemoryStorage::default()))
            .get_and_record_view("m1", Some("viewer"))
            .await
            .unwrap();

        assert_eq!(view.views, 1);
        assert_eq!(view.user_vote, Some(None));
        assert_eq!(view.is_favorited, Some(false));
    }
}
