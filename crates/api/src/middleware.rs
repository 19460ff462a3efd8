//! API middleware and shared state.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use memehub_common::{AppResult, Config, StorageService};
use memehub_core::{
    CommentService, DiscoverService, EmailService, FavoriteService, FollowService, MemeService,
    MemeViewBuilder, NotificationHub, NotificationService, ProfileService, TagService,
    TemplateSourceService, TrendingService, UserService, VerificationService, VoteService,
};
use memehub_db::repositories::{
    CommentRepository, FavoriteRepository, FollowRepository, MemeRepository,
    NotificationRepository, TagRepository, TrendingRepository, UserRepository,
    VerificationTokenRepository, VoteRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub verification_service: VerificationService,
    pub meme_service: MemeService,
    pub vote_service: VoteService,
    pub favorite_service: FavoriteService,
    pub trending_service: TrendingService,
    pub comment_service: CommentService,
    pub tag_service: TagService,
    pub follow_service: FollowService,
    pub profile_service: ProfileService,
    pub notification_service: NotificationService,
    pub discover_service: DiscoverService,
    pub hub: NotificationHub,
}

impl AppState {
    /// Wire every service over one connection pool.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &Config,
        storage: StorageService,
        templates: TemplateSourceService,
    ) -> AppResult<Self> {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let meme_repo = MemeRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(Arc::clone(&db));
        let favorite_repo = FavoriteRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let tag_repo = TagRepository::new(Arc::clone(&db));
        let follow_repo = FollowRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));
        let trending_repo = TrendingRepository::new(Arc::clone(&db));
        let token_repo = VerificationTokenRepository::new(db);

        let hub = NotificationHub::new();
        let views = MemeViewBuilder::new(user_repo.clone(), tag_repo.clone(), comment_repo.clone());

        let notification_service = NotificationService::new(
            notification_repo,
            user_repo.clone(),
            meme_repo.clone(),
            hub.clone(),
        );

        let email_service = EmailService::from_settings(&config.email, &config.server.url)?;
        tracing::info!(transport = email_service.transport_name(), "Email delivery configured");

        let verification_service =
            VerificationService::new(user_repo.clone(), token_repo, email_service);

        let mut user_service =
            UserService::new(user_repo.clone(), meme_repo.clone(), follow_repo.clone());
        user_service.set_verification_service(verification_service.clone());

        let trending_service =
            TrendingService::new(trending_repo, meme_repo.clone(), views.clone());
        let tag_service = TagService::new(tag_repo, meme_repo.clone(), views.clone());

        let mut meme_service = MemeService::new(
            meme_repo.clone(),
            vote_repo.clone(),
            favorite_repo.clone(),
            tag_service.clone(),
            trending_service.clone(),
            views.clone(),
            storage,
        );
        meme_service.set_notification_service(notification_service.clone());

        let mut vote_service = VoteService::new(meme_repo.clone(), vote_repo);
        vote_service.set_notification_service(notification_service.clone());

        let favorite_service = FavoriteService::new(meme_repo.clone(), favorite_repo, views.clone());

        let mut comment_service =
            CommentService::new(comment_repo, meme_repo.clone(), user_repo.clone());
        comment_service.set_notification_service(notification_service.clone());

        let mut follow_service = FollowService::new(follow_repo.clone(), user_repo.clone());
        follow_service.set_notification_service(notification_service.clone());

        let profile_service = ProfileService::new(user_repo, meme_repo, follow_repo, views);
        let discover_service = DiscoverService::new(meme_service.clone(), templates);

        Ok(Self {
            user_service,
            verification_service,
            meme_service,
            vote_service,
            favorite_service,
            trending_service,
            comment_service,
            tag_service,
            follow_service,
            profile_service,
            notification_service,
            discover_service,
            hub,
        })
    }
}

/// Authentication middleware.
///
/// A valid `Authorization: Bearer <token>` header puts the user into the
/// request extensions. Anything else passes through unauthenticated.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_service.authenticate_by_token(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring invalid bearer token"),
        }
    }

    next.run(req).await
}
