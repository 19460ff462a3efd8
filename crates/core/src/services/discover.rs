//! Discover search across local memes and Imgflip templates.

use memehub_common::{AppResult, PageRequest};
use serde::Serialize;

use crate::services::{
    imgflip::{self, TemplateSourceService, TemplateView},
    meme::MemeService,
    view::MemeView,
};

/// Local matches considered before merging.
const LOCAL_SEARCH_LIMIT: u64 = 50;

/// A discover hit from either source.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DiscoverItem {
    Local(Box<MemeView>),
    Imgflip(Box<TemplateView>),
}

/// Hit counts per source before paging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub local: u64,
    pub imgflip: u64,
}

/// One page of discover results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverPage {
    pub memes: Vec<DiscoverItem>,
    pub total: u64,
    pub has_more: bool,
    pub page: u64,
    pub limit: u64,
    pub query: String,
    pub sources: SourceCounts,
}

/// Discover service for business logic.
#[derive(Clone)]
pub struct DiscoverService {
    meme_service: MemeService,
    templates: TemplateSourceService,
}

impl DiscoverService {
    /// Create a new discover service.
    #[must_use]
    pub fn new(meme_service: MemeService, templates: TemplateSourceService) -> Self {
        Self {
            meme_service,
            templates,
        }
    }

    /// A page of the template catalogue.
    pub async fn templates(&self, page: &PageRequest) -> AppResult<imgflip::TemplatePage> {
        imgflip::templates(self.templates.as_ref(), page).await
    }

    /// Search local memes and Imgflip templates, local hits first.
    ///
    /// Imgflip being unreachable only drops its hits.
    pub async fn search(&self, query: &str, page: &PageRequest) -> AppResult<DiscoverPage> {
        let query = query.trim();

        let (local, remote) = if query.is_empty() {
            (vec![], vec![])
        } else {
            let local = self
                .meme_service
                .search_views(query, LOCAL_SEARCH_LIMIT)
                .await?;
            let remote = match imgflip::search_templates(self.templates.as_ref(), query).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(error = %e, query, "Imgflip search failed, returning local results only");
                    vec![]
                }
            };
            (local, remote)
        };

        let sources = SourceCounts {
            local: local.len() as u64,
            imgflip: remote.len() as u64,
        };
        let total = sources.local + sources.imgflip;

        let memes = local
            .into_iter()
            .map(|m| DiscoverItem::Local(Box::new(m)))
            .chain(remote.into_iter().map(|t| DiscoverItem::Imgflip(Box::new(t))))
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .collect();

        Ok(DiscoverPage {
            memes,
            total,
            has_more: page.has_more(total),
            page: page.page,
            limit: page.limit,
            query: query.to_string(),
            sources,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::imgflip::tests::{FailingTemplates, FixedTemplates, template};
    use crate::services::notification::tests::{test_meme, test_user};
    use crate::services::{tag::TagService, trending::TrendingService, view::MemeViewBuilder};
    use memehub_common::LocalStorage;
    use memehub_db::repositories::{
        CommentRepository, FavoriteRepository, MemeRepository, TagRepository, TrendingRepository,
        UserRepository, VoteRepository,
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn service(db: DatabaseConnection, templates: TemplateSourceService) -> DiscoverService {
        let db = Arc::new(db);
        let views = MemeViewBuilder::new(
            UserRepository::new(db.clone()),
            TagRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
        );
        let memes = MemeService::new(
            MemeRepository::new(db.clone()),
            VoteRepository::new(db.clone()),
            FavoriteRepository::new(db.clone()),
            TagService::new(TagRepository::new(db.clone()), MemeRepository::new(db.clone()), views.clone()),
            TrendingService::new(TrendingRepository::new(db.clone()), MemeRepository::new(db), views.clone()),
            views,
            Arc::new(LocalStorage::new("/tmp/memehub-test".into(), "/uploads".to_string())),
        );
        DiscoverService::new(memes, templates)
    }

    fn local_hit_db() -> DatabaseConnection {
        let mut meme = test_meme("m1", "u1");
        meme.title = "drake but cats".to_string();
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[meme]])
            .append_query_results([[test_user("u1", "alice")]])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection()
    }

    #[tokio::test]
    async fn test_local_results_come_first() {
        let templates = Arc::new(FixedTemplates(vec![
            template("1", "Drake Hotline Bling"),
            template("2", "Distracted Boyfriend"),
        ]));

        let page = service(local_hit_db(), templates)
            .search("drake", &PageRequest::new(None, None, 20))
            .await
            .unwrap();

        assert_eq!(page.sources, SourceCounts { local: 1, imgflip: 1 });
        assert_eq!(page.total, 2);
        assert!(matches!(&page.memes[0], DiscoverItem::Local(m) if m.id == "m1"));
        assert!(matches!(&page.memes[1], DiscoverItem::Imgflip(t) if t.id == "imgflip_1"));
    }

    #[tokio::test]
    async fn test_imgflip_failure_keeps_local_results() {
        let page = service(local_hit_db(), Arc::new(FailingTemplates))
            .search("drake", &PageRequest::new(None, None, 20))
            .await
            .unwrap();

        assert_eq!(page.sources, SourceCounts { local: 1, imgflip: 0 });
        assert_eq!(page.memes.len(), 1);
    }

    #[tokio::test]
    async fn test_templates_surface_source_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db, Arc::new(FailingTemplates))
            .templates(&PageRequest::new(None, None, 20))
            .await;
        assert!(result.is_err());
    }
}
