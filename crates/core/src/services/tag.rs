//! Tag service.

use memehub_common::{AppError, AppResult, PageRequest};
use memehub_db::{
    entities::tag,
    repositories::{MemeRepository, TagRepository},
};
use serde::Serialize;

use crate::services::view::{MemeView, MemeViewBuilder};

/// Most tags a single meme can carry.
pub const MAX_TAGS_PER_MEME: usize = 10;

/// Trim, lowercase and dedupe tag names, keeping first-seen order.
///
/// Empty names are dropped and at most [`MAX_TAGS_PER_MEME`] survive.
#[must_use]
pub fn normalize_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for name in names {
        let name = name.as_ref().trim().to_lowercase();
        if !name.is_empty() && !normalized.contains(&name) {
            normalized.push(name);
        }
        if normalized.len() == MAX_TAGS_PER_MEME {
            break;
        }
    }
    normalized
}

/// Tag header on a tag page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub name: String,
    pub meme_count: u64,
}

/// Memes carrying one tag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPage {
    pub tag: TagSummary,
    pub memes: Vec<MemeView>,
    pub has_more: bool,
    pub total: u64,
}

/// Tag service for business logic.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
    meme_repo: MemeRepository,
    views: MemeViewBuilder,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository, meme_repo: MemeRepository, views: MemeViewBuilder) -> Self {
        Self {
            tag_repo,
            meme_repo,
            views,
        }
    }

    /// Normalize names and make sure each has a tag row.
    pub async fn upsert_names<S: AsRef<str>>(&self, names: &[S]) -> AppResult<Vec<tag::Model>> {
        let names = normalize_names(names);
        self.tag_repo.upsert_many(&names).await
    }

    /// Normalize names, upsert them and link them to a meme.
    pub async fn tag_meme<S: AsRef<str>>(&self, meme_id: &str, names: &[S]) -> AppResult<Vec<String>> {
        let tags = self.upsert_names(names).await?;
        let ids: Vec<String> = tags.iter().map(|t| t.id.clone()).collect();
        self.tag_repo.attach(meme_id, &ids).await?;

        let mut names: Vec<String> = tags.into_iter().map(|t| t.name).collect();
        names.sort();
        Ok(names)
    }

    /// All tags, alphabetically.
    pub async fn list(&self) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.find_all().await
    }

    /// A page of memes carrying the tag, newest first.
    pub async fn memes_for_tag(&self, name: &str, page: &PageRequest) -> AppResult<TagPage> {
        let name = name.trim().to_lowercase();
        let tag = self
            .tag_repo
            .find_by_name(&name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag not found: {name}")))?;

        let memes = self
            .meme_repo
            .find_by_tag(&tag.id, page.offset(), page.limit)
            .await?;
        let total = self.meme_repo.count_by_tag(&tag.id).await?;
        let memes = self.views.build(memes).await?;

        Ok(TagPage {
            tag: TagSummary {
                name: tag.name,
                meme_count: total,
            },
            memes,
            has_more: page.has_more(total),
            total,
        })
    }
}
