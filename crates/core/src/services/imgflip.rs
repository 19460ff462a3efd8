//! Imgflip template catalogue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use memehub_common::{AppError, AppResult, PageRequest};
use memehub_db::entities::meme::MemeType;
use serde::{Deserialize, Serialize};

use crate::services::view::MemeCounts;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A template as Imgflip returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ImgflipTemplate {
    pub id: String,
    pub name: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub box_count: u32,
}

#[derive(Debug, Deserialize)]
struct ImgflipData {
    memes: Vec<ImgflipTemplate>,
}

#[derive(Debug, Deserialize)]
struct ImgflipResponse {
    success: bool,
    data: Option<ImgflipData>,
    error_message: Option<String>,
}

/// Template details carried next to the meme-shaped fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImgflipInfo {
    pub template_id: String,
    pub width: u32,
    pub height: u32,
    pub box_count: u32,
}

/// An Imgflip template shaped like a meme.
///
/// Engagement counters are always zero: templates have no local votes,
/// views or shares.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub meme_type: MemeType,
    pub upvotes: i32,
    pub downvotes: i32,
    pub views: i32,
    pub share_count: i32,
    pub tags: Vec<String>,
    #[serde(rename = "_count")]
    pub count: MemeCounts,
    pub source: &'static str,
    pub imgflip: ImgflipInfo,
}

impl From<ImgflipTemplate> for TemplateView {
    fn from(t: ImgflipTemplate) -> Self {
        Self {
            id: format!("imgflip_{}", t.id),
            description: format!(
                "Popular meme template from Imgflip - {} text boxes",
                t.box_count
            ),
            title: t.name,
            image_url: t.url,
            meme_type: MemeType::Image,
            upvotes: 0,
            downvotes: 0,
            views: 0,
            share_count: 0,
            tags: vec![],
            count: MemeCounts::default(),
            source: "imgflip",
            imgflip: ImgflipInfo {
                template_id: t.id,
                width: t.width,
                height: t.height,
                box_count: t.box_count,
            },
        }
    }
}

/// One page of templates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePage {
    pub memes: Vec<TemplateView>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub has_more: bool,
}

/// Where meme templates come from.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Every template currently offered.
    async fn fetch_templates(&self) -> AppResult<Vec<ImgflipTemplate>>;
}

/// Shared handle to the configured template source.
pub type TemplateSourceService = Arc<dyn TemplateSource>;

/// HTTP client for the Imgflip API.
pub struct ImgflipClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl ImgflipClient {
    /// Create a new client for `api_url`.
    pub fn new(api_url: impl Into<String>) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl TemplateSource for ImgflipClient {
    async fn fetch_templates(&self) -> AppResult<Vec<ImgflipTemplate>> {
        let response = self
            .http_client
            .get(&self.api_url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Imgflip request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Imgflip returned {}",
                response.status()
            )));
        }

        let body: ImgflipResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid Imgflip response: {e}")))?;

        parse_response(body)
    }
}

fn parse_response(body: ImgflipResponse) -> AppResult<Vec<ImgflipTemplate>> {
    match (body.success, body.data) {
        (true, Some(data)) => Ok(data.memes),
        _ => Err(AppError::ExternalService(format!(
            "Imgflip error: {}",
            body.error_message.as_deref().unwrap_or("unknown")
        ))),
    }
}

/// Page through the full template list.
pub async fn templates(source: &dyn TemplateSource, page: &PageRequest) -> AppResult<TemplatePage> {
    let all = source.fetch_templates().await?;
    let total = all.len() as u64;

    let memes = all
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
        .map(TemplateView::from)
        .collect();

    Ok(TemplatePage {
        memes,
        total,
        page: page.page,
        limit: page.limit,
        has_more: page.has_more(total),
    })
}

/// Templates whose name contains `query`, ignoring case.
pub async fn search_templates(source: &dyn TemplateSource, query: &str) -> AppResult<Vec<TemplateView>> {
    let needle = query.trim().to_lowercase();
    Ok(source
        .fetch_templates()
        .await?
        .into_iter()
        .filter(|t| t.name.to_lowercase().contains(&needle))
        .map(TemplateView::from)
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct FixedTemplates(pub Vec<ImgflipTemplate>);

    #[async_trait]
    impl TemplateSource for FixedTemplates {
        async fn fetch_templates(&self) -> AppResult<Vec<ImgflipTemplate>> {
            Ok(self.0.clone())
        }
    }

    pub(crate) struct FailingTemplates;

    #[async_trait]
    impl TemplateSource for FailingTemplates {
        async fn fetch_templates(&self) -> AppResult<Vec<ImgflipTemplate>> {
            Err(AppError::ExternalService("Imgflip request failed: timeout".to_string()))
        }
    }

    pub(crate) fn template(id: &str, name: &str) -> ImgflipTemplate {
        ImgflipTemplate {
            id: id.to_string(),
            name: name.to_string(),
            url: format!("https://i.imgflip.com/{id}.jpg"),
            width: 1200,
            height: 800,
            box_count: 2,
        }
    }

    #[test]
    fn test_parse_imgflip_payload() {
        let body: ImgflipResponse = serde_json::from_str(
            r#"{"success":true,"data":{"memes":[{"id":"181913649","name":"Drake Hotline Bling","url":"https://i.imgflip.com/30b1gx.jpg","width":1200,"height":1200,"box_count":2,"captions":1000}]}}"#,
        )
        .unwrap();

        let templates = parse_response(body).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].box_count, 2);
    }

    #[test]
    fn test_unsuccessful_payload_is_an_error() {
        let body: ImgflipResponse =
            serde_json::from_str(r#"{"success":false,"error_message":"rate limited"}"#).unwrap();

        assert!(matches!(parse_response(body), Err(AppError::ExternalService(msg)) if msg.contains("rate limited")));
    }

    #[test]
    fn test_template_view_has_zero_engagement() {
        let view = TemplateView::from(template("61579", "One Does Not Simply"));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], "imgflip_61579");
        assert_eq!(
            json["description"],
            "Popular meme template from Imgflip - 2 text boxes"
        );
        assert_eq!(json["upvotes"], 0);
        assert_eq!(json["views"], 0);
        assert_eq!(json["shareCount"], 0);
        assert_eq!(json["source"], "imgflip");
        assert_eq!(json["imgflip"]["templateId"], "61579");
        assert_eq!(json["imgflip"]["boxCount"], 2);
    }

    #[tokio::test]
    async fn test_templates_pagination() {
        let source = FixedTemplates((0..25).map(|i| template(&i.to_string(), "t")).collect());

        let page = templates(&source, &PageRequest::new(Some(2), Some(20), 20))
            .await
            .unwrap();

        assert_eq!(page.memes.len(), 5);
        assert_eq!(page.total, 25);
        assert!(!page.has_more);
        assert_eq!(page.memes[0].id, "imgflip_20");
    }

    #[tokio::test]
    async fn test_search_matches_name_case_insensitively() {
        let source = FixedTemplates(vec![
            template("1", "Distracted Boyfriend"),
            template("2", "Drake Hotline Bling"),
        ]);

        let hits = search_templates(&source, "DRAKE").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Drake Hotline Bling");
    }
}
