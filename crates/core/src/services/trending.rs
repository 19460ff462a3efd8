//! Trending service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use memehub_common::{AppError, AppResult, PageRequest, Pagination};
use memehub_db::repositories::{MemeRepository, TrendingRepository};
use serde::Serialize;

use crate::services::view::{MemeView, MemeViewBuilder};

/// Lookback window for trending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    /// Length of the window.
    #[must_use]
    pub fn window(self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::days(7),
            Self::Monthly => Duration::days(30),
        }
    }

    /// Oldest creation time still eligible at `now`.
    #[must_use]
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window()
    }

    /// Parse an optional query value. Missing means daily.
    pub fn parse_or_default(value: Option<&str>) -> AppResult<Self> {
        value.map_or(Ok(Self::default()), str::parse::<Self>)
    }
}

impl FromStr for Timeframe {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(AppError::BadRequest(format!("Invalid timeframe: {other}"))),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        })
    }
}

/// One page of trending memes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPage {
    pub memes: Vec<MemeView>,
    pub pagination: Pagination,
    pub timeframe: Timeframe,
}

/// Trending service for business logic.
#[derive(Clone)]
pub struct TrendingService {
    trending_repo: TrendingRepository,
    meme_repo: MemeRepository,
    views: MemeViewBuilder,
}

impl TrendingService {
    /// Create a new trending service.
    #[must_use]
    pub const fn new(
        trending_repo: TrendingRepository,
        meme_repo: MemeRepository,
        views: MemeViewBuilder,
    ) -> Self {
        Self {
            trending_repo,
            meme_repo,
            views,
        }
    }

    /// Rank memes created within the timeframe.
    pub async fn get_trending(&self, timeframe: Timeframe, page: PageRequest) -> AppResult<TrendingPage> {
        let now = Utc::now();
        let since = timeframe.window_start(now);

        let ranked = self
            .trending_repo
            .find_ranked(since, now, page.offset(), page.limit)
            .await?;
        let total = self.meme_repo.count_created_since(since).await?;
        let memes = self.views.build_ranked(ranked).await?;

        Ok(TrendingPage {
            memes,
            pagination: page.describe(total),
            timeframe,
        })
    }
}
