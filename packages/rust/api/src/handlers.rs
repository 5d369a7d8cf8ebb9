use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use newsdesk_core::{
    ArticleSearchFilter, ArticleUpdate, CategoryEntry, FeedPage, FeedQuery, NewArticle,
    query_feed, search_feed,
};
use newsdesk_shared::{Article, FeedConfig, NewsdeskError, PageSet, Result};
use newsdesk_storage::{FeedFilter, FeedSort};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::state::AppState;

/// Query string accepted by the feed and search endpoints.
///
/// Values arrive as text and are parsed here so that a bad value produces a
/// message naming the parameter.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub q: Option<String>,
    /// Display page to list (`home`, `sports`, ...).
    pub surface: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub breaking: Option<String>,
    pub featured: Option<String>,
    pub trending: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl FeedParams {
    fn to_query(&self, config: &FeedConfig) -> Result<FeedQuery> {
        let filter = FeedFilter {
            surface: parse_opt(&self.surface, "surface")?,
            category: parse_opt(&self.category, "category")?,
            tag: self
                .tag
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
            breaking: parse_flag(&self.breaking, "breaking")?,
            featured: parse_flag(&self.featured, "featured")?,
            trending: parse_flag(&self.trending, "trending")?,
        };
        let sort = match non_blank(&self.sort) {
            Some(s) => s.parse::<FeedSort>()?,
            None => FeedSort::default(),
        };
        Ok(FeedQuery::new(
            filter,
            sort,
            parse_count(&self.page, "page")?,
            parse_count(&self.limit, "limit")?,
            config,
        ))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_opt<T>(value: &Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    non_blank(value)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| NewsdeskError::validation(format!("invalid {name} '{v}': {e}")))
        })
        .transpose()
}

/// Page numbers and sizes: any integer is accepted and non-positive values
/// clamp to 1.
fn parse_count(value: &Option<String>, name: &str) -> Result<Option<u32>> {
    Ok(parse_opt::<i64>(value, name)?
        .map(|n| u32::try_from(n.max(1)).unwrap_or(u32::MAX)))
}

fn parse_flag(value: &Option<String>, name: &str) -> Result<Option<bool>> {
    match non_blank(value).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(None),
        Some("true" | "1" | "yes") => Ok(Some(true)),
        Some("false" | "0" | "no") => Ok(Some(false)),
        Some(other) => Err(NewsdeskError::validation(format!(
            "invalid {name} '{other}': expected true or false"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub pages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub pages: PageSet,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> std::result::Result<Json<FeedPage>, ApiError> {
    let query = params.to_query(&state.feed)?;
    Ok(Json(query_feed(state.storage(), &query).await?))
}

pub async fn search_articles(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> std::result::Result<Json<FeedPage>, ApiError> {
    let search = ArticleSearchFilter::new(params.q.as_deref().unwrap_or_default())?;
    let query = params.to_query(&state.feed)?;
    Ok(Json(search_feed(state.storage(), &search, &query).await?))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<Article>, ApiError> {
    Ok(Json(state.articles.get(&id, true).await?))
}

pub async fn create_article(
    State(state): State<AppState>,
    AppJson(request): AppJson<NewArticle>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let article = state.articles.create(request).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(update): AppJson<ArticleUpdate>,
) -> std::result::Result<Json<Article>, ApiError> {
    Ok(Json(state.articles.update(&id, update).await?))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<StatusCode, ApiError> {
    state.articles.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: state.page_map().entries(),
    })
}

pub async fn preview_pages(
    State(state): State<AppState>,
    AppJson(request): AppJson<PreviewRequest>,
) -> std::result::Result<Json<PreviewResponse>, ApiError> {
    let pages = state
        .articles
        .preview_pages(&request.category, &request.pages)?;
    Ok(Json(PreviewResponse { pages }))
}
