//! Article create/update/delete with page synchronization.
//!
//! Every write path goes through [`ArticleService`], which re-derives the
//! category pages from stored data instead of trusting the client's list.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use newsdesk_shared::{
    Article, ArticleId, Category, NewsdeskError, Page, PageSet, Patch, Result,
};
use newsdesk_storage::Storage;

use crate::category_pages::CategoryPageMap;

/// Longest generated slug, in bytes (slugs are ASCII).
const MAX_SLUG_LEN: usize = 80;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of a create request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewArticle {
    pub title: String,
    #[serde(default)]
    pub title_hi: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub excerpt_hi: Option<String>,
    pub content: String,
    #[serde(default)]
    pub content_hi: Option<String>,
    /// Raw category name; must name a known category.
    pub category: String,
    /// Manual pages requested by the editor. Category pages are derived.
    #[serde(default)]
    pub pages: Option<Vec<String>>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_breaking: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_trending: bool,
}

/// Body of a partial update. Keys left out of the request are untouched.
///
/// Optional text fields accept `null` or `""` to clear them; `title` and
/// `content` can be replaced but not cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_hi: Patch<String>,
    #[serde(default)]
    pub excerpt: Patch<String>,
    #[serde(default)]
    pub excerpt_hi: Patch<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_hi: Patch<String>,
    /// Empty text means "no category change".
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub pages: Option<Vec<String>>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub author: Patch<String>,
    #[serde(default)]
    pub image_url: Patch<String>,
    #[serde(default)]
    pub is_breaking: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub is_trending: Option<bool>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Article writes and lookups over shared storage and the page table.
#[derive(Clone)]
pub struct ArticleService {
    storage: Arc<Storage>,
    pages: Arc<CategoryPageMap>,
}

impl ArticleService {
    pub fn new(storage: Arc<Storage>, pages: Arc<CategoryPageMap>) -> Self {
        Self { storage, pages }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn page_map(&self) -> &CategoryPageMap {
        &self.pages
    }

    /// Fetch by ID or slug. With `count_view`, the stored view counter is
    /// bumped and the returned article reflects it.
    pub async fn get(&self, id_or_slug: &str, count_view: bool) -> Result<Article> {
        let mut article = self.find(id_or_slug).await?;
        if count_view {
            self.storage.increment_views(&article.id).await?;
            article.views += 1;
        }
        Ok(article)
    }

    #[instrument(skip_all, fields(category = %request.category))]
    pub async fn create(&self, request: NewArticle) -> Result<Article> {
        let id = ArticleId::new().to_string();
        let explicit = request.slug.is_some();
        let mut article = build_article(&self.pages, id, request)?;

        if self.storage.slug_exists(&article.slug, None).await? {
            if explicit {
                return Err(slug_conflict(&article.slug));
            }
            article.slug = with_suffix(&article.slug, &article.id);
        }

        self.storage.insert_article(&article).await?;
        info!(
            id = %article.id,
            slug = %article.slug,
            pages = ?article.pages,
            "article created"
        );
        Ok(article)
    }

    /// Apply a partial update. Nothing is written when the update changes
    /// nothing, so `updated_at` only moves on real edits.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id_or_slug: &str, update: ArticleUpdate) -> Result<Article> {
        let mut article = self.find(id_or_slug).await?;

        let requested_slug = update.slug.clone();
        if !apply_update(&self.pages, &mut article, update)? {
            debug!(id = %article.id, "update changed nothing");
            return Ok(article);
        }

        if requested_slug.is_some()
            && self
                .storage
                .slug_exists(&article.slug, Some(&article.id))
                .await?
        {
            return Err(slug_conflict(&article.slug));
        }

        article.updated_at = now();
        self.storage.update_article(&article).await?;
        info!(
            id = %article.id,
            category = %article.category,
            pages = ?article.pages,
            "article updated"
        );
        Ok(article)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id_or_slug: &str) -> Result<()> {
        let article = self.find(id_or_slug).await?;
        self.storage.delete_article(&article.id).await?;
        info!(id = %article.id, "article deleted");
        Ok(())
    }

    /// The pages a new article with `category` and `pages` would be saved
    /// with. Serves the admin form's live preview.
    pub fn preview_pages(&self, category: &str, pages: &[String]) -> Result<PageSet> {
        preview_pages(&self.pages, category, pages)
    }

    async fn find(&self, id_or_slug: &str) -> Result<Article> {
        self.storage
            .find_article(id_or_slug)
            .await?
            .ok_or_else(|| NewsdeskError::NotFound(format!("article '{id_or_slug}'")))
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Validate a create request into a new article with synced pages.
pub fn build_article(map: &CategoryPageMap, id: String, request: NewArticle) -> Result<Article> {
    let title = required_text("title", &request.title)?;
    let content = required_text("content", &request.content)?;
    let category = parse_category(&request.category)?
        .ok_or_else(|| NewsdeskError::validation("category is required"))?;

    let manual = match &request.pages {
        Some(raw) => manual_pages(map, raw)?,
        None => PageSet::new(),
    };
    let pages = map.sync(Some(category), &manual);

    let slug = match request.slug.as_deref() {
        Some(raw) => explicit_slug(raw)?,
        None => fallback_slug(&title, &id),
    };

    let stamp = now();
    Ok(Article {
        slug,
        title,
        title_hi: optional_text(request.title_hi),
        excerpt: optional_text(request.excerpt),
        excerpt_hi: optional_text(request.excerpt_hi),
        content,
        content_hi: optional_text(request.content_hi),
        category,
        pages,
        tags: normalize_tags(request.tags),
        author: optional_text(request.author),
        image_url: optional_text(request.image_url)
            .map(|u| validate_image_url(&u))
            .transpose()?,
        is_breaking: request.is_breaking,
        is_featured: request.is_featured,
        is_trending: request.is_trending,
        views: 0,
        created_at: stamp,
        updated_at: stamp,
        id,
    })
}

/// Pages a create request with `category` and `pages` resolves to. Blank or
/// unrecognized categories leave the manual pages as they are.
pub fn preview_pages(map: &CategoryPageMap, category: &str, pages: &[String]) -> Result<PageSet> {
    Ok(map.sync_raw(category, &manual_pages(map, pages)?))
}

/// The client's pages with `home` and category pages removed.
fn manual_pages(map: &CategoryPageMap, raw: &[String]) -> Result<PageSet> {
    Ok(map.merge_client_pages(&PageSet::new(), &parse_pages(raw)?))
}

/// Apply `update` to `article` in place. Returns whether anything changed.
///
/// Pages are re-derived when the request names a category or sends a page
/// list; category pages always come from the stored article.
pub fn apply_update(
    map: &CategoryPageMap,
    article: &mut Article,
    update: ArticleUpdate,
) -> Result<bool> {
    let mut changed = false;

    if let Some(title) = update.title {
        changed |= replace(&mut article.title, required_text("title", &title)?);
    }
    if let Some(content) = update.content {
        changed |= replace(&mut article.content, required_text("content", &content)?);
    }
    if let Some(slug) = update.slug {
        changed |= replace(&mut article.slug, explicit_slug(&slug)?);
    }

    changed |= update.title_hi.trimmed().apply(&mut article.title_hi);
    changed |= update.excerpt.trimmed().apply(&mut article.excerpt);
    changed |= update.excerpt_hi.trimmed().apply(&mut article.excerpt_hi);
    changed |= update.content_hi.trimmed().apply(&mut article.content_hi);
    changed |= update.author.trimmed().apply(&mut article.author);
    changed |= match update.image_url.trimmed() {
        Patch::Set(raw) => Patch::Set(validate_image_url(&raw)?),
        other => other,
    }
    .apply(&mut article.image_url);

    if let Some(tags) = update.tags {
        changed |= replace(&mut article.tags, normalize_tags(tags));
    }
    for (flag, value) in [
        (&mut article.is_breaking, update.is_breaking),
        (&mut article.is_featured, update.is_featured),
        (&mut article.is_trending, update.is_trending),
    ] {
        if let Some(value) = value {
            changed |= replace(flag, value);
        }
    }

    let category = match update.category.as_deref() {
        Some(raw) => parse_category(raw)?,
        None => None,
    };
    let client_pages = update.pages.as_deref().map(parse_pages).transpose()?;

    if category.is_some() || client_pages.is_some() {
        let category = category.unwrap_or(article.category);
        let current = match &client_pages {
            Some(client) => map.merge_client_pages(&article.pages, client),
            None => article.pages.clone(),
        };
        let pages = map.sync(Some(category), &current);
        changed |= replace(&mut article.category, category);
        changed |= replace(&mut article.pages, pages);
    }

    Ok(changed)
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// `Ok(None)` for blank input; unknown names are rejected.
fn parse_category(raw: &str) -> Result<Option<Category>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.parse::<Category>()
        .map(Some)
        .map_err(|e| NewsdeskError::validation(e.to_string()))
}

fn parse_pages(raw: &[String]) -> Result<PageSet> {
    raw.iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            p.parse::<Page>()
                .map_err(|e| NewsdeskError::validation(e.to_string()))
        })
        .collect()
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(NewsdeskError::validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim, drop blanks, and remove case-insensitive duplicates (first wins).
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}

fn validate_image_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|e| NewsdeskError::validation(format!("invalid image_url '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(NewsdeskError::validation(format!(
            "image_url must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url.to_string())
}

/// Lowercase ASCII words joined by `-`. Other characters act as separators.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len().min(MAX_SLUG_LEN));
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn explicit_slug(raw: &str) -> Result<String> {
    let slug = slugify(raw);
    if slug.is_empty() {
        return Err(NewsdeskError::validation(format!(
            "slug '{raw}' has no usable characters"
        )));
    }
    Ok(slug)
}

/// Slug from the title, or from the id when the title has no ASCII words
/// (e.g. a Devanagari-only headline).
fn fallback_slug(title: &str, id: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("article-{}", id_suffix(id))
    } else {
        slug
    }
}

fn slug_conflict(slug: &str) -> NewsdeskError {
    NewsdeskError::Conflict(format!("slug '{slug}' is already in use"))
}

fn with_suffix(slug: &str, id: &str) -> String {
    format!("{slug}-{}", id_suffix(id))
}

/// Random tail of a UUID string.
fn id_suffix(id: &str) -> &str {
    id.rsplit('-').next().unwrap_or(id)
}
