//! Paginated article feeds and search results.

use serde::Serialize;
use tracing::{debug, instrument};

use newsdesk_shared::{Article, FeedConfig, Result};
use newsdesk_storage::{FeedFilter, FeedSort, Storage};

use crate::search::ArticleSearchFilter;

/// A resolved feed request: filters, ordering and a clamped page window.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub filter: FeedFilter,
    pub sort: FeedSort,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl FeedQuery {
    /// Build a query, clamping `page` to at least 1 and `limit` to
    /// `1..=max_page_size` (defaulting to `default_page_size`).
    pub fn new(
        filter: FeedFilter,
        sort: FeedSort,
        page: Option<u32>,
        limit: Option<u32>,
        config: &FeedConfig,
    ) -> Self {
        let limit = limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size.max(1));
        Self {
            filter,
            sort,
            page: page.unwrap_or(1).max(1),
            limit,
        }
    }

    fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// One page of articles plus the numbers a client needs to paginate.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub articles: Vec<Article>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl FeedPage {
    fn new(articles: Vec<Article>, total: u64, query: &FeedQuery) -> Self {
        Self {
            articles,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total.div_ceil(u64::from(query.limit)),
        }
    }
}

/// Run a feed query against storage.
#[instrument(skip_all, fields(page = query.page, limit = query.limit))]
pub async fn query_feed(storage: &Storage, query: &FeedQuery) -> Result<FeedPage> {
    let total = storage.count_articles(&query.filter).await?;
    let articles = storage
        .list_articles(&query.filter, query.sort, Some((query.limit, query.offset())))
        .await?;
    debug!(total, returned = articles.len(), "feed queried");
    Ok(FeedPage::new(articles, total, query))
}

/// Search articles matching the feed filters, then paginate the hits.
#[instrument(skip_all, fields(q = %search.query(), page = query.page))]
pub async fn search_feed(
    storage: &Storage,
    search: &ArticleSearchFilter,
    query: &FeedQuery,
) -> Result<FeedPage> {
    let candidates = storage.list_articles(&query.filter, query.sort, None).await?;
    let hits: Vec<Article> = candidates
        .into_iter()
        .filter(|a| search.matches(a))
        .collect();
    let total = hits.len() as u64;

    let articles = hits
        .into_iter()
        .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
        .take(query.limit as usize)
        .collect();
    debug!(total, "search completed");
    Ok(FeedPage::new(articles, total, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use newsdesk_shared::{Category, Page};
    use uuid::Uuid;

    fn config() -> FeedConfig {
        FeedConfig {
            default_page_size: 2,
            max_page_size: 5,
        }
    }

    #[test]
    fn pagination_is_clamped() {
        let q = FeedQuery::new(FeedFilter::default(), FeedSort::Newest, None, None, &config());
        assert_eq!((q.page, q.limit), (1, 2));

        let q = FeedQuery::new(FeedFilter::default(), FeedSort::Newest, Some(0), Some(0), &config());
        assert_eq!((q.page, q.limit), (1, 1));

        let q = FeedQuery::new(FeedFilter::default(), FeedSort::Newest, Some(3), Some(50), &config());
        assert_eq!((q.page, q.limit), (3, 5));
        assert_eq!(q.offset(), 10);
    }

    async fn seeded_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("nd_feed_{}.db", Uuid::now_v7()));
        let storage = Storage::open(&tmp).await.expect("open");
        let base = Utc::now();
        for (i, title) in ["Rain in Delhi", "Cricket final", "Rain returns", "Budget"]
            .into_iter()
            .enumerate()
        {
            let at = base + Duration::minutes(i as i64);
            storage
                .insert_article(&Article {
                    id: Uuid::now_v7().to_string(),
                    slug: format!("story-{i}"),
                    title: title.into(),
                    title_hi: None,
                    excerpt: None,
                    excerpt_hi: None,
                    content: "text".into(),
                    content_hi: None,
                    category: Category::National,
                    pages: [Page::Home, Page::National].into_iter().collect(),
                    tags: vec![],
                    author: None,
                    image_url: None,
                    is_breaking: false,
                    is_featured: false,
                    is_trending: false,
                    views: 0,
                    created_at: at,
                    updated_at: at,
                })
                .await
                .expect("insert");
        }
        storage
    }

    #[tokio::test]
    async fn feed_pages_through_results() {
        let storage = seeded_storage().await;
        let q = FeedQuery::new(FeedFilter::default(), FeedSort::Newest, Some(2), None, &config());
        let page = query_feed(&storage, &q).await.expect("feed");
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        let slugs: Vec<&str> = page.articles.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["story-1", "story-0"]);
    }

    #[tokio::test]
    async fn search_filters_before_paginating() {
        let storage = seeded_storage().await;
        let search = ArticleSearchFilter::new("rain").unwrap();
        let q = FeedQuery::new(FeedFilter::default(), FeedSort::Newest, Some(1), Some(1), &config());
        let page = search_feed(&storage, &search, &q).await.expect("search");
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.articles.len(), 1);
        assert_eq!(page.articles[0].title, "Rain returns");
    }
}
