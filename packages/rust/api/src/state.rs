use std::sync::Arc;

use newsdesk_core::{ArticleService, CategoryPageMap};
use newsdesk_shared::FeedConfig;
use newsdesk_storage::Storage;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub articles: ArticleService,
    pub feed: FeedConfig,
}

impl AppState {
    pub fn new(storage: Arc<Storage>, pages: Arc<CategoryPageMap>, feed: FeedConfig) -> Self {
        Self {
            articles: ArticleService::new(storage, pages),
            feed,
        }
    }

    pub fn storage(&self) -> &Storage {
        self.articles.storage()
    }

    pub fn page_map(&self) -> &CategoryPageMap {
        self.articles.page_map()
    }
}
