//! Domain logic for Newsdesk.
//!
//! This crate keeps article page sets consistent with their categories and
//! builds the write, feed, search and repair workflows on top of storage.

pub mod articles;
pub mod category_pages;
pub mod feed;
pub mod repair;
pub mod search;

pub use articles::{ArticleService, ArticleUpdate, NewArticle};
pub use category_pages::{CategoryEntry, CategoryPageMap};
pub use feed::{FeedPage, FeedQuery, query_feed, search_feed};
pub use repair::{RepairOptions, RepairProgress, RepairReport, repair_pages};
pub use search::ArticleSearchFilter;
