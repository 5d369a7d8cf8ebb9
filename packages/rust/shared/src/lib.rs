//! Shared types, error model, and configuration for Newsdesk.
//!
//! This crate is the foundation depended on by all other Newsdesk crates.
//! It provides:
//! - [`NewsdeskError`], the unified error type
//! - Domain types ([`Article`], [`Category`], [`Page`], [`PageSet`], [`Patch`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseConfig, FeedConfig, ServerConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_config,
};
pub use error::{NewsdeskError, Result};
pub use types::{Article, ArticleId, Category, Page, PageSet, Patch, UnknownTag};
