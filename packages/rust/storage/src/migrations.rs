//! SQL migration definitions for the Newsdesk database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: articles, article_pages",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Articles (English + Hindi variants)
CREATE TABLE IF NOT EXISTS articles (
    id          TEXT PRIMARY KEY,
    slug        TEXT NOT NULL UNIQUE,
    title       TEXT NOT NULL,
    title_hi    TEXT,
    excerpt     TEXT,
    excerpt_hi  TEXT,
    content     TEXT NOT NULL,
    content_hi  TEXT,
    category    TEXT NOT NULL,
    tags_json   TEXT NOT NULL DEFAULT '[]',
    author      TEXT,
    image_url   TEXT,
    is_breaking INTEGER NOT NULL DEFAULT 0,
    is_featured INTEGER NOT NULL DEFAULT 0,
    is_trending INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category);
CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at);

-- Display surfaces per article
CREATE TABLE IF NOT EXISTS article_pages (
    article_id TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    page       TEXT NOT NULL,
    PRIMARY KEY (article_id, page)
);

CREATE INDEX IF NOT EXISTS idx_article_pages_page ON article_pages(page);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "View counter for popular feeds",
            sql: r#"
ALTER TABLE articles ADD COLUMN views INTEGER NOT NULL DEFAULT 0;

CREATE INDEX IF NOT EXISTS idx_articles_views ON articles(views);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
