//! Turso Embedded / libSQL storage layer.
//!
//! The [`Storage`] struct wraps a libSQL database holding articles and the
//! page (display surface) tags each article is rendered on.
//!
//! **Access rules:**
//! - API server and `repair-pages`: read-write via [`Storage::open`]
//! - Read-only tooling (`feed`, `search`): [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::params::Params;
use libsql::{Connection, Database, Value, params};
use newsdesk_shared::{Article, Category, NewsdeskError, Page, PageSet, Result};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    /// Serializes write transactions on the shared connection.
    write_lock: Mutex<()>,
}

/// Columns selected for every article read, in [`row_to_article`] order.
/// Page tags are folded into one comma-separated column.
const ARTICLE_COLUMNS: &str = "a.id, a.slug, a.title, a.title_hi, a.excerpt, a.excerpt_hi, \
     a.content, a.content_hi, a.category, a.tags_json, a.author, a.image_url, \
     a.is_breaking, a.is_featured, a.is_trending, a.views, a.created_at, a.updated_at, \
     (SELECT group_concat(ap.page, ',') FROM article_pages ap WHERE ap.article_id = a.id)";

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| NewsdeskError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(NewsdeskError::storage)?;

        let conn = db.connect().map_err(NewsdeskError::storage)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            write_lock: Mutex::new(()),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NewsdeskError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(NewsdeskError::storage)?;

        let conn = db.connect().map_err(NewsdeskError::storage)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
            write_lock: Mutex::new(()),
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        NewsdeskError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(NewsdeskError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Article writes
    // -----------------------------------------------------------------------

    /// Insert a new article together with its page tags.
    pub async fn insert_article(&self, article: &Article) -> Result<()> {
        self.check_writable()?;
        let _guard = self.write_lock.lock().await;
        let tx = self.conn.transaction().await.map_err(NewsdeskError::storage)?;

        tx.execute(
            "INSERT INTO articles (id, slug, title, title_hi, excerpt, excerpt_hi, content,
                 content_hi, category, tags_json, author, image_url, is_breaking,
                 is_featured, is_trending, views, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            Params::Positional(article_values(article)?),
        )
        .await
        .map_err(write_error)?;

        insert_pages(&tx, &article.id, &article.pages).await?;
        tx.commit().await.map_err(NewsdeskError::storage)?;

        tracing::debug!(id = %article.id, slug = %article.slug, "article inserted");
        Ok(())
    }

    /// Overwrite the editable fields of an existing article and its page tags.
    ///
    /// `views` and `created_at` are left as stored; the view counter is only
    /// changed by [`Storage::increment_views`].
    pub async fn update_article(&self, article: &Article) -> Result<()> {
        self.check_writable()?;
        let _guard = self.write_lock.lock().await;
        let tx = self.conn.transaction().await.map_err(NewsdeskError::storage)?;

        // Drop views and created_at (?16, ?17); updated_at becomes ?16.
        let mut values = article_values(article)?;
        values.drain(15..17);

        let changed = tx
            .execute(
                "UPDATE articles SET slug = ?2, title = ?3, title_hi = ?4, excerpt = ?5,
                     excerpt_hi = ?6, content = ?7, content_hi = ?8, category = ?9,
                     tags_json = ?10, author = ?11, image_url = ?12, is_breaking = ?13,
                     is_featured = ?14, is_trending = ?15, updated_at = ?16
                 WHERE id = ?1",
                Params::Positional(values),
            )
            .await
            .map_err(write_error)?;

        if changed == 0 {
            return Err(NewsdeskError::NotFound(format!("article {}", article.id)));
        }

        tx.execute(
            "DELETE FROM article_pages WHERE article_id = ?1",
            params![article.id.as_str()],
        )
        .await
        .map_err(NewsdeskError::storage)?;
        insert_pages(&tx, &article.id, &article.pages).await?;
        tx.commit().await.map_err(NewsdeskError::storage)?;

        tracing::debug!(id = %article.id, "article updated");
        Ok(())
    }

    /// Replace only the page tags of an article. Timestamps are left alone.
    pub async fn replace_pages(&self, article_id: &str, pages: &PageSet) -> Result<()> {
        self.check_writable()?;
        let _guard = self.write_lock.lock().await;
        let tx = self.conn.transaction().await.map_err(NewsdeskError::storage)?;
        tx.execute(
            "DELETE FROM article_pages WHERE article_id = ?1",
            params![article_id],
        )
        .await
        .map_err(NewsdeskError::storage)?;
        insert_pages(&tx, article_id, pages).await?;
        tx.commit().await.map_err(NewsdeskError::storage)?;
        Ok(())
    }

    /// Delete an article and its page tags. Returns `false` if it did not exist.
    pub async fn delete_article(&self, id: &str) -> Result<bool> {
        self.check_writable()?;
        let _guard = self.write_lock.lock().await;
        let tx = self.conn.transaction().await.map_err(NewsdeskError::storage)?;
        tx.execute(
            "DELETE FROM article_pages WHERE article_id = ?1",
            params![id],
        )
        .await
        .map_err(NewsdeskError::storage)?;
        let removed = tx
            .execute("DELETE FROM articles WHERE id = ?1", params![id])
            .await
            .map_err(NewsdeskError::storage)?;
        tx.commit().await.map_err(NewsdeskError::storage)?;
        Ok(removed > 0)
    }

    /// Bump the view counter of an article.
    pub async fn increment_views(&self, id: &str) -> Result<()> {
        self.check_writable()?;
        let _guard = self.write_lock.lock().await;
        self.conn
            .execute(
                "UPDATE articles SET views = views + 1 WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(NewsdeskError::storage)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Article reads
    // -----------------------------------------------------------------------

    /// Get an article by ID.
    pub async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        self.query_one(
            &format!("SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.id = ?1"),
            id,
        )
        .await
    }

    /// Get an article by slug.
    pub async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        self.query_one(
            &format!("SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.slug = ?1"),
            slug,
        )
        .await
    }

    /// Look an article up by ID, falling back to slug.
    pub async fn find_article(&self, id_or_slug: &str) -> Result<Option<Article>> {
        match self.get_article(id_or_slug).await? {
            Some(article) => Ok(Some(article)),
            None => self.get_article_by_slug(id_or_slug).await,
        }
    }

    /// Whether any article other than `except_id` already uses `slug`.
    pub async fn slug_exists(&self, slug: &str, except_id: Option<&str>) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM articles WHERE slug = ?1 AND id != ?2",
                params![slug, except_id.unwrap_or("")],
            )
            .await
            .map_err(NewsdeskError::storage)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(NewsdeskError::storage)? > 0),
            Ok(None) => Ok(false),
            Err(e) => Err(NewsdeskError::storage(e)),
        }
    }

    async fn query_one(&self, sql: &str, key: &str) -> Result<Option<Article>> {
        let mut rows = self
            .conn
            .query(sql, params![key])
            .await
            .map_err(NewsdeskError::storage)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_article(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(NewsdeskError::storage(e)),
        }
    }

    /// Raw `(id, category, pages)` for every stored article, oldest first.
    ///
    /// Values are returned unparsed so a maintenance pass can decide what to
    /// do with records written by older versions.
    pub async fn list_page_records(&self) -> Result<Vec<PageRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT a.id, a.category,
                     (SELECT group_concat(ap.page, ',') FROM article_pages ap
                      WHERE ap.article_id = a.id)
                 FROM articles a ORDER BY a.created_at, a.id",
                params![],
            )
            .await
            .map_err(NewsdeskError::storage)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(NewsdeskError::storage)? {
            let pages: Option<String> = row.get::<String>(2).ok();
            results.push(PageRecord {
                id: row.get::<String>(0).map_err(NewsdeskError::storage)?,
                category: row.get::<String>(1).map_err(NewsdeskError::storage)?,
                pages: split_pages(pages.as_deref()),
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Feed queries
    // -----------------------------------------------------------------------

    /// Count articles matching `filter`.
    pub async fn count_articles(&self, filter: &FeedFilter) -> Result<u64> {
        let (clause, values) = where_clause(filter);
        let mut rows = self
            .conn
            .query(
                &format!("SELECT COUNT(*) FROM articles a{clause}"),
                Params::Positional(values),
            )
            .await
            .map_err(NewsdeskError::storage)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(NewsdeskError::storage)?.max(0) as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(NewsdeskError::storage(e)),
        }
    }

    /// List articles matching `filter` in `sort` order.
    ///
    /// `window` is `(limit, offset)`; `None` returns every match.
    pub async fn list_articles(
        &self,
        filter: &FeedFilter,
        sort: FeedSort,
        window: Option<(u32, u64)>,
    ) -> Result<Vec<Article>> {
        let (clause, mut values) = where_clause(filter);
        let mut sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a{clause} ORDER BY {}",
            sort.order_by()
        );
        if let Some((limit, offset)) = window {
            let n = values.len();
            sql.push_str(&format!(" LIMIT ?{} OFFSET ?{}", n + 1, n + 2));
            values.push(Value::Integer(i64::from(limit)));
            values.push(Value::Integer(offset as i64));
        }

        let mut rows = self
            .conn
            .query(&sql, Params::Positional(values))
            .await
            .map_err(NewsdeskError::storage)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(NewsdeskError::storage)? {
            results.push(row_to_article(&row)?);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Filters shared by the feed and search endpoints. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilter {
    pub surface: Option<Page>,
    pub category: Option<Category>,
    pub tag: Option<String>,
    pub breaking: Option<bool>,
    pub featured: Option<bool>,
    pub trending: Option<bool>,
}

/// Feed ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
    #[default]
    Newest,
    Oldest,
    /// Most viewed first, newest among equals.
    Popular,
}

impl FeedSort {
    fn order_by(self) -> &'static str {
        match self {
            FeedSort::Newest => "a.created_at DESC, a.id DESC",
            FeedSort::Oldest => "a.created_at ASC, a.id ASC",
            FeedSort::Popular => "a.views DESC, a.created_at DESC, a.id DESC",
        }
    }
}

impl std::str::FromStr for FeedSort {
    type Err = NewsdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(FeedSort::Newest),
            "oldest" => Ok(FeedSort::Oldest),
            "popular" => Ok(FeedSort::Popular),
            other => Err(NewsdeskError::validation(format!(
                "unknown sort '{other}': expected newest, oldest or popular"
            ))),
        }
    }
}

/// Stored category/pages of one article, as raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: String,
    pub category: String,
    pub pages: Vec<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn where_clause(filter: &FeedFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(page) = filter.surface {
        values.push(Value::Text(page.as_str().to_string()));
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM article_pages fp WHERE fp.article_id = a.id AND fp.page = ?{})",
            values.len()
        ));
    }
    if let Some(category) = filter.category {
        values.push(Value::Text(category.as_str().to_string()));
        clauses.push(format!("a.category = ?{}", values.len()));
    }
    if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        values.push(Value::Text(tag.to_lowercase()));
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(a.tags_json) jt WHERE lower(jt.value) = ?{})",
            values.len()
        ));
    }
    for (column, flag) in [
        ("a.is_breaking", filter.breaking),
        ("a.is_featured", filter.featured),
        ("a.is_trending", filter.trending),
    ] {
        if let Some(flag) = flag {
            values.push(Value::Integer(i64::from(flag)));
            clauses.push(format!("{column} = ?{}", values.len()));
        }
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

async fn insert_pages(conn: &Connection, article_id: &str, pages: &PageSet) -> Result<()> {
    for page in pages {
        conn.execute(
            "INSERT INTO article_pages (article_id, page) VALUES (?1, ?2)",
            params![article_id, page.as_str()],
        )
        .await
        .map_err(NewsdeskError::storage)?;
    }
    Ok(())
}

/// Positional values for the article INSERT/UPDATE statements (`?1`..`?18`).
fn article_values(article: &Article) -> Result<Vec<Value>> {
    let tags_json = serde_json::to_string(&article.tags)
        .map_err(|e| NewsdeskError::Storage(format!("failed to encode tags: {e}")))?;

    Ok(vec![
        Value::Text(article.id.clone()),
        Value::Text(article.slug.clone()),
        Value::Text(article.title.clone()),
        opt_text(&article.title_hi),
        opt_text(&article.excerpt),
        opt_text(&article.excerpt_hi),
        Value::Text(article.content.clone()),
        opt_text(&article.content_hi),
        Value::Text(article.category.as_str().to_string()),
        Value::Text(tags_json),
        opt_text(&article.author),
        opt_text(&article.image_url),
        Value::Integer(i64::from(article.is_breaking)),
        Value::Integer(i64::from(article.is_featured)),
        Value::Integer(i64::from(article.is_trending)),
        Value::Integer(article.views as i64),
        Value::Text(timestamp(&article.created_at)),
        Value::Text(timestamp(&article.updated_at)),
    ])
}

fn opt_text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NewsdeskError::Storage(format!("invalid date '{s}': {e}")))
}

fn split_pages(joined: Option<&str>) -> Vec<String> {
    joined
        .unwrap_or_default()
        .split(',')
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Map a write failure, surfacing unique-key violations as conflicts.
fn write_error(e: libsql::Error) -> NewsdeskError {
    let message = e.to_string();
    if message.contains("UNIQUE constraint failed: articles.slug") {
        NewsdeskError::Conflict("an article with this slug already exists".into())
    } else {
        NewsdeskError::Storage(message)
    }
}

/// Convert a database row to an [`Article`].
fn row_to_article(row: &libsql::Row) -> Result<Article> {
    let category: String = row.get(8).map_err(NewsdeskError::storage)?;
    let tags_json: String = row.get(9).map_err(NewsdeskError::storage)?;
    let pages: Option<String> = row.get::<String>(18).ok();

    let pages = split_pages(pages.as_deref())
        .iter()
        .map(|p| p.parse::<Page>().map_err(NewsdeskError::storage))
        .collect::<Result<PageSet>>()?;

    Ok(Article {
        id: row.get::<String>(0).map_err(NewsdeskError::storage)?,
        slug: row.get::<String>(1).map_err(NewsdeskError::storage)?,
        title: row.get::<String>(2).map_err(NewsdeskError::storage)?,
        title_hi: row.get::<String>(3).ok(),
        excerpt: row.get::<String>(4).ok(),
        excerpt_hi: row.get::<String>(5).ok(),
        content: row.get::<String>(6).map_err(NewsdeskError::storage)?,
        content_hi: row.get::<String>(7).ok(),
        category: category.parse().map_err(NewsdeskError::storage)?,
        pages,
        tags: serde_json::from_str(&tags_json)
            .map_err(|e| NewsdeskError::Storage(format!("invalid tags: {e}")))?,
        author: row.get::<String>(10).ok(),
        image_url: row.get::<String>(11).ok(),
        is_breaking: row.get::<i64>(12).map_err(NewsdeskError::storage)? != 0,
        is_featured: row.get::<i64>(13).map_err(NewsdeskError::storage)? != 0,
        is_trending: row.get::<i64>(14).map_err(NewsdeskError::storage)? != 0,
        views: row.get::<i64>(15).map_err(NewsdeskError::storage)?.max(0) as u64,
        created_at: parse_timestamp(&row.get::<String>(16).map_err(NewsdeskError::storage)?)?,
        updated_at: parse_timestamp(&row.get::<String>(17).map_err(NewsdeskError::storage)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("nd_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn make_article(slug: &str, category: Category, pages: &[Page]) -> Article {
        let now = Utc::now();
        Article {
            id: Uuid::now_v7().to_string(),
            slug: slug.into(),
            title: format!("Title {slug}"),
            title_hi: Some("शीर्षक".into()),
            excerpt: None,
            excerpt_hi: None,
            content: "Body text".into(),
            content_hi: None,
            category,
            pages: pages.iter().copied().collect(),
            tags: vec!["Cricket".into()],
            author: Some("Desk".into()),
            image_url: None,
            is_breaking: false,
            is_featured: false,
            is_trending: false,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("nd_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn article_crud() {
        let storage = test_storage().await;
        let article = make_article("match-report", Category::Sports, &[Page::Home, Page::Sports]);

        storage.insert_article(&article).await.expect("insert");

        let found = storage.get_article(&article.id).await.expect("get").expect("exists");
        assert_eq!(found.slug, "match-report");
        assert_eq!(found.category, Category::Sports);
        assert_eq!(found.pages, article.pages);
        assert_eq!(found.tags, vec!["Cricket".to_string()]);
        assert_eq!(found.title_hi.as_deref(), Some("शीर्षक"));
        assert!(found.excerpt.is_none());

        let by_slug = storage.find_article("match-report").await.unwrap().unwrap();
        assert_eq!(by_slug.id, article.id);

        let mut updated = found.clone();
        updated.category = Category::Business;
        updated.pages = [Page::Home, Page::Business].into_iter().collect();
        updated.excerpt = Some("Markets".into());
        storage.update_article(&updated).await.expect("update");

        let found = storage.get_article(&article.id).await.unwrap().unwrap();
        assert_eq!(found.category, Category::Business);
        assert!(found.pages.contains(&Page::Business));
        assert!(!found.pages.contains(&Page::Sports));
        assert_eq!(found.excerpt.as_deref(), Some("Markets"));

        assert!(storage.delete_article(&article.id).await.expect("delete"));
        assert!(storage.get_article(&article.id).await.unwrap().is_none());
        assert!(!storage.delete_article(&article.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_slug_is_conflict() {
        let storage = test_storage().await;
        storage
            .insert_article(&make_article("same", Category::Health, &[]))
            .await
            .unwrap();
        let err = storage
            .insert_article(&make_article("same", Category::Health, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, NewsdeskError::Conflict(_)));

        assert!(storage.slug_exists("same", None).await.unwrap());
        assert!(!storage.slug_exists("other", None).await.unwrap());
    }

    #[tokio::test]
    async fn update_missing_article_is_not_found() {
        let storage = test_storage().await;
        let err = storage
            .update_article(&make_article("ghost", Category::Health, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, NewsdeskError::NotFound(_)));
    }

    #[tokio::test]
    async fn replace_pages_keeps_timestamps() {
        let storage = test_storage().await;
        let article = make_article("pages", Category::Politics, &[Page::Sports]);
        storage.insert_article(&article).await.unwrap();

        let pages: PageSet = [Page::Home, Page::Politics].into_iter().collect();
        storage.replace_pages(&article.id, &pages).await.expect("replace");

        let found = storage.get_article(&article.id).await.unwrap().unwrap();
        assert_eq!(found.pages, pages);
        assert_eq!(timestamp(&found.updated_at), timestamp(&article.updated_at));

        let records = storage.list_page_records().await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "Politics");
        assert_eq!(records[0].pages.len(), 2);
    }

    #[tokio::test]
    async fn feed_filters_and_ordering() {
        let storage = test_storage().await;
        let base = Utc::now();

        let mut sports = make_article("sports-1", Category::Sports, &[Page::Home, Page::Sports]);
        sports.created_at = base - Duration::hours(2);
        sports.is_breaking = true;
        sports.views = 50;

        let mut business =
            make_article("business-1", Category::Business, &[Page::Home, Page::Business]);
        business.created_at = base - Duration::hours(1);
        business.tags = vec!["Markets".into()];

        let mut health = make_article("health-1", Category::Health, &[Page::Health]);
        health.created_at = base;
        health.views = 5;

        for article in [&sports, &business, &health] {
            storage.insert_article(article).await.unwrap();
        }

        let all = FeedFilter::default();
        assert_eq!(storage.count_articles(&all).await.unwrap(), 3);

        let newest = storage.list_articles(&all, FeedSort::Newest, None).await.unwrap();
        let slugs: Vec<&str> = newest.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["health-1", "business-1", "sports-1"]);

        let popular = storage.list_articles(&all, FeedSort::Popular, None).await.unwrap();
        assert_eq!(popular[0].slug, "sports-1");

        let home = FeedFilter {
            surface: Some(Page::Home),
            ..Default::default()
        };
        assert_eq!(storage.count_articles(&home).await.unwrap(), 2);

        let breaking = FeedFilter {
            breaking: Some(true),
            ..Default::default()
        };
        let found = storage.list_articles(&breaking, FeedSort::Newest, None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "sports-1");

        let tagged = FeedFilter {
            tag: Some("markets".into()),
            ..Default::default()
        };
        let found = storage.list_articles(&tagged, FeedSort::Newest, None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "business-1");

        let window = storage
            .list_articles(&all, FeedSort::Oldest, Some((1, 1)))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].slug, "business-1");
    }

    #[tokio::test]
    async fn increment_views_counts() {
        let storage = test_storage().await;
        let article = make_article("viewed", Category::National, &[]);
        storage.insert_article(&article).await.unwrap();
        storage.increment_views(&article.id).await.unwrap();
        storage.increment_views(&article.id).await.unwrap();
        let found = storage.get_article(&article.id).await.unwrap().unwrap();
        assert_eq!(found.views, 2);
    }

    #[tokio::test]
    async fn update_keeps_concurrent_views() {
        let storage = test_storage().await;
        let article = make_article("busy", Category::Sports, &[Page::Home, Page::Sports]);
        storage.insert_article(&article).await.unwrap();

        let mut stale = storage.get_article(&article.id).await.unwrap().unwrap();
        storage.increment_views(&article.id).await.unwrap();
        storage.increment_views(&article.id).await.unwrap();

        stale.title = "Edited".into();
        stale.created_at = stale.created_at + Duration::days(3);
        storage.update_article(&stale).await.expect("update");

        let found = storage.get_article(&article.id).await.unwrap().unwrap();
        assert_eq!(found.views, 2);
        assert_eq!(found.title, "Edited");
        assert_eq!(timestamp(&found.created_at), timestamp(&article.created_at));
    }

    #[tokio::test]
    async fn interleaved_views_and_updates_are_all_kept() {
        let storage = test_storage().await;
        let article = make_article("live", Category::National, &[Page::Home, Page::National]);
        storage.insert_article(&article).await.unwrap();

        let views = async {
            for _ in 0..20 {
                storage.increment_views(&article.id).await.expect("increment");
            }
        };
        let edits = async {
            for i in 0..20 {
                let mut edited = article.clone();
                edited.title = format!("Live update {i}");
                storage.update_article(&edited).await.expect("update");
            }
        };
        tokio::join!(views, edits);

        let found = storage.get_article(&article.id).await.unwrap().unwrap();
        assert_eq!(found.views, 20);
        assert_eq!(found.title, "Live update 19");
        assert_eq!(found.pages, article.pages);
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("nd_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_article(&make_article("first", Category::Sports, &[]))
            .await
            .unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        let result = ro
            .insert_article(&make_article("second", Category::Sports, &[]))
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
        assert_eq!(ro.count_articles(&FeedFilter::default()).await.unwrap(), 1);
    }

    #[test]
    fn sort_parsing() {
        assert_eq!("Popular".parse::<FeedSort>().unwrap(), FeedSort::Popular);
        assert!("random".parse::<FeedSort>().is_err());
    }
}
