//! Core domain types for Newsdesk articles.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for article identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    /// Generate a new time-sortable article identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArticleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The single editorial section an article belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    National,
    International,
    Sports,
    Business,
    Entertainment,
    Health,
    Politics,
    Religious,
    Technology,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 9] = [
        Category::National,
        Category::International,
        Category::Sports,
        Category::Business,
        Category::Entertainment,
        Category::Health,
        Category::Politics,
        Category::Religious,
        Category::Technology,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::National => "National",
            Category::International => "International",
            Category::Sports => "Sports",
            Category::Business => "Business",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::Politics => "Politics",
            Category::Religious => "Religious",
            Category::Technology => "Technology",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known category or page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind} '{value}'")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Category {
    type Err = UnknownTag;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownTag {
                kind: "category",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A display surface on the site. An article is rendered on every page
/// listed in its [`PageSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Home,
    National,
    International,
    Sports,
    Business,
    Entertainment,
    Health,
    Politics,
    Religious,
    Technology,
}

impl Page {
    /// Every page, in navigation order.
    pub const ALL: [Page; 10] = [
        Page::Home,
        Page::National,
        Page::International,
        Page::Sports,
        Page::Business,
        Page::Entertainment,
        Page::Health,
        Page::Politics,
        Page::Religious,
        Page::Technology,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::National => "national",
            Page::International => "international",
            Page::Sports => "sports",
            Page::Business => "business",
            Page::Entertainment => "entertainment",
            Page::Health => "health",
            Page::Politics => "politics",
            Page::Religious => "religious",
            Page::Technology => "technology",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = UnknownTag;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim();
        Page::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownTag {
                kind: "page",
                value: s.to_string(),
            })
    }
}

/// The set of pages an article appears on. Ordered so that equality is set
/// equality and iteration never depends on insertion order.
pub type PageSet = BTreeSet<Page>;

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A stored news article with its English and Hindi variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_hi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt_hi: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hi: Option<String>,
    pub category: Category,
    pub pages: PageSet,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_breaking: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_trending: bool,
    #[serde(default)]
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// A field in a partial update. Distinguishes a key that was left out of the
/// request from one explicitly cleared with `null`.
///
/// Use with `#[serde(default)]` so that a missing key becomes [`Patch::Absent`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Key not present: leave the stored value alone.
    #[default]
    Absent,
    /// Key present with `null` (or an empty string): clear the stored value.
    Clear,
    /// Key present with a value: replace the stored value.
    Set(T),
}

impl<T> Patch<T> {
    /// Apply this patch to an optional field. Returns whether the field changed.
    pub fn apply(self, target: &mut Option<T>) -> bool
    where
        T: PartialEq,
    {
        let next = match self {
            Patch::Absent => return false,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        };
        if *target == next {
            return false;
        }
        *target = next;
        true
    }
}

impl Patch<String> {
    /// Trim a text value; whitespace-only text counts as a clear.
    pub fn trimmed(self) -> Self {
        match self {
            Patch::Set(s) if s.trim().is_empty() => Patch::Clear,
            Patch::Set(s) => Patch::Set(s.trim().to_string()),
            other => other,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_roundtrip() {
        let id = ArticleId::new();
        let parsed: ArticleId = id.to_string().parse().expect("parse ArticleId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn category_parse_is_lenient() {
        assert_eq!("sports".parse::<Category>(), Ok(Category::Sports));
        assert_eq!("  Politics ".parse::<Category>(), Ok(Category::Politics));
        assert_eq!("TECHNOLOGY".parse::<Category>(), Ok(Category::Technology));
        assert!("".parse::<Category>().is_err());
        assert!("Weather".parse::<Category>().is_err());
    }

    #[test]
    fn page_serde_is_lowercase() {
        let pages: PageSet = [Page::Sports, Page::Home].into_iter().collect();
        let json = serde_json::to_string(&pages).expect("serialize");
        assert_eq!(json, r#"["home","sports"]"#);

        let parsed: PageSet =
            serde_json::from_str(r#"["sports","home","sports"]"#).expect("deserialize");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn unknown_page_error_names_value() {
        let err = "weather".parse::<Page>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized page 'weather'");
    }

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default)]
        excerpt: Patch<String>,
    }

    #[test]
    fn patch_distinguishes_three_states() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.excerpt, Patch::Absent);

        let cleared: Body = serde_json::from_str(r#"{"excerpt": null}"#).unwrap();
        assert_eq!(cleared.excerpt, Patch::Clear);

        let set: Body = serde_json::from_str(r#"{"excerpt": "Budget day"}"#).unwrap();
        assert_eq!(set.excerpt, Patch::Set("Budget day".into()));

        let blank: Body = serde_json::from_str(r#"{"excerpt": "   "}"#).unwrap();
        assert_eq!(blank.excerpt.trimmed(), Patch::Clear);
    }

    #[test]
    fn patch_apply_reports_changes() {
        let mut field = Some("old".to_string());
        assert!(!Patch::Absent.apply(&mut field));
        assert!(!Patch::Set("old".to_string()).apply(&mut field));
        assert!(Patch::Set("new".to_string()).apply(&mut field));
        assert_eq!(field.as_deref(), Some("new"));
        assert!(Patch::<String>::Clear.apply(&mut field));
        assert!(field.is_none());
        assert!(!Patch::<String>::Clear.apply(&mut field));
    }
}
