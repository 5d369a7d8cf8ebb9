//! Bilingual article search.
//!
//! Matches a literal, case-insensitive phrase against the English and Hindi
//! title, excerpt and content of each article.

use regex::{Regex, RegexBuilder};

use newsdesk_shared::{Article, NewsdeskError, Result};

/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 200;

/// A compiled search phrase.
#[derive(Debug, Clone)]
pub struct ArticleSearchFilter {
    query: String,
    pattern: Regex,
}

impl ArticleSearchFilter {
    /// Compile `query` as a literal phrase. Regex metacharacters in the query
    /// match themselves.
    pub fn new(query: &str) -> Result<Self> {
        let query = query.trim();
        if query.is_empty() {
            return Err(NewsdeskError::validation("search query must not be empty"));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(NewsdeskError::validation(format!(
                "search query exceeds {MAX_QUERY_CHARS} characters"
            )));
        }

        let pattern = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
            .map_err(|e| NewsdeskError::validation(format!("invalid search query: {e}")))?;

        Ok(Self {
            query: query.to_string(),
            pattern,
        })
    }

    /// The trimmed query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether any searchable field of `article` contains the phrase.
    pub fn matches(&self, article: &Article) -> bool {
        let fields = [
            Some(article.title.as_str()),
            article.title_hi.as_deref(),
            article.excerpt.as_deref(),
            article.excerpt_hi.as_deref(),
            Some(article.content.as_str()),
            article.content_hi.as_deref(),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|text| self.pattern.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newsdesk_shared::{Category, PageSet};

    fn article(title: &str, title_hi: Option<&str>, content: &str) -> Article {
        Article {
            id: "id".into(),
            slug: "slug".into(),
            title: title.into(),
            title_hi: title_hi.map(String::from),
            excerpt: None,
            excerpt_hi: None,
            content: content.into(),
            content_hi: None,
            category: Category::National,
            pages: PageSet::new(),
            tags: vec![],
            author: None,
            image_url: None,
            is_breaking: false,
            is_featured: false,
            is_trending: false,
            views: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn matches_english_case_insensitively() {
        let filter = ArticleSearchFilter::new("monsoon").unwrap();
        assert!(filter.matches(&article("Monsoon arrives early", None, "")));
        assert!(filter.matches(&article("Weather", None, "The MONSOON session")));
        assert!(!filter.matches(&article("Budget", None, "Tax slabs")));
    }

    #[test]
    fn matches_hindi_variants() {
        let filter = ArticleSearchFilter::new("चुनाव").unwrap();
        let hit = article("Elections", Some("चुनाव परिणाम"), "Results");
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&article("Elections", None, "Results")));
    }

    #[test]
    fn metacharacters_are_literal() {
        let filter = ArticleSearchFilter::new("c++ (beta)").unwrap();
        assert!(filter.matches(&article("Learning C++ (beta) notes", None, "")));
        assert!(!filter.matches(&article("c beta", None, "")));

        let dot = ArticleSearchFilter::new("a.b").unwrap();
        assert!(!dot.matches(&article("axb", None, "")));
    }

    #[test]
    fn rejects_empty_and_oversized_queries() {
        assert!(ArticleSearchFilter::new("   ").is_err());
        let long = "x".repeat(MAX_QUERY_CHARS + 1);
        assert!(ArticleSearchFilter::new(&long).is_err());
        assert_eq!(ArticleSearchFilter::new("  rain ").unwrap().query(), "rain");
    }
}
