//! Category → page synchronization.
//!
//! Every article carries a set of display pages. Whenever its category is set
//! or changes, the set must contain `home` plus the page mapped from the
//! category. Pages mapped from some *other* category are stale and dropped;
//! any page that no category maps to is a manual choice and is kept.
//!
//! [`CategoryPageMap`] owns the one category→page table. It is built once at
//! startup and shared (behind `Arc`) by the API handlers and the repair pass.

use std::collections::BTreeMap;

use newsdesk_shared::{Category, NewsdeskError, Page, PageSet, Result};
use serde::Serialize;

/// Entries present when no configuration overrides them.
///
/// Religious and Technology have no entry: their pages are manual surfaces.
const DEFAULT_ENTRIES: [(Category, Page); 7] = [
    (Category::National, Page::National),
    (Category::International, Page::International),
    (Category::Sports, Page::Sports),
    (Category::Business, Page::Business),
    (Category::Entertainment, Page::Entertainment),
    (Category::Health, Page::Health),
    (Category::Politics, Page::Politics),
];

/// Immutable category → page table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPageMap {
    entries: BTreeMap<Category, Page>,
}

/// One row of the table, as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub category: Category,
    /// `None` when the category has no page of its own.
    pub page: Option<Page>,
}

impl Default for CategoryPageMap {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES.into_iter().collect(),
        }
    }
}

impl CategoryPageMap {
    /// Build a table from explicit entries.
    ///
    /// `home` is reserved for the front page and cannot be a category page.
    pub fn new(entries: impl IntoIterator<Item = (Category, Page)>) -> Result<Self> {
        let entries: BTreeMap<Category, Page> = entries.into_iter().collect();
        if let Some((category, _)) = entries.iter().find(|(_, page)| **page == Page::Home) {
            return Err(NewsdeskError::config(format!(
                "category {category} cannot map to the home page"
            )));
        }
        Ok(Self { entries })
    }

    /// The default table with entries from the `[category_pages]` config
    /// section layered on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut entries = Self::default().entries;
        for (raw_category, raw_page) in overrides {
            let category: Category = raw_category
                .parse()
                .map_err(|e| NewsdeskError::config(format!("category_pages: {e}")))?;
            let page: Page = raw_page
                .parse()
                .map_err(|e| NewsdeskError::config(format!("category_pages: {e}")))?;
            entries.insert(category, page);
        }
        Self::new(entries)
    }

    /// The page a category maps to, if any.
    pub fn page_for(&self, category: Category) -> Option<Page> {
        self.entries.get(&category).copied()
    }

    /// Whether some category maps to `page`.
    pub fn is_category_page(&self, page: Page) -> bool {
        self.entries.values().any(|p| *p == page)
    }

    /// Every category with its page (or `None`), in category order.
    pub fn entries(&self) -> Vec<CategoryEntry> {
        Category::ALL
            .into_iter()
            .map(|category| CategoryEntry {
                category,
                page: self.page_for(category),
            })
            .collect()
    }

    /// Recompute `current` for `category`.
    ///
    /// Returns `current` unchanged when there is no category or the category
    /// has no page in the table.
    pub fn sync(&self, category: Option<Category>, current: &PageSet) -> PageSet {
        let Some(mapped) = category.and_then(|c| self.page_for(c)) else {
            return current.clone();
        };

        let mut pages: PageSet = current
            .iter()
            .copied()
            .filter(|p| *p != Page::Home && !self.is_category_page(*p))
            .collect();
        pages.insert(Page::Home);
        pages.insert(mapped);
        pages
    }

    /// [`sync`](Self::sync) for an unparsed category value. Empty or
    /// unrecognized text is a no-op.
    pub fn sync_raw(&self, category: &str, current: &PageSet) -> PageSet {
        self.sync(category.parse().ok(), current)
    }

    /// `Some(new_pages)` only when syncing would change the stored set.
    pub fn needs_update(&self, category: Option<Category>, stored: &PageSet) -> Option<PageSet> {
        let synced = self.sync(category, stored);
        (synced != *stored).then_some(synced)
    }

    /// Merge a client-submitted page list with the stored one.
    ///
    /// `home` and category pages always come from `stored`; the client only
    /// decides the manual pages.
    pub fn merge_client_pages(&self, stored: &PageSet, client: &PageSet) -> PageSet {
        let derived = stored
            .iter()
            .copied()
            .filter(|p| *p == Page::Home || self.is_category_page(*p));
        let manual = client
            .iter()
            .copied()
            .filter(|p| *p != Page::Home && !self.is_category_page(*p));
        derived.chain(manual).collect()
    }
}
