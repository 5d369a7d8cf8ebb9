//! One-pass repair of stored page sets.
//!
//! Walks every article, recomputes its pages from its stored category, and
//! writes back only the ones that differ. Records that cannot be parsed are
//! skipped and left exactly as stored.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument, warn};

use newsdesk_shared::{Category, Page, PageSet, Result};
use newsdesk_storage::{PageRecord, Storage};

use crate::category_pages::CategoryPageMap;

/// Options for [`repair_pages`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RepairOptions {
    /// Compute and report changes without writing them.
    pub dry_run: bool,
}

/// Counts produced by a repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub scanned: usize,
    /// Articles whose pages were (or, in a dry run, would be) rewritten.
    pub updated: usize,
    pub unchanged: usize,
    /// Articles whose category has no page entry; left as stored.
    pub unmapped: usize,
    /// Articles with an unparseable category or page tag; left as stored.
    pub skipped: usize,
    #[serde(skip)]
    pub elapsed: std::time::Duration,
}

/// Progress callback for the repair pass.
pub trait RepairProgress: Send + Sync {
    /// Called once the number of records is known.
    fn start(&self, total: usize);
    /// Called after each record is handled.
    fn record(&self, id: &str, changed: bool);
    /// Called when the pass completes.
    fn done(&self, report: &RepairReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RepairProgress for SilentProgress {
    fn start(&self, _total: usize) {}
    fn record(&self, _id: &str, _changed: bool) {}
    fn done(&self, _report: &RepairReport) {}
}

/// What to do with one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Rewrite(PageSet),
    Unchanged,
    Unmapped,
    Skip(String),
}

fn plan(map: &CategoryPageMap, record: &PageRecord) -> Outcome {
    let category: Category = match record.category.parse() {
        Ok(c) => c,
        Err(e) => return Outcome::Skip(e.to_string()),
    };
    let stored = match record
        .pages
        .iter()
        .map(|p| p.parse::<Page>())
        .collect::<std::result::Result<PageSet, _>>()
    {
        Ok(pages) => pages,
        Err(e) => return Outcome::Skip(e.to_string()),
    };

    if map.page_for(category).is_none() {
        return Outcome::Unmapped;
    }
    match map.needs_update(Some(category), &stored) {
        Some(pages) => Outcome::Rewrite(pages),
        None => Outcome::Unchanged,
    }
}

/// Recompute and persist pages for every stored article.
#[instrument(skip_all, fields(dry_run = options.dry_run))]
pub async fn repair_pages(
    storage: &Storage,
    map: &CategoryPageMap,
    options: RepairOptions,
    progress: &dyn RepairProgress,
) -> Result<RepairReport> {
    let start = Instant::now();
    let records = storage.list_page_records().await?;
    progress.start(records.len());

    let mut report = RepairReport {
        scanned: records.len(),
        ..Default::default()
    };

    for record in &records {
        let outcome = plan(map, record);
        let changed = matches!(outcome, Outcome::Rewrite(_));
        match outcome {
            Outcome::Rewrite(pages) => {
                info!(
                    id = %record.id,
                    category = %record.category,
                    before = ?record.pages,
                    after = ?pages,
                    "repairing pages"
                );
                if !options.dry_run {
                    storage.replace_pages(&record.id, &pages).await?;
                }
                report.updated += 1;
            }
            Outcome::Unchanged => report.unchanged += 1,
            Outcome::Unmapped => report.unmapped += 1,
            Outcome::Skip(reason) => {
                warn!(id = %record.id, %reason, "skipping unreadable record");
                report.skipped += 1;
            }
        }
        progress.record(&record.id, changed);
    }

    report.elapsed = start.elapsed();
    info!(
        scanned = report.scanned,
        updated = report.updated,
        unchanged = report.unchanged,
        unmapped = report.unmapped,
        skipped = report.skipped,
        "page repair finished"
    );
    progress.done(&report);
    Ok(report)
}
