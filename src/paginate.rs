//! Pagination engine: drives fetch + projection across source pages and
//! re-buckets the surviving items into output pages.
//!
//! The loop stops on an empty source page. A page whose records were all
//! filtered out ([`FetchOutcome::Retry`]) moves on to the next source page
//! without consuming the page budget. Both kinds of pages are bounded by the
//! file limit, so the loop terminates even when a store keeps returning
//! records that are all dropped.

use tracing::{debug, info, warn};

use crate::contract::{RecordSource, SourceError};
use crate::index::RunStats;
use crate::project::{FetchOutcome, OutputItem, Projector};
use crate::query::{fetch_records, PageSize, PagingArgs};
use crate::reference::Kind;

/// Default cap on the pages of one kind.
pub const DEFAULT_FILE_LIMIT: usize = 1000;

pub type OutputPage = Vec<OutputItem>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Items per output page.
    pub page_size: PageSize,
    /// Records per source query.
    pub fetch_page_size: PageSize,
    /// Maximum number of source pages with items, and of output pages.
    pub file_limit: usize,
}

impl PaginationConfig {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            fetch_page_size: page_size,
            file_limit: DEFAULT_FILE_LIMIT,
        }
    }

    pub fn with_fetch_page_size(mut self, fetch_page_size: PageSize) -> Self {
        self.fetch_page_size = fetch_page_size;
        self
    }

    pub fn with_file_limit(mut self, file_limit: usize) -> Self {
        self.file_limit = file_limit.max(1);
        self
    }
}

/// Output of one kind: its pages and the counters collected on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated {
    pub pages: Vec<OutputPage>,
    pub stats: RunStats,
}

pub struct PaginationEngine<'a, S: ?Sized> {
    source: &'a S,
    projector: &'a Projector,
    config: PaginationConfig,
}

impl<'a, S> PaginationEngine<'a, S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(source: &'a S, projector: &'a Projector, config: PaginationConfig) -> Self {
        Self {
            source,
            projector,
            config,
        }
    }

    /// Paginate every record of `kind`. Each call starts from fresh counters.
    pub async fn run(&self, kind: &Kind) -> Result<Paginated, SourceError> {
        let limit = self.config.file_limit;
        let fetch_size = self.config.fetch_page_size;

        let mut stats = RunStats::default();
        let mut collected: Vec<Vec<OutputItem>> = Vec::new();
        let mut source_page = 1usize;

        loop {
            if stats.source_pages >= limit || stats.skipped_pages >= limit {
                // Only a cut-off if the store still has records past this point.
                let next = fetch_records(self.source, kind, PagingArgs::new(source_page, fetch_size)).await?;
                if !next.is_empty() {
                    warn!(
                        kind = %kind.label,
                        file_limit = limit,
                        source_page,
                        "[EXPORT] File limit reached, output truncated"
                    );
                    stats.truncated = true;
                }
                break;
            }

            let records =
                fetch_records(self.source, kind, PagingArgs::new(source_page, fetch_size)).await?;
            stats.found += records.len();

            match self.projector.project(&records, kind, &mut stats) {
                FetchOutcome::Items(items) => {
                    debug!(kind = %kind.label, source_page, items = items.len(), "Collected source page");
                    collected.push(items);
                    stats.source_pages += 1;
                    source_page += 1;
                }
                FetchOutcome::Retry => {
                    debug!(kind = %kind.label, source_page, "Source page fully filtered, fetching next");
                    stats.skipped_pages += 1;
                    source_page += 1;
                }
                FetchOutcome::Exhausted => {
                    debug!(kind = %kind.label, source_page, "Source exhausted");
                    break;
                }
            }
        }

        let mut pages = rebucket(collected, self.config.page_size);
        if pages.len() > limit {
            warn!(
                kind = %kind.label,
                pages = pages.len(),
                file_limit = limit,
                "[EXPORT] More output pages than the file limit allows, output truncated"
            );
            pages.truncate(limit);
            stats.truncated = true;
        }
        stats.used = pages.iter().map(Vec::len).sum();

        info!(
            kind = %kind.label,
            pages = pages.len(),
            found = stats.found,
            used = stats.used,
            deprecated = stats.deprecated,
            duplicates = stats.duplicates,
            "[EXPORT] Paginated kind"
        );
        Ok(Paginated { pages, stats })
    }
}

/// Flatten the per-source-page item lists and slice them into output pages.
///
/// An unbounded page size gives a single page. No empty page is ever produced.
pub fn rebucket(collected: Vec<Vec<OutputItem>>, page_size: PageSize) -> Vec<OutputPage> {
    let items: Vec<OutputItem> = collected.into_iter().flatten().collect();
    if items.is_empty() {
        return Vec::new();
    }
    match page_size {
        PageSize::Unbounded => vec![items],
        PageSize::Bounded(size) => items.chunks(size.max(1)).map(<[OutputItem]>::to_vec).collect(),
    }
}
