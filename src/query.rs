//! Paging arguments and the record fetcher.
//!
//! [`sanitize`] turns loosely typed paging input (config values, CLI strings) into
//! [`PagingArgs`]; it never fails. [`fetch_records`] maps one page of paging
//! arguments onto an offset/limit query against the [`RecordSource`].

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::contract::{Record, RecordSource, SourceError};
use crate::reference::Kind;

/// Serialized value of [`PageSize::Unbounded`].
pub const UNBOUNDED: i64 = -1;

/// Page size of a query or an output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Bounded(usize),
    /// One page holding everything.
    Unbounded,
}

impl PageSize {
    pub fn limit(self) -> Option<usize> {
        match self {
            PageSize::Bounded(n) => Some(n),
            PageSize::Unbounded => None,
        }
    }

    pub fn is_unbounded(self) -> bool {
        self == PageSize::Unbounded
    }

    pub fn as_i64(self) -> i64 {
        match self {
            PageSize::Bounded(n) => i64::try_from(n).unwrap_or(i64::MAX),
            PageSize::Unbounded => UNBOUNDED,
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Bounded(n) => write!(f, "{n}"),
            PageSize::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl Serialize for PageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

/// Paging arguments after sanitization: `page >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingArgs {
    pub page: usize,
    pub page_size: PageSize,
}

impl PagingArgs {
    pub fn new(page: usize, page_size: PageSize) -> Self {
        Self {
            page: page.max(1),
            page_size,
        }
    }

    /// Offset of the first record of this page. Unbounded queries start at 0.
    pub fn offset(&self) -> usize {
        match self.page_size {
            PageSize::Bounded(n) => (self.page - 1).saturating_mul(n),
            PageSize::Unbounded => 0,
        }
    }
}

/// A number as it arrives from YAML, JSON or the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    fn coerce(&self) -> Option<i64> {
        match self {
            RawNumber::Int(n) => Some(*n),
            RawNumber::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            RawNumber::Float(_) => None,
            RawNumber::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
        }
    }
}

/// Paging input before sanitization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPagingArgs {
    #[serde(default)]
    pub page: Option<RawNumber>,
    #[serde(default)]
    pub page_size: Option<RawNumber>,
}

impl From<PagingArgs> for RawPagingArgs {
    fn from(args: PagingArgs) -> Self {
        Self {
            page: Some(RawNumber::Int(i64::try_from(args.page).unwrap_or(i64::MAX))),
            page_size: Some(RawNumber::Int(args.page_size.as_i64())),
        }
    }
}

/// Normalize paging input. Missing, zero or unparsable pages become 1 and
/// negative pages their absolute value. A missing, unparsable or non-positive
/// page size means [`PageSize::Unbounded`].
pub fn sanitize(args: &RawPagingArgs) -> PagingArgs {
    let page = args
        .page
        .as_ref()
        .and_then(RawNumber::coerce)
        .map(|n| n.checked_abs().unwrap_or(i64::MAX))
        .filter(|n| *n > 0)
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
        .unwrap_or(1);

    PagingArgs {
        page,
        page_size: sanitize_page_size(args.page_size.as_ref()),
    }
}

pub fn sanitize_page_size(raw: Option<&RawNumber>) -> PageSize {
    match raw.and_then(RawNumber::coerce) {
        Some(n) if n > 0 => PageSize::Bounded(usize::try_from(n).unwrap_or(usize::MAX)),
        _ => PageSize::Unbounded,
    }
}

/// Fetch one page of records of `kind`.
///
/// An unbounded query has exactly one page: asking for page 2 or later returns
/// no records without touching the store.
pub async fn fetch_records<S>(
    source: &S,
    kind: &Kind,
    paging: PagingArgs,
) -> Result<Vec<Record>, SourceError>
where
    S: RecordSource + ?Sized,
{
    if paging.page > 1 && paging.page_size.is_unbounded() {
        debug!(kind = %kind.label, page = paging.page, "Unbounded query has no further pages");
        return Ok(Vec::new());
    }

    let filter = kind.filter_spec();
    let offset = paging.offset();
    let limit = paging.page_size.limit();
    let records = source
        .query(&kind.content_type, &filter, offset, limit)
        .await?;
    debug!(
        kind = %kind.label,
        page = paging.page,
        offset,
        limit = ?limit,
        fetched = records.len(),
        "Fetched source page"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{FilterSpec, MockRecordSource};
    use crate::reference::HOOK_TYPE;

    fn raw(page: Option<RawNumber>, page_size: Option<RawNumber>) -> RawPagingArgs {
        RawPagingArgs { page, page_size }
    }

    #[test]
    fn defaults_for_missing_values() {
        let args = sanitize(&RawPagingArgs::default());
        assert_eq!(args, PagingArgs::new(1, PageSize::Unbounded));
    }

    #[test]
    fn coerces_negative_and_textual_input() {
        let args = sanitize(&raw(
            Some(RawNumber::Int(-3)),
            Some(RawNumber::Text(" 25 ".into())),
        ));
        assert_eq!(args, PagingArgs::new(3, PageSize::Bounded(25)));

        let args = sanitize(&raw(
            Some(RawNumber::Text("abc".into())),
            Some(RawNumber::Int(-1)),
        ));
        assert_eq!(args, PagingArgs::new(1, PageSize::Unbounded));

        let args = sanitize(&raw(Some(RawNumber::Float(2.9)), Some(RawNumber::Int(0))));
        assert_eq!(args, PagingArgs::new(2, PageSize::Unbounded));
    }

    #[test]
    fn most_negative_page_saturates() {
        let args = sanitize(&raw(Some(RawNumber::Int(i64::MIN)), None));
        assert_eq!(args.page, usize::try_from(i64::MAX).unwrap_or(usize::MAX));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let numbers = [
            None,
            Some(RawNumber::Int(0)),
            Some(RawNumber::Int(1)),
            Some(RawNumber::Int(-7)),
            Some(RawNumber::Int(40)),
            Some(RawNumber::Int(i64::MIN)),
            Some(RawNumber::Int(i64::MAX)),
            Some(RawNumber::Float(-1e30)),
            Some(RawNumber::Text("-9223372036854775808".into())),
            Some(RawNumber::Float(-2.5)),
            Some(RawNumber::Float(f64::NAN)),
            Some(RawNumber::Text("12".into())),
            Some(RawNumber::Text("-12".into())),
            Some(RawNumber::Text("x".into())),
        ];
        for page in &numbers {
            for page_size in &numbers {
                let once = sanitize(&raw(page.clone(), page_size.clone()));
                let twice = sanitize(&RawPagingArgs::from(once));
                assert_eq!(once, twice, "page={page:?} page_size={page_size:?}");
                assert!(once.page >= 1);
            }
        }
    }

    #[test]
    fn page_size_serializes_sentinel() {
        assert_eq!(serde_json::to_string(&PageSize::Unbounded).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&PageSize::Bounded(50)).unwrap(), "50");
    }

    #[tokio::test]
    async fn unbounded_page_two_skips_the_store() {
        let mut source = MockRecordSource::new();
        source.expect_query().never();

        let kind = Kind::new("functions", "wp-parser-function");
        let records = fetch_records(&source, &kind, PagingArgs::new(2, PageSize::Unbounded))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn bounded_page_maps_to_offset_and_hook_filter() {
        let mut source = MockRecordSource::new();
        source
            .expect_query()
            .withf(|kind, filter, offset, limit| {
                kind == HOOK_TYPE
                    && *filter
                        == FilterSpec::HookTypes(vec!["filter".into(), "filter_reference".into()])
                    && *offset == 20
                    && *limit == Some(10)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(Vec::new()));

        let kind = Kind::new("filters", HOOK_TYPE);
        fetch_records(&source, &kind, PagingArgs::new(3, PageSize::Bounded(10)))
            .await
            .unwrap();
    }
}
