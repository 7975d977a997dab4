use std::collections::HashMap;

use wp_parser_json::contract::{MockRecordSource, Record};
use wp_parser_json::index::{build_index, SlugKey};
use wp_parser_json::paginate::{PaginationConfig, PaginationEngine};
use wp_parser_json::project::Projector;
use wp_parser_json::query::PageSize;
use wp_parser_json::reference::Kind;
use wp_parser_json::source::JsonRecordSource;

const FUNCTION_TYPE: &str = "wp-parser-function";

fn function(n: usize, deprecated: bool) -> Record {
    let name = format!("fn_{n:02}");
    Record {
        id: n as u64,
        title: name.clone(),
        permalink: format!("https://developer.wordpress.org/reference/functions/{name}/"),
        source_file: Some(if deprecated {
            "wp-includes/deprecated.php".to_string()
        } else {
            "wp-includes/functions.php".to_string()
        }),
        name,
        hook_type: None,
    }
}

fn source(records: Vec<Record>) -> JsonRecordSource {
    JsonRecordSource::new(HashMap::from([(FUNCTION_TYPE.to_string(), records)]))
}

fn functions() -> Kind {
    Kind::new("functions", FUNCTION_TYPE)
}

fn slugs(pages: &[Vec<wp_parser_json::project::OutputItem>]) -> Vec<Vec<String>> {
    pages
        .iter()
        .map(|p| p.iter().map(|i| i.slug.clone()).collect())
        .collect()
}

#[tokio::test]
async fn fully_deprecated_middle_page_does_not_stop_paging() {
    // Three source pages of ten; every record of the second page is deprecated.
    let records = (1..=30).map(|n| function(n, (11..=20).contains(&n))).collect();
    let source = source(records);
    let projector = Projector::default();
    let engine = PaginationEngine::new(&source, &projector, PaginationConfig::new(PageSize::Bounded(10)));

    let paginated = engine.run(&functions()).await.expect("pagination succeeds");

    assert_eq!(paginated.pages.len(), 2);
    assert_eq!(paginated.pages[0][0].slug, "fn_01");
    assert_eq!(paginated.pages[1][0].slug, "fn_21");
    assert_eq!(paginated.pages[1][9].slug, "fn_30");
    assert_eq!(paginated.stats.deprecated, 10);
    assert_eq!(paginated.stats.skipped_pages, 1);
    assert_eq!(paginated.stats.found, 30);
    assert_eq!(paginated.stats.used, 20);
    assert!(!paginated.stats.truncated);
}

#[tokio::test]
async fn output_pages_are_rebucketed_across_source_pages() {
    // Source pages of three records; filtering removes some of them unevenly.
    let records = (1..=7).map(|n| function(n, n == 2 || n == 4)).collect();
    let source = source(records);
    let projector = Projector::default();
    let config = PaginationConfig::new(PageSize::Bounded(2)).with_fetch_page_size(PageSize::Bounded(3));
    let engine = PaginationEngine::new(&source, &projector, config);

    let paginated = engine.run(&functions()).await.unwrap();
    assert_eq!(
        slugs(&paginated.pages),
        vec![vec!["fn_01", "fn_03"], vec!["fn_05", "fn_06"], vec!["fn_07"]]
    );

    let index = build_index(&functions(), &paginated.pages, &SlugKey, &paginated.stats, PageSize::Bounded(2));
    assert_eq!(index.max_pages, 3);
    assert_eq!(index.found_posts, 5);
    assert_eq!(index.deprecated, Some(2));
}

#[tokio::test]
async fn unbounded_mode_produces_a_single_page() {
    let source = source((1..=25).map(|n| function(n, false)).collect());
    let projector = Projector::default();
    let engine = PaginationEngine::new(&source, &projector, PaginationConfig::new(PageSize::Unbounded));

    let paginated = engine.run(&functions()).await.unwrap();
    assert_eq!(paginated.pages.len(), 1);
    assert_eq!(paginated.pages[0].len(), 25);
}

#[tokio::test]
async fn file_limit_truncates_and_flags_the_run() {
    // Five natural pages of two records.
    let source = source((1..=10).map(|n| function(n, false)).collect());
    let projector = Projector::default();
    let config = PaginationConfig::new(PageSize::Bounded(2)).with_file_limit(2);
    let engine = PaginationEngine::new(&source, &projector, config);

    let paginated = engine.run(&functions()).await.unwrap();
    assert_eq!(paginated.pages.len(), 2);
    assert_eq!(paginated.stats.used, 4);
    assert!(paginated.stats.truncated);
}

#[tokio::test]
async fn file_limit_matching_the_data_is_not_a_truncation() {
    let source = source((1..=4).map(|n| function(n, false)).collect());
    let projector = Projector::default();
    let config = PaginationConfig::new(PageSize::Bounded(2)).with_file_limit(2);
    let engine = PaginationEngine::new(&source, &projector, config);

    let paginated = engine.run(&functions()).await.unwrap();
    assert_eq!(paginated.pages.len(), 2);
    assert!(!paginated.stats.truncated);
}

#[tokio::test]
async fn all_filtered_source_terminates_within_the_limit() {
    // A store that never runs out of deprecated records.
    let mut mock = MockRecordSource::new();
    mock.expect_query()
        .returning(|_, _, offset, _| Ok(vec![function(offset + 1, true)]));
    let projector = Projector::default();
    let config = PaginationConfig::new(PageSize::Bounded(1)).with_file_limit(3);
    let engine = PaginationEngine::new(&mock, &projector, config);

    let paginated = engine.run(&functions()).await.unwrap();
    assert!(paginated.pages.is_empty());
    assert_eq!(paginated.stats.skipped_pages, 3);
    assert!(paginated.stats.truncated);
}

#[tokio::test]
async fn empty_type_has_no_pages() {
    let source = source(Vec::new());
    let projector = Projector::default();
    let engine = PaginationEngine::new(&source, &projector, PaginationConfig::new(PageSize::Bounded(5)));

    let paginated = engine.run(&functions()).await.unwrap();
    assert!(paginated.pages.is_empty());
    assert_eq!(paginated.stats.found, 0);
}

#[tokio::test]
async fn duplicate_hooks_are_dropped_per_category() {
    let hook = |id: u64, name: &str, hook_type: &str| Record {
        id,
        title: name.to_string(),
        permalink: format!("https://developer.wordpress.org/reference/hooks/{name}/"),
        source_file: Some("wp-includes/plugin.php".into()),
        name: name.to_string(),
        hook_type: Some(hook_type.to_string()),
    };
    let source = JsonRecordSource::new(HashMap::from([(
        "wp-parser-hook".to_string(),
        vec![
            hook(1, "my-hook", "action"),
            hook(2, "my-hook-2", "action"),
            hook(3, "the_content", "filter"),
        ],
    )]));
    let projector = Projector::default();
    let engine = PaginationEngine::new(&source, &projector, PaginationConfig::new(PageSize::Unbounded));

    let actions = engine.run(&Kind::new("actions", "wp-parser-hook")).await.unwrap();
    assert_eq!(slugs(&actions.pages), vec![vec!["my-hook"]]);
    assert_eq!(actions.stats.duplicates, 1);

    let filters = engine.run(&Kind::new("filters", "wp-parser-hook")).await.unwrap();
    assert_eq!(slugs(&filters.pages), vec![vec!["the_content"]]);
    assert_eq!(filters.stats.duplicates, 0, "counters start fresh for every kind");
}
