use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::path::Path;
use tempfile::TempDir;

use wp_parser_json::load_config::{OUTPUT_DIR_ENV, TOKEN_ENV, VERSION_ENV};

const RECORDS: &str = r#"{
  "wp-parser-function": [
    {"id": 1, "title": "the_title", "permalink": "https://developer.wordpress.org/reference/functions/the_title/", "source_file": "wp-includes/post-template.php", "name": "the_title"},
    {"id": 2, "title": "get_the_title", "permalink": "https://developer.wordpress.org/reference/functions/get_the_title/", "source_file": "wp-includes/post-template.php", "name": "get_the_title"},
    {"id": 3, "title": "the_title_old", "permalink": "https://developer.wordpress.org/reference/functions/the_title_old/", "source_file": "wp-includes/deprecated.php", "name": "the_title_old"}
  ]
}"#;

/// Writes a record dump and a config pointing at it into a fresh temp dir.
fn create_workspace() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("Creating temp dir failed");
    let records = dir.path().join("records.json");
    write(&records, RECORDS).expect("Writing record dump failed");

    let config = dir.path().join("export.yaml");
    let yaml = format!(
        "output_dir: {}\npage_size: 1\nreference:\n  version: \"6.4\"\nsource:\n  type: file\n  path: {}\n",
        dir.path().join("json-files").display(),
        records.display()
    );
    write(&config, yaml).expect("Writing temp config failed");
    (dir, config)
}

fn generate(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wp-parser-json").expect("Binary exists");
    cmd.arg("generate")
        .arg("--config")
        .arg(config)
        .env_remove(OUTPUT_DIR_ENV)
        .env_remove(VERSION_ENV)
        .env_remove(TOKEN_ENV);
    cmd
}

#[test]
fn generate_cli_happy_flow_writes_files() {
    let (dir, config) = create_workspace();

    generate(&config)
        .arg("--type=wp-parser-function")
        .assert()
        .success()
        .stdout(predicate::str::contains("Success: JSON files generated"))
        .stdout(predicate::str::contains("posts found: 3, posts used: 2, deprecated: 1"));

    let out = dir.path().join("json-files");
    assert!(out.join("functions-1.json").exists());
    assert!(out.join("functions-2.json").exists());
    assert!(out.join("functions-index.json").exists());
    assert!(out.join("version.json").exists());
    assert!(out.join("wp-parser-json.zip").exists());
    assert!(!dir.path().join("json-files-temp").exists());
}

#[test]
fn generate_cli_warns_about_missing_types() {
    let (dir, config) = create_workspace();

    generate(&config)
        .arg("--type=wp-parser-function,event")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Warning: No event.json file created. Please make sure post type event exists",
        ))
        .stderr(predicate::str::contains("Not all JSON files are created"));

    assert!(dir.path().join("json-files/functions-index.json").exists());
}

#[test]
fn generate_cli_without_types_needs_parser_types() {
    let (dir, config) = create_workspace();
    let out = dir.path().join("json-files");
    std::fs::create_dir_all(&out).unwrap();
    write(out.join("functions-1.json"), "{}").unwrap();

    // The dump only has functions, so the default parser kinds are unavailable.
    generate(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("please provide a valid post type"))
        .stderr(predicate::str::contains("Warning:").not());

    assert!(out.join("functions-1.json").exists(), "previous output is kept");
}

#[test]
fn generate_cli_fails_on_missing_config() {
    generate(Path::new("/does/not/exist.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use wp_parser_json::cli::{run, Cli, Commands};

    // A missing config file still emits the startup event before failing.
    let cli = Cli {
        command: Commands::Generate {
            config: std::path::PathBuf::from("dummy.yaml"),
            types: None,
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
