use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

use crate::paginate::{PaginationConfig, DEFAULT_FILE_LIMIT};
use crate::query::{sanitize_page_size, PageSize, RawNumber};

pub const DEFAULT_REFERENCE_URL: &str = "https://developer.wordpress.org/reference";
pub const DEFAULT_ARCHIVE_NAME: &str = "wp-parser-json";

/// Everything one export run needs, as read from the YAML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Items per output file. Missing or non-positive means one file per kind.
    #[serde(default)]
    pub page_size: Option<RawNumber>,
    /// Records per store query; defaults to `page_size`.
    #[serde(default)]
    pub fetch_page_size: Option<RawNumber>,
    #[serde(default = "default_file_limit")]
    pub file_limit: usize,
    #[serde(default = "default_true")]
    pub skip_deprecated: bool,
    /// Base URL stripped from the permalinks of generic kinds.
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub reference: ReferenceSection,
    #[serde(default)]
    pub archive: ArchiveSection,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceSection {
    /// Parsed version written into versioned files and `version.json`.
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_reference_url")]
    pub base_url: String,
}

impl Default for ReferenceSection {
    fn default() -> Self {
        Self {
            version: String::new(),
            base_url: default_reference_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSection {
    #[serde(default = "default_archive_name")]
    pub name: String,
    #[serde(default = "default_archive_name")]
    pub root_directory: String,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_process_extensions")]
    pub process_extensions: Vec<String>,
    /// Pattern → replacement applied to processed files.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            name: default_archive_name(),
            root_directory: default_archive_name(),
            exclude: default_exclude(),
            process_extensions: default_process_extensions(),
            variables: BTreeMap::new(),
        }
    }
}

/// Where records are read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    File {
        path: PathBuf,
    },
    Http {
        base_url: String,
        #[serde(default)]
        token: Option<String>,
    },
}

fn default_file_limit() -> usize {
    DEFAULT_FILE_LIMIT
}

fn default_true() -> bool {
    true
}

fn default_reference_url() -> String {
    DEFAULT_REFERENCE_URL.to_string()
}

fn default_archive_name() -> String {
    DEFAULT_ARCHIVE_NAME.to_string()
}

fn default_exclude() -> Vec<String> {
    [".git", ".svn", ".DS_Store", ".gitignore"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_process_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

impl ExportConfig {
    /// Minimal config writing to `output_dir` and reading a record dump.
    pub fn new(output_dir: impl Into<PathBuf>, source: SourceConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            temp_dir: None,
            page_size: None,
            fetch_page_size: None,
            file_limit: DEFAULT_FILE_LIMIT,
            skip_deprecated: true,
            site_url: None,
            reference: ReferenceSection::default(),
            archive: ArchiveSection::default(),
            source,
        }
    }

    /// Temp directory, `<output_dir>-temp` unless configured.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(|| {
            let mut name = self.output_dir.as_os_str().to_os_string();
            name.push("-temp");
            PathBuf::from(name)
        })
    }

    pub fn page_size(&self) -> PageSize {
        sanitize_page_size(self.page_size.as_ref())
    }

    pub fn fetch_page_size(&self) -> PageSize {
        match &self.fetch_page_size {
            Some(raw) => sanitize_page_size(Some(raw)),
            None => self.page_size(),
        }
    }

    pub fn pagination(&self) -> PaginationConfig {
        PaginationConfig::new(self.page_size())
            .with_fetch_page_size(self.fetch_page_size())
            .with_file_limit(self.file_limit)
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.archive.name)
    }

    pub fn trace_loaded(&self) {
        info!(
            output_dir = %self.output_dir.display(),
            temp_dir = %self.temp_dir().display(),
            page_size = %self.page_size(),
            fetch_page_size = %self.fetch_page_size(),
            file_limit = self.file_limit,
            "Loaded ExportConfig"
        );
        debug!(?self, "ExportConfig loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_defaults_next_to_output() {
        let config = ExportConfig::new("./json-files", SourceConfig::File { path: "r.json".into() });
        assert_eq!(config.temp_dir(), PathBuf::from("./json-files-temp"));
    }

    #[test]
    fn fetch_page_size_follows_page_size() {
        let mut config = ExportConfig::new("out", SourceConfig::File { path: "r.json".into() });
        assert_eq!(config.page_size(), PageSize::Unbounded);
        config.page_size = Some(RawNumber::Int(50));
        assert_eq!(config.fetch_page_size(), PageSize::Bounded(50));
        config.fetch_page_size = Some(RawNumber::Text("200".into()));
        assert_eq!(config.pagination().fetch_page_size, PageSize::Bounded(200));
        assert_eq!(config.pagination().page_size, PageSize::Bounded(50));
    }
}
