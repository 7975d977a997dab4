//! Zip packager for the emitted directory.
//!
//! Files are added in sorted path order under a single root directory entry, so
//! two runs over the same files give archives with the same layout. Files whose
//! extension is listed in `process_extensions` go through the content filter
//! first.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use regex::Regex;
use tracing::{debug, error, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::ArchiveSection;
use crate::contract::{ArchiveError, ArchiveWriter};

/// Rewrites file contents before they are added to the archive.
pub trait ContentFilter: Send + Sync {
    fn filter(&self, file_name: &str, contents: Vec<u8>) -> Vec<u8>;
}

/// Replaces every match of each variable pattern with its value.
pub struct VariablesFilter {
    replacements: Vec<(Regex, String)>,
}

impl VariablesFilter {
    pub fn new(variables: &BTreeMap<String, String>) -> Result<Self, regex::Error> {
        let replacements = variables
            .iter()
            .map(|(pattern, value)| Ok((Regex::new(pattern)?, value.clone())))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { replacements })
    }
}

impl ContentFilter for VariablesFilter {
    fn filter(&self, file_name: &str, contents: Vec<u8>) -> Vec<u8> {
        let mut text = match String::from_utf8(contents) {
            Ok(text) => text,
            Err(e) => {
                debug!(file = file_name, "Skipping variable replacement for non UTF-8 file");
                return e.into_bytes();
            }
        };
        for (pattern, value) in &self.replacements {
            text = pattern
                .replace_all(&text, regex::NoExpand(value.as_str()))
                .into_owned();
        }
        text.into_bytes()
    }
}

pub struct ZipArchiver {
    root_directory: String,
    process_extensions: Vec<String>,
    content_filter: Option<Box<dyn ContentFilter>>,
}

impl ZipArchiver {
    pub fn new(root_directory: impl Into<String>) -> Self {
        Self {
            root_directory: root_directory.into().trim_matches('/').to_string(),
            process_extensions: Vec::new(),
            content_filter: None,
        }
    }

    /// Archiver configured from the `archive` config section.
    pub fn from_config(section: &ArchiveSection) -> Result<Self, regex::Error> {
        let mut archiver = Self::new(section.root_directory.as_str());
        archiver.process_extensions = section.process_extensions.clone();
        if !section.variables.is_empty() {
            archiver.content_filter = Some(Box::new(VariablesFilter::new(&section.variables)?));
        }
        Ok(archiver)
    }

    pub fn with_content_filter(
        mut self,
        extensions: Vec<String>,
        filter: impl ContentFilter + 'static,
    ) -> Self {
        self.process_extensions = extensions;
        self.content_filter = Some(Box::new(filter));
        self
    }

    fn entry_name(&self, relative: &Path) -> String {
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if self.root_directory.is_empty() {
            relative
        } else {
            format!("{}/{}", self.root_directory, relative)
        }
    }

    fn process(&self, path: &Path, contents: Vec<u8>) -> Vec<u8> {
        let Some(filter) = &self.content_filter else {
            return contents;
        };
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !self.process_extensions.iter().any(|e| e == extension) {
            return contents;
        }
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        filter.filter(file_name, contents)
    }
}

impl ArchiveWriter for ZipArchiver {
    fn pack(&self, source_dir: &Path, exclude: &[String], dest: &Path) -> Result<(), ArchiveError> {
        info!(source = %source_dir.display(), dest = %dest.display(), "[EXPORT] Packing archive");

        let file = File::create(dest).map_err(|e| {
            error!(error = ?e, path = %dest.display(), "Failed to create archive file");
            e
        })?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        if !self.root_directory.is_empty() {
            zip.add_directory(self.root_directory.as_str(), options)?;
        }

        let walker = WalkDir::new(source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !exclude
                        .iter()
                        .any(|name| entry.file_name().to_string_lossy() == name.as_str())
            });

        let mut added = 0usize;
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || entry.path() == dest {
                continue;
            }
            let relative = entry.path().strip_prefix(source_dir)?;
            let name = self.entry_name(relative);
            let contents = self.process(entry.path(), fs::read(entry.path())?);

            zip.start_file(name.as_str(), options)?;
            zip.write_all(&contents)?;
            debug!(entry = %name, size = contents.len(), "Added archive entry");
            added += 1;
        }

        zip.finish()?;
        info!(entries = added, dest = %dest.display(), "[EXPORT] Archive written");
        Ok(())
    }
}
