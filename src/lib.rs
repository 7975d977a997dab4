#![doc = "wp-parser-json: export documentation reference content into paginated JSON files."]

//! Records are read from a content store, filtered, re-bucketed into fixed-size
//! pages, indexed, written as JSON and packed into a zip archive.
//!
//! # Layout
//! - [`query`]: paging arguments and the record fetcher
//! - [`project`]: filtering projector (deprecated/duplicate records, item transform)
//! - [`paginate`]: pagination engine and re-bucketing
//! - [`index`]: lookup index and run statistics
//! - [`emit`], [`archive`]: file and archive output
//! - [`export`]: the pipeline tying them together
//! - [`contract`]: interfaces to the store, the filesystem and the archiver

pub mod archive;
pub mod cli;
pub mod config;
pub mod contract;
pub mod emit;
pub mod export;
pub mod index;
pub mod load_config;
pub mod paginate;
pub mod project;
pub mod query;
pub mod reference;
pub mod source;
pub mod store;

pub use cli::{run, Cli, Commands};
