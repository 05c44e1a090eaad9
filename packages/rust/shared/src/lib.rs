//! Shared types, error model, capability traits, and configuration for serpcluster.
//!
//! This crate is the foundation depended on by all other serpcluster crates.
//! It provides:
//! - [`SerpClusterError`], the unified error type, and [`ClusterError`]
//! - Domain types ([`Query`], [`PageContent`], [`ClusterAssignment`], [`RunRecord`])
//! - The [`SearchProvider`] and [`KeywordStore`] contracts
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    Analyzer, AppConfig, ClusteringConfig, DEFAULT_SEARCH_ENDPOINT, PipelineConfig,
    PipelineSettings, SearchConfig, ServerConfig, StopWords, StorageConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ClusterError, Result, SerpClusterError};
pub use traits::{KeywordStore, SearchProvider};
pub use types::{
    ClusterAssignment, Keyword, KeywordSet, PageContent, PageStatus, Query, RunId, RunRecord,
    SkippedPage, StoredKeywordRow,
};
