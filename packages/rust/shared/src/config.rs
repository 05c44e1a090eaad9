//! Application configuration for serpcluster.
//!
//! User config lives at `~/.serpcluster/serpcluster.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SerpClusterError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "serpcluster.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".serpcluster";

/// Cluster count written into a freshly initialized config file.
const STARTER_CLUSTER_COUNT: usize = 5;

/// DuckDuckGo's JavaScript-free results endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

// ---------------------------------------------------------------------------
// Config structs (matching serpcluster.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline limits and thresholds.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Vectorizer and k-means parameters.
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Durable keyword table location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP front end.
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// The config written by `config init`: defaults plus an explicit cluster count.
    pub fn starter() -> Self {
        let mut config = Self::default();
        config.pipeline.cluster_count = Some(STARTER_CLUSTER_COUNT);
        config
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Maximum number of search results to fetch pages for.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Pages with less visible text than this are skipped.
    #[serde(default = "default_min_page_length")]
    pub min_page_length: usize,

    /// Number of keyword clusters. Has no built-in default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_count: Option<usize>,

    /// Per-page request timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Seed for k-means initialization.
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    /// User-Agent header sent with page requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Permit loading pages on loopback/private addresses.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_page_length: default_min_page_length(),
            cluster_count: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            random_seed: default_random_seed(),
            user_agent: default_user_agent(),
            allow_private_hosts: false,
        }
    }
}

fn default_max_results() -> usize {
    10
}
fn default_min_page_length() -> usize {
    500
}
fn default_fetch_timeout_secs() -> u64 {
    5
}
fn default_random_seed() -> u64 {
    42
}
fn default_user_agent() -> String {
    "Mozilla/5.0".into()
}

/// How keywords are split into vectorizer features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// Character n-grams taken inside word boundaries (space padded).
    CharWb,
    /// Whole word tokens.
    Word,
}

/// Stop-word filtering, applied to the words of either analyzer before
/// n-grams are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWords {
    None,
    English,
}

/// `[clustering]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_analyzer")]
    pub analyzer: Analyzer,

    /// Smallest character n-gram (char_wb only).
    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,

    /// Largest character n-gram (char_wb only).
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    #[serde(default = "default_stop_words")]
    pub stop_words: StopWords,

    /// Independent k-means restarts; the lowest-inertia result wins.
    #[serde(default = "default_n_init")]
    pub n_init: usize,

    /// Lloyd iterations per restart.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Relative convergence tolerance on centroid movement.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            analyzer: default_analyzer(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
            stop_words: default_stop_words(),
            n_init: default_n_init(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
        }
    }
}

impl ClusteringConfig {
    /// Reject parameter combinations the cluster engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
            return Err(SerpClusterError::config(format!(
                "invalid n-gram range {}..={}",
                self.ngram_min, self.ngram_max
            )));
        }
        if self.n_init == 0 || self.max_iter == 0 {
            return Err(SerpClusterError::config(
                "n_init and max_iter must be at least 1",
            ));
        }
        if !(self.tolerance >= 0.0) {
            return Err(SerpClusterError::config("tolerance must be non-negative"));
        }
        Ok(())
    }
}

fn default_analyzer() -> Analyzer {
    Analyzer::CharWb
}
fn default_ngram_min() -> usize {
    3
}
fn default_ngram_max() -> usize {
    4
}
fn default_stop_words() -> StopWords {
    StopWords::None
}
fn default_n_init() -> usize {
    10
}
fn default_max_iter() -> usize {
    300
}
fn default_tolerance() -> f64 {
    1e-4
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results endpoint (overridable for testing).
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Optional DuckDuckGo region code, e.g. `us-en`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default)]
    pub safe_search: bool,

    /// Search request timeout in seconds.
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,

    /// Custom User-Agent; a browser string is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            region: None,
            safe_search: false,
            timeout_secs: default_search_timeout_secs(),
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Reject settings that would make every search fail.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(SerpClusterError::config(
                "search timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_search_endpoint() -> String {
    DEFAULT_SEARCH_ENDPOINT.into()
}
fn default_search_timeout_secs() -> u64 {
    10
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the keyword database.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "seo_keywords.db".into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP front end binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".into()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration handed to the pipeline orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Cap on search results (and therefore page loads) per run.
    pub max_results: usize,
    /// Minimum visible-text length for a page to count.
    pub min_page_length: usize,
    /// Requested number of clusters, `k`.
    pub cluster_count: usize,
    /// Timeout applied to each page request.
    pub fetch_timeout: Duration,
    /// Seed for the clustering step.
    pub random_seed: u64,
    /// User-Agent header sent with page requests.
    pub user_agent: String,
    /// Permit loopback/private page hosts (mock servers in tests).
    pub allow_private_hosts: bool,
    /// Vectorizer and k-means parameters.
    pub clustering: ClusteringConfig,
}

impl PipelineConfig {
    /// Default thresholds with an explicit cluster count.
    pub fn new(cluster_count: usize) -> Self {
        let settings = PipelineSettings::default();
        Self {
            max_results: settings.max_results,
            min_page_length: settings.min_page_length,
            cluster_count,
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_secs),
            random_seed: settings.random_seed,
            user_agent: settings.user_agent,
            allow_private_hosts: settings.allow_private_hosts,
            clustering: ClusteringConfig::default(),
        }
    }

    /// Merge the file config with an optional CLI cluster count.
    pub fn from_app(config: &AppConfig, cluster_count: Option<usize>) -> Result<Self> {
        let settings = &config.pipeline;
        let cluster_count = cluster_count.or(settings.cluster_count).ok_or_else(|| {
            SerpClusterError::config(
                "cluster_count is not set. Add it under [pipeline] or pass --clusters",
            )
        })?;

        let merged = Self {
            max_results: settings.max_results,
            min_page_length: settings.min_page_length,
            cluster_count,
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_secs),
            random_seed: settings.random_seed,
            user_agent: settings.user_agent.clone(),
            allow_private_hosts: settings.allow_private_hosts,
            clustering: config.clustering.clone(),
        };
        merged.validate()?;
        Ok(merged)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(SerpClusterError::config("max_results must be at least 1"));
        }
        if self.cluster_count == 0 {
            return Err(SerpClusterError::config("cluster_count must be at least 1"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(SerpClusterError::config("fetch_timeout must be positive"));
        }
        self.clustering.validate()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.serpcluster/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SerpClusterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.serpcluster/serpcluster.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SerpClusterError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SerpClusterError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a starter config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SerpClusterError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::starter())
        .map_err(|e| SerpClusterError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SerpClusterError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
