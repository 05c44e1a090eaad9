//! Core domain types for serpcluster runs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SerpClusterError};

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A validated, non-empty search query. The unit of work for one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Validate raw user input. Surrounding whitespace is dropped; a query
    /// that is empty afterwards is rejected.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(SerpClusterError::input("no query provided"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Why a page was or was not usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    /// Text met the minimum length and can be mined for keywords.
    Valid,
    /// The page loaded but its visible text was below the threshold.
    TooShort { length: usize, minimum: usize },
    /// Network, status, content-type or parse failure.
    Failed { reason: String },
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::TooShort { length, minimum } => {
                write!(f, "not enough content ({length} < {minimum} characters)")
            }
            Self::Failed { reason } => f.write_str(reason),
        }
    }
}

/// Visible text retrieved from one URL. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: String,
    /// Extracted visible text (empty when the load failed).
    pub text: String,
    pub status: PageStatus,
}

impl PageContent {
    /// A page whose load failed before any text was extracted.
    pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: String::new(),
            status: PageStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == PageStatus::Valid
    }
}

/// A page excluded from aggregation, reported alongside a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPage {
    pub url: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Keywords and clusters
// ---------------------------------------------------------------------------

/// A normalized token: lowercase ASCII letters, at least four of them.
pub type Keyword = String;

/// De-duplicated keywords. Ordered so clustering input is reproducible.
pub type KeywordSet = BTreeSet<Keyword>;

/// Mapping from cluster index `0..k` to the keywords assigned to it.
///
/// Every index below the requested cluster count is present, even when no
/// keyword landed in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterAssignment(BTreeMap<usize, Vec<Keyword>>);

impl ClusterAssignment {
    /// An assignment with `k` empty clusters.
    pub fn with_clusters(k: usize) -> Self {
        Self((0..k).map(|i| (i, Vec::new())).collect())
    }

    /// Append a keyword to a cluster, creating the index if needed.
    pub fn push(&mut self, cluster: usize, keyword: impl Into<Keyword>) {
        self.0.entry(cluster).or_default().push(keyword.into());
    }

    /// Number of cluster indices (populated or not).
    pub fn cluster_count(&self) -> usize {
        self.0.len()
    }

    /// Total number of keywords across all clusters.
    pub fn keyword_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn get(&self, cluster: usize) -> Option<&[Keyword]> {
        self.0.get(&cluster).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Keyword])> {
        self.0.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Flatten into `(cluster, keyword)` rows for storage.
    pub fn rows(&self) -> Vec<StoredKeywordRow> {
        self.iter()
            .flat_map(|(cluster, keywords)| {
                keywords.iter().map(move |keyword| StoredKeywordRow {
                    cluster: cluster as i64,
                    keyword: keyword.clone(),
                })
            })
            .collect()
    }
}

/// One persisted `(cluster, keyword)` row of the durable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKeywordRow {
    pub cluster: i64,
    pub keyword: Keyword,
}

// ---------------------------------------------------------------------------
// Run history
// ---------------------------------------------------------------------------

/// Summary of one successful run, stored next to its keyword rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_used: usize,
    pub pages_skipped: usize,
    pub keyword_count: usize,
    pub cluster_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rejects_blank_input() {
        assert!(Query::new("").is_err());
        assert!(Query::new("   \t").is_err());
        let err = Query::new("").unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "no query provided");
    }

    #[test]
    fn query_trims_whitespace() {
        let query = Query::new("  best seo strategies ").unwrap();
        assert_eq!(query.as_str(), "best seo strategies");
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn assignment_enumerates_empty_clusters() {
        let mut assignment = ClusterAssignment::with_clusters(5);
        assignment.push(1, "search");
        assignment.push(1, "engine");
        assignment.push(3, "optimization");

        assert_eq!(assignment.cluster_count(), 5);
        assert_eq!(assignment.keyword_count(), 3);
        assert!(assignment.get(0).is_some_and(|c| c.is_empty()));
        assert_eq!(assignment.get(1).map(<[_]>::len), Some(2));
    }

    #[test]
    fn assignment_serializes_with_string_keys() {
        let mut assignment = ClusterAssignment::with_clusters(2);
        assignment.push(0, "rust");
        let json = serde_json::to_value(&assignment).unwrap();
        assert_eq!(json, serde_json::json!({"0": ["rust"], "1": []}));
    }

    #[test]
    fn assignment_rows_cover_every_keyword() {
        let mut assignment = ClusterAssignment::with_clusters(3);
        assignment.push(0, "alpha");
        assignment.push(2, "gamma");
        assignment.push(2, "delta");

        let rows = assignment.rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.contains(&StoredKeywordRow {
            cluster: 2,
            keyword: "delta".into()
        }));
    }

    #[test]
    fn page_status_display() {
        let status = PageStatus::TooShort {
            length: 120,
            minimum: 500,
        };
        assert_eq!(status.to_string(), "not enough content (120 < 500 characters)");
        assert!(!PageContent::failed("https://example.com", "HTTP 404").is_valid());
    }
}
