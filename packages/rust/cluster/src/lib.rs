//! Keyword clustering: TF-IDF vectors over the keyword collection, grouped
//! with seeded k-means.
//!
//! Each keyword is treated as a one-token document, so similarity comes from
//! the keyword strings themselves (shared character n-grams by default), not
//! from the pages they were found on.

mod kmeans;
mod stop_words;
mod vectorize;

use tracing::{debug, instrument};

use serpcluster_shared::{ClusterAssignment, ClusterError, ClusteringConfig, KeywordSet};

use crate::kmeans::KMeans;

/// Partition `keywords` into `k` clusters.
///
/// When there are fewer keywords than `k`, k-means runs with one cluster per
/// keyword, but the returned assignment still lists every index in `0..k`.
/// Keywords are processed in sorted order, so the result depends only on the
/// set, `k`, the clustering parameters, and `seed`.
#[instrument(skip_all, fields(keywords = keywords.len(), k = k))]
pub fn cluster(
    keywords: &KeywordSet,
    k: usize,
    config: &ClusteringConfig,
    seed: u64,
) -> Result<ClusterAssignment, ClusterError> {
    if keywords.is_empty() {
        return Err(ClusterError::NoKeywords);
    }
    if k == 0 {
        return Err(ClusterError::InvalidClusterCount);
    }

    let docs: Vec<&str> = keywords.iter().map(String::as_str).collect();
    let matrix = vectorize::fit_transform(&docs, config)?;

    let effective_k = k.min(docs.len());
    let fit = KMeans {
        k: effective_k,
        n_init: config.n_init,
        max_iter: config.max_iter,
        tolerance: config.tolerance,
        seed,
    }
    .fit(&matrix);

    debug!(
        features = matrix.n_features,
        effective_k,
        inertia = fit.inertia,
        iterations = fit.iterations,
        "k-means finished"
    );

    let mut assignment = ClusterAssignment::with_clusters(k);
    for (keyword, label) in docs.iter().zip(fit.labels) {
        assignment.push(label, *keyword);
    }
    Ok(assignment)
}
