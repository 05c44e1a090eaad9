//! Seeded k-means over sparse rows.
//!
//! k-means++ seeding with greedy local trials, Lloyd iterations, and
//! `n_init` restarts from one seeded RNG. The restart with the lowest inertia
//! wins, so the same data, `k`, and seed always give the same labels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::vectorize::{SparseRow, TfidfMatrix};

/// k-means parameters.
#[derive(Debug, Clone)]
pub(crate) struct KMeans {
    pub k: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
}

/// Outcome of the best restart.
#[derive(Debug, Clone)]
pub(crate) struct KMeansFit {
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeans {
    /// Cluster every row of `data` into `self.k` groups.
    ///
    /// Callers guarantee `1 <= k <= data.n_samples()`.
    pub fn fit(&self, data: &TfidfMatrix) -> KMeansFit {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let row_norms: Vec<f64> = data.rows.iter().map(|row| squared_norm(row)).collect();
        let tolerance = self.tolerance * mean_feature_variance(data);

        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.n_init.max(1) {
            let centers = init_plus_plus(data, &row_norms, self.k, &mut rng);
            let fit = lloyd(data, &row_norms, centers, self.max_iter, tolerance);
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.unwrap_or_else(|| KMeansFit {
            labels: vec![0; data.n_samples()],
            inertia: 0.0,
            iterations: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Vector helpers
// ---------------------------------------------------------------------------

fn squared_norm(row: &SparseRow) -> f64 {
    row.iter().map(|(_, w)| w * w).sum()
}

fn dot(row: &SparseRow, dense: &[f64]) -> f64 {
    row.iter().map(|&(i, w)| w * dense[i]).sum()
}

fn to_dense(row: &SparseRow, n_features: usize) -> Vec<f64> {
    let mut dense = vec![0.0; n_features];
    for &(i, w) in row {
        dense[i] = w;
    }
    dense
}

/// Squared euclidean distance between a sparse row and a dense center.
fn distance(row: &SparseRow, row_norm: f64, center: &[f64], center_norm: f64) -> f64 {
    (row_norm - 2.0 * dot(row, center) + center_norm).max(0.0)
}

/// Mean over features of the per-feature variance. Scales the tolerance.
fn mean_feature_variance(data: &TfidfMatrix) -> f64 {
    let n = data.n_samples() as f64;
    if n == 0.0 || data.n_features == 0 {
        return 0.0;
    }
    let mut sum = vec![0.0; data.n_features];
    let mut sum_sq = vec![0.0; data.n_features];
    for row in &data.rows {
        for &(i, w) in row {
            sum[i] += w;
            sum_sq[i] += w * w;
        }
    }
    let total: f64 = sum
        .iter()
        .zip(&sum_sq)
        .map(|(s, sq)| (sq / n - (s / n).powi(2)).max(0.0))
        .sum();
    total / data.n_features as f64
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// k-means++ with `2 + ln(k)` greedy candidates per step.
fn init_plus_plus(
    data: &TfidfMatrix,
    row_norms: &[f64],
    k: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    let n = data.n_samples();
    let local_trials = 2 + (k as f64).ln() as usize;

    let first = rng.random_range(0..n);
    let mut centers = vec![to_dense(&data.rows[first], data.n_features)];
    let mut chosen = vec![first];

    let mut closest: Vec<f64> = (0..n)
        .map(|i| distance(&data.rows[i], row_norms[i], &centers[0], row_norms[first]))
        .collect();
    let mut potential: f64 = closest.iter().sum();

    while centers.len() < k {
        let mut best: Option<(usize, Vec<f64>, f64)> = None;

        for _ in 0..local_trials {
            let candidate = if potential > 0.0 {
                sample_weighted(&closest, rng.random_range(0.0..1.0) * potential)
            } else {
                // Every point coincides with a center; pick any unchosen one.
                let unchosen: Vec<usize> = (0..n).filter(|i| !chosen.contains(i)).collect();
                if unchosen.is_empty() {
                    first
                } else {
                    unchosen[rng.random_range(0..unchosen.len())]
                }
            };

            let candidate_dense = to_dense(&data.rows[candidate], data.n_features);
            let updated: Vec<f64> = (0..n)
                .map(|i| {
                    let d = distance(
                        &data.rows[i],
                        row_norms[i],
                        &candidate_dense,
                        row_norms[candidate],
                    );
                    d.min(closest[i])
                })
                .collect();
            let candidate_potential: f64 = updated.iter().sum();

            if best
                .as_ref()
                .is_none_or(|(_, _, p)| candidate_potential < *p)
            {
                best = Some((candidate, updated, candidate_potential));
            }
        }

        if let Some((index, updated, new_potential)) = best {
            centers.push(to_dense(&data.rows[index], data.n_features));
            chosen.push(index);
            closest = updated;
            potential = new_potential;
        }
    }

    centers
}

/// First index whose cumulative weight reaches `target`.
fn sample_weighted(weights: &[f64], target: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative >= target && *w > 0.0 {
            return i;
        }
    }
    // Rounding left the target just above the total.
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Lloyd iterations
// ---------------------------------------------------------------------------

fn lloyd(
    data: &TfidfMatrix,
    row_norms: &[f64],
    mut centers: Vec<Vec<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> KMeansFit {
    let k = centers.len();
    let mut labels = vec![usize::MAX; data.n_samples()];
    let mut iterations = 0;

    for _ in 0..max_iter {
        iterations += 1;
        let center_norms: Vec<f64> = centers.iter().map(|c| c.iter().map(|v| v * v).sum()).collect();
        let (new_labels, distances) = assign(data, row_norms, &centers, &center_norms);
        let converged_labels = new_labels == labels;
        labels = new_labels;

        let new_centers = recompute_centers(data, &mut labels, &distances, k);
        let shift: f64 = centers
            .iter()
            .zip(&new_centers)
            .map(|(old, new)| old.iter().zip(new).map(|(a, b)| (a - b).powi(2)).sum::<f64>())
            .sum();
        centers = new_centers;

        if converged_labels || shift <= tolerance {
            break;
        }
    }

    let center_norms: Vec<f64> = centers.iter().map(|c| c.iter().map(|v| v * v).sum()).collect();
    let (labels, distances) = assign(data, row_norms, &centers, &center_norms);
    KMeansFit {
        labels,
        inertia: distances.iter().sum(),
        iterations,
    }
}

/// Nearest center per row (lowest index on ties) and its distance.
fn assign(
    data: &TfidfMatrix,
    row_norms: &[f64],
    centers: &[Vec<f64>],
    center_norms: &[f64],
) -> (Vec<usize>, Vec<f64>) {
    data.rows
        .iter()
        .zip(row_norms)
        .map(|(row, &norm)| {
            let mut best = (0, f64::INFINITY);
            for (j, center) in centers.iter().enumerate() {
                let d = distance(row, norm, center, center_norms[j]);
                if d < best.1 {
                    best = (j, d);
                }
            }
            best
        })
        .unzip()
}

/// Mean of each cluster's members. An empty cluster takes over the point
/// farthest from its current center.
fn recompute_centers(
    data: &TfidfMatrix,
    labels: &mut [usize],
    distances: &[f64],
    k: usize,
) -> Vec<Vec<f64>> {
    let mut sums = vec![vec![0.0; data.n_features]; k];
    let mut counts = vec![0usize; k];
    for (row, &label) in data.rows.iter().zip(labels.iter()) {
        counts[label] += 1;
        for &(i, w) in row {
            sums[label][i] += w;
        }
    }

    let empty: Vec<usize> = (0..k).filter(|&j| counts[j] == 0).collect();
    if !empty.is_empty() {
        let mut by_distance: Vec<usize> = (0..data.n_samples()).collect();
        by_distance.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]).then(a.cmp(&b)));

        let mut donors = by_distance.into_iter();
        for target in empty {
            // Only take points whose cluster keeps at least one member.
            let Some(point) = donors.by_ref().find(|&p| counts[labels[p]] > 1) else {
                break;
            };
            let source = labels[point];
            for &(i, w) in &data.rows[point] {
                sums[source][i] -= w;
                sums[target][i] += w;
            }
            counts[source] -= 1;
            counts[target] += 1;
            labels[point] = target;
        }
    }

    sums.into_iter()
        .zip(counts)
        .map(|(mut sum, count)| {
            if count > 0 {
                let scale = 1.0 / count as f64;
                for v in &mut sum {
                    *v *= scale;
                }
            }
            sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(points: &[&[f64]]) -> TfidfMatrix {
        let n_features = points.first().map_or(0, |p| p.len());
        let rows = points
            .iter()
            .map(|p| {
                p.iter()
                    .enumerate()
                    .filter(|(_, v)| **v != 0.0)
                    .map(|(i, v)| (i, *v))
                    .collect()
            })
            .collect();
        TfidfMatrix { rows, n_features }
    }

    fn kmeans(k: usize, seed: u64) -> KMeans {
        KMeans {
            k,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed,
        }
    }

    #[test]
    fn separates_two_obvious_groups() {
        let data = matrix(&[
            &[1.0, 0.0],
            &[0.9, 0.1],
            &[0.95, 0.05],
            &[0.0, 1.0],
            &[0.1, 0.9],
        ]);
        let fit = kmeans(2, 42).fit(&data);
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[0], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_ne!(fit.labels[0], fit.labels[3]);
    }

    #[test]
    fn same_seed_same_labels() {
        let data = matrix(&[
            &[1.0, 0.0, 0.0],
            &[0.0, 1.0, 0.0],
            &[0.0, 0.0, 1.0],
            &[0.7, 0.7, 0.0],
            &[0.0, 0.7, 0.7],
        ]);
        let a = kmeans(3, 7).fit(&data);
        let b = kmeans(3, 7).fit(&data);
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn k_equal_to_samples_isolates_every_point() {
        let data = matrix(&[&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[0.0, 0.0, 1.0]]);
        let fit = kmeans(3, 42).fit(&data);
        let mut labels = fit.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 3);
        assert!(fit.inertia.abs() < 1e-12);
    }

    #[test]
    fn identical_points_do_not_panic() {
        let data = matrix(&[&[1.0, 0.0], &[1.0, 0.0], &[1.0, 0.0]]);
        let fit = kmeans(2, 42).fit(&data);
        assert_eq!(fit.labels.len(), 3);
        assert!(fit.labels.iter().all(|&l| l < 2));
    }

    #[test]
    fn labels_stay_within_k() {
        let data = matrix(&[
            &[1.0, 0.0],
            &[0.0, 1.0],
            &[0.6, 0.8],
            &[0.8, 0.6],
            &[0.0, 0.0],
        ]);
        let fit = kmeans(4, 3).fit(&data);
        assert!(fit.labels.iter().all(|&l| l < 4));
        assert!(fit.iterations >= 1);
    }

    #[test]
    fn weighted_sampling_skips_zero_weights() {
        assert_eq!(sample_weighted(&[0.0, 2.0, 0.0, 1.0], 0.0), 1);
        assert_eq!(sample_weighted(&[0.0, 2.0, 0.0, 1.0], 2.5), 3);
        assert_eq!(sample_weighted(&[0.0, 2.0, 0.0, 1.0], 99.0), 3);
    }
}
