// k-means event clustering over the TF-IDF matrix.
//
// Lloyd iterations (assign to nearest centroid, move centroids to member
// means) until the total squared centroid shift is within tolerance or the
// iteration cap is hit. Each restart seeds its first centroid from the seeded
// RNG and the rest farthest-first; the restart with the lowest inertia wins.
// Cluster ids are only meaningful within one fit.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::corpus::Corpus;
use crate::error::{AnalysisError, Result};
use crate::text::vectorizer::FeatureMatrix;

/// Fitting parameters for the event clusterer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    pub n_clusters: usize,
    pub max_iterations: usize,
    /// Stop once the summed squared centroid movement is at or below this
    pub tolerance: f64,
    /// Independent restarts; the lowest-inertia one is kept
    pub n_init: usize,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            n_clusters: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 10,
            seed: 42,
        }
    }
}

/// One event: its centroid and the corpus rows assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCluster {
    pub id: usize,
    pub centroid: Vec<f64>,
    pub members: Vec<usize>,
}

impl EventCluster {
    /// Article ids of the members, in corpus order.
    pub fn article_ids<'a>(&self, corpus: &'a Corpus) -> Vec<&'a str> {
        self.members
            .iter()
            .filter_map(|&row| corpus.documents().get(row))
            .map(|d| d.id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct EventClusterer {
    centroids: Array2<f64>,
    labels: Vec<usize>,
    inertia: f64,
    iterations: usize,
}

struct Run {
    centroids: Array2<f64>,
    labels: Vec<usize>,
    inertia: f64,
    iterations: usize,
}

impl EventClusterer {
    /// Fit on the corpus' shared TF-IDF matrix.
    pub fn fit_corpus(corpus: &Corpus, config: &ClusterConfig) -> Result<Self> {
        Self::fit(corpus.tfidf(), config)
    }

    pub fn fit(matrix: &FeatureMatrix, config: &ClusterConfig) -> Result<Self> {
        let k = config.n_clusters;
        if k == 0 {
            return Err(AnalysisError::InvalidConfig(
                "cluster count must be positive".to_string(),
            ));
        }
        let n = matrix.n_rows();
        if n < k {
            return Err(AnalysisError::InsufficientData {
                model: "event clusterer",
                requested: k,
                available: n,
            });
        }

        let data = matrix.values();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut best: Option<Run> = None;

        for restart in 0..config.n_init.max(1) {
            let first = rng.random_range(0..n);
            let run = lloyd(data, k, first, config.max_iterations, config.tolerance);
            debug!(
                restart,
                first,
                inertia = run.inertia,
                iterations = run.iterations,
                "k-means restart"
            );
            if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        let Some(best) = best else {
            unreachable!("n_init is clamped to at least one restart");
        };

        info!(
            clusters = k,
            documents = n,
            inertia = best.inertia,
            iterations = best.iterations,
            "Fitted event clusters"
        );

        Ok(Self {
            centroids: best.centroids,
            labels: best.labels,
            inertia: best.inertia,
            iterations: best.iterations,
        })
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    /// Cluster id of every row, in corpus order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    /// Sum of squared distances from each row to its centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn clusters(&self) -> Vec<EventCluster> {
        (0..self.n_clusters())
            .map(|id| EventCluster {
                id,
                centroid: self.centroids.row(id).to_vec(),
                members: self
                    .labels
                    .iter()
                    .enumerate()
                    .filter(|(_, &l)| l == id)
                    .map(|(row, _)| row)
                    .collect(),
            })
            .collect()
    }

    /// Nearest fitted centroid for each row of `matrix`.
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<usize>> {
        if matrix.n_cols() != self.centroids.ncols() {
            return Err(AnalysisError::InvalidConfig(format!(
                "matrix has {} columns, clusterer was fit on {}",
                matrix.n_cols(),
                self.centroids.ncols()
            )));
        }
        Ok(matrix
            .values()
            .rows()
            .into_iter()
            .map(|row| nearest(&self.centroids, row).0)
            .collect())
    }
}

fn lloyd(data: &Array2<f64>, k: usize, first: usize, max_iterations: usize, tolerance: f64) -> Run {
    let n = data.nrows();
    let mut centroids = farthest_first(data, k, first);
    let mut labels = vec![0usize; n];
    let mut iterations = 0;

    for iter in 1..=max_iterations {
        iterations = iter;
        let mut distances = vec![0.0; n];
        for (i, row) in data.rows().into_iter().enumerate() {
            let (label, d2) = nearest(&centroids, row);
            labels[i] = label;
            distances[i] = d2;
        }

        relocate_empty_clusters(&mut labels, &distances, k);

        let mut next = Array2::<f64>::zeros(centroids.dim());
        let mut counts = vec![0usize; k];
        for (i, row) in data.rows().into_iter().enumerate() {
            let mut c = next.row_mut(labels[i]);
            c += &row;
            counts[labels[i]] += 1;
        }
        for (j, mut c) in next.rows_mut().into_iter().enumerate() {
            if counts[j] > 0 {
                c.mapv_inplace(|v| v / counts[j] as f64);
            } else {
                c.assign(&centroids.row(j));
            }
        }

        let shift: f64 = (&next - &centroids).mapv(|v| v * v).sum();
        centroids = next;
        if shift <= tolerance {
            break;
        }
    }

    // Final assignment against the final centroids
    let mut inertia = 0.0;
    for (i, row) in data.rows().into_iter().enumerate() {
        let (label, d2) = nearest(&centroids, row);
        labels[i] = label;
        inertia += d2;
    }

    Run {
        centroids,
        labels,
        inertia,
        iterations,
    }
}

/// First centroid is row `first`; every next one is the row farthest from
/// all centroids chosen so far (ties to the lowest row).
fn farthest_first(data: &Array2<f64>, k: usize, first: usize) -> Array2<f64> {
    let mut centroids = Array2::<f64>::zeros((k, data.ncols()));
    centroids.row_mut(0).assign(&data.row(first));

    let mut min_d2: Vec<f64> = data
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, data.row(first)))
        .collect();

    for c in 1..k {
        let mut pick = 0;
        for i in 1..min_d2.len() {
            if min_d2[i] > min_d2[pick] {
                pick = i;
            }
        }
        centroids.row_mut(c).assign(&data.row(pick));
        for (i, row) in data.rows().into_iter().enumerate() {
            min_d2[i] = min_d2[i].min(squared_distance(row, data.row(pick)));
        }
    }
    centroids
}

/// Give every empty cluster the point lying farthest from its own centroid,
/// taken from a cluster that can spare a member.
fn relocate_empty_clusters(labels: &mut [usize], distances: &[f64], k: usize) {
    let mut counts = vec![0usize; k];
    for &l in labels.iter() {
        counts[l] += 1;
    }
    let mut taken = vec![false; labels.len()];

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let mut candidate: Option<usize> = None;
        for i in 0..labels.len() {
            if taken[i] || counts[labels[i]] < 2 {
                continue;
            }
            if candidate.is_none_or(|c| distances[i] > distances[c]) {
                candidate = Some(i);
            }
        }
        match candidate {
            Some(i) => {
                warn!(cluster = empty, row = i, "Relocated point into empty cluster");
                counts[labels[i]] -= 1;
                labels[i] = empty;
                counts[empty] += 1;
                taken[i] = true;
            }
            None => warn!(cluster = empty, "Cluster left empty: no point to spare"),
        }
    }
}

/// (index, squared distance) of the closest centroid; ties to the lowest id.
fn nearest(centroids: &Array2<f64>, row: ArrayView1<'_, f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, c) in centroids.rows().into_iter().enumerate() {
        let d2 = squared_distance(row, c);
        if d2 < best.1 {
            best = (j, d2);
        }
    }
    best
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::vectorizer::Weighting;
    use ndarray::array;

    fn matrix(values: Array2<f64>) -> FeatureMatrix {
        FeatureMatrix::new(values, Weighting::TfIdf)
    }

    #[test]
    fn test_two_obvious_groups() {
        let m = matrix(array![
            [1.0, 0.0],
            [0.9, 0.1],
            [0.0, 1.0],
            [0.1, 0.9]
        ]);
        let config = ClusterConfig {
            n_clusters: 2,
            ..ClusterConfig::default()
        };
        let fit = EventClusterer::fit(&m, &config).unwrap();
        let l = fit.labels();
        assert_eq!(l[0], l[1]);
        assert_eq!(l[2], l[3]);
        assert_ne!(l[0], l[2]);
        assert!(fit.inertia() < 0.1);
    }

    #[test]
    fn test_more_clusters_than_rows_is_insufficient() {
        let m = matrix(array![[1.0, 0.0], [0.0, 1.0]]);
        let config = ClusterConfig {
            n_clusters: 3,
            ..ClusterConfig::default()
        };
        let err = EventClusterer::fit(&m, &config).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData {
                requested: 3,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_farthest_first_tie_picks_lowest_row() {
        let data = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let c = farthest_first(&data, 2, 0);
        assert_eq!(c.row(1).to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_relocation_fills_empty_cluster() {
        let mut labels = vec![0, 0, 0];
        let distances = vec![0.1, 0.5, 0.2];
        relocate_empty_clusters(&mut labels, &distances, 2);
        assert_eq!(labels, vec![0, 1, 0]);
    }

    #[test]
    fn test_predict_uses_nearest_centroid() {
        let m = matrix(array![[1.0, 0.0], [0.0, 1.0]]);
        let config = ClusterConfig {
            n_clusters: 2,
            ..ClusterConfig::default()
        };
        let fit = EventClusterer::fit(&m, &config).unwrap();
        let predicted = fit.predict(&matrix(array![[0.8, 0.2]])).unwrap();
        assert_eq!(predicted[0], fit.labels()[0]);
    }

    #[test]
    fn test_clusters_partition_rows() {
        let m = matrix(array![[1.0, 0.0], [0.0, 1.0], [0.9, 0.1]]);
        let config = ClusterConfig {
            n_clusters: 2,
            ..ClusterConfig::default()
        };
        let fit = EventClusterer::fit(&m, &config).unwrap();
        let mut rows: Vec<usize> = fit.clusters().into_iter().flat_map(|c| c.members).collect();
        rows.sort();
        assert_eq!(rows, vec![0, 1, 2]);
    }
}
