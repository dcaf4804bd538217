#![allow(clippy::needless_range_loop)] // I want these loops!

pub mod builder;
pub mod error;
pub mod forest;
pub mod graph;
pub mod progress;
pub mod refine;
pub mod synthetic;
pub mod utils;

use faer::MatRef;
use num_traits::Float;

pub use crate::builder::KnnGraphBuilder;
pub use crate::error::BuildError;
pub use crate::graph::{NeighbourMatrix, NO_NEIGHBOUR};
pub use crate::progress::Progress;
pub use crate::utils::dist::{parse_ann_dist, Dist};
pub use crate::utils::knn_graph_recall;

///////////////
// kNN graph //
///////////////

/// Build an approximate k-nearest-neighbour graph
///
/// Runs the full pipeline: a forest of random projection trees accumulates
/// candidate neighbours per point, the candidates are trimmed to the
/// `threshold` closest, and `max_iter` rounds of neighbourhood expansion
/// refine them into the k nearest. Trees run in parallel, as does the
/// per-point work of the later phases.
///
/// ### Params
///
/// * `mat` - The data matrix. Rows represent the samples, columns represent
///   the embedding dimensions
/// * `k` - Number of neighbours per point (k <= threshold)
/// * `threshold` - Maximum leaf size during tree build; also the number of
///   candidates retained per point after the forest phase
/// * `n_trees` - Number of independent projection trees (more trees =
///   better recall, slower build)
/// * `max_recursion` - Hard cap on tree depth
/// * `max_iter` - Neighbourhood-expansion iterations
/// * `dist_metric` - The distance metric to use. One of `"euclidean"` or
///   `"cosine"`; unrecognised names fall back to Euclidean
/// * `seed` - Random seed for reproducibility
/// * `verbose` - Controls verbosity of the function
///
/// ### Returns
///
/// A k x n `NeighbourMatrix`: column i lists up to k neighbour indices of
/// point i, unused slots carry the -1 sentinel and intra-column order is
/// unspecified. Fatal conditions surface as `BuildError`.
#[allow(clippy::too_many_arguments)]
pub fn build_knn_graph<T>(
    mat: MatRef<T>,
    k: usize,
    threshold: usize,
    n_trees: usize,
    max_recursion: usize,
    max_iter: usize,
    dist_metric: &str,
    seed: usize,
    verbose: bool,
) -> Result<NeighbourMatrix, BuildError>
where
    T: Float + Send + Sync,
{
    let n = mat.nrows();
    let progress = Progress::new(n * n_trees + n + n * max_iter, verbose);

    build_knn_graph_with_progress(
        mat,
        k,
        threshold,
        n_trees,
        max_recursion,
        max_iter,
        dist_metric,
        seed,
        &progress,
    )
}

/// Build an approximate k-NN graph against a caller-owned progress handle
///
/// Identical to `build_knn_graph`, but the caller keeps the `Progress` and
/// may share it with another thread to observe the counter or request a
/// cooperative abort. An aborted build returns an empty matrix and never
/// exposes partial state.
///
/// ### Params
///
/// * `progress` - Shared progress handle; see `build_knn_graph` for the
///   remaining parameters
///
/// ### Returns
///
/// The k x n `NeighbourMatrix`, or an empty matrix after an abort.
#[allow(clippy::too_many_arguments)]
pub fn build_knn_graph_with_progress<T>(
    mat: MatRef<T>,
    k: usize,
    threshold: usize,
    n_trees: usize,
    max_recursion: usize,
    max_iter: usize,
    dist_metric: &str,
    seed: usize,
    progress: &Progress,
) -> Result<NeighbourMatrix, BuildError>
where
    T: Float + Send + Sync,
{
    let metric = parse_ann_dist(dist_metric).unwrap_or_default();
    let builder = KnnGraphBuilder::new(mat, metric);

    builder.build(k, threshold, n_trees, max_recursion, max_iter, seed, progress)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use faer::Mat;

    fn irregular_matrix(n: usize) -> Mat<f64> {
        Mat::from_fn(n, 2, |i, j| {
            let v = i as f64;
            if j == 0 {
                (v * 0.7).sin()
            } else {
                (v * 1.3).cos()
            }
        })
    }

    #[test]
    fn test_unknown_metric_falls_back_to_euclidean() {
        let mat = irregular_matrix(6);

        let a = build_knn_graph(mat.as_ref(), 2, 4, 2, 32, 1, "euclidean", 42, false).unwrap();
        let b = build_knn_graph(mat.as_ref(), 2, 4, 2, 32, 1, "minkowski", 42, false).unwrap();

        for i in 0..6 {
            assert_eq!(a.col(i), b.col(i));
        }
    }

    #[test]
    fn test_caller_owned_progress_observes_work() {
        let mat = irregular_matrix(8);
        let progress = Progress::new(8 * 2 + 8 + 8, false);

        let knns =
            build_knn_graph_with_progress(mat.as_ref(), 2, 5, 2, 32, 1, "euclidean", 42, &progress)
                .unwrap();

        assert!(!knns.is_empty());
        assert!(progress.count() > 0);
        for i in 0..8 {
            assert!(knns.neighbours(i).all(|j| j != i));
        }
    }
}
