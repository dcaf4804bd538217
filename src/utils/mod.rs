pub mod dist;
pub mod heap_structs;

use num_traits::Float;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use std::collections::BinaryHeap;

use crate::builder::KnnGraphBuilder;
use crate::graph::NeighbourMatrix;
use crate::utils::heap_structs::OrderedFloat;

////////////////
// Validation //
////////////////

/// The exact k nearest neighbours of point `i` by brute force
///
/// ### Params
///
/// * `builder` - Builder holding the vectors and metric
/// * `i` - Query point index
/// * `k` - Number of neighbours
///
/// ### Returns
///
/// Indices of the k closest points to `i`, the point itself excluded.
fn exhaustive_neighbours<T>(builder: &KnnGraphBuilder<T>, i: usize, k: usize) -> Vec<usize>
where
    T: Float + Send + Sync,
{
    let mut heap: BinaryHeap<(OrderedFloat<T>, usize)> = BinaryHeap::with_capacity(k + 1);

    for j in 0..builder.n() {
        if j == i {
            continue;
        }
        let d = builder.distance(i, j);
        if heap.len() < k {
            heap.push((OrderedFloat(d), j));
        } else if d < heap.peek().unwrap().0 .0 {
            heap.pop();
            heap.push((OrderedFloat(d), j));
        }
    }

    heap.into_iter().map(|(_, idx)| idx).collect()
}

/// Recall of an approximate graph against exhaustive ground truth
///
/// Samples query points, computes their true k nearest neighbours by brute
/// force and measures the overlap with the approximate columns. Intended
/// for moderate data sizes where the exact search stays affordable.
///
/// ### Params
///
/// * `builder` - The builder the graph was produced from
/// * `knns` - The approximate neighbour matrix
/// * `no_samples` - Optional number of sampled query points. Otherwise
///   defaults to `1000` or n, whichever is smaller.
/// * `seed` - Seed for reproducibility
///
/// ### Returns
///
/// Mean recall@k over the sampled points.
pub fn knn_graph_recall<T>(
    builder: &KnnGraphBuilder<T>,
    knns: &NeighbourMatrix,
    no_samples: Option<usize>,
    seed: usize,
) -> f64
where
    T: Float + Send + Sync,
{
    let n = builder.n();
    let k = knns.k().min(n.saturating_sub(1));
    let no_samples = no_samples.unwrap_or(1000).min(n);
    let mut rng = StdRng::seed_from_u64(seed as u64);

    let query_indices: Vec<usize> = (0..no_samples).map(|_| rng.random_range(0..n)).collect();

    let mut total_recall = 0.0;

    for &query_idx in &query_indices {
        let true_neighbours = exhaustive_neighbours(builder, query_idx, k);
        let approx_set: FxHashSet<usize> = knns.neighbours(query_idx).collect();

        let matches = true_neighbours
            .iter()
            .filter(|idx| approx_set.contains(idx))
            .count();

        total_recall += matches as f64 / k as f64;
    }

    total_recall / no_samples as f64
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use crate::synthetic::generate_uniform_data;
    use crate::utils::dist::Dist;

    #[test]
    fn test_exhaustive_neighbours_line() {
        let mat = faer::Mat::from_fn(5, 1, |i, _| i as f64);
        let builder = KnnGraphBuilder::new(mat.as_ref(), Dist::Euclidean);

        let mut nearest = exhaustive_neighbours(&builder, 0, 2);
        nearest.sort_unstable();
        assert_eq!(nearest, vec![1, 2]);

        let mut nearest = exhaustive_neighbours(&builder, 2, 2);
        nearest.sort_unstable();
        assert_eq!(nearest, vec![1, 3]);
    }

    #[test]
    fn test_recall_exact_when_leaf_covers_everything() {
        // threshold above n makes the root an all-pairs leaf; a single
        // expansion pass then selects the exact k nearest
        let data = generate_uniform_data::<f64>(100, 4, 1);
        let builder = KnnGraphBuilder::new(data.as_ref(), Dist::Euclidean);
        let progress = Progress::new(0, false);

        let knns = builder.build(5, 101, 1, 32, 1, 42, &progress).unwrap();
        let recall = knn_graph_recall(&builder, &knns, None, 42);

        assert!(recall > 0.999, "expected exact result, recall {}", recall);
    }

    #[test]
    fn test_recall_on_uniform_data() {
        // moderate uniform data where ground truth is computable
        let data = generate_uniform_data::<f32>(2000, 8, 2024);
        let builder = KnnGraphBuilder::new(data.as_ref(), Dist::Euclidean);
        let progress = Progress::new(0, false);

        let knns = builder.build(10, 20, 10, 32, 2, 42, &progress).unwrap();
        let recall = knn_graph_recall(&builder, &knns, Some(300), 42);

        assert!(recall >= 0.8, "recall too low: {}", recall);
    }
}
