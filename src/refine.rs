use num_traits::Float;
use rayon::prelude::*;
use std::collections::BinaryHeap;

use crate::builder::KnnGraphBuilder;
use crate::error::BuildError;
use crate::graph::NeighbourMatrix;
use crate::progress::Progress;
use crate::utils::heap_structs::*;

///////////////////////////////
// Neighbourhood exploration //
///////////////////////////////

impl<T> KnnGraphBuilder<T>
where
    T: Float + Send + Sync,
{
    /// One neighbourhood-expansion iteration
    ///
    /// Every point considers its current neighbours and, through them, the
    /// neighbours of those neighbours, keeping the `k` closest in a bounded
    /// max-heap. The previous matrix is read-only for the whole iteration
    /// and each worker writes exactly one column of the fresh matrix, so
    /// the per-point work runs fully parallel without locks.
    ///
    /// A sorted visited list seeded with the point's candidate-buffer
    /// history plus its current neighbour column suppresses duplicate
    /// distance computations; without it the inner loop revisits the same
    /// index many times and the work blows up quadratically. A candidate at
    /// distance zero is a duplicate of the point itself and is skipped.
    ///
    /// ### Params
    ///
    /// * `previous` - Neighbour matrix from the prior iteration (or the
    ///   trimmed candidate matrix on the first one)
    /// * `buffers` - Per-point candidate buffers from the forest phase
    /// * `k` - Target neighbours per point
    /// * `progress` - Shared progress handle
    ///
    /// ### Returns
    ///
    /// The fresh k x n matrix, columns written largest-distance-first.
    pub(crate) fn expand_neighbourhoods(
        &self,
        previous: &NeighbourMatrix,
        buffers: &[Vec<usize>],
        k: usize,
        progress: &Progress,
    ) -> Result<NeighbourMatrix, BuildError> {
        let mut next = NeighbourMatrix::filled(k, self.n);

        next.data_mut()
            .par_chunks_mut(k)
            .enumerate()
            .try_for_each(|(i, column)| {
                if progress.check_abort() {
                    return Ok(());
                }

                let mut heap: BinaryHeap<(OrderedFloat<T>, usize)> =
                    BinaryHeap::with_capacity(k + 1);

                let mut visited = VisitedList::with_capacity((k + 1) * k);
                visited.seed(&buffers[i]);
                for j in previous.neighbours(i) {
                    visited.insert(j);
                }

                for j in previous.neighbours(i) {
                    if j == i {
                        continue;
                    }
                    let d = self.distance(i, j);
                    if d == T::zero() {
                        continue; // duplicate point
                    }
                    heap.push((OrderedFloat(d), j));
                    if heap.len() > k {
                        heap.pop();
                    }

                    // neighbours-of-neighbours of i through j
                    for candidate in previous.neighbours(j) {
                        if candidate == i {
                            continue;
                        }
                        if !visited.insert(candidate) {
                            continue; // already considered
                        }
                        let d = self.distance(i, candidate);
                        if d == T::zero() {
                            continue;
                        }
                        if heap.len() < k {
                            heap.push((OrderedFloat(d), candidate));
                        } else if d < heap.peek().unwrap().0 .0 {
                            heap.push((OrderedFloat(d), candidate));
                            if heap.len() > k {
                                heap.pop();
                            }
                        }
                    }
                }

                let mut slot = 0;
                while let Some((_, idx)) = heap.pop() {
                    column[slot] = idx as i64;
                    slot += 1;
                }
                if slot == 0 {
                    return Err(BuildError::EmptyNeighbourhood { index: i });
                }

                progress.increment(1);
                Ok(())
            })?;

        Ok(next)
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::generate_clustered_data;
    use crate::utils::dist::Dist;
    use faer::Mat;

    fn build_graph(
        data: &[f64],
        n: usize,
        dim: usize,
        k: usize,
        threshold: usize,
        n_trees: usize,
        max_iter: usize,
    ) -> NeighbourMatrix {
        let mat = Mat::from_fn(n, dim, |i, j| data[i * dim + j]);
        let builder = KnnGraphBuilder::new(mat.as_ref(), Dist::Euclidean);
        let progress = Progress::new(n * n_trees + n + n * max_iter, false);
        builder
            .build(k, threshold, n_trees, 32, max_iter, 42, &progress)
            .unwrap()
    }

    /// Mean distance from each point to its selected neighbours
    fn mean_neighbour_distance(builder: &KnnGraphBuilder<f64>, knns: &NeighbourMatrix) -> f64 {
        let mut total = 0.0;
        let mut entries = 0usize;
        for i in 0..knns.n() {
            for j in knns.neighbours(i) {
                total += builder.distance(i, j);
                entries += 1;
            }
        }
        total / entries as f64
    }

    #[test]
    fn test_colinear_triple() {
        // 1-D values [0, 1, 3]; the tree alone only pairs adjacent points,
        // a single expansion pass recovers the rest through the middle one
        let data = [0.0, 1.0, 3.0];
        let knns = build_graph(&data, 3, 1, 2, 3, 1, 1);

        let expected = [vec![1, 2], vec![0, 2], vec![0, 1]];
        for i in 0..3 {
            let mut got: Vec<usize> = knns.neighbours(i).collect();
            got.sort_unstable();
            assert_eq!(got, expected[i], "point {}", i);
        }
    }

    #[test]
    fn test_expansion_reaches_two_hops() {
        // chain 0-1-2-3 with unit gaps; point 0 starts with only {1} as a
        // candidate, and the chain pulls in 2 via 1 at the first pass
        let mat = Mat::from_fn(4, 1, |i, _| i as f64);
        let builder = KnnGraphBuilder::new(mat.as_ref(), Dist::Euclidean);
        let progress = Progress::new(0, false);

        let buffers = vec![vec![0, 1], vec![0, 1, 2], vec![1, 2, 3], vec![2, 3]];
        let trimmed = builder.trim_candidates(&buffers, 2, &progress).unwrap();
        let expanded = builder
            .expand_neighbourhoods(&trimmed, &buffers, 2, &progress)
            .unwrap();

        let mut got: Vec<usize> = expanded.neighbours(0).collect();
        got.sort_unstable();
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn test_columns_distinct_and_self_free() {
        let data = generate_clustered_data::<f64>(300, 6, 5, 1.0, 99);
        let builder = KnnGraphBuilder::new(data.as_ref(), Dist::Euclidean);
        let progress = Progress::new(0, false);

        let knns = builder.build(8, 16, 5, 32, 2, 42, &progress).unwrap();

        for i in 0..300 {
            let column: Vec<usize> = knns.neighbours(i).collect();
            assert!(!column.is_empty(), "point {} ended empty", i);
            assert!(column.iter().all(|&j| j != i), "point {} lists itself", i);

            let mut unique = column.clone();
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), column.len(), "point {} has duplicates", i);
        }
    }

    #[test]
    fn test_mean_distance_non_increasing_over_iterations() {
        let data = generate_clustered_data::<f64>(400, 5, 4, 1.5, 7);
        let builder = KnnGraphBuilder::new(data.as_ref(), Dist::Euclidean);

        let run = |iters: usize| {
            let progress = Progress::new(0, false);
            builder.build(8, 16, 5, 32, iters, 42, &progress).unwrap()
        };

        let one = mean_neighbour_distance(&builder, &run(1));
        let three = mean_neighbour_distance(&builder, &run(3));

        assert!(
            three <= one + 1e-9,
            "expansion made neighbourhoods worse: {} -> {}",
            one,
            three
        );
    }

    #[test]
    fn test_more_trees_do_not_hurt_candidates() {
        let data = generate_clustered_data::<f64>(200, 4, 4, 1.0, 3);
        let builder = KnnGraphBuilder::new(data.as_ref(), Dist::Euclidean);
        let progress = Progress::new(0, false);

        let few = builder.search_forest(8, 2, 32, 42, &progress).unwrap();
        let many = builder.search_forest(8, 8, 32, 42, &progress).unwrap();

        let total_few: usize = few.iter().map(|b| b.len()).sum();
        let total_many: usize = many.iter().map(|b| b.len()).sum();
        assert!(total_many >= total_few);
    }
}
