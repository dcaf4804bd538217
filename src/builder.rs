use faer::MatRef;
use num_traits::Float;
use rayon::prelude::*;
use std::collections::BinaryHeap;

use crate::error::BuildError;
use crate::graph::NeighbourMatrix;
use crate::progress::Progress;
use crate::utils::dist::*;
use crate::utils::heap_structs::*;

////////////////
// Main build //
////////////////

/// Approximate k-NN graph builder
///
/// Holds the flattened vector data shared read-only by all workers, plus
/// the metric state. The build runs in two phases: a forest of random
/// projection trees accumulates candidate neighbours per point, and an
/// iterative neighbourhood expansion then refines the candidates into the
/// k nearest.
///
/// ### Fields
///
/// * `vectors_flat` - Original vector data, flattened for cache locality
/// * `dim` - Embedding dimensions
/// * `n` - Number of vectors
/// * `metric` - Distance metric (Euclidean or Cosine)
/// * `norms` - Pre-computed norms for Cosine distance (empty for Euclidean)
pub struct KnnGraphBuilder<T> {
    pub(crate) vectors_flat: Vec<T>,
    pub(crate) dim: usize,
    pub(crate) n: usize,
    pub(crate) metric: Dist,
    pub(crate) norms: Vec<T>,
}

impl<T> VectorDistance<T> for KnnGraphBuilder<T>
where
    T: Float + Send + Sync,
{
    fn vectors_flat(&self) -> &[T] {
        &self.vectors_flat
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn norms(&self) -> &[T] {
        &self.norms
    }
}

impl<T> KnnGraphBuilder<T>
where
    T: Float + Send + Sync,
{
    /// Construct a builder from a data matrix
    ///
    /// Flattens the matrix row-major per sample and pre-computes norms when
    /// the metric needs them.
    ///
    /// ### Params
    ///
    /// * `mat` - Data matrix (rows = samples, columns = dimensions)
    /// * `metric` - Distance metric (Euclidean or Cosine)
    ///
    /// ### Returns
    ///
    /// The initialised builder
    pub fn new(mat: MatRef<T>, metric: Dist) -> Self {
        let n = mat.nrows();
        let dim = mat.ncols();

        let mut vectors_flat = Vec::with_capacity(n * dim);
        for i in 0..n {
            vectors_flat.extend(mat.row(i).iter().copied());
        }

        let norms = if metric == Dist::Cosine {
            (0..n)
                .map(|i| {
                    let start = i * dim;
                    let end = start + dim;
                    vectors_flat[start..end]
                        .iter()
                        .map(|x| *x * *x)
                        .fold(T::zero(), |a, b| a + b)
                        .sqrt()
                })
                .collect()
        } else {
            Vec::new()
        };

        KnnGraphBuilder {
            vectors_flat,
            dim,
            n,
            metric,
            norms,
        }
    }

    /// Number of samples held by the builder
    pub fn n(&self) -> usize {
        self.n
    }

    /// The metric the builder was constructed with
    pub fn metric(&self) -> Dist {
        self.metric
    }

    /// Slice view of sample `i`
    #[inline(always)]
    pub(crate) fn vector(&self, i: usize) -> &[T] {
        &self.vectors_flat[i * self.dim..(i + 1) * self.dim]
    }

    /// Distance between samples `i` and `j` under the configured metric
    #[inline]
    pub(crate) fn distance(&self, i: usize, j: usize) -> T {
        match self.metric {
            Dist::Euclidean => self.euclidean_distance(i, j),
            Dist::Cosine => self.cosine_distance(i, j),
        }
    }

    /// Run the full graph build
    ///
    /// Three stages: the projection-tree forest accumulates candidate
    /// buffers, the trim pass reduces each buffer to the `threshold`
    /// nearest candidates, and `max_iter` rounds of neighbourhood
    /// expansion converge towards the k nearest neighbours per point.
    ///
    /// ### Params
    ///
    /// * `k` - Target neighbours per point (k <= threshold)
    /// * `threshold` - Leaf size during tree build; also the number of
    ///   candidates retained per point after the forest phase
    /// * `n_trees` - Number of independent projection trees
    /// * `max_recursion` - Hard cap on tree depth
    /// * `max_iter` - Neighbourhood-expansion iterations. With zero
    ///   iterations the trimmed candidate matrix is returned unrefined
    ///   (and then has `threshold` rows instead of `k`)
    /// * `seed` - Random seed for reproducibility
    /// * `progress` - Shared progress handle; an abort observed through it
    ///   yields an empty matrix
    ///
    /// ### Returns
    ///
    /// The k x n neighbour matrix, or the fatal `BuildError` that stopped
    /// the build.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        k: usize,
        threshold: usize,
        n_trees: usize,
        max_recursion: usize,
        max_iter: usize,
        seed: usize,
        progress: &Progress,
    ) -> Result<NeighbourMatrix, BuildError> {
        assert!(k >= 1, "k must be at least 1");
        assert!(threshold >= k, "threshold must be at least k");
        assert!(n_trees >= 1, "at least one tree is required");

        let buffers = self.search_forest(threshold, n_trees, max_recursion, seed, progress)?;
        if progress.check_abort() {
            return Ok(NeighbourMatrix::empty());
        }

        let mut knns = self.trim_candidates(&buffers, threshold, progress)?;
        if progress.check_abort() {
            return Ok(NeighbourMatrix::empty());
        }

        for _ in 0..max_iter {
            knns = self.expand_neighbourhoods(&knns, &buffers, k, progress)?;
            if progress.check_abort() {
                return Ok(NeighbourMatrix::empty());
            }
        }

        Ok(knns)
    }

    /// Reduce every candidate buffer to the `threshold` nearest entries
    ///
    /// Without this pass the first expansion iteration would walk the full
    /// union of tree candidates per point, which is prohibitive for large
    /// thresholds. Each point keeps the `threshold` closest candidates via
    /// a bounded max-heap; the point itself is excluded from its own
    /// column.
    ///
    /// ### Params
    ///
    /// * `buffers` - Per-point candidate buffers from the forest phase
    /// * `threshold` - Number of candidates to retain per point
    /// * `progress` - Shared progress handle
    ///
    /// ### Returns
    ///
    /// A `threshold` x n matrix, each column the retained candidates of one
    /// point written largest-distance-first, sentinel-terminated.
    pub(crate) fn trim_candidates(
        &self,
        buffers: &[Vec<usize>],
        threshold: usize,
        progress: &Progress,
    ) -> Result<NeighbourMatrix, BuildError> {
        let mut knns = NeighbourMatrix::filled(threshold, self.n);

        knns.data_mut()
            .par_chunks_mut(threshold)
            .enumerate()
            .try_for_each(|(i, column)| {
                if progress.check_abort() {
                    return Ok(());
                }

                let mut heap: BinaryHeap<(OrderedFloat<T>, usize)> =
                    BinaryHeap::with_capacity(threshold + 1);

                for &candidate in &buffers[i] {
                    if candidate == i {
                        continue;
                    }
                    let d = self.distance(i, candidate);
                    heap.push((OrderedFloat(d), candidate));
                    if heap.len() > threshold {
                        heap.pop();
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

        Ok(knns)
    }
}

///////////
// Tests //
///////////
