use num_traits::Float;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Mutex;

use crate::builder::KnnGraphBuilder;
use crate::error::BuildError;
use crate::progress::Progress;

/////////////
// Helpers //
/////////////

/// Median of a slice of projection scalars
///
/// Mean of the two central order statistics for even lengths. Works on a
/// sorted copy; NaNs (which cannot arise from finite input) compare equal.
fn median<T: Float>(values: &[T]) -> T {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / (T::one() + T::one())
    }
}

///////////////////////
// Projection forest //
///////////////////////

impl<T> KnnGraphBuilder<T>
where
    T: Float + Send + Sync,
{
    /// Build the forest of random projection trees
    ///
    /// Runs `n_trees` independent tree builds in parallel, each with its own
    /// seeded RNG stream drawn from a master RNG. Candidate buffers are
    /// seeded with the point's own index and grown under a single global
    /// mutex covering leaf appends and the post-tree reductions. After every
    /// tree other than the first, each buffer is sorted and deduplicated; a
    /// buffer below three entries at that moment marks the data as
    /// degenerate and fails the build.
    ///
    /// ### Params
    ///
    /// * `threshold` - Leaf size; sets below it record all ordered pairs
    /// * `n_trees` - Number of trees to build
    /// * `max_recursion` - Hard cap on tree depth
    /// * `seed` - Master seed; per-tree streams derive from it
    /// * `progress` - Shared progress handle, polled for aborts
    ///
    /// ### Returns
    ///
    /// The per-point candidate buffers, sorted and deduplicated.
    pub(crate) fn search_forest(
        &self,
        threshold: usize,
        n_trees: usize,
        max_recursion: usize,
        seed: usize,
        progress: &Progress,
    ) -> Result<Vec<Vec<usize>>, BuildError> {
        let mut rng = StdRng::seed_from_u64(seed as u64);
        let tree_seeds: Vec<u64> = (0..n_trees).map(|_| rng.random()).collect();

        let buffers: Mutex<Vec<Vec<usize>>> = Mutex::new((0..self.n).map(|i| vec![i]).collect());
        let all_indices: Vec<usize> = (0..self.n).collect();

        tree_seeds
            .into_par_iter()
            .enumerate()
            .try_for_each(|(t, tree_seed)| {
                if progress.check_abort() {
                    return Ok(());
                }

                let mut tree_rng = StdRng::seed_from_u64(tree_seed);
                self.search_tree(
                    &all_indices,
                    max_recursion,
                    threshold,
                    &buffers,
                    &mut tree_rng,
                    progress,
                )?;

                if t > 0 && !progress.check_abort() {
                    let mut buffers = buffers.lock().unwrap();
                    for (i, buffer) in buffers.iter_mut().enumerate() {
                        buffer.sort_unstable();
                        buffer.dedup();
                        if buffer.len() < 3 {
                            return Err(BuildError::DegenerateData {
                                index: i,
                                found: buffer.len(),
                            });
                        }
                    }
                }

                Ok(())
            })?;

        let mut buffers = buffers.into_inner().unwrap();

        // The per-tree reductions race with appends from in-flight trees, so
        // whichever tree finished last may have left unsorted duplicates.
        // Normalise once more so downstream passes see sorted, unique sets.
        if !progress.check_abort() {
            for buffer in buffers.iter_mut() {
                buffer.sort_unstable();
                buffer.dedup();
            }
        }

        Ok(buffers)
    }

    /// Recursively partition an index set by random hyperplanes
    ///
    /// At each internal node two distinct anchor points are drawn; the
    /// hyperplane through their midpoint with the normalised difference as
    /// normal splits the set at the median projection. Sets whose median
    /// split collapses (collinear or heavily tied projections, or coincident
    /// anchors) fall back to a positional split with a one-element overlap,
    /// which keeps both halves at two or more points. Leaves record every
    /// co-located pair as mutual candidates.
    ///
    /// ### Params
    ///
    /// * `indices` - The index set to partition
    /// * `remaining` - Remaining recursion depth
    /// * `threshold` - Leaf size
    /// * `buffers` - Shared candidate buffers, locked per append batch
    /// * `rng` - This tree's RNG stream
    /// * `progress` - Shared progress handle
    fn search_tree(
        &self,
        indices: &[usize],
        remaining: usize,
        threshold: usize,
        buffers: &Mutex<Vec<Vec<usize>>>,
        rng: &mut StdRng,
        progress: &Progress,
    ) -> Result<(), BuildError> {
        if progress.check_abort() {
            return Ok(());
        }

        let count = indices.len();
        if count < 2 {
            return Err(BuildError::TreeSplit);
        }
        if count == 2 {
            let mut buffers = buffers.lock().unwrap();
            buffers[indices[0]].push(indices[1]);
            buffers[indices[1]].push(indices[0]);
            return Ok(());
        }
        if count < threshold || remaining == 0 {
            {
                let mut buffers = buffers.lock().unwrap();
                for (pos_a, &a) in indices.iter().enumerate() {
                    let buffer = &mut buffers[a];
                    buffer.reserve(count - 1);
                    for (pos_b, &b) in indices.iter().enumerate() {
                        if pos_a != pos_b {
                            buffer.push(b);
                        }
                    }
                }
            }
            progress.increment(count);
            return Ok(());
        }

        // Random hyperplane through two distinct anchors
        let p_pos = rng.random_range(0..count);
        let mut q_pos = rng.random_range(0..count);
        if indices[p_pos] == indices[q_pos] {
            q_pos = (q_pos + 1) % count;
        }

        let x_p = self.vector(indices[p_pos]);
        let x_q = self.vector(indices[q_pos]);

        let mut normal: Vec<T> = x_p.iter().zip(x_q.iter()).map(|(&a, &b)| a - b).collect();
        let norm = normal
            .iter()
            .map(|&d| d * d)
            .fold(T::zero(), |acc, x| acc + x)
            .sqrt();

        let two = T::one() + T::one();
        let (left, right) = if norm > T::zero() {
            for v in normal.iter_mut() {
                *v = *v / norm;
            }
            let base: Vec<T> = x_p
                .iter()
                .zip(x_q.iter())
                .map(|(&a, &b)| (a + b) / two)
                .collect();

            let projections: Vec<T> = indices
                .iter()
                .map(|&s| {
                    self.vector(s)
                        .iter()
                        .zip(base.iter())
                        .zip(normal.iter())
                        .map(|((&x, &m), &v)| (x - m) * v)
                        .fold(T::zero(), |acc, x| acc + x)
                })
                .collect();

            let middle = median(&projections);
            let mut left = Vec::new();
            let mut right = Vec::new();
            for (pos, &s) in indices.iter().enumerate() {
                if projections[pos] > middle {
                    left.push(s);
                } else {
                    right.push(s);
                }
            }
            (left, right)
        } else {
            // coincident anchors, no usable direction
            (Vec::new(), Vec::new())
        };

        if left.len() >= 2 && right.len() >= 2 {
            self.search_tree(&left, remaining - 1, threshold, buffers, rng, progress)?;
            self.search_tree(&right, remaining - 1, threshold, buffers, rng, progress)?;
        } else {
            // Degenerate projection: positional split with a one-element
            // overlap at the middle, so a three-point set still yields two
            // splittable pairs.
            let half = count / 2;
            self.search_tree(
                &indices[..half + 1],
                remaining - 1,
                threshold,
                buffers,
                rng,
                progress,
            )?;
            self.search_tree(
                &indices[half..],
                remaining - 1,
                threshold,
                buffers,
                rng,
                progress,
            )?;
        }

        Ok(())
    }
}

///////////
// Tests //
///////////
