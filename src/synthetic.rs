use faer::traits::ComplexField;
use faer::Mat;
use num_traits::{Float, FromPrimitive};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Generate synthetic data with cluster structure
///
/// Creates Gaussian clusters with well-separated centres, useful for
/// checking that a neighbour graph keeps points inside their cluster.
///
/// ### Params
///
/// * `n_samples` - Number of points
/// * `dim` - Embedding dimensionality
/// * `n_clusters` - Number of distinct clusters
/// * `cluster_std` - Standard deviation within clusters
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// Matrix of shape (n_samples, dim)
pub fn generate_clustered_data<T>(
    n_samples: usize,
    dim: usize,
    n_clusters: usize,
    cluster_std: f64,
    seed: u64,
) -> Mat<T>
where
    T: Float + FromPrimitive + ComplexField,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Mat::<T>::zeros(n_samples, dim);

    let centres: Vec<Vec<f64>> = (0..n_clusters)
        .map(|_| (0..dim).map(|_| rng.random_range(-5.0..5.0)).collect())
        .collect();

    // round-robin assignment, shuffled so clusters are not index-sorted
    let mut assignments: Vec<usize> = (0..n_samples).map(|i| i % n_clusters).collect();
    assignments.shuffle(&mut rng);

    for (i, &cluster_idx) in assignments.iter().enumerate() {
        let centre = &centres[cluster_idx];

        for j in 0..dim {
            // Box-Muller for Gaussian noise
            let u1: f64 = rng.random();
            let u2: f64 = rng.random();
            let noise = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();

            data[(i, j)] = T::from_f64(centre[j] + noise * cluster_std).unwrap();
        }
    }

    data
}

/// Generate uniform random data on the unit cube
///
/// ### Params
///
/// * `n_samples` - Number of points
/// * `dim` - Embedding dimensionality
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// Matrix of shape (n_samples, dim) with entries in [0, 1)
pub fn generate_uniform_data<T>(n_samples: usize, dim: usize, seed: u64) -> Mat<T>
where
    T: Float + FromPrimitive + ComplexField,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Mat::<T>::zeros(n_samples, dim);

    for i in 0..n_samples {
        for j in 0..dim {
            data[(i, j)] = T::from_f64(rng.random::<f64>()).unwrap();
        }
    }

    data
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clustered_data_shape() {
        let data = generate_clustered_data::<f64>(50, 4, 3, 0.5, 42);
        assert_eq!(data.nrows(), 50);
        assert_eq!(data.ncols(), 4);
    }

    #[test]
    fn test_clustered_data_reproducible() {
        let a = generate_clustered_data::<f64>(20, 3, 2, 1.0, 7);
        let b = generate_clustered_data::<f64>(20, 3, 2, 1.0, 7);

        for i in 0..20 {
            for j in 0..3 {
                assert_eq!(a[(i, j)], b[(i, j)]);
            }
        }
    }

    #[test]
    fn test_uniform_data_in_unit_cube() {
        let data = generate_uniform_data::<f32>(100, 5, 11);
        for i in 0..100 {
            for j in 0..5 {
                let v = data[(i, j)];
                assert!((0.0..1.0).contains(&v));
            }
        }
    }
}
