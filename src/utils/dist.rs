use num_traits::Float;

////////////
// Helper //
////////////

/// Enum for the distance metric to use
#[derive(Clone, Debug, Copy, PartialEq, Default)]
pub enum Dist {
    /// Euclidean distance
    #[default]
    Euclidean,
    /// Cosine distance
    Cosine,
}

/// Parsing the distance metric
///
/// Currently, only Cosine and Euclidean are supported. Callers that need
/// the "unknown means Euclidean" contract combine this with
/// `unwrap_or_default()`.
///
/// ### Params
///
/// * `s` - The string naming the metric, case-insensitive
///
/// ### Returns
///
/// The `Dist` to use for the neighbour search, or `None` for unknown names.
pub fn parse_ann_dist(s: &str) -> Option<Dist> {
    match s.to_lowercase().as_str() {
        "euclidean" => Some(Dist::Euclidean),
        "cosine" => Some(Dist::Cosine),
        _ => None,
    }
}

////////////////////
// VectorDistance //
////////////////////

/// Trait computing distances between internally stored vectors
///
/// Implementors store their vectors flattened row-major per sample, which
/// keeps the hot loops over contiguous memory.
pub trait VectorDistance<T>
where
    T: Float,
{
    /// Get the internal flat vector representation
    fn vectors_flat(&self) -> &[T];

    /// Get the internal dimensions
    fn dim(&self) -> usize;

    /// Get the pre-computed norms (empty unless the metric needs them)
    fn norms(&self) -> &[T];

    ///////////////
    // Euclidean //
    ///////////////

    /// Euclidean distance between two internal vectors (squared)
    ///
    /// ### Implementation note
    ///
    /// Uses iterator-based approach which allows LLVM to auto-vectorise
    /// optimally for the target CPU. Returns squared distance to avoid
    /// expensive sqrt - sufficient for comparison purposes, and every use
    /// in this crate is comparative.
    ///
    /// ### Params
    ///
    /// * `i` - Sample index i
    /// * `j` - Sample index j
    ///
    /// ### Safety
    ///
    /// Uses unsafe to retrieve the data in an unchecked manner for maximum
    /// performance.
    ///
    /// ### Returns
    ///
    /// The squared Euclidean distance between the two samples
    #[inline(always)]
    fn euclidean_distance(&self, i: usize, j: usize) -> T {
        let start_i = i * self.dim();
        let start_j = j * self.dim();
        unsafe {
            let vec_i = self
                .vectors_flat()
                .get_unchecked(start_i..start_i + self.dim());
            let vec_j = self
                .vectors_flat()
                .get_unchecked(start_j..start_j + self.dim());
            vec_i
                .iter()
                .zip(vec_j.iter())
                .map(|(&a, &b)| {
                    let diff = a - b;
                    diff * diff
                })
                .fold(T::zero(), |acc, x| acc + x)
        }
    }

    ////////////
    // Cosine //
    ////////////

    /// Cosine distance between two internal vectors
    ///
    /// Uses pre-computed norms. A zero-norm vector has no defined angle;
    /// the pair then gets `T::infinity()`, which sorts behind every real
    /// candidate.
    ///
    /// ### Params
    ///
    /// * `i` - Sample index i
    /// * `j` - Sample index j
    ///
    /// ### Safety
    ///
    /// Uses unsafe to retrieve the data in an unchecked manner for maximum
    /// performance.
    ///
    /// ### Returns
    ///
    /// The Cosine distance between the two samples
    #[inline(always)]
    fn cosine_distance(&self, i: usize, j: usize) -> T {
        let start_i = i * self.dim();
        let start_j = j * self.dim();

        let denom = self.norms()[i] * self.norms()[j];
        if denom == T::zero() {
            return T::infinity();
        }

        unsafe {
            let vec_i = self
                .vectors_flat()
                .get_unchecked(start_i..start_i + self.dim());
            let vec_j = self
                .vectors_flat()
                .get_unchecked(start_j..start_j + self.dim());

            let dot = vec_i
                .iter()
                .zip(vec_j.iter())
                .map(|(&a, &b)| a * b)
                .fold(T::zero(), |acc, x| acc + x);

            T::one() - (dot / denom)
        }
    }
}

///////////
// Tests //
///////////
