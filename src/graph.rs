/// Sentinel marking an unused slot in the neighbour matrix
pub const NO_NEIGHBOUR: i64 = -1;

/// Dense column-major neighbour index matrix
///
/// Column `i` holds up to `k` neighbour indices of point `i`; unused slots
/// carry the `NO_NEIGHBOUR` sentinel. Columns are written from slot 0
/// downwards, so the first sentinel terminates the column. Because the
/// storage is column-major, columns are contiguous and serve as independent
/// work units for parallel writers.
///
/// ### Fields
///
/// * `k` - Number of rows (neighbour slots per point)
/// * `n` - Number of columns (points)
/// * `data` - Flat column-major storage of length `k * n`
#[derive(Clone, Debug)]
pub struct NeighbourMatrix {
    k: usize,
    n: usize,
    data: Vec<i64>,
}

impl NeighbourMatrix {
    /// Create a `k` x `n` matrix with every slot set to `NO_NEIGHBOUR`
    pub fn filled(k: usize, n: usize) -> Self {
        NeighbourMatrix {
            k,
            n,
            data: vec![NO_NEIGHBOUR; k * n],
        }
    }

    /// Create the empty matrix returned from aborted builds
    pub fn empty() -> Self {
        NeighbourMatrix {
            k: 0,
            n: 0,
            data: Vec::new(),
        }
    }

    /// Does the matrix hold no columns at all?
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Number of neighbour slots per point
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of points
    pub fn n(&self) -> usize {
        self.n
    }

    /// Column `i` as a raw slice, sentinels included
    #[inline]
    pub fn col(&self, i: usize) -> &[i64] {
        &self.data[i * self.k..(i + 1) * self.k]
    }

    /// Iterate over the valid neighbour indices of point `i`
    ///
    /// Stops at the first sentinel. Intra-column order is an implementation
    /// detail and callers must not rely on it.
    #[inline]
    pub fn neighbours(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.col(i)
            .iter()
            .take_while(|&&v| v != NO_NEIGHBOUR)
            .map(|&v| v as usize)
    }

    /// Mutable flat storage for column-disjoint parallel writes
    pub(crate) fn data_mut(&mut self) -> &mut [i64] {
        &mut self.data
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_matrix() {
        let m = NeighbourMatrix::filled(3, 4);
        assert_eq!(m.k(), 3);
        assert_eq!(m.n(), 4);
        assert!(!m.is_empty());

        for i in 0..4 {
            assert_eq!(m.col(i), &[NO_NEIGHBOUR; 3]);
            assert_eq!(m.neighbours(i).count(), 0);
        }
    }

    #[test]
    fn test_empty_matrix() {
        let m = NeighbourMatrix::empty();
        assert!(m.is_empty());
        assert_eq!(m.k(), 0);
        assert_eq!(m.n(), 0);
    }

    #[test]
    fn test_neighbours_stop_at_sentinel() {
        let mut m = NeighbourMatrix::filled(4, 2);
        {
            let data = m.data_mut();
            // column 0: two valid entries, then sentinels
            data[0] = 7;
            data[1] = 2;
            // column 1: full
            data[4] = 1;
            data[5] = 0;
            data[6] = 3;
            data[7] = 5;
        }

        let col0: Vec<usize> = m.neighbours(0).collect();
        assert_eq!(col0, vec![7, 2]);

        let col1: Vec<usize> = m.neighbours(1).collect();
        assert_eq!(col1, vec![1, 0, 3, 5]);
    }

    #[test]
    fn test_columns_are_disjoint_chunks() {
        let mut m = NeighbourMatrix::filled(2, 3);
        let k = m.k();
        for (i, chunk) in m.data_mut().chunks_mut(k).enumerate() {
            chunk[0] = i as i64 + 10;
        }

        assert_eq!(m.col(0)[0], 10);
        assert_eq!(m.col(1)[0], 11);
        assert_eq!(m.col(2)[0], 12);
    }
}
