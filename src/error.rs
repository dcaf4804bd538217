use thiserror::Error;

/// Fatal conditions terminating a graph build
///
/// All variants signal either a bug or data too pathological for the
/// algorithm; there is no local recovery. A user abort is not an error and
/// surfaces as an empty `NeighbourMatrix` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Tree recursion was invoked on fewer than two points
    #[error("tree split failure: recursion reached a set of fewer than two points")]
    TreeSplit,

    /// A candidate buffer stayed below three entries after merging trees
    #[error("degenerate data: candidate buffer of point {index} holds {found} entries after tree merge")]
    DegenerateData { index: usize, found: usize },

    /// A point ended a phase without a single usable neighbour
    #[error("empty neighbourhood for point {index}")]
    EmptyNeighbourhood { index: usize },
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BuildError::DegenerateData { index: 7, found: 2 };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('2'));

        let err = BuildError::EmptyNeighbourhood { index: 3 };
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(BuildError::TreeSplit, BuildError::TreeSplit);
        assert_ne!(
            BuildError::TreeSplit,
            BuildError::EmptyNeighbourhood { index: 0 }
        );
    }
}
