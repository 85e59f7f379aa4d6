use crate::{element::Index, error::Error};

/// Memory layout of an in-memory backend.
///
/// For the dense backend this decides which dimension is contiguous in
/// storage. For the compressed sparse backends it distinguishes the
/// compressed-sparse-row from the compressed-sparse-column format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageOrder {
    /// Rows are contiguous (dense) or compressed (sparse).
    RowMajor,
    /// Columns are contiguous (dense) or compressed (sparse).
    ColumnMajor,
}

/// Options for accessing matrix elements, fixed at extractor construction.
#[derive(Clone, Debug)]
pub struct Options {
    /// Whether sparse extractors should produce the values of the structural
    /// non-zeros. If `false`, implementations may skip the value load and the
    /// returned value stream is absent.
    pub sparse_extract_value: bool,
    /// Whether sparse extractors should produce the indices of the structural
    /// non-zeros. If `false`, implementations may skip the index load and the
    /// returned index stream is absent.
    pub sparse_extract_index: bool,
    /// Whether the indices returned by sparse extractors must be strictly
    /// increasing. Setting this to `false` permits implementations to skip a
    /// sort; it must not change which entries are returned.
    pub sparse_ordered_index: bool,
    /// Hint that the extractor will be asked for the same target indices more
    /// than once, so per-target auxiliary state (for example resolved
    /// lower-bound positions) is worth memoising.
    pub cache_for_reuse: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sparse_extract_value: true,
            sparse_extract_index: true,
            sparse_ordered_index: true,
            cache_for_reuse: false,
        }
    }
}

/// Selection of elements along the non-target dimension, fixed at extractor
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection<I> {
    /// Every element of the non-target dimension.
    Full,
    /// A contiguous range of `length` elements starting at `start`.
    Block {
        /// First selected position.
        start: I,
        /// Number of selected positions.
        length: I,
    },
    /// An explicit, strictly increasing set of positions.
    Index(Vec<I>),
}

impl<I: Index> Selection<I> {
    /// Number of elements this selection picks out of a dimension of the
    /// given extent. This is the `extracted_length` of any extractor built
    /// with the selection.
    pub fn length(&self, extent: I) -> usize {
        match self {
            Selection::Full => Index::to_usize(extent),
            Selection::Block { length, .. } => Index::to_usize(*length),
            Selection::Index(indices) => indices.len(),
        }
    }

    /// Checks the selection against the extent of the dimension it applies
    /// to. Factories call this once at extractor construction.
    pub(crate) fn validate(&self, extent: I) -> Result<(), Error> {
        match self {
            Selection::Full => Ok(()),
            Selection::Block { start, length } => {
                let end = Index::to_usize(*start) + Index::to_usize(*length);
                if end > Index::to_usize(extent) {
                    return Err(Error::OutOfRange {
                        index: end,
                        extent: Index::to_usize(extent),
                    });
                }
                Ok(())
            }
            Selection::Index(indices) => {
                if indices.windows(2).any(|pair| pair[0] >= pair[1]) {
                    return Err(Error::invalid_shape(
                        "selection indices should be strictly increasing",
                    ));
                }
                if let Some(&last) = indices.last() {
                    if Index::to_usize(last) >= Index::to_usize(extent) {
                        return Err(Error::OutOfRange {
                            index: Index::to_usize(last),
                            extent: Index::to_usize(extent),
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn block_within_extent_is_accepted() {
        let selection = Selection::Block {
            start: 2u32,
            length: 3,
        };
        assert!(selection.validate(5).is_ok());
        assert_eq!(3, selection.length(5));
    }

    #[test]
    fn block_reaching_past_extent_is_rejected() {
        let selection = Selection::Block {
            start: 3u32,
            length: 3,
        };
        assert!(matches!(
            selection.validate(5),
            Err(Error::OutOfRange { index: 6, extent: 5 })
        ));
    }

    #[test]
    fn unsorted_index_set_is_rejected() {
        let selection = Selection::Index(vec![1u32, 1, 2]);
        assert!(matches!(selection.validate(5), Err(Error::InvalidShape(_))));
    }

    #[test]
    fn index_past_extent_is_rejected() {
        let selection = Selection::Index(vec![1u32, 5]);
        assert!(matches!(
            selection.validate(5),
            Err(Error::OutOfRange { index: 5, extent: 5 })
        ));
    }
}
