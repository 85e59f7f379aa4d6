use log::debug;

use crate::{
    element::{Index, Value},
    error::Error,
    extractor::{DenseExtractor, SparseExtractor, SparseRange},
    matrix::Matrix,
    options::{Options, Selection, StorageOrder},
    sparse::secondary::{CursorKind, PlainCursor, SecondaryWalker},
};

/// In-memory compressed sparse matrix, CSR or CSC.
///
/// Three parallel containers describe the structural non-zeros: `values`,
/// their within-slab `indices`, and `pointers` delimiting the slab of each
/// primary element, where the primary dimension is the rows for CSR and the
/// columns for CSC.
///
/// Extraction along the primary dimension reduces to bounded scans over one
/// slab and returns interior slices where it can. Extraction along the
/// secondary dimension runs through a stateful walker that keeps one cursor
/// per selected slab; consecutive secondary accesses move each cursor by a
/// constant amount on average.
#[derive(Debug, Clone)]
pub struct CompressedSparseMatrix<V, I = u32> {
    nrows: I,
    ncols: I,
    values: Vec<V>,
    indices: Vec<I>,
    pointers: Vec<usize>,
    order: StorageOrder,
}

impl<V: Value, I: Index> CompressedSparseMatrix<V, I> {
    /// Creates a compressed sparse matrix over the given containers.
    ///
    /// Checks that `values` and `indices` have the same length, that
    /// `pointers` has one entry per primary element plus one, is
    /// non-decreasing and starts at zero and ends at the number of non-zeros,
    /// and that the indices are strictly increasing within each slab. Any
    /// violation is an [`Error::InvalidShape`].
    pub fn new(
        nrows: I,
        ncols: I,
        values: Vec<V>,
        indices: Vec<I>,
        pointers: Vec<usize>,
        order: StorageOrder,
    ) -> Result<Self, Error> {
        if values.len() != indices.len() {
            return Err(Error::invalid_shape(
                "'values' and 'indices' should be of the same length",
            ));
        }
        let matrix = CompressedSparseMatrix {
            nrows,
            ncols,
            values,
            indices,
            pointers,
            order,
        };
        matrix.check_pointers(|slab| {
            if slab.windows(2).any(|pair| pair[0] >= pair[1]) {
                Err(match matrix.order {
                    StorageOrder::RowMajor => {
                        "'indices' should be strictly increasing within each row"
                    }
                    StorageOrder::ColumnMajor => {
                        "'indices' should be strictly increasing within each column"
                    }
                })
            } else {
                Ok(())
            }
        })?;
        debug!(
            "compressed sparse matrix over {} x {}, {} non-zeros, {:?}",
            Index::to_usize(matrix.nrows),
            Index::to_usize(matrix.ncols),
            matrix.values.len(),
            matrix.order
        );
        Ok(matrix)
    }

    /// Creates a compressed sparse row matrix; `indices` hold column
    /// positions and `pointers` delimit rows.
    pub fn csr(
        nrows: I,
        ncols: I,
        values: Vec<V>,
        indices: Vec<I>,
        pointers: Vec<usize>,
    ) -> Result<Self, Error> {
        Self::new(nrows, ncols, values, indices, pointers, StorageOrder::RowMajor)
    }

    /// Creates a compressed sparse column matrix; `indices` hold row
    /// positions and `pointers` delimit columns.
    pub fn csc(
        nrows: I,
        ncols: I,
        values: Vec<V>,
        indices: Vec<I>,
        pointers: Vec<usize>,
    ) -> Result<Self, Error> {
        Self::new(nrows, ncols, values, indices, pointers, StorageOrder::ColumnMajor)
    }

    fn check_pointers(
        &self,
        check_slab: impl Fn(&[I]) -> Result<(), &'static str>,
    ) -> Result<(), Error> {
        let major = self.major_extent();
        if self.pointers.len() != major + 1 {
            return Err(Error::invalid_shape(match self.order {
                StorageOrder::RowMajor => "length of 'pointers' should be equal to 'nrows + 1'",
                StorageOrder::ColumnMajor => "length of 'pointers' should be equal to 'ncols + 1'",
            }));
        }
        if self.pointers[0] != 0 {
            return Err(Error::invalid_shape(
                "first element of 'pointers' should be zero",
            ));
        }
        if self.pointers[major] != self.indices.len() {
            return Err(Error::invalid_shape(
                "last element of 'pointers' should be equal to the number of non-zeros",
            ));
        }
        for primary in 0..major {
            let lower = self.pointers[primary];
            let upper = self.pointers[primary + 1];
            if upper < lower {
                return Err(Error::invalid_shape(
                    "'pointers' should be in non-decreasing order",
                ));
            }
            if upper > self.indices.len() {
                return Err(Error::invalid_shape(
                    "'pointers' should not exceed the number of non-zeros",
                ));
            }
            check_slab(&self.indices[lower..upper]).map_err(Error::invalid_shape)?;
        }
        Ok(())
    }

    fn major_extent(&self) -> usize {
        match self.order {
            StorageOrder::RowMajor => Index::to_usize(self.nrows),
            StorageOrder::ColumnMajor => Index::to_usize(self.ncols),
        }
    }

    fn minor_extent(&self) -> usize {
        match self.order {
            StorageOrder::RowMajor => Index::to_usize(self.ncols),
            StorageOrder::ColumnMajor => Index::to_usize(self.nrows),
        }
    }

    /// Resolves one primary slab against a contiguous range of the minor
    /// dimension, as a `(storage offset, count)` pair. With a cache attached,
    /// the resolved pair is memoised per primary element.
    fn primary_range(
        &self,
        primary: usize,
        start: I,
        length: usize,
        cache: &mut [(usize, usize)],
    ) -> (usize, usize) {
        if let Some(&cached) = cache.get(primary) {
            if cached.0 != usize::MAX {
                return cached;
            }
        }
        let slab_start = self.pointers[primary];
        let slab = &self.indices[slab_start..self.pointers[primary + 1]];
        let lower = if start > I::zero() {
            slab.partition_point(|&stored| stored < start)
        } else {
            0
        };
        let end = Index::to_usize(start) + length;
        let upper = if end != self.minor_extent() {
            let wanted = I::from_usize(end);
            lower + slab[lower..].partition_point(|&stored| stored < wanted)
        } else {
            slab.len()
        };
        let resolved = (slab_start + lower, upper - lower);
        if let Some(slot) = cache.get_mut(primary) {
            *slot = resolved;
        }
        resolved
    }

    /// Merges a sorted subset of the minor dimension against one primary
    /// slab. `visit` sees every subset position in order until the slab is
    /// exhausted, with the storage position of its entry if there is one.
    fn primary_indexed(
        &self,
        primary: usize,
        subset: &[I],
        cache: &mut [usize],
        mut visit: impl FnMut(I, Option<usize>),
    ) {
        if subset.is_empty() {
            return;
        }
        let slab_end = self.pointers[primary + 1];
        let mut position = self.pointers[primary];
        if subset[0] > I::zero() {
            let jump = |indices: &[I]| indices.partition_point(|&stored| stored < subset[0]);
            if let Some(slot) = cache.get_mut(primary) {
                if *slot == usize::MAX {
                    *slot = jump(&self.indices[position..slab_end]);
                }
                position += *slot;
            } else {
                position += jump(&self.indices[position..slab_end]);
            }
        }
        if position == slab_end {
            return;
        }
        for &wanted in subset {
            while position < slab_end && wanted > self.indices[position] {
                position += 1;
            }
            if position == slab_end {
                break;
            }
            if wanted == self.indices[position] {
                visit(wanted, Some(position));
            } else {
                visit(wanted, None);
            }
        }
    }
}

impl<V: Value, I: Index> Matrix<V, I> for CompressedSparseMatrix<V, I> {
    fn nrow(&self) -> I {
        self.nrows
    }

    fn ncol(&self) -> I {
        self.ncols
    }

    fn is_sparse(&self) -> bool {
        true
    }

    fn prefer_rows(&self) -> bool {
        self.order == StorageOrder::RowMajor
    }

    fn dense_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        selection.validate(self.ncols)?;
        if self.order == StorageOrder::RowMajor {
            Ok(Box::new(PrimaryDenseExtractor::new(self, selection, options)))
        } else {
            Ok(Box::new(SecondaryDenseExtractor::new(self, selection)))
        }
    }

    fn dense_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        selection.validate(self.nrows)?;
        if self.order == StorageOrder::ColumnMajor {
            Ok(Box::new(PrimaryDenseExtractor::new(self, selection, options)))
        } else {
            Ok(Box::new(SecondaryDenseExtractor::new(self, selection)))
        }
    }

    fn sparse_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        selection.validate(self.ncols)?;
        if self.order == StorageOrder::RowMajor {
            Ok(Box::new(PrimarySparseExtractor::new(self, selection, options)))
        } else {
            Ok(Box::new(SecondarySparseExtractor::new(self, selection, options)))
        }
    }

    fn sparse_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        selection.validate(self.nrows)?;
        if self.order == StorageOrder::ColumnMajor {
            Ok(Box::new(PrimarySparseExtractor::new(self, selection, options)))
        } else {
            Ok(Box::new(SecondarySparseExtractor::new(self, selection, options)))
        }
    }
}

/// Lower-bound cache shared by the primary extractors: resolved `(offset,
/// count)` pairs for the block path, resolved jumps for the indexed path.
/// Only spawned when `cache_for_reuse` is set and the selection does not
/// start at the beginning of the minor dimension, since a selection from
/// position zero needs no lower-bound search in the first place.
fn spawn_block_cache<I: Index>(
    options: &Options,
    selection: &Selection<I>,
    major: usize,
) -> Vec<(usize, usize)> {
    let wanted = match selection {
        Selection::Block { start, .. } => options.cache_for_reuse && *start > I::zero(),
        _ => false,
    };
    if wanted {
        vec![(usize::MAX, 0); major]
    } else {
        Vec::new()
    }
}

fn spawn_index_cache<I: Index>(
    options: &Options,
    selection: &Selection<I>,
    major: usize,
) -> Vec<usize> {
    let wanted = match selection {
        Selection::Index(subset) => {
            options.cache_for_reuse && subset.first().is_some_and(|&first| first > I::zero())
        }
        _ => false,
    };
    if wanted {
        vec![usize::MAX; major]
    } else {
        Vec::new()
    }
}

fn check_target<I: Index>(target: I, extent: usize) -> Result<usize, Error> {
    if Index::to_usize(target) >= extent {
        Err(Error::OutOfRange {
            index: Index::to_usize(target),
            extent,
        })
    } else {
        Ok(Index::to_usize(target))
    }
}

struct PrimaryDenseExtractor<'a, V, I> {
    matrix: &'a CompressedSparseMatrix<V, I>,
    selection: Selection<I>,
    length: usize,
    block_cache: Vec<(usize, usize)>,
    index_cache: Vec<usize>,
}

impl<'a, V: Value, I: Index> PrimaryDenseExtractor<'a, V, I> {
    fn new(
        matrix: &'a CompressedSparseMatrix<V, I>,
        selection: Selection<I>,
        options: &Options,
    ) -> Self {
        let length = selection.length(I::from_usize(matrix.minor_extent()));
        let block_cache = spawn_block_cache(options, &selection, matrix.major_extent());
        let index_cache = spawn_index_cache(options, &selection, matrix.major_extent());
        PrimaryDenseExtractor {
            matrix,
            selection,
            length,
            block_cache,
            index_cache,
        }
    }
}

impl<V: Value, I: Index> DenseExtractor<V, I> for PrimaryDenseExtractor<'_, V, I> {
    fn extracted_length(&self) -> usize {
        self.length
    }

    fn fetch<'s>(&'s mut self, target: I, buffer: &'s mut [V]) -> Result<&'s [V], Error> {
        let primary = check_target(target, self.matrix.major_extent())?;
        let out = &mut buffer[..self.length];
        out.fill(V::zero());
        match &self.selection {
            Selection::Full | Selection::Block { .. } => {
                let start = match &self.selection {
                    Selection::Block { start, .. } => *start,
                    _ => I::zero(),
                };
                let (offset, count) =
                    self.matrix
                        .primary_range(primary, start, self.length, &mut self.block_cache);
                for entry in 0..count {
                    let position = Index::to_usize(self.matrix.indices[offset + entry]);
                    out[position - Index::to_usize(start)] = self.matrix.values[offset + entry];
                }
            }
            Selection::Index(subset) => {
                let matrix = self.matrix;
                let mut slot = 0;
                matrix.primary_indexed(primary, subset, &mut self.index_cache, |_, found| {
                    if let Some(position) = found {
                        out[slot] = matrix.values[position];
                    }
                    slot += 1;
                });
            }
        }
        Ok(out)
    }
}

struct PrimarySparseExtractor<'a, V, I> {
    matrix: &'a CompressedSparseMatrix<V, I>,
    selection: Selection<I>,
    length: usize,
    needs_value: bool,
    needs_index: bool,
    block_cache: Vec<(usize, usize)>,
    index_cache: Vec<usize>,
}

impl<'a, V: Value, I: Index> PrimarySparseExtractor<'a, V, I> {
    fn new(
        matrix: &'a CompressedSparseMatrix<V, I>,
        selection: Selection<I>,
        options: &Options,
    ) -> Self {
        let length = selection.length(I::from_usize(matrix.minor_extent()));
        let block_cache = spawn_block_cache(options, &selection, matrix.major_extent());
        let index_cache = spawn_index_cache(options, &selection, matrix.major_extent());
        PrimarySparseExtractor {
            matrix,
            selection,
            length,
            needs_value: options.sparse_extract_value,
            needs_index: options.sparse_extract_index,
            block_cache,
            index_cache,
        }
    }
}

impl<V: Value, I: Index> SparseExtractor<V, I> for PrimarySparseExtractor<'_, V, I> {
    fn extracted_length(&self) -> usize {
        self.length
    }

    fn fetch<'s>(
        &'s mut self,
        target: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> Result<SparseRange<'s, V, I>, Error> {
        let primary = check_target(target, self.matrix.major_extent())?;
        match &self.selection {
            Selection::Full | Selection::Block { .. } => {
                let start = match &self.selection {
                    Selection::Block { start, .. } => *start,
                    _ => I::zero(),
                };
                let (offset, count) =
                    self.matrix
                        .primary_range(primary, start, self.length, &mut self.block_cache);
                // Interior slices of the storage; nothing is copied here.
                Ok(SparseRange {
                    number: count,
                    value: self
                        .needs_value
                        .then(|| &self.matrix.values[offset..offset + count]),
                    index: self
                        .needs_index
                        .then(|| &self.matrix.indices[offset..offset + count]),
                })
            }
            Selection::Index(subset) => {
                let matrix = self.matrix;
                let needs_value = self.needs_value;
                let needs_index = self.needs_index;
                let mut number = 0;
                matrix.primary_indexed(primary, subset, &mut self.index_cache, |wanted, found| {
                    if let Some(position) = found {
                        if needs_value {
                            values[number] = matrix.values[position];
                        }
                        if needs_index {
                            indices[number] = wanted;
                        }
                        number += 1;
                    }
                });
                Ok(SparseRange {
                    number,
                    value: needs_value.then(|| &values[..number]),
                    index: needs_index.then(|| &indices[..number]),
                })
            }
        }
    }
}

/// Builds the walker over the primary slabs picked out by the selection.
fn walker_for<V: Value, I: Index, C: CursorKind<I>>(
    matrix: &CompressedSparseMatrix<V, I>,
    selection: &Selection<I>,
) -> SecondaryWalker<I, C> {
    let max_index = I::from_usize(matrix.minor_extent());
    match selection {
        Selection::Full => SecondaryWalker::new(
            max_index,
            &matrix.indices,
            &matrix.pointers,
            0..matrix.major_extent(),
        ),
        Selection::Block { start, length } => SecondaryWalker::new(
            max_index,
            &matrix.indices,
            &matrix.pointers,
            Index::to_usize(*start)..Index::to_usize(*start) + Index::to_usize(*length),
        ),
        Selection::Index(subset) => SecondaryWalker::new(
            max_index,
            &matrix.indices,
            &matrix.pointers,
            subset.iter().map(|position| Index::to_usize(*position)),
        ),
    }
}

struct SecondaryDenseExtractor<'a, V, I: Index> {
    matrix: &'a CompressedSparseMatrix<V, I>,
    selection: Selection<I>,
    length: usize,
    walker: SecondaryWalker<I, PlainCursor>,
}

impl<'a, V: Value, I: Index> SecondaryDenseExtractor<'a, V, I> {
    fn new(matrix: &'a CompressedSparseMatrix<V, I>, selection: Selection<I>) -> Self {
        let length = selection.length(I::from_usize(matrix.major_extent()));
        let walker = walker_for(matrix, &selection);
        SecondaryDenseExtractor {
            matrix,
            selection,
            length,
            walker,
        }
    }
}

impl<V: Value, I: Index> DenseExtractor<V, I> for SecondaryDenseExtractor<'_, V, I> {
    fn extracted_length(&self) -> usize {
        self.length
    }

    fn fetch<'s>(&'s mut self, target: I, buffer: &'s mut [V]) -> Result<&'s [V], Error> {
        check_target(target, self.matrix.minor_extent())?;
        let out = &mut buffer[..self.length];
        out.fill(V::zero());
        let matrix = self.matrix;
        let walker = &mut self.walker;
        match &self.selection {
            Selection::Full => {
                walker.search(
                    target,
                    I::from_usize,
                    &matrix.indices,
                    &matrix.pointers,
                    |_, primary, cursor| out[Index::to_usize(primary)] = matrix.values[*cursor],
                    |_, _| {},
                );
            }
            Selection::Block { start, .. } => {
                let first = Index::to_usize(*start);
                walker.search(
                    target,
                    |slot| I::from_usize(first + slot),
                    &matrix.indices,
                    &matrix.pointers,
                    |_, primary, cursor| {
                        out[Index::to_usize(primary) - first] = matrix.values[*cursor]
                    },
                    |_, _| {},
                );
            }
            Selection::Index(subset) => {
                walker.search(
                    target,
                    |slot| subset[slot],
                    &matrix.indices,
                    &matrix.pointers,
                    |slot, _, cursor| out[slot] = matrix.values[*cursor],
                    |_, _| {},
                );
            }
        }
        Ok(out)
    }
}

struct SecondarySparseExtractor<'a, V, I: Index> {
    matrix: &'a CompressedSparseMatrix<V, I>,
    selection: Selection<I>,
    length: usize,
    needs_value: bool,
    needs_index: bool,
    walker: SecondaryWalker<I, PlainCursor>,
}

impl<'a, V: Value, I: Index> SecondarySparseExtractor<'a, V, I> {
    fn new(
        matrix: &'a CompressedSparseMatrix<V, I>,
        selection: Selection<I>,
        options: &Options,
    ) -> Self {
        let length = selection.length(I::from_usize(matrix.major_extent()));
        let walker = walker_for(matrix, &selection);
        SecondarySparseExtractor {
            matrix,
            selection,
            length,
            needs_value: options.sparse_extract_value,
            needs_index: options.sparse_extract_index,
            walker,
        }
    }
}

impl<V: Value, I: Index> SparseExtractor<V, I> for SecondarySparseExtractor<'_, V, I> {
    fn extracted_length(&self) -> usize {
        self.length
    }

    fn fetch<'s>(
        &'s mut self,
        target: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> Result<SparseRange<'s, V, I>, Error> {
        check_target(target, self.matrix.minor_extent())?;
        let matrix = self.matrix;
        let walker = &mut self.walker;
        let needs_value = self.needs_value;
        let needs_index = self.needs_index;
        let mut number = 0;
        {
            let mut store = |_: usize, primary: I, cursor: &mut usize| {
                if needs_value {
                    values[number] = matrix.values[*cursor];
                }
                if needs_index {
                    indices[number] = primary;
                }
                number += 1;
            };
            let skip = |_: usize, _: I| {};
            match &self.selection {
                Selection::Full => {
                    walker.search(
                        target,
                        I::from_usize,
                        &matrix.indices,
                        &matrix.pointers,
                        &mut store,
                        skip,
                    );
                }
                Selection::Block { start, .. } => {
                    let first = Index::to_usize(*start);
                    walker.search(
                        target,
                        |slot| I::from_usize(first + slot),
                        &matrix.indices,
                        &matrix.pointers,
                        &mut store,
                        skip,
                    );
                }
                Selection::Index(subset) => {
                    walker.search(
                        target,
                        |slot| subset[slot],
                        &matrix.indices,
                        &matrix.pointers,
                        &mut store,
                        skip,
                    );
                }
            }
        }
        Ok(SparseRange {
            number,
            value: needs_value.then(|| &values[..number]),
            index: needs_index.then(|| &indices[..number]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::SparseContents;

    /// The 4x4 matrix
    ///   [5 0 0 6]
    ///   [0 0 0 0]
    ///   [0 0 7 0]
    ///   [0 8 0 9]
    fn four_by_four_csr() -> CompressedSparseMatrix<i32, u32> {
        CompressedSparseMatrix::csr(
            4,
            4,
            vec![5, 6, 7, 8, 9],
            vec![0, 3, 2, 1, 3],
            vec![0, 2, 2, 3, 5],
        )
        .unwrap()
    }

    #[test]
    fn primary_rows_come_back_ordered_and_zero_copy() {
        let matrix = four_by_four_csr();
        let mut extractor = matrix.sparse_row(Selection::Full, &Options::default()).unwrap();
        assert_eq!(
            SparseContents {
                number: 2,
                value: vec![5, 6],
                index: vec![0, 3]
            },
            extractor.fetch_owned(0).unwrap()
        );
        assert_eq!(0, extractor.fetch_owned(1).unwrap().number);
        assert_eq!(
            SparseContents {
                number: 2,
                value: vec![8, 9],
                index: vec![1, 3]
            },
            extractor.fetch_owned(3).unwrap()
        );
        // Full selections borrow the storage instead of filling the buffers.
        let mut value_buffer = vec![0; 4];
        let mut index_buffer = vec![0; 4];
        let value_start = value_buffer.as_ptr();
        let range = extractor
            .fetch(0, &mut value_buffer, &mut index_buffer)
            .unwrap();
        assert!(!std::ptr::eq(range.value.unwrap().as_ptr(), value_start));
    }

    #[test]
    fn secondary_columns_run_through_the_walker() {
        let matrix = four_by_four_csr();
        let mut extractor = matrix
            .sparse_column(Selection::Full, &Options::default())
            .unwrap();
        let column = extractor.fetch_owned(3).unwrap();
        assert_eq!((vec![6, 9], vec![0, 3]), (column.value, column.index));
        let column = extractor.fetch_owned(0).unwrap();
        assert_eq!((vec![5], vec![0]), (column.value, column.index));
        let column = extractor.fetch_owned(2).unwrap();
        assert_eq!((vec![7], vec![2]), (column.value, column.index));
    }

    #[test]
    fn dense_column_blocks_scatter_into_zeroed_buffers() {
        let matrix = four_by_four_csr();
        let selection = Selection::Block { start: 1, length: 2 };
        let mut extractor = matrix
            .dense_column(selection, &Options::default())
            .unwrap();
        let mut buffer = vec![0; 2];
        // Rows 1..3 of column 0 hold no entries at all.
        assert_eq!(&[0, 0], extractor.fetch(0, &mut buffer).unwrap());
        assert_eq!(&[0, 7], extractor.fetch(2, &mut buffer).unwrap());
        assert_eq!(&[0, 0], extractor.fetch(3, &mut buffer).unwrap());
    }

    #[test]
    fn dense_rows_expand_the_slab() {
        let matrix = four_by_four_csr();
        let mut extractor = matrix.dense_row(Selection::Full, &Options::default()).unwrap();
        let mut buffer = vec![0; 4];
        assert_eq!(&[5, 0, 0, 6], extractor.fetch(0, &mut buffer).unwrap());
        assert_eq!(&[0, 0, 0, 0], extractor.fetch(1, &mut buffer).unwrap());
        assert_eq!(&[0, 8, 0, 9], extractor.fetch(3, &mut buffer).unwrap());
    }

    #[test]
    fn indexed_selection_merges_against_the_slab() {
        let matrix = four_by_four_csr();
        let mut extractor = matrix
            .sparse_row(Selection::Index(vec![1, 3]), &Options::default())
            .unwrap();
        let row = extractor.fetch_owned(3).unwrap();
        assert_eq!((vec![8, 9], vec![1, 3]), (row.value, row.index));
        let row = extractor.fetch_owned(0).unwrap();
        assert_eq!((vec![6], vec![3]), (row.value, row.index));
    }

    #[test]
    fn value_and_index_streams_can_be_skipped() {
        let matrix = four_by_four_csr();
        let options = Options {
            sparse_extract_value: false,
            ..Options::default()
        };
        let mut extractor = matrix.sparse_row(Selection::Full, &options).unwrap();
        let mut value_buffer = vec![0; 4];
        let mut index_buffer = vec![0; 4];
        let range = extractor
            .fetch(3, &mut value_buffer, &mut index_buffer)
            .unwrap();
        assert!(range.value.is_none());
        assert_eq!(Some(&[1u32, 3][..]), range.index);
    }

    #[test]
    fn cached_lookups_match_uncached_ones() {
        let matrix = four_by_four_csr();
        let selection = Selection::Block { start: 2, length: 2 };
        let cached_options = Options {
            cache_for_reuse: true,
            ..Options::default()
        };
        let mut cached = matrix.sparse_row(selection.clone(), &cached_options).unwrap();
        let mut plain = matrix.sparse_row(selection, &Options::default()).unwrap();
        for _ in 0..2 {
            for row in 0..4 {
                assert_eq!(plain.fetch_owned(row).unwrap(), cached.fetch_owned(row).unwrap());
            }
        }
    }

    #[test]
    fn construction_validates_the_containers() {
        let unequal = CompressedSparseMatrix::<i32, u32>::csr(
            2,
            2,
            vec![1],
            vec![0, 1],
            vec![0, 1, 2],
        );
        assert!(matches!(unequal, Err(Error::InvalidShape(_))));

        let bad_first = CompressedSparseMatrix::<i32, u32>::csr(
            2,
            2,
            vec![1, 2],
            vec![0, 1],
            vec![1, 1, 2],
        );
        assert!(matches!(bad_first, Err(Error::InvalidShape(_))));

        let empty_trailing_row = CompressedSparseMatrix::<i32, u32>::csr(
            2,
            2,
            vec![1, 2],
            vec![0, 1],
            vec![0, 2, 2],
        );
        assert!(empty_trailing_row.is_ok());

        let decreasing = CompressedSparseMatrix::<i32, u32>::csr(
            3,
            2,
            vec![1, 2],
            vec![0, 1],
            vec![0, 2, 1, 2],
        );
        assert!(matches!(decreasing, Err(Error::InvalidShape(_))));

        let unsorted_slab = CompressedSparseMatrix::<i32, u32>::csr(
            2,
            2,
            vec![1, 2],
            vec![1, 0],
            vec![0, 2, 2],
        );
        assert!(matches!(unsorted_slab, Err(Error::InvalidShape(_))));

        let bad_last = CompressedSparseMatrix::<i32, u32>::csr(
            2,
            2,
            vec![1, 2],
            vec![0, 1],
            vec![0, 1, 1],
        );
        assert!(matches!(bad_last, Err(Error::InvalidShape(_))));
    }
}
