use log::debug;

use num_traits::AsPrimitive;

use crate::{
    element::{Index, Value},
    error::Error,
    extractor::{DenseExtractor, SparseExtractor, SparseRange},
    matrix::Matrix,
    options::{Options, Selection, StorageOrder},
    sparse::secondary::{CursorKind, RunCursor, RunPosition, SecondaryWalker},
};

/// Semi-compressed sparse matrix for small integer counts.
///
/// Stores only `indices` and `pointers`; a value greater than one is encoded
/// by duplicating its index, so extraction reconstructs each value as the
/// length of a run of equal indices. This halves the memory footprint for
/// count data where most stored values are one.
///
/// The access strategy is the same as for [`crate::CompressedSparseMatrix`]:
/// bounded scans along the primary dimension, the stateful walker along the
/// secondary dimension, here with a compound cursor that moves one run at a
/// time.
#[derive(Debug, Clone)]
pub struct SemiCompressedSparseMatrix<V, I = u32> {
    nrows: I,
    ncols: I,
    indices: Vec<I>,
    pointers: Vec<usize>,
    order: StorageOrder,
    _values: std::marker::PhantomData<V>,
}

impl<V, I> SemiCompressedSparseMatrix<V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
    /// Creates a semi-compressed sparse matrix over the given containers.
    ///
    /// The validation rules match the compressed format except that indices
    /// may repeat within a slab: they only need to be non-decreasing.
    pub fn new(
        nrows: I,
        ncols: I,
        indices: Vec<I>,
        pointers: Vec<usize>,
        order: StorageOrder,
    ) -> Result<Self, Error> {
        let matrix = SemiCompressedSparseMatrix {
            nrows,
            ncols,
            indices,
            pointers,
            order,
            _values: std::marker::PhantomData,
        };
        matrix.check_containers()?;
        debug!(
            "semi-compressed sparse matrix over {} x {}, {} stored indices, {:?}",
            Index::to_usize(matrix.nrows),
            Index::to_usize(matrix.ncols),
            matrix.indices.len(),
            matrix.order
        );
        Ok(matrix)
    }

    /// Row-major variant; `indices` hold column positions.
    pub fn by_rows(nrows: I, ncols: I, indices: Vec<I>, pointers: Vec<usize>) -> Result<Self, Error> {
        Self::new(nrows, ncols, indices, pointers, StorageOrder::RowMajor)
    }

    /// Column-major variant; `indices` hold row positions.
    pub fn by_columns(
        nrows: I,
        ncols: I,
        indices: Vec<I>,
        pointers: Vec<usize>,
    ) -> Result<Self, Error> {
        Self::new(nrows, ncols, indices, pointers, StorageOrder::ColumnMajor)
    }

    fn check_containers(&self) -> Result<(), Error> {
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
                "last element of 'pointers' should be equal to the number of stored indices",
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
                    "'pointers' should not exceed the number of stored indices",
                ));
            }
            if self.indices[lower..upper]
                .windows(2)
                .any(|pair| pair[0] > pair[1])
            {
                return Err(Error::invalid_shape(match self.order {
                    StorageOrder::RowMajor => {
                        "'indices' should be non-decreasing within each row"
                    }
                    StorageOrder::ColumnMajor => {
                        "'indices' should be non-decreasing within each column"
                    }
                }));
            }
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

    /// Position of the first stored index at or above `start` within the
    /// slab, memoised per primary element when a cache is attached.
    fn primary_start(&self, primary: usize, start: I, cache: &mut [usize]) -> usize {
        if let Some(&cached) = cache.get(primary) {
            if cached != usize::MAX {
                return cached;
            }
        }
        let mut position = self.pointers[primary];
        if start > I::zero() {
            position += self.indices[position..self.pointers[primary + 1]]
                .partition_point(|&stored| stored < start);
        }
        if let Some(slot) = cache.get_mut(primary) {
            *slot = position;
        }
        position
    }

    /// Walks the runs of one slab that fall within `[start, start + length)`,
    /// reporting each distinct index with its run length.
    fn primary_runs(
        &self,
        primary: usize,
        start: I,
        length: usize,
        cache: &mut [usize],
        mut visit: impl FnMut(I, usize),
    ) {
        let mut position = self.primary_start(primary, start, cache);
        let limit = self.pointers[primary + 1];
        let end = Index::to_usize(start) + length;
        while position < limit && Index::to_usize(self.indices[position]) < end {
            let current = self.indices[position];
            let mut next = position + 1;
            while next < limit && self.indices[next] == current {
                next += 1;
            }
            visit(current, next - position);
            position = next;
        }
    }

    /// Merges a sorted subset against one slab, reporting the run length of
    /// each subset position that has entries.
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
            if let Some(slot) = cache.get_mut(primary) {
                if *slot == usize::MAX {
                    *slot = self.indices[position..slab_end]
                        .partition_point(|&stored| stored < subset[0]);
                }
                position += *slot;
            } else {
                position +=
                    self.indices[position..slab_end].partition_point(|&stored| stored < subset[0]);
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
                let mut next = position + 1;
                while next < slab_end && self.indices[next] == wanted {
                    next += 1;
                }
                visit(wanted, Some(next - position));
                position = next;
            } else {
                visit(wanted, None);
            }
        }
    }
}

impl<V, I> Matrix<V, I> for SemiCompressedSparseMatrix<V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
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
            Ok(Box::new(SemiPrimaryDenseExtractor::new(self, selection, options)))
        } else {
            Ok(Box::new(SemiSecondaryDenseExtractor::new(self, selection)))
        }
    }

    fn dense_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        selection.validate(self.nrows)?;
        if self.order == StorageOrder::ColumnMajor {
            Ok(Box::new(SemiPrimaryDenseExtractor::new(self, selection, options)))
        } else {
            Ok(Box::new(SemiSecondaryDenseExtractor::new(self, selection)))
        }
    }

    fn sparse_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        selection.validate(self.ncols)?;
        if self.order == StorageOrder::RowMajor {
            Ok(Box::new(SemiPrimarySparseExtractor::new(self, selection, options)))
        } else {
            Ok(Box::new(SemiSecondarySparseExtractor::new(
                self, selection, options,
            )))
        }
    }

    fn sparse_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        selection.validate(self.nrows)?;
        if self.order == StorageOrder::ColumnMajor {
            Ok(Box::new(SemiPrimarySparseExtractor::new(self, selection, options)))
        } else {
            Ok(Box::new(SemiSecondarySparseExtractor::new(
                self, selection, options,
            )))
        }
    }
}

fn spawn_cache<V, I>(
    options: &Options,
    selection: &Selection<I>,
    matrix: &SemiCompressedSparseMatrix<V, I>,
) -> Vec<usize>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
    let wanted = match selection {
        Selection::Block { start, .. } => options.cache_for_reuse && *start > I::zero(),
        Selection::Index(subset) => {
            options.cache_for_reuse && subset.first().is_some_and(|&first| first > I::zero())
        }
        Selection::Full => false,
    };
    if wanted {
        vec![usize::MAX; matrix.major_extent()]
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

struct SemiPrimaryDenseExtractor<'a, V, I> {
    matrix: &'a SemiCompressedSparseMatrix<V, I>,
    selection: Selection<I>,
    length: usize,
    cache: Vec<usize>,
}

impl<'a, V, I> SemiPrimaryDenseExtractor<'a, V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
    fn new(
        matrix: &'a SemiCompressedSparseMatrix<V, I>,
        selection: Selection<I>,
        options: &Options,
    ) -> Self {
        let length = selection.length(I::from_usize(matrix.minor_extent()));
        let cache = spawn_cache(options, &selection, matrix);
        SemiPrimaryDenseExtractor {
            matrix,
            selection,
            length,
            cache,
        }
    }
}

impl<V, I> DenseExtractor<V, I> for SemiPrimaryDenseExtractor<'_, V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
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
                self.matrix.primary_runs(
                    primary,
                    start,
                    self.length,
                    &mut self.cache,
                    |index, count| out[Index::to_usize(index) - Index::to_usize(start)] = count.as_(),
                );
            }
            Selection::Index(subset) => {
                let mut slot = 0;
                self.matrix
                    .primary_indexed(primary, subset, &mut self.cache, |_, found| {
                        if let Some(count) = found {
                            out[slot] = count.as_();
                        }
                        slot += 1;
                    });
            }
        }
        Ok(out)
    }
}

struct SemiPrimarySparseExtractor<'a, V, I> {
    matrix: &'a SemiCompressedSparseMatrix<V, I>,
    selection: Selection<I>,
    length: usize,
    needs_value: bool,
    needs_index: bool,
    cache: Vec<usize>,
}

impl<'a, V, I> SemiPrimarySparseExtractor<'a, V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
    fn new(
        matrix: &'a SemiCompressedSparseMatrix<V, I>,
        selection: Selection<I>,
        options: &Options,
    ) -> Self {
        let length = selection.length(I::from_usize(matrix.minor_extent()));
        let cache = spawn_cache(options, &selection, matrix);
        SemiPrimarySparseExtractor {
            matrix,
            selection,
            length,
            needs_value: options.sparse_extract_value,
            needs_index: options.sparse_extract_index,
            cache,
        }
    }
}

impl<V, I> SparseExtractor<V, I> for SemiPrimarySparseExtractor<'_, V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
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
        let needs_value = self.needs_value;
        let needs_index = self.needs_index;
        let mut number = 0;
        {
            let mut report = |index: I, count: usize| {
                if needs_value {
                    values[number] = count.as_();
                }
                if needs_index {
                    indices[number] = index;
                }
                number += 1;
            };
            match &self.selection {
                Selection::Full | Selection::Block { .. } => {
                    let start = match &self.selection {
                        Selection::Block { start, .. } => *start,
                        _ => I::zero(),
                    };
                    self.matrix
                        .primary_runs(primary, start, self.length, &mut self.cache, report);
                }
                Selection::Index(subset) => {
                    self.matrix
                        .primary_indexed(primary, subset, &mut self.cache, |index, found| {
                            if let Some(count) = found {
                                report(index, count);
                            }
                        });
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

fn walker_for<V, I, C>(
    matrix: &SemiCompressedSparseMatrix<V, I>,
    selection: &Selection<I>,
) -> SecondaryWalker<I, C>
where
    V: Value,
    I: Index,
    C: CursorKind<I>,
    usize: AsPrimitive<V>,
{
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

struct SemiSecondaryDenseExtractor<'a, V, I: Index> {
    matrix: &'a SemiCompressedSparseMatrix<V, I>,
    selection: Selection<I>,
    length: usize,
    walker: SecondaryWalker<I, RunCursor>,
}

impl<'a, V, I> SemiSecondaryDenseExtractor<'a, V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
    fn new(matrix: &'a SemiCompressedSparseMatrix<V, I>, selection: Selection<I>) -> Self {
        let length = selection.length(I::from_usize(matrix.major_extent()));
        let walker = walker_for(matrix, &selection);
        SemiSecondaryDenseExtractor {
            matrix,
            selection,
            length,
            walker,
        }
    }
}

impl<V, I> DenseExtractor<V, I> for SemiSecondaryDenseExtractor<'_, V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
    fn extracted_length(&self) -> usize {
        self.length
    }

    fn fetch<'s>(&'s mut self, target: I, buffer: &'s mut [V]) -> Result<&'s [V], Error> {
        check_target(target, self.matrix.minor_extent())?;
        let out = &mut buffer[..self.length];
        out.fill(V::zero());
        let matrix = self.matrix;
        let walker = &mut self.walker;
        let measure = |primary: I, cursor: &mut RunPosition| -> V {
            RunCursor::measure(cursor, &matrix.indices, matrix.pointers[Index::to_usize(primary) + 1]);
            cursor.count.as_()
        };
        match &self.selection {
            Selection::Full => {
                walker.search(
                    target,
                    I::from_usize,
                    &matrix.indices,
                    &matrix.pointers,
                    |_, primary, cursor| out[Index::to_usize(primary)] = measure(primary, cursor),
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
                        out[Index::to_usize(primary) - first] = measure(primary, cursor)
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
                    |slot, primary, cursor| out[slot] = measure(primary, cursor),
                    |_, _| {},
                );
            }
        }
        Ok(out)
    }
}

struct SemiSecondarySparseExtractor<'a, V, I: Index> {
    matrix: &'a SemiCompressedSparseMatrix<V, I>,
    selection: Selection<I>,
    length: usize,
    needs_value: bool,
    needs_index: bool,
    walker: SecondaryWalker<I, RunCursor>,
}

impl<'a, V, I> SemiSecondarySparseExtractor<'a, V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
    fn new(
        matrix: &'a SemiCompressedSparseMatrix<V, I>,
        selection: Selection<I>,
        options: &Options,
    ) -> Self {
        let length = selection.length(I::from_usize(matrix.major_extent()));
        let walker = walker_for(matrix, &selection);
        SemiSecondarySparseExtractor {
            matrix,
            selection,
            length,
            needs_value: options.sparse_extract_value,
            needs_index: options.sparse_extract_index,
            walker,
        }
    }
}

impl<V, I> SparseExtractor<V, I> for SemiSecondarySparseExtractor<'_, V, I>
where
    V: Value,
    I: Index,
    usize: AsPrimitive<V>,
{
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
            let mut store = |_: usize, primary: I, cursor: &mut RunPosition| {
                if needs_value {
                    RunCursor::measure(
                        cursor,
                        &matrix.indices,
                        matrix.pointers[Index::to_usize(primary) + 1],
                    );
                    values[number] = cursor.count.as_();
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

    /// Counts matrix
    ///   [2 0 1]
    ///   [0 3 0]
    /// stored by rows as duplicated column indices.
    fn counts() -> SemiCompressedSparseMatrix<i32, u32> {
        SemiCompressedSparseMatrix::by_rows(2, 3, vec![0, 0, 2, 1, 1, 1], vec![0, 3, 6]).unwrap()
    }

    #[test]
    fn runs_expand_to_counts_along_the_primary_dimension() {
        let matrix = counts();
        let mut extractor = matrix.dense_row(Selection::Full, &Options::default()).unwrap();
        let mut buffer = vec![0; 3];
        assert_eq!(&[2, 0, 1], extractor.fetch(0, &mut buffer).unwrap());
        assert_eq!(&[0, 3, 0], extractor.fetch(1, &mut buffer).unwrap());
    }

    #[test]
    fn sparse_rows_report_runs_once() {
        let matrix = counts();
        let mut extractor = matrix.sparse_row(Selection::Full, &Options::default()).unwrap();
        let row = extractor.fetch_owned(0).unwrap();
        assert_eq!((vec![2, 1], vec![0, 2]), (row.value, row.index));
        let row = extractor.fetch_owned(1).unwrap();
        assert_eq!((vec![3], vec![1]), (row.value, row.index));
    }

    #[test]
    fn secondary_access_reconstructs_counts() {
        let matrix = counts();
        let mut extractor = matrix
            .sparse_column(Selection::Full, &Options::default())
            .unwrap();
        let column = extractor.fetch_owned(0).unwrap();
        assert_eq!((vec![2], vec![0]), (column.value, column.index));
        let column = extractor.fetch_owned(1).unwrap();
        assert_eq!((vec![3], vec![1]), (column.value, column.index));
        let column = extractor.fetch_owned(2).unwrap();
        assert_eq!((vec![1], vec![0]), (column.value, column.index));
        // And back down again.
        let column = extractor.fetch_owned(0).unwrap();
        assert_eq!((vec![2], vec![0]), (column.value, column.index));
    }

    #[test]
    fn indexed_selection_skips_missing_runs() {
        let matrix = counts();
        let mut extractor = matrix
            .dense_row(Selection::Index(vec![1, 2]), &Options::default())
            .unwrap();
        let mut buffer = vec![0; 2];
        assert_eq!(&[0, 1], extractor.fetch(0, &mut buffer).unwrap());
        assert_eq!(&[3, 0], extractor.fetch(1, &mut buffer).unwrap());
    }

    #[test]
    fn duplicated_indices_are_accepted_but_decreasing_ones_are_not() {
        let decreasing =
            SemiCompressedSparseMatrix::<i32, u32>::by_rows(1, 3, vec![2, 0], vec![0, 2]);
        assert!(matches!(decreasing, Err(Error::InvalidShape(_))));
    }
}
