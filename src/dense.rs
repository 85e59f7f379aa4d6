use log::debug;

use crate::{
    element::{Index, Value},
    error::Error,
    extractor::DenseExtractor,
    matrix::Matrix,
    options::{Options, Selection, StorageOrder},
};

/// In-memory dense matrix.
///
/// The values live in a single vector of length `nrow * ncol`, row-major or
/// column-major. Element `(r, c)` resides at `r * ncol + c` (row-major) or
/// `c * nrow + r` (column-major).
///
/// Extraction along the stored major dimension returns interior slices of the
/// storage for full and block selections, without copying. Every other access
/// pattern copies into the caller's buffer.
#[derive(Debug, Clone)]
pub struct DenseMatrix<V, I = u32> {
    nrows: I,
    ncols: I,
    values: Vec<V>,
    order: StorageOrder,
}

impl<V: Value, I: Index> DenseMatrix<V, I> {
    /// Creates a dense matrix over the given storage.
    ///
    /// Fails with [`Error::InvalidShape`] if the storage length is not the
    /// product of the dimensions.
    pub fn new(nrows: I, ncols: I, values: Vec<V>, order: StorageOrder) -> Result<Self, Error> {
        let expected = Index::to_usize(nrows) * Index::to_usize(ncols);
        if values.len() != expected {
            return Err(Error::invalid_shape(format!(
                "length of the value storage ({}) should equal the product of the dimensions \
                ({expected})",
                values.len()
            )));
        }
        debug!(
            "dense matrix over {} x {} values, {order:?}",
            Index::to_usize(nrows),
            Index::to_usize(ncols)
        );
        Ok(DenseMatrix {
            nrows,
            ncols,
            values,
            order,
        })
    }

    /// Creates a matrix whose rows are contiguous in storage.
    pub fn row_major(nrows: I, ncols: I, values: Vec<V>) -> Result<Self, Error> {
        Self::new(nrows, ncols, values, StorageOrder::RowMajor)
    }

    /// Creates a matrix whose columns are contiguous in storage.
    pub fn column_major(nrows: I, ncols: I, values: Vec<V>) -> Result<Self, Error> {
        Self::new(nrows, ncols, values, StorageOrder::ColumnMajor)
    }

    /// Extent of the dimension that is contiguous within one major element.
    fn minor_extent(&self) -> usize {
        match self.order {
            StorageOrder::RowMajor => Index::to_usize(self.ncols),
            StorageOrder::ColumnMajor => Index::to_usize(self.nrows),
        }
    }
}

impl<V: Value, I: Index> Matrix<V, I> for DenseMatrix<V, I> {
    fn nrow(&self) -> I {
        self.nrows
    }

    fn ncol(&self) -> I {
        self.ncols
    }

    fn is_sparse(&self) -> bool {
        false
    }

    fn prefer_rows(&self) -> bool {
        self.order == StorageOrder::RowMajor
    }

    fn dense_row<'s>(
        &'s self,
        selection: Selection<I>,
        _options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        selection.validate(self.ncols)?;
        let length = selection.length(self.ncols);
        Ok(Box::new(DenseMatrixExtractor {
            matrix: self,
            by_row: true,
            selection,
            length,
        }))
    }

    fn dense_column<'s>(
        &'s self,
        selection: Selection<I>,
        _options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        selection.validate(self.nrows)?;
        let length = selection.length(self.nrows);
        Ok(Box::new(DenseMatrixExtractor {
            matrix: self,
            by_row: false,
            selection,
            length,
        }))
    }
}

struct DenseMatrixExtractor<'a, V, I> {
    matrix: &'a DenseMatrix<V, I>,
    by_row: bool,
    selection: Selection<I>,
    length: usize,
}

impl<V: Value, I: Index> DenseExtractor<V, I> for DenseMatrixExtractor<'_, V, I> {
    fn extracted_length(&self) -> usize {
        self.length
    }

    fn fetch<'s>(&'s mut self, target: I, buffer: &'s mut [V]) -> Result<&'s [V], Error> {
        let target_extent = if self.by_row {
            self.matrix.nrows
        } else {
            self.matrix.ncols
        };
        if target >= target_extent {
            return Err(Error::OutOfRange {
                index: Index::to_usize(target),
                extent: Index::to_usize(target_extent),
            });
        }

        let minor = self.matrix.minor_extent();
        let along_major = self.by_row == (self.matrix.order == StorageOrder::RowMajor);
        let values = &self.matrix.values;
        if along_major {
            let offset = Index::to_usize(target) * minor;
            match &self.selection {
                Selection::Full => Ok(&values[offset..offset + minor]),
                Selection::Block { start, length } => {
                    let first = offset + Index::to_usize(*start);
                    Ok(&values[first..first + Index::to_usize(*length)])
                }
                Selection::Index(subset) => {
                    for (slot, position) in buffer.iter_mut().zip(subset) {
                        *slot = values[offset + Index::to_usize(*position)];
                    }
                    Ok(&buffer[..subset.len()])
                }
            }
        } else {
            let stride = minor;
            let at = Index::to_usize(target);
            match &self.selection {
                Selection::Full => {
                    for (position, slot) in buffer[..self.length].iter_mut().enumerate() {
                        *slot = values[position * stride + at];
                    }
                }
                Selection::Block { start, .. } => {
                    let first = Index::to_usize(*start);
                    for (position, slot) in buffer[..self.length].iter_mut().enumerate() {
                        *slot = values[(first + position) * stride + at];
                    }
                }
                Selection::Index(subset) => {
                    for (slot, position) in buffer.iter_mut().zip(subset) {
                        *slot = values[Index::to_usize(*position) * stride + at];
                    }
                }
            }
            Ok(&buffer[..self.length])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn three_by_four() -> DenseMatrix<f64, u32> {
        DenseMatrix::row_major(3, 4, (1..=12).map(f64::from).collect()).unwrap()
    }

    #[test]
    fn full_rows_of_a_row_major_matrix_are_zero_copy() {
        let matrix = three_by_four();
        let mut extractor = matrix.dense_row(Selection::Full, &Options::default()).unwrap();
        let mut buffer = vec![0.0; 4];
        let buffer_start = buffer.as_ptr();
        let row = extractor.fetch(0, &mut buffer).unwrap();
        assert_eq!(&[1.0, 2.0, 3.0, 4.0], row);
        // The slice points into the matrix storage, not the buffer.
        assert!(!std::ptr::eq(row.as_ptr(), buffer_start));
        let row = extractor.fetch(2, &mut buffer).unwrap();
        assert_eq!(&[9.0, 10.0, 11.0, 12.0], row);
    }

    #[test]
    fn block_of_a_column_is_copied_through_the_buffer() {
        let matrix = three_by_four();
        let selection = Selection::Block { start: 1, length: 2 };
        let mut extractor = matrix
            .dense_column(selection, &Options::default())
            .unwrap();
        let mut buffer = vec![0.0; 2];
        let buffer_start = buffer.as_ptr();
        let column = extractor.fetch(2, &mut buffer).unwrap();
        assert_eq!(&[7.0, 11.0], column);
        assert!(std::ptr::eq(column.as_ptr(), buffer_start));
    }

    #[test]
    fn indexed_rows_gather_into_the_buffer() {
        let matrix = three_by_four();
        let mut extractor = matrix
            .dense_row(Selection::Index(vec![0, 3]), &Options::default())
            .unwrap();
        let mut buffer = vec![0.0; 2];
        assert_eq!(&[5.0, 8.0], extractor.fetch(1, &mut buffer).unwrap());
    }

    #[test]
    fn column_major_prefers_columns() {
        let matrix: DenseMatrix<i32, u32> =
            DenseMatrix::column_major(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert!(!matrix.prefer_rows());
        let mut extractor = matrix.dense_row(Selection::Full, &Options::default()).unwrap();
        let mut buffer = vec![0; 2];
        assert_eq!(&[1, 3], extractor.fetch(0, &mut buffer).unwrap());
    }

    #[test]
    fn storage_length_must_match_the_dimensions() {
        let result = DenseMatrix::<f64, u32>::row_major(3, 4, vec![0.0; 11]);
        assert!(matches!(result, Err(Error::InvalidShape(_))));
    }

    #[test]
    fn out_of_range_target_is_reported() {
        let matrix = three_by_four();
        let mut extractor = matrix.dense_row(Selection::Full, &Options::default()).unwrap();
        let mut buffer = vec![0.0; 4];
        assert!(matches!(
            extractor.fetch(3, &mut buffer),
            Err(Error::OutOfRange { index: 3, extent: 3 })
        ));
    }
}
