use std::sync::Arc;

use crate::{
    element::{Index, Value},
    error::Error,
    extractor::{DenseExtractor, SparseExtractor, SparseRange},
    matrix::Matrix,
    options::{Options, Selection},
    oracle::Oracle,
};

pub mod ops;

/// An element-wise operation applied by [`IsometricMatrix`].
///
/// The operation sees the coordinates of each element along with its value
/// and must not depend on the iteration schedule. The flag methods
/// characterise it once at extractor construction: they decide whether sparse
/// extraction can run over the wrapped matrix's sparse stream, whether that
/// stream must include indices, or whether the output has to be densified.
pub trait UnaryOperation<V: Value, I: Index>: Send + Sync {
    /// Computes the result for the element at `(row, column)`. When the
    /// operation does not depend on a coordinate (as reported by the flag
    /// methods), a placeholder may be passed for it.
    fn apply(&self, row: I, column: I, value: V) -> V;

    /// Whether the operation maps zero to zero, so that structural zeros of
    /// the wrapped matrix stay zero.
    fn is_sparse(&self) -> bool;

    /// Whether the replacement for a structural zero depends on the row of
    /// that zero. Only meaningful when [`is_sparse`](Self::is_sparse) is
    /// `false`.
    fn zero_depends_on_row(&self) -> bool {
        false
    }

    /// Whether the replacement for a structural zero depends on the column of
    /// that zero. Only meaningful when [`is_sparse`](Self::is_sparse) is
    /// `false`.
    fn zero_depends_on_column(&self) -> bool {
        false
    }

    /// Whether the result for a non-zero operand depends on its row.
    fn non_zero_depends_on_row(&self) -> bool {
        false
    }

    /// Whether the result for a non-zero operand depends on its column.
    fn non_zero_depends_on_column(&self) -> bool {
        false
    }
}

/// Delayed element-wise operation on a matrix.
///
/// The result at `(r, c)` is `operation.apply(r, c, inner[(r, c)])`,
/// evaluated per fetched row or column; nothing is materialised. Sparsity is
/// preserved exactly when both the operation and the wrapped matrix are
/// sparse; for a non-preserving operation the sparse factories still work but
/// produce densified output with one entry per selected position.
pub struct IsometricMatrix<V: Value, I: Index, Op> {
    inner: Arc<dyn Matrix<V, I>>,
    operation: Op,
}

impl<V, I, Op> IsometricMatrix<V, I, Op>
where
    V: Value,
    I: Index,
    Op: UnaryOperation<V, I>,
{
    pub fn new(inner: Arc<dyn Matrix<V, I>>, operation: Op) -> Self {
        IsometricMatrix { inner, operation }
    }

    fn sparse_extractor<'s>(
        &'s self,
        row_access: bool,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        if !self.operation.is_sparse() {
            // Densified output: dense extraction runs underneath and every
            // selected position becomes a structural non-zero.
            let inner = if row_access {
                self.inner.dense_row(selection.clone(), options)?
            } else {
                self.inner.dense_column(selection.clone(), options)?
            };
            let stage = vec![V::zero(); inner.extracted_length()];
            return Ok(Box::new(DensifiedIsometricExtractor {
                inner,
                operation: &self.operation,
                row_access,
                selection,
                report_value: options.sparse_extract_value,
                report_index: options.sparse_extract_index,
                stage,
            }));
        }

        let wants_position = if row_access {
            self.operation.non_zero_depends_on_column()
        } else {
            self.operation.non_zero_depends_on_row()
        };
        if !wants_position {
            let inner = if row_access {
                self.inner.sparse_row(selection, options)?
            } else {
                self.inner.sparse_column(selection, options)?
            };
            let stage = vec![V::zero(); inner.extracted_length()];
            return Ok(Box::new(SimpleIsometricExtractor {
                inner,
                operation: &self.operation,
                row_access,
                stage,
            }));
        }

        // The operation needs the position of each non-zero, so the indices
        // are requested from the wrapped matrix even if the caller did not
        // ask for them.
        let report_value = options.sparse_extract_value;
        let report_index = options.sparse_extract_index;
        let mut inner_options = options.clone();
        if report_value && !report_index {
            inner_options.sparse_extract_index = true;
        }
        let inner = if row_access {
            self.inner.sparse_row(selection, &inner_options)?
        } else {
            self.inner.sparse_column(selection, &inner_options)?
        };
        let length = inner.extracted_length();
        let index_stage = if report_value && !report_index {
            vec![I::zero(); length]
        } else {
            Vec::new()
        };
        Ok(Box::new(PositionedIsometricExtractor {
            inner,
            operation: &self.operation,
            row_access,
            report_index,
            value_stage: vec![V::zero(); length],
            index_stage,
        }))
    }
}

impl<V, I, Op> Matrix<V, I> for IsometricMatrix<V, I, Op>
where
    V: Value,
    I: Index,
    Op: UnaryOperation<V, I>,
{
    fn nrow(&self) -> I {
        self.inner.nrow()
    }

    fn ncol(&self) -> I {
        self.inner.ncol()
    }

    fn is_sparse(&self) -> bool {
        self.operation.is_sparse() && self.inner.is_sparse()
    }

    fn is_sparse_proportion(&self) -> f64 {
        if self.operation.is_sparse() {
            self.inner.is_sparse_proportion()
        } else {
            0.0
        }
    }

    fn prefer_rows(&self) -> bool {
        self.inner.prefer_rows()
    }

    fn prefer_rows_proportion(&self) -> f64 {
        self.inner.prefer_rows_proportion()
    }

    fn uses_oracle(&self, row_access: bool) -> bool {
        self.inner.uses_oracle(row_access)
    }

    fn dense_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        let inner = self.inner.dense_row(selection.clone(), options)?;
        let stage = vec![V::zero(); inner.extracted_length()];
        Ok(Box::new(DenseIsometricExtractor {
            inner,
            operation: &self.operation,
            row_access: true,
            selection,
            stage,
        }))
    }

    fn dense_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        let inner = self.inner.dense_column(selection.clone(), options)?;
        let stage = vec![V::zero(); inner.extracted_length()];
        Ok(Box::new(DenseIsometricExtractor {
            inner,
            operation: &self.operation,
            row_access: false,
            selection,
            stage,
        }))
    }

    fn sparse_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        self.sparse_extractor(true, selection, options)
    }

    fn sparse_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        self.sparse_extractor(false, selection, options)
    }
}

/// Applies the operation to a transformed slice, resolving the non-target
/// coordinate of each element through the selection.
fn transform_dense<V: Value, I: Index, Op: UnaryOperation<V, I>>(
    operation: &Op,
    row_access: bool,
    target: I,
    selection: &Selection<I>,
    input: &[V],
    output: &mut [V],
) {
    let apply = |position: I, value: V| {
        if row_access {
            operation.apply(target, position, value)
        } else {
            operation.apply(position, target, value)
        }
    };
    match selection {
        Selection::Full => {
            for (offset, (slot, &value)) in output.iter_mut().zip(input).enumerate() {
                *slot = apply(I::from_usize(offset), value);
            }
        }
        Selection::Block { start, .. } => {
            let first = Index::to_usize(*start);
            for (offset, (slot, &value)) in output.iter_mut().zip(input).enumerate() {
                *slot = apply(I::from_usize(first + offset), value);
            }
        }
        Selection::Index(subset) => {
            for ((slot, &value), &position) in output.iter_mut().zip(input).zip(subset) {
                *slot = apply(position, value);
            }
        }
    }
}

struct DenseIsometricExtractor<'a, V: Value, I: Index, Op> {
    inner: Box<dyn DenseExtractor<V, I> + 'a>,
    operation: &'a Op,
    row_access: bool,
    selection: Selection<I>,
    stage: Vec<V>,
}

impl<V, I, Op> DenseExtractor<V, I> for DenseIsometricExtractor<'_, V, I, Op>
where
    V: Value,
    I: Index,
    Op: UnaryOperation<V, I>,
{
    fn extracted_length(&self) -> usize {
        self.inner.extracted_length()
    }

    fn fetch<'s>(&'s mut self, target: I, buffer: &'s mut [V]) -> Result<&'s [V], Error> {
        let this = &mut *self;
        let input = this.inner.fetch(target, &mut this.stage)?;
        let produced = input.len();
        transform_dense(
            this.operation,
            this.row_access,
            target,
            &this.selection,
            input,
            &mut buffer[..produced],
        );
        Ok(&buffer[..produced])
    }

    fn set_oracle(&mut self, oracle: Option<Box<dyn Oracle<I>>>) {
        self.inner.set_oracle(oracle);
    }
}

/// Sparse-preserving operation that ignores the position of each non-zero;
/// the index stream passes through untouched.
struct SimpleIsometricExtractor<'a, V: Value, I: Index, Op> {
    inner: Box<dyn SparseExtractor<V, I> + 'a>,
    operation: &'a Op,
    row_access: bool,
    stage: Vec<V>,
}

impl<V, I, Op> SparseExtractor<V, I> for SimpleIsometricExtractor<'_, V, I, Op>
where
    V: Value,
    I: Index,
    Op: UnaryOperation<V, I>,
{
    fn extracted_length(&self) -> usize {
        self.inner.extracted_length()
    }

    fn fetch<'s>(
        &'s mut self,
        target: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> Result<SparseRange<'s, V, I>, Error> {
        let this = &mut *self;
        let range = this
            .inner
            .fetch(target, &mut this.stage, &mut *indices)?;
        let number = range.number;
        let value = if let Some(stream) = range.value {
            let placeholder = I::zero();
            for (slot, &value) in values.iter_mut().zip(stream) {
                *slot = if this.row_access {
                    this.operation.apply(target, placeholder, value)
                } else {
                    this.operation.apply(placeholder, target, value)
                };
            }
            Some(&values[..number])
        } else {
            None
        };
        Ok(SparseRange {
            number,
            value,
            index: range.index,
        })
    }

    fn set_oracle(&mut self, oracle: Option<Box<dyn Oracle<I>>>) {
        self.inner.set_oracle(oracle);
    }
}

/// Sparse-preserving operation that needs the position of each non-zero. The
/// wrapped extractor always produces indices; they reach the caller only when
/// asked for.
struct PositionedIsometricExtractor<'a, V: Value, I: Index, Op> {
    inner: Box<dyn SparseExtractor<V, I> + 'a>,
    operation: &'a Op,
    row_access: bool,
    report_index: bool,
    value_stage: Vec<V>,
    index_stage: Vec<I>,
}

impl<V, I, Op> SparseExtractor<V, I> for PositionedIsometricExtractor<'_, V, I, Op>
where
    V: Value,
    I: Index,
    Op: UnaryOperation<V, I>,
{
    fn extracted_length(&self) -> usize {
        self.inner.extracted_length()
    }

    fn fetch<'s>(
        &'s mut self,
        target: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> Result<SparseRange<'s, V, I>, Error> {
        let this = &mut *self;
        let index_buffer: &mut [I] = if this.index_stage.is_empty() {
            &mut *indices
        } else {
            &mut this.index_stage
        };
        let range = this
            .inner
            .fetch(target, &mut this.value_stage, index_buffer)?;
        let number = range.number;
        let value = if let Some(stream) = range.value {
            let positions = range
                .index
                .expect("index stream was requested from the wrapped extractor");
            for ((slot, &value), &position) in values.iter_mut().zip(stream).zip(positions) {
                *slot = if this.row_access {
                    this.operation.apply(target, position, value)
                } else {
                    this.operation.apply(position, target, value)
                };
            }
            Some(&values[..number])
        } else {
            None
        };
        let index = if this.report_index { range.index } else { None };
        Ok(SparseRange {
            number,
            value,
            index,
        })
    }

    fn set_oracle(&mut self, oracle: Option<Box<dyn Oracle<I>>>) {
        self.inner.set_oracle(oracle);
    }
}

/// Non-sparsity-preserving operation behind a sparse interface: runs the
/// dense extraction and reports every selected position.
struct DensifiedIsometricExtractor<'a, V: Value, I: Index, Op> {
    inner: Box<dyn DenseExtractor<V, I> + 'a>,
    operation: &'a Op,
    row_access: bool,
    selection: Selection<I>,
    report_value: bool,
    report_index: bool,
    stage: Vec<V>,
}

impl<V, I, Op> SparseExtractor<V, I> for DensifiedIsometricExtractor<'_, V, I, Op>
where
    V: Value,
    I: Index,
    Op: UnaryOperation<V, I>,
{
    fn extracted_length(&self) -> usize {
        self.inner.extracted_length()
    }

    fn fetch<'s>(
        &'s mut self,
        target: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> Result<SparseRange<'s, V, I>, Error> {
        let number = self.inner.extracted_length();
        let this = &mut *self;
        let value = if this.report_value {
            let input = this.inner.fetch(target, &mut this.stage)?;
            transform_dense(
                this.operation,
                this.row_access,
                target,
                &this.selection,
                input,
                &mut values[..number],
            );
            Some(&values[..number])
        } else {
            None
        };
        let index = if this.report_index {
            match &this.selection {
                Selection::Full => {
                    for (offset, slot) in indices[..number].iter_mut().enumerate() {
                        *slot = I::from_usize(offset);
                    }
                }
                Selection::Block { start, .. } => {
                    let first = Index::to_usize(*start);
                    for (offset, slot) in indices[..number].iter_mut().enumerate() {
                        *slot = I::from_usize(first + offset);
                    }
                }
                Selection::Index(subset) => indices[..number].copy_from_slice(subset),
            }
            Some(&indices[..number])
        } else {
            None
        };
        Ok(SparseRange {
            number,
            value,
            index,
        })
    }

    fn set_oracle(&mut self, oracle: Option<Box<dyn Oracle<I>>>) {
        self.inner.set_oracle(oracle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dense::DenseMatrix,
        isometric::ops::{AddScalar, MultiplyScalar},
        sparse::CompressedSparseMatrix,
    };

    fn csr() -> Arc<dyn Matrix<i32, u32>> {
        Arc::new(
            CompressedSparseMatrix::csr(
                4,
                4,
                vec![5, 6, 7, 8, 9],
                vec![0, 3, 2, 1, 3],
                vec![0, 2, 2, 3, 5],
            )
            .unwrap(),
        )
    }

    #[test]
    fn dense_rows_are_transformed_element_wise() {
        let inner: Arc<dyn Matrix<i32, u32>> =
            Arc::new(DenseMatrix::row_major(3, 4, (1..=12).collect()).unwrap());
        let shifted = IsometricMatrix::new(inner, AddScalar::new(1));
        let mut extractor = shifted.dense_row(Selection::Full, &Options::default()).unwrap();
        let mut buffer = vec![0; 4];
        assert_eq!(&[2, 3, 4, 5], extractor.fetch(0, &mut buffer).unwrap());
    }

    #[test]
    fn sparsity_preserving_operations_keep_the_pattern() {
        let doubled = IsometricMatrix::new(csr(), MultiplyScalar::new(2));
        assert!(doubled.is_sparse());
        let mut extractor = doubled.sparse_row(Selection::Full, &Options::default()).unwrap();
        let row = extractor.fetch_owned(3).unwrap();
        assert_eq!((vec![16, 18], vec![1, 3]), (row.value, row.index));
        assert_eq!(0, extractor.fetch_owned(1).unwrap().number);
    }

    #[test]
    fn non_preserving_operations_densify_the_sparse_output() {
        let shifted = IsometricMatrix::new(csr(), AddScalar::new(10));
        assert!(!shifted.is_sparse());
        let mut extractor = shifted.sparse_row(Selection::Full, &Options::default()).unwrap();
        let row = extractor.fetch_owned(2).unwrap();
        assert_eq!(4, row.number);
        assert_eq!(vec![10, 10, 17, 10], row.value);
        assert_eq!(vec![0, 1, 2, 3], row.index);
    }

    #[test]
    fn position_dependent_operations_request_indices_internally() {
        struct ColumnWeight;
        impl UnaryOperation<i32, u32> for ColumnWeight {
            fn apply(&self, _row: u32, column: u32, value: i32) -> i32 {
                value * (column as i32 + 1)
            }
            fn is_sparse(&self) -> bool {
                true
            }
            fn non_zero_depends_on_column(&self) -> bool {
                true
            }
        }

        let weighted = IsometricMatrix::new(csr(), ColumnWeight);
        // Ask for values only; the wrapper still needs the indices.
        let options = Options {
            sparse_extract_index: false,
            ..Options::default()
        };
        let mut extractor = weighted.sparse_row(Selection::Full, &options).unwrap();
        let row = extractor.fetch_owned(3).unwrap();
        assert_eq!(vec![8 * 2, 9 * 4], row.value);
        assert!(row.index.is_empty());
    }

    #[test]
    fn column_access_flips_the_coordinates() {
        struct RowWeight;
        impl UnaryOperation<i32, u32> for RowWeight {
            fn apply(&self, row: u32, _column: u32, value: i32) -> i32 {
                value + row as i32
            }
            fn is_sparse(&self) -> bool {
                true
            }
            fn non_zero_depends_on_row(&self) -> bool {
                true
            }
        }

        let weighted = IsometricMatrix::new(csr(), RowWeight);
        let mut extractor = weighted
            .sparse_column(Selection::Full, &Options::default())
            .unwrap();
        let column = extractor.fetch_owned(3).unwrap();
        // Column 3 holds 6 at row 0 and 9 at row 3.
        assert_eq!((vec![6, 12], vec![0, 3]), (column.value, column.index));
    }
}
