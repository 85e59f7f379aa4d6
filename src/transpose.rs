use std::sync::Arc;

use crate::{
    element::{Index, Value},
    error::Error,
    extractor::{DenseExtractor, SparseExtractor},
    matrix::Matrix,
    options::{Options, Selection},
};

/// Delayed transposition of a matrix.
///
/// Swaps the dimensions without touching the data: every row factory forwards
/// to the corresponding column factory of the wrapped matrix and vice versa,
/// and the returned extractors are handed back verbatim.
pub struct TransposeMatrix<V: Value, I: Index> {
    inner: Arc<dyn Matrix<V, I>>,
}

impl<V: Value, I: Index> TransposeMatrix<V, I> {
    pub fn new(inner: Arc<dyn Matrix<V, I>>) -> Self {
        TransposeMatrix { inner }
    }
}

impl<V: Value, I: Index> Matrix<V, I> for TransposeMatrix<V, I> {
    fn nrow(&self) -> I {
        self.inner.ncol()
    }

    fn ncol(&self) -> I {
        self.inner.nrow()
    }

    fn is_sparse(&self) -> bool {
        self.inner.is_sparse()
    }

    fn is_sparse_proportion(&self) -> f64 {
        self.inner.is_sparse_proportion()
    }

    fn prefer_rows(&self) -> bool {
        !self.inner.prefer_rows()
    }

    fn prefer_rows_proportion(&self) -> f64 {
        1.0 - self.inner.prefer_rows_proportion()
    }

    fn uses_oracle(&self, row_access: bool) -> bool {
        self.inner.uses_oracle(!row_access)
    }

    fn dense_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        self.inner.dense_column(selection, options)
    }

    fn dense_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        self.inner.dense_row(selection, options)
    }

    fn sparse_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        self.inner.sparse_column(selection, options)
    }

    fn sparse_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        self.inner.sparse_row(selection, options)
    }
}
