use crate::{
    element::{Index, Value},
    error::Error,
    extractor::{DenseExtractor, SparseExtractor},
    options::{Options, Selection},
    sparsified::SparsifiedWrapper,
};

/// A two-dimensional numeric matrix, read one row or column at a time.
///
/// This is the abstract source of extractors. Implementations range from
/// in-memory dense and compressed sparse storage to delayed wrappers that
/// synthesise their contents on the fly; clients iterate over any of them
/// through the same six factories without materialising the whole matrix.
///
/// A matrix is immutable after construction and safe to share across
/// threads; the extractors it hands out are not, so parallel iteration is
/// done by creating one extractor per worker.
///
/// # Example
///
/// ```
/// use slicewise::{DenseExtractor, DenseMatrix, Matrix, Options, Selection};
///
/// fn column_total(matrix: &dyn Matrix<f64, u32>) -> Result<f64, slicewise::Error> {
///     let mut extractor = matrix.dense_column(Selection::Full, &Options::default())?;
///     let mut buffer = vec![0.0; extractor.extracted_length()];
///     let mut total = 0.0;
///     for column in 0..matrix.ncol() {
///         total += extractor.fetch(column, &mut buffer)?.iter().sum::<f64>();
///     }
///     Ok(total)
/// }
///
/// let matrix: DenseMatrix<f64> = DenseMatrix::row_major(2, 3, vec![1., 2., 3., 4., 5., 6.])?;
/// assert_eq!(21.0, column_total(&matrix)?);
/// # Ok::<(), slicewise::Error>(())
/// ```
pub trait Matrix<V: Value, I: Index>: Send + Sync {
    /// Number of rows.
    fn nrow(&self) -> I;

    /// Number of columns.
    fn ncol(&self) -> I;

    /// Whether the matrix is sparse, in the sense that sparse extraction is
    /// cheaper than densification.
    fn is_sparse(&self) -> bool;

    /// Proportion of the underlying data for which [`is_sparse`]
    /// (Self::is_sparse) holds. Composite matrices mixing backends report a
    /// value strictly between 0 and 1.
    fn is_sparse_proportion(&self) -> f64 {
        if self.is_sparse() { 1.0 } else { 0.0 }
    }

    /// Whether row access is cheaper than column access.
    fn prefer_rows(&self) -> bool;

    /// Proportion of the underlying data for which [`prefer_rows`]
    /// (Self::prefer_rows) holds.
    fn prefer_rows_proportion(&self) -> f64 {
        if self.prefer_rows() { 1.0 } else { 0.0 }
    }

    /// Whether extractors for the given access direction make use of an
    /// oracle. Defaults to `false`; delayed wrappers forward the question to
    /// the matrix they wrap.
    fn uses_oracle(&self, row_access: bool) -> bool {
        let _ = row_access;
        false
    }

    /// Creates an extractor producing one dense row per fetch, restricted to
    /// `selection` along the columns.
    fn dense_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error>;

    /// Creates an extractor producing one dense column per fetch, restricted
    /// to `selection` along the rows.
    fn dense_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error>;

    /// Creates an extractor producing one sparse row per fetch, restricted to
    /// `selection` along the columns.
    ///
    /// The default delegates to [`dense_row`](Self::dense_row) and densifies:
    /// every selected position is reported as a structural non-zero. Sparse
    /// backends override this with something cheaper.
    fn sparse_row<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        let dense = self.dense_row(selection.clone(), options)?;
        Ok(Box::new(SparsifiedWrapper::new(dense, selection, options)))
    }

    /// Creates an extractor producing one sparse column per fetch, restricted
    /// to `selection` along the rows. Defaults to a densified facade like
    /// [`sparse_row`](Self::sparse_row).
    fn sparse_column<'s>(
        &'s self,
        selection: Selection<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 's>, Error> {
        let dense = self.dense_column(selection.clone(), options)?;
        Ok(Box::new(SparsifiedWrapper::new(dense, selection, options)))
    }
}
