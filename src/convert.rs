use log::debug;

use crate::{
    dense::DenseMatrix,
    element::{Index, Value},
    error::Error,
    matrix::Matrix,
    options::{Options, Selection, StorageOrder},
};

/// Materialises any matrix into an in-memory [`DenseMatrix`] with the
/// requested storage order.
///
/// Iteration runs along the matrix's preferred dimension; when that differs
/// from the requested order, the fetched slices are scattered with a stride
/// instead of being copied contiguously.
pub fn convert_to_dense<V: Value, I: Index>(
    matrix: &dyn Matrix<V, I>,
    order: StorageOrder,
) -> Result<DenseMatrix<V, I>, Error> {
    let nrows = matrix.nrow();
    let ncols = matrix.ncol();
    let mut values = vec![V::zero(); Index::to_usize(nrows) * Index::to_usize(ncols)];

    let by_row = matrix.prefer_rows();
    let (targets, length) = if by_row {
        (nrows, Index::to_usize(ncols))
    } else {
        (ncols, Index::to_usize(nrows))
    };
    let options = Options::default();
    let mut extractor = if by_row {
        matrix.dense_row(Selection::Full, &options)?
    } else {
        matrix.dense_column(Selection::Full, &options)?
    };

    let contiguous = by_row == (order == StorageOrder::RowMajor);
    if contiguous {
        for target in 0..Index::to_usize(targets) {
            let slice = &mut values[target * length..(target + 1) * length];
            extractor.fetch_copy(I::from_usize(target), slice)?;
        }
    } else {
        let mut buffer = vec![V::zero(); length];
        let stride = Index::to_usize(targets);
        for target in 0..Index::to_usize(targets) {
            let slice = extractor.fetch(I::from_usize(target), &mut buffer)?;
            for (position, &value) in slice.iter().enumerate() {
                values[position * stride + target] = value;
            }
        }
    }

    debug!(
        "materialised a {} x {} matrix as {order:?}",
        Index::to_usize(nrows),
        Index::to_usize(ncols)
    );
    DenseMatrix::new(nrows, ncols, values, order)
}
