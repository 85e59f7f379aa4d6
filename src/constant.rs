use crate::{
    element::{Index, Value},
    error::Error,
    extractor::DenseExtractor,
    matrix::Matrix,
    options::{Options, Selection},
};

/// A matrix with the same value in every element.
///
/// Mostly useful as the neutral operand of delayed operations and in tests.
/// Sparse extraction goes through the densifying defaults of [`Matrix`].
#[derive(Debug, Clone)]
pub struct ConstantMatrix<V, I = u32> {
    nrows: I,
    ncols: I,
    value: V,
}

impl<V: Value, I: Index> ConstantMatrix<V, I> {
    pub fn new(nrows: I, ncols: I, value: V) -> Self {
        ConstantMatrix { nrows, ncols, value }
    }
}

impl<V: Value, I: Index> Matrix<V, I> for ConstantMatrix<V, I> {
    fn nrow(&self) -> I {
        self.nrows
    }

    fn ncol(&self) -> I {
        self.ncols
    }

    fn is_sparse(&self) -> bool {
        self.value == V::zero()
    }

    fn prefer_rows(&self) -> bool {
        true
    }

    fn dense_row<'s>(
        &'s self,
        selection: Selection<I>,
        _options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        selection.validate(self.ncols)?;
        Ok(Box::new(ConstantExtractor {
            value: self.value,
            length: selection.length(self.ncols),
            target_extent: self.nrows,
        }))
    }

    fn dense_column<'s>(
        &'s self,
        selection: Selection<I>,
        _options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 's>, Error> {
        selection.validate(self.nrows)?;
        Ok(Box::new(ConstantExtractor {
            value: self.value,
            length: selection.length(self.nrows),
            target_extent: self.ncols,
        }))
    }
}

struct ConstantExtractor<V, I> {
    value: V,
    length: usize,
    target_extent: I,
}

impl<V: Value, I: Index> DenseExtractor<V, I> for ConstantExtractor<V, I> {
    fn extracted_length(&self) -> usize {
        self.length
    }

    fn fetch<'s>(&'s mut self, target: I, buffer: &'s mut [V]) -> Result<&'s [V], Error> {
        if target >= self.target_extent {
            return Err(Error::OutOfRange {
                index: Index::to_usize(target),
                extent: Index::to_usize(self.target_extent),
            });
        }
        buffer[..self.length].fill(self.value);
        Ok(&buffer[..self.length])
    }
}
