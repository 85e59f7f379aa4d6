use std::{marker::PhantomData, sync::Arc};

use num_traits::AsPrimitive;

use crate::{
    element::{Index, Value},
    error::Error,
    extractor::{DenseExtractor, SparseExtractor, SparseRange},
    matrix::Matrix,
    options::{Options, Selection},
    oracle::Oracle,
};

/// Delayed cast of a matrix to different value and/or index types.
///
/// Useful as a compatibility layer between consumers that expect different
/// interface types. Conversion happens per fetched row/column; the wrapped
/// matrix is never materialised in the new types. Each extractor stages the
/// converted streams in buffers allocated once at construction, sized to the
/// selection.
pub struct CastMatrix<VOut, IOut, VIn: Value, IIn: Index> {
    inner: Arc<dyn Matrix<VIn, IIn>>,
    _targets: PhantomData<fn() -> (VOut, IOut)>,
}

impl<VOut, IOut, VIn, IIn> CastMatrix<VOut, IOut, VIn, IIn>
where
    VOut: Value,
    IOut: Index + AsPrimitive<IIn>,
    VIn: Value + AsPrimitive<VOut>,
    IIn: Index + AsPrimitive<IOut>,
{
    pub fn new(inner: Arc<dyn Matrix<VIn, IIn>>) -> Self {
        CastMatrix {
            inner,
            _targets: PhantomData,
        }
    }

    fn convert_selection(selection: Selection<IOut>) -> Selection<IIn> {
        match selection {
            Selection::Full => Selection::Full,
            Selection::Block { start, length } => Selection::Block {
                start: start.as_(),
                length: length.as_(),
            },
            Selection::Index(subset) => {
                Selection::Index(subset.into_iter().map(|position| position.as_()).collect())
            }
        }
    }
}

impl<VOut, IOut, VIn, IIn> Matrix<VOut, IOut> for CastMatrix<VOut, IOut, VIn, IIn>
where
    VOut: Value,
    IOut: Index + AsPrimitive<IIn>,
    VIn: Value + AsPrimitive<VOut>,
    IIn: Index + AsPrimitive<IOut>,
{
    fn nrow(&self) -> IOut {
        self.inner.nrow().as_()
    }

    fn ncol(&self) -> IOut {
        self.inner.ncol().as_()
    }

    fn is_sparse(&self) -> bool {
        self.inner.is_sparse()
    }

    fn is_sparse_proportion(&self) -> f64 {
        self.inner.is_sparse_proportion()
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
        selection: Selection<IOut>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<VOut, IOut> + 's>, Error> {
        let inner = self
            .inner
            .dense_row(Self::convert_selection(selection), options)?;
        Ok(Box::new(DenseCastExtractor::new(inner)))
    }

    fn dense_column<'s>(
        &'s self,
        selection: Selection<IOut>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<VOut, IOut> + 's>, Error> {
        let inner = self
            .inner
            .dense_column(Self::convert_selection(selection), options)?;
        Ok(Box::new(DenseCastExtractor::new(inner)))
    }

    fn sparse_row<'s>(
        &'s self,
        selection: Selection<IOut>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<VOut, IOut> + 's>, Error> {
        let inner = self
            .inner
            .sparse_row(Self::convert_selection(selection), options)?;
        Ok(Box::new(SparseCastExtractor::new(inner, options)))
    }

    fn sparse_column<'s>(
        &'s self,
        selection: Selection<IOut>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<VOut, IOut> + 's>, Error> {
        let inner = self
            .inner
            .sparse_column(Self::convert_selection(selection), options)?;
        Ok(Box::new(SparseCastExtractor::new(inner, options)))
    }
}

/// Adapts an oracle over the output index type to the index type of the
/// wrapped matrix.
struct CastOracle<IOut, IIn> {
    inner: Box<dyn Oracle<IOut>>,
    converted: Vec<IIn>,
}

impl<IOut, IIn> Oracle<IIn> for CastOracle<IOut, IIn>
where
    IOut: Index + AsPrimitive<IIn>,
    IIn: Index,
{
    fn predict(&mut self, n: usize) -> &[IIn] {
        let predictions = self.inner.predict(n);
        self.converted.clear();
        self.converted
            .extend(predictions.iter().map(|&position| AsPrimitive::<IIn>::as_(position)));
        &self.converted
    }
}

fn cast_oracle<IOut, IIn>(oracle: Option<Box<dyn Oracle<IOut>>>) -> Option<Box<dyn Oracle<IIn>>>
where
    IOut: Index + AsPrimitive<IIn>,
    IIn: Index,
{
    oracle.map(|inner| {
        Box::new(CastOracle {
            inner,
            converted: Vec::new(),
        }) as Box<dyn Oracle<IIn>>
    })
}

struct DenseCastExtractor<'a, VOut, IOut, VIn: Value, IIn: Index> {
    inner: Box<dyn DenseExtractor<VIn, IIn> + 'a>,
    stage: Vec<VIn>,
    _targets: PhantomData<fn() -> (VOut, IOut)>,
}

impl<'a, VOut, IOut, VIn, IIn> DenseCastExtractor<'a, VOut, IOut, VIn, IIn>
where
    VIn: Value,
    IIn: Index,
{
    fn new(inner: Box<dyn DenseExtractor<VIn, IIn> + 'a>) -> Self {
        let stage = vec![VIn::zero(); inner.extracted_length()];
        DenseCastExtractor {
            inner,
            stage,
            _targets: PhantomData,
        }
    }
}

impl<VOut, IOut, VIn, IIn> DenseExtractor<VOut, IOut>
    for DenseCastExtractor<'_, VOut, IOut, VIn, IIn>
where
    VOut: Value,
    IOut: Index + AsPrimitive<IIn>,
    VIn: Value + AsPrimitive<VOut>,
    IIn: Index,
{
    fn extracted_length(&self) -> usize {
        self.inner.extracted_length()
    }

    fn fetch<'s>(&'s mut self, target: IOut, buffer: &'s mut [VOut]) -> Result<&'s [VOut], Error> {
        let this = &mut *self;
        let out = this.inner.fetch(target.as_(), &mut this.stage)?;
        let produced = out.len();
        for (slot, &value) in buffer.iter_mut().zip(out) {
            *slot = value.as_();
        }
        Ok(&buffer[..produced])
    }

    fn set_oracle(&mut self, oracle: Option<Box<dyn Oracle<IOut>>>) {
        self.inner.set_oracle(cast_oracle(oracle));
    }
}

struct SparseCastExtractor<'a, VOut, IOut, VIn: Value, IIn: Index> {
    inner: Box<dyn SparseExtractor<VIn, IIn> + 'a>,
    value_stage: Vec<VIn>,
    index_stage: Vec<IIn>,
    _targets: PhantomData<fn() -> (VOut, IOut)>,
}

impl<'a, VOut, IOut, VIn, IIn> SparseCastExtractor<'a, VOut, IOut, VIn, IIn>
where
    VIn: Value,
    IIn: Index,
{
    fn new(inner: Box<dyn SparseExtractor<VIn, IIn> + 'a>, options: &Options) -> Self {
        // Only the requested streams need staging room.
        let length = inner.extracted_length();
        let value_stage = if options.sparse_extract_value {
            vec![VIn::zero(); length]
        } else {
            Vec::new()
        };
        let index_stage = if options.sparse_extract_index {
            vec![IIn::zero(); length]
        } else {
            Vec::new()
        };
        SparseCastExtractor {
            inner,
            value_stage,
            index_stage,
            _targets: PhantomData,
        }
    }
}

impl<VOut, IOut, VIn, IIn> SparseExtractor<VOut, IOut>
    for SparseCastExtractor<'_, VOut, IOut, VIn, IIn>
where
    VOut: Value,
    IOut: Index + AsPrimitive<IIn>,
    VIn: Value + AsPrimitive<VOut>,
    IIn: Index + AsPrimitive<IOut>,
{
    fn extracted_length(&self) -> usize {
        self.inner.extracted_length()
    }

    fn fetch<'s>(
        &'s mut self,
        target: IOut,
        values: &'s mut [VOut],
        indices: &'s mut [IOut],
    ) -> Result<SparseRange<'s, VOut, IOut>, Error> {
        let this = &mut *self;
        let range = this
            .inner
            .fetch(target.as_(), &mut this.value_stage, &mut this.index_stage)?;
        let number = range.number;
        let has_value = if let Some(stream) = range.value {
            for (slot, &value) in values.iter_mut().zip(stream) {
                *slot = value.as_();
            }
            true
        } else {
            false
        };
        let has_index = if let Some(stream) = range.index {
            for (slot, &position) in indices.iter_mut().zip(stream) {
                *slot = position.as_();
            }
            true
        } else {
            false
        };
        Ok(SparseRange {
            number,
            value: has_value.then(|| &values[..number]),
            index: has_index.then(|| &indices[..number]),
        })
    }

    fn set_oracle(&mut self, oracle: Option<Box<dyn Oracle<IOut>>>) {
        self.inner.set_oracle(cast_oracle(oracle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dense::DenseMatrix, sparse::CompressedSparseMatrix};

    #[test]
    fn values_and_indices_are_converted_per_fetch() {
        let inner: Arc<dyn Matrix<i32, u32>> = Arc::new(
            CompressedSparseMatrix::csr(
                2,
                3,
                vec![5, 6, 7],
                vec![0, 2, 1],
                vec![0, 2, 3],
            )
            .unwrap(),
        );
        let cast: CastMatrix<f64, u16, i32, u32> = CastMatrix::new(inner);
        assert_eq!(2u16, cast.nrow());
        let mut extractor = cast.sparse_row(Selection::Full, &Options::default()).unwrap();
        let row = extractor.fetch_owned(0).unwrap();
        assert_eq!((vec![5.0, 6.0], vec![0u16, 2]), (row.value, row.index));
    }

    #[test]
    fn casting_to_the_same_types_changes_nothing() {
        let inner: Arc<dyn Matrix<f64, u32>> =
            Arc::new(DenseMatrix::row_major(2, 2, vec![1.5, 2.5, 3.5, 4.5]).unwrap());
        let cast: CastMatrix<f64, u32, f64, u32> = CastMatrix::new(inner.clone());
        let mut direct = inner.dense_row(Selection::Full, &Options::default()).unwrap();
        let mut casted = cast.dense_row(Selection::Full, &Options::default()).unwrap();
        for row in 0..2 {
            assert_eq!(
                direct.fetch_to_vec(row).unwrap(),
                casted.fetch_to_vec(row).unwrap()
            );
        }
    }

    #[test]
    fn selections_are_translated_to_the_inner_index_type() {
        let inner: Arc<dyn Matrix<i32, u32>> =
            Arc::new(DenseMatrix::row_major(2, 4, (1..=8).collect()).unwrap());
        let cast: CastMatrix<i64, u64, i32, u32> = CastMatrix::new(inner);
        let selection = Selection::Block {
            start: 1u64,
            length: 2,
        };
        let mut extractor = cast.dense_row(selection, &Options::default()).unwrap();
        let mut buffer = vec![0i64; 2];
        assert_eq!(&[6, 7], extractor.fetch(1, &mut buffer).unwrap());
    }
}
