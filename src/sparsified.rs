use crate::{
    element::{Index, Value},
    error::Error,
    extractor::{DenseExtractor, SparseExtractor, SparseRange},
    options::{Options, Selection},
    oracle::Oracle,
};

/// Sparse facade over a dense extractor.
///
/// Backs the default sparse factories of [`crate::Matrix`] for strictly dense
/// implementations: the dense extraction runs as usual and every selected
/// position is reported as a structural non-zero, zeros included. The facade
/// only adds the index stream implied by the selection.
pub(crate) struct SparsifiedWrapper<'a, V: Value, I: Index> {
    dense: Box<dyn DenseExtractor<V, I> + 'a>,
    selection: Selection<I>,
    needs_value: bool,
    needs_index: bool,
}

impl<'a, V: Value, I: Index> SparsifiedWrapper<'a, V, I> {
    pub(crate) fn new(
        dense: Box<dyn DenseExtractor<V, I> + 'a>,
        selection: Selection<I>,
        options: &Options,
    ) -> Self {
        SparsifiedWrapper {
            dense,
            selection,
            needs_value: options.sparse_extract_value,
            needs_index: options.sparse_extract_index,
        }
    }
}

impl<V: Value, I: Index> SparseExtractor<V, I> for SparsifiedWrapper<'_, V, I> {
    fn extracted_length(&self) -> usize {
        self.dense.extracted_length()
    }

    fn fetch<'s>(
        &'s mut self,
        target: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> Result<SparseRange<'s, V, I>, Error> {
        let number = self.dense.extracted_length();
        let value = if self.needs_value {
            Some(self.dense.fetch(target, values)?)
        } else {
            None
        };
        let index = if self.needs_index {
            match &self.selection {
                Selection::Full => {
                    for (position, slot) in indices[..number].iter_mut().enumerate() {
                        *slot = I::from_usize(position);
                    }
                }
                Selection::Block { start, .. } => {
                    let first = Index::to_usize(*start);
                    for (position, slot) in indices[..number].iter_mut().enumerate() {
                        *slot = I::from_usize(first + position);
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
        self.dense.set_oracle(oracle);
    }
}
