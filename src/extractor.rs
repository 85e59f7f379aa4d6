use crate::{
    element::{Index, Value},
    error::Error,
    oracle::Oracle,
};

/// One target-dimension slice of structural non-zeros.
///
/// Produced by [`SparseExtractor::fetch`]. The streams borrow either the
/// caller's buffers or storage owned by the extractor and stay valid until
/// the next call on the same extractor. A stream is absent exactly when the
/// corresponding extraction flag in [`crate::Options`] was disabled.
///
/// Values are not guaranteed to be non-zero; a backend may explicitly store
/// zeros. Consumers may only assume that positions absent from the range are
/// zero.
#[derive(Debug, Clone, Copy)]
pub struct SparseRange<'a, V, I> {
    /// Number of structural non-zeros in the slice.
    pub number: usize,
    /// Values of the structural non-zeros, `number` of them, or `None` if
    /// value extraction was disabled.
    pub value: Option<&'a [V]>,
    /// Positions of the structural non-zeros along the non-target dimension,
    /// `number` of them, or `None` if index extraction was disabled. All
    /// positions lie within the extractor's selection.
    pub index: Option<&'a [I]>,
}

/// Owned counterpart of [`SparseRange`], for callers who want to keep a
/// fetched slice around. See [`SparseExtractor::fetch_owned`].
#[derive(Debug, Clone, PartialEq)]
pub struct SparseContents<V, I> {
    /// Number of structural non-zeros in the slice.
    pub number: usize,
    /// Values, `number` of them, or empty if value extraction was disabled.
    pub value: Vec<V>,
    /// Positions, `number` of them, or empty if index extraction was
    /// disabled.
    pub index: Vec<I>,
}

/// Produces one dense row or column per call.
///
/// An extractor is a stateful iterator keyed by the target index passed to
/// each [`fetch`](Self::fetch) call. It is owned uniquely by the caller, must
/// not outlive the matrix it was created from, and is meant for a single
/// thread. Repeated calls with the same target index produce identical
/// output.
pub trait DenseExtractor<V: Value, I: Index> {
    /// Number of elements produced per fetch, as implied by the selection the
    /// extractor was constructed with.
    fn extracted_length(&self) -> usize;

    /// Fetches the contents of the row/column `target`, restricted to the
    /// extractor's selection and in non-target order.
    ///
    /// `buffer` must hold at least [`extracted_length`](Self::extracted_length)
    /// elements. The returned slice either aliases `buffer` (the backend
    /// copied) or points into backend-owned storage (zero-copy); it is valid
    /// until the next call on this extractor.
    fn fetch<'s>(&'s mut self, target: I, buffer: &'s mut [V]) -> Result<&'s [V], Error>;

    /// Replaces the oracle used to predict future `fetch` targets. `None`
    /// disables prediction. Purely advisory; the default does nothing.
    fn set_oracle(&mut self, oracle: Option<Box<dyn Oracle<I>>>) {
        let _ = oracle;
    }

    /// Like [`fetch`](Self::fetch), but always materialises the slice in
    /// `buffer`.
    fn fetch_copy(&mut self, target: I, buffer: &mut [V]) -> Result<(), Error> {
        let buffer_start = buffer.as_ptr();
        // When the backend returned a borrow of its own storage we cannot
        // copy it into `buffer` while the borrow is live, so it takes a hop
        // through an owned vector first.
        let spilled = {
            let out = self.fetch(target, &mut *buffer)?;
            if std::ptr::eq(out.as_ptr(), buffer_start) {
                None
            } else {
                Some(out.to_vec())
            }
        };
        if let Some(values) = spilled {
            buffer[..values.len()].copy_from_slice(&values);
        }
        Ok(())
    }

    /// Fetches into a freshly allocated vector of
    /// [`extracted_length`](Self::extracted_length) elements.
    fn fetch_to_vec(&mut self, target: I) -> Result<Vec<V>, Error> {
        let mut buffer = vec![V::zero(); self.extracted_length()];
        let out = self.fetch(target, &mut buffer)?;
        Ok(out.to_vec())
    }
}

/// Produces one sparse row or column per call.
///
/// The sparse sibling of [`DenseExtractor`]; the same ownership, threading
/// and reuse rules apply. With ordered extraction enabled (the default) the
/// returned indices are strictly increasing; without it the same set of
/// entries is returned in some order.
pub trait SparseExtractor<V: Value, I: Index> {
    /// Number of selected elements, an upper bound on the number of entries
    /// any fetch can return.
    fn extracted_length(&self) -> usize;

    /// Fetches the structural non-zeros of the row/column `target`,
    /// restricted to the extractor's selection.
    ///
    /// Each buffer must hold at least
    /// [`extracted_length`](Self::extracted_length) elements, except that the
    /// buffer of a stream disabled in [`crate::Options`] is never written and
    /// may be empty. The returned streams may alias the buffers or point into
    /// backend-owned storage and are valid until the next call on this
    /// extractor.
    fn fetch<'s>(
        &'s mut self,
        target: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> Result<SparseRange<'s, V, I>, Error>;

    /// Replaces the oracle used to predict future `fetch` targets. `None`
    /// disables prediction. Purely advisory; the default does nothing.
    fn set_oracle(&mut self, oracle: Option<Box<dyn Oracle<I>>>) {
        let _ = oracle;
    }

    /// Fetches into freshly allocated vectors.
    fn fetch_owned(&mut self, target: I) -> Result<SparseContents<V, I>, Error> {
        let length = self.extracted_length();
        let mut value_buffer = vec![V::zero(); length];
        let mut index_buffer = vec![I::zero(); length];
        let range = self.fetch(target, &mut value_buffer, &mut index_buffer)?;
        Ok(SparseContents {
            number: range.number,
            value: range.value.map(|v| v.to_vec()).unwrap_or_default(),
            index: range.index.map(|i| i.to_vec()).unwrap_or_default(),
        })
    }
}
