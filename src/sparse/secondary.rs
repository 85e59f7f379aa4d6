//! Stateful walker for secondary-direction access to compressed storage.
//!
//! Retrieving a single secondary element (say, one row of a CSC matrix) means
//! visiting every primary slab in the selection. The walker keeps one cursor
//! per slab and moves each of them just far enough per call, so that
//! consecutive secondary requests cost O(1) amortised per slab, large jumps
//! fall back to a binary search, and a whole call short-circuits when every
//! cursor is already past the requested position.

use crate::element::Index;

/// Cursor behaviour within one primary slab.
///
/// The plain compressed format moves one stored element at a time; the
/// semi-compressed format moves one *run* of duplicated indices at a time and
/// needs a compound cursor for it. One generic search routine serves both.
pub(crate) trait CursorKind<I: Index> {
    type Cursor: Copy;

    /// A cursor parked at the given storage position.
    fn at(position: usize) -> Self::Cursor;

    /// Storage position the cursor currently points at.
    fn get(cursor: Self::Cursor) -> usize;

    /// Parks the cursor at an arbitrary storage position.
    fn set(cursor: &mut Self::Cursor, position: usize);

    /// Moves the cursor one step towards `upper` (exclusive slab end).
    fn increment(cursor: &mut Self::Cursor, indices: &[I], upper: usize);

    /// Moves the cursor one step towards `lower` (inclusive slab start).
    fn decrement(cursor: &mut Self::Cursor, indices: &[I], lower: usize);
}

/// Cursor over plainly compressed storage: a bare position.
pub(crate) struct PlainCursor;

impl<I: Index> CursorKind<I> for PlainCursor {
    type Cursor = usize;

    fn at(position: usize) -> usize {
        position
    }

    fn get(cursor: usize) -> usize {
        cursor
    }

    fn set(cursor: &mut usize, position: usize) {
        *cursor = position;
    }

    fn increment(cursor: &mut usize, _indices: &[I], _upper: usize) {
        *cursor += 1;
    }

    fn decrement(cursor: &mut usize, _indices: &[I], _lower: usize) {
        *cursor -= 1;
    }
}

/// Compound cursor over semi-compressed storage, where duplicated indices
/// encode counts: the position of the run start, the run length once scanned,
/// and whether the scan happened yet.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunPosition {
    pub pointer: usize,
    pub count: usize,
    pub scanned: bool,
}

pub(crate) struct RunCursor;

impl RunCursor {
    /// Determines the length of the run the cursor points at, if it has not
    /// been determined already.
    pub(crate) fn measure<I: Index>(cursor: &mut RunPosition, indices: &[I], upper: usize) {
        if cursor.scanned {
            return;
        }
        let current = indices[cursor.pointer];
        let mut copy = cursor.pointer + 1;
        while copy < upper && indices[copy] == current {
            copy += 1;
        }
        cursor.count = copy - cursor.pointer;
        cursor.scanned = true;
    }
}

impl<I: Index> CursorKind<I> for RunCursor {
    type Cursor = RunPosition;

    fn at(position: usize) -> RunPosition {
        RunPosition {
            pointer: position,
            count: 0,
            scanned: false,
        }
    }

    fn get(cursor: RunPosition) -> usize {
        cursor.pointer
    }

    fn set(cursor: &mut RunPosition, position: usize) {
        cursor.pointer = position;
        cursor.count = 0;
        cursor.scanned = false;
    }

    fn increment(cursor: &mut RunPosition, indices: &[I], upper: usize) {
        RunCursor::measure(cursor, indices, upper);
        cursor.pointer += cursor.count;
        cursor.count = 0;
        cursor.scanned = false;
    }

    fn decrement(cursor: &mut RunPosition, indices: &[I], lower: usize) {
        if cursor.pointer == lower {
            return;
        }
        let mut copy = cursor.pointer - 1;
        let current = indices[copy];
        while copy > lower && indices[copy - 1] == current {
            copy -= 1;
        }
        cursor.count = cursor.pointer - copy;
        cursor.scanned = true;
        cursor.pointer = copy;
    }
}

/// One cursor per selected primary slab, plus the cached state that lets most
/// calls avoid touching the index storage at all.
///
/// In forward mode (`lower_bound` set) `current_indices[p]` caches
/// `indices[cursor[p]]`, or the maximum index once the cursor has reached the
/// slab end. In backward mode it instead caches the stored index just below
/// the cursor, or [`Self::decrement_fail`] at the slab start, so that a
/// further decrement can be judged without a storage lookup.
/// `closest_current_index` is the minimum (forward) or maximum (backward) of
/// those caches and drives the short-circuit.
pub(crate) struct SecondaryWalker<I: Index, C: CursorKind<I>> {
    cursors: Vec<C::Cursor>,
    current_indices: Vec<I>,
    closest_current_index: I,
    max_index: I,
    lower_bound: bool,
    last_request: I,
}

impl<I: Index, C: CursorKind<I>> SecondaryWalker<I, C> {
    /// Builds a walker over the slabs picked out by `primaries`, with each
    /// cursor parked at its slab start. `max_index` is the extent of the
    /// secondary dimension; it doubles as the end-of-slab sentinel, so it
    /// must be below `I::max_value()`.
    pub(crate) fn new(
        max_index: I,
        indices: &[I],
        pointers: &[usize],
        primaries: impl Iterator<Item = usize>,
    ) -> Self {
        let mut cursors = Vec::new();
        let mut current_indices = Vec::new();
        for primary in primaries {
            let lower = pointers[primary];
            let upper = pointers[primary + 1];
            cursors.push(C::at(lower));
            current_indices.push(if lower < upper { indices[lower] } else { max_index });
        }
        let closest_current_index = current_indices.iter().copied().min().unwrap_or(max_index);
        SecondaryWalker {
            cursors,
            current_indices,
            closest_current_index,
            max_index,
            lower_bound: true,
            last_request: I::zero(),
        }
    }

    fn decrement_fail() -> I {
        I::max_value()
    }

    /// Advances or rewinds every cursor to the requested secondary position.
    ///
    /// `store` is called once per slab holding the position (with the slab's
    /// primary coordinate and its cursor), `skip` once per slab not holding
    /// it; `slot` is the position of the slab within the selection. Callers
    /// read values through the cursor only when they need them. Returns
    /// `false` when the call short-circuited, in which case no slab holds the
    /// position and neither callback ran.
    pub(crate) fn search<F, S, K>(
        &mut self,
        secondary: I,
        to_primary: F,
        indices: &[I],
        pointers: &[usize],
        mut store: S,
        mut skip: K,
    ) -> bool
    where
        F: Fn(usize) -> I,
        S: FnMut(usize, I, &mut C::Cursor),
        K: FnMut(usize, I),
    {
        let slots = self.cursors.len();
        if secondary >= self.last_request {
            if secondary + I::one() == self.max_index {
                // The last secondary element: jump each cursor straight to
                // its slab end instead of binary-searching towards it.
                if self.lower_bound && secondary < self.closest_current_index {
                    self.last_request = secondary;
                    return false;
                }
                let mut found = false;
                for slot in 0..slots {
                    found |= self.search_end(
                        secondary,
                        slot,
                        to_primary(slot),
                        indices,
                        pointers,
                        &mut store,
                        &mut skip,
                    );
                }
                self.closest_current_index = if found { secondary } else { self.max_index };
                self.lower_bound = true;
            } else {
                if self.lower_bound {
                    if secondary < self.closest_current_index {
                        self.last_request = secondary;
                        return false;
                    }
                    for slot in 0..slots {
                        self.search_above(
                            secondary,
                            slot,
                            to_primary(slot),
                            indices,
                            pointers,
                            &mut store,
                            &mut skip,
                        );
                    }
                } else {
                    for slot in 0..slots {
                        let primary = to_primary(slot);
                        // Coming out of backward mode the caches hold
                        // next-lowest indices; re-anchor each cursor to the
                        // stored index at its position first.
                        self.reset_to_lower_bound(slot, primary, indices, pointers);
                        self.search_above(
                            secondary, slot, primary, indices, pointers, &mut store, &mut skip,
                        );
                    }
                    self.lower_bound = true;
                }
                if let Some(closest) = self.current_indices.iter().copied().min() {
                    self.closest_current_index = closest;
                }
            }
        } else if secondary.is_zero() {
            // The first secondary element: every cursor goes to its slab
            // start, no search required.
            if !self.lower_bound && self.closest_current_index == Self::decrement_fail() {
                self.last_request = secondary;
                return false;
            }
            for slot in 0..slots {
                self.search_start(slot, to_primary(slot), indices, pointers, &mut store, &mut skip);
            }
            self.closest_current_index = Self::decrement_fail();
            self.lower_bound = false;
        } else {
            if !self.lower_bound {
                if self.closest_current_index == Self::decrement_fail()
                    || secondary > self.closest_current_index
                {
                    self.last_request = secondary;
                    return false;
                }
                for slot in 0..slots {
                    // The next-lowest cache can rule a slab out without a
                    // lookup into the index storage.
                    let current = self.current_indices[slot];
                    if current < secondary || current == Self::decrement_fail() {
                        skip(slot, to_primary(slot));
                    } else {
                        self.search_below(
                            secondary,
                            slot,
                            to_primary(slot),
                            indices,
                            pointers,
                            &mut store,
                            &mut skip,
                        );
                    }
                }
            } else {
                for slot in 0..slots {
                    self.search_below(
                        secondary,
                        slot,
                        to_primary(slot),
                        indices,
                        pointers,
                        &mut store,
                        &mut skip,
                    );
                }
                self.lower_bound = false;
            }
            let fail = Self::decrement_fail();
            let mut closest = fail;
            for &current in &self.current_indices {
                if current != fail && (closest == fail || current > closest) {
                    closest = current;
                }
            }
            self.closest_current_index = closest;
        }
        self.last_request = secondary;
        true
    }

    fn reset_to_lower_bound(&mut self, slot: usize, primary: I, indices: &[I], pointers: &[usize]) {
        let upper = pointers[Index::to_usize(primary) + 1];
        let position = C::get(self.cursors[slot]);
        self.current_indices[slot] = if position != upper {
            indices[position]
        } else {
            self.max_index
        };
    }

    #[allow(clippy::too_many_arguments)]
    fn search_above<S, K>(
        &mut self,
        secondary: I,
        slot: usize,
        primary: I,
        indices: &[I],
        pointers: &[usize],
        store: &mut S,
        skip: &mut K,
    ) where
        S: FnMut(usize, I, &mut C::Cursor),
        K: FnMut(usize, I),
    {
        // Nothing to do if the cached index is already at or past the
        // request. This also covers cursors parked at their slab end, whose
        // cache holds the maximum index.
        if self.current_indices[slot] > secondary {
            skip(slot, primary);
            return;
        }
        if self.current_indices[slot] == secondary {
            store(slot, primary, &mut self.cursors[slot]);
            return;
        }

        let upper = pointers[Index::to_usize(primary) + 1];

        // Peek at the next stored index; consecutive accesses usually land
        // on or just before it.
        C::increment(&mut self.cursors[slot], indices, upper);
        let position = C::get(self.cursors[slot]);
        if position == upper {
            self.current_indices[slot] = self.max_index;
            skip(slot, primary);
            return;
        }
        self.current_indices[slot] = indices[position];
        if self.current_indices[slot] > secondary {
            skip(slot, primary);
            return;
        }
        if self.current_indices[slot] == secondary {
            store(slot, primary, &mut self.cursors[slot]);
            return;
        }

        // Binary search over the remainder of the slab.
        let next =
            position + 1 + indices[position + 1..upper].partition_point(|&stored| stored < secondary);
        C::set(&mut self.cursors[slot], next);
        if next == upper {
            self.current_indices[slot] = self.max_index;
            skip(slot, primary);
            return;
        }
        self.current_indices[slot] = indices[next];
        if self.current_indices[slot] > secondary {
            skip(slot, primary);
            return;
        }
        store(slot, primary, &mut self.cursors[slot]);
    }

    #[allow(clippy::too_many_arguments)]
    fn search_end<S, K>(
        &mut self,
        secondary: I,
        slot: usize,
        primary: I,
        indices: &[I],
        pointers: &[usize],
        store: &mut S,
        skip: &mut K,
    ) -> bool
    where
        S: FnMut(usize, I, &mut C::Cursor),
        K: FnMut(usize, I),
    {
        let lower = pointers[Index::to_usize(primary)];
        let upper = pointers[Index::to_usize(primary) + 1];
        if lower < upper && indices[upper - 1] == secondary {
            // Park at the end and step back once, which lands on the start of
            // the final run in the semi-compressed case.
            C::set(&mut self.cursors[slot], upper);
            C::decrement(&mut self.cursors[slot], indices, lower);
            self.current_indices[slot] = secondary;
            store(slot, primary, &mut self.cursors[slot]);
            true
        } else {
            C::set(&mut self.cursors[slot], upper);
            self.current_indices[slot] = self.max_index;
            skip(slot, primary);
            false
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn search_below<S, K>(
        &mut self,
        secondary: I,
        slot: usize,
        primary: I,
        indices: &[I],
        pointers: &[usize],
        store: &mut S,
        skip: &mut K,
    ) where
        S: FnMut(usize, I, &mut C::Cursor),
        K: FnMut(usize, I),
    {
        // No equality check against the cache up front: this path only runs
        // when the previous request was larger, so the stored index at the
        // cursor is known to exceed the current request.
        self.current_indices[slot] = Self::decrement_fail();
        let lower = pointers[Index::to_usize(primary)];
        let position = C::get(self.cursors[slot]);
        if position == lower {
            skip(slot, primary);
            return;
        }

        // Peek at the stored index just below the cursor.
        let candidate_at = position - 1;
        let candidate = indices[candidate_at];
        if candidate < secondary {
            self.current_indices[slot] = candidate;
            skip(slot, primary);
            return;
        }
        if candidate == secondary {
            C::decrement(&mut self.cursors[slot], indices, lower);
            if candidate_at != lower {
                self.current_indices[slot] = indices[candidate_at - 1];
            }
            store(slot, primary, &mut self.cursors[slot]);
            return;
        }

        // Binary search below the current position.
        let next = lower + indices[lower..position].partition_point(|&stored| stored < secondary);
        C::set(&mut self.cursors[slot], next);
        if next == position {
            skip(slot, primary);
            return;
        }
        if indices[next] == secondary {
            if next != lower {
                self.current_indices[slot] = indices[next - 1];
            }
            store(slot, primary, &mut self.cursors[slot]);
            return;
        }
        if next != lower {
            self.current_indices[slot] = indices[next - 1];
        }
        skip(slot, primary);
    }

    fn search_start<S, K>(
        &mut self,
        slot: usize,
        primary: I,
        indices: &[I],
        pointers: &[usize],
        store: &mut S,
        skip: &mut K,
    ) where
        S: FnMut(usize, I, &mut C::Cursor),
        K: FnMut(usize, I),
    {
        let lower = pointers[Index::to_usize(primary)];
        let upper = pointers[Index::to_usize(primary) + 1];
        self.current_indices[slot] = Self::decrement_fail();
        C::set(&mut self.cursors[slot], lower);
        if lower < upper && indices[lower].is_zero() {
            store(slot, primary, &mut self.cursors[slot]);
        } else {
            skip(slot, primary);
        }
    }
}
