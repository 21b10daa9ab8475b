//! Cursor-based batching over an ordered collection.

/// Yields contiguous, non-overlapping views of a slice in order.
///
/// The batch size is chosen per call, so callers can change it between
/// batches; the cursor only moves by the number of elements returned.
#[derive(Debug, Clone)]
pub struct Batcher<'a, T> {
    collection: &'a [T],
    next_start: usize,
}

impl<'a, T> Batcher<'a, T> {
    pub fn new(collection: &'a [T]) -> Self {
        Self {
            collection,
            next_start: 0,
        }
    }

    /// Return up to `size` elements starting at the cursor.
    ///
    /// Clamps to the remaining elements; `size == 0` or an exhausted batcher
    /// yields an empty slice without moving the cursor.
    pub fn next(&mut self, size: usize) -> &'a [T] {
        let remaining = self.collection.len() - self.next_start;
        let end = self.next_start + size.min(remaining);
        let batch = &self.collection[self.next_start..end];
        self.next_start = end;
        batch
    }

    /// True if a call to [`Batcher::next`] with a positive size would yield
    /// a non-empty batch.
    pub fn has_next(&self) -> bool {
        self.next_start < self.collection.len()
    }

    /// Number of elements not yet handed out.
    pub fn remaining(&self) -> usize {
        self.collection.len() - self.next_start
    }
}
