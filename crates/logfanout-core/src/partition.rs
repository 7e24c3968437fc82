//! Order-preserving fixed-size chunking.
//!
//! Chunk bounds are `[i, min(i + size, total))` with `i` stepping by `size`;
//! the last chunk is short when `total` is not a multiple of `size`.

use std::iter::FusedIterator;
use std::num::NonZeroUsize;

/// One slice of the input plus its position in the whole sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a, T> {
    pub start: usize,
    pub end: usize,
    pub items: &'a [T],
}

impl<T> Chunk<'_, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Lazy iterator over the chunks of a slice.
#[derive(Debug, Clone)]
pub struct Partition<'a, T> {
    records: &'a [T],
    size: usize,
    next_start: usize,
}

/// Split `records` into consecutive chunks of at most `size` items.
pub fn partition<T>(records: &[T], size: NonZeroUsize) -> Partition<'_, T> {
    Partition {
        records,
        size: size.get(),
        next_start: 0,
    }
}

impl<'a, T> Iterator for Partition<'a, T> {
    type Item = Chunk<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.records.len();
        if self.next_start >= total {
            return None;
        }

        let start = self.next_start;
        let end = start.saturating_add(self.size).min(total);
        self.next_start = end;

        Some(Chunk {
            start,
            end,
            items: &self.records[start..end],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.records.len().saturating_sub(self.next_start);
        let chunks = remaining.div_ceil(self.size);
        (chunks, Some(chunks))
    }
}

impl<T> ExactSizeIterator for Partition<'_, T> {}

impl<T> FusedIterator for Partition<'_, T> {}
