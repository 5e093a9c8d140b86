use crate::{Error, Result};

/// A size-bounded slice of the caller's work items, submitted together.
///
/// Chunks are produced by [`chunks`] and handed to exactly one dispatcher
/// task. `index` is the chunk's position in the original sequence and only
/// exists for logging; results are never reordered by it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk<T> {
    index: usize,
    items: Vec<T>,
}

impl<T> Chunk<T> {
    pub const fn index(&self) -> usize {
        self.index
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Splits `items` into `⌈len / size⌉` chunks of `size` items each, except
/// possibly the last one.
///
/// Order is preserved within and across chunks, so concatenating the chunks
/// gives back `items`. An empty input yields no chunks.
///
/// # Errors
///
/// Returns [`Error::InvalidConfiguration`] if `size` is zero.
pub fn chunks<T>(items: Vec<T>, size: usize) -> Result<Vec<Chunk<T>>> {
    if size == 0 {
        return Err(Error::InvalidConfiguration {
            reason: "chunk size must be greater than 0".to_string(),
        });
    }

    let count = items.len().div_ceil(size);
    let mut out = Vec::with_capacity(count);
    let mut items = items.into_iter();
    for index in 0..count {
        out.push(Chunk {
            index,
            items: items.by_ref().take(size).collect(),
        });
    }
    Ok(out)
}
