//! Image Pool - Ordered Upload Queue
//!
//! Uploaded images wait here until placement drains them. The pool is
//! append-only; consumption advances a monotonic cursor and never revisits
//! an index. The cursor rewinds only through the session-level reset.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque image payload. The engine never inspects pixels; decoding is the
/// rendering surface's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData(pub Vec<u8>);

impl ImageData {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ImageData {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for ImageData {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

/// An uploaded image together with its position in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub index: usize,
    pub data: ImageData,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no unconsumed images remain in the pool")]
pub struct PoolExhausted;

/// Append-only upload queue with a sequential consumption cursor.
#[derive(Debug, Default, Clone)]
pub struct ImagePool {
    entries: Vec<ImageData>,
    consumed: usize,
}

impl ImagePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds images to the end of the pool. Existing entries are never
    /// truncated or reordered.
    pub fn append<I>(&mut self, images: I)
    where
        I: IntoIterator<Item = ImageData>,
    {
        self.entries.extend(images);
    }

    /// The entry at the cursor, or `None` if the pool is exhausted.
    pub fn peek_next(&self) -> Option<PoolEntry> {
        self.entries.get(self.consumed).map(|data| PoolEntry {
            index: self.consumed,
            data: data.clone(),
        })
    }

    /// Returns the entry at the cursor and advances it by one.
    pub fn consume_next(&mut self) -> Result<PoolEntry, PoolExhausted> {
        let entry = self.peek_next().ok_or(PoolExhausted)?;
        self.consumed += 1;
        Ok(entry)
    }

    pub fn remaining(&self) -> usize {
        self.entries.len() - self.consumed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Rewinds the cursor to the start. Only the session reset (template
    /// or ratio change) may call this; entries are kept.
    pub(crate) fn rewind(&mut self) {
        self.consumed = 0;
    }

    /// Drops all entries and resets the cursor. Return-to-upload teardown.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.consumed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumption_is_ordered_and_monotonic() {
        let mut pool = ImagePool::new();
        pool.append(vec![ImageData::from("a"), ImageData::from("b")]);

        let first = pool.consume_next().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.data, ImageData::from("a"));

        let second = pool.consume_next().unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(pool.remaining(), 0);
        assert_eq!(pool.consume_next(), Err(PoolExhausted));
    }

    #[test]
    fn test_append_never_disturbs_cursor() {
        let mut pool = ImagePool::new();
        pool.append(vec![ImageData::from("a")]);
        pool.consume_next().unwrap();

        pool.append(vec![ImageData::from("b")]);
        assert_eq!(pool.remaining(), 1);
        assert_eq!(pool.peek_next().unwrap().index, 1);
    }

    #[test]
    fn test_rewind_keeps_entries() {
        let mut pool = ImagePool::new();
        pool.append(vec![ImageData::from("a"), ImageData::from("b")]);
        pool.consume_next().unwrap();
        pool.rewind();
        assert_eq!(pool.consumed(), 0);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.peek_next().unwrap().index, 0);
    }
}
