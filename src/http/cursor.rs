//! Byte buffering for incremental parsing.
//!
//! A [`StreamCursor`] accumulates raw bytes as they arrive and answers two
//! kinds of requests: "the next N bytes" and "everything up to and including
//! the next delimiter". A request either resolves immediately, handing back
//! the byte range it covers, or is remembered as pending until a later
//! [`append`](StreamCursor::append) supplies enough data.
//!
//! The cursor only tracks *whether* a token is complete. What the token means
//! is decided by the caller, which keeps the parser free of partial-read
//! bookkeeping.
//!
//! Ranges handed out index into the cursor's store and stay valid until the
//! next `append` or `clear`. Bytes before the consumed offset are never
//! delivered twice.

use bytes::{Buf, BytesMut};
use std::ops::Range;

const INITIAL_CAPACITY: usize = 4096;

/// A request the cursor could not satisfy yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Need {
    /// Exactly this many bytes.
    Exact(usize),
    /// Bytes through the first occurrence of the delimiter.
    Until(&'static [u8]),
}

#[derive(Debug)]
pub struct StreamCursor {
    store: BytesMut,
    offset: usize,
    pending: Option<Need>,
    // No pending delimiter starts before this index.
    searched: usize,
}

impl Default for StreamCursor {
    /// An empty cursor that allocates on first append.
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl StreamCursor {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: BytesMut::with_capacity(capacity),
            offset: 0,
            pending: None,
            searched: 0,
        }
    }

    /// Appends `data` and retries the pending request, if any.
    ///
    /// Returns the range of the request that became satisfied. Ranges handed
    /// out before this call are invalidated: consumed bytes are discarded
    /// here.
    pub fn append(&mut self, data: &[u8]) -> Option<Range<usize>> {
        if self.offset > 0 {
            self.store.advance(self.offset);
            self.searched = self.searched.saturating_sub(self.offset);
            self.offset = 0;
        }
        self.store.extend_from_slice(data);

        let need = self.pending?;
        self.resolve(need)
    }

    /// Requests exactly `n` bytes.
    pub fn request_exact(&mut self, n: usize) -> Option<Range<usize>> {
        self.resolve(Need::Exact(n))
    }

    /// Requests every byte up to and including the next `delimiter`.
    pub fn request_until(&mut self, delimiter: &'static [u8]) -> Option<Range<usize>> {
        self.searched = self.offset;
        self.resolve(Need::Until(delimiter))
    }

    fn resolve(&mut self, need: Need) -> Option<Range<usize>> {
        let end = match need {
            Need::Exact(n) => self
                .offset
                .checked_add(n)
                .filter(|&end| end <= self.store.len()),
            Need::Until(delimiter) => self.find(delimiter),
        };

        match end {
            Some(end) => {
                let range = self.offset..end;
                self.offset = end;
                self.searched = end;
                self.pending = None;
                Some(range)
            }
            None => {
                self.pending = Some(need);
                None
            }
        }
    }

    fn find(&mut self, delimiter: &[u8]) -> Option<usize> {
        if delimiter.is_empty() {
            return Some(self.offset);
        }

        let start = self.searched.max(self.offset);
        match self.store[start..]
            .windows(delimiter.len())
            .position(|w| w == delimiter)
        {
            Some(pos) => Some(start + pos + delimiter.len()),
            None => {
                // A partial delimiter may straddle the end of the store.
                let tail = self.store.len().saturating_sub(delimiter.len() - 1);
                self.searched = start.max(tail);
                None
            }
        }
    }

    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        &self.store[range]
    }

    pub fn pending(&self) -> Option<Need> {
        self.pending
    }

    /// Bytes buffered but not yet delivered by any request.
    pub fn unconsumed(&self) -> &[u8] {
        &self.store[self.offset..]
    }

    /// Forgets all data and any pending request, keeping the allocation.
    pub fn clear(&mut self) {
        self.store.clear();
        self.offset = 0;
        self.searched = 0;
        self.pending = None;
    }
}
