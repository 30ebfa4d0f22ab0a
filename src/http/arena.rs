//! Per-parser string storage.
//!
//! All text a parser keeps for the lifetime of one request (request line
//! tokens, header lines, footers) is copied into a single backing `String`
//! and addressed by [`Span`] handles. Clearing the arena drops every string
//! at once while keeping the allocation for the next request.

/// Handle to a string stored in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Default)]
pub struct Arena {
    text: String,
}

impl Arena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
        }
    }

    /// Copies `s` into the arena.
    pub fn alloc(&mut self, s: &str) -> Span {
        let start = self.text.len();
        self.text.push_str(s);
        Span {
            start,
            end: self.text.len(),
        }
    }

    /// Resolves a span produced by this arena since the last [`clear`](Self::clear).
    ///
    /// A stale span resolves to the empty string instead of panicking.
    pub fn get(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}
