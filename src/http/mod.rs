//! Incremental HTTP/1.x request parsing.
//!
//! Requests are parsed from bytes as they arrive, in fragments of any size.
//! Nothing blocks: when the buffered bytes do not yet complete the next
//! token, [`RequestParser::feed`](parser::RequestParser::feed) returns and
//! the caller feeds again once the socket has more data.
//!
//! # Architecture
//!
//! - **`cursor`**: buffers raw bytes and resolves "N bytes" / "up to delimiter" requests
//! - **`parser`**: the per-request state machine driving the cursor
//! - **`group`**: bounded parser pool and the registered callbacks
//! - **`request`**: request-line and header-line splitting
//! - **`params`**: query string and url-encoded body tables
//! - **`arena`**: per-parser string storage cleared between requests
//! - **`connection`**: tokio driver feeding socket reads into parsers
//!
//! # Parser State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │  ReadingHeaders  │ ← wait for "\r\n\r\n"
//!        └────────┬─────────┘
//!                 │ on_headers
//!    ┌────────────┼──────────────────────┐
//!    │ Content-   │ Transfer-Encoding:   │ no body
//!    │ Length     │ chunked              │
//!    ▼            ▼                      │
//! ┌──────────┐ ┌──────────────────┐      │
//! │ Reading  │ │ ReadingChunkSize │◄──┐  │
//! │WholeBody │ └───┬──────────┬───┘   │  │
//! └────┬─────┘     │ size > 0 │ 0     │  │
//!      │           ▼          │       │  │
//!      │  ┌──────────────────┐│       │  │
//!      │  │ ReadingChunkData ├┼───────┘  │
//!      │  └──────────────────┘▼          │
//!      │           ┌──────────────────┐  │
//!      │           │  ReadingFooters  │◄─┤ footer line
//!      │           └────────┬─────────┘  │
//!      │                    │ blank line │
//!      ▼                    ▼            ▼
//!        ┌──────────────────┐
//!        │     Complete     │ → on_request_end
//!        └──────────────────┘
//! ```
//!
//! Malformed input moves any state to `Failed` and calls `on_parsing_error`
//! instead; `on_request_end` never fires for that request.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use trickle::http::group::ParserGroup;
//!
//! let bodies = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&bodies);
//!
//! let group = ParserGroup::builder()
//!     .on_headers(|_| {})
//!     .on_request_end(move |_, body| sink.lock().push(body.to_vec()))
//!     .on_parsing_error(|_, _| {})
//!     .build()
//!     .unwrap();
//!
//! let mut parser = group.acquire();
//! parser.feed(b"POST /form HTTP/1.1\r\nContent-Length: 5\r\n\r\nhe");
//! parser.feed(b"llo");
//! group.release(parser);
//!
//! assert_eq!(bodies.lock()[0], b"hello");
//! ```

pub mod arena;
pub mod connection;
pub mod cursor;
pub mod group;
pub mod params;
pub mod parser;
pub mod request;

pub use group::{ParserGroup, ParserGroupBuilder};
pub use params::Location;
pub use parser::{ParseError, RequestParser, State};
