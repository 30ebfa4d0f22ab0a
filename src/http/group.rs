//! Parser pooling and event handlers.
//!
//! A [`ParserGroup`] is created once and shared by every connection. It owns
//! the callbacks that parsers invoke and a bounded free list of parser
//! storage. Up to `pool_capacity` parsers are admitted to the pool; any
//! acquired beyond that are fully functional but discarded on release.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::ParserConfig;
use crate::http::parser::{Buffers, ParseError, RequestParser};

type HeadersHandler = dyn Fn(&RequestParser) + Send + Sync;
type DataHandler = dyn Fn(&RequestParser, &[u8]) + Send + Sync;
type ErrorHandler = dyn Fn(&RequestParser, &ParseError) + Send + Sync;

pub(crate) struct Handlers {
    pub(crate) on_headers: Box<HeadersHandler>,
    pub(crate) on_body_chunk: Option<Box<DataHandler>>,
    pub(crate) on_request_end: Box<DataHandler>,
    pub(crate) on_parsing_error: Box<ErrorHandler>,
}

struct Pool {
    free: Vec<Buffers>,
    admitted: usize,
    closed: bool,
}

pub(crate) struct Shared {
    pub(crate) handlers: Handlers,
    pub(crate) max_header_bytes: usize,
    capacity: usize,
    pool: Mutex<Pool>,
    returned: Condvar,
}

impl Shared {
    pub(crate) fn recycle(&self, buffers: Buffers) {
        let mut pool = self.pool.lock();
        if pool.closed {
            pool.admitted -= 1;
        } else {
            pool.free.push(buffers);
        }
        self.returned.notify_all();
    }
}

impl Pool {
    /// Closes the pool and retires every idle parser. Returns how many were idle.
    fn close(&mut self) -> usize {
        self.closed = true;
        let idle = self.free.len();
        self.admitted -= idle;
        self.free.clear();
        idle
    }
}

/// Shared pool of request parsers plus the callbacks they report to.
///
/// Cloning is cheap and yields a handle to the same group.
#[derive(Clone)]
pub struct ParserGroup {
    shared: Arc<Shared>,
}

impl ParserGroup {
    pub fn builder() -> ParserGroupBuilder {
        ParserGroupBuilder::new()
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Checks out a parser ready to read a new request.
    ///
    /// Reuses pooled storage when available. When the pool is at capacity
    /// the parser is created outside the pool and freed on release.
    pub fn acquire(&self) -> RequestParser {
        let (buffers, pooled) = {
            let mut pool = self.shared.pool.lock();
            if pool.closed {
                (None, false)
            } else if let Some(buffers) = pool.free.pop() {
                (Some(buffers), true)
            } else if pool.admitted < self.shared.capacity {
                pool.admitted += 1;
                (None, true)
            } else {
                (None, false)
            }
        };

        if !pooled {
            tracing::debug!(
                capacity = self.shared.capacity,
                "Parser pool exhausted, creating unpooled parser"
            );
        }

        let buffers = buffers.unwrap_or_else(Buffers::new);
        RequestParser::start(Arc::clone(&self.shared), buffers, pooled)
    }

    /// Returns a parser to the group. Same as dropping it.
    pub fn release(&self, parser: RequestParser) {
        parser.release();
    }

    /// Pooled parsers alive, idle or checked out.
    ///
    /// After teardown starts this counts only parsers still checked out.
    pub fn admitted(&self) -> usize {
        self.shared.pool.lock().admitted
    }

    /// Pooled parsers currently waiting on the free list.
    pub fn idle(&self) -> usize {
        self.shared.pool.lock().free.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Tears the group down, blocking until every pooled parser is released.
    ///
    /// Parsers acquired afterwards through another handle are never pooled.
    pub fn destroy(self) {
        let mut pool = self.shared.pool.lock();
        let idle = pool.close();
        while pool.admitted > 0 {
            self.shared.returned.wait(&mut pool);
        }
        tracing::info!(idle, "Parser group destroyed");
    }

    /// Like [`destroy`](Self::destroy) but gives up after `timeout`.
    ///
    /// Returns `false` if pooled parsers were still checked out when the
    /// timeout elapsed. The group stays closed to new pooled parsers, and
    /// parsers released later are dropped.
    pub fn destroy_timeout(self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pool = self.shared.pool.lock();
        let idle = pool.close();
        while pool.admitted > 0 {
            if self.shared.returned.wait_until(&mut pool, deadline).timed_out() {
                tracing::warn!(outstanding = pool.admitted, "Parser group teardown timed out");
                return false;
            }
        }
        tracing::info!(idle, "Parser group destroyed");
        true
    }
}

/// Builder for [`ParserGroup`].
///
/// `on_headers`, `on_request_end` and `on_parsing_error` are required.
/// Without `on_body_chunk`, chunked bodies are reassembled and delivered whole
/// to `on_request_end`.
///
/// # Example
///
/// ```
/// # use trickle::http::group::ParserGroup;
/// let group = ParserGroup::builder()
///     .on_headers(|p| println!("{} {}", p.method(), p.uri()))
///     .on_request_end(|_, body| println!("{} body bytes", body.len()))
///     .on_parsing_error(|_, err| eprintln!("{err}"))
///     .build()
///     .unwrap();
///
/// let mut parser = group.acquire();
/// parser.feed(b"GET / HTTP/1.1\r\n\r\n");
/// assert!(parser.is_complete());
/// ```
pub struct ParserGroupBuilder {
    on_headers: Option<Box<HeadersHandler>>,
    on_body_chunk: Option<Box<DataHandler>>,
    on_request_end: Option<Box<DataHandler>>,
    on_parsing_error: Option<Box<ErrorHandler>>,
    config: ParserConfig,
}

impl Default for ParserGroupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserGroupBuilder {
    pub fn new() -> Self {
        Self {
            on_headers: None,
            on_body_chunk: None,
            on_request_end: None,
            on_parsing_error: None,
            config: ParserConfig::default(),
        }
    }

    pub fn on_headers<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestParser) + Send + Sync + 'static,
    {
        self.on_headers = Some(Box::new(f));
        self
    }

    pub fn on_body_chunk<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestParser, &[u8]) + Send + Sync + 'static,
    {
        self.on_body_chunk = Some(Box::new(f));
        self
    }

    pub fn on_request_end<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestParser, &[u8]) + Send + Sync + 'static,
    {
        self.on_request_end = Some(Box::new(f));
        self
    }

    pub fn on_parsing_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestParser, &ParseError) + Send + Sync + 'static,
    {
        self.on_parsing_error = Some(Box::new(f));
        self
    }

    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.config.pool_capacity = capacity;
        self
    }

    pub fn max_header_bytes(mut self, limit: usize) -> Self {
        self.config.max_header_bytes = limit;
        self
    }

    pub fn config(mut self, config: &ParserConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn build(self) -> Result<ParserGroup, &'static str> {
        let handlers = Handlers {
            on_headers: self.on_headers.ok_or("on_headers handler missing")?,
            on_body_chunk: self.on_body_chunk,
            on_request_end: self.on_request_end.ok_or("on_request_end handler missing")?,
            on_parsing_error: self
                .on_parsing_error
                .ok_or("on_parsing_error handler missing")?,
        };

        let shared = Shared {
            handlers,
            max_header_bytes: self.config.max_header_bytes,
            capacity: self.config.pool_capacity,
            pool: Mutex::new(Pool {
                free: Vec::new(),
                admitted: 0,
                closed: false,
            }),
            returned: Condvar::new(),
        };

        Ok(ParserGroup {
            shared: Arc::new(shared),
        })
    }
}
