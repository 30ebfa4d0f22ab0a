use std::any::Any;
use std::cell::OnceCell;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;

use crate::conv;
use crate::http::arena::{Arena, Span};
use crate::http::cursor::{Need, StreamCursor};
use crate::http::group::{ParserGroup, Shared};
use crate::http::params::{Location, ParamTable};
use crate::http::request::{self, RequestLine};

const HEAD_END: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MalformedRequestLine,
    MalformedHeaderBlock,
    MalformedChunkSize,
    HeaderTooLarge { limit: usize },
    FeedAfterCompletion,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedRequestLine => write!(f, "malformed request line"),
            ParseError::MalformedHeaderBlock => write!(f, "malformed header block"),
            ParseError::MalformedChunkSize => write!(f, "malformed chunk size"),
            ParseError::HeaderTooLarge { limit } => {
                write!(f, "header line exceeds {limit} bytes")
            }
            ParseError::FeedAfterCompletion => write!(f, "data fed after request completed"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Where a parser is in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for the request line and headers through the blank line.
    ReadingHeaders,
    /// Waiting for a `Content-Length` body.
    ReadingWholeBody,
    /// Waiting for a chunk-size line.
    ReadingChunkSize,
    /// Waiting for `size` payload bytes plus the trailing CRLF.
    ReadingChunkData { size: usize },
    /// Reading footer lines after the last chunk.
    ReadingFooters,
    /// The request was delivered through `on_request_end`.
    Complete,
    /// Parsing stopped and `on_parsing_error` was called.
    Failed,
}

impl State {
    /// True once the parser accepts no more input, successfully or not.
    pub fn is_complete(&self) -> bool {
        matches!(self, State::Complete | State::Failed)
    }
}

#[derive(Debug, Clone, Default)]
enum Body {
    #[default]
    Empty,
    Whole(Range<usize>),
    Chunked,
}

/// Storage a pooled parser keeps between requests.
#[derive(Debug, Default)]
pub(crate) struct Buffers {
    cursor: StreamCursor,
    arena: Arena,
    headers: Vec<Span>,
    chunk_body: BytesMut,
}

impl Buffers {
    pub(crate) fn new() -> Self {
        Self {
            cursor: StreamCursor::new(),
            arena: Arena::with_capacity(1024),
            headers: Vec::with_capacity(16),
            chunk_body: BytesMut::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.cursor.clear();
        self.arena.clear();
        self.headers.clear();
        self.chunk_body.clear();
    }
}

/// Incremental parser for a single HTTP/1.x request.
///
/// Obtained from [`ParserGroup::acquire`]. Bytes are pushed in with
/// [`feed`](Self::feed) in whatever fragments the transport delivers; the
/// group's callbacks fire as the request line and headers, each body chunk,
/// and the end of the request become available.
///
/// Dropping the parser (or calling [`release`](Self::release)) hands its
/// storage back to the group.
pub struct RequestParser {
    group: Arc<Shared>,
    buffers: Buffers,
    pooled: bool,
    state: State,
    method: Span,
    uri: Span,
    protocol: Span,
    body: Body,
    query: OnceCell<ParamTable>,
    form: OnceCell<ParamTable>,
    tag: Option<Box<dyn Any + Send>>,
    started: Instant,
}

impl RequestParser {
    pub(crate) fn start(group: Arc<Shared>, buffers: Buffers, pooled: bool) -> Self {
        let mut parser = Self {
            group,
            buffers,
            pooled,
            state: State::ReadingHeaders,
            method: Span::default(),
            uri: Span::default(),
            protocol: Span::default(),
            body: Body::Empty,
            query: OnceCell::new(),
            form: OnceCell::new(),
            tag: None,
            started: Instant::now(),
        };
        let ready = parser.buffers.cursor.request_until(HEAD_END);
        parser.drive(ready);
        parser
    }

    /// Pushes the next fragment of the request.
    ///
    /// Everything the buffered bytes allow is processed before returning.
    /// Feeding a parser that already completed reports
    /// [`ParseError::FeedAfterCompletion`] through `on_parsing_error`.
    pub fn feed(&mut self, data: &[u8]) -> State {
        if self.state.is_complete() {
            let err = ParseError::FeedAfterCompletion;
            tracing::warn!(error = %err, bytes = data.len(), "Rejected input");
            (self.group.handlers.on_parsing_error)(self, &err);
            return self.state;
        }

        let ready = self.buffers.cursor.append(data);
        self.drive(ready);
        self.enforce_line_limit();
        self.state
    }

    fn drive(&mut self, mut ready: Option<Range<usize>>) {
        while let Some(range) = ready {
            ready = self.advance(range);
        }
    }

    /// Consumes one resolved token and issues the next cursor request.
    fn advance(&mut self, range: Range<usize>) -> Option<Range<usize>> {
        if self.reads_line() && range.len() > self.group.max_header_bytes {
            self.fail(ParseError::HeaderTooLarge {
                limit: self.group.max_header_bytes,
            });
            return None;
        }

        match self.state {
            State::ReadingHeaders => self.on_head(range),
            State::ReadingWholeBody => {
                self.body = Body::Whole(range);
                self.finish();
                None
            }
            State::ReadingChunkSize => self.on_chunk_size(range),
            State::ReadingChunkData { size } => self.on_chunk_data(range, size),
            State::ReadingFooters => self.on_footer(range),
            State::Complete | State::Failed => None,
        }
    }

    fn on_head(&mut self, range: Range<usize>) -> Option<Range<usize>> {
        if let Err(err) = self.store_head(range) {
            self.fail(err);
            return None;
        }
        (self.group.handlers.on_headers)(self);

        let content_length = conv::to_u64(self.header("Content-Length"), 0);
        if content_length > 0 {
            let Ok(length) = usize::try_from(content_length) else {
                self.fail(ParseError::MalformedHeaderBlock);
                return None;
            };
            self.state = State::ReadingWholeBody;
            return self.buffers.cursor.request_exact(length);
        }

        let chunked = self
            .header("Transfer-Encoding")
            .is_some_and(|te| te.trim_end().eq_ignore_ascii_case("chunked"));
        if chunked {
            self.state = State::ReadingChunkSize;
            return self.buffers.cursor.request_until(CRLF);
        }

        self.finish();
        None
    }

    fn store_head(&mut self, range: Range<usize>) -> Result<(), ParseError> {
        let Buffers {
            cursor,
            arena,
            headers,
            ..
        } = &mut self.buffers;

        let block = std::str::from_utf8(cursor.slice(range))
            .map_err(|_| ParseError::MalformedHeaderBlock)?;
        let (line, lines) = request::split_head(block);
        let line = RequestLine::parse(line).ok_or(ParseError::MalformedRequestLine)?;

        self.method = arena.alloc(line.method);
        self.uri = arena.alloc(line.uri);
        self.protocol = arena.alloc(line.protocol);

        for header in lines {
            if !request::is_header_line(header) {
                return Err(ParseError::MalformedHeaderBlock);
            }
            headers.push(arena.alloc(header));
        }
        Ok(())
    }

    fn on_chunk_size(&mut self, range: Range<usize>) -> Option<Range<usize>> {
        let line = self.buffers.cursor.slice(range);
        let digits = line.iter().take_while(|b| b.is_ascii_hexdigit()).count();
        // Anything after the digits (extensions, CRLF) is ignored.
        let size = std::str::from_utf8(&line[..digits])
            .ok()
            .and_then(|hex| usize::from_str_radix(hex, 16).ok());

        match size {
            Some(0) => {
                self.state = State::ReadingFooters;
                self.buffers.cursor.request_until(CRLF)
            }
            Some(size) => match size.checked_add(CRLF.len()) {
                Some(total) => {
                    self.state = State::ReadingChunkData { size };
                    self.buffers.cursor.request_exact(total)
                }
                None => {
                    self.fail(ParseError::MalformedChunkSize);
                    None
                }
            },
            None => {
                self.fail(ParseError::MalformedChunkSize);
                None
            }
        }
    }

    fn on_chunk_data(&mut self, range: Range<usize>, size: usize) -> Option<Range<usize>> {
        let payload = range.start..range.start + size;

        match &self.group.handlers.on_body_chunk {
            Some(on_body_chunk) => on_body_chunk(self, self.buffers.cursor.slice(payload)),
            None => self
                .buffers
                .chunk_body
                .extend_from_slice(self.buffers.cursor.slice(payload)),
        }

        self.body = Body::Chunked;
        self.state = State::ReadingChunkSize;
        self.buffers.cursor.request_until(CRLF)
    }

    fn on_footer(&mut self, range: Range<usize>) -> Option<Range<usize>> {
        let line = range.start..range.end - CRLF.len();
        if line.is_empty() {
            self.body = Body::Chunked;
            self.finish();
            return None;
        }

        if let Err(err) = self.store_footer(line) {
            self.fail(err);
            return None;
        }
        self.buffers.cursor.request_until(CRLF)
    }

    fn store_footer(&mut self, range: Range<usize>) -> Result<(), ParseError> {
        let Buffers {
            cursor,
            arena,
            headers,
            ..
        } = &mut self.buffers;

        let line = std::str::from_utf8(cursor.slice(range))
            .ok()
            .filter(|line| request::is_header_line(line))
            .ok_or(ParseError::MalformedHeaderBlock)?;
        headers.push(arena.alloc(line));
        Ok(())
    }

    /// States whose tokens end at a delimiter and count against `max_header_bytes`.
    fn reads_line(&self) -> bool {
        matches!(
            self.state,
            State::ReadingHeaders | State::ReadingChunkSize | State::ReadingFooters
        )
    }

    /// Fails early once a delimited token is bound to exceed the limit.
    ///
    /// A token still waiting for its delimiter already holds every unconsumed
    /// byte, so the check agrees with the one `advance` applies to resolved
    /// tokens however the input was fragmented.
    fn enforce_line_limit(&mut self) {
        let limit = self.group.max_header_bytes;
        let waiting_for_line = matches!(self.buffers.cursor.pending(), Some(Need::Until(_)));

        if self.reads_line()
            && waiting_for_line
            && self.buffers.cursor.unconsumed().len() >= limit
        {
            self.fail(ParseError::HeaderTooLarge { limit });
        }
    }

    fn finish(&mut self) {
        self.state = State::Complete;
        let body = self.body();

        tracing::debug!(
            method = %self.method(),
            uri = %self.uri(),
            body_len = body.len(),
            elapsed = ?self.started.elapsed(),
            "Request complete"
        );

        (self.group.handlers.on_request_end)(self, body);
    }

    fn fail(&mut self, err: ParseError) {
        self.state = State::Failed;

        tracing::warn!(
            error = %err,
            method = %self.method(),
            uri = %self.uri(),
            "Failed to parse request"
        );

        (self.group.handlers.on_parsing_error)(self, &err);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Request method; empty until the headers have been parsed.
    pub fn method(&self) -> &str {
        self.buffers.arena.get(self.method)
    }

    /// Request target as sent, including any query string.
    pub fn uri(&self) -> &str {
        self.buffers.arena.get(self.uri)
    }

    pub fn protocol(&self) -> &str {
        self.buffers.arena.get(self.protocol)
    }

    /// Raw `Name: value` lines in arrival order, footers included.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.buffers
            .headers
            .iter()
            .map(|span| self.buffers.arena.get(*span))
    }

    /// First header named `key` (case-insensitive), value undecoded.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers()
            .find_map(|line| request::header_value(line, key))
    }

    /// The request body once the request is complete.
    ///
    /// This is the `Content-Length` payload or the reassembled chunks when no
    /// `on_body_chunk` handler is registered. Empty otherwise.
    pub fn body(&self) -> &[u8] {
        match &self.body {
            Body::Empty => &[],
            Body::Whole(range) => self.buffers.cursor.slice(range.clone()),
            Body::Chunked => &self.buffers.chunk_body,
        }
    }

    /// Bytes received past the end of this request.
    ///
    /// The parser never consumes them; a connection that supports pipelining
    /// can feed them to the next parser.
    pub fn leftover(&self) -> &[u8] {
        if self.state == State::Complete {
            self.buffers.cursor.unconsumed()
        } else {
            &[]
        }
    }

    /// Looks up a parameter.
    ///
    /// Query lookups are available once the headers are parsed; body lookups
    /// once the request is complete and only for url-encoded form bodies.
    /// Tables are decoded on first use and cached for the request.
    pub fn param(&self, location: Location, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        match location {
            Location::Header => self.header(key),
            Location::Query => self.query_table()?.get(key),
            Location::Body => self.form_table()?.get(key),
        }
    }

    pub fn param_or<'a>(&'a self, location: Location, key: &str, default: &'a str) -> &'a str {
        self.param(location, key).unwrap_or(default)
    }

    /// Every value of a repeated query or body parameter.
    ///
    /// Header lookups return nothing here.
    pub fn params(&self, location: Location, key: &str) -> Vec<&str> {
        if key.is_empty() {
            return Vec::new();
        }
        let table = match location {
            Location::Header => None,
            Location::Query => self.query_table(),
            Location::Body => self.form_table(),
        };
        table.map(|t| t.get_all(key)).unwrap_or_default()
    }

    pub fn param_u64(&self, location: Location, key: &str, default: u64) -> u64 {
        conv::to_u64(self.param(location, key), default)
    }

    pub fn param_i64(&self, location: Location, key: &str, default: i64) -> i64 {
        conv::to_i64(self.param(location, key), default)
    }

    pub fn param_f64(&self, location: Location, key: &str, default: f64) -> f64 {
        conv::to_f64(self.param(location, key), default)
    }

    pub fn param_bool(&self, location: Location, key: &str, default: bool) -> bool {
        conv::to_bool(self.param(location, key), default)
    }

    fn query_table(&self) -> Option<&ParamTable> {
        if self.uri.is_empty() {
            return None;
        }
        Some(self.query.get_or_init(|| {
            let query = request::query_string(self.uri()).unwrap_or("");
            ParamTable::parse(query.as_bytes())
        }))
    }

    fn form_table(&self) -> Option<&ParamTable> {
        if self.state != State::Complete {
            return None;
        }
        Some(self.form.get_or_init(|| {
            let is_form = self
                .header("Content-Type")
                .is_some_and(request::is_form_urlencoded);
            let body = self.body();
            if is_form && !body.is_empty() {
                ParamTable::parse(body)
            } else {
                ParamTable::default()
            }
        }))
    }

    /// Attaches a caller value to this request, replacing any previous one.
    pub fn set_tag<T: Any + Send>(&mut self, tag: T) {
        self.tag = Some(Box::new(tag));
    }

    pub fn tag<T: Any>(&self) -> Option<&T> {
        self.tag.as_deref()?.downcast_ref()
    }

    /// Time since the parser was acquired.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether this parser counts against the group's pool.
    pub fn is_pooled(&self) -> bool {
        self.pooled
    }

    pub fn group(&self) -> ParserGroup {
        ParserGroup::from_shared(Arc::clone(&self.group))
    }

    /// Returns the parser to its group. Equivalent to dropping it.
    pub fn release(self) {}
}

impl Drop for RequestParser {
    fn drop(&mut self) {
        if self.pooled {
            let mut buffers = std::mem::take(&mut self.buffers);
            buffers.reset();
            self.group.recycle(buffers);
        }
    }
}

impl fmt::Debug for RequestParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestParser")
            .field("state", &self.state)
            .field("method", &self.method())
            .field("uri", &self.uri())
            .field("pooled", &self.pooled)
            .finish_non_exhaustive()
    }
}
