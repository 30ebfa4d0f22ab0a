//! Request head splitting.
//!
//! These helpers work on text that is already complete: the header block
//! through its terminating blank line, or one stored header line. They split
//! on syntax only and never interpret header values.

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// The three tokens of an HTTP request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub protocol: &'a str,
}

impl<'a> RequestLine<'a> {
    /// Splits a request line into method, URI and protocol.
    ///
    /// The URI runs up to the *last* run of blanks on the line, so a URI
    /// containing spaces still parses. A trailing carriage return is never
    /// part of the protocol token. Returns `None` unless all three tokens are
    /// non-empty.
    ///
    /// # Example
    ///
    /// ```
    /// # use trickle::http::request::RequestLine;
    /// let line = RequestLine::parse("GET /a b HTTP/1.1").unwrap();
    /// assert_eq!(line.uri, "/a b");
    /// assert_eq!(line.protocol, "HTTP/1.1");
    /// ```
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let line = line.trim_start_matches(is_blank);

        let method_end = line.find(is_blank)?;
        let method = &line[..method_end];

        let rest = line[method_end..].trim_start_matches(is_blank);
        let last_blank = rest.rfind(is_blank)?;
        let uri = rest[..last_blank].trim_end_matches(is_blank);
        let protocol = &rest[last_blank + 1..];

        if method.is_empty() || uri.is_empty() || protocol.is_empty() {
            return None;
        }

        Some(Self {
            method,
            uri,
            protocol,
        })
    }
}

/// Splits a complete header block into its request line and header lines.
///
/// The block is expected to end with the blank line that terminated it.
/// Blank lines before the request line are skipped.
pub fn split_head(block: &str) -> (&str, impl Iterator<Item = &str>) {
    let block = block.trim_start_matches("\r\n");
    let block = block.strip_suffix("\r\n\r\n").unwrap_or(block);
    let (request_line, rest) = block.split_once("\r\n").unwrap_or((block, ""));
    let headers = rest.split("\r\n").filter(|line| !line.is_empty());
    (request_line, headers)
}

/// Syntactic check applied to header and footer lines.
pub fn is_header_line(line: &str) -> bool {
    !line.starts_with(is_blank) && line.contains(':')
}

/// Returns the value of `line` if it is a header named `key`.
///
/// Names compare ASCII case-insensitively. Spaces around the colon are
/// skipped and an empty value counts as absent. The value is returned as
/// written, without decoding.
pub fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let name = line.get(..key.len())?;
    if !name.eq_ignore_ascii_case(key) {
        return None;
    }

    let value = line[key.len()..]
        .trim_start_matches(' ')
        .strip_prefix(':')?
        .trim_start_matches(' ');

    (!value.is_empty()).then_some(value)
}

/// The query part of a request URI, without any fragment.
pub fn query_string(uri: &str) -> Option<&str> {
    let (_, query) = uri.split_once('?')?;
    Some(query.split_once('#').map_or(query, |(query, _)| query))
}

pub fn is_form_urlencoded(content_type: &str) -> bool {
    content_type
        .get(..FORM_URLENCODED.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(FORM_URLENCODED))
}
