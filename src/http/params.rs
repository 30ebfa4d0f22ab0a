//! Key-value tables for query strings and url-encoded bodies.

use url::form_urlencoded;

/// Where a parameter lookup looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Request headers and chunked-body footers, matched by name.
    Header,
    /// The decoded query string of the request URI.
    Query,
    /// The decoded body of an `application/x-www-form-urlencoded` request.
    Body,
}

/// Decoded `key=value` pairs in their original order.
#[derive(Debug, Default, Clone)]
pub struct ParamTable {
    pairs: Vec<(String, String)>,
}

impl ParamTable {
    pub fn parse(raw: &[u8]) -> Self {
        let pairs = form_urlencoded::parse(raw)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value stored under `key`, in order of appearance.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}
