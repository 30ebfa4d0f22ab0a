//! Trickle - incremental HTTP/1.x request parsing
//!
//! Parses requests from arbitrarily fragmented input using pooled parsers.

pub mod config;
pub mod conv;
pub mod http;
pub mod server;
