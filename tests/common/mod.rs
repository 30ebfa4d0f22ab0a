#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use trickle::http::{ParseError, ParserGroup, ParserGroupBuilder};

/// What the request line and headers looked like when `on_headers` fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub method: String,
    pub uri: String,
    pub protocol: String,
    pub headers: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Events {
    pub heads: Vec<Head>,
    pub chunks: Vec<Vec<u8>>,
    pub ends: Vec<Vec<u8>>,
    pub errors: Vec<ParseError>,
}

pub type Recorder = Arc<Mutex<Events>>;

fn recording_builder(events: &Recorder) -> ParserGroupBuilder {
    let heads = Arc::clone(events);
    let ends = Arc::clone(events);
    let errors = Arc::clone(events);

    ParserGroup::builder()
        .on_headers(move |p| {
            heads.lock().heads.push(Head {
                method: p.method().to_string(),
                uri: p.uri().to_string(),
                protocol: p.protocol().to_string(),
                headers: p.headers().map(str::to_string).collect(),
            });
        })
        .on_request_end(move |_, body| ends.lock().ends.push(body.to_vec()))
        .on_parsing_error(move |_, err| errors.lock().errors.push(err.clone()))
}

/// Group without a body-chunk handler: chunked bodies arrive whole.
pub fn buffering_group() -> (ParserGroup, Recorder) {
    let events = Recorder::default();
    let group = recording_builder(&events).build().unwrap();
    (group, events)
}

/// Group that records every body chunk as it is delivered.
pub fn streaming_group() -> (ParserGroup, Recorder) {
    let events = Recorder::default();
    let chunks = Arc::clone(&events);
    let group = recording_builder(&events)
        .on_body_chunk(move |_, chunk| chunks.lock().chunks.push(chunk.to_vec()))
        .build()
        .unwrap();
    (group, events)
}

pub fn with_builder(
    configure: impl FnOnce(ParserGroupBuilder) -> ParserGroupBuilder,
) -> (ParserGroup, Recorder) {
    let events = Recorder::default();
    let group = configure(recording_builder(&events)).build().unwrap();
    (group, events)
}

/// Feeds `pieces` to a fresh parser and returns what the callbacks saw.
///
/// Like a connection driver, stops feeding once the parser is complete or failed.
pub fn parse_pieces(group: &ParserGroup, events: &Recorder, pieces: &[&[u8]]) -> Events {
    *events.lock() = Events::default();
    let mut parser = group.acquire();
    for piece in pieces.iter().filter(|p| !p.is_empty()) {
        if parser.feed(piece).is_complete() {
            break;
        }
    }
    group.release(parser);
    events.lock().clone()
}
