mod common;

use common::{buffering_group, parse_pieces, streaming_group, with_builder};
use trickle::http::{ParseError, State};

const CHUNKED_POST: &[u8] = b"POST /upload HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n\
3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n";

#[test]
fn test_parse_simple_get_in_one_fragment() {
    let (group, events) = buffering_group();
    let seen = parse_pieces(&group, &events, &[b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n"]);

    assert_eq!(seen.heads.len(), 1);
    let head = &seen.heads[0];
    assert_eq!(head.method, "GET");
    assert_eq!(head.uri, "/index.html");
    assert_eq!(head.protocol, "HTTP/1.1");
    assert_eq!(head.headers, vec!["Host: x"]);
    assert_eq!(seen.ends, vec![Vec::<u8>::new()]);
    assert!(seen.errors.is_empty());
}

#[test]
fn test_content_length_body_across_fragments() {
    let (group, events) = buffering_group();
    let seen = parse_pieces(
        &group,
        &events,
        &[b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\n", b"he", b"llo"],
    );

    assert_eq!(seen.ends, vec![b"hello".to_vec()]);
}

#[test]
fn test_content_length_leaves_extra_bytes_unconsumed() {
    let (group, events) = buffering_group();
    let mut parser = group.acquire();

    let state = parser.feed(b"POST /api HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcGET / HTTP/1.1\r\n");

    assert_eq!(state, State::Complete);
    assert_eq!(parser.body(), b"abc");
    assert_eq!(parser.leftover(), b"GET / HTTP/1.1\r\n");
    assert_eq!(events.lock().ends, vec![b"abc".to_vec()]);
}

#[test]
fn test_chunked_body_reassembled_without_chunk_handler() {
    let (group, events) = buffering_group();
    let seen = parse_pieces(&group, &events, &[CHUNKED_POST]);

    assert_eq!(seen.ends, vec![b"abcde".to_vec()]);
    assert!(seen.chunks.is_empty());
}

#[test]
fn test_chunked_body_streamed_to_chunk_handler() {
    let (group, events) = streaming_group();
    let seen = parse_pieces(&group, &events, &[CHUNKED_POST]);

    assert_eq!(seen.chunks, vec![b"abc".to_vec(), b"de".to_vec()]);
    assert_eq!(seen.ends, vec![Vec::<u8>::new()]);
}

#[test]
fn test_chunk_size_is_hexadecimal_and_ignores_extensions() {
    let (group, events) = buffering_group();
    let body = "a;name=value\r\n0123456789\r\n0\r\n\r\n";
    let req = format!("POST / HTTP/1.1\r\nTransfer-Encoding: Chunked\r\n\r\n{body}");
    let seen = parse_pieces(&group, &events, &[req.as_bytes()]);

    assert_eq!(seen.ends, vec![b"0123456789".to_vec()]);
}

#[test]
fn test_zero_chunk_completes_without_footers() {
    let (group, events) = buffering_group();
    let mut parser = group.acquire();

    parser.feed(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n");
    assert_eq!(parser.state(), State::ReadingFooters);

    parser.feed(b"\r\n");
    assert_eq!(parser.state(), State::Complete);
    assert_eq!(events.lock().ends, vec![Vec::<u8>::new()]);
}

#[test]
fn test_footers_join_the_header_list() {
    let (group, _events) = buffering_group();
    let mut parser = group.acquire();

    parser.feed(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
    parser.feed(b"1\r\nx\r\n0\r\nX-Checksum: 42\r\nX-Trace: on\r\n\r\n");

    assert!(parser.is_complete());
    assert_eq!(parser.header("x-checksum"), Some("42"));
    assert_eq!(
        parser.headers().collect::<Vec<_>>(),
        vec!["Transfer-Encoding: chunked", "X-Checksum: 42", "X-Trace: on"]
    );
}

#[test]
fn test_content_length_takes_precedence_over_chunked() {
    let (group, events) = buffering_group();
    let seen = parse_pieces(
        &group,
        &events,
        &[b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 4\r\n\r\n3\r\na"],
    );

    assert_eq!(seen.ends, vec![b"3\r\na".to_vec()]);
}

#[test]
fn test_fragmentation_at_every_boundary_is_transparent() {
    let requests: [&[u8]; 3] = [
        b"GET /index.html HTTP/1.1\r\nHost: x\r\nAccept: */*\r\n\r\n",
        b"PUT /doc HTTP/1.0\r\nContent-Length: 11\r\n\r\nhello world",
        CHUNKED_POST,
    ];

    for (group, events) in [buffering_group(), streaming_group()] {
        for req in requests {
            let whole = parse_pieces(&group, &events, &[req]);
            assert_eq!(whole.ends.len(), 1);

            for split in 0..=req.len() {
                let parts = parse_pieces(&group, &events, &[&req[..split], &req[split..]]);
                assert_eq!(parts, whole, "split at {split}");
            }

            let bytes: Vec<&[u8]> = req.chunks(1).collect();
            assert_eq!(parse_pieces(&group, &events, &bytes), whole);
        }
    }
}

#[test]
fn test_many_tiny_chunks_in_one_feed() {
    let (group, events) = buffering_group();
    let mut req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    for _ in 0..20_000 {
        req.extend_from_slice(b"1\r\nx\r\n");
    }
    req.extend_from_slice(b"0\r\n\r\n");

    let seen = parse_pieces(&group, &events, &[req.as_slice()]);

    assert_eq!(seen.ends[0].len(), 20_000);
    assert!(seen.ends[0].iter().all(|&b| b == b'x'));
}

#[test]
fn test_uri_with_spaces_is_tolerated() {
    let (group, events) = buffering_group();
    let seen = parse_pieces(&group, &events, &[b"GET /my file.txt HTTP/1.1\r\n\r\n"]);

    assert_eq!(seen.heads[0].uri, "/my file.txt");
    assert_eq!(seen.heads[0].protocol, "HTTP/1.1");
}

#[test]
fn test_protocol_excludes_carriage_return() {
    let (group, events) = buffering_group();
    let seen = parse_pieces(&group, &events, &[b"GET / HTTP/1.1\r\r\n\r\n"]);

    assert_eq!(seen.heads[0].protocol, "HTTP/1.1");
}

#[test]
fn test_missing_protocol_reports_one_error() {
    let (group, events) = buffering_group();
    let seen = parse_pieces(&group, &events, &[b"GET /\r\nHost: x\r\n\r\n"]);

    assert_eq!(seen.errors, vec![ParseError::MalformedRequestLine]);
    assert!(seen.ends.is_empty());
    assert!(seen.heads.is_empty());
}

#[test]
fn test_header_without_colon_is_rejected() {
    let (group, events) = buffering_group();
    let seen = parse_pieces(&group, &events, &[b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n"]);

    assert_eq!(seen.errors, vec![ParseError::MalformedHeaderBlock]);
    assert!(seen.ends.is_empty());
}

#[test]
fn test_malformed_chunk_size() {
    let (group, events) = buffering_group();
    let mut parser = group.acquire();

    parser.feed(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
    let state = parser.feed(b"zz\r\n");

    assert_eq!(state, State::Failed);
    let seen = events.lock().clone();
    assert_eq!(seen.errors, vec![ParseError::MalformedChunkSize]);
    assert!(seen.ends.is_empty());
}

#[test]
fn test_feed_after_completion_is_an_error() {
    let (group, events) = buffering_group();
    let mut parser = group.acquire();

    assert_eq!(parser.feed(b"GET / HTTP/1.1\r\n\r\n"), State::Complete);
    assert_eq!(parser.feed(b"more"), State::Complete);

    let seen = events.lock().clone();
    assert_eq!(seen.ends.len(), 1);
    assert_eq!(seen.errors, vec![ParseError::FeedAfterCompletion]);
}

#[test]
fn test_no_callbacks_after_failure() {
    let (group, events) = buffering_group();
    let mut parser = group.acquire();

    parser.feed(b"BROKEN\r\n\r\n");
    parser.feed(b"GET / HTTP/1.1\r\n\r\n");

    let seen = events.lock().clone();
    assert_eq!(
        seen.errors,
        vec![ParseError::MalformedRequestLine, ParseError::FeedAfterCompletion]
    );
    assert!(seen.ends.is_empty());
}

#[test]
fn test_oversized_header_block_fails() {
    let (group, events) = with_builder(|b| b.max_header_bytes(64));
    let mut parser = group.acquire();

    parser.feed(b"GET /");
    parser.feed(&[b'a'; 100]);

    assert_eq!(parser.state(), State::Failed);
    assert_eq!(events.lock().errors, vec![ParseError::HeaderTooLarge { limit: 64 }]);
}

#[test]
fn test_header_limit_ignores_fragmentation() {
    let (group, events) = with_builder(|b| b.max_header_bytes(64));
    let long = format!("GET / HTTP/1.1\r\nX-Long: {}\r\n\r\n", "a".repeat(80));
    let padded = format!("GET / HTTP/1.1\r\nX-Pad: {}\r\n\r\n", "p".repeat(37));
    assert_eq!(padded.len(), 64);
    let chunk_line = format!(
        "POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n1;{}\r\nx\r\n0\r\n\r\n",
        "e".repeat(70)
    );

    for (req, too_large) in [(long, true), (padded, false), (chunk_line, true)] {
        let req = req.as_bytes();
        let whole = parse_pieces(&group, &events, &[req]);
        if too_large {
            assert_eq!(whole.errors, vec![ParseError::HeaderTooLarge { limit: 64 }]);
            assert!(whole.ends.is_empty());
        } else {
            assert!(whole.errors.is_empty());
            assert_eq!(whole.ends.len(), 1);
        }

        for split in 0..=req.len() {
            let parts = parse_pieces(&group, &events, &[&req[..split], &req[split..]]);
            assert_eq!(parts, whole, "split at {split}");
        }

        let bytes: Vec<&[u8]> = req.chunks(1).collect();
        assert_eq!(parse_pieces(&group, &events, &bytes), whole);
    }
}

#[test]
fn test_large_content_length_body_is_not_limited() {
    let (group, events) = with_builder(|b| b.max_header_bytes(64));
    let body = vec![b'z'; 1000];
    let head = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len());

    let seen = parse_pieces(&group, &events, &[head.as_bytes(), body.as_slice()]);

    assert_eq!(seen.ends, vec![body]);
}

#[test]
fn test_state_progression() {
    let (group, _events) = streaming_group();
    let mut parser = group.acquire();

    assert_eq!(parser.state(), State::ReadingHeaders);
    parser.feed(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
    assert_eq!(parser.state(), State::ReadingChunkSize);
    parser.feed(b"4\r\nab");
    assert_eq!(parser.state(), State::ReadingChunkData { size: 4 });
    parser.feed(b"cd\r\n");
    assert_eq!(parser.state(), State::ReadingChunkSize);
}
