//! Percent-decoding of request paths.
//!
//! Routing compares decoded text: `/caf%C3%A9` matches a `/café` pattern and
//! `/greet/ada%20lovelace` binds `ada lovelace`. Decoding is per segment, and an
//! encoded slash (`%2F`) stays encoded so it can never split a segment in two.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes that cannot appear raw in a URI path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Decode a raw URI path, segment by segment, adding a leading `/` if missing.
pub(crate) fn decode_path(raw: &str) -> String {
    let raw = raw.strip_prefix('/').unwrap_or(raw);
    let mut decoded = String::with_capacity(raw.len() + 1);
    for segment in raw.split('/') {
        decoded.push('/');
        decoded.push_str(&decode_segment(segment));
    }
    decoded
}

fn decode_segment(segment: &str) -> String {
    if !segment.contains('%') {
        return segment.to_string();
    }

    let mut decoded = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(at) = find_encoded_slash(rest) {
        decoded.push_str(&percent_decode_str(&rest[..at]).decode_utf8_lossy());
        decoded.push_str(&rest[at..at + 3]);
        rest = &rest[at + 3..];
    }
    decoded.push_str(&percent_decode_str(rest).decode_utf8_lossy());
    decoded
}

fn find_encoded_slash(segment: &str) -> Option<usize> {
    segment
        .as_bytes()
        .windows(3)
        .position(|w| w[0] == b'%' && w[1] == b'2' && (w[2] == b'F' || w[2] == b'f'))
}

/// Re-encode a decoded path so it can be placed back into a URI.
pub(crate) fn encode_path(decoded: &str) -> String {
    decoded
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
