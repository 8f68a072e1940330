//! Response parser: status line, header block, body.
//!
//! # Design
//! The parser works on the raw lines handed back by the transport and never
//! does I/O itself. A 302/303 is reported back as `Parsed::Redirect` so the
//! session decides whether and where to follow it; every other non-200
//! status is an error. Bodies are read until the peer closed the
//! connection, so no `Content-Length` or chunked framing is interpreted.

use std::io::{self, Read};

use flate2::read::DeflateDecoder;

use crate::error::{HttpClientError, Result};
use crate::http::{Headers, Response};

/// Size of the gzip member header skipped before inflating. Headers with
/// optional fields (FEXTRA, FNAME, ...) are not supported.
const GZIP_HEADER_LEN: usize = 10;

/// What a raw response turned out to be.
#[derive(Debug)]
pub enum Parsed {
    /// A 200 response with headers split out and the body decoded.
    Complete(Response),
    /// A 302 or 303 with the raw `Location` value.
    Redirect { status: u16, location: String },
}

/// Parse the lines of one response.
pub fn parse(lines: &[Vec<u8>]) -> Result<Parsed> {
    let (first, rest) = lines.split_first().ok_or(HttpClientError::EmptyResponse)?;
    let status_line = String::from_utf8_lossy(first);
    let status = parse_status_line(&status_line).ok_or_else(|| HttpClientError::NoStatusLine {
        raw: lines
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect::<String>(),
    })?;

    if status == 302 || status == 303 {
        return match find_location(rest) {
            Some(location) => Ok(Parsed::Redirect { status, location }),
            None => Err(HttpClientError::MissingLocation { status }),
        };
    }
    if status != 200 {
        return Err(HttpClientError::Status { status });
    }

    let mut header = Headers::new();
    let mut header_tidy = Headers::new();
    let mut body_start = rest.len();
    for (idx, raw) in rest.iter().enumerate() {
        let line = String::from_utf8_lossy(raw);
        if line.trim().is_empty() {
            body_start = idx + 1;
            break;
        }
        match parse_header_line(&line) {
            Some((key, value)) => {
                log::trace!("header {key}: {value}");
                header.append(key, value);
                header_tidy.append(&key.to_lowercase(), value);
            }
            None => log::trace!("skipping malformed header line {:?}", line.trim_end()),
        }
    }

    let mut contents: Vec<u8> = rest[body_start.min(rest.len())..].concat();
    let gzipped = header_tidy
        .get("content-encoding")
        .is_some_and(|enc| enc.eq_ignore_ascii_case("gzip"));
    if gzipped {
        contents = inflate_gzip_body(&contents)?;
    }

    Ok(Parsed::Complete(Response {
        status,
        header,
        header_tidy,
        contents,
    }))
}

/// Status code of an `HTTP/<d>.<d> <code> <reason>` line. A code too large
/// for `u16` saturates to `u16::MAX` and still reads as a status.
pub fn parse_status_line(line: &str) -> Option<u16> {
    let start = line.find("HTTP/")?;
    let rest = &line[start + "HTTP/".len()..];
    let version = rest.as_bytes();
    if version.len() < 3
        || !version[0].is_ascii_digit()
        || version[1] != b'.'
        || !version[2].is_ascii_digit()
    {
        return None;
    }
    let code: String = rest[3..]
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if code.is_empty() {
        return None;
    }
    Some(code.parse().unwrap_or(u16::MAX))
}

/// Split `key: value`; the key is everything before the first colon and
/// must not be empty. Both sides are trimmed.
pub fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// First `Location` header (any case) in the header block. Older clients
/// scanned the body as well; a `Location:` line after the blank line is
/// body content here and is not followed.
fn find_location(lines: &[Vec<u8>]) -> Option<String> {
    for raw in lines {
        let line = String::from_utf8_lossy(raw);
        if line.trim().is_empty() {
            break;
        }
        if let Some((key, value)) = parse_header_line(&line) {
            if key.eq_ignore_ascii_case("location") && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Skip the fixed-size gzip header and inflate the raw deflate stream.
pub fn inflate_gzip_body(body: &[u8]) -> Result<Vec<u8>> {
    if body.len() < GZIP_HEADER_LEN {
        return Err(HttpClientError::Decompress(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "body shorter than a gzip header",
        )));
    }
    let mut out = Vec::new();
    DeflateDecoder::new(&body[GZIP_HEADER_LEN..])
        .read_to_end(&mut out)
        .map_err(HttpClientError::Decompress)?;
    Ok(out)
}
