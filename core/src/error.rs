//! Error types for the raw HTTP client.
//!
//! # Design
//! Connect failures get one variant per failure class so callers (and the
//! C boundary) can tell a DNS problem from a refused port without parsing
//! messages. Every status-carrying variant keeps the numeric status so the
//! caller can branch on it. `code()` flattens all of this into the single
//! integer exposed through `HttpClient::last_socket_error` and the FFI.

use std::fmt;
use std::io;

/// Connect-level code: the socket could not be created.
pub const SOCKET_CREATION_FAILED: i32 = -3;
/// Connect-level code: the host name did not resolve.
pub const DNS_LOOKUP_FAILED: i32 = -4;
/// Connect-level code: the peer refused the connection or it timed out.
pub const CONNECTION_REFUSED: i32 = -5;

/// Errors returned by `HttpClient` operations.
#[derive(Debug)]
pub enum HttpClientError {
    /// The local socket could not be created.
    SocketCreation(io::Error),

    /// The configured host did not resolve to any address.
    DnsLookup { host: String, message: String },

    /// Every resolved address refused the connection or timed out.
    ConnectionRefused(io::Error),

    /// Any other connect failure, with the OS error number when known.
    ConnectFailed { code: i32, message: String },

    /// The URI named a host other than the session host.
    HostMismatch { requested: String, configured: String },

    /// The first response line is not an HTTP status line.
    NoStatusLine { raw: String },

    /// The server answered with a status the client does not accept.
    Status { status: u16 },

    /// A 302/303 response without a `Location` header.
    MissingLocation { status: u16 },

    /// A 302/303 response pointing at a different host.
    CrossHostRedirect { status: u16, location: String },

    /// The redirect chain revisited a target or exceeded the hop limit.
    TooManyRedirects { status: u16, hops: usize },

    /// The connection closed without sending a single line.
    EmptyResponse,

    /// Writing the request or reading the response failed.
    Io(io::Error),

    /// A gzip-encoded body could not be inflated.
    Decompress(io::Error),

    /// A configuration document could not be parsed.
    Config(String),
}

impl HttpClientError {
    /// Identifying integer for this error.
    ///
    /// Connect failures map to the fixed negative codes (or the OS error
    /// number for the generic case); status-carrying errors return the
    /// HTTP status; everything else returns 0.
    pub fn code(&self) -> i32 {
        match self {
            HttpClientError::SocketCreation(_) => SOCKET_CREATION_FAILED,
            HttpClientError::DnsLookup { .. } => DNS_LOOKUP_FAILED,
            HttpClientError::ConnectionRefused(_) => CONNECTION_REFUSED,
            HttpClientError::ConnectFailed { code, .. } => *code,
            HttpClientError::Status { status }
            | HttpClientError::MissingLocation { status }
            | HttpClientError::CrossHostRedirect { status, .. }
            | HttpClientError::TooManyRedirects { status, .. } => i32::from(*status),
            _ => 0,
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpClientError::Status { status }
            | HttpClientError::MissingLocation { status }
            | HttpClientError::CrossHostRedirect { status, .. }
            | HttpClientError::TooManyRedirects { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for the errors raised while opening the connection.
    pub fn is_connect(&self) -> bool {
        matches!(
            self,
            HttpClientError::SocketCreation(_)
                | HttpClientError::DnsLookup { .. }
                | HttpClientError::ConnectionRefused(_)
                | HttpClientError::ConnectFailed { .. }
        )
    }
}

impl fmt::Display for HttpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpClientError::SocketCreation(e) => write!(f, "socket creation failed: {e}"),
            HttpClientError::DnsLookup { host, message } => {
                write!(f, "DNS lookup failure for {host}: {message}")
            }
            HttpClientError::ConnectionRefused(e) => {
                write!(f, "connection refused or timed out: {e}")
            }
            HttpClientError::ConnectFailed { message, .. } => {
                write!(f, "connection failed: {message}")
            }
            HttpClientError::HostMismatch { requested, configured } => {
                write!(f, "{requested} does not match {configured}")
            }
            HttpClientError::NoStatusLine { raw } => {
                write!(f, "no HTTP status line in response: {raw:?}")
            }
            HttpClientError::Status { status } => write!(f, "request failed with HTTP {status}"),
            HttpClientError::MissingLocation { status } => {
                write!(f, "HTTP {status} without a Location header")
            }
            HttpClientError::CrossHostRedirect { status, location } => {
                write!(f, "HTTP {status} redirects to another host: {location}")
            }
            HttpClientError::TooManyRedirects { status, hops } => {
                write!(f, "HTTP {status}: gave up after {hops} redirects")
            }
            HttpClientError::EmptyResponse => write!(f, "empty response"),
            HttpClientError::Io(e) => write!(f, "I/O error: {e}"),
            HttpClientError::Decompress(e) => write!(f, "gzip body could not be inflated: {e}"),
            HttpClientError::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for HttpClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HttpClientError::SocketCreation(e)
            | HttpClientError::ConnectionRefused(e)
            | HttpClientError::Io(e)
            | HttpClientError::Decompress(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpClientError>;
