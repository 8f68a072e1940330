//! Minimal blocking HTTP/1.0 client.
//!
//! # Overview
//! An `HttpClient` session is bound to one host and port. It builds raw
//! requests (query strings, plain and multipart form bodies, basic auth,
//! cookies), sends each over a fresh TCP connection, reads until the server
//! closes, and parses the status line, headers and body. 302/303 redirects
//! are followed on the same host; gzip bodies are inflated; `Set-Cookie`
//! values are stored per path and sent back on later requests.
//!
//! # Design
//! - Request building (`request`) and response parsing (`response`) never
//!   touch the network; `connection::Transport` is the only I/O seam.
//! - One connection per request. HTTP/1.0 keeps servers from answering
//!   with chunked bodies.
//! - Sessions hold mutable state (cookies, last socket error) and are not
//!   meant to be shared between threads.
//! - Errors carry HTTP statuses and connect codes as data; see
//!   `HttpClientError::code`.

pub mod client;
pub mod config;
pub mod connection;
pub mod cookie;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod uri;

pub use client::{HttpClient, SocketError};
pub use config::{ClientConfig, Credentials};
pub use connection::{Endpoint, TcpTransport, Transport};
pub use cookie::CookieJar;
pub use error::{HttpClientError, Result};
pub use http::{Form, Headers, HttpMethod, HttpRequest, PostData, Response, UploadFile};
