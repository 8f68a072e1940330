//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Results are flattened into one envelope: an error category, the message,
//! the HTTP status and connect code when there is one, the raw body bytes
//! and the lower-cased response headers as a JSON object. Conversion
//! functions live here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use rawhttp_core::{HttpClientError, Response};

/// Opaque handle to an `HttpClient` session. C callers receive a pointer to
/// this and pass it back into every FFI function.
pub struct FfiHttpClient {
    pub(crate) inner: rawhttp_core::HttpClient,
}

// ---------------------------------------------------------------------------
// Request input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// One form field supplied by the C caller.
///
/// `value` points at `value_len` bytes and may contain NULs. A non-null
/// `file_name` turns the field into a file upload (and the request into
/// multipart); `content_type` then defaults to `text/plain` when null.
#[repr(C)]
pub struct FfiFormField {
    pub name: *const c_char,
    pub value: *const u8,
    pub value_len: usize,
    pub file_name: *const c_char,
    pub content_type: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error categories returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    /// DNS, socket creation or connect failure; see `socket_errno`.
    Connect = 1,
    /// Non-200 final status; see `http_status`.
    Http = 2,
    /// Redirect without Location, to another host, or looping.
    Redirect = 3,
    /// The response could not be parsed or inflated.
    Protocol = 4,
    Io = 5,
    InvalidArg = 6,
    Panic = 7,
    NullArg = 8,
}

impl From<&HttpClientError> for FfiErrorCode {
    fn from(err: &HttpClientError) -> Self {
        match err {
            e if e.is_connect() => FfiErrorCode::Connect,
            HttpClientError::Status { .. } => FfiErrorCode::Http,
            HttpClientError::MissingLocation { .. }
            | HttpClientError::CrossHostRedirect { .. }
            | HttpClientError::TooManyRedirects { .. } => FfiErrorCode::Redirect,
            HttpClientError::NoStatusLine { .. }
            | HttpClientError::EmptyResponse
            | HttpClientError::Decompress(_) => FfiErrorCode::Protocol,
            HttpClientError::HostMismatch { .. } | HttpClientError::Config(_) => FfiErrorCode::InvalidArg,
            _ => FfiErrorCode::Io,
        }
    }
}

/// Result envelope for every request function.
///
/// On success `error_code` is `Ok`, `error_message` is null, `body` points
/// at `body_len` bytes (null when empty) and `headers_json` maps lower-cased
/// header names to lists of values. On failure `body` and `headers_json`
/// are null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub socket_errno: i32,
    pub body: *mut u8,
    pub body_len: usize,
    pub headers_json: *mut c_char,
}

/// Heap C string from `s`, with interior NULs replaced.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let s: String = s.into();
    CString::new(s.replace('\0', "\u{FFFD}"))
        .unwrap_or_default()
        .into_raw()
}

impl FfiResult {
    fn empty(error_code: FfiErrorCode) -> Self {
        FfiResult {
            error_code,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            socket_errno: 0,
            body: std::ptr::null_mut(),
            body_len: 0,
            headers_json: std::ptr::null_mut(),
        }
    }

    /// Build a success result from a parsed response.
    pub(crate) fn ok(resp: Response) -> *mut Self {
        let headers = serde_json::to_string(&resp.header_tidy).unwrap_or_else(|_| "{}".to_string());
        let body_len = resp.contents.len();
        let body = if body_len == 0 {
            std::ptr::null_mut()
        } else {
            Box::into_raw(resp.contents.into_boxed_slice()) as *mut u8
        };

        Box::into_raw(Box::new(FfiResult {
            http_status: resp.status,
            body,
            body_len,
            headers_json: c_string(headers),
            ..FfiResult::empty(FfiErrorCode::Ok)
        }))
    }

    /// Build an error result from an `HttpClientError`.
    pub(crate) fn from_error(err: HttpClientError) -> *mut Self {
        let socket_errno = if err.is_connect() { err.code() } else { 0 };
        Box::into_raw(Box::new(FfiResult {
            error_message: c_string(err.to_string()),
            http_status: err.status().unwrap_or(0),
            socket_errno,
            ..FfiResult::empty(FfiErrorCode::from(&err))
        }))
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_message: c_string(format!("null argument: {name}")),
            ..FfiResult::empty(FfiErrorCode::NullArg)
        }))
    }

    /// Build an error result for an argument that is present but unusable.
    pub(crate) fn invalid_arg(msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_message: c_string(msg),
            ..FfiResult::empty(FfiErrorCode::InvalidArg)
        }))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_message: c_string(msg),
            ..FfiResult::empty(FfiErrorCode::Panic)
        }))
    }
}
