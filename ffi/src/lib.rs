//! C-ABI wrapper around `rawhttp-core`.
//!
//! # Overview
//! Exposes an `HttpClient` session through `extern "C"` functions so any
//! language with a C FFI can issue GET and form POST requests, manage
//! cookies and credentials, and read back bodies and headers.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A session handle is mutated by request calls (cookies, last socket
//!   error) and must not be used from two threads at once.
//! - A single `FfiResult` envelope conveys bodies, headers and errors.
//! - The C caller owns all returned pointers and must call the matching
//!   `rawhttp_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use rawhttp_core::{Form, PostData, UploadFile};

use types::*;

/// Borrow a C string argument; `None` when null. Invalid UTF-8 is replaced.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string.
unsafe fn str_arg(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a session for `host` (a bare name or a URL). A `port` of 0 uses
/// the URL's port, else 80.
///
/// Returns null if `host` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `rawhttp_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_client_new(host: *const c_char, port: u16) -> *mut FfiHttpClient {
    catch_unwind(|| {
        let Some(host) = (unsafe { str_arg(host) }) else {
            return std::ptr::null_mut();
        };
        let client = if port == 0 {
            rawhttp_core::HttpClient::new(&host)
        } else {
            rawhttp_core::HttpClient::with_port(&host, port)
        };
        Box::into_raw(Box::new(FfiHttpClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a session created by `rawhttp_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_client_free(client: *mut FfiHttpClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Set the connect/read timeout in seconds (values below 1 become 1).
/// Returns false if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_set_timeout(client: *mut FfiHttpClient, secs: u64) -> bool {
    catch_unwind(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        client.inner.set_timeout(secs);
        true
    })
    .unwrap_or(false)
}

/// Replace the `User-Agent` value. Returns false on a null argument.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_set_user_agent(client: *mut FfiHttpClient, user_agent: *const c_char) -> bool {
    catch_unwind(|| {
        let Some(user_agent) = (unsafe { str_arg(user_agent) }) else {
            return false;
        };
        if client.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        client.inner.set_user_agent(&user_agent);
        true
    })
    .unwrap_or(false)
}

/// Set basic-auth credentials; a null `username` clears them.
/// Returns false if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_set_credentials(
    client: *mut FfiHttpClient,
    username: *const c_char,
    password: *const c_char,
) -> bool {
    catch_unwind(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        match unsafe { str_arg(username) } {
            Some(user) => {
                let pass = unsafe { str_arg(password) }.unwrap_or_default();
                client.inner.set_credentials(&user, &pass);
            }
            None => client.inner.clear_credentials(),
        }
        true
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Cookies
// ---------------------------------------------------------------------------

/// Store a cookie for `path` (null means `/`).
/// Returns false if `client`, `name` or `value` is null.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_set_cookie(
    client: *mut FfiHttpClient,
    name: *const c_char,
    value: *const c_char,
    path: *const c_char,
) -> bool {
    catch_unwind(|| {
        if client.is_null() {
            return false;
        }
        let (Some(name), Some(value)) = (unsafe { str_arg(name) }, unsafe { str_arg(value) }) else {
            return false;
        };
        let path = unsafe { str_arg(path) }.unwrap_or_else(|| "/".to_string());
        let client = unsafe { &mut *client };
        client.inner.set_cookie(&name, &value, &path);
        true
    })
    .unwrap_or(false)
}

/// Drop every stored cookie. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_clear_cookies(client: *mut FfiHttpClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            let client = unsafe { &mut *client };
            client.inner.clear_cookies();
        });
    }
}

/// Cookies stored for exactly `path`, as a JSON object of name to value.
///
/// Returns null on a null argument. Free with `rawhttp_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_cookies_json(client: *const FfiHttpClient, path: *const c_char) -> *mut c_char {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(path) = (unsafe { str_arg(path) }) else {
            return std::ptr::null_mut();
        };
        let cookies = unsafe { &*client }.inner.cookies(&path);
        match serde_json::to_string(&cookies) {
            Ok(json) => c_string(json),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// GET `uri` (a path or a URL on the session host), following redirects.
///
/// Never returns null. Free the result with `rawhttp_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_get(client: *mut FfiHttpClient, uri: *const c_char) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let Some(uri) = (unsafe { str_arg(uri) }) else {
            return FfiResult::null_arg("uri");
        };
        let client = unsafe { &mut *client };
        match client.inner.do_request(&uri, None) {
            Ok(resp) => FfiResult::ok(resp),
            Err(e) => FfiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in rawhttp_get"))
}

/// POST `fields_len` form fields to `uri`. With no fields (or only empty
/// ones) the request goes out as a GET.
///
/// Never returns null. Free the result with `rawhttp_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_post_form(
    client: *mut FfiHttpClient,
    uri: *const c_char,
    fields: *const FfiFormField,
    fields_len: usize,
) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let Some(uri) = (unsafe { str_arg(uri) }) else {
            return FfiResult::null_arg("uri");
        };
        if fields.is_null() && fields_len > 0 {
            return FfiResult::null_arg("fields");
        }
        let fields = if fields_len == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(fields, fields_len) }
        };
        let form = match form_from_fields(fields) {
            Ok(form) => form,
            Err(msg) => return FfiResult::invalid_arg(msg),
        };

        let client = unsafe { &mut *client };
        match client.inner.do_request(&uri, Some(&form)) {
            Ok(resp) => FfiResult::ok(resp),
            Err(e) => FfiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in rawhttp_post_form"))
}

/// Convert caller-provided fields into a `Form`, in order.
fn form_from_fields(fields: &[FfiFormField]) -> Result<Form, String> {
    let mut form = Form::new();
    for (idx, field) in fields.iter().enumerate() {
        let name = unsafe { str_arg(field.name) }.ok_or_else(|| format!("field {idx} has a null name"))?;
        if field.value.is_null() && field.value_len > 0 {
            return Err(format!("field {name} has a null value"));
        }
        let value: &[u8] = if field.value_len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(field.value, field.value_len) }
        };

        let data = match unsafe { str_arg(field.file_name) } {
            Some(file_name) => {
                let content_type = unsafe { str_arg(field.content_type) }.unwrap_or_else(|| "text/plain".to_string());
                PostData::from(UploadFile::new(&file_name, value, &content_type))
            }
            None => PostData::from(String::from_utf8_lossy(value).into_owned()),
        };
        form.push(&name, data);
    }
    Ok(form)
}

/// Code of the most recent connect failure, or 0 when the last attempt got
/// past connecting. When `message` is non-null it receives the error text
/// (or null), to be freed with `rawhttp_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_last_socket_error(client: *const FfiHttpClient, message: *mut *mut c_char) -> i32 {
    catch_unwind(|| {
        if client.is_null() {
            return 0;
        }
        let last = unsafe { &*client }.inner.last_socket_error();
        if !message.is_null() {
            let text = last.map_or(std::ptr::null_mut(), |e| c_string(e.message.clone()));
            unsafe { *message = text };
        }
        last.map_or(0, |e| e.code)
    })
    .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResult` returned by any request function. Safe to call with
/// null.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.headers_json.is_null() {
            drop(unsafe { CString::from_raw(result.headers_json) });
        }
        if !result.body.is_null() {
            let body = std::ptr::slice_from_raw_parts_mut(result.body, result.body_len);
            drop(unsafe { Box::from_raw(body) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rawhttp_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
