//! Request builder: query strings, form bodies and the raw request image.
//!
//! # Design
//! The builder borrows everything it needs from the session and never
//! touches the network, so the exact bytes of a request can be asserted in
//! tests. HTTP/1.0 is used on purpose: servers then never answer with a
//! chunked body, which the response parser does not handle.
//!
//! Plain form bodies are emitted verbatim (`key=value` joined by `&`,
//! nothing escaped) because the servers this client talks to expect that
//! format. Query strings built for GET requests are percent-encoded.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::ClientConfig;
use crate::cookie::CookieJar;
use crate::http::{Form, HttpMethod, HttpRequest, PostData, UploadFile};
use crate::uri::Uri;

/// Value of the fixed `Accept` header.
pub const ACCEPT: &str =
    "text/xml,application/xml,application/xhtml+xml,text/html,text/plain,image/png,image/jpeg,image/gif,*/*";

/// Characters left untouched in query values: ASCII alphanumerics and `-_.`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// A leaf of a flattened form together with its (possibly `[]`-suffixed) key.
enum Leaf<'a> {
    Text(String, &'a str),
    File(String, &'a UploadFile),
}

/// Walk `value`, suffixing `key` with `[]` for every sequence level.
fn flatten<'a>(key: String, value: &'a PostData, out: &mut Vec<Leaf<'a>>) {
    match value {
        PostData::Scalar(text) => out.push(Leaf::Text(key, text)),
        PostData::File(file) => out.push(Leaf::File(key, file)),
        PostData::Sequence(items) => {
            for item in items {
                flatten(format!("{key}[]"), item, out);
            }
        }
    }
}

fn leaves(form: &Form) -> Vec<Leaf<'_>> {
    let mut out = Vec::new();
    for (key, value) in form.iter() {
        flatten(key.to_string(), value, &mut out);
    }
    out
}

/// Percent-encoded query string: `{"a": ["x","y"], "b": "z"}` becomes
/// `a[]=x&a[]=y&b=z`. Keys are emitted as given; file leaves are skipped.
pub fn query_string(form: &Form) -> String {
    let mut parts = Vec::new();
    for leaf in leaves(form) {
        match leaf {
            Leaf::Text(key, value) => {
                parts.push(format!("{key}={}", utf8_percent_encode(value, QUERY_VALUE)));
            }
            Leaf::File(key, file) => {
                log::warn!("file {} under {key} cannot be sent in a query string", file.name());
            }
        }
    }
    parts.join("&")
}

/// `application/x-www-form-urlencoded` body, emitted without escaping.
pub fn plain_body(form: &Form) -> String {
    let mut parts = Vec::new();
    for leaf in leaves(form) {
        match leaf {
            Leaf::Text(key, value) => parts.push(format!("{key}={value}")),
            Leaf::File(key, file) => {
                log::warn!("file {} under {key} dropped from a plain form body", file.name());
            }
        }
    }
    parts.join("&")
}

/// `multipart/form-data` body with one part per leaf and a single closing
/// boundary line. Empty when the form has no leaves.
pub fn multipart_body(form: &Form, boundary: &str) -> Vec<u8> {
    let mut body = Vec::new();
    let parts = leaves(form);
    if parts.is_empty() {
        return body;
    }

    for leaf in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match leaf {
            Leaf::File(key, file) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{key}\"; filename=\"{}\"\r\n",
                        file.name()
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type()).as_bytes());
                body.extend_from_slice(file.content());
                body.extend_from_slice(b"\r\n");
            }
            Leaf::Text(key, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{key}\"\r\n\r\n{value}\r\n").as_bytes(),
                );
            }
        }
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// Encoded form body and whether it is multipart.
pub fn encode_form(form: &Form, boundary: &str) -> (Vec<u8>, bool) {
    if form.is_multipart() {
        (multipart_body(form, boundary), true)
    } else {
        (plain_body(form).into_bytes(), false)
    }
}

/// Assembles raw requests from session state.
pub struct RequestBuilder<'a> {
    pub host: &'a str,
    pub config: &'a ClientConfig,
    pub referer: Option<&'a str>,
    pub boundary: &'a str,
    pub cookies: &'a CookieJar,
}

impl RequestBuilder<'_> {
    /// Build the complete request for `target` (path plus optional query).
    ///
    /// The method is POST only when `form` encodes to a non-empty body.
    pub fn build(&self, target: &str, form: Option<&Form>) -> HttpRequest {
        let encoded = form
            .map(|f| encode_form(f, self.boundary))
            .filter(|(body, _)| !body.is_empty());
        let method = if encoded.is_some() {
            HttpMethod::Post
        } else {
            HttpMethod::Get
        };

        let mut lines = vec![
            format!("{} {target} HTTP/1.0", method.as_str()),
            format!("Host: {}", self.host),
            format!("User-Agent: {}", self.config.user_agent),
            format!("Accept: {ACCEPT}"),
        ];
        if self.config.use_gzip {
            lines.push("Accept-encoding: gzip".to_string());
        }
        lines.push(format!("Accept-language: {}", self.config.accept_language));
        if let Some(referer) = self.referer.filter(|r| !r.is_empty()) {
            lines.push(format!("Referer: {referer}"));
        }
        if method == HttpMethod::Post && self.config.keep_alive {
            lines.push("Connection: Keep-Alive".to_string());
        }
        if !self.config.use_cache {
            lines.push("Cache-Control: no-cache".to_string());
        }

        let path = Uri::parse(target).path;
        let cookie_path = if path.is_empty() { "/" } else { path.as_str() };
        if let Some(cookie) = self.cookies.header_for(cookie_path) {
            lines.push(format!("Cookie: {cookie}"));
        }

        if let Some(creds) = &self.config.credentials {
            let token = BASE64.encode(format!("{}:{}", creds.username, creds.password));
            lines.push(format!("Authorization: BASIC {token}"));
        }

        let mut body = Vec::new();
        if let Some((encoded_body, multipart)) = encoded {
            if multipart {
                lines.push(format!("Content-Type: multipart/form-data, boundary={}", self.boundary));
            } else {
                lines.push("Content-Type: application/x-www-form-urlencoded".to_string());
            }
            lines.push(format!("Content-Length: {}", encoded_body.len()));
            body = encoded_body;
        }

        let mut bytes = lines.join("\r\n").into_bytes();
        bytes.extend_from_slice(b"\r\n\r\n");
        bytes.extend_from_slice(&body);

        HttpRequest {
            method,
            target: target.to_string(),
            bytes,
        }
    }
}
