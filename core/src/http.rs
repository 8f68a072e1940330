//! HTTP value types shared by the request builder, the response parser and
//! the session.
//!
//! # Design
//! Post data is a closed tagged union instead of loosely shaped maps, so the
//! encoder never has to guess whether a value is a list or a file. Response
//! headers always map a name to an ordered list of values; single-valued
//! consumers read the first entry.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross the FFI
//! boundary without lifetime concerns.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// HTTP method of a built request. Only GET and POST are ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A file attached to a form. Created by the caller, read-only to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    content: Vec<u8>,
    content_type: String,
}

impl UploadFile {
    pub fn new(name: &str, content: impl Into<Vec<u8>>, content_type: &str) -> Self {
        Self {
            name: name.to_string(),
            content: content.into(),
            content_type: content_type.to_string(),
        }
    }

    /// A file with the default `text/plain` media type.
    pub fn text(name: &str, content: impl Into<Vec<u8>>) -> Self {
        Self::new(name, content, "text/plain")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// One value in a form or query.
///
/// A `Sequence` repeats its key with a `[]` suffix for every element. A
/// `File` anywhere in a form switches the whole request to multipart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostData {
    Scalar(String),
    Sequence(Vec<PostData>),
    File(UploadFile),
}

impl PostData {
    /// True if this value or any nested value is a file.
    pub fn contains_file(&self) -> bool {
        match self {
            PostData::Scalar(_) => false,
            PostData::Sequence(items) => items.iter().any(PostData::contains_file),
            PostData::File(_) => true,
        }
    }
}

impl From<&str> for PostData {
    fn from(value: &str) -> Self {
        PostData::Scalar(value.to_string())
    }
}

impl From<String> for PostData {
    fn from(value: String) -> Self {
        PostData::Scalar(value)
    }
}

impl From<UploadFile> for PostData {
    fn from(file: UploadFile) -> Self {
        PostData::File(file)
    }
}

impl<T: Into<PostData>> From<Vec<T>> for PostData {
    fn from(items: Vec<T>) -> Self {
        PostData::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Ordered key/value pairs used both as POST data and as GET query
/// parameters. Keys keep the order in which they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<(String, PostData)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field and return the form, for chained construction.
    pub fn field(mut self, key: &str, value: impl Into<PostData>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: impl Into<PostData>) {
        self.fields.push((key.to_string(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostData)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True if any leaf of the form is a file.
    pub fn is_multipart(&self) -> bool {
        self.fields.iter().any(|(_, v)| v.contains_file())
    }
}

impl<K: AsRef<str>, V: Into<PostData>> FromIterator<(K, V)> for Form {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Form::new();
        for (k, v) in iter {
            form.push(k.as_ref(), v);
        }
        form
    }
}

/// Response headers: each name maps to the values it was sent with, in
/// arrival order. Lookups are exact on the name; build a lower-cased copy
/// (see `Response::header_tidy`) for case-insensitive access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` under `name`, folding repeats into one ordered list.
    pub fn append(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some((_, values)) => values.push(value.to_string()),
            None => self.entries.push((name.to_string(), vec![value.to_string()])),
        }
    }

    /// First value sent under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Every value sent under `name`, empty if absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Serializes as a JSON-style object of name to value list.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, values) in &self.entries {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

/// A raw request ready to be written to the socket.
///
/// Built by `HttpClient::build_request`. `target` is the request-target as
/// it appears on the start line; `bytes` is the complete wire image.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub target: String,
    pub bytes: Vec<u8>,
}

impl HttpRequest {
    /// The wire image as text, for logging and assertions.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// The structured result of a successful request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Response {
    pub status: u16,
    /// Headers with the names exactly as the server sent them.
    pub header: Headers,
    /// The same headers with every name lower-cased.
    pub header_tidy: Headers,
    /// Body bytes, already inflated when the server sent gzip.
    #[serde(skip)]
    pub contents: Vec<u8>,
}

impl Response {
    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}
