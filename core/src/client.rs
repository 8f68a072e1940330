//! Client session bound to one host and port.
//!
//! # Design
//! `HttpClient` owns all per-session state (configuration, cookie jar,
//! multipart boundary, last connect error) and is mutated in place by every
//! call, so it is meant for one caller at a time. Building a request and
//! parsing a response are pure steps (`build_request`, `response::parse`);
//! only `Transport::exchange` touches the network.
//!
//! Redirects (302/303) are followed in a loop, not by recursion. Each hop
//! is a fresh GET without a body, must stay on the session host, and may not
//! revisit a target already fetched with a GET in the same call. The chain stops
//! after `ClientConfig::max_redirects` hops.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::config::{ClientConfig, Credentials};
use crate::connection::{Endpoint, TcpTransport, Transport};
use crate::cookie::CookieJar;
use crate::error::{HttpClientError, Result};
use crate::http::{Form, HttpMethod, HttpRequest, Response};
use crate::request::{self, RequestBuilder};
use crate::response::{self, Parsed};
use crate::uri::Uri;

pub const DEFAULT_PORT: u16 = 80;

const BOUNDARY_PREFIX: &str = "---------------------------";

/// Code and message of the most recent connect failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketError {
    pub code: i32,
    pub message: String,
}

/// Blocking HTTP/1.0 client for a single host.
#[derive(Debug)]
pub struct HttpClient<T: Transport = TcpTransport> {
    host: String,
    port: u16,
    config: ClientConfig,
    cookies: CookieJar,
    boundary: String,
    last_error: Option<SocketError>,
    transport: T,
}

impl HttpClient<TcpTransport> {
    /// Session for `host`, given either as a bare name or as a URL. The port
    /// comes from the URL when it names one, else 80.
    pub fn new(host: &str) -> Self {
        Self::with_config(host, None, ClientConfig::default())
    }

    pub fn with_port(host: &str, port: u16) -> Self {
        Self::with_config(host, Some(port), ClientConfig::default())
    }

    pub fn with_config(host: &str, port: Option<u16>, config: ClientConfig) -> Self {
        Self::with_transport(host, port, config, TcpTransport)
    }
}

impl<T: Transport> HttpClient<T> {
    /// Session that exchanges bytes through `transport`.
    pub fn with_transport(host: &str, port: Option<u16>, mut config: ClientConfig, transport: T) -> Self {
        let (host, url_port, referer) = normalize_host(host);
        if config.referer.is_none() {
            config.referer = Some(referer);
        }
        config.timeout_secs = config.timeout_secs.max(1);

        Self {
            host,
            port: port.or(url_port).unwrap_or(DEFAULT_PORT),
            config,
            cookies: CookieJar::new(),
            boundary: new_boundary(),
            last_error: None,
            transport,
        }
    }

    /// Send a request and return the final 200 response.
    ///
    /// `uri` is a path with optional query, or an absolute URL whose host
    /// must be the session host. A non-empty `form` turns the request into
    /// a POST; 302/303 answers are followed with plain GETs.
    pub fn do_request(&mut self, uri: &str, form: Option<&Form>) -> Result<Response> {
        let target = self.resolve_target(uri)?;
        let mut request = self.build_request(&target, form);
        // Targets already fetched with a GET; a POST may redirect to its own path.
        let mut visited = HashSet::new();
        if request.method == HttpMethod::Get {
            visited.insert(target);
        }
        let mut hops = 0;

        loop {
            let lines = self.send(&request)?;
            match response::parse(&lines)? {
                Parsed::Complete(resp) => {
                    let captured = self.cookies.capture(resp.header_tidy.get_all("set-cookie"));
                    if captured > 0 {
                        log::debug!("captured {captured} cookies from {}", request.target);
                    }
                    return Ok(resp);
                }
                Parsed::Redirect { status, location } => {
                    let next = self.redirect_target(status, &location)?;
                    hops += 1;
                    if hops > self.config.max_redirects || !visited.insert(next.clone()) {
                        return Err(HttpClientError::TooManyRedirects { status, hops });
                    }
                    log::info!("HTTP {status} from {} redirects to {next}", request.target);
                    request = self.build_request(&next, None);
                }
            }
        }
    }

    /// GET `uri` with `query` appended as a percent-encoded query string and
    /// return the body.
    pub fn get_upload_string(&mut self, uri: &str, query: &Form) -> Result<Vec<u8>> {
        let query = request::query_string(query);
        let mut uri = uri.to_string();
        if !query.is_empty() {
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&query);
        }
        Ok(self.do_request(&uri, None)?.contents)
    }

    /// POST `form` to `uri` and return the body; an empty form sends a GET.
    pub fn post_upload_string(&mut self, uri: &str, form: &Form) -> Result<Vec<u8>> {
        if form.is_empty() {
            return self.get_upload_string(uri, form);
        }
        Ok(self.do_request(uri, Some(form))?.contents)
    }

    /// The raw request this session would send for `target`.
    pub fn build_request(&self, target: &str, form: Option<&Form>) -> HttpRequest {
        RequestBuilder {
            host: &self.host,
            config: &self.config,
            referer: self.config.referer.as_deref(),
            boundary: &self.boundary,
            cookies: &self.cookies,
        }
        .build(target, form)
    }

    fn send(&mut self, request: &HttpRequest) -> Result<Vec<Vec<u8>>> {
        let endpoint = Endpoint {
            host: &self.host,
            port: self.port,
            timeout: self.config.timeout(),
        };
        log::debug!(
            "{} {} on {}:{}",
            request.method.as_str(),
            request.target,
            endpoint.host,
            endpoint.port
        );

        let result = self.transport.exchange(&endpoint, &request.bytes);
        self.last_error = match &result {
            Err(e) if e.is_connect() => Some(SocketError {
                code: e.code(),
                message: e.to_string(),
            }),
            _ => None,
        };
        result
    }

    /// Request-target for `uri`, rejecting URLs aimed at another host.
    fn resolve_target(&self, uri: &str) -> Result<String> {
        let parsed = Uri::parse(uri);
        match &parsed.host {
            Some(host) if !host.eq_ignore_ascii_case(&self.host) => Err(HttpClientError::HostMismatch {
                requested: host.clone(),
                configured: self.host.clone(),
            }),
            Some(_) => Ok(parsed.request_target()),
            None if uri.trim().is_empty() => Ok("/".to_string()),
            None => Ok(uri.trim().to_string()),
        }
    }

    fn redirect_target(&self, status: u16, location: &str) -> Result<String> {
        let parsed = Uri::parse(location);
        match &parsed.host {
            Some(host) if !host.eq_ignore_ascii_case(&self.host) => Err(HttpClientError::CrossHostRedirect {
                status,
                location: location.to_string(),
            }),
            _ => Ok(parsed.request_target()),
        }
    }

    // -- cookies -------------------------------------------------------------

    pub fn set_cookie(&mut self, name: &str, value: &str, path: &str) {
        self.cookies.set(name, value, path);
    }

    pub fn set_cookies<'a, I>(&mut self, cookies: I, path: &str)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.cookies.set_many(cookies, path);
    }

    /// Cookies stored for exactly `path`.
    pub fn cookies(&self, path: &str) -> BTreeMap<String, String> {
        self.cookies.get(path)
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    pub fn cookie_jar(&self) -> &CookieJar {
        &self.cookies
    }

    // -- session state -------------------------------------------------------

    /// Most recent connect failure; reset by every attempt that gets past
    /// connecting.
    pub fn last_socket_error(&self) -> Option<&SocketError> {
        self.last_error.as_ref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // -- configuration -------------------------------------------------------

    /// Seconds for connecting and for each blocking read; values below 1
    /// become 1.
    pub fn set_timeout(&mut self, secs: u64) {
        self.config.timeout_secs = secs.max(1);
    }

    pub fn timeout(&self) -> u64 {
        self.config.timeout_secs
    }

    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.config.user_agent = user_agent.to_string();
    }

    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    pub fn set_accept_language(&mut self, language: &str) {
        self.config.accept_language = language.to_string();
    }

    pub fn accept_language(&self) -> &str {
        &self.config.accept_language
    }

    pub fn set_use_gzip(&mut self, enabled: bool) {
        self.config.use_gzip = enabled;
    }

    pub fn use_gzip(&self) -> bool {
        self.config.use_gzip
    }

    pub fn set_keep_alive(&mut self, enabled: bool) {
        self.config.keep_alive = enabled;
    }

    pub fn keep_alive(&self) -> bool {
        self.config.keep_alive
    }

    pub fn set_use_cache(&mut self, enabled: bool) {
        self.config.use_cache = enabled;
    }

    pub fn use_cache(&self) -> bool {
        self.config.use_cache
    }

    pub fn set_referer(&mut self, referer: &str) {
        self.config.referer = Some(referer.to_string());
    }

    pub fn referer(&self) -> Option<&str> {
        self.config.referer.as_deref()
    }

    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.config.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
    }

    pub fn clear_credentials(&mut self) {
        self.config.credentials = None;
    }

    pub fn set_max_redirects(&mut self, hops: usize) {
        self.config.max_redirects = hops;
    }
}

/// Lower-cased host, port named by a URL, and the referer to seed.
fn normalize_host(input: &str) -> (String, Option<u16>, String) {
    let trimmed = input.trim();
    let uri = Uri::parse(trimmed);
    if let (Some(_), Some(host)) = (&uri.scheme, &uri.host) {
        return (host.to_lowercase(), uri.port, trimmed.to_string());
    }

    let bare = trimmed.trim_start_matches("//");
    let authority = bare.split(|c: char| c == '/' || c == '?' || c == '#').next().unwrap_or("");
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) if !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()) => (h, p.parse().ok()),
        _ => (authority, None),
    };
    let host = host.to_lowercase();
    let referer = format!("http://{host}");
    (host, port, referer)
}

fn new_boundary() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{BOUNDARY_PREFIX}{}", &token[..10])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::split_lines;
    use crate::http::UploadFile;
    use std::collections::VecDeque;

    /// Replays canned responses and records every request it was given.
    #[derive(Debug, Default)]
    struct Scripted {
        replies: VecDeque<Result<Vec<u8>>>,
        sent: Vec<String>,
    }

    impl Scripted {
        fn reply(mut self, raw: &str) -> Self {
            self.replies.push_back(Ok(raw.as_bytes().to_vec()));
            self
        }

        fn fail(mut self, err: HttpClientError) -> Self {
            self.replies.push_back(Err(err));
            self
        }
    }

    impl Transport for Scripted {
        fn exchange(&mut self, _endpoint: &Endpoint<'_>, request: &[u8]) -> Result<Vec<Vec<u8>>> {
            self.sent.push(String::from_utf8_lossy(request).into_owned());
            let reply = self.replies.pop_front().expect("no scripted reply left");
            reply.map(|raw| split_lines(&raw))
        }
    }

    fn client(transport: Scripted) -> HttpClient<Scripted> {
        HttpClient::with_transport("example.com", None, ClientConfig::default(), transport)
    }

    const OK: &str = "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nfinal body";

    #[test]
    fn construction_normalizes_host() {
        let c = HttpClient::new("HTTP://WWW.Example.COM:8080/some/page");
        assert_eq!(c.host(), "www.example.com");
        assert_eq!(c.port(), 8080);
        assert_eq!(c.referer(), Some("HTTP://WWW.Example.COM:8080/some/page"));

        let bare = HttpClient::new("  Example.com/ignored ");
        assert_eq!(bare.host(), "example.com");
        assert_eq!(bare.port(), DEFAULT_PORT);
        assert_eq!(bare.referer(), Some("http://example.com"));

        let explicit = HttpClient::with_port("example.com", 8081);
        assert_eq!(explicit.port(), 8081);
    }

    #[test]
    fn boundary_is_generated_once() {
        let c = HttpClient::new("example.com");
        assert!(c.boundary().starts_with(BOUNDARY_PREFIX));
        assert_eq!(c.boundary().len(), BOUNDARY_PREFIX.len() + 10);
        let form = Form::new().field("f", UploadFile::text("a.txt", "x"));
        let first = c.build_request("/", Some(&form)).to_string_lossy();
        let second = c.build_request("/", Some(&form)).to_string_lossy();
        assert_eq!(first, second);
    }

    #[test]
    fn timeout_is_floored() {
        let mut c = HttpClient::new("example.com");
        c.set_timeout(0);
        assert_eq!(c.timeout(), 1);
        c.set_timeout(5);
        assert_eq!(c.timeout(), 5);
    }

    #[test]
    fn redirect_is_followed_with_a_get() {
        let transport = Scripted::default()
            .reply("HTTP/1.0 302 Found\r\nLocation: /new-path?x=1\r\n\r\n")
            .reply(OK);
        let mut c = client(transport);
        let form = Form::new().field("a", "1");
        let resp = c.do_request("/old", Some(&form)).unwrap();

        assert_eq!(resp.contents, b"final body");
        let sent = &c.transport_mut().sent;
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with("POST /old HTTP/1.0\r\n"));
        assert!(sent[1].starts_with("GET /new-path?x=1 HTTP/1.0\r\n"));
        assert!(!sent[1].contains("Content-Length"));
    }

    #[test]
    fn absolute_same_host_location_is_followed() {
        let transport = Scripted::default()
            .reply("HTTP/1.1 303 See Other\r\nLocation: http://EXAMPLE.com/landing\r\n\r\n")
            .reply(OK);
        let mut c = client(transport);
        c.do_request("/start", None).unwrap();
        assert!(c.transport_mut().sent[1].starts_with("GET /landing HTTP/1.0\r\n"));
    }

    #[test]
    fn cross_host_redirect_fails_with_status() {
        let transport = Scripted::default().reply("HTTP/1.0 302 Found\r\nLocation: http://other.org/x\r\n\r\n");
        let mut c = client(transport);
        let err = c.do_request("/", None).unwrap_err();
        assert!(matches!(err, HttpClientError::CrossHostRedirect { status: 302, .. }));
        assert_eq!(err.code(), 302);
    }

    #[test]
    fn redirect_loop_is_cut_short() {
        let transport = Scripted::default()
            .reply("HTTP/1.0 302 Found\r\nLocation: /b\r\n\r\n")
            .reply("HTTP/1.0 302 Found\r\nLocation: /a\r\n\r\n");
        let mut c = client(transport);
        let err = c.do_request("/a", None).unwrap_err();
        assert!(matches!(err, HttpClientError::TooManyRedirects { status: 302, hops: 2 }));
        assert_eq!(c.transport_mut().sent.len(), 2);
    }

    #[test]
    fn post_redirected_to_its_own_path_is_fetched() {
        let transport = Scripted::default()
            .reply("HTTP/1.0 303 See Other\r\nLocation: /form\r\n\r\n")
            .reply(OK);
        let mut c = client(transport);
        let resp = c.do_request("/form", Some(&Form::new().field("a", "1"))).unwrap();

        assert_eq!(resp.contents, b"final body");
        let sent = &c.transport_mut().sent;
        assert!(sent[0].starts_with("POST /form HTTP/1.0\r\n"));
        assert!(sent[1].starts_with("GET /form HTTP/1.0\r\n"));
    }

    #[test]
    fn get_redirected_to_itself_is_a_loop() {
        let transport = Scripted::default().reply("HTTP/1.0 302 Found\r\nLocation: /form\r\n\r\n");
        let mut c = client(transport);
        let err = c.do_request("/form", None).unwrap_err();
        assert!(matches!(err, HttpClientError::TooManyRedirects { status: 302, hops: 1 }));
    }

    #[test]
    fn cookies_on_a_redirect_are_not_captured() {
        let transport = Scripted::default()
            .reply("HTTP/1.0 302 Found\r\nSet-Cookie: early=1\r\nLocation: /next\r\n\r\n")
            .reply(OK);
        let mut c = client(transport);
        c.do_request("/start", None).unwrap();
        assert!(c.cookies("/").is_empty());
        assert!(!c.transport_mut().sent[1].contains("Cookie:"));
    }

    #[test]
    fn hop_limit_is_enforced() {
        let transport = Scripted::default()
            .reply("HTTP/1.0 302 Found\r\nLocation: /1\r\n\r\n")
            .reply("HTTP/1.0 302 Found\r\nLocation: /2\r\n\r\n");
        let mut c = client(transport);
        c.set_max_redirects(1);
        let err = c.do_request("/0", None).unwrap_err();
        assert!(matches!(err, HttpClientError::TooManyRedirects { hops: 2, .. }));
    }

    #[test]
    fn host_mismatch_never_reaches_the_transport() {
        let mut c = client(Scripted::default());
        let err = c.do_request("http://other.org/x", None).unwrap_err();
        assert!(matches!(err, HttpClientError::HostMismatch { .. }));
        assert!(c.transport_mut().sent.is_empty());
    }

    #[test]
    fn absolute_uri_on_session_host_is_reduced_to_target() {
        let mut c = client(Scripted::default().reply(OK));
        c.do_request("http://Example.com/p?q=1", None).unwrap();
        assert!(c.transport_mut().sent[0].starts_with("GET /p?q=1 HTTP/1.0\r\n"));
    }

    #[test]
    fn cookies_are_captured_and_sent_back() {
        let transport = Scripted::default()
            .reply("HTTP/1.0 200 OK\r\nSet-Cookie: sid=abc; path=/account\r\nset-cookie: theme=dark\r\n\r\n")
            .reply(OK);
        let mut c = client(transport);
        c.do_request("/login", None).unwrap();
        assert_eq!(c.cookies("/account").get("sid").map(String::as_str), Some("abc"));
        assert_eq!(c.cookies("/").get("theme").map(String::as_str), Some("dark"));

        c.do_request("/account", None).unwrap();
        assert!(c.transport_mut().sent[1].contains("\r\nCookie: theme=dark; sid=abc; \r\n"));
    }

    #[test]
    fn last_socket_error_tracks_each_attempt() {
        let transport = Scripted::default()
            .fail(HttpClientError::ConnectionRefused(std::io::ErrorKind::ConnectionRefused.into()))
            .reply(OK);
        let mut c = client(transport);
        assert!(c.last_socket_error().is_none());

        let err = c.do_request("/", None).unwrap_err();
        assert_eq!(err.code(), crate::error::CONNECTION_REFUSED);
        let last = c.last_socket_error().unwrap();
        assert_eq!(last.code, crate::error::CONNECTION_REFUSED);

        c.do_request("/", None).unwrap();
        assert!(c.last_socket_error().is_none());
    }

    #[test]
    fn status_errors_propagate_through_convenience_calls() {
        let transport = Scripted::default().reply("HTTP/1.0 500 Internal Server Error\r\n\r\n");
        let mut c = client(transport);
        let err = c.get_upload_string("/", &Form::new()).unwrap_err();
        assert!(matches!(err, HttpClientError::Status { status: 500 }));
    }

    #[test]
    fn get_upload_string_appends_query() {
        let transport = Scripted::default().reply(OK).reply(OK);
        let mut c = client(transport);
        let query = Form::new().field("a", vec!["x", "y"]).field("b", "z");

        let body = c.get_upload_string("/search", &query).unwrap();
        assert_eq!(body, b"final body");
        c.get_upload_string("/search?page=2", &query).unwrap();

        let sent = &c.transport_mut().sent;
        assert!(sent[0].starts_with("GET /search?a[]=x&a[]=y&b=z HTTP/1.0\r\n"));
        assert!(sent[1].starts_with("GET /search?page=2&a[]=x&a[]=y&b=z HTTP/1.0\r\n"));
    }

    #[test]
    fn post_upload_string_with_empty_form_is_a_get() {
        let transport = Scripted::default().reply(OK).reply(OK);
        let mut c = client(transport);
        c.post_upload_string("/submit", &Form::new()).unwrap();
        c.post_upload_string("/submit", &Form::new().field("k", "v")).unwrap();

        let sent = &c.transport_mut().sent;
        assert!(sent[0].starts_with("GET /submit HTTP/1.0\r\n"));
        assert!(sent[1].starts_with("POST /submit HTTP/1.0\r\n"));
        assert!(sent[1].ends_with("\r\n\r\nk=v"));
    }

    #[test]
    fn credentials_add_authorization() {
        let mut c = client(Scripted::default());
        c.set_credentials("user", "pass");
        assert!(c.build_request("/", None).to_string_lossy().contains("Authorization: BASIC dXNlcjpwYXNz\r\n"));
        c.clear_credentials();
        assert!(!c.build_request("/", None).to_string_lossy().contains("Authorization"));
    }
}
