use std::io::Write;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use flate2::{write::GzEncoder, Compression};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

/// Plain-text body served by `/hello` (and inflated from `/gzip`).
pub const HELLO: &str = "hello from the mock server\n";

/// How long `/stall` waits before answering.
pub const STALL: Duration = Duration::from_secs(3);

pub fn app() -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/redirect", get(redirect))
        .route("/see-other", get(see_other))
        .route("/offsite", get(offsite))
        .route("/bare-redirect", get(bare_redirect))
        .route("/loop", get(redirect_loop))
        .route("/gzip", get(gzip))
        .route("/status/{code}", get(status))
        .route("/login", get(login))
        .route("/account", get(account))
        .route("/headers", get(headers))
        .route("/echo", post(echo))
        .route("/multi-header", get(multi_header))
        .route("/stall", get(stall))
        .layer(middleware::map_response(close_connection))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// The client reads until EOF, so every connection is closed after one
/// response, whatever the request asked for.
async fn close_connection(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

async fn hello() -> &'static str {
    HELLO
}

async fn redirect() -> Response {
    found("/hello")
}

async fn see_other() -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, "http://127.0.0.1/hello")]).into_response()
}

async fn offsite() -> Response {
    found("http://elsewhere.invalid/hello")
}

async fn bare_redirect() -> StatusCode {
    StatusCode::FOUND
}

async fn redirect_loop() -> Response {
    found("/loop")
}

async fn gzip() -> Result<Response, StatusCode> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(HELLO.as_bytes())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let body = encoder.finish().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok((
        [
            (header::CONTENT_ENCODING, "gzip"),
            (header::CONTENT_TYPE, "text/plain"),
        ],
        body,
    )
        .into_response())
}

async fn status(Path(code): Path<u16>) -> Result<Response, StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}\n")).into_response())
}

async fn login() -> Response {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, HeaderValue::from_static("sid=abc; path=/account"));
    headers.append(header::SET_COOKIE, HeaderValue::from_static("theme=dark"));
    (headers, "logged in\n").into_response()
}

/// Echoes the `Cookie` request header, or an empty body without one.
async fn account(headers: HeaderMap) -> String {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Request headers as a JSON object of name to value list.
async fn headers(headers: HeaderMap) -> Json<Value> {
    let mut out = Map::new();
    for (name, value) in &headers {
        let value = Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned());
        match out.get_mut(name.as_str()) {
            Some(Value::Array(values)) => values.push(value),
            _ => {
                out.insert(name.as_str().to_string(), Value::Array(vec![value]));
            }
        }
    }
    Json(Value::Object(out))
}

async fn echo(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Json(json!({
        "content_type": content_type,
        "length": body.len(),
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn multi_header() -> Response {
    let mut headers = HeaderMap::new();
    headers.append("x-foo", HeaderValue::from_static("first"));
    headers.append("x-foo", HeaderValue::from_static("second"));
    (headers, "two headers\n").into_response()
}

async fn stall() -> &'static str {
    tokio::time::sleep(STALL).await;
    "too late\n"
}
