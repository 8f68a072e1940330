use axum::http::{self, Request, StatusCode};
use flate2::read::GzDecoder;
use http_body_util::BodyExt;
use mock_server::{app, HELLO};
use std::io::Read;
use tower::ServiceExt;

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn location(resp: &axum::response::Response) -> &str {
    resp.headers()[http::header::LOCATION].to_str().unwrap()
}

// --- plain responses ---

#[tokio::test]
async fn hello_returns_text_and_closes() {
    let resp = app().oneshot(get("/hello")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONNECTION], "close");
    assert_eq!(body_bytes(resp).await, HELLO.as_bytes());
}

#[tokio::test]
async fn status_route_answers_with_requested_code() {
    let resp = app().oneshot(get("/status/404")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app().oneshot(get("/status/500")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn multi_header_repeats_x_foo() {
    let resp = app().oneshot(get("/multi-header")).await.unwrap();
    let values: Vec<&str> = resp.headers().get_all("x-foo").iter().map(|v| v.to_str().unwrap()).collect();
    assert_eq!(values, ["first", "second"]);
}

// --- redirects ---

#[tokio::test]
async fn redirect_routes_point_where_expected() {
    let resp = app().oneshot(get("/redirect")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/hello");

    let resp = app().oneshot(get("/see-other")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "http://127.0.0.1/hello");

    let resp = app().oneshot(get("/loop")).await.unwrap();
    assert_eq!(location(&resp), "/loop");
}

#[tokio::test]
async fn bare_redirect_has_no_location() {
    let resp = app().oneshot(get("/bare-redirect")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(resp.headers().get(http::header::LOCATION).is_none());
}

// --- encodings and cookies ---

#[tokio::test]
async fn gzip_route_is_a_gzip_member() {
    let resp = app().oneshot(get("/gzip")).await.unwrap();
    assert_eq!(resp.headers()[http::header::CONTENT_ENCODING], "gzip");

    let body = body_bytes(resp).await;
    let mut text = String::new();
    GzDecoder::new(&body[..]).read_to_string(&mut text).unwrap();
    assert_eq!(text, HELLO);
}

#[tokio::test]
async fn login_sets_two_cookies() {
    let resp = app().oneshot(get("/login")).await.unwrap();
    let cookies: Vec<&str> = resp
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies, ["sid=abc; path=/account", "theme=dark"]);
}

#[tokio::test]
async fn account_echoes_cookie_header() {
    let req = Request::builder()
        .uri("/account")
        .header(http::header::COOKIE, "theme=dark; sid=abc; ")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(body_bytes(resp).await, "theme=dark; sid=abc; ");
}

// --- echo ---

#[tokio::test]
async fn headers_route_lists_request_headers() {
    let req = Request::builder()
        .uri("/headers")
        .header("x-probe", "one")
        .header("x-probe", "two")
        .body(String::new())
        .unwrap();
    let json = body_json(app().oneshot(req).await.unwrap()).await;
    assert_eq!(json["x-probe"], serde_json::json!(["one", "two"]));
}

#[tokio::test]
async fn echo_returns_body_and_content_type() {
    let req = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("a=1&b=2".to_string())
        .unwrap();
    let json = body_json(app().oneshot(req).await.unwrap()).await;
    assert_eq!(json["content_type"], "application/x-www-form-urlencoded");
    assert_eq!(json["length"], 7);
    assert_eq!(json["body"], "a=1&b=2");
}

#[tokio::test]
async fn echo_rejects_get() {
    let resp = app().oneshot(get("/echo")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
