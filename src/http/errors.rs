//! The fixed error responses.

use hyper::{Body, Response, StatusCode};


pub fn unauthorized() -> Response<Body> {
    Response::builder()
    .status(StatusCode::UNAUTHORIZED)
    .header("Content-Type", "text/html")
    .header("WWW-Authenticate", "Basic realm=\"capstan\"")
    .body("<h1>401 - Unauthorized</h1>".into())
    .unwrap()
}

pub fn not_found() -> Response<Body> {
    Response::builder()
    .status(StatusCode::NOT_FOUND)
    .header("Content-Type", "text/plain")
    .body("404 - File not found".into())
    .unwrap()
}

pub fn method_not_allowed() -> Response<Body> {
    Response::builder()
    .status(StatusCode::METHOD_NOT_ALLOWED)
    .header("Content-Type", "text/plain")
    .body("Method Not Allowed".into())
    .unwrap()
}
