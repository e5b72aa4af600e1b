//! Results produced by request handling.
//!
//! Whatever part of the server ends up answering a request produces an
//! [`ActionResult`] which the router then converts into the actual HTTP
//! response via [`into_response`][ActionResult::into_response].

use std::path::Path;
use bytes::Bytes;
use hyper::{Body, Response, StatusCode};


//------------ ActionResult --------------------------------------------------

/// The outcome of handling a request.
///
/// A value is produced either by an action handler or by the server itself
/// and is consumed exactly once when the response is written.
#[derive(Clone, Debug)]
pub enum ActionResult {
    /// Raw content with an explicit content type, answered with status 200.
    Content {
        content: Bytes,
        content_type: ContentType,
    },

    /// A JSON value, answered with status 200.
    Json(serde_json::Value),

    /// An error with its own status code, content, and content type.
    Error {
        status: StatusCode,
        content: Bytes,
        content_type: ContentType,
    },
}

impl ActionResult {
    /// Creates a content result.
    pub fn content(
        content: impl Into<Bytes>,
        content_type: ContentType,
    ) -> Self {
        ActionResult::Content {
            content: content.into(),
            content_type,
        }
    }

    /// Creates a JSON result.
    pub fn json(value: impl Into<serde_json::Value>) -> Self {
        ActionResult::Json(value.into())
    }

    /// Creates an error result.
    pub fn error(
        status: StatusCode,
        content: impl Into<Bytes>,
        content_type: ContentType,
    ) -> Self {
        ActionResult::Error {
            status,
            content: content.into(),
            content_type,
        }
    }

    /// Returns the status code the result will be answered with.
    pub fn status(&self) -> StatusCode {
        match *self {
            ActionResult::Error { status, .. } => status,
            _ => StatusCode::OK,
        }
    }

    /// Converts the result into the HTTP response.
    pub fn into_response(self) -> Response<Body> {
        let (status, content, content_type) = match self {
            ActionResult::Content { content, content_type } => {
                (StatusCode::OK, content, content_type)
            }
            ActionResult::Json(value) => {
                (
                    StatusCode::OK,
                    Bytes::from(value.to_string()),
                    ContentType::JSON,
                )
            }
            ActionResult::Error { status, content, content_type } => {
                (status, content, content_type)
            }
        };
        Response::builder()
            .status(status)
            .header("Content-Type", content_type.as_str())
            .body(content.into())
            .expect("broken HTTP response builder")
    }
}


//------------ ContentType ---------------------------------------------------

/// The media type of a response body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ContentType(&'static str);

impl ContentType {
    pub const HTML: ContentType = ContentType("text/html");
    pub const CSS: ContentType = ContentType("text/css");
    pub const JS: ContentType = ContentType("text/javascript");
    pub const PNG: ContentType = ContentType("image/png");
    pub const GIF: ContentType = ContentType("image/gif");
    pub const JSON: ContentType = ContentType("application/json");
    pub const TEXT: ContentType = ContentType("text/plain");

    /// Returns the content type for a file.
    ///
    /// This is a deliberately small, closed table. Anything with an
    /// unknown extension or no extension at all is served as HTML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("css") => ContentType::CSS,
            Some("js") => ContentType::JS,
            Some("png") => ContentType::PNG,
            Some("gif") => ContentType::GIF,
            _ => ContentType::HTML,
        }
    }

    /// Returns the header value for the content type.
    pub fn as_str(self) -> &'static str {
        self.0
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn content_type_table() {
        assert_eq!(
            ContentType::from_path(Path::new("style.css")), ContentType::CSS
        );
        assert_eq!(
            ContentType::from_path(Path::new("app.js")), ContentType::JS
        );
        assert_eq!(
            ContentType::from_path(Path::new("logo.png")), ContentType::PNG
        );
        assert_eq!(
            ContentType::from_path(Path::new("spinner.gif")),
            ContentType::GIF
        );
        assert_eq!(
            ContentType::from_path(Path::new("index.html")),
            ContentType::HTML
        );
        assert_eq!(
            ContentType::from_path(Path::new("data.json")),
            ContentType::HTML
        );
        assert_eq!(
            ContentType::from_path(Path::new("README")), ContentType::HTML
        );
    }

    #[test]
    fn result_status() {
        assert_eq!(
            ActionResult::content("x", ContentType::HTML).status(),
            StatusCode::OK
        );
        assert_eq!(
            ActionResult::json("x".to_string()).status(),
            StatusCode::OK
        );
        assert_eq!(
            ActionResult::error(
                StatusCode::INTERNAL_SERVER_ERROR, "x", ContentType::HTML
            ).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn json_response() {
        let response = ActionResult::json("token".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }
}
