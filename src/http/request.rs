//! Request handling.

use hyper::{Body, Method, Uri};


//------------ Request -------------------------------------------------------

/// The context of an inbound request as seen by action handlers.
///
/// A value is created for each connection once authentication has
/// succeeded and lives until the response has been written. It carries
/// everything a handler may look at: the method, the request URI, and the
/// query parameters.
#[derive(Clone, Debug)]
pub struct Request {
    /// The request method.
    method: Method,

    /// The request URI.
    uri: Uri,

    /// Whether the request carried valid credentials.
    authenticated: bool,
}

impl Request {
    /// Creates a new request context.
    pub(super) fn new(req: &hyper::Request<Body>, authenticated: bool) -> Self {
        Request {
            method: req.method().clone(),
            uri: req.uri().clone(),
            authenticated,
        }
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the absolute path of the request.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the path including the query string.
    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query()
            .map(|item| item.as_str())
            .unwrap_or_else(|| self.uri.path())
    }

    /// Returns the first value of the given query parameter.
    pub fn query_param(&self, key: &str) -> Option<String> {
        let query = self.uri.query()?;
        for (item, value) in form_urlencoded::parse(query.as_bytes()) {
            if item == key {
                return Some(value.into_owned())
            }
        }
        None
    }

    /// Returns whether the request carried valid credentials.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}


//============ Tests =========================================================
