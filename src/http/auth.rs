//! Request authentication.
//!
//! Every request has to carry the configured user name and password via
//! HTTP Basic authentication. The comparison is plain string equality,
//! there is no hashing, rate limiting, or lockout. This mirrors what the
//! UI expects and is only suitable for a service bound to localhost or an
//! otherwise trusted network.

use hyper::header::{AUTHORIZATION, HeaderMap};


//------------ Credentials ---------------------------------------------------

/// The configured user name and password.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates the credentials to check requests against.
    pub fn new(username: String, password: String) -> Self {
        Credentials { username, password }
    }

    /// Returns whether the request headers carry valid credentials.
    ///
    /// A request without an `Authorization` header, with a scheme other
    /// than `Basic`, or with a malformed value is treated exactly like a
    /// wrong user name or password.
    pub fn check(&self, headers: &HeaderMap) -> bool {
        match basic_credentials(headers) {
            Some((username, password)) => {
                username == self.username && password == self.password
            }
            None => false,
        }
    }
}


//------------ basic_credentials ---------------------------------------------

/// Extracts the user name and password from a Basic authorization header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, value) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None
    }
    let decoded = base64::decode(value.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.into(), password.into()))
}


//============ Tests =========================================================
