//! The HTTP server.
//!
//! The module provides the embedded web control plane: it serves the
//! bundled single-page UI and dispatches API requests to the actions the
//! daemon registered. The only public entry point, [`http_listener`],
//! stages the UI, binds the socket, and returns a future that drives the
//! server together with a [`ServerHandle`] for stopping it.
//!
//! Every request is authenticated first. An authenticated request is
//! either an action invocation, when it goes to `/api` with an `action`
//! query parameter, or a request for a static UI file.

pub use self::actions::{Action, ActionError, ActionRegistry};
pub use self::listener::{ServerHandle, http_listener};
pub use self::request::Request;
pub use self::response::{ActionResult, ContentType};

mod actions;
mod assets;
mod auth;
mod errors;
mod listener;
mod request;
mod response;
mod token;


//------------ State ---------------------------------------------------------

use std::sync::Arc;
use hyper::{Body, Method, StatusCode};
use log::error;
use crate::config::Config;
use crate::metrics::HttpServerMetrics;
use crate::stage::StagedAssets;
use self::auth::Credentials;

/// Everything request handling needs to look at.
///
/// Created once before the listener starts and shared read-only between
/// all connections afterwards.
struct State {
    /// The registered actions.
    registry: ActionRegistry,

    /// The location the UI files are served from.
    assets: StagedAssets,

    /// The credentials required for access.
    credentials: Credentials,

    /// Should error responses include a failure trace?
    verbose_errors: bool,

    /// The server’s own activity counters.
    metrics: Arc<HttpServerMetrics>,
}

impl State {
    fn new(
        registry: ActionRegistry,
        assets: StagedAssets,
        config: &Config,
    ) -> Self {
        State {
            registry,
            assets,
            credentials: Credentials::new(
                config.username.clone(), config.password.clone()
            ),
            verbose_errors: config.verbose_errors,
            metrics: Default::default(),
        }
    }

    fn metrics(&self) -> &Arc<HttpServerMetrics> {
        &self.metrics
    }
}


//------------ handle_request ------------------------------------------------

/// Produces the response for a single request.
async fn handle_request(
    req: hyper::Request<Body>,
    state: &Arc<State>,
) -> hyper::Response<Body> {
    state.metrics.inc_requests();
    if !state.credentials.check(req.headers()) {
        return errors::unauthorized()
    }
    if *req.method() != Method::GET && *req.method() != Method::POST {
        return errors::method_not_allowed()
    }
    let request = Request::new(&req, true);
    let result = match action_name(&request) {
        Some(name) => invoke_action(state, name, request).await,
        None => assets::resolve(state.assets.root(), request.path()),
    };
    match result {
        Some(result) => result.into_response(),
        None => errors::not_found(),
    }
}

/// Returns the action name if the request is an action invocation.
///
/// It is one iff its path is exactly `/api` or `/api/` and it carries a
/// non-empty `action` query parameter. Everything else goes looking for a
/// static file.
fn action_name(request: &Request) -> Option<String> {
    if request.path() != "/api" && request.path() != "/api/" {
        return None
    }
    request.query_param("action").filter(|name| !name.is_empty())
}

/// Dispatches an action invocation.
///
/// The reserved `gettoken` action is answered right here; everything else
/// is resolved through the registry. Handlers are allowed to block, so
/// they run on the blocking pool where they only ever stall their own
/// request.
async fn invoke_action(
    state: &Arc<State>,
    name: String,
    request: Request,
) -> Option<ActionResult> {
    if name == token::TOKEN_ACTION {
        return Some(token::generate())
    }
    let state = state.clone();
    match tokio::task::spawn_blocking(move || {
        state.registry.execute(&name, &request, state.verbose_errors)
    }).await {
        Ok(result) => result,
        Err(err) => {
            error!("Action invocation failed: {}", err);
            Some(ActionResult::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "<h1>Internal Server Error</h1>",
                ContentType::HTML,
            ))
        }
    }
}
