//! The action registry.
//!
//! All operations the daemon exposes through the API are actions: named
//! handlers registered by the various subsystems at startup. A request to
//! `/api` with an `action` query parameter is resolved against the
//! registry and the matching handler invoked with the request context.
//!
//! Registration happens once while the daemon boots. After the listener
//! has started, the registry is only ever read and can safely be shared
//! between connections without locking.

use std::{any, error, fmt, panic};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Write;
use std::panic::AssertUnwindSafe;
use hyper::StatusCode;
use log::error;
use crate::error::Failed;
use super::request::Request;
use super::response::{ActionResult, ContentType};
use super::token::TOKEN_ACTION;


//------------ Action --------------------------------------------------------

/// A named operation invocable through the API.
///
/// Implementations are provided by the subsystems of the daemon and
/// registered with the [`ActionRegistry`]. The trait is implemented for
/// plain functions and closures of the right shape, so simple actions can
/// be registered without a dedicated type.
pub trait Action: Send + Sync + 'static {
    /// Executes the action for the given request.
    fn call(&self, request: &Request) -> Result<ActionResult, ActionError>;
}

impl<F> Action for F
where
    F: Fn(&Request) -> Result<ActionResult, ActionError>
        + Send + Sync + 'static
{
    fn call(&self, request: &Request) -> Result<ActionResult, ActionError> {
        (self)(request)
    }
}


//------------ ActionError ---------------------------------------------------

/// A failure reported by an action handler.
///
/// Carries an arbitrary boxed error. The full chain of sources is kept so
/// the error response can show where exactly things went wrong.
#[derive(Debug)]
pub struct ActionError {
    inner: Box<dyn error::Error + Send + Sync>,
}

impl ActionError {
    /// Creates an error from a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        let message: String = message.into();
        ActionError { inner: message.into() }
    }

    /// Returns the top level failure message.
    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    /// Returns the full failure trace, one source per line.
    pub fn trace(&self) -> String {
        let mut res = self.inner.to_string();
        let mut source = self.inner.source();
        while let Some(err) = source {
            write!(&mut res, "\ncaused by: {}", err).unwrap();
            source = err.source();
        }
        res
    }
}

impl<E: error::Error + Send + Sync + 'static> From<E> for ActionError {
    fn from(err: E) -> Self {
        ActionError { inner: Box::new(err) }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(f)
    }
}


//------------ ActionRegistry ------------------------------------------------

/// The set of registered actions, keyed by their unique name.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Box<dyn Action>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers an action under the given name.
    ///
    /// Names are matched exactly and case-sensitively when resolving, so
    /// they have to be unique. Registering a second action under an
    /// already taken name or under the reserved name `gettoken` is an
    /// error.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        action: impl Action,
    ) -> Result<(), Failed> {
        let name = name.into();
        if name == TOKEN_ACTION {
            error!(
                "Cannot register action '{}': the name is reserved", name
            );
            return Err(Failed)
        }
        match self.actions.entry(name) {
            Entry::Occupied(entry) => {
                error!(
                    "Cannot register action '{}': the name is already taken",
                    entry.key()
                );
                Err(Failed)
            }
            Entry::Vacant(entry) => {
                entry.insert(Box::new(action));
                Ok(())
            }
        }
    }

    /// Returns the number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns whether no actions are registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Resolves an action name to its handler.
    fn resolve(&self, name: &str) -> Option<&dyn Action> {
        self.actions.get(name).map(AsRef::as_ref)
    }

    /// Resolves and executes the named action.
    ///
    /// Returns `None` if no action of that name is registered. Any
    /// failure of the handler, including a panic, is captured and turned
    /// into an error result; it never escapes to the caller. The failure
    /// trace is only included in the result if `verbose` is set.
    pub fn execute(
        &self,
        name: &str,
        request: &Request,
        verbose: bool,
    ) -> Option<ActionResult> {
        let action = self.resolve(name)?;
        let res = panic::catch_unwind(
            AssertUnwindSafe(|| action.call(request))
        );
        Some(match res {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                error!("Action '{}' failed: {}", name, err);
                error_page(
                    name, request, &err.message(),
                    verbose.then(|| err.trace()).as_deref(),
                )
            }
            Err(payload) => {
                let message = panic_message(payload);
                error!("Action '{}' panicked: {}", name, message);
                error_page(name, request, &message, None)
            }
        })
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions.keys())
            .finish()
    }
}


//------------ error_page ----------------------------------------------------

/// Builds the error result for a failed action.
fn error_page(
    name: &str,
    request: &Request,
    message: &str,
    trace: Option<&str>,
) -> ActionResult {
    let mut html = String::from(
        "<html><head><title>Internal Server Error</title></head><body>\n\
         <h1>Internal Server Error</h1>\n"
    );
    write!(&mut html,
        "<p>Failed to execute action '{}' for <pre>{}</pre></p>\n\
         <p><pre>{}</pre></p>\n",
        name, request.path_and_query(), message
    ).unwrap();
    if let Some(trace) = trace {
        write!(&mut html,
            "<h2>Trace</h2>\n<p><pre>{}</pre></p>\n",
            trace.replace('\n', "<br />")
        ).unwrap();
    }
    html.push_str("</body></html>");
    ActionResult::error(
        StatusCode::INTERNAL_SERVER_ERROR, html, ContentType::HTML
    )
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: Box<dyn any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).into()
    }
    else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    }
    else {
        "action panicked".into()
    }
}


//============ Tests =========================================================
