//! The Capstan web control plane.
//!
//! This crate contains the embedded HTTP server through which the Capstan
//! daemon is controlled: it serves the bundled single-page web UI and
//! exposes the daemon’s registered actions under `/api`. The application
//! in `main.rs` is only a very tiny frontend that runs the server
//! standalone.
//!
//! Embedding works in three steps: create an [`ActionRegistry`] and
//! register the daemon’s actions, create a [`Config`], and hand both to
//! [`http_listener`] which returns the future driving the server plus a
//! [`ServerHandle`] for stopping it.

pub use self::config::Config;
pub use self::error::{ExitError, Failed};
pub use self::http::{
    Action, ActionError, ActionRegistry, ActionResult, ContentType,
    Request, ServerHandle, http_listener,
};
pub use self::operation::Operation;

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod operation;
pub mod stage;

#[cfg(test)] mod test;
