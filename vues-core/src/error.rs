//! Error types and the reporting channel for user-code failures.
//!
//! Failures fall into two groups. Programming errors inside the framework
//! contract (structural changes to root state, unknown watch paths) surface
//! as [`Error`] values. Failures raised by user code (render functions,
//! watcher callbacks, event handlers, lifecycle hooks) are caught at the
//! boundary and routed through [`handle_error`] so that siblings keep
//! running.

use std::error::Error as StdError;

use thiserror::Error;

use crate::config;
use crate::instance::Component;

/// Error type returned by user-supplied callbacks.
pub type BoxError = Box<dyn StdError + 'static>;

/// Result of a user callback that produces no value.
pub type HandlerResult = Result<(), BoxError>;

/// Errors produced by the runtime itself.
#[derive(Debug, Error)]
pub enum Error {
    /// `set`/`del` was called on something that is not a container.
    #[error("cannot set reactive property on undefined, null, or primitive value: {0}")]
    PrimitiveTarget(String),

    /// A new key was added to a component's root state at runtime.
    #[error(
        "avoid adding reactive properties to a component instance or its root state at runtime; \
         declare \"{0}\" upfront in the state option"
    )]
    RootStateAddition(String),

    /// A key was deleted from a component's root state.
    #[error(
        "avoid deleting properties on a component instance or its root state; \
         set \"{0}\" to null instead"
    )]
    RootStateDeletion(String),

    /// Assignment to a key the component never declared.
    #[error("property \"{0}\" is not declared on the component; add it to the state option")]
    UndeclaredProperty(String),

    /// A watch path whose root segment does not exist on the component.
    #[error("cannot watch \"{0}\": the component has no such property")]
    UnknownWatchPath(String),

    /// Operation attempted on a destroyed component.
    #[error("component <{0}> has already been destroyed")]
    Destroyed(String),

    /// A component placeholder was patched without an owning instance.
    #[error("component vnode <{0}> was patched outside of any component instance")]
    OrphanComponent(String),

    /// A non-user watcher failed during evaluation or callback.
    #[error("error in {info}: {cause}")]
    Evaluation { info: String, cause: BoxError },

    /// Settings could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Route a user-code failure to the configured error handler.
///
/// Falls back to `tracing::error!` when no handler is installed.
pub fn handle_error(err: &(dyn StdError + 'static), vm: Option<&Component>, info: &str) {
    let name = vm.map(Component::display_name);
    if let Some(handler) = config::error_handler() {
        handler(err, name.as_deref(), info);
        return;
    }
    tracing::error!(component = name.as_deref().unwrap_or("<root>"), "error in {info}: {err}");
}

/// Emit a development warning.
///
/// Silenced in production mode and when `silent` is set.
pub fn warn(msg: impl AsRef<str>, vm: Option<&Component>) {
    let settings = config::settings();
    if settings.production || settings.silent {
        return;
    }
    let msg = msg.as_ref();
    let name = vm.map(Component::display_name);
    if let Some(handler) = config::warn_handler() {
        handler(msg, name.as_deref());
        return;
    }
    tracing::warn!(component = name.as_deref().unwrap_or("<root>"), "{msg}");
}

/// Report an invariant violation.
///
/// Returned as an error outside production mode; logged and swallowed in
/// production so the caller can continue in a degraded way.
pub fn invariant(err: Error) -> Result<(), Error> {
    if config::settings().production {
        tracing::debug!(%err, "invariant violation ignored in production mode");
        return Ok(());
    }
    Err(err)
}
