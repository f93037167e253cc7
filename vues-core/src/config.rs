//! Runtime Configuration
//!
//! The runtime is single-threaded, so configuration lives in a thread-local
//! slot rather than behind a lock. Plain settings are serde-deserializable
//! and can be loaded from JSON; handlers are installed programmatically.

use std::cell::RefCell;
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Receives errors raised by user code: `(error, component name, context)`.
pub type ErrorHandler = Rc<dyn Fn(&(dyn StdError + 'static), Option<&str>, &str)>;

/// Receives development warnings: `(message, component name)`.
pub type WarnHandler = Rc<dyn Fn(&str, Option<&str>)>;

/// Plain, serializable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Degrade instead of failing on invariant violations, and suppress
    /// development warnings.
    pub production: bool,

    /// Suppress warnings without changing error behavior.
    pub silent: bool,

    /// How many times one watcher may re-trigger itself in a single flush
    /// before the flush is aborted as an infinite update loop.
    pub max_update_count: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            production: false,
            silent: false,
            max_update_count: 100,
        }
    }
}

/// Full configuration: settings plus optional handlers.
#[derive(Clone, Default)]
pub struct Config {
    pub settings: Settings,
    pub error_handler: Option<ErrorHandler>,
    pub warn_handler: Option<WarnHandler>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("settings", &self.settings)
            .field("error_handler", &self.error_handler.is_some())
            .field("warn_handler", &self.warn_handler.is_some())
            .finish()
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Snapshot of the current settings.
pub fn settings() -> Settings {
    CONFIG.with(|c| c.borrow().settings.clone())
}

/// Mutate the configuration in place.
pub fn configure(f: impl FnOnce(&mut Config)) {
    CONFIG.with(|c| f(&mut c.borrow_mut()));
}

/// Replace the settings with ones parsed from JSON. Handlers are kept.
pub fn load_json(json: &str) -> Result<(), Error> {
    let parsed: Settings = serde_json::from_str(json)?;
    configure(|c| c.settings = parsed);
    Ok(())
}

/// Restore defaults and drop any installed handlers.
pub fn reset() {
    CONFIG.with(|c| *c.borrow_mut() = Config::default());
}

pub(crate) fn error_handler() -> Option<ErrorHandler> {
    CONFIG.with(|c| c.borrow().error_handler.clone())
}

pub(crate) fn warn_handler() -> Option<WarnHandler> {
    CONFIG.with(|c| c.borrow().warn_handler.clone())
}
