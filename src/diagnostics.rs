//! Diagnostic sink for failures that the cache contains instead of propagating.
//!
//! Subscriber callbacks run inside a notify cycle. When one of them fails, the
//! registry keeps delivering to the remaining subscribers and reports the
//! failure here.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use async_cache::{Diagnostic, DiagnosticSink};
//!
//! #[derive(Default)]
//! struct BufferedSink {
//!     buffer: Mutex<Vec<Diagnostic>>,
//! }
//!
//! impl DiagnosticSink for BufferedSink {
//!     fn report(&self, diagnostic: Diagnostic) {
//!         self.buffer.lock().unwrap().push(diagnostic);
//!     }
//! }
//!
//! let sink: Arc<dyn DiagnosticSink> = Arc::new(BufferedSink::default());
//! ```

use std::fmt;

/// Which half of a subscriber failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    /// The callback receiving the value.
    Success,
    /// The callback receiving the error.
    Failure,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackKind::Success => f.write_str("success"),
            CallbackKind::Failure => f.write_str("failure"),
        }
    }
}

/// Diagnostics emitted by the subscription registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A subscriber callback returned an error or panicked during notify.
    SubscriberFailed {
        /// The key being notified.
        key: String,
        /// Which callback failed.
        callback: CallbackKind,
        /// The error message, or the panic payload if it was a string.
        message: String,
        /// Whether the callback panicked rather than returning `Err`.
        panicked: bool,
    },
}

/// Trait for receiving diagnostics.
///
/// `report` is called synchronously from inside the notify loop, after the
/// registry lock has been released. Implementations should be fast and must
/// not panic.
pub trait DiagnosticSink: Send + Sync {
    /// Report a single diagnostic.
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink that logs every diagnostic through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::SubscriberFailed {
                key,
                callback,
                message,
                panicked,
            } => {
                tracing::error!(
                    %key,
                    %callback,
                    panicked,
                    error = %message,
                    "subscriber {} handler failed",
                    callback
                );
            }
        }
    }
}
