//! Error types used by the dispatch engine.
//!
//! The engine has no I/O, so nothing here is "recoverable" in the usual sense:
//! [`DispatchError`] is returned only by the checked entry points (`try_fire`,
//! weak handles whose target is gone). The unchecked counterparts treat the
//! same conditions as programmer misuse and panic.
//!
//! Like the rest of the crate the enum provides `as_label` / `as_message`
//! helpers for logs.

use thiserror::Error;

use crate::identity::EventId;

/// # Errors produced by the dispatch engine.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The event point is already firing further up the stack.
    #[error("{event:?} is already firing; reentrant fire is not allowed")]
    Reentrant {
        /// The event point that was fired reentrantly.
        event: EventId,
    },

    /// The event point behind an [`EventRef`](crate::EventRef) has been dropped.
    #[error("event point is gone")]
    EventGone,

    /// The scope behind a [`ScopeRef`](crate::ScopeRef) has been dropped.
    #[error("connection scope is gone")]
    ScopeGone,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use eventscope::DispatchError;
    ///
    /// assert_eq!(DispatchError::EventGone.as_label(), "dispatch_event_gone");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::Reentrant { .. } => "dispatch_reentrant",
            DispatchError::EventGone => "dispatch_event_gone",
            DispatchError::ScopeGone => "dispatch_scope_gone",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::Reentrant { event } => format!("reentrant fire of {event:?}"),
            DispatchError::EventGone => "event point dropped".to_string(),
            DispatchError::ScopeGone => "scope dropped".to_string(),
        }
    }

    /// True when the error signals a weak handle outliving its target.
    ///
    /// # Example
    /// ```
    /// use eventscope::DispatchError;
    ///
    /// assert!(DispatchError::ScopeGone.is_gone());
    /// ```
    pub fn is_gone(&self) -> bool {
        matches!(self, DispatchError::EventGone | DispatchError::ScopeGone)
    }
}
