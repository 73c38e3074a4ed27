//! # Registry sizing configuration.
//!
//! Provides [`Config`], preallocation hints for the registries owned by event
//! points and scopes.
//!
//! Config is used in two ways:
//! 1. **Event points**: `EventPoint::with_config(sender, &config)`
//! 2. **Scopes**: `Scope::with_config(&config)`
//!
//! ## Sentinel values
//! - `connection_capacity = 0` → grow on demand
//! - `scope_capacity = 0` → grow on demand

/// Preallocation settings for connection registries.
///
/// ## Field semantics
/// - `connection_capacity`: initial capacity of an event point's registry (`0` = lazy)
/// - `scope_capacity`: initial capacity of a scope's registry (`0` = lazy)
///
/// Both the primary sequence and the snapshot buffer of a registry are
/// preallocated, so a point that never outgrows its capacity never allocates
/// while firing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Expected number of simultaneous connections per event point.
    pub connection_capacity: usize,

    /// Expected number of connections tracked by one scope.
    pub scope_capacity: usize,
}

impl Config {
    /// Returns the event point preallocation as an `Option`.
    ///
    /// - `None` → grow on demand
    /// - `Some(n)` → reserve `n` slots up front
    #[inline]
    pub fn connection_hint(&self) -> Option<usize> {
        if self.connection_capacity == 0 {
            None
        } else {
            Some(self.connection_capacity)
        }
    }

    /// Returns the scope preallocation as an `Option`.
    #[inline]
    pub fn scope_hint(&self) -> Option<usize> {
        if self.scope_capacity == 0 {
            None
        } else {
            Some(self.scope_capacity)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `connection_capacity = 0` (lazy)
    /// - `scope_capacity = 0` (lazy)
    fn default() -> Self {
        Self {
            connection_capacity: 0,
            scope_capacity: 0,
        }
    }
}
