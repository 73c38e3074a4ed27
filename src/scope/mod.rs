//! Scopes: owners that disconnect their connections when dropped.
//!
//! ## Contents
//! - [`Scope`] tracks connections across event points; disconnects them on drop
//! - [`ScopeRef`] weak handle, usable from inside callbacks

mod handle;
#[allow(clippy::module_inception)]
mod scope;

pub use handle::ScopeRef;
pub use scope::Scope;
