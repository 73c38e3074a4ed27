//! # Connections and their broken-listener protocol.
//!
//! - [`Connection`] - identity object of one sender → receiver binding
//! - [`LinkState`] - `Connected → Disconnecting → Disconnected`
//!
//! Owners (event points, scopes) never count references to a connection;
//! each registers a broken listener and removes its own entry when notified.

#[allow(clippy::module_inception)]
mod connection;
mod listener;

pub(crate) use connection::Callback;
pub use connection::{Connection, LinkState};
