//! # eventscope
//!
//! **Eventscope** is a single-threaded, in-process signal/slot dispatch engine.
//!
//! A sender owns an [`EventPoint`] and fires it; receivers connect callbacks
//! to it. Every link is a [`Connection`] shared by all of its owners (the
//! event point, any number of [`Scope`]s, user code). Breaking a connection
//! from any owner broadcasts to the others, so nobody is left holding a dead
//! link and no callback runs after it was disconnected.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   sender                                              receivers
//! ┌──────────────┐                                   ┌──────────────┐
//! │  EventPoint  │                                   │    Scope     │
//! │ BorrowRegistry│◄──── Connection (shared) ───────►│ BorrowRegistry│
//! └──────┬───────┘      - sender / event ids         └──────┬───────┘
//!        │              - receiver / callback ids           │
//!        │              - callback (type-erased)            │
//!        │              - broken listeners ─────────────────┘
//!        ▼
//!   fire(&args)
//!   ├─► begin_borrow: snapshot of current connections
//!   ├─► invoke each still-connected entry in insertion order
//!   │     (connects are deferred, disconnects become tombstones)
//!   └─► end_borrow: compact snapshot, append deferred connects
//! ```
//!
//! ### Disconnect
//! ```text
//! Connection::disconnect()
//!   ├─ Connected     ─► Disconnecting
//!   │                   ├─ notify broken listeners (each owner forgets the link)
//!   │                   └─ Disconnected, callback dropped
//!   └─ otherwise     ─► no-op (returns false)
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types                              |
//! |-----------------|--------------------------------------------------------------|----------------------------------------|
//! | **Events**      | Fire typed events; connect closures or receiver methods.     | [`EventPoint`], [`EventRef`]           |
//! | **Connections** | Shared links with broadcast-on-disconnect.                   | [`Connection`], [`LinkState`]          |
//! | **Scopes**      | Auto-disconnect everything connected through a scope.        | [`Scope`], [`ScopeRef`]                |
//! | **Identity**    | Compare senders, receivers, events and callbacks.            | [`ObjectId`], [`EventId`], [`CallbackId`] |
//! | **Errors**      | Typed errors for reentrant fire and dropped owners.          | [`DispatchError`]                      |
//! | **Configuration** | Registry preallocation hints.                              | [`Config`]                             |
//!
//! ## Example
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use eventscope::{EventPoint, Identified, ObjectId, Scope};
//!
//! struct Counter {
//!     id: ObjectId,
//!     hits: Cell<u32>,
//! }
//!
//! impl Counter {
//!     fn hit(&self, amount: &u32) {
//!         self.hits.set(self.hits.get() + amount);
//!     }
//! }
//!
//! impl Identified for Counter {
//!     fn identity(&self) -> ObjectId {
//!         self.id
//!     }
//! }
//!
//! let clicked: EventPoint<u32> = EventPoint::anonymous();
//! let counter = Rc::new(Counter { id: ObjectId::next(), hits: Cell::new(0) });
//!
//! {
//!     let scope = Scope::new();
//!     scope.connect_method(&clicked, &counter, Counter::hit);
//!     clicked.fire(&2);
//!     clicked.fire(&3);
//! }
//!
//! // the scope is gone, and so is the connection
//! clicked.fire(&100);
//! assert_eq!(counter.hits.get(), 5);
//! assert_eq!(clicked.connection_count(), 0);
//! ```
mod config;
mod connection;
mod error;
mod event;
mod identity;
mod registry;
mod scope;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use config::Config;
pub use connection::{Connection, LinkState};
pub use error::DispatchError;
pub use event::{EventPoint, EventRef};
pub use identity::{CallbackId, EventId, Identified, ListenerId, ObjectId};
pub use scope::{Scope, ScopeRef};
