//! # Connection storage shared by event points and scopes.
//!
//! - [`BorrowRegistry`] - Idle/Borrowed container that keeps a stable snapshot
//!   for the firing path while callbacks mutate the registry.
//!
//! The registry is deliberately unaware of connections: it stores any handle
//! type and leaves disconnect notification to its owner.

mod borrow;

pub(crate) use borrow::BorrowRegistry;
