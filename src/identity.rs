//! # Opaque identities for senders, receivers, events, callbacks and listeners.
//!
//! Disconnect-by-criteria queries compare identities rather than addresses, so
//! the engine works the same whether receivers live on the stack, in an arena
//! or behind a handle table.
//!
//! ## Rules
//! - [`ObjectId`], [`EventId`] and [`ListenerId`] are allocated from one global,
//!   monotonically increasing counter and are never reused within a process.
//! - The counter is a process-wide atomic, not a thread-local: ids are `Send`
//!   and receivers may be built on one thread and connected on another, so ids
//!   must be unique across threads. It is touched only when an id is allocated,
//!   never while firing or disconnecting.
//! - [`CallbackId`] identifies the callable **type**: a named function or
//!   method path yields the same id at every use site, each closure expression
//!   yields its own.
//! - Equality is reflexive, symmetric, transitive and stable for the lifetime of
//!   the identified object.
//!
//! ## Example
//! ```rust
//! use eventscope::{CallbackId, ObjectId};
//!
//! struct Counter;
//! impl Counter {
//!     fn bump(&self, _: &()) {}
//!     fn reset(&self, _: &()) {}
//! }
//!
//! let a = ObjectId::next();
//! let b = ObjectId::next();
//! assert_ne!(a, b);
//!
//! assert_eq!(CallbackId::of_val(&Counter::bump), CallbackId::of_val(&Counter::bump));
//! assert_ne!(CallbackId::of_val(&Counter::bump), CallbackId::of_val(&Counter::reset));
//! ```

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Global identity counter; `0` is never handed out.
static IDENTITY_SEQ: AtomicU64 = AtomicU64::new(1);

#[inline]
fn next_raw() -> u64 {
    IDENTITY_SEQ.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Identity of a sender or receiver object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocates a fresh, process-unique identity.
    #[must_use]
    pub fn next() -> Self {
        Self(next_raw())
    }

    /// Wraps an identity issued by an external scheme (handle table, arena slot).
    ///
    /// Raw ids share the value space with [`ObjectId::next`]; callers mixing both
    /// must keep their raw values disjoint.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the underlying token.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Identity of an [`EventPoint`](crate::EventPoint).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    pub(crate) fn next() -> Self {
        Self(next_raw())
    }

    /// Returns the underlying token.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// Identity of a broken-listener registration on a [`Connection`](crate::Connection).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates a fresh, process-unique listener identity.
    #[must_use]
    pub fn next() -> Self {
        Self(next_raw())
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Comparable identity of a receiver callback.
///
/// Only supports equality; the callable itself is not reachable through it.
#[derive(Clone, Copy)]
pub struct CallbackId {
    type_id: TypeId,
    name: &'static str,
}

impl CallbackId {
    /// Identity of the callable type `F`.
    #[must_use]
    pub fn of<F: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<F>(),
            name: type_name::<F>(),
        }
    }

    /// Identity of the callable `f`, inferred from its type.
    ///
    /// Prefer passing function items (`Receiver::method`), not `fn` pointers:
    /// all pointers of one signature share a single type and therefore an id.
    #[must_use]
    pub fn of_val<F: ?Sized + 'static>(_f: &F) -> Self {
        Self::of::<F>()
    }

    /// Type name of the callable, for diagnostics only.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for CallbackId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CallbackId {}

impl Hash for CallbackId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Objects that carry a stable [`ObjectId`].
///
/// Receivers bound with `connect_method`/`connect_bound` implement this so their
/// connections can later be found by receiver.
pub trait Identified {
    /// Stable identity of this object.
    fn identity(&self) -> ObjectId;
}

impl Identified for ObjectId {
    fn identity(&self) -> ObjectId {
        *self
    }
}
