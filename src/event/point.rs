//! # EventPoint: the sender side of a signal.
//!
//! An [`EventPoint`] is owned by its sender. It holds the registry of every
//! connection targeting it and invokes them on [`fire`](EventPoint::fire).
//!
//! ## Firing
//! ```text
//! fire(&args)
//!   ├─► begin borrow        (registry contents move into the snapshot)
//!   ├─► for slot in snapshot:
//!   │       ├─ tombstone        ─► skip (disconnected earlier in this fire)
//!   │       └─ connection       ─► callback(&args)
//!   │                               ├─ connect(..)    ─► deferred to next fire
//!   │                               └─ disconnect(..) ─► tombstoned, skipped if not reached
//!   └─► end borrow          (survivors + deferred connections become the registry)
//! ```
//!
//! ## Rules
//! - Every connection live when `fire` starts runs exactly once, unless it is
//!   disconnected before its turn.
//! - Connections made during a fire run from the next fire on.
//! - Firing a point from inside its own callback is refused: [`fire`](EventPoint::fire)
//!   panics, [`try_fire`](EventPoint::try_fire) returns [`DispatchError::Reentrant`].
//! - Dropping a point disconnects all its connections. Dropping it from inside one
//!   of its own callbacks is a precondition violation and panics.
//! - No duplicate suppression: connecting the same callback twice yields two
//!   connections, both invoked.

use std::fmt;
use std::rc::Rc;

use crate::config::Config;
use crate::connection::Connection;
use crate::error::DispatchError;
use crate::event::core::EventCore;
use crate::event::handle::EventRef;
use crate::identity::{CallbackId, EventId, Identified, ObjectId};

/// Sender-side signal carrying arguments of type `A`.
///
/// ## Example
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use eventscope::{EventPoint, ObjectId};
///
/// let clicked: EventPoint<u32> = EventPoint::anonymous();
/// let total = Rc::new(Cell::new(0));
///
/// let t = total.clone();
/// let conn = clicked.connect(ObjectId::next(), move |n: &u32| t.set(t.get() + n));
///
/// clicked.fire(&2);
/// clicked.fire(&3);
/// assert_eq!(total.get(), 5);
///
/// conn.disconnect();
/// clicked.fire(&100);
/// assert_eq!(total.get(), 5);
/// assert_eq!(clicked.connection_count(), 0);
/// ```
pub struct EventPoint<A = ()> {
    core: Rc<EventCore<A>>,
}

impl<A> EventPoint<A> {
    /// Creates an event point owned by `sender`.
    #[must_use]
    pub fn new(sender: ObjectId) -> Self {
        Self {
            core: Rc::new(EventCore::new(sender, None)),
        }
    }

    /// Creates an event point with a freshly allocated sender identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(ObjectId::next())
    }

    /// Creates an event point whose registry is preallocated per `config`.
    #[must_use]
    pub fn with_config(sender: ObjectId, config: &Config) -> Self {
        Self {
            core: Rc::new(EventCore::new(sender, config.connection_hint())),
        }
    }

    /// Weak handle for use inside callbacks and by code that must not own the point.
    #[must_use]
    pub fn handle(&self) -> EventRef<A> {
        EventRef::new(Rc::downgrade(&self.core))
    }

    /// Identity of this event point.
    #[inline]
    pub fn id(&self) -> EventId {
        self.core.id()
    }

    /// Identity of the sender that owns this point.
    #[inline]
    pub fn sender(&self) -> ObjectId {
        self.core.sender()
    }

    /// True while a `fire` on this point is in progress.
    pub fn is_firing(&self) -> bool {
        self.core.is_firing()
    }

    /// Number of live connections.
    ///
    /// While firing this includes connections made during the fire.
    pub fn connection_count(&self) -> usize {
        self.core.connection_count()
    }

    pub fn has_connections(&self) -> bool {
        !self.core.is_empty()
    }

    /// Live connections in registry order.
    pub fn connections(&self) -> Vec<Connection> {
        self.core.connections()
    }

    pub fn has_connections_with_sender(&self, sender: ObjectId) -> bool {
        self.core.has_connection_where(|c| c.sender() == sender)
    }

    pub fn has_connections_with_receiver(&self, receiver: ObjectId) -> bool {
        self.core.has_connection_where(|c| c.receiver() == receiver)
    }

    pub fn has_connections_with_event(&self, event: EventId) -> bool {
        self.core.has_connection_where(|c| c.event() == event)
    }

    pub fn has_connections_with_callback(&self, callback: CallbackId) -> bool {
        self.core.has_connection_where(|c| c.callback() == callback)
    }

    /// Disconnects every connection and returns how many were broken.
    ///
    /// Connections made by broken-listener callbacks during the teardown are
    /// disconnected as well.
    pub fn disconnect_all(&self) -> usize {
        self.core.disconnect_all()
    }

    /// Disconnects all connections whose sender is `sender`.
    ///
    /// Returns `false` if nothing matched.
    pub fn disconnect_from_sender(&self, sender: ObjectId) -> bool {
        self.core.disconnect_where(|c| c.sender() == sender) > 0
    }

    /// Disconnects all connections whose receiver is `receiver`.
    ///
    /// Returns `false` if nothing matched.
    pub fn disconnect_from_receiver(&self, receiver: ObjectId) -> bool {
        self.core.disconnect_where(|c| c.receiver() == receiver) > 0
    }

    /// Disconnects all connections attached to `event`.
    ///
    /// Every connection of a point is attached to that point, so this is either
    /// [`disconnect_all`](Self::disconnect_all) or a no-op.
    pub fn disconnect_from_event(&self, event: EventId) -> bool {
        self.core.disconnect_where(|c| c.event() == event) > 0
    }

    /// Disconnects all connections whose callback identity is `callback`.
    pub fn disconnect_from_callback(&self, callback: CallbackId) -> bool {
        self.core.disconnect_where(|c| c.callback() == callback) > 0
    }

    /// Disconnects every connection of `receiver` bound to `callback`.
    pub fn disconnect_matching(&self, receiver: ObjectId, callback: CallbackId) -> usize {
        self.core
            .disconnect_where(|c| c.receiver() == receiver && c.callback() == callback)
    }

    /// Disconnects the first connection of `receiver` bound to `callback`.
    pub fn disconnect_one(&self, receiver: ObjectId, callback: CallbackId) -> bool {
        self.core
            .disconnect_first(|c| c.receiver() == receiver && c.callback() == callback)
    }
}

impl<A: 'static> EventPoint<A> {
    /// Connects `callback` on behalf of `receiver`.
    ///
    /// The callback identity is the type of `callback`.
    pub fn connect<F>(&self, receiver: ObjectId, callback: F) -> Connection
    where
        F: FnMut(&A) + 'static,
    {
        self.core.connect(receiver, callback)
    }

    /// Connects `method` of `receiver`.
    ///
    /// The receiver is held weakly: once it is dropped the connection stays
    /// registered but its callback does nothing.
    pub fn connect_method<R, M>(&self, receiver: &Rc<R>, method: M) -> Connection
    where
        R: Identified + 'static,
        M: Fn(&R, &A) + 'static,
    {
        self.core.connect_method(receiver, method)
    }

    /// Connects `method` of `receiver` with an extra argument passed after the event arguments.
    pub fn connect_bound<R, M, B>(&self, receiver: &Rc<R>, method: M, bound: B) -> Connection
    where
        R: Identified + 'static,
        M: Fn(&R, &A, &B) + 'static,
        B: 'static,
    {
        self.core.connect_bound(receiver, method, bound)
    }

    /// Invokes every connection live at the start of the call.
    ///
    /// # Panics
    /// Panics if this point is already firing further up the stack.
    pub fn fire(&self, args: &A) {
        let core = Rc::clone(&self.core);
        if let Err(err) = core.fire(args) {
            panic!("{err}");
        }
    }

    /// Like [`fire`](Self::fire), but reports reentrancy as an error.
    ///
    /// Returns the number of callbacks that ran.
    pub fn try_fire(&self, args: &A) -> Result<usize, DispatchError> {
        let core = Rc::clone(&self.core);
        core.fire(args)
    }
}

impl<A> Default for EventPoint<A> {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl<A> fmt::Debug for EventPoint<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPoint")
            .field("id", &self.id())
            .field("sender", &self.sender())
            .field("connections", &self.connection_count())
            .finish()
    }
}

impl<A> Drop for EventPoint<A> {
    fn drop(&mut self) {
        if self.core.is_firing() && !std::thread::panicking() {
            panic!("{:?} dropped while firing", self.core.id());
        }
        self.core.disconnect_all();
    }
}
