//! # EventRef: weak handle to an event point.
//!
//! Callbacks are `'static`, so they cannot borrow the [`EventPoint`](crate::EventPoint)
//! they want to connect to. An [`EventRef`] gives them the same operations
//! without keeping the point alive: once the owner drops the point every
//! operation reports [`DispatchError::EventGone`] (or `0`/`false` for queries).

use std::fmt;
use std::rc::{Rc, Weak};

use crate::connection::Connection;
use crate::error::DispatchError;
use crate::event::core::EventCore;
use crate::identity::{CallbackId, EventId, Identified, ObjectId};

/// Non-owning handle to an [`EventPoint`](crate::EventPoint).
pub struct EventRef<A = ()> {
    core: Weak<EventCore<A>>,
}

impl<A> EventRef<A> {
    pub(crate) fn new(core: Weak<EventCore<A>>) -> Self {
        Self { core }
    }

    fn upgrade(&self) -> Result<Rc<EventCore<A>>, DispatchError> {
        self.core.upgrade().ok_or(DispatchError::EventGone)
    }

    /// True while the event point is alive.
    pub fn is_alive(&self) -> bool {
        self.core.strong_count() > 0
    }

    /// Identity of the event point, if it is alive.
    pub fn id(&self) -> Option<EventId> {
        self.core.upgrade().map(|core| core.id())
    }

    /// Identity of the sender, if the event point is alive.
    pub fn sender(&self) -> Option<ObjectId> {
        self.core.upgrade().map(|core| core.sender())
    }

    /// Number of live connections; `0` once the point is gone.
    pub fn connection_count(&self) -> usize {
        self.core
            .upgrade()
            .map_or(0, |core| core.connection_count())
    }

    pub fn disconnect_all(&self) -> usize {
        self.core.upgrade().map_or(0, |core| core.disconnect_all())
    }

    pub fn disconnect_from_sender(&self, sender: ObjectId) -> bool {
        self.disconnect_where(|c| c.sender() == sender)
    }

    pub fn disconnect_from_receiver(&self, receiver: ObjectId) -> bool {
        self.disconnect_where(|c| c.receiver() == receiver)
    }

    pub fn disconnect_from_event(&self, event: EventId) -> bool {
        self.disconnect_where(|c| c.event() == event)
    }

    pub fn disconnect_from_callback(&self, callback: CallbackId) -> bool {
        self.disconnect_where(|c| c.callback() == callback)
    }

    fn disconnect_where(&self, pred: impl FnMut(&Connection) -> bool) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.disconnect_where(pred) > 0)
    }
}

impl<A: 'static> EventRef<A> {
    /// See [`EventPoint::connect`](crate::EventPoint::connect).
    pub fn connect<F>(&self, receiver: ObjectId, callback: F) -> Result<Connection, DispatchError>
    where
        F: FnMut(&A) + 'static,
    {
        Ok(self.upgrade()?.connect(receiver, callback))
    }

    /// See [`EventPoint::connect_method`](crate::EventPoint::connect_method).
    pub fn connect_method<R, M>(
        &self,
        receiver: &Rc<R>,
        method: M,
    ) -> Result<Connection, DispatchError>
    where
        R: Identified + 'static,
        M: Fn(&R, &A) + 'static,
    {
        Ok(self.upgrade()?.connect_method(receiver, method))
    }

    /// See [`EventPoint::connect_bound`](crate::EventPoint::connect_bound).
    pub fn connect_bound<R, M, B>(
        &self,
        receiver: &Rc<R>,
        method: M,
        bound: B,
    ) -> Result<Connection, DispatchError>
    where
        R: Identified + 'static,
        M: Fn(&R, &A, &B) + 'static,
        B: 'static,
    {
        Ok(self.upgrade()?.connect_bound(receiver, method, bound))
    }

    /// Fires the event point.
    ///
    /// The point is kept alive until the fire returns.
    ///
    /// # Panics
    /// Panics if the point is already firing further up the stack.
    pub fn fire(&self, args: &A) -> Result<(), DispatchError> {
        let core = self.upgrade()?;
        if let Err(err) = core.fire(args) {
            panic!("{err}");
        }
        Ok(())
    }

    /// Fires the event point, reporting reentrancy as an error.
    pub fn try_fire(&self, args: &A) -> Result<usize, DispatchError> {
        self.upgrade()?.fire(args)
    }
}

impl<A> Clone for EventRef<A> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<A> fmt::Debug for EventRef<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRef")
            .field("id", &self.id())
            .field("alive", &self.is_alive())
            .finish()
    }
}
