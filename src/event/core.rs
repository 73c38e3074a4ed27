//! Shared state behind [`EventPoint`](crate::EventPoint) and [`EventRef`](crate::EventRef).

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::connection::{Callback, Connection};
use crate::error::DispatchError;
use crate::identity::{CallbackId, EventId, Identified, ListenerId, ObjectId};
use crate::registry::BorrowRegistry;

pub(crate) struct EventCore<A> {
    id: EventId,
    sender: ObjectId,
    /// Identity under which this point listens for its connections breaking.
    listener: ListenerId,
    registry: RefCell<BorrowRegistry<Connection>>,
    _args: PhantomData<fn(&A)>,
}

/// Ends the firing borrow, also when a callback unwinds.
struct FireGuard<'a> {
    registry: &'a RefCell<BorrowRegistry<Connection>>,
}

impl Drop for FireGuard<'_> {
    fn drop(&mut self) {
        self.registry.borrow_mut().end_borrow();
    }
}

impl<A> EventCore<A> {
    pub(crate) fn new(sender: ObjectId, capacity: Option<usize>) -> Self {
        let registry = match capacity {
            Some(n) => BorrowRegistry::with_capacity(n),
            None => BorrowRegistry::new(),
        };
        Self {
            id: EventId::next(),
            sender,
            listener: ListenerId::next(),
            registry: RefCell::new(registry),
            _args: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> EventId {
        self.id
    }

    #[inline]
    pub(crate) fn sender(&self) -> ObjectId {
        self.sender
    }

    pub(crate) fn is_firing(&self) -> bool {
        self.registry.borrow().is_borrowed()
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.registry.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.registry.borrow().is_empty()
    }

    pub(crate) fn connections(&self) -> Vec<Connection> {
        self.registry.borrow().iter().cloned().collect()
    }

    pub(crate) fn has_connection_where(&self, pred: impl FnMut(&Connection) -> bool) -> bool {
        self.registry.borrow().iter().any(pred)
    }

    /// Broken-listener callback: drops this point's entry for `conn`.
    fn forget(&self, conn: &Connection) {
        self.registry.borrow_mut().remove(conn);
    }

    /// Disconnects every connection, including ones added while tearing down.
    pub(crate) fn disconnect_all(&self) -> usize {
        let mut total = 0;
        loop {
            let taken = self.registry.borrow_mut().take_all();
            if taken.is_empty() {
                break;
            }
            total += disconnect_each(&taken);
        }
        if total > 0 {
            debug!(event = ?self.id, disconnected = total, "disconnected all");
        }
        total
    }

    /// Disconnects every connection matching `pred`.
    pub(crate) fn disconnect_where(&self, pred: impl FnMut(&Connection) -> bool) -> usize {
        let taken = self.registry.borrow_mut().take_matching(pred);
        let total = disconnect_each(&taken);
        if total > 0 {
            debug!(event = ?self.id, disconnected = total, "disconnected by criteria");
        }
        total
    }

    /// Disconnects the first connection (in registry order) matching `pred`.
    pub(crate) fn disconnect_first(&self, pred: impl FnMut(&Connection) -> bool) -> bool {
        let taken = self.registry.borrow_mut().take_first(pred);
        taken.is_some_and(|conn| conn.disconnect())
    }
}

impl<A: 'static> EventCore<A> {
    pub(crate) fn connect_boxed(
        self: &Rc<Self>,
        receiver: ObjectId,
        callback_id: CallbackId,
        callback: Callback<A>,
    ) -> Connection {
        let conn = Connection::new(self.sender, self.id, receiver, callback_id, callback);
        let weak = Rc::downgrade(self);
        conn.add_broken_listener(self.listener, move |c| {
            if let Some(core) = weak.upgrade() {
                core.forget(c);
            }
        });
        self.registry.borrow_mut().insert(conn.clone());
        trace!(
            event = ?self.id,
            receiver = ?receiver,
            callback = callback_id.name(),
            deferred = self.is_firing(),
            "connected"
        );
        conn
    }

    pub(crate) fn connect<F>(self: &Rc<Self>, receiver: ObjectId, callback: F) -> Connection
    where
        F: FnMut(&A) + 'static,
    {
        self.connect_boxed(receiver, CallbackId::of::<F>(), Box::new(callback))
    }

    pub(crate) fn connect_method<R, M>(self: &Rc<Self>, receiver: &Rc<R>, method: M) -> Connection
    where
        R: Identified + 'static,
        M: Fn(&R, &A) + 'static,
    {
        let target = Rc::downgrade(receiver);
        self.connect_boxed(
            receiver.identity(),
            CallbackId::of::<M>(),
            Box::new(move |args: &A| {
                if let Some(r) = target.upgrade() {
                    method(&*r, args);
                }
            }),
        )
    }

    pub(crate) fn connect_bound<R, M, B>(
        self: &Rc<Self>,
        receiver: &Rc<R>,
        method: M,
        bound: B,
    ) -> Connection
    where
        R: Identified + 'static,
        M: Fn(&R, &A, &B) + 'static,
        B: 'static,
    {
        let target = Rc::downgrade(receiver);
        self.connect_boxed(
            receiver.identity(),
            CallbackId::of::<M>(),
            Box::new(move |args: &A| {
                if let Some(r) = target.upgrade() {
                    method(&*r, args, &bound);
                }
            }),
        )
    }

    /// Invokes every connection live at the start of this call.
    ///
    /// Returns the number of callbacks that ran.
    pub(crate) fn fire(&self, args: &A) -> Result<usize, DispatchError> {
        if !self.registry.borrow_mut().begin_borrow() {
            return Err(DispatchError::Reentrant { event: self.id });
        }
        let _guard = FireGuard {
            registry: &self.registry,
        };

        let mut invoked = 0;
        let mut index = 0;
        loop {
            let slot = self
                .registry
                .borrow()
                .snapshot_at(index)
                .map(|slot| slot.cloned());
            let Some(slot) = slot else {
                break;
            };
            index += 1;
            if let Some(conn) = slot {
                if conn.invoke(args) {
                    invoked += 1;
                }
            }
        }
        trace!(event = ?self.id, invoked, "fired");
        Ok(invoked)
    }
}

fn disconnect_each(conns: &[Connection]) -> usize {
    conns.iter().filter(|conn| conn.disconnect()).count()
}
