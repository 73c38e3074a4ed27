//! # Connection: identity of one sender → receiver binding.
//!
//! A [`Connection`] is referenced by its event point's registry and by any
//! number of scopes at the same time. Instead of counting owners, every owner
//! registers a *broken listener*; disconnecting broadcasts the connection's
//! demise to all of them exactly once, then releases the callback.
//!
//! ## Lifecycle
//! ```text
//!   connect() ──► Connected ── disconnect() ──► Disconnecting ──► Disconnected
//!                     │                              │
//!                     │ fire: invoke callback        │ notify broken listeners
//!                     ▼                              ▼ (each owner drops its entry)
//!                 callback(&args)               callback released
//! ```
//!
//! ## Rules
//! - `disconnect()` is idempotent; a second call (or a call from inside a broken
//!   listener) returns `false` and does nothing.
//! - A panicking broken listener does not strand the others: they are still
//!   notified while unwinding and the link still ends `Disconnected`.
//! - A listener added after the connection broke is invoked immediately.
//! - The callback is moved out of the connection while it runs, so it may
//!   disconnect its own connection; it is dropped once the call returns.
//! - Handles compare by identity: clones of one connection are equal, two
//!   connections with the same sender/receiver/callback are not.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::trace;

use crate::connection::listener::BrokenListeners;
use crate::identity::{CallbackId, EventId, ListenerId, ObjectId};

/// Type-erased callback payload stored in a connection.
///
/// Event points store `Callback<A>` and downcast it back when firing.
pub(crate) type Callback<A> = Box<dyn FnMut(&A)>;

/// Link state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Reachable from its owners and invoked on fire.
    Connected,
    /// Broken listeners are being notified.
    Disconnecting,
    /// Fully detached; the callback has been released.
    Disconnected,
}

struct Link {
    sender: ObjectId,
    event: EventId,
    receiver: ObjectId,
    callback_id: CallbackId,
    state: Cell<LinkState>,
    listeners: RefCell<BrokenListeners>,
    callback: RefCell<Option<Box<dyn Any>>>,
}

/// Handle to one sender → receiver binding.
///
/// Cheap to clone; all clones denote the same binding.
#[derive(Clone)]
pub struct Connection {
    link: Rc<Link>,
}

impl Connection {
    pub(crate) fn new<A: 'static>(
        sender: ObjectId,
        event: EventId,
        receiver: ObjectId,
        callback_id: CallbackId,
        callback: Callback<A>,
    ) -> Self {
        let callback: Box<dyn Any> = Box::new(callback);
        Self {
            link: Rc::new(Link {
                sender,
                event,
                receiver,
                callback_id,
                state: Cell::new(LinkState::Connected),
                listeners: RefCell::default(),
                callback: RefCell::new(Some(callback)),
            }),
        }
    }

    /// Identity of the sender object.
    #[inline]
    pub fn sender(&self) -> ObjectId {
        self.link.sender
    }

    /// Identity of the event point this connection is attached to.
    #[inline]
    pub fn event(&self) -> EventId {
        self.link.event
    }

    /// Identity of the receiver object.
    #[inline]
    pub fn receiver(&self) -> ObjectId {
        self.link.receiver
    }

    /// Comparable identity of the receiver callback.
    #[inline]
    pub fn callback(&self) -> CallbackId {
        self.link.callback_id
    }

    #[inline]
    pub fn state(&self) -> LinkState {
        self.link.state.get()
    }

    /// True until `disconnect()` starts.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Number of registered broken listeners.
    pub fn listener_count(&self) -> usize {
        self.link.listeners.borrow().len()
    }

    /// Breaks the connection and notifies every owner.
    ///
    /// Returns `false` if the connection is already broken (or being broken).
    pub fn disconnect(&self) -> bool {
        if self.link.state.get() != LinkState::Connected {
            return false;
        }
        self.link.state.set(LinkState::Disconnecting);
        trace!(
            event = ?self.link.event,
            receiver = ?self.link.receiver,
            callback = self.link.callback_id.name(),
            "disconnecting"
        );

        let _breaking = Breaking { link: &self.link };
        let listeners = self.link.listeners.take();
        listeners.notify(self);
        true
    }

    /// Registers `callback` to run when this connection is broken.
    ///
    /// If the connection is already broken the callback runs immediately.
    pub fn add_broken_listener(&self, id: ListenerId, callback: impl Fn(&Connection) + 'static) {
        if !self.is_connected() {
            callback(self);
            return;
        }
        self.link.listeners.borrow_mut().add(id, Box::new(callback));
    }

    /// Unregisters the listener with `id`. Returns `false` if there was none.
    pub fn remove_broken_listener(&self, id: ListenerId) -> bool {
        self.link.listeners.borrow_mut().remove(id)
    }

    /// Runs the callback with `args` if still connected.
    ///
    /// Returns whether the callback ran.
    pub(crate) fn invoke<A: 'static>(&self, args: &A) -> bool {
        if !self.is_connected() {
            return false;
        }
        let Some(callback) = self.link.callback.borrow_mut().take() else {
            return false;
        };
        let mut running = Running {
            conn: self,
            callback: Some(callback),
        };
        match running
            .callback
            .as_mut()
            .and_then(|cb| cb.downcast_mut::<Callback<A>>())
        {
            Some(callback) => callback(args),
            None => debug_assert!(false, "callback argument type mismatch"),
        }
        true
    }
}

/// Finishes a disconnect on return or unwind: marks the link broken and
/// releases the callback.
struct Breaking<'a> {
    link: &'a Link,
}

impl Drop for Breaking<'_> {
    fn drop(&mut self) {
        self.link.state.set(LinkState::Disconnected);
        let callback = self.link.callback.borrow_mut().take();
        drop(callback);
    }
}

/// Holds a callback while it runs; hands it back on return or unwind
/// unless the connection was broken meanwhile.
struct Running<'a> {
    conn: &'a Connection,
    callback: Option<Box<dyn Any>>,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        if self.conn.is_connected() {
            *self.conn.link.callback.borrow_mut() = Some(callback);
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.link, &other.link)
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.link), state);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("sender", &self.link.sender)
            .field("event", &self.link.event)
            .field("receiver", &self.link.receiver)
            .field("callback", &self.link.callback_id)
            .field("state", &self.link.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(hits: Rc<Cell<u32>>) -> Connection {
        Connection::new::<u32>(
            ObjectId::next(),
            EventId::next(),
            ObjectId::next(),
            CallbackId::of::<()>(),
            Box::new(move |n: &u32| hits.set(hits.get() + n)),
        )
    }

    #[test]
    fn invoke_runs_callback_while_connected() {
        let hits = Rc::new(Cell::new(0));
        let conn = connection(hits.clone());
        assert!(conn.invoke(&2u32));
        assert!(conn.invoke(&3u32));
        assert_eq!(hits.get(), 5);

        assert!(conn.disconnect());
        assert!(!conn.invoke(&10u32));
        assert_eq!(hits.get(), 5);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let notified = Rc::new(Cell::new(0));
        let conn = connection(Rc::default());
        let n = notified.clone();
        conn.add_broken_listener(ListenerId::next(), move |_| n.set(n.get() + 1));

        assert!(conn.disconnect());
        assert!(!conn.disconnect());
        assert_eq!(notified.get(), 1);
        assert_eq!(conn.state(), LinkState::Disconnected);
        assert_eq!(conn.listener_count(), 0);
    }

    #[test]
    fn every_listener_hears_the_break_once() {
        let conn = connection(Rc::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let seen = seen.clone();
            conn.add_broken_listener(ListenerId::next(), move |c| {
                assert_eq!(c.state(), LinkState::Disconnecting);
                seen.borrow_mut().push(tag);
            });
        }
        conn.disconnect();
        let mut seen = seen.borrow().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn listener_reentering_disconnect_is_a_no_op() {
        let conn = connection(Rc::default());
        let inner_result = Rc::new(Cell::new(None));
        let r = inner_result.clone();
        conn.add_broken_listener(ListenerId::next(), move |c| r.set(Some(c.disconnect())));
        assert!(conn.disconnect());
        assert_eq!(inner_result.get(), Some(false));
    }

    #[test]
    fn removed_listener_is_not_notified() {
        let conn = connection(Rc::default());
        let hit = Rc::new(Cell::new(false));
        let id = ListenerId::next();
        let h = hit.clone();
        conn.add_broken_listener(id, move |_| h.set(true));

        assert!(conn.remove_broken_listener(id));
        assert!(!conn.remove_broken_listener(id));
        assert!(!conn.remove_broken_listener(ListenerId::next()));
        conn.disconnect();
        assert!(!hit.get());
    }

    #[test]
    fn late_listener_runs_immediately() {
        let conn = connection(Rc::default());
        conn.disconnect();
        let hit = Rc::new(Cell::new(false));
        let h = hit.clone();
        conn.add_broken_listener(ListenerId::next(), move |_| h.set(true));
        assert!(hit.get());
    }

    #[test]
    fn callback_may_disconnect_itself() {
        let slot: Rc<RefCell<Option<Connection>>> = Rc::default();
        let calls = Rc::new(Cell::new(0));
        let (s, c) = (slot.clone(), calls.clone());
        let conn = Connection::new::<()>(
            ObjectId::next(),
            EventId::next(),
            ObjectId::next(),
            CallbackId::of::<()>(),
            Box::new(move |_: &()| {
                c.set(c.get() + 1);
                if let Some(me) = s.borrow().as_ref() {
                    assert!(me.disconnect());
                }
            }),
        );
        *slot.borrow_mut() = Some(conn.clone());

        assert!(conn.invoke(&()));
        assert!(!conn.is_connected());
        assert!(!conn.invoke(&()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn callback_is_released_on_disconnect() {
        let token = Rc::new(());
        let held = token.clone();
        let conn = Connection::new::<()>(
            ObjectId::next(),
            EventId::next(),
            ObjectId::next(),
            CallbackId::of::<()>(),
            Box::new(move |_: &()| {
                let _ = &held;
            }),
        );
        assert_eq!(Rc::strong_count(&token), 2);
        conn.disconnect();
        assert_eq!(Rc::strong_count(&token), 1);
    }

    #[test]
    fn panicking_listener_still_completes_the_break() {
        let token = Rc::new(());
        let held = token.clone();
        let conn = Connection::new::<()>(
            ObjectId::next(),
            EventId::next(),
            ObjectId::next(),
            CallbackId::of::<()>(),
            Box::new(move |_: &()| {
                let _ = &held;
            }),
        );
        let after = Rc::new(Cell::new(0));
        let a = after.clone();
        conn.add_broken_listener(ListenerId::next(), |_| panic!("listener failed"));
        conn.add_broken_listener(ListenerId::next(), move |_| a.set(a.get() + 1));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| conn.disconnect()));
        assert!(result.is_err());
        assert_eq!(after.get(), 1);
        assert_eq!(conn.state(), LinkState::Disconnected);
        assert_eq!(Rc::strong_count(&token), 1);
        assert!(!conn.disconnect());
        assert_eq!(after.get(), 1);
    }

    #[test]
    fn clones_compare_equal() {
        let a = connection(Rc::default());
        let b = connection(Rc::default());
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
