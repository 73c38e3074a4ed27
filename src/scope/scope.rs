//! # Scope: auto-disconnecting owner of connections.
//!
//! A [`Scope`] tracks connections made through it (or handed to it) across any
//! number of event points, and disconnects whatever it still holds when it is
//! dropped.
//!
//! ## Architecture
//! ```text
//!                 ┌──────────────── Connection ────────────────┐
//!                 │ broken listeners: [event point, scope, ..] │
//!                 └──────────▲──────────────────────▲──────────┘
//!                            │                      │
//!   EventPoint registry ─────┘                      └───── Scope registry
//!   (forget on break)                                      (forget on break)
//!
//! disconnect() from any path ─► every listener drops its own entry
//! ```
//!
//! ## Rules
//! - The scope registers itself as a broken listener on every tracked connection
//!   and forgets the connection when notified; it never re-enters `disconnect()`.
//! - Dropping the scope (or calling [`Scope::disconnect`]) disconnects every
//!   tracked connection, in unspecified order. Connections tracked by listener
//!   callbacks during that teardown are disconnected too.
//! - Connections outlive neither their event point nor their scope.
//!
//! ## Example
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use eventscope::{EventPoint, ObjectId, Scope};
//!
//! let ticked: EventPoint = EventPoint::anonymous();
//! let ticks = Rc::new(Cell::new(0));
//! {
//!     let scope = Scope::new();
//!     let t = ticks.clone();
//!     scope.connect(&ticked, ObjectId::next(), move |_: &()| t.set(t.get() + 1));
//!     ticked.fire(&());
//!     assert_eq!(ticked.connection_count(), 1);
//! }
//! ticked.fire(&());
//! assert_eq!(ticks.get(), 1);
//! assert_eq!(ticked.connection_count(), 0);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::config::Config;
use crate::connection::Connection;
use crate::event::EventPoint;
use crate::identity::{CallbackId, EventId, Identified, ListenerId, ObjectId};
use crate::registry::BorrowRegistry;
use crate::scope::handle::ScopeRef;

pub(crate) struct ScopeCore {
    listener: ListenerId,
    registry: RefCell<BorrowRegistry<Connection>>,
}

impl ScopeCore {
    fn new(capacity: Option<usize>) -> Self {
        let registry = match capacity {
            Some(n) => BorrowRegistry::with_capacity(n),
            None => BorrowRegistry::new(),
        };
        Self {
            listener: ListenerId::next(),
            registry: RefCell::new(registry),
        }
    }

    #[inline]
    pub(crate) fn listener(&self) -> ListenerId {
        self.listener
    }

    /// Starts tracking `conn`. Returns `false` if it is broken or already tracked.
    pub(crate) fn track(self: &Rc<Self>, conn: &Connection) -> bool {
        if !conn.is_connected() || self.registry.borrow().contains(conn) {
            return false;
        }
        let weak = Rc::downgrade(self);
        conn.add_broken_listener(self.listener, move |c| {
            if let Some(core) = weak.upgrade() {
                core.forget(c);
            }
        });
        self.registry.borrow_mut().insert(conn.clone());
        true
    }

    /// Stops tracking `conn` without disconnecting it.
    pub(crate) fn untrack(&self, conn: &Connection) -> bool {
        if !self.registry.borrow_mut().remove(conn) {
            return false;
        }
        conn.remove_broken_listener(self.listener);
        true
    }

    fn forget(&self, conn: &Connection) {
        self.registry.borrow_mut().remove(conn);
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.registry.borrow().len()
    }

    pub(crate) fn connections(&self) -> Vec<Connection> {
        self.registry.borrow().iter().cloned().collect()
    }

    pub(crate) fn has_connection_where(&self, pred: impl FnMut(&Connection) -> bool) -> bool {
        self.registry.borrow().iter().any(pred)
    }

    pub(crate) fn disconnect_all(&self) -> usize {
        let mut total = 0;
        loop {
            let taken = self.registry.borrow_mut().take_all();
            if taken.is_empty() {
                break;
            }
            total += taken.iter().filter(|conn| conn.disconnect()).count();
        }
        total
    }

    pub(crate) fn disconnect_where(&self, pred: impl FnMut(&Connection) -> bool) -> usize {
        let taken = self.registry.borrow_mut().take_matching(pred);
        taken.iter().filter(|conn| conn.disconnect()).count()
    }
}

/// Owner that disconnects its connections when dropped.
pub struct Scope {
    core: Rc<ScopeCore>,
}

impl Scope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(ScopeCore::new(None)),
        }
    }

    /// Creates an empty scope whose registry is preallocated per `config`.
    #[must_use]
    pub fn with_config(config: &Config) -> Self {
        Self {
            core: Rc::new(ScopeCore::new(config.scope_hint())),
        }
    }

    /// Weak handle for use inside callbacks.
    #[must_use]
    pub fn handle(&self) -> ScopeRef {
        ScopeRef::new(Rc::downgrade(&self.core))
    }

    /// Identity under which this scope listens on its connections.
    #[inline]
    pub fn listener_id(&self) -> ListenerId {
        self.core.listener()
    }

    /// Connects `callback` to `event` and tracks the connection.
    pub fn connect<A, F>(&self, event: &EventPoint<A>, receiver: ObjectId, callback: F)
    where
        A: 'static,
        F: FnMut(&A) + 'static,
    {
        self.core.track(&event.connect(receiver, callback));
    }

    /// Connects `method` of `receiver` to `event` and tracks the connection.
    pub fn connect_method<A, R, M>(&self, event: &EventPoint<A>, receiver: &Rc<R>, method: M)
    where
        A: 'static,
        R: Identified + 'static,
        M: Fn(&R, &A) + 'static,
    {
        self.core.track(&event.connect_method(receiver, method));
    }

    /// Connects `method` of `receiver` with a bound extra argument and tracks the connection.
    pub fn connect_bound<A, R, M, B>(
        &self,
        event: &EventPoint<A>,
        receiver: &Rc<R>,
        method: M,
        bound: B,
    ) where
        A: 'static,
        R: Identified + 'static,
        M: Fn(&R, &A, &B) + 'static,
        B: 'static,
    {
        self.core.track(&event.connect_bound(receiver, method, bound));
    }

    /// Tracks an existing connection.
    ///
    /// Returns `false` if the connection is already broken or already tracked here.
    pub fn track(&self, conn: &Connection) -> bool {
        self.core.track(conn)
    }

    /// Stops tracking `conn` without disconnecting it.
    pub fn untrack(&self, conn: &Connection) -> bool {
        self.core.untrack(conn)
    }

    /// Number of connections this scope holds.
    pub fn connection_count(&self) -> usize {
        self.core.connection_count()
    }

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

    /// Disconnects every tracked connection. Returns how many were broken.
    pub fn disconnect(&self) -> usize {
        let total = self.core.disconnect_all();
        if total > 0 {
            debug!(scope = ?self.core.listener(), disconnected = total, "scope disconnected");
        }
        total
    }

    pub fn disconnect_from_sender(&self, sender: ObjectId) -> bool {
        self.core.disconnect_where(|c| c.sender() == sender) > 0
    }

    pub fn disconnect_from_receiver(&self, receiver: ObjectId) -> bool {
        self.core.disconnect_where(|c| c.receiver() == receiver) > 0
    }

    pub fn disconnect_from_event(&self, event: EventId) -> bool {
        self.core.disconnect_where(|c| c.event() == event) > 0
    }

    pub fn disconnect_from_callback(&self, callback: CallbackId) -> bool {
        self.core.disconnect_where(|c| c.callback() == callback) > 0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("listener", &self.core.listener())
            .field("connections", &self.connection_count())
            .finish()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::connection::LinkState;
    use crate::event::EventRef;
    use crate::testing::{init_tracing, Receiver};

    #[test]
    fn manual_connect_disconnect() {
        init_tracing();
        let ev: EventPoint = EventPoint::anonymous();
        let (r1, r2) = (Receiver::new(), Receiver::new());
        let scope = Scope::new();
        let inc = CallbackId::of_val(&Receiver::increment);
        let dec = CallbackId::of_val(&Receiver::decrement);

        let fire_and_check = |v1: i32, v2: i32| {
            ev.fire(&());
            assert_eq!((r1.value(), r2.value()), (v1, v2));
        };

        fire_and_check(0, 0);

        scope.connect_method(&ev, &r1, Receiver::increment);
        fire_and_check(1, 0); // +1-0 +0-0
        fire_and_check(2, 0);

        scope.connect_method(&ev, &r2, Receiver::increment);
        fire_and_check(3, 1); // +1-0 +1-0

        scope.connect_method(&ev, &r1, Receiver::decrement);
        fire_and_check(3, 2); // +1-1 +1-0

        scope.connect_method(&ev, &r1, Receiver::decrement);
        fire_and_check(2, 3); // +1-2 +1-0

        scope.connect_method(&ev, &r2, Receiver::decrement);
        fire_and_check(1, 3); // +1-2 +1-1

        scope.connect_method(&ev, &r2, Receiver::increment);
        fire_and_check(0, 4); // +1-2 +2-1

        assert_eq!(ev.disconnect_matching(r2.identity(), dec), 1);
        fire_and_check(-1, 6); // +1-2 +2-0

        assert!(ev.disconnect_one(r1.identity(), dec));
        fire_and_check(-1, 8); // +1-1 +2-0

        assert_eq!(ev.disconnect_matching(r1.identity(), inc), 1);
        fire_and_check(-2, 10); // +0-1 +2-0

        assert!(ev.disconnect_one(r2.identity(), inc));
        fire_and_check(-3, 11); // +0-1 +1-0

        assert_eq!(scope.connection_count(), 2);
        assert_eq!(ev.disconnect_all(), 2);
        fire_and_check(-3, 11);
        assert_eq!(scope.connection_count(), 0);
    }

    #[test]
    fn automatic_disconnect() {
        let scope0 = Scope::new();
        let r0 = Receiver::new();
        {
            let ev: EventPoint = EventPoint::anonymous();
            ev.fire(&());
            {
                let r1 = Receiver::new();
                {
                    let scope1 = Scope::new();
                    scope1.connect_method(&ev, &r1, Receiver::increment);
                    assert_eq!(r1.value(), 0);
                    ev.fire(&());
                    assert_eq!(r1.value(), 1);
                }
                ev.fire(&());
                assert_eq!(r1.value(), 1);
                {
                    let scope2 = Scope::new();
                    scope2.connect_method(&ev, &r1, Receiver::decrement);
                    assert_eq!(r1.value(), 1);
                    ev.fire(&());
                    assert_eq!(r1.value(), 0);
                }
                ev.fire(&());
                assert_eq!(r1.value(), 0);

                scope0.connect_bound(&ev, &r0, Receiver::set_value, 5);
                ev.fire(&());
                assert_eq!(r0.value(), 5);
                r0.reset(-1);
                ev.fire(&());
                assert_eq!(r0.value(), 5);
            }
            r0.reset(-1);
            ev.fire(&());
            assert_eq!(r0.value(), 5);
            assert_ne!(scope0.connection_count(), 0);
        }
        assert_eq!(scope0.connection_count(), 0);
    }

    struct Stage {
        values: Vec<Cell<i32>>,
        step: Cell<usize>,
        event: EventRef,
        scope: ScopeRef,
    }

    impl Stage {
        fn attach(self: &Rc<Self>, index: usize) {
            let stage = Rc::clone(self);
            self.scope
                .connect(&self.event, ObjectId::from_raw(index as u64), move |_: &()| {
                    let value = &stage.values[index];
                    value.set(value.get() + 1);
                    let next = index + stage.step.get();
                    if next < stage.values.len() {
                        stage.attach(next);
                    }
                })
                .expect("event and scope alive");
        }

        fn values(&self) -> Vec<i32> {
            self.values.iter().map(Cell::get).collect()
        }
    }

    #[test]
    fn connect_from_callback() {
        init_tracing();
        let scope = Scope::new();
        let ev: EventPoint = EventPoint::anonymous();
        let stage = Rc::new(Stage {
            values: (0..8).map(|_| Cell::new(0)).collect(),
            step: Cell::new(1),
            event: ev.handle(),
            scope: scope.handle(),
        });
        let run_stage = || {
            ev.fire(&());
            stage.step.set(stage.step.get() * 2);
        };

        stage.attach(0);
        assert_eq!(stage.values(), vec![0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ev.connection_count(), 1);

        run_stage();
        assert_eq!(stage.values(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ev.connection_count(), 2);

        run_stage();
        assert_eq!(stage.values(), vec![2, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ev.connection_count(), 4);

        run_stage();
        assert_eq!(stage.values(), vec![3, 2, 1, 1, 0, 0, 0, 0]);
        assert_eq!(ev.connection_count(), 8);

        run_stage();
        assert_eq!(stage.values(), vec![4, 3, 2, 2, 1, 1, 1, 1]);
        assert_eq!(ev.connection_count(), 8);
        assert_eq!(scope.connection_count(), 8);
    }

    #[test]
    fn scope_teardown_reduces_event_count_exactly() {
        let ev: EventPoint = EventPoint::anonymous();
        let outside = Receiver::new();
        ev.connect_method(&outside, Receiver::increment);
        {
            let scope = Scope::new();
            let r = Receiver::new();
            for _ in 0..3 {
                scope.connect_method(&ev, &r, Receiver::increment);
            }
            assert_eq!(ev.connection_count(), 4);
            assert_eq!(scope.connection_count(), 3);
        }
        assert_eq!(ev.connection_count(), 1);
    }

    #[test]
    fn disconnect_via_either_owner_removes_from_both() {
        let ev: EventPoint = EventPoint::anonymous();
        let scope = Scope::new();
        let r = Receiver::new();

        let conn = ev.connect_method(&r, Receiver::increment);
        assert!(scope.track(&conn));
        assert!(!scope.track(&conn));
        assert_eq!(conn.listener_count(), 2);
        assert_eq!(ev.connections(), scope.connections());

        // through the connection
        assert!(conn.disconnect());
        assert_eq!(ev.connection_count(), 0);
        assert_eq!(scope.connection_count(), 0);
        assert!(!conn.disconnect());

        // through the event point
        scope.connect_method(&ev, &r, Receiver::increment);
        assert!(ev.disconnect_from_receiver(r.identity()));
        assert_eq!(scope.connection_count(), 0);

        // through the scope
        scope.connect_method(&ev, &r, Receiver::increment);
        assert!(scope.disconnect_from_receiver(r.identity()));
        assert_eq!(ev.connection_count(), 0);
        assert!(!scope.disconnect_from_receiver(r.identity()));
    }

    #[test]
    fn connection_shared_by_two_scopes() {
        let ev: EventPoint = EventPoint::anonymous();
        let (a, b) = (Scope::new(), Scope::new());
        let conn = ev.connect(ObjectId::next(), |_: &()| {});
        assert!(a.track(&conn));
        assert!(b.track(&conn));

        drop(a);
        assert!(!conn.is_connected());
        assert_eq!(b.connection_count(), 0);
        assert_eq!(ev.connection_count(), 0);
    }

    #[test]
    fn untrack_keeps_connection_alive() {
        let ev: EventPoint = EventPoint::anonymous();
        let conn = ev.connect(ObjectId::next(), |_: &()| {});
        {
            let scope = Scope::new();
            assert!(scope.track(&conn));
            assert!(scope.untrack(&conn));
            assert!(!scope.untrack(&conn));
            assert_eq!(conn.listener_count(), 1);
        }
        assert!(conn.is_connected());
        assert_eq!(ev.connection_count(), 1);
    }

    #[test]
    fn broken_connection_is_not_tracked() {
        let ev: EventPoint = EventPoint::anonymous();
        let scope = Scope::new();
        let conn = ev.connect(ObjectId::next(), |_: &()| {});
        conn.disconnect();
        assert!(!scope.track(&conn));
        assert_eq!(scope.connection_count(), 0);
    }

    #[test]
    fn scope_spans_several_event_points() {
        let e1: EventPoint = EventPoint::anonymous();
        let e2: EventPoint<u8> = EventPoint::anonymous();
        let scope = Scope::new();
        scope.connect(&e1, ObjectId::next(), |_: &()| {});
        scope.connect(&e2, ObjectId::next(), |_: &u8| {});
        scope.connect(&e2, ObjectId::next(), |_: &u8| {});

        assert!(scope.has_connections_with_event(e2.id()));
        assert!(scope.has_connections_with_sender(e1.sender()));
        assert!(scope.disconnect_from_event(e2.id()));
        assert_eq!(e2.connection_count(), 0);
        assert_eq!(e1.connection_count(), 1);
        assert!(!scope.has_connections_with_event(e2.id()));

        assert!(!scope.disconnect_from_sender(e2.sender()));
        assert!(scope.disconnect_from_sender(e1.sender()));
        assert_eq!(scope.connection_count(), 0);
    }

    #[test]
    fn scope_criteria_by_callback() {
        let ev: EventPoint = EventPoint::anonymous();
        let scope = Scope::new();
        let r = Receiver::new();
        scope.connect_method(&ev, &r, Receiver::increment);
        scope.connect_method(&ev, &r, Receiver::decrement);

        let inc = CallbackId::of_val(&Receiver::increment);
        assert!(scope.has_connections_with_receiver(r.identity()));
        assert!(scope.has_connections_with_callback(inc));
        assert!(scope.disconnect_from_callback(inc));
        assert!(!scope.has_connections_with_callback(inc));
        assert_eq!(ev.connection_count(), 1);
        assert_eq!(scope.disconnect(), 1);
        assert_eq!(scope.disconnect(), 0);
    }

    #[test]
    fn panicking_listener_does_not_strand_the_scope() {
        let ev: EventPoint = EventPoint::anonymous();
        let scope = Scope::new();
        let conn = ev.connect(ObjectId::next(), |_: &()| {});
        conn.add_broken_listener(ListenerId::next(), |_| panic!("listener failed"));
        assert!(scope.track(&conn));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| conn.disconnect()));
        assert!(result.is_err());
        assert_eq!(conn.state(), LinkState::Disconnected);
        assert_eq!(ev.connection_count(), 0);
        assert_eq!(scope.connection_count(), 0);
        assert!(!conn.disconnect());
    }

    #[test]
    fn teardown_disconnects_connections_made_by_listeners() {
        let ev: EventPoint = EventPoint::anonymous();
        let scope = Scope::new();
        let handle = scope.handle();
        let event = ev.handle();
        let conn = ev.connect(ObjectId::next(), |_: &()| {});
        scope.track(&conn);

        // resurrect once from a broken listener
        let armed = Cell::new(true);
        conn.add_broken_listener(ListenerId::next(), move |_| {
            if armed.replace(false) {
                let _ = handle.connect(&event, ObjectId::next(), |_: &()| {});
            }
        });

        assert_eq!(scope.disconnect(), 2);
        assert_eq!(scope.connection_count(), 0);
        assert_eq!(ev.connection_count(), 0);
    }

    #[test]
    fn config_preallocates_scope() {
        let cfg = Config {
            scope_capacity: 8,
            ..Config::default()
        };
        let scope = Scope::with_config(&cfg);
        let ev: EventPoint = EventPoint::anonymous();
        for _ in 0..8 {
            scope.connect(&ev, ObjectId::next(), |_: &()| {});
        }
        assert_eq!(scope.connection_count(), 8);
        assert!(format!("{scope:?}").contains("connections: 8"));
    }
}
