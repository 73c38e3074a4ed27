//! Broken-listener bookkeeping for a single connection.

use std::panic::{self, AssertUnwindSafe};
use std::vec;

use crate::connection::Connection;
use crate::identity::ListenerId;

/// Callback invoked once when a connection is broken.
pub(crate) type BrokenFn = dyn Fn(&Connection);

/// One registration: identity plus callback.
struct BrokenListener {
    id: ListenerId,
    callback: Box<BrokenFn>,
}

/// Listeners interested in the demise of one connection.
///
/// Notification order is unspecified (removal swaps with the last entry).
#[derive(Default)]
pub(crate) struct BrokenListeners {
    entries: Vec<BrokenListener>,
}

impl BrokenListeners {
    pub(crate) fn add(&mut self, id: ListenerId, callback: Box<BrokenFn>) {
        self.entries.push(BrokenListener { id, callback });
    }

    /// Removes the first registration with `id`.
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        match self.entries.iter().position(|l| l.id == id) {
            Some(index) => {
                self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Invokes every listener with `conn`, consuming the set.
    ///
    /// If a listener panics, the ones after it are still invoked before the
    /// panic propagates.
    pub(crate) fn notify(self, conn: &Connection) {
        let mut pending = Pending {
            conn,
            rest: self.entries.into_iter(),
        };
        while let Some(listener) = pending.rest.next() {
            (listener.callback)(conn);
        }
    }
}

/// Listeners not yet notified; drained on unwind.
struct Pending<'a> {
    conn: &'a Connection,
    rest: vec::IntoIter<BrokenListener>,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        let conn = self.conn;
        for listener in self.rest.by_ref() {
            // a second panic is swallowed; the first one is already unwinding
            let _ = panic::catch_unwind(AssertUnwindSafe(|| (listener.callback)(conn)));
        }
    }
}
