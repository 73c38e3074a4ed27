//! # ScopeRef: weak handle to a scope.
//!
//! Lets a callback connect more receivers "into" the scope that owns it.
//! Operations report [`DispatchError::ScopeGone`] once the scope is dropped;
//! the scope is checked before the event point, so nothing is connected
//! untracked.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::connection::Connection;
use crate::error::DispatchError;
use crate::event::EventRef;
use crate::identity::{Identified, ObjectId};
use crate::scope::scope::ScopeCore;

/// Non-owning handle to a [`Scope`](crate::Scope).
#[derive(Clone)]
pub struct ScopeRef {
    core: Weak<ScopeCore>,
}

impl ScopeRef {
    pub(crate) fn new(core: Weak<ScopeCore>) -> Self {
        Self { core }
    }

    fn upgrade(&self) -> Result<Rc<ScopeCore>, DispatchError> {
        self.core.upgrade().ok_or(DispatchError::ScopeGone)
    }

    pub fn is_alive(&self) -> bool {
        self.core.strong_count() > 0
    }

    /// Connects `callback` to `event` and tracks the connection in the scope.
    pub fn connect<A, F>(
        &self,
        event: &EventRef<A>,
        receiver: ObjectId,
        callback: F,
    ) -> Result<(), DispatchError>
    where
        A: 'static,
        F: FnMut(&A) + 'static,
    {
        let scope = self.upgrade()?;
        scope.track(&event.connect(receiver, callback)?);
        Ok(())
    }

    /// Connects `method` of `receiver` to `event` and tracks the connection.
    pub fn connect_method<A, R, M>(
        &self,
        event: &EventRef<A>,
        receiver: &Rc<R>,
        method: M,
    ) -> Result<(), DispatchError>
    where
        A: 'static,
        R: Identified + 'static,
        M: Fn(&R, &A) + 'static,
    {
        let scope = self.upgrade()?;
        scope.track(&event.connect_method(receiver, method)?);
        Ok(())
    }

    pub fn connect_bound<A, R, M, B>(
        &self,
        event: &EventRef<A>,
        receiver: &Rc<R>,
        method: M,
        bound: B,
    ) -> Result<(), DispatchError>
    where
        A: 'static,
        R: Identified + 'static,
        M: Fn(&R, &A, &B) + 'static,
        B: 'static,
    {
        let scope = self.upgrade()?;
        scope.track(&event.connect_bound(receiver, method, bound)?);
        Ok(())
    }

    /// See [`Scope::track`](crate::Scope::track).
    pub fn track(&self, conn: &Connection) -> Result<bool, DispatchError> {
        Ok(self.upgrade()?.track(conn))
    }

    /// Tracked connections; `0` once the scope is gone.
    pub fn connection_count(&self) -> usize {
        self.core.upgrade().map_or(0, |core| core.connection_count())
    }

    /// Disconnects every tracked connection; `0` once the scope is gone.
    pub fn disconnect(&self) -> usize {
        self.core.upgrade().map_or(0, |core| core.disconnect_all())
    }
}

impl fmt::Debug for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRef")
            .field("alive", &self.is_alive())
            .finish()
    }
}
