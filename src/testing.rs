//! Shared fixtures for unit tests.

use std::cell::Cell;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use crate::identity::{Identified, ObjectId};

/// Installs a test-writer subscriber once; filter via `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counter receiver with increment/decrement/set slots.
pub(crate) struct Receiver {
    id: ObjectId,
    value: Cell<i32>,
}

impl Receiver {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            id: ObjectId::next(),
            value: Cell::new(0),
        })
    }

    pub(crate) fn increment(&self, _: &()) {
        self.value.set(self.value.get() + 1);
    }

    pub(crate) fn decrement(&self, _: &()) {
        self.value.set(self.value.get() - 1);
    }

    pub(crate) fn set_value(&self, _: &(), value: &i32) {
        self.value.set(*value);
    }

    pub(crate) fn value(&self) -> i32 {
        self.value.get()
    }

    pub(crate) fn reset(&self, value: i32) {
        self.value.set(value);
    }
}

impl Identified for Receiver {
    fn identity(&self) -> ObjectId {
        self.id
    }
}
