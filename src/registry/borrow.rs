//! # Borrowable registry: stable snapshot iteration under mutation.
//!
//! [`BorrowRegistry`] stores connection handles for one owner and lets the firing
//! path iterate a stable snapshot while callbacks insert or remove entries.
//!
//! ## State machine
//! ```text
//!              begin_borrow()  (swap primary <-> snapshot)
//!   ┌──────┐ ─────────────────────► ┌──────────┐
//!   │ Idle │                        │ Borrowed │ ── begin_borrow() ─► refused
//!   └──────┘ ◄───────────────────── └──────────┘
//!              end_borrow()    (compact, append additions, swap back)
//!
//! Idle:      primary = live entries,             snapshot = []
//! Borrowed:  primary = entries added mid-fire,   snapshot = entries at borrow start
//!            (removed snapshot entries are tombstoned in place)
//! ```
//!
//! ## Rules
//! - At most one borrow at a time.
//! - `begin_borrow()` is a buffer swap; no entry is moved.
//! - Entries inserted while borrowed are not part of the snapshot; they become
//!   visible to iteration only after `end_borrow()`.
//! - Entries removed while borrowed are tombstoned: slots before the iteration
//!   cursor are unaffected, slots after it are skipped.
//! - `end_borrow()` moves only the mid-fire additions; the snapshot is compacted
//!   (O(n)) only if something was removed during the borrow.
//! - Idle removal swaps the last entry into the hole; registry order is not
//!   insertion order after that.
//! - Buffers are reused across borrows: a registry that does not grow never
//!   allocates while firing.

use std::mem;

/// Two-state container of connection handles.
///
/// Both buffers hold `Option<T>` so they can trade places; `primary` never
/// contains `None`.
#[derive(Debug)]
pub(crate) struct BorrowRegistry<T> {
    /// Live entries when idle; entries added during the borrow when borrowed.
    primary: Vec<Option<T>>,
    /// Entries present at borrow start. Empty when idle.
    snapshot: Vec<Option<T>>,
    /// Number of `None` slots in `snapshot`.
    tombstones: usize,
    borrowed: bool,
}

impl<T> BorrowRegistry<T> {
    /// Creates an empty idle registry.
    pub(crate) fn new() -> Self {
        Self {
            primary: Vec::new(),
            snapshot: Vec::new(),
            tombstones: 0,
            borrowed: false,
        }
    }

    /// Creates an empty idle registry with room for `capacity` entries in both buffers.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            primary: Vec::with_capacity(capacity),
            snapshot: Vec::with_capacity(capacity),
            tombstones: 0,
            borrowed: false,
        }
    }

    #[inline]
    pub(crate) fn is_borrowed(&self) -> bool {
        self.borrowed
    }

    /// Number of live entries (snapshot survivors plus mid-borrow additions).
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.snapshot.len() - self.tombstones + self.primary.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live view in registry order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.snapshot
            .iter()
            .chain(self.primary.iter())
            .flatten()
    }

    /// Appends an entry.
    ///
    /// While borrowed the entry is deferred: it is not visible through
    /// [`snapshot_at`](Self::snapshot_at) until the borrow ends.
    pub(crate) fn insert(&mut self, item: T) {
        self.primary.push(Some(item));
    }

    /// Starts a borrow. Returns `false` if a borrow is already active.
    #[must_use]
    pub(crate) fn begin_borrow(&mut self) -> bool {
        if self.borrowed {
            return false;
        }
        debug_assert!(self.snapshot.is_empty());
        mem::swap(&mut self.primary, &mut self.snapshot);
        self.tombstones = 0;
        self.borrowed = true;
        true
    }

    /// Reads snapshot slot `index`.
    ///
    /// `None` past the end, `Some(None)` for a removed entry.
    #[inline]
    pub(crate) fn snapshot_at(&self, index: usize) -> Option<Option<&T>> {
        self.snapshot.get(index).map(Option::as_ref)
    }

    /// Ends the borrow and reconciles both buffers into the primary sequence.
    pub(crate) fn end_borrow(&mut self) {
        debug_assert!(self.borrowed, "end_borrow without an active borrow");
        if self.tombstones > 0 {
            self.snapshot.retain(Option::is_some);
        }
        self.snapshot.append(&mut self.primary);
        mem::swap(&mut self.primary, &mut self.snapshot);
        self.tombstones = 0;
        self.borrowed = false;
    }

    /// Removes and returns every entry matching `pred`, keeping the order of the rest.
    pub(crate) fn take_matching(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut taken = Vec::new();
        for slot in &mut self.snapshot {
            if slot.as_ref().is_some_and(&mut pred) {
                taken.extend(slot.take());
                self.tombstones += 1;
            }
        }
        let before = taken.len();
        for slot in &mut self.primary {
            if slot.as_ref().is_some_and(&mut pred) {
                taken.extend(slot.take());
            }
        }
        if taken.len() > before {
            self.primary.retain(Option::is_some);
        }
        taken
    }

    /// Removes and returns the first entry (in registry order) matching `pred`.
    pub(crate) fn take_first(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        for slot in &mut self.snapshot {
            if slot.as_ref().is_some_and(&mut pred) {
                self.tombstones += 1;
                return slot.take();
            }
        }
        let index = self
            .primary
            .iter()
            .position(|slot| slot.as_ref().is_some_and(&mut pred))?;
        self.primary.remove(index)
    }

    /// Removes and returns every entry.
    pub(crate) fn take_all(&mut self) -> Vec<T> {
        let mut taken: Vec<T> = self.snapshot.iter_mut().filter_map(Option::take).collect();
        self.tombstones = self.snapshot.len();
        taken.extend(self.primary.drain(..).flatten());
        taken
    }
}

impl<T: PartialEq> BorrowRegistry<T> {
    /// Removes one occurrence of `item`. Returns `false` if it was not present.
    ///
    /// Idle: swap-with-last-and-pop. Borrowed: tombstone in the snapshot, or plain
    /// removal from the mid-borrow additions.
    pub(crate) fn remove(&mut self, item: &T) -> bool {
        if self.borrowed {
            if let Some(slot) = self
                .snapshot
                .iter_mut()
                .find(|slot| slot.as_ref() == Some(item))
            {
                *slot = None;
                self.tombstones += 1;
                return true;
            }
        }
        let Some(index) = self
            .primary
            .iter()
            .position(|slot| slot.as_ref() == Some(item))
        else {
            return false;
        };
        if self.borrowed {
            self.primary.remove(index);
        } else {
            self.primary.swap_remove(index);
        }
        true
    }

    #[inline]
    pub(crate) fn contains(&self, item: &T) -> bool {
        self.iter().any(|x| x == item)
    }
}

impl<T> Drop for BorrowRegistry<T> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(!self.borrowed, "registry dropped while borrowed");
        }
    }
}
