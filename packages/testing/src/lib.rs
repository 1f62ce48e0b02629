#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and benchmarking `recycle_pool`.
//!
//! Pooled fixture types are constructed by the pools themselves, so they cannot be handed a
//! journal from the outside. Instead they reach for [`Journal::thread()`], which is shared by
//! everything on the current thread. The test harness runs every test on its own thread, so
//! each test observes only its own lifecycle events.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// One of the four lifecycle hooks of a pooled object.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Hook {
    /// The object was constructed.
    Created,

    /// The object was handed out by its pool.
    Get,

    /// The object was returned to its pool.
    Release,

    /// The object was torn down.
    Destroyed,
}

/// A single recorded lifecycle event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Entry {
    /// Which kind of object the event happened to.
    pub subject: &'static str,

    /// Which hook ran.
    pub hook: Hook,
}

thread_local! {
    static THREAD_JOURNAL: Journal = Journal::new();
    static NEXT_SERIAL: Cell<u64> = const { Cell::new(0) };
}

/// An append-only record of lifecycle events.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust
/// use testing::{Hook, Journal};
///
/// let journal = Journal::new();
/// journal.record("bullet", Hook::Created);
/// journal.record("bullet", Hook::Get);
///
/// assert_eq!(journal.hooks(), vec![Hook::Created, Hook::Get]);
/// assert_eq!(journal.count(Hook::Get), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<Entry>>>,
}

impl Journal {
    /// Creates an empty journal that is not shared with anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The journal shared by everything running on the current thread.
    #[must_use]
    pub fn thread() -> Self {
        THREAD_JOURNAL.with(Clone::clone)
    }

    /// Appends an event.
    pub fn record(&self, subject: &'static str, hook: Hook) {
        self.entries.borrow_mut().push(Entry { subject, hook });
    }

    /// All recorded events, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.borrow().clone()
    }

    /// The hooks of all recorded events, oldest first.
    #[must_use]
    pub fn hooks(&self) -> Vec<Hook> {
        self.entries.borrow().iter().map(|e| e.hook).collect()
    }

    /// How many times `hook` was recorded.
    #[must_use]
    pub fn count(&self, hook: Hook) -> usize {
        self.entries.borrow().iter().filter(|e| e.hook == hook).count()
    }

    /// How many times `hook` was recorded for `subject`.
    #[must_use]
    pub fn count_for(&self, subject: &str, hook: Hook) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.subject == subject && e.hook == hook)
            .count()
    }
}

/// Returns a number unique among all calls on the current thread.
///
/// Fixtures use this to tell their instances apart in assertions.
#[must_use]
pub fn next_serial() -> u64 {
    NEXT_SERIAL.with(|serial| {
        let value = serial.get();
        serial.set(value.wrapping_add(1));
        value
    })
}
