use std::any::type_name;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Identity of an instance within the pool that created it.
///
/// Identities are never reused by a pool, so an identity observed once always refers to the same
/// physical instance, even after that instance has been destroyed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identity value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to an instance managed by a pool.
///
/// A pool hands out a `Pooled<T>` on every get and takes it back on release or destroy. The pool
/// keeps its own handle to the same instance for bookkeeping, so checking an instance out
/// transfers use of it to the caller without transferring exclusive ownership.
///
/// Handles can be cloned freely; all clones refer to the same instance and compare equal.
///
/// # Borrowing
///
/// The instance is accessed through [`borrow()`][Self::borrow] and
/// [`borrow_mut()`][Self::borrow_mut]. Borrows must be dropped before the instance is handed back
/// to the pool, because the pool borrows the instance mutably to run its lifecycle hooks.
///
/// # Thread safety
///
/// This type is single-threaded and is neither [`Send`] nor [`Sync`].
///
/// # Example
///
/// ```rust
/// use recycle_pool::{PlainStrategy, PoolCore, PoolDatum, Poolable};
///
/// #[derive(Default)]
/// struct Counter {
///     hits: u32,
/// }
///
/// impl Poolable for Counter {
///     fn on_created(&mut self) {}
///     fn on_get(&mut self) {}
///     fn on_release(&mut self) {
///         self.hits = 0;
///     }
///     fn on_destroyed(&mut self) {}
/// }
///
/// let mut pool: PoolCore<Counter, _> =
///     PoolCore::new(&PoolDatum::plain("counter"), PlainStrategy::new());
///
/// let counter = pool.get();
/// counter.borrow_mut().hits += 1;
/// assert_eq!(counter.borrow().hits, 1);
///
/// pool.release(counter);
/// ```
pub struct Pooled<T> {
    pool_id: u64,
    id: ObjectId,
    value: Rc<RefCell<T>>,
}

impl<T> Pooled<T> {
    pub(crate) fn new(pool_id: u64, id: ObjectId, value: T) -> Self {
        Self {
            pool_id,
            id,
            value: Rc::new(RefCell::new(value)),
        }
    }

    /// The identity of the instance within its pool.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Immutably borrows the instance.
    ///
    /// # Panics
    ///
    /// Panics if the instance is currently mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Mutably borrows the instance.
    ///
    /// # Panics
    ///
    /// Panics if the instance is currently borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.value.borrow_mut()
    }
}

impl<T> Clone for Pooled<T> {
    fn clone(&self) -> Self {
        Self {
            pool_id: self.pool_id,
            id: self.id,
            value: Rc::clone(&self.value),
        }
    }
}

impl<T> PartialEq for Pooled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.pool_id == other.pool_id && self.id == other.id
    }
}

impl<T> Eq for Pooled<T> {}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl<T> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("item_type", &type_name::<T>())
            .field("pool_id", &self.pool_id)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_not_impl_any;

    use super::*;

    assert_not_impl_any!(Pooled<u32>: Send, Sync);

    #[test]
    fn clones_share_the_instance() {
        let original = Pooled::new(1, ObjectId::new(3), 10_u32);
        let clone = original.clone();

        *clone.borrow_mut() += 5;

        assert_eq!(*original.borrow(), 15);
        assert_eq!(original, clone);
        assert_eq!(clone.id().get(), 3);
    }

    #[test]
    fn equality_is_by_identity_not_value() {
        let a = Pooled::new(1, ObjectId::new(0), 7_u32);
        let b = Pooled::new(1, ObjectId::new(1), 7_u32);
        let other_pool = Pooled::new(2, ObjectId::new(0), 7_u32);

        assert_ne!(a, b);
        assert_ne!(a, other_pool);
    }
}
