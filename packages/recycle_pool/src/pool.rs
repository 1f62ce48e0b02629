use std::any::type_name;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use foldhash::{HashMap, HashMapExt, HashSet, HashSetExt};
use tracing::{debug, trace, warn};

use crate::{LifecycleStrategy, ObjectId, PoolDatum, Pooled};

// Every pool gets a distinct id so handles from one pool are never mistaken for another's.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Point-in-time counters describing a pool.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct PoolStats {
    /// Instances constructed over the lifetime of the pool.
    pub created: u64,

    /// Instances torn down over the lifetime of the pool.
    pub destroyed: u64,

    /// Instances currently checked out to callers.
    pub active: usize,

    /// Instances currently held by the pool, ready for reuse.
    pub released: usize,
}

/// A pool of reusable instances of one type.
///
/// The pool tracks every instance it created as either *active* (checked out to a caller),
/// *released* (held by the pool, ready for reuse) or untracked (destroyed, or dropped from
/// tracking by [`destroy_all()`][Self::destroy_all]). An instance is never in more than one of
/// these states.
///
/// How instances are built and what happens as they change hands is delegated to a
/// [`LifecycleStrategy`], for example [`PlainStrategy`][crate::PlainStrategy] or
/// [`SceneStrategy`][crate::SceneStrategy].
///
/// # Storage
///
/// Released instances are kept in a last-in-first-out free list, so the most recently released
/// instance is the next one handed out. The free list holds at most `maximum_size` instances; an
/// instance released into a full free list is destroyed instead of kept. When the free list is
/// empty, [`get()`][Self::get] constructs a new instance regardless of how many are checked out.
///
/// # Release and destroy contract
///
/// * Releasing an instance that is already released does nothing.
/// * Releasing an instance this pool does not track (it was destroyed, dropped from tracking or
///   belongs to a different pool) does nothing apart from logging a warning. Such an instance is
///   never brought back into circulation.
/// * Destroying an instance always runs the destroy behavior, even if the pool does not track
///   the instance.
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
/// struct Buffer {
///     bytes: Vec<u8>,
/// }
///
/// impl Poolable for Buffer {
///     fn on_created(&mut self) {
///         self.bytes.reserve(1024);
///     }
///     fn on_get(&mut self) {}
///     fn on_release(&mut self) {
///         self.bytes.clear();
///     }
///     fn on_destroyed(&mut self) {}
/// }
///
/// let datum = PoolDatum::plain("buffer").with_initial_size(2);
/// let mut pool: PoolCore<Buffer, _> = PoolCore::new(&datum, PlainStrategy::new());
///
/// // Two instances were created up front and are waiting in the pool.
/// assert_eq!(pool.released_len(), 2);
///
/// let buffer = pool.get();
/// buffer.borrow_mut().bytes.extend_from_slice(b"hello");
/// assert_eq!(pool.active_len(), 1);
///
/// pool.release(buffer);
/// assert_eq!(pool.active_len(), 0);
/// assert_eq!(pool.stats().created, 2);
/// ```
pub struct PoolCore<T, S> {
    pool_id: u64,

    strategy: S,

    /// Released instances, most recently released last.
    free: Vec<Pooled<T>>,

    /// Checked-out instances. We keep our own handle so `release_all()` can reach them.
    active: HashMap<ObjectId, Pooled<T>>,

    /// Identities of the instances in `free`, for constant-time membership checks.
    released: HashSet<ObjectId>,

    maximum_size: usize,

    next_object_id: u64,
    created: u64,
    destroyed: u64,
}

impl<T, S> PoolCore<T, S>
where
    S: LifecycleStrategy<T>,
{
    /// Creates a pool sized according to `datum` and pre-warms it with `initial_size`
    /// instances.
    ///
    /// Pre-warming takes every instance out through [`get()`][Self::get] and puts it back through
    /// [`release()`][Self::release], so warmed instances have gone through exactly the same
    /// lifecycle as instances created on demand.
    pub fn new(datum: &PoolDatum, strategy: S) -> Self {
        let mut pool = Self {
            pool_id: generate_pool_id(),
            strategy,
            free: Vec::with_capacity(datum.default_capacity()),
            active: HashMap::new(),
            released: HashSet::with_capacity(datum.default_capacity()),
            maximum_size: datum.maximum_size(),
            next_object_id: 0,
            created: 0,
            destroyed: 0,
        };

        pool.prewarm(datum.initial_size());
        pool
    }

    fn prewarm(&mut self, count: usize) {
        let warmed = (0..count).map(|_| self.get()).collect::<Vec<_>>();

        for item in warmed {
            self.release(item);
        }

        debug!(
            item_type = type_name::<T>(),
            count,
            released = self.released.len(),
            "pool pre-warmed"
        );
    }

    /// Takes an instance out of the pool, constructing a new one if none is available.
    pub fn get(&mut self) -> Pooled<T> {
        let item = match self.free.pop() {
            Some(item) => item,
            None => self.create(),
        };

        self.strategy.on_get(&mut item.borrow_mut());

        // Mutually exclusive with `active` already; removing keeps that true no matter what.
        self.released.remove(&item.id());
        self.active.insert(item.id(), item.clone());

        trace!(item_type = type_name::<T>(), id = %item.id(), "instance taken");

        item
    }

    fn create(&mut self) -> Pooled<T> {
        let value = self.strategy.create();

        let id = ObjectId::new(self.next_object_id);
        self.next_object_id = self
            .next_object_id
            .checked_add(1)
            .expect("object id overflow would require more instances than memory can hold");
        self.created = self.created.saturating_add(1);

        trace!(item_type = type_name::<T>(), %id, "instance created");

        Pooled::new(self.pool_id, id, value)
    }

    /// Returns an instance to the pool.
    ///
    /// Releasing an instance that is already released does nothing. Releasing an instance this
    /// pool does not track is logged and otherwise ignored.
    ///
    /// # Panics
    ///
    /// Panics if the instance is borrowed through another handle while its hooks run.
    pub fn release(&mut self, item: Pooled<T>) {
        let id = item.id();

        if item.pool_id() == self.pool_id && self.released.contains(&id) {
            return;
        }

        if item.pool_id() != self.pool_id || self.active.remove(&id).is_none() {
            warn!(
                item_type = type_name::<T>(),
                %id,
                "ignoring release of an instance this pool does not track"
            );
            return;
        }

        self.strategy.on_release(&mut item.borrow_mut());

        if self.free.len() >= self.maximum_size {
            self.strategy.on_destroy(&mut item.borrow_mut());
            self.destroyed = self.destroyed.saturating_add(1);

            debug!(
                item_type = type_name::<T>(),
                %id,
                maximum_size = self.maximum_size,
                "pool full, released instance destroyed"
            );
            return;
        }

        self.free.push(item);
        self.released.insert(id);

        trace!(item_type = type_name::<T>(), %id, "instance released");
    }

    /// Permanently removes an instance from the pool and runs its destroy behavior.
    ///
    /// The instance is no longer tracked afterwards and must not be released or destroyed again.
    /// The destroy behavior runs even if the pool does not track the instance.
    ///
    /// # Panics
    ///
    /// Panics if the instance is borrowed through another handle while its hooks run.
    pub fn destroy(&mut self, item: Pooled<T>) {
        let id = item.id();

        if item.pool_id() == self.pool_id {
            self.active.remove(&id);

            if self.released.remove(&id) {
                self.free.retain(|pooled| pooled.id() != id);
            }
        }

        self.strategy.on_destroy(&mut item.borrow_mut());
        self.destroyed = self.destroyed.saturating_add(1);

        trace!(item_type = type_name::<T>(), %id, "instance destroyed");
    }

    /// Releases every instance that is currently checked out.
    pub fn release_all(&mut self) {
        // Snapshot first: releasing mutates `active`.
        let snapshot = self.active.values().cloned().collect::<Vec<_>>();
        let count = snapshot.len();

        for item in snapshot {
            self.release(item);
        }

        debug!(item_type = type_name::<T>(), count, "released all instances");
    }

    /// Stops tracking every instance and destroys all instances held by the pool.
    ///
    /// Checked-out instances are not destroyed but are no longer tracked, so releasing them later
    /// does nothing. Subsequent [`get()`][Self::get] calls construct new instances.
    pub fn destroy_all(&mut self) {
        let abandoned = self.active.len();

        self.active.clear();
        self.released.clear();

        let pooled = mem::take(&mut self.free);
        let count = pooled.len();

        for item in pooled {
            self.strategy.on_destroy(&mut item.borrow_mut());
            self.destroyed = self.destroyed.saturating_add(1);
        }

        debug!(
            item_type = type_name::<T>(),
            destroyed = count,
            abandoned,
            "destroyed all pooled instances"
        );
    }
}

impl<T, S> PoolCore<T, S> {
    /// Number of instances currently checked out.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of instances held by the pool, ready for reuse.
    #[must_use]
    pub fn released_len(&self) -> usize {
        self.released.len()
    }

    /// Whether the instance is currently checked out from this pool.
    #[must_use]
    pub fn is_active(&self, item: &Pooled<T>) -> bool {
        item.pool_id() == self.pool_id && self.active.contains_key(&item.id())
    }

    /// Whether the instance is currently held by this pool, ready for reuse.
    #[must_use]
    pub fn is_released(&self, item: &Pooled<T>) -> bool {
        item.pool_id() == self.pool_id && self.released.contains(&item.id())
    }

    /// The number of released instances the pool keeps before destroying returned ones.
    #[must_use]
    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    /// Current counters of the pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created,
            destroyed: self.destroyed,
            active: self.active.len(),
            released: self.released.len(),
        }
    }
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl<T, S> fmt::Debug for PoolCore<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolCore")
            .field("item_type", &type_name::<T>())
            .field("pool_id", &self.pool_id)
            .field("active", &self.active.len())
            .field("released", &self.released.len())
            .field("maximum_size", &self.maximum_size)
            .field("created", &self.created)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_not_impl_any;
    use testing::{Hook, Journal};

    use super::*;
    use crate::{PlainStrategy, Poolable};

    assert_not_impl_any!(PoolCore<Shell, PlainStrategy<Shell>>: Send, Sync);

    /// Records its hooks into the per-thread journal.
    struct Shell {
        journal: Journal,
    }

    impl Default for Shell {
        fn default() -> Self {
            Self {
                journal: Journal::thread(),
            }
        }
    }

    impl Poolable for Shell {
        fn on_created(&mut self) {
            self.journal.record("shell", Hook::Created);
        }

        fn on_get(&mut self) {
            self.journal.record("shell", Hook::Get);
        }

        fn on_release(&mut self) {
            self.journal.record("shell", Hook::Release);
        }

        fn on_destroyed(&mut self) {
            self.journal.record("shell", Hook::Destroyed);
        }
    }

    type ShellPool = PoolCore<Shell, PlainStrategy<Shell>>;

    fn shell_pool(initial_size: usize, default_capacity: usize, maximum_size: usize) -> ShellPool {
        let datum = PoolDatum::plain("shell")
            .with_initial_size(initial_size)
            .with_default_capacity(default_capacity)
            .with_maximum_size(maximum_size);

        PoolCore::new(&datum, PlainStrategy::new())
    }

    fn assert_disjoint(pool: &ShellPool) {
        for id in pool.active.keys() {
            assert!(!pool.released.contains(id), "{id} is both active and released");
        }

        assert_eq!(pool.free.len(), pool.released.len());
    }

    #[test]
    fn prewarm_runs_the_full_get_release_cycle() {
        let pool = shell_pool(3, 5, 10);

        assert_eq!(pool.released_len(), 3);
        assert_eq!(pool.active_len(), 0);

        let journal = Journal::thread();
        assert_eq!(journal.count(Hook::Created), 3);
        assert_eq!(journal.count(Hook::Get), 3);
        assert_eq!(journal.count(Hook::Release), 3);
        assert_eq!(journal.count(Hook::Destroyed), 0);
    }

    #[test]
    fn get_reuses_prewarmed_before_constructing() {
        let mut pool = shell_pool(2, 5, 10);

        let first = pool.get();
        let second = pool.get();
        assert_eq!(pool.stats().created, 2);

        let third = pool.get();
        assert_eq!(pool.stats().created, 3);

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_disjoint(&pool);
    }

    #[test]
    fn get_prefers_most_recently_released() {
        let mut pool = shell_pool(0, 5, 10);

        let a = pool.get();
        let b = pool.get();

        pool.release(a.clone());
        pool.release(b.clone());

        assert_eq!(pool.get(), b);
        assert_eq!(pool.get(), a);
    }

    #[test]
    fn double_release_is_idempotent() {
        let mut pool = shell_pool(0, 5, 10);
        let item = pool.get();

        pool.release(item.clone());
        let after_one = pool.stats();

        pool.release(item.clone());
        assert_eq!(pool.stats(), after_one);
        assert!(pool.is_released(&item));
        assert_eq!(Journal::thread().count(Hook::Release), 1);
        assert_disjoint(&pool);
    }

    #[test]
    fn active_and_released_stay_disjoint() {
        let mut pool = shell_pool(2, 2, 3);
        let mut held = Vec::new();

        // Handles stay in `held` after bulk operations, so later steps also release and destroy
        // instances that are already released or no longer tracked.
        for round in 0..48_usize {
            match round % 8 {
                2 => {
                    if let Some(item) = held.pop() {
                        pool.release(item);
                    }
                }
                3 => {
                    if let Some(item) = held.pop() {
                        pool.destroy(item);
                    }
                }
                5 => pool.release_all(),
                6 => {
                    if let Some(item) = held.first().cloned() {
                        pool.release(item);
                    }
                }
                7 if round % 16 == 15 => pool.destroy_all(),
                _ => held.push(pool.get()),
            }

            assert_disjoint(&pool);
            assert!(pool.released_len() <= pool.maximum_size());
        }
    }

    #[test]
    fn release_into_full_pool_destroys() {
        let mut pool = shell_pool(0, 1, 1);

        let a = pool.get();
        let b = pool.get();

        pool.release(a.clone());
        pool.release(b.clone());

        assert!(pool.is_released(&a));
        assert!(!pool.is_released(&b));
        assert!(!pool.is_active(&b));
        assert_eq!(pool.stats().destroyed, 1);
        assert_eq!(Journal::thread().count(Hook::Destroyed), 1);

        // The evicted instance is untracked now, releasing it again changes nothing.
        pool.release(b);
        assert_eq!(pool.released_len(), 1);
    }

    #[test]
    fn prewarm_beyond_maximum_destroys_excess() {
        let pool = shell_pool(5, 5, 2);

        assert_eq!(pool.released_len(), 2);
        assert_eq!(pool.stats().created, 5);
        assert_eq!(pool.stats().destroyed, 3);
    }

    #[test]
    fn destroy_active_instance() {
        let mut pool = shell_pool(0, 5, 10);
        let item = pool.get();

        pool.destroy(item.clone());

        assert!(!pool.is_active(&item));
        assert!(!pool.is_released(&item));
        assert_eq!(Journal::thread().count(Hook::Destroyed), 1);
    }

    #[test]
    fn destroyed_released_instance_is_never_handed_out() {
        let mut pool = shell_pool(1, 5, 10);

        let item = pool.get();
        pool.release(item.clone());
        pool.destroy(item.clone());

        assert_eq!(pool.released_len(), 0);

        let replacement = pool.get();
        assert_ne!(replacement, item);
        assert_eq!(pool.stats().created, 2);
        assert_disjoint(&pool);
    }

    #[test]
    fn destroy_untracked_still_runs_hook() {
        let mut pool = shell_pool(0, 5, 10);
        let mut other = shell_pool(0, 5, 10);

        let foreign = other.get();
        pool.destroy(foreign);

        assert_eq!(pool.stats().destroyed, 1);
        assert_eq!(Journal::thread().count(Hook::Destroyed), 1);
        // The owning pool still believes the instance is checked out.
        assert_eq!(other.active_len(), 1);
    }

    #[test]
    fn release_of_foreign_instance_is_ignored() {
        let mut pool = shell_pool(0, 5, 10);
        let mut other = shell_pool(0, 5, 10);

        let foreign = other.get();
        pool.release(foreign.clone());

        assert_eq!(pool.released_len(), 0);
        assert!(other.is_active(&foreign));
        assert_eq!(Journal::thread().count(Hook::Release), 0);
    }

    #[test]
    fn release_after_destroy_is_ignored() {
        let mut pool = shell_pool(0, 5, 10);
        let item = pool.get();

        pool.destroy(item.clone());
        pool.release(item);

        assert_eq!(pool.released_len(), 0);
        assert_eq!(Journal::thread().count(Hook::Release), 0);
    }

    #[test]
    fn release_all_moves_every_active_instance() {
        let mut pool = shell_pool(0, 5, 10);
        let items = (0..4).map(|_| pool.get()).collect::<Vec<_>>();

        // One of them was already returned.
        pool.release(items[0].clone());

        pool.release_all();

        assert_eq!(pool.active_len(), 0);
        assert_eq!(pool.released_len(), 4);
        assert_eq!(Journal::thread().count(Hook::Release), 4);
        assert!(items.iter().all(|item| pool.is_released(item)));
    }

    #[test]
    fn release_all_on_empty_pool_is_noop() {
        let mut pool = shell_pool(2, 5, 10);

        pool.release_all();

        assert_eq!(pool.active_len(), 0);
        assert_eq!(pool.released_len(), 2);
    }

    #[test]
    fn destroy_all_then_get_constructs_fresh() {
        let mut pool = shell_pool(2, 5, 10);
        let held = pool.get();
        let before = [held.clone(), pool.get()];
        pool.release(before[1].clone());

        pool.destroy_all();

        assert_eq!(pool.active_len(), 0);
        assert_eq!(pool.released_len(), 0);
        // Only the pooled instance was destroyed; the checked-out one was abandoned.
        assert_eq!(Journal::thread().count(Hook::Destroyed), 1);

        let fresh = pool.get();
        assert!(!before.contains(&fresh));

        // The abandoned instance can no longer be returned.
        pool.release(held);
        assert_eq!(pool.released_len(), 0);
    }
}
