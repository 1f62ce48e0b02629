//! Free functions over a [`PoolContext`] owned by the current thread.
//!
//! Applications that want one pool context reachable from anywhere, without passing it around,
//! can use these functions instead of owning a [`PoolContext`] themselves. Each thread has its
//! own context, initialized independently; instances taken on one thread cannot be returned on
//! another.
//!
//! # Re-entrancy
//!
//! Lifecycle hooks may call back into this module. A hook of one type can take, return and clear
//! instances of any other type, as described on [`PoolRegistry`][crate::PoolRegistry]. Reaching
//! for the pool whose hook is running fails with [`Error::PoolInUse`][crate::Error::PoolInUse].
//! Hooks that run inside [`initialize()`] or [`shutdown()`] see the context as a whole being busy
//! and fail with [`Error::ContextInUse`][crate::Error::ContextInUse].
//!
//! # Example
//!
//! ```
//! use recycle_pool::{PoolConfig, PoolDatum, PoolRegistry, Poolable, facade};
//!
//! #[derive(Default)]
//! struct Particle;
//!
//! impl Poolable for Particle {
//!     fn on_created(&mut self) {}
//!     fn on_get(&mut self) {}
//!     fn on_release(&mut self) {}
//!     fn on_destroyed(&mut self) {}
//! }
//!
//! let builder = PoolRegistry::builder().register_plain::<Particle>("particle");
//! let config = PoolConfig::new(vec![PoolDatum::plain("particle").with_initial_size(8)]);
//! facade::initialize(&builder, &config).unwrap();
//!
//! let particle = facade::get_plain::<Particle>().unwrap();
//! facade::release_plain(particle).unwrap();
//!
//! facade::shutdown().unwrap();
//! ```

use std::cell::RefCell;

use crate::{
    Error, PoolConfig, PoolContext, PoolRegistryBuilder, PoolStats, Poolable, Pooled, Result,
    ScenePoolable,
};

thread_local! {
    static CONTEXT: RefCell<PoolContext> = const { RefCell::new(PoolContext::new()) };
}

/// Pool operations only need the context shared; each pool guards itself.
fn with_context<R>(f: impl FnOnce(&PoolContext) -> Result<R>) -> Result<R> {
    CONTEXT.with(|context| {
        let context = context.try_borrow().map_err(|_busy| Error::ContextInUse)?;
        f(&context)
    })
}

/// Initialization and shutdown replace the registry, so they need the context exclusively.
fn with_context_mut<R>(f: impl FnOnce(&mut PoolContext) -> Result<R>) -> Result<R> {
    CONTEXT.with(|context| {
        let mut context = context
            .try_borrow_mut()
            .map_err(|_busy| Error::ContextInUse)?;
        f(&mut context)
    })
}

/// Initializes the current thread's context. See [`PoolContext::initialize()`].
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] if the current thread's context has already been
/// initialized and [`Error::ContextInUse`] if called from a lifecycle hook.
pub fn initialize(builder: &PoolRegistryBuilder, config: &PoolConfig) -> Result<()> {
    with_context_mut(|context| context.initialize(builder, config))
}

/// Whether the current thread's context is initialized.
///
/// Returns `false` while the context is being initialized or shut down.
#[must_use]
pub fn is_initialized() -> bool {
    CONTEXT.with(|context| context.try_borrow().is_ok_and(|context| context.is_initialized()))
}

/// Tears down the current thread's context. See [`PoolContext::shutdown()`].
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] if the current thread's context is not initialized and
/// [`Error::ContextInUse`] if called from a lifecycle hook while the context is being
/// initialized or shut down.
pub fn shutdown() -> Result<()> {
    with_context_mut(PoolContext::shutdown)
}

/// See [`PoolContext::get_plain()`].
///
/// # Errors
///
/// See [`PoolContext::get_plain()`].
pub fn get_plain<T>() -> Result<Pooled<T>>
where
    T: Poolable + Default,
{
    with_context(PoolContext::get_plain)
}

/// See [`PoolContext::get_scene()`].
///
/// # Errors
///
/// See [`PoolContext::get_scene()`].
pub fn get_scene<T>() -> Result<Pooled<T>>
where
    T: ScenePoolable,
{
    with_context(PoolContext::get_scene)
}

/// See [`PoolContext::release_plain()`].
///
/// # Errors
///
/// See [`PoolContext::release_plain()`].
pub fn release_plain<T>(item: Pooled<T>) -> Result<()>
where
    T: Poolable + Default,
{
    with_context(|context| context.release_plain(item))
}

/// See [`PoolContext::release_scene()`].
///
/// # Errors
///
/// See [`PoolContext::release_scene()`].
pub fn release_scene<T>(item: Pooled<T>) -> Result<()>
where
    T: ScenePoolable,
{
    with_context(|context| context.release_scene(item))
}

/// See [`PoolContext::destroy_plain()`].
///
/// # Errors
///
/// See [`PoolContext::destroy_plain()`].
pub fn destroy_plain<T>(item: Pooled<T>) -> Result<()>
where
    T: Poolable + Default,
{
    with_context(|context| context.destroy_plain(item))
}

/// See [`PoolContext::destroy_scene()`].
///
/// # Errors
///
/// See [`PoolContext::destroy_scene()`].
pub fn destroy_scene<T>(item: Pooled<T>) -> Result<()>
where
    T: ScenePoolable,
{
    with_context(|context| context.destroy_scene(item))
}

/// See [`PoolContext::release_all_plain()`].
///
/// # Errors
///
/// See [`PoolContext::release_all_plain()`].
pub fn release_all_plain<T>() -> Result<()>
where
    T: Poolable + Default,
{
    with_context(PoolContext::release_all_plain::<T>)
}

/// See [`PoolContext::release_all_scene()`].
///
/// # Errors
///
/// See [`PoolContext::release_all_scene()`].
pub fn release_all_scene<T>() -> Result<()>
where
    T: ScenePoolable,
{
    with_context(PoolContext::release_all_scene::<T>)
}

/// See [`PoolContext::destroy_all_plain()`].
///
/// # Errors
///
/// See [`PoolContext::destroy_all_plain()`].
pub fn destroy_all_plain<T>() -> Result<()>
where
    T: Poolable + Default,
{
    with_context(PoolContext::destroy_all_plain::<T>)
}

/// See [`PoolContext::destroy_all_scene()`].
///
/// # Errors
///
/// See [`PoolContext::destroy_all_scene()`].
pub fn destroy_all_scene<T>() -> Result<()>
where
    T: ScenePoolable,
{
    with_context(PoolContext::destroy_all_scene::<T>)
}

/// See [`PoolContext::release_all_pools()`].
///
/// # Errors
///
/// See [`PoolContext::release_all_pools()`].
pub fn release_all_pools() -> Result<()> {
    with_context(PoolContext::release_all_pools)
}

/// See [`PoolContext::destroy_all_pools()`].
///
/// # Errors
///
/// See [`PoolContext::destroy_all_pools()`].
pub fn destroy_all_pools() -> Result<()> {
    with_context(PoolContext::destroy_all_pools)
}

/// See [`PoolContext::stats_plain()`].
///
/// # Errors
///
/// See [`PoolContext::stats_plain()`].
pub fn stats_plain<T>() -> Result<PoolStats>
where
    T: Poolable + Default,
{
    with_context(PoolContext::stats_plain::<T>)
}

/// See [`PoolContext::stats_scene()`].
///
/// # Errors
///
/// See [`PoolContext::stats_scene()`].
pub fn stats_scene<T>() -> Result<PoolStats>
where
    T: ScenePoolable,
{
    with_context(PoolContext::stats_scene::<T>)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{Domain, PoolDatum, PoolRegistry};

    #[derive(Default)]
    struct Mote;

    impl Poolable for Mote {
        fn on_created(&mut self) {}
        fn on_get(&mut self) {}
        fn on_release(&mut self) {}
        fn on_destroyed(&mut self) {}
    }

    #[test]
    fn uninitialized_thread_reports_errors() {
        assert!(!is_initialized());
        assert!(matches!(get_plain::<Mote>(), Err(Error::NotInitialized)));
        assert!(matches!(release_all_pools(), Err(Error::NotInitialized)));
        assert!(matches!(shutdown(), Err(Error::NotInitialized)));
    }

    #[test]
    fn lifecycle_through_free_functions() {
        let builder = PoolRegistry::builder().register_plain::<Mote>("mote");
        let config = PoolConfig::new(vec![PoolDatum::plain("mote").with_initial_size(1)]);

        initialize(&builder, &config).unwrap();
        assert!(is_initialized());
        assert!(matches!(
            initialize(&builder, &config),
            Err(Error::AlreadyInitialized)
        ));

        let mote = get_plain::<Mote>().unwrap();
        assert_eq!(stats_plain::<Mote>().unwrap().active, 1);

        release_plain(mote).unwrap();
        assert_eq!(stats_plain::<Mote>().unwrap().released, 1);

        destroy_all_plain::<Mote>().unwrap();
        assert_eq!(stats_plain::<Mote>().unwrap().released, 0);

        shutdown().unwrap();
        assert!(!is_initialized());
    }

    /// Reaches back into the facade from its own hooks and keeps every error it gets.
    #[derive(Default)]
    struct Echo {
        answers: Vec<Error>,
    }

    impl Poolable for Echo {
        fn on_created(&mut self) {}

        fn on_get(&mut self) {
            self.answers.extend(get_plain::<Self>().err());
        }

        fn on_release(&mut self) {}

        fn on_destroyed(&mut self) {
            self.answers.extend(shutdown().err());
        }
    }

    #[test]
    fn hooks_reaching_back_into_busy_state_get_errors() {
        let builder = PoolRegistry::builder().register_plain::<Echo>("echo");
        let config = PoolConfig::new(vec![PoolDatum::plain("echo").with_initial_size(1)]);

        // Pre-warming runs `on_get` while the context is still being initialized.
        initialize(&builder, &config).unwrap();

        let echo = get_plain::<Echo>().unwrap();
        assert_eq!(stats_plain::<Echo>().unwrap().active, 1);
        release_plain(echo.clone()).unwrap();

        shutdown().unwrap();
        assert!(!is_initialized());

        assert!(matches!(
            echo.borrow().answers.as_slice(),
            [
                Error::ContextInUse,
                Error::PoolInUse {
                    domain: Domain::Plain,
                    ..
                },
                Error::ContextInUse,
            ]
        ));
    }
}
