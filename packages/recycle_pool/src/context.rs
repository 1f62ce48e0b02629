use tracing::info;

use crate::{
    Error, PoolConfig, PoolRegistry, PoolRegistryBuilder, PoolStats, Poolable, Pooled, Result,
    ScenePoolable,
};

/// Owns the pool registry of an application and gates access to it behind one-time
/// initialization.
///
/// Every operation other than [`initialize()`][Self::initialize] fails with
/// [`Error::NotInitialized`] until the context has been initialized. Initializing twice fails
/// with [`Error::AlreadyInitialized`]; call [`shutdown()`][Self::shutdown] first to start over
/// with a new configuration.
///
/// Operations that return instances, or clear pools, behave as described on [`PoolRegistry`].
///
/// # Examples
///
/// ```
/// use recycle_pool::{Error, PoolConfig, PoolContext, PoolDatum, PoolRegistry, Poolable};
///
/// #[derive(Default)]
/// struct Spark;
///
/// impl Poolable for Spark {
///     fn on_created(&mut self) {}
///     fn on_get(&mut self) {}
///     fn on_release(&mut self) {}
///     fn on_destroyed(&mut self) {}
/// }
///
/// let mut context = PoolContext::new();
/// assert!(matches!(context.get_plain::<Spark>(), Err(Error::NotInitialized)));
///
/// let builder = PoolRegistry::builder().register_plain::<Spark>("spark");
/// let config = PoolConfig::new(vec![PoolDatum::plain("spark")]);
/// context.initialize(&builder, &config).unwrap();
///
/// let spark = context.get_plain::<Spark>().unwrap();
/// context.release_plain(spark).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct PoolContext {
    registry: Option<PoolRegistry>,
}

impl PoolContext {
    /// Creates a context that is not initialized yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { registry: None }
    }

    /// Builds the registry from `config` using the registrations in `builder`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if the context has already been initialized. The
    /// existing registry is left untouched.
    pub fn initialize(&mut self, builder: &PoolRegistryBuilder, config: &PoolConfig) -> Result<()> {
        if self.registry.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let registry = builder.build(config);
        info!(pools = registry.len(), "pool context initialized");

        self.registry = Some(registry);
        Ok(())
    }

    /// Whether [`initialize()`][Self::initialize] has completed and no shutdown has happened
    /// since.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.registry.is_some()
    }

    /// Destroys every pooled instance, removes the pool root from the scene graph and returns the
    /// context to the uninitialized state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized.
    pub fn shutdown(&mut self) -> Result<()> {
        let registry = self.registry.take().ok_or(Error::NotInitialized)?;
        registry.teardown();

        info!("pool context shut down");
        Ok(())
    }

    /// The registry, for operations not exposed on the context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized.
    pub fn registry(&self) -> Result<&PoolRegistry> {
        self.registry.as_ref().ok_or(Error::NotInitialized)
    }

    /// Takes an instance out of the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized. Otherwise fails as
    /// [`PoolRegistry::get_plain()`] does.
    pub fn get_plain<T>(&self) -> Result<Pooled<T>>
    where
        T: Poolable + Default,
    {
        self.registry()?.get_plain()
    }

    /// Takes an instance out of the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized. Otherwise fails as
    /// [`PoolRegistry::get_scene()`] does.
    pub fn get_scene<T>(&self) -> Result<Pooled<T>>
    where
        T: ScenePoolable,
    {
        self.registry()?.get_scene()
    }

    /// Returns an instance to the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn release_plain<T>(&self, item: Pooled<T>) -> Result<()>
    where
        T: Poolable + Default,
    {
        self.registry()?.release_plain(item)
    }

    /// Returns an instance to the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn release_scene<T>(&self, item: Pooled<T>) -> Result<()>
    where
        T: ScenePoolable,
    {
        self.registry()?.release_scene(item)
    }

    /// Permanently destroys an instance of the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn destroy_plain<T>(&self, item: Pooled<T>) -> Result<()>
    where
        T: Poolable + Default,
    {
        self.registry()?.destroy_plain(item)
    }

    /// Permanently destroys an instance of the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn destroy_scene<T>(&self, item: Pooled<T>) -> Result<()>
    where
        T: ScenePoolable,
    {
        self.registry()?.destroy_scene(item)
    }

    /// Releases every checked-out instance of the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn release_all_plain<T>(&self) -> Result<()>
    where
        T: Poolable + Default,
    {
        self.registry()?.release_all_plain::<T>()
    }

    /// Releases every checked-out instance of the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn release_all_scene<T>(&self) -> Result<()>
    where
        T: ScenePoolable,
    {
        self.registry()?.release_all_scene::<T>()
    }

    /// Destroys every instance held by the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn destroy_all_plain<T>(&self) -> Result<()>
    where
        T: Poolable + Default,
    {
        self.registry()?.destroy_all_plain::<T>()
    }

    /// Destroys every instance held by the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn destroy_all_scene<T>(&self) -> Result<()>
    where
        T: ScenePoolable,
    {
        self.registry()?.destroy_all_scene::<T>()
    }

    /// Releases every checked-out instance of every pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized. Otherwise fails as
    /// [`PoolRegistry::release_all_pools()`] does.
    pub fn release_all_pools(&self) -> Result<()> {
        self.registry()?.release_all_pools()
    }

    /// Destroys every instance held by every pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized. Otherwise fails as
    /// [`PoolRegistry::destroy_all_pools()`] does.
    pub fn destroy_all_pools(&self) -> Result<()> {
        self.registry()?.destroy_all_pools()
    }

    /// Counters of the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized. Otherwise fails as
    /// [`PoolRegistry::stats_plain()`] does.
    pub fn stats_plain<T>(&self) -> Result<PoolStats>
    where
        T: Poolable + Default,
    {
        self.registry()?.stats_plain::<T>()
    }

    /// Counters of the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the context is not initialized. Otherwise fails as
    /// [`PoolRegistry::stats_scene()`] does.
    pub fn stats_scene<T>(&self) -> Result<PoolStats>
    where
        T: ScenePoolable,
    {
        self.registry()?.stats_scene::<T>()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_not_impl_any;
    use testing::{Hook, Journal};

    use super::*;
    use crate::PoolDatum;

    assert_not_impl_any!(PoolContext: Send, Sync);

    struct Ember {
        journal: Journal,
    }

    impl Default for Ember {
        fn default() -> Self {
            Self {
                journal: Journal::thread(),
            }
        }
    }

    impl Poolable for Ember {
        fn on_created(&mut self) {
            self.journal.record("ember", Hook::Created);
        }

        fn on_get(&mut self) {}

        fn on_release(&mut self) {}

        fn on_destroyed(&mut self) {
            self.journal.record("ember", Hook::Destroyed);
        }
    }

    fn builder() -> PoolRegistryBuilder {
        PoolRegistry::builder().register_plain::<Ember>("ember")
    }

    fn config() -> PoolConfig {
        PoolConfig::new(vec![PoolDatum::plain("ember").with_initial_size(2)])
    }

    #[test]
    fn every_operation_requires_initialization() {
        let mut context = PoolContext::new();

        assert!(!context.is_initialized());
        assert!(matches!(
            context.get_plain::<Ember>(),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            context.release_all_pools(),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            context.destroy_all_plain::<Ember>(),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            context.stats_plain::<Ember>(),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(context.shutdown(), Err(Error::NotInitialized)));
        assert!(context.registry().is_err());
    }

    #[test]
    fn second_initialize_fails_and_keeps_registry() {
        let mut context = PoolContext::new();
        context.initialize(&builder(), &config()).unwrap();

        let result = context.initialize(&builder(), &PoolConfig::default());

        assert!(matches!(result, Err(Error::AlreadyInitialized)));
        assert!(context.registry().unwrap().contains_plain::<Ember>());
        assert_eq!(Journal::thread().count(Hook::Created), 2);
    }

    #[test]
    fn shutdown_destroys_and_allows_reinitialization() {
        let mut context = PoolContext::new();
        context.initialize(&builder(), &config()).unwrap();

        context.shutdown().unwrap();

        assert!(!context.is_initialized());
        assert_eq!(Journal::thread().count(Hook::Destroyed), 2);

        context.initialize(&builder(), &config()).unwrap();
        assert_eq!(context.stats_plain::<Ember>().unwrap().released, 2);
    }

    #[test]
    fn operations_delegate_to_registry() {
        let mut context = PoolContext::new();
        context.initialize(&builder(), &config()).unwrap();

        let a = context.get_plain::<Ember>().unwrap();
        let _b = context.get_plain::<Ember>().unwrap();
        context.release_plain(a).unwrap();

        let stats = context.stats_plain::<Ember>().unwrap();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.released, 1);

        context.release_all_plain::<Ember>().unwrap();
        assert_eq!(context.stats_plain::<Ember>().unwrap().released, 2);
    }
}
