use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};
use tracing::{debug, error, warn};

use crate::{
    Domain, Error, LifecycleStrategy, NodeHandle, PlainStrategy, PoolConfig, PoolCore, PoolDatum,
    PoolStats, Poolable, Pooled, Result, ScenePoolable, SceneStrategy, SharedSceneGraph,
    TemplateHandle,
};

/// Name of the scene graph root node that all scene pools parent their nodes under.
pub const POOL_ROOT_NAME: &str = "PoolParent";

/// Object-safe view of a [`PoolCore`] of any item type and strategy.
trait ErasedPool {
    fn stats(&self) -> PoolStats;
    fn release_all(&mut self);
    fn destroy_all(&mut self);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T, S> ErasedPool for PoolCore<T, S>
where
    T: 'static,
    S: LifecycleStrategy<T> + 'static,
{
    fn stats(&self) -> PoolStats {
        Self::stats(self)
    }

    fn release_all(&mut self) {
        Self::release_all(self);
    }

    fn destroy_all(&mut self) {
        Self::destroy_all(self);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One pool of the registry. Each pool is borrowed on its own, so the hooks of one pool can use
/// the pools of other types.
struct PoolSlot {
    item_type: &'static str,
    pool: RefCell<Box<dyn ErasedPool>>,
}

impl PoolSlot {
    fn new(item_type: &'static str, pool: Box<dyn ErasedPool>) -> Self {
        Self {
            item_type,
            pool: RefCell::new(pool),
        }
    }
}

type PlainFactory = fn(&PoolDatum) -> Box<dyn ErasedPool>;
type SceneFactory =
    fn(&PoolDatum, SharedSceneGraph, TemplateHandle, NodeHandle) -> Box<dyn ErasedPool>;

#[derive(Clone, Copy)]
enum Factory {
    Plain(PlainFactory),
    Scene(SceneFactory),
}

#[derive(Clone, Copy)]
struct Registration {
    type_id: TypeId,
    item_type: &'static str,
    factory: Factory,
}

fn build_plain<T>(datum: &PoolDatum) -> Box<dyn ErasedPool>
where
    T: Poolable + Default,
{
    Box::new(PoolCore::<T, PlainStrategy<T>>::new(
        datum,
        PlainStrategy::new(),
    ))
}

fn build_scene<T>(
    datum: &PoolDatum,
    scene: SharedSceneGraph,
    template: TemplateHandle,
    parent: NodeHandle,
) -> Box<dyn ErasedPool>
where
    T: ScenePoolable,
{
    Box::new(PoolCore::<T, SceneStrategy<T>>::new(
        datum,
        SceneStrategy::new(scene, template, parent),
    ))
}

/// Builder for creating an instance of [`PoolRegistry`].
///
/// Every poolable type is registered explicitly under the tag that configuration rows use as
/// their `type_name`, together with its domain. Building the registry then creates one pool per
/// configuration row whose tag is registered in the row's domain.
///
/// The builder is not consumed by [`build()`][Self::build], so the same registrations can be
/// used to build a registry again, for example after a shutdown.
///
/// # Examples
///
/// ```
/// use recycle_pool::{PoolConfig, PoolDatum, PoolRegistry, Poolable};
///
/// #[derive(Default)]
/// struct Bullet;
///
/// impl Poolable for Bullet {
///     fn on_created(&mut self) {}
///     fn on_get(&mut self) {}
///     fn on_release(&mut self) {}
///     fn on_destroyed(&mut self) {}
/// }
///
/// let config = PoolConfig::new(vec![PoolDatum::plain("bullet").with_initial_size(4)]);
///
/// let registry = PoolRegistry::builder()
///     .register_plain::<Bullet>("bullet")
///     .build(&config);
///
/// let bullet = registry.get_plain::<Bullet>().unwrap();
/// registry.release_plain(bullet).unwrap();
/// ```
#[derive(Clone, Default)]
#[must_use]
pub struct PoolRegistryBuilder {
    registrations: HashMap<(Domain, String), Registration>,
    scene: Option<SharedSceneGraph>,
}

impl PoolRegistryBuilder {
    /// Creates a builder with no registrations and no scene graph.
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            scene: None,
        }
    }

    /// Sets the scene graph that scene pools instantiate their nodes in.
    ///
    /// Without a scene graph, configuration rows for scene pools are skipped.
    pub fn scene_graph(mut self, scene: SharedSceneGraph) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Registers `T` as a plain type under `tag`, the `type_name` used by configuration rows.
    ///
    /// Registering another type under the same tag replaces the earlier registration.
    pub fn register_plain<T>(mut self, tag: impl Into<String>) -> Self
    where
        T: Poolable + Default,
    {
        self.registrations.insert(
            (Domain::Plain, tag.into()),
            Registration {
                type_id: TypeId::of::<T>(),
                item_type: type_name::<T>(),
                factory: Factory::Plain(build_plain::<T>),
            },
        );
        self
    }

    /// Registers `T` as a scene type under `tag`, the `type_name` used by configuration rows.
    ///
    /// Registering another type under the same tag replaces the earlier registration.
    pub fn register_scene<T>(mut self, tag: impl Into<String>) -> Self
    where
        T: ScenePoolable,
    {
        self.registrations.insert(
            (Domain::Scene, tag.into()),
            Registration {
                type_id: TypeId::of::<T>(),
                item_type: type_name::<T>(),
                factory: Factory::Scene(build_scene::<T>),
            },
        );
        self
    }

    /// Builds a registry with one pool per usable configuration row.
    ///
    /// Rows that cannot be turned into a pool are skipped with a warning: rows without a type
    /// name, rows whose type name is not registered in the row's domain, and scene rows without a
    /// template or without a scene graph to instantiate into. If two rows resolve to the same
    /// type in the same domain, the later row wins and the earlier pool is destroyed.
    ///
    /// The first scene pool causes a root node named [`POOL_ROOT_NAME`] to be created in the scene
    /// graph; every scene pool parents its nodes under that root.
    #[must_use]
    pub fn build(&self, config: &PoolConfig) -> PoolRegistry {
        let mut pools: HashMap<(Domain, TypeId), PoolSlot> = HashMap::with_capacity(config.len());
        let mut root: Option<NodeHandle> = None;

        for (row, datum) in config.pools().iter().enumerate() {
            let domain = datum.domain();

            let Some(tag) = datum.type_name() else {
                warn!(row, %domain, "skipping pool row without a type name");
                continue;
            };

            let Some(registration) = self.registrations.get(&(domain, tag.to_string())) else {
                warn!(row, %domain, tag, "skipping pool row for a type that is not registered");
                continue;
            };

            if datum.initial_size() > datum.default_capacity() {
                warn!(
                    row,
                    tag,
                    initial_size = datum.initial_size(),
                    default_capacity = datum.default_capacity(),
                    "pool row pre-warms more instances than its default capacity"
                );
            }

            let pool = match registration.factory {
                Factory::Plain(build) => build(datum),
                Factory::Scene(build) => {
                    let Some(template) = datum.template() else {
                        warn!(row, tag, "skipping scene pool row without a template");
                        continue;
                    };

                    let Some(scene) = &self.scene else {
                        warn!(row, tag, "skipping scene pool row, no scene graph was provided");
                        continue;
                    };

                    let parent = *root
                        .get_or_insert_with(|| scene.borrow_mut().create_root(POOL_ROOT_NAME));

                    build(datum, Rc::clone(scene), template.clone(), parent)
                }
            };

            debug!(row, %domain, tag, item_type = registration.item_type, "pool created");

            let slot = PoolSlot::new(registration.item_type, pool);

            if let Some(mut previous) = pools.insert((domain, registration.type_id), slot) {
                warn!(
                    row,
                    %domain,
                    item_type = registration.item_type,
                    "pool row replaces an earlier pool for the same type"
                );
                previous.pool.get_mut().destroy_all();
            }
        }

        debug!(pools = pools.len(), rows = config.len(), "pool registry initialized");

        PoolRegistry {
            pools,
            root,
            scene: root.and(self.scene.clone()),
        }
    }
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl fmt::Debug for PoolRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistryBuilder")
            .field(
                "registrations",
                &self
                    .registrations
                    .iter()
                    .map(|((domain, tag), r)| (*domain, tag.as_str(), r.item_type))
                    .collect::<Vec<_>>(),
            )
            .field("scene", &self.scene)
            .finish()
    }
}

/// One pool per configured type, looked up by the exact type requested.
///
/// Plain and scene pools live in separate domains: a type registered as plain is only reachable
/// through the `*_plain` methods and a scene type only through the `*_scene` methods.
///
/// Asking for an instance of a type that has no pool is an error. Returning instances to, or
/// clearing, a pool that does not exist is logged and otherwise ignored.
///
/// # Re-entrancy
///
/// Every pool is borrowed separately, and only for the duration of the operation on it. The
/// lifecycle hooks of one type may therefore take, return and clear instances of any other type
/// through the same registry. Using a pool from within one of its own hooks fails with
/// [`Error::PoolInUse`] instead.
///
/// # Thread safety
///
/// This type is single-threaded and is neither [`Send`] nor [`Sync`].
pub struct PoolRegistry {
    pools: HashMap<(Domain, TypeId), PoolSlot>,
    root: Option<NodeHandle>,

    /// Only kept when a root node was created, so the root can be torn down.
    scene: Option<SharedSceneGraph>,
}

impl PoolRegistry {
    /// Starts building a new [`PoolRegistry`].
    pub fn builder() -> PoolRegistryBuilder {
        PoolRegistryBuilder::new()
    }

    /// Number of pools in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether the registry has no pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// The scene graph node all scene pools parent their nodes under, if any scene pool exists.
    #[must_use]
    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    /// Whether a plain pool exists for `T`.
    #[must_use]
    pub fn contains_plain<T>(&self) -> bool
    where
        T: Poolable + Default,
    {
        self.pools.contains_key(&(Domain::Plain, TypeId::of::<T>()))
    }

    /// Whether a scene pool exists for `T`.
    #[must_use]
    pub fn contains_scene<T>(&self) -> bool
    where
        T: ScenePoolable,
    {
        self.pools.contains_key(&(Domain::Scene, TypeId::of::<T>()))
    }

    /// Counters of the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredType`] if there is no plain pool for `T` and
    /// [`Error::PoolInUse`] if called from within a hook that the pool is running.
    pub fn stats_plain<T>(&self) -> Result<PoolStats>
    where
        T: Poolable + Default,
    {
        self.stats_of::<T>(Domain::Plain)
    }

    /// Counters of the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredType`] if there is no scene pool for `T` and
    /// [`Error::PoolInUse`] if called from within a hook that the pool is running.
    pub fn stats_scene<T>(&self) -> Result<PoolStats>
    where
        T: ScenePoolable,
    {
        self.stats_of::<T>(Domain::Scene)
    }

    /// Takes an instance out of the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredType`] if there is no plain pool for `T` and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn get_plain<T>(&self) -> Result<Pooled<T>>
    where
        T: Poolable + Default,
    {
        self.with_pool::<T, PlainStrategy<T>, _>(Domain::Plain, PoolCore::get)
    }

    /// Takes an instance out of the scene pool for `T`, activating its node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredType`] if there is no scene pool for `T` and
    /// [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn get_scene<T>(&self) -> Result<Pooled<T>>
    where
        T: ScenePoolable,
    {
        self.with_pool::<T, SceneStrategy<T>, _>(Domain::Scene, PoolCore::get)
    }

    /// Returns an instance to the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn release_plain<T>(&self, item: Pooled<T>) -> Result<()>
    where
        T: Poolable + Default,
    {
        self.with_pool_or_log::<T, PlainStrategy<T>>(Domain::Plain, "release", |pool| {
            pool.release(item);
        })
    }

    /// Returns an instance to the scene pool for `T`, deactivating its node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn release_scene<T>(&self, item: Pooled<T>) -> Result<()>
    where
        T: ScenePoolable,
    {
        self.with_pool_or_log::<T, SceneStrategy<T>>(Domain::Scene, "release", |pool| {
            pool.release(item);
        })
    }

    /// Permanently destroys an instance of the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn destroy_plain<T>(&self, item: Pooled<T>) -> Result<()>
    where
        T: Poolable + Default,
    {
        self.with_pool_or_log::<T, PlainStrategy<T>>(Domain::Plain, "destroy", |pool| {
            pool.destroy(item);
        })
    }

    /// Permanently destroys an instance of the scene pool for `T`, including its node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn destroy_scene<T>(&self, item: Pooled<T>) -> Result<()>
    where
        T: ScenePoolable,
    {
        self.with_pool_or_log::<T, SceneStrategy<T>>(Domain::Scene, "destroy", |pool| {
            pool.destroy(item);
        })
    }

    /// Releases every checked-out instance of the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn release_all_plain<T>(&self) -> Result<()>
    where
        T: Poolable + Default,
    {
        self.with_pool_or_log::<T, PlainStrategy<T>>(
            Domain::Plain,
            "release_all",
            PoolCore::release_all,
        )
    }

    /// Releases every checked-out instance of the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn release_all_scene<T>(&self) -> Result<()>
    where
        T: ScenePoolable,
    {
        self.with_pool_or_log::<T, SceneStrategy<T>>(
            Domain::Scene,
            "release_all",
            PoolCore::release_all,
        )
    }

    /// Destroys every instance held by the plain pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn destroy_all_plain<T>(&self) -> Result<()>
    where
        T: Poolable + Default,
    {
        self.with_pool_or_log::<T, PlainStrategy<T>>(
            Domain::Plain,
            "destroy_all",
            PoolCore::destroy_all,
        )
    }

    /// Destroys every instance held by the scene pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within one of the pool's own hooks.
    pub fn destroy_all_scene<T>(&self) -> Result<()>
    where
        T: ScenePoolable,
    {
        self.with_pool_or_log::<T, SceneStrategy<T>>(
            Domain::Scene,
            "destroy_all",
            PoolCore::destroy_all,
        )
    }

    /// Releases every checked-out instance of every pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within a lifecycle hook. The pool running that
    /// hook is skipped; every other pool is still released.
    pub fn release_all_pools(&self) -> Result<()> {
        self.for_each_pool("release_all", ErasedPool::release_all)
    }

    /// Destroys every instance held by every pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolInUse`] if called from within a lifecycle hook. The pool running that
    /// hook is skipped; every other pool is still destroyed.
    pub fn destroy_all_pools(&self) -> Result<()> {
        self.for_each_pool("destroy_all", ErasedPool::destroy_all)
    }

    /// Destroys every instance held by every pool, then removes the root node from the scene
    /// graph, taking any still checked-out scene nodes with it.
    pub fn teardown(mut self) {
        for slot in self.pools.values_mut() {
            slot.pool.get_mut().destroy_all();
        }

        if let (Some(scene), Some(root)) = (&self.scene, self.root) {
            scene.borrow_mut().destroy(root);
        }

        debug!(pools = self.pools.len(), "pool registry torn down");
    }

    fn slot<T>(&self, domain: Domain) -> Result<&PoolSlot>
    where
        T: 'static,
    {
        self.pools
            .get(&(domain, TypeId::of::<T>()))
            .ok_or_else(|| Error::UnregisteredType {
                type_name: type_name::<T>(),
                domain,
            })
    }

    fn stats_of<T>(&self, domain: Domain) -> Result<PoolStats>
    where
        T: 'static,
    {
        let pool = self
            .slot::<T>(domain)?
            .pool
            .try_borrow()
            .map_err(|_busy| pool_in_use::<T>(domain))?;

        Ok(pool.stats())
    }

    fn with_pool<T, S, R>(
        &self,
        domain: Domain,
        f: impl FnOnce(&mut PoolCore<T, S>) -> R,
    ) -> Result<R>
    where
        T: 'static,
        S: LifecycleStrategy<T> + 'static,
    {
        let mut erased = self
            .slot::<T>(domain)?
            .pool
            .try_borrow_mut()
            .map_err(|_busy| pool_in_use::<T>(domain))?;

        let pool = erased
            .as_any_mut()
            .downcast_mut::<PoolCore<T, S>>()
            .ok_or_else(|| Error::UnregisteredType {
                type_name: type_name::<T>(),
                domain,
            })?;

        Ok(f(pool))
    }

    fn with_pool_or_log<T, S>(
        &self,
        domain: Domain,
        operation: &'static str,
        f: impl FnOnce(&mut PoolCore<T, S>),
    ) -> Result<()>
    where
        T: 'static,
        S: LifecycleStrategy<T> + 'static,
    {
        match self.with_pool::<T, S, ()>(domain, f) {
            Err(Error::UnregisteredType { .. }) => {
                error!(
                    item_type = type_name::<T>(),
                    %domain,
                    operation,
                    "no pool found for type, ignoring"
                );
                Ok(())
            }
            result => result,
        }
    }

    fn for_each_pool(
        &self,
        operation: &'static str,
        mut f: impl FnMut(&mut (dyn ErasedPool + 'static)),
    ) -> Result<()> {
        let mut busy = None;

        for ((domain, _), slot) in &self.pools {
            let Ok(mut pool) = slot.pool.try_borrow_mut() else {
                warn!(
                    item_type = slot.item_type,
                    %domain,
                    operation,
                    "skipping pool that is running a lifecycle hook"
                );
                busy.get_or_insert(Error::PoolInUse {
                    type_name: slot.item_type,
                    domain: *domain,
                });
                continue;
            };

            f(&mut **pool);
        }

        busy.map_or(Ok(()), Err)
    }
}

fn pool_in_use<T>(domain: Domain) -> Error {
    Error::PoolInUse {
        type_name: type_name::<T>(),
        domain,
    }
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field(
                "pools",
                &self
                    .pools
                    .iter()
                    .map(|((domain, _), slot)| {
                        let stats = slot.pool.try_borrow().ok().map(|pool| pool.stats());
                        (*domain, slot.item_type, stats)
                    })
                    .collect::<Vec<_>>(),
            )
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
