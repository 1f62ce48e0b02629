use crate::NodeHandle;

/// Lifecycle contract implemented by every object managed by a pool.
///
/// The pool calls these hooks as instances move through their lifecycle:
///
/// * [`on_created()`][Self::on_created] once, right after the instance is physically constructed.
/// * [`on_get()`][Self::on_get] every time the instance is handed out to a caller.
/// * [`on_release()`][Self::on_release] every time the instance is returned to the pool.
/// * [`on_destroyed()`][Self::on_destroyed] once, when the instance is torn down. Instances that
///   are still alive when the pool itself is dropped never receive this call.
///
/// Hooks must not call back into the pool that owns the instance.
///
/// # Example
///
/// ```rust
/// use recycle_pool::Poolable;
///
/// #[derive(Default)]
/// struct Projectile {
///     in_flight: bool,
/// }
///
/// impl Poolable for Projectile {
///     fn on_created(&mut self) {}
///
///     fn on_get(&mut self) {
///         self.in_flight = true;
///     }
///
///     fn on_release(&mut self) {
///         self.in_flight = false;
///     }
///
///     fn on_destroyed(&mut self) {}
/// }
/// ```
pub trait Poolable: 'static {
    /// Called once, immediately after the instance has been constructed.
    fn on_created(&mut self);

    /// Called every time the instance is taken out of the pool.
    fn on_get(&mut self);

    /// Called every time the instance is returned to the pool.
    fn on_release(&mut self);

    /// Called once, when the instance is permanently discarded.
    fn on_destroyed(&mut self);
}

/// A [`Poolable`] that lives as a node in a [`SceneGraph`][crate::SceneGraph].
///
/// Scene pools instantiate a template node for each new instance and then ask the type to bind
/// itself to that node. The pool toggles the node's active state on get/release and destroys the
/// node when the instance is destroyed.
pub trait ScenePoolable: Poolable + Sized {
    /// Binds a new instance to a freshly instantiated node.
    fn attach(node: NodeHandle) -> Self;

    /// The node this instance is bound to.
    fn node(&self) -> NodeHandle;
}
