use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{NodeHandle, Poolable, ScenePoolable, SharedSceneGraph, TemplateHandle};

/// The four behaviors a [`PoolCore`][crate::PoolCore] delegates to.
///
/// The pool core owns the bookkeeping; a strategy owns how instances come into existence, what
/// happens when they change hands and how they are torn down.
pub trait LifecycleStrategy<T> {
    /// Builds a new instance, including any one-time initialization.
    fn create(&mut self) -> T;

    /// Prepares an instance that is being handed out.
    fn on_get(&mut self, item: &mut T);

    /// Parks an instance that has been returned.
    fn on_release(&mut self, item: &mut T);

    /// Tears an instance down permanently.
    fn on_destroy(&mut self, item: &mut T);
}

/// Strategy for plain values: construct through [`Default`] and forward to the lifecycle hooks.
#[must_use]
pub struct PlainStrategy<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> PlainStrategy<T> {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for PlainStrategy<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl<T> fmt::Debug for PlainStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainStrategy")
            .field("item_type", &type_name::<T>())
            .finish()
    }
}

impl<T> LifecycleStrategy<T> for PlainStrategy<T>
where
    T: Poolable + Default,
{
    fn create(&mut self) -> T {
        let mut item = T::default();
        item.on_created();
        item
    }

    fn on_get(&mut self, item: &mut T) {
        item.on_get();
    }

    fn on_release(&mut self, item: &mut T) {
        item.on_release();
    }

    fn on_destroy(&mut self, item: &mut T) {
        item.on_destroyed();
    }
}

/// Strategy for scene objects: instantiate a template under a parent node, toggle the node's
/// active state as the instance changes hands and destroy the node on teardown.
#[must_use]
pub struct SceneStrategy<T> {
    scene: SharedSceneGraph,
    template: TemplateHandle,
    parent: NodeHandle,

    _item: PhantomData<fn() -> T>,
}

impl<T> SceneStrategy<T> {
    /// Creates a strategy that instantiates `template` under `parent` in `scene`.
    pub fn new(scene: SharedSceneGraph, template: TemplateHandle, parent: NodeHandle) -> Self {
        Self {
            scene,
            template,
            parent,
            _item: PhantomData,
        }
    }
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl<T> fmt::Debug for SceneStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneStrategy")
            .field("item_type", &type_name::<T>())
            .field("template", &self.template)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl<T> LifecycleStrategy<T> for SceneStrategy<T>
where
    T: ScenePoolable,
{
    fn create(&mut self) -> T {
        let node = self
            .scene
            .borrow_mut()
            .instantiate(&self.template, self.parent);

        let mut item = T::attach(node);
        item.on_created();
        item
    }

    fn on_get(&mut self, item: &mut T) {
        item.on_get();
        self.scene.borrow_mut().set_active(item.node(), true);
    }

    fn on_release(&mut self, item: &mut T) {
        item.on_release();
        self.scene.borrow_mut().set_active(item.node(), false);
    }

    fn on_destroy(&mut self, item: &mut T) {
        item.on_destroyed();
        self.scene.borrow_mut().destroy(item.node());
    }
}
