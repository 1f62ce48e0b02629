#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Pools of reusable objects, one pool per type, looked up by the exact type requested.
//!
//! Constructing and tearing down objects can be expensive, for example when every object is backed
//! by a node in a scene graph. This crate keeps retired objects around and hands them out again,
//! running lifecycle hooks on the object as it moves between the caller and the pool.
//!
//! # Key Features
//!
//! - **Lifecycle hooks**: every pooled type implements [`Poolable`] and is told when it is
//!   created, handed out, returned and torn down
//! - **Two domains**: plain values constructed through [`Default`], and scene objects
//!   ([`ScenePoolable`]) instantiated from a template in a [`SceneGraph`] and shown or hidden as
//!   they change hands
//! - **Configuration-driven**: a [`PoolConfig`] (optionally loaded from TOML) lists which pools
//!   exist and how they are sized; types are matched to configuration rows through an explicit
//!   registration table in [`PoolRegistryBuilder`]
//! - **Bounded storage**: each pool keeps at most `maximum_size` idle instances and destroys the
//!   excess
//! - **Context and facade**: [`PoolContext`] gates the registry behind one-time initialization,
//!   and the [`facade`] module exposes a per-thread context through free functions
//! - **Re-entrant hooks**: each pool is borrowed on its own, so the hooks of one type can take and
//!   return instances of other types through the same registry, context or facade
//!
//! # Example
//!
//! ```
//! use recycle_pool::{PoolConfig, PoolContext, PoolRegistry, Poolable};
//!
//! #[derive(Default)]
//! struct Bullet {
//!     distance: f32,
//! }
//!
//! impl Poolable for Bullet {
//!     fn on_created(&mut self) {}
//!
//!     fn on_get(&mut self) {}
//!
//!     fn on_release(&mut self) {
//!         self.distance = 0.0;
//!     }
//!
//!     fn on_destroyed(&mut self) {}
//! }
//!
//! let config = PoolConfig::from_toml_str(
//!     r#"
//!     [[pools]]
//!     type_name = "bullet"
//!     initial_size = 16
//!     maximum_size = 64
//!     "#,
//! )
//! .unwrap();
//!
//! let builder = PoolRegistry::builder().register_plain::<Bullet>("bullet");
//!
//! let mut context = PoolContext::new();
//! context.initialize(&builder, &config).unwrap();
//!
//! let bullet = context.get_plain::<Bullet>().unwrap();
//! bullet.borrow_mut().distance += 12.5;
//! context.release_plain(bullet).unwrap();
//!
//! let stats = context.stats_plain::<Bullet>().unwrap();
//! assert_eq!(stats.created, 16);
//! assert_eq!(stats.released, 16);
//! ```
//!
//! # Thread safety
//!
//! Pools, registries and contexts are single-threaded and are neither [`Send`] nor [`Sync`].

mod config;
mod context;
mod error;
pub mod facade;
mod pool;
mod poolable;
mod pooled;
mod registry;
mod scene;
mod strategy;

pub use config::*;
pub use context::*;
pub use error::*;
pub use pool::*;
pub use poolable::*;
pub use pooled::*;
pub use registry::*;
pub use scene::*;
pub use strategy::*;
