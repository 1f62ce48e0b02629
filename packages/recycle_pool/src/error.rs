use thiserror::Error;

use crate::Domain;

/// Errors that can occur when operating on pools through a registry or context.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A context operation was attempted before the context was initialized.
    #[error("the pool context has not been initialized")]
    NotInitialized,

    /// The context was asked to initialize a second time without an intervening shutdown.
    #[error("the pool context has already been initialized")]
    AlreadyInitialized,

    /// An object was requested from a pool that does not exist. This means the type was never
    /// registered in the requested domain or no configuration row created a pool for it.
    #[error("no {domain} pool found for type {type_name}")]
    UnregisteredType {
        /// Name of the Rust type that was requested.
        type_name: &'static str,

        /// The domain the pool was looked up in.
        domain: Domain,
    },

    /// A pool was used from within one of its own lifecycle hooks, for example a hook of `T` that
    /// asks the registry for another `T`. Pools of other types remain usable from hooks.
    #[error("the {domain} pool for type {type_name} is busy running a lifecycle hook")]
    PoolInUse {
        /// Name of the Rust type whose pool was busy.
        type_name: &'static str,

        /// The domain of the busy pool.
        domain: Domain,
    },

    /// The thread's pool context was used while it was being initialized or shut down, which
    /// happens when a lifecycle hook running during either of those calls reaches for the
    /// [`facade`][crate::facade].
    #[error("the pool context is busy being initialized or shut down")]
    ContextInUse,

    /// Pool configuration text could not be parsed.
    #[error("invalid pool configuration: {message}")]
    InvalidConfig {
        /// A human-readable description of the problem.
        message: String,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
