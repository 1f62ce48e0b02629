use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, TemplateHandle};

const DEFAULT_CAPACITY: usize = 10;
const DEFAULT_MAXIMUM_SIZE: usize = 10_000;

/// The two construction domains a pool can belong to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Domain {
    /// Plain values, constructed through [`Default`].
    Plain,

    /// Objects bound to a node of a [`SceneGraph`][crate::SceneGraph], instantiated from a
    /// template.
    Scene,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::Scene => f.write_str("scene"),
        }
    }
}

/// Describes one pool: which type it serves, how instances are built and how many to keep.
///
/// `initial_size` instances are created and released when the pool is constructed.
/// `default_capacity` is the number of released instances the pool reserves storage for up
/// front, and `maximum_size` is the number of released instances it will hold on to; an instance
/// released into a full pool is destroyed instead. `maximum_size` does not limit how many
/// instances may be checked out at the same time.
///
/// # Example
///
/// ```rust
/// use recycle_pool::{Domain, PoolDatum, TemplateHandle};
///
/// let datum = PoolDatum::scene("enemy", TemplateHandle::new("prefabs/enemy"))
///     .with_initial_size(4)
///     .with_default_capacity(16)
///     .with_maximum_size(64);
///
/// assert_eq!(datum.domain(), Domain::Scene);
/// assert_eq!(datum.type_name(), Some("enemy"));
/// assert_eq!(datum.initial_size(), 4);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolDatum {
    #[serde(default)]
    engine_bound: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    template: Option<TemplateHandle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,

    #[serde(default)]
    initial_size: usize,

    #[serde(default = "default_capacity")]
    default_capacity: usize,

    #[serde(default = "default_maximum_size")]
    maximum_size: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_maximum_size() -> usize {
    DEFAULT_MAXIMUM_SIZE
}

impl PoolDatum {
    /// Describes a pool of plain values registered under `type_name`.
    #[must_use]
    pub fn plain(type_name: impl Into<String>) -> Self {
        Self {
            engine_bound: false,
            template: None,
            type_name: Some(type_name.into()),
            initial_size: 0,
            default_capacity: DEFAULT_CAPACITY,
            maximum_size: DEFAULT_MAXIMUM_SIZE,
        }
    }

    /// Describes a pool of scene objects registered under `type_name`, instantiated from
    /// `template`.
    #[must_use]
    pub fn scene(type_name: impl Into<String>, template: TemplateHandle) -> Self {
        Self {
            engine_bound: true,
            template: Some(template),
            ..Self::plain(type_name)
        }
    }

    /// Sets the number of instances created when the pool is constructed.
    #[must_use]
    pub fn with_initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Sets the number of released instances the pool reserves storage for.
    #[must_use]
    pub fn with_default_capacity(mut self, default_capacity: usize) -> Self {
        self.default_capacity = default_capacity;
        self
    }

    /// Sets the number of released instances the pool keeps before destroying returned ones.
    #[must_use]
    pub fn with_maximum_size(mut self, maximum_size: usize) -> Self {
        self.maximum_size = maximum_size;
        self
    }

    /// Whether the pool manages scene objects.
    #[must_use]
    pub fn is_engine_bound(&self) -> bool {
        self.engine_bound
    }

    /// The construction domain of the pool.
    #[must_use]
    pub fn domain(&self) -> Domain {
        if self.engine_bound {
            Domain::Scene
        } else {
            Domain::Plain
        }
    }

    /// The template scene objects are instantiated from, if any.
    #[must_use]
    pub fn template(&self) -> Option<&TemplateHandle> {
        self.template.as_ref()
    }

    /// The registration tag of the pooled type, if any.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Number of instances created when the pool is constructed.
    #[must_use]
    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    /// Number of released instances the pool reserves storage for.
    #[must_use]
    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    /// Number of released instances the pool keeps before destroying returned ones.
    #[must_use]
    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }
}

/// An ordered list of pool descriptions, read once when a registry is built.
///
/// # Example
///
/// ```rust
/// use recycle_pool::PoolConfig;
///
/// let config = PoolConfig::from_toml_str(
///     r#"
///     [[pools]]
///     type_name = "bullet"
///     initial_size = 8
///
///     [[pools]]
///     engine_bound = true
///     template = "prefabs/enemy"
///     type_name = "enemy"
///     maximum_size = 32
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.len(), 2);
/// assert_eq!(config.pools()[1].maximum_size(), 32);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    #[serde(default)]
    pools: Vec<PoolDatum>,
}

impl PoolConfig {
    /// Creates a configuration from an ordered list of pool descriptions.
    #[must_use]
    pub fn new(pools: Vec<PoolDatum>) -> Self {
        Self { pools }
    }

    /// Parses a configuration from TOML text with a `[[pools]]` array of tables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the text is not valid TOML or does not describe a
    /// pool configuration.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// The pool descriptions, in configuration order.
    #[must_use]
    pub fn pools(&self) -> &[PoolDatum] {
        &self.pools
    }

    /// Number of pool descriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether the configuration describes no pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

impl FromIterator<PoolDatum> for PoolConfig {
    fn from_iter<I: IntoIterator<Item = PoolDatum>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn missing_sizes_take_defaults() {
        let config = PoolConfig::from_toml_str(
            r#"
            [[pools]]
            type_name = "spark"
            "#,
        )
        .unwrap();

        let datum = &config.pools()[0];
        assert_eq!(datum.domain(), Domain::Plain);
        assert_eq!(datum.initial_size(), 0);
        assert_eq!(datum.default_capacity(), DEFAULT_CAPACITY);
        assert_eq!(datum.maximum_size(), DEFAULT_MAXIMUM_SIZE);
        assert!(datum.template().is_none());
    }

    #[test]
    fn rows_without_type_or_template_still_parse() {
        // Incomplete rows are a registry concern, not a parsing concern.
        let config = PoolConfig::from_toml_str(
            r"
            [[pools]]
            engine_bound = true
            initial_size = 2
            ",
        )
        .unwrap();

        let datum = &config.pools()[0];
        assert!(datum.is_engine_bound());
        assert_eq!(datum.type_name(), None);
        assert_eq!(datum.template(), None);
    }

    #[test]
    fn empty_text_is_empty_config() {
        let config = PoolConfig::from_toml_str("").unwrap();

        assert!(config.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = PoolConfig::from_toml_str(
            r#"
            [[pools]]
            type_name = "spark"
            max_size = 3
            "#,
        );

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        let result = PoolConfig::from_toml_str(
            r#"
            [[pools]]
            type_name = "spark"
            initial_size = "many"
            "#,
        );

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn builder_setters_apply() {
        let config: PoolConfig = [
            PoolDatum::plain("a").with_initial_size(1),
            PoolDatum::scene("b", TemplateHandle::new("t"))
                .with_default_capacity(3)
                .with_maximum_size(4),
        ]
        .into_iter()
        .collect();

        assert_eq!(config.len(), 2);
        assert_eq!(config.pools()[0].initial_size(), 1);
        assert_eq!(config.pools()[1].domain(), Domain::Scene);
        assert_eq!(config.pools()[1].template().unwrap().name(), "t");
        assert_eq!(config.pools()[1].default_capacity(), 3);
        assert_eq!(config.pools()[1].maximum_size(), 4);
    }
}
