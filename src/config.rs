//! Incanter configuration.
//!
//! With the `config` feature the configuration can be deserialized with
//! serde, for example from a section of an application config file.

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::internal::MAX_DEPTH;

/// Tunables for an [`Incanter`](crate::Incanter).
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Incanter, IncanterConfig};
///
/// let config = IncanterConfig::builder()
///     .max_depth(64)
///     .cache_compositions(false)
///     .build();
/// let incanter = Incanter::with_config(config);
/// assert_eq!(incanter.config().max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct IncanterConfig {
    /// Deepest factory chain the resolver follows before giving up
    pub max_depth: usize,
    /// Whether composed callables are memoized
    pub cache_compositions: bool,
}

impl Default for IncanterConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            cache_compositions: true,
        }
    }
}

impl IncanterConfig {
    pub fn builder() -> IncanterConfigBuilder {
        IncanterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IncanterConfig`].
#[derive(Debug, Clone)]
pub struct IncanterConfigBuilder {
    config: IncanterConfig,
}

impl IncanterConfigBuilder {
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn cache_compositions(mut self, enabled: bool) -> Self {
        self.config.cache_compositions = enabled;
        self
    }

    pub fn build(self) -> IncanterConfig {
        self.config
    }
}
