#![forbid(unsafe_code)]

//! Group and item configuration.
//!
//! [`GroupConfig`] and [`ItemConfig`] are plain values passed to the
//! constructors. With the `config` feature, a combined [`SortableConfig`]
//! can be loaded from TOML or JSON:
//!
//! ```toml
//! [group]
//! direction = "x"
//! constrain_direction = false
//! no_slide = true
//!
//! [item]
//! handle = ".grip"
//! update_interval_ms = 60
//! ```
//!
//! Every field has a default, so partial files are accepted.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use sortkit_core::Axis;
use web_time::Duration;

/// Default interval between throttled group updates during a drag.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 125;

/// Settings of one sortable group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct GroupConfig {
    /// Axis along which items are ordered and repositioned.
    pub direction: Axis,
    /// Dragged items move only along `direction` when set.
    pub constrain_direction: bool,
    /// Highlight the item under the pointer instead of sliding siblings.
    pub no_slide: bool,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            direction: Axis::Y,
            constrain_direction: true,
            no_slide: false,
        }
    }
}

impl GroupConfig {
    #[must_use]
    pub fn with_direction(mut self, direction: Axis) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_constrain_direction(mut self, constrain: bool) -> Self {
        self.constrain_direction = constrain;
        self
    }

    #[must_use]
    pub fn with_no_slide(mut self, no_slide: bool) -> Self {
        self.no_slide = no_slide;
        self
    }
}

/// Settings of one sortable item.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ItemConfig {
    /// Selector of the sub-region that starts a drag; whole item when unset.
    pub handle: Option<String>,
    /// Minimum spacing between throttled updates, in milliseconds.
    pub update_interval_ms: u64,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            handle: None,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
        }
    }
}

impl ItemConfig {
    #[must_use]
    pub fn with_handle(mut self, selector: impl Into<String>) -> Self {
        self.handle = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

/// Combined configuration, loadable from a file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SortableConfig {
    pub group: GroupConfig,
    pub item: ItemConfig,
}

impl SortableConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.item.update_interval_ms == 0 {
            errors.push("item.update_interval_ms must be > 0".to_owned());
        }
        if let Some(handle) = &self.item.handle
            && handle.trim().is_empty()
        {
            errors.push("item.handle must not be blank when set".to_owned());
        }

        errors
    }

    #[cfg_attr(not(feature = "config"), allow(dead_code))]
    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors from loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
