//! # Configuration
//!
//! Settings for the `fieldset` binary, loaded by [`confique`]. The library
//! itself never reads configuration; callers pass [`ModelOptions`] and
//! [`ProjectionOptions`] explicitly.
//!
//! ## Layers
//!
//! Resolved in priority order:
//! 1. **Environment variables**: `FIELDSET_PRETTY`, `FIELDSET_FILTER_DEFAULT`,
//!    `FIELDSET_NOTIFY`, `FIELDSET_MINIFIED`.
//! 2. **Explicit file**: the `--config` argument. Must exist.
//! 3. **Working directory**: `./fieldset.toml`.
//! 4. **User config**: `fieldset.toml` in the OS config directory (via
//!    `directories`).
//! 5. **Compiled defaults**.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `pretty` | `true` | Indent JSON output |
//! | `filter_default` | `true` | Initial toggle for fields a filter document omits |
//! | `notify` | `every-attempt` | When change events fire (`every-attempt`, `on-success`) |
//! | `minified` | `false` | Project with minified keys |

use std::path::{Path, PathBuf};

use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{FieldsetError, Result};
use crate::events::{ModelOptions, NotifyPolicy};
use crate::projection::{KeyStyle, ProjectionOptions};

pub const CONFIG_FILE: &str = "fieldset.toml";

fn parse_notify(value: &str) -> std::result::Result<NotifyPolicy, serde_json::Error> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
}

/// Configuration for the binary, stored in `fieldset.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldsetConfig {
    /// Indent JSON output.
    #[config(default = true, env = "FIELDSET_PRETTY")]
    pub pretty: bool,

    /// Initial toggle for fields a filter document does not mention.
    #[config(default = true, env = "FIELDSET_FILTER_DEFAULT")]
    pub filter_default: bool,

    #[config(default = "every-attempt", env = "FIELDSET_NOTIFY", parse_env = parse_notify)]
    pub notify: NotifyPolicy,

    /// Project with minified keys.
    #[config(default = false, env = "FIELDSET_MINIFIED")]
    pub minified: bool,
}

impl Default for FieldsetConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            filter_default: true,
            notify: NotifyPolicy::default(),
            minified: false,
        }
    }
}

/// `fieldset.toml` in the user's config directory, if the OS has one.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fieldset").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

impl FieldsetConfig {
    /// Load every layer. An explicit path that does not exist is an error;
    /// the implicit files are skipped when missing.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(FieldsetError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("config file not found: {}", path.display()),
                )));
            }
            builder = builder.file(path);
        }
        builder = builder.file(CONFIG_FILE);
        if let Some(user) = user_config_path() {
            builder = builder.file(user);
        }
        let config = builder.load()?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            notify: self.notify,
        }
    }

    /// Projection options, with `--minified` able to force minified keys.
    pub fn projection_options(&self, minified: bool) -> ProjectionOptions {
        ProjectionOptions {
            key_style: if minified || self.minified {
                KeyStyle::Minified
            } else {
                KeyStyle::Wire
            },
        }
    }
}
