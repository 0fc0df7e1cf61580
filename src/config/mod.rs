//! Site configuration (`graphs.toml`)
//!
//! A site may place a `graphs.toml` next to its sources to set option
//! defaults, point renderers at non-standard executables and bound render
//! time. Every key is optional; a missing file means all defaults.
//!
//! ```toml
//! # Option defaults, applied under per-request options
//! format = "img"
//! scale = 1.5
//! dirname = "/assets/diagrams"
//! name = "%{slug}-%{hash}.svg"
//!
//! # Seconds before a renderer process is killed (default 120)
//! timeout_secs = 60
//!
//! # Relative to the site root
//! cache_dir = ".graphs-cache"
//! destination = "_site"
//!
//! # [executablePath, extraArgs...] per renderer, or for dvisvgm
//! [renderers]
//! plantuml = ["java", "-jar", "/opt/plantuml/plantuml.jar"]
//! dvisvgm = ["/usr/local/texlive/bin/dvisvgm"]
//! ```
//!
//! The file is validated once, right after loading: renderer names, override
//! arrays and option values are all checked there, so later reads are plain
//! field access.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_DESTINATION, DEFAULT_RENDER_TIMEOUT};
use crate::core::GraphError;
use crate::models::{OptionMap, OptionValue, RenderOptions};
use crate::renderer::ExecutableResolver;

/// Contents of `graphs.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphsConfig {
    /// Default source encoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Default scale factor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,

    /// Default output format; absent means inline SVG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Default asset directory template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirname: Option<String>,

    /// Default asset file name template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Bound on each external process, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Cache directory, relative to the site root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Destination root for assets, relative to the site root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,

    /// Executable overrides: tool name to `[path, prefix args...]`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub renderers: BTreeMap<String, Vec<String>>,
}

impl GraphsConfig {
    /// Load configuration for `site_root`.
    ///
    /// With `explicit` set, that file must exist. Otherwise
    /// `<site_root>/graphs.toml` is used when present and defaults when not.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid TOML, contains unknown
    /// keys, or does not pass [`validate`](Self::validate).
    pub async fn load(site_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = site_root.join(CONFIG_FILE_NAME);
                if !path.exists() {
                    tracing::debug!(target: "graphsvg::config", "No {} in {}, using defaults", CONFIG_FILE_NAME, site_root.display());
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::load_from(&path).await
    }

    /// Load and validate a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config =
            Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))?;
        tracing::debug!(target: "graphsvg::config", "Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, GraphError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value that would otherwise fail later, at use.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.timeout_secs == Some(0) {
            return Err(GraphError::ConfigError {
                message: "timeout_secs must be at least 1".to_string(),
            });
        }
        self.resolver()?;
        RenderOptions::from_layers([&self.option_defaults()])?;
        Ok(())
    }

    /// Site-level option defaults, layered under request options.
    pub fn option_defaults(&self) -> OptionMap {
        let mut defaults = OptionMap::new();
        let strings = [
            ("encoding", &self.encoding),
            ("format", &self.format),
            ("dirname", &self.dirname),
            ("name", &self.name),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                defaults.insert(key.to_string(), OptionValue::from(value.as_str()));
            }
        }
        if let Some(scale) = self.scale {
            defaults.insert("scale".to_string(), OptionValue::Float(scale));
        }
        defaults
    }

    /// Executable resolver built from `[renderers]`.
    pub fn resolver(&self) -> Result<ExecutableResolver, GraphError> {
        ExecutableResolver::from_entries(&self.renderers)
    }

    /// Process time bound.
    pub fn timeout(&self) -> Duration {
        self.timeout_secs.map_or(DEFAULT_RENDER_TIMEOUT, Duration::from_secs)
    }

    /// Asset destination root for `site_root`.
    pub fn destination(&self, site_root: &Path) -> PathBuf {
        site_root.join(self.destination.as_deref().unwrap_or_else(|| Path::new(DEFAULT_DESTINATION)))
    }
}
