//! Global constants used throughout graphsvg.
//!
//! Timeouts, default templates and well-known file names live here so the
//! magic values shared by the config, cache and output layers stay in one
//! place.

use std::time::Duration;

/// Name of the cache directory created under the site root.
pub const CACHE_DIR_NAME: &str = ".graphs-cache";

/// Configuration file looked up in the site root when no path is given.
pub const CONFIG_FILE_NAME: &str = "graphs.toml";

/// Environment variable that overrides the configuration file path.
pub const CONFIG_ENV_VAR: &str = "GRAPHSVG_CONFIG";

/// Default directory template for external assets.
pub const DEFAULT_DIRNAME: &str = "/images/graphs";

/// Default file name template for external assets.
pub const DEFAULT_NAME: &str = "graphs-%{hash}.svg";

/// Default source encoding.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Default scale factor. Scale arguments are only emitted for other values.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Default destination root for written assets, relative to the site root.
pub const DEFAULT_DESTINATION: &str = "_site";

/// Default bound on a single external renderer process (120 seconds).
///
/// TeX and Graphviz can both be driven into very long runs by pathological
/// input; a killed process is reported as a failed conversion.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Renders slower than this are logged at info level.
pub const SLOW_RENDER_THRESHOLD: Duration = Duration::from_secs(1);
