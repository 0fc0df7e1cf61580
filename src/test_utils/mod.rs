//! Test utilities for graphsvg
//!
//! Helpers shared by unit tests and the integration tests under `tests/`
//! (enabled there through the `test-utils` feature):
//!
//! - [`init_test_logging`] installs a test-friendly tracing subscriber once
//! - [`fake_tool`] writes a shell script that stands in for a renderer, so the
//!   pipeline can be exercised without Graphviz or TeX installed
//! - [`site_with_fake_tools`] builds a site directory whose `graphs.toml`
//!   points renderers at such scripts
//!
//! # Example
//!
//! ```rust,no_run
//! use graphsvg::test_utils::fake_tool;
//! use tempfile::TempDir;
//!
//! let temp = TempDir::new().unwrap();
//! let dot = fake_tool(temp.path(), "dot", "cat");
//! assert!(dot.exists());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=graphsvg=debug,renderer=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Write an executable `/bin/sh` script named `name` into `dir`.
///
/// `script` is the body; it receives the renderer's arguments as `"$@"` and
/// its standard input unchanged.
///
/// # Panics
///
/// Panics if the script cannot be written or made executable.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("fake-bin");
    std::fs::create_dir_all(&bin).unwrap_or_else(|e| panic!("create {}: {e}", bin.display()));

    let path = bin.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n"))
        .unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .unwrap_or_else(|e| panic!("chmod {}: {e}", path.display()));
    path
}

/// Create `graphs.toml` in `site_root`: `extra` verbatim, then a
/// `[renderers]` table mapping each `(tool, script)` pair to a fake
/// executable. With no tools the table is left out.
///
/// Returns the paths of the fake executables in the order given.
#[cfg(unix)]
pub fn site_with_fake_tools(site_root: &Path, tools: &[(&str, &str)], extra: &str) -> Vec<PathBuf> {
    let mut table = String::new();
    let mut paths = Vec::new();
    for (name, script) in tools {
        let path = fake_tool(site_root, name, script);
        table.push_str(&format!("{name} = [\"{}\"]\n", path.display()));
        paths.push(path);
    }

    // An empty table would clash with a [renderers] table in `extra`
    let config =
        if table.is_empty() { format!("{extra}\n") } else { format!("{extra}\n[renderers]\n{table}") };
    let config_path = site_root.join(crate::constants::CONFIG_FILE_NAME);
    std::fs::write(&config_path, config)
        .unwrap_or_else(|e| panic!("write {}: {e}", config_path.display()));
    paths
}
