//! Command-line interface for graphsvg.
//!
//! A thin adapter over [`GraphEngine`](crate::engine::GraphEngine): every
//! command loads the site configuration, builds an engine or resolver, and
//! prints results.
//!
//! # Commands
//!
//! - `render` - Render diagram sources to inline SVG or external assets
//! - `digest` - Print the cache digest of a source without rendering it
//! - `check` - Report which renderers and converters are installed
//! - `cache` - Inspect or clean the content cache
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - Log level (`RUST_LOG` takes precedence)
//! - `--site-root` - Directory holding `graphs.toml` and the cache
//! - `--config` - Explicit configuration file (also `GRAPHSVG_CONFIG`)
//!
//! # Examples
//!
//! ```bash
//! graphsvg render --renderer dot flow.dot
//! graphsvg render --renderer plantuml --format img --json seq.puml
//! echo 'digraph { a -> b }' | graphsvg digest --renderer dot -
//! graphsvg cache info
//! ```

mod cache;
mod check;
mod common;
mod digest;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::constants::CONFIG_ENV_VAR;
pub use common::{CommandContext, OptionArgs};

/// Render Graphviz, TeX, Mscgen, PlantUML and Shaape diagrams to cached SVG.
#[derive(Parser, Debug)]
#[command(name = "graphsvg", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Site root: holds graphs.toml and the cache, and anchors relative paths
    #[arg(long, global = true, default_value = ".")]
    site_root: PathBuf,

    /// Configuration file (defaults to <site-root>/graphs.toml)
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render diagram sources
    Render(render::RenderCommand),

    /// Print cache digests without rendering
    Digest(digest::DigestCommand),

    /// Check which renderers are installed
    Check(check::CheckCommand),

    /// Inspect or clean the content cache
    #[command(subcommand)]
    Cache(cache::CacheCommand),
}

impl Cli {
    /// Install logging and run the selected command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let context = CommandContext::load(self.site_root, self.config.as_deref()).await?;
        match self.command {
            Commands::Render(cmd) => cmd.execute(&context).await,
            Commands::Digest(cmd) => cmd.execute(&context).await,
            Commands::Check(cmd) => cmd.execute(&context),
            Commands::Cache(cmd) => cmd.execute(&context).await,
        }
    }

    /// Log level implied by the verbosity flags.
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_level())
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(self.verbose)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_levels() {
        let cli = Cli::parse_from(["graphsvg", "--verbose", "check"]);
        assert_eq!(cli.log_level(), "debug");
        let cli = Cli::parse_from(["graphsvg", "check", "-q"]);
        assert_eq!(cli.log_level(), "error");
        let cli = Cli::parse_from(["graphsvg", "check"]);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["graphsvg", "-v", "-q", "check"]).is_err());
    }

    #[test]
    fn test_render_arguments() {
        let cli = Cli::parse_from([
            "graphsvg",
            "--site-root",
            "site",
            "render",
            "--renderer",
            "dot",
            "--format",
            "img",
            "--scale",
            "1.5",
            "--invert-y",
            "a.dot",
            "b.dot",
        ]);
        assert_eq!(cli.site_root, PathBuf::from("site"));
        assert!(matches!(cli.command, Commands::Render(_)));
    }
}
