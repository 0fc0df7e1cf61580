//! graphsvg CLI entry point
//!
//! Parses arguments, runs the selected command and turns any error into a
//! colored message with a suggestion before exiting with status 1.
//!
//! - `render` - Render diagram sources to inline SVG or external assets
//! - `digest` - Print cache digests without rendering
//! - `check` - Report which renderers are installed
//! - `cache` - Inspect or clean the content cache

use anyhow::Result;
use clap::Parser;
use graphsvg::cli;
use graphsvg::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
