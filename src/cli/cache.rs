//! Inspect or clean the content cache.

use anyhow::{Result, anyhow};
use clap::Subcommand;
use colored::Colorize;

use super::common::CommandContext;
use crate::cache::{CacheDigest, ContentCache};

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache location and size
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove cached renders
    Clean {
        /// Only remove these digests (default: everything)
        digests: Vec<String>,
    },

    /// List cached digests
    List,
}

impl CacheCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let cache = ContentCache::for_site(&context.site_root, context.config.cache_dir.as_deref());
        match self {
            Self::Info {
                json,
            } => show_info(&cache, json).await,
            Self::Clean {
                digests,
            } => clean(&cache, &digests).await,
            Self::List => {
                for digest in cache.digests().await? {
                    println!("{digest}");
                }
                Ok(())
            }
        }
    }
}

async fn show_info(cache: &ContentCache, json: bool) -> Result<()> {
    let stats = cache.stats().await?;
    if json {
        let info = serde_json::json!({
            "location": cache.root(),
            "entries": stats.entries,
            "total_bytes": stats.total_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", "Cache Information".bold());
    println!("  Location: {}", cache.root().display());
    println!("  Entries:  {}", stats.entries);
    println!("  Size:     {}", format_size(stats.total_bytes));
    Ok(())
}

async fn clean(cache: &ContentCache, digests: &[String]) -> Result<()> {
    if digests.is_empty() {
        let removed = cache.clear().await?;
        println!("{} Removed {} cached render(s)", "✓".green(), removed);
        return Ok(());
    }

    // Reject bad input before touching anything
    let parsed = digests
        .iter()
        .map(|d| CacheDigest::parse(d).ok_or_else(|| anyhow!("'{d}' is not a cache digest")))
        .collect::<Result<Vec<_>>>()?;

    let mut removed = 0;
    for digest in &parsed {
        if cache.remove(digest).await? {
            removed += 1;
        } else {
            tracing::info!("{} was not cached", digest);
        }
    }
    println!("{} Removed {} cached render(s)", "✓".green(), removed);
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
