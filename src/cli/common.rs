//! Shared pieces of the CLI commands: site context, option flags and input reading.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::config::GraphsConfig;
use crate::models::{OptionMap, OptionValue, RenderRequest};

/// Site root plus its loaded configuration.
#[derive(Debug)]
pub struct CommandContext {
    pub site_root: PathBuf,
    pub config: GraphsConfig,
}

impl CommandContext {
    pub async fn load(site_root: PathBuf, config_path: Option<&Path>) -> Result<Self> {
        let config = GraphsConfig::load(&site_root, config_path).await?;
        Ok(Self {
            site_root,
            config,
        })
    }
}

/// Render option flags shared by `render` and `digest`.
#[derive(Args, Debug, Default, Clone)]
pub struct OptionArgs {
    /// Output format: img, object, embed, iframe, url (omit for inline SVG)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Scale factor
    #[arg(short, long)]
    pub scale: Option<f64>,

    /// Source encoding (PlantUML)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Output resolution (Graphviz)
    #[arg(long)]
    pub dpi: Option<i64>,

    /// Invert the y coordinate (Graphviz)
    #[arg(long)]
    pub invert_y: bool,

    /// Asset directory template (%{hash}, %{slug})
    #[arg(long)]
    pub dirname: Option<String>,

    /// Asset file name template (%{hash}, %{slug})
    #[arg(long)]
    pub name: Option<String>,
}

impl OptionArgs {
    /// Flags that were given, as request options.
    pub fn to_options(&self) -> OptionMap {
        let mut options = OptionMap::new();
        let strings = [
            ("format", &self.format),
            ("encoding", &self.encoding),
            ("dirname", &self.dirname),
            ("name", &self.name),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                options.insert(key.to_string(), OptionValue::from(value.as_str()));
            }
        }
        if let Some(scale) = self.scale {
            options.insert("scale".to_string(), OptionValue::Float(scale));
        }
        if let Some(dpi) = self.dpi {
            options.insert("dpi".to_string(), OptionValue::Integer(dpi));
        }
        if self.invert_y {
            options.insert("invert_y".to_string(), OptionValue::Flag(true));
        }
        options
    }
}

/// Build a request for `input` (`-` reads stdin).
///
/// A file under `site_root` is passed along as a site-relative source file so
/// renderers run next to it.
pub async fn read_request(
    site_root: &Path,
    input: &str,
    renderer: &str,
    options: &OptionMap,
) -> Result<RenderRequest> {
    let mut request = if input == "-" {
        let mut source = String::new();
        tokio::io::stdin().read_to_string(&mut source).await.context("Failed to read stdin")?;
        RenderRequest::new(renderer, source)
    } else {
        let path = Path::new(input);
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let request = RenderRequest::new(renderer, source);
        match site_relative(site_root, path) {
            Some(relative) => request.with_file(relative),
            None => request,
        }
    };
    request.options = options.clone();
    Ok(request)
}

/// `path` relative to `site_root`, if it lies inside it.
fn site_relative(site_root: &Path, path: &Path) -> Option<PathBuf> {
    let root = site_root.canonicalize().ok()?;
    let file = path.canonicalize().ok()?;
    file.strip_prefix(&root).ok().map(Path::to_path_buf)
}
