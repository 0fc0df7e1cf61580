//! Render pipeline
//!
//! Runs external renderers to turn a [`RenderSpec`] into SVG bytes on a
//! cache miss. Two paths exist:
//!
//! - **Single stage** (Graphviz, Mscgen, PlantUML, Shaape): the trimmed
//!   source is written to the renderer's stdin and its stdout is the SVG.
//! - **Multi-stage TeX** ([`tex`]): the engine writes a DVI/XDV file into a
//!   scratch directory and `dvisvgm` converts it to SVG.
//!
//! Both paths check executable availability before spawning anything, so a
//! missing tool surfaces as [`GraphError::MissingDependency`].
//!
//! # Failure signals
//!
//! | Outcome | Error |
//! |---|---|
//! | renderer exits with a failure status | [`GraphError::ConversionFailed`] |
//! | renderer exits cleanly with empty stdout | [`GraphError::EmptyRender`] |
//! | renderer outlives the timeout | [`GraphError::Timeout`] |
//! | TeX engine leaves no DVI/XDV file | [`GraphError::ConversionFailed`] |
//!
//! The pipeline never touches the content cache; storing results is the
//! engine's job.

pub mod command;
pub mod tex;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::digest::CacheDigest;
use crate::constants::DEFAULT_RENDER_TIMEOUT;
use crate::core::GraphError;
use crate::models::RenderSpec;
use crate::renderer::{ExecutableResolver, Renderer, Tool, renderer_arguments};
use crate::utils::fs::ensure_dir;

pub use command::{RendererCommand, RendererOutput};

/// Executes renderers for one site.
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    resolver: ExecutableResolver,
    site_root: PathBuf,
    timeout: Option<Duration>,
}

impl RenderPipeline {
    /// Pipeline resolving source files against `site_root`, with the default
    /// process timeout.
    pub fn new(resolver: ExecutableResolver, site_root: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            site_root: site_root.into(),
            timeout: Some(DEFAULT_RENDER_TIMEOUT),
        }
    }

    /// Bound every external process by `timeout` (None disables the bound).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn resolver(&self) -> &ExecutableResolver {
        &self.resolver
    }

    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Render `spec` to SVG bytes. The result is never empty.
    ///
    /// `digest` names scratch files and tags log lines; it must be the digest
    /// of `spec`.
    pub async fn render(&self, spec: &RenderSpec, digest: &CacheDigest) -> Result<Vec<u8>> {
        if spec.renderer().is_tex() {
            tex::render(self, spec, digest).await
        } else {
            self.render_single_stage(spec, digest).await
        }
    }

    async fn render_single_stage(&self, spec: &RenderSpec, digest: &CacheDigest) -> Result<Vec<u8>> {
        let renderer = spec.renderer();
        let tool = Tool::from(renderer);
        let program = self.resolver.ensure_available(tool, renderer)?;
        let working_dir = self.working_directory(spec)?;

        let resolved = self.resolver.command(tool, renderer_arguments(renderer, spec.options()));
        let output = RendererCommand::new(program)
            .args(resolved.args)
            .current_dir(&working_dir)
            .stdin(spec.code().as_bytes().to_vec())
            .with_timeout(self.timeout)
            .with_context(log_context(renderer, digest))
            .execute()
            .await?;

        if !output.success() {
            return Err(GraphError::conversion_failed(
                renderer.name(),
                format!("renderer exited with {}", output.failure_reason()),
            )
            .into());
        }
        if output.stdout.is_empty() {
            return Err(GraphError::EmptyRender {
                renderer: renderer.name().to_string(),
            }
            .into());
        }

        Ok(output.stdout)
    }

    /// Directory a single-stage renderer runs in.
    ///
    /// Sources read from a file run next to that file so relative includes
    /// resolve; inline sources run in a per-renderer scratch directory.
    fn working_directory(&self, spec: &RenderSpec) -> Result<PathBuf> {
        if let Some(dir) = self.source_directory(spec)? {
            return Ok(dir);
        }
        let scratch = std::env::temp_dir().join("graphsvg").join(spec.renderer().name());
        ensure_dir(&scratch)?;
        Ok(scratch)
    }

    /// Absolute path of the spec's source file, if it names one.
    ///
    /// A relative site root is resolved against the current directory.
    pub fn source_path(&self, spec: &RenderSpec) -> Result<Option<PathBuf>> {
        let Some(file) = spec.source().file() else {
            return Ok(None);
        };
        let path = self.site_root.join(file);
        let path = std::path::absolute(&path)
            .with_context(|| format!("Failed to resolve source path: {}", path.display()))?;
        Ok(Some(path))
    }

    /// Directory of the spec's source file, when it has one that exists.
    fn source_directory(&self, spec: &RenderSpec) -> Result<Option<PathBuf>> {
        Ok(self
            .source_path(spec)?
            .and_then(|file| file.parent().filter(|dir| dir.is_dir()).map(Path::to_path_buf)))
    }
}

fn log_context(renderer: Renderer, digest: &CacheDigest) -> String {
    let short = digest.as_str().get(..8).unwrap_or(digest.as_str());
    format!("{renderer} {short}")
}
