//! End-to-end render flow
//!
//! [`GraphEngine`] ties the pieces together for one site:
//!
//! ```text
//! RenderRequest ──▶ RenderSpec ──▶ CacheDigest ──▶ ContentCache ──hit──▶ RenderedGraph
//!                                       │              │miss
//!                                       │              ▼
//!                                  RenderLocks    RenderPipeline ──▶ store ──▶ RenderedGraph
//!                                                                                  │
//!                                                   inline SVG  ◀── format? ──▶  asset + write
//! ```
//!
//! Validation (renderer name, option types, format) happens before any lock
//! is taken or process spawned. A render for a digest holds that digest's
//! lock from the cache check until the result is stored, so concurrent
//! identical requests through one engine render once.
//!
//! The engine is cheap to share: wrap it in an `Arc` and call
//! [`GraphEngine::render`] from as many tasks as needed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cache::{CacheDigest, ContentCache, RenderLocks};
use crate::config::GraphsConfig;
use crate::models::{OptionMap, RenderOptions, RenderRequest, RenderSpec};
use crate::output::{AssetWrite, RenderSummary, Rendered, RenderedGraph};
use crate::pipeline::RenderPipeline;

/// Renders requests for one site through its cache.
#[derive(Debug, Clone)]
pub struct GraphEngine {
    pipeline: RenderPipeline,
    cache: ContentCache,
    locks: RenderLocks,
    site_defaults: OptionMap,
    destination: PathBuf,
}

/// Everything produced for one request.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub graph: RenderedGraph,
    pub options: RenderOptions,
    pub rendered: Rendered,
    /// Set for asset output
    pub write: Option<AssetWrite>,
    /// Absolute asset path, for asset output
    pub path: Option<PathBuf>,
}

impl RenderOutcome {
    pub fn summary(&self) -> RenderSummary {
        RenderSummary {
            renderer: self.graph.renderer(),
            digest: self.graph.digest().clone(),
            title: self.graph.title(),
            url: self.rendered.url().cloned(),
            output: self.rendered.output(),
            cached: self.graph.cached(),
            write: self.write,
            options: self.options.clone(),
        }
    }
}

impl GraphEngine {
    /// Engine over `pipeline` and `cache`, with no site option defaults and
    /// assets written under `<site_root>/_site`.
    pub fn new(pipeline: RenderPipeline, cache: ContentCache) -> Self {
        let destination = GraphsConfig::default().destination(pipeline.site_root());
        Self {
            pipeline,
            cache,
            locks: RenderLocks::new(),
            site_defaults: OptionMap::new(),
            destination,
        }
    }

    /// Engine for `site_root` configured by `config`.
    pub fn from_config(site_root: &Path, config: &GraphsConfig) -> Result<Self> {
        let pipeline =
            RenderPipeline::new(config.resolver()?, site_root).with_timeout(Some(config.timeout()));
        let cache = ContentCache::for_site(site_root, config.cache_dir.as_deref());

        Ok(Self::new(pipeline, cache)
            .with_site_defaults(config.option_defaults())
            .with_destination(config.destination(site_root)))
    }

    /// Option defaults applied under every request's own options.
    #[must_use]
    pub fn with_site_defaults(mut self, defaults: OptionMap) -> Self {
        self.site_defaults = defaults;
        self
    }

    /// Root directory assets are written under.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    pub const fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub const fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Validate `request` against the closed renderer set and option types.
    pub fn spec(&self, request: RenderRequest) -> Result<RenderSpec> {
        Ok(request.into_spec(&self.site_defaults)?)
    }

    /// Cache digest of `spec`. Pure: no filesystem access, no processes.
    pub fn digest(&self, spec: &RenderSpec) -> CacheDigest {
        CacheDigest::compute(spec, self.pipeline.resolver())
    }

    /// SVG for `spec`, from the cache or a fresh render (which is then cached).
    pub async fn render_spec(&self, spec: &RenderSpec) -> Result<RenderedGraph> {
        let renderer = spec.renderer();
        let digest = self.digest(spec);
        let _guard = self.locks.acquire(&digest).await;

        if let Some(svg) = self.cache.read(&digest).await? {
            return Ok(RenderedGraph::new(renderer, digest, svg, true));
        }

        let svg = self.pipeline.render(spec, &digest).await.with_context(|| match spec.source().file() {
            Some(file) => format!("Failed to render {}", file.display()),
            None => format!("Failed to render inline {renderer} diagram"),
        })?;

        // A cache that cannot be written only costs a re-render next time
        if let Err(e) = self.cache.write(&digest, &svg).await {
            tracing::warn!(target: "graphsvg::engine", "Could not cache {}: {:#}", digest, e);
        }

        Ok(RenderedGraph::new(renderer, digest, svg, false))
    }

    /// Full request: validate, render or fetch, format, and write the asset
    /// when the format asks for one.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderOutcome> {
        let spec = self.spec(request)?;
        let graph = self.render_spec(&spec).await?;
        let options = spec.options().clone();
        let rendered = graph.represent(&options)?;

        let (write, path) = match &rendered {
            Rendered::Inline(_) => (None, None),
            Rendered::Asset(asset) => {
                let write = asset.write(&self.destination, graph.svg(), graph.digest()).await?;
                (Some(write), Some(asset.destination(&self.destination)))
            }
        };

        tracing::debug!(
            target: "graphsvg::engine",
            "Rendered {} {} (cached: {})",
            graph.renderer(),
            graph.digest(),
            graph.cached()
        );

        Ok(RenderOutcome {
            graph,
            options,
            rendered,
            write,
            path,
        })
    }
}
