//! Output formatting
//!
//! A [`RenderedGraph`] wraps the SVG bytes of one render together with its
//! digest. It is handed back to the caller as one of two representations:
//!
//! - **inline** ([`inline`]): the root `<svg>` element without prolog or comments
//! - **external asset** ([`asset`]): a file under the destination root, plus
//!   the `<img>`/`<object>`/`<embed>`/`<iframe>` markup or bare URL that
//!   references it
//!
//! Which one is chosen by the `format` option: absent means inline.

pub mod asset;
pub mod inline;

use anyhow::Result;
use serde::Serialize;

use crate::cache::digest::CacheDigest;
use crate::models::{OutputFormat, RenderOptions};
use crate::renderer::Renderer;

pub use asset::{AssetWrite, ExternalAsset};

/// SVG produced for one request, fresh or from the cache.
#[derive(Debug, Clone)]
pub struct RenderedGraph {
    renderer: Renderer,
    digest: CacheDigest,
    svg: Vec<u8>,
    cached: bool,
}

impl RenderedGraph {
    pub const fn new(renderer: Renderer, digest: CacheDigest, svg: Vec<u8>, cached: bool) -> Self {
        Self {
            renderer,
            digest,
            svg,
            cached,
        }
    }

    pub const fn renderer(&self) -> Renderer {
        self.renderer
    }

    pub const fn digest(&self) -> &CacheDigest {
        &self.digest
    }

    /// Raw SVG exactly as the renderer wrote it.
    pub fn svg(&self) -> &[u8] {
        &self.svg
    }

    /// Whether the bytes came from the content cache.
    pub const fn cached(&self) -> bool {
        self.cached
    }

    /// Title used for asset markup, with the renderer family fallback.
    pub fn title(&self) -> String {
        asset::resolve_title(&self.svg, Some(self.renderer.display_name()), &self.digest)
    }

    pub fn slug(&self) -> String {
        asset::slugify(&self.title())
    }

    /// Root `<svg>` element for embedding in a page.
    pub fn inline_svg(&self) -> Result<String> {
        inline::filter_for_inline(self.renderer, &self.svg)
    }

    /// External asset description for `format`, located by `options`.
    pub fn asset(&self, format: OutputFormat, options: &RenderOptions) -> Result<ExternalAsset> {
        ExternalAsset::new(&self.svg, Some(self.renderer.display_name()), &self.digest, format, options)
    }

    /// The representation `options.format` asks for.
    pub fn represent(&self, options: &RenderOptions) -> Result<Rendered> {
        match options.format {
            None => Ok(Rendered::Inline(self.inline_svg()?)),
            Some(format) => Ok(Rendered::Asset(self.asset(format, options)?)),
        }
    }
}

/// What the caller gets back for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Filtered SVG markup
    Inline(String),
    /// A file to write plus the markup that references it
    Asset(ExternalAsset),
}

impl Rendered {
    /// Text to place in the page: inline SVG, tag markup or bare URL.
    pub fn output(&self) -> String {
        match self {
            Self::Inline(svg) => svg.clone(),
            Self::Asset(asset) => asset.markup(),
        }
    }

    pub const fn url(&self) -> Option<&String> {
        match self {
            Self::Inline(_) => None,
            Self::Asset(asset) => Some(&asset.url),
        }
    }
}

/// Serializable description of a finished render, as exposed to templates
/// and printed by `graphsvg render --json`.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub renderer: Renderer,
    pub digest: CacheDigest,
    pub title: String,
    /// Site-relative asset URL; absent for inline output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Inline SVG, tag markup or URL
    pub output: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<AssetWrite>,
    /// Effective options after defaults were applied
    pub options: RenderOptions,
}
