//! External asset representation: title, slug, destination and tag markup.
//!
//! An asset's location comes from two templates, `dirname` and `name`, in
//! which `%{hash}` expands to the cache digest and `%{slug}` to the slugified
//! title. With the defaults a graph lands at `/images/graphs/graphs-<hash>.svg`
//! under the destination root.
//!
//! Because the default name embeds the digest, an existing destination file
//! is known to hold the right bytes and [`ExternalAsset::write`] skips it.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

use super::inline;
use crate::cache::digest::CacheDigest;
use crate::core::GraphError;
use crate::models::{OutputFormat, RenderOptions};
use crate::utils::fs::atomic_write_async;

/// First `<title>` of the first `<g class="graph">`, namespaces ignored.
///
/// `None` when the SVG cannot be parsed or carries no such title.
pub fn extract_title(svg: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(svg).ok()?;
    let doc = inline::parse(text).ok()?;

    let graph = doc
        .descendants()
        .find(|node| node.tag_name().name() == "g" && node.attribute("class") == Some("graph"))?;
    let title = graph.children().find(|node| node.tag_name().name() == "title")?;

    let text: String = title.children().filter_map(|node| node.text()).collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Title for an asset: the SVG's own title, else `display_name`, else the digest.
pub fn resolve_title(svg: &[u8], display_name: Option<&str>, digest: &CacheDigest) -> String {
    extract_title(svg)
        .or_else(|| display_name.map(str::to_string))
        .unwrap_or_else(|| digest.to_string())
}

/// URL-safe slug: lowercase, runs of anything but letters, marks and digits
/// collapsed to `-`, no leading or trailing `-`.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let replaced = match Regex::new(r"[^\p{M}\p{L}\p{Nd}]+") {
        Ok(separators) => separators.replace_all(&lower, "-").into_owned(),
        Err(_) => lower,
    };
    replaced.trim_matches('-').to_string()
}

/// Expand `%{hash}` and `%{slug}` in `template`.
///
/// # Errors
///
/// [`GraphError::InvalidOption`] naming `option` for any other placeholder.
pub fn expand_template(option: &str, template: &str, hash: &str, slug: &str) -> Result<String> {
    let placeholder = Regex::new(r"%\{([^}]*)\}").context("Invalid placeholder pattern")?;

    if let Some(unknown) = placeholder
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .find(|name| !matches!(name.as_str(), "hash" | "slug"))
    {
        return Err(GraphError::invalid_option(
            option,
            format!("unknown placeholder '%{{{}}}' in '{template}'", unknown.as_str()),
        )
        .into());
    }

    Ok(placeholder
        .replace_all(template, |caps: &regex::Captures<'_>| match &caps[1] {
            "hash" => hash.to_string(),
            _ => slug.to_string(),
        })
        .into_owned())
}

/// Escape `value` for use inside a double-quoted HTML attribute or as text.
fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Whether [`ExternalAsset::write`] touched the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetWrite {
    Written,
    /// Destination already existed and its path embeds the digest
    Skipped,
}

/// A rendered graph exposed as a file plus the markup that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalAsset {
    pub title: String,
    pub slug: String,
    pub format: OutputFormat,
    /// Site-relative URL, e.g. `/images/graphs/graphs-<hash>.svg`
    pub url: String,
}

impl ExternalAsset {
    /// Compute title, slug and location for a graph.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidOption`] for an unknown template placeholder or a
    /// location that would escape the destination root.
    pub fn new(
        svg: &[u8],
        display_name: Option<&str>,
        digest: &CacheDigest,
        format: OutputFormat,
        options: &RenderOptions,
    ) -> Result<Self> {
        let title = resolve_title(svg, display_name, digest);
        let slug = slugify(&title);

        let dir = expand_template("dirname", &options.dirname, digest.as_str(), &slug)?;
        let name = expand_template("name", &options.name, digest.as_str(), &slug)?;
        if name.trim_matches('/').is_empty() {
            return Err(GraphError::invalid_option("name", "asset file name is empty").into());
        }
        let url = join_url(&dir, &name);

        if Path::new(&url).components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(GraphError::invalid_option("dirname", format!("'{url}' leaves the destination root")).into());
        }

        Ok(Self {
            title,
            slug,
            format,
            url,
        })
    }

    /// Where the asset lives under `destination_root`.
    pub fn destination(&self, destination_root: &Path) -> PathBuf {
        destination_root.join(self.url.trim_start_matches('/'))
    }

    /// Markup for the selected format; the bare URL for `url`/`uri`/`href`.
    pub fn markup(&self) -> String {
        let url = escape_html(&self.url);
        let title = escape_html(&self.title);
        match self.format {
            OutputFormat::Img => format!(r#"<img src="{url}" alt="{title}" title="{title}" />"#),
            OutputFormat::Object => format!(
                r#"<object data="{url}" type="image/svg+xml"><a href="{url}">{title}</a></object>"#
            ),
            OutputFormat::Embed => format!(r#"<embed src="{url}" type="image/svg+xml" />"#),
            OutputFormat::Iframe => format!(r#"<iframe src="{url}" sandbox="allow-scripts"></iframe>"#),
            OutputFormat::Url => self.url.clone(),
        }
    }

    /// Write `svg` to the destination unless it is already there.
    ///
    /// The write is skipped when the destination exists and its path embeds
    /// `digest`: digests are content-derived, so the file already holds
    /// these bytes. Empty `svg` is never written.
    pub async fn write(&self, destination_root: &Path, svg: &[u8], digest: &CacheDigest) -> Result<AssetWrite> {
        let path = self.destination(destination_root);

        if path.exists() && path.to_string_lossy().contains(digest.as_str()) {
            tracing::debug!(target: "graphsvg::output", "Asset up to date: {}", path.display());
            return Ok(AssetWrite::Skipped);
        }
        if svg.is_empty() {
            return Err(GraphError::Other {
                message: format!("refusing to write empty asset {}", path.display()),
            }
            .into());
        }

        atomic_write_async(&path, svg.to_vec())
            .await
            .with_context(|| format!("Failed to write asset: {}", path.display()))?;
        tracing::info!(target: "graphsvg::output", "Wrote {}", path.display());
        Ok(AssetWrite::Written)
    }
}

/// `File.join`-style join: exactly one `/` between non-empty parts.
fn join_url(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        if name.is_empty() { String::new() } else { format!("/{name}") }
    } else {
        format!("{dir}/{name}")
    }
}
