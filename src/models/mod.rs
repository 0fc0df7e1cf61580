//! Render request data model
//!
//! A caller (template tag, Markdown code block, the CLI) hands graphsvg a
//! [`RenderRequest`]: a renderer name, the diagram source, and a loose map of
//! options. Construction turns it into an immutable [`RenderSpec`]:
//!
//! - the renderer name is checked against the closed renderer set
//! - options are layered (built-in defaults, then site config, then request),
//!   coerced to their declared types, and unknown names are dropped
//! - the `format` option is parsed, so an unknown format fails here, before
//!   any process is spawned
//!
//! After construction every option is a plain field read on [`RenderOptions`].

use crate::constants::{DEFAULT_DIRNAME, DEFAULT_ENCODING, DEFAULT_NAME, DEFAULT_SCALE};
use crate::core::GraphError;
use crate::renderer::Renderer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// An untyped option value as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Option name to raw value. Ordered so debug output is stable.
pub type OptionMap = BTreeMap<String, OptionValue>;

/// How a rendered graph is handed back to the caller when it is written as
/// an external asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<img>` tag
    Img,
    /// `<object>` tag with a fallback link
    Object,
    /// `<embed>` tag
    Embed,
    /// Sandboxed `<iframe>` tag
    Iframe,
    /// The bare destination path (`url`, `uri` and `href` all select this)
    Url,
}

impl FromStr for OutputFormat {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "img" => Ok(Self::Img),
            "object" => Ok(Self::Object),
            "embed" => Ok(Self::Embed),
            "iframe" => Ok(Self::Iframe),
            "url" | "uri" | "href" => Ok(Self::Url),
            _ => Err(GraphError::InvalidFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Typed options for one render.
///
/// Only `encoding`, `scale`, `dpi` and `invert_y` reach the renderer command
/// line (and therefore the cache digest). `dirname`, `name` and `format` only
/// affect how the result is exposed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOptions {
    /// Source encoding, forwarded to PlantUML when not the default
    pub encoding: String,
    /// Scale factor; 1.0 emits no scale argument
    pub scale: f64,
    /// Graphviz output resolution
    pub dpi: Option<u32>,
    /// Graphviz `-y`
    pub invert_y: bool,
    /// Asset directory template
    pub dirname: String,
    /// Asset file name template
    pub name: String,
    /// `None` means inline SVG
    pub format: Option<OutputFormat>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            encoding: DEFAULT_ENCODING.to_string(),
            scale: DEFAULT_SCALE,
            dpi: None,
            invert_y: false,
            dirname: DEFAULT_DIRNAME.to_string(),
            name: DEFAULT_NAME.to_string(),
            format: None,
        }
    }
}

impl RenderOptions {
    /// Build options from layers of raw values applied over the built-in
    /// defaults; later layers win.
    ///
    /// Unknown option names are dropped. A known option whose value cannot be
    /// coerced fails with [`GraphError::InvalidOption`] (or
    /// [`GraphError::InvalidFormat`] for `format`).
    pub fn from_layers<'a>(
        layers: impl IntoIterator<Item = &'a OptionMap>,
    ) -> Result<Self, GraphError> {
        let mut options = Self::default();
        for layer in layers {
            for (key, value) in layer {
                options.apply(key, value)?;
            }
        }
        Ok(options)
    }

    fn apply(&mut self, key: &str, value: &OptionValue) -> Result<(), GraphError> {
        match key {
            "encoding" => self.encoding = coerce_text(key, value)?,
            "dirname" => self.dirname = coerce_text(key, value)?,
            "name" => self.name = coerce_text(key, value)?,
            "scale" => self.scale = coerce_scale(value)?,
            "dpi" => self.dpi = Some(coerce_dpi(value)?),
            "invert_y" => self.invert_y = coerce_flag(key, value)?,
            "format" => self.format = Some(value.to_string().parse()?),
            _ => tracing::trace!(target: "graphsvg::options", "Ignoring unknown option '{}'", key),
        }
        Ok(())
    }
}

/// Text option value. Control characters are rejected.
fn coerce_text(key: &str, value: &OptionValue) -> Result<String, GraphError> {
    let text = value.to_string();
    if let Some(c) = text.chars().find(|c| c.is_control()) {
        return Err(GraphError::invalid_option(key, format!("contains control character {c:?}")));
    }
    Ok(text)
}

fn coerce_scale(value: &OptionValue) -> Result<f64, GraphError> {
    let scale = match value {
        OptionValue::Float(x) => *x,
        OptionValue::Integer(i) => *i as f64,
        OptionValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| GraphError::invalid_option("scale", format!("'{s}' is not a number: {e}")))?,
        OptionValue::Flag(_) => {
            return Err(GraphError::invalid_option("scale", "expected a number, got a flag"));
        }
    };
    if !scale.is_finite() || scale <= 0.0 {
        return Err(GraphError::invalid_option("scale", format!("{scale} is not a positive number")));
    }
    Ok(scale)
}

fn coerce_dpi(value: &OptionValue) -> Result<u32, GraphError> {
    let raw = match value {
        OptionValue::Integer(i) => *i,
        OptionValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| GraphError::invalid_option("dpi", format!("'{s}' is not an integer: {e}")))?,
        other => {
            return Err(GraphError::invalid_option("dpi", format!("expected an integer, got '{other}'")));
        }
    };
    u32::try_from(raw)
        .ok()
        .filter(|dpi| *dpi > 0)
        .ok_or_else(|| GraphError::invalid_option("dpi", format!("{raw} is out of range")))
}

fn coerce_flag(name: &str, value: &OptionValue) -> Result<bool, GraphError> {
    match value {
        OptionValue::Flag(b) => Ok(*b),
        OptionValue::Integer(0) => Ok(false),
        OptionValue::Integer(1) => Ok(true),
        OptionValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(GraphError::invalid_option(name, format!("'{s}' is not a boolean"))),
        },
        other => Err(GraphError::invalid_option(name, format!("'{other}' is not a boolean"))),
    }
}

/// Diagram source text and, when it was read from disk, where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSource {
    text: String,
    file: Option<PathBuf>,
}

impl GraphSource {
    /// Source supplied inline (a block tag, a code block, stdin).
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            file: None,
        }
    }

    /// Source read from `file`, a path relative to the site root.
    pub fn from_file(text: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            file: Some(file.into()),
        }
    }

    /// Raw text, exactly as supplied.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// Immutable description of one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSpec {
    renderer: Renderer,
    options: RenderOptions,
    source: GraphSource,
}

impl RenderSpec {
    pub const fn new(renderer: Renderer, options: RenderOptions, source: GraphSource) -> Self {
        Self {
            renderer,
            options,
            source,
        }
    }

    pub const fn renderer(&self) -> Renderer {
        self.renderer
    }

    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub const fn source(&self) -> &GraphSource {
        &self.source
    }

    /// Source text with surrounding whitespace removed; this is what renderers
    /// receive and what the digest covers.
    pub fn code(&self) -> &str {
        self.source.text.trim()
    }
}

/// A render request as received from an adapter layer.
///
/// ```rust,no_run
/// use graphsvg::models::RenderRequest;
///
/// let request: RenderRequest = serde_json::from_str(
///     r#"{ "renderer": "dot", "source": "digraph { a -> b }", "options": { "format": "img", "scale": 2 } }"#,
/// ).unwrap();
/// assert_eq!(request.renderer, "dot");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Renderer name; checked against the closed set at construction
    pub renderer: String,
    /// Diagram source
    pub source: String,
    /// Site-relative path the source was read from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Raw options; unknown names are dropped
    #[serde(default)]
    pub options: OptionMap,
}

impl RenderRequest {
    pub fn new(renderer: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            renderer: renderer.into(),
            source: source.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Validate and type this request. `site_defaults` sits between the
    /// built-in defaults and the request's own options.
    pub fn into_spec(self, site_defaults: &OptionMap) -> Result<RenderSpec, GraphError> {
        let renderer: Renderer = self.renderer.parse()?;
        let options = RenderOptions::from_layers([site_defaults, &self.options])?;
        let source = match self.file {
            Some(file) => GraphSource::from_file(self.source, file),
            None => GraphSource::inline(self.source),
        };
        Ok(RenderSpec::new(renderer, options, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    fn map(pairs: &[(&str, OptionValue)]) -> OptionMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn test_defaults() {
        let options = RenderOptions::from_layers([]).unwrap();
        assert_eq!(options.encoding, "utf-8");
        assert_eq!(options.scale, 1.0);
        assert_eq!(options.name, "graphs-%{hash}.svg");
        assert_eq!(options.dirname, "/images/graphs");
        assert!(options.format.is_none());
    }

    #[test]
    fn test_later_layers_win() {
        let site = map(&[("scale", 2.0.into()), ("format", "img".into())]);
        let request = map(&[("scale", "3".into())]);
        let options = RenderOptions::from_layers([&site, &request]).unwrap();
        assert_eq!(options.scale, 3.0);
        assert_eq!(options.format, Some(OutputFormat::Img));
    }

    #[test]
    fn test_unknown_options_dropped() {
        let request = map(&[("colour", "red".into()), ("invert_y", "yes".into())]);
        let options = RenderOptions::from_layers([&request]).unwrap();
        assert!(options.invert_y);
    }

    #[test]
    fn test_invalid_values() {
        let bad_scale = map(&[("scale", "big".into())]);
        let err = RenderOptions::from_layers([&bad_scale]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);

        let zero_scale = map(&[("scale", 0.0.into())]);
        assert!(RenderOptions::from_layers([&zero_scale]).is_err());

        let bad_dpi = map(&[("dpi", (-3_i64).into())]);
        assert_eq!(RenderOptions::from_layers([&bad_dpi]).unwrap_err().kind(), ErrorKind::InvalidOption);

        let bad_flag = map(&[("invert_y", "maybe".into())]);
        assert!(RenderOptions::from_layers([&bad_flag]).is_err());
    }

    #[test]
    fn test_control_characters_in_text_options() {
        for key in ["encoding", "dirname", "name"] {
            let request = map(&[(key, "graphs\n-%{hash}.svg".into())]);
            match RenderOptions::from_layers([&request]).unwrap_err() {
                GraphError::InvalidOption { name, reason } => {
                    assert_eq!(name, key);
                    assert!(reason.contains("control character"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        let tab = map(&[("dirname", "/images\tgraphs".into())]);
        assert_eq!(RenderOptions::from_layers([&tab]).unwrap_err().kind(), ErrorKind::InvalidOption);

        let unicode = map(&[("name", "diagrämme-%{hash}.svg".into())]);
        assert_eq!(RenderOptions::from_layers([&unicode]).unwrap().name, "diagrämme-%{hash}.svg");
    }

    #[test]
    fn test_invalid_format() {
        let request = map(&[("format", "png".into())]);
        let err = RenderOptions::from_layers([&request]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_format_aliases() {
        for alias in ["url", "URI", "href"] {
            assert_eq!(alias.parse::<OutputFormat>().unwrap(), OutputFormat::Url);
        }
        assert_eq!("IFrame".parse::<OutputFormat>().unwrap(), OutputFormat::Iframe);
    }

    #[test]
    fn test_request_into_spec() {
        let spec = RenderRequest::new("Neato", "  graph { a -- b }\n\n")
            .with_file("graphs/a.dot")
            .with_option("dpi", 96_i64)
            .into_spec(&OptionMap::new())
            .unwrap();

        assert_eq!(spec.renderer(), Renderer::Neato);
        assert_eq!(spec.code(), "graph { a -- b }");
        assert_eq!(spec.options().dpi, Some(96));
        assert_eq!(spec.source().file(), Some(Path::new("graphs/a.dot")));
    }

    #[test]
    fn test_request_unknown_renderer() {
        let err = RenderRequest::new("gnuplot", "plot x").into_spec(&OptionMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRenderer);
    }

    #[test]
    fn test_request_deserialize_typed_values() {
        let request: RenderRequest = serde_json::from_str(
            r#"{"renderer":"dot","source":"x","options":{"invert_y":true,"dpi":72,"scale":1.5}}"#,
        )
        .unwrap();
        assert_eq!(request.options["invert_y"], OptionValue::Flag(true));
        assert_eq!(request.options["dpi"], OptionValue::Integer(72));
        assert_eq!(request.options["scale"], OptionValue::Float(1.5));
    }
}
