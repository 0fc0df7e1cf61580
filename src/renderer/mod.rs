//! Renderer registry
//!
//! The closed set of renderers graphsvg knows how to drive, partitioned into
//! three families:
//!
//! | Family | Renderers |
//! |---|---|
//! | Graphviz | `dot neato twopi circo fdp sfdp patchwork` |
//! | TeX | `tex latex pdftex pdflatex xetex xelatex luatex lualatex` |
//! | Standalone | `mscgen plantuml shaape` |
//!
//! TeX-family renders go through a second executable, the DVI/XDV-to-SVG
//! converter `dvisvgm`, so executable resolution is keyed by [`Tool`] rather
//! than [`Renderer`].
//!
//! - [`arguments`] builds the deterministic per-variant argument lists
//! - [`resolver`] maps a [`Tool`] to an executable and probes for it

pub mod arguments;
pub mod resolver;

pub use arguments::{converter_arguments, renderer_arguments, tex_output_directory_arguments};
pub use resolver::{ExecutableResolver, ResolvedCommand, ToolOverride};

use crate::core::GraphError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Renderer family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Graphviz layout engines, all sharing the `-T svg` convention
    Graphviz,
    /// TeX engines, rendered through DVI/XDV and `dvisvgm`
    Tex,
    /// Single tools with their own conventions
    Standalone,
}

/// A supported renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    Dot,
    Neato,
    Twopi,
    Circo,
    Fdp,
    Sfdp,
    Patchwork,
    Tex,
    Latex,
    Pdftex,
    Pdflatex,
    Xetex,
    Xelatex,
    Luatex,
    Lualatex,
    Mscgen,
    Plantuml,
    Shaape,
}

impl Renderer {
    /// Every renderer, Graphviz first, then TeX, then standalone.
    pub const ALL: [Self; 18] = [
        Self::Dot,
        Self::Neato,
        Self::Twopi,
        Self::Circo,
        Self::Fdp,
        Self::Sfdp,
        Self::Patchwork,
        Self::Tex,
        Self::Latex,
        Self::Pdftex,
        Self::Pdflatex,
        Self::Xetex,
        Self::Xelatex,
        Self::Luatex,
        Self::Lualatex,
        Self::Mscgen,
        Self::Plantuml,
        Self::Shaape,
    ];

    /// Canonical lowercase name; also the default executable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Neato => "neato",
            Self::Twopi => "twopi",
            Self::Circo => "circo",
            Self::Fdp => "fdp",
            Self::Sfdp => "sfdp",
            Self::Patchwork => "patchwork",
            Self::Tex => "tex",
            Self::Latex => "latex",
            Self::Pdftex => "pdftex",
            Self::Pdflatex => "pdflatex",
            Self::Xetex => "xetex",
            Self::Xelatex => "xelatex",
            Self::Luatex => "luatex",
            Self::Lualatex => "lualatex",
            Self::Mscgen => "mscgen",
            Self::Plantuml => "plantuml",
            Self::Shaape => "shaape",
        }
    }

    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::Dot
            | Self::Neato
            | Self::Twopi
            | Self::Circo
            | Self::Fdp
            | Self::Sfdp
            | Self::Patchwork => Family::Graphviz,
            Self::Tex
            | Self::Latex
            | Self::Pdftex
            | Self::Pdflatex
            | Self::Xetex
            | Self::Xelatex
            | Self::Luatex
            | Self::Lualatex => Family::Tex,
            Self::Mscgen | Self::Plantuml | Self::Shaape => Family::Standalone,
        }
    }

    #[must_use]
    pub const fn is_tex(self) -> bool {
        matches!(self.family(), Family::Tex)
    }

    /// Title shown for an asset whose SVG carries no graph title.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Mscgen => "Mscgen",
            Self::Plantuml => "PlantUML",
            Self::Shaape => "Shaape",
            _ => match self.family() {
                Family::Graphviz => "Graphviz",
                _ => "TeX",
            },
        }
    }

    /// Extension of the intermediate file a TeX engine leaves behind.
    ///
    /// XeTeX engines write extended DVI (`.xdv`); everything else writes `.dvi`.
    /// Meaningless for non-TeX renderers.
    #[must_use]
    pub const fn intermediate_extension(self) -> &'static str {
        match self {
            Self::Xetex | Self::Xelatex => "xdv",
            _ => "dvi",
        }
    }
}

impl fmt::Display for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Renderer {
    type Err = GraphError;

    /// Case-insensitive lookup; anything outside the closed set is
    /// [`GraphError::InvalidRenderer`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|r| r.name() == wanted).ok_or_else(|| {
            GraphError::InvalidRenderer {
                name: s.to_string(),
            }
        })
    }
}

/// An executable graphsvg may invoke: a renderer or the TeX output converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Renderer(Renderer),
    /// DVI/XDV-to-SVG converter used by every TeX-family render
    Dvisvgm,
}

impl Tool {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Renderer(r) => r.name(),
            Self::Dvisvgm => "dvisvgm",
        }
    }

    /// Every tool, in registry order.
    pub fn all() -> impl Iterator<Item = Self> {
        Renderer::ALL.into_iter().map(Self::Renderer).chain(std::iter::once(Self::Dvisvgm))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Renderer> for Tool {
    fn from(renderer: Renderer) -> Self {
        Self::Renderer(renderer)
    }
}

impl FromStr for Tool {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("dvisvgm") {
            return Ok(Self::Dvisvgm);
        }
        s.parse().map(Self::Renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("DOT".parse::<Renderer>().unwrap(), Renderer::Dot);
        assert_eq!(" PlantUML ".parse::<Renderer>().unwrap(), Renderer::Plantuml);
    }

    #[test]
    fn test_unknown_renderer() {
        let err = "gnuplot".parse::<Renderer>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRenderer);
    }

    #[test]
    fn test_families() {
        let graphviz = Renderer::ALL.iter().filter(|r| r.family() == Family::Graphviz).count();
        let tex = Renderer::ALL.iter().filter(|r| r.is_tex()).count();
        assert_eq!(graphviz, 7);
        assert_eq!(tex, 8);
        assert_eq!(Renderer::Shaape.family(), Family::Standalone);
    }

    #[test]
    fn test_names_round_trip() {
        for renderer in Renderer::ALL {
            assert_eq!(renderer.name().parse::<Renderer>().unwrap(), renderer);
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Renderer::Sfdp.display_name(), "Graphviz");
        assert_eq!(Renderer::Lualatex.display_name(), "TeX");
        assert_eq!(Renderer::Plantuml.display_name(), "PlantUML");
    }

    #[test]
    fn test_intermediate_extension() {
        assert_eq!(Renderer::Xelatex.intermediate_extension(), "xdv");
        assert_eq!(Renderer::Xetex.intermediate_extension(), "xdv");
        assert_eq!(Renderer::Pdflatex.intermediate_extension(), "dvi");
        assert_eq!(Renderer::Tex.intermediate_extension(), "dvi");
    }

    #[test]
    fn test_tool_parse() {
        assert_eq!("dvisvgm".parse::<Tool>().unwrap(), Tool::Dvisvgm);
        assert_eq!("latex".parse::<Tool>().unwrap(), Tool::Renderer(Renderer::Latex));
        assert!("dvips".parse::<Tool>().is_err());
        assert_eq!(Tool::all().count(), 19);
    }

    #[test]
    fn test_serialize_lowercase() {
        let json = serde_json::to_string(&Renderer::Pdflatex).unwrap();
        assert_eq!(json, "\"pdflatex\"");
    }
}
