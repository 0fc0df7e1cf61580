//! Per-renderer argument construction.
//!
//! Arguments are a pure function of the renderer variant and its typed
//! options. The lists built here feed both the process invocation and the
//! cache digest, so two specs that render identically must produce
//! byte-identical lists: options are read in a fixed order and floats are
//! always formatted the same way.

use super::{Family, Renderer};
use crate::constants::{DEFAULT_ENCODING, DEFAULT_SCALE};
use crate::models::RenderOptions;
use std::path::Path;

/// Graphviz sizes are in points; a scale of 1.0 is 72pt per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// Arguments for one renderer invocation, excluding the executable and any
/// configured prefix.
#[must_use]
pub fn renderer_arguments(renderer: Renderer, options: &RenderOptions) -> Vec<String> {
    match renderer.family() {
        Family::Graphviz => graphviz_arguments(options),
        Family::Tex => tex_arguments(renderer),
        Family::Standalone => match renderer {
            Renderer::Mscgen => mscgen_arguments(),
            Renderer::Plantuml => plantuml_arguments(options),
            _ => shaape_arguments(options),
        },
    }
}

/// Arguments for the DVI/XDV-to-SVG converter, excluding the input file.
///
/// Tight bounding box, clip-path joining, no embedded fonts, SVG on stdout.
#[must_use]
pub fn converter_arguments() -> Vec<String> {
    ["-b", "min", "-j", "--no-fonts", "-s"].map(String::from).to_vec()
}

/// Arguments that send a TeX engine's output files into `dir`.
///
/// LuaTeX only understands the GNU-style `--flag=value` spelling.
#[must_use]
pub fn tex_output_directory_arguments(renderer: Renderer, dir: &Path) -> Vec<String> {
    if is_luatex(renderer) {
        vec![format!("--output-directory={}", dir.display())]
    } else {
        vec!["-output-directory".to_string(), dir.display().to_string()]
    }
}

fn is_scaled(options: &RenderOptions) -> bool {
    (options.scale - DEFAULT_SCALE).abs() > f64::EPSILON
}

fn format_float(value: f64) -> String {
    format!("{value:?}")
}

fn graphviz_arguments(options: &RenderOptions) -> Vec<String> {
    let mut args = vec!["-T".to_string(), "svg".to_string()];

    if is_scaled(options) {
        args.push("-s".to_string());
        args.push(format_float(options.scale * POINTS_PER_INCH));
    }
    if let Some(dpi) = options.dpi {
        args.push(format!("-Gdpi={dpi}"));
    }
    if options.invert_y {
        args.push("-y".to_string());
    }

    args
}

fn mscgen_arguments() -> Vec<String> {
    ["-T", "svg", "-o", "/dev/stdout"].map(String::from).to_vec()
}

fn shaape_arguments(options: &RenderOptions) -> Vec<String> {
    let mut args = vec!["-t".to_string(), "svg".to_string()];

    if is_scaled(options) {
        args.push("-s".to_string());
        args.push(format_float(options.scale));
    }
    args.extend(["-o", "/dev/stdout", "-"].map(String::from));

    args
}

fn plantuml_arguments(options: &RenderOptions) -> Vec<String> {
    let mut args = vec!["-tsvg".to_string()];

    if !options.encoding.eq_ignore_ascii_case(DEFAULT_ENCODING) {
        args.push("-charset".to_string());
        args.push(options.encoding.clone());
    }
    // Pipe mode: read stdin, write stdout, never open a GUI
    args.push("-p".to_string());

    args
}

const fn is_luatex(renderer: Renderer) -> bool {
    matches!(renderer, Renderer::Luatex | Renderer::Lualatex)
}

fn tex_arguments(renderer: Renderer) -> Vec<String> {
    let mut args = vec!["--interaction=nonstopmode".to_string()];

    match renderer {
        Renderer::Pdftex | Renderer::Pdflatex => {
            args.extend(["-output-format", "dvi"].map(String::from));
        }
        Renderer::Luatex | Renderer::Lualatex => args.push("--output-format=dvi".to_string()),
        Renderer::Xetex | Renderer::Xelatex => args.push("-no-pdf".to_string()),
        _ => {}
    }

    // Diagram source must never reach \write18
    if is_luatex(renderer) {
        args.extend(["--no-shell-escape", "--nosocket", "--safer"].map(String::from));
    } else {
        args.push("-no-shell-escape".to_string());
    }

    args
}
