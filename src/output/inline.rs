//! Inline SVG filtering.
//!
//! Renderers wrap their output in an XML prolog and doctype, and most embed
//! comments naming the tool version or generation time. For inline use only
//! the root `<svg>` element is kept, with every comment inside it removed.
//!
//! The document is parsed with `roxmltree`, which never resolves external
//! entities or fetches anything. The returned text is sliced from the
//! original source, so attribute quoting and whitespace are preserved
//! exactly.

use anyhow::Result;
use roxmltree::{Document, ParsingOptions};
use std::ops::Range;

use crate::core::GraphError;
use crate::renderer::Renderer;

/// Parse `svg` allowing a doctype, which every renderer emits.
pub(crate) fn parse(svg: &str) -> Result<Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(svg, options)
}

/// Root `<svg>` element of `svg` with all comments stripped.
///
/// # Errors
///
/// [`GraphError::ConversionFailed`] when the renderer output is not UTF-8,
/// not well-formed XML, or not rooted at an `svg` element.
pub fn filter_for_inline(renderer: Renderer, svg: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(svg)
        .map_err(|e| GraphError::conversion_failed(renderer.name(), format!("output is not UTF-8: {e}")))?;
    let doc = parse(text)
        .map_err(|e| GraphError::conversion_failed(renderer.name(), format!("output is not valid XML: {e}")))?;

    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(GraphError::conversion_failed(
            renderer.name(),
            format!("expected an <svg> root element, found <{}>", root.tag_name().name()),
        )
        .into());
    }

    let comments: Vec<Range<usize>> =
        root.descendants().filter(|node| node.is_comment()).map(|node| node.range()).collect();

    Ok(splice_out(text, root.range(), &comments))
}

/// `text[outer]` without the (ordered, non-overlapping) `holes`.
fn splice_out(text: &str, outer: Range<usize>, holes: &[Range<usize>]) -> String {
    let mut result = String::with_capacity(outer.len());
    let mut cursor = outer.start;
    for hole in holes {
        result.push_str(&text[cursor..hole.start]);
        cursor = hole.end;
    }
    result.push_str(&text[cursor..outer.end]);
    result
}
