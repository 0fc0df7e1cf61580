//! Multi-stage TeX rendering: source → DVI/XDV → SVG.
//!
//! Each render owns a [`TempDir`] that receives the engine's output
//! (`.dvi`/`.xdv`, `.log`, `.aux`, ...). The directory is removed when the
//! render returns, on every path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::{RenderPipeline, RendererCommand, log_context};
use crate::cache::digest::CacheDigest;
use crate::core::GraphError;
use crate::models::RenderSpec;
use crate::renderer::{
    Renderer, Tool, converter_arguments, renderer_arguments, tex_output_directory_arguments,
};

pub(super) async fn render(
    pipeline: &RenderPipeline,
    spec: &RenderSpec,
    digest: &CacheDigest,
) -> Result<Vec<u8>> {
    let renderer = spec.renderer();
    let resolver = pipeline.resolver();
    let engine = resolver.ensure_available(renderer.into(), renderer)?;
    let converter = resolver.ensure_available(Tool::Dvisvgm, renderer)?;

    let scratch = tempfile::Builder::new()
        .prefix("graphsvg-tex-")
        .tempdir()
        .context("Failed to create TeX scratch directory")?;
    tracing::trace!(target: "graphsvg::pipeline", "TeX scratch directory: {}", scratch.path().display());

    let source = prepare_source(pipeline, spec, digest, &scratch).await?;
    let working_dir = source
        .parent()
        .filter(|dir| dir.is_dir())
        .map_or_else(|| scratch.path().to_path_buf(), Path::to_path_buf);

    let mut engine_args = renderer_arguments(renderer, spec.options());
    engine_args.extend(tex_output_directory_arguments(renderer, scratch.path()));
    engine_args.push(source.display().to_string());
    let engine_command = resolver.command(renderer.into(), engine_args);

    let engine_output = RendererCommand::new(engine)
        .args(engine_command.args)
        .current_dir(&working_dir)
        .with_timeout(pipeline.timeout())
        .with_context(log_context(renderer, digest))
        .execute()
        .await?;

    // TeX reports errors on stdout; keep both streams together in the log
    let transcript = format!("{}{}", engine_output.stdout_text(), engine_output.stderr_text());
    if !transcript.trim().is_empty() {
        tracing::debug!(target: "graphsvg::pipeline", "{} output:\n{}", renderer, transcript.trim_end());
    }

    let intermediate = intermediate_path(renderer, &source, scratch.path())?;
    if !intermediate.is_file() {
        return Err(GraphError::conversion_failed(
            renderer.name(),
            format!(
                "failed to convert {} to {} ({})",
                source.display(),
                renderer.intermediate_extension(),
                engine_output.failure_reason()
            ),
        )
        .into());
    }

    let mut converter_args = converter_arguments();
    converter_args.push(intermediate.display().to_string());
    let converter_command = resolver.command(Tool::Dvisvgm, converter_args);

    let svg = RendererCommand::new(converter)
        .args(converter_command.args)
        .current_dir(scratch.path())
        .with_timeout(pipeline.timeout())
        .with_context(log_context(renderer, digest))
        .execute()
        .await?;

    if !svg.success() {
        return Err(GraphError::conversion_failed(
            renderer.name(),
            format!("dvisvgm exited with {}", svg.failure_reason()),
        )
        .into());
    }
    if svg.stdout.is_empty() {
        return Err(GraphError::EmptyRender {
            renderer: renderer.name().to_string(),
        }
        .into());
    }

    Ok(svg.stdout)
}

/// The `.tex` file the engine compiles.
///
/// A source read from an existing file is compiled in place; anything else is
/// written to `<digest>.tex` in the scratch directory.
async fn prepare_source(
    pipeline: &RenderPipeline,
    spec: &RenderSpec,
    digest: &CacheDigest,
    scratch: &TempDir,
) -> Result<PathBuf> {
    if let Some(path) = pipeline.source_path(spec)? {
        if path.is_file() {
            return Ok(path);
        }
        tracing::debug!(
            target: "graphsvg::pipeline",
            "Source file {} not found, compiling the supplied text instead",
            path.display()
        );
    }

    let path = scratch.path().join(format!("{digest}.tex"));
    tokio::fs::write(&path, spec.code())
        .await
        .with_context(|| format!("Failed to write TeX source: {}", path.display()))?;
    Ok(path)
}

/// Where the engine leaves its output for `source`.
fn intermediate_path(renderer: Renderer, source: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .ok_or_else(|| GraphError::conversion_failed(renderer.name(), "source file has no name"))?;
    Ok(output_dir.join(format!("{}.{}", stem.to_string_lossy(), renderer.intermediate_extension())))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::models::{OptionMap, RenderRequest};
    use crate::renderer::{ExecutableResolver, ToolOverride};
    use crate::test_utils::fake_tool;

    /// Engine that copies its source to `<outdir>/<stem>.<ext>` and records
    /// the output directory it was given in `outdir.txt`.
    fn engine_script(record: &Path, ext: &str) -> String {
        format!(
            r#"out=""; prev=""; src=""
for a in "$@"; do
  case "$a" in --output-directory=*) out="${{a#--output-directory=}}" ;; esac
  [ "$prev" = "-output-directory" ] && out="$a"
  prev="$a"; src="$a"
done
echo "$out" > "{record}"
echo "This is a fake TeX engine"
base=$(basename "$src" .tex)
[ -n "{ext}" ] && cp "$src" "$out/$base.{ext}"
exit 0
"#,
            record = record.display(),
        )
    }

    const CONVERTER: &str = r#"for a in "$@"; do last="$a"; done
printf '<svg>'; cat "$last"; printf '</svg>'"#;

    fn pipeline(temp: &TempDir, renderer: Renderer, engine: &str) -> RenderPipeline {
        let engine = fake_tool(temp.path(), renderer.name(), engine);
        let converter = fake_tool(temp.path(), "dvisvgm", CONVERTER);
        let resolver = ExecutableResolver::new()
            .with_override(
                renderer.into(),
                ToolOverride {
                    program: engine.display().to_string(),
                    prefix: Vec::new(),
                },
            )
            .with_override(
                Tool::Dvisvgm,
                ToolOverride {
                    program: converter.display().to_string(),
                    prefix: Vec::new(),
                },
            );
        RenderPipeline::new(resolver, temp.path())
    }

    async fn run(pipeline: &RenderPipeline, request: RenderRequest) -> Result<Vec<u8>> {
        let spec = request.into_spec(&OptionMap::new()).unwrap();
        let digest = CacheDigest::compute(&spec, pipeline.resolver());
        pipeline.render(&spec, &digest).await
    }

    fn recorded_dir(record: &Path) -> PathBuf {
        PathBuf::from(std::fs::read_to_string(record).unwrap().trim())
    }

    #[tokio::test]
    async fn test_tex_two_stage_render() {
        let temp = TempDir::new().unwrap();
        let record = temp.path().join("outdir.txt");
        let pipeline = pipeline(&temp, Renderer::Latex, &engine_script(&record, "dvi"));

        let svg = run(&pipeline, RenderRequest::new("latex", "  \\documentclass{standalone}  ")).await.unwrap();
        assert_eq!(svg, b"<svg>\\documentclass{standalone}</svg>");
        assert!(!recorded_dir(&record).exists());
    }

    #[tokio::test]
    async fn test_xelatex_uses_xdv() {
        let temp = TempDir::new().unwrap();
        let record = temp.path().join("outdir.txt");
        let pipeline = pipeline(&temp, Renderer::Xelatex, &engine_script(&record, "xdv"));

        let svg = run(&pipeline, RenderRequest::new("xelatex", "x")).await.unwrap();
        assert_eq!(svg, b"<svg>x</svg>");
    }

    #[tokio::test]
    async fn test_lualatex_output_directory_spelling() {
        let temp = TempDir::new().unwrap();
        let record = temp.path().join("outdir.txt");
        let pipeline = pipeline(&temp, Renderer::Lualatex, &engine_script(&record, "dvi"));

        let svg = run(&pipeline, RenderRequest::new("lualatex", "y")).await.unwrap();
        assert_eq!(svg, b"<svg>y</svg>");
    }

    #[tokio::test]
    async fn test_missing_dvi_is_conversion_failed_and_scratch_removed() {
        let temp = TempDir::new().unwrap();
        let record = temp.path().join("outdir.txt");
        // Engine "compiles" but leaves no intermediate file
        let pipeline = pipeline(&temp, Renderer::Pdflatex, &engine_script(&record, ""));

        let err = run(&pipeline, RenderRequest::new("pdflatex", "\\broken")).await.unwrap_err();
        let graph_error = GraphError::find(&err).unwrap();
        assert_eq!(graph_error.kind(), ErrorKind::ConversionFailed);
        assert!(graph_error.to_string().contains("dvi"));

        let scratch = recorded_dir(&record);
        assert!(scratch.to_string_lossy().contains("graphsvg-tex-"));
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn test_source_file_compiled_in_place() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("tex")).unwrap();
        std::fs::write(temp.path().join("tex/figure.tex"), "from disk").unwrap();
        let record = temp.path().join("outdir.txt");
        let pipeline = pipeline(&temp, Renderer::Tex, &engine_script(&record, "dvi"));

        let svg = run(&pipeline, RenderRequest::new("tex", "from disk").with_file("tex/figure.tex"))
            .await
            .unwrap();
        assert_eq!(svg, b"<svg>from disk</svg>");
        // The source file is left alone
        assert!(temp.path().join("tex/figure.tex").exists());
    }

    #[tokio::test]
    async fn test_source_file_under_relative_site_root() {
        let tools = TempDir::new().unwrap();
        let site = TempDir::new_in(".").unwrap();
        let cwd = std::env::current_dir().unwrap();
        let relative = site.path().strip_prefix(&cwd).unwrap_or(site.path());
        assert!(relative.is_relative());
        std::fs::create_dir_all(relative.join("tex")).unwrap();
        std::fs::write(relative.join("tex/fig.tex"), "relative root").unwrap();
        let record = tools.path().join("outdir.txt");
        let resolver = pipeline(&tools, Renderer::Latex, &engine_script(&record, "dvi")).resolver().clone();
        let pipeline = RenderPipeline::new(resolver, relative);

        let svg = run(&pipeline, RenderRequest::new("latex", "relative root").with_file("tex/fig.tex"))
            .await
            .unwrap();
        assert_eq!(svg, b"<svg>relative root</svg>");
    }

    #[tokio::test]
    async fn test_missing_engine() {
        let temp = TempDir::new().unwrap();
        let converter = fake_tool(temp.path(), "dvisvgm", CONVERTER);
        let resolver = ExecutableResolver::new()
            .with_override(
                Renderer::Latex.into(),
                ToolOverride {
                    program: temp.path().join("no-latex").display().to_string(),
                    prefix: Vec::new(),
                },
            )
            .with_override(
                Tool::Dvisvgm,
                ToolOverride {
                    program: converter.display().to_string(),
                    prefix: Vec::new(),
                },
            );
        let pipeline = RenderPipeline::new(resolver, temp.path());

        let err = run(&pipeline, RenderRequest::new("latex", "x")).await.unwrap_err();
        match GraphError::find(&err).unwrap() {
            GraphError::MissingDependency { tool, renderer } => {
                assert_eq!(tool, "latex");
                assert_eq!(renderer, "latex");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_converter() {
        let temp = TempDir::new().unwrap();
        let record = temp.path().join("outdir.txt");
        let engine = fake_tool(temp.path(), "latex", &engine_script(&record, "dvi"));
        let resolver = ExecutableResolver::new()
            .with_override(
                Renderer::Latex.into(),
                ToolOverride {
                    program: engine.display().to_string(),
                    prefix: Vec::new(),
                },
            )
            .with_override(
                Tool::Dvisvgm,
                ToolOverride {
                    program: temp.path().join("no-dvisvgm").display().to_string(),
                    prefix: Vec::new(),
                },
            );
        let pipeline = RenderPipeline::new(resolver, temp.path());

        let err = run(&pipeline, RenderRequest::new("latex", "x")).await.unwrap_err();
        match GraphError::find(&err).unwrap() {
            GraphError::MissingDependency { tool, renderer } => {
                assert_eq!(tool, "dvisvgm");
                assert_eq!(renderer, "latex");
            }
            other => panic!("unexpected error: {other}"),
        }
        // Nothing was spawned
        assert!(!record.exists());
    }
}
