//! Shared helpers for graphsvg integration tests.
//!
//! [`TestSite`] is a throwaway site directory whose `graphs.toml` points
//! renderers at shell scripts, so tests run without Graphviz or TeX.

#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use graphsvg::config::GraphsConfig;
use graphsvg::engine::GraphEngine;
use graphsvg::test_utils::{init_test_logging, site_with_fake_tools};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fake Graphviz: logs its arguments, then wraps stdin in an SVG document
/// whose graph title is the first source line.
pub const GRAPHVIZ: &str = r#"echo "$@" >> "$(dirname "$0")/$(basename "$0").args"
read -r first
printf '<?xml version="1.0" encoding="UTF-8"?>\n<!-- fake graphviz -->\n'
printf '<svg xmlns="http://www.w3.org/2000/svg"><g class="graph"><title>%s</title></g></svg>\n' "$first""#;

/// Fake TeX engine: copies the source into the output directory as a DVI.
pub const TEX_ENGINE: &str = r#"out="."; prev=""; src=""
for a in "$@"; do
  [ "$prev" = "-output-directory" ] && out="$a"
  prev="$a"; src="$a"
done
echo "fake tex"
cp "$src" "$out/$(basename "$src" .tex).dvi""#;

/// Fake dvisvgm: wraps the intermediate file in an SVG element.
pub const DVISVGM: &str = r#"for a in "$@"; do last="$a"; done
printf '<svg xmlns="http://www.w3.org/2000/svg"><text>'
cat "$last"
printf '</text></svg>'"#;

/// Script that always fails like a renderer rejecting its input.
pub const FAILING: &str = r#"cat > /dev/null
echo "syntax error in line 1" >&2
exit 3"#;

/// A temporary site with fake renderers configured.
pub struct TestSite {
    _temp: TempDir,
    root: PathBuf,
}

impl TestSite {
    /// Site whose `graphs.toml` maps each `(tool, script)` pair and then
    /// appends `extra` above the `[renderers]` table.
    pub fn new(tools: &[(&str, &str)], extra: &str) -> Result<Self> {
        init_test_logging(None);
        let temp = TempDir::new()?;
        let root = temp.path().to_path_buf();
        site_with_fake_tools(&root, tools, extra);
        Ok(Self {
            _temp: temp,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn engine(&self) -> Result<GraphEngine> {
        let config = GraphsConfig::load(&self.root, None).await?;
        GraphEngine::from_config(&self.root, &config)
    }

    /// Write a source file relative to the site root.
    pub fn write_source(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Argument lines logged by a fake tool, one per run.
    pub fn recorded_args(&self, tool: &str) -> Vec<String> {
        std::fs::read_to_string(self.root.join("fake-bin").join(format!("{tool}.args")))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// `graphsvg` invocation rooted at this site, with colors off.
    pub fn graphsvg(&self) -> Command {
        let mut cmd = Command::cargo_bin("graphsvg").expect("graphsvg binary");
        cmd.current_dir(&self.root).env("NO_COLOR", "1").env_remove("GRAPHSVG_CONFIG").env_remove("RUST_LOG");
        cmd
    }

    /// Number of entries in the site cache.
    pub fn cache_entries(&self) -> usize {
        std::fs::read_dir(self.root.join(".graphs-cache"))
            .map(|dir| dir.filter_map(Result::ok).filter(|e| e.path().extension().is_some_and(|x| x == "svg")).count())
            .unwrap_or(0)
    }
}
