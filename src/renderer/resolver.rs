//! Executable resolution for renderers and the TeX output converter.
//!
//! By default a tool's executable is its own name, looked up on `PATH`. A
//! site may override any tool with `[executablePath, extraArgs...]`; the
//! extra arguments are inserted before the family's computed arguments.
//!
//! Availability is probed with a direct search-path lookup before anything
//! is spawned, so a missing tool is reported as
//! [`GraphError::MissingDependency`] rather than an opaque spawn failure.

use super::{Renderer, Tool};
use crate::core::GraphError;
use std::collections::HashMap;
use std::path::PathBuf;

/// A configured replacement for a tool's default executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOverride {
    /// Executable name or path
    pub program: String,
    /// Arguments placed before the computed arguments
    pub prefix: Vec<String>,
}

impl ToolOverride {
    /// Build from a `[program, prefix...]` configuration entry.
    pub fn from_entry(tool: Tool, entry: &[String]) -> Result<Self, GraphError> {
        let (program, prefix) = entry.split_first().ok_or_else(|| GraphError::ConfigError {
            message: format!("renderer override for '{tool}' must name an executable"),
        })?;
        if program.trim().is_empty() {
            return Err(GraphError::ConfigError {
                message: format!("renderer override for '{tool}' has an empty executable path"),
            });
        }
        Ok(Self {
            program: program.clone(),
            prefix: prefix.to_vec(),
        })
    }
}

/// A fully resolved invocation: executable plus every argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ResolvedCommand {
    /// Space-joined command line for logs.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Maps each [`Tool`] to the executable and argument prefix used to run it.
#[derive(Debug, Clone, Default)]
pub struct ExecutableResolver {
    overrides: HashMap<Tool, ToolOverride>,
}

impl ExecutableResolver {
    /// Resolver with no overrides: every tool runs under its own name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[renderers]` configuration table.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a String, &'a Vec<String>)>,
    ) -> Result<Self, GraphError> {
        let mut resolver = Self::new();
        for (name, entry) in entries {
            let tool: Tool = name.parse().map_err(|_| GraphError::ConfigError {
                message: format!("unknown renderer '{name}' in [renderers]"),
            })?;
            resolver.overrides.insert(tool, ToolOverride::from_entry(tool, entry)?);
        }
        Ok(resolver)
    }

    #[must_use]
    pub fn with_override(mut self, tool: Tool, tool_override: ToolOverride) -> Self {
        self.overrides.insert(tool, tool_override);
        self
    }

    /// Executable name or path for `tool`.
    pub fn program(&self, tool: Tool) -> &str {
        self.overrides.get(&tool).map_or_else(|| tool.name(), |o| o.program.as_str())
    }

    /// Configured prefix arguments for `tool`; empty when not overridden.
    pub fn prefix(&self, tool: Tool) -> &[String] {
        self.overrides.get(&tool).map(|o| o.prefix.as_slice()).unwrap_or_default()
    }

    /// Full command line: program, configured prefix, then `args`.
    pub fn command(&self, tool: Tool, args: impl IntoIterator<Item = String>) -> ResolvedCommand {
        let mut all = self.prefix(tool).to_vec();
        all.extend(args);
        ResolvedCommand {
            program: self.program(tool).to_string(),
            args: all,
        }
    }

    /// Look `tool` up on the search path (or check the configured path).
    pub fn locate(&self, tool: Tool) -> Option<PathBuf> {
        which::which(self.program(tool)).ok()
    }

    /// Locate `tool`, failing with [`GraphError::MissingDependency`] naming
    /// both the tool and the renderer that needed it.
    pub fn ensure_available(&self, tool: Tool, renderer: Renderer) -> Result<PathBuf, GraphError> {
        self.locate(tool).ok_or_else(|| {
            tracing::warn!(
                target: "graphsvg::renderer",
                "Executable '{}' for {} not found",
                self.program(tool),
                tool
            );
            GraphError::MissingDependency {
                tool: tool.name().to_string(),
                renderer: renderer.name().to_string(),
            }
        })
    }
}
