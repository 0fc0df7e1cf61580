//! Report which renderers are installed.
//!
//! Every tool is looked up through the configured resolver, so overrides in
//! `graphs.toml` are honored. The command fails when any requested tool is
//! missing, which makes it usable as a CI precondition.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::common::CommandContext;
use crate::renderer::Tool;

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Only check these tools (renderer names or `dvisvgm`)
    tools: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ToolStatus {
    tool: String,
    command: String,
    path: Option<PathBuf>,
}

impl CheckCommand {
    pub fn execute(self, context: &CommandContext) -> Result<()> {
        let resolver = context.config.resolver()?;
        let tools: Vec<Tool> = if self.tools.is_empty() {
            Tool::all().collect()
        } else {
            self.tools.iter().map(|name| name.parse::<Tool>()).collect::<Result<_, _>>()?
        };

        let statuses: Vec<ToolStatus> = tools
            .into_iter()
            .map(|tool| ToolStatus {
                tool: tool.name().to_string(),
                command: resolver.command(tool, Vec::new()).display(),
                path: resolver.locate(tool),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        } else {
            for status in &statuses {
                match &status.path {
                    Some(path) => println!("{} {:<10} {}", "✓".green(), status.tool, path.display()),
                    None => println!(
                        "{} {:<10} {}",
                        "✗".red(),
                        status.tool,
                        format!("{} not found", status.command).dimmed()
                    ),
                }
            }
        }

        let missing = statuses.iter().filter(|s| s.path.is_none()).count();
        if missing > 0 {
            bail!("{missing} of {} tools not found", statuses.len());
        }
        Ok(())
    }
}
