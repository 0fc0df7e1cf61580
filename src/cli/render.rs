//! Render diagram sources.
//!
//! Each input (a file, or `-` for stdin) is rendered through the site's
//! engine. Inputs render concurrently; results are printed in argument order.
//! Inline output prints the filtered SVG, asset output prints the markup (or
//! bare URL) and writes the asset under the destination root.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use futures::future::join_all;
use std::path::PathBuf;

use super::common::{CommandContext, OptionArgs, read_request};
use crate::engine::{GraphEngine, RenderOutcome};
use crate::output::AssetWrite;

#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Renderer to use (dot, neato, latex, plantuml, ...)
    #[arg(short, long)]
    renderer: String,

    /// Source files; `-` reads stdin
    #[arg(required = true)]
    inputs: Vec<String>,

    #[command(flatten)]
    options: OptionArgs,

    /// Write assets under this directory instead of the configured destination
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Print a JSON array of render summaries
    #[arg(long)]
    json: bool,
}

impl RenderCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let mut engine = GraphEngine::from_config(&context.site_root, &context.config)?;
        if let Some(destination) = &self.destination {
            engine = engine.with_destination(destination);
        }

        let options = self.options.to_options();
        let renderer = self.renderer.as_str();
        let renders = self.inputs.iter().map(|input| {
            let engine = &engine;
            let options = &options;
            async move {
                let request = read_request(&context.site_root, input, renderer, options).await?;
                engine.render(request).await
            }
        });
        let outcomes = join_all(renders).await.into_iter().collect::<Result<Vec<_>>>()?;

        if self.json {
            let summaries: Vec<_> = outcomes.iter().map(RenderOutcome::summary).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            return Ok(());
        }

        for outcome in &outcomes {
            println!("{}", outcome.rendered.output());
            report_write(outcome);
        }
        Ok(())
    }
}

fn report_write(outcome: &RenderOutcome) {
    let (Some(write), Some(path)) = (outcome.write, &outcome.path) else {
        return;
    };
    match write {
        AssetWrite::Written => {
            eprintln!("{} {}", "Wrote".green(), path.display());
        }
        AssetWrite::Skipped => {
            tracing::info!("{} is up to date", path.display());
        }
    }
}
