//! Print cache digests without rendering.

use anyhow::Result;
use clap::Args;

use super::common::{CommandContext, OptionArgs, read_request};
use crate::engine::GraphEngine;

#[derive(Args, Debug)]
pub struct DigestCommand {
    /// Renderer the source is meant for
    #[arg(short, long)]
    renderer: String,

    /// Source files; `-` reads stdin
    #[arg(required = true)]
    inputs: Vec<String>,

    #[command(flatten)]
    options: OptionArgs,

    /// Also print whether each digest is already cached
    #[arg(long)]
    status: bool,
}

impl DigestCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let engine = GraphEngine::from_config(&context.site_root, &context.config)?;
        let options = self.options.to_options();

        for input in &self.inputs {
            let request = read_request(&context.site_root, input, &self.renderer, &options).await?;
            let spec = engine.spec(request)?;
            let digest = engine.digest(&spec);

            if self.status {
                let cached = engine.cache().entry_path(&digest).is_file();
                println!("{digest}  {}  {input}", if cached { "cached" } else { "missing" });
            } else if self.inputs.len() > 1 {
                println!("{digest}  {input}");
            } else {
                println!("{digest}");
            }
        }
        Ok(())
    }
}
