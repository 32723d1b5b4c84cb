//! Pressmark CLI — format fetched documents into publish-ready markdown.
//!
//! Normalizes dates, resolves cover images, optionally adds an AI summary and
//! tags, and writes frontmatter + markdown files.

mod commands;
mod resolver;
mod source;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
