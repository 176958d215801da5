//! `nbkit`: link graphs, convention checks and notation tooling for
//! nb-managed Markdown notebooks.

use clap::Parser;

mod cli;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
