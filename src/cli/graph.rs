use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use tracing::instrument;

use super::{Session, terminal::Colorize};

const DEFAULT_OUT_DIR: &str = "nb-visual";

#[derive(Debug, Parser)]
pub struct Graph {
    /// Output directory (default: `out_dir` from the config, else
    /// 'nb-visual').
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Write only graph.json, without the HTML viewer.
    #[arg(long)]
    json_only: bool,
}

impl Graph {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, notebook: Option<&Path>) -> anyhow::Result<()> {
        let session = Session::open(notebook)?;
        let graph = session.notebook.graph();

        let out_dir = self
            .out_dir
            .or_else(|| session.config.out_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;

        let json_path = out_dir.join("graph.json");
        fs::write(&json_path, graph.to_json()?)
            .with_context(|| format!("failed to write {}", json_path.display()))?;
        tracing::info!("wrote {}", json_path.display());

        if !self.json_only {
            let html_path = out_dir.join("index.html");
            fs::write(&html_path, graph.render_html()?)
                .with_context(|| format!("failed to write {}", html_path.display()))?;
            tracing::info!("wrote {}", html_path.display());
        }

        println!(
            "{}",
            format!(
                "✅ {} notes, {} links written to {}",
                graph.nodes().len(),
                graph.edge_count(),
                out_dir.display()
            )
            .success()
        );
        if !graph.broken_links().is_empty() {
            println!(
                "{}",
                format!("{} links did not resolve", graph.broken_links().len()).warning()
            );
        }
        Ok(())
    }
}
