use std::path::Path;

use clap::Parser;
use nbkit::LinkGraph;
use serde_json::json;
use tracing::instrument;

use super::{
    Session,
    terminal::{Colorize, is_narrow},
};

const MAX_LISTED: usize = 5;

#[derive(Debug, Parser, Default)]
#[command(about = "Show note, link and orphan counts")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, notebook: Option<&Path>) -> anyhow::Result<()> {
        let session = Session::open(notebook)?;
        let graph = session.notebook.graph();
        let hub_threshold = session.config.hub_threshold();

        if graph.nodes().is_empty() {
            println!(
                "No notes found in {}. Create one with 'nb add'.",
                session.notebook.root().display()
            );
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&graph, hub_threshold)?,
            OutputFormat::Table if self.quiet => Self::output_quiet(&graph),
            OutputFormat::Table => Self::output_table(&graph, hub_threshold),
        }
        Ok(())
    }

    fn output_json(graph: &LinkGraph, hub_threshold: usize) -> anyhow::Result<()> {
        let hubs: Vec<_> = graph
            .hubs(hub_threshold)
            .into_iter()
            .map(|(node, links)| json!({ "path": node.path, "title": node.title, "links": links }))
            .collect();
        let orphans: Vec<&str> = graph.orphans().iter().map(|n| n.path.as_str()).collect();
        let broken: Vec<_> = graph
            .broken_links()
            .iter()
            .filter_map(|b| {
                let source = graph.node(b.source)?;
                Some(json!({ "source": source.path, "target": b.target }))
            })
            .collect();

        let output = json!({
            "notes": graph.nodes().len(),
            "links": graph.edge_count(),
            "folders": graph.folder_counts(),
            "orphans": orphans,
            "broken_links": broken,
            "hubs": hubs,
            "cycles": graph.cycles().len(),
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(graph: &LinkGraph) {
        println!(
            "notes={} links={} orphans={} broken={}",
            graph.nodes().len(),
            graph.edge_count(),
            graph.orphans().len(),
            graph.broken_links().len()
        );
    }

    fn output_table(graph: &LinkGraph, hub_threshold: usize) {
        let folders = graph.folder_counts();

        println!("Notebook");
        println!("{}", "────────".dim());
        if is_narrow() {
            for (folder, count) in &folders {
                println!("{folder}: {count}");
            }
        } else {
            println!("{:<24} Notes", "Folder");
            for (folder, count) in &folders {
                println!("{folder:<24} {count}");
            }
        }
        println!(
            "Total: {} notes, {} links",
            graph.nodes().len(),
            graph.edge_count()
        );
        println!();

        let orphans = graph.orphans();
        if orphans.is_empty() {
            println!("Orphans: {} ✅", "0".success());
        } else {
            println!("Orphans: {} ⚠️", orphans.len().to_string().warning());
            for node in orphans.iter().take(MAX_LISTED) {
                println!("  - {}", node.path);
            }
            if orphans.len() > MAX_LISTED {
                println!("  - ... and {} more", orphans.len() - MAX_LISTED);
            }
        }
        println!();

        let broken = graph.broken_links();
        if broken.is_empty() {
            println!("Broken links: {} ✅", "0".success());
        } else {
            println!("Broken links: {} ⚠️", broken.len().to_string().warning());
            println!("{}", "Run 'nbkit check' to list them.".dim());
        }
        println!();

        let hubs = graph.hubs(hub_threshold);
        println!("Hubs (≥ {hub_threshold} links): {}", hubs.len().to_string().info());
        for (node, links) in hubs.iter().take(MAX_LISTED) {
            println!("  - {} ({links})", node.title);
        }
    }
}
