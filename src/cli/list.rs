use std::{cmp::Ordering, path::Path};

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use nbkit::{LinkGraph, Note};
use serde::Serialize;
use tracing::instrument;

use super::{
    Session,
    terminal::{Colorize, is_narrow},
};

/// Command arguments for `nbkit list`.
#[derive(Debug, Parser)]
#[command(about = "List notes with the titles nb displays")]
pub struct List {
    /// Only notes under this folder (e.g. 'Project').
    #[arg(long)]
    folder: Option<String>,

    /// Only notes without a leading H1, which nb lists by file name.
    #[arg(long)]
    untitled: bool,

    /// Sort field (default: path).
    #[arg(long, value_enum, default_value_t)]
    sort: SortField,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,

    /// Limit number of rows returned.
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
enum SortField {
    #[default]
    Path,
    Title,
    /// Most recently modified first.
    Modified,
}

#[derive(Debug, Serialize)]
struct Entry {
    path: String,
    title: String,
    titled: bool,
    modified: Option<DateTime<Utc>>,
    links: usize,
    backlinks: usize,
    nb_refs: usize,
}

impl Entry {
    fn new(note: &Note, graph: &LinkGraph) -> Self {
        let path = note.link_key() + ".md";
        let (links, backlinks) = graph
            .find_by_path(&path)
            .map_or((0, 0), |node| {
                (graph.outgoing(node.id).len(), graph.backlinks(node.id).len())
            });
        Self {
            title: note.list_title(),
            titled: note.leading_title().is_some(),
            modified: note.modified(),
            links,
            backlinks,
            nb_refs: note.nb_refs().len(),
            path,
        }
    }
}

impl List {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, notebook: Option<&Path>) -> anyhow::Result<()> {
        let session = Session::open(notebook)?;
        let graph = session.notebook.graph();

        let prefix = self.folder.as_ref().map(|f| format!("{}/", f.trim_end_matches('/')));
        let mut entries: Vec<Entry> = session
            .notebook
            .notes()
            .iter()
            .map(|note| Entry::new(note, &graph))
            .filter(|entry| prefix.as_ref().is_none_or(|p| entry.path.starts_with(p)))
            .filter(|entry| !self.untitled || !entry.titled)
            .collect();

        entries.sort_by(|a, b| self.sort.compare(a, b));
        if let Some(limit) = self.limit {
            entries.truncate(limit);
        }

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Table => self.print_table(&entries),
        }
        Ok(())
    }

    fn print_table(&self, entries: &[Entry]) {
        if entries.is_empty() {
            if !self.quiet {
                println!("{}", "No matching notes.".dim());
            }
            return;
        }

        if self.quiet {
            for entry in entries {
                println!("{}\t{}", entry.path, entry.title);
            }
            return;
        }

        if is_narrow() {
            for entry in entries {
                println!("{}", title_cell(entry));
                println!("  {}", entry.path.dim());
            }
            return;
        }

        let width = entries
            .iter()
            .map(|e| e.path.chars().count())
            .max()
            .unwrap_or(0)
            .max("Path".len());
        println!("{:<width$}  {:<10}  {:>5}  Title", "Path", "Modified", "Links");
        for entry in entries {
            let modified = entry
                .modified
                .map_or_else(|| "-".to_string(), |m| m.format("%Y-%m-%d").to_string());
            println!(
                "{:<width$}  {:<10}  {:>5}  {}",
                entry.path,
                modified,
                entry.links + entry.backlinks,
                title_cell(entry)
            );
        }
        println!();
        println!("{}", format!("{} notes", entries.len()).dim());
    }
}

/// Titles that fell back to the file name are highlighted.
fn title_cell(entry: &Entry) -> String {
    if entry.titled {
        entry.title.clone()
    } else {
        entry.title.warning()
    }
}

impl SortField {
    fn compare(self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            Self::Path => a.path.cmp(&b.path),
            Self::Title => a
                .title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.path.cmp(&b.path)),
            Self::Modified => b
                .modified
                .cmp(&a.modified)
                .then_with(|| a.path.cmp(&b.path)),
        }
    }
}
