use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    process,
};

use clap::{Parser, ValueEnum};
use nbkit::check::{Issue, IssueKind, check_notes};
use tracing::instrument;

use super::{
    Session,
    terminal::{Colorize, is_narrow},
};

#[derive(Debug, Parser)]
pub struct Check {
    /// Kinds of issue to check (comma-separated, default: all).
    #[arg(long, value_delimiter = ',', value_name = "KIND")]
    kind: Vec<Kind>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Kind {
    MissingTitle,
    PathLink,
    UnnumberedWikilink,
    BrokenWikilink,
}

impl From<Kind> for IssueKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::MissingTitle => Self::MissingTitle,
            Kind::PathLink => Self::PathLink,
            Kind::UnnumberedWikilink => Self::UnnumberedWikilink,
            Kind::BrokenWikilink => Self::BrokenWikilink,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    /// Counts per kind only.
    Summary,
}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, notebook: Option<&Path>) -> anyhow::Result<()> {
        let session = Session::open(notebook)?;
        let graph = session.notebook.graph();

        let kinds: BTreeSet<IssueKind> = if self.kind.is_empty() {
            IssueKind::ALL.into_iter().collect()
        } else {
            self.kind.iter().copied().map(IssueKind::from).collect()
        };

        let issues = check_notes(session.notebook.notes(), &graph, &kinds);
        tracing::debug!("{} issues across {} notes", issues.len(), graph.nodes().len());

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&issues)?),
            OutputFormat::Table => Self::output_table(&issues),
            OutputFormat::Summary => Self::output_summary(&issues, &kinds),
        }

        if !issues.is_empty() {
            process::exit(1);
        }
        Ok(())
    }

    fn output_table(issues: &[Issue]) {
        if issues.is_empty() {
            println!("{}", "✅ No issues found".success());
            return;
        }

        let narrow = is_narrow();
        let mut current = None;
        for issue in issues {
            if current != Some(&issue.path) {
                println!("{}", issue.path.display().to_string().info());
                current = Some(&issue.path);
            }
            if narrow {
                println!("  {}", issue.kind.to_string().error());
                println!("    {}", issue.message);
            } else {
                let kind = format!("{:<20}", issue.kind);
                println!("  {} {}", kind.error(), issue.message);
            }
        }
        println!();
        println!("{}", format!("⚠️  {} issues", issues.len()).warning());
    }

    fn output_summary(issues: &[Issue], kinds: &BTreeSet<IssueKind>) {
        let mut counts: BTreeMap<IssueKind, usize> = kinds.iter().map(|&k| (k, 0)).collect();
        for issue in issues {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        for (kind, count) in counts {
            let count = if count == 0 {
                count.to_string().success()
            } else {
                count.to_string().warning()
            };
            println!("{kind}: {count}");
        }
    }
}
