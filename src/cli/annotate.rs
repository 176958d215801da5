use std::path::{Path, PathBuf};

use clap::Parser;
use nbkit::{
    Note,
    domain::link::{Annotation, annotate_wikilinks},
    storage::nb_cli,
};
use tracing::instrument;

use super::{Session, confirm, terminal::Colorize};

#[derive(Debug, Parser)]
pub struct Annotate {
    /// Notes to annotate, relative to the notebook root (default: all).
    paths: Vec<PathBuf>,

    /// Write the changes. Without this, only a preview is shown.
    #[arg(long)]
    apply: bool,

    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

impl Annotate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, notebook: Option<&Path>) -> anyhow::Result<()> {
        let mut session = Session::open(notebook)?;
        let index = nb_cli::load_index(&session.nb())?;

        let pending: Vec<(usize, Annotation)> = session
            .notebook
            .notes()
            .iter()
            .enumerate()
            .filter(|(_, note)| self.selects(note))
            .map(|(i, note)| (i, annotate_wikilinks(note.content(), &index)))
            .collect();

        let mut unresolved = 0;
        let mut changes = 0;
        for (i, annotation) in &pending {
            let note = &session.notebook.notes()[*i];
            if annotation.is_changed() {
                println!("{}", note.path().display().to_string().info());
                for change in &annotation.changes {
                    println!("  {} → {}", change.before.dim(), change.after);
                }
            }
            for target in &annotation.unresolved {
                tracing::warn!("no nb id for [[{target}]] in {}", note.path().display());
            }
            changes += annotation.changes.len();
            unresolved += annotation.unresolved.len();
        }

        let changed: Vec<(usize, Annotation)> = pending
            .into_iter()
            .filter(|(_, annotation)| annotation.is_changed())
            .collect();

        if changed.is_empty() {
            println!("{}", "✅ Every resolvable wikilink already has an nb id".success());
            return Ok(());
        }

        let summary = format!("{changes} links in {} notes", changed.len());
        if unresolved > 0 {
            println!(
                "{}",
                format!("{unresolved} links have no matching nb title").warning()
            );
        }

        if !self.apply {
            println!("{}", format!("Would annotate {summary}").dim());
            println!("{}", "Re-run with --apply to write the changes.".dim());
            return Ok(());
        }

        if !confirm(&format!("Annotate {summary}?"), self.yes)? {
            println!("Cancelled");
            return Ok(());
        }

        for (i, annotation) in changed {
            session.notebook.notes_mut()[i].set_content(annotation.content);
            session.notebook.write(&session.notebook.notes()[i])?;
        }

        println!("{}", format!("✅ Annotated {summary}").success());
        Ok(())
    }

    fn selects(&self, note: &Note) -> bool {
        self.paths.is_empty() || self.paths.iter().any(|p| p == note.path())
    }
}
