use std::path::Path;

use anyhow::Context;
use clap::Parser;
use nbkit::{
    Note,
    storage::{
        Frontmatter,
        markdown::{title_from_stem, with_frontmatter},
    },
};
use tracing::instrument;

use super::{Session, confirm, terminal::Colorize};

#[derive(Debug, Parser)]
pub struct AddFrontmatter {
    /// Write the changes. Without this, only a preview is shown.
    #[arg(long)]
    apply: bool,

    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

impl AddFrontmatter {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, notebook: Option<&Path>) -> anyhow::Result<()> {
        let mut session = Session::open(notebook)?;

        let mut pending = Vec::new();
        for (i, note) in session.notebook.notes().iter().enumerate() {
            if let Err(e) = Frontmatter::parse(note.content()) {
                tracing::warn!("invalid frontmatter in {}: {e}", note.path().display());
                continue;
            }
            let title = frontmatter_title(note);
            let rendered = with_frontmatter(note.content(), &title).with_context(|| {
                format!("failed to render frontmatter for {}", note.path().display())
            })?;
            if let Some(content) = rendered {
                println!("{}  title: {title}", note.path().display().to_string().info());
                pending.push((i, content));
            }
        }

        if pending.is_empty() {
            println!("{}", "✅ Every note has frontmatter".success());
            return Ok(());
        }

        if !self.apply {
            println!(
                "{}",
                format!("Would add frontmatter to {} notes", pending.len()).dim()
            );
            println!("{}", "Re-run with --apply to write the changes.".dim());
            return Ok(());
        }

        if !confirm(
            &format!("Add frontmatter to {} notes?", pending.len()),
            self.yes,
        )? {
            println!("Cancelled");
            return Ok(());
        }

        let count = pending.len();
        for (i, content) in pending {
            session.notebook.notes_mut()[i].set_content(content);
            session.notebook.write(&session.notebook.notes()[i])?;
        }

        println!(
            "{}",
            format!("✅ Added frontmatter to {count} notes").success()
        );
        Ok(())
    }
}

/// The note's H1 title, or one derived from its file stem.
fn frontmatter_title(note: &Note) -> String {
    note.title().unwrap_or_else(|| {
        note.path()
            .file_stem()
            .map(|stem| title_from_stem(&stem.to_string_lossy()))
            .unwrap_or_default()
    })
}
