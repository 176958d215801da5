use std::path::{Path, PathBuf};

mod annotate;
mod check;
mod frontmatter;
mod graph;
mod list;
mod position;
mod status;
mod terminal;

use annotate::Annotate;
use anyhow::Context;
use check::Check;
use clap::ArgAction;
use frontmatter::AddFrontmatter;
use graph::Graph;
use list::List;
use nbkit::{Config, NbCli, Notebook, storage::discover};
use position::PositionCommand;
use status::Status;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The notebook directory.
    ///
    /// When omitted, the notebook is taken from the config, then from
    /// $NB_DIR, then from `nb notebooks --paths`.
    #[arg(short, long, global = true)]
    notebook: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.notebook.as_deref())
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Summarise the notebook (default)
    Status(Status),

    /// List notes the way `nb list` titles them
    List(List),

    /// Export the link graph as JSON and an HTML viewer
    Graph(Graph),

    /// Add `(nb N)` ids after wikilinks
    ///
    /// Ids are looked up by title with `nb list`. Nothing is written unless
    /// --apply is given.
    Annotate(Annotate),

    /// Add a YAML frontmatter block with a title to notes that lack one
    Frontmatter(AddFrontmatter),

    /// Check notes against the formatting conventions
    ///
    /// Exits with status 1 when any issue is found.
    Check(Check),

    /// Parse and rewrite starting-position notation
    #[command(subcommand)]
    Position(PositionCommand),
}

impl Command {
    fn run(self, notebook: Option<&Path>) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(notebook)?,
            Self::List(command) => command.run(notebook)?,
            Self::Graph(command) => command.run(notebook)?,
            Self::Annotate(command) => command.run(notebook)?,
            Self::Frontmatter(command) => command.run(notebook)?,
            Self::Check(command) => command.run(notebook)?,
            Self::Position(command) => command.run()?,
        }
        Ok(())
    }
}

/// The layered config and the notebook it selects.
struct Session {
    config: Config,
    notebook: Notebook,
}

impl Session {
    fn open(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("failed to read the working directory")?;
        let config = Config::discover(&cwd);
        let nb = NbCli::new(config.nb_command());

        let root = discover(explicit, &config, &cwd, &nb)?;
        tracing::info!("using notebook {}", root.display());

        let notebook = Notebook::open(&root, &config.ignored_dirs())
            .with_context(|| format!("failed to load notebook {}", root.display()))?;

        Ok(Self { config, notebook })
    }

    fn nb(&self) -> NbCli {
        NbCli::new(self.config.nb_command())
    }
}

/// Asks before writing, unless `yes` is set.
fn confirm(prompt: &str, yes: bool) -> anyhow::Result<bool> {
    if yes {
        return Ok(true);
    }
    Ok(dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}
