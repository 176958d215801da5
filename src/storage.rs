/// Markdown frontmatter and code-block handling.
pub mod markdown;
/// Access to the external `nb` command.
pub mod nb_cli;
pub mod notebook;

pub use markdown::Frontmatter;
pub use nb_cli::{NbCli, NbCliError, NbSource};
pub use notebook::{DiscoverError, Notebook, NotebookError, discover};
