//! Tooling for nb-managed Markdown notebooks.
//!
//! Notes are Markdown files in a directory managed by the `nb` CLI. This
//! crate reads them, builds the graph of links between them, checks them
//! against the notebook's conventions, and rewrites links into the
//! `[[Title]] (nb N)` house style. It also provides a codec for the
//! starting-position notation used in the game design notes.

pub mod domain;
pub use domain::{Config, IdIndex, LinkGraph, NbId, Note, Position};

/// Filesystem storage and access to the `nb` command.
pub mod storage;
pub use storage::{NbCli, Notebook};

/// Checks notes against the notebook's formatting conventions.
pub mod check;
