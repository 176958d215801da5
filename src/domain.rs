//! Domain models for notebook tooling.
//!
//! This module contains notes and their links, nb ids, the link graph,
//! configuration, and the starting-position notation.

mod config;
pub use config::{Config, ConfigError, REPO_CONFIG_FILE};

/// Link graph between notes.
pub mod graph;
pub use graph::LinkGraph;

/// Cross-note references and their rewriting.
pub mod link;

/// nb ids and the title-to-id index.
pub mod nb_id;
pub use nb_id::{Error as NbIdError, IdIndex, NbId};

mod note;
pub use note::Note;

pub mod position;
pub use position::{Position, PositionError, parse_position, serialize_position};
