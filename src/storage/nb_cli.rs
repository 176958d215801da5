//! Thin wrapper around the external `nb` command.
//!
//! nbkit never modifies notes through `nb`; it only asks it for ids and
//! paths. Output parsing is kept separate from process handling so it can be
//! tested without `nb` installed.

use std::{
    path::PathBuf,
    process::Command,
    sync::LazyLock,
};

use regex::Regex;

use crate::domain::{IdIndex, NbId};

static LISTING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\s+(.+)$").expect("this must never fail"));

static FOLDER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\s+📂\s+(.+)$").expect("this must never fail"));

/// Errors running `nb`.
#[derive(Debug, thiserror::Error)]
pub enum NbCliError {
    /// The program could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// The program that was run.
        program: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("'{command}' failed ({status}): {stderr}")]
    Failed {
        /// The command line that was run.
        command: String,
        /// The exit status.
        status: std::process::ExitStatus,
        /// Captured standard error.
        stderr: String,
    },

    /// The program printed something that isn't a path.
    #[error("'{command}' printed no path")]
    NoPath {
        /// The command line that was run.
        command: String,
    },
}

/// Anything that can answer `nb` subcommands.
pub trait NbSource {
    /// Runs `nb` with `args` and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command can't be run or exits unsuccessfully.
    fn run(&self, args: &[&str]) -> Result<String, NbCliError>;
}

/// The `nb` executable.
#[derive(Debug, Clone)]
pub struct NbCli {
    program: String,
}

impl NbCli {
    /// Uses `program` as the `nb` executable.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NbCli {
    fn default() -> Self {
        Self::new("nb")
    }
}

impl NbSource for NbCli {
    fn run(&self, args: &[&str]) -> Result<String, NbCliError> {
        let command = format!("{} {}", self.program, args.join(" "));
        tracing::debug!("running {command}");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| NbCliError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(NbCliError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parses `nb list` output into `(id, title)` pairs.
///
/// Lines look like `[14] NB - Guide - Note Formatting` or
/// `[Project/2] Underchex - Hub`. Folder entries and lines whose id doesn't
/// parse are skipped.
#[must_use]
pub fn parse_listing(output: &str) -> Vec<(NbId, String)> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !FOLDER_LINE.is_match(line))
        .filter_map(|line| {
            let caps = LISTING_LINE.captures(line)?;
            let id = caps[1].parse().ok()?;
            Some((id, caps[2].trim().to_string()))
        })
        .collect()
}

/// Parses `nb ls -t folder` output into folder names.
#[must_use]
pub fn parse_folders(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter_map(|line| FOLDER_LINE.captures(line))
        .map(|caps| caps[2].trim().to_string())
        .collect()
}

/// Builds the title-to-id index from `nb list` for the notebook root and
/// every folder.
///
/// Titles of folder notes are keyed as `Folder/Title`. Failing to list
/// folders only loses folder notes; failing to list the root is an error.
///
/// # Errors
///
/// Returns an error if the root listing fails.
pub fn load_index(nb: &impl NbSource) -> Result<IdIndex, NbCliError> {
    let mut index = IdIndex::default();

    for (id, title) in parse_listing(&nb.run(&["list", "--no-color"])?) {
        index.insert(title, id);
    }

    let folders = match nb.run(&["ls", "-t", "folder", "--no-color"]) {
        Ok(output) => parse_folders(&output),
        Err(e) => {
            tracing::warn!("could not list folders: {e}");
            Vec::new()
        }
    };

    for folder in folders {
        let selector = format!("{folder}/");
        match nb.run(&["list", &selector, "--no-color"]) {
            Ok(output) => {
                for (id, title) in parse_listing(&output) {
                    index.insert(format!("{folder}/{title}"), id);
                }
            }
            Err(e) => tracing::warn!("could not list folder {folder}: {e}"),
        }
    }

    tracing::info!("indexed {} nb titles", index.len());
    Ok(index)
}

/// The notebook directories `nb notebooks --paths` reports.
///
/// # Errors
///
/// Returns an error if the command fails.
pub fn notebook_paths(nb: &impl NbSource) -> Result<Vec<PathBuf>, NbCliError> {
    Ok(nb
        .run(&["notebooks", "--paths"])?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// The file behind an nb id, from `nb show <id> --path`.
///
/// # Errors
///
/// Returns an error if the command fails or prints nothing.
pub fn note_path(nb: &impl NbSource, id: &NbId) -> Result<PathBuf, NbCliError> {
    let selector = id.to_string();
    let output = nb.run(&["show", &selector, "--path"])?;
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| NbCliError::NoPath {
            command: format!("nb show {selector} --path"),
        })
}
