//! A filesystem-backed notebook.
//!
//! A [`Notebook`] is a directory tree of Markdown notes. It is loaded in one
//! pass and notes are written back individually.

use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use walkdir::WalkDir;

use crate::{
    domain::{Config, LinkGraph, Note},
    storage::nb_cli::{self, NbSource},
};

/// Environment variable `nb` uses for its data directory.
pub const NB_DIR_ENV: &str = "NB_DIR";

/// Errors locating a notebook.
#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    /// An explicitly requested notebook path doesn't exist.
    #[error("notebook path {0} is not a directory")]
    NotADirectory(PathBuf),

    /// No candidate location exists.
    #[error("unable to locate an nb notebook; pass --notebook or set {NB_DIR_ENV}")]
    NotFound,
}

/// Errors loading or writing notes.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    /// The notebook root isn't a directory.
    #[error("notebook path {0} is not a directory")]
    NotADirectory(PathBuf),

    /// A note could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The note file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// Finds the notebook to operate on.
///
/// Candidates, in order:
///
/// 1. `explicit` (from the command line)
/// 2. `notebook_path` from the config
/// 3. `$NB_DIR/home`, or `$NB_DIR` itself if it has no `home` folder
/// 4. the first existing directory printed by `nb notebooks --paths`
/// 5. `.nb_docs_repo/home` under `cwd`
///
/// # Errors
///
/// Returns an error if an explicit or configured path is not a directory,
/// or if no candidate exists.
pub fn discover(
    explicit: Option<&Path>,
    config: &Config,
    cwd: &Path,
    nb: &impl NbSource,
) -> Result<PathBuf, DiscoverError> {
    let nb_dir = std::env::var_os(NB_DIR_ENV).map(PathBuf::from);
    discover_with(explicit, config, nb_dir.as_deref(), cwd, nb)
}

fn discover_with(
    explicit: Option<&Path>,
    config: &Config,
    nb_dir: Option<&Path>,
    cwd: &Path,
    nb: &impl NbSource,
) -> Result<PathBuf, DiscoverError> {
    if let Some(path) = explicit.or(config.notebook_path.as_deref()) {
        return if path.is_dir() {
            Ok(path.to_path_buf())
        } else {
            Err(DiscoverError::NotADirectory(path.to_path_buf()))
        };
    }

    if let Some(nb_dir) = nb_dir.filter(|dir| dir.is_dir()) {
        let home = nb_dir.join("home");
        let found = if home.is_dir() {
            home
        } else {
            nb_dir.to_path_buf()
        };
        tracing::debug!("using notebook from {NB_DIR_ENV}: {}", found.display());
        return Ok(found);
    }

    match nb_cli::notebook_paths(nb) {
        Ok(paths) => {
            if let Some(path) = paths.into_iter().find(|p| p.is_dir()) {
                tracing::debug!("using notebook reported by nb: {}", path.display());
                return Ok(path);
            }
        }
        Err(e) => tracing::debug!("nb could not report notebooks: {e}"),
    }

    let fallback = cwd.join(".nb_docs_repo").join("home");
    if fallback.is_dir() {
        return Ok(fallback);
    }

    Err(DiscoverError::NotFound)
}

/// A directory of Markdown notes.
#[derive(Debug, Clone)]
pub struct Notebook {
    root: PathBuf,
    notes: Vec<Note>,
}

impl Notebook {
    /// Loads every `*.md` file under `root`.
    ///
    /// Directories named in `ignore` are skipped, as is `.git`. Files that
    /// aren't valid UTF-8 are decoded lossily. Notes are sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory or a note can't be read.
    pub fn open(root: impl Into<PathBuf>, ignore: &[String]) -> Result<Self, NotebookError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(NotebookError::NotADirectory(root));
        }

        let paths = collect_markdown_paths(&root, ignore);
        tracing::debug!("found {} notes under {}", paths.len(), root.display());

        let mut notes = paths
            .par_iter()
            .map(|path| load_note(&root, path))
            .collect::<Result<Vec<_>, _>>()?;
        notes.sort_by(|a, b| a.path().cmp(b.path()));

        Ok(Self { root, notes })
    }

    /// The notebook root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All notes, sorted by path.
    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Mutable access to the loaded notes.
    pub fn notes_mut(&mut self) -> &mut [Note] {
        &mut self.notes
    }

    /// Finds a note by its path relative to the root.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&Note> {
        self.notes.iter().find(|note| note.path() == path)
    }

    /// Builds the link graph of the loaded notes.
    #[must_use]
    pub fn graph(&self) -> LinkGraph {
        LinkGraph::build(&self.root, &self.notes)
    }

    /// Writes a note's content back to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be written.
    pub fn write(&self, note: &Note) -> Result<(), NotebookError> {
        let path = self.root.join(note.path());
        std::fs::write(&path, note.content()).map_err(|source| NotebookError::Io { path, source })
    }
}

fn collect_markdown_paths(root: &Path, ignore: &[String]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !(entry.file_name() == ".git"
                    || ignore.iter().any(|name| entry.file_name() == OsStr::new(name)))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension() == Some(OsStr::new("md")))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn load_note(root: &Path, path: &Path) -> Result<Note, NotebookError> {
    let io_error = |source| NotebookError::Io {
        path: path.to_path_buf(),
        source,
    };

    let bytes = std::fs::read(path).map_err(io_error)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();

    let mut note = Note::new(relative, content);
    if let Ok(modified) = std::fs::metadata(path).and_then(|meta| meta.modified()) {
        note = note.with_modified(DateTime::<Utc>::from(modified));
    }
    Ok(note)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::storage::nb_cli::tests::FakeNb;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_markdown_sorted_and_skips_ignored() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.md", b"# B\n");
        write(tmp.path(), "a.md", b"# A\n");
        write(tmp.path(), "Project/plan.md", b"# Plan\n");
        write(tmp.path(), ".git/HEAD.md", b"# not a note\n");
        write(tmp.path(), "archive/old.md", b"# Old\n");
        write(tmp.path(), "image.png", b"\x89PNG");

        let notebook = Notebook::open(tmp.path(), &["archive".to_string()]).unwrap();
        let paths: Vec<&Path> = notebook.notes().iter().map(Note::path).collect();

        assert_eq!(
            paths,
            [
                Path::new("Project/plan.md"),
                Path::new("a.md"),
                Path::new("b.md")
            ]
        );
        assert!(notebook.notes().iter().all(|note| note.modified().is_some()));
        assert_eq!(notebook.root(), tmp.path());
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bad.md", b"# Caf\xe9\n");

        let notebook = Notebook::open(tmp.path(), &[]).unwrap();
        assert_eq!(notebook.notes()[0].list_title(), "Caf\u{fffd}");
    }

    #[test]
    fn open_rejects_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            Notebook::open(tmp.path().join("missing"), &[]),
            Err(NotebookError::NotADirectory(_))
        ));
    }

    #[test]
    fn writes_notes_back() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", b"old");

        let mut notebook = Notebook::open(tmp.path(), &[]).unwrap();
        notebook.notes_mut()[0].set_content("new".to_string());
        notebook.write(&notebook.notes()[0]).unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("a.md")).unwrap(), "new");
        assert!(notebook.find(Path::new("a.md")).is_some());
    }

    #[test]
    fn graph_uses_loaded_notes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", b"# A\n[[B]]\n");
        write(tmp.path(), "b.md", b"# B\n");

        let graph = Notebook::open(tmp.path(), &[]).unwrap().graph();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn discover_prefers_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let found = discover_with(
            Some(tmp.path()),
            &Config::default(),
            None,
            tmp.path(),
            &FakeNb::default(),
        )
        .unwrap();
        assert_eq!(found, tmp.path());
    }

    #[test]
    fn discover_rejects_missing_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        assert!(matches!(
            discover_with(
                Some(&missing),
                &Config::default(),
                None,
                tmp.path(),
                &FakeNb::default()
            ),
            Err(DiscoverError::NotADirectory(_))
        ));
    }

    #[test]
    fn discover_from_subdirectory_uses_repo_config() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(".git")).unwrap();
        fs::create_dir_all(tmp.path().join("docs/nb")).unwrap();
        fs::write(
            tmp.path().join(crate::domain::REPO_CONFIG_FILE),
            "notebook_path = \"docs/nb\"\n",
        )
        .unwrap();
        let nested = tmp.path().join("src").join("sub");
        fs::create_dir_all(&nested).unwrap();

        let repo_layer = Config::search_paths(&nested).pop().unwrap();
        let config = Config::load_layered(&[repo_layer]);
        let found = discover_with(None, &config, None, &nested, &FakeNb::default()).unwrap();

        assert_eq!(found, tmp.path().join("docs/nb"));
    }

    #[test]
    fn discover_uses_nb_dir_home() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("home")).unwrap();

        let found = discover_with(
            None,
            &Config::default(),
            Some(tmp.path()),
            tmp.path(),
            &FakeNb::default(),
        )
        .unwrap();
        assert_eq!(found, tmp.path().join("home"));
    }

    #[test]
    fn discover_asks_nb_then_falls_back() {
        let tmp = TempDir::new().unwrap();
        let notebook = tmp.path().join("nb-home");
        fs::create_dir_all(&notebook).unwrap();
        let listing = format!("/definitely/missing\n{}\n", notebook.display());
        let nb = FakeNb::default().with("notebooks --paths", &listing);

        let found = discover_with(None, &Config::default(), None, tmp.path(), &nb).unwrap();
        assert_eq!(found, notebook);

        let fallback = tmp.path().join(".nb_docs_repo").join("home");
        fs::create_dir_all(&fallback).unwrap();
        let found =
            discover_with(None, &Config::default(), None, tmp.path(), &FakeNb::default()).unwrap();
        assert_eq!(found, fallback);
    }

    #[test]
    fn discover_reports_not_found() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover_with(None, &Config::default(), None, tmp.path(), &FakeNb::default()),
            Err(DiscoverError::NotFound)
        ));
    }
}
