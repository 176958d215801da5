use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{
    domain::link::{self, NbRef, PathLink, WikiLink},
    storage::markdown::{mask_code_blocks, split_frontmatter},
};

/// A single Markdown note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    path: PathBuf,
    content: String,
    modified: Option<DateTime<Utc>>,
}

impl Note {
    /// Creates a note from its path relative to the notebook root and its
    /// content.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            modified: None,
        }
    }

    /// Sets the last-modified time.
    #[must_use]
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// The path relative to the notebook root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full text of the note.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the full text of the note.
    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    /// Last-modified time, when known.
    #[must_use]
    pub const fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    /// The note body with any leading frontmatter removed.
    #[must_use]
    pub fn body(&self) -> &str {
        split_frontmatter(&self.content).1
    }

    /// The text of the first H1 heading outside frontmatter and code blocks.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        mask_code_blocks(self.body())
            .lines()
            .find_map(|line| heading_text(line.trim()))
            .map(str::to_string)
    }

    /// The H1 text, only if the heading is the first non-empty line of the
    /// body.
    ///
    /// This is the condition under which `nb list` shows a clean title.
    #[must_use]
    pub fn leading_title(&self) -> Option<String> {
        self.body()
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .and_then(heading_text)
            .map(str::to_string)
    }

    /// The title `nb list` would display: the leading H1, or else the file
    /// name including its extension.
    #[must_use]
    pub fn list_title(&self) -> String {
        self.leading_title().unwrap_or_else(|| self.file_name())
    }

    /// The title used in the link graph: the first H1 anywhere in the body,
    /// or else the file stem.
    #[must_use]
    pub fn graph_title(&self) -> String {
        self.title().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// The file name including its extension.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The relative path in `/`-separated form with a trailing `.md`
    /// removed, as used by `[[folder/name]]` links.
    #[must_use]
    pub fn link_key(&self) -> String {
        let posix = self
            .path
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        posix
            .strip_suffix(".md")
            .map_or_else(|| posix.clone(), str::to_string)
    }

    /// Wikilinks in the note.
    #[must_use]
    pub fn wikilinks(&self) -> Vec<WikiLink> {
        link::find_wikilinks(&self.content)
    }

    /// Bare `(nb N)` references in the note.
    #[must_use]
    pub fn nb_refs(&self) -> Vec<NbRef> {
        link::find_nb_refs(&self.content)
    }

    /// Markdown links to local `.md` files in the note.
    #[must_use]
    pub fn path_links(&self) -> Vec<PathLink> {
        link::find_path_links(&self.content)
    }
}

/// The text of an H1 heading line (`# Title`), if `line` is one.
fn heading_text(line: &str) -> Option<&str> {
    let text = line.strip_prefix("# ").or_else(|| line.strip_prefix("#\t"))?;
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}
