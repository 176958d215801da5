use std::{collections::BTreeSet, fmt, path::PathBuf};

use serde::Serialize;

use crate::domain::{LinkGraph, Note};

/// The conventions a note can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    /// The first non-empty line isn't an H1, so `nb list` shows the file
    /// name with its extension instead of a title.
    MissingTitle,
    /// A Markdown link points at a raw `.md` path instead of using a
    /// wikilink or an nb id.
    PathLink,
    /// A wikilink has no `(nb N)` suffix.
    UnnumberedWikilink,
    /// A wikilink target matches no note.
    BrokenWikilink,
}

impl IssueKind {
    /// Every kind, in report order.
    pub const ALL: [Self; 4] = [
        Self::MissingTitle,
        Self::PathLink,
        Self::UnnumberedWikilink,
        Self::BrokenWikilink,
    ];
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::MissingTitle => "missing-title",
            Self::PathLink => "path-link",
            Self::UnnumberedWikilink => "unnumbered-wikilink",
            Self::BrokenWikilink => "broken-wikilink",
        })
    }
}

/// A single convention violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// What was violated.
    pub kind: IssueKind,
    /// The note, relative to the notebook root.
    pub path: PathBuf,
    /// Human-readable detail.
    pub message: String,
}

/// Checks `notes` for the selected kinds of issues.
///
/// `graph` must have been built from the same notes; it is used to find
/// broken wikilinks. Issues are ordered by note path, then by kind, then by
/// position in the note.
#[must_use]
pub fn check_notes(notes: &[Note], graph: &LinkGraph, kinds: &BTreeSet<IssueKind>) -> Vec<Issue> {
    let mut issues = Vec::new();

    for note in notes {
        if kinds.contains(&IssueKind::MissingTitle) && note.leading_title().is_none() {
            issues.push(Issue {
                kind: IssueKind::MissingTitle,
                path: note.path().to_path_buf(),
                message: format!("no leading H1 title; nb will list it as '{}'", note.file_name()),
            });
        }

        if kinds.contains(&IssueKind::PathLink) {
            issues.extend(note.path_links().into_iter().map(|link| Issue {
                kind: IssueKind::PathLink,
                path: note.path().to_path_buf(),
                message: format!(
                    "[{}]({}) links a file path; use a wikilink with an nb id",
                    link.text, link.target
                ),
            }));
        }

        if kinds.contains(&IssueKind::UnnumberedWikilink) {
            issues.extend(
                note.wikilinks()
                    .into_iter()
                    .filter(|link| !link.numbered)
                    .map(|link| Issue {
                        kind: IssueKind::UnnumberedWikilink,
                        path: note.path().to_path_buf(),
                        message: format!("[[{}]] has no (nb N) suffix", link.raw),
                    }),
            );
        }
    }

    if kinds.contains(&IssueKind::BrokenWikilink) {
        issues.extend(graph.broken_links().iter().filter_map(|broken| {
            let node = graph.node(broken.source)?;
            Some(Issue {
                kind: IssueKind::BrokenWikilink,
                path: PathBuf::from(&node.path),
                message: format!("[[{}]] matches no note", broken.target),
            })
        }));
    }

    // stable: keeps document order within a note and kind
    issues.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
    issues
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn notes() -> Vec<Note> {
        vec![
            Note::new("hub.md", "# Hub\n\n[[Leaf]] (nb 2)\n[[Leaf]]\n[[Ghost]]\n"),
            Note::new("leaf.md", "Intro first\n\n# Leaf\n\nSee [hub](hub.md).\n"),
        ]
    }

    fn run(kinds: &[IssueKind]) -> Vec<Issue> {
        let notes = notes();
        let graph = LinkGraph::build(Path::new("."), &notes);
        check_notes(&notes, &graph, &kinds.iter().copied().collect())
    }

    #[test]
    fn finds_every_kind() {
        let issues = run(&IssueKind::ALL);
        let found: Vec<(&str, IssueKind)> = issues
            .iter()
            .map(|i| (i.path.to_str().unwrap(), i.kind))
            .collect();

        assert_eq!(
            found,
            [
                ("hub.md", IssueKind::UnnumberedWikilink),
                ("hub.md", IssueKind::UnnumberedWikilink),
                ("hub.md", IssueKind::BrokenWikilink),
                ("leaf.md", IssueKind::MissingTitle),
                ("leaf.md", IssueKind::PathLink),
            ]
        );
        assert_eq!(issues[0].message, "[[Leaf]] has no (nb N) suffix");
        assert_eq!(issues[1].message, "[[Ghost]] has no (nb N) suffix");
        assert_eq!(issues[2].message, "[[Ghost]] matches no note");
        assert_eq!(
            issues[3].message,
            "no leading H1 title; nb will list it as 'leaf.md'"
        );
    }

    #[test]
    fn only_selected_kinds_are_reported() {
        let issues = run(&[IssueKind::MissingTitle]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingTitle);
    }

    #[test]
    fn kinds_display_in_kebab_case() {
        let shown: Vec<String> = IssueKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(
            shown,
            ["missing-title", "path-link", "unnumbered-wikilink", "broken-wikilink"]
        );
        assert_eq!(
            serde_json::to_value(IssueKind::PathLink).unwrap(),
            serde_json::json!("path-link")
        );
    }
}
