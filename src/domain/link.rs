//! Cross-note references.
//!
//! Notes reference each other in three ways:
//!
//! - wikilinks, `[[Title]]`, optionally `[[Title|alias]]` or
//!   `[[Title#Heading]]`, and optionally followed by an nb id as in
//!   `[[Title]] (nb 14)`
//! - bare nb references, `(nb 14)` or `(nb Project/2)`
//! - Markdown links to local files, `[text](other-note.md)`
//!
//! The first two are the house style. Raw file paths are discouraged because
//! they break when `nb` renames or moves a note.
//!
//! Everything inside fenced code blocks is ignored.

use std::{ops::Range, sync::LazyLock};

use regex::Regex;

use crate::{
    domain::{IdIndex, NbId},
    storage::markdown::mask_code_blocks,
};

static WIKILINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]]+)\]\](\s*\(nb\b\s*([^)]*)\))?").expect("this must never fail")
});

static NB_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(nb\s+([^)\s]+)\)").expect("this must never fail"));

static PATH_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(([^)\s#]+\.md)(#[^)\s]*)?\)").expect("this must never fail")
});

/// A `[[...]]` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    /// Byte range of the whole match in the note, including any `(nb N)`
    /// suffix.
    pub span: Range<usize>,

    /// Byte range of just the `[[...]]` part.
    pub link_span: Range<usize>,

    /// The text between the brackets, unmodified.
    pub raw: String,

    /// The link target with any alias and heading removed.
    pub target: String,

    /// The heading after `#`, if any.
    pub anchor: Option<String>,

    /// The display alias after `|`, if any.
    pub alias: Option<String>,

    /// Whether the link is followed by an `(nb ...)` suffix.
    pub numbered: bool,

    /// The id in the `(nb ...)` suffix, if it parsed.
    pub nb_id: Option<NbId>,
}

impl WikiLink {
    fn from_captures(caps: &regex::Captures<'_>, original: &str) -> Option<Self> {
        let whole = caps.get(0)?;
        let inner = caps.get(1)?;
        let raw = &original[inner.range()];
        let (target, anchor, alias) = split_target(raw);
        let link_end = inner.end() + 2;

        let suffix = caps.get(3).map(|m| original[m.range()].trim());

        Some(Self {
            span: whole.range(),
            link_span: whole.start()..link_end,
            raw: raw.to_string(),
            target,
            anchor,
            alias,
            numbered: caps.get(2).is_some(),
            nb_id: suffix.and_then(|id| id.parse().ok()),
        })
    }
}

/// Splits `Target#Heading|Alias` into its parts.
///
/// The target is everything before the first `|` and then before the first
/// `#`, trimmed.
fn split_target(raw: &str) -> (String, Option<String>, Option<String>) {
    let (before_alias, alias) = match raw.split_once('|') {
        Some((before, alias)) => (before, Some(alias.trim().to_string())),
        None => (raw, None),
    };
    let (target, anchor) = match before_alias.split_once('#') {
        Some((target, anchor)) => (target, Some(anchor.trim().to_string())),
        None => (before_alias, None),
    };
    (target.trim().to_string(), anchor, alias)
}

/// Normalises a raw wikilink body to the note it points at.
///
/// `[[Title|alias]]` and `[[Title#Heading]]` both point at `Title`.
#[must_use]
pub fn normalize_link_target(raw: &str) -> String {
    split_target(raw).0
}

/// A bare `(nb N)` reference that is not the suffix of a wikilink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbRef {
    /// Byte range of the reference.
    pub span: Range<usize>,
    /// The referenced id.
    pub id: NbId,
}

/// A Markdown link to a local `.md` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLink {
    /// Byte range of the link.
    pub span: Range<usize>,
    /// The link text.
    pub text: String,
    /// The file path, without any `#fragment`.
    pub target: String,
}

/// Finds all wikilinks outside fenced code blocks.
#[must_use]
pub fn find_wikilinks(content: &str) -> Vec<WikiLink> {
    let masked = mask_code_blocks(content);
    WIKILINK
        .captures_iter(&masked)
        .filter_map(|caps| WikiLink::from_captures(&caps, content))
        .collect()
}

/// Finds bare `(nb N)` references outside fenced code blocks.
///
/// References directly attached to a wikilink are reported as part of the
/// [`WikiLink`] instead. References whose id doesn't parse are skipped.
#[must_use]
pub fn find_nb_refs(content: &str) -> Vec<NbRef> {
    let masked = mask_code_blocks(content);
    let attached: Vec<Range<usize>> = WIKILINK
        .captures_iter(&masked)
        .filter_map(|caps| caps.get(2).map(|m| m.range()))
        .collect();

    NB_REF
        .captures_iter(&masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if attached
                .iter()
                .any(|range| range.start <= whole.start() && whole.end() <= range.end)
            {
                return None;
            }
            let id = content[caps.get(1)?.range()].parse().ok()?;
            Some(NbRef {
                span: whole.range(),
                id,
            })
        })
        .collect()
}

/// Finds Markdown links to local `.md` files outside fenced code blocks.
///
/// Links with a URL scheme (`https://...`) are not local and are skipped.
#[must_use]
pub fn find_path_links(content: &str) -> Vec<PathLink> {
    let masked = mask_code_blocks(content);
    PATH_LINK
        .captures_iter(&masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let target = &content[caps.get(2)?.range()];
            if target.contains("://") {
                return None;
            }
            Some(PathLink {
                span: whole.range(),
                text: content[caps.get(1)?.range()].to_string(),
                target: target.to_string(),
            })
        })
        .collect()
}

/// A single rewrite made by [`annotate_wikilinks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// The link as it was, e.g. `[[Hub]]`.
    pub before: String,
    /// The link as it is now, e.g. `[[Hub]] (nb 3)`.
    pub after: String,
}

/// Result of [`annotate_wikilinks`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotation {
    /// The rewritten note.
    pub content: String,
    /// The rewrites, in document order.
    pub changes: Vec<Change>,
    /// Wikilink targets that have no id in the index, in document order.
    pub unresolved: Vec<String>,
}

impl Annotation {
    /// Whether the note text changed.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Appends ` (nb N)` to every wikilink that lacks an nb suffix.
///
/// Targets are looked up in `index` by their normalised target. Links whose
/// target is unknown are left alone and reported in
/// [`Annotation::unresolved`]. Fenced code blocks are never modified.
#[must_use]
pub fn annotate_wikilinks(content: &str, index: &IdIndex) -> Annotation {
    let mut annotation = Annotation {
        content: String::with_capacity(content.len()),
        ..Annotation::default()
    };
    let mut cursor = 0;

    for link in find_wikilinks(content) {
        if link.numbered {
            continue;
        }
        let before = &content[link.link_span.clone()];
        match index.get(&link.target) {
            Some(id) => {
                let after = format!("{before} (nb {id})");
                annotation.content.push_str(&content[cursor..link.link_span.start]);
                annotation.content.push_str(&after);
                cursor = link.link_span.end;
                annotation.changes.push(Change {
                    before: before.to_string(),
                    after,
                });
            }
            None => annotation.unresolved.push(link.target),
        }
    }

    annotation.content.push_str(&content[cursor..]);
    annotation
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn index() -> IdIndex {
        [
            ("NB - Guide - Note Formatting", "14"),
            ("Project/Underchex - Hub", "Project/2"),
        ]
        .into_iter()
        .map(|(title, id)| (title.to_string(), id.parse().unwrap()))
        .collect()
    }

    #[test_case("Title", "Title", None, None; "plain")]
    #[test_case("Title|shown", "Title", None, Some("shown"); "alias")]
    #[test_case("Title#Setup", "Title", Some("Setup"), None; "anchor")]
    #[test_case(" Title#Setup | shown ", "Title", Some("Setup"), Some("shown"); "both with spaces")]
    fn splits_targets(raw: &str, target: &str, anchor: Option<&str>, alias: Option<&str>) {
        let (t, a, al) = split_target(raw);
        assert_eq!(t, target);
        assert_eq!(a.as_deref(), anchor);
        assert_eq!(al.as_deref(), alias);
        assert_eq!(normalize_link_target(raw), target);
    }

    #[test]
    fn finds_wikilinks_with_and_without_ids() {
        let content = "See [[Hub]] (nb 3) and [[Leaf|the leaf]].";
        let links = find_wikilinks(content);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target, "Hub");
        assert!(links[0].numbered);
        assert_eq!(links[0].nb_id.as_ref().map(ToString::to_string).as_deref(), Some("3"));
        assert_eq!(&content[links[0].span.clone()], "[[Hub]] (nb 3)");
        assert_eq!(&content[links[0].link_span.clone()], "[[Hub]]");

        assert_eq!(links[1].target, "Leaf");
        assert_eq!(links[1].alias.as_deref(), Some("the leaf"));
        assert!(!links[1].numbered);
        assert_eq!(links[1].nb_id, None);
    }

    #[test]
    fn ignores_links_in_code_blocks() {
        let content = "[[A]]\n```\n[[B]] (nb 2)\n```\n~~~\n[Doc](doc.md)\n~~~\n";
        let targets: Vec<String> = find_wikilinks(content).into_iter().map(|l| l.target).collect();
        assert_eq!(targets, ["A"]);
        assert!(find_nb_refs(content).is_empty());
        assert!(find_path_links(content).is_empty());
    }

    #[test]
    fn finds_bare_nb_refs() {
        let content = "Follow up in (nb 12), see also [[Hub]] (nb 3) and (nb Project/2).";
        let refs: Vec<String> = find_nb_refs(content)
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(refs, ["12", "Project/2"]);
    }

    #[test]
    fn skips_unparseable_nb_refs() {
        assert!(find_nb_refs("(nb abc)").is_empty());
    }

    #[test]
    fn finds_path_links() {
        let content = "[Guide](guides/formatting.md#lists), [Site](https://example.com/a.md), [Img](a.png)";
        let links = find_path_links(content);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "Guide");
        assert_eq!(links[0].target, "guides/formatting.md");
    }

    #[test]
    fn annotates_missing_ids() {
        let content = "Read [[NB - Guide - Note Formatting]] first.\n";
        let annotation = annotate_wikilinks(content, &index());

        assert_eq!(
            annotation.content,
            "Read [[NB - Guide - Note Formatting]] (nb 14) first.\n"
        );
        assert_eq!(
            annotation.changes,
            [Change {
                before: "[[NB - Guide - Note Formatting]]".to_string(),
                after: "[[NB - Guide - Note Formatting]] (nb 14)".to_string(),
            }]
        );
        assert!(annotation.unresolved.is_empty());
        assert!(annotation.is_changed());
    }

    #[test]
    fn annotation_skips_numbered_links() {
        let content = "[[NB - Guide - Note Formatting]] (nb 14)";
        let annotation = annotate_wikilinks(content, &index());
        assert_eq!(annotation.content, content);
        assert!(!annotation.is_changed());
    }

    #[test]
    fn annotation_reports_unknown_titles() {
        let content = "[[Nowhere]] and [[Project/Underchex - Hub|hub]]";
        let annotation = annotate_wikilinks(content, &index());
        assert_eq!(
            annotation.content,
            "[[Nowhere]] and [[Project/Underchex - Hub|hub]] (nb Project/2)"
        );
        assert_eq!(annotation.unresolved, ["Nowhere"]);
    }

    #[test]
    fn annotation_leaves_code_blocks_untouched() {
        let content = "```\n[[NB - Guide - Note Formatting]]\n```\n";
        let annotation = annotate_wikilinks(content, &index());
        assert_eq!(annotation.content, content);
        assert!(annotation.unresolved.is_empty());
    }
}
