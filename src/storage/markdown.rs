//! Markdown helpers shared by note parsing and rewriting.
//!
//! Notes may start with a YAML frontmatter block delimited by `---` lines.
//! Fenced code blocks (```` ``` ```` or `~~~`) hold examples, so link parsing
//! and rewriting work on a masked copy of the text in which fenced blocks are
//! blanked out byte-for-byte.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Frontmatter nbkit writes and reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// The note title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Free-form tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl Frontmatter {
    /// Parses the frontmatter block of `content`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if a block is present but is not valid YAML for this
    /// structure.
    pub fn parse(content: &str) -> Result<Option<Self>, serde_yaml::Error> {
        match split_frontmatter(content) {
            (Some(block), _) if block.trim().is_empty() => Ok(Some(Self::default())),
            (Some(block), _) => serde_yaml::from_str(block).map(Some),
            (None, _) => Ok(None),
        }
    }

    fn render(&self) -> Result<String, serde_yaml::Error> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(format!("---\n{yaml}---\n"))
    }
}

/// Splits a leading frontmatter block from the rest of the note.
///
/// Returns `(Some(yaml), body)` when the first line is `---` and a closing
/// `---` line follows; otherwise `(None, content)`.
#[must_use]
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let body = &rest[offset + line.len()..];
            return (Some(&rest[..offset]), body);
        }
        offset += line.len();
    }

    (None, content)
}

/// Derives a display title from a file stem.
///
/// `-` and `_` become spaces. A letter is upper-cased when it follows a
/// non-letter (or starts the stem) and lower-cased otherwise, so `a.b`
/// becomes `A.B` and `v2beta` becomes `V2Beta`.
#[must_use]
pub fn title_from_stem(stem: &str) -> String {
    let mut title = String::with_capacity(stem.len());
    let mut after_letter = false;
    for c in stem.chars() {
        let c = if matches!(c, '-' | '_') { ' ' } else { c };
        if after_letter {
            title.extend(c.to_lowercase());
        } else {
            title.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    title
}

/// Returns `content` with a frontmatter block carrying `title` prepended,
/// or `None` if the content already starts with `---`.
///
/// # Errors
///
/// Returns an error if the frontmatter can't be rendered as YAML.
pub fn with_frontmatter(content: &str, title: &str) -> Result<Option<String>, serde_yaml::Error> {
    if content.starts_with("---") {
        return Ok(None);
    }
    let frontmatter = Frontmatter {
        title: Some(title.to_string()),
        ..Frontmatter::default()
    };
    Ok(Some(format!("{}\n{content}", frontmatter.render()?)))
}

/// Returns a copy of `content` with every fenced code block blanked out.
///
/// Every byte inside a fence (including the fence lines) except `\n` is
/// replaced by a space, so byte offsets in the mask are valid offsets into
/// the original. An unterminated fence runs to the end of the text.
#[must_use]
pub fn mask_code_blocks(content: &str) -> String {
    let mut masked = String::with_capacity(content.len());
    let mut fence: Option<&str> = None;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let marker = ["```", "~~~"]
            .into_iter()
            .find(|marker| trimmed.starts_with(marker));

        let inside = match (fence, marker) {
            (None, Some(marker)) => {
                fence = Some(marker);
                true
            }
            (Some(open), Some(marker)) if open == marker => {
                fence = None;
                true
            }
            (Some(_), _) => true,
            (None, None) => false,
        };

        if inside {
            masked.extend(line.bytes().map(|b| if b == b'\n' { '\n' } else { ' ' }));
        } else {
            masked.push_str(line);
        }
    }

    masked
}
