use std::{collections::BTreeMap, fmt, num::NonZeroUsize, str::FromStr};

use non_empty_string::NonEmptyString;

/// The selector `nb` prints in front of each note in `nb list`.
///
/// Notes in the notebook root are addressed by number alone (`14`), notes in
/// folders carry the folder path as a prefix (`Project/2`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NbId {
    folder: Vec<NonEmptyString>,
    number: NonZeroUsize,
}

impl NbId {
    /// Create an id for a note in the notebook root.
    #[must_use]
    pub const fn new(number: NonZeroUsize) -> Self {
        Self {
            folder: Vec::new(),
            number,
        }
    }

    /// Create an id for a note inside a (possibly nested) folder.
    #[must_use]
    pub const fn in_folder(folder: Vec<NonEmptyString>, number: NonZeroUsize) -> Self {
        Self { folder, number }
    }

    /// The folder path segments, outermost first.
    #[must_use]
    pub fn folder(&self) -> &[NonEmptyString] {
        &self.folder
    }

    /// The number within the folder.
    #[must_use]
    pub const fn number(&self) -> NonZeroUsize {
        self.number
    }
}

impl fmt::Display for NbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.folder {
            write!(f, "{segment}/")?;
        }
        write!(f, "{}", self.number)
    }
}

/// Errors raised when parsing an [`NbId`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The selector was empty.
    #[error("empty nb id")]
    Empty,

    /// A folder segment was empty, as in `Project//2`.
    #[error("empty folder segment in nb id '{0}'")]
    EmptySegment(String),

    /// The trailing component was not a positive integer.
    #[error("invalid note number '{number}' in nb id '{id}'")]
    InvalidNumber {
        /// The full selector.
        id: String,
        /// The offending trailing component.
        number: String,
    },
}

impl FromStr for NbId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Empty);
        }

        let mut parts: Vec<&str> = s.split('/').collect();
        // `split` always yields at least one element
        let last = parts.pop().unwrap_or_default();

        let number = last
            .parse::<NonZeroUsize>()
            .map_err(|_| Error::InvalidNumber {
                id: s.to_string(),
                number: last.to_string(),
            })?;

        let folder = parts
            .into_iter()
            .map(|segment| {
                NonEmptyString::new(segment.to_string())
                    .map_err(|_| Error::EmptySegment(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { folder, number })
    }
}

impl TryFrom<&str> for NbId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl serde::Serialize for NbId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Lookup from note title to [`NbId`], as reported by `nb list`.
///
/// Titles of notes inside folders are keyed with the folder prefix, e.g.
/// `Project/Underchex - Hub`, which is how wikilinks address them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdIndex {
    by_title: BTreeMap<String, NbId>,
}

impl IdIndex {
    /// Records `title` as addressing `id`. A later entry for the same title
    /// replaces an earlier one.
    pub fn insert(&mut self, title: impl Into<String>, id: NbId) {
        self.by_title.insert(title.into(), id);
    }

    /// Looks up the id for a title.
    #[must_use]
    pub fn get(&self, title: &str) -> Option<&NbId> {
        self.by_title.get(title)
    }

    /// Number of titles in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    /// Iterates `(title, id)` pairs in title order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NbId)> {
        self.by_title.iter().map(|(title, id)| (title.as_str(), id))
    }
}

impl FromIterator<(String, NbId)> for IdIndex {
    fn from_iter<T: IntoIterator<Item = (String, NbId)>>(iter: T) -> Self {
        Self {
            by_title: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("14", 14, &[]; "root note")]
    #[test_case("Project/2", 2, &["Project"]; "folder note")]
    #[test_case("a/b/7", 7, &["a", "b"]; "nested folder")]
    #[test_case(" 3 ", 3, &[]; "surrounding whitespace")]
    fn parses(input: &str, number: usize, folder: &[&str]) {
        let id: NbId = input.parse().unwrap();
        assert_eq!(id.number().get(), number);
        let segments: Vec<&str> = id.folder().iter().map(NonEmptyString::as_str).collect();
        assert_eq!(segments, folder);
    }

    #[test]
    fn display_matches_nb_selector() {
        let id: NbId = "Project/2".parse().unwrap();
        assert_eq!(id.to_string(), "Project/2");
        assert_eq!(NbId::new(NonZeroUsize::new(14).unwrap()).to_string(), "14");
    }

    #[test]
    fn rejects_zero() {
        assert!(matches!(
            "0".parse::<NbId>(),
            Err(Error::InvalidNumber { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(matches!(
            "Project/two".parse::<NbId>(),
            Err(Error::InvalidNumber { .. })
        ));
    }

    #[test]
    fn rejects_empty_segment() {
        assert_eq!(
            "Project//2".parse::<NbId>(),
            Err(Error::EmptySegment("Project//2".to_string()))
        );
    }

    #[test]
    fn rejects_empty() {
        assert_eq!("".parse::<NbId>(), Err(Error::Empty));
    }

    #[test]
    fn root_notes_sort_before_folders() {
        let mut ids: Vec<NbId> = ["Project/1", "2", "10"]
            .into_iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ids.sort();
        let shown: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["2", "10", "Project/1"]);
    }

    #[test]
    fn index_later_entries_win() {
        let mut index = IdIndex::default();
        index.insert("Hub", "1".parse().unwrap());
        index.insert("Hub", "Project/4".parse().unwrap());
        index.insert("Leaf", "2".parse().unwrap());

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("Hub").unwrap().to_string(), "Project/4");
        assert_eq!(index.get("Missing"), None);
        let titles: Vec<&str> = index.iter().map(|(title, _)| title).collect();
        assert_eq!(titles, ["Hub", "Leaf"]);
    }
}
