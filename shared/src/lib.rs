use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use std::fmt;

// ===== MARKUP CONTRACT =====

/// Class and id names the table generator emits and the interactive core looks for.
///
/// Both sides read the same struct, so a renamed marker is changed in one place.
/// Missing keys fall back to the values the generator uses by default.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupContract {
    /// Id of the stable element the host re-renders the table into
    pub container_id: String,
    /// Class carried by the `<table>` element itself
    pub table_class: String,
    /// Class on every cell of a group header row
    pub header_cell_class: String,
    /// Class on every cell of a member row
    pub member_cell_class: String,
    /// Prefix of the `row<N>` class on a member row's leading cell
    pub row_class_prefix: String,
    /// Shared `name` of the hidden checkbox group persisting collapse state
    pub control_group: String,
}

impl Default for MarkupContract {
    fn default() -> Self {
        Self {
            container_id: "table_output".to_string(),
            table_class: "interactive-table".to_string(),
            header_cell_class: "summary-row".to_string(),
            member_cell_class: "normal-row".to_string(),
            row_class_prefix: "row".to_string(),
            control_group: "row_indexes_to_hide".to_string(),
        }
    }
}

impl MarkupContract {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// The `row<N>` class for a given index, as the generator writes it.
    pub fn row_class(&self, index: &RowIndex) -> String {
        format!("{}{}", self.row_class_prefix, index)
    }
}

// ===== ROW INDEX =====

/// Ordinal of a member row, shared between its `row<N>` class and the `value`
/// of its persisted-visibility checkbox.
///
/// Stored as the exact digit text so it compares byte-for-byte with attribute values.
/// Ordering is numeric for the zero-free ordinals the generator writes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct RowIndex(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRowIndex(pub String);

impl fmt::Display for InvalidRowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a row ordinal", self.0)
    }
}

impl std::error::Error for InvalidRowIndex {}

impl RowIndex {
    pub fn parse(text: &str) -> Result<Self, InvalidRowIndex> {
        if !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit()) {
            Ok(Self(text.to_string()))
        } else {
            Err(InvalidRowIndex(text.to_string()))
        }
    }

    /// Extract the ordinal from a class such as `row12`.
    ///
    /// Classes that merely start with the prefix (`row_heading`, `row1a`) are rejected.
    pub fn from_class(class_name: &str, prefix: &str) -> Option<Self> {
        class_name
            .strip_prefix(prefix)
            .and_then(|ordinal| Self::parse(ordinal).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<usize> for RowIndex {
    fn from(ordinal: usize) -> Self {
        Self(ordinal.to_string())
    }
}

impl TryFrom<String> for RowIndex {
    type Error = InvalidRowIndex;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl From<RowIndex> for String {
    fn from(index: RowIndex) -> Self {
        index.0
    }
}

impl Ord for RowIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for RowIndex {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ===== PERSISTED VISIBILITY =====

/// Set of collapsed member rows, as the backend persists it between renders.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct HiddenRows {
    rows: BTreeSet<RowIndex>,
}

impl HiddenRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state of one checkbox. Returns `true` when the set changed.
    pub fn apply(&mut self, index: RowIndex, hidden: bool) -> bool {
        if hidden {
            self.rows.insert(index)
        } else {
            self.rows.remove(&index)
        }
    }

    pub fn contains(&self, index: &RowIndex) -> bool {
        self.rows.contains(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowIndex> {
        self.rows.iter()
    }
}

impl FromIterator<RowIndex> for HiddenRows {
    fn from_iter<I: IntoIterator<Item = RowIndex>>(iter: I) -> Self {
        Self { rows: iter.into_iter().collect() }
    }
}
