/*!
 * Android string resources.
 *
 * This module models the `strings.xml` subset of `res/values-*` directories:
 *
 * - `document`: lossless parsing and serialization of a resource file
 * - `escape`: Android-safe escaping of translated text
 * - `merge`: folding several locale documents into one by precedence
 *
 * Entry values are kept as raw resource text, i.e. exactly the inner markup of
 * the element. Escapes such as `\n` or `\'`, entities and inline tags are never
 * decoded, so an untouched value serializes back to the same bytes.
 */

use std::fmt;

pub use self::document::ResourceDocument;
pub use self::escape::escape_translated;
pub use self::merge::{ConflictNote, LocaleMerger, LocaleSource, MergeOutcome};

pub mod document;
pub mod escape;
pub mod merge;

/// The three resource element kinds that carry translatable text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// `<string>`
    String,
    /// `<string-array>`
    StringArray,
    /// `<plurals>`
    Plurals,
}

impl ResourceKind {
    /// Element name in the XML file
    pub fn tag(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::StringArray => "string-array",
            Self::Plurals => "plurals",
        }
    }

    /// Resolve an element name to a kind
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"string" => Some(Self::String),
            b"string-array" => Some(Self::StringArray),
            b"plurals" => Some(Self::Plurals),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Address of one translatable leaf inside a document
///
/// The textual form (`string:name`, `array:name:0`, `plurals:name:one`) doubles as
/// the merge key `(entry name, array index | quantity category)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitId {
    /// The value of a `<string>`
    String {
        /// Entry name
        name: String,
    },
    /// One `<item>` of a `<string-array>`
    ArrayItem {
        /// Entry name
        name: String,
        /// Zero-based item position
        index: usize,
    },
    /// One `<item quantity="...">` of a `<plurals>`
    PluralItem {
        /// Entry name
        name: String,
        /// Quantity category (zero, one, two, few, many, other)
        quantity: String,
    },
}

impl UnitId {
    /// Name of the owning entry
    pub fn name(&self) -> &str {
        match self {
            Self::String { name } | Self::ArrayItem { name, .. } | Self::PluralItem { name, .. } => name,
        }
    }

    /// Kind of the owning entry
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::String { .. } => ResourceKind::String,
            Self::ArrayItem { .. } => ResourceKind::StringArray,
            Self::PluralItem { .. } => ResourceKind::Plurals,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String { name } => write!(f, "string:{}", name),
            Self::ArrayItem { name, index } => write!(f, "array:{}:{}", name, index),
            Self::PluralItem { name, quantity } => write!(f, "plurals:{}:{}", name, quantity),
        }
    }
}

/// One resource entry in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEntry {
    /// `<string name="..">value</string>`
    SimpleString {
        name: String,
        value: String,
        translatable: bool,
    },
    /// `<string-array name="..">` with ordered `<item>` children
    StringArray {
        name: String,
        items: Vec<String>,
        translatable: bool,
    },
    /// `<plurals name="..">` with `<item quantity="..">` children, in file order
    Plural {
        name: String,
        quantities: Vec<(String, String)>,
        translatable: bool,
    },
}

impl ResourceEntry {
    /// Entry name
    pub fn name(&self) -> &str {
        match self {
            Self::SimpleString { name, .. } | Self::StringArray { name, .. } | Self::Plural { name, .. } => name,
        }
    }

    /// Entry kind
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::SimpleString { .. } => ResourceKind::String,
            Self::StringArray { .. } => ResourceKind::StringArray,
            Self::Plural { .. } => ResourceKind::Plurals,
        }
    }

    /// Whether the entry may be sent to a translation provider
    pub fn is_translatable(&self) -> bool {
        match self {
            Self::SimpleString { translatable, .. }
            | Self::StringArray { translatable, .. }
            | Self::Plural { translatable, .. } => *translatable,
        }
    }

    /// Text of a plural category
    pub fn quantity(&self, quantity: &str) -> Option<&str> {
        match self {
            Self::Plural { quantities, .. } => quantities
                .iter()
                .find(|(q, _)| q == quantity)
                .map(|(_, text)| text.as_str()),
            _ => None,
        }
    }

    /// All leaves with their ids, in file order
    pub fn leaves(&self) -> Vec<(UnitId, &str)> {
        match self {
            Self::SimpleString { name, value, .. } => {
                vec![(UnitId::String { name: name.clone() }, value.as_str())]
            }
            Self::StringArray { name, items, .. } => items
                .iter()
                .enumerate()
                .map(|(index, item)| (UnitId::ArrayItem { name: name.clone(), index }, item.as_str()))
                .collect(),
            Self::Plural { name, quantities, .. } => quantities
                .iter()
                .map(|(quantity, text)| {
                    (
                        UnitId::PluralItem { name: name.clone(), quantity: quantity.clone() },
                        text.as_str(),
                    )
                })
                .collect(),
        }
    }

    /// Ids of all leaves, in file order
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.leaves().into_iter().map(|(id, _)| id).collect()
    }

    /// Text of one leaf
    pub fn leaf(&self, id: &UnitId) -> Option<&str> {
        let index = self.leaf_index(id)?;
        self.leaf_at(index)
    }

    /// Position of a leaf within the entry, if the id belongs here
    pub(crate) fn leaf_index(&self, id: &UnitId) -> Option<usize> {
        if id.kind() != self.kind() || id.name() != self.name() {
            return None;
        }
        match (self, id) {
            (Self::SimpleString { .. }, UnitId::String { .. }) => Some(0),
            (Self::StringArray { items, .. }, UnitId::ArrayItem { index, .. }) => {
                (*index < items.len()).then_some(*index)
            }
            (Self::Plural { quantities, .. }, UnitId::PluralItem { quantity, .. }) => {
                quantities.iter().position(|(q, _)| q == quantity)
            }
            _ => None,
        }
    }

    pub(crate) fn leaf_at(&self, index: usize) -> Option<&str> {
        match self {
            Self::SimpleString { value, .. } => (index == 0).then_some(value.as_str()),
            Self::StringArray { items, .. } => items.get(index).map(String::as_str),
            Self::Plural { quantities, .. } => quantities.get(index).map(|(_, text)| text.as_str()),
        }
    }

    pub(crate) fn leaf_at_mut(&mut self, index: usize) -> Option<&mut String> {
        match self {
            Self::SimpleString { value, .. } => (index == 0).then_some(value),
            Self::StringArray { items, .. } => items.get_mut(index),
            Self::Plural { quantities, .. } => quantities.get_mut(index).map(|(_, text)| text),
        }
    }
}
