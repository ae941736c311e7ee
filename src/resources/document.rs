/*!
 * Lossless model of one `strings.xml` file.
 *
 * The document keeps the source text of everything that is not a leaf value
 * (declaration, comments, whitespace, attribute quoting, unknown elements) as raw
 * segments. Leaves are the only mutable part, so serializing an untouched
 * document reproduces its input byte for byte.
 */

use std::collections::{HashMap, HashSet};

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{ResourceEntry, ResourceKind, UnitId};
use crate::errors::ParseError;
use crate::translation::TranslationUnit;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DEFAULT_ENTRY_INDENT: &str = "\n    ";

/// Layout of one entry: raw markup interleaved with leaf positions
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    /// Verbatim source text
    Raw(String),
    /// Leaf value at this index of the entry
    Leaf(usize),
    /// Self-closing element (`<item/>`); expanded when the leaf gains text
    EmptyLeaf {
        leaf: usize,
        raw: String,
        tag: String,
    },
}

/// Top level sequence of the document
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Raw(String),
    Entry(usize),
    /// `</resources>`
    Close(String),
    /// `<resources/>`
    EmptyRoot(String),
}

/// A parsed resource file
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDocument {
    bom: bool,
    nodes: Vec<Node>,
    entries: Vec<ResourceEntry>,
    layouts: Vec<Vec<Piece>>,
    index: HashMap<(ResourceKind, String), usize>,
}

impl ResourceDocument {
    /// Parse a resource file from raw bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let (bom, body) = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, bytes),
        };
        let src = std::str::from_utf8(body).map_err(|e| ParseError::Encoding(e.to_string()))?;

        let mut doc = Self {
            bom,
            nodes: Vec::new(),
            entries: Vec::new(),
            layouts: Vec::new(),
            index: HashMap::new(),
        };
        let mut parser = EventSource::new(src);
        let mut cursor = 0usize;
        let mut depth = 0usize;
        let mut root_seen = false;

        loop {
            let (event, end) = parser.next()?;
            match event {
                Event::Start(e) => {
                    if depth == 0 {
                        check_root(&e, root_seen)?;
                        root_seen = true;
                        depth = 1;
                        continue;
                    }
                    if depth == 1 {
                        if let Some(kind) = ResourceKind::from_tag(e.name().as_ref()) {
                            let start = parser.tag_start(end);
                            doc.push_raw(&src[cursor..start]);
                            let (entry, layout, entry_end) = parser.parse_entry(kind, &e, start, end)?;
                            doc.push_entry(entry, layout)?;
                            cursor = entry_end;
                            continue;
                        }
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    let start = parser.tag_start(end);
                    if depth == 0 {
                        check_root(&e, root_seen)?;
                        root_seen = true;
                        doc.push_raw(&src[cursor..start]);
                        doc.nodes.push(Node::EmptyRoot(src[start..end].to_string()));
                        cursor = end;
                    } else if depth == 1 {
                        if let Some(kind) = ResourceKind::from_tag(e.name().as_ref()) {
                            doc.push_raw(&src[cursor..start]);
                            let (entry, layout) = parser.parse_empty_entry(kind, &e, start, end)?;
                            doc.push_entry(entry, layout)?;
                            cursor = end;
                        }
                    }
                }
                Event::End(_) => {
                    depth = depth.checked_sub(1).ok_or_else(|| parser.error("unexpected closing tag"))?;
                    if depth == 0 {
                        let start = parser.tag_start(end);
                        doc.push_raw(&src[cursor..start]);
                        doc.nodes.push(Node::Close(src[start..end].to_string()));
                        cursor = end;
                    }
                }
                Event::Eof => {
                    if depth > 0 {
                        return Err(parser.error("unexpected end of input, <resources> is not closed"));
                    }
                    if !root_seen {
                        return Err(ParseError::UnexpectedRoot("no element".to_string()));
                    }
                    doc.push_raw(&src[cursor..]);
                    break;
                }
                _ => {}
            }
        }

        debug!("Parsed resource document with {} entries", doc.entries.len());
        Ok(doc)
    }

    /// Entries in document order
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    /// Look up an entry by kind and name
    pub fn entry(&self, kind: ResourceKind, name: &str) -> Option<&ResourceEntry> {
        self.slot_index(kind, name).map(|i| &self.entries[i])
    }

    /// Current text of one leaf
    pub fn value(&self, id: &UnitId) -> Option<&str> {
        self.entry(id.kind(), id.name())?.leaf(id)
    }

    /// Whether the file started with a UTF-8 byte order mark
    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Flatten translatable leaves into translation units, in document order
    ///
    /// Entries marked `translatable="false"` and leaves that are empty or only
    /// whitespace are skipped.
    pub fn translatable_units(&self, source_lang: &str) -> Vec<TranslationUnit> {
        self.entries
            .iter()
            .filter(|entry| entry.is_translatable())
            .flat_map(|entry| entry.leaves())
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(id, text)| TranslationUnit::new(id, text, source_lang))
            .collect()
    }

    /// Copy of this document with the given leaves replaced
    ///
    /// Ids that are absent keep their source text; ids that address unknown or
    /// non-translatable entries are ignored.
    pub fn apply_translations(&self, translations: &HashMap<UnitId, String>) -> Self {
        let mut doc = self.clone();
        for (id, text) in translations {
            let Some(slot) = doc.slot_index(id.kind(), id.name()) else {
                debug!("Ignoring translation for unknown unit {}", id);
                continue;
            };
            if !doc.entries[slot].is_translatable() {
                debug!("Ignoring translation for non-translatable unit {}", id);
                continue;
            }
            doc.set_leaf(slot, id, text.clone());
        }
        doc
    }

    /// Render the document back to bytes
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Raw(text) | Node::Close(text) | Node::EmptyRoot(text) => out.push_str(text),
                Node::Entry(slot) => self.render_entry(*slot, &mut out),
            }
        }

        let mut bytes = Vec::with_capacity(out.len() + UTF8_BOM.len());
        if self.bom {
            bytes.extend_from_slice(UTF8_BOM);
        }
        bytes.extend_from_slice(out.as_bytes());
        bytes
    }

    fn render_entry(&self, slot: usize, out: &mut String) {
        let entry = &self.entries[slot];
        for piece in &self.layouts[slot] {
            match piece {
                Piece::Raw(text) => out.push_str(text),
                Piece::Leaf(leaf) => out.push_str(entry.leaf_at(*leaf).unwrap_or_default()),
                Piece::EmptyLeaf { leaf, raw, tag } => match entry.leaf_at(*leaf) {
                    Some(value) if !value.is_empty() => {
                        let open = raw.trim_end_matches("/>").trim_end();
                        out.push_str(open);
                        out.push('>');
                        out.push_str(value);
                        out.push_str("</");
                        out.push_str(tag);
                        out.push('>');
                    }
                    _ => out.push_str(raw),
                },
            }
        }
    }

    pub(crate) fn slot_index(&self, kind: ResourceKind, name: &str) -> Option<usize> {
        self.index.get(&(kind, name.to_string())).copied()
    }

    /// Entry and layout at a slot, for copying between documents
    pub(crate) fn slot(&self, slot: usize) -> (&ResourceEntry, &[Piece]) {
        (&self.entries[slot], &self.layouts[slot])
    }

    /// Replace one leaf value; returns false when the id does not fit the entry
    pub(crate) fn set_leaf(&mut self, slot: usize, id: &UnitId, text: String) -> bool {
        let entry = &mut self.entries[slot];
        match entry.leaf_index(id) {
            Some(leaf) => match entry.leaf_at_mut(leaf) {
                Some(value) => {
                    *value = text;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Swap an entry wholesale, keeping its position
    pub(crate) fn replace_slot(&mut self, slot: usize, entry: ResourceEntry, layout: Vec<Piece>) {
        self.entries[slot] = entry;
        self.layouts[slot] = layout;
    }

    /// Add an entry just before `</resources>`
    pub(crate) fn append_slot(&mut self, entry: ResourceEntry, layout: Vec<Piece>) {
        let indent = self.entry_indent();
        let slot = self.entries.len();
        self.index.insert((entry.kind(), entry.name().to_string()), slot);
        self.entries.push(entry);
        self.layouts.push(layout);

        if let Some(pos) = self.nodes.iter().position(|n| matches!(n, Node::EmptyRoot(_))) {
            let open = match &self.nodes[pos] {
                Node::EmptyRoot(raw) => format!("{}>", raw.trim_end_matches("/>").trim_end()),
                _ => String::from("<resources>"),
            };
            self.nodes.splice(
                pos..=pos,
                [
                    Node::Raw(open),
                    Node::Raw(indent),
                    Node::Entry(slot),
                    Node::Raw("\n".to_string()),
                    Node::Close("</resources>".to_string()),
                ],
            );
            return;
        }

        let close = self
            .nodes
            .iter()
            .position(|n| matches!(n, Node::Close(_)))
            .unwrap_or(self.nodes.len());

        // Keep the whitespace that precedes </resources> after the new entry
        let mut trailing = "\n".to_string();
        if close > 0 {
            if let Node::Raw(text) = &mut self.nodes[close - 1] {
                let head_len = text.trim_end().len();
                trailing = text.split_off(head_len);
            }
        }
        self.nodes
            .splice(close..close, [Node::Raw(indent), Node::Entry(slot), Node::Raw(trailing)]);
    }

    /// Whitespace that introduces the first entry, reused for appended entries
    fn entry_indent(&self) -> String {
        let first_entry = self.nodes.iter().position(|n| matches!(n, Node::Entry(_)));
        if let Some(pos) = first_entry.filter(|pos| *pos > 0) {
            if let Node::Raw(text) = &self.nodes[pos - 1] {
                if let Some(nl) = text.rfind('\n') {
                    let indent = &text[nl..];
                    if indent.trim().is_empty() {
                        return indent.to_string();
                    }
                }
            }
        }
        DEFAULT_ENTRY_INDENT.to_string()
    }

    fn push_raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Raw(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(Node::Raw(text.to_string()));
        }
    }

    fn push_entry(&mut self, entry: ResourceEntry, layout: Vec<Piece>) -> Result<(), ParseError> {
        let key = (entry.kind(), entry.name().to_string());
        if self.index.contains_key(&key) {
            return Err(ParseError::DuplicateName {
                kind: entry.kind().to_string(),
                name: entry.name().to_string(),
            });
        }
        let slot = self.entries.len();
        self.index.insert(key, slot);
        self.entries.push(entry);
        self.layouts.push(layout);
        self.nodes.push(Node::Entry(slot));
        Ok(())
    }
}

fn check_root(e: &BytesStart<'_>, root_seen: bool) -> Result<(), ParseError> {
    let name = e.name();
    if root_seen || name.as_ref() != b"resources" {
        return Err(ParseError::UnexpectedRoot(format!(
            "<{}>",
            String::from_utf8_lossy(name.as_ref())
        )));
    }
    Ok(())
}

/// Accumulates entry pieces, folding adjacent raw text together
#[derive(Default)]
struct LayoutBuilder {
    pieces: Vec<Piece>,
}

impl LayoutBuilder {
    fn raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Piece::Raw(last)) = self.pieces.last_mut() {
            last.push_str(text);
        } else {
            self.pieces.push(Piece::Raw(text.to_string()));
        }
    }

    fn piece(&mut self, piece: Piece) {
        self.pieces.push(piece);
    }

    fn finish(self) -> Vec<Piece> {
        self.pieces
    }
}

/// Attributes the parser cares about on an entry or item
struct EntryAttributes {
    name: Option<String>,
    quantity: Option<String>,
    translatable: bool,
}

/// Thin wrapper over the quick-xml reader that reports byte offsets
struct EventSource<'a> {
    src: &'a str,
    reader: Reader<&'a [u8]>,
}

impl<'a> EventSource<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            reader: Reader::from_str(src),
        }
    }

    fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    /// Next event with the byte offset just past it
    fn next(&mut self) -> Result<(Event<'a>, usize), ParseError> {
        match self.reader.read_event() {
            Ok(event) => Ok((event, self.position())),
            Err(e) => Err(ParseError::Xml {
                position: self.position(),
                message: e.to_string(),
            }),
        }
    }

    /// Offset of the `<` opening the markup that ends at `end`
    fn tag_start(&self, end: usize) -> usize {
        self.src[..end].rfind('<').unwrap_or(0)
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::Xml {
            position: self.position(),
            message: message.to_string(),
        }
    }

    fn attributes(&self, e: &BytesStart<'_>) -> Result<EntryAttributes, ParseError> {
        let mut attrs = EntryAttributes {
            name: None,
            quantity: None,
            translatable: true,
        };
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.error(&err.to_string()))?;
            let value = attr.unescape_value().map_err(|err| self.error(&err.to_string()))?;
            match attr.key.as_ref() {
                b"name" => attrs.name = Some(value.into_owned()),
                b"quantity" => attrs.quantity = Some(value.into_owned()),
                b"translatable" => attrs.translatable = !value.trim().eq_ignore_ascii_case("false"),
                _ => {}
            }
        }
        Ok(attrs)
    }

    fn required_name(&self, kind: ResourceKind, attrs: &EntryAttributes, start: usize) -> Result<String, ParseError> {
        attrs.name.clone().ok_or(ParseError::MissingAttribute {
            element: kind.tag().to_string(),
            attribute: "name",
            position: start,
        })
    }

    /// Consume events up to the end tag matching an already-read start tag
    ///
    /// Returns the byte range of that end tag.
    fn skip_to_close(&mut self) -> Result<(usize, usize), ParseError> {
        let mut depth = 0usize;
        loop {
            let (event, end) = self.next()?;
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    if depth == 0 {
                        return Ok((self.tag_start(end), end));
                    }
                    depth -= 1;
                }
                Event::Eof => return Err(self.error("unexpected end of input inside an element")),
                _ => {}
            }
        }
    }

    /// Parse an entry whose start tag spans `start..open_end`
    ///
    /// Returns the entry, its layout and the offset just past its end tag.
    fn parse_entry(
        &mut self,
        kind: ResourceKind,
        e: &BytesStart<'_>,
        start: usize,
        open_end: usize,
    ) -> Result<(ResourceEntry, Vec<Piece>, usize), ParseError> {
        let attrs = self.attributes(e)?;
        let name = self.required_name(kind, &attrs, start)?;
        let mut layout = LayoutBuilder::default();
        layout.raw(&self.src[start..open_end]);

        if kind == ResourceKind::String {
            let (close_start, close_end) = self.skip_to_close()?;
            layout.piece(Piece::Leaf(0));
            layout.raw(&self.src[close_start..close_end]);
            let entry = ResourceEntry::SimpleString {
                name,
                value: self.src[open_end..close_start].to_string(),
                translatable: attrs.translatable,
            };
            return Ok((entry, layout.finish(), close_end));
        }

        let mut items: Vec<String> = Vec::new();
        let mut quantities: Vec<(String, String)> = Vec::new();
        let mut seen_quantities = HashSet::new();
        let mut last = open_end;

        loop {
            let (event, end) = self.next()?;
            match event {
                Event::Start(item) if item.name().as_ref() == b"item" => {
                    let item_start = self.tag_start(end);
                    let quantity = self.item_quantity(kind, &name, &item, item_start, &mut seen_quantities)?;
                    layout.raw(&self.src[last..end]);
                    let (close_start, _) = self.skip_to_close()?;
                    let text = self.src[end..close_start].to_string();
                    let leaf = push_item(&mut items, &mut quantities, quantity, text);
                    layout.piece(Piece::Leaf(leaf));
                    last = close_start;
                }
                Event::Empty(item) if item.name().as_ref() == b"item" => {
                    let item_start = self.tag_start(end);
                    let quantity = self.item_quantity(kind, &name, &item, item_start, &mut seen_quantities)?;
                    layout.raw(&self.src[last..item_start]);
                    let leaf = push_item(&mut items, &mut quantities, quantity, String::new());
                    layout.piece(Piece::EmptyLeaf {
                        leaf,
                        raw: self.src[item_start..end].to_string(),
                        tag: "item".to_string(),
                    });
                    last = end;
                }
                Event::Start(_) => {
                    self.skip_to_close()?;
                }
                Event::End(_) => {
                    layout.raw(&self.src[last..end]);
                    let entry = match kind {
                        ResourceKind::Plurals => ResourceEntry::Plural {
                            name,
                            quantities,
                            translatable: attrs.translatable,
                        },
                        _ => ResourceEntry::StringArray {
                            name,
                            items,
                            translatable: attrs.translatable,
                        },
                    };
                    return Ok((entry, layout.finish(), end));
                }
                Event::Eof => return Err(self.error(&format!("unexpected end of input inside <{}>", kind.tag()))),
                _ => {}
            }
        }
    }

    /// Entry written as a single self-closing tag
    fn parse_empty_entry(
        &self,
        kind: ResourceKind,
        e: &BytesStart<'_>,
        start: usize,
        end: usize,
    ) -> Result<(ResourceEntry, Vec<Piece>), ParseError> {
        let attrs = self.attributes(e)?;
        let name = self.required_name(kind, &attrs, start)?;
        let raw = self.src[start..end].to_string();
        let translatable = attrs.translatable;
        Ok(match kind {
            ResourceKind::String => (
                ResourceEntry::SimpleString {
                    name,
                    value: String::new(),
                    translatable,
                },
                vec![Piece::EmptyLeaf {
                    leaf: 0,
                    raw,
                    tag: kind.tag().to_string(),
                }],
            ),
            ResourceKind::StringArray => (
                ResourceEntry::StringArray {
                    name,
                    items: Vec::new(),
                    translatable,
                },
                vec![Piece::Raw(raw)],
            ),
            ResourceKind::Plurals => (
                ResourceEntry::Plural {
                    name,
                    quantities: Vec::new(),
                    translatable,
                },
                vec![Piece::Raw(raw)],
            ),
        })
    }

    fn item_quantity(
        &self,
        kind: ResourceKind,
        entry_name: &str,
        item: &BytesStart<'_>,
        item_start: usize,
        seen: &mut HashSet<String>,
    ) -> Result<Option<String>, ParseError> {
        if kind != ResourceKind::Plurals {
            return Ok(None);
        }
        let quantity = self.attributes(item)?.quantity.ok_or(ParseError::MissingAttribute {
            element: "item".to_string(),
            attribute: "quantity",
            position: item_start,
        })?;
        if !seen.insert(quantity.clone()) {
            return Err(ParseError::DuplicateName {
                kind: "plurals item".to_string(),
                name: format!("{}:{}", entry_name, quantity),
            });
        }
        Ok(Some(quantity))
    }
}

fn push_item(
    items: &mut Vec<String>,
    quantities: &mut Vec<(String, String)>,
    quantity: Option<String>,
    text: String,
) -> usize {
    match quantity {
        Some(quantity) => {
            quantities.push((quantity, text));
            quantities.len() - 1
        }
        None => {
            items.push(text);
            items.len() - 1
        }
    }
}
