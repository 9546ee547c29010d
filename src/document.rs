use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ebml_document_schema::{EbmlSchema, ValueKind};
use log::{debug, warn};

use super::element::{Element, ElementId, SavedRange, Value};
use super::errors::document::DocumentError;
use super::errors::source::SourceError;
use super::errors::tool::ToolError;
use super::source::{self, ByteSource, DataSource, FileDataSource};
use super::tools::{self, Vint};

///
/// A schema shared between documents and decoders.
///
pub type SharedSchema = Arc<dyn EbmlSchema + Send + Sync>;

///
/// Result of [`Document::find_by_offset`].
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OffsetHit {
    /// The offset is the first byte of this element.
    Start(ElementId),
    /// The offset falls inside this element without starting any of its descendants.
    Middle(ElementId),
}

///
/// Sizes and positions of every attached element, computed in one pass over the tree.
///
pub(crate) struct Layout {
    sizes: Vec<Option<u64>>,
    content_sizes: Vec<Option<u64>>,
    positions: Vec<Option<u64>>,
}

impl Layout {
    pub(crate) fn size(&self, id: ElementId) -> Option<u64> {
        self.sizes[id.0]
    }

    pub(crate) fn content_size(&self, id: ElementId) -> Option<u64> {
        self.content_sizes[id.0]
    }

    pub(crate) fn position(&self, id: ElementId) -> Option<u64> {
        self.positions[id.0]
    }

    pub(crate) fn content_position(&self, id: ElementId) -> Option<u64> {
        Some(self.position(id)? + self.size(id)? - self.content_size(id)?)
    }
}

///
/// An EBML document held as a tree of [`Element`]s.
///
/// The document owns every element in an arena; elements refer to their parent, children and cross-reference targets by [`ElementId`].  The root element is not encoded itself: its children are the top-level elements of the stream (the EBML header and the Segment for Matroska).
///
/// Documents come from [`parse`](crate::parse) (and friends) or from [`Document::new`] for in-memory authoring.  Every mutation marks the element and all of its ancestors as modified; the writer copies unmodified elements verbatim from the source and re-encodes the rest.
///
/// ## Example
///
/// ```
/// use ebml_document::Document;
/// use ebml_document::schema::matroska::{ids, matroska};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut doc = Document::new(matroska());
/// let header = doc.create_element(ids::EBML);
/// let doc_type = doc.create_element(ids::DOC_TYPE);
/// doc.set_value(doc_type, "webm")?;
/// doc.append_child(header, doc_type)?;
/// doc.append_child(doc.root(), header)?;
///
/// assert_eq!(Some(doc_type), doc.get_first_child_by_name(doc.root(), "DocType"));
/// # Ok(())
/// # }
/// ```
///
pub struct Document {
    schema: SharedSchema,
    elements: Vec<Element>,
    source: Option<Arc<dyn ByteSource>>,
    positions: BTreeSet<ElementId>,
    crcs: BTreeSet<ElementId>,
    partial: bool,
    links_built: bool,
}

impl Document {
    pub fn new(schema: SharedSchema) -> Self {
        let mut root = Element::new(ElementId(0), 0, ValueKind::Master, None);
        root.header_id_size = 0;
        Document {
            schema,
            elements: vec![root],
            source: None,
            positions: BTreeSet::new(),
            crcs: BTreeSet::new(),
            partial: false,
            links_built: false,
        }
    }

    pub(crate) fn with_source(schema: SharedSchema, source: Arc<dyn ByteSource>) -> Self {
        let mut doc = Document::new(schema);
        doc.source = Some(source);
        doc
    }

    pub fn schema(&self) -> &SharedSchema {
        &self.schema
    }

    ///
    /// The byte source the document was decoded from.  The writer copies unmodified elements from it.
    ///
    pub fn source(&self) -> Option<&Arc<dyn ByteSource>> {
        self.source.as_ref()
    }

    ///
    /// Set when only some sections were decoded (see [`parse_sections`](crate::parse_sections)).  Partial documents cannot be modified or written.
    ///
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub(crate) fn set_partial(&mut self, partial: bool) {
        self.partial = partial;
    }

    pub fn links_built(&self) -> bool {
        self.links_built
    }

    pub fn is_modified(&self) -> bool {
        self.elements[0].is_modified()
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    ///
    /// Looks an element up by the numeric value of its [`ElementId`].
    ///
    pub fn get_element_by_id(&self, id: u64) -> Option<ElementId> {
        usize::try_from(id).ok().filter(|&index| index < self.elements.len()).map(ElementId)
    }

    pub(crate) fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    fn checked(&self, id: ElementId) -> Result<&Element, DocumentError> {
        self.elements.get(id.0).ok_or(DocumentError::InvalidHierarchy { element: id.get(), reason: "unknown element" })
    }

    fn check_mutable(&self) -> Result<(), DocumentError> {
        if self.partial {
            Err(DocumentError::PartialDocumentImmutable)
        } else {
            Ok(())
        }
    }

    ///
    /// Registered cross-reference elements, in creation order.
    ///
    pub fn cross_references(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.positions.iter().copied()
    }

    ///
    /// Registered checksum elements, in creation order.
    ///
    pub fn checksums(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.crcs.iter().copied()
    }

    //
    // Element creation
    //

    fn new_element(&mut self, ebml_id: u32) -> ElementId {
        let id = ElementId(self.elements.len());
        let (kind, name) = match self.schema.descriptor(ebml_id) {
            Some(desc) => (desc.kind, Some(desc.name)),
            None => (ValueKind::Binary, None),
        };
        self.elements.push(Element::new(id, ebml_id, kind, name));
        id
    }

    ///
    /// Creates a detached element.  Ids that the schema does not know create binary elements.
    ///
    /// The element is part of the tree once it is inserted with [`Self::append_child`] or [`Self::insert_before`].
    ///
    pub fn create_element(&mut self, ebml_id: u32) -> ElementId {
        let id = self.new_element(ebml_id);
        self.elements[id.0].modified = Some(SavedRange::default());
        id
    }

    pub fn create_element_by_name(&mut self, name: &str) -> Result<ElementId, DocumentError> {
        let ebml_id = self.schema.id_by_name(name).ok_or_else(|| DocumentError::UnknownName(name.to_string()))?;
        Ok(self.create_element(ebml_id))
    }

    ///
    /// Attaches an element read from the source.  Siblings stay ordered by their offset in the source.
    ///
    pub(crate) fn attach_decoded(&mut self, parent: ElementId, ebml_id: u32, start: u64, header_id_size: usize) -> ElementId {
        let id = self.new_element(ebml_id);
        {
            let element = &mut self.elements[id.0];
            element.start = Some(start);
            element.header_id_size = header_id_size;
            element.parent = Some(parent);
        }

        let index = {
            let siblings = &self.elements[parent.0].children;
            siblings.partition_point(|sibling| self.elements[sibling.0].start.map_or(true, |s| s < start))
        };
        self.elements[parent.0].children.insert(index, id);
        self.register(id);
        id
    }

    //
    // Tree mutation
    //

    fn mark_modified(&mut self, id: ElementId) {
        let mut current = Some(id);
        while let Some(cur) = current {
            let element = &mut self.elements[cur.0];
            if element.modified.is_some() {
                break;
            }
            element.modified = Some(SavedRange { start: element.start.take(), end: element.end.take() });
            element.length = None;
            current = element.parent;
        }
    }

    fn register(&mut self, id: ElementId) {
        if let Some(desc) = self.schema.descriptor(self.elements[id.0].ebml_id) {
            if desc.is_cross_reference() {
                self.positions.insert(id);
            }
            if desc.is_checksum() {
                self.crcs.insert(id);
            }
        }
    }

    fn register_subtree(&mut self, id: ElementId) {
        for member in self.subtree(id) {
            self.register(member);
        }
    }

    fn unregister_subtree(&mut self, id: ElementId) {
        for member in self.subtree(id) {
            self.positions.remove(&member);
            self.crcs.remove(&member);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.elements[cur.0].parent;
        }
        false
    }

    ///
    /// Whether the element is reachable from the root.
    ///
    pub fn is_attached(&self, id: ElementId) -> bool {
        self.is_ancestor_or_self(self.root(), id)
    }

    fn detach(&mut self, child: ElementId) -> Option<ElementId> {
        let old_parent = self.elements[child.0].parent.take()?;
        self.elements[old_parent.0].children.retain(|c| *c != child);
        self.mark_modified(old_parent);
        Some(old_parent)
    }

    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), DocumentError> {
        self.insert_before(parent, child, None)
    }

    ///
    /// Inserts `child` under `parent`, before the `before` sibling or last if `before` is `None`.
    ///
    /// An element that already has a parent is moved.  Cross-reference and checksum elements of the inserted subtree are registered once it is reachable from the root.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentError::PartialDocumentImmutable`] on partial documents and with [`DocumentError::InvalidHierarchy`] if the insertion would not produce a tree.
    ///
    pub fn insert_before(&mut self, parent: ElementId, child: ElementId, before: Option<ElementId>) -> Result<(), DocumentError> {
        self.check_mutable()?;
        let parent_element = self.checked(parent)?;
        self.checked(child)?;

        if !parent_element.is_master() {
            return Err(DocumentError::InvalidHierarchy { element: parent.get(), reason: "parent is not a master element" });
        }
        if parent_element.children_skipped {
            return Err(DocumentError::InvalidHierarchy { element: parent.get(), reason: "children of parent were not loaded" });
        }
        if child == self.root() || self.is_ancestor_or_self(child, parent) {
            return Err(DocumentError::InvalidHierarchy { element: child.get(), reason: "element cannot be inserted into its own subtree" });
        }
        if let Some(before) = before {
            if before == child || self.elements[before.0].parent != Some(parent) {
                return Err(DocumentError::InvalidHierarchy { element: before.get(), reason: "reference element is not a child of parent" });
            }
        }

        let was_attached = self.is_attached(child);
        self.detach(child);

        let children = &mut self.elements[parent.0].children;
        let index = before.and_then(|b| children.iter().position(|c| *c == b)).unwrap_or(children.len());
        children.insert(index, child);
        self.elements[child.0].parent = Some(parent);

        if self.is_attached(parent) {
            self.register_subtree(child);
        } else if was_attached {
            self.unregister_subtree(child);
        }
        self.mark_modified(parent);
        Ok(())
    }

    ///
    /// Removes the element (and its subtree) from the tree and unregisters its cross-reference and checksum elements.  The element stays valid and can be inserted again.
    ///
    pub fn remove(&mut self, id: ElementId) -> Result<(), DocumentError> {
        self.check_mutable()?;
        if self.checked(id)?.parent.is_none() {
            return Err(DocumentError::InvalidHierarchy { element: id.get(), reason: "element has no parent" });
        }
        self.unregister_subtree(id);
        self.detach(id);
        Ok(())
    }

    ///
    /// Moves a child of `parent` before its `before` sibling, or last.  Registries are not touched.
    ///
    pub fn move_child_before(&mut self, parent: ElementId, child: ElementId, before: Option<ElementId>) -> Result<(), DocumentError> {
        self.check_mutable()?;
        self.checked(parent)?;
        if self.checked(child)?.parent != Some(parent) {
            return Err(DocumentError::InvalidHierarchy { element: child.get(), reason: "element is not a child of parent" });
        }
        if before == Some(child) {
            return Ok(());
        }
        if let Some(before) = before {
            if self.checked(before)?.parent != Some(parent) {
                return Err(DocumentError::InvalidHierarchy { element: before.get(), reason: "reference element is not a child of parent" });
            }
        }

        let children = &mut self.elements[parent.0].children;
        children.retain(|c| *c != child);
        let index = before.and_then(|b| children.iter().position(|c| *c == b)).unwrap_or(children.len());
        children.insert(index, child);
        self.mark_modified(parent);
        Ok(())
    }

    //
    // Values
    //

    pub fn get_value(&self, id: ElementId) -> Result<Option<Value>, DocumentError> {
        Ok(self.checked(id)?.value()?)
    }

    ///
    /// Sets the value of a leaf element.
    ///
    /// The encoding follows the value: strings are stored as is (ASCII only for `String` elements), unsigned and non-negative integers with the fewest bytes, booleans as 0 or 1, floats on 4 bytes when that loses nothing, dates as 8 bytes, binary as is.  Integers are accepted by float elements.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentError::UnsupportedValue`] if the element kind cannot hold the value, and with [`DocumentError::Tool`] if an integer needs more than 52 significant bits.
    ///
    pub fn set_value(&mut self, id: ElementId, value: impl Into<Value>) -> Result<(), DocumentError> {
        self.check_mutable()?;
        let value = value.into();
        let kind = self.checked(id)?.kind;
        let unsupported = || DocumentError::UnsupportedValue { element: id.get(), kind, value: value.to_string() };

        let data = match (&value, kind) {
            (_, ValueKind::Master) => return Err(unsupported()),
            (Value::String(val), ValueKind::String) if val.is_ascii() => val.as_bytes().to_vec(),
            (Value::String(val), ValueKind::Utf8) => val.as_bytes().to_vec(),
            (Value::Boolean(val), ValueKind::UnsignedInt) => tools::write_uint(*val as u64)?,
            (Value::UnsignedInt(val), ValueKind::UnsignedInt) => tools::write_uint(*val)?,
            (Value::Integer(val), ValueKind::UnsignedInt) if *val >= 0 => tools::write_uint(*val as u64)?,
            (Value::UnsignedInt(val), ValueKind::Integer) => {
                let val = i64::try_from(*val).map_err(|_| ToolError::Unrepresentable(val.to_string()))?;
                tools::write_int(val)?
            },
            (Value::Integer(val), ValueKind::Integer) => tools::write_int(*val)?,
            (Value::Float(val), ValueKind::Float) => tools::write_float(*val),
            (Value::UnsignedInt(val), ValueKind::Float) => tools::write_float(*val as f64),
            (Value::Integer(val), ValueKind::Float) => tools::write_float(*val as f64),
            (Value::Date(val), ValueKind::Date) => tools::write_date(val)?,
            (Value::Binary(val), ValueKind::Binary) => val.clone(),
            _ => return Err(unsupported()),
        };

        self.replace_data(id, data);
        Ok(())
    }

    pub(crate) fn replace_data(&mut self, id: ElementId, data: Vec<u8>) {
        let element = &mut self.elements[id.0];
        element.data_size = Some(data.len() as u64);
        element.data = Some(data);
        element.data_source = None;
        self.mark_modified(id);
    }

    pub fn set_uint(&mut self, id: ElementId, value: u64) -> Result<(), DocumentError> {
        self.set_value(id, Value::UnsignedInt(value))
    }

    pub fn set_int(&mut self, id: ElementId, value: i64) -> Result<(), DocumentError> {
        self.set_value(id, Value::Integer(value))
    }

    pub fn set_float(&mut self, id: ElementId, value: f64) -> Result<(), DocumentError> {
        self.set_value(id, Value::Float(value))
    }

    ///
    /// Sets the value of an ASCII string element.
    ///
    pub fn set_string(&mut self, id: ElementId, value: &str) -> Result<(), DocumentError> {
        if self.checked(id)?.kind != ValueKind::String {
            return Err(DocumentError::UnsupportedValue { element: id.get(), kind: self.get(id).kind, value: value.to_string() });
        }
        self.set_value(id, value)
    }

    pub fn set_utf8(&mut self, id: ElementId, value: &str) -> Result<(), DocumentError> {
        if self.checked(id)?.kind != ValueKind::Utf8 {
            return Err(DocumentError::UnsupportedValue { element: id.get(), kind: self.get(id).kind, value: value.to_string() });
        }
        self.set_value(id, value)
    }

    pub fn set_date(&mut self, id: ElementId, value: DateTime<Utc>) -> Result<(), DocumentError> {
        self.set_value(id, Value::Date(value))
    }

    pub fn set_binary(&mut self, id: ElementId, value: &[u8]) -> Result<(), DocumentError> {
        self.set_value(id, value)
    }

    ///
    /// Stores a CRC-32 value in a checksum element (4 bytes, little endian).
    ///
    pub fn set_checksum_value(&mut self, id: ElementId, crc: u32) -> Result<(), DocumentError> {
        self.set_value(id, tools::write_checksum(crc).to_vec())
    }

    ///
    /// Stores the encoded form of `target_ebml_id` in a binary element, as index entries do to name the section they point to.
    ///
    pub fn set_seek_id(&mut self, id: ElementId, target_ebml_id: u32) -> Result<(), DocumentError> {
        self.set_value(id, tools::write_element_id(target_ebml_id))
    }

    ///
    /// Makes the content of a leaf element come from `data_source` when the document is written.
    ///
    pub fn set_data_source(&mut self, id: ElementId, data_source: Arc<dyn DataSource>) -> Result<(), DocumentError> {
        self.check_mutable()?;
        let element = self.checked(id)?;
        if element.is_master() {
            return Err(DocumentError::UnsupportedValue { element: id.get(), kind: element.kind, value: format!("{:?}", data_source) });
        }

        let element = &mut self.elements[id.0];
        element.data = None;
        element.data_size = Some(data_source.size());
        element.data_source = Some(data_source);
        self.mark_modified(id);
        Ok(())
    }

    pub fn set_file_data_source(&mut self, id: ElementId, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let data_source = FileDataSource::new(path)?;
        self.set_data_source(id, Arc::new(data_source))
    }

    ///
    /// Sets the element a cross-reference element points to.  Its value is computed when the document is written.
    ///
    pub fn set_cross_reference_target(&mut self, id: ElementId, target: ElementId) -> Result<(), DocumentError> {
        self.check_mutable()?;
        self.checked(target)?;
        let ebml_id = self.checked(id)?.ebml_id;
        if !self.schema.descriptor(ebml_id).map_or(false, |d| d.is_cross_reference()) {
            return Err(DocumentError::InvalidHierarchy { element: id.get(), reason: "element is not a cross-reference" });
        }
        self.elements[id.0].cross_reference_target = Some(target);
        self.mark_modified(id);
        Ok(())
    }

    ///
    /// Re-encodes integer and float leaves whose stored width is larger than needed.  Returns the number of rewritten elements.
    ///
    /// Other kinds are not decoded.  Values that cannot be decoded, or re-encoded within the representable range, keep their stored bytes.
    ///
    pub fn optimize_data(&mut self) -> Result<usize, DocumentError> {
        self.check_mutable()?;
        let mut count = 0;
        for id in self.subtree(self.root()) {
            let element = &self.elements[id.0];
            if !matches!(element.kind, ValueKind::UnsignedInt | ValueKind::Integer | ValueKind::Float) {
                continue;
            }
            let stored = match &element.data {
                Some(data) => data.len(),
                None => continue,
            };
            let optimal = match element.value() {
                Ok(Some(Value::UnsignedInt(val))) => tools::write_uint(val).ok(),
                Ok(Some(Value::Integer(val))) => tools::write_int(val).ok(),
                Ok(Some(Value::Float(val))) => Some(tools::write_float(val)),
                _ => None,
            };
            let optimal = match optimal {
                Some(optimal) => optimal,
                None => continue,
            };
            if optimal.len() != stored {
                self.replace_data(id, optimal);
                count += 1;
            }
        }
        Ok(count)
    }

    //
    // Queries
    //

    ///
    /// Returns the elements of the subtree rooted at `id` in pre-order, `id` included.
    ///
    pub fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        self.deep_walk(id, |child| result.push(child));
        result
    }

    ///
    /// Calls `func` on every element of the subtree rooted at `id`, parents before children.
    ///
    pub fn deep_walk<F: FnMut(ElementId)>(&self, id: ElementId, mut func: F) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            func(current);
            stack.extend(self.elements[current.0].children.iter().rev());
        }
    }

    ///
    /// Calls `func` on the descendants of `id` named `name`, in document order, until it returns `Some`.
    ///
    /// The search does not descend into matching elements.  An unknown name matches nothing.
    ///
    pub fn each_child_by_name<T, F: FnMut(ElementId) -> Option<T>>(&self, id: ElementId, name: &str, mut func: F) -> Option<T> {
        let ebml_id = self.schema.id_by_name(name)?;
        let mut stack: Vec<ElementId> = self.elements[id.0].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            let element = &self.elements[current.0];
            if element.ebml_id == ebml_id {
                if let Some(result) = func(current) {
                    return Some(result);
                }
                continue;
            }
            stack.extend(element.children.iter().rev());
        }
        None
    }

    pub fn get_first_child_by_name(&self, id: ElementId, name: &str) -> Option<ElementId> {
        self.each_child_by_name(id, name, Some)
    }

    pub fn list_children_by_name(&self, id: ElementId, name: &str) -> Vec<ElementId> {
        let mut result = Vec::new();
        self.each_child_by_name(id, name, |child| -> Option<()> {
            result.push(child);
            None
        });
        result
    }

    pub fn get_direct_child_by_name(&self, id: ElementId, name: &str) -> Option<ElementId> {
        let ebml_id = self.schema.id_by_name(name)?;
        self.elements[id.0].children.iter().copied().find(|c| self.elements[c.0].ebml_id == ebml_id)
    }

    ///
    /// Gets the value of the first descendant of `id` named `name`.
    ///
    pub fn get_by_name(&self, id: ElementId, name: &str) -> Result<Option<Value>, DocumentError> {
        match self.get_first_child_by_name(id, name) {
            Some(child) => self.get_value(child),
            None => Ok(None),
        }
    }

    ///
    /// Sets the value of the first descendant of `id` named `name`, appending a new child to `id` if there is none.
    ///
    pub fn set_by_name(&mut self, id: ElementId, name: &str, value: impl Into<Value>) -> Result<ElementId, DocumentError> {
        let child = match self.get_first_child_by_name(id, name) {
            Some(child) => child,
            None => {
                self.check_mutable()?;
                let child = self.create_element_by_name(name)?;
                self.append_child(id, child)?;
                child
            },
        };
        self.set_value(child, value)?;
        Ok(child)
    }

    ///
    /// The ancestor of `id` that is a direct child of the root (the Segment for Matroska streams).  Cross-reference values are relative to its content.
    ///
    pub fn top_level_ancestor(&self, id: ElementId) -> Option<ElementId> {
        let mut current = id;
        loop {
            let parent = self.elements[current.0].parent?;
            if parent == self.root() {
                return Some(current);
            }
            current = parent;
        }
    }

    pub fn depth(&self, id: ElementId) -> usize {
        let mut depth = 0;
        let mut current = self.elements[id.0].parent;
        while let Some(cur) = current {
            depth += 1;
            current = self.elements[cur.0].parent;
        }
        depth
    }

    ///
    /// Opens the content of a leaf: data in memory, else its data source, else the element's range in the document source.
    ///
    pub fn open_data(&self, id: ElementId) -> Result<Box<dyn Read + Send>, DocumentError> {
        let element = self.checked(id)?;
        if let Some(data) = &element.data {
            return Ok(Box::new(Cursor::new(data.clone())));
        }
        if let Some(data_source) = &element.data_source {
            return Ok(data_source.open()?);
        }

        let missing = || SourceError::NoSource { element: id.get() };
        let (_, end) = element.original_range().ok_or_else(missing)?;
        let size = element.data_size.unwrap_or(0);
        let source = self.source.as_ref().ok_or_else(missing)?;
        Ok(source::open_exact(source.as_ref(), end - size, Some(end))?)
    }

    //
    // Geometry
    //

    fn header_size(&self, element: &Element, content_size: u64) -> Result<u64, ToolError> {
        if element.id == self.root() {
            return Ok(0);
        }
        if element.modified.is_none() && element.start.is_some() {
            return Ok((element.header_id_size + element.header_len_size) as u64);
        }
        Ok((tools::element_id_size(element.ebml_id) + tools::vint_size(content_size)?) as u64)
    }

    ///
    /// Number of content bytes of the element as it will be written.
    ///
    pub fn content_size_of(&self, id: ElementId) -> Result<u64, DocumentError> {
        let element = self.checked(id)?;
        if element.modified.is_none() && element.start.is_some() && element.id != self.root() {
            if let Some(size) = element.data_size {
                return Ok(size);
            }
        }
        if element.is_master() {
            let mut total = 0;
            for child in &element.children {
                total += self.size_of(*child)?;
            }
            Ok(total)
        } else {
            Ok(element.data_size().unwrap_or(0))
        }
    }

    ///
    /// Number of bytes the element (header included) takes when written.
    ///
    pub fn size_of(&self, id: ElementId) -> Result<u64, DocumentError> {
        let element = self.checked(id)?;
        if let (None, Some(start), Some(end)) = (&element.modified, element.start, element.end) {
            if element.id != self.root() {
                return Ok(end - start);
            }
        }
        let content = self.content_size_of(id)?;
        Ok(self.header_size(element, content)? + content)
    }

    ///
    /// Absolute offset of the element once written: its parent's content position plus the sizes of the siblings before it.
    ///
    pub fn position_of(&self, id: ElementId) -> Result<u64, DocumentError> {
        let parent = match self.checked(id)?.parent {
            Some(parent) => parent,
            None => return Ok(0),
        };
        let mut position = self.content_position_of(parent)?;
        for sibling in &self.elements[parent.0].children {
            if *sibling == id {
                break;
            }
            position += self.size_of(*sibling)?;
        }
        Ok(position)
    }

    pub fn content_position_of(&self, id: ElementId) -> Result<u64, DocumentError> {
        if id == self.root() {
            return Ok(0);
        }
        let element = self.checked(id)?;
        let content = self.content_size_of(id)?;
        Ok(self.position_of(id)? + self.header_size(element, content)?)
    }

    pub(crate) fn layout(&self) -> Result<Layout, DocumentError> {
        let count = self.elements.len();
        let mut layout = Layout {
            sizes: vec![None; count],
            content_sizes: vec![None; count],
            positions: vec![None; count],
        };
        self.measure(self.root(), &mut layout)?;
        self.place(self.root(), 0, &mut layout);
        Ok(layout)
    }

    fn measure(&self, id: ElementId, layout: &mut Layout) -> Result<u64, DocumentError> {
        let element = &self.elements[id.0];
        let mut children_total = 0;
        for child in &element.children {
            children_total += self.measure(*child, layout)?;
        }

        let content = if element.modified.is_none() && element.start.is_some() && element.data_size.is_some() && id != self.root() {
            element.data_size.unwrap_or(0)
        } else if element.is_master() {
            children_total
        } else {
            element.data_size().unwrap_or(0)
        };
        let size = self.header_size(element, content)? + content;

        layout.content_sizes[id.0] = Some(content);
        layout.sizes[id.0] = Some(size);
        Ok(size)
    }

    fn place(&self, id: ElementId, position: u64, layout: &mut Layout) {
        layout.positions[id.0] = Some(position);
        let element = &self.elements[id.0];
        let mut child_position = position + layout.sizes[id.0].unwrap_or(0) - layout.content_sizes[id.0].unwrap_or(0);
        for child in &element.children {
            self.place(*child, child_position, layout);
            child_position += layout.sizes[child.0].unwrap_or(0);
        }
    }

    ///
    /// Finds what lies at absolute source offset `offset` within the subtree of `scope`, using the ranges elements had in the source.
    ///
    /// Returns `None` if `offset` is outside `scope`.
    ///
    pub fn find_by_offset(&self, scope: ElementId, offset: u64) -> Option<OffsetHit> {
        let element = &self.elements[scope.0];
        let (start, end) = element.original_range()?;
        if offset < start || offset >= end {
            return None;
        }
        if offset == start {
            return Some(OffsetHit::Start(scope));
        }
        for child in &element.children {
            if let Some(hit) = self.find_by_offset(*child, offset) {
                return Some(hit);
            }
        }
        Some(OffsetHit::Middle(scope))
    }

    fn original_content_start(&self, id: ElementId) -> Option<u64> {
        let element = &self.elements[id.0];
        let (start, _) = element.original_range()?;
        Some(start + (element.header_id_size + element.header_len_size) as u64)
    }

    ///
    /// Resolves every registered cross-reference element to the element its value points to.
    ///
    /// Values are offsets from the content of the element's top-level ancestor.  Targets that cannot be found are logged and left unset.
    ///
    pub fn build_links(&mut self) {
        let positions: Vec<ElementId> = self.positions.iter().copied().collect();
        for id in positions {
            let offset = match self.elements[id.0].value() {
                Ok(Some(Value::UnsignedInt(offset))) => offset,
                _ => {
                    debug!("Cross-reference {} has no readable value", id);
                    continue;
                },
            };

            let target = self.top_level_ancestor(id)
                .and_then(|top| Some((top, self.original_content_start(top)?)))
                .and_then(|(top, base)| self.find_by_offset(top, base + offset));

            match target {
                Some(OffsetHit::Start(target)) => self.elements[id.0].cross_reference_target = Some(target),
                _ if self.partial => debug!("Target of cross-reference {} at offset {} is not loaded", id, offset),
                _ => warn!("Can not find target of cross-reference {} for offset {}", id, offset),
            }
        }
        self.links_built = true;
    }

    ///
    /// Returns a listing of the tree, one element per line: position, id, name and value.
    ///
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let layout = self.layout().ok();
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((id, level)) = stack.pop() {
            let element = &self.elements[id.0];
            for child in element.children.iter().rev() {
                stack.push((*child, level + 1));
            }
            if id == self.root() {
                let _ = writeln!(out, "* Document{}", if self.partial { " [PARTIAL]" } else { "" });
                continue;
            }

            let position = layout.as_ref().and_then(|l| l.position(id)).map_or_else(|| String::from("?"), |p| p.to_string());
            let _ = write!(out, "{:>10} {:<6} {}", position, id, "  ".repeat(level));
            match element.name {
                Some(name) => { let _ = write!(out, "{}", name); },
                None => { let _ = write!(out, "[{:X}]", element.ebml_id); },
            }

            if element.is_master() {
                let _ = write!(out, " ({} children)", element.children.len());
                if element.children_skipped {
                    let _ = write!(out, " [SKIPPED]");
                }
            } else {
                match element.value() {
                    Ok(Some(value)) => { let _ = write!(out, " = {}", value); },
                    Ok(None) if element.data_source.is_some() => { let _ = write!(out, " <data source {} bytes>", element.data_size().unwrap_or(0)); },
                    Ok(None) => { let _ = write!(out, " <{} bytes not loaded>", element.data_size.unwrap_or(0)); },
                    Err(e) => { let _ = write!(out, " <{}>", e); },
                }
                if Some(element.ebml_id) == self.schema.id_by_name("SeekID") {
                    if let Some(target) = element.data.as_deref().and_then(|d| tools::arr_to_u64(d).ok()).and_then(|t| self.schema.name_of(t as u32)) {
                        let _ = write!(out, " => {}", target);
                    }
                }
            }
            if let Some(target) = element.cross_reference_target {
                let _ = write!(out, " -> {}", target);
            }
            if element.is_modified() {
                let _ = write!(out, " [MODIFIED]");
            }
            out.push('\n');
        }
        out
    }

    ///
    /// Records the header widths and end of an element read from the source.
    ///
    pub(crate) fn set_decoded_size(&mut self, id: ElementId, header_len_size: usize, data_size: u64) {
        let element = &mut self.elements[id.0];
        element.header_len_size = header_len_size;
        element.data_size = Some(data_size);
        if let Some(start) = element.start {
            let length = (element.header_id_size + header_len_size) as u64 + data_size;
            element.length = Some(length);
            element.end = Some(start + length);
        }
    }

    pub(crate) fn set_decoded_data(&mut self, id: ElementId, data: Vec<u8>) {
        self.elements[id.0].data = Some(data);
    }

    pub(crate) fn set_children_skipped(&mut self, id: ElementId) {
        self.elements[id.0].children_skipped = true;
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("elements", &self.elements.len())
            .field("partial", &self.partial)
            .field("modified", &self.is_modified())
            .finish()
    }
}

///
/// Encodes the header of a re-serialized element: its id then the vint of its content size.
///
pub(crate) fn encode_header(ebml_id: u32, content_size: u64) -> Result<Vec<u8>, ToolError> {
    let mut header = tools::write_element_id(ebml_id);
    header.extend_from_slice(&content_size.as_vint()?);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use ebml_document_schema::matroska::{ids, matroska};

    use super::*;

    fn info_document() -> (Document, ElementId, ElementId) {
        let mut doc = Document::new(matroska());
        let segment = doc.create_element(ids::SEGMENT);
        let info = doc.create_element(ids::INFO);
        doc.append_child(doc.root(), segment).unwrap();
        doc.append_child(segment, info).unwrap();
        (doc, segment, info)
    }

    #[test]
    fn sizes_of_authored_elements() {
        let (mut doc, segment, info) = info_document();
        let scale = doc.set_by_name(info, "TimestampScale", 1_000_000u64).unwrap();

        // 2AD7B1 83 0F4240
        assert_eq!(7, doc.size_of(scale).unwrap());
        // 1549A966 87 ...
        assert_eq!(12, doc.size_of(info).unwrap());
        assert_eq!(17, doc.size_of(segment).unwrap());
        assert_eq!(5, doc.content_position_of(segment).unwrap());
        assert_eq!(10, doc.content_position_of(info).unwrap());
        assert_eq!(10, doc.position_of(scale).unwrap());

        let layout = doc.layout().unwrap();
        assert_eq!(Some(10), layout.position(scale));
        assert_eq!(Some(10), layout.content_position(info));
        assert_eq!(Some(17), layout.size(segment));
    }

    #[test]
    fn values_are_checked_against_kind() {
        let (mut doc, _, info) = info_document();
        let title = doc.set_by_name(info, "Title", "ünïcode").unwrap();
        assert_eq!(Some(Value::String(String::from("ünïcode"))), doc.get_value(title).unwrap());

        assert!(matches!(doc.set_value(title, 12u64), Err(DocumentError::UnsupportedValue { .. })));
        assert!(matches!(doc.set_value(info, 12u64), Err(DocumentError::UnsupportedValue { .. })));

        let doc_type = doc.create_element(ids::DOC_TYPE);
        assert!(matches!(doc.set_value(doc_type, "ünïcode"), Err(DocumentError::UnsupportedValue { .. })));
        doc.set_string(doc_type, "webm").unwrap();

        let duration = doc.set_by_name(info, "Duration", 10i64).unwrap();
        assert_eq!(Some(Value::Float(10.0)), doc.get_value(duration).unwrap());
    }

    #[test]
    fn booleans_are_stored_as_uint() {
        let mut doc = Document::new(matroska());
        let flag = doc.create_element_by_name("FlagDefault").unwrap();
        doc.set_value(flag, true).unwrap();
        assert_eq!(Some(&[1u8][..]), doc.element(flag).unwrap().data());
        assert_eq!(Some(Value::UnsignedInt(1)), doc.get_value(flag).unwrap());
    }

    #[test]
    fn too_many_bits() {
        let (mut doc, _, info) = info_document();
        let scale = doc.set_by_name(info, "TimestampScale", 1u64).unwrap();
        assert!(matches!(doc.set_uint(scale, 1 << 60), Err(DocumentError::Tool(ToolError::Unrepresentable(_)))));
    }

    #[test]
    fn name_search_does_not_descend_into_matches() {
        let mut doc = Document::new(matroska());
        let tags = doc.create_element(ids::TAGS);
        doc.append_child(doc.root(), tags).unwrap();
        let outer = doc.create_element_by_name("SimpleTag").unwrap();
        let inner = doc.create_element_by_name("SimpleTag").unwrap();
        let tag = doc.create_element_by_name("Tag").unwrap();
        doc.append_child(tags, tag).unwrap();
        doc.append_child(tag, outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        let second = doc.create_element_by_name("SimpleTag").unwrap();
        doc.append_child(tag, second).unwrap();

        assert_eq!(vec![outer, second], doc.list_children_by_name(tags, "SimpleTag"));
        assert_eq!(Some(outer), doc.get_first_child_by_name(doc.root(), "SimpleTag"));
        assert_eq!(None, doc.get_direct_child_by_name(tags, "SimpleTag"));
        assert_eq!(None, doc.get_first_child_by_name(tags, "NotAnElement"));
        assert_eq!(vec![tags, tag, outer, inner, second], doc.subtree(tags));
    }

    #[test]
    fn registries_follow_the_tree() {
        let (mut doc, segment, _) = info_document();
        let seek_head = doc.create_element(ids::SEEK_HEAD);
        let seek = doc.create_element(ids::SEEK);
        let position = doc.create_element(ids::SEEK_POSITION);
        let crc = doc.create_element(ids::CRC32);
        doc.append_child(seek, position).unwrap();
        doc.append_child(seek_head, crc).unwrap();
        doc.append_child(seek_head, seek).unwrap();
        assert_eq!(0, doc.cross_references().count());

        let first = doc.element(segment).unwrap().children().first().copied();
        doc.insert_before(segment, seek_head, first).unwrap();
        assert_eq!(vec![position], doc.cross_references().collect::<Vec<_>>());
        assert_eq!(vec![crc], doc.checksums().collect::<Vec<_>>());
        assert_eq!(seek_head, doc.element(segment).unwrap().children()[0]);

        doc.remove(seek).unwrap();
        assert_eq!(0, doc.cross_references().count());
        assert_eq!(1, doc.checksums().count());
        assert!(!doc.is_attached(position));
    }

    #[test]
    fn cycles_are_rejected() {
        let (mut doc, segment, info) = info_document();
        assert!(matches!(doc.append_child(info, segment), Err(DocumentError::InvalidHierarchy { .. })));
        assert!(matches!(doc.append_child(info, info), Err(DocumentError::InvalidHierarchy { .. })));
        assert!(matches!(doc.remove(doc.root()), Err(DocumentError::InvalidHierarchy { .. })));
    }

    #[test]
    fn move_child_reorders() {
        let (mut doc, segment, info) = info_document();
        let tracks = doc.create_element(ids::TRACKS);
        doc.append_child(segment, tracks).unwrap();
        doc.move_child_before(segment, tracks, Some(info)).unwrap();
        assert_eq!(&[tracks, info], doc.element(segment).unwrap().children());
        doc.move_child_before(segment, tracks, None).unwrap();
        assert_eq!(&[info, tracks], doc.element(segment).unwrap().children());
    }

    #[test]
    fn partial_documents_are_immutable() {
        let (mut doc, _, info) = info_document();
        doc.set_partial(true);
        assert!(matches!(doc.set_by_name(info, "Title", "x"), Err(DocumentError::PartialDocumentImmutable)));
        assert!(matches!(doc.remove(info), Err(DocumentError::PartialDocumentImmutable)));
    }

    #[test]
    fn optimize_shrinks_wide_integers() {
        let (mut doc, _, info) = info_document();
        let scale = doc.set_by_name(info, "TimestampScale", 1u64).unwrap();
        doc.replace_data(scale, vec![0, 0, 0, 1]);
        assert_eq!(1, doc.optimize_data().unwrap());
        assert_eq!(Some(&[1u8][..]), doc.element(scale).unwrap().data());
        assert_eq!(0, doc.optimize_data().unwrap());
    }

    #[test]
    fn optimize_leaves_other_kinds_alone() {
        let (mut doc, _, info) = info_document();
        let title = doc.set_by_name(info, "Title", "x").unwrap();
        doc.replace_data(title, vec![0x63, 0xe9, 0x74, 0x65]);
        let reference = doc.create_element_by_name("ReferenceBlock").unwrap();
        doc.append_child(info, reference).unwrap();
        doc.replace_data(reference, i64::MIN.to_be_bytes().to_vec());

        assert_eq!(0, doc.optimize_data().unwrap());
        assert_eq!(Some(&[0x63u8, 0xe9, 0x74, 0x65][..]), doc.element(title).unwrap().data());
        assert_eq!(Some(Value::Integer(i64::MIN)), doc.get_value(reference).unwrap());
    }

    #[test]
    fn detached_subtrees_are_unregistered() {
        let (mut doc, segment, _) = info_document();
        let seek_head = doc.create_element(ids::SEEK_HEAD);
        doc.append_child(segment, seek_head).unwrap();
        let crc = doc.create_element(ids::CRC32);
        doc.append_child(seek_head, crc).unwrap();
        let seek = doc.create_element(ids::SEEK);
        doc.append_child(seek_head, seek).unwrap();
        let position = doc.create_element(ids::SEEK_POSITION);
        doc.append_child(seek, position).unwrap();
        assert_eq!(1, doc.cross_references().count());

        let holder = doc.create_element(ids::SEEK_HEAD);
        doc.append_child(holder, seek_head).unwrap();
        assert!(!doc.is_attached(position));
        assert_eq!(0, doc.cross_references().count());
        assert_eq!(0, doc.checksums().count());

        doc.append_child(segment, holder).unwrap();
        assert_eq!(vec![position], doc.cross_references().collect::<Vec<_>>());
        assert_eq!(vec![crc], doc.checksums().collect::<Vec<_>>());
    }

    #[test]
    fn element_ids_are_stable() {
        let (doc, segment, info) = info_document();
        assert_eq!(Some(segment), doc.get_element_by_id(segment.get()));
        assert_eq!(Some(info), doc.get_element_by_id(info.get()));
        assert_eq!(None, doc.get_element_by_id(1000));
    }

    #[test]
    fn dump_lists_elements() {
        let (mut doc, _, info) = info_document();
        doc.set_by_name(info, "Title", "hello").unwrap();
        let dump = doc.dump();
        assert!(dump.contains("Segment"));
        assert!(dump.contains("Title = 'hello'"));
        assert!(dump.contains("[MODIFIED]"));
    }
}
