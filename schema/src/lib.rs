//! This crate provides the schema descriptors that are used by the ebml-document crate.
//!
//! A schema is static data: every element id maps to a name, a value kind, a nesting level and
//! a handful of flags.  The document model never computes any of this, it only looks it up.
//!

use std::collections::HashMap;

///
/// Contains the Matroska schema table.
///
pub mod matroska;

///
/// Different value kinds defined in the EBML specification.
///
/// `String` is the ASCII-only string type, `Utf8` the unicode one.  `Date` values are signed
/// offsets from 2001-01-01T00:00:00 UTC.
///
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ValueKind {
    Master,
    UnsignedInt,
    Integer,
    Float,
    String,
    Utf8,
    Date,
    Binary,
}

impl ValueKind {
    pub fn is_master(&self) -> bool {
        matches!(self, ValueKind::Master)
    }
}

const FLAG_CROSS_REFERENCE: u8 = 0x01;
const FLAG_CHECKSUM: u8 = 0x02;
const FLAG_MULTIPLE: u8 = 0x04;
const FLAG_PAYLOAD: u8 = 0x08;

///
/// Describes a single element of a schema.
///
/// The `level` is the nesting level of the element (0 for root elements, 1 for top-level
/// sections of a segment...).  Global elements that can appear at any level use `-1`.
///
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ElementDescriptor {
    pub id: u32,
    pub name: &'static str,
    pub kind: ValueKind,
    pub level: i8,
    flags: u8,
}

impl ElementDescriptor {
    pub const fn new(id: u32, name: &'static str, kind: ValueKind, level: i8) -> Self {
        ElementDescriptor { id, name, kind, level, flags: 0 }
    }

    ///
    /// Marks the element as a cross-reference: its unsigned value is a byte offset pointing at another element, relative to the content of its top-level ancestor.
    ///
    pub const fn cross_reference(mut self) -> Self {
        self.flags |= FLAG_CROSS_REFERENCE;
        self
    }

    ///
    /// Marks the element as a checksum: its 4 bytes hold the CRC-32 of its parent's other children.
    ///
    pub const fn checksum(mut self) -> Self {
        self.flags |= FLAG_CHECKSUM;
        self
    }

    pub const fn multiple(mut self) -> Self {
        self.flags |= FLAG_MULTIPLE;
        self
    }

    ///
    /// Marks the element as bulk payload (media frames, attached files, padding).  Decoders leave its content in the source by default.
    ///
    pub const fn payload(mut self) -> Self {
        self.flags |= FLAG_PAYLOAD;
        self
    }

    pub fn is_cross_reference(&self) -> bool {
        self.flags & FLAG_CROSS_REFERENCE != 0
    }

    pub fn is_checksum(&self) -> bool {
        self.flags & FLAG_CHECKSUM != 0
    }

    pub fn is_multiple(&self) -> bool {
        self.flags & FLAG_MULTIPLE != 0
    }

    pub fn is_payload(&self) -> bool {
        self.flags & FLAG_PAYLOAD != 0
    }
}

///
/// This trait should be implemented by anything that can answer schema lookups for a document.
///
/// The decoder and the document tree only ever go through this trait, so a custom EBML based format can be read and written by supplying its own table.  [`SchemaTable`] is the implementation used by the bundled [`matroska`] schema.
///
pub trait EbmlSchema {
    ///
    /// Gets the descriptor of an element id.
    ///
    /// Element ids are compared including their class marker bits, e.g. `0x1A45DFA3` for the EBML header.  This function *must* return `None` if the id is not in the schema.
    ///
    fn descriptor(&self, id: u32) -> Option<&ElementDescriptor>;

    ///
    /// Gets the id of an element from its name.
    ///
    fn id_by_name(&self, name: &str) -> Option<u32>;

    ///
    /// Gets the id of the element that every stream must start with.
    ///
    fn header_id(&self) -> u32 {
        0x1A45DFA3
    }

    ///
    /// Gets the id of the top-level index section (the element listing offsets of the other top-level sections), if the schema has one.
    ///
    fn index_id(&self) -> Option<u32> {
        None
    }

    fn name_of(&self, id: u32) -> Option<&'static str> {
        self.descriptor(id).map(|d| d.name)
    }

    fn kind_of(&self, id: u32) -> Option<ValueKind> {
        self.descriptor(id).map(|d| d.kind)
    }
}

///
/// A schema built from a static slice of descriptors.
///
pub struct SchemaTable {
    by_id: HashMap<u32, ElementDescriptor>,
    by_name: HashMap<&'static str, u32>,
    header_id: u32,
    index_id: Option<u32>,
}

impl SchemaTable {
    pub fn new(entries: &[ElementDescriptor]) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        for entry in entries {
            by_id.insert(entry.id, *entry);
            by_name.insert(entry.name, entry.id);
        }

        SchemaTable {
            by_id,
            by_name,
            header_id: 0x1A45DFA3,
            index_id: None,
        }
    }

    pub fn with_header_id(mut self, id: u32) -> Self {
        self.header_id = id;
        self
    }

    pub fn with_index_id(mut self, id: u32) -> Self {
        self.index_id = Some(id);
        self
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementDescriptor> {
        self.by_id.values()
    }
}

impl EbmlSchema for SchemaTable {
    fn descriptor(&self, id: u32) -> Option<&ElementDescriptor> {
        self.by_id.get(&id)
    }

    fn id_by_name(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    fn header_id(&self) -> u32 {
        self.header_id
    }

    fn index_id(&self) -> Option<u32> {
        self.index_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_independent() {
        let desc = ElementDescriptor::new(0x53AC, "SeekPosition", ValueKind::UnsignedInt, 3).cross_reference();
        assert!(desc.is_cross_reference());
        assert!(!desc.is_checksum());
        assert!(!desc.is_multiple());

        let desc = ElementDescriptor::new(0xBF, "CRC-32", ValueKind::Binary, -1).checksum().multiple();
        assert!(!desc.is_cross_reference());
        assert!(desc.is_checksum());
        assert!(desc.is_multiple());
    }

    #[test]
    fn table_lookups() {
        let table = SchemaTable::new(&[
            ElementDescriptor::new(0x81, "Root", ValueKind::Master, 0),
            ElementDescriptor::new(0x4101, "Int", ValueKind::UnsignedInt, 1),
        ]).with_header_id(0x81);

        assert_eq!(Some(0x4101), table.id_by_name("Int"));
        assert_eq!(Some(ValueKind::Master), table.kind_of(0x81));
        assert_eq!(Some("Int"), table.name_of(0x4101));
        assert_eq!(None, table.descriptor(0x4102));
        assert_eq!(0x81, table.header_id());
        assert_eq!(None, table.index_id());
        assert_eq!(2, table.len());
    }
}
