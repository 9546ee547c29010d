use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ebml_document_schema::ValueKind;

use super::errors::tool::ToolError;
use super::source::DataSource;
use super::tools;

///
/// Identifies an element inside its [`Document`](crate::Document).
///
/// Ids are assigned in creation order and never reused, so an id stays valid (and keeps pointing to the same element) after the element has been removed from the tree.
///
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    pub fn get(&self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// The byte range an element occupied in the source before it was modified.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SavedRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

///
/// A typed element value.
///
/// `set_value` infers the encoding from the variant: non-negative `Integer`s are stored like `UnsignedInt`s and `Boolean`s are stored as the unsigned integers 0 and 1.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    UnsignedInt(u64),
    Integer(i64),
    Float(f64),
    Date(DateTime<Utc>),
    Binary(Vec<u8>),
    Boolean(bool),
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.to_string())
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::String(val)
    }
}

impl From<u64> for Value {
    fn from(val: u64) -> Self {
        Value::UnsignedInt(val)
    }
}

impl From<u32> for Value {
    fn from(val: u32) -> Self {
        Value::UnsignedInt(val as u64)
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::Integer(val)
    }
}

impl From<i32> for Value {
    fn from(val: i32) -> Self {
        Value::Integer(val as i64)
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Float(val)
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Boolean(val)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(val: DateTime<Utc>) -> Self {
        Value::Date(val)
    }
}

impl From<Vec<u8>> for Value {
    fn from(val: Vec<u8>) -> Self {
        Value::Binary(val)
    }
}

impl From<&[u8]> for Value {
    fn from(val: &[u8]) -> Self {
        Value::Binary(val.to_vec())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(val) => write!(f, "'{}'", val),
            Value::UnsignedInt(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Float(val) => write!(f, "{}", val),
            Value::Date(val) => write!(f, "{}", val.to_rfc3339()),
            Value::Binary(val) => {
                for byte in val.iter().take(32) {
                    write!(f, "{:02x}", byte)?;
                }
                if val.len() > 32 {
                    write!(f, "...")?;
                }
                Ok(())
            },
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

///
/// A node of the document tree.
///
/// Elements are owned by their [`Document`](crate::Document) and always manipulated through it; the accessors here are read-only.  Parents, children and cross-reference targets are [`ElementId`]s into the same document.
///
#[derive(Clone, Debug)]
pub struct Element {
    pub(crate) id: ElementId,
    pub(crate) ebml_id: u32,
    pub(crate) kind: ValueKind,
    pub(crate) name: Option<&'static str>,

    pub(crate) start: Option<u64>,
    pub(crate) length: Option<u64>,
    pub(crate) end: Option<u64>,
    pub(crate) header_id_size: usize,
    pub(crate) header_len_size: usize,
    pub(crate) data_size: Option<u64>,

    pub(crate) data: Option<Vec<u8>>,
    pub(crate) data_source: Option<Arc<dyn DataSource>>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) children_skipped: bool,
    pub(crate) parent: Option<ElementId>,
    pub(crate) cross_reference_target: Option<ElementId>,
    pub(crate) modified: Option<SavedRange>,
}

impl Element {
    pub(crate) fn new(id: ElementId, ebml_id: u32, kind: ValueKind, name: Option<&'static str>) -> Self {
        Element {
            id,
            ebml_id,
            kind,
            name,
            start: None,
            length: None,
            end: None,
            header_id_size: tools::element_id_size(ebml_id),
            header_len_size: 0,
            data_size: None,
            data: None,
            data_source: None,
            children: Vec::new(),
            children_skipped: false,
            parent: None,
            cross_reference_target: None,
            modified: None,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn ebml_id(&self) -> u32 {
        self.ebml_id
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    ///
    /// The schema name of the element, `None` for ids the schema does not know.
    ///
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn is_master(&self) -> bool {
        self.kind.is_master()
    }

    ///
    /// Absolute offset of the element in its source.  `None` once the element is modified, and for elements created in memory.
    ///
    pub fn start(&self) -> Option<u64> {
        self.start
    }

    pub fn end(&self) -> Option<u64> {
        self.end
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn data_size(&self) -> Option<u64> {
        match (&self.data, &self.data_source) {
            (Some(data), _) => Some(data.len() as u64),
            (None, Some(source)) => Some(source.size()),
            (None, None) => self.data_size,
        }
    }

    ///
    /// The raw content of a leaf element, `None` if it was skipped while decoding.
    ///
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn has_data_source(&self) -> bool {
        self.data_source.is_some()
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    ///
    /// Set for master elements whose content was skipped while decoding: they have no children in memory even though the source holds some.
    ///
    pub fn children_skipped(&self) -> bool {
        self.children_skipped
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn cross_reference_target(&self) -> Option<ElementId> {
        self.cross_reference_target
    }

    pub fn is_modified(&self) -> bool {
        self.modified.is_some()
    }

    ///
    /// The range the element occupies in the source: its current range, or the one saved when it was modified.
    ///
    pub fn original_range(&self) -> Option<(u64, u64)> {
        match self.modified {
            Some(SavedRange { start: Some(start), end: Some(end) }) => Some((start, end)),
            Some(_) => None,
            None => self.start.zip(self.end),
        }
    }

    ///
    /// Whether the writer can copy this element from the source as is.
    ///
    pub(crate) fn is_verbatim(&self) -> bool {
        self.modified.is_none() && self.start.is_some() && self.data_source.is_none()
    }

    ///
    /// Decodes the element content according to its value kind.
    ///
    /// Returns `None` for master elements and for leaves whose content is not in memory.
    ///
    /// # Errors
    ///
    /// This method returns an error if the content does not match the value kind (e.g. a 3 byte float).
    ///
    pub fn value(&self) -> Result<Option<Value>, ToolError> {
        let data = match &self.data {
            Some(data) => data,
            None => return Ok(None),
        };

        let value = match self.kind {
            ValueKind::Master => return Ok(None),
            ValueKind::UnsignedInt => Value::UnsignedInt(tools::arr_to_u64(data)?),
            ValueKind::Integer => Value::Integer(tools::arr_to_i64(data)?),
            ValueKind::Float => Value::Float(tools::arr_to_f64(data)?),
            ValueKind::Date => Value::Date(tools::arr_to_date(data)?),
            ValueKind::String | ValueKind::Utf8 => {
                let trimmed = match data.iter().rposition(|b| *b != 0) {
                    Some(last) => &data[..=last],
                    None => &data[..0],
                };
                Value::String(String::from_utf8(trimmed.to_vec()).map_err(|e| ToolError::FromUtf8Error(data.clone(), e))?)
            },
            ValueKind::Binary => Value::Binary(data.clone()),
        };
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: ValueKind, data: Vec<u8>) -> Element {
        let mut element = Element::new(ElementId(1), 0x4286, kind, None);
        element.data = Some(data);
        element
    }

    #[test]
    fn values_by_kind() {
        assert_eq!(Some(Value::UnsignedInt(300)), leaf(ValueKind::UnsignedInt, vec![0x01, 0x2c]).value().unwrap());
        assert_eq!(Some(Value::Integer(-2)), leaf(ValueKind::Integer, vec![0xfe]).value().unwrap());
        assert_eq!(Some(Value::Float(1.5)), leaf(ValueKind::Float, vec![0x3f, 0xc0, 0, 0]).value().unwrap());
        assert_eq!(Some(Value::String(String::from("webm"))), leaf(ValueKind::String, b"webm\0\0".to_vec()).value().unwrap());
        assert_eq!(Some(Value::Binary(vec![1, 2])), leaf(ValueKind::Binary, vec![1, 2]).value().unwrap());
    }

    #[test]
    fn missing_data_has_no_value() {
        let element = Element::new(ElementId(1), 0xa3, ValueKind::Binary, None);
        assert_eq!(None, element.value().unwrap());
    }

    #[test]
    fn bad_float_width() {
        assert!(matches!(leaf(ValueKind::Float, vec![0, 0, 0]).value(), Err(ToolError::ReadF64Mismatch(_))));
    }

    #[test]
    fn original_range_survives_modification() {
        let mut element = Element::new(ElementId(1), 0x4286, ValueKind::UnsignedInt, None);
        element.start = Some(10);
        element.end = Some(14);
        assert_eq!(Some((10, 14)), element.original_range());
        assert!(element.is_verbatim());

        element.modified = Some(SavedRange { start: element.start.take(), end: element.end.take() });
        assert_eq!(Some((10, 14)), element.original_range());
        assert!(!element.is_verbatim());
    }
}
