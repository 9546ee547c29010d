use std::collections::HashSet;

use ebml_document_schema::EbmlSchema;

use super::element::ElementId;
use super::errors::decoder::DecodeError;
use super::errors::document::DocumentError;

pub const DEFAULT_BUFFER_LEN: usize = 1024 * 64;

///
/// Options controlling what a [`Decoder`](crate::Decoder) keeps in memory.
///
/// The default skips the elements the schema marks as payload (for Matroska `SimpleBlock`, `Block`, `Void` and `FileData`): those elements are part of the tree, with their geometry, but their data stays in the source.
///
#[derive(Clone, Debug)]
pub struct DecoderOptions {
    ///
    /// Element ids whose content is not loaded.  Skipped master elements have no children in memory.
    ///
    pub skip_tags: HashSet<u32>,

    ///
    /// Also skip the elements the schema marks as payload.
    ///
    pub skip_payload: bool,

    ///
    /// Drop the data of every leaf element.
    ///
    pub ignore_data: bool,

    ///
    /// Number of bytes requested from the source per read.
    ///
    pub block_size: usize,

    ///
    /// Initial capacity of the decoder buffer.
    ///
    pub capacity: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            skip_tags: HashSet::new(),
            skip_payload: true,
            ignore_data: false,
            block_size: DEFAULT_BUFFER_LEN,
            capacity: DEFAULT_BUFFER_LEN,
        }
    }
}

impl DecoderOptions {
    ///
    /// Options that load every element and all of their data.
    ///
    pub fn load_all() -> Self {
        DecoderOptions {
            skip_payload: false,
            ..DecoderOptions::default()
        }
    }

    ///
    /// Whether the content of `ebml_id` is left in the source.
    ///
    pub fn skips(&self, schema: &dyn EbmlSchema, ebml_id: u32) -> bool {
        self.skip_tags.contains(&ebml_id) || (self.skip_payload && schema.descriptor(ebml_id).map_or(false, |d| d.is_payload()))
    }

    ///
    /// Adds the elements named `names` to the skipped elements.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentError::UnknownName`] if the schema has no element with one of the names.
    ///
    pub fn skip_tag_names(mut self, schema: &dyn EbmlSchema, names: &[&str]) -> Result<Self, DocumentError> {
        for name in names {
            let id = schema.id_by_name(name).ok_or_else(|| DocumentError::UnknownName(name.to_string()))?;
            self.skip_tags.insert(id);
        }
        Ok(self)
    }

    pub fn ignore_data(mut self, ignore_data: bool) -> Self {
        self.ignore_data = ignore_data;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Tag,
    Size,
    Content,
    SkipData,
}

///
/// Notifications produced while decoding.  Elements are attached to the document before their event is emitted.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeEvent {
    /// The header of a master element was read and its children follow.
    MasterStarted(ElementId),
    /// Every byte of a master element was consumed (or skipped).
    MasterEnded(ElementId),
    /// A leaf element is complete.
    LeafReady(ElementId),
}

impl DecodeEvent {
    pub fn element(&self) -> ElementId {
        match self {
            DecodeEvent::MasterStarted(id) | DecodeEvent::MasterEnded(id) | DecodeEvent::LeafReady(id) => *id,
        }
    }
}

///
/// Result of driving a [`Decoder`](crate::Decoder).
///
#[derive(Debug)]
pub enum Drive {
    Event(DecodeEvent),
    /// Buffered bytes are exhausted; feed more data (or satisfy the pending skip) and drive again.
    NeedMoreData,
    /// Decoding stopped.  Every later call reports [`DecodeError::Stopped`].
    Failed(DecodeError),
}

///
/// Where the decoder stands after [`Decoder::seek_to`](crate::Decoder::seek_to).
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The offset was buffered; decoding continues from it.
    InBuffer,
    /// The offset is this many bytes past the buffered data.  They are pending as a skip.
    Ahead(u64),
    /// The offset is before the buffered data.  The buffer was reset to start at this offset and the source must be re-read from there.
    Behind(u64),
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct OpenElement {
    pub id: ElementId,
    pub end: u64,
}
