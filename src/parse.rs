//!
//! Drivers that feed a [`Decoder`] from a [`ByteSource`].
//!

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use ebml_document_schema::ValueKind;
use log::{debug, warn};

use super::decoder::Decoder;
use super::decoder_util::{DecodeEvent, DecoderOptions, Drive, SeekOutcome};
use super::document::{Document, SharedSchema};
use super::element::{ElementId, Value};
use super::errors::decoder::DecodeError;
use super::errors::document::DocumentError;
use super::source::{self, ByteSource, FileSource, MemorySource};
use super::tools;

enum Flow {
    Continue,
    Stop,
}

///
/// Decodes a whole document from `source`.
///
/// The returned document keeps the source: elements whose data was skipped (see [`DecoderOptions`]) are read from it on demand, and unmodified elements are copied from it when the document is written.  Cross-references are resolved before returning.
///
/// # Errors
///
/// Fails with [`DecodeError::MalformedContainer`] on corrupt or truncated input and with [`DecodeError::Source`] if the source cannot be read.
///
pub fn parse(schema: SharedSchema, source: Arc<dyn ByteSource>, options: DecoderOptions) -> Result<Document, DecodeError> {
    let document = Document::with_source(schema, source.clone());
    let mut decoder = Decoder::with_document(document, options);

    let result = drive(&mut decoder, source.as_ref(), |_, _| Ok(Flow::Continue));
    source.close();
    result?;

    let mut document = decoder.finish()?;
    document.build_links();
    Ok(document)
}

pub fn parse_bytes(schema: SharedSchema, bytes: impl Into<Arc<[u8]>>, options: DecoderOptions) -> Result<Document, DecodeError> {
    parse(schema, Arc::new(MemorySource::new(bytes)), options)
}

pub fn parse_file(schema: SharedSchema, path: impl AsRef<Path>, options: DecoderOptions) -> Result<Document, DecodeError> {
    parse(schema, Arc::new(FileSource::new(path)), options)
}

///
/// Decodes only the top-level sections named `wanted` (e.g. `["Info", "Tracks", "Tags"]`), using the index section to jump to them.
///
/// The stream is scanned from the start until the index section has been read; sections it lists are then visited in offset order.  Other top-level sections met on the way are skipped without reading their content.  Decoding stops as soon as every wanted section was found.
///
/// The document is marked partial: it can be queried but not modified or written.
///
/// # Errors
///
/// Fails with [`DecodeError::Document`] if a name is not in the schema, and like [`parse`] on corrupt input.
///
pub fn parse_sections(schema: SharedSchema, source: Arc<dyn ByteSource>, wanted: &[&str], options: DecoderOptions) -> Result<Document, DecodeError> {
    let mut wanted_ids = HashSet::new();
    for name in wanted {
        let id = schema.id_by_name(name).ok_or_else(|| DocumentError::UnknownName(name.to_string()))?;
        wanted_ids.insert(id);
    }

    let document = Document::with_source(schema.clone(), source.clone());
    let mut decoder = Decoder::with_document(document, options);
    let mut seeker = SectionSeeker {
        index_id: schema.index_id(),
        wanted: wanted_ids,
        found: HashSet::new(),
        segment: None,
        targets: Vec::new(),
    };

    let result = drive(&mut decoder, source.as_ref(), |decoder, event| seeker.on_event(decoder, event));
    source.close();
    result?;

    for missing in seeker.wanted.difference(&seeker.found) {
        warn!("Section {} was not found", schema.name_of(*missing).unwrap_or("unknown"));
    }

    let mut document = decoder.into_document();
    document.set_partial(true);
    document.build_links();
    Ok(document)
}

fn drive<F>(decoder: &mut Decoder, source: &dyn ByteSource, mut on_event: F) -> Result<(), DecodeError>
    where F: FnMut(&mut Decoder, DecodeEvent) -> Result<Flow, DecodeError>
{
    let block_size = decoder.options().block_size.max(1);
    let mut reader_offset = decoder.buffered_end();
    let mut reader: Box<dyn Read + Send> = source::open_exact(source, reader_offset, None)?;
    let mut at_end = false;

    loop {
        match decoder.next_event() {
            Drive::Event(event) => {
                if let Flow::Stop = on_event(decoder, event)? {
                    return Ok(());
                }
            },
            Drive::Failed(err) => return Err(err),
            Drive::NeedMoreData => {
                let skip = decoder.pending_skip();
                if skip >= block_size as u64 {
                    // the last skipped byte is still read, a source ending before it is truncated
                    debug!("Skipping {} bytes of source at {}", skip - 1, decoder.buffered_end());
                    decoder.advance_source(skip - 1);
                }

                if reader_offset != decoder.buffered_end() {
                    reader_offset = decoder.buffered_end();
                    reader = source::open_exact(source, reader_offset, None)?;
                } else if at_end {
                    return Ok(());
                }

                let read = decoder.feed_from(&mut reader, block_size)?;
                at_end = read == 0;
                reader_offset += read as u64;
            },
        }
    }
}

struct SectionSeeker {
    index_id: Option<u32>,
    wanted: HashSet<u32>,
    found: HashSet<u32>,
    segment: Option<ElementId>,
    targets: Vec<(u64, u32)>,
}

impl SectionSeeker {
    fn on_event(&mut self, decoder: &mut Decoder, event: DecodeEvent) -> Result<Flow, DecodeError> {
        let doc = decoder.document();
        let element = doc.get(event.element());
        let ebml_id = element.ebml_id();

        if element.parent() == Some(doc.root()) {
            if let DecodeEvent::MasterStarted(id) = event {
                if ebml_id != doc.schema().header_id() {
                    self.segment = Some(id);
                }
            }
            return Ok(Flow::Continue);
        }

        let segment = match self.segment {
            Some(segment) if element.parent() == Some(segment) => segment,
            _ => return Ok(Flow::Continue),
        };
        let is_index = Some(ebml_id) == self.index_id;

        match event {
            DecodeEvent::MasterStarted(id) if !is_index && !self.wanted.contains(&ebml_id) => {
                let end = element.end().unwrap_or(0);
                let segment_end = doc.get(segment).end().unwrap_or(0);
                debug!("Skipping unwanted section {} ({})", id, element.name().unwrap_or("unknown"));
                decoder.document_mut().set_children_skipped(id);
                if end < segment_end {
                    decoder.seek_to(end, &[segment])?;
                } else {
                    decoder.seek_to(end, &[])?;
                }
                Ok(Flow::Continue)
            },
            DecodeEvent::MasterEnded(id) => {
                if self.wanted.contains(&ebml_id) {
                    self.found.insert(ebml_id);
                    if self.found.len() == self.wanted.len() {
                        return Ok(Flow::Stop);
                    }
                }
                if is_index {
                    self.collect_targets(doc, id);
                }
                self.jump_to_next(decoder, segment)
            },
            _ => Ok(Flow::Continue),
        }
    }

    fn collect_targets(&mut self, doc: &Document, index: ElementId) {
        for entry in doc.get(index).children() {
            let mut target_id = None;
            let mut offset = None;
            for field in doc.get(*entry).children() {
                let field = doc.get(*field);
                let cross_reference = doc.schema().descriptor(field.ebml_id()).map_or(false, |d| d.is_cross_reference());
                match field.value() {
                    Ok(Some(Value::UnsignedInt(val))) if cross_reference => offset = Some(val),
                    Ok(Some(Value::Binary(bytes))) if field.kind() == ValueKind::Binary => {
                        target_id = tools::arr_to_u64(&bytes).ok().and_then(|id| u32::try_from(id).ok());
                    },
                    _ => {},
                }
            }

            if let (Some(target_id), Some(offset)) = (target_id, offset) {
                if self.wanted.contains(&target_id) && !self.found.contains(&target_id) {
                    self.targets.push((offset, target_id));
                }
            }
        }
        self.targets.sort_unstable_by(|a, b| b.cmp(a));
        self.targets.dedup();
        debug!("Index lists {} wanted sections", self.targets.len());
    }

    fn jump_to_next(&mut self, decoder: &mut Decoder, segment: ElementId) -> Result<Flow, DecodeError> {
        while let Some((offset, target_id)) = self.targets.pop() {
            if self.found.contains(&target_id) {
                continue;
            }
            let element = decoder.document().get(segment);
            let content_start = element.start().unwrap_or(0) + (element.header_id_size + element.header_len_size) as u64;
            if content_start + offset >= element.end().unwrap_or(0) {
                warn!("Index points past the end of the segment (offset {})", offset);
                continue;
            }
            let outcome = decoder.seek_to(content_start + offset, &[segment])?;
            if let SeekOutcome::Behind(_) = outcome {
                debug!("Going back to offset {}", content_start + offset);
            }
            break;
        }
        Ok(Flow::Continue)
    }
}
