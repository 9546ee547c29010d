use std::cmp::Reverse;
use std::io::{self, Read, Write};

use log::{debug, warn};

use super::document::{encode_header, Document, Layout};
use super::element::ElementId;
use super::errors::source::SourceError;
use super::errors::writer::WriteError;
use super::policy::{NormalizePolicy, PreparePolicy};
use super::source;
use super::tools;

///
/// Options of a [`DocumentWriter`].
///
#[derive(Clone, Debug)]
pub struct WriteOptions {
    ///
    /// Run the prepare policy before writing a modified document.
    ///
    pub prepare: bool,

    ///
    /// Size at which the batch of small re-encoded elements is flushed to the destination.
    ///
    pub max_pending: usize,

    ///
    /// Maximum number of passes computing cross-reference values.
    ///
    pub position_passes: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            prepare: true,
            max_pending: 1024 * 64,
            position_passes: 5,
        }
    }
}

///
/// Writes [`Document`]s to a destination that implements [`std::io::Write`].
///
/// Writing a modified document first runs the prepare policy ([`NormalizePolicy`] unless another one is given), then computes the values of cross-reference elements and recomputes the checksums of modified containers.  Elements that were not modified since they were decoded are then copied byte for byte from the document source; the others are re-encoded.
///
/// ## Example
///
/// ```
/// use ebml_document::{Document, DocumentWriter};
/// use ebml_document::schema::matroska::{ids, matroska};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut doc = Document::new(matroska());
/// let header = doc.create_element(ids::EBML);
/// doc.append_child(doc.root(), header)?;
/// doc.set_by_name(header, "DocType", "webm")?;
///
/// let mut writer = DocumentWriter::new(Vec::new());
/// writer.write(&mut doc)?;
/// assert_eq!(vec![0x1a, 0x45, 0xdf, 0xa3, 0x87, 0x42, 0x82, 0x84, b'w', b'e', b'b', b'm'], writer.into_inner());
/// # Ok(())
/// # }
/// ```
///
pub struct DocumentWriter<W: Write> {
    dest: W,
    options: WriteOptions,
    working_buffer: Vec<u8>,
    written: u64,
}

impl<W: Write> DocumentWriter<W> {
    pub fn new(dest: W) -> Self {
        DocumentWriter::with_options(dest, WriteOptions::default())
    }

    pub fn with_options(dest: W, options: WriteOptions) -> Self {
        DocumentWriter {
            dest,
            working_buffer: Vec::with_capacity(options.max_pending),
            options,
            written: 0,
        }
    }

    ///
    /// Number of bytes written to the destination so far.
    ///
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.dest
    }

    pub fn write(&mut self, doc: &mut Document) -> Result<(), WriteError> {
        self.write_with_policy(doc, &NormalizePolicy::default())
    }

    ///
    /// Writes `doc`, preparing it with `policy` if it was modified.
    ///
    /// # Errors
    ///
    /// Fails with [`WriteError::CannotWritePartial`] for partially parsed documents and with [`WriteError::DanglingReference`] if a cross-reference element has no target in the same top-level element.  Nothing is written in both cases.  I/O errors abort the write; bytes already written are not rolled back.
    ///
    pub fn write_with_policy(&mut self, doc: &mut Document, policy: &dyn PreparePolicy) -> Result<(), WriteError> {
        if doc.is_partial() {
            return Err(WriteError::CannotWritePartial);
        }

        if doc.is_modified() {
            if self.options.prepare {
                policy.prepare(doc)?;
            }
            prepare_checksums(doc);
            compute_positions(doc, self.options.position_passes)?;
            update_checksums(doc)?;
        }

        let doc: &Document = doc;
        let layout = doc.layout()?;
        for child in doc.get(doc.root()).children() {
            self.emit(doc, &layout, *child)?;
        }
        self.flush_pending()?;
        self.dest.flush()?;
        Ok(())
    }

    fn emit(&mut self, doc: &Document, layout: &Layout, id: ElementId) -> Result<(), WriteError> {
        let element = doc.get(id);

        if element.is_verbatim() {
            let (start, end) = element.original_range().ok_or(SourceError::NoSource { element: id.get() })?;
            let source = doc.source().ok_or(SourceError::NoSource { element: id.get() })?;
            self.flush_pending()?;
            return self.pipe(source::open_exact(source.as_ref(), start, Some(end))?, end - start);
        }

        let content_size = layout.content_size(id).unwrap_or(0);
        self.working_buffer.extend_from_slice(&encode_header(element.ebml_id(), content_size)?);

        if element.is_master() {
            for child in element.children() {
                self.emit(doc, layout, *child)?;
            }
        } else if let Some(data) = element.data() {
            self.working_buffer.extend_from_slice(data);
        } else {
            self.flush_pending()?;
            self.pipe(doc.open_data(id)?, content_size)?;
        }

        if self.working_buffer.len() >= self.options.max_pending {
            self.flush_pending()?;
        }
        Ok(())
    }

    fn pipe(&mut self, mut reader: Box<dyn Read + Send>, expected: u64) -> Result<(), WriteError> {
        let copied = io::copy(&mut reader, &mut self.dest)?;
        self.written += copied;
        if copied != expected {
            return Err(SourceError::LengthMismatch { expected, actual: copied }.into());
        }
        Ok(())
    }

    fn flush_pending(&mut self) -> Result<(), WriteError> {
        if !self.working_buffer.is_empty() {
            self.dest.write_all(&self.working_buffer)?;
            self.written += self.working_buffer.len() as u64;
            self.working_buffer.clear();
        }
        Ok(())
    }
}

///
/// Writes `doc` to `dest`.  See [`DocumentWriter`].
///
pub fn write<W: Write>(doc: &mut Document, dest: W, options: &WriteOptions) -> Result<(), WriteError> {
    DocumentWriter::with_options(dest, options.clone()).write(doc)
}

impl Document {
    pub fn write_to<W: Write>(&mut self, dest: W, options: &WriteOptions) -> Result<(), WriteError> {
        write(self, dest, options)
    }
}

fn modified_checksums(doc: &Document) -> Vec<(ElementId, ElementId)> {
    doc.checksums()
        .filter_map(|crc| doc.get(crc).parent().map(|parent| (crc, parent)))
        .filter(|(_, parent)| doc.get(*parent).is_modified())
        .collect()
}

///
/// Gives every checksum element of a modified container a 4 byte value, so sizes no longer change when the checksums are computed.
///
fn prepare_checksums(doc: &mut Document) {
    for (crc, _) in modified_checksums(doc) {
        let placeholder = match doc.get(crc).data() {
            Some(data) if data.len() == 4 => data.to_vec(),
            _ => vec![0; 4],
        };
        doc.replace_data(crc, placeholder);
    }
}

fn compute_positions(doc: &mut Document, passes: usize) -> Result<(), WriteError> {
    let mut references = Vec::new();
    for id in doc.cross_references().collect::<Vec<_>>() {
        let top = match doc.top_level_ancestor(id) {
            Some(top) if doc.get(top).is_modified() => top,
            _ => continue,
        };
        let target = doc.get(id).cross_reference_target()
            .ok_or(WriteError::DanglingReference { element: id.get(), reason: "no target" })?;
        if !doc.is_attached(target) {
            return Err(WriteError::DanglingReference { element: id.get(), reason: "target is not in the document" });
        }
        if doc.top_level_ancestor(target) != Some(top) {
            return Err(WriteError::DanglingReference { element: id.get(), reason: "target is under another top-level element" });
        }
        references.push((id, target, top));
    }
    if references.is_empty() {
        return Ok(());
    }

    let estimate = doc.size_of(doc.root())?;
    let width = tools::uint_size(estimate);
    debug!("Computing {} cross-references, estimated size {} ({} bytes per value)", references.len(), estimate, width);
    for (id, _, _) in &references {
        doc.replace_data(*id, vec![0xff; width]);
    }

    let mut changes = 0;
    for pass in 1..=passes {
        let layout = doc.layout()?;
        changes = 0;
        for (id, target, top) in &references {
            let encoded = tools::write_uint(reference_value(&layout, *id, *target, *top)?)?;
            if doc.get(*id).data() != Some(&encoded[..]) {
                doc.replace_data(*id, encoded);
                changes += 1;
            }
        }
        debug!("Position pass {}: {} changes", pass, changes);
        if changes == 0 {
            return Ok(());
        }
    }

    let layout = doc.layout()?;
    for (id, target, top) in &references {
        let encoded = tools::write_uint(reference_value(&layout, *id, *target, *top)?)?;
        if doc.get(*id).data() != Some(&encoded[..]) {
            warn!("Cross-reference values did not settle after {} passes ({} changes in the last one)", passes, changes);
            break;
        }
    }
    Ok(())
}

fn reference_value(layout: &Layout, id: ElementId, target: ElementId, top: ElementId) -> Result<u64, WriteError> {
    let dangling = || WriteError::DanglingReference { element: id.get(), reason: "target has no position" };
    let position = layout.position(target).ok_or_else(dangling)?;
    let base = layout.content_position(top).ok_or_else(dangling)?;
    position.checked_sub(base).ok_or_else(dangling)
}

fn update_checksums(doc: &mut Document) -> Result<(), WriteError> {
    let mut checksums = modified_checksums(doc);
    if checksums.is_empty() {
        return Ok(());
    }
    checksums.sort_by_key(|(crc, _)| Reverse(doc.depth(*crc)));

    let layout = doc.layout()?;
    for (crc, parent) in checksums {
        let encoded = tools::write_checksum(doc.compute_checksum_with(&layout, parent)?);
        if doc.get(crc).data() != Some(&encoded[..]) {
            debug!("Checksum of {} is now {:08x}", parent, u32::from_le_bytes(encoded));
            doc.replace_data(crc, encoded.to_vec());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ebml_document_schema::matroska::{ids, matroska};

    use super::*;
    use crate::errors::document::DocumentError;
    use crate::source::DataSource;
    use crate::{parse_bytes, DecoderOptions};

    fn written(doc: &mut Document) -> Vec<u8> {
        let mut dest = Vec::new();
        doc.write_to(&mut dest, &WriteOptions::default()).unwrap();
        dest
    }

    #[test]
    fn master_with_two_uint_sizes() {
        let mut doc = Document::new(matroska());
        let header = doc.create_element(ids::EBML);
        doc.append_child(doc.root(), header).unwrap();
        doc.set_by_name(header, "EBMLVersion", 0u64).unwrap();
        doc.set_by_name(header, "EBMLReadVersion", 300u64).unwrap();

        assert_eq!(
            vec![0x1a, 0x45, 0xdf, 0xa3, 0x89, 0x42, 0x86, 0x81, 0x00, 0x42, 0xf7, 0x82, 0x01, 0x2c],
            written(&mut doc)
        );
    }

    #[test]
    fn empty_document() {
        let mut doc = Document::new(matroska());
        assert!(written(&mut doc).is_empty());
    }

    #[test]
    fn unmodified_document_is_copied() {
        let bytes = vec![
            0x1a, 0x45, 0xdf, 0xa3, 0x88, 0x42, 0x82, 0x85, b'w', b'e', b'b', b'm', 0x00,
            0x18, 0x53, 0x80, 0x67, 0x40, 0x05, 0xa3, 0x83, 0x01, 0x02, 0x03,
        ];
        let mut doc = parse_bytes(matroska(), bytes.clone(), DecoderOptions::default()).unwrap();
        assert_eq!(bytes, written(&mut doc));
    }

    #[test]
    fn modified_leaves_are_encoded_others_copied() {
        // the Segment size uses 2 bytes and is re-encoded on 1
        let bytes = vec![
            0x1a, 0x45, 0xdf, 0xa3, 0x84, 0x42, 0x82, 0x81, b'x',
            0x18, 0x53, 0x80, 0x67, 0x40, 0x0a, 0xa3, 0x83, 0x01, 0x02, 0x03, 0xe7, 0x83, 0x00, 0x00, 0x05,
        ];
        let mut doc = parse_bytes(matroska(), bytes, DecoderOptions::default()).unwrap();
        let segment = doc.get_first_child_by_name(doc.root(), "Segment").unwrap();
        let timestamp = doc.get_first_child_by_name(segment, "Timestamp").unwrap();
        doc.set_uint(timestamp, 6).unwrap();

        assert_eq!(
            vec![
                0x1a, 0x45, 0xdf, 0xa3, 0x84, 0x42, 0x82, 0x81, b'x',
                0x18, 0x53, 0x80, 0x67, 0x88, 0xa3, 0x83, 0x01, 0x02, 0x03, 0xe7, 0x81, 0x06,
            ],
            written(&mut doc)
        );
    }

    #[derive(Debug)]
    struct ShortSource;

    impl DataSource for ShortSource {
        fn size(&self) -> u64 {
            4
        }

        fn open(&self) -> Result<Box<dyn Read + Send>, SourceError> {
            Ok(Box::new(io::Cursor::new(vec![1u8, 2])))
        }
    }

    #[test]
    fn data_source_length_is_checked() {
        let mut doc = Document::new(matroska());
        let file = doc.create_element(ids::ATTACHED_FILE);
        doc.append_child(doc.root(), file).unwrap();
        let data = doc.create_element(ids::FILE_DATA);
        doc.append_child(file, data).unwrap();
        doc.set_data_source(data, Arc::new(ShortSource)).unwrap();

        let mut dest = Vec::new();
        let result = doc.write_to(&mut dest, &WriteOptions::default());
        assert!(matches!(result, Err(WriteError::Source(SourceError::LengthMismatch { expected: 4, actual: 2 }))));
    }

    #[test]
    fn partial_documents_are_rejected() {
        let mut doc = Document::new(matroska());
        doc.set_partial(true);
        assert!(matches!(doc.write_to(Vec::new(), &WriteOptions::default()), Err(WriteError::CannotWritePartial)));
    }

    #[test]
    fn references_need_a_target() {
        let mut doc = Document::new(matroska());
        let segment = doc.create_element(ids::SEGMENT);
        doc.append_child(doc.root(), segment).unwrap();
        let seek_head = doc.create_element(ids::SEEK_HEAD);
        doc.append_child(segment, seek_head).unwrap();
        let seek = doc.create_element(ids::SEEK);
        doc.append_child(seek_head, seek).unwrap();
        let position = doc.set_by_name(seek, "SeekPosition", 0u64).unwrap();

        let options = WriteOptions { prepare: false, ..WriteOptions::default() };
        assert!(matches!(doc.write_to(Vec::new(), &options), Err(WriteError::DanglingReference { reason: "no target", .. })));

        let other = doc.create_element(ids::SEGMENT);
        doc.append_child(doc.root(), other).unwrap();
        let info = doc.create_element(ids::INFO);
        doc.append_child(other, info).unwrap();
        doc.set_cross_reference_target(position, info).unwrap();
        assert!(matches!(doc.write_to(Vec::new(), &options), Err(WriteError::DanglingReference { .. })));

        doc.remove(info).unwrap();
        assert!(matches!(doc.write_to(Vec::new(), &options), Err(WriteError::DanglingReference { reason: "target is not in the document", .. })));
    }

    #[test]
    fn reference_points_at_element_start() {
        let mut doc = Document::new(matroska());
        let segment = doc.create_element(ids::SEGMENT);
        doc.append_child(doc.root(), segment).unwrap();
        let seek_head = doc.create_element(ids::SEEK_HEAD);
        doc.append_child(segment, seek_head).unwrap();
        let seek = doc.create_element(ids::SEEK);
        doc.append_child(seek_head, seek).unwrap();
        let position = doc.create_element(ids::SEEK_POSITION);
        doc.append_child(seek, position).unwrap();
        let info = doc.create_element(ids::INFO);
        doc.append_child(segment, info).unwrap();
        doc.set_by_name(info, "TimestampScale", 1_000_000u64).unwrap();
        doc.set_cross_reference_target(position, info).unwrap();

        let options = WriteOptions { prepare: false, ..WriteOptions::default() };
        let mut dest = Vec::new();
        doc.write_to(&mut dest, &options).unwrap();

        // SeekHead(5) { Seek(3) { SeekPosition(3 + 1) } } is 12 bytes long
        assert_eq!(Some(crate::Value::UnsignedInt(12)), doc.get_value(position).unwrap());
        assert_eq!(&[0x11, 0x4d, 0x9b, 0x74, 0x87, 0x4d, 0xbb, 0x84, 0x53, 0xac, 0x81, 0x0c], &dest[5..17]);
        assert_eq!(0x15, dest[17]);
    }

    #[test]
    fn checksums_of_modified_containers() {
        let mut doc = Document::new(matroska());
        let info = doc.create_element(ids::INFO);
        doc.append_child(doc.root(), info).unwrap();
        let crc = doc.create_element(ids::CRC32);
        doc.append_child(info, crc).unwrap();
        doc.set_by_name(info, "TimestampScale", 1_000_000u64).unwrap();

        let dest = written(&mut doc);
        let expected = crc32fast::hash(&[0x2a, 0xd7, 0xb1, 0x83, 0x0f, 0x42, 0x40]);
        assert_eq!(&tools::write_checksum(expected), &dest[7..11]);
        assert_eq!(Some(true), doc.verify_checksum(info).unwrap());
    }

    #[test]
    fn errors_convert() {
        let err: WriteError = DocumentError::PartialDocumentImmutable.into();
        assert!(matches!(err, WriteError::Document(_)));
    }
}
