use std::io::Read;

use crc32fast::Hasher;

use super::document::{encode_header, Document, Layout};
use super::element::ElementId;
use super::errors::document::DocumentError;
use super::errors::source::SourceError;
use super::source;
use super::tools::{self, Vint};

const READ_CHUNK_LEN: usize = 1024 * 16;

impl Document {
    ///
    /// Computes the CRC-32 of the content of `container` as it would be written now, leaving out the container's own checksum children.
    ///
    /// Unmodified elements contribute their original bytes; content that is not in memory is streamed from the document source or from the element's data source.
    ///
    /// # Errors
    ///
    /// This method fails if content has to be streamed and the source cannot deliver it.
    ///
    pub fn compute_checksum(&self, container: ElementId) -> Result<u32, DocumentError> {
        let layout = self.layout()?;
        self.compute_checksum_with(&layout, container)
    }

    pub(crate) fn compute_checksum_with(&self, layout: &Layout, container: ElementId) -> Result<u32, DocumentError> {
        let mut hasher = Hasher::new();
        for child in self.get(container).children() {
            if self.is_checksum_element(*child) {
                continue;
            }
            self.feed_element(layout, *child, &mut hasher)?;
        }
        Ok(hasher.finalize())
    }

    ///
    /// Compares the stored value of the first checksum child of `container` with its recomputed value.  `None` if the container has no readable checksum child.
    ///
    pub fn verify_checksum(&self, container: ElementId) -> Result<Option<bool>, DocumentError> {
        let stored = self.get(container).children().iter()
            .find(|child| self.is_checksum_element(**child))
            .and_then(|crc| self.get(*crc).data())
            .and_then(tools::arr_to_checksum);

        match stored {
            Some(stored) => Ok(Some(stored == self.compute_checksum(container)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn is_checksum_element(&self, id: ElementId) -> bool {
        self.schema().descriptor(self.get(id).ebml_id()).map_or(false, |d| d.is_checksum())
    }

    fn feed_element(&self, layout: &Layout, id: ElementId, hasher: &mut Hasher) -> Result<(), DocumentError> {
        let element = self.get(id);

        if element.is_verbatim() {
            let content_missing = if element.is_master() { element.children_skipped() } else { element.data().is_none() };
            if content_missing {
                let (start, end) = element.original_range().ok_or(SourceError::NoSource { element: id.get() })?;
                let source = self.source().ok_or(SourceError::NoSource { element: id.get() })?;
                return feed_reader(source::open_exact(source.as_ref(), start, Some(end))?, hasher);
            }

            let content_size = element.data_size().unwrap_or(0);
            hasher.update(&tools::write_element_id(element.ebml_id()));
            hasher.update(&content_size.as_vint_with_length(element.header_len_size)?);
        } else {
            let content_size = layout.content_size(id).unwrap_or(0);
            hasher.update(&encode_header(element.ebml_id(), content_size)?);
        }

        if element.is_master() {
            for child in element.children() {
                self.feed_element(layout, *child, hasher)?;
            }
            Ok(())
        } else if let Some(data) = element.data() {
            hasher.update(data);
            Ok(())
        } else {
            feed_reader(self.open_data(id)?, hasher)
        }
    }
}

fn feed_reader(mut reader: Box<dyn Read + Send>, hasher: &mut Hasher) -> Result<(), DocumentError> {
    let mut buffer = vec![0u8; READ_CHUNK_LEN];
    loop {
        let read = reader.read(&mut buffer).map_err(SourceError::from)?;
        if read == 0 {
            return Ok(());
        }
        hasher.update(&buffer[..read]);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ebml_document_schema::matroska::{ids, matroska};

    use super::*;
    use crate::source::BytesDataSource;

    #[test]
    fn checksum_covers_siblings_only() {
        let mut doc = Document::new(matroska());
        let info = doc.create_element(ids::INFO);
        doc.append_child(doc.root(), info).unwrap();
        let crc = doc.create_element(ids::CRC32);
        doc.append_child(info, crc).unwrap();
        doc.set_by_name(info, "TimestampScale", 1_000_000u64).unwrap();

        let expected = crc32fast::hash(&[0x2a, 0xd7, 0xb1, 0x83, 0x0f, 0x42, 0x40]);
        assert_eq!(expected, doc.compute_checksum(info).unwrap());

        doc.set_checksum_value(crc, 1).unwrap();
        assert_eq!(expected, doc.compute_checksum(info).unwrap());
        assert_eq!(Some(false), doc.verify_checksum(info).unwrap());
        doc.set_checksum_value(crc, expected).unwrap();
        assert_eq!(Some(true), doc.verify_checksum(info).unwrap());
    }

    #[test]
    fn data_sources_are_streamed() {
        let mut doc = Document::new(matroska());
        let file = doc.create_element(ids::ATTACHED_FILE);
        doc.append_child(doc.root(), file).unwrap();
        let data = doc.create_element(ids::FILE_DATA);
        doc.append_child(file, data).unwrap();
        doc.set_data_source(data, Arc::new(BytesDataSource::new(vec![7u8; 3]))).unwrap();

        let expected = crc32fast::hash(&[0x46, 0x5c, 0x83, 7, 7, 7]);
        assert_eq!(expected, doc.compute_checksum(file).unwrap());
        assert_eq!(None, doc.verify_checksum(file).unwrap());
    }
}
