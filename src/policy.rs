use log::debug;

use super::document::Document;
use super::element::ElementId;
use super::errors::document::DocumentError;
use super::tools;

const SECTIONS_BEFORE_CLUSTERS: [&str; 4] = ["SeekHead", "Info", "Tracks", "Cues"];
const SECTIONS_AT_END: [&str; 2] = ["Tags", "Attachments"];
const INDEXED_SECTIONS: [&str; 6] = ["Info", "Tracks", "Cues", "Chapters", "Tags", "Attachments"];
const CHECKSUMMED_SECTIONS: [&str; 7] = ["SeekHead", "Info", "Tracks", "Cues", "Chapters", "Tags", "Attachments"];

///
/// A step run on a modified document right before it is written.
///
pub trait PreparePolicy {
    fn prepare(&self, doc: &mut Document) -> Result<(), DocumentError>;
}

///
/// Leaves the document as is.
///
#[derive(Copy, Clone, Debug, Default)]
pub struct KeepAsIs;

impl PreparePolicy for KeepAsIs {
    fn prepare(&self, _doc: &mut Document) -> Result<(), DocumentError> {
        Ok(())
    }
}

///
/// Normalizes the layout of modified Matroska segments.
///
/// In every modified Segment:
/// - SeekHead, Info, Tracks and Cues are moved before the first Cluster, Tags and Attachments to the end;
/// - top-level Void elements are removed;
/// - each SeekHead gets an entry for every indexed section it does not list yet;
/// - SeekHead, Info, Tracks, Cues, Chapters, Tags, Attachments and every AttachedFile get exactly one checksum element, as their first child.
///
/// Sections whose children were skipped while decoding are left alone.  Unless disabled, integer and float values are then re-encoded on as few bytes as possible (see [`Document::optimize_data`]).
///
#[derive(Copy, Clone, Debug)]
pub struct NormalizePolicy {
    pub optimize_data: bool,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        NormalizePolicy { optimize_data: true }
    }
}

impl PreparePolicy for NormalizePolicy {
    fn prepare(&self, doc: &mut Document) -> Result<(), DocumentError> {
        let segments = direct_children_named(doc, doc.root(), "Segment");
        for segment in segments {
            if doc.get(segment).is_modified() && !doc.get(segment).children_skipped() {
                normalize_segment(doc, segment)?;
            }
        }

        if self.optimize_data {
            let count = doc.optimize_data()?;
            debug!("Optimized {} values", count);
        }
        Ok(())
    }
}

fn direct_children_named(doc: &Document, parent: ElementId, name: &str) -> Vec<ElementId> {
    match doc.schema().id_by_name(name) {
        Some(ebml_id) => doc.get(parent).children().iter().copied().filter(|c| doc.get(*c).ebml_id() == ebml_id).collect(),
        None => Vec::new(),
    }
}

fn normalize_segment(doc: &mut Document, segment: ElementId) -> Result<(), DocumentError> {
    let cluster = doc.get_direct_child_by_name(segment, "Cluster");
    for name in SECTIONS_BEFORE_CLUSTERS {
        for section in direct_children_named(doc, segment, name) {
            move_before(doc, segment, section, cluster)?;
        }
    }

    for void in direct_children_named(doc, segment, "Void") {
        doc.remove(void)?;
    }

    for name in SECTIONS_AT_END {
        for section in direct_children_named(doc, segment, name) {
            move_before(doc, segment, section, None)?;
        }
    }

    let seek_heads = direct_children_named(doc, segment, "SeekHead");
    for name in INDEXED_SECTIONS {
        for section in direct_children_named(doc, segment, name) {
            verify_seek(doc, &seek_heads, section)?;
        }
    }

    for name in CHECKSUMMED_SECTIONS {
        for section in direct_children_named(doc, segment, name) {
            verify_checksum(doc, section)?;
        }
    }
    for attachments in direct_children_named(doc, segment, "Attachments") {
        for file in direct_children_named(doc, attachments, "AttachedFile") {
            verify_checksum(doc, file)?;
        }
    }
    Ok(())
}

///
/// Moves `child` before `before` (or last) unless it already is in place.
///
fn move_before(doc: &mut Document, parent: ElementId, child: ElementId, before: Option<ElementId>) -> Result<(), DocumentError> {
    let children = doc.get(parent).children();
    let index = children.iter().position(|c| *c == child);
    let in_place = match before {
        Some(before) => index < children.iter().position(|c| *c == before),
        None => index == Some(children.len() - 1),
    };
    if in_place {
        return Ok(());
    }
    doc.move_child_before(parent, child, before)
}

fn verify_seek(doc: &mut Document, seek_heads: &[ElementId], section: ElementId) -> Result<(), DocumentError> {
    let section_id = doc.get(section).ebml_id();
    for seek_head in seek_heads {
        if doc.get(*seek_head).children_skipped() {
            continue;
        }

        let listed = direct_children_named(doc, *seek_head, "Seek").into_iter().any(|seek| {
            doc.get_direct_child_by_name(seek, "SeekID")
                .and_then(|seek_id| doc.get(seek_id).data())
                .and_then(|data| tools::arr_to_u64(data).ok())
                == Some(section_id as u64)
        });
        if listed {
            continue;
        }

        debug!("Adding index entry for {} to {}", section, seek_head);
        let seek = doc.create_element_by_name("Seek")?;
        doc.append_child(*seek_head, seek)?;
        let seek_id = doc.create_element_by_name("SeekID")?;
        doc.append_child(seek, seek_id)?;
        doc.set_seek_id(seek_id, section_id)?;
        let position = doc.set_by_name(seek, "SeekPosition", 0u64)?;
        doc.set_cross_reference_target(position, section)?;
    }
    Ok(())
}

fn verify_checksum(doc: &mut Document, container: ElementId) -> Result<(), DocumentError> {
    if doc.get(container).children_skipped() {
        return Ok(());
    }

    let checksums: Vec<ElementId> = doc.get(container).children().iter().copied().filter(|c| doc.is_checksum_element(*c)).collect();
    let first = doc.get(container).children().first().copied();

    let mut found = false;
    for crc in checksums {
        if Some(crc) == first {
            found = true;
        } else {
            doc.remove(crc)?;
        }
    }
    if found {
        return Ok(());
    }

    let crc = doc.create_element_by_name("CRC-32")?;
    doc.set_checksum_value(crc, 0)?;
    doc.insert_before(container, crc, first)?;
    Ok(())
}
