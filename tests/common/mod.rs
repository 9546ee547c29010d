#![allow(dead_code)]

use ebml_document::schema::matroska::ids;
use ebml_document::tools::{self, Vint};

pub const TITLE: &str = "sample";
pub const BLOCK: [u8; 8] = [0x81, 0x00, 0x00, 0x80, 0x01, 0x02, 0x03, 0x04];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn element(id: u32, content: &[u8]) -> Vec<u8> {
    let mut out = tools::write_element_id(id);
    out.extend((content.len() as u64).as_vint().expect("size fits a vint"));
    out.extend_from_slice(content);
    out
}

pub fn master(id: u32, children: &[Vec<u8>]) -> Vec<u8> {
    element(id, &children.concat())
}

pub fn uint(id: u32, val: u64) -> Vec<u8> {
    element(id, &tools::write_uint(val).expect("small value"))
}

pub fn string(id: u32, val: &str) -> Vec<u8> {
    element(id, val.as_bytes())
}

pub fn offset(id: u32, val: u64) -> Vec<u8> {
    element(id, &(val as u16).to_be_bytes())
}

pub fn seek(target: u32, position: u64) -> Vec<u8> {
    master(ids::SEEK, &[element(ids::SEEK_ID, &tools::write_element_id(target)), offset(ids::SEEK_POSITION, position)])
}

pub fn ebml_header() -> Vec<u8> {
    master(ids::EBML, &[uint(0x4286, 1), string(ids::DOC_TYPE, "webm")])
}

///
/// A small Matroska file and the offsets of its sections.
///
pub struct Sample {
    pub bytes: Vec<u8>,
    pub segment_start: u64,
    pub segment_content_start: u64,
    pub info: u64,
    pub tracks: u64,
    pub cluster: u64,
    pub cues: u64,
    pub tags: u64,
}

///
/// EBML header, then a Segment holding SeekHead, Info (with a CRC-32), Tracks, Cluster, Cues and Tags.  Offsets in SeekHead and Cues are stored on 2 bytes.
///
pub fn sample() -> Sample {
    let info_children = [uint(0x2AD7B1, 1_000_000), string(0x7BA9, TITLE)].concat();
    let crc = tools::write_checksum(crc32fast::hash(&info_children));
    let info = master(ids::INFO, &[element(ids::CRC32, &crc), info_children]);

    let tracks = master(ids::TRACKS, &[master(0xAE, &[uint(0xD7, 1), string(0x86, "V_VP9")])]);
    let cluster = master(ids::CLUSTER, &[uint(0xE7, 0), element(ids::SIMPLE_BLOCK, &BLOCK)]);
    let tags = master(ids::TAGS, &[master(0x7373, &[master(0x67C8, &[string(0x45A3, "TITLE"), string(0x4487, TITLE)])])]);

    let seek_head_len = master(ids::SEEK_HEAD, &[seek(ids::INFO, 0), seek(ids::TRACKS, 0), seek(ids::CUES, 0), seek(ids::TAGS, 0)]).len() as u64;
    let info_offset = seek_head_len;
    let tracks_offset = info_offset + info.len() as u64;
    let cluster_offset = tracks_offset + tracks.len() as u64;

    let cues = master(ids::CUES, &[master(0xBB, &[uint(0xB3, 0), master(0xB7, &[uint(0xF7, 1), offset(ids::CUE_CLUSTER_POSITION, cluster_offset)])])]);
    let cues_offset = cluster_offset + cluster.len() as u64;
    let tags_offset = cues_offset + cues.len() as u64;

    let seek_head = master(ids::SEEK_HEAD, &[
        seek(ids::INFO, info_offset),
        seek(ids::TRACKS, tracks_offset),
        seek(ids::CUES, cues_offset),
        seek(ids::TAGS, tags_offset),
    ]);
    let content = [seek_head, info, tracks, cluster, cues, tags].concat();
    let segment = element(ids::SEGMENT, &content);

    let header = ebml_header();
    let segment_start = header.len() as u64;
    Sample {
        segment_content_start: segment_start + (segment.len() - content.len()) as u64,
        bytes: [header, segment].concat(),
        segment_start,
        info: info_offset,
        tracks: tracks_offset,
        cluster: cluster_offset,
        cues: cues_offset,
        tags: tags_offset,
    }
}
