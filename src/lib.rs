//! This crate provides a document model for [EBML][EBML] files.  Files are decoded into a tree of elements that can be queried, modified and written back.  Its primary goal is to rewrite metadata of large files cheaply: untouched regions are copied from the source as they are, and payload the caller does not need is never loaded.
//!
//! [EBML][EBML] stands for Extensible Binary Meta-Language and is somewhat of a
//! binary version of XML. It's used for container formats like [WebM][webm] or
//! [MKV][mkv].
//!
//! # Schemas
//! The decoder and the document are schema-agnostic: element names and value kinds come from an implementation of [`schema::EbmlSchema`].  A Matroska/WebM table is bundled in [`schema::matroska`], and other schemas can be described with [`schema::SchemaTable`].
//!
//! # Reading and writing
//! [`parse`] (or [`parse_bytes`], [`parse_file`]) decodes a whole document, [`parse_sections`] only the top-level sections it is asked for.  [`Decoder`] can also be driven by hand, one chunk at a time.  Once modified, a document is written with [`DocumentWriter`]: cross-reference values (e.g. `SeekPosition`) and `CRC-32` elements are recomputed, and a [`PreparePolicy`] can reorganize the document right before.
//!
//! # Known Limitations
//! Elements of "Unknown Data Size" as defined in [RFC8794][rfc8794] are rejected.  Live streams that use them cannot be decoded.
//!
//! [EBML]: http://ebml.sourceforge.net/
//! [webm]: https://www.webmproject.org/
//! [mkv]: http://www.matroska.org/technical/specs/index.html
//! [rfc8794]: https://datatracker.ietf.org/doc/rfc8794/
//!

pub mod errors;
pub mod tools;
mod source;
mod element;
mod document;
mod checksum;
mod decoder_util;
mod decoder;
mod parse;
mod policy;
mod writer;

#[cfg(feature = "futures")]
mod decoder_async;

pub use ebml_document_schema as schema;

pub use self::document::{Document, OffsetHit, SharedSchema};
pub use self::element::{Element, ElementId, SavedRange, Value};
pub use self::source::{ByteRange, ByteSource, BytesDataSource, DataSource, FileDataSource, FileSource, MemorySource, SourceStream};
pub use self::decoder::Decoder;
pub use self::decoder_util::{DecodeEvent, DecoderOptions, Drive, SeekOutcome};
pub use self::parse::{parse, parse_bytes, parse_file, parse_sections};
pub use self::policy::{KeepAsIs, NormalizePolicy, PreparePolicy};
pub use self::writer::{write, DocumentWriter, WriteOptions};

#[cfg(feature = "futures")]
pub use self::decoder_async::AsyncDecoder;
