pub mod tool {
    use std::string::FromUtf8Error;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ToolError {
        #[error("Invalid vint marker: leading byte is zero")]
        InvalidVintMarker,

        #[error("Unrepresentable vint value encountered ({length} bytes)")]
        ReadVintOverflow { length: usize },

        #[error("Value too large to be written as a vint: {0}")]
        WriteVintOverflow(u64),

        #[error("Element id uses {0} bytes, at most 4 are supported")]
        ElementIdTooLong(usize),

        #[error("Unrepresentable value (more than 52 significant bits): {0}")]
        Unrepresentable(String),

        #[error("Could not read unsigned int from array: {0:?}")]
        ReadU64Overflow(Vec<u8>),

        #[error("Could not read int from array: {0:?}")]
        ReadI64Overflow(Vec<u8>),

        #[error("Could not read float from array: {0:?}")]
        ReadF64Mismatch(Vec<u8>),

        #[error("Could not read date from array: {0:?}")]
        ReadDateMismatch(Vec<u8>),

        #[error("Could not read utf8 string from array: {0:?}")]
        FromUtf8Error(Vec<u8>, #[source] FromUtf8Error),
    }
}

pub mod source {
    use std::io;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum SourceError {
        #[error("Error reading from source.")]
        Io(#[from] io::Error),

        #[error("Source delivered data starting at offset {actual}, expected {expected}")]
        OffsetMismatch { expected: u64, actual: u64 },

        #[error("Element {element} has no data in memory and the document has no byte source")]
        NoSource { element: u64 },

        #[error("Data source delivered {actual} bytes, expected {expected}")]
        LengthMismatch { expected: u64, actual: u64 },
    }
}

pub mod document {
    use ebml_document_schema::ValueKind;
    use thiserror::Error;

    use super::source::SourceError;
    use super::tool::ToolError;

    #[derive(Debug, Error)]
    pub enum DocumentError {
        #[error("Document was partially parsed and cannot be modified")]
        PartialDocumentImmutable,

        #[error("Element {element} of kind {kind:?} cannot hold value {value}")]
        UnsupportedValue {
            element: u64,
            kind: ValueKind,
            value: String,
        },

        #[error("Unknown element name '{0}'")]
        UnknownName(String),

        #[error("Invalid tree operation on element {element}: {reason}")]
        InvalidHierarchy {
            element: u64,
            reason: &'static str,
        },

        #[error(transparent)]
        Tool(#[from] ToolError),

        #[error(transparent)]
        Source(#[from] SourceError),
    }
}

pub mod decoder {
    use thiserror::Error;

    use super::document::DocumentError;
    use super::source::SourceError;

    #[derive(Debug, Error)]
    pub enum DecodeError {
        #[error("Malformed container at offset {position}: {reason}")]
        MalformedContainer {
            position: u64,
            reason: String,
        },

        #[error("Decoding already failed; no more data is consumed")]
        Stopped,

        #[error(transparent)]
        Document(#[from] DocumentError),

        #[error(transparent)]
        Source(#[from] SourceError),
    }
}

pub mod writer {
    use std::io;
    use thiserror::Error;

    use super::document::DocumentError;
    use super::source::SourceError;
    use super::tool::ToolError;

    #[derive(Debug, Error)]
    pub enum WriteError {
        #[error("Cannot write a partially parsed document")]
        CannotWritePartial,

        #[error("Cross-reference element {element} cannot be resolved: {reason}")]
        DanglingReference {
            element: u64,
            reason: &'static str,
        },

        #[error("Error writing to destination.")]
        Io(#[from] io::Error),

        #[error(transparent)]
        Document(#[from] DocumentError),

        #[error(transparent)]
        Tool(#[from] ToolError),

        #[error(transparent)]
        Source(#[from] SourceError),
    }
}
