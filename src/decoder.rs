use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use log::{debug, trace};

use super::decoder_util::{DecodeEvent, DecoderOptions, Drive, OpenElement, SeekOutcome, State};
use super::document::{Document, SharedSchema};
use super::element::ElementId;
use super::errors::decoder::DecodeError;
use super::errors::source::SourceError;
use super::tools;

///
/// Incremental EBML decoder building a [`Document`].
///
/// The decoder does no I/O itself: bytes are handed over with [`Self::feed`] (or read with [`Self::feed_from`]) in chunks of any size, and [`Self::next_event`] drives the state machine over what is buffered.  Chunk boundaries do not matter; an element split across chunks is completed once the rest of it arrives.
///
/// Content that is skipped (see [`DecoderOptions`]) is consumed from the buffer as it arrives.  A driver that can re-open its source further on may instead take over a pending skip through [`Self::pending_skip`] and [`Self::advance_source`].
///
/// ## Example
///
/// ```
/// use ebml_document::{Decoder, DecoderOptions, Drive};
/// use ebml_document::schema::matroska::matroska;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = [0x1a, 0x45, 0xdf, 0xa3, 0x84, 0x42, 0x82, 0x81, 0x61];
/// let mut decoder = Decoder::new(matroska(), DecoderOptions::default());
/// for chunk in bytes.chunks(3) {
///     decoder.feed(chunk);
///     loop {
///         match decoder.next_event() {
///             Drive::Event(event) => println!("{:?}", event),
///             Drive::NeedMoreData => break,
///             Drive::Failed(err) => return Err(err.into()),
///         }
///     }
/// }
/// let doc = decoder.finish()?;
/// assert!(doc.get_first_child_by_name(doc.root(), "DocType").is_some());
/// # Ok(())
/// # }
/// ```
///
pub struct Decoder {
    document: Document,
    options: DecoderOptions,

    buffer: Vec<u8>,
    buffer_offset: u64,
    position: usize,

    state: State,
    stack: Vec<OpenElement>,
    current: Option<ElementId>,
    skip_remaining: u64,
    skip_continuation: Option<ElementId>,
    events: VecDeque<DecodeEvent>,
    header_seen: bool,
    stopped: bool,
}

impl Decoder {
    pub fn new(schema: SharedSchema, options: DecoderOptions) -> Self {
        Decoder::with_document(Document::new(schema), options)
    }

    pub(crate) fn with_document(document: Document, options: DecoderOptions) -> Self {
        let buffer = Vec::with_capacity(options.capacity);
        Decoder {
            document,
            options,
            buffer,
            buffer_offset: 0,
            position: 0,
            state: State::Tag,
            stack: Vec::new(),
            current: None,
            skip_remaining: 0,
            skip_continuation: None,
            events: VecDeque::new(),
            header_seen: false,
            stopped: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    ///
    /// Absolute offset of the next byte to decode.
    ///
    pub fn current_offset(&self) -> u64 {
        self.buffer_offset + self.position as u64
    }

    ///
    /// Absolute offset right after the buffered bytes: where the next chunk is expected to start.
    ///
    pub fn buffered_end(&self) -> u64 {
        self.buffer_offset + self.buffer.len() as u64
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    ///
    /// Appends a chunk to the bytes awaiting decoding.
    ///
    pub fn feed(&mut self, chunk: &[u8]) {
        if !self.stopped {
            self.buffer.extend_from_slice(chunk);
        }
    }

    ///
    /// Reads at most `len` bytes from `source` straight into the decoder buffer.  Returns the number of bytes read, 0 at end of stream.
    ///
    pub fn feed_from<R: Read + ?Sized>(&mut self, source: &mut R, len: usize) -> Result<usize, SourceError> {
        let filled = self.buffer.len();
        self.buffer.resize(filled + len, 0);
        let result = loop {
            match source.read(&mut self.buffer[filled..]) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        let read = *result.as_ref().unwrap_or(&0);
        self.buffer.truncate(filled + read);
        Ok(result?)
    }

    ///
    /// Drives the state machine over the buffered bytes until it has an event to report or needs more data.
    ///
    pub fn next_event(&mut self) -> Drive {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Drive::Event(event);
            }
            if self.stopped {
                return Drive::Failed(DecodeError::Stopped);
            }

            match self.step() {
                Ok(true) => {},
                Ok(false) => {
                    self.release_consumed();
                    return Drive::NeedMoreData;
                },
                Err(err) => {
                    debug!("Decoding stopped at offset {}: {}", self.current_offset(), err);
                    self.stopped = true;
                    return Drive::Failed(err);
                },
            }
        }
    }

    ///
    /// Bytes that still have to be skipped once the buffer is exhausted.  A driver can satisfy them with [`Self::advance_source`] instead of feeding the bytes.
    ///
    pub fn pending_skip(&self) -> u64 {
        if self.state == State::SkipData && self.position >= self.buffer.len() {
            self.skip_remaining
        } else {
            0
        }
    }

    ///
    /// Records that the driver moved its source `count` bytes forward instead of feeding them.  The next fed chunk must start at [`Self::buffered_end`].
    ///
    /// Once the whole skip is covered the skipped element ends, closing the ancestors that end with it.
    ///
    pub fn advance_source(&mut self, count: u64) {
        let count = count.min(self.pending_skip());
        if count == 0 {
            return;
        }
        self.release_consumed();
        self.buffer_offset += count;
        self.skip_remaining -= count;
        if self.skip_remaining == 0 {
            self.state = State::Tag;
            if let Some(id) = self.skip_continuation.take() {
                self.end_content(id);
            }
        }
    }

    ///
    /// Moves decoding to the absolute offset `offset`, where an element header starts.  `ancestors` are the already decoded master elements containing that offset, outermost first.
    ///
    /// Decoding must be between elements, not inside an element header.  A pending skip is dropped.
    ///
    pub fn seek_to(&mut self, offset: u64, ancestors: &[ElementId]) -> Result<SeekOutcome, DecodeError> {
        if self.stopped {
            return Err(DecodeError::Stopped);
        }
        if self.state != State::Tag && self.state != State::SkipData {
            return Err(DecodeError::MalformedContainer { position: self.current_offset(), reason: String::from("seek requested inside an element header") });
        }

        let mut stack = Vec::with_capacity(ancestors.len());
        for id in ancestors {
            let end = self.document.element(*id).and_then(|e| e.end()).ok_or_else(|| DecodeError::MalformedContainer {
                position: offset,
                reason: format!("ancestor {} has no known end", id),
            })?;
            if offset >= end {
                return Err(DecodeError::MalformedContainer { position: offset, reason: format!("offset is past the end of ancestor {}", id) });
            }
            stack.push(OpenElement { id: *id, end });
        }
        self.stack = stack;
        self.state = State::Tag;
        self.skip_remaining = 0;
        self.skip_continuation = None;

        let buffered_end = self.buffered_end();
        let outcome = if offset >= self.buffer_offset && offset <= buffered_end {
            self.position = (offset - self.buffer_offset) as usize;
            SeekOutcome::InBuffer
        } else if offset > buffered_end {
            self.position = self.buffer.len();
            self.release_consumed();
            self.skip_remaining = offset - buffered_end;
            self.state = State::SkipData;
            SeekOutcome::Ahead(self.skip_remaining)
        } else {
            self.buffer.clear();
            self.position = 0;
            self.buffer_offset = offset;
            SeekOutcome::Behind(offset)
        };
        debug!("Seek to offset {}: {:?}", offset, outcome);
        Ok(outcome)
    }

    ///
    /// Ends decoding and returns the document.
    ///
    /// # Errors
    ///
    /// Fails with [`DecodeError::MalformedContainer`] if the stream ended inside an element (truncated input) or held no element at all.
    ///
    pub fn finish(mut self) -> Result<Document, DecodeError> {
        if self.stopped {
            return Err(DecodeError::Stopped);
        }
        if let Some(open) = self.stack.last() {
            let name = self.document.get(open.id).name().unwrap_or("unknown element");
            return Err(self.malformed(format!("stream ended inside {} {} (expected end at {})", name, open.id, open.end)));
        }
        if self.state != State::Tag || self.skip_remaining > 0 {
            return Err(self.malformed(String::from("stream ended inside an element header")));
        }
        if self.position < self.buffer.len() {
            return Err(self.malformed(format!("{} trailing bytes do not form an element", self.buffer.len() - self.position)));
        }
        if !self.header_seen {
            return Err(self.malformed(String::from("stream holds no element")));
        }
        self.release_consumed();
        Ok(self.document)
    }

    ///
    /// Returns the document as decoded so far, without checking that the stream is complete.
    ///
    pub(crate) fn into_document(self) -> Document {
        self.document
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn malformed(&self, reason: String) -> DecodeError {
        DecodeError::MalformedContainer { position: self.current_offset(), reason }
    }

    fn release_consumed(&mut self) {
        if self.position > 0 {
            self.buffer.drain(..self.position);
            self.buffer_offset += self.position as u64;
            self.position = 0;
        }
    }

    fn step(&mut self) -> Result<bool, DecodeError> {
        match self.state {
            State::Tag => self.read_tag(),
            State::Size => self.read_size(),
            State::Content => self.read_content(),
            State::SkipData => self.skip_data(),
        }
    }

    fn read_tag(&mut self) -> Result<bool, DecodeError> {
        let (ebml_id, length) = match tools::read_element_id(&self.buffer[self.position..]) {
            Ok(Some(read)) => read,
            Ok(None) => return Ok(false),
            Err(e) => return Err(self.malformed(e.to_string())),
        };

        if !self.header_seen {
            let header_id = self.document.schema().header_id();
            if ebml_id != header_id {
                return Err(self.malformed(format!("first element is {:X}, expected the header element {:X}", ebml_id, header_id)));
            }
            self.header_seen = true;
        }

        let start = self.current_offset();
        let parent = self.stack.last().map_or(self.document.root(), |open| open.id);
        let id = self.document.attach_decoded(parent, ebml_id, start, length);
        trace!("Read tag {:X} at {} as {}", ebml_id, start, id);

        self.position += length;
        self.current = Some(id);
        self.state = State::Size;
        Ok(true)
    }

    fn read_size(&mut self) -> Result<bool, DecodeError> {
        let (size, length) = match tools::read_var_size(&self.buffer[self.position..], false) {
            Ok(Some(read)) => read,
            Ok(None) => return Ok(false),
            Err(e) => return Err(self.malformed(e.to_string())),
        };
        if length < 8 && size == (1 << (7 * length)) - 1 {
            return Err(self.malformed(String::from("elements of unknown size are not supported")));
        }

        let id = self.current.ok_or_else(|| self.malformed(String::from("size without element")))?;
        let header_id_size = self.document.get(id).header_id_size;
        let start = self.current_offset() - header_id_size as u64;
        let end = self.current_offset() + length as u64 + size;
        if let Some(parent) = self.stack.last() {
            if end > parent.end {
                return Err(self.malformed(format!("element {} ends at {}, after its parent {} ends at {}", id, end, parent.id, parent.end)));
            }
        }
        trace!("Read size {} of {} at {}", size, id, start);

        self.document.set_decoded_size(id, length, size);
        self.position += length;
        self.stack.push(OpenElement { id, end });

        if size == 0 {
            if self.document.get(id).is_master() {
                self.events.push_back(DecodeEvent::MasterStarted(id));
            }
            self.end_content(id);
        } else {
            self.state = State::Content;
        }
        Ok(true)
    }

    fn read_content(&mut self) -> Result<bool, DecodeError> {
        let open = match self.stack.last() {
            Some(open) => *open,
            None => return Err(self.malformed(String::from("content without element"))),
        };
        let element = self.document.get(open.id);
        let skipped = self.options.skips(self.document.schema().as_ref(), element.ebml_id());
        let size = open.end - self.current_offset();

        if element.is_master() {
            if skipped {
                debug!("Skipping {} bytes of content of {}", size, open.id);
                self.document.set_children_skipped(open.id);
                self.begin_skip(size, open.id);
            } else {
                self.events.push_back(DecodeEvent::MasterStarted(open.id));
                self.state = State::Tag;
            }
            return Ok(true);
        }

        if skipped || self.options.ignore_data {
            self.begin_skip(size, open.id);
            return Ok(true);
        }

        let available = (self.buffer.len() - self.position) as u64;
        if available < size {
            // the declared size is not trusted: grow by at most a block
            let missing = (size - available).min(self.options.block_size as u64);
            self.buffer.reserve(missing as usize);
            return Ok(false);
        }

        let size = size as usize;
        let data = self.buffer[self.position..self.position + size].to_vec();
        trace!("Read {} bytes of content of {}", size, open.id);
        self.document.set_decoded_data(open.id, data);
        self.position += size;
        self.end_content(open.id);
        Ok(true)
    }

    fn begin_skip(&mut self, count: u64, then_end: ElementId) {
        self.skip_remaining = count;
        self.skip_continuation = Some(then_end);
        self.state = State::SkipData;
    }

    fn skip_data(&mut self) -> Result<bool, DecodeError> {
        let available = (self.buffer.len() - self.position) as u64;
        let consumed = available.min(self.skip_remaining);
        self.position += consumed as usize;
        self.skip_remaining -= consumed;

        if self.skip_remaining > 0 {
            return Ok(false);
        }

        self.state = State::Tag;
        if let Some(id) = self.skip_continuation.take() {
            self.end_content(id);
        }
        Ok(true)
    }

    ///
    /// Pops `id`, reports the ancestors that end at the current offset, then `id` itself.
    ///
    fn end_content(&mut self, id: ElementId) {
        self.stack.pop();

        let offset = self.current_offset();
        while let Some(open) = self.stack.last() {
            if open.end > offset {
                break;
            }
            trace!("End of {} at {}", open.id, offset);
            self.events.push_back(DecodeEvent::MasterEnded(open.id));
            self.stack.pop();
        }

        self.events.push_back(if self.document.get(id).is_master() {
            DecodeEvent::MasterEnded(id)
        } else {
            DecodeEvent::LeafReady(id)
        });
        self.current = None;
        self.state = State::Tag;
    }
}
