use futures::{AsyncRead, AsyncReadExt, Stream};

use super::decoder::Decoder;
use super::decoder_util::{DecodeEvent, DecoderOptions, Drive};
use super::document::{Document, SharedSchema};
use super::errors::decoder::DecodeError;
use super::errors::source::SourceError;

///
/// Decodes a document from a [`futures::AsyncRead`] source.
///
/// Events can be consumed by calling [`.next().await`][AsyncDecoder::next] in a loop, after which [`finish`][AsyncDecoder::finish] returns the decoded document, or the decoder can be turned into a [`Stream`] of events with [`into_stream`][AsyncDecoder::into_stream].
///
/// Skipped content is read and dropped, since an async source cannot be re-opened further on.  The document has no byte source: the data of skipped elements cannot be read back.
///
pub struct AsyncDecoder<R: AsyncRead + Unpin> {
    source: R,
    buffer: Box<[u8]>,
    decoder: Decoder,
    done: bool,
}

impl<R: AsyncRead + Unpin> AsyncDecoder<R> {
    pub fn new(source: R, schema: SharedSchema, options: DecoderOptions) -> Self {
        let buffer = vec![0u8; options.block_size.max(1)];
        AsyncDecoder {
            source,
            buffer: buffer.into_boxed_slice(),
            decoder: Decoder::new(schema, options),
            done: false,
        }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    ///
    /// Returns the next event, `None` once the source is exhausted.  After an error every call returns `None`.
    ///
    pub async fn next(&mut self) -> Option<Result<DecodeEvent, DecodeError>> {
        if self.done {
            return None;
        }
        loop {
            match self.decoder.next_event() {
                Drive::Event(event) => return Some(Ok(event)),
                Drive::Failed(err) => {
                    self.done = true;
                    return Some(Err(err));
                },
                Drive::NeedMoreData => {
                    match self.source.read(&mut self.buffer).await {
                        Ok(0) => {
                            self.done = true;
                            return None;
                        },
                        Ok(len) => self.decoder.feed(&self.buffer[..len]),
                        Err(e) => {
                            self.done = true;
                            return Some(Err(DecodeError::Source(SourceError::Io(e))));
                        },
                    }
                },
            }
        }
    }

    ///
    /// Reads the rest of the source and returns the decoded document.
    ///
    /// # Errors
    ///
    /// Fails like [`Decoder::finish`] if the source ended inside an element, or with the first decoding error.
    ///
    pub async fn finish(mut self) -> Result<Document, DecodeError> {
        while let Some(event) = self.next().await {
            event?;
        }
        let mut document = self.decoder.finish()?;
        document.build_links();
        Ok(document)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<DecodeEvent, DecodeError>> {
        futures::stream::unfold(self, |mut decoder| async {
            let next = decoder.next().await;
            next.map(move |it| (it, decoder))
        })
    }
}
