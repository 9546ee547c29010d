#![cfg(feature = "futures")]

mod common;

pub mod async_decode_tests {
    use futures::executor::block_on;
    use futures::io::Cursor;
    use futures::StreamExt;

    use ebml_document::errors::decoder::DecodeError;
    use ebml_document::schema::matroska::matroska;
    use ebml_document::{AsyncDecoder, DecodeEvent, DecoderOptions, Value};

    use super::common::{sample, TITLE};

    #[test]
    pub fn stream_reports_every_section() {
        let decoder = AsyncDecoder::new(Cursor::new(sample().bytes), matroska(), DecoderOptions::default().block_size(7));
        let events: Vec<DecodeEvent> = block_on(decoder.into_stream().map(|e| e.unwrap()).collect());

        let started = events.iter().filter(|e| matches!(e, DecodeEvent::MasterStarted(_))).count();
        let ended = events.iter().filter(|e| matches!(e, DecodeEvent::MasterEnded(_))).count();
        assert_eq!(started, ended);
        // the last TagString closes every open master before it is reported
        assert!(matches!(events.last(), Some(DecodeEvent::LeafReady(_))));
    }

    #[test]
    pub fn finish_returns_the_document() {
        let sample = sample();
        let decoder = AsyncDecoder::new(Cursor::new(sample.bytes), matroska(), DecoderOptions::default());
        let doc = block_on(decoder.finish()).unwrap();

        let segment = doc.get_first_child_by_name(doc.root(), "Segment").unwrap();
        assert_eq!(Some(Value::String(TITLE.to_string())), doc.get_by_name(segment, "Title").unwrap());
        let cue = doc.get_first_child_by_name(segment, "CueClusterPosition").unwrap();
        assert_eq!(doc.get_direct_child_by_name(segment, "Cluster"), doc.element(cue).unwrap().cross_reference_target());
        assert!(doc.source().is_none());
    }

    #[test]
    pub fn truncated_streams_fail() {
        let mut bytes = sample().bytes;
        bytes.truncate(bytes.len() / 2);
        let decoder = AsyncDecoder::new(Cursor::new(bytes), matroska(), DecoderOptions::default());
        assert!(matches!(block_on(decoder.finish()), Err(DecodeError::MalformedContainer { .. })));
    }
}
