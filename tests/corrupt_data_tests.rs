mod common;

pub mod corrupt_data_tests {
    use ebml_document::errors::decoder::DecodeError;
    use ebml_document::errors::writer::WriteError;
    use ebml_document::schema::matroska::{ids, matroska};
    use ebml_document::tools::{self, Vint};
    use ebml_document::{parse_bytes, Decoder, DecoderOptions, Document, Drive, Value, WriteOptions};

    use super::common::{ebml_header, element, master, sample, seek, string, uint};

    fn malformed(bytes: Vec<u8>) -> bool {
        matches!(parse_bytes(matroska(), bytes, DecoderOptions::default()), Err(DecodeError::MalformedContainer { .. }))
    }

    #[test]
    pub fn error_on_truncated_data() {
        let mut bytes = sample().bytes;
        bytes.truncate(bytes.len() - 3);
        assert!(malformed(bytes));
    }

    #[test]
    pub fn error_on_missing_header() {
        assert!(malformed(uint(0x4286, 1)));
        assert!(malformed(Vec::new()));
    }

    #[test]
    pub fn error_on_child_past_parent() {
        let bytes = vec![0x1a, 0x45, 0xdf, 0xa3, 0x83, 0x42, 0x86, 0x85, 0x01];
        assert!(malformed(bytes));
    }

    #[test]
    pub fn error_on_unknown_size() {
        let bytes = [ebml_header(), vec![0x18, 0x53, 0x80, 0x67, 0xff], uint(0x7BA9, 1)].concat();
        assert!(malformed(bytes));
    }

    #[test]
    pub fn error_on_invalid_vint() {
        let bytes = [ebml_header(), vec![0x00, 0x81, 0x00]].concat();
        assert!(malformed(bytes));
    }

    #[test]
    pub fn error_on_trailing_garbage() {
        let bytes = [ebml_header(), vec![0x42]].concat();
        assert!(malformed(bytes));
    }

    #[test]
    pub fn error_on_data_truncated_inside_a_skipped_payload() {
        let cluster = master(ids::CLUSTER, &[uint(0xE7, 0), element(ids::SIMPLE_BLOCK, &vec![0x5a; 200_000])]);
        let mut bytes = [ebml_header(), master(ids::SEGMENT, &[cluster])].concat();
        bytes.truncate(bytes.len() - 100);
        assert!(malformed(bytes.clone()));

        let result = parse_bytes(matroska(), bytes, DecoderOptions::default().block_size(1));
        assert!(matches!(result, Err(DecodeError::MalformedContainer { .. })));
    }

    #[test]
    pub fn error_on_sizes_larger_than_the_data() {
        let mut bytes = ebml_header();
        bytes.extend(tools::write_element_id(ids::SEGMENT));
        bytes.extend((1u64 << 47).as_vint().unwrap());
        bytes.extend(tools::write_element_id(0x7BA9));
        bytes.extend((1u64 << 46).as_vint().unwrap());
        bytes.extend_from_slice(b"title");
        assert!(malformed(bytes.clone()));
        assert!(matches!(parse_bytes(matroska(), bytes, DecoderOptions::load_all()), Err(DecodeError::MalformedContainer { .. })));
    }

    #[test]
    pub fn decoder_stays_stopped() {
        let mut decoder = Decoder::new(matroska(), DecoderOptions::default());
        decoder.feed(&[0x42, 0x86, 0x81, 0x01]);
        assert!(matches!(decoder.next_event(), Drive::Failed(DecodeError::MalformedContainer { .. })));
        assert!(decoder.is_stopped());

        decoder.feed(&ebml_header());
        assert!(matches!(decoder.next_event(), Drive::Failed(DecodeError::Stopped)));
        assert!(matches!(decoder.finish(), Err(DecodeError::Stopped)));
    }

    #[test]
    pub fn unresolved_offsets_cannot_be_rewritten() {
        let seek_head = master(ids::SEEK_HEAD, &[seek(ids::INFO, 3)]);
        let info = master(ids::INFO, &[string(0x7BA9, "title")]);
        let bytes = [ebml_header(), master(ids::SEGMENT, &[seek_head, info])].concat();

        let mut doc = parse_bytes(matroska(), bytes.clone(), DecoderOptions::default()).unwrap();
        let position = doc.get_first_child_by_name(doc.root(), "SeekPosition").unwrap();
        assert_eq!(None, doc.element(position).unwrap().cross_reference_target());

        // untouched documents are still copied
        let mut dest = Vec::new();
        doc.write_to(&mut dest, &WriteOptions::default()).unwrap();
        assert_eq!(bytes, dest);

        let segment = doc.get_first_child_by_name(doc.root(), "Segment").unwrap();
        doc.set_by_name(segment, "Title", "another title").unwrap();
        let result = doc.write_to(Vec::new(), &WriteOptions::default());
        assert!(matches!(result, Err(WriteError::DanglingReference { reason: "no target", .. })));
    }

    #[test]
    pub fn references_stay_in_their_top_level_element() {
        let mut doc = Document::new(matroska());
        let header = doc.create_element(ids::EBML);
        doc.append_child(doc.root(), header).unwrap();
        let doc_type = doc.set_by_name(header, "DocType", "webm").unwrap();

        let segment = doc.create_element(ids::SEGMENT);
        doc.append_child(doc.root(), segment).unwrap();
        let seek_head = doc.create_element(ids::SEEK_HEAD);
        doc.append_child(segment, seek_head).unwrap();
        let seek = doc.create_element(ids::SEEK);
        doc.append_child(seek_head, seek).unwrap();
        let position = doc.set_by_name(seek, "SeekPosition", 0u64).unwrap();
        doc.set_cross_reference_target(position, doc_type).unwrap();

        let result = doc.write_to(Vec::new(), &WriteOptions::default());
        assert!(matches!(result, Err(WriteError::DanglingReference { reason: "target is under another top-level element", .. })));

        let detached = doc.create_element(ids::INFO);
        doc.set_cross_reference_target(position, detached).unwrap();
        let result = doc.write_to(Vec::new(), &WriteOptions::default());
        assert!(matches!(result, Err(WriteError::DanglingReference { reason: "target is not in the document", .. })));
    }

    #[test]
    pub fn values_of_the_wrong_kind_are_refused() {
        let bytes = [ebml_header(), master(ids::SEGMENT, &[master(ids::INFO, &[element(0x7BA9, &[0xff, 0xfe])])])].concat();
        let mut doc = parse_bytes(matroska(), bytes, DecoderOptions::default()).unwrap();
        let title = doc.get_first_child_by_name(doc.root(), "Title").unwrap();
        assert!(doc.get_value(title).is_err());
        assert!(doc.set_value(title, 5u64).is_err());
        doc.set_value(title, "fixed").unwrap();
        assert_eq!(Some(Value::String("fixed".to_string())), doc.get_value(title).unwrap());
    }
}
