//! The Matroska schema, as published in the Matroska element specification.
//!
//! Only the flags that the document model acts on are carried: cross-references (`SeekPosition`,
//! `CueClusterPosition`), the checksum element (`CRC-32`) and whether an element may repeat.

use std::sync::{Arc, OnceLock};

use crate::{ElementDescriptor, SchemaTable};
use crate::ValueKind::*;

///
/// Ids of the Matroska elements that the document model refers to directly.
///
pub mod ids {
    pub const EBML: u32 = 0x1A45DFA3;
    pub const DOC_TYPE: u32 = 0x4282;
    pub const SEGMENT: u32 = 0x18538067;
    pub const SEEK_HEAD: u32 = 0x114D9B74;
    pub const SEEK: u32 = 0x4DBB;
    pub const SEEK_ID: u32 = 0x53AB;
    pub const SEEK_POSITION: u32 = 0x53AC;
    pub const INFO: u32 = 0x1549A966;
    pub const TRACKS: u32 = 0x1654AE6B;
    pub const CLUSTER: u32 = 0x1F43B675;
    pub const CUES: u32 = 0x1C53BB6B;
    pub const CUE_CLUSTER_POSITION: u32 = 0xF1;
    pub const TAGS: u32 = 0x1254C367;
    pub const ATTACHMENTS: u32 = 0x1941A469;
    pub const ATTACHED_FILE: u32 = 0x61A7;
    pub const FILE_DATA: u32 = 0x465C;
    pub const CHAPTERS: u32 = 0x1043A770;
    pub const SIMPLE_BLOCK: u32 = 0xA3;
    pub const BLOCK: u32 = 0xA1;
    pub const VOID: u32 = 0xEC;
    pub const CRC32: u32 = 0xBF;
}

pub static ELEMENTS: &[ElementDescriptor] = &[
    ElementDescriptor::new(0x80, "ChapterDisplay", Master, 4).multiple(),
    ElementDescriptor::new(0x83, "TrackType", UnsignedInt, 3),
    ElementDescriptor::new(0x85, "ChapString", Utf8, 5),
    ElementDescriptor::new(0x86, "CodecID", String, 3),
    ElementDescriptor::new(0x88, "FlagDefault", UnsignedInt, 3),
    ElementDescriptor::new(0x89, "ChapterTrackUID", UnsignedInt, 5).multiple(),
    ElementDescriptor::new(0x8E, "Slices", Master, 3),
    ElementDescriptor::new(0x8F, "ChapterTrack", Master, 4),
    ElementDescriptor::new(0x91, "ChapterTimeStart", UnsignedInt, 4),
    ElementDescriptor::new(0x92, "ChapterTimeEnd", UnsignedInt, 4),
    ElementDescriptor::new(0x96, "CueRefTime", UnsignedInt, 5),
    ElementDescriptor::new(0x97, "CueRefCluster", UnsignedInt, 5),
    ElementDescriptor::new(0x98, "ChapterFlagHidden", UnsignedInt, 4),
    ElementDescriptor::new(0x9A, "FlagInterlaced", UnsignedInt, 4),
    ElementDescriptor::new(0x9B, "BlockDuration", UnsignedInt, 3),
    ElementDescriptor::new(0x9C, "FlagLacing", UnsignedInt, 3),
    ElementDescriptor::new(0x9D, "FieldOrder", UnsignedInt, 4),
    ElementDescriptor::new(0x9F, "Channels", UnsignedInt, 4),
    ElementDescriptor::new(0xA0, "BlockGroup", Master, 2).multiple(),
    ElementDescriptor::new(0xA1, "Block", Binary, 3).payload(),
    ElementDescriptor::new(0xA2, "BlockVirtual", Binary, 3),
    ElementDescriptor::new(0xA3, "SimpleBlock", Binary, 2).multiple().payload(),
    ElementDescriptor::new(0xA4, "CodecState", Binary, 3),
    ElementDescriptor::new(0xA5, "BlockAdditional", Binary, 5),
    ElementDescriptor::new(0xA6, "BlockMore", Master, 4).multiple(),
    ElementDescriptor::new(0xA7, "Position", UnsignedInt, 2),
    ElementDescriptor::new(0xAA, "CodecDecodeAll", UnsignedInt, 3),
    ElementDescriptor::new(0xAB, "PrevSize", UnsignedInt, 2),
    ElementDescriptor::new(0xAE, "TrackEntry", Master, 2).multiple(),
    ElementDescriptor::new(0xAF, "EncryptedBlock", Binary, 2).multiple(),
    ElementDescriptor::new(0xB0, "PixelWidth", UnsignedInt, 4),
    ElementDescriptor::new(0xB2, "CueDuration", UnsignedInt, 4),
    ElementDescriptor::new(0xB3, "CueTime", UnsignedInt, 3),
    ElementDescriptor::new(0xB5, "SamplingFrequency", Float, 4),
    ElementDescriptor::new(0xB6, "ChapterAtom", Master, 3).multiple(),
    ElementDescriptor::new(0xB7, "CueTrackPositions", Master, 3).multiple(),
    ElementDescriptor::new(0xB9, "FlagEnabled", UnsignedInt, 3),
    ElementDescriptor::new(0xBA, "PixelHeight", UnsignedInt, 4),
    ElementDescriptor::new(0xBB, "CuePoint", Master, 2).multiple(),
    ElementDescriptor::new(0xBF, "CRC-32", Binary, -1).checksum(),
    ElementDescriptor::new(0xC0, "TrickTrackUID", UnsignedInt, 3),
    ElementDescriptor::new(0xC1, "TrickTrackSegmentUID", Binary, 3),
    ElementDescriptor::new(0xC4, "TrickMasterTrackSegmentUID", Binary, 3),
    ElementDescriptor::new(0xC6, "TrickTrackFlag", UnsignedInt, 3),
    ElementDescriptor::new(0xC7, "TrickMasterTrackUID", UnsignedInt, 3),
    ElementDescriptor::new(0xC8, "ReferenceFrame", Master, 3),
    ElementDescriptor::new(0xC9, "ReferenceOffset", UnsignedInt, 4),
    ElementDescriptor::new(0xCA, "ReferenceTimestamp", UnsignedInt, 4),
    ElementDescriptor::new(0xCB, "BlockAdditionID", UnsignedInt, 5),
    ElementDescriptor::new(0xCC, "LaceNumber", UnsignedInt, 5),
    ElementDescriptor::new(0xCD, "FrameNumber", UnsignedInt, 5),
    ElementDescriptor::new(0xCE, "Delay", UnsignedInt, 5),
    ElementDescriptor::new(0xCF, "SliceDuration", UnsignedInt, 5),
    ElementDescriptor::new(0xD7, "TrackNumber", UnsignedInt, 3),
    ElementDescriptor::new(0xDB, "CueReference", Master, 4).multiple(),
    ElementDescriptor::new(0xE0, "Video", Master, 3),
    ElementDescriptor::new(0xE1, "Audio", Master, 3),
    ElementDescriptor::new(0xE2, "TrackOperation", Master, 3),
    ElementDescriptor::new(0xE3, "TrackCombinePlanes", Master, 4),
    ElementDescriptor::new(0xE4, "TrackPlane", Master, 5).multiple(),
    ElementDescriptor::new(0xE5, "TrackPlaneUID", UnsignedInt, 6),
    ElementDescriptor::new(0xE6, "TrackPlaneType", UnsignedInt, 6),
    ElementDescriptor::new(0xE7, "Timestamp", UnsignedInt, 2),
    ElementDescriptor::new(0xE8, "TimeSlice", Master, 4).multiple(),
    ElementDescriptor::new(0xE9, "TrackJoinBlocks", Master, 4),
    ElementDescriptor::new(0xEA, "CueCodecState", UnsignedInt, 4),
    ElementDescriptor::new(0xEB, "CueRefCodecState", UnsignedInt, 5),
    ElementDescriptor::new(0xEC, "Void", Binary, -1).payload(),
    ElementDescriptor::new(0xED, "TrackJoinUID", UnsignedInt, 5).multiple(),
    ElementDescriptor::new(0xEE, "BlockAddID", UnsignedInt, 5),
    ElementDescriptor::new(0xF0, "CueRelativePosition", UnsignedInt, 4),
    ElementDescriptor::new(0xF1, "CueClusterPosition", UnsignedInt, 4).cross_reference(),
    ElementDescriptor::new(0xF7, "CueTrack", UnsignedInt, 4),
    ElementDescriptor::new(0xFA, "ReferencePriority", UnsignedInt, 3),
    ElementDescriptor::new(0xFB, "ReferenceBlock", Integer, 3).multiple(),
    ElementDescriptor::new(0xFD, "ReferenceVirtual", Integer, 3),
    ElementDescriptor::new(0x41A4, "BlockAddIDName", String, 4),
    ElementDescriptor::new(0x41E4, "BlockAdditionMapping", Master, 3).multiple(),
    ElementDescriptor::new(0x41E7, "BlockAddIDType", UnsignedInt, 4),
    ElementDescriptor::new(0x41ED, "BlockAddIDExtraData", Binary, 4),
    ElementDescriptor::new(0x41F0, "BlockAddIDValue", UnsignedInt, 4),
    ElementDescriptor::new(0x4254, "ContentCompAlgo", UnsignedInt, 6),
    ElementDescriptor::new(0x4255, "ContentCompSettings", Binary, 6),
    ElementDescriptor::new(0x4282, "DocType", String, 1),
    ElementDescriptor::new(0x4285, "DocTypeReadVersion", UnsignedInt, 1),
    ElementDescriptor::new(0x4286, "EBMLVersion", UnsignedInt, 1),
    ElementDescriptor::new(0x4287, "DocTypeVersion", UnsignedInt, 1),
    ElementDescriptor::new(0x42F2, "EBMLMaxIDLength", UnsignedInt, 1),
    ElementDescriptor::new(0x42F3, "EBMLMaxSizeLength", UnsignedInt, 1),
    ElementDescriptor::new(0x42F7, "EBMLReadVersion", UnsignedInt, 1),
    ElementDescriptor::new(0x437C, "ChapLanguage", String, 5).multiple(),
    ElementDescriptor::new(0x437D, "ChapLanguageIETF", String, 5).multiple(),
    ElementDescriptor::new(0x437E, "ChapCountry", String, 5).multiple(),
    ElementDescriptor::new(0x4444, "SegmentFamily", Binary, 2).multiple(),
    ElementDescriptor::new(0x4461, "DateUTC", Date, 2),
    ElementDescriptor::new(0x447A, "TagLanguage", String, 4),
    ElementDescriptor::new(0x447B, "TagLanguageIETF", String, 4),
    ElementDescriptor::new(0x4484, "TagDefault", UnsignedInt, 4),
    ElementDescriptor::new(0x4485, "TagBinary", Binary, 4),
    ElementDescriptor::new(0x4487, "TagString", Utf8, 4),
    ElementDescriptor::new(0x4489, "Duration", Float, 2),
    ElementDescriptor::new(0x44B4, "TagDefaultBogus", UnsignedInt, 4),
    ElementDescriptor::new(0x450D, "ChapProcessPrivate", Binary, 5),
    ElementDescriptor::new(0x4598, "ChapterFlagEnabled", UnsignedInt, 4),
    ElementDescriptor::new(0x45A3, "TagName", Utf8, 4),
    ElementDescriptor::new(0x45B9, "EditionEntry", Master, 2).multiple(),
    ElementDescriptor::new(0x45BC, "EditionUID", UnsignedInt, 3),
    ElementDescriptor::new(0x45BD, "EditionFlagHidden", UnsignedInt, 3),
    ElementDescriptor::new(0x45DB, "EditionFlagDefault", UnsignedInt, 3),
    ElementDescriptor::new(0x45DD, "EditionFlagOrdered", UnsignedInt, 3),
    ElementDescriptor::new(0x465C, "FileData", Binary, 3).payload(),
    ElementDescriptor::new(0x4660, "FileMimeType", String, 3),
    ElementDescriptor::new(0x4661, "FileUsedStartTime", UnsignedInt, 3),
    ElementDescriptor::new(0x4662, "FileUsedEndTime", UnsignedInt, 3),
    ElementDescriptor::new(0x466E, "FileName", Utf8, 3),
    ElementDescriptor::new(0x4675, "FileReferral", Binary, 3),
    ElementDescriptor::new(0x467E, "FileDescription", Utf8, 3),
    ElementDescriptor::new(0x46AE, "FileUID", UnsignedInt, 3),
    ElementDescriptor::new(0x47E1, "ContentEncAlgo", UnsignedInt, 6),
    ElementDescriptor::new(0x47E2, "ContentEncKeyID", Binary, 6),
    ElementDescriptor::new(0x47E3, "ContentSignature", Binary, 6),
    ElementDescriptor::new(0x47E4, "ContentSigKeyID", Binary, 6),
    ElementDescriptor::new(0x47E5, "ContentSigAlgo", UnsignedInt, 6),
    ElementDescriptor::new(0x47E6, "ContentSigHashAlgo", UnsignedInt, 6),
    ElementDescriptor::new(0x47E7, "ContentEncAESSettings", Master, 6),
    ElementDescriptor::new(0x47E8, "AESSettingsCipherMode", UnsignedInt, 7),
    ElementDescriptor::new(0x4D80, "MuxingApp", Utf8, 2),
    ElementDescriptor::new(0x4DBB, "Seek", Master, 2).multiple(),
    ElementDescriptor::new(0x5031, "ContentEncodingOrder", UnsignedInt, 5),
    ElementDescriptor::new(0x5032, "ContentEncodingScope", UnsignedInt, 5),
    ElementDescriptor::new(0x5033, "ContentEncodingType", UnsignedInt, 5),
    ElementDescriptor::new(0x5034, "ContentCompression", Master, 5),
    ElementDescriptor::new(0x5035, "ContentEncryption", Master, 5),
    ElementDescriptor::new(0x535F, "CueRefNumber", UnsignedInt, 5),
    ElementDescriptor::new(0x536E, "Name", Utf8, 3),
    ElementDescriptor::new(0x5378, "CueBlockNumber", UnsignedInt, 4),
    ElementDescriptor::new(0x537F, "TrackOffset", Integer, 3),
    ElementDescriptor::new(0x53AB, "SeekID", Binary, 3),
    ElementDescriptor::new(0x53AC, "SeekPosition", UnsignedInt, 3).cross_reference(),
    ElementDescriptor::new(0x53B8, "StereoMode", UnsignedInt, 4),
    ElementDescriptor::new(0x53B9, "OldStereoMode", UnsignedInt, 4),
    ElementDescriptor::new(0x53C0, "AlphaMode", UnsignedInt, 4),
    ElementDescriptor::new(0x54AA, "PixelCropBottom", UnsignedInt, 4),
    ElementDescriptor::new(0x54B0, "DisplayWidth", UnsignedInt, 4),
    ElementDescriptor::new(0x54B2, "DisplayUnit", UnsignedInt, 4),
    ElementDescriptor::new(0x54B3, "AspectRatioType", UnsignedInt, 4),
    ElementDescriptor::new(0x54BA, "DisplayHeight", UnsignedInt, 4),
    ElementDescriptor::new(0x54BB, "PixelCropTop", UnsignedInt, 4),
    ElementDescriptor::new(0x54CC, "PixelCropLeft", UnsignedInt, 4),
    ElementDescriptor::new(0x54DD, "PixelCropRight", UnsignedInt, 4),
    ElementDescriptor::new(0x55AA, "FlagForced", UnsignedInt, 3),
    ElementDescriptor::new(0x55AB, "FlagHearingImpaired", UnsignedInt, 3),
    ElementDescriptor::new(0x55AC, "FlagVisualImpaired", UnsignedInt, 3),
    ElementDescriptor::new(0x55AD, "FlagTextDescriptions", UnsignedInt, 3),
    ElementDescriptor::new(0x55AE, "FlagOriginal", UnsignedInt, 3),
    ElementDescriptor::new(0x55AF, "FlagCommentary", UnsignedInt, 3),
    ElementDescriptor::new(0x55B0, "Colour", Master, 4),
    ElementDescriptor::new(0x55B1, "MatrixCoefficients", UnsignedInt, 5),
    ElementDescriptor::new(0x55B2, "BitsPerChannel", UnsignedInt, 5),
    ElementDescriptor::new(0x55B3, "ChromaSubsamplingHorz", UnsignedInt, 5),
    ElementDescriptor::new(0x55B4, "ChromaSubsamplingVert", UnsignedInt, 5),
    ElementDescriptor::new(0x55B5, "CbSubsamplingHorz", UnsignedInt, 5),
    ElementDescriptor::new(0x55B6, "CbSubsamplingVert", UnsignedInt, 5),
    ElementDescriptor::new(0x55B7, "ChromaSitingHorz", UnsignedInt, 5),
    ElementDescriptor::new(0x55B8, "ChromaSitingVert", UnsignedInt, 5),
    ElementDescriptor::new(0x55B9, "Range", UnsignedInt, 5),
    ElementDescriptor::new(0x55BA, "TransferCharacteristics", UnsignedInt, 5),
    ElementDescriptor::new(0x55BB, "Primaries", UnsignedInt, 5),
    ElementDescriptor::new(0x55BC, "MaxCLL", UnsignedInt, 5),
    ElementDescriptor::new(0x55BD, "MaxFALL", UnsignedInt, 5),
    ElementDescriptor::new(0x55D0, "MasteringMetadata", Master, 5),
    ElementDescriptor::new(0x55D1, "PrimaryRChromaticityX", Float, 6),
    ElementDescriptor::new(0x55D2, "PrimaryRChromaticityY", Float, 6),
    ElementDescriptor::new(0x55D3, "PrimaryGChromaticityX", Float, 6),
    ElementDescriptor::new(0x55D4, "PrimaryGChromaticityY", Float, 6),
    ElementDescriptor::new(0x55D5, "PrimaryBChromaticityX", Float, 6),
    ElementDescriptor::new(0x55D6, "PrimaryBChromaticityY", Float, 6),
    ElementDescriptor::new(0x55D7, "WhitePointChromaticityX", Float, 6),
    ElementDescriptor::new(0x55D8, "WhitePointChromaticityY", Float, 6),
    ElementDescriptor::new(0x55D9, "LuminanceMax", Float, 6),
    ElementDescriptor::new(0x55DA, "LuminanceMin", Float, 6),
    ElementDescriptor::new(0x55EE, "MaxBlockAdditionID", UnsignedInt, 3),
    ElementDescriptor::new(0x5654, "ChapterStringUID", Utf8, 4),
    ElementDescriptor::new(0x56AA, "CodecDelay", UnsignedInt, 3),
    ElementDescriptor::new(0x56BB, "SeekPreRoll", UnsignedInt, 3),
    ElementDescriptor::new(0x5741, "WritingApp", Utf8, 2),
    ElementDescriptor::new(0x5854, "SilentTracks", Master, 2),
    ElementDescriptor::new(0x58D7, "SilentTrackNumber", UnsignedInt, 3).multiple(),
    ElementDescriptor::new(0x61A7, "AttachedFile", Master, 2).multiple(),
    ElementDescriptor::new(0x6240, "ContentEncoding", Master, 4).multiple(),
    ElementDescriptor::new(0x6264, "BitDepth", UnsignedInt, 4),
    ElementDescriptor::new(0x63A2, "CodecPrivate", Binary, 3),
    ElementDescriptor::new(0x63C0, "Targets", Master, 3),
    ElementDescriptor::new(0x63C3, "ChapterPhysicalEquiv", UnsignedInt, 4),
    ElementDescriptor::new(0x63C4, "TagChapterUID", UnsignedInt, 4).multiple(),
    ElementDescriptor::new(0x63C5, "TagTrackUID", UnsignedInt, 4).multiple(),
    ElementDescriptor::new(0x63C6, "TagAttachmentUID", UnsignedInt, 4).multiple(),
    ElementDescriptor::new(0x63C9, "TagEditionUID", UnsignedInt, 4).multiple(),
    ElementDescriptor::new(0x63CA, "TargetType", String, 4),
    ElementDescriptor::new(0x6532, "SignedElement", Binary, 2).multiple(),
    ElementDescriptor::new(0x6624, "TrackTranslate", Master, 3).multiple(),
    ElementDescriptor::new(0x66A5, "TrackTranslateTrackID", Binary, 4),
    ElementDescriptor::new(0x66BF, "TrackTranslateCodec", UnsignedInt, 4),
    ElementDescriptor::new(0x66FC, "TrackTranslateEditionUID", UnsignedInt, 4).multiple(),
    ElementDescriptor::new(0x67C8, "SimpleTag", Master, 3).multiple(),
    ElementDescriptor::new(0x68CA, "TargetTypeValue", UnsignedInt, 4),
    ElementDescriptor::new(0x6911, "ChapProcessCommand", Master, 5).multiple(),
    ElementDescriptor::new(0x6922, "ChapProcessTime", UnsignedInt, 6),
    ElementDescriptor::new(0x6924, "ChapterTranslate", Master, 2).multiple(),
    ElementDescriptor::new(0x6933, "ChapProcessData", Binary, 6),
    ElementDescriptor::new(0x6944, "ChapProcess", Master, 4).multiple(),
    ElementDescriptor::new(0x6955, "ChapProcessCodecID", UnsignedInt, 5),
    ElementDescriptor::new(0x69A5, "ChapterTranslateID", Binary, 3),
    ElementDescriptor::new(0x69BF, "ChapterTranslateCodec", UnsignedInt, 3),
    ElementDescriptor::new(0x69FC, "ChapterTranslateEditionUID", UnsignedInt, 3).multiple(),
    ElementDescriptor::new(0x6D80, "ContentEncodings", Master, 3),
    ElementDescriptor::new(0x6DE7, "MinCache", UnsignedInt, 3),
    ElementDescriptor::new(0x6DF8, "MaxCache", UnsignedInt, 3),
    ElementDescriptor::new(0x6E67, "ChapterSegmentUID", Binary, 4),
    ElementDescriptor::new(0x6EBC, "ChapterSegmentEditionUID", UnsignedInt, 4),
    ElementDescriptor::new(0x6FAB, "TrackOverlay", UnsignedInt, 3).multiple(),
    ElementDescriptor::new(0x7373, "Tag", Master, 2).multiple(),
    ElementDescriptor::new(0x7384, "SegmentFilename", Utf8, 2),
    ElementDescriptor::new(0x73A4, "SegmentUID", Binary, 2),
    ElementDescriptor::new(0x73C4, "ChapterUID", UnsignedInt, 4),
    ElementDescriptor::new(0x73C5, "TrackUID", UnsignedInt, 3),
    ElementDescriptor::new(0x7446, "AttachmentLink", UnsignedInt, 3),
    ElementDescriptor::new(0x75A1, "BlockAdditions", Master, 3),
    ElementDescriptor::new(0x75A2, "DiscardPadding", Integer, 3),
    ElementDescriptor::new(0x7670, "Projection", Master, 4),
    ElementDescriptor::new(0x7671, "ProjectionType", UnsignedInt, 5),
    ElementDescriptor::new(0x7672, "ProjectionPrivate", Binary, 5),
    ElementDescriptor::new(0x7673, "ProjectionPoseYaw", Float, 5),
    ElementDescriptor::new(0x7674, "ProjectionPosePitch", Float, 5),
    ElementDescriptor::new(0x7675, "ProjectionPoseRoll", Float, 5),
    ElementDescriptor::new(0x78B5, "OutputSamplingFrequency", Float, 4),
    ElementDescriptor::new(0x7BA9, "Title", Utf8, 2),
    ElementDescriptor::new(0x7D7B, "ChannelPositions", Binary, 4),
    ElementDescriptor::new(0x7E5B, "SignatureElements", Master, 1),
    ElementDescriptor::new(0x7E7B, "SignatureElementList", Master, 2).multiple(),
    ElementDescriptor::new(0x7E8A, "SignatureAlgo", UnsignedInt, 2),
    ElementDescriptor::new(0x7E9A, "SignatureHash", UnsignedInt, 2),
    ElementDescriptor::new(0x7EA5, "SignaturePublicKey", Binary, 2),
    ElementDescriptor::new(0x7EB5, "Signature", Binary, 2),
    ElementDescriptor::new(0x22B59C, "Language", String, 3),
    ElementDescriptor::new(0x22B59D, "LanguageIETF", String, 3),
    ElementDescriptor::new(0x23314F, "TrackTimestampScale", Float, 3),
    ElementDescriptor::new(0x234E7A, "DefaultDecodedFieldDuration", UnsignedInt, 3),
    ElementDescriptor::new(0x2383E3, "FrameRate", Float, 4),
    ElementDescriptor::new(0x23E383, "DefaultDuration", UnsignedInt, 3),
    ElementDescriptor::new(0x258688, "CodecName", Utf8, 3),
    ElementDescriptor::new(0x26B240, "CodecDownloadURL", String, 3).multiple(),
    ElementDescriptor::new(0x2AD7B1, "TimestampScale", UnsignedInt, 2),
    ElementDescriptor::new(0x2AD7B2, "TimecodeScaleDenominator", UnsignedInt, 2),
    ElementDescriptor::new(0x2EB524, "UncompressedFourCC", Binary, 4),
    ElementDescriptor::new(0x2FB523, "GammaValue", Float, 4),
    ElementDescriptor::new(0x3A9697, "CodecSettings", Utf8, 3),
    ElementDescriptor::new(0x3B4040, "CodecInfoURL", String, 3).multiple(),
    ElementDescriptor::new(0x3C83AB, "PrevFilename", Utf8, 2),
    ElementDescriptor::new(0x3CB923, "PrevUID", Binary, 2),
    ElementDescriptor::new(0x3E83BB, "NextFilename", Utf8, 2),
    ElementDescriptor::new(0x3EB923, "NextUID", Binary, 2),
    ElementDescriptor::new(0x1043A770, "Chapters", Master, 1),
    ElementDescriptor::new(0x114D9B74, "SeekHead", Master, 1).multiple(),
    ElementDescriptor::new(0x1254C367, "Tags", Master, 1).multiple(),
    ElementDescriptor::new(0x1549A966, "Info", Master, 1),
    ElementDescriptor::new(0x1654AE6B, "Tracks", Master, 1),
    ElementDescriptor::new(0x18538067, "Segment", Master, 0),
    ElementDescriptor::new(0x1941A469, "Attachments", Master, 1),
    ElementDescriptor::new(0x1A45DFA3, "EBML", Master, 0),
    ElementDescriptor::new(0x1B538667, "SignatureSlot", Master, 1).multiple(),
    ElementDescriptor::new(0x1C53BB6B, "Cues", Master, 1),
    ElementDescriptor::new(0x1F43B675, "Cluster", Master, 1).multiple(),
];

///
/// Gets the shared Matroska schema table.
///
pub fn matroska() -> Arc<SchemaTable> {
    static SCHEMA: OnceLock<Arc<SchemaTable>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| Arc::new(SchemaTable::new(ELEMENTS).with_index_id(ids::SEEK_HEAD)))
        .clone()
}
