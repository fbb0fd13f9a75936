use binrw::binrw;

use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::toc::index::TocRecord;

/// A `wwise_stream` record: a small TOC-side header plus the payload stored in
/// the `.stream` side file.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    pub record: TocRecord,
    pub header: Vec<u8>,
    pub data: Vec<u8>,
    /// Short id of the audio source resolved onto this stream.
    pub source: Option<u32>,
    /// Payload before the first direct edit.
    pub previous: Option<Vec<u8>>,
    /// Flags raised by an edited audio source, or set on patch residue.
    pub dirty: u32,
}

impl StreamRecord {
    pub fn new(record: TocRecord, header: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            record,
            header,
            data,
            source: None,
            previous: None,
            dirty: 0,
        }
    }

    pub fn file_id(&self) -> u64 {
        self.record.file_id
    }

    pub fn is_modified(&self) -> bool {
        self.dirty > 0 || self.previous.is_some()
    }

    /// The payload as loaded, ignoring direct edits.
    pub fn baseline(&self) -> &[u8] {
        self.previous.as_deref().unwrap_or(&self.data)
    }
}

/// `wwise_dep`: the path of the bank stored under the same file id.
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct DependencyPayload {
    pub tag: u32,
    #[br(temp)]
    #[bw(calc = path.len() as u32)]
    len: u32,
    #[br(count = len)]
    pub path: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub record: TocRecord,
    pub payload: DependencyPayload,
}

impl Dependency {
    pub fn from_bytes(record: TocRecord, data: &[u8]) -> Result<Self> {
        use binrw::BinReaderExt;
        let mut cursor = ByteCursor::from_slice(data);
        let payload: DependencyPayload = cursor.read_le()?;
        Ok(Self { record, payload })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        use binrw::BinWriterExt;
        let mut cursor = ByteCursor::new();
        cursor.write_le(&self.payload)?;
        Ok(cursor.into_inner())
    }

    /// The path with trailing NULs stripped.
    pub fn path(&self) -> String {
        let end = self
            .payload
            .path
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.payload.path[..end]).into_owned()
    }
}

/// A `bik` record. The movie itself lives in the stream file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSource {
    pub record: TocRecord,
    pub header: Vec<u8>,
    pub data: Vec<u8>,
    pub replacement: Option<Vec<u8>>,
}

impl VideoSource {
    pub fn file_id(&self) -> u64 {
        self.record.file_id
    }

    /// Offset and size in the stream file this video was read from.
    pub fn stream_span(&self) -> (u64, u32) {
        (self.record.stream_file_offset, self.record.stream_size)
    }

    pub fn payload(&self) -> &[u8] {
        self.replacement.as_deref().unwrap_or(&self.data)
    }

    pub fn is_modified(&self) -> bool {
        self.replacement.is_some()
    }
}
