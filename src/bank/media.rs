use binrw::binrw;
use indexmap::IndexMap;

use crate::cursor::{align_up, ByteCursor};
use crate::error::{Error, Result};

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct MediaEntry {
    pub id: u32,
    pub offset: u32,
    pub size: u32,
}

impl MediaEntry {
    pub const SIZE: usize = 12;
}

/// DIDX/DATA pair: embedded media payloads keyed by source id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaIndex {
    pub entries: IndexMap<u32, Vec<u8>>,
}

impl MediaIndex {
    pub fn load(didx: &[u8], data: &[u8]) -> Result<Self> {
        use binrw::BinReaderExt;
        if didx.len() % MediaEntry::SIZE != 0 {
            return Err(Error::malformed(
                "DIDX",
                format!("length {} is not a multiple of {}", didx.len(), MediaEntry::SIZE),
            ));
        }
        let mut cursor = ByteCursor::from_slice(didx);
        let mut entries = IndexMap::with_capacity(didx.len() / MediaEntry::SIZE);
        while !cursor.is_exhausted() {
            let entry: MediaEntry = cursor.read_le()?;
            let start = entry.offset as usize;
            let end = start + entry.size as usize;
            if end > data.len() {
                return Err(Error::malformed(
                    "DIDX",
                    format!(
                        "media {} spans {start:#x}..{end:#x} past DATA length {:#x}",
                        entry.id,
                        data.len()
                    ),
                ));
            }
            entries.insert(entry.id, data[start..end].to_vec());
        }
        Ok(Self { entries })
    }

    pub fn get(&self, id: u32) -> Option<&[u8]> {
        self.entries.get(&id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Lays the payloads out in order and returns `(didx, data)`. Offsets are
    /// 16-byte aligned; the last payload is not padded.
    pub fn build<'a, I>(media: I) -> Result<(Vec<u8>, Vec<u8>)>
    where
        I: IntoIterator<Item = (u32, &'a [u8])>,
    {
        use binrw::BinWriterExt;
        let mut didx = ByteCursor::new();
        let mut data = ByteCursor::new();
        for (id, payload) in media {
            let offset = align_up(data.position(), 16);
            data.pad_to(16)?;
            didx.write_le(&MediaEntry {
                id,
                offset: offset as u32,
                size: payload.len() as u32,
            })?;
            data.write_bytes(payload)?;
        }
        Ok((didx.into_inner(), data.into_inner()))
    }
}
