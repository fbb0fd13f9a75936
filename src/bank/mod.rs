pub mod chunk;
pub mod media;

use indexmap::IndexSet;
use log::{debug, warn};

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::hirc::params::check_count;
use crate::hirc::source::StreamKind;
use crate::hirc::HircEntry;
use crate::store::AssetStore;
use crate::toc::index::TocRecord;

use chunk::{parse_chunks, tag_name, take_chunk, write_chunk, Tag, BKHD, DATA, DIDX, HIRC};
use media::MediaIndex;

/// Soundbank schema revision, read from the first BKHD field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BankVersion {
    V141,
    V154,
    Other(u32),
}

impl BankVersion {
    pub fn from_raw(value: u32) -> Self {
        match value {
            141 => BankVersion::V141,
            154 => BankVersion::V154,
            other => BankVersion::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            BankVersion::V141 => 141,
            BankVersion::V154 => 154,
            BankVersion::Other(v) => v,
        }
    }

    /// Whether hierarchy entries of this revision decode into typed bodies.
    pub fn is_modelled(self) -> bool {
        !matches!(self, BankVersion::Other(_))
    }

    pub fn has_override_attachment(self) -> bool {
        self == BankVersion::V154
    }
}

/// A `wwise_bank` record.
///
/// The TOC payload is a 16-byte wrapper (bytes 4..8 hold the length of what
/// follows) and then the chunk stream. Only BKHD, DIDX, DATA and HIRC are
/// interpreted; other chunks pass through in their original order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bank {
    pub record: TocRecord,
    pub wrapper: [u8; 16],
    pub bkhd: Vec<u8>,
    pub version: BankVersion,
    pub bank_id: u32,
    pub dependency_path: Option<String>,
    /// Hierarchy ids in HIRC order. A record listed twice keeps both
    /// positions; the arena holds the first copy.
    pub hierarchy: Vec<u32>,
    /// Media as decoded from DIDX/DATA.
    pub media: MediaIndex,
    /// Chunks passed through untouched, repeats included.
    pub misc: Vec<(Tag, Vec<u8>)>,
    pub has_hirc: bool,
    pub original: Vec<u8>,
    pub dirty: u32,
}

impl Bank {
    pub const WRAPPER_SIZE: usize = 16;

    /// Decodes a bank payload. The hierarchy entries come back separately so
    /// the caller can merge them into its arena.
    pub fn from_bytes(record: TocRecord, payload: &[u8]) -> Result<(Self, Vec<HircEntry>)> {
        if payload.len() < Self::WRAPPER_SIZE {
            return Err(Error::UnexpectedEof {
                offset: 0,
                need: Self::WRAPPER_SIZE as u64,
                have: payload.len() as u64,
            });
        }
        let mut wrapper = [0u8; 16];
        wrapper.copy_from_slice(&payload[..Self::WRAPPER_SIZE]);

        let mut chunks = parse_chunks(&payload[Self::WRAPPER_SIZE..])?;
        let bkhd = take_chunk(&mut chunks, &BKHD).unwrap_or_default();
        let (version, bank_id) = if bkhd.len() >= 8 {
            let mut cur = ByteCursor::from_slice(&bkhd);
            (BankVersion::from_raw(cur.read_u32()?), cur.read_u32()?)
        } else {
            (BankVersion::Other(0), 0)
        };

        let media = match (take_chunk(&mut chunks, &DIDX), take_chunk(&mut chunks, &DATA)) {
            (Some(didx), Some(data)) => MediaIndex::load(&didx, &data)?,
            (Some(didx), None) if !didx.is_empty() => {
                return Err(Error::malformed("soundbank", "DIDX without DATA"));
            }
            _ => MediaIndex::default(),
        };

        let file_id = record.file_id;
        let mut entries = Vec::new();
        let mut hierarchy = Vec::new();
        let hirc = take_chunk(&mut chunks, &HIRC);
        if let Some(hirc) = &hirc {
            let mut cur = ByteCursor::from_slice(hirc);
            let count = cur.read_u32()?;
            check_count(&cur, count, 5, "HIRC")?;
            let mut seen = IndexSet::new();
            for _ in 0..count {
                let mut entry = HircEntry::read(&mut cur, version)?;
                hierarchy.push(entry.id);
                if !seen.insert(entry.id) {
                    debug!(
                        "Bank {file_id:#018x} lists entry {:#010x} again; the first copy is written at both positions",
                        entry.id
                    );
                    continue;
                }
                entry.soundbanks.insert(file_id);
                entries.push(entry);
            }
        }

        if !version.is_modelled() {
            warn!(
                "Bank {file_id:#018x} has unsupported revision {}; hierarchy kept raw",
                version.raw()
            );
        }
        for (tag, _) in &chunks {
            debug!("Bank {file_id:#018x}: passthrough chunk {}", tag_name(tag));
        }

        let bank = Self {
            record,
            wrapper,
            bkhd,
            version,
            bank_id,
            dependency_path: None,
            hierarchy,
            media,
            misc: chunks,
            has_hirc: hirc.is_some(),
            original: payload.to_vec(),
            dirty: 0,
        };
        Ok((bank, entries))
    }

    pub fn file_id(&self) -> u64 {
        self.record.file_id
    }

    pub fn is_modified(&self) -> bool {
        self.dirty > 0
    }

    /// TOC payload: the original bytes while untouched, regenerated otherwise.
    pub fn to_bytes(&self, store: &AssetStore) -> Result<Vec<u8>> {
        if self.dirty == 0 && !self.original.is_empty() {
            return Ok(self.original.clone());
        }
        self.generate(store)
    }

    /// Media this bank has to embed, in first-seen order: every codec source
    /// of a live Sound or MusicTrack that is embedded or prefetched.
    pub fn collect_media(&self, store: &AssetStore) -> Vec<(u32, Vec<u8>)> {
        let mut seen = IndexSet::new();
        let mut media = Vec::new();
        for id in &self.hierarchy {
            let Some(entry) = store.hierarchy.get(id) else {
                continue;
            };
            for source in entry.body.sources() {
                let Some(kind) = source.media_kind() else {
                    continue;
                };
                if !kind.in_bank() || !seen.insert(source.source_id) {
                    continue;
                }
                let bytes = store
                    .audio
                    .get(&source.source_id)
                    .map(|a| a.data.as_slice())
                    .or_else(|| self.media.get(source.source_id));
                match bytes {
                    Some(bytes) => {
                        let bytes = if kind == StreamKind::Prefetch {
                            &bytes[..bytes.len().min(source.mem_size as usize)]
                        } else {
                            bytes
                        };
                        media.push((source.source_id, bytes.to_vec()));
                    }
                    None => warn!(
                        "Bank {:#018x}: no payload for source {}; dropped",
                        self.file_id(),
                        source.source_id
                    ),
                }
            }
        }
        media
    }

    /// Rebuilds the payload from the arena: BKHD verbatim, DIDX/DATA, HIRC,
    /// then passthrough chunks.
    pub fn generate(&self, store: &AssetStore) -> Result<Vec<u8>> {
        let mut body = ByteCursor::new();
        write_chunk(&mut body, &BKHD, &self.bkhd)?;

        let media = self.collect_media(store);
        if !media.is_empty() {
            let (didx, data) =
                MediaIndex::build(media.iter().map(|(id, bytes)| (*id, bytes.as_slice())))?;
            write_chunk(&mut body, &DIDX, &didx)?;
            write_chunk(&mut body, &DATA, &data)?;
        }

        if self.has_hirc || !self.hierarchy.is_empty() {
            let mut hirc = ByteCursor::new();
            hirc.write_u32(0)?;
            let mut count = 0u32;
            for id in &self.hierarchy {
                match store.hierarchy.get(id) {
                    Some(entry) => {
                        hirc.write_bytes(&entry.to_bytes()?)?;
                        count += 1;
                    }
                    None => warn!(
                        "Bank {:#018x}: hierarchy entry {id:#010x} not loaded; dropped",
                        self.file_id()
                    ),
                }
            }
            hirc.patch_u32(0, count)?;
            write_chunk(&mut body, &HIRC, hirc.as_slice())?;
        }

        for (tag, data) in &self.misc {
            write_chunk(&mut body, tag, data)?;
        }

        let body = body.into_inner();
        let mut out = self.wrapper.to_vec();
        out[4..8].copy_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }
}
