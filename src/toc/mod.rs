pub mod header;
pub mod index;
pub mod payload;
pub mod text;

use std::fs;
use std::path::{Path, PathBuf};

use binrw::{BinReaderExt, BinWriterExt};
use log::{debug, info, warn};

use crate::bank::Bank;
use crate::cursor::{align_up, ByteCursor};
use crate::error::{Error, Result};
use crate::store::AssetStore;

use header::{TocHeader, TypeGroupHeader};
use index::{AssetKind, TocRecord};
use payload::{Dependency, StreamRecord, VideoSource};
use text::TextBank;

/// Extension of the side file holding stream payloads.
pub const STREAM_EXTENSION: &str = "stream";

fn slice<'a>(data: &'a [u8], offset: u64, size: u64) -> Result<&'a [u8]> {
    let end = offset.checked_add(size).unwrap_or(u64::MAX);
    if end > data.len() as u64 {
        return Err(Error::UnexpectedEof {
            offset,
            need: size,
            have: (data.len() as u64).saturating_sub(offset),
        });
    }
    Ok(&data[offset as usize..end as usize])
}

/// Decodes a TOC file and its stream file into an arena, then links
/// dependency paths and resolves audio.
pub fn decode(toc: &[u8], stream: &[u8]) -> Result<AssetStore> {
    let mut cursor = ByteCursor::from_slice(toc);
    cursor.ensure(TocHeader::SIZE)?;
    let header = TocHeader::read(&mut cursor)?;
    if !header.is_valid() {
        return Err(Error::InvalidMagic {
            expected: TocHeader::MAGIC,
            found: header.magic,
        });
    }

    cursor.ensure(u64::from(header.num_types) * TypeGroupHeader::SIZE)?;
    let mut grouped = 0u64;
    for _ in 0..header.num_types {
        let group: TypeGroupHeader = cursor.read_le()?;
        debug!("Type group {:#018x}: {} records", group.type_id, group.count);
        grouped += group.count;
    }
    if grouped != u64::from(header.num_files) {
        warn!(
            "Type groups announce {grouped} records, header says {}",
            header.num_files
        );
    }

    cursor.ensure(u64::from(header.num_files) * TocRecord::SIZE)?;
    let mut records = Vec::with_capacity(header.num_files as usize);
    for _ in 0..header.num_files {
        let record: TocRecord = cursor.read_le()?;
        records.push(record);
    }

    let mut store = AssetStore {
        header_unknown: header.unknown,
        header_reserved: header.reserved,
        ..AssetStore::default()
    };

    for record in records {
        let kind = record
            .kind()
            .ok_or(Error::UnknownType(record.type_id))?;
        let data = slice(toc, record.toc_data_offset, u64::from(record.toc_data_size))?;
        let file_id = record.file_id;
        match kind {
            AssetKind::Stream => {
                let payload = slice(
                    stream,
                    record.stream_file_offset,
                    u64::from(record.stream_size),
                )?;
                let entry = StreamRecord::new(record, data.to_vec(), payload.to_vec());
                store.streams.insert(file_id, entry);
            }
            AssetKind::Bank => {
                let (bank, entries) = Bank::from_bytes(record, data)?;
                for entry in entries {
                    store.insert_entry(entry);
                }
                store.banks.insert(file_id, bank);
            }
            AssetKind::Dependency => {
                store
                    .dependencies
                    .insert(file_id, Dependency::from_bytes(record, data)?);
            }
            AssetKind::TextBank => {
                store
                    .text_banks
                    .insert(file_id, TextBank::from_bytes(record, data)?);
            }
            AssetKind::Video => {
                let payload = slice(
                    stream,
                    record.stream_file_offset,
                    u64::from(record.stream_size),
                )?;
                let video = VideoSource {
                    record,
                    header: data.to_vec(),
                    data: payload.to_vec(),
                    replacement: None,
                };
                store.videos.insert(file_id, video);
            }
        }
    }

    store.attach_dependencies();
    store.resolve_audio();
    Ok(store)
}

struct Emit {
    record: TocRecord,
    toc: Vec<u8>,
    stream: Option<Vec<u8>>,
}

/// Serializes an arena into `(toc, stream)` bytes. Output depends only on the
/// arena contents and their insertion order.
pub fn encode(store: &AssetStore) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut groups: Vec<(AssetKind, Vec<Emit>)> = Vec::new();
    for kind in AssetKind::WRITE_ORDER {
        let mut emits = Vec::new();
        match kind {
            AssetKind::Stream => {
                for stream in store.streams.values() {
                    emits.push(Emit {
                        record: stream.record.clone(),
                        toc: stream.header.clone(),
                        stream: Some(store.stream_payload(stream).to_vec()),
                    });
                }
            }
            AssetKind::Bank => {
                for bank in store.banks.values() {
                    emits.push(Emit {
                        record: bank.record.clone(),
                        toc: bank.to_bytes(store)?,
                        stream: None,
                    });
                }
            }
            AssetKind::Dependency => {
                for dependency in store.dependencies.values() {
                    emits.push(Emit {
                        record: dependency.record.clone(),
                        toc: dependency.to_bytes()?,
                        stream: None,
                    });
                }
            }
            AssetKind::TextBank => {
                for bank in store.text_banks.values() {
                    emits.push(Emit {
                        record: bank.record.clone(),
                        toc: bank.to_bytes()?,
                        stream: None,
                    });
                }
            }
            AssetKind::Video => {
                for video in store.videos.values() {
                    emits.push(Emit {
                        record: video.record.clone(),
                        toc: video.header.clone(),
                        stream: Some(video.payload().to_vec()),
                    });
                }
            }
        }
        if !emits.is_empty() {
            groups.push((kind, emits));
        }
    }

    let num_files: usize = groups.iter().map(|(_, emits)| emits.len()).sum();
    let header = TocHeader {
        magic: TocHeader::MAGIC,
        num_types: groups.len() as u32,
        num_files: num_files as u32,
        unknown: store.header_unknown,
        reserved: store.header_reserved,
    };

    let table_end = TocHeader::SIZE
        + groups.len() as u64 * TypeGroupHeader::SIZE
        + num_files as u64 * TocRecord::SIZE;
    let mut data = ByteCursor::new();
    data.write_bytes(&vec![0u8; align_up(table_end, 16) as usize])?;
    let mut stream = ByteCursor::new();
    let mut records = Vec::with_capacity(num_files);

    for (_, emits) in &groups {
        for (index, emit) in emits.iter().enumerate() {
            let mut record = emit.record.clone();
            record.entry_index = index as u32;
            record.toc_data_offset = data.position();
            record.toc_data_size = emit.toc.len() as u32;
            data.write_bytes(&emit.toc)?;
            data.pad_to(16)?;
            match &emit.stream {
                Some(payload) => {
                    record.stream_file_offset = stream.position();
                    record.stream_size = payload.len() as u32;
                    stream.write_bytes(payload)?;
                    stream.pad_to(16)?;
                }
                None => {
                    record.stream_file_offset = 0;
                    record.stream_size = 0;
                }
            }
            records.push(record);
        }
    }

    data.set_position(0);
    header.write(&mut data)?;
    for (kind, emits) in &groups {
        data.write_le(&TypeGroupHeader::new(kind.type_id(), emits.len() as u64))?;
    }
    for record in &records {
        data.write_le(record)?;
    }

    Ok((data.into_inner(), stream.into_inner()))
}

/// One decoded TOC file.
#[derive(Debug, Clone)]
pub struct Archive {
    pub name: String,
    pub path: Option<PathBuf>,
    pub store: AssetStore,
}

impl Archive {
    pub fn new(name: impl Into<String>, store: AssetStore) -> Self {
        Self {
            name: name.into(),
            path: None,
            store,
        }
    }

    pub fn from_bytes(name: impl Into<String>, toc: &[u8], stream: &[u8]) -> Result<Self> {
        Ok(Self::new(name, decode(toc, stream)?))
    }

    /// Reads `<path>` and, when present, `<path>.stream`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let toc = fs::read(path)?;
        let stream_path = stream_path(path);
        let stream = if stream_path.is_file() {
            fs::read(&stream_path)?
        } else {
            Vec::new()
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut archive = Self::from_bytes(name, &toc, &stream)?;
        archive.path = Some(path.to_path_buf());
        info!(
            "Loaded {} ({} records, {} entries, {} audio sources)",
            archive.name,
            archive.store.record_count(),
            archive.store.hierarchy.len(),
            archive.store.audio.len()
        );
        Ok(archive)
    }

    pub fn to_bytes(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        encode(&self.store)
    }

    /// Writes `<folder>/<name>` and `<folder>/<name>.stream` (only when the
    /// stream payload is non-empty). Returns the TOC path.
    pub fn write_to_folder<P: AsRef<Path>>(&self, folder: P) -> Result<PathBuf> {
        write_store(&self.store, &self.name, folder.as_ref())
    }
}

pub(crate) fn write_store(store: &AssetStore, name: &str, folder: &Path) -> Result<PathBuf> {
    let (toc, stream) = encode(store)?;
    fs::create_dir_all(folder)?;
    let path = folder.join(name);
    fs::write(&path, &toc)?;
    if !stream.is_empty() {
        fs::write(stream_path(&path), &stream)?;
    }
    info!(
        "Wrote {} ({} bytes, stream {} bytes)",
        path.display(),
        toc.len(),
        stream.len()
    );
    Ok(path)
}

pub fn stream_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(STREAM_EXTENSION);
    PathBuf::from(name)
}
