use indexmap::IndexMap;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::toc::index::TocRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    pub text: String,
    /// Value before the first edit.
    pub previous: Option<String>,
}

impl StringEntry {
    pub fn new(text: String) -> Self {
        Self { text, previous: None }
    }

    pub fn is_modified(&self) -> bool {
        self.previous.is_some()
    }

    /// Returns `true` if the visible text changed.
    pub fn set(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        match &self.previous {
            None => self.previous = Some(std::mem::replace(&mut self.text, text.to_string())),
            Some(prev) if prev == text => {
                self.text = text.to_string();
                self.previous = None;
            }
            Some(_) => self.text = text.to_string(),
        }
        true
    }

    pub fn revert(&mut self) -> bool {
        match self.previous.take() {
            Some(prev) => {
                self.text = prev;
                true
            }
            None => false,
        }
    }
}

/// Localized string table.
///
/// Layout: 8-byte signature, `count:u32`, `language:u32`, `count` ids,
/// `count` absolute offsets, then NUL-terminated UTF-8 strings.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBank {
    pub record: TocRecord,
    pub signature: [u8; 8],
    pub language: u32,
    pub strings: IndexMap<u32, StringEntry>,
    original: Vec<u8>,
    /// Raised when strings are added by a merge.
    pub dirty: u32,
}

impl TextBank {
    pub fn from_bytes(record: TocRecord, data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::from_slice(data);
        let mut signature = [0u8; 8];
        signature.copy_from_slice(&cursor.read_bytes(8)?);
        let count = cursor.read_u32()?;
        let language = cursor.read_u32()?;
        cursor.ensure(u64::from(count) * 8)?;

        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            ids.push(cursor.read_u32()?);
        }
        let mut offsets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            offsets.push(cursor.read_u32()?);
        }

        let mut strings = IndexMap::with_capacity(count as usize);
        for (id, offset) in ids.into_iter().zip(offsets) {
            let start = offset as usize;
            if start > data.len() {
                return Err(Error::UnexpectedEof {
                    offset: u64::from(offset),
                    need: 1,
                    have: 0,
                });
            }
            let end = data[start..]
                .iter()
                .position(|&b| b == 0)
                .map_or(data.len(), |n| start + n);
            let text = String::from_utf8_lossy(&data[start..end]).into_owned();
            strings.insert(id, StringEntry::new(text));
        }

        Ok(Self {
            record,
            signature,
            language,
            strings,
            original: data.to_vec(),
            dirty: 0,
        })
    }

    /// Unmodified banks are written back byte for byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if !self.is_modified() && !self.original.is_empty() {
            return Ok(self.original.clone());
        }
        let count = self.strings.len() as u32;
        let mut out = ByteCursor::new();
        out.write_bytes(&self.signature)?;
        out.write_u32(count)?;
        out.write_u32(self.language)?;
        for id in self.strings.keys() {
            out.write_u32(*id)?;
        }
        let mut offset = 16 + 8 * count;
        for entry in self.strings.values() {
            out.write_u32(offset)?;
            offset += entry.text.len() as u32 + 1;
        }
        for entry in self.strings.values() {
            out.write_bytes(entry.text.as_bytes())?;
            out.write_u8(0)?;
        }
        Ok(out.into_inner())
    }

    pub fn file_id(&self) -> u64 {
        self.record.file_id
    }

    pub fn is_modified(&self) -> bool {
        self.dirty > 0 || self.strings.values().any(StringEntry::is_modified)
    }

    /// Adds strings this bank lacks. Returns how many were added.
    pub fn merge_missing(&mut self, other: &TextBank) -> usize {
        let mut added = 0;
        for (id, entry) in &other.strings {
            if !self.strings.contains_key(id) {
                self.strings.insert(*id, StringEntry::new(entry.text.clone()));
                added += 1;
            }
        }
        if added > 0 {
            self.dirty += 1;
        }
        added
    }

    pub fn revert_all(&mut self) {
        for entry in self.strings.values_mut() {
            entry.revert();
        }
    }
}
