use indexmap::IndexSet;

use crate::hirc::source::StreamKind;

/// Something that has to be told when an audio source changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    /// A Sound or MusicTrack referencing the source.
    Entry(u32),
    /// A bank that embeds (part of) the payload.
    Bank(u64),
    /// A stream record holding the payload.
    Stream(u64),
}

/// One media payload, shared by every node that plays it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub short_id: u32,
    /// Stream file id, 0 for embedded media.
    pub resource_id: u64,
    pub kind: StreamKind,
    pub data: Vec<u8>,
    /// Payload before the first edit.
    pub previous: Option<Vec<u8>>,
    pub parents: IndexSet<Owner>,
}

impl AudioSource {
    pub fn new(short_id: u32, kind: StreamKind, resource_id: u64, data: Vec<u8>) -> Self {
        Self {
            short_id,
            resource_id,
            kind,
            data,
            previous: None,
            parents: IndexSet::new(),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.previous.is_some()
    }

    /// The bytes edits are compared against: the snapshot if edited, else
    /// the live payload.
    pub fn baseline(&self) -> &[u8] {
        self.previous.as_deref().unwrap_or(&self.data)
    }

    pub fn owning_entries(&self) -> impl Iterator<Item = u32> + '_ {
        self.parents.iter().filter_map(|owner| match owner {
            Owner::Entry(id) => Some(*id),
            _ => None,
        })
    }

    pub fn duration_ms(&self) -> Option<f64> {
        wem_duration_ms(&self.data)
    }
}

/// Duration of a codec payload from its fixed header fields: sample rate
/// (`u32` at byte 24) and sample count (`u32` at byte 44).
pub fn wem_duration_ms(data: &[u8]) -> Option<f64> {
    let field = |at: usize| -> Option<u32> {
        let bytes = data.get(at..at + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    };
    let rate = field(24)?;
    let samples = field(44)?;
    if rate == 0 {
        return None;
    }
    Some(f64::from(samples) * 1000.0 / f64::from(rate))
}
