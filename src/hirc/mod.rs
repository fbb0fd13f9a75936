//! Hierarchy (HIRC) entries: the object model decoded from a soundbank's
//! HIRC chunk.
//!
//! A record is `type_tag:u8, size:u32, payload[size]` where the payload starts
//! with the entry id. Known tags decode into typed bodies; anything else, and
//! any typed body that fails to decode or would not re-encode to the same
//! bytes, is kept as [`HircBody::Raw`]. Every record therefore round-trips.

pub mod action;
pub mod container;
pub mod music;
pub mod params;
pub mod sound;
pub mod source;

use binrw::{binrw, BinReaderExt, BinWriterExt};
use indexmap::IndexSet;
use log::{debug, warn};

use crate::bank::BankVersion;
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

use action::{Action, Event};
use container::{ActorMixer, LayerContainer, RandomSequence, SwitchContainer};
use music::{MusicSegment, MusicSwitch, MusicTrack};
use params::{BaseParam, Children};
use sound::Sound;
use source::BankSource;

pub const SOUND: u8 = 2;
pub const ACTION: u8 = 3;
pub const EVENT: u8 = 4;
pub const RANDOM_SEQUENCE: u8 = 5;
pub const SWITCH: u8 = 6;
pub const ACTOR_MIXER: u8 = 7;
pub const LAYER: u8 = 9;
pub const MUSIC_SEGMENT: u8 = 10;
pub const MUSIC_TRACK: u8 = 11;
pub const MUSIC_SWITCH: u8 = 12;

/// A typed HIRC body. Reads consume the whole body; bytes past the modelled
/// fields go into the node's tail.
pub trait HircNode: Sized {
    const NAME: &'static str;

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self>;
    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()>;
}

pub(crate) fn read_tail(cur: &mut ByteCursor) -> Result<Vec<u8>> {
    cur.read_bytes(cur.remaining())
}

#[derive(Debug, Clone, PartialEq)]
pub enum HircBody {
    Sound(Sound),
    Action(Action),
    Event(Event),
    RandomSequence(RandomSequence),
    Switch(SwitchContainer),
    ActorMixer(ActorMixer),
    Layer(LayerContainer),
    MusicSegment(MusicSegment),
    MusicTrack(MusicTrack),
    MusicSwitch(MusicSwitch),
    Raw(Vec<u8>),
}

fn read_node<T: HircNode>(
    body: &[u8],
    version: BankVersion,
    wrap: fn(T) -> HircBody,
) -> Result<HircBody> {
    let mut cur = ByteCursor::from_slice(body);
    T::read(&mut cur, version).map(wrap)
}

impl HircBody {
    /// Decodes the bytes after the entry id. Never fails: unknown tags,
    /// unsupported bank revisions and malformed bodies become `Raw`.
    pub fn decode(type_tag: u8, id: u32, body: &[u8], version: BankVersion) -> Self {
        if !version.is_modelled() {
            return HircBody::Raw(body.to_vec());
        }
        let typed = match Self::decode_typed(type_tag, body, version) {
            Some(Ok(typed)) => typed,
            Some(Err(e)) => {
                warn!("Entry {id:#010x} (type {type_tag}) kept raw: {e}");
                return HircBody::Raw(body.to_vec());
            }
            None => return HircBody::Raw(body.to_vec()),
        };
        match typed.encode(version) {
            Ok(bytes) if bytes == body => typed,
            _ => {
                debug!("Entry {id:#010x} (type {type_tag}) does not re-encode identically; kept raw");
                HircBody::Raw(body.to_vec())
            }
        }
    }

    fn decode_typed(type_tag: u8, body: &[u8], version: BankVersion) -> Option<Result<Self>> {
        let decoded = match type_tag {
            SOUND => read_node(body, version, HircBody::Sound),
            ACTION => read_node(body, version, HircBody::Action),
            EVENT => read_node(body, version, HircBody::Event),
            RANDOM_SEQUENCE => read_node(body, version, HircBody::RandomSequence),
            SWITCH => read_node(body, version, HircBody::Switch),
            ACTOR_MIXER => read_node(body, version, HircBody::ActorMixer),
            LAYER => read_node(body, version, HircBody::Layer),
            MUSIC_SEGMENT => read_node(body, version, HircBody::MusicSegment),
            MUSIC_TRACK => read_node(body, version, HircBody::MusicTrack),
            MUSIC_SWITCH => read_node(body, version, HircBody::MusicSwitch),
            _ => return None,
        };
        Some(decoded)
    }

    pub fn encode(&self, version: BankVersion) -> Result<Vec<u8>> {
        let mut out = ByteCursor::new();
        match self {
            HircBody::Sound(n) => n.write(&mut out, version)?,
            HircBody::Action(n) => n.write(&mut out, version)?,
            HircBody::Event(n) => n.write(&mut out, version)?,
            HircBody::RandomSequence(n) => n.write(&mut out, version)?,
            HircBody::Switch(n) => n.write(&mut out, version)?,
            HircBody::ActorMixer(n) => n.write(&mut out, version)?,
            HircBody::Layer(n) => n.write(&mut out, version)?,
            HircBody::MusicSegment(n) => n.write(&mut out, version)?,
            HircBody::MusicTrack(n) => n.write(&mut out, version)?,
            HircBody::MusicSwitch(n) => n.write(&mut out, version)?,
            HircBody::Raw(bytes) => out.write_bytes(bytes)?,
        }
        Ok(out.into_inner())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            HircBody::Sound(_) => Sound::NAME,
            HircBody::Action(_) => Action::NAME,
            HircBody::Event(_) => Event::NAME,
            HircBody::RandomSequence(_) => RandomSequence::NAME,
            HircBody::Switch(_) => SwitchContainer::NAME,
            HircBody::ActorMixer(_) => ActorMixer::NAME,
            HircBody::Layer(_) => LayerContainer::NAME,
            HircBody::MusicSegment(_) => MusicSegment::NAME,
            HircBody::MusicTrack(_) => MusicTrack::NAME,
            HircBody::MusicSwitch(_) => MusicSwitch::NAME,
            HircBody::Raw(_) => "Raw",
        }
    }

    pub fn params(&self) -> Option<&BaseParam> {
        match self {
            HircBody::Sound(n) => Some(&n.params),
            HircBody::RandomSequence(n) => Some(&n.params),
            HircBody::Switch(n) => Some(&n.params),
            HircBody::ActorMixer(n) => Some(&n.0.params),
            HircBody::Layer(n) => Some(&n.0.params),
            HircBody::MusicSegment(n) => Some(&n.params),
            HircBody::MusicTrack(n) => Some(&n.params),
            HircBody::MusicSwitch(n) => Some(&n.params),
            HircBody::Action(_) | HircBody::Event(_) | HircBody::Raw(_) => None,
        }
    }

    pub fn params_mut(&mut self) -> Option<&mut BaseParam> {
        match self {
            HircBody::Sound(n) => Some(&mut n.params),
            HircBody::RandomSequence(n) => Some(&mut n.params),
            HircBody::Switch(n) => Some(&mut n.params),
            HircBody::ActorMixer(n) => Some(&mut n.0.params),
            HircBody::Layer(n) => Some(&mut n.0.params),
            HircBody::MusicSegment(n) => Some(&mut n.params),
            HircBody::MusicTrack(n) => Some(&mut n.params),
            HircBody::MusicSwitch(n) => Some(&mut n.params),
            HircBody::Action(_) | HircBody::Event(_) | HircBody::Raw(_) => None,
        }
    }

    /// Non-zero parent id from the parameter block.
    pub fn parent_id(&self) -> Option<u32> {
        self.params().map(|p| p.parent_id).filter(|id| *id != 0)
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            HircBody::RandomSequence(n) => Some(&n.children),
            HircBody::Switch(n) => Some(&n.children),
            HircBody::ActorMixer(n) => Some(&n.0.children),
            HircBody::Layer(n) => Some(&n.0.children),
            HircBody::MusicSegment(n) => Some(&n.children),
            HircBody::MusicSwitch(n) => Some(&n.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            HircBody::RandomSequence(n) => Some(&mut n.children),
            HircBody::Switch(n) => Some(&mut n.children),
            HircBody::ActorMixer(n) => Some(&mut n.0.children),
            HircBody::Layer(n) => Some(&mut n.0.children),
            HircBody::MusicSegment(n) => Some(&mut n.children),
            HircBody::MusicSwitch(n) => Some(&mut n.children),
            _ => None,
        }
    }

    /// Media sources referenced by this node (Sound and MusicTrack only).
    pub fn sources(&self) -> &[BankSource] {
        match self {
            HircBody::Sound(n) => std::slice::from_ref(&n.source),
            HircBody::MusicTrack(n) => &n.sources,
            _ => &[],
        }
    }

    pub fn sources_mut(&mut self) -> &mut [BankSource] {
        match self {
            HircBody::Sound(n) => std::slice::from_mut(&mut n.source),
            HircBody::MusicTrack(n) => &mut n.sources,
            _ => &mut [],
        }
    }
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct HircRecordHeader {
    pub type_tag: u8,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HircEntry {
    pub type_tag: u8,
    /// Payload length including the id.
    pub size: u32,
    pub id: u32,
    pub version: BankVersion,
    pub body: HircBody,
    /// File ids of the banks that list this entry.
    pub soundbanks: IndexSet<u64>,
    /// Serialized payload before the first edit.
    pub previous: Option<Vec<u8>>,
    /// Flags raised on this entry by edited children and audio sources.
    pub raised: u32,
}

impl HircEntry {
    /// Decodes a payload (id included).
    pub fn decode(type_tag: u8, payload: &[u8], version: BankVersion) -> Result<Self> {
        if payload.len() < 4 {
            return Err(Error::malformed(
                "hierarchy entry",
                format!("payload of {} bytes has no id", payload.len()),
            ));
        }
        let id = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        Ok(Self {
            type_tag,
            size: payload.len() as u32,
            id,
            version,
            body: HircBody::decode(type_tag, id, &payload[4..], version),
            soundbanks: IndexSet::new(),
            previous: None,
            raised: 0,
        })
    }

    /// Reads one `type_tag, size, payload` record.
    pub fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        let header: HircRecordHeader = cur.read_le()?;
        let payload = cur.read_bytes(u64::from(header.size))?;
        Self::decode(header.type_tag, &payload, version)
    }

    /// Serializes the payload without checking `size`.
    pub fn payload(&self) -> Result<Vec<u8>> {
        let mut out = self.id.to_le_bytes().to_vec();
        out.extend(self.body.encode(self.version)?);
        Ok(out)
    }

    /// The payload, failing if `size` no longer matches it.
    pub fn get_data(&self) -> Result<Vec<u8>> {
        let payload = self.payload()?;
        if payload.len() != self.size as usize {
            return Err(Error::SizeMismatch {
                id: self.id,
                recorded: self.size,
                actual: payload.len(),
            });
        }
        Ok(payload)
    }

    /// The full record: header plus checked payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = self.get_data()?;
        let mut out = ByteCursor::new();
        out.write_le(&HircRecordHeader {
            type_tag: self.type_tag,
            size: self.size,
        })?;
        out.write_bytes(&payload)?;
        Ok(out.into_inner())
    }

    pub fn refresh_size(&mut self) -> Result<()> {
        self.size = self.payload()?.len() as u32;
        Ok(())
    }

    /// Replaces the body with a decode of `payload` (id included).
    pub fn restore(&mut self, payload: &[u8]) -> Result<()> {
        let decoded = Self::decode(self.type_tag, payload, self.version)?;
        self.body = decoded.body;
        self.size = decoded.size;
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.previous.is_some()
    }

    pub fn parent_id(&self) -> Option<u32> {
        self.body.parent_id()
    }

    pub fn kind_name(&self) -> &'static str {
        self.body.kind_name()
    }

    /// Appends children missing from this container. Returns how many were
    /// added; non-containers add nothing.
    pub fn merge_children(&mut self, other: &HircEntry) -> Result<usize> {
        let Some(incoming) = other.body.children() else {
            return Ok(0);
        };
        let incoming = incoming.ids.clone();
        let added = match self.body.children_mut() {
            Some(children) => children.merge(&incoming),
            None => 0,
        };
        if added > 0 {
            self.refresh_size()?;
        }
        Ok(added)
    }
}
