use binrw::{binrw, BinReaderExt, BinWriterExt, NullString};

use crate::bank::BankVersion;
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::hirc::params::{check_count, BaseParam, Children, RtpcPoint};
use crate::hirc::source::{BankSource, TrackInfo};
use crate::hirc::{read_tail, HircNode};

#[binrw]
#[derive(Debug, Clone, PartialEq)]
#[br(little)]
#[bw(little)]
pub struct ClipAutomation {
    pub clip_index: u32,
    pub auto_type: u32,
    #[br(temp)]
    #[bw(calc = points.len() as u32)]
    count: u32,
    #[br(count = count)]
    pub points: Vec<RtpcPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MusicTrack {
    pub flags: u8,
    pub sources: Vec<BankSource>,
    pub track_info: Vec<TrackInfo>,
    /// Only serialized when `track_info` is non-empty.
    pub num_sub_tracks: u32,
    pub clip_automation: Vec<ClipAutomation>,
    pub params: BaseParam,
    pub tail: Vec<u8>,
}

impl MusicTrack {
    /// Track info records that play `source_id`.
    pub fn clips_for(&self, source_id: u32) -> impl Iterator<Item = &TrackInfo> {
        self.track_info.iter().filter(move |t| t.source_id == source_id)
    }
}

impl HircNode for MusicTrack {
    const NAME: &'static str = "MusicTrack";

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        let flags = cur.read_u8()?;

        let source_count = cur.read_u32()?;
        check_count(cur, source_count, 14, "track sources")?;
        let mut sources = Vec::with_capacity(source_count as usize);
        for _ in 0..source_count {
            sources.push(cur.read_le()?);
        }

        let info_count = cur.read_u32()?;
        check_count(cur, info_count, TrackInfo::SIZE, "track info")?;
        let mut track_info = Vec::with_capacity(info_count as usize);
        for _ in 0..info_count {
            track_info.push(cur.read_le()?);
        }
        let num_sub_tracks = if info_count > 0 { cur.read_u32()? } else { 0 };

        let clip_count = cur.read_u32()?;
        check_count(cur, clip_count, 12, "clip automation")?;
        let mut clip_automation = Vec::with_capacity(clip_count as usize);
        for _ in 0..clip_count {
            clip_automation.push(cur.read_le()?);
        }

        let params = BaseParam::read(cur, version)?;
        Ok(Self {
            flags,
            sources,
            track_info,
            num_sub_tracks,
            clip_automation,
            params,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        out.write_u8(self.flags)?;
        out.write_u32(self.sources.len() as u32)?;
        for source in &self.sources {
            out.write_le(source)?;
        }
        out.write_u32(self.track_info.len() as u32)?;
        for info in &self.track_info {
            out.write_le(info)?;
        }
        if !self.track_info.is_empty() {
            out.write_u32(self.num_sub_tracks)?;
        }
        out.write_u32(self.clip_automation.len() as u32)?;
        for clip in &self.clip_automation {
            out.write_le(clip)?;
        }
        self.params.write(out, version)?;
        out.write_bytes(&self.tail)
    }
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
#[br(little)]
#[bw(little)]
pub struct MeterInfo {
    pub grid_period: f64,
    pub grid_offset: f64,
    pub tempo: f32,
    pub beats_per_bar: u8,
    pub beat_value: u8,
    pub flags: u8,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct Stinger {
    pub trigger_id: u32,
    pub segment_id: u32,
    pub sync_play_at: u32,
    pub cue_filter: u32,
    pub dont_repeat_time: i32,
    pub segment_look_ahead: u32,
}

#[binrw]
#[derive(Debug, Clone, PartialEq)]
#[br(little)]
#[bw(little)]
pub struct Marker {
    pub id: u32,
    pub position: f64,
    pub name: NullString,
}

impl Marker {
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name.0).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MusicSegment {
    pub flags: u8,
    pub params: BaseParam,
    pub children: Children,
    pub meter: MeterInfo,
    pub stingers: Vec<Stinger>,
    /// Milliseconds.
    pub duration: f64,
    pub markers: Vec<Marker>,
    pub tail: Vec<u8>,
}

impl MusicSegment {
    pub fn entry_marker(&self) -> Option<&Marker> {
        self.markers.first()
    }

    pub fn exit_marker(&self) -> Option<&Marker> {
        self.markers.last()
    }

    pub fn set_entry_marker(&mut self, position: f64) -> Result<()> {
        let marker = self
            .markers
            .first_mut()
            .ok_or_else(|| Error::malformed("music segment", "segment has no markers"))?;
        marker.position = position;
        Ok(())
    }

    pub fn set_exit_marker(&mut self, position: f64) -> Result<()> {
        let marker = self
            .markers
            .last_mut()
            .ok_or_else(|| Error::malformed("music segment", "segment has no markers"))?;
        marker.position = position;
        Ok(())
    }
}

impl HircNode for MusicSegment {
    const NAME: &'static str = "MusicSegment";

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        let flags = cur.read_u8()?;
        let params = BaseParam::read(cur, version)?;
        let children: Children = cur.read_le()?;
        let meter = cur.read_le()?;

        let stinger_count = cur.read_u32()?;
        check_count(cur, stinger_count, 24, "stingers")?;
        let mut stingers = Vec::with_capacity(stinger_count as usize);
        for _ in 0..stinger_count {
            stingers.push(cur.read_le()?);
        }

        let duration = cur.read_f64()?;
        let marker_count = cur.read_u32()?;
        check_count(cur, marker_count, 13, "markers")?;
        let mut markers = Vec::with_capacity(marker_count as usize);
        for _ in 0..marker_count {
            markers.push(cur.read_le()?);
        }

        Ok(Self {
            flags,
            params,
            children,
            meter,
            stingers,
            duration,
            markers,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        out.write_u8(self.flags)?;
        self.params.write(out, version)?;
        out.write_le(&self.children)?;
        out.write_le(&self.meter)?;
        out.write_u32(self.stingers.len() as u32)?;
        for stinger in &self.stingers {
            out.write_le(stinger)?;
        }
        out.write_f64(self.duration)?;
        out.write_u32(self.markers.len() as u32)?;
        for marker in &self.markers {
            out.write_le(marker)?;
        }
        out.write_bytes(&self.tail)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MusicSwitch {
    pub flags: u8,
    pub params: BaseParam,
    pub children: Children,
    pub tail: Vec<u8>,
}

impl HircNode for MusicSwitch {
    const NAME: &'static str = "MusicSwitch";

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        let flags = cur.read_u8()?;
        let params = BaseParam::read(cur, version)?;
        let children = cur.read_le()?;
        Ok(Self {
            flags,
            params,
            children,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        out.write_u8(self.flags)?;
        self.params.write(out, version)?;
        out.write_le(&self.children)?;
        out.write_bytes(&self.tail)
    }
}
