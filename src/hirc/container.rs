use binrw::{binrw, BinReaderExt, BinWriterExt};

use crate::bank::BankVersion;
use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::hirc::params::{check_count, BaseParam, Children};
use crate::hirc::{read_tail, HircNode};

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
#[br(little)]
#[bw(little)]
pub struct PlaylistSettings {
    pub loop_count: u16,
    pub loop_mod_min: u16,
    pub loop_mod_max: u16,
    pub transition_time: f32,
    pub transition_mod_min: f32,
    pub transition_mod_max: f32,
    pub avoid_repeat_count: u16,
    pub transition_mode: u8,
    pub random_mode: u8,
    pub mode: u8,
    pub flags: u8,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct PlaylistItem {
    pub play_id: u32,
    pub weight: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomSequence {
    pub params: BaseParam,
    pub settings: PlaylistSettings,
    pub children: Children,
    pub playlist: Vec<PlaylistItem>,
    pub tail: Vec<u8>,
}

impl HircNode for RandomSequence {
    const NAME: &'static str = "RandomSequenceContainer";

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        let params = BaseParam::read(cur, version)?;
        let settings = cur.read_le()?;
        let children = cur.read_le()?;
        let count = cur.read_u16()?;
        check_count(cur, u32::from(count), 8, "playlist")?;
        let mut playlist = Vec::with_capacity(count as usize);
        for _ in 0..count {
            playlist.push(cur.read_le()?);
        }
        Ok(Self {
            params,
            settings,
            children,
            playlist,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        self.params.write(out, version)?;
        out.write_le(&self.settings)?;
        out.write_le(&self.children)?;
        out.write_u16(self.playlist.len() as u16)?;
        for item in &self.playlist {
            out.write_le(item)?;
        }
        out.write_bytes(&self.tail)
    }
}

/// Shape shared by actor-mixers and layer containers: parameters, children,
/// then whatever the node keeps after them.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamNode {
    pub params: BaseParam,
    pub children: Children,
    pub tail: Vec<u8>,
}

impl ParamNode {
    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        let params = BaseParam::read(cur, version)?;
        let children = cur.read_le()?;
        Ok(Self {
            params,
            children,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        self.params.write(out, version)?;
        out.write_le(&self.children)?;
        out.write_bytes(&self.tail)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActorMixer(pub ParamNode);

impl HircNode for ActorMixer {
    const NAME: &'static str = "ActorMixer";

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        ParamNode::read(cur, version).map(Self)
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        self.0.write(out, version)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerContainer(pub ParamNode);

impl HircNode for LayerContainer {
    const NAME: &'static str = "LayerContainer";

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        ParamNode::read(cur, version).map(Self)
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        self.0.write(out, version)
    }
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct SwitchSettings {
    pub group_type: u8,
    pub group_id: u32,
    pub default_switch: u32,
    pub continuous_validation: u8,
}

#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct SwitchGroup {
    pub switch_id: u32,
    #[br(temp)]
    #[bw(calc = nodes.len() as u32)]
    count: u32,
    #[br(count = count)]
    pub nodes: Vec<u32>,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct SwitchParam {
    pub node_id: u32,
    pub flags: u8,
    pub flags2: u8,
    pub fade_out: i32,
    pub fade_in: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchContainer {
    pub params: BaseParam,
    pub settings: SwitchSettings,
    pub children: Children,
    pub groups: Vec<SwitchGroup>,
    pub switch_params: Vec<SwitchParam>,
    pub tail: Vec<u8>,
}

impl HircNode for SwitchContainer {
    const NAME: &'static str = "SwitchContainer";

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        let params = BaseParam::read(cur, version)?;
        let settings = cur.read_le()?;
        let children = cur.read_le()?;

        let group_count = cur.read_u32()?;
        check_count(cur, group_count, 8, "switch groups")?;
        let mut groups = Vec::with_capacity(group_count as usize);
        for _ in 0..group_count {
            groups.push(cur.read_le()?);
        }

        let param_count = cur.read_u32()?;
        check_count(cur, param_count, 14, "switch params")?;
        let mut switch_params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            switch_params.push(cur.read_le()?);
        }

        Ok(Self {
            params,
            settings,
            children,
            groups,
            switch_params,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        self.params.write(out, version)?;
        out.write_le(&self.settings)?;
        out.write_le(&self.children)?;
        out.write_u32(self.groups.len() as u32)?;
        for group in &self.groups {
            out.write_le(group)?;
        }
        out.write_u32(self.switch_params.len() as u32)?;
        for param in &self.switch_params {
            out.write_le(param)?;
        }
        out.write_bytes(&self.tail)
    }
}
