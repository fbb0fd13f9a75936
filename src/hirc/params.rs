use binrw::{binrw, BinReaderExt, BinWriterExt};

use crate::bank::BankVersion;
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
#[br(little)]
#[bw(little)]
pub struct RtpcPoint {
    pub from: f32,
    pub to: f32,
    pub interpolation: u32,
}

/// `u32` count followed by child ids.
#[binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct Children {
    #[br(temp)]
    #[bw(calc = ids.len() as u32)]
    count: u32,
    #[br(count = count)]
    pub ids: Vec<u32>,
}

impl Children {
    pub fn new(ids: Vec<u32>) -> Self {
        Self { ids }
    }

    /// Appends ids not already present. Returns how many were added.
    pub fn merge(&mut self, other: &[u32]) -> usize {
        let before = self.ids.len();
        for id in other {
            if !self.ids.contains(id) {
                self.ids.push(*id);
            }
        }
        self.ids.len() - before
    }
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct FxSlot {
    pub index: u8,
    pub fx_id: u32,
    pub share_set: u8,
    pub rendered: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FxChain {
    pub override_parent: u8,
    /// Present on disk only when the chain has slots.
    pub bypass: u8,
    pub slots: Vec<FxSlot>,
}

impl FxChain {
    fn read(cur: &mut ByteCursor) -> Result<Self> {
        let override_parent = cur.read_u8()?;
        let count = cur.read_u8()?;
        let mut chain = Self {
            override_parent,
            ..Self::default()
        };
        if count > 0 {
            chain.bypass = cur.read_u8()?;
            for _ in 0..count {
                chain.slots.push(cur.read_le()?);
            }
        }
        Ok(chain)
    }

    fn write(&self, out: &mut ByteCursor) -> Result<()> {
        out.write_u8(self.override_parent)?;
        out.write_u8(self.slots.len() as u8)?;
        if !self.slots.is_empty() {
            out.write_u8(self.bypass)?;
            for slot in &self.slots {
                out.write_le(slot)?;
            }
        }
        Ok(())
    }
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct FxMetaSlot {
    pub index: u8,
    pub fx_id: u32,
    pub share_set: u8,
}

#[binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct FxMetadata {
    pub override_parent: u8,
    #[br(temp)]
    #[bw(calc = slots.len() as u8)]
    count: u8,
    #[br(count = count)]
    pub slots: Vec<FxMetaSlot>,
}

/// `n:u8`, `ids:u8[n]`, `values:u32[n]`. Values are kept as raw bits since
/// the property id decides whether they hold a float or an integer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropBundle {
    pub props: Vec<(u8, u32)>,
}

impl PropBundle {
    pub(crate) fn read(cur: &mut ByteCursor) -> Result<Self> {
        let count = cur.read_u8()? as usize;
        let ids = cur.read_bytes(count as u64)?;
        let mut props = Vec::with_capacity(count);
        for id in ids {
            props.push((id, cur.read_u32()?));
        }
        Ok(Self { props })
    }

    pub(crate) fn write(&self, out: &mut ByteCursor) -> Result<()> {
        out.write_u8(self.props.len() as u8)?;
        for (id, _) in &self.props {
            out.write_u8(*id)?;
        }
        for (_, value) in &self.props {
            out.write_u32(*value)?;
        }
        Ok(())
    }

    pub fn get(&self, id: u8) -> Option<u32> {
        self.props.iter().find(|(p, _)| *p == id).map(|(_, v)| *v)
    }

    pub fn get_f32(&self, id: u8) -> Option<f32> {
        self.get(id).map(f32::from_bits)
    }

    /// Overwrites the property or appends it.
    pub fn set(&mut self, id: u8, value: u32) {
        match self.props.iter_mut().find(|(p, _)| *p == id) {
            Some(slot) => slot.1 = value,
            None => self.props.push((id, value)),
        }
    }

    pub fn set_f32(&mut self, id: u8, value: f32) {
        self.set(id, value.to_bits());
    }
}

/// `n:u8`, `ids:u8[n]`, `(min:f32, max:f32)[n]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangedPropBundle {
    pub props: Vec<(u8, f32, f32)>,
}

impl RangedPropBundle {
    pub(crate) fn read(cur: &mut ByteCursor) -> Result<Self> {
        let count = cur.read_u8()? as usize;
        let ids = cur.read_bytes(count as u64)?;
        let mut props = Vec::with_capacity(count);
        for id in ids {
            let min = cur.read_f32()?;
            let max = cur.read_f32()?;
            props.push((id, min, max));
        }
        Ok(Self { props })
    }

    pub(crate) fn write(&self, out: &mut ByteCursor) -> Result<()> {
        out.write_u8(self.props.len() as u8)?;
        for (id, _, _) in &self.props {
            out.write_u8(*id)?;
        }
        for (_, min, max) in &self.props {
            out.write_f32(*min)?;
            out.write_f32(*max)?;
        }
        Ok(())
    }
}

/// Positioning block. Only its extent is decoded; the bytes are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Positioning {
    pub raw: Vec<u8>,
}

impl Positioning {
    fn read(cur: &mut ByteCursor) -> Result<Self> {
        let start = cur.position();
        let bits = cur.read_u8()?;
        let has_positioning = bits & 0x01 != 0;
        let has_3d = bits & 0x02 != 0;
        if has_positioning && has_3d {
            let _bits_3d = cur.read_u8()?;
            if (bits >> 5) & 0x03 != 0 {
                // path mode, transition time
                cur.skip(1 + 4)?;
                let vertices = cur.read_u32()?;
                cur.skip(u64::from(vertices) * 16)?;
                let items = cur.read_u32()?;
                cur.skip(u64::from(items) * 8)?;
                cur.skip(u64::from(items) * 12)?;
            }
        }
        let end = cur.position();
        cur.set_position(start);
        Ok(Self {
            raw: cur.read_bytes(end - start)?,
        })
    }

    pub fn bits(&self) -> u8 {
        self.raw.first().copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxParams {
    pub flags: u8,
    /// Present when bit 3 of `flags` is set.
    pub aux_buses: Option<[u32; 4]>,
    pub reflections_aux_bus: u32,
}

impl AuxParams {
    pub const HAS_AUX: u8 = 0x08;

    fn read(cur: &mut ByteCursor) -> Result<Self> {
        let flags = cur.read_u8()?;
        let aux_buses = if flags & Self::HAS_AUX != 0 {
            let mut ids = [0u32; 4];
            for id in &mut ids {
                *id = cur.read_u32()?;
            }
            Some(ids)
        } else {
            None
        };
        let reflections_aux_bus = cur.read_u32()?;
        Ok(Self {
            flags,
            aux_buses,
            reflections_aux_bus,
        })
    }

    fn write(&self, out: &mut ByteCursor) -> Result<()> {
        out.write_u8(self.flags)?;
        if self.flags & Self::HAS_AUX != 0 {
            for id in self.aux_buses.unwrap_or_default() {
                out.write_u32(id)?;
            }
        }
        out.write_u32(self.reflections_aux_bus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateProp {
    pub id: u32,
    pub accum: u8,
    pub in_db: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateGroup {
    pub group_id: u32,
    pub sync_type: u8,
    /// `(state_id, instance_id)`
    pub states: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rtpc {
    pub id: u32,
    pub rtpc_type: u8,
    pub accum: u8,
    pub param_id: u32,
    pub curve_id: u32,
    pub scaling: u8,
    pub points: Vec<RtpcPoint>,
}

impl Rtpc {
    fn read(cur: &mut ByteCursor) -> Result<Self> {
        let id = cur.read_u32()?;
        let rtpc_type = cur.read_u8()?;
        let accum = cur.read_u8()?;
        let param_id = cur.read_var_u32()?;
        let curve_id = cur.read_u32()?;
        let scaling = cur.read_u8()?;
        let count = cur.read_u16()?;
        cur.ensure(u64::from(count) * 12)?;
        let mut points = Vec::with_capacity(count as usize);
        for _ in 0..count {
            points.push(cur.read_le()?);
        }
        Ok(Self {
            id,
            rtpc_type,
            accum,
            param_id,
            curve_id,
            scaling,
            points,
        })
    }

    fn write(&self, out: &mut ByteCursor) -> Result<()> {
        out.write_u32(self.id)?;
        out.write_u8(self.rtpc_type)?;
        out.write_u8(self.accum)?;
        out.write_var_u32(self.param_id)?;
        out.write_u32(self.curve_id)?;
        out.write_u8(self.scaling)?;
        out.write_u16(self.points.len() as u16)?;
        for point in &self.points {
            out.write_le(point)?;
        }
        Ok(())
    }
}

/// The parameter block shared by every node type that sits in the actor-mixer
/// or music hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseParam {
    pub fx_chain: FxChain,
    pub fx_metadata: FxMetadata,
    /// Revision 154 only.
    pub override_attachment: Option<u8>,
    pub override_bus_id: u32,
    pub parent_id: u32,
    pub flags: u8,
    pub props: PropBundle,
    pub ranged_props: RangedPropBundle,
    pub positioning: Positioning,
    pub aux: AuxParams,
    pub advanced: [u8; 6],
    pub state_props: Vec<StateProp>,
    pub state_groups: Vec<StateGroup>,
    pub rtpcs: Vec<Rtpc>,
}

impl BaseParam {
    pub fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        let fx_chain = FxChain::read(cur)?;
        let fx_metadata = cur.read_le()?;
        let override_attachment = if version.has_override_attachment() {
            Some(cur.read_u8()?)
        } else {
            None
        };
        let override_bus_id = cur.read_u32()?;
        let parent_id = cur.read_u32()?;
        let flags = cur.read_u8()?;
        let props = PropBundle::read(cur)?;
        let ranged_props = RangedPropBundle::read(cur)?;
        let positioning = Positioning::read(cur)?;
        let aux = AuxParams::read(cur)?;
        let mut advanced = [0u8; 6];
        advanced.copy_from_slice(&cur.read_bytes(6)?);

        let prop_count = cur.read_var_u32()?;
        check_count(cur, prop_count, 3, "state props")?;
        let mut state_props = Vec::with_capacity(prop_count as usize);
        for _ in 0..prop_count {
            state_props.push(StateProp {
                id: cur.read_var_u32()?,
                accum: cur.read_u8()?,
                in_db: cur.read_u8()?,
            });
        }

        let group_count = cur.read_var_u32()?;
        check_count(cur, group_count, 6, "state groups")?;
        let mut state_groups = Vec::with_capacity(group_count as usize);
        for _ in 0..group_count {
            let group_id = cur.read_u32()?;
            let sync_type = cur.read_u8()?;
            let state_count = cur.read_var_u32()?;
            check_count(cur, state_count, 8, "states")?;
            let mut states = Vec::with_capacity(state_count as usize);
            for _ in 0..state_count {
                states.push((cur.read_u32()?, cur.read_u32()?));
            }
            state_groups.push(StateGroup {
                group_id,
                sync_type,
                states,
            });
        }

        let rtpc_count = cur.read_u16()?;
        let mut rtpcs = Vec::with_capacity(rtpc_count as usize);
        for _ in 0..rtpc_count {
            rtpcs.push(Rtpc::read(cur)?);
        }

        Ok(Self {
            fx_chain,
            fx_metadata,
            override_attachment,
            override_bus_id,
            parent_id,
            flags,
            props,
            ranged_props,
            positioning,
            aux,
            advanced,
            state_props,
            state_groups,
            rtpcs,
        })
    }

    pub fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        self.fx_chain.write(out)?;
        out.write_le(&self.fx_metadata)?;
        if version.has_override_attachment() {
            out.write_u8(self.override_attachment.unwrap_or(0))?;
        }
        out.write_u32(self.override_bus_id)?;
        out.write_u32(self.parent_id)?;
        out.write_u8(self.flags)?;
        self.props.write(out)?;
        self.ranged_props.write(out)?;
        out.write_bytes(&self.positioning.raw)?;
        self.aux.write(out)?;
        out.write_bytes(&self.advanced)?;

        out.write_var_u32(self.state_props.len() as u32)?;
        for prop in &self.state_props {
            out.write_var_u32(prop.id)?;
            out.write_u8(prop.accum)?;
            out.write_u8(prop.in_db)?;
        }
        out.write_var_u32(self.state_groups.len() as u32)?;
        for group in &self.state_groups {
            out.write_u32(group.group_id)?;
            out.write_u8(group.sync_type)?;
            out.write_var_u32(group.states.len() as u32)?;
            for (state, instance) in &group.states {
                out.write_u32(*state)?;
                out.write_u32(*instance)?;
            }
        }
        out.write_u16(self.rtpcs.len() as u16)?;
        for rtpc in &self.rtpcs {
            rtpc.write(out)?;
        }
        Ok(())
    }
}

/// Rejects counts that could not possibly fit in the remaining bytes.
pub(crate) fn check_count(
    cur: &ByteCursor,
    count: u32,
    min_item: u64,
    context: &'static str,
) -> Result<()> {
    if u64::from(count) * min_item > cur.remaining() {
        return Err(Error::malformed(
            context,
            format!("count {count} exceeds remaining {} bytes", cur.remaining()),
        ));
    }
    Ok(())
}
