use crate::bank::BankVersion;
use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::hirc::params::{check_count, PropBundle, RangedPropBundle};
use crate::hirc::{read_tail, HircNode};

/// Ordered list of the actions an event fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub actions: Vec<u32>,
    pub tail: Vec<u8>,
}

impl Event {
    /// Replaces the action list, dropping repeated ids.
    pub fn set_actions(&mut self, actions: &[u32]) {
        self.actions.clear();
        for id in actions {
            if !self.actions.contains(id) {
                self.actions.push(*id);
            }
        }
    }
}

impl HircNode for Event {
    const NAME: &'static str = "Event";

    fn read(cur: &mut ByteCursor, _version: BankVersion) -> Result<Self> {
        let count = cur.read_var_u32()?;
        check_count(cur, count, 4, "event actions")?;
        let mut actions = Vec::with_capacity(count as usize);
        for _ in 0..count {
            actions.push(cur.read_u32()?);
        }
        Ok(Self {
            actions,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, _version: BankVersion) -> Result<()> {
        out.write_var_u32(self.actions.len() as u32)?;
        for id in &self.actions {
            out.write_u32(*id)?;
        }
        out.write_bytes(&self.tail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionException {
    pub id: u32,
    pub is_bus: u8,
}

fn read_exceptions(cur: &mut ByteCursor) -> Result<Vec<ActionException>> {
    let count = cur.read_var_u32()?;
    check_count(cur, count, 5, "action exceptions")?;
    let mut list = Vec::with_capacity(count as usize);
    for _ in 0..count {
        list.push(ActionException {
            id: cur.read_u32()?,
            is_bus: cur.read_u8()?,
        });
    }
    Ok(list)
}

fn write_exceptions(out: &mut ByteCursor, list: &[ActionException]) -> Result<()> {
    out.write_var_u32(list.len() as u32)?;
    for ex in list {
        out.write_u32(ex.id)?;
        out.write_u8(ex.is_bus)?;
    }
    Ok(())
}

/// Per-family parameters, chosen by the high byte of the action type.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionParams {
    /// Stop, Pause, Resume.
    Active {
        fade_curve: u8,
        flags: u8,
        exceptions: Vec<ActionException>,
    },
    Play {
        fade_curve: u8,
        bank_id: u32,
    },
    /// Volume, pitch, LPF, HPF and bus volume setters.
    SetValue {
        fade_curve: u8,
        value_meaning: u8,
        base: f32,
        min: f32,
        max: f32,
        exceptions: Vec<ActionException>,
    },
    SetState {
        group_id: u32,
        state_id: u32,
    },
    SetSwitch {
        group_id: u32,
        switch_id: u32,
    },
    Seek {
        relative: u8,
        base: f32,
        min: f32,
        max: f32,
        snap_to_marker: u8,
        exceptions: Vec<ActionException>,
    },
    ResetPlaylist {
        fade_curve: u8,
        flags: u8,
        exceptions: Vec<ActionException>,
    },
    /// Everything after the prop bundles stays in the tail.
    Generic,
}

impl ActionParams {
    fn read(cur: &mut ByteCursor, action_type: u16) -> Result<Self> {
        let params = match action_type >> 8 {
            0x01..=0x03 => ActionParams::Active {
                fade_curve: cur.read_u8()?,
                flags: cur.read_u8()?,
                exceptions: read_exceptions(cur)?,
            },
            0x04 => ActionParams::Play {
                fade_curve: cur.read_u8()?,
                bank_id: cur.read_u32()?,
            },
            0x08 | 0x0A | 0x0C | 0x0E | 0x20 => ActionParams::SetValue {
                fade_curve: cur.read_u8()?,
                value_meaning: cur.read_u8()?,
                base: cur.read_f32()?,
                min: cur.read_f32()?,
                max: cur.read_f32()?,
                exceptions: read_exceptions(cur)?,
            },
            0x12 => ActionParams::SetState {
                group_id: cur.read_u32()?,
                state_id: cur.read_u32()?,
            },
            0x19 => ActionParams::SetSwitch {
                group_id: cur.read_u32()?,
                switch_id: cur.read_u32()?,
            },
            0x1E => ActionParams::Seek {
                relative: cur.read_u8()?,
                base: cur.read_f32()?,
                min: cur.read_f32()?,
                max: cur.read_f32()?,
                snap_to_marker: cur.read_u8()?,
                exceptions: read_exceptions(cur)?,
            },
            0x22 => ActionParams::ResetPlaylist {
                fade_curve: cur.read_u8()?,
                flags: cur.read_u8()?,
                exceptions: read_exceptions(cur)?,
            },
            _ => ActionParams::Generic,
        };
        Ok(params)
    }

    fn write(&self, out: &mut ByteCursor) -> Result<()> {
        match self {
            ActionParams::Active {
                fade_curve,
                flags,
                exceptions,
            }
            | ActionParams::ResetPlaylist {
                fade_curve,
                flags,
                exceptions,
            } => {
                out.write_u8(*fade_curve)?;
                out.write_u8(*flags)?;
                write_exceptions(out, exceptions)
            }
            ActionParams::Play {
                fade_curve,
                bank_id,
            } => {
                out.write_u8(*fade_curve)?;
                out.write_u32(*bank_id)
            }
            ActionParams::SetValue {
                fade_curve,
                value_meaning,
                base,
                min,
                max,
                exceptions,
            } => {
                out.write_u8(*fade_curve)?;
                out.write_u8(*value_meaning)?;
                out.write_f32(*base)?;
                out.write_f32(*min)?;
                out.write_f32(*max)?;
                write_exceptions(out, exceptions)
            }
            ActionParams::SetState { group_id, state_id } => {
                out.write_u32(*group_id)?;
                out.write_u32(*state_id)
            }
            ActionParams::SetSwitch {
                group_id,
                switch_id,
            } => {
                out.write_u32(*group_id)?;
                out.write_u32(*switch_id)
            }
            ActionParams::Seek {
                relative,
                base,
                min,
                max,
                snap_to_marker,
                exceptions,
            } => {
                out.write_u8(*relative)?;
                out.write_f32(*base)?;
                out.write_f32(*min)?;
                out.write_f32(*max)?;
                out.write_u8(*snap_to_marker)?;
                write_exceptions(out, exceptions)
            }
            ActionParams::Generic => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action_type: u16,
    pub target_id: u32,
    pub is_bus: u8,
    pub props: PropBundle,
    pub ranged_props: RangedPropBundle,
    pub params: ActionParams,
    pub tail: Vec<u8>,
}

impl HircNode for Action {
    const NAME: &'static str = "Action";

    fn read(cur: &mut ByteCursor, _version: BankVersion) -> Result<Self> {
        let action_type = cur.read_u16()?;
        let target_id = cur.read_u32()?;
        let is_bus = cur.read_u8()?;
        let props = PropBundle::read(cur)?;
        let ranged_props = RangedPropBundle::read(cur)?;
        let params = ActionParams::read(cur, action_type)?;
        Ok(Self {
            action_type,
            target_id,
            is_bus,
            props,
            ranged_props,
            params,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, _version: BankVersion) -> Result<()> {
        out.write_u16(self.action_type)?;
        out.write_u32(self.target_id)?;
        out.write_u8(self.is_bus)?;
        self.props.write(out)?;
        self.ranged_props.write(out)?;
        self.params.write(out)?;
        out.write_bytes(&self.tail)
    }
}
