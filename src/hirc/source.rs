use binrw::binrw;

/// Where a source's media bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// In the bank's DIDX/DATA.
    Embedded,
    /// A prefix in the bank, the full payload in a stream record.
    Prefetch,
    /// Only in a stream record.
    Stream,
}

impl StreamKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StreamKind::Embedded),
            1 => Some(StreamKind::Prefetch),
            2 => Some(StreamKind::Stream),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            StreamKind::Embedded => 0,
            StreamKind::Prefetch => 1,
            StreamKind::Stream => 2,
        }
    }

    pub fn in_bank(self) -> bool {
        matches!(self, StreamKind::Embedded | StreamKind::Prefetch)
    }

    pub fn in_stream(self) -> bool {
        matches!(self, StreamKind::Prefetch | StreamKind::Stream)
    }
}

#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct PluginParam {
    #[br(temp)]
    #[bw(calc = data.len() as u32)]
    size: u32,
    #[br(count = size)]
    pub data: Vec<u8>,
}

/// AkBankSourceData.
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct BankSource {
    pub plugin_id: u32,
    pub stream_type: u8,
    pub source_id: u32,
    pub mem_size: u32,
    pub bit_flags: u8,
    #[br(if(plugin_id & 0x0F == 2))]
    pub plugin_param: Option<PluginParam>,
}

impl BankSource {
    pub fn new(source_id: u32, kind: StreamKind, mem_size: u32) -> Self {
        Self {
            plugin_id: 0x0004_0001,
            stream_type: kind.as_u8(),
            source_id,
            mem_size,
            bit_flags: 0,
            plugin_param: None,
        }
    }

    /// Codec plugins are the only sources that carry media.
    pub fn is_codec(&self) -> bool {
        self.plugin_id & 0x0F == 1
    }

    pub fn kind(&self) -> Option<StreamKind> {
        StreamKind::from_u8(self.stream_type)
    }

    /// Kind of a media-carrying source, `None` for plugins and unknown kinds.
    pub fn media_kind(&self) -> Option<StreamKind> {
        if self.is_codec() {
            self.kind()
        } else {
            None
        }
    }
}

/// AkTrackSrcInfo. Times are in milliseconds.
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
#[br(little)]
#[bw(little)]
pub struct TrackInfo {
    pub track_id: u32,
    pub source_id: u32,
    pub event_id: u32,
    pub play_at: f64,
    pub begin_trim: f64,
    pub end_trim: f64,
    pub source_duration: f64,
}

impl TrackInfo {
    pub const SIZE: u64 = 44;
}
