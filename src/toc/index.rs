use binrw::binrw;

/// Type ids are `murmur64` of the engine's type names.
pub const WWISE_STREAM: u64 = 0x504B_5523_5D21_440E; // "wwise_stream"
pub const WWISE_BANK: u64 = 0x535A_7BD3_E650_D799; // "wwise_bank"
pub const WWISE_DEP: u64 = 0xAF32_095C_82F2_B070; // "wwise_dep"
pub const TEXT_BANK: u64 = 0x0D97_2BAB_10B4_0FD3; // "strings"
pub const BINK_VIDEO: u64 = 0xAA59_65F0_3029_FA18; // "bik"

/// The asset kinds a TOC may carry, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Stream,
    Bank,
    Dependency,
    TextBank,
    Video,
}

impl AssetKind {
    pub const WRITE_ORDER: [AssetKind; 5] = [
        AssetKind::Stream,
        AssetKind::Bank,
        AssetKind::Dependency,
        AssetKind::TextBank,
        AssetKind::Video,
    ];

    pub fn from_type_id(type_id: u64) -> Option<Self> {
        match type_id {
            WWISE_STREAM => Some(AssetKind::Stream),
            WWISE_BANK => Some(AssetKind::Bank),
            WWISE_DEP => Some(AssetKind::Dependency),
            TEXT_BANK => Some(AssetKind::TextBank),
            BINK_VIDEO => Some(AssetKind::Video),
            _ => None,
        }
    }

    pub fn type_id(self) -> u64 {
        match self {
            AssetKind::Stream => WWISE_STREAM,
            AssetKind::Bank => WWISE_BANK,
            AssetKind::Dependency => WWISE_DEP,
            AssetKind::TextBank => TEXT_BANK,
            AssetKind::Video => BINK_VIDEO,
        }
    }
}

#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct TocRecord {
    pub file_id: u64,
    pub type_id: u64,
    pub toc_data_offset: u64,
    pub stream_file_offset: u64,
    pub gpu_resource_offset: u64,
    pub unknown1: u64,
    pub unknown2: u64,
    pub toc_data_size: u32,
    pub stream_size: u32,
    pub gpu_resource_size: u32,
    pub unknown3: u32, // 16
    pub unknown4: u32, // 64
    pub entry_index: u32,
}

impl TocRecord {
    pub const SIZE: u64 = 80;

    /// A fresh record for an entity that was never read from disk.
    pub fn new(file_id: u64, kind: AssetKind) -> Self {
        Self {
            file_id,
            type_id: kind.type_id(),
            toc_data_offset: 0,
            stream_file_offset: 0,
            gpu_resource_offset: 0,
            unknown1: 0,
            unknown2: 0,
            toc_data_size: 0,
            stream_size: 0,
            gpu_resource_size: 0,
            unknown3: 16,
            unknown4: 64,
            entry_index: 0,
        }
    }

    pub fn kind(&self) -> Option<AssetKind> {
        AssetKind::from_type_id(self.type_id)
    }
}
