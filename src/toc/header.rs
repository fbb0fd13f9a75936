use binrw::binrw;

#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct TocHeader {
    pub magic: u32,          // 0xF0000011
    pub num_types: u32,
    pub num_files: u32,
    pub unknown: u32,
    pub reserved: [u8; 56],
}

impl Default for TocHeader {
    fn default() -> Self {
        Self {
            magic: Self::MAGIC,
            num_types: 0,
            num_files: 0,
            unknown: 0,
            reserved: [0u8; 56],
        }
    }
}

impl TocHeader {
    pub const MAGIC: u32 = 0xF000_0011;
    pub const SIZE: u64 = 72;

    pub fn is_valid(&self) -> bool {
        self.magic == Self::MAGIC
    }

    pub fn read<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<Self, binrw::Error> {
        use binrw::BinReaderExt;
        reader.read_le()
    }

    pub fn write<W: std::io::Write + std::io::Seek>(&self, writer: &mut W) -> Result<(), binrw::Error> {
        use binrw::BinWriterExt;
        writer.write_le(self)
    }
}

/// One per non-empty type group, directly after the header.
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[br(little)]
#[bw(little)]
pub struct TypeGroupHeader {
    pub reserved: u64,
    pub type_id: u64,
    pub count: u64,
    pub unknown1: u32, // always 16
    pub unknown2: u32, // always 64
}

impl TypeGroupHeader {
    pub const SIZE: u64 = 32;

    pub fn new(type_id: u64, count: u64) -> Self {
        Self {
            reserved: 0,
            type_id,
            count,
            unknown1: 16,
            unknown2: 64,
        }
    }
}
