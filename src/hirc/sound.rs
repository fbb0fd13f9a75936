use crate::bank::BankVersion;
use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::hirc::params::BaseParam;
use crate::hirc::source::BankSource;
use crate::hirc::{read_tail, HircNode};

#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub source: BankSource,
    pub params: BaseParam,
    pub tail: Vec<u8>,
}

impl HircNode for Sound {
    const NAME: &'static str = "Sound";

    fn read(cur: &mut ByteCursor, version: BankVersion) -> Result<Self> {
        use binrw::BinReaderExt;
        let source = cur.read_le()?;
        let params = BaseParam::read(cur, version)?;
        Ok(Self {
            source,
            params,
            tail: read_tail(cur)?,
        })
    }

    fn write(&self, out: &mut ByteCursor, version: BankVersion) -> Result<()> {
        use binrw::BinWriterExt;
        out.write_le(&self.source)?;
        self.params.write(out, version)?;
        out.write_bytes(&self.tail)
    }
}
