use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

pub type Tag = [u8; 4];

pub const BKHD: Tag = *b"BKHD";
pub const DIDX: Tag = *b"DIDX";
pub const DATA: Tag = *b"DATA";
pub const HIRC: Tag = *b"HIRC";

pub fn tag_name(tag: &Tag) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

/// Splits a soundbank body into its `{tag, len:u32, data}` chunks, in file
/// order. BKHD, DIDX, DATA and HIRC may appear once; other tags may repeat.
pub fn parse_chunks(payload: &[u8]) -> Result<Vec<(Tag, Vec<u8>)>> {
    let mut cursor = ByteCursor::from_slice(payload);
    let mut chunks: Vec<(Tag, Vec<u8>)> = Vec::new();
    while !cursor.is_exhausted() {
        let tag = cursor.read_tag()?;
        let len = cursor.read_u32()?;
        let data = cursor.read_bytes(u64::from(len))?;
        if is_interpreted(&tag) && chunks.iter().any(|(seen, _)| *seen == tag) {
            return Err(Error::malformed(
                "soundbank",
                format!("duplicate {} chunk", tag_name(&tag)),
            ));
        }
        chunks.push((tag, data));
    }
    Ok(chunks)
}

pub fn is_interpreted(tag: &Tag) -> bool {
    [BKHD, DIDX, DATA, HIRC].contains(tag)
}

/// Removes and returns the first chunk tagged `tag`.
pub fn take_chunk(chunks: &mut Vec<(Tag, Vec<u8>)>, tag: &Tag) -> Option<Vec<u8>> {
    let index = chunks.iter().position(|(t, _)| t == tag)?;
    Some(chunks.remove(index).1)
}

pub fn write_chunk(out: &mut ByteCursor, tag: &Tag, data: &[u8]) -> Result<()> {
    out.write_bytes(tag)?;
    out.write_u32(data.len() as u32)?;
    out.write_bytes(data)
}
