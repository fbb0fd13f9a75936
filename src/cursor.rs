use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Growable byte buffer with a position. All reads and writes are little-endian.
///
/// Writes overwrite in place and extend the buffer when they run past the end,
/// so the same type serves both decoding and encoding. `Read`, `Write` and
/// `Seek` are implemented so binrw records can be read from and written into it.
#[derive(Debug, Default, Clone)]
pub struct ByteCursor {
    inner: Cursor<Vec<u8>>,
}

impl ByteCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self::from_bytes(data.to_vec())
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn set_position(&mut self, pos: u64) {
        self.inner.set_position(pos);
    }

    pub fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }

    /// Fails with `UnexpectedEof` unless `n` more bytes can be read.
    pub fn ensure(&self, n: u64) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof {
                offset: self.position(),
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.ensure(n)?;
        self.inner.set_position(self.position() + n);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.inner.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.inner.read_u16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.inner.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.inner.read_i32::<LittleEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.inner.read_u64::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.inner.read_f32::<LittleEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.inner.read_f64::<LittleEndian>()?)
    }

    pub fn read_bytes(&mut self, n: u64) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let mut buf = vec![0u8; n as usize];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Everything from the current position up to `end`, which must not be
    /// behind the cursor.
    pub fn read_until(&mut self, end: u64) -> Result<Vec<u8>> {
        let pos = self.position();
        if pos > end {
            return Err(Error::malformed(
                "record",
                format!("read past record end ({pos:#x} > {end:#x})"),
            ));
        }
        self.read_bytes(end - pos)
    }

    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        self.ensure(4)?;
        let mut tag = [0u8; 4];
        self.inner.read_exact(&mut tag)?;
        Ok(tag)
    }

    /// Variable-length unsigned integer: 7-bit groups, most significant first,
    /// high bit set on every byte but the last.
    pub fn read_var_u32(&mut self) -> Result<u32> {
        let offset = self.position();
        let mut value: u32 = 0;
        for _ in 0..5 {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::malformed(
            "var-len integer",
            format!("more than 5 bytes at offset {offset:#x}"),
        ))
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_u8(v)?;
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.inner.write_u64::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.inner.write_f32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.inner.write_f64::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn write_var_u32(&mut self, v: u32) -> Result<()> {
        let mut groups = vec![(v & 0x7F) as u8];
        let mut rest = v >> 7;
        while rest != 0 {
            groups.push((rest & 0x7F) as u8 | 0x80);
            rest >>= 7;
        }
        groups.reverse();
        self.write_bytes(&groups)
    }

    /// Patch a u32 at an absolute position without moving the cursor.
    pub fn patch_u32(&mut self, pos: u64, v: u32) -> Result<()> {
        let here = self.position();
        self.inner.set_position(pos);
        self.write_u32(v)?;
        self.inner.set_position(here);
        Ok(())
    }

    /// Zero-pad the buffer until the position is a multiple of `alignment`.
    pub fn pad_to(&mut self, alignment: u64) -> Result<()> {
        let padding = align_up(self.position(), alignment) - self.position();
        if padding > 0 {
            self.write_bytes(&vec![0u8; padding as usize])?;
        }
        Ok(())
    }
}

pub fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

impl Read for ByteCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ByteCursor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for ByteCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
