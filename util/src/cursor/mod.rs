
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Bounds-checked big-endian reader over any [`Buf`].
///
/// Unlike the raw `Buf` getters, which panic on underrun, every read here
/// fails with [`Error::OutOfBounds`] and leaves the buffer untouched.
pub struct Reader<'a, B: Buf> {
    buf: &'a mut B,
}

impl<'a, B: Buf> Reader<'a, B> {
    pub fn new(buf: &'a mut B) -> Self {
        Reader { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.buf.remaining();
        if needed > remaining {
            return Err(Error::OutOfBounds { needed, remaining });
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    /// Reads a 24-bit big-endian value into the low bits of a `u32`.
    pub fn get_u24(&mut self) -> Result<u32> {
        self.ensure(3)?;
        let hi = self.buf.get_u8() as u32;
        let lo = self.buf.get_u16() as u32;
        Ok(hi << 16 | lo)
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64())
    }

    /// Splits off the next `n` bytes. A packet body handed to a nested
    /// decoder this way cannot be read past its declared length.
    pub fn copy_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        Ok(self.buf.copy_to_bytes(n))
    }

    pub fn copy_rest(&mut self) -> Bytes {
        let n = self.buf.remaining();
        self.buf.copy_to_bytes(n)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.buf.advance(n);
        Ok(())
    }
}

/// Big-endian writer backed by a [`BytesMut`].
///
/// A writer made with [`Writer::new`] or [`Writer::with_capacity`] grows on
/// demand. [`Writer::bounded`] refuses to grow past its capacity and reports
/// [`Error::OutOfBounds`] instead.
#[derive(Debug, Default)]
pub struct Writer {
    buf: BytesMut,
    limit: Option<usize>,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: BytesMut::with_capacity(capacity),
            limit: None,
        }
    }

    pub fn bounded(capacity: usize) -> Self {
        Writer {
            buf: BytesMut::with_capacity(capacity),
            limit: Some(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            let remaining = limit - self.buf.len();
            if needed > remaining {
                return Err(Error::OutOfBounds { needed, remaining });
            }
        }
        Ok(())
    }

    pub fn put_u8(&mut self, v: u8) -> Result<()> {
        self.ensure(1)?;
        self.buf.put_u8(v);
        Ok(())
    }

    pub fn put_u16(&mut self, v: u16) -> Result<()> {
        self.ensure(2)?;
        self.buf.put_u16(v);
        Ok(())
    }

    /// Writes the low 24 bits of `v`.
    pub fn put_u24(&mut self, v: u32) -> Result<()> {
        self.ensure(3)?;
        self.buf.put_u8((v >> 16) as u8);
        self.buf.put_u16(v as u16);
        Ok(())
    }

    pub fn put_u32(&mut self, v: u32) -> Result<()> {
        self.ensure(4)?;
        self.buf.put_u32(v);
        Ok(())
    }

    pub fn put_u64(&mut self, v: u64) -> Result<()> {
        self.ensure(8)?;
        self.buf.put_u64(v);
        Ok(())
    }

    pub fn put_slice(&mut self, src: &[u8]) -> Result<()> {
        self.ensure(src.len())?;
        self.buf.put_slice(src);
        Ok(())
    }

    pub fn put_zeros(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.buf.put_bytes(0, n);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}
