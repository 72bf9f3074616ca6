//! Byte cursors with the schema's byte order baked in.
//!
//! [`Reader`] and [`Writer`] wrap the `bytes` crate's [`Buf`] and
//! [`BufMut`] so that the field codec never has to branch on byte order
//! itself, and so that every read is bounds-checked up front: a short
//! input becomes [`DecodeError::Truncated`] instead of a panic.

use bytes::{Buf, BufMut};
use frogproto_schema::{ByteOrder, Width};

use crate::DecodeError;

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reading cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    total: usize,
    order: ByteOrder,
}

macro_rules! reader_getters {
    ($($name:ident -> $ty:ty : $be:ident, $le:ident;)*) => {
        $(
            pub fn $name(&mut self) -> Result<$ty, DecodeError> {
                self.ensure(std::mem::size_of::<$ty>())?;
                Ok(match self.order {
                    ByteOrder::Big => self.buf.$be(),
                    ByteOrder::Little => self.buf.$le(),
                })
            }
        )*
    };
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], order: ByteOrder) -> Self {
        Self {
            buf,
            total: buf.len(),
            order,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.total - self.buf.len()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Fails with `Truncated` unless `needed` more bytes are available.
    pub fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.len() < needed {
            return Err(DecodeError::Truncated {
                offset: self.offset(),
                needed,
                available: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_i8(&mut self) -> Result<i8, DecodeError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    reader_getters! {
        get_u16 -> u16 : get_u16, get_u16_le;
        get_u32 -> u32 : get_u32, get_u32_le;
        get_u64 -> u64 : get_u64, get_u64_le;
        get_i16 -> i16 : get_i16, get_i16_le;
        get_i32 -> i32 : get_i32, get_i32_le;
        get_i64 -> i64 : get_i64, get_i64_le;
        get_f32 -> f32 : get_f32, get_f32_le;
        get_f64 -> f64 : get_f64, get_f64_le;
    }

    /// Reads an unsigned header of the given width.
    pub fn get_uint(&mut self, width: Width) -> Result<u64, DecodeError> {
        let n = width.bytes();
        self.ensure(n)?;
        Ok(match self.order {
            ByteOrder::Big => self.buf.get_uint(n),
            ByteOrder::Little => self.buf.get_uint_le(n),
        })
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn get_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Appending cursor over an owned buffer.
#[derive(Debug, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    order: ByteOrder,
}

macro_rules! writer_putters {
    ($($name:ident ($ty:ty) : $be:ident, $le:ident;)*) => {
        $(
            pub fn $name(&mut self, value: $ty) {
                match self.order {
                    ByteOrder::Big => self.buf.$be(value),
                    ByteOrder::Little => self.buf.$le(value),
                }
            }
        )*
    };
}

impl Writer {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            buf: Vec::new(),
            order,
        }
    }

    pub fn with_capacity(capacity: usize, order: ByteOrder) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    writer_putters! {
        put_u16(u16) : put_u16, put_u16_le;
        put_u32(u32) : put_u32, put_u32_le;
        put_u64(u64) : put_u64, put_u64_le;
        put_i16(i16) : put_i16, put_i16_le;
        put_i32(i32) : put_i32, put_i32_le;
        put_i64(i64) : put_i64, put_i64_le;
        put_f32(f32) : put_f32, put_f32_le;
        put_f64(f64) : put_f64, put_f64_le;
    }

    /// Writes an unsigned header of the given width.
    ///
    /// The caller checks `width.fits(value)`; higher bits are dropped.
    pub fn put_uint(&mut self, width: Width, value: u64) {
        let n = width.bytes();
        match self.order {
            ByteOrder::Big => self.buf.put_uint(value, n),
            ByteOrder::Little => self.buf.put_uint_le(value, n),
        }
    }

    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }
}
