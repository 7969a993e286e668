//! Fixed-width little-endian encoding on top of [`Stream`].
//!
//! Both helpers share the stream they were built from and never move
//! its cursor except through their own reads and writes, so the caller
//! positions the stream beforehand.

use std::sync::Arc;

use crate::errors::{Result, StreamError};
use crate::stream::{SeekOrigin, Stream};

macro_rules! read_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&self) -> Result<$ty> {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                self.read_into(&mut bytes)?;
                Ok(<$ty>::from_le_bytes(bytes))
            }
        )*
    };
}

macro_rules! write_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&self, value: $ty) -> bool {
                self.write_bytes(&value.to_le_bytes())
            }
        )*
    };
}

pub struct BinaryReader<S: Stream + ?Sized> {
    stream: Arc<S>,
}

impl<S: Stream + ?Sized> BinaryReader<S> {
    pub fn new(stream: Arc<S>) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> &Arc<S> {
        &self.stream
    }

    /// Bytes left between the cursor and the end of the stream.
    pub fn remaining(&self) -> u64 {
        self.stream
            .length()
            .saturating_sub(self.stream.position())
    }

    pub fn seek(&self, origin: SeekOrigin, offset: i64) -> bool {
        self.stream.set_position(origin, offset)
    }

    /// Fill `buf` completely or fail with [`StreamError::UnexpectedEnd`].
    /// The cursor still advances past whatever was read.
    pub fn read_into(&self, buf: &mut [u8]) -> Result<()> {
        let transfer = self.stream.read_bytes(buf);
        if !transfer.is_complete() {
            return Err(StreamError::UnexpectedEnd {
                requested: buf.len() as u64,
                actual: transfer.len,
            });
        }
        Ok(())
    }

    pub fn read_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Read `len` bytes as text, replacing invalid UTF-8.
    pub fn read_chars(&self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read `len` UTF-16 code units as text, replacing unpaired
    /// surrogates.
    pub fn read_chars_utf16(&self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len.saturating_mul(2))?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }

    read_le! {
        read_u8 => u8,
        read_i8 => i8,
        read_u16 => u16,
        read_i16 => i16,
        read_u32 => u32,
        read_i32 => i32,
        read_u64 => u64,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    }
}

pub struct BinaryWriter<S: Stream + ?Sized> {
    stream: Arc<S>,
}

impl<S: Stream + ?Sized> BinaryWriter<S> {
    /// Fails with [`StreamError::NotWritable`] unless the stream accepts
    /// writes.
    pub fn new(stream: Arc<S>) -> Result<Self> {
        if !stream.can_write() {
            return Err(StreamError::NotWritable);
        }
        Ok(Self { stream })
    }

    pub fn stream(&self) -> &Arc<S> {
        &self.stream
    }

    pub fn seek(&self, origin: SeekOrigin, offset: i64) -> bool {
        self.stream.set_position(origin, offset)
    }

    /// Returns whether every byte was written.
    pub fn write_bytes(&self, data: &[u8]) -> bool {
        self.stream.write_bytes(data).is_complete()
    }

    pub fn write_chars(&self, text: &str) -> bool {
        self.write_bytes(text.as_bytes())
    }

    /// Write `text` as little-endian UTF-16 code units.
    pub fn write_chars_utf16(&self, text: &str) -> bool {
        let bytes: Vec<u8> = text
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        self.write_bytes(&bytes)
    }

    write_le! {
        write_u8 => u8,
        write_i8 => i8,
        write_u16 => u16,
        write_i16 => i16,
        write_u32 => u32,
        write_i32 => i32,
        write_u64 => u64,
        write_i64 => i64,
        write_f32 => f32,
        write_f64 => f64,
    }
}
