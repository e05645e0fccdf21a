//! Bounds-checked little-endian reading over byte slices.
//!
//! All metadata parsing in this crate goes through [`ByteReader`], which
//! refuses to read past the end of its input and reports overruns as
//! [`crate::Error::OutOfBounds`] instead of panicking.

use crate::{Error::OutOfBounds, Result};

/// Primitive integer types readable from a little-endian byte stream.
pub trait LeInt: Sized + Copy {
    /// Size of the encoded value in bytes.
    const SIZE: usize;

    /// Decode from exactly `Self::SIZE` bytes.
    fn from_le(data: &[u8]) -> Self;
}

macro_rules! impl_le_int {
    ($($ty:ty),*) => {
        $(impl LeInt for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn from_le(data: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(&data[..Self::SIZE]);
                <$ty>::from_le_bytes(buf)
            }
        })*
    };
}

impl_le_int!(u8, u16, u32, u64);

/// Sequential reader over a byte slice with an explicit position.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    /// Current position within the input.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Read one little-endian value and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `T::SIZE` bytes remain.
    pub fn read_le<T: LeInt>(&mut self) -> Result<T> {
        if self.remaining() < T::SIZE {
            return Err(OutOfBounds);
        }
        let value = T::from_le(&self.data[self.pos..]);
        self.pos += T::SIZE;
        Ok(value)
    }

    /// Read a table or heap index that is either 2 or 4 bytes wide.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the input is exhausted.
    pub fn read_index(&mut self, wide: bool) -> Result<u32> {
        if wide {
            self.read_le::<u32>()
        } else {
            Ok(u32::from(self.read_le::<u16>()?))
        }
    }

    /// Read `length` raw bytes and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        if self.remaining() < length {
            return Err(OutOfBounds);
        }
        let slice = &self.data[self.pos..self.pos + length];
        self.pos += length;
        Ok(slice)
    }

    /// Skip `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the skip would run past the end.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if self.remaining() < step {
            return Err(OutOfBounds);
        }
        self.pos += step;
        Ok(())
    }

    /// Jump to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the end.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }
        self.pos = pos;
        Ok(())
    }
}
