//! Sequential bit-level writer and reader.
//!
//! Bits are packed least-significant-bit first inside each byte, and
//! multi-bit values are written least-significant bit first as well. A value
//! occupies exactly [`BitSerde::bit_length`] bits, so a `bool` costs one bit
//! and an `f32` thirty-two.
//!
//! ```
//! use em5_sync::bit_stream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bit(true);
//! writer.write(&12.5f32);
//! assert_eq!(writer.bit_length(), 33);
//!
//! let bytes = writer.to_bytes();
//! let mut reader = BitReader::new(&bytes);
//! assert!(reader.read_bit().unwrap());
//! assert_eq!(reader.read::<f32>().unwrap(), 12.5);
//! assert_eq!(reader.read_position(), 33);
//! ```

use crate::SyncError;

// ---------------------------------------------------------------------------
// BitSerde
// ---------------------------------------------------------------------------

/// A value with a fixed bit-level encoding.
pub trait BitSerde: Sized {
    /// Append the encoding of `self`.
    fn ser(&self, writer: &mut BitWriter);

    /// Consume one encoded value.
    fn de(reader: &mut BitReader<'_>) -> Result<Self, SyncError>;

    /// Number of bits [`ser`](Self::ser) writes.
    fn bit_length(&self) -> u32;

    /// `true` if `self` and `other` encode to the same bits.
    ///
    /// This is the equality change detection uses, so a NaN equals itself
    /// and `0.0` differs from `-0.0`.
    fn same_encoding(&self, other: &Self) -> bool {
        let mut a = BitWriter::new();
        self.ser(&mut a);
        let mut b = BitWriter::new();
        other.ser(&mut b);
        a.bit_length() == b.bit_length() && a.to_bytes() == b.to_bytes()
    }
}

impl BitSerde for bool {
    fn ser(&self, writer: &mut BitWriter) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader<'_>) -> Result<Self, SyncError> {
        reader.read_bit()
    }

    fn bit_length(&self) -> u32 {
        1
    }

    fn same_encoding(&self, other: &Self) -> bool {
        self == other
    }
}

macro_rules! impl_bit_serde_unsigned {
    ($($ty:ty),*) => {
        $(
            impl BitSerde for $ty {
                fn ser(&self, writer: &mut BitWriter) {
                    writer.write_bits(*self as u64, <$ty>::BITS);
                }

                fn de(reader: &mut BitReader<'_>) -> Result<Self, SyncError> {
                    Ok(reader.read_bits(<$ty>::BITS)? as $ty)
                }

                fn bit_length(&self) -> u32 {
                    <$ty>::BITS
                }

                fn same_encoding(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_bit_serde_unsigned!(u8, u16, u32, u64);

impl BitSerde for i32 {
    fn ser(&self, writer: &mut BitWriter) {
        (*self as u32).ser(writer);
    }

    fn de(reader: &mut BitReader<'_>) -> Result<Self, SyncError> {
        Ok(u32::de(reader)? as i32)
    }

    fn bit_length(&self) -> u32 {
        32
    }

    fn same_encoding(&self, other: &Self) -> bool {
        self == other
    }
}

impl BitSerde for f32 {
    fn ser(&self, writer: &mut BitWriter) {
        self.to_bits().ser(writer);
    }

    fn de(reader: &mut BitReader<'_>) -> Result<Self, SyncError> {
        Ok(f32::from_bits(u32::de(reader)?))
    }

    fn bit_length(&self) -> u32 {
        32
    }

    fn same_encoding(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

// ---------------------------------------------------------------------------
// BitWriter
// ---------------------------------------------------------------------------

/// Growable bit writer.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    bit_length: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: bool) {
        let byte = self.bit_length / 8;
        if byte == self.buffer.len() {
            self.buffer.push(0);
        }
        if bit {
            self.buffer[byte] |= 1 << (self.bit_length % 8);
        }
        self.bit_length += 1;
    }

    /// Write the low `count` bits of `value`, LSB first.
    pub fn write_bits(&mut self, value: u64, count: u32) {
        debug_assert!(count <= 64);
        for i in 0..count {
            self.write_bit((value >> i) & 1 != 0);
        }
    }

    pub fn write<T: BitSerde>(&mut self, value: &T) {
        value.ser(self);
    }

    /// Number of bits written so far.
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// Written bytes; the last byte is zero-padded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

// ---------------------------------------------------------------------------
// BitReader
// ---------------------------------------------------------------------------

/// Bit reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buffer: &'a [u8],
    bit_length: usize,
    read_position: usize,
}

impl<'a> BitReader<'a> {
    /// Read the whole buffer, padding bits included.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            bit_length: buffer.len() * 8,
            read_position: 0,
        }
    }

    /// Read only the first `bit_length` bits of `buffer`.
    pub fn with_bit_length(buffer: &'a [u8], bit_length: usize) -> Self {
        Self {
            buffer,
            bit_length: bit_length.min(buffer.len() * 8),
            read_position: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SyncError> {
        if self.read_position >= self.bit_length {
            return Err(SyncError::StreamExhausted {
                position: self.read_position,
                length: self.bit_length,
            });
        }
        let byte = self.buffer[self.read_position / 8];
        let bit = (byte >> (self.read_position % 8)) & 1 != 0;
        self.read_position += 1;
        Ok(bit)
    }

    /// Read `count` bits, LSB first.
    pub fn read_bits(&mut self, count: u32) -> Result<u64, SyncError> {
        debug_assert!(count <= 64);
        let mut value = 0u64;
        for i in 0..count {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    pub fn read<T: BitSerde>(&mut self) -> Result<T, SyncError> {
        T::de(self)
    }

    /// Number of bits consumed so far.
    pub fn read_position(&self) -> usize {
        self.read_position
    }

    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    pub fn remaining_bits(&self) -> usize {
        self.bit_length - self.read_position
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_packed_lsb_first() {
        let mut writer = BitWriter::new();
        for bit in [false, true, false, true, false, true, false, true] {
            writer.write_bit(bit);
        }
        assert_eq!(writer.as_bytes(), &[0b1010_1010]);
    }

    #[test]
    fn mixed_values_read_back_in_order() {
        let mut writer = BitWriter::new();
        writer.write(&true);
        writer.write(&0xABu8);
        writer.write(&-7i32);
        writer.write(&u64::MAX);
        writer.write(&-0.25f32);
        assert_eq!(writer.bit_length(), 1 + 8 + 32 + 64 + 32);

        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);
        assert!(reader.read::<bool>().unwrap());
        assert_eq!(reader.read::<u8>().unwrap(), 0xAB);
        assert_eq!(reader.read::<i32>().unwrap(), -7);
        assert_eq!(reader.read::<u64>().unwrap(), u64::MAX);
        assert_eq!(reader.read::<f32>().unwrap(), -0.25);
    }

    #[test]
    fn reading_past_the_end_fails() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        let bytes = writer.to_bytes();
        let mut reader = BitReader::with_bit_length(&bytes, 1);
        assert!(reader.read_bit().unwrap());
        assert!(matches!(
            reader.read_bit(),
            Err(SyncError::StreamExhausted { position: 1, length: 1 })
        ));
    }

    #[test]
    fn bit_length_is_clamped_to_buffer() {
        let bytes = [0u8; 2];
        let reader = BitReader::with_bit_length(&bytes, 100);
        assert_eq!(reader.bit_length(), 16);
        assert_eq!(reader.remaining_bits(), 16);
    }

    #[test]
    fn serde_bit_lengths() {
        assert_eq!(true.bit_length(), 1);
        assert_eq!(0u16.bit_length(), 16);
        assert_eq!(1.0f32.bit_length(), 32);
        assert_eq!(0i32.bit_length(), 32);
    }

    #[test]
    fn floats_compare_by_their_bits() {
        assert!(f32::NAN.same_encoding(&f32::NAN));
        assert!(!0.0f32.same_encoding(&-0.0));
        assert!(1.5f32.same_encoding(&1.5));
        assert!(7u16.same_encoding(&7));
        assert!(!true.same_encoding(&false));
    }
}
