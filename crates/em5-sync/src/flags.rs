//! Typed bit sets over closed flag enums.
//!
//! Game state such as "burning" or "gangster is armed" is replicated as a
//! raw `u32`. Each flag enum fixes its bit position explicitly, so the wire
//! layout never depends on declaration order.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::bit_stream::{BitReader, BitSerde, BitWriter};
use crate::SyncError;

/// A flag enum usable in a [`FlagSet`].
pub trait Flag: Copy + fmt::Debug + 'static {
    /// Every variant, used for formatting.
    const ALL: &'static [Self];

    /// Bit position, `0..32`.
    fn bit(self) -> u32;
}

/// A set of `F` flags stored as a `u32`.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet<F> {
    bits: u32,
    #[serde(skip)]
    _flag: PhantomData<F>,
}

impl<F: Flag> FlagSet<F> {
    pub const fn empty() -> Self {
        Self {
            bits: 0,
            _flag: PhantomData,
        }
    }

    /// Rebuild from the raw wire value.
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            bits,
            _flag: PhantomData,
        }
    }

    pub const fn bits(&self) -> u32 {
        self.bits
    }

    pub fn is_set(&self, flag: F) -> bool {
        self.bits & Self::mask(flag) != 0
    }

    pub fn set(&mut self, flag: F, enabled: bool) {
        if enabled {
            self.bits |= Self::mask(flag);
        } else {
            self.bits &= !Self::mask(flag);
        }
    }

    pub fn invert(&mut self, flag: F) {
        self.bits ^= Self::mask(flag);
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, flag: F) -> Self {
        self.set(flag, true);
        self
    }

    /// Flags currently set, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(move |f| self.is_set(*f))
    }

    fn mask(flag: F) -> u32 {
        debug_assert!(flag.bit() < 32, "flag {flag:?} out of range");
        1 << flag.bit()
    }
}

impl<F> Clone for FlagSet<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for FlagSet<F> {}

impl<F> PartialEq for FlagSet<F> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<F> Eq for FlagSet<F> {}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: Flag> fmt::Debug for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<F: Flag> BitSerde for FlagSet<F> {
    fn ser(&self, writer: &mut BitWriter) {
        writer.write(&self.bits);
    }

    fn de(reader: &mut BitReader<'_>) -> Result<Self, SyncError> {
        Ok(Self::from_bits(reader.read()?))
    }

    fn bit_length(&self) -> u32 {
        32
    }

    fn same_encoding(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Light {
        Red,
        Blue,
    }

    impl Flag for Light {
        const ALL: &'static [Self] = &[Light::Red, Light::Blue];

        fn bit(self) -> u32 {
            match self {
                Light::Red => 0,
                Light::Blue => 5,
            }
        }
    }

    #[test]
    fn set_invert_clear() {
        let mut lights = FlagSet::<Light>::empty();
        lights.set(Light::Blue, true);
        assert_eq!(lights.bits(), 1 << 5);
        assert!(lights.is_set(Light::Blue));
        assert!(!lights.is_set(Light::Red));

        lights.invert(Light::Red);
        lights.invert(Light::Blue);
        assert_eq!(lights.iter().collect::<Vec<_>>(), vec![Light::Red]);

        lights.set(Light::Red, false);
        assert!(lights.is_empty());
        lights.invert(Light::Red);
        lights.clear();
        assert!(lights.is_empty());
    }

    #[test]
    fn debug_lists_set_flags() {
        let lights = FlagSet::empty().with(Light::Red).with(Light::Blue);
        assert_eq!(format!("{lights:?}"), "{Red, Blue}");
    }

    #[test]
    fn raw_bits_survive_the_wire() {
        let lights = FlagSet::<Light>::from_bits(0b10_0001);
        let mut writer = BitWriter::new();
        writer.write(&lights);
        let bytes = writer.to_bytes();
        let decoded: FlagSet<Light> = BitReader::new(&bytes).read().unwrap();
        assert_eq!(decoded, lights);
        assert!(decoded.is_set(Light::Blue));
    }
}
