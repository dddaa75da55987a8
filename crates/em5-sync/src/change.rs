//! Per-field change detection against the last sent snapshot.
//!
//! A [`ChangeDetector`] stores the live value read this cycle next to the
//! value the receiver last got. Values are compared by their wire encoding
//! ([`BitSerde::same_encoding`]), so a NaN that was sent once is not sent
//! again. `changed` is recomputed on every
//! [`observe`](ChangeDetector::observe) and cleared by
//! [`commit`](ChangeDetector::commit), which the owning item calls once the
//! value has been written.

use crate::bit_stream::{BitReader, BitSerde, BitWriter};
use crate::SyncError;

/// One replicated field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeDetector<T> {
    current: T,
    last_sent: T,
    changed: bool,
}

impl<T> ChangeDetector<T>
where
    T: BitSerde + Clone,
{
    /// A detector whose snapshot already equals `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            current: initial.clone(),
            last_sent: initial,
            changed: false,
        }
    }

    /// Store the live value and recompute the changed flag.
    ///
    /// Observing the same value twice yields the same answer: nothing is
    /// consumed until [`commit`](Self::commit).
    pub fn observe(&mut self, value: T) -> bool {
        self.current = value;
        self.changed = !self.current.same_encoding(&self.last_sent);
        self.changed
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn last_sent(&self) -> &T {
        &self.last_sent
    }

    /// Write `[changed bit][value if changed]`. `force` sets the bit.
    pub fn write(&self, writer: &mut BitWriter, force: bool) {
        let changed = force || self.changed;
        writer.write_bit(changed);
        if changed {
            writer.write(&self.current);
        }
    }

    /// The value was sent: the snapshot converges to it.
    pub fn commit(&mut self) {
        self.last_sent = self.current.clone();
        self.changed = false;
    }

    /// Read the mirror image of [`write`](Self::write): `Some` when the
    /// changed bit was set.
    pub fn read(reader: &mut BitReader<'_>) -> Result<Option<T>, SyncError> {
        if reader.read_bit()? {
            Ok(Some(reader.read()?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_compares_against_last_sent() {
        let mut field = ChangeDetector::new(10.0f32);
        assert!(!field.observe(10.0));
        assert!(field.observe(12.0));
        // Going back to the sent value clears the flag again.
        assert!(!field.observe(10.0));
    }

    #[test]
    fn observe_is_idempotent_until_commit() {
        let mut field = ChangeDetector::new(false);
        assert!(field.observe(true));
        assert!(field.observe(true));
        field.commit();
        assert!(!field.is_changed());
        assert!(!field.observe(true));
        assert!(*field.last_sent());
    }

    #[test]
    fn unchanged_field_writes_one_bit() {
        let field = ChangeDetector::new(3u32);
        let mut writer = BitWriter::new();
        field.write(&mut writer, false);
        assert_eq!(writer.bit_length(), 1);

        let mut forced = BitWriter::new();
        field.write(&mut forced, true);
        assert_eq!(forced.bit_length(), 33);
    }

    #[test]
    fn nan_is_sent_once() {
        let mut field = ChangeDetector::new(1.0f32);
        assert!(field.observe(f32::NAN));
        field.commit();
        assert!(!field.observe(f32::NAN));
        assert!(!field.observe(f32::NAN));
        assert!(field.observe(-0.0));
        field.commit();
        assert!(field.observe(0.0), "sign of zero reaches the receiver");
    }

    #[test]
    fn write_then_read() {
        let mut field = ChangeDetector::new(0u16);
        field.observe(513);
        let mut writer = BitWriter::new();
        field.write(&mut writer, false);
        ChangeDetector::new(0u16).write(&mut writer, false);

        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(ChangeDetector::<u16>::read(&mut reader).unwrap(), Some(513));
        assert_eq!(ChangeDetector::<u16>::read(&mut reader).unwrap(), None);
    }
}
