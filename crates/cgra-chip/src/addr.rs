//! Bus address layout of the CGRA configuration port.
//!
//! ```text
//!  15  14 13      10 9             2 1  0
//! ┌──────┬──────────┬───────────────┬─────┐
//! │class │ target id│    offset     │ 0 0 │
//! └──────┴──────────┴───────────────┴─────┘
//!   2 b      4 b          8 b         2 b
//! ```
//!
//! The CGRA decodes word addresses; the trailing two bits turn them into
//! 4-byte aligned byte addresses for the AXI master.

use crate::regs::RunState;
use std::fmt;

/// Width of the target class field.
pub const TARGET_CLASS_WIDTH: u32 = 2;
/// Width of the target ID field (PE, other resource, register or parameter ID).
pub const TARGET_ID_WIDTH: u32 = 4;
/// Width of the offset field (e.g. the context entry index).
pub const OFFSET_WIDTH: u32 = 8;
/// Shift turning a CGRA word address into an AXI byte address.
pub const SYSTEM_ADDR_OFFSET: u32 = 2;
/// Position of the run state inside a state word (the ccnt width).
pub const STATE_DATA_OFFSET: u32 = 8;

const TARGET_CLASS_MASK: u32 = (1 << TARGET_CLASS_WIDTH) - 1;
const TARGET_ID_MASK: u32 = (1 << TARGET_ID_WIDTH) - 1;
const OFFSET_MASK: u32 = (1 << OFFSET_WIDTH) - 1;
const STATE_PAYLOAD_MASK: u32 = (1 << STATE_DATA_OFFSET) - 1;

/// What kind of CGRA entity a write is aimed at.
///
/// Order matters, do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TargetClass {
    /// Processing element contexts (and their log contexts).
    ProcessingElement = 0,
    /// Parameters, addressed by CGRA internal ID.
    Parameter = 1,
    /// Control unit, C-box, sensor, actor, OCM, global log, IDC, constants.
    Other = 2,
    /// Single configuration registers.
    SingleRegister = 3,
}

impl TargetClass {
    /// All classes in wire order.
    pub const ALL: [Self; 4] = [
        Self::ProcessingElement,
        Self::Parameter,
        Self::Other,
        Self::SingleRegister,
    ];

    /// Decode a class from its (masked) field value.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & TARGET_CLASS_MASK {
            0 => Self::ProcessingElement,
            1 => Self::Parameter,
            2 => Self::Other,
            _ => Self::SingleRegister,
        }
    }
}

/// A 4-byte aligned AXI byte address on the configuration port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusAddress(u32);

impl BusAddress {
    /// Pack `(class, target_id, offset)` into a bus address.
    ///
    /// `target_id` must fit 4 bits and `offset` 8 bits. Wider values are
    /// truncated to the field width (debug builds assert instead).
    #[must_use]
    pub fn encode(class: TargetClass, target_id: u32, offset: u32) -> Self {
        debug_assert!(
            target_id <= TARGET_ID_MASK,
            "target id {target_id} exceeds {TARGET_ID_WIDTH}-bit field"
        );
        debug_assert!(
            offset <= OFFSET_MASK,
            "offset {offset} exceeds {OFFSET_WIDTH}-bit field"
        );

        let mut word = (class as u32) << (OFFSET_WIDTH + TARGET_ID_WIDTH);
        word |= (target_id & TARGET_ID_MASK) << OFFSET_WIDTH;
        word |= offset & OFFSET_MASK;
        Self(word << SYSTEM_ADDR_OFFSET)
    }

    /// Wrap a raw byte address.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw byte address as sent on the bus.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Target class field.
    #[must_use]
    pub const fn target_class(self) -> TargetClass {
        TargetClass::from_bits(self.word() >> (OFFSET_WIDTH + TARGET_ID_WIDTH))
    }

    /// Target ID field.
    #[must_use]
    pub const fn target_id(self) -> u32 {
        (self.word() >> OFFSET_WIDTH) & TARGET_ID_MASK
    }

    /// Offset field.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.word() & OFFSET_MASK
    }

    /// Address `entries` offset steps further on.
    ///
    /// Each entry occupies one offset step, however many transfers it takes.
    /// The offset field sits at the bottom of the address, so a plain add is
    /// enough.
    #[must_use]
    pub const fn advance(self, entries: u32) -> Self {
        Self(self.0.wrapping_add(entries.wrapping_mul(crate::axi::TRANSFER_SIZE)))
    }

    const fn word(self) -> u32 {
        self.0 >> SYSTEM_ADDR_OFFSET
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Build the data word for the state change register.
///
/// The run state lives above the 8-bit payload (the context start address).
#[must_use]
pub fn encode_state(state: RunState, payload: u32) -> u32 {
    debug_assert!(
        payload <= STATE_PAYLOAD_MASK,
        "state payload {payload} exceeds {STATE_DATA_OFFSET}-bit field"
    );
    ((state as u32) << STATE_DATA_OFFSET) | (payload & STATE_PAYLOAD_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip_exhaustive() {
        for class in TargetClass::ALL {
            for id in 0..=TARGET_ID_MASK {
                for offset in 0..=OFFSET_MASK {
                    let addr = BusAddress::encode(class, id, offset);
                    assert_eq!(addr.target_class(), class);
                    assert_eq!(addr.target_id(), id);
                    assert_eq!(addr.offset(), offset);
                    assert_eq!(addr.raw() % crate::axi::TRANSFER_SIZE, 0);
                }
            }
        }
    }

    #[test]
    fn known_addresses() {
        assert_eq!(BusAddress::encode(TargetClass::ProcessingElement, 0, 0).raw(), 0);
        // SingleRegister / IntervalLength (7)
        assert_eq!(
            BusAddress::encode(TargetClass::SingleRegister, 7, 0).raw(),
            (3 << 14) | (7 << 10)
        );
        assert_eq!(BusAddress::encode(TargetClass::Parameter, 2, 1).raw(), 0x4804);
    }

    #[test]
    fn advance_moves_one_transfer_per_entry() {
        let addr = BusAddress::encode(TargetClass::Other, 3, 0);
        let next = addr.advance(5);
        assert_eq!(next.offset(), 5);
        assert_eq!(next.target_id(), 3);
        assert_eq!(next.raw() - addr.raw(), 20);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn oversized_fields_are_truncated() {
        let addr = BusAddress::encode(TargetClass::Parameter, 0x13, 0x1FF);
        assert_eq!(addr.target_id(), 0x3);
        assert_eq!(addr.offset(), 0xFF);
        assert_eq!(addr.target_class(), TargetClass::Parameter);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exceeds 4-bit field")]
    fn oversized_target_id_asserts_in_debug() {
        let _ = BusAddress::encode(TargetClass::Parameter, 16, 0);
    }

    #[test]
    fn state_word_layout() {
        assert_eq!(encode_state(RunState::Paused, 0), 0x000);
        assert_eq!(encode_state(RunState::Running, 0), 0x100);
        assert_eq!(encode_state(RunState::Stopped, 0), 0x200);
        assert_eq!(encode_state(RunState::RunningHybrid, 0x12), 0x312);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(BusAddress::from_raw(0x4804).to_string(), "0x4804");
    }
}
