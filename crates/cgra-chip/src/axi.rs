//! AXI bus constants for the CGRA configuration port.
//!
//! ```text
//! Transfer  4 bytes (one 32-bit beat)
//! Burst     at most 256 beats
//! Boundary  bursts must not cross a 4096-byte aligned address
//! ```

/// Maximum number of transfers in one AXI burst.
pub const MAX_TRANSACTION_LENGTH: usize = 256;

/// Crossing this byte-address boundary inside one burst is prohibited.
pub const TRANSACTION_BOUNDARY: u32 = 4096;

/// Size of one transfer in bytes.
pub const TRANSFER_SIZE: u32 = 4;

/// Bytes of address space decoded by the configuration port
/// (target class + target ID + offset, word addressed).
pub const ADDRESS_SPACE_SIZE: usize = 1 << 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_whole_number_of_transfers() {
        assert_eq!(TRANSACTION_BOUNDARY % TRANSFER_SIZE, 0);
    }

    #[test]
    fn address_space_covers_all_fields() {
        let bits = crate::addr::TARGET_CLASS_WIDTH
            + crate::addr::TARGET_ID_WIDTH
            + crate::addr::OFFSET_WIDTH
            + crate::addr::SYSTEM_ADDR_OFFSET;
        assert_eq!(ADDRESS_SPACE_SIZE, 1 << bits);
    }
}
