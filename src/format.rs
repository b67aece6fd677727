//! C3D wire format constants and block arithmetic.
//!
//! A C3D file is addressed in fixed 512-byte blocks, numbered from 1.
//! Block 1 is the header, the parameter directory starts at the block the
//! header names, and point data starts at the block the directory names.

/// Size of one addressing block in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Key byte identifying the parameter section. Appears at byte 1 of the
/// header and byte 1 of the directory prologue.
pub const PARAM_SECTION_KEY: u8 = 0x50;

/// Reserved first byte of the directory prologue.
pub const PROLOGUE_RESERVED: u8 = 0x01;

/// Processor type byte of the directory prologue. 84 marks Intel byte
/// order, the only convention this library reads or writes.
pub const PROCESSOR_INTEL: u8 = 84;

/// Size of the directory prologue in bytes.
pub const PROLOGUE_SIZE: usize = 4;

/// Size of the all-zero entry that terminates the directory chain:
/// name length, group id, two offset bytes, description length.
pub const TERMINATOR_SIZE: usize = 5;

/// Value of the header word that flags 4-character event label support.
pub const EVENT_LABEL_SENTINEL: u16 = 12345;

/// Byte offset of a 1-based block index. Block 0 does not exist and maps
/// to offset 0.
#[inline]
pub const fn block_to_offset(block: u16) -> u64 {
    (block as u64).saturating_sub(1) * BLOCK_SIZE as u64
}

/// Number of blocks needed to hold `len` bytes.
#[inline]
pub const fn blocks_spanned(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE)
}
