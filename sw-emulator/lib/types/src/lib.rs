/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the bus access types shared by the emulator crates.

--*/

/// Data carried by one AHB access
pub type AhbData = u32;

/// AHB address, relative to the start of the decoded region
pub type AhbAddr = u32;

/// AHB access size. The operand byte windows take byte accesses; every
/// other register of the engine is word-only.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AhbSize {
    Byte,
    HalfWord,
    Word,
}

impl AhbSize {
    /// Bytes moved by one access of this size.
    pub const fn bytes(self) -> usize {
        match self {
            AhbSize::Byte => 1,
            AhbSize::HalfWord => 2,
            AhbSize::Word => 4,
        }
    }

    /// Mask selecting the bits an access of this size carries.
    pub const fn data_mask(self) -> AhbData {
        match self {
            AhbSize::Byte => 0xff,
            AhbSize::HalfWord => 0xffff,
            AhbSize::Word => 0xffff_ffff,
        }
    }
}

impl TryFrom<usize> for AhbSize {
    type Error = usize;

    /// Fails with the byte count when no single access moves that many.
    fn try_from(bytes: usize) -> Result<Self, Self::Error> {
        match bytes {
            1 => Ok(AhbSize::Byte),
            2 => Ok(AhbSize::HalfWord),
            4 => Ok(AhbSize::Word),
            _ => Err(bytes),
        }
    }
}
