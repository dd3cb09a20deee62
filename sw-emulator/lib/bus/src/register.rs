/*++

Licensed under the Apache-2.0 license.

File Name:

    register.rs

Abstract:

    File contains the size-checked register cell used by peripherals.

--*/

use crate::BusError;
use crypto_seq_emu_types::{AhbData, AhbSize};
use tock_registers::{LocalRegisterCopy, RegisterLongName};

/// A register that only accepts word accesses.
pub trait Register {
    fn read(&self, size: AhbSize) -> Result<AhbData, BusError>;

    fn write(&mut self, size: AhbSize, val: AhbData) -> Result<(), BusError>;
}

impl Register for u32 {
    fn read(&self, size: AhbSize) -> Result<AhbData, BusError> {
        match size {
            AhbSize::Word => Ok(*self),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: AhbSize, val: AhbData) -> Result<(), BusError> {
        match size {
            AhbSize::Word => {
                *self = val;
                Ok(())
            }
            _ => Err(BusError::StoreAccessFault),
        }
    }
}

impl<R: RegisterLongName> Register for LocalRegisterCopy<u32, R> {
    fn read(&self, size: AhbSize) -> Result<AhbData, BusError> {
        Register::read(&self.get(), size)
    }

    fn write(&mut self, size: AhbSize, val: AhbData) -> Result<(), BusError> {
        let mut tmp = 0u32;
        Register::write(&mut tmp, size, val)?;
        self.set(tmp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_registers::register_bitfields;

    register_bitfields! [
        u32,
        Ctrl [
            GO OFFSET(0) NUMBITS(1) [],
            MODE OFFSET(4) NUMBITS(2) [],
        ],
    ];

    #[test]
    fn test_word_only() {
        let mut reg = 0u32;
        assert_eq!(Register::write(&mut reg, AhbSize::Word, 0x1234), Ok(()));
        assert_eq!(Register::read(&reg, AhbSize::Word), Ok(0x1234));
        assert_eq!(
            Register::read(&reg, AhbSize::Byte),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            Register::write(&mut reg, AhbSize::HalfWord, 0),
            Err(BusError::StoreAccessFault)
        );
    }

    #[test]
    fn test_local_copy() {
        let mut reg: LocalRegisterCopy<u32, Ctrl::Register> = LocalRegisterCopy::new(0);
        Register::write(&mut reg, AhbSize::Word, 0x21).unwrap();
        assert!(reg.is_set(Ctrl::GO));
        assert_eq!(reg.read(Ctrl::MODE), 2);
        assert_eq!(Register::read(&reg, AhbSize::Word), Ok(0x21));
    }
}
