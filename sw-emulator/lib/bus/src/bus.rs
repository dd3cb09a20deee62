/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    File contains definition of the Bus trait.

--*/

use crypto_seq_emu_types::{AhbAddr, AhbData, AhbSize};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusError {
    /// Load address misaligned
    LoadAddrMisaligned,

    /// Load access fault
    LoadAccessFault,

    /// Store address misaligned
    StoreAddrMisaligned,

    /// Store access fault
    StoreAccessFault,
}

/// Represents an abstract memory bus. Used to read and write peripheral
/// registers.
pub trait Bus {
    /// Read data of specified size from given address
    ///
    /// # Error
    ///
    /// * `BusError::LoadAccessFault` or `BusError::LoadAddrMisaligned`
    fn read(&mut self, size: AhbSize, addr: AhbAddr) -> Result<AhbData, BusError>;

    /// Write data of specified size to given address
    ///
    /// # Error
    ///
    /// * `BusError::StoreAccessFault` or `BusError::StoreAddrMisaligned`
    fn write(&mut self, size: AhbSize, addr: AhbAddr, val: AhbData) -> Result<(), BusError>;

    /// Called by the clock when a timer action scheduled by this device
    /// fires.
    fn poll(&mut self) {}

    /// Return the device to its power-on state.
    fn warm_reset(&mut self) {}
}

impl<T: Bus + ?Sized> Bus for Box<T> {
    fn read(&mut self, size: AhbSize, addr: AhbAddr) -> Result<AhbData, BusError> {
        (**self).read(size, addr)
    }
    fn write(&mut self, size: AhbSize, addr: AhbAddr, val: AhbData) -> Result<(), BusError> {
        (**self).write(size, addr, val)
    }
    fn poll(&mut self) {
        (**self).poll()
    }
    fn warm_reset(&mut self) {
        (**self).warm_reset()
    }
}
