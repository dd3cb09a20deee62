// Licensed under the Apache-2.0 license

use std::cell::RefCell;

use crypto_seq_emu_bus::Bus;
use crypto_seq_emu_types::AhbSize;
use crypto_seq_registers::Mmio;

/// An MMIO implementation that reads and writes to a `crypto_seq_emu_bus::Bus`.
/// Offsets are relative to the start of the bus.
pub struct BusMmio<TBus: Bus> {
    bus: RefCell<TBus>,
}

impl<TBus: Bus> BusMmio<TBus> {
    pub fn new(bus: TBus) -> Self {
        Self {
            bus: RefCell::new(bus),
        }
    }

    pub fn into_inner(self) -> TBus {
        self.bus.into_inner()
    }
}

impl<TBus: Bus> Mmio for BusMmio<TBus> {
    /// Loads the word at `offset`.
    ///
    /// # Panics
    ///
    /// This function panics if the bus faults.
    fn read_u32(&self, offset: u32) -> u32 {
        match self.bus.borrow_mut().read(AhbSize::Word, offset) {
            Ok(val) => val,
            Err(err) => panic!("BusMmio: read at {offset:#x} faulted: {err:?}"),
        }
    }

    /// Stores `val` to the word at `offset`.
    ///
    /// # Panics
    ///
    /// This function panics if the bus faults.
    fn write_u32(&self, offset: u32, val: u32) {
        if let Err(err) = self.bus.borrow_mut().write(AhbSize::Word, offset, val) {
            panic!("BusMmio: write of {val:#x} at {offset:#x} faulted: {err:?}");
        }
    }
}
