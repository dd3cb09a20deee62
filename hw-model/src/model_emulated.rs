// Licensed under the Apache-2.0 license

use std::cell::RefCell;
use std::rc::Rc;

use crypto_seq_emu_bus::{Bus, BusError, Clock};
use crypto_seq_emu_periph::Crypto;
use crypto_seq_emu_types::{AhbAddr, AhbData, AhbSize};

use crate::mmio::BusMmio;

/// The emulated engine with its clock. Every bus access takes one clock
/// tick, so a driver polling the status registers sees the engine advance.
pub struct ModelEmulated {
    clock: Clock,
    crypto: Crypto,
}

impl Default for ModelEmulated {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelEmulated {
    pub fn new() -> Self {
        let clock = Clock::new();
        let crypto = Crypto::new(&clock);
        Self { clock, crypto }
    }

    pub fn crypto(&self) -> &Crypto {
        &self.crypto
    }

    pub fn crypto_mut(&mut self) -> &mut Crypto {
        &mut self.crypto
    }

    pub fn irq_pending(&self) -> bool {
        self.crypto.irq_pending()
    }

    /// Advances the clock by one tick.
    pub fn step(&mut self) {
        self.clock.increment_and_poll(1, &mut self.crypto);
    }

    /// Steps until `predicate` holds, at most `max_ticks` times. Returns
    /// whether it held.
    pub fn step_until(&mut self, mut predicate: impl FnMut(&Self) -> bool, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            if predicate(self) {
                return true;
            }
            self.step();
        }
        predicate(self)
    }

    /// Resets the peripheral, as the platform would after a fault.
    pub fn reset(&mut self) {
        log::info!("model: peripheral reset at tick {}", self.clock.now());
        self.crypto.warm_reset();
    }
}

impl Bus for ModelEmulated {
    fn read(&mut self, size: AhbSize, addr: AhbAddr) -> Result<AhbData, BusError> {
        let result = self.crypto.read(size, addr);
        self.step();
        result
    }

    fn write(&mut self, size: AhbSize, addr: AhbAddr, val: AhbData) -> Result<(), BusError> {
        let result = self.crypto.write(size, addr, val);
        self.step();
        result
    }

    fn warm_reset(&mut self) {
        self.reset();
    }
}

/// A [`ModelEmulated`] shared between the driver's MMIO and the test, which
/// needs it to attach DMA streams and deliver interrupts.
#[derive(Clone, Default)]
pub struct SharedModel(Rc<RefCell<ModelEmulated>>);

impl SharedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mmio(&self) -> BusMmio<SharedModel> {
        BusMmio::new(self.clone())
    }

    /// Runs `f` on the model. Must not be called from inside an MMIO
    /// access.
    pub fn with<R>(&self, f: impl FnOnce(&mut ModelEmulated) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl Bus for SharedModel {
    fn read(&mut self, size: AhbSize, addr: AhbAddr) -> Result<AhbData, BusError> {
        self.0.borrow_mut().read(size, addr)
    }

    fn write(&mut self, size: AhbSize, addr: AhbAddr, val: AhbData) -> Result<(), BusError> {
        self.0.borrow_mut().write(size, addr, val)
    }

    fn warm_reset(&mut self) {
        self.0.borrow_mut().reset();
    }
}
