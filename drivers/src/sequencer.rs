/*++

Licensed under the Apache-2.0 license.

File Name:

    sequencer.rs

Abstract:

    File contains the exclusive ownership of the engine and the session
    through which callers configure, load and run sequences.

--*/

use core::cell::RefCell;

use critical_section::Mutex;
use crypto_seq_error::{CryptoError, CryptoResult};
use crypto_seq_registers::crypto::{offset, CryptoRegs, CMD, CRYPTO_BASE_ADDR, CTRL, WAC};
use crypto_seq_registers::{Mmio, RealMmio};

use crate::completion::{self, acknowledge_flags, disable_interrupts, CompletionCallback, WaitFor};
use crate::config::{CompletionMode, ExecutionConfig, PrimitiveVariant};
use crate::controller::{Controller, States};
use crate::encoder::{self, Request};
use crate::instruction::Instruction;
use crate::loader;
use crate::operand::{self, Endianness, OperandBuf, OperandSlot, SlotMask};
use crate::printer::HexBytes;
use crate::sequence::{Iteration, Sequence};
use crate::status::ExecutionStatus;
use crate::cprintln;

/// Polls granted to a directly executed instruction.
const EXECUTE_POLLS: u32 = 10_000;

/// Exclusive right to touch the engine registers. At most one exists per
/// [`Sequencer`].
pub struct EngineHandle<M: Mmio> {
    regs: CryptoRegs<M>,
}

impl<M: Mmio> EngineHandle<M> {
    pub fn regs(&self) -> &CryptoRegs<M> {
        &self.regs
    }
}

enum Slot<M: Mmio> {
    Free(EngineHandle<M>),
    /// Held by a session or a raw `claim()`
    Claimed,
    /// Parked until the completion interrupt
    Armed {
        handle: EngineHandle<M>,
        wait_for: WaitFor,
        callback: CompletionCallback,
    },
    Completed {
        handle: EngineHandle<M>,
        status: ExecutionStatus,
    },
    /// A session timed out; nothing may run until `recover()`
    Faulted(EngineHandle<M>),
}

/// Owner of the engine. Sessions borrow the engine handle from here and
/// the completion interrupt reaches parked handles through it.
pub struct Sequencer<M: Mmio> {
    slot: Mutex<RefCell<Slot<M>>>,
}

impl Sequencer<RealMmio> {
    /// The engine at its silicon address.
    ///
    /// # Safety
    ///
    /// Only one instance may exist.
    pub const unsafe fn silicon() -> Self {
        Self::new(RealMmio::new(CRYPTO_BASE_ADDR))
    }
}

impl<M: Mmio> Sequencer<M> {
    pub const fn new(mmio: M) -> Self {
        Self {
            slot: Mutex::new(RefCell::new(Slot::Free(EngineHandle {
                regs: CryptoRegs::new(mmio),
            }))),
        }
    }

    pub fn session(&self) -> Session<'_, M> {
        Session {
            sequencer: self,
            handle: None,
            controller: Controller::new(),
            config: None,
            loaded: None,
            awaiting: false,
        }
    }

    /// Takes the engine handle for raw register access.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_ENGINE_BUSY` - Another holder has the engine
    /// * `DRIVER_CRYPTO_ENGINE_FAULTED` - A timed out session poisoned the
    ///   engine
    pub fn claim(&self) -> CryptoResult<EngineHandle<M>> {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            match core::mem::replace(&mut *slot, Slot::Claimed) {
                Slot::Free(handle) => Ok(handle),
                Slot::Faulted(handle) => {
                    *slot = Slot::Faulted(handle);
                    Err(CryptoError::DRIVER_CRYPTO_ENGINE_FAULTED)
                }
                other => {
                    *slot = other;
                    Err(CryptoError::DRIVER_CRYPTO_ENGINE_BUSY)
                }
            }
        })
    }

    pub fn release(&self, handle: EngineHandle<M>) {
        self.put(Slot::Free(handle));
    }

    pub(crate) fn poison(&self, handle: EngineHandle<M>) {
        self.put(Slot::Faulted(handle));
    }

    pub fn is_faulted(&self) -> bool {
        critical_section::with(|cs| matches!(*self.slot.borrow_ref(cs), Slot::Faulted(_)))
    }

    /// Frees a poisoned engine. Call after the peripheral has been reset.
    /// Returns false when the engine was not poisoned.
    pub fn recover(&self) -> bool {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            match core::mem::replace(&mut *slot, Slot::Claimed) {
                Slot::Faulted(handle) => {
                    *slot = Slot::Free(handle);
                    true
                }
                other => {
                    *slot = other;
                    false
                }
            }
        })
    }

    /// Completion interrupt entry point. Runs the parked callback exactly
    /// once, when the awaited event has happened.
    pub fn on_interrupt(&self) {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            let status = match &*slot {
                Slot::Armed {
                    handle, wait_for, ..
                } => {
                    let status = ExecutionStatus::sample(handle.regs());
                    if !wait_for.is_done(&status) {
                        return;
                    }
                    status
                }
                _ => return,
            };
            if let Slot::Armed {
                handle, callback, ..
            } = core::mem::replace(&mut *slot, Slot::Claimed)
            {
                disable_interrupts(handle.regs());
                acknowledge_flags(handle.regs());
                *slot = Slot::Completed { handle, status };
                callback(status);
            }
        })
    }

    pub(crate) fn arm(
        &self,
        handle: EngineHandle<M>,
        wait_for: WaitFor,
        callback: CompletionCallback,
    ) {
        critical_section::with(|cs| {
            handle.regs().write_int_enable(wait_for.interrupts());
            *self.slot.borrow_ref_mut(cs) = Slot::Armed {
                handle,
                wait_for,
                callback,
            };
        })
    }

    pub(crate) fn take_completed(&self) -> Option<(EngineHandle<M>, ExecutionStatus)> {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            match core::mem::replace(&mut *slot, Slot::Claimed) {
                Slot::Completed { handle, status } => Some((handle, status)),
                other => {
                    *slot = other;
                    None
                }
            }
        })
    }

    /// Pulls a parked handle back, with the status if the interrupt has
    /// already completed it.
    pub(crate) fn disarm(&self) -> Option<(EngineHandle<M>, Option<ExecutionStatus>)> {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            match core::mem::replace(&mut *slot, Slot::Claimed) {
                Slot::Armed { handle, .. } => {
                    disable_interrupts(handle.regs());
                    Some((handle, None))
                }
                Slot::Completed { handle, status } => Some((handle, Some(status))),
                other => {
                    *slot = other;
                    None
                }
            }
        })
    }

    fn put(&self, state: Slot<M>) {
        critical_section::with(|cs| *self.slot.borrow_ref_mut(cs) = state);
    }
}

fn engine<M: Mmio>(handle: &Option<EngineHandle<M>>) -> CryptoResult<&CryptoRegs<M>> {
    handle
        .as_ref()
        .map(EngineHandle::regs)
        .ok_or(CryptoError::DRIVER_CRYPTO_ENGINE_BUSY)
}

/// Clears every key and operand register and returns the control
/// registers to their reset values.
fn zeroize_engine<M: Mmio>(regs: &CryptoRegs<M>) {
    // Full key width so all eight key words are reachable.
    regs.write_ctrl(CTRL::AES::AES256);
    operand::rewind(regs);
    for _ in 0..8 {
        regs.write_window(offset::KEYBUF, 0);
        regs.write_window(offset::KEY, 0);
    }
    for window in offset::DDATA {
        for _ in 0..8 {
            regs.write_window(window, 0);
        }
    }
    regs.write_window(offset::DDATA0BYTE32, 0);
    disable_interrupts(regs);
    acknowledge_flags(regs);
    regs.write_wac(WAC::MODULUS::BIN256);
    regs.write_ctrl(CTRL::AES::AES128);
}

/// A caller's exclusive use of the engine.
///
/// The first call that touches hardware claims the engine; it stays
/// claimed across completions and halts until [`Session::release`] or drop,
/// so results can still be read back. Dropping a session stops any
/// running sequence and zeroizes keys and operands. A session whose wait
/// timed out is [`States::Discarded`]: every call fails and dropping it
/// leaves the engine poisoned until [`Sequencer::recover`].
pub struct Session<'a, M: Mmio> {
    sequencer: &'a Sequencer<M>,
    handle: Option<EngineHandle<M>>,
    controller: Controller,
    config: Option<ExecutionConfig>,
    loaded: Option<Iteration>,
    /// The handle is parked with the sequencer for an interrupt wait
    awaiting: bool,
}

impl<M: Mmio> Session<'_, M> {
    pub fn state(&self) -> States {
        self.controller.state()
    }

    pub fn config(&self) -> Option<&ExecutionConfig> {
        self.config.as_ref()
    }

    fn claim(&mut self) -> CryptoResult<()> {
        self.controller.check_usable()?;
        if self.awaiting {
            return Err(CryptoError::DRIVER_CRYPTO_ENGINE_BUSY);
        }
        if self.handle.is_none() {
            self.handle = Some(self.sequencer.claim()?);
        }
        Ok(())
    }

    fn configured(&mut self) -> CryptoResult<ExecutionConfig> {
        self.claim()?;
        self.config.ok_or(CryptoError::DRIVER_CRYPTO_NOT_CONFIGURED)
    }

    fn wait_for(&self) -> WaitFor {
        if self.controller.stepping() {
            WaitFor::Instruction
        } else {
            WaitFor::Sequence
        }
    }

    /// Without bus stalls the engine drops operand writes while it runs
    /// freely.
    fn check_writable(&self, slot: OperandSlot) -> CryptoResult<()> {
        self.check_slot(slot)?;
        let stalls = self
            .config
            .is_some_and(|config| config.completion == CompletionMode::Blocking);
        if self.controller.state() == States::Running && !self.controller.stepping() && !stalls {
            return Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING);
        }
        Ok(())
    }

    /// DMA channels own their target slots while a sequence is in flight.
    fn check_slot(&self, slot: OperandSlot) -> CryptoResult<()> {
        let owned = match self.config {
            Some(config) if self.controller.is_busy() => config.dma.owned(),
            _ => SlotMask::empty(),
        };
        if owned.intersects(slot.storage()) {
            return Err(CryptoError::DRIVER_CRYPTO_SLOT_DMA_OWNED);
        }
        Ok(())
    }

    /// Programs field mode, widths, primitive variant and DMA coupling.
    /// Any previously loaded sequence must be loaded again.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_CONFIG_LOCKED_WHILE_RUNNING` - A sequence is running
    ///   or halted
    /// * `DRIVER_CRYPTO_INCOMPATIBLE_CONFIG` - Unsupported combination
    /// * `DRIVER_CRYPTO_ENGINE_BUSY` - Another session holds the engine
    pub fn configure(&mut self, config: ExecutionConfig) -> CryptoResult<()> {
        self.controller.check_usable()?;
        if self.controller.is_busy() {
            return Err(CryptoError::DRIVER_CRYPTO_CONFIG_LOCKED_WHILE_RUNNING);
        }
        config.validate()?;
        self.claim()?;
        let regs = engine(&self.handle)?;
        regs.write_ctrl(config.ctrl());
        regs.write_wac(config.wac());
        self.config = Some(config);
        self.loaded = None;
        Ok(())
    }

    /// Loads the AES key, least significant byte first.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_UNSUPPORTED_OPERATION` - The configured variant is
    ///   not AES
    /// * `DRIVER_CRYPTO_INVALID_WIDTH` - The key length does not match the
    ///   variant
    pub fn write_key(&mut self, key: &[u8]) -> CryptoResult<()> {
        let config = self.configured()?;
        if self.controller.is_busy() {
            return Err(CryptoError::DRIVER_CRYPTO_CONFIG_LOCKED_WHILE_RUNNING);
        }
        let len = config
            .variant
            .and_then(PrimitiveVariant::key_len)
            .ok_or(CryptoError::DRIVER_CRYPTO_UNSUPPORTED_OPERATION)?;
        if key.len() != len {
            return Err(CryptoError::DRIVER_CRYPTO_INVALID_WIDTH);
        }
        let regs = engine(&self.handle)?;
        operand::rewind(regs);
        for chunk in key.chunks_exact(4) {
            regs.write_window(
                offset::KEYBUF,
                u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            );
        }
        Ok(())
    }

    /// Replaces the slot contents with the number `bytes` encodes, zero
    /// extended to the slot width.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_INVALID_WIDTH` - More bytes than the slot holds
    /// * `DRIVER_CRYPTO_SLOT_DMA_OWNED` - A running DMA channel feeds the
    ///   slot
    /// * `DRIVER_CRYPTO_ALREADY_RUNNING` - The sequence runs without bus
    ///   stalls, so the engine would drop the write
    pub fn write_operand(
        &mut self,
        slot: OperandSlot,
        bytes: &[u8],
        endianness: Endianness,
    ) -> CryptoResult<()> {
        self.configured()?;
        self.check_writable(slot)?;
        operand::write(engine(&self.handle)?, slot, bytes, endianness)
    }

    /// XORs little-endian `bytes` into the slot.
    pub fn write_operand_xor(&mut self, slot: OperandSlot, bytes: &[u8]) -> CryptoResult<()> {
        self.configured()?;
        self.check_writable(slot)?;
        operand::write_xor(engine(&self.handle)?, slot, bytes)
    }

    pub fn read_operand(
        &mut self,
        slot: OperandSlot,
        endianness: Endianness,
    ) -> CryptoResult<OperandBuf> {
        self.configured()?;
        self.check_slot(slot)?;
        Ok(operand::read(engine(&self.handle)?, slot, endianness))
    }

    /// Encodes `request` for the current configuration.
    pub fn encode(&self, request: &Request) -> CryptoResult<Sequence> {
        self.controller.check_usable()?;
        let config = self
            .config
            .ok_or(CryptoError::DRIVER_CRYPTO_NOT_CONFIGURED)?;
        encoder::encode(request, &config)
    }

    /// Writes the instruction buffer and iteration registers. Validation
    /// completes before the first register write.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_ALREADY_RUNNING` - A sequence is running or halted
    /// * `DRIVER_CRYPTO_NO_SEQUENCE_LOADED` - The sequence is empty
    /// * `DRIVER_CRYPTO_INCOMPATIBLE_CONFIG` - A DMA channel width differs
    ///   from the block size
    pub fn load(&mut self, sequence: &Sequence) -> CryptoResult<()> {
        let config = self.configured()?;
        if self.controller.is_busy() {
            return Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING);
        }
        if sequence.is_empty() {
            return Err(CryptoError::DRIVER_CRYPTO_NO_SEQUENCE_LOADED);
        }
        loader::validate(sequence, &config)?;
        loader::load(engine(&self.handle)?, sequence, &config);
        self.loaded = Some(sequence.iteration());
        Ok(())
    }

    /// Decodes raw opcodes up to the first END and loads them to run over
    /// `iteration`. Nothing is written unless the whole program decodes.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_INVALID_OPCODE` - A byte is not an opcode
    /// * `DRIVER_CRYPTO_SEQUENCE_TOO_LONG` - The program does not fit the
    ///   instruction buffer
    pub fn load_opcodes(&mut self, opcodes: &[u8], iteration: Iteration) -> CryptoResult<()> {
        self.configured()?;
        let sequence = Sequence::from_opcodes(opcodes)?.with_iteration(iteration);
        self.load(&sequence)
    }

    /// The program in the instruction buffer, as the engine holds it.
    pub fn loaded_sequence(&mut self) -> CryptoResult<Sequence> {
        self.configured()?;
        if self.loaded.is_none() {
            return Err(CryptoError::DRIVER_CRYPTO_NO_SEQUENCE_LOADED);
        }
        loader::read_back(engine(&self.handle)?)
    }

    /// Starts the loaded sequence, or resumes a halted one.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_NO_SEQUENCE_LOADED` - Nothing to run
    /// * `DRIVER_CRYPTO_ALREADY_RUNNING` - The sequence is already running
    pub fn start(&mut self) -> CryptoResult<()> {
        let config = self.configured()?;
        let iteration = self
            .loaded
            .ok_or(CryptoError::DRIVER_CRYPTO_NO_SEQUENCE_LOADED)?;
        let fresh = self.controller.state() == States::Idle;
        let regs = engine(&self.handle)?;
        self.controller.start()?;
        if fresh {
            loader::write_iteration(regs, iteration, &config);
            acknowledge_flags(regs);
        }
        regs.cmd(CMD::SEQSTART::SET);
        Ok(())
    }

    /// Executes the next instruction of the loaded sequence and pauses.
    /// Wait for it with [`Self::wait_blocking`].
    pub fn step(&mut self) -> CryptoResult<()> {
        let config = self.configured()?;
        let iteration = self
            .loaded
            .ok_or(CryptoError::DRIVER_CRYPTO_NO_SEQUENCE_LOADED)?;
        let fresh = self.controller.state() == States::Idle;
        let regs = engine(&self.handle)?;
        self.controller.step()?;
        if fresh {
            loader::write_iteration(regs, iteration, &config);
        }
        acknowledge_flags(regs);
        regs.cmd(CMD::SEQSTEP::SET);
        Ok(())
    }

    /// Stops a running sequence at the next instruction boundary. Has no
    /// effect on an idle or already halted session. A sequence the engine
    /// already finished leaves the session idle rather than halted.
    pub fn halt(&mut self) -> CryptoResult<()> {
        self.controller.check_usable()?;
        if self.controller.state() == States::Running {
            self.cancel_async()?;
        }
        if self.controller.state() != States::Running {
            return self.controller.halt();
        }
        let regs = engine(&self.handle)?;
        if !self.controller.stepping() {
            regs.cmd(CMD::SEQSTOP::SET);
        }
        // A sequence that finished before the stop took effect completes
        // instead; resuming it would run the whole program again.
        if WaitFor::Sequence.is_done(&ExecutionStatus::sample(regs)) {
            acknowledge_flags(regs);
            return self.controller.complete();
        }
        self.controller.halt()
    }

    /// Abandons a halted sequence and returns how many blocks completed.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_NOT_RUNNING` - The session is not halted
    pub fn acknowledge(&mut self) -> CryptoResult<u32> {
        self.controller.check_usable()?;
        if self.controller.state() != States::Halted {
            return Err(CryptoError::DRIVER_CRYPTO_NOT_RUNNING);
        }
        let iteration = self
            .loaded
            .ok_or(CryptoError::DRIVER_CRYPTO_NO_SEQUENCE_LOADED)?;
        let regs = engine(&self.handle)?;
        let completed = loader::completed_blocks(regs, iteration);
        regs.cmd(CMD::SEQSTOP::SET);
        acknowledge_flags(regs);
        self.controller.acknowledge()?;
        Ok(completed)
    }

    /// Runs one instruction outside of any sequence and waits for it.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_ALREADY_RUNNING` - A sequence is running or halted
    /// * `DRIVER_CRYPTO_UNSUPPORTED_OPERATION` - Gates only mean something
    ///   inside a sequence, or the configuration lacks the primitive
    /// * `DRIVER_CRYPTO_TIMEOUT` - The engine never finished; the session
    ///   is discarded
    pub fn execute(&mut self, instruction: Instruction) -> CryptoResult<ExecutionStatus> {
        let config = self.configured()?;
        if self.controller.state() != States::Idle {
            return Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING);
        }
        if matches!(instruction, Instruction::Exec(_)) {
            return Err(CryptoError::DRIVER_CRYPTO_UNSUPPORTED_OPERATION);
        }
        encoder::check_instruction(instruction, &config)?;
        let handle = self
            .handle
            .take()
            .ok_or(CryptoError::DRIVER_CRYPTO_ENGINE_BUSY)?;
        acknowledge_flags(handle.regs());
        handle
            .regs()
            .cmd(CMD::INSTR.val(instruction.opcode() as u32));
        let (handle, result) =
            completion::wait_blocking(handle, WaitFor::Instruction, EXECUTE_POLLS);
        self.handle = Some(handle);
        if let Err(err) = result {
            self.fail(err);
        }
        result
    }

    /// Polls until the running sequence finishes, or the current step when
    /// stepping.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_NOT_RUNNING` - Nothing is running
    /// * `DRIVER_CRYPTO_TIMEOUT` - `max_polls` ran out; the session is
    ///   discarded and the engine poisoned
    pub fn wait_blocking(&mut self, max_polls: u32) -> CryptoResult<ExecutionStatus> {
        self.claim()?;
        if self.controller.state() != States::Running {
            return Err(CryptoError::DRIVER_CRYPTO_NOT_RUNNING);
        }
        let handle = self
            .handle
            .take()
            .ok_or(CryptoError::DRIVER_CRYPTO_ENGINE_BUSY)?;
        let (handle, result) = completion::wait_blocking(handle, self.wait_for(), max_polls);
        self.handle = Some(handle);
        self.finish_wait(result)
    }

    /// Hands the engine to the completion interrupt. `callback` runs from
    /// [`Sequencer::on_interrupt`]; collect the result with
    /// [`Self::reclaim`].
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_INCOMPATIBLE_CONFIG` - The session was not
    ///   configured for interrupt completion
    /// * `DRIVER_CRYPTO_NOT_RUNNING` - Nothing is running
    pub fn wait_async(&mut self, callback: CompletionCallback) -> CryptoResult<()> {
        let config = self.configured()?;
        if config.completion != CompletionMode::Interrupt {
            return Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG);
        }
        if self.controller.state() != States::Running {
            return Err(CryptoError::DRIVER_CRYPTO_NOT_RUNNING);
        }
        let handle = self
            .handle
            .take()
            .ok_or(CryptoError::DRIVER_CRYPTO_ENGINE_BUSY)?;
        completion::wait_async(self.sequencer, handle, self.wait_for(), callback);
        self.awaiting = true;
        Ok(())
    }

    /// Takes the engine back after the completion interrupt. Returns
    /// `None` while the interrupt has not fired.
    pub fn reclaim(&mut self) -> CryptoResult<Option<ExecutionStatus>> {
        self.controller.check_usable()?;
        if !self.awaiting {
            return Err(CryptoError::DRIVER_CRYPTO_NOT_RUNNING);
        }
        let Some((handle, status)) = self.sequencer.take_completed() else {
            return Ok(None);
        };
        self.handle = Some(handle);
        self.awaiting = false;
        self.finish_wait(Ok(status)).map(Some)
    }

    /// Samples the status without waiting. A finished run is completed
    /// the same way [`Self::wait_blocking`] would.
    pub fn poll_nonblocking(&mut self) -> CryptoResult<ExecutionStatus> {
        self.claim()?;
        let handle = self
            .handle
            .as_ref()
            .ok_or(CryptoError::DRIVER_CRYPTO_ENGINE_BUSY)?;
        let status = completion::poll_nonblocking(handle);
        if self.controller.state() == States::Running && self.wait_for().is_done(&status) {
            acknowledge_flags(handle.regs());
            return self.finish_wait(Ok(status));
        }
        Ok(status)
    }

    /// Clears keys and operands. The session must be configured again
    /// before further use.
    pub fn zeroize(&mut self) -> CryptoResult<()> {
        self.claim()?;
        if self.controller.is_busy() {
            return Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING);
        }
        zeroize_engine(engine(&self.handle)?);
        self.config = None;
        self.loaded = None;
        Ok(())
    }

    /// Ends the session. Equivalent to dropping it.
    pub fn release(self) {}

    fn finish_wait(
        &mut self,
        result: CryptoResult<ExecutionStatus>,
    ) -> CryptoResult<ExecutionStatus> {
        match result {
            Ok(status) => {
                if status.sequence_done {
                    self.controller.complete()?;
                }
                Ok(status)
            }
            Err(err) => {
                self.fail(err);
                Err(err)
            }
        }
    }

    fn fail(&mut self, err: CryptoError) {
        if err != CryptoError::DRIVER_CRYPTO_TIMEOUT {
            return;
        }
        if let Ok(regs) = engine(&self.handle) {
            let status = regs.status().get().to_be_bytes();
            cprintln!(
                "[crypto] Engine timed out, STATUS {}; session discarded",
                HexBytes(&status)
            );
        }
        self.controller.fault();
    }

    fn cancel_async(&mut self) -> CryptoResult<()> {
        if !self.awaiting {
            return Ok(());
        }
        self.awaiting = false;
        if let Some((handle, status)) = self.sequencer.disarm() {
            self.handle = Some(handle);
            if let Some(status) = status {
                self.finish_wait(Ok(status))?;
            }
        }
        Ok(())
    }
}

impl<M: Mmio> Drop for Session<'_, M> {
    fn drop(&mut self) {
        if self.awaiting {
            self.awaiting = false;
            if let Some((handle, _)) = self.sequencer.disarm() {
                self.handle = Some(handle);
            }
        }
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.controller.state() == States::Discarded {
            self.sequencer.poison(handle);
            return;
        }
        let regs = handle.regs();
        if self.controller.is_busy() {
            // Stop, then abort the paused sequence.
            regs.cmd(CMD::SEQSTOP::SET);
            regs.cmd(CMD::SEQSTOP::SET);
        }
        zeroize_engine(regs);
        self.sequencer.release(handle);
    }
}
