/*++

Licensed under the Apache-2.0 license.

File Name:

    completion.rs

Abstract:

    File contains the ways of waiting for the engine: bounded polling,
    non-blocking sampling and interrupt driven callbacks.

--*/

use crypto_seq_error::{CryptoError, CryptoResult};
use crypto_seq_registers::crypto::{CryptoRegs, INT};
use crypto_seq_registers::Mmio;
use tock_registers::fields::FieldValue;

use crate::sequencer::{EngineHandle, Sequencer};
use crate::status::ExecutionStatus;
use crate::wait;

/// Invoked from the completion interrupt with the final status.
pub type CompletionCallback = fn(ExecutionStatus);

/// The event a wait ends on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WaitFor {
    /// The whole sequence, free running
    Sequence,
    /// One instruction, when stepping or executing directly
    Instruction,
}

impl WaitFor {
    pub fn is_done(self, status: &ExecutionStatus) -> bool {
        match self {
            WaitFor::Sequence => {
                status.sequence_done && !status.running && !status.instruction_running
            }
            WaitFor::Instruction => status.is_complete(),
        }
    }

    pub(crate) fn interrupts(self) -> FieldValue<u32, INT::Register> {
        match self {
            WaitFor::Sequence => INT::SEQDONE::SET,
            WaitFor::Instruction => INT::INSTRDONE::SET + INT::SEQDONE::SET,
        }
    }
}

/// Clears both completion flags.
pub(crate) fn acknowledge_flags<M: Mmio>(regs: &CryptoRegs<M>) {
    regs.clear_int_flags(INT::INSTRDONE::SET + INT::SEQDONE::SET);
}

/// Polls the engine until `wait_for` is reached or `max_polls` samples
/// have been taken. The handle comes back in both cases.
///
/// # Errors
///
/// * `DRIVER_CRYPTO_TIMEOUT` - The engine did not finish in time
pub fn wait_blocking<M: Mmio>(
    handle: EngineHandle<M>,
    wait_for: WaitFor,
    max_polls: u32,
) -> (EngineHandle<M>, CryptoResult<ExecutionStatus>) {
    let regs = handle.regs();
    let mut status = ExecutionStatus::default();
    let done = wait::until(max_polls, || {
        status = ExecutionStatus::sample(regs);
        wait_for.is_done(&status)
    });
    let result = if done {
        acknowledge_flags(regs);
        Ok(status)
    } else {
        Err(CryptoError::DRIVER_CRYPTO_TIMEOUT)
    };
    (handle, result)
}

/// Current status without waiting.
pub fn poll_nonblocking<M: Mmio>(handle: &EngineHandle<M>) -> ExecutionStatus {
    ExecutionStatus::sample(handle.regs())
}

/// Parks `handle` with `sequencer` and enables the completion interrupt.
/// [`Sequencer::on_interrupt`] runs `callback` once `wait_for` is reached.
pub fn wait_async<M: Mmio>(
    sequencer: &Sequencer<M>,
    handle: EngineHandle<M>,
    wait_for: WaitFor,
    callback: CompletionCallback,
) {
    sequencer.arm(handle, wait_for, callback);
}

/// Masks the completion interrupts again.
pub(crate) fn disable_interrupts<M: Mmio>(regs: &CryptoRegs<M>) {
    regs.write_int_enable(INT::INSTRDONE::CLEAR + INT::SEQDONE::CLEAR);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_wait_ignores_instruction_done() {
        let status = ExecutionStatus {
            instruction_done: true,
            ..Default::default()
        };
        assert!(WaitFor::Instruction.is_done(&status));
        assert!(!WaitFor::Sequence.is_done(&status));

        let running = ExecutionStatus {
            running: true,
            sequence_done: true,
            ..Default::default()
        };
        assert!(!WaitFor::Sequence.is_done(&running));
    }
}
