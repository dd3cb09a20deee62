/*++

Licensed under the Apache-2.0 license.

File Name:

    status.rs

Abstract:

    File contains the snapshot of the engine status registers.

--*/

use crypto_seq_registers::crypto::{CryptoRegs, DSTATUS, INT, STATUS};
use crypto_seq_registers::Mmio;

/// STATUS, DSTATUS and IF as sampled after a run or a step.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExecutionStatus {
    pub running: bool,
    pub instruction_running: bool,
    pub dma_active: bool,
    /// One bit per DATA0 word that reads zero
    pub data0_zero: u8,
    pub ddata0_lsbs: u8,
    pub ddata0_msbs: u8,
    pub ddata1_msb: bool,
    pub carry: bool,
    pub instruction_done: bool,
    pub sequence_done: bool,
}

impl ExecutionStatus {
    pub(crate) fn sample<M: Mmio>(regs: &CryptoRegs<M>) -> Self {
        let status = regs.status();
        let dstatus = regs.dstatus();
        let flags = regs.int_flags();
        Self {
            running: status.is_set(STATUS::SEQRUNNING),
            instruction_running: status.is_set(STATUS::INSTRRUNNING),
            dma_active: status.is_set(STATUS::DMAACTIVE),
            data0_zero: dstatus.read(DSTATUS::DATA0ZERO) as u8,
            ddata0_lsbs: dstatus.read(DSTATUS::DDATA0LSBS) as u8,
            ddata0_msbs: dstatus.read(DSTATUS::DDATA0MSBS) as u8,
            ddata1_msb: dstatus.is_set(DSTATUS::DDATA1MSB),
            carry: dstatus.is_set(DSTATUS::CARRY),
            instruction_done: flags.is_set(INT::INSTRDONE),
            sequence_done: flags.is_set(INT::SEQDONE),
        }
    }

    /// The engine is quiet and has reported a completion.
    pub fn is_complete(&self) -> bool {
        !self.running && !self.instruction_running && (self.instruction_done || self.sequence_done)
    }
}
