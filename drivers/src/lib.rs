/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the crypto sequencer driver library.

--*/

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod printer;
mod wait;

mod completion;
mod config;
mod controller;
mod encoder;
mod instruction;
mod loader;
mod operand;
mod sequence;
mod sequencer;
mod status;

pub use completion::{poll_nonblocking, wait_async, wait_blocking, CompletionCallback, WaitFor};
pub use config::{
    CompletionMode, DmaChannel, DmaConfig, DmaMode, ExecutionConfig, FieldMode, FieldOp, Modulus,
    PrimitiveVariant, ResultWidth,
};
pub use controller::States as SessionState;
pub use crypto_seq_error::{CryptoError, CryptoResult};
pub use encoder::{encode, Request, ShiftDirection, SHA256_INITIAL_STATE};
pub use instruction::{Condition, DDataReg, DataReg, Instruction};
pub use loader::{pack, unpack};
pub use operand::{Endianness, OperandBuf, OperandSlot, SlotMask, Width, MAX_OPERAND_BYTES};
pub use sequence::{BlockSize, Iteration, Sequence, SequenceBuilder, MAX_INSTRUCTIONS};
pub use sequencer::{EngineHandle, Sequencer, Session};
pub use status::ExecutionStatus;
