/*++

Licensed under the Apache-2.0 license.

File Name:

    sequence.rs

Abstract:

    File contains the bounded instruction sequence and its builder.

--*/

use arrayvec::ArrayVec;
use crypto_seq_error::{CryptoError, CryptoResult};
use crypto_seq_registers::crypto::SEQ_SLOTS;

use crate::instruction::Instruction;

/// Capacity of the hardware instruction buffer.
pub const MAX_INSTRUCTIONS: usize = SEQ_SLOTS;

/// Largest value of the LENGTHA / LENGTHB fields.
const MAX_LENGTH: u32 = 0x3fff;

/// Bytes a DMA channel moves per iteration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BlockSize {
    #[default]
    Bytes16,
    Bytes32,
    Bytes64,
}

impl BlockSize {
    pub const fn bytes(self) -> u16 {
        match self {
            BlockSize::Bytes16 => 16,
            BlockSize::Bytes32 => 32,
            BlockSize::Bytes64 => 64,
        }
    }

    pub(crate) fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            16 => Some(BlockSize::Bytes16),
            32 => Some(BlockSize::Bytes32),
            64 => Some(BlockSize::Bytes64),
            _ => None,
        }
    }
}

/// How many times the engine runs the sequence: one iteration per block of
/// phase A, then one per block of phase B.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Iteration {
    pub length_a: u16,
    pub length_b: u16,
    pub block_size: BlockSize,
}

impl Default for Iteration {
    fn default() -> Self {
        Self::single(BlockSize::Bytes16)
    }
}

impl Iteration {
    /// A single pass over the sequence.
    pub const fn single(block_size: BlockSize) -> Self {
        Self {
            length_a: block_size.bytes(),
            length_b: 0,
            block_size,
        }
    }

    /// `blocks_a` iterations in phase A followed by `blocks_b` in phase B.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_UNSUPPORTED_OPERATION` - No phase A block, or a length
    ///   the LENGTH fields cannot hold
    pub fn blocks(block_size: BlockSize, blocks_a: u16, blocks_b: u16) -> CryptoResult<Self> {
        let bytes = block_size.bytes() as u32;
        let length_a = blocks_a as u32 * bytes;
        let length_b = blocks_b as u32 * bytes;
        if blocks_a == 0 || length_a > MAX_LENGTH || length_b > MAX_LENGTH {
            return Err(CryptoError::DRIVER_CRYPTO_UNSUPPORTED_OPERATION);
        }
        Ok(Self {
            length_a: length_a as u16,
            length_b: length_b as u16,
            block_size,
        })
    }

    pub fn blocks_a(&self) -> u32 {
        (self.length_a as u32)
            .div_ceil(self.block_size.bytes() as u32)
            .max(1)
    }

    pub fn blocks_b(&self) -> u32 {
        (self.length_b as u32).div_ceil(self.block_size.bytes() as u32)
    }

    pub fn total_blocks(&self) -> u32 {
        self.blocks_a() + self.blocks_b()
    }
}

/// An ordered list of at most [`MAX_INSTRUCTIONS`] instructions together
/// with its iteration descriptor.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Sequence {
    instructions: ArrayVec<Instruction, MAX_INSTRUCTIONS>,
    iteration: Iteration,
}

impl Sequence {
    pub fn builder() -> SequenceBuilder {
        SequenceBuilder::default()
    }

    /// Validates raw opcodes. Decoding stops at the first END (0).
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_INVALID_OPCODE` - A byte is not an opcode
    /// * `DRIVER_CRYPTO_SEQUENCE_TOO_LONG` - More than [`MAX_INSTRUCTIONS`]
    ///   instructions precede END
    pub fn from_opcodes(opcodes: &[u8]) -> CryptoResult<Self> {
        let mut builder = SequenceBuilder::default();
        for opcode in opcodes.iter().take_while(|op| **op != 0) {
            builder.push(Instruction::try_from(*opcode)?)?;
        }
        Ok(builder.build())
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iteration(&self) -> Iteration {
        self.iteration
    }

    pub fn with_iteration(mut self, iteration: Iteration) -> Self {
        self.iteration = iteration;
        self
    }
}

/// Assembles a [`Sequence`] in program order.
#[derive(Default)]
pub struct SequenceBuilder {
    instructions: ArrayVec<Instruction, MAX_INSTRUCTIONS>,
    iteration: Iteration,
}

impl SequenceBuilder {
    /// Appends an instruction.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_SEQUENCE_TOO_LONG` - The buffer already holds
    ///   [`MAX_INSTRUCTIONS`] instructions
    pub fn push(&mut self, instruction: Instruction) -> CryptoResult<&mut Self> {
        self.instructions
            .try_push(instruction)
            .map_err(|_| CryptoError::DRIVER_CRYPTO_SEQUENCE_TOO_LONG)?;
        Ok(self)
    }

    pub fn extend<I>(&mut self, instructions: I) -> CryptoResult<&mut Self>
    where
        I: IntoIterator<Item = Instruction>,
    {
        for instruction in instructions {
            self.push(instruction)?;
        }
        Ok(self)
    }

    pub fn iteration(&mut self, iteration: Iteration) -> &mut Self {
        self.iteration = iteration;
        self
    }

    pub fn build(&self) -> Sequence {
        Sequence {
            instructions: self.instructions.clone(),
            iteration: self.iteration,
        }
    }
}
