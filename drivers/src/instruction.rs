/*++

Licensed under the Apache-2.0 license.

File Name:

    instruction.rs

Abstract:

    File contains the sequencer instruction set.

--*/

use crypto_seq_error::CryptoError;
use crypto_seq_registers::crypto::instr;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataReg {
    Data0 = 0,
    Data1 = 1,
    Data2 = 2,
    Data3 = 3,
}

impl DataReg {
    const ALL: [DataReg; 4] = [DataReg::Data0, DataReg::Data1, DataReg::Data2, DataReg::Data3];
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DDataReg {
    DData0 = 0,
    DData1 = 1,
    DData2 = 2,
    DData3 = 3,
    DData4 = 4,
}

impl DDataReg {
    const ALL: [DDataReg; 5] = [
        DDataReg::DData0,
        DDataReg::DData1,
        DDataReg::DData2,
        DDataReg::DData3,
        DDataReg::DData4,
    ];
}

/// Condition latched by an EXEC instruction. It applies to every following
/// instruction until the next EXEC.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Condition {
    Always,
    /// During phase A blocks
    IfA,
    /// During phase B blocks
    IfB,
    IfNotA,
    IfNotB,
    IfCarry,
    IfNotCarry,
    /// During the final block of the sequence
    IfLast,
    IfNotLast,
}

impl Condition {
    const ALL: [Condition; 9] = [
        Condition::Always,
        Condition::IfA,
        Condition::IfB,
        Condition::IfNotA,
        Condition::IfNotB,
        Condition::IfCarry,
        Condition::IfNotCarry,
        Condition::IfLast,
        Condition::IfNotLast,
    ];
}

/// One sequencer instruction. Arithmetic and logic instructions operate on
/// the operands chosen by the last `Select` and write DDATA0.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction {
    Exec(Condition),
    DataToData { src: DataReg, dst: DataReg },
    /// DATA0 ^= src
    XorData0 { src: DataReg },
    DDataToDData { src: DDataReg, dst: DDataReg },
    Select { a: DDataReg, b: DDataReg },
    Add,
    AddC,
    Sub,
    SubC,
    MAdd,
    MSub,
    MMul,
    Mul,
    Xor,
    And,
    Or,
    Not,
    Shl,
    Shr,
    Clr,
    /// AES encrypt DATA0 with the key buffer
    AesEnc,
    AesDec,
    /// Compress the QDATA1 block into the DDATA0 state
    Sha,
}

const ALU: [Instruction; 15] = [
    Instruction::Add,
    Instruction::AddC,
    Instruction::Sub,
    Instruction::SubC,
    Instruction::MAdd,
    Instruction::MSub,
    Instruction::MMul,
    Instruction::Mul,
    Instruction::Xor,
    Instruction::And,
    Instruction::Or,
    Instruction::Not,
    Instruction::Shl,
    Instruction::Shr,
    Instruction::Clr,
];

impl Instruction {
    pub const fn opcode(self) -> u8 {
        match self {
            Instruction::Exec(c) => instr::EXEC_ALWAYS + c as u8,
            Instruction::DataToData { src, dst } => {
                instr::DATA_TO_DATA | (src as u8) << 2 | dst as u8
            }
            Instruction::XorData0 { src } => instr::DATA_XOR_DATA0 + src as u8,
            Instruction::DDataToDData { src, dst } => {
                instr::DDATA_TO_DDATA + src as u8 * 5 + dst as u8
            }
            Instruction::Select { a, b } => instr::SELECT + a as u8 * 5 + b as u8,
            Instruction::Add => instr::ADD,
            Instruction::AddC => instr::ADDC,
            Instruction::Sub => instr::SUB,
            Instruction::SubC => instr::SUBC,
            Instruction::MAdd => instr::MADD,
            Instruction::MSub => instr::MSUB,
            Instruction::MMul => instr::MMUL,
            Instruction::Mul => instr::MUL,
            Instruction::Xor => instr::XOR,
            Instruction::And => instr::AND,
            Instruction::Or => instr::OR,
            Instruction::Not => instr::NOT,
            Instruction::Shl => instr::SHL,
            Instruction::Shr => instr::SHR,
            Instruction::Clr => instr::CLR,
            Instruction::AesEnc => instr::AESENC,
            Instruction::AesDec => instr::AESDEC,
            Instruction::Sha => instr::SHA,
        }
    }

    /// True for instructions that reduce by the configured modulus.
    pub fn is_modular(self) -> bool {
        matches!(
            self,
            Instruction::MAdd | Instruction::MSub | Instruction::MMul
        )
    }

    pub fn is_aes(self) -> bool {
        matches!(self, Instruction::AesEnc | Instruction::AesDec)
    }
}

impl TryFrom<u8> for Instruction {
    type Error = CryptoError;

    /// Decodes an opcode. END (0) terminates a sequence and is not an
    /// instruction.
    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        let instruction = match opcode {
            instr::EXEC_ALWAYS..=instr::EXEC_IF_N_LAST => {
                Instruction::Exec(Condition::ALL[(opcode - instr::EXEC_ALWAYS) as usize])
            }
            0x10..=0x1f => Instruction::DataToData {
                src: DataReg::ALL[((opcode >> 2) & 3) as usize],
                dst: DataReg::ALL[(opcode & 3) as usize],
            },
            0x20..=0x23 => Instruction::XorData0 {
                src: DataReg::ALL[(opcode - instr::DATA_XOR_DATA0) as usize],
            },
            0x30..=0x48 => {
                let n = (opcode - instr::DDATA_TO_DDATA) as usize;
                Instruction::DDataToDData {
                    src: DDataReg::ALL[n / 5],
                    dst: DDataReg::ALL[n % 5],
                }
            }
            0x50..=0x68 => {
                let n = (opcode - instr::SELECT) as usize;
                Instruction::Select {
                    a: DDataReg::ALL[n / 5],
                    b: DDataReg::ALL[n % 5],
                }
            }
            instr::ADD..=instr::CLR => ALU[(opcode - instr::ADD) as usize],
            instr::AESENC => Instruction::AesEnc,
            instr::AESDEC => Instruction::AesDec,
            instr::SHA => Instruction::Sha,
            _ => return Err(CryptoError::DRIVER_CRYPTO_INVALID_OPCODE),
        };
        Ok(instruction)
    }
}
