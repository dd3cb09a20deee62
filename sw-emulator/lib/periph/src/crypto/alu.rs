/*++

Licensed under the Apache-2.0 license.

File Name:

    alu.rs

Abstract:

    File contains opcode decoding and the execution of single instructions
    of the emulated sequencer.

--*/

use super::operand_file::{Operand, OperandFile};
use crypto_seq_emu_crypto::bignum::{self, Poly, U256};
use crypto_seq_emu_crypto::{aes_decrypt_block, aes_encrypt_block, sha256_compress, AesKey};
use crypto_seq_registers::crypto::instr;

/// Execution gate latched by an EXEC instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Gate {
    Always,
    IfA,
    IfB,
    IfNotA,
    IfNotB,
    IfCarry,
    IfNotCarry,
    IfLast,
    IfNotLast,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AluOp {
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
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    End,
    Exec(Gate),
    DataToData { src: usize, dst: usize },
    XorIntoData0 { src: usize },
    DDataToDData { src: usize, dst: usize },
    Select { a: usize, b: usize },
    Alu(AluOp),
    AesEnc,
    AesDec,
    Sha,
    Invalid(u8),
}

impl Op {
    pub fn decode(opcode: u8) -> Op {
        const GATES: [Gate; 9] = [
            Gate::Always,
            Gate::IfA,
            Gate::IfB,
            Gate::IfNotA,
            Gate::IfNotB,
            Gate::IfCarry,
            Gate::IfNotCarry,
            Gate::IfLast,
            Gate::IfNotLast,
        ];
        const ALU: [AluOp; 15] = [
            AluOp::Add,
            AluOp::AddC,
            AluOp::Sub,
            AluOp::SubC,
            AluOp::MAdd,
            AluOp::MSub,
            AluOp::MMul,
            AluOp::Mul,
            AluOp::Xor,
            AluOp::And,
            AluOp::Or,
            AluOp::Not,
            AluOp::Shl,
            AluOp::Shr,
            AluOp::Clr,
        ];
        match opcode {
            instr::END => Op::End,
            instr::EXEC_ALWAYS..=instr::EXEC_IF_N_LAST => {
                Op::Exec(GATES[(opcode - instr::EXEC_ALWAYS) as usize])
            }
            0x10..=0x1f => Op::DataToData {
                src: ((opcode >> 2) & 3) as usize,
                dst: (opcode & 3) as usize,
            },
            0x20..=0x23 => Op::XorIntoData0 {
                src: (opcode - instr::DATA_XOR_DATA0) as usize,
            },
            0x30..=0x48 => {
                let n = (opcode - instr::DDATA_TO_DDATA) as usize;
                Op::DDataToDData {
                    src: n / 5,
                    dst: n % 5,
                }
            }
            0x50..=0x68 => {
                let n = (opcode - instr::SELECT) as usize;
                Op::Select { a: n / 5, b: n % 5 }
            }
            instr::ADD..=instr::CLR => Op::Alu(ALU[(opcode - instr::ADD) as usize]),
            instr::AESENC => Op::AesEnc,
            instr::AESDEC => Op::AesDec,
            instr::SHA => Op::Sha,
            other => Op::Invalid(other),
        }
    }

    /// Clock ticks the engine spends on the instruction.
    pub fn ticks(self) -> u64 {
        match self {
            Op::Alu(AluOp::MMul) => 48,
            Op::Alu(AluOp::Mul) | Op::Alu(AluOp::MAdd) | Op::Alu(AluOp::MSub) => 4,
            Op::Alu(_) => 2,
            Op::AesEnc | Op::AesDec => 14,
            Op::Sha => 66,
            _ => 1,
        }
    }
}

/// Modulus selected by WAC.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Field {
    Prime(U256),
    Binary(Poly),
}

/// Everything an instruction may read besides the operand file.
pub struct ExecEnv<'a> {
    pub field: Option<Field>,
    /// 128 or 256
    pub width: u32,
    pub key: &'a AesKey,
    pub sha256: bool,
}

/// Selected A/B operands and the carry flag.
#[derive(Clone, Copy, Debug, Default)]
pub struct AluState {
    pub sel_a: usize,
    pub sel_b: usize,
    pub carry: bool,
}

/// Executes a non-gate instruction.
pub fn execute(op: Op, file: &mut OperandFile, state: &mut AluState, env: &ExecEnv) {
    match op {
        Op::End | Op::Exec(_) => {}
        Op::DataToData { src, dst } => {
            let val = file.data(src);
            file.set_data(dst, val);
        }
        Op::XorIntoData0 { src } => {
            let a = file.data(0);
            let b = file.data(src);
            file.set_data(0, core::array::from_fn(|i| a[i] ^ b[i]));
        }
        Op::DDataToDData { src, dst } => {
            let val = file.ddata(src);
            file.set_ddata(dst, &val);
        }
        Op::Select { a, b } => {
            state.sel_a = a;
            state.sel_b = b;
        }
        Op::Alu(alu) => {
            let a = file.ddata(state.sel_a);
            let b = file.ddata(state.sel_b);
            if let Some(result) = alu_op(alu, &a, &b, state, env) {
                file.set_ddata(0, &result);
            }
        }
        Op::AesEnc | Op::AesDec => {
            let mut block = file.data0_block();
            if op == Op::AesEnc {
                aes_encrypt_block(env.key, &mut block);
            } else {
                aes_decrypt_block(env.key, &mut block);
            }
            file.set_data0_block(&block);
        }
        Op::Sha => {
            if !env.sha256 {
                log::warn!("crypto: SHA-1 compression is not emulated");
                return;
            }
            let ddata0 = file.ddata(0);
            let mut state_words: [u32; 8] = core::array::from_fn(|i| ddata0[7 - i]);
            let mut block = [0u8; 64];
            for (j, chunk) in block.chunks_exact_mut(4).enumerate() {
                chunk.copy_from_slice(&file.word(Operand::QData(1), 15 - j).to_be_bytes());
            }
            sha256_compress(&mut state_words, &block);
            let updated: U256 = core::array::from_fn(|i| state_words[7 - i]);
            file.set_ddata(0, &updated);
        }
        Op::Invalid(opcode) => {
            log::warn!("crypto: invalid opcode {opcode:#04x} skipped");
        }
    }
}

fn alu_op(op: AluOp, a: &U256, b: &U256, state: &mut AluState, env: &ExecEnv) -> Option<U256> {
    let width = env.width;
    let result = match op {
        AluOp::Add | AluOp::AddC => {
            let (sum, carry) = bignum::add(a, b, op == AluOp::AddC && state.carry, width);
            state.carry = carry;
            sum
        }
        AluOp::Sub | AluOp::SubC => {
            let (diff, borrow) = bignum::sub(a, b, op == AluOp::SubC && state.carry, width);
            state.carry = borrow;
            diff
        }
        AluOp::MAdd | AluOp::MSub | AluOp::MMul => {
            let Some(field) = env.field else {
                log::warn!("crypto: modular operation without a modulus selected");
                return None;
            };
            match (op, field) {
                (AluOp::MAdd, Field::Prime(m)) => {
                    let (sum, reduced) = bignum::mod_add(a, b, &m);
                    state.carry = reduced;
                    sum
                }
                (AluOp::MSub, Field::Prime(m)) => {
                    let (diff, wrapped) = bignum::mod_sub(a, b, &m);
                    state.carry = wrapped;
                    diff
                }
                (AluOp::MAdd | AluOp::MSub, Field::Binary(_)) => {
                    state.carry = false;
                    bignum::map2(a, b, 256, |x, y| x ^ y)
                }
                (_, Field::Prime(m)) => bignum::mod_mul(a, b, &m),
                (_, Field::Binary(poly)) => bignum::gf2_mul(a, b, &poly),
            }
        }
        AluOp::Mul => bignum::mul_128(a, b),
        AluOp::Xor => bignum::map2(a, b, width, |x, y| x ^ y),
        AluOp::And => bignum::map2(a, b, width, |x, y| x & y),
        AluOp::Or => bignum::map2(a, b, width, |x, y| x | y),
        AluOp::Not => bignum::map2(a, b, width, |x, _| !x),
        AluOp::Shl | AluOp::Shr => {
            let (shifted, out) = if op == AluOp::Shl {
                bignum::shl1(a, width)
            } else {
                bignum::shr1(a, width)
            };
            state.carry = out;
            shifted
        }
        AluOp::Clr => bignum::ZERO,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_families() {
        assert_eq!(Op::decode(0x00), Op::End);
        assert_eq!(Op::decode(0x06), Op::Exec(Gate::IfCarry));
        assert_eq!(Op::decode(0x16), Op::DataToData { src: 1, dst: 2 });
        assert_eq!(Op::decode(0x22), Op::XorIntoData0 { src: 2 });
        assert_eq!(Op::decode(0x30 + 4 * 5 + 3), Op::DDataToDData { src: 4, dst: 3 });
        assert_eq!(Op::decode(0x50 + 5 + 2), Op::Select { a: 1, b: 2 });
        assert_eq!(Op::decode(0x74), Op::Alu(AluOp::MAdd));
        assert_eq!(Op::decode(0x7e), Op::Alu(AluOp::Clr));
        assert_eq!(Op::decode(0x88), Op::Sha);
        assert_eq!(Op::decode(0x0a), Op::Invalid(0x0a));
        assert_eq!(Op::decode(0x7f), Op::Invalid(0x7f));
    }

    #[test]
    fn test_subc_chains_borrow() {
        let mut file = OperandFile::default();
        file.set_ddata(1, &bignum::ZERO);
        file.set_ddata(2, &bignum::from_be_hex("1"));
        let key = AesKey::Aes128([0; 16]);
        let env = ExecEnv {
            field: None,
            width: 256,
            key: &key,
            sha256: true,
        };
        let mut state = AluState::default();
        execute(Op::Select { a: 1, b: 2 }, &mut file, &mut state, &env);
        execute(Op::Alu(AluOp::Sub), &mut file, &mut state, &env);
        assert!(state.carry);
        assert_eq!(file.ddata(0), [u32::MAX; 8]);

        execute(Op::Alu(AluOp::SubC), &mut file, &mut state, &env);
        assert_eq!(file.ddata(0)[0], u32::MAX - 1);
    }

    #[test]
    fn test_modular_without_field_is_skipped() {
        let mut file = OperandFile::default();
        file.set_ddata(0, &bignum::from_be_hex("7"));
        let key = AesKey::Aes128([0; 16]);
        let env = ExecEnv {
            field: None,
            width: 256,
            key: &key,
            sha256: true,
        };
        let mut state = AluState::default();
        execute(Op::Alu(AluOp::MAdd), &mut file, &mut state, &env);
        assert_eq!(file.ddata(0), bignum::from_be_hex("7"));
    }
}
