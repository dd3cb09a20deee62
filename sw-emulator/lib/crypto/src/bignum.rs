/*++

Licensed under the Apache-2.0 license.

File Name:

    bignum.rs

Abstract:

    File contains the wide-operand arithmetic of the emulated sequencer:
    fixed 256-bit integer arithmetic, modular arithmetic over a prime and
    polynomial arithmetic over GF(2^m).

--*/

use core::cmp::Ordering;

/// 256-bit value, least significant word first.
pub type U256 = [u32; 8];

/// 512-bit product, least significant word first.
pub type U512 = [u32; 16];

pub const ZERO: U256 = [0; 8];

/// Parses a big-endian hex literal of at most 64 digits.
///
/// # Panics
///
/// Panics on a non-hex digit or an over-long literal.
pub fn from_be_hex(hex: &str) -> U256 {
    assert!(hex.len() <= 64, "hex literal wider than 256 bits");
    let mut out = ZERO;
    for (i, c) in hex.bytes().rev().enumerate() {
        let nibble = (c as char).to_digit(16).expect("hex digit") as u32;
        out[i / 8] |= nibble << (4 * (i % 8));
    }
    out
}

/// Mask keeping the low `bits` bits (128 or 256).
fn truncate(mut val: U256, bits: u32) -> U256 {
    for (i, word) in val.iter_mut().enumerate() {
        if i as u32 * 32 >= bits {
            *word = 0;
        }
    }
    val
}

pub fn cmp(a: &U256, b: &U256) -> Ordering {
    for i in (0..8).rev() {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

pub fn bit(val: &[u32], index: usize) -> bool {
    (val[index / 32] >> (index % 32)) & 1 == 1
}

/// `a + b + carry_in` over `bits` bits. Returns the sum and the carry out.
pub fn add(a: &U256, b: &U256, carry_in: bool, bits: u32) -> (U256, bool) {
    let (a, b) = (truncate(*a, bits), truncate(*b, bits));
    let mut out = ZERO;
    let mut carry = carry_in as u64;
    for i in 0..(bits as usize / 32) {
        let sum = a[i] as u64 + b[i] as u64 + carry;
        out[i] = sum as u32;
        carry = sum >> 32;
    }
    (out, carry != 0)
}

/// `a - b - borrow_in` over `bits` bits. Returns the difference and the
/// borrow out.
pub fn sub(a: &U256, b: &U256, borrow_in: bool, bits: u32) -> (U256, bool) {
    let (a, b) = (truncate(*a, bits), truncate(*b, bits));
    let mut out = ZERO;
    let mut borrow = borrow_in as i64;
    for i in 0..(bits as usize / 32) {
        let diff = a[i] as i64 - b[i] as i64 - borrow;
        out[i] = diff as u32;
        borrow = (diff < 0) as i64;
    }
    (out, borrow != 0)
}

/// Full product of the low 128 bits of `a` and `b`.
pub fn mul_128(a: &U256, b: &U256) -> U256 {
    let mut out = ZERO;
    for i in 0..4 {
        let mut carry = 0u64;
        for j in 0..4 {
            let t = a[i] as u64 * b[j] as u64 + out[i + j] as u64 + carry;
            out[i + j] = t as u32;
            carry = t >> 32;
        }
        out[i + 4] = carry as u32;
    }
    out
}

fn mul_256(a: &U256, b: &U256) -> U512 {
    let mut out = [0u32; 16];
    for i in 0..8 {
        let mut carry = 0u64;
        for j in 0..8 {
            let t = a[i] as u64 * b[j] as u64 + out[i + j] as u64 + carry;
            out[i + j] = t as u32;
            carry = t >> 32;
        }
        out[i + 8] = carry as u32;
    }
    out
}

/// Shift left by one over `bits` bits. Returns the result and the bit
/// shifted out.
pub fn shl1(a: &U256, bits: u32) -> (U256, bool) {
    let a = truncate(*a, bits);
    let out_bit = bit(&a, bits as usize - 1);
    let mut out = ZERO;
    for i in (0..8).rev() {
        out[i] = a[i] << 1;
        if i > 0 {
            out[i] |= a[i - 1] >> 31;
        }
    }
    (truncate(out, bits), out_bit)
}

/// Shift right by one over `bits` bits. Returns the result and the bit
/// shifted out.
pub fn shr1(a: &U256, bits: u32) -> (U256, bool) {
    let a = truncate(*a, bits);
    let out_bit = a[0] & 1 == 1;
    let mut out = ZERO;
    for i in 0..8 {
        out[i] = a[i] >> 1;
        if i < 7 {
            out[i] |= a[i + 1] << 31;
        }
    }
    (out, out_bit)
}

pub fn map2(a: &U256, b: &U256, bits: u32, f: impl Fn(u32, u32) -> u32) -> U256 {
    let mut out = ZERO;
    for i in 0..8 {
        out[i] = f(a[i], b[i]);
    }
    truncate(out, bits)
}

/// `(a + b) mod m` for `a, b < m`. The flag reports whether the modulus
/// was subtracted.
pub fn mod_add(a: &U256, b: &U256, m: &U256) -> (U256, bool) {
    let (sum, overflow) = add(a, b, false, 256);
    if overflow || cmp(&sum, m) != Ordering::Less {
        (sub(&sum, m, false, 256).0, true)
    } else {
        (sum, false)
    }
}

/// `(a - b) mod m` for `a, b < m`. The flag reports whether the modulus
/// was added back.
pub fn mod_sub(a: &U256, b: &U256, m: &U256) -> (U256, bool) {
    let (diff, borrow) = sub(a, b, false, 256);
    if borrow {
        (add(&diff, m, false, 256).0, true)
    } else {
        (diff, false)
    }
}

/// `(a * b) mod m` by shift-and-subtract reduction of the 512-bit product.
pub fn mod_mul(a: &U256, b: &U256, m: &U256) -> U256 {
    let product = mul_256(a, b);
    let mut r = ZERO;
    for i in (0..512).rev() {
        let (shifted, overflow) = shl1(&r, 256);
        r = shifted;
        r[0] |= bit(&product, i) as u32;
        if overflow || cmp(&r, m) != Ordering::Less {
            r = sub(&r, m, false, 256).0;
        }
    }
    r
}

/// Irreducible polynomial `x^degree + low`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Poly {
    pub degree: u32,
    pub low: U256,
}

/// Carry-less product of `a` and `b` reduced modulo `poly`.
pub fn gf2_mul(a: &U256, b: &U256, poly: &Poly) -> U256 {
    let mut product = [0u32; 16];
    for i in 0..256 {
        if !bit(a, i) {
            continue;
        }
        for j in 0..256 {
            if bit(b, j) {
                product[(i + j) / 32] ^= 1 << ((i + j) % 32);
            }
        }
    }
    gf2_reduce(product, poly)
}

fn gf2_reduce(mut val: U512, poly: &Poly) -> U256 {
    let degree = poly.degree as usize;
    for i in (degree..512).rev() {
        if !bit(&val, i) {
            continue;
        }
        val[i / 32] ^= 1 << (i % 32);
        let shift = i - degree;
        for j in 0..256 {
            if bit(&poly.low, j) {
                val[(j + shift) / 32] ^= 1 << ((j + shift) % 32);
            }
        }
    }
    let mut out = ZERO;
    out.copy_from_slice(&val[..8]);
    out
}
