/*++

Licensed under the Apache-2.0 license.

File Name:

    moduli.rs

Abstract:

    File contains the named moduli selectable through the WAC register.

--*/

use crate::bignum::{from_be_hex, Poly, U256};

pub fn p256_p() -> U256 {
    from_be_hex("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff")
}

pub fn p256_n() -> U256 {
    from_be_hex("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551")
}

pub fn p224_p() -> U256 {
    from_be_hex("ffffffffffffffffffffffffffffffff000000000000000000000001")
}

pub fn p224_n() -> U256 {
    from_be_hex("ffffffffffffffffffffffffffff16a2e0b8f03e13dd29455c5c2a3d")
}

pub fn p192_p() -> U256 {
    from_be_hex("fffffffffffffffffffffffffffffffeffffffffffffffff")
}

pub fn p192_n() -> U256 {
    from_be_hex("ffffffffffffffffffffffff99def836146bc9b1b4d22831")
}

/// Group order of B-233.
pub fn b233_n() -> U256 {
    from_be_hex("1000000000000000000000000000013e974e72f8a6922031d2603cfe0d7")
}

/// Group order of K-233.
pub fn k233_n() -> U256 {
    from_be_hex("8000000000000000000000000000069d5bb915bcd46efb1ad5f173abdf")
}

/// Group order of B-163.
pub fn b163_n() -> U256 {
    from_be_hex("40000000000000000000292fe77e70c12a4234c33")
}

/// Group order of K-163.
pub fn k163_n() -> U256 {
    from_be_hex("4000000000000000000020108a2e0cc0d99f8a5ef")
}

/// x^256 + x^10 + x^5 + x^2 + 1
pub fn bin256() -> Poly {
    Poly {
        degree: 256,
        low: from_be_hex("425"),
    }
}

/// x^128 + x^7 + x^2 + x + 1
pub fn bin128() -> Poly {
    Poly {
        degree: 128,
        low: from_be_hex("87"),
    }
}

/// x^233 + x^74 + 1
pub fn bin233() -> Poly {
    Poly {
        degree: 233,
        low: from_be_hex("4000000000000000001"),
    }
}

/// x^163 + x^7 + x^6 + x^3 + 1
pub fn bin163() -> Poly {
    Poly {
        degree: 163,
        low: from_be_hex("c9"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bignum::bit;

    #[test]
    fn test_prime_widths() {
        assert!(bit(&p256_p(), 255));
        assert!(bit(&p224_p(), 223) && !bit(&p224_p(), 224));
        assert!(bit(&p192_n(), 191) && !bit(&p192_n(), 192));
        assert!(bit(&b233_n(), 232) && !bit(&b233_n(), 233));
        assert!(bit(&b163_n(), 162) && !bit(&b163_n(), 163));
    }

    #[test]
    fn test_polynomial_terms() {
        let p = bin233();
        assert!(bit(&p.low, 74) && bit(&p.low, 0));
        assert_eq!(bin163().low[0], 0xc9);
    }
}
