/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains single-block AES used by the emulated sequencer.

--*/

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};

/// AES key as held in the key buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AesKey {
    Aes128([u8; 16]),
    Aes256([u8; 32]),
}

/// Encrypts `block` in place.
pub fn aes_encrypt_block(key: &AesKey, block: &mut [u8; 16]) {
    let block = GenericArray::from_mut_slice(block);
    match key {
        AesKey::Aes128(k) => Aes128::new(GenericArray::from_slice(k)).encrypt_block(block),
        AesKey::Aes256(k) => Aes256::new(GenericArray::from_slice(k)).encrypt_block(block),
    }
}

/// Decrypts `block` in place.
pub fn aes_decrypt_block(key: &AesKey, block: &mut [u8; 16]) {
    let block = GenericArray::from_mut_slice(block);
    match key {
        AesKey::Aes128(k) => Aes128::new(GenericArray::from_slice(k)).decrypt_block(block),
        AesKey::Aes256(k) => Aes256::new(GenericArray::from_slice(k)).decrypt_block(block),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // FIPS-197 appendix C.1
    const KEY_128: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];
    const PLAINTEXT: [u8; 16] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff,
    ];
    const CIPHERTEXT_128: [u8; 16] = [
        0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, 0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4, 0xc5,
        0x5a,
    ];
    // FIPS-197 appendix C.3
    const CIPHERTEXT_256: [u8; 16] = [
        0x8e, 0xa2, 0xb7, 0xca, 0x51, 0x67, 0x45, 0xbf, 0xea, 0xfc, 0x49, 0x90, 0x4b, 0x49, 0x60,
        0x89,
    ];

    #[test]
    fn test_aes128_vector() {
        let key = AesKey::Aes128(KEY_128);
        let mut block = PLAINTEXT;
        aes_encrypt_block(&key, &mut block);
        assert_eq!(block, CIPHERTEXT_128);
        aes_decrypt_block(&key, &mut block);
        assert_eq!(block, PLAINTEXT);
    }

    #[test]
    fn test_aes256_vector() {
        let mut key = [0u8; 32];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut block = PLAINTEXT;
        aes_encrypt_block(&AesKey::Aes256(key), &mut block);
        assert_eq!(block, CIPHERTEXT_256);
    }
}
