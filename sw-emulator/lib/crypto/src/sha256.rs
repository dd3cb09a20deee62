/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains the SHA-256 compression function used by the emulated
    sequencer.

--*/

use sha2::digest::consts::U64;
use sha2::digest::generic_array::GenericArray;

pub const SHA256_BLOCK_SIZE: usize = 64;

/// SHA-256 initial hash value
#[rustfmt::skip]
pub const SHA256_IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
    0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Folds one 64-byte message block into `state` (H0..H7).
pub fn sha256_compress(state: &mut [u32; 8], block: &[u8; SHA256_BLOCK_SIZE]) {
    let block = *GenericArray::<u8, U64>::from_slice(block);
    sha2::compress256(state, &[block]);
}
