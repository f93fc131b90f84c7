use blake2b_simd::Params;
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

pub const BLAKE2BL_SIZE: usize = 32;
pub const BLAKE2BLS_SIZE: usize = 16;

pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// SHA256(SHA256(data))
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// The trailing 32 bytes of a 64 byte blake2b digest.
pub fn blake2bl(data: &[u8]) -> [u8; BLAKE2BL_SIZE] {
    let digest = Params::new().hash_length(64).hash(data);
    let mut out = [0u8; BLAKE2BL_SIZE];
    out.copy_from_slice(&digest.as_bytes()[64 - BLAKE2BL_SIZE..]);
    out
}

/// The trailing 16 bytes of a 32 byte blake2b digest.
pub fn blake2bls(data: &[u8]) -> [u8; BLAKE2BLS_SIZE] {
    let digest = Params::new().hash_length(32).hash(data);
    let mut out = [0u8; BLAKE2BLS_SIZE];
    out.copy_from_slice(&digest.as_bytes()[32 - BLAKE2BLS_SIZE..]);
    out
}

/// BLAKE2BLS applied over the BLAKE2BL digest.
pub fn blake2blc(data: &[u8]) -> [u8; BLAKE2BLS_SIZE] {
    blake2bls(&blake2bl(data))
}
