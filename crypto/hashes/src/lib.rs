mod hashers;

use std::fmt::{Display, Formatter};

pub use hashers::*;

/// Hash algorithm selector exposed to the script engine and the crypto provider.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Ripemd160,
    Hash160,
    Hash256,
    Blake2bl,
    Blake2bls,
    Blake2blc,
}

impl HashAlgorithm {
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => sha1(data).to_vec(),
            HashAlgorithm::Sha256 => sha256(data).to_vec(),
            HashAlgorithm::Ripemd160 => ripemd160(data).to_vec(),
            HashAlgorithm::Hash160 => hash160(data).to_vec(),
            HashAlgorithm::Hash256 => hash256(data).to_vec(),
            HashAlgorithm::Blake2bl => blake2bl(data).to_vec(),
            HashAlgorithm::Blake2bls => blake2bls(data).to_vec(),
            HashAlgorithm::Blake2blc => blake2blc(data).to_vec(),
        }
    }

    /// Lowercase hex digest of `data`.
    pub fn hex_digest(self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Ripemd160 => "ripemd160",
            HashAlgorithm::Hash160 => "hash160",
            HashAlgorithm::Hash256 => "hash256",
            HashAlgorithm::Blake2bl => "blake2bl",
            HashAlgorithm::Blake2bls => "blake2bls",
            HashAlgorithm::Blake2blc => "blake2blc",
        };
        f.write_str(name)
    }
}
