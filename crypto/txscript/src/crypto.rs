use collider_hashes::HashAlgorithm;
use secp256k1::{
    Message, PublicKey, SECP256K1, Scalar, SecretKey, XOnlyPublicKey,
    ecdsa::{RecoverableSignature, RecoveryId},
    schnorr,
};
use thiserror::Error;

/// Length of a recoverable ECDSA signature: `r || s || recovery_id`
pub const RECOVERABLE_SIGNATURE_SIZE: usize = 65;
/// Length of a BIP340 signature: `R.x || s`
pub const SCHNORR_SIGNATURE_SIZE: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error(transparent)]
    Secp256k1(#[from] secp256k1::Error),

    #[error("signature must be {0} bytes long, got {1}")]
    SignatureLength(usize, usize),

    #[error("nothing to combine")]
    Empty,

    #[error("signatures do not share the same nonce point")]
    MismatchedNonce,
}

/// The elliptic curve and hashing primitives the engine relies on. Messages are always 32 byte
/// digests computed by the caller.
pub trait CryptoProvider: Send + Sync {
    fn hash(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        algorithm.digest(data)
    }

    /// Produces a 65 byte recoverable ECDSA signature
    fn sign(&self, msg: &[u8; 32], secret_key: &SecretKey) -> Vec<u8>;

    fn verify(&self, msg: &[u8; 32], signature: &[u8], pub_key: &PublicKey) -> Result<bool, CryptoError>;

    fn recover_pubkey(&self, msg: &[u8; 32], signature: &[u8]) -> Result<PublicKey, CryptoError>;

    /// Point addition of all `keys`
    fn combine_pubkeys(&self, keys: &[PublicKey]) -> Result<PublicKey, CryptoError>;

    /// Aggregates partial BIP340 signatures sharing the same nonce point by summing their `s` values.
    fn combine_signatures(&self, signatures: &[schnorr::Signature]) -> Result<schnorr::Signature, CryptoError>;

    fn verify_schnorr(&self, msg: &[u8; 32], signature: &schnorr::Signature, pub_key: &XOnlyPublicKey) -> bool;
}

/// [`CryptoProvider`] backed by the global libsecp256k1 context
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1Provider;

pub static SECP256K1_PROVIDER: Secp256k1Provider = Secp256k1Provider;

fn parse_recoverable(signature: &[u8]) -> Result<RecoverableSignature, CryptoError> {
    if signature.len() != RECOVERABLE_SIGNATURE_SIZE {
        return Err(CryptoError::SignatureLength(RECOVERABLE_SIGNATURE_SIZE, signature.len()));
    }
    let recovery_id = RecoveryId::from_i32(signature[64] as i32)?;
    Ok(RecoverableSignature::from_compact(&signature[..64], recovery_id)?)
}

impl CryptoProvider for Secp256k1Provider {
    fn sign(&self, msg: &[u8; 32], secret_key: &SecretKey) -> Vec<u8> {
        let signature = SECP256K1.sign_ecdsa_recoverable(&Message::from_digest(*msg), secret_key);
        let (recovery_id, compact) = signature.serialize_compact();
        let mut serialized = Vec::with_capacity(RECOVERABLE_SIGNATURE_SIZE);
        serialized.extend_from_slice(&compact);
        serialized.push(recovery_id.to_i32() as u8);
        serialized
    }

    fn verify(&self, msg: &[u8; 32], signature: &[u8], pub_key: &PublicKey) -> Result<bool, CryptoError> {
        let signature = parse_recoverable(signature)?.to_standard();
        Ok(SECP256K1.verify_ecdsa(&Message::from_digest(*msg), &signature, pub_key).is_ok())
    }

    fn recover_pubkey(&self, msg: &[u8; 32], signature: &[u8]) -> Result<PublicKey, CryptoError> {
        let signature = parse_recoverable(signature)?;
        Ok(SECP256K1.recover_ecdsa(&Message::from_digest(*msg), &signature)?)
    }

    fn combine_pubkeys(&self, keys: &[PublicKey]) -> Result<PublicKey, CryptoError> {
        if keys.is_empty() {
            return Err(CryptoError::Empty);
        }
        Ok(PublicKey::combine_keys(&keys.iter().collect::<Vec<_>>())?)
    }

    fn combine_signatures(&self, signatures: &[schnorr::Signature]) -> Result<schnorr::Signature, CryptoError> {
        let (first, rest) = signatures.split_first().ok_or(CryptoError::Empty)?;
        let first = first.serialize();
        let (nonce, s) = first.split_at(32);
        let mut sum = SecretKey::from_slice(s)?;
        for signature in rest {
            let signature = signature.serialize();
            let (other_nonce, s) = signature.split_at(32);
            if other_nonce != nonce {
                return Err(CryptoError::MismatchedNonce);
            }
            let s: [u8; 32] = s.try_into().expect("split at half of a 64 byte array");
            let tweak = Scalar::from_be_bytes(s).map_err(|_| CryptoError::Secp256k1(secp256k1::Error::InvalidTweak))?;
            sum = sum.add_tweak(&tweak)?;
        }
        let mut combined = [0u8; SCHNORR_SIGNATURE_SIZE];
        combined[..32].copy_from_slice(nonce);
        combined[32..].copy_from_slice(&sum.secret_bytes());
        Ok(schnorr::Signature::from_slice(&combined)?)
    }

    fn verify_schnorr(&self, msg: &[u8; 32], signature: &schnorr::Signature, pub_key: &XOnlyPublicKey) -> bool {
        SECP256K1.verify_schnorr(signature, &Message::from_digest(*msg), pub_key).is_ok()
    }
}
