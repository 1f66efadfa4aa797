use rand_core::CryptoRngCore;
use secp256k1::{ecdh::shared_secret_point, PublicKey as CurvePublicKey, SecretKey, SECP256K1};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::Error;

/// Length of a compressed secp256k1 public key.
pub const PUBKEY_LEN: usize = 33;
/// Length of a secp256k1 secret scalar.
pub const SECRET_LEN: usize = 32;
/// DH output length in bytes.
pub const DH_LEN: usize = 32;

/// Attempts at drawing a valid scalar before giving up on the RNG.
///
/// A uniformly random 32-byte string is out of range with probability
/// below 2^-127, so repeated failures mean the source is broken.
const KEYGEN_ATTEMPTS: usize = 8;

/// A shared secret resulting from a Diffie-Hellman operation.
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; DH_LEN]);

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

impl SharedSecret {
    /// Access the raw 32-byte shared secret.
    pub fn as_bytes(&self) -> &[u8; DH_LEN] {
        &self.0
    }
}

/// Draw a fresh secret scalar from `rng` and derive its public point.
pub fn generate_keypair(
    rng: &mut impl CryptoRngCore,
) -> Result<(SecretKey, CurvePublicKey), Error> {
    let mut bytes = Zeroizing::new([0u8; SECRET_LEN]);
    for _ in 0..KEYGEN_ATTEMPTS {
        rng.try_fill_bytes(bytes.as_mut_slice())
            .map_err(|_| Error::RandomnessFailure)?;
        if let Ok(secret) = SecretKey::from_slice(bytes.as_slice()) {
            let public = CurvePublicKey::from_secret_key(SECP256K1, &secret);
            return Ok((secret, public));
        }
    }
    Err(Error::RandomnessFailure)
}

/// Parse a secret scalar, rejecting zero and values at or above the group order.
pub fn parse_secret(bytes: &[u8; SECRET_LEN]) -> Result<SecretKey, Error> {
    SecretKey::from_slice(bytes).map_err(|_| Error::InvalidKeyEncoding)
}

/// Derive the public point for a secret scalar.
pub fn public_from_secret(secret: &SecretKey) -> CurvePublicKey {
    CurvePublicKey::from_secret_key(SECP256K1, secret)
}

/// Parse a 33-byte compressed point.
///
/// Rejects bad prefixes, x coordinates outside the field and x values with
/// no corresponding curve point, closing off invalid-curve attacks.
pub fn parse_compressed(bytes: &[u8]) -> Result<CurvePublicKey, Error> {
    if bytes.len() != PUBKEY_LEN {
        return Err(Error::InvalidKeyEncoding);
    }
    CurvePublicKey::from_slice(bytes).map_err(|_| Error::InvalidKeyEncoding)
}

/// Perform ECDH between a local scalar and a remote point.
///
/// The shared secret is the 32-byte big-endian X coordinate of `local * remote`.
pub fn dh(local: &SecretKey, remote: &CurvePublicKey) -> SharedSecret {
    let point = Zeroizing::new(shared_secret_point(remote, local));
    let mut x = [0u8; DH_LEN];
    x.copy_from_slice(&point[..DH_LEN]);
    SharedSecret(x)
}
