use rand_core::CryptoRngCore;
use secp256k1::{PublicKey as CurvePublicKey, SecretKey};

use crate::crypto::curve::{self, PUBKEY_LEN, SECRET_LEN};
use crate::error::Error;

/// A secp256k1 secret key.
///
/// Erased from memory when dropped.
#[derive(Clone)]
pub struct StaticSecret(SecretKey);

impl Drop for StaticSecret {
    fn drop(&mut self) {
        self.0.non_secure_erase();
    }
}

impl StaticSecret {
    /// Create from raw 32-byte secret key material.
    ///
    /// Fails with [`Error::InvalidKeyEncoding`] for zero or values at or
    /// above the curve order.
    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Result<Self, Error> {
        curve::parse_secret(&bytes).map(Self)
    }

    pub(crate) fn from_curve(secret: SecretKey) -> Self {
        Self(secret)
    }

    /// Export the raw 32-byte secret key material.
    pub fn to_bytes(&self) -> [u8; SECRET_LEN] {
        self.0.secret_bytes()
    }

    pub(crate) fn inner(&self) -> &SecretKey {
        &self.0
    }
}

impl core::fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("StaticSecret([REDACTED])")
    }
}

/// A secp256k1 public key, exchanged on the wire in 33-byte compressed form.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(CurvePublicKey);

impl PublicKey {
    /// The length of a serialized public key in bytes.
    pub const LEN: usize = PUBKEY_LEN;

    /// Parse a compressed public key, rejecting off-curve or malformed encodings.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        curve::parse_compressed(bytes).map(Self)
    }

    pub(crate) fn from_curve(public: CurvePublicKey) -> Self {
        Self(public)
    }

    /// The 33-byte compressed encoding.
    pub fn serialize(&self) -> [u8; PUBKEY_LEN] {
        self.0.serialize()
    }

    pub(crate) fn inner(&self) -> &CurvePublicKey {
        &self.0
    }
}

impl core::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PublicKey({:02x?})", &self.serialize()[..5])
    }
}

/// A static secret and its corresponding public key.
///
/// Long-lived: one keypair may back any number of handshakes.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub secret: StaticSecret,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random keypair using the provided RNG.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Result<Self, Error> {
        let (secret, public) = curve::generate_keypair(rng)?;
        Ok(Self {
            secret: StaticSecret(secret),
            public: PublicKey(public),
        })
    }

    /// Create a keypair from an existing static secret.
    pub fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey(curve::public_from_secret(secret.inner()));
        Self { secret, public }
    }

    /// Create a keypair from raw 32-byte secret key material.
    ///
    /// Derives the corresponding public key automatically.
    pub fn from_secret_bytes(bytes: [u8; SECRET_LEN]) -> Result<Self, Error> {
        StaticSecret::from_bytes(bytes).map(Self::from_secret)
    }

    /// Export the raw 32-byte secret key material.
    pub fn secret_bytes(&self) -> [u8; SECRET_LEN] {
        self.secret.to_bytes()
    }
}
