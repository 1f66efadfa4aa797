//! Cryptographic primitives for the Noise_XK handshake.
//!
//! - [`aead`]: ChaCha20-Poly1305 AEAD encryption
//! - [`hash`]: SHA-256 hashing and HKDF
//! - [`curve`]: secp256k1 key generation, compressed encoding and ECDH

pub mod aead;
pub mod curve;
pub mod hash;
