use thiserror::Error;

/// Errors that can occur during the handshake or the transport phase.
///
/// `AuthenticationFailure` deliberately carries no detail: a wrong key, a
/// tampered packet and a prologue mismatch all look the same to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The random source failed, or never yielded a valid secp256k1 scalar.
    #[error("failed to generate ephemeral key material")]
    RandomnessFailure,
    /// A public key is malformed or not on the curve, or a secret is out of range.
    #[error("invalid key encoding")]
    InvalidKeyEncoding,
    /// An AEAD tag did not verify.
    #[error("authentication failed")]
    AuthenticationFailure,
    /// The underlying stream failed (short read, short write, closed, ...).
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),
    /// An operation was attempted in the wrong state, or after a fatal failure.
    #[error("operation not valid in current state")]
    WrongState,
    /// The initiator was built without a remote static key, or the responder with one.
    #[error("remote static key must be given for the initiator and omitted for the responder")]
    RemoteKeyMismatch,
    /// A transport payload exceeds the configured limit.
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
    /// The nonce counter has been exhausted (2^64 - 1 operations under one key).
    #[error("nonce counter exhausted")]
    NonceExhausted,
    /// The buffer handed to the AEAD cannot hold the ciphertext and its tag.
    #[error("output buffer too small")]
    BufferTooSmall,
    /// The AEAD refused to encrypt (keystream limit reached).
    #[error("encryption failed")]
    CryptoFailed,
}

impl Error {
    /// Whether this error came from the underlying stream rather than the protocol.
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}
