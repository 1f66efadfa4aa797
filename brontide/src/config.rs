//! Handshake configuration and the keypair-first [`Builder`].

use crate::error::Error;
use crate::keys::{KeyPair, PublicKey};
use crate::machine::Machine;

/// The Noise protocol name hashed into the initial transcript.
pub const PROTOCOL_NAME: &[u8] = b"Noise_XK_secp256k1_ChaChaPoly_SHA256";

/// Domain-separation prologue mixed in right after the protocol name.
pub const DEFAULT_PROLOGUE: &[u8] = b"bitcoin";

/// Largest transport payload accepted by default.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Parameters both peers must agree on before the first act.
///
/// A mismatch in `protocol_name` or `prologue` surfaces as an
/// [`Error::AuthenticationFailure`] in act one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    pub protocol_name: Vec<u8>,
    pub prologue: Vec<u8>,
    /// Largest plaintext a transport frame may carry, in either direction.
    pub max_payload_len: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            protocol_name: PROTOCOL_NAME.to_vec(),
            prologue: DEFAULT_PROLOGUE.to_vec(),
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

/// Builds initiator and responder [`Machine`]s from a local keypair.
///
/// ```rust
/// use brontide::{Builder, KeyPair};
/// use rand_core::OsRng;
///
/// let server_keypair = KeyPair::generate(&mut OsRng).unwrap();
/// let server_public = server_keypair.public;
///
/// let responder = Builder::new(server_keypair).build_responder().unwrap();
///
/// let client_keypair = KeyPair::generate(&mut OsRng).unwrap();
/// let initiator = Builder::new(client_keypair)
///     .with_remote_public(server_public)
///     .build_initiator()
///     .unwrap();
/// # let _ = (responder, initiator);
/// ```
pub struct Builder {
    local: KeyPair,
    remote_public: Option<PublicKey>,
    config: HandshakeConfig,
}

impl Builder {
    pub fn new(local: KeyPair) -> Self {
        Self {
            local,
            remote_public: None,
            config: HandshakeConfig::default(),
        }
    }

    /// Set the responder's static key. Required for the initiator.
    pub fn with_remote_public(mut self, remote: PublicKey) -> Self {
        self.remote_public = Some(remote);
        self
    }

    pub fn with_protocol_name(mut self, name: &[u8]) -> Self {
        self.config.protocol_name = name.to_vec();
        self
    }

    pub fn with_prologue(mut self, prologue: &[u8]) -> Self {
        self.config.prologue = prologue.to_vec();
        self
    }

    pub fn with_max_payload_len(mut self, max: usize) -> Self {
        self.config.max_payload_len = max;
        self
    }

    pub fn with_config(mut self, config: HandshakeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build_initiator(self) -> Result<Machine, Error> {
        Machine::with_config(&self.config, true, &self.local, self.remote_public)
    }

    pub fn build_responder(self) -> Result<Machine, Error> {
        Machine::with_config(&self.config, false, &self.local, self.remote_public)
    }
}
