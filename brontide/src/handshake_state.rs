use rand_core::CryptoRngCore;

use crate::config::HandshakeConfig;
use crate::crypto::curve;
use crate::crypto::hash::HASH_LEN;
use crate::error::Error;
use crate::keys::{KeyPair, PublicKey, StaticSecret};
use crate::symmetric_state::SymmetricState;

/// The Diffie-Hellman tokens of the XK pattern.
///
/// Each token names the initiator's key first: `Es` is the initiator's
/// ephemeral with the responder's static, so the responder computes it from
/// its own static and the remote ephemeral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DhToken {
    Es,
    Ee,
    Se,
}

/// HandshakeState: the transcript plus the four handshake keys.
///
/// `remote_static` is known from construction for the initiator and learned
/// in act three by the responder.
pub(crate) struct HandshakeState {
    symmetric: SymmetricState,
    initiator: bool,
    local_static: KeyPair,
    local_ephemeral: Option<KeyPair>,
    remote_static: Option<PublicKey>,
    remote_ephemeral: Option<PublicKey>,
}

impl HandshakeState {
    /// Initialize the transcript: protocol name, prologue, then the
    /// responder's static key (the XK pre-message `<- s`).
    pub fn new(
        config: &HandshakeConfig,
        initiator: bool,
        local: &KeyPair,
        remote_static: Option<PublicKey>,
    ) -> Result<Self, Error> {
        let responder_static = match (initiator, remote_static) {
            (true, Some(remote)) => remote,
            (false, None) => local.public,
            _ => return Err(Error::RemoteKeyMismatch),
        };

        let mut symmetric = SymmetricState::initialize(&config.protocol_name);
        symmetric.mix_hash(&config.prologue);
        symmetric.mix_hash(&responder_static.serialize());

        Ok(Self {
            symmetric,
            initiator,
            // The caller keeps its keypair for further connections; this copy
            // is dropped (and erased) with the handshake.
            local_static: local.clone(),
            local_ephemeral: None,
            remote_static,
            remote_ephemeral: None,
        })
    }

    pub fn symmetric_mut(&mut self) -> &mut SymmetricState {
        &mut self.symmetric
    }

    pub fn symmetric(&self) -> &SymmetricState {
        &self.symmetric
    }

    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        self.symmetric.handshake_hash()
    }

    pub fn local_static(&self) -> &KeyPair {
        &self.local_static
    }

    pub fn remote_static(&self) -> Option<&PublicKey> {
        self.remote_static.as_ref()
    }

    /// `e`: generate a fresh ephemeral keypair and hash its public half.
    ///
    /// Returns the serialized public key for the outgoing act.
    pub fn write_ephemeral(
        &mut self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<[u8; PublicKey::LEN], Error> {
        let (secret, public) = curve::generate_keypair(rng)?;
        let ephemeral = KeyPair {
            secret: StaticSecret::from_curve(secret),
            public: PublicKey::from_curve(public),
        };
        let serialized = ephemeral.public.serialize();
        self.symmetric.mix_hash(&serialized);
        self.local_ephemeral = Some(ephemeral);
        Ok(serialized)
    }

    /// `e`: parse the peer's ephemeral key and hash it.
    pub fn read_ephemeral(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let remote = PublicKey::from_bytes(bytes)?;
        self.symmetric.mix_hash(&remote.serialize());
        self.remote_ephemeral = Some(remote);
        Ok(())
    }

    /// Record the initiator's static key, learned from act three.
    pub fn set_remote_static(&mut self, remote: PublicKey) {
        self.remote_static = Some(remote);
    }

    /// Compute the DH for `token` from this side's point of view and ratchet
    /// the chaining key with it.
    pub fn mix_dh(&mut self, token: DhToken) -> Result<(), Error> {
        let (local, remote) = match (token, self.initiator) {
            (DhToken::Ee, _) => (self.ephemeral()?, self.remote_ephemeral()?),
            (DhToken::Es, true) | (DhToken::Se, false) => {
                (self.ephemeral()?, self.remote_static_key()?)
            }
            (DhToken::Es, false) | (DhToken::Se, true) => {
                (&self.local_static.secret, self.remote_ephemeral()?)
            }
        };
        let shared = curve::dh(local.inner(), remote.inner());
        self.symmetric.mix_key(shared.as_bytes());
        Ok(())
    }

    fn ephemeral(&self) -> Result<&StaticSecret, Error> {
        self.local_ephemeral
            .as_ref()
            .map(|kp| &kp.secret)
            .ok_or(Error::WrongState)
    }

    fn remote_ephemeral(&self) -> Result<&PublicKey, Error> {
        self.remote_ephemeral.as_ref().ok_or(Error::WrongState)
    }

    fn remote_static_key(&self) -> Result<&PublicKey, Error> {
        self.remote_static.as_ref().ok_or(Error::WrongState)
    }
}
