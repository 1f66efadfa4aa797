use std::io::{Read, Write};

use rand_core::{CryptoRngCore, OsRng};

use crate::config::HandshakeConfig;
use crate::crypto::aead::AEAD_TAG_LEN;
use crate::crypto::curve::PUBKEY_LEN;
use crate::crypto::hash::HASH_LEN;
use crate::error::Error;
use crate::handshake_state::{DhToken, HandshakeState};
use crate::keys::{KeyPair, PublicKey};
use crate::transport::TransportState;

/// Act one: initiator's compressed ephemeral key and an empty-payload tag.
pub const ACT_ONE_SIZE: usize = PUBKEY_LEN + AEAD_TAG_LEN;

/// Act two: responder's compressed ephemeral key and an empty-payload tag.
pub const ACT_TWO_SIZE: usize = PUBKEY_LEN + AEAD_TAG_LEN;

/// Act three: initiator's encrypted static key and an empty-payload tag.
pub const ACT_THREE_SIZE: usize = PUBKEY_LEN + AEAD_TAG_LEN + AEAD_TAG_LEN;

/// One message of the three-act handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Act {
    One,
    Two,
    Three,
}

impl Act {
    /// Size of this act on the wire.
    pub const fn size(self) -> usize {
        match self {
            Self::One => ACT_ONE_SIZE,
            Self::Two => ACT_TWO_SIZE,
            Self::Three => ACT_THREE_SIZE,
        }
    }
}

/// The current action the caller must take to advance the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Generate this act and send it to the peer.
    GenAct(Act),
    /// Read this act (exactly [`Act::size`] bytes) from the peer and feed it in.
    RecvAct(Act),
    /// The handshake is done; use `write_message` / `read_message`.
    Transport,
    /// A step failed. The machine must be discarded.
    Failed,
}

/// Internal state tracking which act comes next.
///
/// Initiator: GenActOne -> RecvActTwo -> GenActThree -> Transport.
/// Responder: RecvActOne -> GenActTwo -> RecvActThree -> Transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    GenActOne,
    RecvActOne,
    GenActTwo,
    RecvActTwo,
    GenActThree,
    RecvActThree,
    Transport,
    Failed,
}

/// A Noise_XK handshake over secp256k1 followed by length-hiding transport.
///
/// The acts proceed in the following order (initiator on the left):
///
/// ```text
///   <- s
///   ...
///   gen_act_one()   -> e, es   ->  recv_act_one()
///   recv_act_two()  <- e, ee   <-  gen_act_two()
///   gen_act_three() -> s, se   ->  recv_act_three()
/// ```
///
/// After act three both sides hold a send and a receive CipherState. Any
/// failure along the way is final: the machine answers every later call
/// with [`Error::WrongState`].
pub struct Machine {
    config: HandshakeConfig,
    initiator: bool,
    phase: Phase,
    /// Present until the split (or the first failure).
    handshake: Option<HandshakeState>,
    /// Present after the split.
    transport: Option<TransportState>,
}

impl Machine {
    /// Create a machine with the default protocol name and prologue.
    ///
    /// `remote_static` must be the responder's key when `initiator` is true,
    /// and `None` otherwise.
    pub fn new(
        initiator: bool,
        local: &KeyPair,
        remote_static: Option<PublicKey>,
    ) -> Result<Self, Error> {
        Self::with_config(&HandshakeConfig::default(), initiator, local, remote_static)
    }

    pub fn with_config(
        config: &HandshakeConfig,
        initiator: bool,
        local: &KeyPair,
        remote_static: Option<PublicKey>,
    ) -> Result<Self, Error> {
        let handshake = HandshakeState::new(config, initiator, local, remote_static)?;
        Ok(Self {
            config: config.clone(),
            initiator,
            phase: if initiator {
                Phase::GenActOne
            } else {
                Phase::RecvActOne
            },
            handshake: Some(handshake),
            transport: None,
        })
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    /// What the caller should do next.
    pub fn next_action(&self) -> HandshakeAction {
        match self.phase {
            Phase::GenActOne => HandshakeAction::GenAct(Act::One),
            Phase::RecvActOne => HandshakeAction::RecvAct(Act::One),
            Phase::GenActTwo => HandshakeAction::GenAct(Act::Two),
            Phase::RecvActTwo => HandshakeAction::RecvAct(Act::Two),
            Phase::GenActThree => HandshakeAction::GenAct(Act::Three),
            Phase::RecvActThree => HandshakeAction::RecvAct(Act::Three),
            Phase::Transport => HandshakeAction::Transport,
            Phase::Failed => HandshakeAction::Failed,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Transport
    }

    /// The peer's static key: known up front by the initiator, learned in
    /// act three by the responder.
    pub fn remote_static(&self) -> Option<PublicKey> {
        match (&self.handshake, &self.transport) {
            (_, Some(transport)) => Some(*transport.remote_static()),
            (Some(handshake), None) => handshake.remote_static().copied(),
            (None, None) => None,
        }
    }

    /// The current (or, after the split, final) handshake digest.
    pub fn handshake_hash(&self) -> Option<&[u8; HASH_LEN]> {
        match (&self.handshake, &self.transport) {
            (_, Some(transport)) => Some(transport.handshake_hash()),
            (Some(handshake), None) => Some(handshake.handshake_hash()),
            (None, None) => None,
        }
    }

    /// Act one (initiator): `-> e, es`.
    pub fn gen_act_one(&mut self) -> Result<[u8; ACT_ONE_SIZE], Error> {
        self.gen_act_one_with_rng(&mut OsRng)
    }

    /// Act one with a specific RNG for the ephemeral key (useful for testing).
    pub fn gen_act_one_with_rng(
        &mut self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<[u8; ACT_ONE_SIZE], Error> {
        self.step(Phase::GenActOne, Phase::RecvActTwo, |hs| {
            gen_ephemeral_act(hs, rng, DhToken::Es)
        })
    }

    /// Act one (responder). Fails if the initiator used the wrong static key
    /// for us, or a different protocol name or prologue.
    pub fn recv_act_one(&mut self, act: &[u8; ACT_ONE_SIZE]) -> Result<(), Error> {
        self.step(Phase::RecvActOne, Phase::GenActTwo, |hs| {
            recv_ephemeral_act(hs, act, DhToken::Es)
        })
    }

    /// Act two (responder): `<- e, ee`.
    pub fn gen_act_two(&mut self) -> Result<[u8; ACT_TWO_SIZE], Error> {
        self.gen_act_two_with_rng(&mut OsRng)
    }

    /// Act two with a specific RNG for the ephemeral key (useful for testing).
    pub fn gen_act_two_with_rng(
        &mut self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<[u8; ACT_TWO_SIZE], Error> {
        self.step(Phase::GenActTwo, Phase::RecvActThree, |hs| {
            gen_ephemeral_act(hs, rng, DhToken::Ee)
        })
    }

    /// Act two (initiator).
    pub fn recv_act_two(&mut self, act: &[u8; ACT_TWO_SIZE]) -> Result<(), Error> {
        self.step(Phase::RecvActTwo, Phase::GenActThree, |hs| {
            recv_ephemeral_act(hs, act, DhToken::Ee)
        })
    }

    /// Act three (initiator): `-> s, se`, then derive the transport keys.
    pub fn gen_act_three(&mut self) -> Result<[u8; ACT_THREE_SIZE], Error> {
        let act = self.step(Phase::GenActThree, Phase::Transport, |hs| {
            let local_static = hs.local_static().public.serialize();
            let encrypted_static = hs.symmetric_mut().encrypt_and_hash(&local_static)?;
            hs.mix_dh(DhToken::Se)?;
            let tag = hs.symmetric_mut().encrypt_and_hash(&[])?;

            let mut act = [0u8; ACT_THREE_SIZE];
            act[..PUBKEY_LEN + AEAD_TAG_LEN].copy_from_slice(&encrypted_static);
            act[PUBKEY_LEN + AEAD_TAG_LEN..].copy_from_slice(&tag);
            Ok(act)
        })?;
        self.split()?;
        Ok(act)
    }

    /// Act three (responder). Success authenticates the initiator, whose
    /// static key is then available from [`remote_static`](Self::remote_static).
    pub fn recv_act_three(&mut self, act: &[u8; ACT_THREE_SIZE]) -> Result<(), Error> {
        self.step(Phase::RecvActThree, Phase::Transport, |hs| {
            let (encrypted_static, tag) = act.split_at(PUBKEY_LEN + AEAD_TAG_LEN);
            let remote_bytes = hs.symmetric_mut().decrypt_and_hash(encrypted_static)?;
            hs.set_remote_static(PublicKey::from_bytes(&remote_bytes)?);
            hs.mix_dh(DhToken::Se)?;
            hs.symmetric_mut().decrypt_and_hash(tag)?;
            Ok(())
        })?;
        self.split()
    }

    /// Encrypt `payload` and write it as one frame.
    pub fn write_message<W: Write>(&mut self, writer: &mut W, payload: &[u8]) -> Result<(), Error> {
        self.transport_mut()?.write_message(writer, payload)
    }

    /// Read and decrypt one frame.
    pub fn read_message<R: Read>(&mut self, reader: &mut R) -> Result<Vec<u8>, Error> {
        self.transport_mut()?.read_message(reader)
    }

    pub fn transport_mut(&mut self) -> Result<&mut TransportState, Error> {
        self.transport.as_mut().ok_or(Error::WrongState)
    }

    /// Give up the handshake scaffolding and keep only the transport state.
    pub fn into_transport(self) -> Result<TransportState, Error> {
        self.transport.ok_or(Error::WrongState)
    }

    /// Run one act if the machine is in `expected`, moving to `next` on
    /// success and to `Failed` (discarding all handshake state) on error.
    fn step<T>(
        &mut self,
        expected: Phase,
        next: Phase,
        f: impl FnOnce(&mut HandshakeState) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self.phase != expected {
            return Err(Error::WrongState);
        }
        let hs = self.handshake.as_mut().ok_or(Error::WrongState)?;
        match f(hs) {
            Ok(out) => {
                tracing::debug!(
                    initiator = self.initiator,
                    phase = ?expected,
                    "handshake act done"
                );
                self.phase = next;
                Ok(out)
            }
            Err(e) => {
                tracing::warn!(
                    initiator = self.initiator,
                    phase = ?expected,
                    error = %e,
                    "handshake aborted"
                );
                self.fail();
                Err(e)
            }
        }
    }

    /// Derive the two transport CipherStates and drop everything else.
    fn split(&mut self) -> Result<(), Error> {
        let hs = self.handshake.take().ok_or(Error::WrongState)?;
        let Some(remote_static) = hs.remote_static().copied() else {
            self.fail();
            return Err(Error::WrongState);
        };
        let (c1, c2) = hs.symmetric().split();
        self.transport = Some(TransportState::new(
            c1,
            c2,
            self.initiator,
            self.config.max_payload_len,
            *hs.handshake_hash(),
            remote_static,
        ));
        tracing::debug!(initiator = self.initiator, "handshake complete, transport keys derived");
        Ok(())
    }

    fn fail(&mut self) {
        self.phase = Phase::Failed;
        self.handshake = None;
        self.transport = None;
    }
}

/// Acts one and two: `e` followed by one DH and an empty-payload tag.
fn gen_ephemeral_act(
    hs: &mut HandshakeState,
    rng: &mut impl CryptoRngCore,
    token: DhToken,
) -> Result<[u8; ACT_ONE_SIZE], Error> {
    let ephemeral = hs.write_ephemeral(rng)?;
    hs.mix_dh(token)?;
    let tag = hs.symmetric_mut().encrypt_and_hash(&[])?;

    let mut act = [0u8; ACT_ONE_SIZE];
    act[..PUBKEY_LEN].copy_from_slice(&ephemeral);
    act[PUBKEY_LEN..].copy_from_slice(&tag);
    Ok(act)
}

fn recv_ephemeral_act(
    hs: &mut HandshakeState,
    act: &[u8; ACT_ONE_SIZE],
    token: DhToken,
) -> Result<(), Error> {
    let (ephemeral, tag) = act.split_at(PUBKEY_LEN);
    hs.read_ephemeral(ephemeral)?;
    hs.mix_dh(token)?;
    hs.symmetric_mut().decrypt_and_hash(tag)?;
    Ok(())
}
