//! Post-handshake framing.
//!
//! Every message is sent as an encrypted 8-byte big-endian length header
//! followed by the encrypted payload, with the header ciphertext used as the
//! payload's associated data:
//!
//! ```text
//! +-------------------------------+------------------------------+
//! | ENC(len(payload) + 16) || tag | ENC(payload) || tag          |
//! |            24 bytes           |  len(payload) + 16 bytes     |
//! +-------------------------------+------------------------------+
//! ```
//!
//! A message costs two nonces on the sending direction's CipherState, and
//! the receiver must consume them in the same order.

use std::io::{Read, Write};

use crate::cipher_state::CipherState;
use crate::crypto::aead::AEAD_TAG_LEN;
use crate::crypto::hash::HASH_LEN;
use crate::error::Error;
use crate::keys::PublicKey;

/// Plaintext length of the frame header.
pub const LENGTH_HEADER_LEN: usize = 8;

/// Encrypted frame header length on the wire.
pub const ENCRYPTED_HEADER_LEN: usize = LENGTH_HEADER_LEN + AEAD_TAG_LEN;

/// Upper bound on the body buffer reserved before any body bytes are read.
const INITIAL_BODY_CAPACITY: usize = 64 * 1024 + AEAD_TAG_LEN;

/// The sending half of an established session.
///
/// Any failure after a nonce has been spent leaves the peer unable to follow
/// the nonce sequence, so the half refuses further use.
pub struct TransportSender {
    cipher: CipherState,
    max_payload_len: usize,
    poisoned: bool,
}

impl TransportSender {
    fn new(cipher: CipherState, max_payload_len: usize) -> Self {
        Self {
            cipher,
            max_payload_len,
            poisoned: false,
        }
    }

    /// Encrypt `payload` into a complete frame (header followed by body).
    pub fn encrypt_frame(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        if self.poisoned {
            return Err(Error::WrongState);
        }
        if payload.len() > self.max_payload_len {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                max: self.max_payload_len,
            });
        }

        let result = self.seal(payload);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn seal(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let body_len = (payload.len() + AEAD_TAG_LEN) as u64;
        let nonce = self.cipher.nonce();

        let header = self.cipher.encrypt_with_ad(&[], &body_len.to_be_bytes())?;
        let body = self.cipher.encrypt_with_ad(&header, payload)?;

        tracing::trace!(nonce, payload_len = payload.len(), "sealed frame");

        let mut frame = header;
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Encrypt `payload` and write the frame to `writer`.
    pub fn write_message<W: Write>(&mut self, writer: &mut W, payload: &[u8]) -> Result<(), Error> {
        let frame = self.encrypt_frame(payload)?;
        if let Err(e) = writer.write_all(&frame) {
            // The peer may have seen part of the frame; the nonces are spent.
            self.poisoned = true;
            return Err(e.into());
        }
        Ok(())
    }

    /// The nonce the next header encryption will use.
    pub fn nonce(&self) -> u64 {
        self.cipher.nonce()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    #[cfg(test)]
    pub(crate) fn cipher(&self) -> &CipherState {
        &self.cipher
    }
}

/// The receiving half of an established session.
///
/// Decryption failures are fatal: once a header or body fails to
/// authenticate, the half refuses further use.
pub struct TransportReceiver {
    cipher: CipherState,
    max_payload_len: usize,
    /// Body length announced by a header that has not been consumed yet.
    pending_body: Option<usize>,
    poisoned: bool,
}

impl TransportReceiver {
    fn new(cipher: CipherState, max_payload_len: usize) -> Self {
        Self {
            cipher,
            max_payload_len,
            pending_body: None,
            poisoned: false,
        }
    }

    /// Decrypt a frame header, returning the length of the encrypted body
    /// that follows it (payload plus tag).
    pub fn decrypt_header(&mut self, header: &[u8; ENCRYPTED_HEADER_LEN]) -> Result<usize, Error> {
        if self.poisoned || self.pending_body.is_some() {
            return Err(Error::WrongState);
        }
        let result = self.open_header(header);
        match result {
            Ok(body_len) => self.pending_body = Some(body_len),
            Err(_) => self.poisoned = true,
        }
        result
    }

    fn open_header(&mut self, header: &[u8; ENCRYPTED_HEADER_LEN]) -> Result<usize, Error> {
        let nonce = self.cipher.nonce();
        let plaintext = self.cipher.decrypt_with_ad(&[], header).map_err(|e| {
            tracing::warn!(nonce, "frame header failed authentication");
            e
        })?;

        let mut len_bytes = [0u8; LENGTH_HEADER_LEN];
        len_bytes.copy_from_slice(&plaintext);
        let body_len = u64::from_be_bytes(len_bytes);

        let limit = self.max_payload_len.saturating_add(AEAD_TAG_LEN);
        let body_len = usize::try_from(body_len).unwrap_or(usize::MAX);
        if body_len > limit {
            return Err(Error::PayloadTooLarge {
                len: body_len.saturating_sub(AEAD_TAG_LEN),
                max: self.max_payload_len,
            });
        }
        Ok(body_len)
    }

    /// Decrypt the body announced by the last header.
    ///
    /// `header` must be the same 24 bytes passed to [`decrypt_header`], as
    /// they are the body's associated data.
    ///
    /// [`decrypt_header`]: Self::decrypt_header
    pub fn decrypt_body(
        &mut self,
        header: &[u8; ENCRYPTED_HEADER_LEN],
        body: &[u8],
    ) -> Result<Vec<u8>, Error> {
        if self.poisoned || self.pending_body.take().is_none() {
            return Err(Error::WrongState);
        }
        let nonce = self.cipher.nonce();
        match self.cipher.decrypt_with_ad(header, body) {
            Ok(payload) => {
                tracing::trace!(nonce, payload_len = payload.len(), "opened frame");
                Ok(payload)
            }
            Err(e) => {
                tracing::warn!(nonce, "frame body failed authentication");
                self.poisoned = true;
                Err(e)
            }
        }
    }

    /// Read one frame from `reader` and return its payload.
    ///
    /// Blocks until the whole frame has arrived.
    pub fn read_message<R: Read>(&mut self, reader: &mut R) -> Result<Vec<u8>, Error> {
        if self.poisoned || self.pending_body.is_some() {
            return Err(Error::WrongState);
        }

        let mut header = [0u8; ENCRYPTED_HEADER_LEN];
        if let Err(e) = reader.read_exact(&mut header) {
            self.poisoned = true;
            return Err(e.into());
        }
        let body_len = self.decrypt_header(&header)?;

        // Grows with the bytes that actually arrive, so a large announced
        // length under a generous limit cannot force a huge allocation.
        let mut body = Vec::with_capacity(body_len.min(INITIAL_BODY_CAPACITY));
        let read = reader.by_ref().take(body_len as u64).read_to_end(&mut body);
        match read {
            Ok(n) if n == body_len => {}
            Ok(_) => {
                self.poisoned = true;
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            Err(e) => {
                self.poisoned = true;
                return Err(e.into());
            }
        }
        self.decrypt_body(&header, &body)
    }

    /// The nonce the next header decryption will use.
    pub fn nonce(&self) -> u64 {
        self.cipher.nonce()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    #[cfg(test)]
    pub(crate) fn cipher(&self) -> &CipherState {
        &self.cipher
    }
}

/// Post-handshake transport state: both directions plus the session's
/// identity material.
///
/// The key assignment depends on which side this is:
/// - Initiator: c1 = send, c2 = recv
/// - Responder: c1 = recv, c2 = send
pub struct TransportState {
    sender: TransportSender,
    receiver: TransportReceiver,
    handshake_hash: [u8; HASH_LEN],
    remote_static: PublicKey,
}

impl TransportState {
    pub(crate) fn new(
        c1: CipherState,
        c2: CipherState,
        is_initiator: bool,
        max_payload_len: usize,
        handshake_hash: [u8; HASH_LEN],
        remote_static: PublicKey,
    ) -> Self {
        let (send, recv) = if is_initiator { (c1, c2) } else { (c2, c1) };
        Self {
            sender: TransportSender::new(send, max_payload_len),
            receiver: TransportReceiver::new(recv, max_payload_len),
            handshake_hash,
            remote_static,
        }
    }

    pub fn write_message<W: Write>(&mut self, writer: &mut W, payload: &[u8]) -> Result<(), Error> {
        self.sender.write_message(writer, payload)
    }

    pub fn read_message<R: Read>(&mut self, reader: &mut R) -> Result<Vec<u8>, Error> {
        self.receiver.read_message(reader)
    }

    pub fn sender(&mut self) -> &mut TransportSender {
        &mut self.sender
    }

    pub fn receiver(&mut self) -> &mut TransportReceiver {
        &mut self.receiver
    }

    /// The final handshake hash, identical on both sides.
    ///
    /// Usable as a channel binding value.
    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        &self.handshake_hash
    }

    /// The authenticated static key of the peer.
    pub fn remote_static(&self) -> &PublicKey {
        &self.remote_static
    }

    /// Separate the two directions so they can be driven from different threads.
    pub fn into_split(self) -> (TransportSender, TransportReceiver) {
        (self.sender, self.receiver)
    }
}
