use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::cipher_state::CipherState;
use crate::crypto::aead::AEAD_KEY_LEN;
use crate::crypto::hash::{self, HASH_LEN};
use crate::error::Error;

/// SymmetricState: chaining key, transcript hash and the handshake cipher.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricState {
    cipher: CipherState,
    /// Chaining key (ck), ratcheted by every DH output via HKDF.
    ck: [u8; HASH_LEN],
    /// Handshake digest (h), accumulates everything either side sends.
    h: [u8; HASH_LEN],
}

impl SymmetricState {
    /// Initialize from a protocol name.
    ///
    /// The name is always hashed, whatever its length, and the chaining key
    /// starts equal to the digest. The cipher starts under an all-zero key.
    pub fn initialize(protocol_name: &[u8]) -> Self {
        let h = hash::hash(protocol_name);
        Self {
            cipher: CipherState::new([0u8; AEAD_KEY_LEN]),
            ck: h,
            h,
        }
    }

    /// Mix a DH output into the chaining key and re-key the cipher.
    ///
    /// `(ck, temp_k) = HKDF(ck, input_key_material)`, then `InitializeKey(temp_k)`.
    pub fn mix_key(&mut self, input_key_material: &[u8]) {
        let (new_ck, temp_k) = hash::hkdf2(&self.ck, input_key_material);
        self.ck = *new_ck;

        let mut key = Zeroizing::new([0u8; AEAD_KEY_LEN]);
        key.copy_from_slice(temp_k.as_slice());
        self.cipher.initialize_key(*key);
    }

    /// `h = SHA256(h || data)`
    pub fn mix_hash(&mut self, data: &[u8]) {
        self.h = hash::hash_two(&self.h, data);
    }

    /// Encrypt under the current digest as AD, then fold the ciphertext into it.
    pub fn encrypt_and_hash(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let ciphertext = self.cipher.encrypt_with_ad(&self.h, plaintext)?;
        self.mix_hash(&ciphertext);
        Ok(ciphertext)
    }

    /// Decrypt under the current digest as AD.
    ///
    /// The ciphertext is folded into the digest only when the tag verifies;
    /// a failure leaves the transcript untouched.
    pub fn decrypt_and_hash(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let plaintext = self.cipher.decrypt_with_ad(&self.h, ciphertext)?;
        self.mix_hash(ciphertext);
        Ok(plaintext)
    }

    /// Derive the two transport CipherStates from the chaining key.
    ///
    /// `(k1, k2) = HKDF(ck, "")`. Borrows rather than consumes, so a later
    /// `mix_key` of fresh material followed by another `split` can derive a
    /// new pair from the same chain.
    pub fn split(&self) -> (CipherState, CipherState) {
        let (temp_k1, temp_k2) = hash::hkdf2(&self.ck, &[]);

        let mut key = Zeroizing::new([0u8; AEAD_KEY_LEN]);
        key.copy_from_slice(temp_k1.as_slice());
        let c1 = CipherState::new(*key);
        key.copy_from_slice(temp_k2.as_slice());
        let c2 = CipherState::new(*key);

        (c1, c2)
    }

    /// The current handshake digest.
    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        &self.h
    }

    #[cfg(test)]
    pub(crate) fn chaining_key(&self) -> &[u8; HASH_LEN] {
        &self.ck
    }

    #[cfg(test)]
    pub(crate) fn cipher(&self) -> &CipherState {
        &self.cipher
    }
}
