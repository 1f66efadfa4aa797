use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::aead::{self, AEAD_KEY_LEN, AEAD_TAG_LEN};
use crate::error::Error;

/// CipherState: one AEAD key and a strictly increasing nonce counter.
///
/// A fresh key always restarts the counter at zero, and the counter only
/// moves forward, so a (key, nonce) pair is never used twice.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherState {
    key: [u8; AEAD_KEY_LEN],
    /// Nonce counter, incremented after each encryption/decryption.
    #[zeroize(skip)]
    nonce: u64,
}

impl CipherState {
    /// Create a CipherState keyed with `key` and nonce zero.
    pub fn new(key: [u8; AEAD_KEY_LEN]) -> Self {
        Self { key, nonce: 0 }
    }

    /// Install a new key, resetting the nonce counter to zero.
    pub fn initialize_key(&mut self, key: [u8; AEAD_KEY_LEN]) {
        self.key.zeroize();
        self.key = key;
        self.nonce = 0;
    }

    /// The nonce the next encrypt or decrypt call will use.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Take the current nonce and advance the counter.
    fn next_nonce(&mut self) -> Result<u64, Error> {
        // Refuse to wrap: u64::MAX itself is never handed out.
        if self.nonce == u64::MAX {
            return Err(Error::NonceExhausted);
        }
        let n = self.nonce;
        self.nonce += 1;
        Ok(n)
    }

    /// Encrypt `plaintext` bound to `ad`, returning ciphertext with the tag appended.
    pub fn encrypt_with_ad(&mut self, ad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let nonce = self.next_nonce()?;
        let mut out = vec![0u8; plaintext.len() + AEAD_TAG_LEN];
        out[..plaintext.len()].copy_from_slice(plaintext);
        aead::encrypt_in_place(&self.key, nonce, ad, &mut out, plaintext.len())?;
        Ok(out)
    }

    /// Decrypt `ciphertext` (tag included) bound to `ad`.
    ///
    /// The counter advances whether or not the tag verifies.
    pub fn decrypt_with_ad(&mut self, ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let nonce = self.next_nonce()?;
        let mut buf = ciphertext.to_vec();
        match aead::decrypt_in_place(&self.key, nonce, ad, &mut buf, ciphertext.len()) {
            Ok(len) => {
                buf.truncate(len);
                Ok(buf)
            }
            Err(e) => {
                buf.zeroize();
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn key(&self) -> &[u8; AEAD_KEY_LEN] {
        &self.key
    }

    #[cfg(test)]
    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }
}
