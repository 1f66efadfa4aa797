use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce, Tag,
};

use crate::error::Error;

/// AEAD key length in bytes.
pub const AEAD_KEY_LEN: usize = 32;
/// AEAD tag length in bytes.
pub const AEAD_TAG_LEN: usize = 16;
/// AEAD nonce length in bytes.
pub const AEAD_NONCE_LEN: usize = 12;

/// Encrypt plaintext in-place, appending the 16-byte AEAD tag.
///
/// `buffer[..plaintext_len]` contains the plaintext.
/// `buffer` must have room for `plaintext_len + AEAD_TAG_LEN` bytes.
/// Returns the total ciphertext length (plaintext_len + tag).
pub fn encrypt_in_place(
    key: &[u8; AEAD_KEY_LEN],
    nonce: u64,
    ad: &[u8],
    buffer: &mut [u8],
    plaintext_len: usize,
) -> Result<usize, Error> {
    let total_len = plaintext_len
        .checked_add(AEAD_TAG_LEN)
        .ok_or(Error::BufferTooSmall)?;
    if buffer.len() < total_len {
        return Err(Error::BufferTooSmall);
    }

    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = Nonce::from(make_nonce(nonce));
    let tag = cipher
        .encrypt_in_place_detached(&nonce, ad, &mut buffer[..plaintext_len])
        // Only reachable for plaintexts beyond ChaCha20's 256 GiB keystream.
        .map_err(|_| Error::CryptoFailed)?;

    buffer[plaintext_len..total_len].copy_from_slice(&tag);
    Ok(total_len)
}

/// Decrypt ciphertext in-place, verifying the 16-byte AEAD tag.
///
/// `buffer[..ciphertext_len]` contains ciphertext + tag.
/// Returns the plaintext length (ciphertext_len - AEAD_TAG_LEN).
pub fn decrypt_in_place(
    key: &[u8; AEAD_KEY_LEN],
    nonce: u64,
    ad: &[u8],
    buffer: &mut [u8],
    ciphertext_len: usize,
) -> Result<usize, Error> {
    if ciphertext_len < AEAD_TAG_LEN || buffer.len() < ciphertext_len {
        return Err(Error::AuthenticationFailure);
    }
    let plaintext_len = ciphertext_len - AEAD_TAG_LEN;

    let cipher = ChaCha20Poly1305::new(key.into());
    let (ct, tag_bytes) = buffer[..ciphertext_len].split_at_mut(plaintext_len);
    let tag = Tag::from_slice(tag_bytes);

    cipher
        .decrypt_in_place_detached(&Nonce::from(make_nonce(nonce)), ad, ct, tag)
        .map_err(|_| Error::AuthenticationFailure)?;

    Ok(plaintext_len)
}

/// Build the 12-byte nonce from a u64 counter.
///
/// The counter is zero-extended: little-endian in bytes 0..8, bytes 8..12 zero.
pub fn make_nonce(n: u64) -> [u8; AEAD_NONCE_LEN] {
    let mut nonce = [0u8; AEAD_NONCE_LEN];
    nonce[..8].copy_from_slice(&n.to_le_bytes());
    nonce
}
