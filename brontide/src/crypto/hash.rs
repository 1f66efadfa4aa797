use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Hash output length (SHA-256 = 32 bytes).
pub const HASH_LEN: usize = 32;

/// Compute the SHA-256 hash of input.
pub fn hash(input: &[u8]) -> [u8; HASH_LEN] {
    Sha256::digest(input).into()
}

/// Compute SHA-256 over two concatenated inputs without allocating.
pub fn hash_two(a: &[u8], b: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// HKDF-SHA256 with two 32-byte output blocks and empty info.
///
/// `salt` is the chaining key, `input_key_material` the fresh secret.
/// Returns the first and second halves of the 64-byte expansion.
pub fn hkdf2(
    salt: &[u8; HASH_LEN],
    input_key_material: &[u8],
) -> (Zeroizing<[u8; HASH_LEN]>, Zeroizing<[u8; HASH_LEN]>) {
    let hk = Hkdf::<Sha256>::new(Some(salt), input_key_material);
    let mut okm = Zeroizing::new([0u8; 2 * HASH_LEN]);
    // 64 bytes is far below the 255 * HASH_LEN expansion limit.
    if hk.expand(&[], okm.as_mut_slice()).is_err() {
        unreachable!("HKDF-SHA256 can always expand 64 bytes");
    }

    let mut first = Zeroizing::new([0u8; HASH_LEN]);
    let mut second = Zeroizing::new([0u8; HASH_LEN]);
    first.copy_from_slice(&okm[..HASH_LEN]);
    second.copy_from_slice(&okm[HASH_LEN..]);
    (first, second)
}
