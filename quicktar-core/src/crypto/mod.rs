//! AES-CTR keystream construction for encrypted members and metadata.
//!
//! A QuickTar cipher is stateless with respect to position: the keystream
//! for any 16-byte-aligned block `bn` is derived fresh from `(nonce, bn)`,
//! so decrypting byte range `[off, off+len)` never requires visiting the
//! blocks before `off`. This mirrors `crypto/cipher.Stream` usage in the
//! original Go implementation, where a new `cipher.Stream` is constructed
//! per read instead of advancing one held across calls.

mod nonce;

pub use nonce::Nonce;

use aes::cipher::{KeyIvInit, StreamCipher};
use zeroize::Zeroizing;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type Aes192Ctr = ctr::Ctr128BE<aes::Aes192>;
type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Archive-wide encryption strength. The numeric value also sets the
/// derived key length: `(level as usize + 1) * 8` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionLevel {
    None = 0,
    Aes128 = 1,
    Aes192 = 2,
    Aes256 = 3,
}

impl EncryptionLevel {
    pub fn key_len(self) -> usize {
        (self as usize + 1) * 8
    }
}

#[derive(Clone)]
enum Key {
    Aes128(Zeroizing<[u8; 16]>),
    Aes192(Zeroizing<[u8; 24]>),
    Aes256(Zeroizing<[u8; 32]>),
}

/// An immutable key-and-nonce pair capable of producing the keystream for
/// any block offset. Cloning is cheap; there is no mutable cursor to race
/// on, so a `Cipher` can be shared across member reads without locking.
///
/// A `Cipher` never changes its own nonce in place: when a reader needs to
/// bind the same key material to a nonce discovered in an archive header
/// (as opposed to the nonce chosen at construction time, e.g. for a fresh
/// write), it calls [`Cipher::with_nonce`], which returns a new value.
#[derive(Clone)]
pub struct Cipher {
    key: Option<Key>,
    nonce: Nonce,
}

impl Cipher {
    /// No encryption: `xor_keystream` is then a no-op copy.
    pub fn none() -> Self {
        Self {
            key: None,
            nonce: Nonce { hi: 0, lo: 0 },
        }
    }

    /// Derive a key from `password` at the given level and pair it with a
    /// freshly generated random nonce, as `Writer` does when creating a new
    /// archive.
    pub fn new(level: EncryptionLevel, password: &[u8]) -> Self {
        Self::with_nonce(level, password, Nonce::random())
    }

    /// Derive a key from `password` and pair it with an explicit nonce, as
    /// `Reader` does once it has parsed a nonce out of an archive's header
    /// (or substituted the legacy sentinel).
    pub fn with_nonce(level: EncryptionLevel, password: &[u8], nonce: Nonce) -> Self {
        if matches!(level, EncryptionLevel::None) {
            return Self::none();
        }
        let digest = Zeroizing::new(sha2_password_digest(password));
        let key = match level {
            EncryptionLevel::None => unreachable!(),
            EncryptionLevel::Aes128 => {
                let mut k = Zeroizing::new([0u8; 16]);
                k.copy_from_slice(&digest[..16]);
                Key::Aes128(k)
            }
            EncryptionLevel::Aes192 => {
                let mut k = Zeroizing::new([0u8; 24]);
                k.copy_from_slice(&digest[..24]);
                Key::Aes192(k)
            }
            EncryptionLevel::Aes256 => {
                let mut k = Zeroizing::new([0u8; 32]);
                k.copy_from_slice(&digest[..32]);
                Key::Aes256(k)
            }
        };
        Self {
            key: Some(key),
            nonce,
        }
    }

    /// Rebind this cipher's key material to a different nonce, returning a
    /// new `Cipher` rather than mutating `self`.
    pub fn with_stream_nonce(&self, nonce: Nonce) -> Self {
        Self {
            key: self.key.clone(),
            nonce,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    pub fn nonce(&self) -> Nonce {
        self.nonce
    }

    /// XOR `buf` in place with the keystream starting at 16-byte-aligned
    /// block `off / 16`. Callers are expected to pass buffers that begin on
    /// a block boundary (the reader/writer enforce this); `off` need not be
    /// block-aligned itself only in the sense that it identifies which
    /// block the buffer starts at via `off / 16`.
    pub fn xor_keystream(&self, buf: &mut [u8], block_offset: u64) {
        let Some(key) = &self.key else { return };
        let bn = block_offset / 16;
        let iv = self.nonce.iv_for_block(bn);
        match key {
            Key::Aes128(k) => {
                let mut c = Aes128Ctr::new(k.as_slice().into(), &iv.into());
                c.apply_keystream(buf);
            }
            Key::Aes192(k) => {
                let mut c = Aes192Ctr::new(k.as_slice().into(), &iv.into());
                c.apply_keystream(buf);
            }
            Key::Aes256(k) => {
                let mut c = Aes256Ctr::new(k.as_slice().into(), &iv.into());
                c.apply_keystream(buf);
            }
        }
    }
}

fn sha2_password_digest(password: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.finalize().into()
}
