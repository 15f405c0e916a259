use crate::error::{Error, Result};

pub const TRAILER_LEN: usize = 32;

/// The 32-byte encrypted suffix of a modern archive: metadata size, member
/// count, a random salt, and an all-zero sentinel used to detect a wrong
/// password or corruption after decryption.
#[derive(Clone, Copy, Debug)]
pub struct Trailer {
    pub meta_size: u64,
    pub count: u64,
    pub salt: [u8; 8],
}

impl Trailer {
    pub fn new(meta_size: u64, count: u64, salt: [u8; 8]) -> Self {
        Self {
            meta_size,
            count,
            salt,
        }
    }

    pub fn encode(&self) -> [u8; TRAILER_LEN] {
        let mut buf = [0u8; TRAILER_LEN];
        buf[0..8].copy_from_slice(&self.meta_size.to_le_bytes());
        buf[8..16].copy_from_slice(&self.count.to_le_bytes());
        buf[16..24].copy_from_slice(&self.salt);
        buf
    }

    /// Decode an already-decrypted trailer, checking the zero sentinel.
    pub fn decode(buf: &[u8; TRAILER_LEN]) -> Result<Self> {
        if buf[24..32] != [0u8; 8] {
            return Err(Error::WrongPassword);
        }
        let meta_size = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let count = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let salt: [u8; 8] = buf[16..24].try_into().unwrap();
        Ok(Self {
            meta_size,
            count,
            salt,
        })
    }
}
