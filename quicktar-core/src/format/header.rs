use crate::crypto::Nonce;
use crate::error::{Error, Result};

pub const MAGIC: &[u8; 8] = b"QuickTar";
pub const HEADER_LEN: usize = 32;

/// The 32-byte plaintext prefix of every modern archive.
#[derive(Clone, Copy, Debug)]
pub struct Header {
    pub meta_end: u64,
    pub nonce: Nonce,
}

impl Header {
    pub fn new(nonce: Nonce) -> Self {
        Self { meta_end: 0, nonce }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..8].copy_from_slice(MAGIC);
        buf[8..16].copy_from_slice(&self.meta_end.to_le_bytes());
        buf[16..32].copy_from_slice(&self.nonce.to_be_bytes());
        buf
    }

    /// Returns `Ok(None)` when the magic does not match, signalling the
    /// caller should fall back to the legacy layout rather than treating
    /// this as corruption.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Option<Self>> {
        if &buf[0..8] != MAGIC {
            return Ok(None);
        }
        let meta_end = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let hi: [u8; 8] = buf[16..24].try_into().unwrap();
        let lo: [u8; 8] = buf[24..32].try_into().unwrap();
        Ok(Some(Self {
            meta_end,
            nonce: Nonce::from_be_bytes(hi, lo),
        }))
    }

    /// Parse, requiring the magic to match (used by `open_for_append`,
    /// which must reject legacy archives rather than silently fall back).
    pub fn decode_strict(buf: &[u8; HEADER_LEN]) -> Result<Self> {
        Self::decode(buf)?.ok_or_else(|| Error::BadMagic("missing QuickTar magic".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let h = Header {
            meta_end: 12345,
            nonce: Nonce { hi: 1, lo: 2 },
        };
        let buf = h.encode();
        let back = Header::decode(&buf).unwrap().unwrap();
        assert_eq!(back.meta_end, 12345);
        assert_eq!(back.nonce, Nonce { hi: 1, lo: 2 });
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; HEADER_LEN];
        assert!(Header::decode(&buf).unwrap().is_none());
        assert!(Header::decode_strict(&buf).is_err());
    }
}
