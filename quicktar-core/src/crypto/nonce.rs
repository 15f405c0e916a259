/// A 128-bit AES-CTR IV split into two big-endian 64-bit halves, the way the
/// on-disk header stores it (`16..24` = high half, `24..32` = low half).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce {
    pub hi: u64,
    pub lo: u64,
}

/// Fixed sentinel used by pre-`QuickTar`-header ("legacy") archives: the
/// high half is a constant, the low half is the block counter itself.
const LEGACY_HI: u64 = 0xFB4F_952F_C264_8265;

impl Nonce {
    pub fn random() -> Self {
        use rand::RngCore;
        let mut buf = [0u8; 16];
        rand::rng().fill_bytes(&mut buf);
        Self {
            hi: u64::from_be_bytes(buf[..8].try_into().unwrap()),
            lo: u64::from_be_bytes(buf[8..].try_into().unwrap()),
        }
    }

    pub fn legacy() -> Self {
        Self { hi: LEGACY_HI, lo: 0 }
    }

    pub fn to_be_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.hi.to_be_bytes());
        out[8..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }

    pub fn from_be_bytes(hi: [u8; 8], lo: [u8; 8]) -> Self {
        Self {
            hi: u64::from_be_bytes(hi),
            lo: u64::from_be_bytes(lo),
        }
    }

    /// The 128-bit CTR IV for block index `bn`: `(hi, lo + bn)` with carry
    /// into `hi` on unsigned overflow.
    pub fn iv_for_block(self, bn: u64) -> [u8; 16] {
        let (lo, carry) = self.lo.overflowing_add(bn);
        let hi = self.hi.wrapping_add(carry as u64);
        Nonce { hi, lo }.to_be_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iv_no_carry() {
        let n = Nonce { hi: 1, lo: 10 };
        let iv = n.iv_for_block(5);
        assert_eq!(&iv[..8], &1u64.to_be_bytes());
        assert_eq!(&iv[8..], &15u64.to_be_bytes());
    }

    #[test]
    fn iv_carries_into_hi() {
        let n = Nonce { hi: 1, lo: u64::MAX };
        let iv = n.iv_for_block(1);
        assert_eq!(&iv[..8], &2u64.to_be_bytes());
        assert_eq!(&iv[8..], &0u64.to_be_bytes());
    }

    #[test]
    fn legacy_nonce_low_is_zero() {
        assert_eq!(Nonce::legacy().lo, 0);
    }
}
