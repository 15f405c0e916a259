use super::mode::Mode;

pub const RECORD_LEN: usize = 32;

/// A member's fixed-size on-disk record. The name itself lives in the
/// separate name table that follows the record table.
#[derive(Clone, Copy, Debug)]
pub struct Record {
    pub offset: u64,
    pub size: u64,
    pub mode: Mode,
    pub mod_nsec: u32,
    pub mod_sec: u64,
}

impl Record {
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        buf[0..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..16].copy_from_slice(&self.size.to_le_bytes());
        buf[16..20].copy_from_slice(&u32::from(self.mode).to_le_bytes());
        buf[20..24].copy_from_slice(&self.mod_nsec.to_le_bytes());
        buf[24..32].copy_from_slice(&self.mod_sec.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; RECORD_LEN]) -> Self {
        let offset = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let size = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let mode = Mode::from(u32::from_le_bytes(buf[16..20].try_into().unwrap()));
        let mod_nsec = u32::from_le_bytes(buf[20..24].try_into().unwrap());
        let mod_sec = u64::from_le_bytes(buf[24..32].try_into().unwrap());
        Self {
            offset,
            size,
            mode,
            mod_nsec,
            mod_sec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let r = Record {
            offset: 32,
            size: 4096,
            mode: Mode::regular(0o644),
            mod_nsec: 123,
            mod_sec: 1_700_000_000,
        };
        let buf = r.encode();
        let back = Record::decode(&buf);
        assert_eq!(back.offset, 32);
        assert_eq!(back.size, 4096);
        assert_eq!(back.mode.permissions(), 0o644);
        assert_eq!(back.mod_nsec, 123);
        assert_eq!(back.mod_sec, 1_700_000_000);
    }
}
