use crate::format::{Mode, Record};
use crate::path;

/// A member descriptor, as returned to callers by [`crate::Reader::files`].
/// Combines the fixed-size on-disk record with its name.
#[derive(Clone, Debug)]
pub struct Member {
    pub name: String,
    pub offset: u64,
    pub size: u64,
    pub mode: Mode,
    pub mod_sec: u64,
    pub mod_nsec: u32,
}

impl Member {
    pub(crate) fn from_record(record: Record, name: String) -> Self {
        Self {
            name,
            offset: record.offset,
            size: record.size,
            mode: record.mode,
            mod_sec: record.mod_sec,
            mod_nsec: record.mod_nsec,
        }
    }

    pub(crate) fn to_record(&self) -> Record {
        Record {
            offset: self.offset,
            size: self.size,
            mode: self.mode,
            mod_nsec: self.mod_nsec,
            mod_sec: self.mod_sec,
        }
    }

    /// Substring of `name` after the last `/`.
    pub fn base_name(&self) -> &str {
        path::base_name(&self.name)
    }
}
