use crate::error::{Error, Result};

/// Append `name` NUL-terminated to `out`. Callers write the whole table in
/// insertion order, matching the record table's order.
pub fn encode_one(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(name.as_bytes());
    out.push(0);
}

/// Split `buf` into exactly `count` NUL-terminated names. `Corrupt` if the
/// table runs out of bytes before `count` names are found or contains
/// non-UTF-8 bytes.
pub fn decode_all(buf: &[u8], count: usize) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(count);
    let mut rest = buf;
    for _ in 0..count {
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::Corrupt("name table ended without NUL terminator".into()))?;
        let name = std::str::from_utf8(&rest[..nul])
            .map_err(|_| Error::Corrupt("name table entry is not valid UTF-8".into()))?;
        names.push(name.to_string());
        rest = &rest[nul + 1..];
    }
    Ok(names)
}
