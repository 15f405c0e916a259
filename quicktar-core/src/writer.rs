//! Sequential, write-then-finalize archive construction. Mirrors the state
//! machine in `writer.go`: an encrypting write buffer accumulates bytes at
//! 16-byte granularity while `pos` tracks the last byte flushed to disk.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::SystemTime;

use rand::RngCore;
use tracing::debug;

use crate::crypto::Cipher;
use crate::error::{Error, Result};
use crate::format::{
    align32, decode_name_table, encode_name, Header, Mode, Record, Trailer, HEADER_LEN,
    RECORD_LEN, TRAILER_LEN,
};
use crate::member::Member;
use crate::path;

pub struct Writer {
    file: File,
    cipher: Cipher,
    pos: u64,
    pending: Vec<u8>,
    records: Vec<Member>,
    names: HashSet<String>,
}

impl Writer {
    /// Create a fresh archive at `path`, truncating anything already there.
    pub fn new_writer(path: impl AsRef<Path>, cipher: Cipher) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let header = Header::new(cipher.nonce());
        file.write_all(&header.encode())?;
        debug!(encrypted = cipher.is_encrypted(), "created new archive");
        Ok(Self {
            file,
            cipher,
            pos: HEADER_LEN as u64,
            pending: Vec::new(),
            records: Vec::new(),
            names: HashSet::new(),
        })
    }

    /// Reopen an existing archive for appending more members. The old
    /// metadata index is discarded in memory (but its records are kept so
    /// names stay unique) and will be overwritten by the next `close`.
    pub fn open_for_append(path: impl AsRef<Path>, cipher: Cipher) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut hbuf = [0u8; HEADER_LEN];
        file.read_exact(&mut hbuf)?;
        let header = Header::decode_strict(&hbuf)?;
        let cipher = cipher.with_stream_nonce(header.nonce);

        let trailer_off = header
            .meta_end
            .checked_sub(TRAILER_LEN as u64)
            .ok_or_else(|| Error::Corrupt("meta_end shorter than trailer".into()))?;
        file.seek(SeekFrom::Start(trailer_off))?;
        let mut traw = [0u8; TRAILER_LEN];
        file.read_exact(&mut traw)?;
        cipher.xor_keystream(&mut traw, trailer_off);
        let trailer = Trailer::decode(&traw)?;

        let meta_start = header
            .meta_end
            .checked_sub(trailer.meta_size)
            .ok_or_else(|| Error::Corrupt("meta_size exceeds meta_end".into()))?;
        let index_len = (trailer.meta_size as usize)
            .checked_sub(TRAILER_LEN)
            .ok_or_else(|| Error::Corrupt("meta_size shorter than trailer".into()))?;
        let mut ibuf = vec![0u8; index_len];
        file.seek(SeekFrom::Start(meta_start))?;
        file.read_exact(&mut ibuf)?;
        cipher.xor_keystream(&mut ibuf, meta_start);

        let count = trailer.count as usize;
        let records_len = count * RECORD_LEN;
        if ibuf.len() < records_len {
            return Err(Error::Corrupt("index shorter than record table".into()));
        }
        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let raw: [u8; RECORD_LEN] =
                ibuf[i * RECORD_LEN..(i + 1) * RECORD_LEN].try_into().unwrap();
            records.push(Record::decode(&raw));
        }
        let names = decode_name_table(&ibuf[records_len..], count)?;

        let mut names_seen = HashSet::with_capacity(count);
        let members = records
            .into_iter()
            .zip(names)
            .map(|(record, name)| {
                names_seen.insert(name.clone());
                Member::from_record(record, name)
            })
            .collect();

        file.seek(SeekFrom::Start(meta_start))?;
        debug!(meta_start, count, "reopened archive for append");
        Ok(Self {
            file,
            cipher,
            pos: meta_start,
            pending: Vec::new(),
            records: members,
            names: names_seen,
        })
    }

    fn current_pos(&self) -> u64 {
        self.pos + self.pending.len() as u64
    }

    /// Append `data` to the pending buffer, flushing 16-byte-aligned
    /// chunks to disk as they accumulate.
    fn push_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(data);
        while self.pending.len() >= 16 {
            let mut block: Vec<u8> = self.pending.drain(..16).collect();
            self.cipher.xor_keystream(&mut block, self.pos);
            self.file.seek(SeekFrom::Start(self.pos))?;
            self.file.write_all(&block)?;
            self.pos += 16;
        }
        Ok(())
    }

    fn align_to_32(&mut self) -> Result<()> {
        let target = align32(self.current_pos());
        let pad = (target - self.current_pos()) as usize;
        if pad > 0 {
            self.push_bytes(&vec![0u8; pad])?;
        }
        Ok(())
    }

    fn final_flush(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            let mut block = std::mem::take(&mut self.pending);
            let at = self.pos;
            self.cipher.xor_keystream(&mut block, at);
            self.file.seek(SeekFrom::Start(at))?;
            self.file.write_all(&block)?;
            self.pos += block.len() as u64;
        }
        Ok(())
    }

    /// `name` ending in `/` is treated as a directory, stripped of its
    /// trailing slash before the usual validation runs.
    pub fn create(&mut self, name: &str, mode: Mode, mod_time: SystemTime) -> Result<MemberWriter<'_>> {
        if let Some(dir_name) = name.strip_suffix('/') {
            return self.create_file(dir_name, Mode::directory(mode.permissions()), mod_time);
        }
        self.create_file(name, mode, mod_time)
    }

    pub fn create_file(
        &mut self,
        name: &str,
        mode: Mode,
        mod_time: SystemTime,
    ) -> Result<MemberWriter<'_>> {
        validate_name(name)?;
        validate_mode(mode)?;
        if self.names.contains(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let duration = mod_time
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        let (offset, closed) = if mode.is_dir() {
            (0, true)
        } else {
            self.align_to_32()?;
            (self.current_pos(), false)
        };

        let member = Member {
            name: name.to_string(),
            offset,
            size: 0,
            mode,
            mod_sec: duration.as_secs(),
            mod_nsec: duration.subsec_nanos(),
        };
        self.names.insert(name.to_string());
        self.records.push(member);
        let index = self.records.len() - 1;

        Ok(MemberWriter {
            writer: self,
            index,
            closed,
        })
    }

    /// Emit the metadata index and trailer, patch the header's `meta_end`,
    /// and consume the writer.
    pub fn close(mut self) -> Result<()> {
        self.align_to_32()?;
        let meta_start = self.current_pos();

        for member in &self.records {
            let record = member.to_record();
            let buf = record.encode();
            self.push_bytes(&buf)?;
        }
        let mut name_buf = Vec::new();
        for member in &self.records {
            encode_name(&mut name_buf, &member.name);
        }
        self.push_bytes(&name_buf)?;
        self.align_to_32()?;

        let meta_size = self.current_pos() - meta_start + TRAILER_LEN as u64;
        let count = self.records.len() as u64;
        let mut salt = [0u8; 8];
        rand::rng().fill_bytes(&mut salt);
        let trailer = Trailer::new(meta_size, count, salt);
        self.push_bytes(&trailer.encode())?;
        self.final_flush()?;

        let meta_end = self.current_pos();
        self.file.seek(SeekFrom::Start(8))?;
        self.file.write_all(&meta_end.to_le_bytes())?;
        self.file.flush()?;
        debug!(meta_end, count, "closed archive");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Invalid("member name must not be empty".into()));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(Error::Invalid(format!(
            "member name must not have a leading or trailing slash: {name}"
        )));
    }
    for seg in path::split(name) {
        if seg.is_empty() || seg == "." || seg == ".." {
            return Err(Error::Invalid(format!(
                "member name contains an invalid path segment: {name}"
            )));
        }
    }
    Ok(())
}

fn validate_mode(mode: Mode) -> Result<()> {
    if mode.is_regular() || mode.is_dir() || mode.is_symlink() {
        Ok(())
    } else {
        Err(Error::Invalid(
            "mode must be regular, directory, or symlink".into(),
        ))
    }
}

/// A handle to a single member's payload, borrowed from the archive
/// `Writer` that owns its encrypting write buffer. Directory members are
/// born closed; writing to them (or after an explicit `close`) fails with
/// [`Error::Closed`].
pub struct MemberWriter<'w> {
    writer: &'w mut Writer,
    index: usize,
    closed: bool,
}

impl MemberWriter<'_> {
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.writer.push_bytes(bytes)?;
        self.writer.records[self.index].size += bytes.len() as u64;
        Ok(bytes.len())
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Write for MemberWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        MemberWriter::write(self, buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
