//! Random-access, read-only views into one archive member.
//!
//! Ported from `FileDesc.Read`/`FileDesc.Seek` in the original
//! implementation: an unaligned request is expanded to the smallest
//! 16-byte-aligned window that covers it, that whole window is decrypted,
//! and the requested bytes are sliced back out.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::member::Member;
use crate::pool::FdSource;
use crate::reader::Reader;

/// A seekable, read-only handle over one member's payload, bound to a
/// descriptor borrowed from the owning [`Reader`]'s pool. Holds its own
/// position cursor, so concurrent reads of the same member open one
/// `FileView` per caller rather than sharing a single instance.
pub struct FileView<'r> {
    reader: &'r Reader,
    file: Option<std::fs::File>,
    member: Member,
    pos: u64,
}

impl<'r> FileView<'r> {
    pub(crate) fn new(reader: &'r Reader, file: std::fs::File, member: Member) -> Self {
        Self {
            reader,
            file: Some(file),
            member,
            pos: 0,
        }
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    /// Read up to `buf.len()` bytes, never crossing the member's bounds.
    /// Returns `0` at end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        if self.pos >= self.member.size {
            return Ok(0);
        }
        let n = buf.len().min((self.member.size - self.pos) as usize);
        if n == 0 {
            return Ok(0);
        }
        let abs = self.member.offset + self.pos;
        let s = abs & !15;
        let e = (abs + n as u64 + 15) & !15;

        let mut window = vec![0u8; (e - s) as usize];
        read_at(file, s, &mut window)?;
        self.reader.cipher().xor_keystream(&mut window, s);

        let start = (abs - s) as usize;
        buf[..n].copy_from_slice(&window[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    /// Always fails: views are read-only.
    pub fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::Permission("FileView is read-only"))
    }

    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            self.reader.pool().release(file);
        }
    }
}

impl Read for FileView<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        FileView::read(self, buf).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl Seek for FileView<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let size = self.member.size as i64;
        let cur = self.pos as i64;
        let new_pos = match pos {
            SeekFrom::Start(off) => off as i64,
            SeekFrom::Current(delta) => cur + delta,
            SeekFrom::End(delta) => size + delta,
        };
        if new_pos < 0 || new_pos > size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                Error::Invalid(format!("seek target {new_pos} out of [0, {size}]")),
            ));
        }
        self.pos = new_pos as u64;
        Ok(self.pos)
    }
}

impl Drop for FileView<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_at(file: &mut std::fs::File, offset: u64, buf: &mut [u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_exact_at(buf, offset)?;
    }
    #[cfg(not(unix))]
    {
        use std::io::{Seek, SeekFrom};
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
    }
    Ok(())
}
