//! Random-access archive reader: parses the metadata index up front and
//! hands out independent [`FileView`]s backed by a pooled descriptor.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::crypto::{Cipher, Nonce};
use crate::error::{Error, Result};
use crate::format::{decode_name_table, Header, Record, HEADER_LEN, RECORD_LEN, TRAILER_LEN};
use crate::member::Member;
use crate::pool::{FdPool, FdSource};
use crate::view::FileView;

const DEFAULT_POOL_SIZE: usize = 8;
const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Reader {
    path: PathBuf,
    cipher: Cipher,
    members: Vec<Member>,
    pool: Arc<dyn FdSource>,
}

impl Reader {
    /// Open `path` read-only, parsing its header and metadata index
    /// immediately. Falls back to the legacy fixed-nonce layout when the
    /// `QuickTar` magic is absent.
    pub fn open(path: impl AsRef<Path>, cipher: Cipher) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let pool = FdPool::new(&path, DEFAULT_POOL_SIZE, DEFAULT_POOL_TIMEOUT);
        Self::open_with_source(path, cipher, pool)
    }

    /// Open with a caller-supplied [`FdSource`] instead of the default
    /// OS-backed pool (used by tests and adapters such as the WebDAV tree).
    pub fn open_with_source(
        path: impl AsRef<Path>,
        cipher: Cipher,
        pool: Arc<dyn FdSource>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let mut hbuf = [0u8; HEADER_LEN];
        file.read_exact(&mut hbuf)?;

        let (cipher, members) = match Header::decode(&hbuf)? {
            Some(header) => {
                let cipher = cipher.with_stream_nonce(header.nonce);
                let members = Self::read_modern_index(&mut file, &cipher, header.meta_end)?;
                (cipher, members)
            }
            None => {
                let cipher = cipher.with_stream_nonce(Nonce::legacy());
                let size = file.metadata()?.len();
                let members = Self::read_legacy_index(&mut file, &cipher, size)?;
                (cipher, members)
            }
        };

        debug!(count = members.len(), path = %path.display(), "opened archive");
        Ok(Self {
            path,
            cipher,
            members,
            pool,
        })
    }

    fn read_modern_index(file: &mut File, cipher: &Cipher, meta_end: u64) -> Result<Vec<Member>> {
        let trailer_off = meta_end
            .checked_sub(TRAILER_LEN as u64)
            .ok_or_else(|| Error::Corrupt("meta_end shorter than trailer".into()))?;
        file.seek(SeekFrom::Start(trailer_off))?;
        let mut traw = [0u8; TRAILER_LEN];
        file.read_exact(&mut traw)?;
        cipher.xor_keystream(&mut traw, trailer_off);
        let trailer = crate::format::Trailer::decode(&traw)?;

        let index_len = (trailer.meta_size as usize)
            .checked_sub(TRAILER_LEN)
            .ok_or_else(|| Error::Corrupt("meta_size shorter than trailer".into()))?;
        let meta_start = trailer_off
            .checked_sub(index_len as u64)
            .ok_or_else(|| Error::Corrupt("meta_size exceeds meta_end".into()))?;

        parse_index(file, cipher, meta_start, index_len, trailer.count as usize)
    }

    fn read_legacy_index(file: &mut File, cipher: &Cipher, size: u64) -> Result<Vec<Member>> {
        let trailer_off = size
            .checked_sub(TRAILER_LEN as u64)
            .ok_or_else(|| Error::Corrupt("archive shorter than legacy trailer".into()))?;
        file.seek(SeekFrom::Start(trailer_off))?;
        let mut traw = [0u8; TRAILER_LEN];
        file.read_exact(&mut traw)?;
        cipher.xor_keystream(&mut traw, trailer_off);

        if traw[24..32] != [0u8; 8] {
            return Err(Error::WrongPassword);
        }

        // The legacy trailer's first 16 bytes carry the index's absolute
        // start offset and member count directly (there is no `meta_size`
        // field, since there is no separate plaintext header to derive a
        // size from).
        let meta_start = u64::from_le_bytes(traw[0..8].try_into().unwrap());
        let count = u64::from_le_bytes(traw[8..16].try_into().unwrap());
        let index_len = trailer_off
            .checked_sub(meta_start)
            .ok_or_else(|| Error::Corrupt("legacy meta_start after trailer".into()))?
            as usize;

        parse_index(file, cipher, meta_start, index_len, count as usize)
    }

    pub fn files(&self) -> &[Member] {
        &self.members
    }

    /// Look up a single member by its full name.
    pub fn member(&self, name: &str) -> Result<&Member> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Acquire a descriptor from the pool (or open a fresh one) and return
    /// an independent view bound to `member`.
    pub fn open_member(&self, member: &Member) -> Result<FileView<'_>> {
        let file = self.pool.acquire()?;
        Ok(FileView::new(self, file, member.clone()))
    }

    pub fn set_pool_size(&self, n: usize) {
        self.pool.set_pool_size(n);
    }

    pub fn set_pool_timeout(&self, timeout: Duration) {
        self.pool.set_pool_timeout(timeout);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    pub(crate) fn pool(&self) -> &Arc<dyn FdSource> {
        &self.pool
    }
}

fn parse_index(
    file: &mut File,
    cipher: &Cipher,
    meta_start: u64,
    index_len: usize,
    count: usize,
) -> Result<Vec<Member>> {
    let mut ibuf = vec![0u8; index_len];
    file.seek(SeekFrom::Start(meta_start))?;
    file.read_exact(&mut ibuf)?;
    cipher.xor_keystream(&mut ibuf, meta_start);

    let records_len = count * RECORD_LEN;
    if ibuf.len() < records_len {
        return Err(Error::Corrupt("index shorter than record table".into()));
    }
    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        let raw: [u8; RECORD_LEN] = ibuf[i * RECORD_LEN..(i + 1) * RECORD_LEN]
            .try_into()
            .unwrap();
        records.push(Record::decode(&raw));
    }
    let names = decode_name_table(&ibuf[records_len..], count)?;
    Ok(records
        .into_iter()
        .zip(names)
        .map(|(record, name)| Member::from_record(record, name))
        .collect())
}
