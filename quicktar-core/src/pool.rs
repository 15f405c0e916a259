//! Bounded cache of idle file descriptors over one archive path, shared by
//! concurrent [`crate::FileView`]s of a single [`crate::Reader`].
//!
//! Grounded in `fdcache.go`'s `acquire`/`release` pair: a small idle cache
//! plus a deferred-close queue for descriptors that overflow it. The
//! background expiry here runs on a dedicated reaper thread with a sorted
//! deadline queue rather than a per-descriptor OS timer, since the standard
//! library has no equivalent of Go's `time.AfterFunc`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::trace;

use crate::error::Result;

/// Capability a `Reader` uses to obtain and return descriptors. The default
/// is [`FdPool`]; tests and adapters such as the WebDAV tree may supply
/// their own (e.g. backed by an in-memory archive) instead of the OS.
///
/// This replaces the original implementation's process-wide hook that
/// swapped the archive-open function globally: each `Reader` is constructed
/// with its own `FdSource` instance.
pub trait FdSource: Send + Sync {
    fn acquire(&self) -> Result<File>;
    fn release(&self, file: File);
    fn set_pool_size(&self, _n: usize) {}
    fn set_pool_timeout(&self, _timeout: Duration) {}
}

struct Deferred {
    file: File,
    deadline: Instant,
}

struct Inner {
    idle: Vec<File>,
    deferred: Vec<Deferred>,
    size: usize,
    timeout: Duration,
    shutdown: bool,
}

/// State shared between `FdPool` and its reaper thread. Kept in its own
/// `Arc` (rather than the thread cloning `Arc<FdPool>` itself) so the
/// reaper never keeps the pool's own strong count above zero: `FdPool`'s
/// `Drop` only runs once every `Arc<FdPool>` held by callers is gone, and
/// it is that `Drop` which signals `shutdown` and joins the thread.
struct Shared {
    state: Mutex<Inner>,
    cv: Condvar,
}

/// Bounded idle-descriptor cache for a single archive path.
pub struct FdPool {
    path: PathBuf,
    shared: Arc<Shared>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl FdPool {
    pub fn new(path: impl AsRef<Path>, size: usize, timeout: Duration) -> Arc<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(Inner {
                idle: Vec::new(),
                deferred: Vec::new(),
                size,
                timeout,
                shutdown: false,
            }),
            cv: Condvar::new(),
        });
        let reaper_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || reaper_loop(reaper_shared));
        Arc::new(Self {
            path: path.as_ref().to_path_buf(),
            shared,
            reaper: Mutex::new(Some(handle)),
        })
    }

    /// Take a cached descriptor without opening a new one, for callers
    /// (such as `Reader::open_member`) that want to fall back to `File::open`
    /// themselves on a miss.
    fn try_take(&self) -> Option<File> {
        let mut inner = self.shared.state.lock().unwrap();
        while let Some(entry) = inner.deferred.pop() {
            if entry.deadline > Instant::now() {
                trace!("reclaimed descriptor from deferred-close queue");
                return Some(entry.file);
            }
            // Already past its deadline; the reaper may also be about to
            // reap it, but since both hold `state`'s lock there is no real
            // race here. Drop and keep scanning toward older entries.
        }
        if !inner.idle.is_empty() {
            let i = rand::rng().random_range(0..inner.idle.len());
            return Some(inner.idle.swap_remove(i));
        }
        None
    }
}

impl FdSource for FdPool {
    fn acquire(&self) -> Result<File> {
        if let Some(f) = self.try_take() {
            return Ok(f);
        }
        Ok(File::open(&self.path)?)
    }

    fn release(&self, file: File) {
        let mut inner = self.shared.state.lock().unwrap();
        if inner.idle.len() < inner.size {
            inner.idle.push(file);
            return;
        }
        if inner.timeout.is_zero() {
            drop(inner);
            drop(file);
            return;
        }
        let deadline = Instant::now() + inner.timeout;
        inner.deferred.push(Deferred { file, deadline });
        drop(inner);
        self.shared.cv.notify_one();
    }

    fn set_pool_size(&self, n: usize) {
        self.shared.state.lock().unwrap().size = n;
    }

    fn set_pool_timeout(&self, timeout: Duration) {
        self.shared.state.lock().unwrap().timeout = timeout;
        self.shared.cv.notify_one();
    }
}

impl Drop for FdPool {
    fn drop(&mut self) {
        self.shared.state.lock().unwrap().shutdown = true;
        self.shared.cv.notify_one();
        if let Some(handle) = self.reaper.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

fn reaper_loop(shared: Arc<Shared>) {
    loop {
        let mut inner = shared.state.lock().unwrap();
        if inner.shutdown {
            return;
        }
        let now = Instant::now();
        let before = inner.deferred.len();
        inner.deferred.retain(|d| d.deadline > now);
        if inner.deferred.len() != before {
            trace!(reaped = before - inner.deferred.len(), "expired idle descriptors");
        }
        let wait = inner
            .deferred
            .iter()
            .map(|d| d.deadline.saturating_duration_since(now))
            .min();
        inner = match wait {
            Some(dur) => shared.cv.wait_timeout(inner, dur).unwrap().0,
            None => shared.cv.wait(inner).unwrap(),
        };
        drop(inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_archive() -> tempfile::TempPath {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        f.into_temp_path()
    }

    #[test]
    fn acquire_opens_fresh_when_empty() {
        let path = temp_archive();
        let pool = FdPool::new(&path, 2, Duration::from_millis(50));
        let f = pool.acquire().unwrap();
        drop(f);
    }

    #[test]
    fn release_then_acquire_reuses_idle() {
        let path = temp_archive();
        let pool = FdPool::new(&path, 2, Duration::from_millis(50));
        let f = pool.acquire().unwrap();
        pool.release(f);
        assert_eq!(pool.shared.state.lock().unwrap().idle.len(), 1);
        let _f2 = pool.acquire().unwrap();
        assert_eq!(pool.shared.state.lock().unwrap().idle.len(), 0);
    }

    #[test]
    fn overflow_goes_to_deferred_queue() {
        let path = temp_archive();
        let pool = FdPool::new(&path, 1, Duration::from_secs(5));
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(a);
        pool.release(b);
        let inner = pool.shared.state.lock().unwrap();
        assert_eq!(inner.idle.len(), 1);
        assert_eq!(inner.deferred.len(), 1);
    }

    #[test]
    fn zero_timeout_closes_overflow_immediately() {
        let path = temp_archive();
        let pool = FdPool::new(&path, 1, Duration::from_secs(0));
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(a);
        pool.release(b);
        let inner = pool.shared.state.lock().unwrap();
        assert_eq!(inner.idle.len(), 1);
        assert_eq!(inner.deferred.len(), 0);
    }
}
