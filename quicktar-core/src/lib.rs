#![forbid(unsafe_code)]

//! QuickTar: a single-file archive container with optional password-based
//! AES-CTR encryption and random-access reads into member payloads.
//!
//! A `Writer` builds an archive sequentially; a `Reader` opens one and
//! hands out independent [`FileView`]s that can be read and seeked without
//! decrypting anything outside the bytes actually touched.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod crypto;
pub mod error;
pub mod format;
mod member;
mod path;
pub mod pool;
mod reader;
mod view;
pub mod webdav;
mod writer;

pub use crate::error::{Error, Result};

pub use crypto::{Cipher, EncryptionLevel, Nonce};
pub use format::Mode;
pub use member::Member;
pub use path::{base_name, parents, split};
pub use pool::{FdPool, FdSource};
pub use reader::Reader;
pub use view::FileView;
pub use writer::{MemberWriter, Writer};

/// Re-exports for `use quicktar_core::prelude::*;`, matching the shape of
/// a typical archive round-trip.
pub mod prelude {
    pub use crate::crypto::{Cipher, EncryptionLevel};
    pub use crate::format::Mode;
    pub use crate::{Error, FileView, Member, Reader, Result, Writer};
}
