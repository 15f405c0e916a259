use thiserror::Error;

/// Error taxonomy for the whole crate, distinct from the OS error domain
/// (which is wrapped as `Io`).
#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    Permission(&'static str),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("write on closed member")]
    Closed,

    #[error("bad magic: {0}")]
    BadMagic(String),

    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("wrong password")]
    WrongPassword,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
