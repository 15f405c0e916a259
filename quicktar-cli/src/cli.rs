use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// `tar`-flavored flag surface: one mode flag, an archive path, an optional
/// encryption level, and the paths to operate on.
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Pack, list, extract, and append to QuickTar archives",
    group(ArgGroup::new("mode").args(["create", "extract", "list", "append"]).required(true)),
    group(ArgGroup::new("level").args(["aes128", "aes192", "aes256"]))
)]
pub struct Cli {
    /// Create a new archive
    #[arg(short = 'c')]
    pub create: bool,

    /// Extract an archive
    #[arg(short = 'x')]
    pub extract: bool,

    /// List archive contents
    #[arg(short = 't')]
    pub list: bool,

    /// Append members to an existing archive
    #[arg(short = 'a')]
    pub append: bool,

    /// Archive path
    #[arg(short = 'f', value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Encrypt with AES-128
    #[arg(short = '1')]
    pub aes128: bool,

    /// Encrypt with AES-192
    #[arg(short = '2')]
    pub aes192: bool,

    /// Encrypt with AES-256
    #[arg(short = '3')]
    pub aes256: bool,

    /// Password (required when an encryption level is set)
    #[arg(short = 'p', value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Verbose listing: mode, size, mtime, name
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Destination directory (extract) or input files/directories (create, append)
    pub paths: Vec<PathBuf>,
}

impl Cli {
    pub fn encryption_level(&self) -> Option<quicktar_core::EncryptionLevel> {
        use quicktar_core::EncryptionLevel;
        if self.aes128 {
            Some(EncryptionLevel::Aes128)
        } else if self.aes192 {
            Some(EncryptionLevel::Aes192)
        } else if self.aes256 {
            Some(EncryptionLevel::Aes256)
        } else {
            None
        }
    }
}
