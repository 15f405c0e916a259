mod cli;
mod walk;

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use quicktar_core::{Cipher, EncryptionLevel, Error, Mode, Reader, Result, Writer};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = cli::Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "quicktar failed");
            eprintln!("quicktar: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &cli::Cli) -> Result<()> {
    let level = cli.encryption_level();
    let password = cli.password.as_deref();

    if cli.create {
        handle_create(&cli.archive, level, password, &cli.paths, false, cli.verbose)
    } else if cli.append {
        handle_create(&cli.archive, level, password, &cli.paths, true, cli.verbose)
    } else if cli.extract {
        let dest = cli.paths.first().cloned().unwrap_or_else(|| PathBuf::from("."));
        handle_extract(&cli.archive, &dest, level, password, cli.verbose)
    } else {
        handle_list(&cli.archive, level, password, cli.verbose)
    }
}

fn build_cipher(level: Option<EncryptionLevel>, password: Option<&str>) -> Result<Cipher> {
    match level {
        None => Ok(Cipher::none()),
        Some(lvl) => {
            let pw = password.ok_or_else(|| {
                Error::Invalid("-p PASSWORD is required when an encryption level is set".into())
            })?;
            Ok(Cipher::new(lvl, pw.as_bytes()))
        }
    }
}

fn mode_from_metadata(meta: &std::fs::Metadata) -> Mode {
    if meta.is_dir() {
        Mode::directory(perm_bits(meta))
    } else if meta.file_type().is_symlink() {
        Mode::symlink()
    } else {
        Mode::regular(perm_bits(meta))
    }
}

#[cfg(unix)]
fn perm_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn perm_bits(_meta: &std::fs::Metadata) -> u32 {
    0o644
}

fn confirm_overwrite(path: &Path) -> io::Result<bool> {
    if !path.exists() || !io::stdin().is_terminal() {
        return Ok(true);
    }
    print!("overwrite {}? (y/n [n]) ", path.display());
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

fn handle_create(
    archive: &Path,
    level: Option<EncryptionLevel>,
    password: Option<&str>,
    paths: &[PathBuf],
    append: bool,
    verbose: bool,
) -> Result<()> {
    let cipher = build_cipher(level, password)?;

    if !append && !confirm_overwrite(archive)? {
        return Ok(());
    }

    let mut writer = if append {
        Writer::open_for_append(archive, cipher)?
    } else {
        Writer::new_writer(archive, cipher)?
    };

    for entry in walk::walk(paths) {
        let meta = std::fs::symlink_metadata(&entry.disk_path)?;
        let mode = mode_from_metadata(&meta);
        let mod_time = meta.modified().unwrap_or_else(|_| SystemTime::now());

        let mut member = writer.create_file(&entry.member_name, mode, mod_time)?;
        if mode.is_regular() {
            let mut src = File::open(&entry.disk_path)?;
            io::copy(&mut src, &mut member)?;
        }
        if verbose {
            println!("{}", entry.member_name);
        }
    }

    writer.close()
}

fn handle_extract(
    archive: &Path,
    dest: &Path,
    level: Option<EncryptionLevel>,
    password: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let cipher = build_cipher(level, password)?;
    let reader = Reader::open(archive, cipher)?;

    for member in reader.files() {
        let out_path = dest.join(&member.name);
        if member.mode.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if member.mode.is_symlink() {
            // Symlink targets are not carried in the payload; an empty
            // regular file is written as a placeholder.
            File::create(&out_path)?;
            if verbose {
                println!("{}", member.name);
            }
            continue;
        }

        let mut view = reader.open_member(member)?;
        let mut out = File::create(&out_path)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = view.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                &out_path,
                std::fs::Permissions::from_mode(member.mode.permissions()),
            )?;
        }
        if verbose {
            println!("{}", member.name);
        }
    }
    Ok(())
}

fn handle_list(
    archive: &Path,
    level: Option<EncryptionLevel>,
    password: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let cipher = build_cipher(level, password)?;
    let reader = Reader::open(archive, cipher)?;

    for member in reader.files() {
        if verbose {
            println!(
                "{:o} {:>10} {:>10} {}",
                member.mode.permissions(),
                member.size,
                member.mod_sec,
                member.name
            );
        } else {
            println!("{}", member.name);
        }
    }
    Ok(())
}
