//! Crate-level end-to-end scenarios.

use std::io::{Read as _, Seek as _, SeekFrom};
use std::time::SystemTime;

use quicktar_core::crypto::EncryptionLevel;
use quicktar_core::format::{encode_name, Mode, Record};
use quicktar_core::{Cipher, Error, Reader, Writer};

fn scratch_path(tag: &str) -> std::path::PathBuf {
    tempfile::Builder::new()
        .prefix(&format!("quicktar-e2e-{tag}-"))
        .tempfile()
        .unwrap()
        .into_temp_path()
        .keep()
        .unwrap()
}

/// E1 — smoke (no encryption).
#[test]
fn e1_smoke_no_encryption() {
    let path = scratch_path("e1");
    let mut w = Writer::new_writer(&path, Cipher::none()).unwrap();

    let mut a = w
        .create_file("a.txt", Mode::regular(0o644), SystemTime::now())
        .unwrap();
    a.write(b"hello\n").unwrap();
    drop(a);

    w.create_file("d", Mode::directory(0o755), SystemTime::now())
        .unwrap();

    let payload: Vec<u8> = (0..=0xFFu32).map(|b| b as u8).collect();
    let mut b = w
        .create_file("d/b.bin", Mode::regular(0o600), SystemTime::now())
        .unwrap();
    b.write(&payload).unwrap();
    drop(b);

    w.close().unwrap();

    let file_len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(file_len % 32, 0);

    let reader = Reader::open(&path, Cipher::none()).unwrap();
    let names: Vec<&str> = reader.files().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "d", "d/b.bin"]);

    let member = reader
        .files()
        .iter()
        .find(|m| m.name == "d/b.bin")
        .unwrap()
        .clone();
    let mut view = reader.open_member(&member).unwrap();
    view.seek(SeekFrom::Start(100)).unwrap();
    let mut buf = [0u8; 20];
    view.read_exact(&mut buf).unwrap();
    assert_eq!(buf, payload[100..120]);

    std::fs::remove_file(&path).ok();
}

/// E2 — encrypted round-trip.
#[test]
fn e2_encrypted_round_trip() {
    let path = scratch_path("e2");
    let mut w = Writer::new_writer(&path, Cipher::new(EncryptionLevel::Aes256, b"pw")).unwrap();
    let mut a = w
        .create_file("a.txt", Mode::regular(0o644), SystemTime::now())
        .unwrap();
    a.write(b"hello\n").unwrap();
    drop(a);
    w.close().unwrap();

    let header = std::fs::read(&path).unwrap();
    assert_eq!(&header[0..8], b"QuickTar");

    let ok = Reader::open(&path, Cipher::new(EncryptionLevel::Aes256, b"pw"));
    assert!(ok.is_ok());

    let bad = Reader::open(&path, Cipher::new(EncryptionLevel::Aes256, b"wrong"));
    assert!(matches!(bad, Err(Error::WrongPassword)));

    std::fs::remove_file(&path).ok();
}

/// E3 — random-access determinism: for many random `(k, n)` windows,
/// `seek(k); read(n-k)` equals the reference buffer's `[k..n)`.
#[test]
fn e3_random_access_matches_reference() {
    use proptest::prelude::*;
    use rand::RngCore;

    let path = scratch_path("e3");
    let mut reference = vec![0u8; 1 << 20];
    rand::rng().fill_bytes(&mut reference);

    let mut w = Writer::new_writer(&path, Cipher::new(EncryptionLevel::Aes128, b"pw")).unwrap();
    let mut m = w
        .create_file("r.bin", Mode::regular(0o644), SystemTime::now())
        .unwrap();
    m.write(&reference).unwrap();
    drop(m);
    w.close().unwrap();

    let reader = Reader::open(&path, Cipher::new(EncryptionLevel::Aes128, b"pw")).unwrap();
    let member = reader.files()[0].clone();

    let len = reference.len();
    let mut runner = proptest::test_runner::TestRunner::new(proptest::test_runner::Config {
        cases: 200,
        ..Default::default()
    });
    runner
        .run(
            &(0..=len as u64).prop_flat_map(move |k| (Just(k), k..=len as u64)),
            |(k, n)| {
                let mut view = reader.open_member(&member).unwrap();
                view.seek(SeekFrom::Start(k)).unwrap();
                let mut buf = vec![0u8; (n - k) as usize];
                view.read_exact(&mut buf).unwrap();
                prop_assert_eq!(&buf[..], &reference[k as usize..n as usize]);
                Ok(())
            },
        )
        .unwrap();

    std::fs::remove_file(&path).ok();
}

/// E4 — append preserves old members.
#[test]
fn e4_append_preserves_old_member() {
    let path = scratch_path("e4");
    let mut w = Writer::new_writer(&path, Cipher::none()).unwrap();
    let mut m1 = w
        .create_file("m1", Mode::regular(0o644), SystemTime::now())
        .unwrap();
    m1.write(b"first").unwrap();
    drop(m1);
    w.close().unwrap();

    let mut w = Writer::open_for_append(&path, Cipher::none()).unwrap();
    let mut m2 = w
        .create_file("m2", Mode::regular(0o644), SystemTime::now())
        .unwrap();
    m2.write(b"second").unwrap();
    drop(m2);
    w.close().unwrap();

    let reader = Reader::open(&path, Cipher::none()).unwrap();
    let names: Vec<&str> = reader.files().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["m1", "m2"]);

    let m1 = reader.files()[0].clone();
    let mut view = reader.open_member(&m1).unwrap();
    let mut buf = Vec::new();
    view.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, b"first");

    std::fs::remove_file(&path).ok();
}

/// E5 — concurrent views agree with a sequential baseline.
#[test]
fn e5_concurrent_views_agree() {
    let path = scratch_path("e5");
    let mut w = Writer::new_writer(&path, Cipher::new(EncryptionLevel::Aes192, b"pw")).unwrap();
    for i in 0..4 {
        let mut m = w
            .create_file(
                &format!("f{i}.bin"),
                Mode::regular(0o644),
                SystemTime::now(),
            )
            .unwrap();
        m.write(&vec![i as u8; 4096]).unwrap();
        drop(m);
    }
    w.close().unwrap();

    let reader = std::sync::Arc::new(Reader::open(&path, Cipher::new(EncryptionLevel::Aes192, b"pw")).unwrap());
    reader.set_pool_size(2);

    let baseline: Vec<Vec<u8>> = reader
        .files()
        .iter()
        .map(|m| {
            let mut view = reader.open_member(m).unwrap();
            let mut buf = Vec::new();
            view.read_to_end(&mut buf).unwrap();
            buf
        })
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let reader = std::sync::Arc::clone(&reader);
            let baseline = baseline.clone();
            std::thread::spawn(move || {
                for (m, expected) in reader.files().iter().zip(baseline.iter()) {
                    let mut view = reader.open_member(m).unwrap();
                    let mut buf = Vec::new();
                    view.read_to_end(&mut buf).unwrap();
                    assert_eq!(&buf, expected);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    std::fs::remove_file(&path).ok();
}

/// E6 — legacy (pre-magic) archives still decode, and are rejected by
/// `open_for_append` with `BadMagic`.
#[test]
fn e6_legacy_fallback() {
    let path = scratch_path("e6");
    let payload = b"legacy payload";
    let name = "legacy.txt";

    let record = Record {
        offset: 0,
        size: payload.len() as u64,
        mode: Mode::regular(0o644),
        mod_nsec: 0,
        mod_sec: 0,
    };
    let mut index = Vec::new();
    index.extend_from_slice(&record.encode());
    encode_name(&mut index, name);

    let meta_start = payload.len() as u64;
    let mut trailer = [0u8; 32];
    trailer[0..8].copy_from_slice(&meta_start.to_le_bytes());
    trailer[8..16].copy_from_slice(&1u64.to_le_bytes());

    let mut bytes = Vec::new();
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&index);
    bytes.extend_from_slice(&trailer);
    std::fs::write(&path, &bytes).unwrap();

    let reader = Reader::open(&path, Cipher::none()).unwrap();
    assert_eq!(reader.files().len(), 1);
    assert_eq!(reader.files()[0].name, name);
    let member = reader.files()[0].clone();
    let mut view = reader.open_member(&member).unwrap();
    let mut buf = Vec::new();
    view.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, payload);

    let err = Writer::open_for_append(&path, Cipher::none()).unwrap_err();
    assert!(matches!(err, Error::BadMagic(_)));

    std::fs::remove_file(&path).ok();
}
