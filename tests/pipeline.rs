mod common;

use std::fs;

use common::{generate_keys, sample_tree, PASSPHRASE};
use sealzip::crypto::{
    first_encryption_key, CipherChoice, CompressionChoice, KeyPolicy, KeyRing, Passphrase,
    RecipientKey,
};
use sealzip::services::{
    compress_directory, decrypt_file, encrypt_file, encrypt_file_with, extract_archive,
    open_container, seal_directory, EncryptOptions,
};
use sealzip::SealError;
use sequoia_openpgp::policy::Policy;
use tempfile::TempDir;

#[test]
fn full_round_trip_for_every_armor_and_integrity_setting() {
    let keys = generate_keys("alice@example.org");
    let work = TempDir::new().unwrap();
    let docs = sample_tree(work.path());
    let archive = work.path().join("a.zip");
    compress_directory(&docs, &archive).unwrap();

    for (armor, integrity) in [(false, false), (false, true), (true, false), (true, true)] {
        let encrypted = work.path().join(format!("a-{}-{}.pgp", armor, integrity));
        let decrypted = work.path().join(format!("a-{}-{}.zip", armor, integrity));
        let restored = work.path().join(format!("restored-{}-{}", armor, integrity));

        encrypt_file(&archive, &encrypted, &keys.public, EncryptOptions::new(armor, integrity)).unwrap();
        let head = fs::read(&encrypted).unwrap();
        assert_eq!(head.starts_with(b"-----BEGIN PGP MESSAGE-----"), armor);
        let report = decrypt_file(&encrypted, &keys.secret, &Passphrase::from(PASSPHRASE), &decrypted).unwrap();
        assert_eq!(report.integrity_protected, integrity);
        assert_eq!(fs::read(&decrypted).unwrap(), fs::read(&archive).unwrap());

        extract_archive(&decrypted, &restored).unwrap();
        assert_eq!(fs::read_to_string(restored.join("hello.txt")).unwrap(), "hello world");
        assert_eq!(
            fs::read(restored.join("sub").join("data.bin")).unwrap(),
            fs::read(docs.join("sub").join("data.bin")).unwrap()
        );
    }
}

#[test]
fn hello_scenario_with_armor() {
    let keys = generate_keys("alice@example.org");
    let work = TempDir::new().unwrap();
    let docs = work.path().join("a");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("hello.txt"), "hi").unwrap();

    let archive = work.path().join("a.zip");
    let sealed = work.path().join("a.zip.asc");
    let opened = work.path().join("out.zip");
    let restored = work.path().join("restored");

    compress_directory(&docs, &archive).unwrap();
    encrypt_file(&archive, &sealed, &keys.public, EncryptOptions::new(true, true)).unwrap();

    let text = fs::read_to_string(&sealed).unwrap();
    assert!(text.starts_with("-----BEGIN PGP MESSAGE-----"));
    assert!(text.bytes().all(|b| b.is_ascii()));

    decrypt_file(&sealed, &keys.secret, &Passphrase::from(PASSPHRASE), &opened).unwrap();
    extract_archive(&opened, &restored).unwrap();
    assert_eq!(fs::read(restored.join("hello.txt")).unwrap(), b"hi");
}

#[test]
fn alternative_ciphers_and_compression() {
    let keys = generate_keys("alice@example.org");
    let work = TempDir::new().unwrap();
    let input = work.path().join("payload.bin");
    fs::write(&input, vec![3u8; 10_000]).unwrap();

    let cases = [
        (CipherChoice::Cast5, CompressionChoice::Zlib, true),
        (CipherChoice::Aes128, CompressionChoice::Bzip2, false),
        (CipherChoice::Aes192, CompressionChoice::Uncompressed, true),
    ];
    for (cipher, compression, integrity) in cases {
        let options = EncryptOptions::new(false, integrity)
            .with_cipher(cipher)
            .with_compression(compression);
        let encrypted = work.path().join(format!("{}-{}.pgp", cipher, compression));
        let decrypted = work.path().join(format!("{}-{}.out", cipher, compression));

        encrypt_file(&input, &encrypted, &keys.public, options).unwrap();
        decrypt_file(&encrypted, &keys.secret, &Passphrase::from(PASSPHRASE), &decrypted).unwrap();
        assert_eq!(fs::read(&decrypted).unwrap(), vec![3u8; 10_000], "{} {}", cipher, compression);
    }
}

#[test]
fn tampered_protected_message_is_rejected_without_output() {
    let keys = generate_keys("alice@example.org");
    let work = TempDir::new().unwrap();
    let input = work.path().join("a.zip");
    fs::write(&input, vec![7u8; 8192]).unwrap();
    let encrypted = work.path().join("a.zip.pgp");
    let output = work.path().join("out.zip");

    encrypt_file(&input, &encrypted, &keys.public, EncryptOptions::new(false, true)).unwrap();
    let mut bytes = fs::read(&encrypted).unwrap();
    let at = bytes.len() / 2;
    bytes[at] ^= 0x40;
    fs::write(&encrypted, bytes).unwrap();

    let err = decrypt_file(&encrypted, &keys.secret, &Passphrase::from(PASSPHRASE), &output).unwrap_err();
    assert!(matches!(err, SealError::Integrity(_)), "{:?}", err);
    assert!(!output.exists());
}

#[test]
fn wrong_passphrase_and_wrong_key() {
    let alice = generate_keys("alice@example.org");
    let bob = generate_keys("bob@example.org");
    let work = TempDir::new().unwrap();
    let input = work.path().join("a.zip");
    fs::write(&input, b"zip bytes").unwrap();
    let encrypted = work.path().join("a.zip.pgp");
    let output = work.path().join("out.zip");

    encrypt_file(&input, &encrypted, &alice.public, EncryptOptions::default()).unwrap();

    let err = decrypt_file(&encrypted, &alice.secret, &Passphrase::from("000000"), &output).unwrap_err();
    assert!(matches!(err, SealError::Unlock { .. }));

    let err = decrypt_file(&encrypted, &bob.secret, &Passphrase::from(PASSPHRASE), &output).unwrap_err();
    match err {
        SealError::KeyNotFound(msg) => assert_eq!(msg, "Secret key for message not found"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!output.exists());
}

#[test]
fn public_ring_cannot_decrypt() {
    let keys = generate_keys("alice@example.org");
    let work = TempDir::new().unwrap();
    let input = work.path().join("a.zip");
    fs::write(&input, b"zip bytes").unwrap();
    let encrypted = work.path().join("a.zip.pgp");
    encrypt_file(&input, &encrypted, &keys.public, EncryptOptions::default()).unwrap();

    let err = decrypt_file(
        &encrypted,
        &keys.public,
        &Passphrase::from(PASSPHRASE),
        &work.path().join("out"),
    )
    .unwrap_err();
    assert!(matches!(err, SealError::KeyNotFound(_)));
}

#[test]
fn missing_inputs_are_not_found() {
    let keys = generate_keys("alice@example.org");
    let work = TempDir::new().unwrap();
    let missing = work.path().join("missing");
    let out = work.path().join("out");

    assert!(compress_directory(&missing, &out).unwrap_err().is_not_found());
    assert!(extract_archive(&missing, &out).unwrap_err().is_not_found());
    assert!(encrypt_file(&missing, &out, &keys.public, EncryptOptions::default())
        .unwrap_err()
        .is_not_found());
    assert!(decrypt_file(&missing, &keys.secret, &Passphrase::from(PASSPHRASE), &out)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn key_ring_with_several_certificates() {
    let first = generate_keys("first@example.org");
    let second = generate_keys("second@example.org");
    let work = TempDir::new().unwrap();

    let ring = work.path().join("ring.asc");
    let mut combined = fs::read(&first.public).unwrap();
    combined.extend(fs::read(&second.public).unwrap());
    fs::write(&ring, combined).unwrap();

    let input = work.path().join("a.zip");
    fs::write(&input, b"zip bytes").unwrap();

    // Default policy: the first certificate in the ring
    let to_first = work.path().join("first.pgp");
    encrypt_file(&input, &to_first, &ring, EncryptOptions::default()).unwrap();
    decrypt_file(&to_first, &first.secret, &Passphrase::from(PASSPHRASE), &work.path().join("f.out")).unwrap();

    let to_second = work.path().join("second.pgp");
    let pick_last = |ring: &KeyRing, policy: &dyn Policy| -> Option<RecipientKey> {
        let last = ring.certs().last()?.clone();
        first_encryption_key(&KeyRing::from_certs(vec![last]), policy)
    };
    encrypt_file_with(&input, &to_second, &ring, EncryptOptions::default(), &pick_last).unwrap();

    let err = decrypt_file(&to_second, &first.secret, &Passphrase::from(PASSPHRASE), &work.path().join("x"))
        .unwrap_err();
    assert!(matches!(err, SealError::KeyNotFound(_)));
    decrypt_file(&to_second, &second.secret, &Passphrase::from(PASSPHRASE), &work.path().join("s.out")).unwrap();

    let subkey = work.path().join("subkey.pgp");
    encrypt_file_with(&input, &subkey, &ring, EncryptOptions::default(), &KeyPolicy::Subkey).unwrap();
    decrypt_file(&subkey, &first.secret, &Passphrase::from(PASSPHRASE), &work.path().join("k.out")).unwrap();
}

#[test]
fn seal_and_open_directory() {
    let keys = generate_keys("alice@example.org");
    let work = TempDir::new().unwrap();
    let docs = sample_tree(work.path());
    let sealed = work.path().join("docs.pgp");
    let restored = work.path().join("restored");

    let sealed_report =
        seal_directory(&docs, &sealed, &keys.public, EncryptOptions::new(true, true), &KeyPolicy::First)
            .unwrap();
    assert_eq!(sealed_report.archive.files, 2);

    let opened = open_container(&sealed, &keys.secret, &Passphrase::from(PASSPHRASE), &restored).unwrap();
    assert_eq!(opened.decryption.payload.filename.as_deref(), Some("docs.zip"));
    assert_eq!(fs::read_to_string(restored.join("hello.txt")).unwrap(), "hello world");
    assert!(restored.join("empty").is_dir());
}
