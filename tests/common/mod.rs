#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sealzip::crypto::{generate_key, write_public_key, write_secret_key, KeySuite, Passphrase};
use tempfile::TempDir;

pub const PASSPHRASE: &str = "123456";

/// A freshly generated key pair written to a scratch directory
pub struct TestKeys {
    pub dir: TempDir,
    pub public: PathBuf,
    pub secret: PathBuf,
}

pub fn generate_keys(user_id: &str) -> TestKeys {
    let dir = TempDir::new().unwrap();
    let public = dir.path().join("public.asc");
    let secret = dir.path().join("secret.asc");

    let cert = generate_key(user_id, &Passphrase::from(PASSPHRASE), KeySuite::Cv25519).unwrap();
    write_public_key(&cert, &public).unwrap();
    write_secret_key(&cert, &secret).unwrap();

    TestKeys { dir, public, secret }
}

/// docs/hello.txt, docs/sub/data.bin, docs/empty/
pub fn sample_tree(root: &Path) -> PathBuf {
    let docs = root.join("docs");
    fs::create_dir_all(docs.join("sub")).unwrap();
    fs::create_dir_all(docs.join("empty")).unwrap();
    fs::write(docs.join("hello.txt"), "hello world").unwrap();
    let data: Vec<u8> = (0..50_000u32).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(docs.join("sub").join("data.bin"), data).unwrap();
    docs
}
