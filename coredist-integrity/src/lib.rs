//! File integrity primitives for the distribution build.
//!
//! Every distributable artifact gets a recomputed byte size and content hash
//! on every build; stale values from the source tree are never trusted. An
//! artifact may additionally carry a detached signature (`<file>.sig`, raw
//! signature bytes) verified against the fixed release signing key. A missing
//! signature file is normal; a present-but-invalid one is fatal.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signature, Verifier};
use sha2::digest::Output;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

pub use ed25519_dalek::VerifyingKey;

const CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Public half of the release signing key. Build-time constant; the key
/// itself is never validated against user input.
pub const RELEASE_PUBLIC_KEY: [u8; 32] = [
    0xd7, 0x5a, 0x98, 0x01, 0x82, 0xb1, 0x0a, 0xb7, 0xd5, 0x4b, 0xfe, 0xd3, 0xc9, 0x64, 0x07,
    0x3a, 0x0e, 0xe1, 0x72, 0xf3, 0xda, 0xa6, 0x23, 0x25, 0xaf, 0x02, 0x1a, 0x68, 0xf7, 0x07,
    0x51, 0x1a,
];

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("signature verification failed for {path}")]
    SignatureMismatch { path: String },
    #[error("malformed signature file {path}: expected {expected} bytes, found {found}")]
    MalformedSignature {
        path: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid release public key")]
    InvalidKey,
}

impl IntegrityError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Content hash algorithm.
///
/// Configuration, not contract — strength may be upgraded across catalog
/// format epochs. Digests are always lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

/// Compute the byte size and lowercase hex digest of a file, streaming in
/// 64 KB chunks.
pub fn hash_and_size(path: &Path, algo: HashAlgorithm) -> Result<(u64, String), IntegrityError> {
    let file = File::open(path).map_err(|e| IntegrityError::io(path, e))?;
    match algo {
        HashAlgorithm::Sha256 => digest_stream(path, file, Sha256::new()),
        HashAlgorithm::Sha512 => digest_stream(path, file, Sha512::new()),
    }
}

fn digest_stream<D: Digest>(
    path: &Path,
    mut file: File,
    mut hasher: D,
) -> Result<(u64, String), IntegrityError>
where
    Output<D>: std::fmt::LowerHex,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut size: u64 = 0;

    loop {
        let n = file.read(&mut buf).map_err(|e| IntegrityError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok((size, format!("{:x}", hasher.finalize())))
}

/// Return the fixed release verifying key.
pub fn release_public_key() -> Result<VerifyingKey, IntegrityError> {
    VerifyingKey::from_bytes(&RELEASE_PUBLIC_KEY).map_err(|_| IntegrityError::InvalidKey)
}

/// Path of the detached signature file for an artifact.
pub fn signature_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".sig");
    PathBuf::from(name)
}

/// Verify a detached signature next to `path`, if one exists.
///
/// - no `<path>.sig` → `Ok(None)` (most files are unsigned)
/// - valid signature over the exact file bytes → `Ok(Some(base64))`
/// - present but invalid → [`IntegrityError::SignatureMismatch`], naming the
///   file; the build must not silently ship it
pub fn verify_signature(
    path: &Path,
    key: &VerifyingKey,
) -> Result<Option<String>, IntegrityError> {
    let sig_path = signature_path(path);
    let sig_bytes = match std::fs::read(&sig_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(IntegrityError::io(&sig_path, e)),
    };

    let raw: [u8; 64] =
        sig_bytes
            .as_slice()
            .try_into()
            .map_err(|_| IntegrityError::MalformedSignature {
                path: sig_path.display().to_string(),
                expected: 64,
                found: sig_bytes.len(),
            })?;
    let signature = Signature::from_bytes(&raw);

    let data = std::fs::read(path).map_err(|e| IntegrityError::io(path, e))?;
    key.verify(&data, &signature)
        .map_err(|_| IntegrityError::SignatureMismatch {
            path: path.display().to_string(),
        })?;

    Ok(Some(BASE64.encode(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn test_signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn hash_is_deterministic() {
        let (_dir, path) = write_temp(b"hello catalog");
        let first = hash_and_size(&path, HashAlgorithm::Sha256).unwrap();
        let second = hash_and_size(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.0, 13);
        assert_eq!(first.1.len(), 64);
    }

    #[test]
    fn sha256_of_empty_file() {
        let (_dir, path) = write_temp(b"");
        let (size, digest) = hash_and_size(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(size, 0);
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha512_digest_length() {
        let (_dir, path) = write_temp(b"abc");
        let (_, digest) = hash_and_size(&path, HashAlgorithm::Sha512).unwrap();
        assert_eq!(digest.len(), 128);
    }

    #[test]
    fn missing_sig_is_not_an_error() {
        let (_dir, path) = write_temp(b"unsigned");
        let key = test_signing_key().verifying_key();
        assert!(verify_signature(&path, &key).unwrap().is_none());
    }

    #[test]
    fn valid_sig_round_trips_as_base64() {
        let (_dir, path) = write_temp(b"signed payload");
        let signing = test_signing_key();
        let sig = signing.sign(b"signed payload");
        std::fs::write(signature_path(&path), sig.to_bytes()).unwrap();

        let encoded = verify_signature(&path, &signing.verifying_key())
            .unwrap()
            .unwrap();
        assert_eq!(BASE64.decode(&encoded).unwrap(), sig.to_bytes().to_vec());
    }

    #[test]
    fn invalid_sig_is_fatal() {
        let (_dir, path) = write_temp(b"payload");
        let signing = test_signing_key();
        // Signature over different bytes must not verify.
        let sig = signing.sign(b"other payload");
        std::fs::write(signature_path(&path), sig.to_bytes()).unwrap();

        let err = verify_signature(&path, &signing.verifying_key()).unwrap_err();
        assert!(matches!(err, IntegrityError::SignatureMismatch { .. }));
    }

    #[test]
    fn truncated_sig_is_malformed() {
        let (_dir, path) = write_temp(b"payload");
        std::fs::write(signature_path(&path), [0u8; 12]).unwrap();

        let key = test_signing_key().verifying_key();
        let err = verify_signature(&path, &key).unwrap_err();
        assert!(matches!(err, IntegrityError::MalformedSignature { .. }));
    }

    #[test]
    fn embedded_public_key_parses() {
        release_public_key().unwrap();
    }
}
