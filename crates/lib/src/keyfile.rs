//! Master key lifecycle
//!
//! The key that seals every stored credential lives in a single file next to
//! the database: 32 random bytes, base64-encoded, owner-readable only. The
//! lifecycle is strictly "create if absent, else load". The key is never
//! rotated, and [`Vault::open`](crate::Vault::open) refuses to proceed when a
//! fresh key appears over a store that already holds sealed credentials.

use std::path::{Path, PathBuf};

use base64ct::{Base64, Encoding};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Result, crypto::KEY_LENGTH};

/// Errors around key-file handling. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum KeyfileError {
    #[error("Cannot access key file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Key file {path} does not contain a valid key")]
    Malformed { path: PathBuf },

    #[error(
        "Key file {path} was newly created but the store already holds {users} user(s) whose sealed credentials this key cannot open; restore the original key file"
    )]
    OrphanedCredentials { path: PathBuf, users: i64 },
}

impl From<KeyfileError> for crate::Error {
    fn from(err: KeyfileError) -> Self {
        crate::Error::Keyfile(err)
    }
}

/// The symmetric key sealing every stored credential.
///
/// Read-only after load and shared across all operations. Key material is
/// zeroized on drop and never printed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LENGTH],
}

impl MasterKey {
    /// Raw key bytes for the cipher.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Load the key from `path`, or generate and persist a fresh one if the
    /// file does not exist.
    ///
    /// The returned flag reports whether the key was freshly created, so the
    /// caller can refuse to start when a fresh key would orphan existing
    /// ciphertexts. Concurrent first runs are safe: creation uses
    /// `create_new`, and the loser of the race loads the winner's file.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        match Self::load(path)? {
            Some(key) => Ok((key, false)),
            None => match Self::generate_and_persist(path)? {
                Some(key) => Ok((key, true)),
                // Lost the creation race; the other writer's key is on disk now
                None => match Self::load(path)? {
                    Some(key) => Ok((key, false)),
                    None => Err(KeyfileError::Malformed {
                        path: path.to_path_buf(),
                    }
                    .into()),
                },
            },
        }
    }

    /// Read and decode the key file. `Ok(None)` means the file is absent.
    fn load(path: &Path) -> Result<Option<Self>> {
        let encoded = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(KeyfileError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
                .into());
            }
        };

        let mut decoded =
            Base64::decode_vec(encoded.trim()).map_err(|_| KeyfileError::Malformed {
                path: path.to_path_buf(),
            })?;

        if decoded.len() != KEY_LENGTH {
            decoded.zeroize();
            return Err(KeyfileError::Malformed {
                path: path.to_path_buf(),
            }
            .into());
        }

        let mut bytes = [0u8; KEY_LENGTH];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Some(Self { bytes }))
    }

    /// Generate a key and write it with owner-only permissions.
    /// `Ok(None)` means another writer created the file first.
    fn generate_and_persist(path: &Path) -> Result<Option<Self>> {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        let mut encoded = Base64::encode_string(&bytes);

        let written = write_new_restricted(path, encoded.as_bytes());
        encoded.zeroize();

        match written {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Generated new encryption key");
                Ok(Some(Self { bytes }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                bytes.zeroize();
                Ok(None)
            }
            Err(e) => {
                bytes.zeroize();
                Err(KeyfileError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
                .into())
            }
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl MasterKey {
    /// Build a key from fixed bytes, for tests that skip the key file.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { bytes }
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

#[cfg(unix)]
fn write_new_restricted(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_new_restricted(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(contents)
}
