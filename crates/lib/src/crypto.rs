//! Cryptographic primitives for the credential store
//!
//! Provides password hashing and credential sealing using:
//! - Argon2id for password hashing (PHC strings, salt embedded)
//! - AES-256-GCM for sealing the secondary credential at rest

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng},
};
use argon2::{
    Argon2,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};
use thiserror::Error;
use zeroize::Zeroize;

use crate::Result;

/// Nonce length for AES-GCM (12 bytes standard)
pub const NONCE_LENGTH: usize = 12;

/// Key length for AES-256 (32 bytes)
pub const KEY_LENGTH: usize = 32;

/// Errors from hashing or sealing primitives.
///
/// These are internal faults (bad key material, corrupted ciphertext), never
/// ordinary authentication outcomes; a wrong password is reported as
/// `Ok(false)` by [`verify_password`], not as an error.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Password hashing failed: {reason}")]
    HashFailed { reason: String },

    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Credential sealing failed: {reason}")]
    SealFailed { reason: String },

    #[error("Sealed credential cannot be opened: {reason}")]
    OpenFailed { reason: String },

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

impl From<CryptoError> for crate::Error {
    fn from(err: CryptoError) -> Self {
        crate::Error::Crypto(err)
    }
}

/// Hash a password with Argon2id under a fresh random salt.
///
/// Returns the PHC-format hash string; the salt travels inside it.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand_core::OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::HashFailed {
            reason: e.to_string(),
        })?
        .to_string();

    Ok(hash)
}

/// Verify a password against a stored PHC hash string.
///
/// `Ok(false)` means the password does not match. An error means the stored
/// hash itself could not be used.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| CryptoError::MalformedHash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CryptoError::OpenFailed {
            reason: e.to_string(),
        }
        .into()),
    }
}

/// Seal a credential under the master key.
///
/// The output blob is the 12-byte random nonce followed by the AES-256-GCM
/// ciphertext; it is self-contained and lands in a single column.
pub fn seal_credential(plaintext: &str, key: &[u8]) -> Result<Vec<u8>> {
    if key.len() != KEY_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_LENGTH,
            actual: key.len(),
        }
        .into());
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::SealFailed {
        reason: e.to_string(),
    })?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext =
        cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::SealFailed {
                reason: e.to_string(),
            })?;

    let mut blob = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open a sealed credential blob produced by [`seal_credential`].
pub fn open_credential(blob: &[u8], key: &[u8]) -> Result<String> {
    if key.len() != KEY_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_LENGTH,
            actual: key.len(),
        }
        .into());
    }

    if blob.len() <= NONCE_LENGTH {
        return Err(CryptoError::OpenFailed {
            reason: format!("blob too short: {} bytes", blob.len()),
        }
        .into());
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::OpenFailed {
        reason: e.to_string(),
    })?;

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LENGTH);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::OpenFailed {
            reason: e.to_string(),
        })?;

    String::from_utf8(plaintext).map_err(|e| {
        // Scrub the rejected bytes before surfacing the fault
        let mut bytes = e.into_bytes();
        bytes.zeroize();
        CryptoError::OpenFailed {
            reason: "plaintext is not valid UTF-8".to_string(),
        }
        .into()
    })
}
