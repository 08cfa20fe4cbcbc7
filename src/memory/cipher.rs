// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! At-rest encryption for memory files
//!
//! Files are `nonce (12 bytes) || AES-256-GCM ciphertext`. The key is the
//! SHA-256 digest of a random per-install secret kept next to the data.

use std::path::Path;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{EchoError, Result};

const NONCE_LEN: usize = 12;
const SECRET_LEN: usize = 32;

/// Symmetric cipher bound to one install secret
#[derive(Clone)]
pub struct MemoryCipher {
    cipher: Aes256Gcm,
}

impl MemoryCipher {
    /// Build a cipher from raw secret bytes
    pub fn from_secret(secret: &[u8]) -> Self {
        let digest = Sha256::digest(secret);
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Load the secret at `key_path`, creating it on first use
    pub async fn load_or_create(key_path: &Path) -> Result<Self> {
        match tokio::fs::read(key_path).await {
            Ok(secret) if secret.len() == SECRET_LEN => Ok(Self::from_secret(&secret)),
            Ok(secret) => Err(EchoError::Crypto(format!(
                "Key file {} has {} bytes, expected {}",
                key_path.display(),
                secret.len(),
                SECRET_LEN
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut secret = [0u8; SECRET_LEN];
                rand::rng().fill_bytes(&mut secret);

                if let Some(parent) = key_path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(key_path, secret).await?;
                restrict_permissions(key_path).await;

                tracing::info!("Created memory key at {}", key_path.display());
                Ok(Self::from_secret(&secret))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Encrypt with a fresh random nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self.cipher.encrypt(&nonce, plaintext)?;

        let mut out = nonce.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext` blob
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN {
            return Err(EchoError::Crypto(
                "Encrypted file is corrupted (too short)".to_string(),
            ));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        Ok(self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)?)
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) =
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
    {
        tracing::warn!("Could not restrict {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) {}
