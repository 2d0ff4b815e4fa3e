//! # Device credential (private key material).
//!
//! Loaded once at startup and immutable afterwards. The bytes are handed to
//! [`Connection::start_session`](crate::Connection::start_session) as-is;
//! parsing the key is the session layer's job. The buffer is zeroized on drop.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::ConfigError;

const PEM_MARKER: &str = "-----BEGIN ";

/// Immutable, cheaply cloneable private key material.
#[derive(Clone)]
pub struct Credential {
    bytes: Arc<Zeroizing<Vec<u8>>>,
}

impl Credential {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::new(Zeroizing::new(bytes.into())),
        }
    }

    /// Reads a PEM encoded key file.
    ///
    /// Fails when the file is unreadable, empty, or carries no PEM block.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = Zeroizing::new(std::fs::read(path).map_err(|e| ConfigError::Credential {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?);

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ConfigError::Credential {
                path: path.to_path_buf(),
                reason: "key file is empty".into(),
            });
        }
        if !String::from_utf8_lossy(&raw).contains(PEM_MARKER) {
            return Err(ConfigError::Credential {
                path: path.to_path_buf(),
                reason: "no PEM block found".into(),
            });
        }
        Ok(Self::from_bytes(raw.to_vec()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
