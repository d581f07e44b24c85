//! A secret value (the IMAP password) that zeroizes its backing memory on
//! drop. Supports the `_FILE` indirection convention (`EMAIL_PASS_FILE`
//! pointing at a file whose trimmed contents are the real value) so
//! container deployments needn't carry the secret in plaintext env vars.

use std::fmt;
use std::path::Path;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ConfigError;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(\"***\")")
    }
}

/// Resolve a secret from an inline value, falling back to a `_FILE`-style
/// indirection path whose trimmed contents become the value.
pub fn resolve_secret(
    inline: Option<String>,
    file_path: Option<&Path>,
) -> Result<Option<SecretString>, ConfigError> {
    if let Some(value) = inline.filter(|v| !v.is_empty()) {
        return Ok(Some(SecretString::new(value)));
    }

    if let Some(path) = file_path {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::SecretFileIo {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = contents.trim();
        if !trimmed.is_empty() {
            return Ok(Some(SecretString::new(trimmed.to_string())));
        }
    }

    Ok(None)
}
