//! The catalog endpoint ships obfuscated inside the binary: base64 over
//! a repeating-key XOR. Light discouragement against scraping, nothing
//! more.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{CatalogError, Result};

/// Decode an obfuscated string back to its clear form.
pub fn reveal(encoded: &str, key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(CatalogError::EmptyKey);
    }

    let data = STANDARD.decode(encoded)?;
    let key = key.as_bytes();
    let clear: Vec<u8> = data
        .iter()
        .enumerate()
        .map(|(i, byte)| byte ^ key[i % key.len()])
        .collect();

    Ok(String::from_utf8(clear)?)
}
