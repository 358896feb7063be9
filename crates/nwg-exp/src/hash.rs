use nwg_core::errors::NwgError;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::serde::to_canonical_json_bytes;

/// Hex SHA-256 over the canonical JSON of `value`; `subject` labels failures.
pub fn stable_hash_string<T: Serialize>(value: &T, subject: &str) -> Result<String, NwgError> {
    let bytes = to_canonical_json_bytes(value, subject)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
