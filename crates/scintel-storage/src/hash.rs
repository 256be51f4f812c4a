use crate::error::Result;
use scintel_common::types::Snapshot;
use sha2::{Digest, Sha256};

/// Run bookkeeping, left out of the content hash.
const VOLATILE_FIELDS: [&str; 5] = [
    "last_updated",
    "harvest_stats",
    "health",
    "version",
    "content_hash",
];

const HASH_HEX_CHARS: usize = 12;

/// Short digest of a snapshot's content, stable across runs that produced
/// the same data. Object keys are serialized in sorted order.
pub fn content_hash(snapshot: &Snapshot) -> Result<String> {
    let mut value = serde_json::to_value(snapshot)?;
    if let Some(map) = value.as_object_mut() {
        for field in VOLATILE_FIELDS {
            map.remove(field);
        }
    }
    let canonical = serde_json::to_vec(&value)?;
    let digest = hex::encode(Sha256::digest(&canonical));
    Ok(digest[..HASH_HEX_CHARS].to_string())
}
