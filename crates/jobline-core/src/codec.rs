//! Attribute codec.
//!
//! Jobs carry an opaque key/value payload. The store never inspects it; it is
//! encoded to bytes on the way in and decoded back on the way out. JSON is the
//! wire format, so any mapping of scalars, sequences, and nested mappings
//! round-trips losslessly.

use serde_json::{Map, Value};

use crate::{Error, Result};

/// The payload mapping carried by every job.
pub type AttrMap = Map<String, Value>;

/// Encode an attribute mapping to storable bytes.
pub fn encode(attrs: &AttrMap) -> Result<Vec<u8>> {
    // Encoding a mapping we hold in memory is not a corrupt *stored* payload,
    // so a failure here is reported as a bad record instead.
    serde_json::to_vec(attrs)
        .map_err(|e| Error::InvalidRecord(format!("unencodable attribute payload: {e}")))
}

/// Decode stored bytes back into an attribute mapping.
///
/// Anything that does not decode to a mapping — malformed bytes or a
/// well-formed value of the wrong shape — is a [`Error::CorruptPayload`]:
/// the record cannot be reconstructed and the failure must reach the caller.
pub fn decode(bytes: &[u8]) -> Result<AttrMap> {
    let value = serde_json::from_slice::<Value>(bytes)
        .map_err(|e| Error::CorruptPayload(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::CorruptPayload(format!(
            "attribute payload is not a mapping: {other}"
        ))),
    }
}
