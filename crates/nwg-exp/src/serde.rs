use std::collections::BTreeMap;

use nwg_core::errors::{ErrorInfo, NwgError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

fn serde_error(code: &str, subject: &str, err: impl ToString) -> NwgError {
    NwgError::Serde(ErrorInfo::new(code, err.to_string()).with_context("subject", subject))
}

/// Sorts object keys at every depth; arrays keep their order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect::<Map<_, _>>(),
        ),
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Encodes `value` as key-sorted JSON.
///
/// `subject` names what is being written (`run report`, `condition`, ...) and
/// lands in the error context on failure.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T, subject: &str) -> Result<Vec<u8>, NwgError> {
    let value =
        serde_json::to_value(value).map_err(|err| serde_error("json-encode", subject, err))?;
    serde_json::to_vec(&canonicalize(value)).map_err(|err| serde_error("json-write", subject, err))
}

/// Decodes a JSON document describing `subject`.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8], subject: &str) -> Result<T, NwgError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json-decode", subject, err))
}
