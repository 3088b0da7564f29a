//! YAML decoding for scenario documents.
//!
//! Scenario files write enum variants as single-key maps
//! (`revealed_on: {after_turn: 2}`), not as `!tag` values, so every YAML
//! read goes through `singleton_map_recursive`.

use serde::de::DeserializeOwned;

/// Deserializes `source`, reading enum variants as single-key maps at any
/// depth.
///
/// # Errors
///
/// Returns the underlying `serde_yaml::Error` if `source` is malformed or
/// does not match `T`.
pub fn from_str<T: DeserializeOwned>(source: &str) -> Result<T, serde_yaml::Error> {
    serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(
        source,
    ))
}
