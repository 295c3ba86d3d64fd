//! Asset key naming and creation-time metadata.
//!
//! Keys have the form `images/{epoch-millis}-{token}.png`, where `token` is
//! six characters drawn from `[0-9a-z]`. Uniqueness is probabilistic: two
//! assets created in the same millisecond collide with probability 36^-6.

use std::fmt;

use rand::Rng;

use crate::constants::{ASSET_PREFIX, ASSET_TOKEN_LEN, CREATED_AT_FIELD};
use crate::storage::Metadata;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Storage key of a generated image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    /// Builds a key for an asset created at `now_millis`, drawing the suffix
    /// from `rng`.
    pub fn generate<R: Rng>(now_millis: i64, rng: &mut R) -> Self {
        let token: String = (0..ASSET_TOKEN_LEN)
            .map(|_| char::from(TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())]))
            .collect();
        Self(format!("{ASSET_PREFIX}{now_millis}-{token}.png"))
    }

    /// Builds a key using the thread-local RNG.
    pub fn new_random(now_millis: i64) -> Self {
        Self::generate(now_millis, &mut rand::rng())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public URL of the asset under `base_url`.
    ///
    /// A trailing slash on `base_url` is not doubled.
    pub fn public_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Metadata recorded alongside a freshly generated asset.
pub fn created_at_metadata(now_millis: i64) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(CREATED_AT_FIELD.to_string(), now_millis.to_string());
    metadata
}

/// Reads the creation time from object metadata.
///
/// Returns `None` when the field is missing, blank or not numeric. The field
/// name matches case-insensitively because S3-compatible stores lowercase
/// user metadata names. Fractional values are floored, which preserves a
/// strict `<` comparison against an integer cutoff.
#[allow(clippy::cast_possible_truncation)]
pub fn created_at_from(metadata: &Metadata) -> Option<i64> {
    let raw = metadata
        .get(CREATED_AT_FIELD)
        .or_else(|| {
            metadata
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(CREATED_AT_FIELD))
                .map(|(_, value)| value)
        })?
        .trim();

    if raw.is_empty() {
        return None;
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return Some(millis);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.floor() as i64)
}
