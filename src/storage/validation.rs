//! Key validation for the object store.
//!
//! Keys double as relative filesystem paths in the filesystem backend, so
//! anything that could escape the storage directory is rejected everywhere.

use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};

/// Validates an object key and returns it unchanged.
///
/// Rejects keys that:
/// - Are empty
/// - Are absolute (start with `/` or drive letter)
/// - Contain `..` components
/// - Contain root or prefix components
/// - Are not in canonical form (`//`, `./`, trailing `/`)
///
/// Keys are never rewritten: two distinct keys must never address the same
/// object.
pub(crate) fn validate_key(key: &str) -> Result<String> {
    if key.is_empty() {
        bail!("Object key cannot be empty");
    }

    let path = Path::new(key);
    if path.is_absolute() || key.starts_with('/') {
        bail!("Object key cannot be absolute: {key}");
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => match name.to_str() {
                Some(name) => parts.push(name),
                None => bail!("Object key is not valid UTF-8: {key}"),
            },
            Component::CurDir => {},
            Component::ParentDir => bail!("Object key cannot contain '..': {key}"),
            Component::RootDir | Component::Prefix(_) => {
                bail!("Object key cannot contain root or prefix: {key}")
            },
        }
    }

    if parts.is_empty() {
        bail!("Object key normalized to empty path");
    }

    let canonical = parts.join("/");
    if canonical != key {
        bail!("Object key is not canonical: {key:?} (expected {canonical:?})");
    }
    Ok(canonical)
}

/// Returns the filesystem path of an object under `base_dir`.
pub(crate) fn object_path(base_dir: &Path, key: &str) -> Result<PathBuf> {
    let normalized = validate_key(key)?;
    Ok(base_dir.join(normalized))
}
