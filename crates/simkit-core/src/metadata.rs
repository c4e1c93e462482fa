//! Typed decoding of on-disk metadata files.
//!
//! Simulator runtimes and devices describe themselves with property lists
//! (`Info.plist`, `device.plist`, `.GlobalPreferences.plist`). Files may be XML
//! or binary plists; a `.json` extension selects JSON instead. Callers always
//! get a typed record back and never inspect untyped dictionaries.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while decoding a metadata file.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a property list of the expected shape.
    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),

    /// The file is not JSON of the expected shape.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The subset of a bundle's `Info.plist` used to identify it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BundleInfo {
    /// `CFBundleIdentifier`, e.g. `com.apple.CoreSimulator.SimRuntime.iOS-17-0`.
    #[serde(rename = "CFBundleIdentifier", default)]
    pub bundle_identifier: Option<String>,

    /// `CFBundleName`, e.g. `iOS 17.0`.
    #[serde(rename = "CFBundleName", default)]
    pub bundle_name: Option<String>,
}

/// Decodes the metadata file at `path` into `T`.
///
/// # Errors
///
/// - [`MetadataError::Io`] if the file cannot be opened
/// - [`MetadataError::Plist`] / [`MetadataError::Json`] if decoding fails
pub fn read_metadata<T: DeserializeOwned>(path: &Path) -> Result<T, MetadataError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    } else {
        Ok(plist::from_file(path)?)
    }
}
