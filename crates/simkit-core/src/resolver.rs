//! Locating a runtime's installed root directory.
//!
//! Runtime bundles (`*.simruntime`) live in one of two places: inside Xcode,
//! under the device platform directory, or system-wide under
//! `/Library/Developer/CoreSimulator/Profiles/Runtimes`. Each bundle names
//! itself through `CFBundleIdentifier` in `Contents/Info.plist`, which is
//! matched against the runtime identifier simctl reports.
//!
//! # Search order
//!
//! 1. `<developer dir>/Platforms/<DevicePlatform>.platform/Developer/Library/CoreSimulator/Profiles/Runtimes`,
//!    only when the platform has a known Xcode directory and the developer
//!    directory can be determined
//! 2. the system runtimes directory, for every platform
//!
//! The first bundle whose identifier matches and whose
//! `Contents/Resources/RuntimeRoot` exists wins.
//!
//! A missing candidate directory, a bundle without `Info.plist`, or an
//! `Info.plist` that cannot be decoded or carries no identifier is skipped.
//! Failing to list a directory that does exist aborts the search.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::metadata::{read_metadata, BundleInfo};
use crate::runtime::Platform;
use crate::shell::Shell;
use crate::xcode::Xcode;

/// System-wide directory that may hold runtime bundles.
pub const SYSTEM_RUNTIMES_DIR: &str = "/Library/Developer/CoreSimulator/Profiles/Runtimes";

const INFO_PLIST: &str = "Contents/Info.plist";
const RUNTIME_ROOT: &str = "Contents/Resources/RuntimeRoot";

/// Errors that can occur while resolving a runtime root.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No candidate bundle matched the runtime identifier.
    #[error("runtime profile not found: {identifier}")]
    RuntimeProfileNotFound { identifier: String },

    /// A candidate directory exists but could not be listed.
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Finds the `RuntimeRoot` of an installed runtime.
#[derive(Debug, Clone)]
pub struct RuntimePathResolver<S> {
    xcode: Xcode<S>,
    system_runtimes_dir: PathBuf,
}

impl<S: Shell> RuntimePathResolver<S> {
    /// Creates a resolver searching Xcode and [`SYSTEM_RUNTIMES_DIR`].
    pub fn new(xcode: Xcode<S>) -> Self {
        Self {
            xcode,
            system_runtimes_dir: PathBuf::from(SYSTEM_RUNTIMES_DIR),
        }
    }

    /// Searches `dir` instead of [`SYSTEM_RUNTIMES_DIR`] as the fallback.
    pub fn with_system_runtimes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system_runtimes_dir = dir.into();
        self
    }

    /// Candidate directories for `platform`, in search order.
    ///
    /// The Xcode directory is left out when the developer directory cannot
    /// be determined; the system directory is always searched.
    pub fn candidate_dirs(&self, platform: Platform) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(2);
        match self.xcode.runtime_profiles_path(platform) {
            Ok(Some(xcode_dir)) => candidates.push(xcode_dir),
            Ok(None) => {}
            Err(e) => {
                warn!(%platform, error = %e, "no developer directory, searching system runtimes only");
            }
        }
        candidates.push(self.system_runtimes_dir.clone());
        candidates
    }

    /// Returns the `RuntimeRoot` directory of the runtime with `identifier`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::ReadDir`] if an existing candidate directory cannot be listed
    /// - [`ResolveError::RuntimeProfileNotFound`] if no candidate matches
    pub fn resolve(&self, platform: Platform, identifier: &str) -> Result<PathBuf, ResolveError> {
        for dir in self.candidate_dirs(platform) {
            debug!(dir = %dir.display(), identifier, "searching for runtime bundle");
            for bundle in list_children(&dir)? {
                if let Some(root) = matching_root(&bundle, identifier) {
                    debug!(root = %root.display(), "resolved runtime root");
                    return Ok(root);
                }
            }
        }

        Err(ResolveError::RuntimeProfileNotFound {
            identifier: identifier.to_string(),
        })
    }
}

/// Immediate children of `dir`, sorted. A missing directory has no children.
fn list_children(dir: &Path) -> Result<Vec<PathBuf>, ResolveError> {
    let read_dir_err = |source| ResolveError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "candidate directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(read_dir_err(e)),
    };

    let mut children = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_dir_err)?;
    children.sort();
    Ok(children)
}

/// The bundle's `RuntimeRoot` if its identifier is `identifier` and the root exists.
fn matching_root(bundle: &Path, identifier: &str) -> Option<PathBuf> {
    let info_path = bundle.join(INFO_PLIST);
    if !info_path.exists() {
        return None;
    }

    let info: BundleInfo = match read_metadata(&info_path) {
        Ok(info) => info,
        Err(e) => {
            warn!(path = %info_path.display(), error = %e, "skipping unreadable runtime bundle");
            return None;
        }
    };

    let Some(bundle_identifier) = info.bundle_identifier else {
        warn!(path = %info_path.display(), "skipping runtime bundle without CFBundleIdentifier");
        return None;
    };

    if bundle_identifier != identifier {
        return None;
    }

    let root = bundle.join(RUNTIME_ROOT);
    if root.exists() {
        Some(root)
    } else {
        warn!(bundle = %bundle.display(), "matching runtime bundle has no RuntimeRoot");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{ShellError, ShellOutput};

    struct NoShell;

    impl Shell for NoShell {
        fn run(&self, program: &str, _args: &[&str]) -> Result<ShellOutput, ShellError> {
            panic!("unexpected command: {program}");
        }
    }

    fn write_bundle(dir: &Path, name: &str, identifier: &str) -> PathBuf {
        let bundle = dir.join(name);
        std::fs::create_dir_all(bundle.join(RUNTIME_ROOT)).unwrap();
        let mut dict = plist::Dictionary::new();
        dict.insert(
            "CFBundleIdentifier".to_string(),
            plist::Value::String(identifier.to_string()),
        );
        plist::Value::Dictionary(dict)
            .to_file_xml(bundle.join(INFO_PLIST))
            .unwrap();
        bundle
    }

    #[test]
    fn test_matching_root_requires_runtime_root() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = write_bundle(tmp.path(), "iOS.simruntime", "com.example.iOS-17-0");
        assert_eq!(
            matching_root(&bundle, "com.example.iOS-17-0"),
            Some(bundle.join(RUNTIME_ROOT))
        );

        std::fs::remove_dir_all(bundle.join(RUNTIME_ROOT)).unwrap();
        assert_eq!(matching_root(&bundle, "com.example.iOS-17-0"), None);
    }

    #[test]
    fn test_matching_root_without_info_plist() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("Empty.simruntime");
        std::fs::create_dir_all(&bundle).unwrap();
        assert_eq!(matching_root(&bundle, "anything"), None);
    }

    #[test]
    fn test_list_children_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let children = list_children(&tmp.path().join("nope")).unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn test_list_children_on_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(list_children(&file), Err(ResolveError::ReadDir { .. })));
    }

    #[test]
    fn test_list_children_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            std::fs::create_dir(tmp.path().join(name)).unwrap();
        }
        let names: Vec<_> = list_children(tmp.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_platform_only_searches_system_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = RuntimePathResolver::new(Xcode::new(NoShell))
            .with_system_runtimes_dir(tmp.path());

        let candidates = resolver.candidate_dirs(Platform::Unknown);
        assert_eq!(candidates, vec![tmp.path().to_path_buf()]);
    }

    #[test]
    fn test_candidate_order_xcode_first() {
        let resolver = RuntimePathResolver::new(
            Xcode::new(NoShell).with_developer_dir(Some(PathBuf::from("/xcode"))),
        );

        let candidates = resolver.candidate_dirs(Platform::WatchOs);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/xcode/Platforms/WatchOS.platform/Developer/Library/CoreSimulator/Profiles/Runtimes"),
                PathBuf::from(SYSTEM_RUNTIMES_DIR),
            ]
        );
    }

    #[test]
    fn test_not_found_error_message() {
        let err = ResolveError::RuntimeProfileNotFound {
            identifier: "com.example".to_string(),
        };
        assert_eq!(err.to_string(), "runtime profile not found: com.example");
    }
}
