//! Runtime root resolution against on-disk bundle layouts.
//!
//! Each test builds a fake developer directory and a fake system runtimes
//! directory in a temp dir, then asks the resolver for a runtime root.

mod common;

use std::path::PathBuf;

use common::{write_raw_info_plist, write_runtime_bundle, xcode_runtimes_dir, MockShell, XCODE_SELECT};

use simkit_core::resolver::{ResolveError, RuntimePathResolver};
use simkit_core::runtime::Platform;
use simkit_core::shell::ShellOutput;
use simkit_core::xcode::Xcode;

const IOS_17: &str = "com.apple.CoreSimulator.SimRuntime.iOS-17-0";

struct Layout {
    _tmp: tempfile::TempDir,
    developer: PathBuf,
    system: PathBuf,
}

fn layout() -> Layout {
    let tmp = tempfile::tempdir().unwrap();
    let developer = tmp.path().join("Xcode.app/Contents/Developer");
    let system = tmp.path().join("Library/Developer/CoreSimulator/Profiles/Runtimes");
    std::fs::create_dir_all(&developer).unwrap();
    std::fs::create_dir_all(&system).unwrap();
    Layout { _tmp: tmp, developer, system }
}

fn resolver<'a>(shell: &'a MockShell, layout: &Layout) -> RuntimePathResolver<&'a MockShell> {
    shell.stub_developer_dir(&layout.developer);
    RuntimePathResolver::new(Xcode::new(shell)).with_system_runtimes_dir(&layout.system)
}

#[test]
fn test_resolves_from_system_dir() {
    let layout = layout();
    let shell = MockShell::new();
    let expected = write_runtime_bundle(&layout.system, "iOS 17.0.simruntime", IOS_17);

    let root = resolver(&shell, &layout).resolve(Platform::Ios, IOS_17).unwrap();
    assert_eq!(root, expected);
}

#[test]
fn test_xcode_dir_wins_over_system_dir() {
    let layout = layout();
    let shell = MockShell::new();
    let xcode_dir = xcode_runtimes_dir(&layout.developer, "iPhoneOS");
    let from_xcode = write_runtime_bundle(&xcode_dir, "iOS.simruntime", IOS_17);
    let from_system = write_runtime_bundle(&layout.system, "iOS.simruntime", IOS_17);

    let root = resolver(&shell, &layout).resolve(Platform::Ios, IOS_17).unwrap();
    assert_eq!(root, from_xcode);
    assert_ne!(root, from_system);
}

#[test]
fn test_bad_metadata_is_skipped() {
    let layout = layout();
    let shell = MockShell::new();

    // Sorted ahead of the valid bundle, so both are inspected first.
    let mut dict = plist::Dictionary::new();
    dict.insert("CFBundleName".to_string(), plist::Value::String("iOS 17.0".to_string()));
    let no_identifier = layout.system.join("a-no-identifier.simruntime");
    std::fs::create_dir_all(no_identifier.join("Contents/Resources/RuntimeRoot")).unwrap();
    plist::Value::Dictionary(dict)
        .to_file_xml(no_identifier.join("Contents/Info.plist"))
        .unwrap();

    write_raw_info_plist(&layout.system, "b-malformed.simruntime", "<plist><dict><key>");
    std::fs::create_dir_all(layout.system.join("c-no-info-plist.simruntime")).unwrap();
    std::fs::write(layout.system.join("d-stray-file"), "not a bundle").unwrap();

    let expected = write_runtime_bundle(&layout.system, "e-valid.simruntime", IOS_17);

    let root = resolver(&shell, &layout).resolve(Platform::Ios, IOS_17).unwrap();
    assert_eq!(root, expected);
}

#[test]
fn test_bad_metadata_in_xcode_dir_falls_through_to_system_dir() {
    let layout = layout();
    let shell = MockShell::new();
    let xcode_dir = xcode_runtimes_dir(&layout.developer, "iPhoneOS");
    write_raw_info_plist(&xcode_dir, "iOS.simruntime", "not a plist at all");
    let expected = write_runtime_bundle(&layout.system, "iOS.simruntime", IOS_17);

    let root = resolver(&shell, &layout).resolve(Platform::Ios, IOS_17).unwrap();
    assert_eq!(root, expected);
}

#[test]
fn test_no_match_is_runtime_profile_not_found() {
    let layout = layout();
    let shell = MockShell::new();
    let xcode_dir = xcode_runtimes_dir(&layout.developer, "iPhoneOS");
    write_runtime_bundle(&xcode_dir, "iOS 16.4.simruntime", "com.apple.CoreSimulator.SimRuntime.iOS-16-4");
    write_runtime_bundle(&layout.system, "tvOS.simruntime", "com.apple.CoreSimulator.SimRuntime.tvOS-17-0");

    let err = resolver(&shell, &layout).resolve(Platform::Ios, IOS_17).unwrap_err();
    match err {
        ResolveError::RuntimeProfileNotFound { identifier } => assert_eq!(identifier, IOS_17),
        other => panic!("Expected RuntimeProfileNotFound, got: {:?}", other),
    }
}

#[test]
fn test_identifier_match_is_exact() {
    let layout = layout();
    let shell = MockShell::new();
    write_runtime_bundle(&layout.system, "iOS.simruntime", "com.apple.CoreSimulator.SimRuntime.iOS-17-0-beta");

    let err = resolver(&shell, &layout).resolve(Platform::Ios, IOS_17).unwrap_err();
    assert!(matches!(err, ResolveError::RuntimeProfileNotFound { .. }));
}

#[test]
fn test_unknown_platform_still_searches_system_dir() {
    let layout = layout();
    let shell = MockShell::new();
    let identifier = "com.apple.CoreSimulator.SimRuntime.xrOS-1-0";
    let expected = write_runtime_bundle(&layout.system, "xrOS.simruntime", identifier);

    let root = resolver(&shell, &layout).resolve(Platform::Unknown, identifier).unwrap();
    assert_eq!(root, expected);
    // No Xcode candidate for an unknown platform, so xcode-select is never asked.
    assert_eq!(shell.call_count(&[XCODE_SELECT, "-p"]), 0);
}

#[test]
fn test_missing_candidate_dirs_are_not_fatal() {
    let layout = layout();
    let shell = MockShell::new();
    std::fs::remove_dir_all(&layout.system).unwrap();

    let err = resolver(&shell, &layout).resolve(Platform::WatchOs, "anything").unwrap_err();
    assert!(matches!(err, ResolveError::RuntimeProfileNotFound { .. }));
}

#[test]
fn test_unlistable_candidate_dir_is_fatal() {
    let layout = layout();
    let shell = MockShell::new();
    // The fallback "directory" is a regular file: it exists but cannot be listed.
    std::fs::remove_dir_all(&layout.system).unwrap();
    std::fs::write(&layout.system, "not a directory").unwrap();

    let err = resolver(&shell, &layout).resolve(Platform::Ios, IOS_17).unwrap_err();
    match err {
        ResolveError::ReadDir { path, .. } => assert_eq!(path, layout.system),
        other => panic!("Expected ReadDir, got: {:?}", other),
    }
}

#[test]
fn test_xcode_select_failure_falls_back_to_system_dir() {
    let layout = layout();
    let shell = MockShell::new();
    shell.stub(
        &[XCODE_SELECT, "-p"],
        ShellOutput::failure(2, "xcode-select: error: unable to get active developer directory"),
    );
    let expected = write_runtime_bundle(&layout.system, "iOS.simruntime", IOS_17);

    let resolver = RuntimePathResolver::new(Xcode::new(&shell)).with_system_runtimes_dir(&layout.system);
    assert_eq!(resolver.candidate_dirs(Platform::Ios), vec![layout.system.clone()]);

    let root = resolver.resolve(Platform::Ios, IOS_17).unwrap();
    assert_eq!(root, expected);
    assert_eq!(shell.call_count(&[XCODE_SELECT, "-p"]), 2);
}

#[test]
fn test_xcode_select_failure_without_system_match_is_not_found() {
    let layout = layout();
    let shell = MockShell::new();
    shell.stub(&[XCODE_SELECT, "-p"], ShellOutput::failure(2, "no developer directory"));

    let resolver = RuntimePathResolver::new(Xcode::new(&shell)).with_system_runtimes_dir(&layout.system);
    let err = resolver.resolve(Platform::Ios, IOS_17).unwrap_err();
    assert!(matches!(err, ResolveError::RuntimeProfileNotFound { .. }));
}
