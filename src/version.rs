//! Plain-version resolution from companion `package.json` files.
//!
//! Each license directory may carry a `package.json` whose `version` field
//! is the plain version shown on the page. Resolution is strictly
//! read-only and lenient: a missing file, unreadable JSON, or an invalid
//! version all fall back to `0.0.0` without recording an error. The one
//! mutating operation — promoting a `-development` prerelease for a
//! production release — is a separate call wired to its own subcommand.

use anyhow::{Context, Result};
use semver::Version;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const FALLBACK_VERSION: &str = "0.0.0";

/// Version a development prerelease is promoted to on first release.
const FIRST_RELEASE: &str = "0.1.0";

#[derive(Debug, Deserialize)]
struct PackageFile {
    version: Option<String>,
}

/// Resolve the plain version for the license rooted at `dir`.
///
/// Returns `0.0.0` when the companion file is absent, malformed, or holds
/// anything but a valid semantic version. Development prereleases also
/// resolve to `0.0.0`: they have not been released yet.
pub fn plain_version(dir: &Path) -> String {
    let path = dir.join("package.json");
    let Ok(raw) = fs::read_to_string(&path) else {
        return FALLBACK_VERSION.to_string();
    };
    let Ok(package) = serde_json::from_str::<PackageFile>(&raw) else {
        tracing::debug!(path = %path.display(), "unparsable package file, using fallback version");
        return FALLBACK_VERSION.to_string();
    };
    let Some(version) = package.version else {
        return FALLBACK_VERSION.to_string();
    };
    match Version::parse(version.trim()) {
        Ok(parsed) if parsed.pre.as_str().contains("development") => FALLBACK_VERSION.to_string(),
        Ok(parsed) => parsed.to_string(),
        Err(_) => {
            tracing::debug!(
                path = %path.display(),
                version = %version,
                "invalid semantic version, using fallback"
            );
            FALLBACK_VERSION.to_string()
        }
    }
}

/// Promote a `-development` prerelease in `dir`'s `package.json` to the
/// first release version, rewriting the file. Errors if the file is
/// missing or malformed, and leaves it untouched if the version is not a
/// development prerelease.
pub fn bump_development(dir: &Path) -> Result<String> {
    let path = dir.join("package.json");
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read version file {}", path.display()))?;
    let mut package: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse version file {}", path.display()))?;
    let current = package
        .get("version")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if !current.contains("development") {
        return Ok(current);
    }
    package["version"] = serde_json::Value::String(FIRST_RELEASE.to_string());
    let serialized = serde_json::to_string_pretty(&package)?;
    fs::write(&path, serialized)
        .with_context(|| format!("write version file {}", path.display()))?;
    tracing::info!(dir = %dir.display(), from = %current, to = FIRST_RELEASE, "bumped development version");
    Ok(FIRST_RELEASE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_package(dir: &Path, body: &str) {
        fs::write(dir.join("package.json"), body).expect("write package.json");
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = TempDir::new().expect("tempdir");
        assert_eq!(plain_version(dir.path()), "0.0.0");
    }

    #[test]
    fn unreadable_json_falls_back() {
        let dir = TempDir::new().expect("tempdir");
        write_package(dir.path(), "{not json");
        assert_eq!(plain_version(dir.path()), "0.0.0");
    }

    #[test]
    fn missing_version_field_falls_back() {
        let dir = TempDir::new().expect("tempdir");
        write_package(dir.path(), r#"{"name": "mit"}"#);
        assert_eq!(plain_version(dir.path()), "0.0.0");
    }

    #[test]
    fn invalid_semver_falls_back() {
        let dir = TempDir::new().expect("tempdir");
        write_package(dir.path(), r#"{"version": "one point two"}"#);
        assert_eq!(plain_version(dir.path()), "0.0.0");
    }

    #[test]
    fn valid_version_is_returned() {
        let dir = TempDir::new().expect("tempdir");
        write_package(dir.path(), r#"{"version": "1.2.3"}"#);
        assert_eq!(plain_version(dir.path()), "1.2.3");
    }

    #[test]
    fn development_prerelease_is_unreleased() {
        let dir = TempDir::new().expect("tempdir");
        write_package(dir.path(), r#"{"version": "0.1.0-development"}"#);
        assert_eq!(plain_version(dir.path()), "0.0.0");
    }

    #[test]
    fn bump_promotes_development_version() {
        let dir = TempDir::new().expect("tempdir");
        write_package(
            dir.path(),
            r#"{"name": "mit", "version": "0.1.0-development"}"#,
        );
        let bumped = bump_development(dir.path()).expect("bump");
        assert_eq!(bumped, "0.1.0");
        assert_eq!(plain_version(dir.path()), "0.1.0");
    }

    #[test]
    fn bump_leaves_released_versions_alone() {
        let dir = TempDir::new().expect("tempdir");
        write_package(dir.path(), r#"{"version": "2.0.0"}"#);
        let result = bump_development(dir.path()).expect("bump");
        assert_eq!(result, "2.0.0");
        assert_eq!(plain_version(dir.path()), "2.0.0");
    }
}
