//! Install receipts: a small JSON record written next to each installed
//! version, recording what was installed and from where.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::formula::Formula;
use crate::runtime::Runtime;

pub const RECEIPT_FILE: &str = "receipt.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Receipt {
    pub name: String,
    pub version: String,
    pub source_url: String,
    pub sha256: String,
    pub prefix: PathBuf,
    /// Unix timestamp (seconds) of installation
    pub installed_at: u64,
}

impl Receipt {
    pub fn from_formula(formula: &Formula, prefix: &Path) -> Result<Self> {
        Ok(Self {
            name: formula.name.clone(),
            version: formula.version()?,
            source_url: formula.source.url.clone(),
            sha256: formula.source.sha256.clone(),
            prefix: prefix.to_path_buf(),
            installed_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        })
    }

    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read receipt at {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid receipt file {:?}", path))
    }

    /// Save atomically: write to a temp file then rename into place.
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");

        runtime.write(&tmp_path, json.as_bytes())?;
        runtime.rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Find all receipt files under the install root (one level deep:
/// `{root}/{name}/{version}/receipt.json`).
pub fn find_all_receipts<R: Runtime>(runtime: &R, root: &Path) -> Result<Vec<PathBuf>> {
    let mut receipts = Vec::new();

    if !runtime.exists(root) {
        return Ok(receipts);
    }

    for package_dir in runtime.read_dir(root)? {
        if !runtime.is_dir(&package_dir) {
            continue;
        }
        for version_dir in runtime.read_dir(&package_dir)? {
            if !runtime.is_dir(&version_dir) || runtime.is_symlink(&version_dir) {
                continue;
            }
            let receipt_path = version_dir.join(RECEIPT_FILE);
            if runtime.exists(&receipt_path) {
                receipts.push(receipt_path);
            }
        }
    }

    receipts.sort();
    Ok(receipts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    fn receipt() -> Receipt {
        let formula = Formula::parse(crate::formula::tests::QVM_FFMPEG).unwrap();
        Receipt::from_formula(&formula, Path::new("/opt/sfi/qvm-ffmpeg/v0.0.0-test3-g")).unwrap()
    }

    #[test]
    fn test_receipt_from_formula() {
        let r = receipt();
        assert_eq!(r.name, "qvm-ffmpeg");
        assert_eq!(r.version, "v0.0.0-test3-g");
        assert_eq!(
            r.sha256,
            "fd120000aa167dba7e996a36e0bd3e2c5589805c65fb028ce72f8f441e4e9c69"
        );
        assert!(r.installed_at > 0);
    }

    #[test]
    fn test_receipt_save_is_atomic() {
        let r = receipt();
        let path = PathBuf::from("/opt/sfi/qvm-ffmpeg/v0.0.0-test3-g/receipt.json");
        let tmp = path.with_extension("json.tmp");

        let mut runtime = MockRuntime::new();
        runtime
            .expect_write()
            .withf(move |p, contents| {
                p == tmp && serde_json::from_slice::<Receipt>(contents).is_ok()
            })
            .times(1)
            .returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .with(eq(path.with_extension("json.tmp")), eq(path.clone()))
            .times(1)
            .returning(|_, _| Ok(()));

        r.save(&runtime, &path).unwrap();
    }

    #[test]
    fn test_receipt_load_round_trip() {
        let r = receipt();
        let json = serde_json::to_string_pretty(&r).unwrap();

        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(move |_| Ok(json.clone()));

        let loaded = Receipt::load(&runtime, Path::new("receipt.json")).unwrap();
        assert_eq!(loaded, r);
    }

    #[test]
    fn test_receipt_load_invalid_json() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("{not json".to_string()));

        let result = Receipt::load(&runtime, Path::new("receipt.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_find_all_receipts_empty_root() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let receipts = find_all_receipts(&runtime, Path::new("/opt/sfi")).unwrap();
        assert!(receipts.is_empty());
    }

    #[test]
    fn test_find_all_receipts() {
        let mut runtime = MockRuntime::new();
        let root = PathBuf::from("/opt/sfi");

        runtime.expect_exists().returning(|p| {
            p == Path::new("/opt/sfi")
                || p.to_string_lossy().ends_with("receipt.json")
        });
        runtime.expect_is_symlink().returning(|p| {
            p.file_name().is_some_and(|n| n == "current")
        });
        runtime.expect_is_dir().returning(|_| true);
        runtime.expect_read_dir().returning(|p| {
            if p == Path::new("/opt/sfi") {
                Ok(vec![PathBuf::from("/opt/sfi/qvm-ffmpeg")])
            } else if p == Path::new("/opt/sfi/qvm-ffmpeg") {
                Ok(vec![
                    PathBuf::from("/opt/sfi/qvm-ffmpeg/current"),
                    PathBuf::from("/opt/sfi/qvm-ffmpeg/v0.0.0-test3-g"),
                ])
            } else {
                Ok(vec![])
            }
        });

        let receipts = find_all_receipts(&runtime, &root).unwrap();
        assert_eq!(
            receipts,
            vec![PathBuf::from(
                "/opt/sfi/qvm-ffmpeg/v0.0.0-test3-g/receipt.json"
            )]
        );
    }
}
