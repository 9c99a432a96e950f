//! Input discovery and the acquisition file-selection policy.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bioaerosol_core::{Error, Result};

/// Name marker of baseline (Forced-Trigger) files.
pub const BASELINE_MARKER: &str = "FT_";
/// Name marker of acquisition files.
pub const ACQUISITION_MARKER: &str = "AQ_";

/// Baseline and acquisition files found in an input directory, oldest first.
#[derive(Debug, Clone, Default)]
pub struct InputFiles {
    pub baseline: Vec<PathBuf>,
    pub acquisition: Vec<PathBuf>,
}

/// List FT and AQ files in `dir`, each sorted by modification time then name.
pub fn discover(dir: &Path) -> Result<InputFiles> {
    if !dir.is_dir() {
        return Err(Error::input(format!(
            "input directory {} does not exist",
            dir.display()
        )));
    }

    let baseline = matching(dir, BASELINE_MARKER, None)?;
    let acquisition = matching(dir, ACQUISITION_MARKER, Some(BASELINE_MARKER))?;

    if baseline.is_empty() || acquisition.is_empty() {
        return Err(Error::input(format!(
            "{} needs both {BASELINE_MARKER} and {ACQUISITION_MARKER} files (found {} and {})",
            dir.display(),
            baseline.len(),
            acquisition.len()
        )));
    }

    Ok(InputFiles {
        baseline,
        acquisition,
    })
}

/// Regular files in `dir` whose name contains `marker`, oldest first.
fn matching(dir: &Path, marker: &str, exclude: Option<&str>) -> Result<Vec<PathBuf>> {
    let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy()))
        .join(format!("*{marker}*"))
        .to_string_lossy()
        .into_owned();
    let paths = glob::glob(&pattern)
        .map_err(|e| Error::input(format!("bad file pattern '{pattern}': {e}")))?;

    let mut found = Vec::new();
    for path in paths {
        let path = path.map_err(|e| Error::input(format!("cannot list {}: {e}", dir.display())))?;
        let meta = fs::metadata(&path)?;
        if !meta.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if exclude.is_some_and(|other| name.contains(other)) {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        found.push((modified, name, path));
    }

    found.sort();
    Ok(found.into_iter().map(|(_, _, p)| p).collect())
}

/// Pick the acquisition files safe to read.
///
/// The newest file may still be written by the instrument and is skipped whenever
/// at least three files exist: the seven before it from eight files on, otherwise
/// the two before it.
pub fn select_acquisition<T>(files: &[T]) -> &[T] {
    let n = files.len();
    if n >= 8 {
        &files[n - 8..n - 1]
    } else if n >= 3 {
        &files[n - 3..n - 1]
    } else {
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_policy() {
        let ten: Vec<u32> = (1..=10).collect();
        assert_eq!(select_acquisition(&ten), &[3, 4, 5, 6, 7, 8, 9]);

        let eight: Vec<u32> = (1..=8).collect();
        assert_eq!(select_acquisition(&eight), &[1, 2, 3, 4, 5, 6, 7]);

        let seven: Vec<u32> = (1..=7).collect();
        assert_eq!(select_acquisition(&seven), &[5, 6]);

        assert_eq!(select_acquisition(&[1, 2, 3]), &[1, 2]);
        assert_eq!(select_acquisition(&[1, 2]), &[1, 2]);
        assert_eq!(select_acquisition(&[1]), &[1]);
        assert!(select_acquisition::<u32>(&[]).is_empty());
    }

    #[test]
    fn test_discover_splits_by_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["AQ_002.csv", "FT_001.csv", "AQ_001.csv", "notes.txt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("AQ_dir")).unwrap();

        let files = discover(dir.path()).unwrap();
        assert_eq!(files.baseline.len(), 1);
        assert_eq!(files.acquisition.len(), 2);
        assert!(files
            .acquisition
            .iter()
            .all(|p| p.file_name().unwrap().to_string_lossy().starts_with("AQ_0")));
    }

    #[test]
    fn test_discover_orders_by_mtime_then_name() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["FT_001.csv", "AQ_b.csv", "AQ_a.csv", "AQ_FT_mixed.csv"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let epoch = SystemTime::UNIX_EPOCH;
        for (name, secs) in [("AQ_b.csv", 100), ("AQ_a.csv", 100)] {
            fs::File::options()
                .write(true)
                .open(dir.path().join(name))
                .unwrap()
                .set_modified(epoch + std::time::Duration::from_secs(secs))
                .unwrap();
        }

        let files = discover(dir.path()).unwrap();
        let names: Vec<String> = files
            .acquisition
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["AQ_a.csv", "AQ_b.csv"]);
        assert_eq!(files.baseline.len(), 2);
    }

    #[test]
    fn test_discover_requires_both_kinds() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("AQ_001.csv"), "x").unwrap();
        assert!(matches!(discover(dir.path()), Err(Error::Input(_))));
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            discover(&dir.path().join("absent")),
            Err(Error::Input(_))
        ));
    }
}
