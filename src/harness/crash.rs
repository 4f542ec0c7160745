//! Crash artifact writer (spec.md §4.5, §6): every divergence or local
//! anomaly is saved as a `<id>.bin` (the mutated input that triggered it)
//! plus a `<id>.log` (human-readable detail) pair, written atomically via a
//! temp file + rename so a reader never observes a half-written artifact.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::harness::error::HarnessError;

fn write_atomic(dir: &Path, final_name: &str, content: &[u8]) -> Result<PathBuf, HarnessError> {
    fs::create_dir_all(dir)?;
    let final_path = dir.join(final_name);
    let tmp_path = dir.join(format!(".{final_name}.tmp"));

    {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(content)?;
        f.sync_all()?;
    }
    fs::rename(&tmp_path, &final_path)?;
    Ok(final_path)
}

/// Writes `<dir>/<id>.bin` and `<dir>/<id>.log`, returning both paths.
pub fn write_crash_artifact(
    dir: &Path,
    id: &str,
    input: &[u8],
    detail: &str,
) -> Result<(PathBuf, PathBuf), HarnessError> {
    let bin_path = write_atomic(dir, &format!("{id}.bin"), input)?;
    let log_path = write_atomic(dir, &format!("{id}.log"), detail.as_bytes())?;
    Ok((bin_path, log_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_both_files_and_they_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (bin_path, log_path) =
            write_crash_artifact(dir.path(), "case-0001", &[1, 2, 3, 4], "PC mismatch").unwrap();
        assert_eq!(fs::read(&bin_path).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "PC mismatch");
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        write_crash_artifact(dir.path(), "case-0002", &[0], "anomaly").unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }
}
