//! CSV trace writer (spec.md §4.5, §6): an optional per-run line of
//! summary stats, appended so a long fuzzing session can be tailed or
//! graphed without parsing individual crash logs.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use crate::harness::error::HarnessError;

const HEADER: &str = "run_id,steps_retired,divergences,local_anomalies,exit_code\n";

pub struct TraceWriter {
    path: std::path::PathBuf,
}

impl TraceWriter {
    pub fn new(path: &Path) -> Result<TraceWriter, HarnessError> {
        let need_header = !path.exists();
        if need_header {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut f = OpenOptions::new().create(true).append(true).open(path)?;
            f.write_all(HEADER.as_bytes())?;
        }
        Ok(TraceWriter { path: path.to_path_buf() })
    }

    pub fn record(
        &self,
        run_id: &str,
        steps_retired: u64,
        divergences: usize,
        local_anomalies: usize,
        exit_code: i32,
    ) -> Result<(), HarnessError> {
        let mut f = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(f, "{run_id},{steps_retired},{divergences},{local_anomalies},{exit_code}")?;
        Ok(())
    }
}
