//! Golden-model subprocess lifecycle (spec.md §4.4): spawns the reference
//! simulator against a synthesized ELF image, reads its commit log off a
//! forwarding thread so a slow or bursty child never blocks the harness's
//! main loop on a full pipe buffer, and exposes `next_commit`/`stop`.

use std::fs::File;
use std::io::{BufRead, BufReader, Write as _};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::golden::error::GoldenError;
use crate::golden::parse;
use crate::golden::types::{CommitRecord, FatalTrap};

enum LogLine {
    Text(String),
    Eof,
}

fn write_tee(tee: &Option<Arc<Mutex<File>>>, line: &str) {
    if let Some(tee) = tee {
        if let Ok(mut f) = tee.lock() {
            let _ = writeln!(f, "{line}");
        }
    }
}

/// Drives one golden-model run to completion against a single ELF image.
/// Not reusable across images — construct a fresh `GoldenProcess` per
/// mutated test case.
///
/// `pc_write` for a commit can't be read off its own log line (spec.md §9);
/// `next_commit` buffers one record (`pending_record`) and only releases it
/// once the following commit's `pc_read` is known, backfilling `pc_write`
/// from it. The final commit of a run has no successor, so it keeps the
/// `pc_read + 4` default `parse::parse_commit_line` already set.
pub struct GoldenProcess {
    child: Child,
    lines: Receiver<LogLine>,
    reader_thread: Option<JoinHandle<()>>,
    pending: Vec<String>,
    last_pc: u64,
    pending_record: Option<CommitRecord>,
    exhausted: bool,
}

impl GoldenProcess {
    /// `log_file`, when set, tees every raw line the child prints (stdout
    /// and stderr, interleaved) into that file for post-mortem inspection
    /// (spec.md §4.4, `SPIKE_LOG_FILE`). Best-effort: a write failure is
    /// logged once and otherwise ignored, since losing the tee shouldn't
    /// fail the run.
    pub fn spawn(
        binary: &str,
        elf_path: &Path,
        extra_args: &[String],
        log_file: Option<&Path>,
    ) -> Result<GoldenProcess, GoldenError> {
        let mut child = Command::new(binary)
            .args(extra_args)
            .arg(elf_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GoldenError::Spawn { binary: binary.to_string(), detail: e.to_string() })?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let tee: Option<Arc<Mutex<File>>> = match log_file {
            Some(path) => match File::create(path) {
                Ok(f) => Some(Arc::new(Mutex::new(f))),
                Err(e) => {
                    log::warn!("failed to open SPIKE_LOG_FILE '{}': {e}", path.display());
                    None
                }
            },
            None => None,
        };

        let (tx, rx) = mpsc::channel();
        let tx_err = tx.clone();
        let tee_out = tee.clone();
        let out_handle = std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                write_tee(&tee_out, &line);
                if tx.send(LogLine::Text(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(LogLine::Eof);
        });
        std::thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(Result::ok) {
                write_tee(&tee, &line);
                let _ = tx_err.send(LogLine::Text(line));
            }
        });

        Ok(GoldenProcess {
            child,
            lines: rx,
            reader_thread: Some(out_handle),
            pending: Vec::new(),
            last_pc: 0,
            pending_record: None,
            exhausted: false,
        })
    }

    fn drain_ready(&mut self) {
        while let Ok(line) = self.lines.try_recv() {
            match line {
                LogLine::Text(s) => self.pending.push(s),
                LogLine::Eof => break,
            }
        }
    }

    /// Reads raw commit lines off the child's log until one fully parses
    /// into a [`CommitRecord`], or the stream ends for any reason (EOF,
    /// fatal trap, child exit). Per spec.md §4.4/§7, all three of those
    /// uniformly mean "no more commits" — a fatal trap just gets a warning
    /// logged on its way out, it isn't surfaced as an error.
    fn read_next_raw(&mut self) -> Option<CommitRecord> {
        loop {
            let line = if let Some(buffered) = self.take_pending_line() {
                buffered
            } else {
                match self.lines.recv() {
                    Ok(LogLine::Text(s)) => s,
                    Ok(LogLine::Eof) | Err(_) => return None,
                }
            };

            if let Some(FatalTrap { cause, .. }) = parse::detect_fatal_trap(&line, self.last_pc) {
                log::warn!("golden model reported a fatal trap ({cause}); disengaging golden checks");
                return None;
            }

            if let Some(mut record) = parse::parse_commit_line(&line) {
                self.drain_ready();
                let following: Vec<&str> = self.pending.iter().map(String::as_str).collect();
                let consumed = parse::attach_detail_lines(&mut record, &following);
                self.pending.drain(0..consumed);
                self.last_pc = record.pc_read;
                return Some(record);
            }
        }
    }

    /// Returns the next commit record with `pc_write` resolved, or `None`
    /// once the golden model has nothing left to say. Never errors —
    /// golden-side exhaustion is a normal, expected outcome the caller
    /// handles by disengaging golden checks for the rest of the run.
    pub fn next_commit(&mut self) -> Result<Option<CommitRecord>, GoldenError> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            match self.read_next_raw() {
                Some(raw) => match self.pending_record.take() {
                    Some(mut prev) => {
                        prev.pc_write = raw.pc_read;
                        self.pending_record = Some(raw);
                        return Ok(Some(prev));
                    }
                    None => {
                        self.pending_record = Some(raw);
                        continue;
                    }
                },
                None => {
                    self.exhausted = true;
                    return Ok(self.pending_record.take());
                }
            }
        }
    }

    fn take_pending_line(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }

    /// Terminates the child process and joins the reader thread. Safe to
    /// call more than once.
    pub fn stop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for GoldenProcess {
    fn drop(&mut self) {
        self.stop();
    }
}
