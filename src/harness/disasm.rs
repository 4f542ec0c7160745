//! External disassembler invocation (spec.md §6: crash artifacts include "a
//! disassembly (produced by invoking an external disassembler)"). `OBJDUMP`
//! selects the binary; failure to run it is not fatal to crash reporting —
//! the `.log` just omits the `Disassembly:` section, per spec.md §6's "if
//! the disassembler succeeded".

use std::io::Write as _;
use std::process::Command;

/// Disassembles `code` as raw RV32 machine words, returning `objdump`'s
/// textual output. Returns `None` (logging a warning) if the binary can't
/// be spawned or exits nonzero — callers treat that the same as "no
/// disassembly available" rather than failing the run.
pub fn disassemble(code: &[u8]) -> Option<String> {
    let objdump_bin = std::env::var("OBJDUMP").unwrap_or_else(|_| "objdump".to_string());

    let mut tmp = match tempfile::NamedTempFile::new() {
        Ok(f) => f,
        Err(e) => {
            log::warn!("failed to create temp file for disassembly: {e}");
            return None;
        }
    };
    if let Err(e) = tmp.write_all(code) {
        log::warn!("failed to write code to temp file for disassembly: {e}");
        return None;
    }

    let output = Command::new(&objdump_bin)
        .arg("-D")
        .arg("-b")
        .arg("binary")
        .arg("-m")
        .arg("riscv:rv32")
        .arg("--endian=little")
        .arg(tmp.path())
        .output();

    match output {
        Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
        Ok(out) => {
            log::warn!("{objdump_bin} exited with status {}", out.status);
            None
        }
        Err(e) => {
            log::warn!("failed to spawn {objdump_bin}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_missing_disassembler_binary_returns_none_instead_of_panicking() {
        std::env::set_var("OBJDUMP", "/nonexistent/objdump-binary");
        assert!(disassemble(&[0x13, 0x00, 0x00, 0x00]).is_none());
        std::env::remove_var("OBJDUMP");
    }
}
