//! ELF image construction (spec.md §4.4): wraps a raw mutated instruction
//! stream in a minimal RV32 executable the golden model can load.
//!
//! The `object` crate writes the relocatable `.text` section; producing a
//! final, fully-linked ELF with a fixed load address is still a linker's
//! job, so we shell out to `ld` with a small embedded linker script.
//! `OBJCOPY_BIN`/`LD_BIN`/`LINKER_SCRIPT` let a caller point at a specific
//! RISC-V toolchain instead of whatever `ld`/`objcopy` resolve to on `PATH`.

use std::env;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::Command;

use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};

use crate::golden::error::GoldenError;

/// Default load address for the synthesized image's `.text` section. Chosen
/// to sit well above address 0 (so a null-pointer dereference inside the
/// mutated stream is still observable as a real fault) without colliding
/// with a typical RV32 reset vector.
pub const DEFAULT_LOAD_ADDR: u64 = 0x8000_0000;

const DEFAULT_LINKER_SCRIPT: &str = r#"
ENTRY(_start)
SECTIONS
{
  . = 0x80000000;
  .text : { *(.text) }
  .data : { *(.data) }
  .bss  : { *(.bss) }
}
"#;

fn build_object(code: &[u8]) -> Result<Vec<u8>, GoldenError> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::Riscv32, Endianness::Little);

    let text = obj.add_section(
        obj.segment_name(StandardSection::Text).to_vec(),
        b".text".to_vec(),
        SectionKind::Text,
    );
    obj.append_section_data(text, code, 4);

    obj.add_symbol(Symbol {
        name: b"_start".to_vec(),
        value: 0,
        size: code.len() as u64,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text),
        flags: SymbolFlags::None,
    });

    obj.write().map_err(|e| GoldenError::ElfWrite { detail: e.to_string() })
}

/// Writes `code` to a temporary object file, links it with `ld` against a
/// minimal script, and returns the path to the resulting ELF executable.
/// The caller owns cleanup of the returned path's parent temp directory.
pub fn write_elf_image(code: &[u8]) -> Result<PathBuf, GoldenError> {
    let object_bytes = build_object(code)?;

    let dir = tempfile::tempdir().map_err(GoldenError::from)?;
    let obj_path = dir.path().join("mutated.o");
    fs::write(&obj_path, &object_bytes).map_err(GoldenError::from)?;

    let script_path = match env::var("LINKER_SCRIPT") {
        Ok(p) => PathBuf::from(p),
        Err(_) => {
            let p = dir.path().join("link.ld");
            let mut f = fs::File::create(&p).map_err(GoldenError::from)?;
            f.write_all(DEFAULT_LINKER_SCRIPT.as_bytes()).map_err(GoldenError::from)?;
            p
        }
    };

    let ld_bin = env::var("LD_BIN").unwrap_or_else(|_| "riscv32-unknown-elf-ld".to_string());
    let elf_path = dir.path().join("mutated.elf");

    let status = Command::new(&ld_bin)
        .arg("-T")
        .arg(&script_path)
        .arg("-o")
        .arg(&elf_path)
        .arg(&obj_path)
        .status()
        .map_err(|e| GoldenError::Spawn { binary: ld_bin.clone(), detail: e.to_string() })?;

    if !status.success() {
        return Err(GoldenError::Spawn {
            binary: ld_bin,
            detail: format!("link step exited with status {status}"),
        });
    }

    // Keep the temp directory alive for the caller by leaking its handle —
    // the harness is responsible for deleting the crash/run scratch dir
    // that contains it once the golden model process has exited.
    std::mem::forget(dir);
    Ok(elf_path)
}

/// Converts an ELF at `elf_path` to a flat binary image via `objcopy`, for
/// golden models that want raw bytes rather than an ELF to load.
pub fn objcopy_to_binary(elf_path: &PathBuf) -> Result<PathBuf, GoldenError> {
    let objcopy_bin = env::var("OBJCOPY_BIN").unwrap_or_else(|_| "riscv32-unknown-elf-objcopy".to_string());
    let bin_path = elf_path.with_extension("bin");

    let status = Command::new(&objcopy_bin)
        .arg("-O")
        .arg("binary")
        .arg(elf_path)
        .arg(&bin_path)
        .status()
        .map_err(|e| GoldenError::Spawn { binary: objcopy_bin.clone(), detail: e.to_string() })?;

    if !status.success() {
        return Err(GoldenError::Spawn {
            binary: objcopy_bin,
            detail: format!("objcopy exited with status {status}"),
        });
    }

    Ok(bin_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn object_write_succeeds_for_a_small_code_blob() {
        // addi x0, x0, 0; ecall
        let code = hex!("13 00 00 00 73 00 00 00");
        let bytes = build_object(&code).unwrap();
        assert!(!bytes.is_empty());
        // ELF magic.
        assert_eq!(&bytes[0..4], b"\x7fELF");
    }
}
