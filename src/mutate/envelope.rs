//! Exit envelope injection (spec.md §4.3, §6): every mutated stream must end
//! in something that reliably halts both the DUT and the golden model, or a
//! run diverges on "did it ever stop" rather than on anything interesting.
//!
//! With `TOHOST_ADDR` configured, the trailer writes `1` to that address
//! using the standard `tohost` convention before trapping out: `LUI x5,
//! hi(tohost); ADDI x5, x5, lo(tohost); ADDI x6, x0, 1; SW x6, 0(x5); ECALL`
//! (spec.md §6). Without it, a bare `ECALL` is the fallback — the
//! riscv-tests convention golden models and most bring-up firmware already
//! honor via a `tohost` trap handler.

/// RV32I `ecall`: all fields zero except the fixed opcode `1110011`.
const ECALL_WORD: u32 = 0x0000_0073;

/// Canonical nop (`addi x0, x0, 0`), used to pad out a partial trailing word
/// rather than leaving the all-zero bit pattern (not a valid instruction).
const NOP_WORD: u32 = 0x0000_0013;

fn encode_lui(rd: u32, imm20: u32) -> u32 {
    (imm20 << 12) | (rd << 7) | 0x37
}

fn encode_addi(rd: u32, rs1: u32, imm12: i32) -> u32 {
    (((imm12 as u32) & 0xFFF) << 20) | (rs1 << 15) | (rd << 7) | 0x13
}

fn encode_sw(rs1: u32, rs2: u32, imm12: i32) -> u32 {
    let imm = imm12 as u32 & 0xFFF;
    ((imm >> 5) << 25) | (rs2 << 20) | (rs1 << 15) | (2 << 12) | ((imm & 0x1F) << 7) | 0x23
}

/// Splits `addr` into the `(hi20, lo12)` pair an `LUI`+`ADDI` pair needs to
/// materialize it in a register, using the standard sign-extended-`lo12`
/// convention: `hi20 = (addr + 0x800) >> 12`, `lo12 = addr - (hi20 << 12)`.
fn hi_lo_split(addr: u32) -> (u32, i32) {
    let hi20 = addr.wrapping_add(0x800) >> 12;
    let lo12 = addr.wrapping_sub(hi20 << 12) as i32;
    (hi20 & 0xF_FFFF, lo12)
}

/// Builds the tohost-addressing exit stub: writes `1` to `tohost_addr` via
/// `x5`/`x6`, then traps out with `ecall`.
fn tohost_stub(tohost_addr: u32) -> [u32; 5] {
    let (hi20, lo12) = hi_lo_split(tohost_addr);
    [
        encode_lui(5, hi20),
        encode_addi(5, 5, lo12),
        encode_addi(6, 0, 1),
        encode_sw(5, 6, 0),
        ECALL_WORD,
    ]
}

/// Appends the exit stub (little-endian) to `data` if the stream doesn't
/// already end in one, truncating first if appending would exceed
/// `max_len`. Partial trailing bytes are padded with a canonical nop word
/// (`addi x0, x0, 0`) before the stub is appended. Never drops below one
/// stub's worth of words.
pub fn ensure_exit_envelope(data: &[u8], max_len: usize, word_bytes: usize, tohost_addr: Option<u32>) -> Vec<u8> {
    let word_bytes = word_bytes.max(4);
    let stub_words: Vec<u32> = match tohost_addr {
        Some(addr) => tohost_stub(addr).to_vec(),
        None => vec![ECALL_WORD],
    };
    let stub_bytes = stub_words.len() * 4;

    let mut out = data.to_vec();

    let already_terminated = out.len() >= stub_bytes
        && out[out.len() - stub_bytes..]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().expect("chunks_exact(4)")))
            .eq(stub_words.iter().copied());
    if already_terminated {
        return out;
    }

    let partial = out.len() % word_bytes;
    if partial != 0 {
        out.truncate(out.len() - partial);
        out.extend_from_slice(&NOP_WORD.to_le_bytes());
        if word_bytes > 4 {
            out.resize(out.len() + (word_bytes - 4), 0);
        }
    }

    if out.len() + stub_bytes > max_len {
        let keep = max_len.saturating_sub(stub_bytes);
        let aligned_keep = (keep / word_bytes) * word_bytes;
        out.truncate(aligned_keep);
    }

    for word in stub_words {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_bare_ecall_when_no_tohost_addr_configured() {
        let out = ensure_exit_envelope(&[0x13, 0x00, 0x00, 0x00], 4096, 4, None);
        assert_eq!(&out[out.len() - 4..], &ECALL_WORD.to_le_bytes());
    }

    #[test]
    fn does_not_duplicate_existing_bare_ecall_trailer() {
        let mut data = vec![0x13, 0x00, 0x00, 0x00];
        data.extend_from_slice(&ECALL_WORD.to_le_bytes());
        let out = ensure_exit_envelope(&data, 4096, 4, None);
        assert_eq!(out, data);
    }

    #[test]
    fn truncates_to_stay_within_max_len() {
        let data = vec![0xAAu8; 64];
        let out = ensure_exit_envelope(&data, 40, 4, None);
        assert!(out.len() <= 40);
        assert_eq!(&out[out.len() - 4..], &ECALL_WORD.to_le_bytes());
    }

    #[test]
    fn tohost_stub_ends_in_ecall_and_writes_through_x5_x6() {
        let out = ensure_exit_envelope(&[0x13, 0x00, 0x00, 0x00], 4096, 4, Some(0x8000_1000));
        assert_eq!(&out[out.len() - 4..], &ECALL_WORD.to_le_bytes());
        assert_eq!(out.len(), 4 + 5 * 4);

        let words: Vec<u32> = out[4..].chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect();
        assert_eq!(words[0] & 0x7F, 0x37); // lui
        assert_eq!((words[0] >> 7) & 0x1F, 5); // rd = x5
        assert_eq!(words[1] & 0x7F, 0x13); // addi
        assert_eq!((words[2] >> 20) & 0xFFF, 1); // addi x6, x0, 1
        assert_eq!(words[3] & 0x7F, 0x23); // sw
        assert_eq!(words[4], ECALL_WORD);
    }

    #[test]
    fn tohost_stub_round_trips_the_address_through_hi_lo_split() {
        let (hi20, lo12) = hi_lo_split(0x8000_1000);
        let reconstructed = (hi20 << 12).wrapping_add(lo12 as u32);
        assert_eq!(reconstructed, 0x8000_1000);
    }

    #[test]
    fn partial_trailing_bytes_are_nop_padded_before_the_stub() {
        let out = ensure_exit_envelope(&[0x13, 0x00], 4096, 4, None);
        // the 2-byte partial word is discarded and replaced by one nop word
        assert_eq!(out.len(), 8);
        assert_eq!(&out[0..4], &NOP_WORD.to_le_bytes());
        assert_eq!(&out[4..8], &ECALL_WORD.to_le_bytes());
    }
}
