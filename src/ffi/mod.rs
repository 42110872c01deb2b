//! C entry points for the host application
//!
//! The API follows these principles:
//! - ABI-stable (uses only C-compatible types)
//! - hardening runs before any entry point does work
//! - no panic unwinds into the host: a panicking entry point returns `0` or
//!   `NULL`
//! - strings returned to the host are allocated with `malloc` and released
//!   by the caller with `free`
//!
//! The symbol names match `include/embedrt.h`.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, UnwindSafe};
use std::ptr;

use tracing::error;

use crate::bridge;
use crate::hardening::{self, InitState, RuntimeHardening};

/// Run `f` after hardening, turning a panic into `fallback`.
fn guarded<T, F>(
    entry: &str,
    fallback: T,
    f: F,
) -> T
where
    F: FnOnce() -> T + UnwindSafe,
{
    catch_unwind(move || {
        hardening::ensure_initialized();
        f()
    })
    .unwrap_or_else(|_| {
        error!("{} panicked", entry);
        fallback
    })
}

/// Copy `s` into a NUL-terminated `malloc` buffer (caller must `free`).
///
/// Returns NULL when allocation fails.
unsafe fn malloc_c_string(s: &str) -> *mut c_char {
    // interior NULs would truncate the string on the C side
    let bytes: Vec<u8> = s.bytes().filter(|b| *b != 0).collect();
    let buf = libc::malloc(bytes.len() + 1) as *mut u8;
    if buf.is_null() {
        return ptr::null_mut();
    }
    ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len());
    *buf.add(bytes.len()) = 0;
    buf as *mut c_char
}

// ============================================================================
// Startup
// ============================================================================

/// Native phase of startup with the loaded configuration.
///
/// Call it as early as possible, before anything in the process may install
/// signal handlers. Optional: [`embedrt_initialize`] runs it if needed.
#[no_mangle]
pub extern "C" fn embedrt_pre_initialize() {
    let _ = catch_unwind(|| hardening::pre_initialize(&RuntimeHardening::load()));
}

/// Full hardening with the loaded configuration. Later calls are no-ops.
///
/// # Returns
/// Number of steps that were skipped or failed; `-1` if hardening panicked.
#[no_mangle]
pub extern "C" fn embedrt_initialize() -> c_int {
    catch_unwind(|| hardening::ensure_initialized().not_applied() as c_int).unwrap_or(-1)
}

/// `1` once hardening completed, `0` before.
#[no_mangle]
pub extern "C" fn embedrt_is_initialized() -> c_int {
    (hardening::state() == InitState::Initialized) as c_int
}

// ============================================================================
// Operations
// ============================================================================

/// Sum of `a` and `b`.
#[export_name = "Simple"]
pub extern "C" fn simple(
    a: c_int,
    b: c_int,
) -> c_int {
    guarded("Simple", 0, || bridge::add(a, b))
}

/// Greeting for `name`.
///
/// # Returns
/// A newly allocated string the caller releases with `free`, or NULL when
/// `name` is NULL.
///
/// # Safety
/// `name` must be NULL or point to a NUL-terminated string.
///
/// # Example (C)
/// ```c
/// char *msg = Hello("World");
/// printf("%s\n", msg);   // Hello, World from Go!
/// free(msg);
/// ```
#[export_name = "Hello"]
pub unsafe extern "C" fn hello(name: *const c_char) -> *mut c_char {
    if name.is_null() {
        return ptr::null_mut();
    }
    let name = CStr::from_ptr(name).to_string_lossy().into_owned();
    // SAFETY: copies an owned Rust string into a fresh buffer.
    guarded("Hello", ptr::null_mut(), move || malloc_c_string(&bridge::greeting(&name)))
}

/// `n!`, or 1 for any `n <= 0`. Overflow wraps.
#[export_name = "CalculateFactorial"]
pub extern "C" fn calculate_factorial(n: c_int) -> c_int {
    guarded("CalculateFactorial", 0, || bridge::factorial(n as i64) as c_int)
}

/// Fan `count` tasks out over the worker pool and sum their results.
#[export_name = "TestGoroutines"]
pub extern "C" fn test_goroutines(
    count: c_int,
    workload: c_int,
) -> c_int {
    guarded("TestGoroutines", 0, || {
        match bridge::fan_out_sum(count as i64, workload as i64) {
            Ok(total) => total as c_int,
            Err(e) => {
                error!("TestGoroutines: {}", e);
                0
            }
        }
    })
}

// ============================================================================
// Legacy names
// ============================================================================

// Hosts built against the older bridge header link these names.

#[export_name = "Simple_GoIOS"]
pub extern "C" fn simple_goios(
    a: c_int,
    b: c_int,
) -> c_int {
    simple(a, b)
}

/// Same as [`hello`].
///
/// # Safety
/// `name` must be NULL or point to a NUL-terminated string.
#[export_name = "Hello_GoIOS"]
pub unsafe extern "C" fn hello_goios(name: *const c_char) -> *mut c_char {
    hello(name)
}

#[export_name = "CalculateFactorial_GoIOS"]
pub extern "C" fn calculate_factorial_goios(n: c_int) -> c_int {
    calculate_factorial(n)
}

#[export_name = "TestGoroutines_GoIOS"]
pub extern "C" fn test_goroutines_goios(
    count: c_int,
    workload: c_int,
) -> c_int {
    test_goroutines(count, workload)
}
