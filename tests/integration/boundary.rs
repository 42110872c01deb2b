//! C boundary tests
//!
//! Calls the exported symbols the way the host application does.

use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::sync::{Arc, Barrier};
use std::thread;

use embedrt::{ensure_initialized_with, RuntimeHardening, Signal};

extern "C" {
    fn Simple(a: c_int, b: c_int) -> c_int;
    fn Hello(name: *const c_char) -> *mut c_char;
    fn CalculateFactorial(n: c_int) -> c_int;
    fn TestGoroutines(count: c_int, workload: c_int) -> c_int;
    fn embedrt_is_initialized() -> c_int;
    fn Simple_GoIOS(a: c_int, b: c_int) -> c_int;
    fn Hello_GoIOS(name: *const c_char) -> *mut c_char;
    fn CalculateFactorial_GoIOS(n: c_int) -> c_int;
    fn TestGoroutines_GoIOS(count: c_int, workload: c_int) -> c_int;
}

fn quiet_init() {
    ensure_initialized_with(&RuntimeHardening {
        signals: vec![Signal::Pipe],
        redirect_streams: false,
        ..RuntimeHardening::default()
    });
}

fn hello(name: &str) -> String {
    let name = CString::new(name).unwrap();
    unsafe {
        let raw = Hello(name.as_ptr());
        assert!(!raw.is_null());
        let text = CStr::from_ptr(raw).to_string_lossy().into_owned();
        libc::free(raw as *mut libc::c_void);
        text
    }
}

/// Documented examples of the host contract.
#[test]
fn test_examples() {
    quiet_init();
    unsafe {
        assert_eq!(Simple(2, 3), 5);
        assert_eq!(CalculateFactorial(0), 1);
        assert_eq!(CalculateFactorial(5), 120);
        assert_eq!(TestGoroutines(3, 10), 270);
        assert_eq!(embedrt_is_initialized(), 1);
    }
    assert_eq!(hello("World"), "Hello, World from Go!");
}

/// Fan-out results do not depend on scheduling order.
#[test]
fn test_fan_out_is_deterministic() {
    quiet_init();
    let results: HashSet<c_int> = (0..20).map(|_| unsafe { TestGoroutines(16, 1000) }).collect();
    // 136 * 499500
    assert_eq!(results.into_iter().collect::<Vec<_>>(), vec![67_932_000]);
}

/// The host may call in from several threads at once.
#[test]
fn test_concurrent_host_threads() {
    quiet_init();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (1..=4)
        .map(|n| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let sum = unsafe { TestGoroutines(n, 10) };
                let greeting = hello(&format!("thread {}", n));
                (n, sum, greeting)
            })
        })
        .collect();

    for handle in handles {
        let (n, sum, greeting) = handle.join().unwrap();
        assert_eq!(sum, 45 * n * (n + 1) / 2);
        assert_eq!(greeting, format!("Hello, thread {} from Go!", n));
    }
}

/// The older symbol names behave like the current ones.
#[test]
fn test_legacy_names() {
    quiet_init();
    let name = CString::new("World").unwrap();
    unsafe {
        assert_eq!(Simple_GoIOS(2, 3), Simple(2, 3));
        assert_eq!(CalculateFactorial_GoIOS(5), 120);
        assert_eq!(TestGoroutines_GoIOS(3, 10), 270);

        let raw = Hello_GoIOS(name.as_ptr());
        assert!(!raw.is_null());
        assert_eq!(CStr::from_ptr(raw).to_str().unwrap(), "Hello, World from Go!");
        libc::free(raw as *mut libc::c_void);

        assert!(Hello_GoIOS(std::ptr::null()).is_null());
    }
}
