//! Host stack headroom for the recursive parts of the evaluator.
//!
//! Expression evaluation, statement execution, calls, JSON writing and array
//! joins all recurse on the Rust stack. Each of them enters through
//! [`guarded`], which switches to a fresh heap-allocated segment when the
//! remaining stack runs low. Depth caps such as [`MAX_NESTING_DEPTH`] and
//! the call-depth limit keep the total bounded.

/// Remaining stack below which the next guarded call moves to a new segment.
#[cfg(not(target_family = "wasm"))]
const RED_ZONE: usize = 256 * 1024;

/// Size of each additional stack segment.
#[cfg(not(target_family = "wasm"))]
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Deepest value nesting `JSON.stringify`, `join` and `flat` will walk.
pub const MAX_NESTING_DEPTH: usize = 10_000;

/// Message of the `RangeError` raised when a depth cap is hit.
pub const STACK_OVERFLOW_MESSAGE: &str = "Maximum call stack size exceeded";

/// Run `f`, growing the stack first if it is nearly exhausted.
#[cfg(not(target_family = "wasm"))]
#[inline]
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// Run `f`. wasm has no stack switching; the depth caps alone apply.
#[cfg(target_family = "wasm")]
#[inline]
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(all(test, not(target_family = "wasm")))]
mod tests {
    use super::*;

    fn depth(n: usize) -> usize {
        if n == 0 {
            0
        } else {
            guarded(|| 1 + depth(n - 1))
        }
    }

    #[test]
    fn test_guarded_recursion_outgrows_thread_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| depth(100_000))
            .unwrap();
        assert_eq!(handle.join().unwrap(), 100_000);
    }
}
