//! Stack growth for the recursive parts of the engine.
//!
//! The parser and the evaluator recurse on the shape of user input, and so
//! does value formatting. Wrapping those recursion points in [`ensure_sufficient_stack`]
//! moves onto a freshly allocated segment whenever the remaining stack runs
//! low, so a deep script hits the interpreter's own limits (and gets an
//! `EzError`) instead of aborting the process.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_recursion_does_not_overflow() {
        fn depth(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
        }
        assert_eq!(depth(100_000), 100_000);
    }
}
