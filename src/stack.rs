//! Stack headroom for deep recursion in parsing and evaluation

/// If less than this remains, grow the stack
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Native stack reserved per level of bracket nesting for work that recurses
/// without checking the stack itself, such as the pest parser and dropping
/// a deeply nested value
const STACK_PER_NESTING_LEVEL: usize = 8 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Run `f` with enough stack for recursion `depth` levels deep
///
/// Grows onto a new segment only when the current one is too small.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn with_stack_for_nesting<R>(depth: usize, f: impl FnOnce() -> R) -> R {
    let needed = depth
        .saturating_mul(STACK_PER_NESTING_LEVEL)
        .saturating_add(RED_ZONE);
    stacker::maybe_grow(needed, needed.saturating_add(STACK_PER_RECURSION), f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn with_stack_for_nesting<R>(_depth: usize, f: impl FnOnce() -> R) -> R {
    f()
}
