/// Grows the native stack before running `f` when less than the red zone is
/// left, so deeply recursive scripts are bounded by the call limit rather than
/// by the size of the thread's stack.
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
