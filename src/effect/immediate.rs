//! The synchronous effect family.
//!
//! [`Immediate`] runs every captured computation on the caller's stack as
//! soon as it is captured. Its carrier is the value itself, so sequencing is
//! plain function application and a panic in a captured computation unwinds
//! straight through the caller.

use std::ops::ControlFlow;

use super::Effect;

/// Synchronous, blocking evaluation with no wrapper.
///
/// # Examples
///
/// ```rust
/// use run_wild::effect::{Effect, Immediate};
///
/// let value = Immediate.flat_map(Immediate.capture(|| 10), |x| x * 2);
/// assert_eq!(value, 20);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Immediate;

impl Effect for Immediate {
    type Wrapped<A: Send + 'static> = A;

    const NAME: &'static str = "immediate";

    #[inline]
    fn pure<A>(&self, value: A) -> A
    where
        A: Send + 'static,
    {
        value
    }

    #[inline]
    fn capture<A, F>(&self, thunk: F) -> A
    where
        A: Send + 'static,
        F: FnOnce() -> A + Send + 'static,
    {
        thunk()
    }

    #[inline]
    fn flat_map<A, B, F>(&self, wrapped: A, function: F) -> B
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        function(wrapped)
    }

    fn iterate<S, A, F>(&self, initial: S, mut step: F) -> A
    where
        S: Send + 'static,
        A: Send + 'static,
        F: FnMut(S) -> ControlFlow<A, S> + Send + 'static,
    {
        let mut state = initial;
        loop {
            match step(state) {
                ControlFlow::Continue(next) => state = next,
                ControlFlow::Break(value) => return value,
            }
        }
    }

    #[inline]
    fn map<A, B, F>(&self, wrapped: A, function: F) -> B
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        function(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[rstest]
    fn capture_evaluates_at_once() {
        let executed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&executed);

        let value = Immediate.capture(move || {
            flag.store(true, Ordering::SeqCst);
            42
        });

        assert!(executed.load(Ordering::SeqCst));
        assert_eq!(value, 42);
    }

    #[rstest]
    fn capture_propagates_panics() {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            Immediate.capture(|| -> i32 { panic!("backing store crashed") })
        }));
        assert!(outcome.is_err());
    }

    #[rstest]
    fn monad_left_identity() {
        let function = |x: i32| Immediate.pure(x + 1);
        assert_eq!(Immediate.flat_map(Immediate.pure(5), function), function(5));
    }
}
