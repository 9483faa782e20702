//! The result-wrapping effect family.
//!
//! [`Attempt`] evaluates at once like [`Immediate`](super::Immediate), but
//! catches a panic inside the captured computation and turns it into an
//! `Err(Defect)` value. Once a defect is produced, later steps are skipped.

use std::ops::ControlFlow;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::Effect;
use crate::domain::Defect;

/// Synchronous evaluation with faults represented as values.
///
/// # Examples
///
/// ```rust
/// use run_wild::effect::{Attempt, Effect};
///
/// let ok = Attempt.capture(|| 42);
/// assert_eq!(ok, Ok(42));
///
/// let faulted = Attempt.capture(|| -> i32 { panic!("oops") });
/// assert_eq!(faulted.unwrap_err().message(), "oops");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Attempt;

impl Effect for Attempt {
    type Wrapped<A: Send + 'static> = Result<A, Defect>;

    const NAME: &'static str = "attempt";

    #[inline]
    fn pure<A>(&self, value: A) -> Result<A, Defect>
    where
        A: Send + 'static,
    {
        Ok(value)
    }

    fn capture<A, F>(&self, thunk: F) -> Result<A, Defect>
    where
        A: Send + 'static,
        F: FnOnce() -> A + Send + 'static,
    {
        catch_unwind(AssertUnwindSafe(thunk)).map_err(|payload| {
            let defect = Defect::from_panic(payload);
            tracing::warn!(family = Self::NAME, %defect, "captured computation panicked");
            defect
        })
    }

    #[inline]
    fn flat_map<A, B, F>(&self, wrapped: Result<A, Defect>, function: F) -> Result<B, Defect>
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> Result<B, Defect> + Send + 'static,
    {
        wrapped.and_then(function)
    }

    fn iterate<S, A, F>(&self, initial: S, mut step: F) -> Result<A, Defect>
    where
        S: Send + 'static,
        A: Send + 'static,
        F: FnMut(S) -> Result<ControlFlow<A, S>, Defect> + Send + 'static,
    {
        let mut state = initial;
        loop {
            match step(state)? {
                ControlFlow::Continue(next) => state = next,
                ControlFlow::Break(value) => return Ok(value),
            }
        }
    }

    #[inline]
    fn map<A, B, F>(&self, wrapped: Result<A, Defect>, function: F) -> Result<B, Defect>
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        wrapped.map(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    fn capture_wraps_value() {
        assert_eq!(Attempt.capture(|| "hello".to_string()), Ok("hello".to_string()));
    }

    #[rstest]
    fn capture_turns_panic_into_defect() {
        let outcome = Attempt.capture(|| -> i32 { panic!("index out of range") });
        assert_eq!(outcome, Err(Defect::new("index out of range")));
    }

    #[rstest]
    fn defect_stops_later_steps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let outcome = Attempt.flat_map(Attempt.capture(|| -> i32 { panic!("boom") }), move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            Attempt.pure(x + 1)
        });

        assert_eq!(outcome, Err(Defect::new("boom")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
