//! Effect families: where and how a captured computation runs.
//!
//! An effect family decides what happens to a plain computation once it is
//! lifted into an execution context. This crate ships a closed set of three
//! families:
//!
//! | family | `Wrapped<A>` | evaluation | unexpected fault |
//! |---|---|---|---|
//! | [`Immediate`] | `A` | at once, on the caller's stack | panics the caller |
//! | [`Attempt`] | `Result<A, Defect>` | at once, under `catch_unwind` | `Err(Defect)` |
//! | [`Deferred`] | [`Task<A>`] | on a tokio blocking pool, when awaited | resolves to `Err(Defect)` |
//!
//! Code that composes lookups is written once against the [`Effect`] trait
//! and never names a concrete family.
//!
//! # Examples
//!
//! ```rust
//! use run_wild::effect::{Attempt, Effect, Immediate};
//!
//! fn double_captured<E: Effect>(effect: &E) -> E::Wrapped<i32> {
//!     let captured = effect.capture(|| 21);
//!     effect.map(captured, |value| value * 2)
//! }
//!
//! assert_eq!(double_captured(&Immediate), 42);
//! assert_eq!(double_captured(&Attempt), Ok(42));
//! ```
//!
//! [`Defect`]: crate::domain::Defect

mod attempt;
mod immediate;

#[cfg(feature = "async")]
pub mod deferred;

pub use attempt::Attempt;
pub use immediate::Immediate;

#[cfg(feature = "async")]
pub use deferred::{Deferred, Task};

use std::ops::ControlFlow;
use std::time::Duration;

/// The capture-and-sequence capability shared by every effect family.
///
/// `Wrapped<A>` is the family's carrier for a value of type `A`. Implementors
/// provide `pure`, `capture`, `flat_map` and the stack-safe loop `iterate`;
/// everything else is derived from them.
///
/// # Laws
///
/// 1. **Left Identity**: `flat_map(pure(a), f) == f(a)`
/// 2. **Right Identity**: `flat_map(m, pure) == m`
/// 3. **Associativity**: `flat_map(flat_map(m, f), g) == flat_map(m, |x| flat_map(f(x), g))`
/// 4. **Capture**: `capture(|| a)` is observably `pure(a)` when the thunk
///    neither panics nor performs side effects.
pub trait Effect: Clone + Send + Sync + 'static {
    /// The carrier type of this family.
    type Wrapped<A: Send + 'static>;

    /// Short name of the family, used in logs.
    const NAME: &'static str;

    /// Wraps an already computed value.
    fn pure<A>(&self, value: A) -> Self::Wrapped<A>
    where
        A: Send + 'static;

    /// Lifts a computation into this family.
    ///
    /// The computation may panic; what happens then is decided by the
    /// family (see the module table).
    fn capture<A, F>(&self, thunk: F) -> Self::Wrapped<A>
    where
        A: Send + 'static,
        F: FnOnce() -> A + Send + 'static;

    /// Sequences two computations: `function` only runs once `wrapped` has
    /// produced its value.
    fn flat_map<A, B, F>(&self, wrapped: Self::Wrapped<A>, function: F) -> Self::Wrapped<B>
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> Self::Wrapped<B> + Send + 'static;

    /// Repeats `step` from `initial` until it breaks with a value.
    ///
    /// Each iteration is sequenced after the previous one like `flat_map`,
    /// but the number of iterations never grows the call stack.
    fn iterate<S, A, F>(&self, initial: S, step: F) -> Self::Wrapped<A>
    where
        S: Send + 'static,
        A: Send + 'static,
        F: FnMut(S) -> Self::Wrapped<ControlFlow<A, S>> + Send + 'static;

    /// Transforms the produced value.
    fn map<A, B, F>(&self, wrapped: Self::Wrapped<A>, function: F) -> Self::Wrapped<B>
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        let effect = self.clone();
        self.flat_map(wrapped, move |value| effect.pure(function(value)))
    }

    /// Sequences over a `Result` payload, stopping at the first `Err`.
    ///
    /// `function` is not invoked when `wrapped` produces an error; the error
    /// is passed through untouched.
    fn flat_map_ok<A, B, E, F>(
        &self,
        wrapped: Self::Wrapped<Result<A, E>>,
        function: F,
    ) -> Self::Wrapped<Result<B, E>>
    where
        A: Send + 'static,
        B: Send + 'static,
        E: Send + 'static,
        F: FnOnce(A) -> Self::Wrapped<Result<B, E>> + Send + 'static,
    {
        let effect = self.clone();
        self.flat_map(wrapped, move |result: Result<A, E>| match result {
            Ok(value) => function(value),
            Err(error) => effect.pure(Err(error)),
        })
    }

    /// Transforms the `Ok` side of a `Result` payload.
    fn map_ok<A, B, E, F>(
        &self,
        wrapped: Self::Wrapped<Result<A, E>>,
        function: F,
    ) -> Self::Wrapped<Result<B, E>>
    where
        A: Send + 'static,
        B: Send + 'static,
        E: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.map(wrapped, move |result: Result<A, E>| result.map(function))
    }

    /// Applies this family's time bound to `wrapped`.
    ///
    /// When the bound elapses first, the computation is abandoned and
    /// `on_elapsed` produces the value instead. Families without a bound
    /// return `wrapped` unchanged.
    fn within<A, F>(&self, wrapped: Self::Wrapped<A>, on_elapsed: F) -> Self::Wrapped<A>
    where
        A: Send + 'static,
        F: FnOnce(Duration) -> A + Send + 'static,
    {
        drop(on_elapsed);
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LookupError;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn short_circuit<E: Effect>(
        effect: &E,
        first: Result<i32, LookupError>,
        calls: Arc<AtomicUsize>,
    ) -> E::Wrapped<Result<i32, LookupError>> {
        let inner = effect.clone();
        effect.flat_map_ok(effect.pure(first), move |value: i32| {
            inner.capture(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value + 1)
            })
        })
    }

    #[rstest]
    fn flat_map_ok_skips_continuation_on_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let error = LookupError::NotFound("User 2 not found".to_string());

        let result = short_circuit(&Immediate, Err(error.clone()), Arc::clone(&calls));

        assert_eq!(result, Err(error));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn flat_map_ok_runs_continuation_on_success() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result = short_circuit(&Attempt, Ok(1), Arc::clone(&calls));

        assert_eq!(result, Ok(Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn map_ok_leaves_error_untouched() {
        let error = LookupError::Timeout("Region 30 lookup timed out after 5ms".to_string());
        let mapped = Immediate.map_ok(Immediate.pure(Err::<i32, _>(error.clone())), |x| x * 2);
        assert_eq!(mapped, Err(error));
    }

    fn count_to<E: Effect>(effect: &E, limit: u64) -> E::Wrapped<u64> {
        let inner = effect.clone();
        effect.iterate(0_u64, move |count: u64| {
            inner.pure(if count == limit {
                ControlFlow::Break(count)
            } else {
                ControlFlow::Continue(count + 1)
            })
        })
    }

    #[rstest]
    #[case(0)]
    #[case(100_000)]
    fn iterate_runs_until_break(#[case] limit: u64) {
        assert_eq!(count_to(&Immediate, limit), limit);
        assert_eq!(count_to(&Attempt, limit), Ok(limit));
    }

    #[rstest]
    fn within_is_identity_without_bound() {
        let bounded = Immediate.within(Immediate.pure(7), |_| 0);
        assert_eq!(bounded, 7);
    }
}
