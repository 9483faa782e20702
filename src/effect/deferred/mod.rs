//! The deferred (asynchronous) effect family.
//!
//! [`Deferred`] schedules every captured computation on the blocking pool of
//! an explicitly supplied tokio runtime. Nothing runs until the resulting
//! [`Task`] is awaited, and every step of a chain is scheduled only after the
//! previous one has resolved.
//!
//! The runtime is never picked up implicitly: whoever builds a `Deferred`
//! passes a [`Handle`] in.
//!
//! # Examples
//!
//! ```rust,ignore
//! use run_wild::effect::{Deferred, Effect};
//!
//! #[tokio::main]
//! async fn main() {
//!     let deferred = Deferred::new(tokio::runtime::Handle::current());
//!     let task = deferred.map(deferred.capture(|| 21), |x| x * 2);
//!     assert_eq!(task.await, Ok(42));
//! }
//! ```

pub mod runtime;

use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use pin_project_lite::pin_project;
use tokio::runtime::Handle;

use super::Effect;
use crate::config::ChainConfig;
use crate::domain::Defect;

type PendingOutcome<A> = BoxFuture<'static, Result<A, Defect>>;

// =============================================================================
// Task
// =============================================================================

pin_project! {
    /// A lazy asynchronous computation resolving to `Result<A, Defect>`.
    ///
    /// A `Task` describes work; it does nothing until awaited. `Err(Defect)`
    /// means the computation panicked or its worker was cancelled.
    ///
    /// Dropping a `Task` before it resolves abandons it.
    pub struct Task<A> {
        #[pin]
        state: TaskState<A>,
    }
}

pin_project! {
    /// Internal state machine for `Task`.
    ///
    /// - `Ready` -> `Completed` (first poll returns the stored outcome)
    /// - `Defer` -> `Running` (first poll builds the future)
    /// - `Running` -> `Completed` (inner future resolves)
    #[project = TaskStateProj]
    enum TaskState<A> {
        Ready {
            outcome: Option<Result<A, Defect>>,
        },
        Defer {
            thunk: Option<Box<dyn FnOnce() -> PendingOutcome<A> + Send>>,
        },
        Running {
            #[pin]
            future: PendingOutcome<A>,
        },
        Completed,
    }
}

impl<A> Future for Task<A> {
    type Output = Result<A, Defect>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        loop {
            match this.state.as_mut().project() {
                TaskStateProj::Ready { outcome } => {
                    // INVARIANT: Ready is polled once before moving to Completed
                    let outcome = outcome
                        .take()
                        .expect("Task internal error: Ready outcome was already consumed");
                    this.state.set(TaskState::Completed);
                    return Poll::Ready(outcome);
                }
                TaskStateProj::Defer { thunk } => {
                    // INVARIANT: Defer is polled once before moving to Running
                    let thunk = thunk
                        .take()
                        .expect("Task internal error: Defer thunk was already consumed");
                    let future = thunk();
                    this.state.set(TaskState::Running { future });
                }
                TaskStateProj::Running { future } => match future.poll(context) {
                    Poll::Ready(outcome) => {
                        this.state.set(TaskState::Completed);
                        return Poll::Ready(outcome);
                    }
                    Poll::Pending => return Poll::Pending,
                },
                TaskStateProj::Completed => {
                    panic!("Task internal error: Task was polled after completion");
                }
            }
        }
    }
}

impl<A: Send + 'static> Task<A> {
    /// Creates a task from an async closure. The closure runs on first poll.
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<A, Defect>> + Send + 'static,
    {
        Self {
            state: TaskState::Defer {
                thunk: Some(Box::new(move || action().boxed())),
            },
        }
    }

    /// A task that resolves to `value` without scheduling anything.
    pub const fn pure(value: A) -> Self {
        Self {
            state: TaskState::Ready {
                outcome: Some(Ok(value)),
            },
        }
    }

    /// A task that resolves to `defect` without scheduling anything.
    pub const fn failed(defect: Defect) -> Self {
        Self {
            state: TaskState::Ready {
                outcome: Some(Err(defect)),
            },
        }
    }

    /// Runs `thunk` on the blocking pool of `handle` once awaited.
    ///
    /// A panic inside `thunk` resolves the task to `Err(Defect)`.
    pub fn spawn_blocking<F>(handle: Handle, thunk: F) -> Self
    where
        F: FnOnce() -> A + Send + 'static,
    {
        Self::new(move || async move {
            handle.spawn_blocking(thunk).await.map_err(|error| {
                let defect = Defect::from(error);
                tracing::warn!(family = Deferred::NAME, %defect, "blocking task failed");
                defect
            })
        })
    }

    /// Transforms the resolved value.
    ///
    /// A ready task is mapped at once without allocating a new future.
    pub fn map<B, F>(self, function: F) -> Task<B>
    where
        F: FnOnce(A) -> B + Send + 'static,
        B: Send + 'static,
    {
        match self {
            Self {
                state: TaskState::Ready {
                    outcome: Some(outcome),
                },
            } => Task {
                state: TaskState::Ready {
                    outcome: Some(outcome.map(function)),
                },
            },
            other => Task::new(move || async move { other.await.map(function) }),
        }
    }

    /// Chains a second task after this one.
    ///
    /// `function` is invoked only after this task resolves successfully; a
    /// defect short-circuits the rest of the chain.
    pub fn flat_map<B, F>(self, function: F) -> Task<B>
    where
        F: FnOnce(A) -> Task<B> + Send + 'static,
        B: Send + 'static,
    {
        match self {
            Self {
                state:
                    TaskState::Ready {
                        outcome: Some(Ok(value)),
                    },
            } => function(value),
            Self {
                state:
                    TaskState::Ready {
                        outcome: Some(Err(defect)),
                    },
            } => Task::failed(defect),
            other => Task::new(move || async move {
                match other.await {
                    Ok(value) => function(value).await,
                    Err(defect) => Err(defect),
                }
            }),
        }
    }

    /// Bounds this task by `limit`.
    ///
    /// If `limit` elapses first the task is abandoned and `on_elapsed`
    /// produces the value instead.
    pub fn timeout<F>(self, limit: Duration, on_elapsed: F) -> Self
    where
        F: FnOnce(Duration) -> A + Send + 'static,
    {
        Self::new(move || async move {
            match tokio::time::timeout(limit, self).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::debug!(?limit, "task abandoned after time bound elapsed");
                    Ok(on_elapsed(limit))
                }
            }
        })
    }
}

impl<A> fmt::Display for Task<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "<Task>")
    }
}

impl<A> fmt::Debug for Task<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Task").finish_non_exhaustive()
    }
}

// =============================================================================
// Deferred family
// =============================================================================

/// Asynchronous evaluation on an explicitly supplied runtime.
///
/// Carries an optional per-lookup time bound applied through
/// [`Effect::within`].
#[derive(Debug, Clone)]
pub struct Deferred {
    handle: Handle,
    lookup_timeout: Option<Duration>,
}

impl Deferred {
    /// Schedules captured computations on `handle` with no time bound.
    pub const fn new(handle: Handle) -> Self {
        Self {
            handle,
            lookup_timeout: None,
        }
    }

    /// Builds the family from a runtime handle and a configuration.
    pub fn from_config(handle: Handle, config: &ChainConfig) -> Self {
        Self {
            handle,
            lookup_timeout: config.lookup_timeout,
        }
    }

    /// Returns a copy bounded by `limit` per lookup.
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.lookup_timeout = Some(limit);
        self
    }

    /// The runtime handle captured computations are scheduled on.
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// The per-lookup time bound, if any.
    pub const fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout
    }
}

impl Effect for Deferred {
    type Wrapped<A: Send + 'static> = Task<A>;

    const NAME: &'static str = "deferred";

    fn pure<A>(&self, value: A) -> Task<A>
    where
        A: Send + 'static,
    {
        Task::pure(value)
    }

    fn capture<A, F>(&self, thunk: F) -> Task<A>
    where
        A: Send + 'static,
        F: FnOnce() -> A + Send + 'static,
    {
        Task::spawn_blocking(self.handle.clone(), thunk)
    }

    fn flat_map<A, B, F>(&self, wrapped: Task<A>, function: F) -> Task<B>
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> Task<B> + Send + 'static,
    {
        wrapped.flat_map(function)
    }

    fn iterate<S, A, F>(&self, initial: S, mut step: F) -> Task<A>
    where
        S: Send + 'static,
        A: Send + 'static,
        F: FnMut(S) -> Task<ControlFlow<A, S>> + Send + 'static,
    {
        Task::new(move || async move {
            let mut state = initial;
            loop {
                match step(state).await? {
                    ControlFlow::Continue(next) => state = next,
                    ControlFlow::Break(value) => return Ok(value),
                }
            }
        })
    }

    fn map<A, B, F>(&self, wrapped: Task<A>, function: F) -> Task<B>
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        wrapped.map(function)
    }

    fn within<A, F>(&self, wrapped: Task<A>, on_elapsed: F) -> Task<A>
    where
        A: Send + 'static,
        F: FnOnce(Duration) -> A + Send + 'static,
    {
        match self.lookup_timeout {
            Some(limit) => wrapped.timeout(limit, on_elapsed),
            None => wrapped,
        }
    }
}
