//! Runtime construction and blocking execution for the deferred family.
//!
//! The deferred family never reaches for an ambient runtime. This module
//! builds one from a [`ChainConfig`] and drives a future to completion from
//! synchronous code, whether or not the caller is itself inside a runtime.
//!
//! # Runtime Flavor Considerations
//!
//! - **Outside a runtime**: the supplied runtime's `block_on` is used.
//! - **Inside a multi-thread runtime**: `block_in_place` hands the worker
//!   back to the scheduler while the future is driven.
//! - **Inside a current-thread runtime**: blocking would deadlock, so
//!   [`BlockingError::CurrentThreadRuntime`] is returned instead.
//!
//! # Examples
//!
//! ```rust,ignore
//! use run_wild::config::ChainConfig;
//! use run_wild::effect::deferred::runtime::{build, try_block_on};
//!
//! let runtime = build(&ChainConfig::default())?;
//! let value = try_block_on(&runtime, async { 42 })?;
//! assert_eq!(value, 42);
//! ```

use std::future::Future;
use std::io;

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::config::ChainConfig;

/// Builds a multi-thread runtime for the deferred family.
///
/// Worker count comes from `config.worker_threads`, falling back to the
/// number of CPU cores. Time and IO drivers are enabled so lookup time
/// bounds work.
///
/// # Errors
///
/// Returns the underlying IO error if the runtime cannot be created.
pub fn build(config: &ChainConfig) -> io::Result<Runtime> {
    let worker_threads = config.worker_threads.unwrap_or_else(num_cpus::get).max(1);
    tracing::debug!(worker_threads, "building deferred runtime");
    Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("run-wild-worker")
        .enable_all()
        .build()
}

/// Error returned when a future cannot be driven synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlockingError {
    /// `block_in_place` is not supported in a current-thread runtime.
    #[error(
        "cannot execute blocking operation in current-thread runtime: \
         block_in_place is only supported in multi-thread runtimes"
    )]
    CurrentThreadRuntime,

    /// The caller's runtime flavor is unknown to this crate.
    #[error(
        "cannot execute blocking operation: \
         the runtime flavor is not supported for blocking execution"
    )]
    UnsupportedRuntimeFlavor,
}

/// Drives `future` to completion on `runtime`, blocking the current thread.
///
/// # Errors
///
/// Returns [`BlockingError::CurrentThreadRuntime`] when called from inside a
/// current-thread runtime.
pub fn try_block_on<F, T>(runtime: &Runtime, future: F) -> Result<T, BlockingError>
where
    F: Future<Output = T>,
{
    match Handle::try_current() {
        Err(_) => Ok(runtime.block_on(future)),
        Ok(current_handle) => match current_handle.runtime_flavor() {
            RuntimeFlavor::MultiThread => Ok(tokio::task::block_in_place(|| {
                current_handle.block_on(future)
            })),
            RuntimeFlavor::CurrentThread => Err(BlockingError::CurrentThreadRuntime),
            // RuntimeFlavor is non-exhaustive
            _ => Err(BlockingError::UnsupportedRuntimeFlavor),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn build_honours_worker_count() {
        let config = ChainConfig {
            worker_threads: Some(2),
            ..ChainConfig::default()
        };
        let runtime = build(&config).expect("runtime should build");
        assert_eq!(runtime.handle().runtime_flavor(), RuntimeFlavor::MultiThread);
        assert_eq!(runtime.metrics().num_workers(), 2);
    }

    #[rstest]
    fn try_block_on_outside_runtime() {
        let runtime = build(&ChainConfig::default()).expect("runtime should build");
        assert_eq!(try_block_on(&runtime, async { 42 }), Ok(42));
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn try_block_on_inside_current_thread_runtime_fails() {
        let runtime = build(&ChainConfig::default()).expect("runtime should build");
        assert_eq!(
            try_block_on(&runtime, async { 1 }),
            Err(BlockingError::CurrentThreadRuntime)
        );
        // a runtime must not be dropped from within an async context
        std::thread::spawn(move || drop(runtime))
            .join()
            .expect("drop thread should finish");
    }

    #[rstest]
    fn blocking_error_display() {
        assert!(
            BlockingError::CurrentThreadRuntime
                .to_string()
                .contains("current-thread runtime")
        );
    }
}
