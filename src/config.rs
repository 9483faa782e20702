//! Chain configuration.
//!
//! Configuration is loaded from environment variables with explicit,
//! typed errors. Every value is optional; anything unset falls back to
//! [`ChainConfig::default`].
//!
//! # Environment Variables
//!
//! - `RUN_WILD_LOOKUP_TIMEOUT_MS`: per-lookup time bound for the deferred
//!   family, in milliseconds (unset means unbounded)
//! - `RUN_WILD_WORKER_THREADS`: worker threads of the deferred runtime
//!   (unset means one per CPU core)
//!
//! # Example
//!
//! ```rust
//! use run_wild::config::ChainConfig;
//! use std::time::Duration;
//!
//! let config = ChainConfig::from_source(|key| match key {
//!     "RUN_WILD_LOOKUP_TIMEOUT_MS" => Some("250".to_string()),
//!     _ => None,
//! })
//! .expect("valid configuration");
//! assert_eq!(config.lookup_timeout, Some(Duration::from_millis(250)));
//! assert_eq!(config.worker_threads, None);
//! ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the lookup time bound in milliseconds.
pub const LOOKUP_TIMEOUT_VAR: &str = "RUN_WILD_LOOKUP_TIMEOUT_MS";

/// Environment variable holding the deferred runtime's worker count.
pub const WORKER_THREADS_VAR: &str = "RUN_WILD_WORKER_THREADS";

/// Configuration error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but its value cannot be used.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The name of the variable.
        key: String,
        /// Description of why the value is invalid.
        message: String,
    },
}

/// Tunables of the chain runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainConfig {
    /// Per-lookup time bound applied by the deferred family.
    pub lookup_timeout: Option<Duration>,
    /// Worker threads of the deferred runtime.
    pub worker_threads: Option<usize>,
}

impl ChainConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set to a value
    /// that is not valid Unicode, does not parse, or asks for zero worker
    /// threads.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| read_var(key, env::var(key)))
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ChainConfig::from_env`].
    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Fn(&str) -> Option<String>,
    {
        Self::load(|key| Ok(source(key)))
    }

    fn load<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        let lookup_timeout =
            parse_optional::<u64>(&source, LOOKUP_TIMEOUT_VAR)?.map(Duration::from_millis);
        let worker_threads = parse_optional::<usize>(&source, WORKER_THREADS_VAR)?;

        if worker_threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: WORKER_THREADS_VAR.to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            lookup_timeout,
            worker_threads,
        })
    }

    /// Returns a copy with the given lookup time bound.
    #[must_use]
    pub const fn with_lookup_timeout(mut self, limit: Duration) -> Self {
        self.lookup_timeout = Some(limit);
        self
    }
}

/// A missing variable is `None`; one that is set must be valid Unicode.
fn read_var(key: &str, value: Result<String, env::VarError>) -> Result<Option<String>, ConfigError> {
    match value {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value is not valid Unicode".to_string(),
        }),
    }
}

fn parse_optional<T>(
    source: &impl Fn(&str) -> Result<Option<String>, ConfigError>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    source(key)?
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|error| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: error.to_string(),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn source_of(
        pairs: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[rstest]
    fn empty_source_gives_defaults() {
        assert_eq!(
            ChainConfig::from_source(source_of(&[])),
            Ok(ChainConfig::default())
        );
    }

    #[rstest]
    fn reads_both_values() {
        let config = ChainConfig::from_source(source_of(&[
            (LOOKUP_TIMEOUT_VAR, "40"),
            (WORKER_THREADS_VAR, " 3 "),
        ]))
        .expect("valid configuration");

        assert_eq!(config.lookup_timeout, Some(Duration::from_millis(40)));
        assert_eq!(config.worker_threads, Some(3));
    }

    #[rstest]
    #[case(LOOKUP_TIMEOUT_VAR, "soon")]
    #[case(WORKER_THREADS_VAR, "-1")]
    #[case(WORKER_THREADS_VAR, "0")]
    fn rejects_invalid_values(#[case] key: &'static str, #[case] value: &'static str) {
        let pairs: &'static [(&'static str, &'static str)] =
            Box::leak(vec![(key, value)].into_boxed_slice());
        let result = ChainConfig::from_source(source_of(pairs));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: ref reported, .. }) if reported == key
        ));
    }

    #[rstest]
    fn unset_variable_reads_as_absent() {
        assert_eq!(read_var(LOOKUP_TIMEOUT_VAR, Err(env::VarError::NotPresent)), Ok(None));
        assert_eq!(
            read_var(LOOKUP_TIMEOUT_VAR, Ok("25".to_string())),
            Ok(Some("25".to_string()))
        );
    }

    #[cfg(unix)]
    #[rstest]
    #[case(LOOKUP_TIMEOUT_VAR)]
    #[case(WORKER_THREADS_VAR)]
    fn non_unicode_value_is_rejected(#[case] key: &str) {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![0x32, 0xff, 0x30]);

        assert_eq!(
            read_var(key, Err(env::VarError::NotUnicode(raw))),
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "value is not valid Unicode".to_string(),
            })
        );
    }

    #[rstest]
    fn with_lookup_timeout_sets_bound() {
        let config = ChainConfig::default().with_lookup_timeout(Duration::from_millis(5));
        assert_eq!(config.lookup_timeout, Some(Duration::from_millis(5)));
    }
}
