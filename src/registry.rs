//! The closed set of effect families, and ready-made bundles for each.
//!
//! [`EffectFamily`] names the three supported families. The `*_services`
//! constructors return a [`LookupServices`] bundle over a shared backend,
//! and [`chain_program`] pairs any bundle with the chain as a [`Program`]
//! and the [`Interpreter`] that runs it.
//!
//! With the `async` feature, [`Runner`] owns a runtime and runs a program
//! under any family from synchronous code, reporting every outcome in the
//! same shape.
//!
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use run_wild::domain::UserId;
//! use run_wild::registry::{EffectFamily, chain_program, immediate_services};
//! use run_wild::service::InMemoryDirectory;
//!
//! let family: EffectFamily = "immediate".parse().expect("known family");
//! assert_eq!(family, EffectFamily::Immediate);
//!
//! let services = immediate_services(Arc::new(InMemoryDirectory::sample()));
//! let (program, interpreter) = chain_program(services, UserId::new(1));
//! assert!(interpreter.run(program).is_ok());
//! ```

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::control::{Interpreter, Program};
use crate::domain::{Chain, UserId};
use crate::effect::{Attempt, Immediate};
use crate::service::{Backend, LookupServices, Lookups};

#[cfg(feature = "async")]
pub use runner::{RunError, Runner, deferred_services};

// =============================================================================
// EffectFamily
// =============================================================================

/// One of the supported effect families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EffectFamily {
    /// Synchronous, on the caller's stack.
    Immediate,
    /// Asynchronous, on a tokio worker pool.
    Deferred,
    /// Synchronous, with panics reported as values.
    Attempt,
}

impl EffectFamily {
    /// Every family, in registry order.
    pub const ALL: [Self; 3] = [Self::Immediate, Self::Deferred, Self::Attempt];

    /// The family's name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Deferred => "deferred",
            Self::Attempt => "attempt",
        }
    }
}

impl Display for EffectFamily {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.pad(self.name())
    }
}

/// Returned when parsing a name that is not a known family.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown effect family `{0}` (expected immediate, deferred or attempt)")]
pub struct UnknownFamily(pub String);

impl FromStr for EffectFamily {
    type Err = UnknownFamily;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| UnknownFamily(name.to_string()))
    }
}

// =============================================================================
// Bundles
// =============================================================================

/// Lookups evaluated at once; a store panic unwinds into the caller.
pub const fn immediate_services<B: Backend>(backend: Arc<B>) -> LookupServices<Immediate, B> {
    LookupServices::new(Immediate, backend)
}

/// Lookups evaluated at once; a store panic becomes `Err(Defect)`.
pub const fn attempt_services<B: Backend>(backend: Arc<B>) -> LookupServices<Attempt, B> {
    LookupServices::new(Attempt, backend)
}

/// The chain for `user_id` as a program, with an interpreter over `lookups`.
///
/// Works with any bundle, so the family is picked by the bundle passed in.
pub fn chain_program<L: Lookups>(lookups: L, user_id: UserId) -> (Program<Chain>, Interpreter<L>) {
    (Program::chain(user_id), Interpreter::new(lookups))
}

#[cfg(feature = "async")]
mod runner {
    use std::io;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;

    use thiserror::Error;
    use tokio::runtime::{Handle, Runtime};

    use super::{EffectFamily, attempt_services, immediate_services};
    use crate::config::ChainConfig;
    use crate::control::{Interpreter, Program};
    use crate::domain::{ChainResult, Defect, LookupError, UserId};
    use crate::effect::Deferred;
    use crate::effect::deferred::runtime::{self, BlockingError};
    use crate::service::{Backend, LookupServices, resolve_chain};

    /// Lookups scheduled on `handle`, bounded by `config.lookup_timeout`.
    pub fn deferred_services<B: Backend>(
        backend: Arc<B>,
        handle: Handle,
        config: &ChainConfig,
    ) -> LookupServices<Deferred, B> {
        LookupServices::new(Deferred::from_config(handle, config), backend)
    }

    /// Why a run produced neither a chain nor a [`LookupError`].
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum RunError {
        /// A captured computation panicked or was cancelled.
        #[error(transparent)]
        Defect(#[from] Defect),
        /// The deferred family could not be driven from this thread.
        #[error(transparent)]
        Blocking(#[from] BlockingError),
    }

    /// Runs programs under any family from synchronous code.
    ///
    /// Owns the tokio runtime used by the deferred family. Must not be
    /// dropped from inside an async context.
    #[derive(Debug)]
    pub struct Runner {
        runtime: Runtime,
        config: ChainConfig,
    }

    impl Runner {
        /// Builds the runtime described by `config`.
        ///
        /// # Errors
        ///
        /// Returns the IO error raised while creating the runtime.
        pub fn new(config: ChainConfig) -> io::Result<Self> {
            let runtime = runtime::build(&config)?;
            Ok(Self { runtime, config })
        }

        /// The configuration this runner was built from.
        pub const fn config(&self) -> &ChainConfig {
            &self.config
        }

        /// A handle to the owned runtime.
        pub fn handle(&self) -> &Handle {
            self.runtime.handle()
        }

        /// Interprets `program` under `family` against `backend`.
        ///
        /// # Errors
        ///
        /// Returns [`RunError::Defect`] if a lookup panicked (under every
        /// family, including the immediate one), and
        /// [`RunError::Blocking`] if the deferred family cannot block here.
        pub fn run_program<A, B>(
            &self,
            family: EffectFamily,
            backend: Arc<B>,
            program: Program<A>,
        ) -> Result<Result<A, LookupError>, RunError>
        where
            A: Send + 'static,
            B: Backend,
        {
            tracing::debug!(%family, "running program");
            match family {
                EffectFamily::Immediate => {
                    let interpreter = Interpreter::new(immediate_services(backend));
                    catch_unwind(AssertUnwindSafe(move || interpreter.run(program)))
                        .map_err(|payload| report_defect(family, Defect::from_panic(payload)))
                }
                EffectFamily::Attempt => Interpreter::new(attempt_services(backend))
                    .run(program)
                    .map_err(|defect| report_defect(family, defect)),
                EffectFamily::Deferred => {
                    let services = deferred_services(backend, self.handle().clone(), &self.config);
                    let task = Interpreter::new(services).run(program);
                    runtime::try_block_on(&self.runtime, task)?
                        .map_err(|defect| report_defect(family, defect))
                }
            }
        }

        /// Resolves the chain for `user_id` under `family` with the
        /// composer rather than the program form.
        ///
        /// # Errors
        ///
        /// Same as [`Runner::run_program`].
        pub fn resolve<B: Backend>(
            &self,
            family: EffectFamily,
            backend: Arc<B>,
            user_id: UserId,
        ) -> Result<ChainResult, RunError> {
            tracing::debug!(%family, %user_id, "resolving chain");
            match family {
                EffectFamily::Immediate => {
                    let services = immediate_services(backend);
                    catch_unwind(AssertUnwindSafe(|| resolve_chain(&services, user_id)))
                        .map_err(|payload| report_defect(family, Defect::from_panic(payload)))
                }
                EffectFamily::Attempt => resolve_chain(&attempt_services(backend), user_id)
                    .map_err(|defect| report_defect(family, defect)),
                EffectFamily::Deferred => {
                    let services: LookupServices<Deferred, B> =
                        deferred_services(backend, self.handle().clone(), &self.config);
                    runtime::try_block_on(&self.runtime, resolve_chain(&services, user_id))?
                        .map_err(|defect| report_defect(family, defect))
                }
            }
        }
    }

    fn report_defect(family: EffectFamily, defect: Defect) -> RunError {
        tracing::warn!(%family, %defect, "run ended in a defect");
        RunError::Defect(defect)
    }
}


#[cfg(all(test, feature = "async"))]
mod runner_tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::control::Program;
    use crate::domain::{Defect, EntityKind, LookupError, UserId};
    use crate::service::{Behavior, InMemoryDirectory};
    use rstest::rstest;

    fn runner() -> Runner {
        let config = ChainConfig {
            worker_threads: Some(2),
            ..ChainConfig::default()
        };
        Runner::new(config).expect("runtime should build")
    }

    #[rstest]
    fn every_family_resolves_the_sample_chain() {
        let runner = runner();
        let backend = Arc::new(InMemoryDirectory::sample());

        let outcomes: Vec<_> = EffectFamily::ALL
            .into_iter()
            .map(|family| {
                runner
                    .run_program(family, Arc::clone(&backend), Program::chain(UserId::new(1)))
                    .expect("no defect")
            })
            .collect();

        assert!(outcomes.iter().all(|outcome| outcome == &outcomes[0]));
        assert!(outcomes[0].is_ok());
    }

    #[rstest]
    #[case(EffectFamily::Immediate)]
    #[case(EffectFamily::Deferred)]
    #[case(EffectFamily::Attempt)]
    fn defects_are_reported_apart_from_lookup_errors(#[case] family: EffectFamily) {
        let backend = Arc::new(
            InMemoryDirectory::sample()
                .with_behavior(EntityKind::User, Behavior::Defective("table gone".to_string())),
        );

        assert_eq!(
            runner().resolve(family, backend, UserId::new(1)),
            Err(RunError::Defect(Defect::new("table gone")))
        );
    }

    #[rstest]
    fn resolve_reports_lookup_errors_as_values() {
        let backend = Arc::new(InMemoryDirectory::sample());
        assert_eq!(
            runner().resolve(EffectFamily::Deferred, backend, UserId::new(2)),
            Ok(Err(LookupError::NotFound("User 2 not found".to_string())))
        );
    }
}
