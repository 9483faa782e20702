//! # run-wild
//!
//! A typed, short-circuiting lookup chain, written once and run under
//! several effect families.
//!
//! ## Overview
//!
//! Five dependent lookups resolve a user to the country they live in:
//!
//! ```text
//! User -> Address -> PostalCode -> Region -> Country
//! ```
//!
//! Each step may fail with a [`LookupError`](domain::LookupError); the first
//! failure ends the chain. The crate provides:
//!
//! - **Domain**: records, typed identifiers, and the closed error taxonomy
//! - **Effect families**: [`Immediate`](effect::Immediate),
//!   [`Attempt`](effect::Attempt) and (with `async`) `Deferred`, behind one
//!   [`Effect`](effect::Effect) trait
//! - **Services**: one lookup per entity kind over a pluggable backing store,
//!   and the chain composer [`resolve_chain`](service::resolve_chain)
//! - **Programs**: the chain as data, plus an interpreter per family
//! - **Registry**: ready-made bundles and a runner for each family
//!
//! ## Feature Flags
//!
//! - `async` (default): the deferred family and the runner
//! - `serde`: serialization of records, identifiers and errors
//! - `full`: enable all features
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use run_wild::prelude::*;
//!
//! let services = LookupServices::new(Attempt, Arc::new(InMemoryDirectory::sample()));
//!
//! let composed = resolve_chain(&services, UserId::new(1));
//! let interpreted = Interpreter::new(services).run(Program::chain(UserId::new(1)));
//!
//! assert_eq!(composed, interpreted);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use run_wild::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::ChainConfig;
    pub use crate::control::{Interpreter, Operation, Program};
    pub use crate::domain::*;
    pub use crate::effect::{Attempt, Effect, Immediate};
    pub use crate::registry::{EffectFamily, attempt_services, chain_program, immediate_services};
    pub use crate::service::{
        Behavior, Directory, InMemoryDirectory, LookupServices, Lookups, Service, resolve_chain,
    };

    #[cfg(feature = "async")]
    pub use crate::effect::{Deferred, Task};

    #[cfg(feature = "async")]
    pub use crate::registry::{RunError, Runner, deferred_services};
}

pub mod config;
pub mod control;
pub mod domain;
pub mod effect;
pub mod registry;
pub mod service;
