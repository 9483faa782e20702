//! The lookup chain as a first-class program.
//!
//! - [`Program`]: lookups described as data, built with the same
//!   short-circuiting sequencing as [`resolve_chain`]
//! - [`Interpreter`]: runs a program against any [`Lookups`] bundle
//!
//! The same program value can be run by the immediate, deferred, and attempt
//! interpreters without change.
//!
//! [`resolve_chain`]: crate::service::resolve_chain
//! [`Lookups`]: crate::service::Lookups

mod interpreter;
mod program;

pub use interpreter::Interpreter;
pub use program::{Continuations, Operation, Program};
