//! Running a [`Program`] against one effect family.

use std::ops::ControlFlow;

use crate::domain::LookupError;
use crate::effect::Effect;
use crate::service::{Lookups, Wrapped};

use super::program::{Erased, Operation, Program, Step, Suspended};

/// Maps each [`Program`] operation to the matching lookup of `L`.
///
/// The interpreter is the only place that knows which effect family runs
/// the program; swapping `L` never touches the program itself.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use run_wild::control::{Interpreter, Program};
/// use run_wild::domain::{Country, UserId};
/// use run_wild::effect::Attempt;
/// use run_wild::service::{InMemoryDirectory, LookupServices};
///
/// let services = LookupServices::new(Attempt, Arc::new(InMemoryDirectory::sample()));
/// let interpreter = Interpreter::new(services);
///
/// let outcome = interpreter.run(Program::chain(UserId::new(1)));
/// assert_eq!(outcome.map(|chain| chain.map(|(.., country)| country)), Ok(Ok(Country::new(40))));
/// ```
#[derive(Debug, Clone)]
pub struct Interpreter<L> {
    lookups: L,
}

impl<L: Lookups> Interpreter<L> {
    /// Creates an interpreter dispatching to `lookups`.
    pub const fn new(lookups: L) -> Self {
        Self { lookups }
    }

    /// The lookups this interpreter dispatches to.
    pub const fn lookups(&self) -> &L {
        &self.lookups
    }

    /// Runs `program` to completion.
    ///
    /// Operations run in construction order. The first [`LookupError`]
    /// becomes the result and the rest of the program is dropped unrun.
    /// Each operation is one iteration of [`Effect::iterate`], so program
    /// length never shows up as stack depth.
    pub fn run<A>(&self, program: Program<A>) -> Wrapped<L, Result<A, LookupError>>
    where
        A: Send + 'static,
    {
        let suspended = match program.start() {
            Step::Done(value) => return self.lookups.effect().pure(Ok(value)),
            Step::Suspended(suspended) => suspended,
        };

        let lookups = self.lookups.clone();
        self.lookups
            .effect()
            .iterate(suspended, move |suspended: Suspended<A>| {
                let operation = suspended.operation();
                tracing::debug!(
                    family = <L::Effect as Effect>::NAME,
                    %operation,
                    "interpreting operation"
                );
                lookups.effect().map(
                    dispatch(&lookups, operation),
                    move |found: Result<Erased, LookupError>| match found {
                        Ok(record) => match suspended.resume(record) {
                            Step::Done(value) => ControlFlow::Break(Ok(value)),
                            Step::Suspended(next) => ControlFlow::Continue(next),
                        },
                        Err(error) => ControlFlow::Break(Err(error)),
                    },
                )
            })
    }
}

/// Runs the lookup matching `operation`.
fn dispatch<L: Lookups>(lookups: &L, operation: Operation) -> Wrapped<L, Result<Erased, LookupError>> {
    let effect = lookups.effect();
    match operation {
        Operation::FetchUser(id) => effect.map_ok(lookups.fetch_user(id), erase),
        Operation::FetchAddress(id) => effect.map_ok(lookups.fetch_address(id), erase),
        Operation::FetchPostalCode(id) => effect.map_ok(lookups.fetch_postal_code(id), erase),
        Operation::FetchRegion(id) => effect.map_ok(lookups.fetch_region(id), erase),
        Operation::FetchCountry(id) => effect.map_ok(lookups.fetch_country(id), erase),
    }
}

fn erase<T: Send + 'static>(record: T) -> Erased {
    Box::new(record)
}
