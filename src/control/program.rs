//! Lookups described as data.
//!
//! A [`Program`] describes a sequence of lookups without running any of them.
//! A pending program holds the [`Operation`] to run next and a queue of the
//! continuations waiting for its result, so the description can be handed to
//! any [`Interpreter`](super::Interpreter) unchanged.
//!
//! # Design
//!
//! ```text
//! Program<A> = Done(A)
//!            | Pending { operation, continuations }
//! ```
//!
//! `flat_map` and `map` push onto the queue in O(1), and interpretation
//! drains it in a loop, so neither building nor running a program grows the
//! call stack with its length. Continuations are stored type-erased; each
//! one is pushed together with the input type it expects.
//!
//! # Examples
//!
//! ```rust
//! use run_wild::control::{Operation, Program};
//! use run_wild::domain::UserId;
//!
//! let program = Program::fetch_user(UserId::new(1)).map(|user| user.address_id);
//!
//! assert_eq!(program.next_operation(), Some(Operation::FetchUser(UserId::new(1))));
//! assert_eq!(program.to_string(), "Pending(FetchUser(1))");
//! ```

use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::domain::{
    Address, AddressId, Chain, Country, CountryId, EntityKind, PostalCode, PostalCodeId, Region,
    RegionId, User, UserId,
};

// =============================================================================
// Operation
// =============================================================================

/// One lookup request, tagged by kind and carrying its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Look up a user.
    FetchUser(UserId),
    /// Look up an address.
    FetchAddress(AddressId),
    /// Look up a postal code.
    FetchPostalCode(PostalCodeId),
    /// Look up a region.
    FetchRegion(RegionId),
    /// Look up a country.
    FetchCountry(CountryId),
}

impl Operation {
    /// The kind of record this operation asks for.
    pub const fn kind(self) -> EntityKind {
        match self {
            Self::FetchUser(_) => EntityKind::User,
            Self::FetchAddress(_) => EntityKind::Address,
            Self::FetchPostalCode(_) => EntityKind::PostalCode,
            Self::FetchRegion(_) => EntityKind::Region,
            Self::FetchCountry(_) => EntityKind::Country,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchUser(id) => write!(formatter, "FetchUser({id})"),
            Self::FetchAddress(id) => write!(formatter, "FetchAddress({id})"),
            Self::FetchPostalCode(id) => write!(formatter, "FetchPostalCode({id})"),
            Self::FetchRegion(id) => write!(formatter, "FetchRegion({id})"),
            Self::FetchCountry(id) => write!(formatter, "FetchCountry({id})"),
        }
    }
}

// =============================================================================
// Continuations
// =============================================================================

/// A value whose type is known only to the continuation that receives it.
pub(crate) type Erased = Box<dyn Any + Send>;

const INLINE_CONTINUATIONS: usize = 8;

/// One continuation with its input type erased.
trait Arrow: Send {
    fn apply(self: Box<Self>, input: Erased) -> Program<Erased>;
}

struct FlatMapArrow<A, B, F> {
    function: F,
    _types: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Arrow for FlatMapArrow<A, B, F>
where
    A: 'static,
    B: Send + 'static,
    F: FnOnce(A) -> Program<B> + Send,
{
    fn apply(self: Box<Self>, input: Erased) -> Program<Erased> {
        (self.function)(restore(input)).erase()
    }
}

struct MapArrow<A, B, F> {
    function: F,
    _types: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Arrow for MapArrow<A, B, F>
where
    A: 'static,
    B: Send + 'static,
    F: FnOnce(A) -> B + Send,
{
    fn apply(self: Box<Self>, input: Erased) -> Program<Erased> {
        let output: Erased = Box::new((self.function)(restore(input)));
        Program::Done(output)
    }
}

fn restore<A: 'static>(value: Erased) -> A {
    // INVARIANT: every arrow is queued behind a step producing its input type
    *value
        .downcast::<A>()
        .expect("Program internal error: continuation received a value of another type")
}

/// The continuations waiting on a pending operation, oldest first.
#[doc(hidden)]
pub struct Continuations {
    arrows: SmallVec<[Box<dyn Arrow>; INLINE_CONTINUATIONS]>,
}

impl Continuations {
    fn new() -> Self {
        Self {
            arrows: SmallVec::new(),
        }
    }

    fn push(mut self, arrow: impl Arrow + 'static) -> Self {
        self.arrows.push(Box::new(arrow));
        self
    }

    /// Number of queued continuations.
    pub fn len(&self) -> usize {
        self.arrows.len()
    }

    /// Returns `true` when the operation's result is the program's result.
    pub fn is_empty(&self) -> bool {
        self.arrows.is_empty()
    }
}

type Arrows = smallvec::IntoIter<[Box<dyn Arrow>; INLINE_CONTINUATIONS]>;

/// Continuations still to apply while a program is interpreted.
///
/// When a continuation yields a new pending program, its queue runs before
/// whatever is left of the current one; the remainder is parked rather than
/// copied.
struct ContinuationStack {
    current: Arrows,
    parked: SmallVec<[Arrows; INLINE_CONTINUATIONS]>,
}

impl ContinuationStack {
    fn new(initial: Continuations) -> Self {
        Self {
            current: initial.arrows.into_iter(),
            parked: SmallVec::new(),
        }
    }

    fn push(&mut self, continuations: Continuations) {
        let incoming = continuations.arrows.into_iter();
        if self.current.len() == 0 {
            self.current = incoming;
        } else {
            let rest = std::mem::replace(&mut self.current, incoming);
            self.parked.push(rest);
        }
    }

    fn pop(&mut self) -> Option<Box<dyn Arrow>> {
        loop {
            if let Some(arrow) = self.current.next() {
                return Some(arrow);
            }
            self.current = self.parked.pop()?;
        }
    }
}

// =============================================================================
// Program
// =============================================================================

/// A description of lookups still to run, ending in a value of type `A`.
///
/// Programs are consumed by interpretation; a finished program is never
/// replayed.
pub enum Program<A> {
    /// Nothing left to look up.
    Done(A),
    /// Run `operation`, then feed its record through `continuations`.
    Pending {
        /// The lookup to run next.
        operation: Operation,
        /// The rest of the program.
        continuations: Continuations,
        /// The type the continuations finally produce.
        _result: PhantomData<fn() -> A>,
    },
}

impl<A> Program<A> {
    /// A program that looks nothing up.
    pub const fn pure(value: A) -> Self {
        Self::Done(value)
    }

    /// The operation that would run next, or `None` when the program is done.
    pub const fn next_operation(&self) -> Option<Operation> {
        match self {
            Self::Done(_) => None,
            Self::Pending { operation, .. } => Some(*operation),
        }
    }

    /// Returns `true` if nothing is left to look up.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    fn lift(operation: Operation) -> Self {
        Self::Pending {
            operation,
            continuations: Continuations::new(),
            _result: PhantomData,
        }
    }
}

impl<A: Send + 'static> Program<A> {
    /// Sequences `function` after this program.
    ///
    /// `function` receives the final value once every pending operation has
    /// been interpreted. Pushing onto a pending program is O(1).
    pub fn flat_map<B, F>(self, function: F) -> Program<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Program<B> + Send + 'static,
    {
        match self {
            Self::Done(value) => function(value),
            Self::Pending {
                operation,
                continuations,
                ..
            } => Program::Pending {
                operation,
                continuations: continuations.push(FlatMapArrow::<A, B, F> {
                    function,
                    _types: PhantomData,
                }),
                _result: PhantomData,
            },
        }
    }

    /// Transforms the final value.
    pub fn map<B, F>(self, function: F) -> Program<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        match self {
            Self::Done(value) => Program::Done(function(value)),
            Self::Pending {
                operation,
                continuations,
                ..
            } => Program::Pending {
                operation,
                continuations: continuations.push(MapArrow::<A, B, F> {
                    function,
                    _types: PhantomData,
                }),
                _result: PhantomData,
            },
        }
    }

    fn erase(self) -> Program<Erased> {
        match self {
            Self::Done(value) => {
                let value: Erased = Box::new(value);
                Program::Done(value)
            }
            Self::Pending {
                operation,
                continuations,
                ..
            } => Program::Pending {
                operation,
                continuations,
                _result: PhantomData,
            },
        }
    }

    /// Splits off the next operation, if any.
    pub(crate) fn start(self) -> Step<A> {
        match self {
            Self::Done(value) => Step::Done(value),
            Self::Pending {
                operation,
                continuations,
                ..
            } => Step::Suspended(Suspended {
                operation,
                stack: ContinuationStack::new(continuations),
                _result: PhantomData,
            }),
        }
    }
}

/// Where interpretation of a program stands.
pub(crate) enum Step<A> {
    Done(A),
    Suspended(Suspended<A>),
}

/// A program paused on one operation, waiting for its record.
pub(crate) struct Suspended<A> {
    operation: Operation,
    stack: ContinuationStack,
    _result: PhantomData<fn() -> A>,
}

impl<A: 'static> Suspended<A> {
    pub(crate) const fn operation(&self) -> Operation {
        self.operation
    }

    /// Feeds the record found for [`Self::operation`] to the waiting
    /// continuations, up to the next operation.
    pub(crate) fn resume(self, record: Erased) -> Step<A> {
        let Self { mut stack, .. } = self;
        let mut value = record;
        loop {
            let Some(arrow) = stack.pop() else {
                return Step::Done(restore(value));
            };
            match arrow.apply(value) {
                Program::Done(next) => value = next,
                Program::Pending {
                    operation,
                    continuations,
                    ..
                } => {
                    stack.push(continuations);
                    return Step::Suspended(Self {
                        operation,
                        stack,
                        _result: PhantomData,
                    });
                }
            }
        }
    }
}

impl Program<User> {
    /// A single user lookup.
    pub fn fetch_user(id: UserId) -> Self {
        Self::lift(Operation::FetchUser(id))
    }
}

impl Program<Address> {
    /// A single address lookup.
    pub fn fetch_address(id: AddressId) -> Self {
        Self::lift(Operation::FetchAddress(id))
    }
}

impl Program<PostalCode> {
    /// A single postal code lookup.
    pub fn fetch_postal_code(id: PostalCodeId) -> Self {
        Self::lift(Operation::FetchPostalCode(id))
    }
}

impl Program<Region> {
    /// A single region lookup.
    pub fn fetch_region(id: RegionId) -> Self {
        Self::lift(Operation::FetchRegion(id))
    }
}

impl Program<Country> {
    /// A single country lookup.
    pub fn fetch_country(id: CountryId) -> Self {
        Self::lift(Operation::FetchCountry(id))
    }
}

impl Program<Chain> {
    /// The full chain for `user_id`, as data.
    ///
    /// Runs the same five lookups, in the same order, as
    /// [`resolve_chain`](crate::service::resolve_chain).
    pub fn chain(user_id: UserId) -> Self {
        Program::fetch_user(user_id).flat_map(|user| {
            Program::fetch_address(user.address_id).flat_map(move |address| {
                Program::fetch_postal_code(address.postal_code_id).flat_map(move |postal_code| {
                    Program::fetch_region(postal_code.region_id).flat_map(move |region| {
                        Program::fetch_country(region.country_id)
                            .map(move |country| (user, address, postal_code, region, country))
                    })
                })
            })
        })
    }
}

impl<A: Debug> Debug for Program<A> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(value) => formatter.debug_tuple("Done").field(value).finish(),
            Self::Pending {
                operation,
                continuations,
                ..
            } => formatter
                .debug_struct("Pending")
                .field("operation", operation)
                .field("continuations", &continuations.len())
                .finish(),
        }
    }
}

impl<A: Display> Display for Program<A> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(value) => write!(formatter, "Done({value})"),
            Self::Pending { operation, .. } => write!(formatter, "Pending({operation})"),
        }
    }
}
