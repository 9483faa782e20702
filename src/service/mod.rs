//! Lookup services: one fallible step of the chain per entity kind.
//!
//! A lookup takes an identifier, asks the backing [`Directory`] for the
//! record, and yields `Result<Entity, LookupError>` inside the chosen effect
//! family. Misses and store faults become [`LookupError`] values; a panic in
//! the store becomes whatever the effect family makes of it.
//!
//! Nothing at this layer retries.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use run_wild::domain::{LookupError, User, UserId};
//! use run_wild::effect::Immediate;
//! use run_wild::service::{InMemoryDirectory, LookupServices, Lookups};
//!
//! let services = LookupServices::new(Immediate, Arc::new(InMemoryDirectory::sample()));
//!
//! assert_eq!(services.fetch_user(UserId::new(1)), Ok(User::new(1, 10)));
//! assert_eq!(
//!     services.fetch_user(UserId::new(2)),
//!     Err(LookupError::NotFound("User 2 not found".to_string()))
//! );
//! ```

mod chain;
mod directory;

pub use chain::resolve_chain;
pub use directory::{
    Backend, Behavior, CallLog, DEFAULT_CALL_LOG_LIMIT, Directory, InMemoryDirectory,
};

use std::sync::Arc;

use crate::domain::{
    Address, AddressId, Country, CountryId, LookupError, PostalCode, PostalCodeId, Record, Region,
    RegionId, StoreError, User, UserId,
};
use crate::effect::Effect;

/// The carrier of `A` in the effect family of the lookups `L`.
pub type Wrapped<L, A> = <<L as Lookups>::Effect as Effect>::Wrapped<A>;

/// The outcome of one lookup step of record type `R`.
pub type Lookup<L, R> = Wrapped<L, Result<R, LookupError>>;

// =============================================================================
// Service
// =============================================================================

/// A function-shaped service: `I -> E::Wrapped<O>`.
///
/// Any `Fn(I) -> E::Wrapped<O>` closure is a service.
///
/// # Examples
///
/// ```rust
/// use run_wild::effect::{Attempt, Effect};
/// use run_wild::service::Service;
///
/// fn call_twice<S: Service<Attempt, i32, i32>>(service: &S) -> (Result<i32, run_wild::domain::Defect>, Result<i32, run_wild::domain::Defect>) {
///     (service.call(1), service.call(2))
/// }
///
/// let doubler = |x: i32| Attempt.pure(x * 2);
/// assert_eq!(call_twice(&doubler), (Ok(2), Ok(4)));
/// ```
pub trait Service<E, I, O>: Send + Sync
where
    E: Effect,
    O: Send + 'static,
{
    /// Invokes the service.
    fn call(&self, input: I) -> E::Wrapped<O>;
}

impl<E, I, O, F> Service<E, I, O> for F
where
    E: Effect,
    O: Send + 'static,
    F: Fn(I) -> E::Wrapped<O> + Send + Sync,
{
    fn call(&self, input: I) -> E::Wrapped<O> {
        self(input)
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// The five lookup steps, over one effect family.
///
/// The chain composer and the program interpreter are written against this
/// trait only.
pub trait Lookups: Clone + Send + Sync + 'static {
    /// The effect family every lookup runs in.
    type Effect: Effect;

    /// The effect family instance.
    fn effect(&self) -> &Self::Effect;

    /// Looks up a user.
    fn fetch_user(&self, id: UserId) -> Lookup<Self, User>;

    /// Looks up an address.
    fn fetch_address(&self, id: AddressId) -> Lookup<Self, Address>;

    /// Looks up a postal code.
    fn fetch_postal_code(&self, id: PostalCodeId) -> Lookup<Self, PostalCode>;

    /// Looks up a region.
    fn fetch_region(&self, id: RegionId) -> Lookup<Self, Region>;

    /// Looks up a country.
    fn fetch_country(&self, id: CountryId) -> Lookup<Self, Country>;
}

// =============================================================================
// LookupServices
// =============================================================================

/// The lookup bundle of one effect family over one backing store.
pub struct LookupServices<E, B> {
    effect: E,
    backend: Arc<B>,
}

impl<E: Clone, B> Clone for LookupServices<E, B> {
    fn clone(&self) -> Self {
        Self {
            effect: self.effect.clone(),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<E: std::fmt::Debug, B> std::fmt::Debug for LookupServices<E, B> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LookupServices")
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}

impl<E: Effect, B: Backend> LookupServices<E, B> {
    /// Bundles `effect` with the shared `backend`.
    pub const fn new(effect: E, backend: Arc<B>) -> Self {
        Self { effect, backend }
    }

    /// The shared backing store.
    pub const fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Looks up a record of any kind.
    ///
    /// The store call is captured through the effect family, then its answer
    /// is translated: a record passes through, a miss becomes
    /// [`LookupError::NotFound`], a store fault becomes its matching variant,
    /// and an elapsed time bound becomes [`LookupError::Timeout`].
    pub fn fetch<R>(&self, id: R::Id) -> E::Wrapped<Result<R, LookupError>>
    where
        R: Record,
        B: Directory<R>,
    {
        let backend = Arc::clone(&self.backend);
        tracing::debug!(family = E::NAME, kind = %R::KIND, %id, "fetching record");

        let raw = self
            .effect
            .capture(move || <B as Directory<R>>::lookup_raw(&backend, id));
        let resolved = self
            .effect
            .map(raw, move |answer: Result<Option<R>, StoreError>| resolve(id, answer));

        self.effect.within(resolved, move |elapsed| {
            tracing::warn!(kind = %R::KIND, %id, ?elapsed, "lookup abandoned after time bound");
            Err(LookupError::timeout(R::KIND, id, elapsed))
        })
    }

    /// One lookup step as a standalone [`Service`].
    pub fn service<R>(&self) -> impl Service<E, R::Id, Result<R, LookupError>> + use<E, B, R>
    where
        R: Record,
        B: Directory<R>,
    {
        let services = self.clone();
        move |id: R::Id| services.fetch::<R>(id)
    }
}

fn resolve<R: Record>(id: R::Id, answer: Result<Option<R>, StoreError>) -> Result<R, LookupError> {
    match answer {
        Ok(Some(record)) => Ok(record),
        Ok(None) => {
            tracing::debug!(kind = %R::KIND, %id, "record not found");
            Err(LookupError::not_found(R::KIND, id))
        }
        Err(error) => {
            tracing::warn!(kind = %R::KIND, %id, %error, "store reported a fault");
            Err(LookupError::from_store(R::KIND, id, error))
        }
    }
}

impl<E: Effect, B: Backend> Lookups for LookupServices<E, B> {
    type Effect = E;

    fn effect(&self) -> &E {
        &self.effect
    }

    fn fetch_user(&self, id: UserId) -> E::Wrapped<Result<User, LookupError>> {
        self.fetch(id)
    }

    fn fetch_address(&self, id: AddressId) -> E::Wrapped<Result<Address, LookupError>> {
        self.fetch(id)
    }

    fn fetch_postal_code(&self, id: PostalCodeId) -> E::Wrapped<Result<PostalCode, LookupError>> {
        self.fetch(id)
    }

    fn fetch_region(&self, id: RegionId) -> E::Wrapped<Result<Region, LookupError>> {
        self.fetch(id)
    }

    fn fetch_country(&self, id: CountryId) -> E::Wrapped<Result<Country, LookupError>> {
        self.fetch(id)
    }
}
