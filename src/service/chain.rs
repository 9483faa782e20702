//! The chain composer: User → Address → PostalCode → Region → Country.

use crate::domain::{Address, ChainResult, Country, LookupError, PostalCode, Region, User, UserId};
use crate::effect::Effect;

use super::{Lookups, Wrapped};

/// Runs `next` on the value of `previous`, unless `previous` failed.
fn step<L, A, B, F>(
    lookups: &L,
    previous: Wrapped<L, Result<A, LookupError>>,
    next: F,
) -> Wrapped<L, Result<B, LookupError>>
where
    L: Lookups,
    A: Send + 'static,
    B: Send + 'static,
    F: FnOnce(&L, A) -> Wrapped<L, Result<B, LookupError>> + Send + 'static,
{
    let owned = lookups.clone();
    lookups
        .effect()
        .flat_map_ok(previous, move |value| next(&owned, value))
}

/// Resolves the full chain for `user_id`.
///
/// Each step is fed the identifier produced by the one before it, and the
/// first [`LookupError`] ends the chain: later lookups are never invoked.
/// Under the deferred family each step is scheduled only after the previous
/// one resolved.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use run_wild::domain::{Address, Country, LookupError, PostalCode, Region, User, UserId};
/// use run_wild::effect::Immediate;
/// use run_wild::service::{InMemoryDirectory, LookupServices, resolve_chain};
///
/// let services = LookupServices::new(Immediate, Arc::new(InMemoryDirectory::sample()));
///
/// assert_eq!(
///     resolve_chain(&services, UserId::new(1)),
///     Ok((
///         User::new(1, 10),
///         Address::new(10, 20),
///         PostalCode::new(20, 30),
///         Region::new(30, 40),
///         Country::new(40),
///     ))
/// );
/// assert_eq!(
///     resolve_chain(&services, UserId::new(2)),
///     Err(LookupError::NotFound("User 2 not found".to_string()))
/// );
/// ```
pub fn resolve_chain<L: Lookups>(lookups: &L, user_id: UserId) -> Wrapped<L, ChainResult> {
    tracing::debug!(family = <L::Effect as Effect>::NAME, %user_id, "resolving chain");

    let user = lookups.fetch_user(user_id);
    let chain = step(lookups, user, move |lookups: &L, user: User| {
        tracing::debug!(%user_id, address_id = %user.address_id, "user resolved");
        let address = lookups.fetch_address(user.address_id);
        step(lookups, address, move |lookups: &L, address: Address| {
            tracing::debug!(%user_id, postal_code_id = %address.postal_code_id, "address resolved");
            let postal_code = lookups.fetch_postal_code(address.postal_code_id);
            step(lookups, postal_code, move |lookups: &L, postal_code: PostalCode| {
                tracing::debug!(%user_id, region_id = %postal_code.region_id, "postal code resolved");
                let region = lookups.fetch_region(postal_code.region_id);
                step(lookups, region, move |lookups: &L, region: Region| {
                    tracing::debug!(%user_id, country_id = %region.country_id, "region resolved");
                    let country = lookups.fetch_country(region.country_id);
                    lookups.effect().map_ok(country, move |country: Country| {
                        (user, address, postal_code, region, country)
                    })
                })
            })
        })
    });

    lookups.effect().map(chain, move |result: ChainResult| {
        match &result {
            Ok(_) => tracing::debug!(%user_id, "chain resolved"),
            Err(error) => {
                tracing::debug!(%user_id, variant = error.variant_name(), %error, "chain short-circuited");
            }
        }
        result
    })
}
