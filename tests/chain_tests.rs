//! Integration tests for the chain composer under the synchronous families.
//!
//! Covers:
//! - The full chain for a seeded user
//! - Short-circuiting at every step, checked against the store's call log
//! - Every `LookupError` variant reaching the caller
//! - Strict step order up to the first failure

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use rstest::rstest;
use run_wild::domain::{
    Address, Chain, Country, EntityKind, LookupError, PostalCode, Region, User, UserId,
};
use run_wild::registry::{attempt_services, immediate_services};
use run_wild::service::{Behavior, InMemoryDirectory, resolve_chain};

fn first_chain() -> Chain {
    (
        User::new(1, 10),
        Address::new(10, 20),
        PostalCode::new(20, 30),
        Region::new(30, 40),
        Country::new(40),
    )
}

fn behavior_for(kind: EntityKind) -> Behavior {
    match kind {
        EntityKind::User | EntityKind::Address => Behavior::AlwaysMiss,
        EntityKind::PostalCode => Behavior::Elapsed(Duration::from_millis(75)),
        EntityKind::Region => Behavior::Unreachable {
            host: "regions.internal".to_string(),
        },
        EntityKind::Country => Behavior::AlwaysMiss,
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[rstest]
fn seeded_user_resolves_to_full_chain() {
    let backend = Arc::new(InMemoryDirectory::sample());

    assert_eq!(
        resolve_chain(&immediate_services(Arc::clone(&backend)), UserId::new(1)),
        Ok(first_chain())
    );
    assert_eq!(
        resolve_chain(&attempt_services(backend), UserId::new(1)),
        Ok(Ok(first_chain()))
    );
}

#[rstest]
fn unknown_user_never_reaches_address() {
    let backend = Arc::new(InMemoryDirectory::sample());

    let result = resolve_chain(&immediate_services(Arc::clone(&backend)), UserId::new(2));

    assert_eq!(
        result,
        Err(LookupError::NotFound("User 2 not found".to_string()))
    );
    let log = backend.call_log();
    assert_eq!(log.count(EntityKind::User), 1);
    assert_eq!(log.total(), 1);
}

#[rstest]
fn missing_address_never_reaches_postal_code() {
    let backend = Arc::new(
        InMemoryDirectory::sample().with_behavior(EntityKind::Address, Behavior::AlwaysMiss),
    );

    let result = resolve_chain(&immediate_services(Arc::clone(&backend)), UserId::new(1));

    assert_eq!(
        result,
        Err(LookupError::NotFound("Address 10 not found".to_string()))
    );
    assert_eq!(
        backend.call_log().calls(),
        vec![EntityKind::User, EntityKind::Address]
    );
}

// =============================================================================
// Every error variant
// =============================================================================

#[rstest]
#[case::not_found(
    InMemoryDirectory::sample().with_behavior(EntityKind::Country, Behavior::AlwaysMiss),
    "NotFound",
    "Country 40 not found"
)]
#[case::duplicate_found(
    InMemoryDirectory::sample().with_address(Address::new(10, 21)),
    "DuplicateFound",
    "Address 10 matched 2 records"
)]
#[case::timeout(
    InMemoryDirectory::sample()
        .with_behavior(EntityKind::PostalCode, Behavior::Elapsed(Duration::from_secs(2))),
    "Timeout",
    "PostalCode 20 lookup timed out after 2s"
)]
#[case::host_unreachable(
    InMemoryDirectory::sample().with_behavior(
        EntityKind::User,
        Behavior::Unreachable { host: "users.internal".to_string() }
    ),
    "HostUnreachable",
    "User 1 lookup failed: host users.internal unreachable"
)]
fn every_error_variant_reaches_the_caller(
    #[case] directory: InMemoryDirectory,
    #[case] variant: &str,
    #[case] message: &str,
) {
    let services = attempt_services(Arc::new(directory));

    let error = resolve_chain(&services, UserId::new(1))
        .expect("no defect")
        .expect_err("chain should fail");

    assert_eq!(error.variant_name(), variant);
    assert_eq!(error.message(), message);
    assert_eq!(error.to_string(), format!("{variant}: {message}"));
}

#[rstest]
fn errors_are_matched_exhaustively() {
    let backend = Arc::new(
        InMemoryDirectory::sample().with_behavior(EntityKind::Region, behavior_for(EntityKind::Region)),
    );

    let described = match resolve_chain(&immediate_services(backend), UserId::new(5)) {
        Ok((user, ..)) => format!("resolved {}", user.id),
        Err(LookupError::NotFound(message)) => format!("missing: {message}"),
        Err(LookupError::DuplicateFound(message)) => format!("ambiguous: {message}"),
        Err(LookupError::Timeout(message)) => format!("slow: {message}"),
        Err(LookupError::HostUnreachable(message)) => format!("offline: {message}"),
    };

    assert_eq!(
        described,
        "offline: Region 35 lookup failed: host regions.internal unreachable"
    );
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// A user with no record stops the chain after exactly one lookup.
    #[test]
    fn prop_missing_user_short_circuits(raw in any::<u64>().prop_filter("seeded", |id| *id != 1 && *id != 5)) {
        let backend = Arc::new(InMemoryDirectory::sample());

        let result = resolve_chain(&immediate_services(Arc::clone(&backend)), UserId::new(raw));

        prop_assert_eq!(result, Err(LookupError::not_found(EntityKind::User, raw)));
        prop_assert_eq!(backend.call_log().calls(), vec![EntityKind::User]);
    }

    /// Lookups run in chain order and stop at the failing step.
    #[test]
    fn prop_steps_run_in_order_up_to_failure(failing in 0usize..5, seeded_user in prop::sample::select(vec![1u64, 5])) {
        let kind = EntityKind::CHAIN_ORDER[failing];
        let backend = Arc::new(InMemoryDirectory::sample().with_behavior(kind, behavior_for(kind)));

        let result = resolve_chain(&immediate_services(Arc::clone(&backend)), UserId::new(seeded_user));

        prop_assert!(result.is_err());
        prop_assert_eq!(backend.call_log().calls(), EntityKind::CHAIN_ORDER[..=failing].to_vec());
    }

    /// Independent invocations share nothing: the order of runs does not matter.
    #[test]
    fn prop_invocations_are_independent(ids in prop::collection::vec(0u64..8, 1..12)) {
        let backend = Arc::new(InMemoryDirectory::sample());
        let services = attempt_services(backend);

        let forward: Vec<_> = ids.iter().map(|id| resolve_chain(&services, UserId::new(*id))).collect();
        let mut backward: Vec<_> = ids.iter().rev().map(|id| resolve_chain(&services, UserId::new(*id))).collect();
        backward.reverse();

        prop_assert_eq!(forward, backward);
    }
}
