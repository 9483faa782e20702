#![cfg(feature = "serde")]
//! Serialization of chain outcomes.

use rstest::rstest;
use run_wild::domain::{
    Address, Chain, ChainResult, Country, EntityKind, LookupError, PostalCode, Region, User,
    UserId,
};
use run_wild::registry::EffectFamily;
use serde_json::json;

fn first_chain() -> Chain {
    (
        User::new(1, 10),
        Address::new(10, 20),
        PostalCode::new(20, 30),
        Region::new(30, 40),
        Country::new(40),
    )
}

#[rstest]
fn identifiers_serialize_as_bare_numbers() {
    assert_eq!(serde_json::to_value(UserId::new(7)).unwrap(), json!(7));
    assert_eq!(serde_json::from_value::<UserId>(json!(7)).unwrap(), UserId::new(7));
}

#[rstest]
fn successful_chain_serializes_record_by_record() {
    let value = serde_json::to_value(first_chain()).unwrap();

    assert_eq!(
        value,
        json!([
            { "id": 1, "address_id": 10 },
            { "id": 10, "postal_code_id": 20 },
            { "id": 20, "region_id": 30 },
            { "id": 30, "country_id": 40 },
            { "id": 40 }
        ])
    );
}

#[rstest]
fn lookup_error_is_tagged_by_variant() {
    let error = LookupError::not_found(EntityKind::User, 2);

    assert_eq!(
        serde_json::to_value(&error).unwrap(),
        json!({ "NotFound": "User 2 not found" })
    );
}

#[rstest]
fn chain_result_round_trips_through_json() {
    let outcomes: Vec<ChainResult> = vec![
        Ok(first_chain()),
        Err(LookupError::HostUnreachable(
            "Region 30 lookup failed: host regions.internal unreachable".to_string(),
        )),
    ];

    let text = serde_json::to_string(&outcomes).unwrap();
    let decoded: Vec<ChainResult> = serde_json::from_str(&text).unwrap();

    assert_eq!(decoded, outcomes);
}

#[rstest]
#[case(EffectFamily::Immediate, "immediate")]
#[case(EffectFamily::Deferred, "deferred")]
#[case(EffectFamily::Attempt, "attempt")]
fn effect_family_uses_its_name(#[case] family: EffectFamily, #[case] name: &str) {
    assert_eq!(serde_json::to_value(family).unwrap(), json!(name));
    assert_eq!(serde_json::to_value(EntityKind::PostalCode).unwrap(), json!("PostalCode"));
}
