//! Domain model for the lookup chain.
//!
//! Five immutable records form a dependency chain: every record except
//! [`Country`] points at the identifier of the next one.
//!
//! ```text
//! User --address_id--> Address --postal_code_id--> PostalCode
//!      --region_id--> Region --country_id--> Country
//! ```
//!
//! Records are plain `Copy` values. A lookup hands out a fresh copy each
//! time; nothing in this crate keeps a reference to a stored row.
//!
//! # Examples
//!
//! ```rust
//! use run_wild::domain::{EntityKind, Record, User};
//!
//! let user = User::new(1, 10);
//! assert_eq!(user.address_id.value(), 10);
//! assert_eq!(User::KIND, EntityKind::User);
//! assert_eq!(user.record_id().to_string(), "1");
//! ```

pub mod error;

use std::fmt::{self, Debug, Display, Formatter};
use std::hash::Hash;

pub use error::{Defect, LookupError, StoreError};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! define_identifier {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
            #[cfg_attr(feature = "serde", serde(transparent))]
            pub struct $name(u64);

            impl $name {
                /// Wraps a raw numeric handle.
                #[inline]
                pub const fn new(value: u64) -> Self {
                    Self(value)
                }

                /// Returns the raw numeric handle.
                #[inline]
                pub const fn value(self) -> u64 {
                    self.0
                }
            }

            impl From<u64> for $name {
                #[inline]
                fn from(value: u64) -> Self {
                    Self(value)
                }
            }

            impl Display for $name {
                fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                    write!(formatter, "{}", self.0)
                }
            }
        )*
    };
}

define_identifier!(
    /// Opaque handle of a [`User`].
    UserId,
    /// Opaque handle of an [`Address`].
    AddressId,
    /// Opaque handle of a [`PostalCode`].
    PostalCodeId,
    /// Opaque handle of a [`Region`].
    RegionId,
    /// Opaque handle of a [`Country`].
    CountryId,
);

// =============================================================================
// Entity Kind
// =============================================================================

/// The five steps of the chain, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    /// A user record.
    User,
    /// An address record.
    Address,
    /// A postal code record.
    PostalCode,
    /// A region record.
    Region,
    /// A country record.
    Country,
}

impl EntityKind {
    /// Every kind in chain order.
    pub const CHAIN_ORDER: [Self; 5] = [
        Self::User,
        Self::Address,
        Self::PostalCode,
        Self::Region,
        Self::Country,
    ];

    /// Returns the name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Address => "Address",
            Self::PostalCode => "PostalCode",
            Self::Region => "Region",
            Self::Country => "Country",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

// =============================================================================
// Record Trait
// =============================================================================

/// A value that can be looked up by identifier.
///
/// The associated `Id` ties each record to its own identifier type, so an
/// `AddressId` can never be passed where a `UserId` is expected.
pub trait Record: Debug + Clone + Send + Sync + 'static {
    /// The identifier type of this record.
    type Id: Debug + Display + Copy + Eq + Hash + Send + Sync + 'static;

    /// Which step of the chain this record belongs to.
    const KIND: EntityKind;

    /// Returns the identifier of this record.
    fn record_id(&self) -> Self::Id;
}

// =============================================================================
// Records
// =============================================================================

/// A user, pointing at its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    /// Identifier of this user.
    pub id: UserId,
    /// Identifier of the user's address.
    pub address_id: AddressId,
}

impl User {
    /// Creates a user from raw handles.
    pub const fn new(id: u64, address_id: u64) -> Self {
        Self {
            id: UserId::new(id),
            address_id: AddressId::new(address_id),
        }
    }
}

/// An address, pointing at its postal code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Identifier of this address.
    pub id: AddressId,
    /// Identifier of the address's postal code.
    pub postal_code_id: PostalCodeId,
}

impl Address {
    /// Creates an address from raw handles.
    pub const fn new(id: u64, postal_code_id: u64) -> Self {
        Self {
            id: AddressId::new(id),
            postal_code_id: PostalCodeId::new(postal_code_id),
        }
    }
}

/// A postal code, pointing at its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PostalCode {
    /// Identifier of this postal code.
    pub id: PostalCodeId,
    /// Identifier of the postal code's region.
    pub region_id: RegionId,
}

impl PostalCode {
    /// Creates a postal code from raw handles.
    pub const fn new(id: u64, region_id: u64) -> Self {
        Self {
            id: PostalCodeId::new(id),
            region_id: RegionId::new(region_id),
        }
    }
}

/// A region, pointing at its country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    /// Identifier of this region.
    pub id: RegionId,
    /// Identifier of the region's country.
    pub country_id: CountryId,
}

impl Region {
    /// Creates a region from raw handles.
    pub const fn new(id: u64, country_id: u64) -> Self {
        Self {
            id: RegionId::new(id),
            country_id: CountryId::new(country_id),
        }
    }
}

/// A country, the last step of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Country {
    /// Identifier of this country.
    pub id: CountryId,
}

impl Country {
    /// Creates a country from a raw handle.
    pub const fn new(id: u64) -> Self {
        Self {
            id: CountryId::new(id),
        }
    }
}

macro_rules! impl_record {
    ($($record:ty => $id:ty, $kind:ident);* $(;)?) => {
        $(
            impl Record for $record {
                type Id = $id;
                const KIND: EntityKind = EntityKind::$kind;

                #[inline]
                fn record_id(&self) -> Self::Id {
                    self.id
                }
            }
        )*
    };
}

impl_record! {
    User => UserId, User;
    Address => AddressId, Address;
    PostalCode => PostalCodeId, PostalCode;
    Region => RegionId, Region;
    Country => CountryId, Country;
}

// =============================================================================
// Chain Result
// =============================================================================

/// A fully resolved chain, in resolution order.
pub type Chain = (User, Address, PostalCode, Region, Country);

/// Either the fully resolved chain or the first error encountered.
pub type ChainResult = Result<Chain, LookupError>;
