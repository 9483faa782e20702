//! Error taxonomy for the lookup chain.
//!
//! Three distinct error types live here and never convert into one another
//! implicitly:
//!
//! - [`LookupError`]: the closed set of expected failures of a lookup.
//!   Adding a variant is a breaking change; every consumer matches it
//!   exhaustively.
//! - [`StoreError`]: a fault reported by the backing store. The lookup layer
//!   translates each one into exactly one [`LookupError`] variant.
//! - [`Defect`]: an unexpected fault (a panic inside a captured
//!   computation). It is never coerced into a [`LookupError`].

use std::any::Any;
use std::fmt::Display;
use std::time::Duration;

use thiserror::Error;

use super::EntityKind;

// =============================================================================
// LookupError
// =============================================================================

/// The closed set of failures a lookup may produce.
///
/// Every variant carries a human-readable message naming the entity kind and
/// identifier involved.
///
/// # Examples
///
/// ```rust
/// use run_wild::domain::{EntityKind, LookupError};
///
/// let error = LookupError::not_found(EntityKind::User, 2);
/// assert_eq!(error, LookupError::NotFound("User 2 not found".to_string()));
/// assert_eq!(error.message(), "User 2 not found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LookupError {
    /// The identifier resolved to nothing.
    #[error("NotFound: {0}")]
    NotFound(String),
    /// The store reported more than one match for the identifier.
    #[error("DuplicateFound: {0}")]
    DuplicateFound(String),
    /// The store did not answer within the allotted bound.
    #[error("Timeout: {0}")]
    Timeout(String),
    /// The store could not be reached at all.
    #[error("HostUnreachable: {0}")]
    HostUnreachable(String),
}

impl LookupError {
    /// A miss for `id` of the given kind.
    pub fn not_found(kind: EntityKind, id: impl Display) -> Self {
        Self::NotFound(format!("{kind} {id} not found"))
    }

    /// More than one row matched `id`.
    pub fn duplicate_found(kind: EntityKind, id: impl Display, matches: usize) -> Self {
        Self::DuplicateFound(format!("{kind} {id} matched {matches} records"))
    }

    /// The lookup for `id` did not finish within `after`.
    pub fn timeout(kind: EntityKind, id: impl Display, after: Duration) -> Self {
        Self::Timeout(format!("{kind} {id} lookup timed out after {after:?}"))
    }

    /// The host serving `kind` could not be reached.
    pub fn host_unreachable(kind: EntityKind, id: impl Display, host: &str) -> Self {
        Self::HostUnreachable(format!("{kind} {id} lookup failed: host {host} unreachable"))
    }

    /// Translates a store fault for `id` into its lookup error.
    pub fn from_store(kind: EntityKind, id: impl Display, error: StoreError) -> Self {
        match error {
            StoreError::DuplicateMatches { matches } => Self::duplicate_found(kind, id, matches),
            StoreError::Elapsed { after } => Self::timeout(kind, id, after),
            StoreError::Unreachable { host } => Self::host_unreachable(kind, id, &host),
        }
    }

    /// Returns the message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(message)
            | Self::DuplicateFound(message)
            | Self::Timeout(message)
            | Self::HostUnreachable(message) => message,
        }
    }

    /// Returns the variant name, for logs and structural comparison.
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::DuplicateFound(_) => "DuplicateFound",
            Self::Timeout(_) => "Timeout",
            Self::HostUnreachable(_) => "HostUnreachable",
        }
    }
}

// =============================================================================
// StoreError
// =============================================================================

/// A fault reported by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// More than one row is stored under the requested identifier.
    #[error("{matches} rows matched")]
    DuplicateMatches {
        /// Number of rows found.
        matches: usize,
    },
    /// The store gave up waiting on its own upstream.
    #[error("no answer after {after:?}")]
    Elapsed {
        /// How long the store waited.
        after: Duration,
    },
    /// The host serving the table could not be reached.
    #[error("host {host} unreachable")]
    Unreachable {
        /// Name of the host.
        host: String,
    },
}

// =============================================================================
// Defect
// =============================================================================

/// An unexpected fault raised while running a captured computation.
///
/// Defects are not part of the lookup taxonomy: they signal a bug in the
/// backing collaborator, not a missing record.
///
/// # Examples
///
/// ```rust
/// use run_wild::domain::Defect;
///
/// let payload: Box<dyn std::any::Any + Send> = Box::new("disk on fire");
/// let defect = Defect::from_panic(payload);
/// assert_eq!(defect.message(), "disk on fire");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("defect: {message}")]
pub struct Defect {
    message: String,
}

impl Defect {
    /// Creates a defect with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a defect from a panic payload.
    ///
    /// `&str` and `String` payloads keep their text; anything else is
    /// reported as `"unknown panic"`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic".to_string()
        };
        Self { message }
    }

    /// Returns the defect message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(feature = "async")]
impl From<tokio::task::JoinError> for Defect {
    fn from(error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            Self::from_panic(error.into_panic())
        } else {
            Self::new("task cancelled")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn not_found_names_kind_and_id() {
        assert_eq!(
            LookupError::not_found(EntityKind::Address, 10),
            LookupError::NotFound("Address 10 not found".to_string())
        );
    }

    #[rstest]
    #[case(
        StoreError::DuplicateMatches { matches: 2 },
        LookupError::DuplicateFound("Region 30 matched 2 records".to_string())
    )]
    #[case(
        StoreError::Elapsed { after: Duration::from_millis(5) },
        LookupError::Timeout("Region 30 lookup timed out after 5ms".to_string())
    )]
    #[case(
        StoreError::Unreachable { host: "regions.internal".to_string() },
        LookupError::HostUnreachable(
            "Region 30 lookup failed: host regions.internal unreachable".to_string()
        )
    )]
    fn store_errors_translate_to_one_variant(
        #[case] store_error: StoreError,
        #[case] expected: LookupError,
    ) {
        assert_eq!(
            LookupError::from_store(EntityKind::Region, 30, store_error),
            expected
        );
    }

    #[rstest]
    fn display_prefixes_variant_name() {
        let error = LookupError::not_found(EntityKind::User, 2);
        assert_eq!(error.to_string(), "NotFound: User 2 not found");
        assert_eq!(error.variant_name(), "NotFound");
    }

    #[rstest]
    fn defect_keeps_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(Defect::from_panic(payload).message(), "boom");
    }

    #[rstest]
    fn defect_reports_opaque_payload_as_unknown() {
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(Defect::from_panic(payload).message(), "unknown panic");
    }

    #[rstest]
    fn defect_display() {
        assert_eq!(Defect::new("oops").to_string(), "defect: oops");
    }
}
