//! Domain validation error.

use crate::enums::Domain;

/// A value was not a member of the relevant closed domain.
///
/// Produced by the `FromStr` implementations in [`crate::enums`]. Callers
/// at the transport boundary turn it into a rejection response or a
/// log-and-drop; it never reaches the avatar state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {domain} value: {value:?}")]
pub struct InvalidDomainValue {
    /// The domain the value was checked against.
    pub domain: Domain,
    /// The rejected value, verbatim.
    pub value: String,
}

impl InvalidDomainValue {
    /// Build the error for `value` rejected by `domain`.
    pub fn new(domain: Domain, value: impl Into<String>) -> Self {
        Self {
            domain,
            value: value.into(),
        }
    }
}
