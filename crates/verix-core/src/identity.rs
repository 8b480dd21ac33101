//! # Identifier Newtypes
//!
//! Newtype wrappers for the identifiers that flow through submission and
//! chaining. You cannot pass an `InvoiceRef` where an `EmitterId` is
//! expected, and string-backed identifiers are validated on construction
//! and on deserialization alike.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Implements `Deserialize` by routing the raw string through `Self::new`,
/// so a deserialized value obeys the same invariants as a constructed one.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Maximum length of an invoice series + number.
pub const INVOICE_REF_MAX_LEN: usize = 60;

/// Spanish tax identification number (NIF).
///
/// # Validation
///
/// - Exactly 9 ASCII alphanumeric characters.
/// - Stored uppercase; `"b12345678"` and `"B12345678"` are the same NIF.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Nif(String);

impl_validating_deserialize!(Nif);

impl Nif {
    /// Create a NIF, validating and uppercasing it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNif`] unless the value is exactly
    /// 9 ASCII alphanumeric characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.len() != 9 || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidNif(s));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Access the NIF string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Nif {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The party whose records form one hash chain.
///
/// Each emitter owns exactly one chain; the last confirmed digest is keyed
/// by `EmitterId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmitterId(Nif);

impl EmitterId {
    /// Create an emitter identifier from a validated NIF.
    pub fn new(nif: Nif) -> Self {
        Self(nif)
    }

    /// Parse an emitter identifier from a raw NIF string.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        Nif::new(value).map(Self)
    }

    /// The NIF of the emitter.
    pub fn nif(&self) -> &Nif {
        &self.0
    }
}

impl std::fmt::Display for EmitterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "emitter:{}", self.0)
    }
}

/// Invoice series and number as printed on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InvoiceRef(String);

impl_validating_deserialize!(InvoiceRef);

impl InvoiceRef {
    /// Create an invoice reference.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInvoiceRef`] if the value is empty,
    /// blank, or longer than [`INVOICE_REF_MAX_LEN`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::InvalidInvoiceRef {
                value: s,
                reason: "must not be empty",
            });
        }
        if s.chars().count() > INVOICE_REF_MAX_LEN {
            return Err(ValidationError::InvalidInvoiceRef {
                value: s,
                reason: "longer than 60 characters",
            });
        }
        Ok(Self(s))
    }

    /// Access the reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one submission session, used to correlate log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nif_accepts_nine_alphanumerics() {
        let nif = Nif::new("B12345678").unwrap();
        assert_eq!(nif.as_str(), "B12345678");
    }

    #[test]
    fn nif_is_uppercased() {
        assert_eq!(Nif::new("x1234567l").unwrap().as_str(), "X1234567L");
        assert_eq!(Nif::new("x1234567l").unwrap(), Nif::new("X1234567L").unwrap());
    }

    #[test]
    fn nif_rejects_bad_length_and_symbols() {
        assert!(Nif::new("").is_err());
        assert!(Nif::new("12345678").is_err());
        assert!(Nif::new("1234567890").is_err());
        assert!(Nif::new("1234-5678").is_err());
        assert!(Nif::new("ÑÑÑÑÑÑÑÑÑ").is_err());
    }

    #[test]
    fn nif_deserialize_validates() {
        let ok: Result<Nif, _> = serde_json::from_str("\"A12345678\"");
        assert!(ok.is_ok());
        let bad: Result<Nif, _> = serde_json::from_str("\"short\"");
        assert!(bad.is_err());
    }

    #[test]
    fn emitter_id_is_transparent_in_json() {
        let emitter = EmitterId::parse("B12345678").unwrap();
        assert_eq!(serde_json::to_string(&emitter).unwrap(), "\"B12345678\"");
        assert_eq!(emitter.to_string(), "emitter:B12345678");
        let back: EmitterId = serde_json::from_str("\"B12345678\"").unwrap();
        assert_eq!(back, emitter);
    }

    #[test]
    fn invoice_ref_bounds() {
        assert!(InvoiceRef::new("F-2026/0001").is_ok());
        assert!(InvoiceRef::new("").is_err());
        assert!(InvoiceRef::new("   ").is_err());
        assert!(InvoiceRef::new("x".repeat(INVOICE_REF_MAX_LEN)).is_ok());
        assert!(InvoiceRef::new("x".repeat(INVOICE_REF_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert!(SessionId::new().to_string().starts_with("session:"));
    }
}
