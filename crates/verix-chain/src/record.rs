//! # Chained Record Content
//!
//! `InvoiceRecord` holds the canonical content fields that feed the chain
//! digest. Everything else about an invoice (line items, recipients, the
//! wire document) is outside the chain's concern.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use verix_core::{InvoiceRef, Nif, Timestamp, ValidationError};

/// Invoice type code as declared to the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceType {
    /// Complete invoice.
    F1,
    /// Simplified invoice (ticket).
    F2,
    /// Invoice issued in substitution of simplified invoices.
    F3,
    /// Corrective invoice, legal error.
    R1,
    /// Corrective invoice, insolvency.
    R2,
    /// Corrective invoice, bad debt.
    R3,
    /// Corrective invoice, other causes.
    R4,
    /// Corrective simplified invoice.
    R5,
}

impl InvoiceType {
    /// Whether this is a corrective (rectifying) invoice.
    pub fn is_corrective(&self) -> bool {
        matches!(self, Self::R1 | Self::R2 | Self::R3 | Self::R4 | Self::R5)
    }
}

/// The canonical content of one chained record.
///
/// Amounts are decimal strings (`"121.00"`): canonicalization rejects
/// floats, and a string keeps the issuer's exact digits in the digest.
/// Deserialization goes through [`InvoiceRecord::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InvoiceRecordFields")]
pub struct InvoiceRecord {
    /// NIF of the invoice issuer (the chain's emitter).
    pub issuer: Nif,
    /// Invoice series and number.
    pub invoice: InvoiceRef,
    /// Date the invoice was issued.
    pub issue_date: NaiveDate,
    /// Invoice type code.
    pub invoice_type: InvoiceType,
    /// Total tax, decimal string.
    pub total_tax: String,
    /// Total invoice amount, decimal string.
    pub total_amount: String,
    /// When this record was generated.
    pub generated_at: Timestamp,
}

impl InvoiceRecord {
    /// Build a record, validating both amounts.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] if either amount is not a
    /// plain decimal string.
    pub fn new(
        issuer: Nif,
        invoice: InvoiceRef,
        issue_date: NaiveDate,
        invoice_type: InvoiceType,
        total_tax: impl Into<String>,
        total_amount: impl Into<String>,
        generated_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let total_tax = validate_amount(total_tax.into())?;
        let total_amount = validate_amount(total_amount.into())?;
        Ok(Self {
            issuer,
            invoice,
            issue_date,
            invoice_type,
            total_tax,
            total_amount,
            generated_at,
        })
    }
}

#[derive(Deserialize)]
struct InvoiceRecordFields {
    issuer: Nif,
    invoice: InvoiceRef,
    issue_date: NaiveDate,
    invoice_type: InvoiceType,
    total_tax: String,
    total_amount: String,
    generated_at: Timestamp,
}

impl TryFrom<InvoiceRecordFields> for InvoiceRecord {
    type Error = ValidationError;

    fn try_from(f: InvoiceRecordFields) -> Result<Self, Self::Error> {
        Self::new(
            f.issuer,
            f.invoice,
            f.issue_date,
            f.invoice_type,
            f.total_tax,
            f.total_amount,
            f.generated_at,
        )
    }
}

/// Accepts `-?[0-9]+(\.[0-9]{1,2})?`.
fn validate_amount(value: String) -> Result<String, ValidationError> {
    let unsigned = value.strip_prefix('-').unwrap_or(&value);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let int_ok = !int_part.is_empty() && int_part.bytes().all(|b| b.is_ascii_digit());
    let frac_ok = match frac_part {
        Some(f) => (1..=2).contains(&f.len()) && f.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    };
    if int_ok && frac_ok {
        Ok(value)
    } else {
        Err(ValidationError::InvalidAmount(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tax: &str, total: &str) -> Result<InvoiceRecord, ValidationError> {
        InvoiceRecord::new(
            Nif::new("B12345678").unwrap(),
            InvoiceRef::new("F-2026/0001").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            InvoiceType::F1,
            tax,
            total,
            Timestamp::parse("2026-03-01T10:00:00Z").unwrap(),
        )
    }

    #[test]
    fn accepts_plain_decimals() {
        assert!(record("21.00", "121.00").is_ok());
        assert!(record("0", "100").is_ok());
        assert!(record("-21.5", "-121.50").is_ok());
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", "-", "1.", ".5", "1.234", "1,00", "1e3", "12a", "--1"] {
            assert!(record(bad, "1.00").is_err(), "accepted tax {bad:?}");
            assert!(record("1.00", bad).is_err(), "accepted total {bad:?}");
        }
    }

    #[test]
    fn corrective_types() {
        assert!(!InvoiceType::F1.is_corrective());
        assert!(!InvoiceType::F3.is_corrective());
        assert!(InvoiceType::R1.is_corrective());
        assert!(InvoiceType::R5.is_corrective());
    }

    #[test]
    fn issue_date_serializes_as_iso_date() {
        let json = serde_json::to_value(record("21.00", "121.00").unwrap()).unwrap();
        assert_eq!(json["issue_date"], "2026-03-01");
        assert_eq!(json["invoice_type"], "F1");
        assert_eq!(json["generated_at"], "2026-03-01T10:00:00Z");
    }

    fn record_json(tax: &str, total: &str, generated_at: &str) -> String {
        serde_json::json!({
            "issuer": "B12345678",
            "invoice": "F-2026/0001",
            "issue_date": "2026-03-01",
            "invoice_type": "F1",
            "total_tax": tax,
            "total_amount": total,
            "generated_at": generated_at,
        })
        .to_string()
    }

    #[test]
    fn deserialize_matches_constructor() {
        let parsed: InvoiceRecord =
            serde_json::from_str(&record_json("21.00", "121.00", "2026-03-01T10:00:00Z")).unwrap();
        assert_eq!(parsed, record("21.00", "121.00").unwrap());
    }

    #[test]
    fn deserialize_rejects_what_new_rejects() {
        for (tax, total, ts) in [
            ("1e3", "121.00", "2026-03-01T10:00:00Z"),
            ("21.00", "12,5", "2026-03-01T10:00:00Z"),
            ("21.00", "121.00", "2026-03-01T10:00:00.750+01:00"),
        ] {
            let res: Result<InvoiceRecord, _> = serde_json::from_str(&record_json(tax, total, ts));
            assert!(res.is_err(), "accepted tax={tax} total={total} ts={ts}");
        }
    }
}
