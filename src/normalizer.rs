use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::models::{Direction, RawEntry, TransactionCandidate};

pub const SYNTHETIC_ID_PREFIX: &str = "SYN-";

/// Deterministic stand-in for a missing issuer id.
///
/// Two genuinely identical entries (same day, amount and description) hash to
/// the same id, so only the first of them can ever be imported.
pub fn synthesize_external_id(date: NaiveDate, signed_amount: Decimal, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(signed_amount.normalize().to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(description.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{SYNTHETIC_ID_PREFIX}{}", &digest[..32])
}

pub fn normalize(entry: &RawEntry) -> TransactionCandidate {
    let description = entry.raw_description.trim().to_string();
    let external_id = match entry.external_id.trim() {
        "" => synthesize_external_id(entry.posted_date, entry.signed_amount, &description),
        id => id.to_string(),
    };
    TransactionCandidate {
        external_id,
        date: entry.posted_date,
        amount: entry.signed_amount.abs(),
        direction: Direction::from_signed(entry.signed_amount),
        description,
        is_duplicate: false,
        selected: true,
        suggested_category_id: None,
        zero_amount: entry.signed_amount.is_zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, amount: Decimal, desc: &str) -> RawEntry {
        RawEntry {
            external_id: id.to_string(),
            posted_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            signed_amount: amount,
            raw_description: desc.to_string(),
            raw_memo: None,
        }
    }

    #[test]
    fn test_debit_maps_to_unsigned_amount() {
        let c = normalize(&entry("A1", Decimal::new(-3520, 2), "Market"));
        assert_eq!(c.external_id, "A1");
        assert_eq!(c.amount, Decimal::new(3520, 2));
        assert_eq!(c.direction, Direction::Debit);
        assert!(c.selected);
        assert!(!c.zero_amount);
    }

    #[test]
    fn test_credit_and_zero_amount() {
        let c = normalize(&entry("A2", Decimal::new(10000, 2), "Payroll"));
        assert_eq!(c.direction, Direction::Credit);
        let z = normalize(&entry("A3", Decimal::ZERO, "Adjustment"));
        assert!(z.zero_amount);
        assert_eq!(z.amount, Decimal::ZERO);
    }

    #[test]
    fn test_missing_id_is_synthesized_deterministically() {
        let a = normalize(&entry("", Decimal::new(-350, 2), "Coffee"));
        let b = normalize(&entry("  ", Decimal::new(-3500, 3), "Coffee"));
        assert!(a.external_id.starts_with(SYNTHETIC_ID_PREFIX));
        assert_eq!(a.external_id, b.external_id);
        let c = normalize(&entry("", Decimal::new(-350, 2), "Tea"));
        assert_ne!(a.external_id, c.external_id);
    }
}
