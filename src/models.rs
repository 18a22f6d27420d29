use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: String,
    pub institution: Option<String>,
    pub balance: Decimal,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub category_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn from_signed(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Self::Debit
        } else {
            Self::Credit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// The ledger's category type for this direction.
    pub fn category_type(&self) -> &'static str {
        match self {
            Self::Credit => "income",
            Self::Debit => "expense",
        }
    }

    /// Apply this direction's sign to an unsigned magnitude.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

/// Normalized in-memory form of one statement file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub bank_id: String,
    pub bank_account_id: String,
    pub account_type: String,
    pub currency: String,
    pub closing_balance: Option<Decimal>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub entries: Vec<RawEntry>,
}

/// One transaction record exactly as the issuer reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub external_id: String,
    pub posted_date: NaiveDate,
    pub signed_amount: Decimal,
    pub raw_description: String,
    pub raw_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCandidate {
    pub external_id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub direction: Direction,
    pub description: String,
    pub is_duplicate: bool,
    pub selected: bool,
    pub suggested_category_id: Option<i64>,
    /// Zero-value statement lines are kept but cannot be committed as-is.
    pub zero_amount: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub total: usize,
    pub new: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub bank_id: String,
    pub bank_account_id: String,
    pub account_type: String,
    pub currency: String,
    pub balance: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transactions: Vec<TransactionCandidate>,
    pub summary: ReviewSummary,
}

fn default_selected() -> bool {
    true
}

/// One transaction the caller wants committed. `isDuplicate`/`selected` may be
/// echoed back from the review payload; they default to a plain selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitTransaction {
    #[serde(default)]
    pub external_id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub direction: Direction,
    pub description: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

impl From<&TransactionCandidate> for CommitTransaction {
    fn from(c: &TransactionCandidate) -> Self {
        Self {
            external_id: c.external_id.clone(),
            date: c.date,
            amount: c.amount,
            direction: c.direction,
            description: c.description.clone(),
            category_id: c.suggested_category_id,
            is_duplicate: c.is_duplicate,
            selected: c.selected,
        }
    }
}

/// The unit of commit, deserialized straight from a commit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    #[serde(rename = "accountId")]
    pub target_account_id: i64,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub bank_id: Option<String>,
    #[serde(default)]
    pub bank_account_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub transactions: Vec<CommitTransaction>,
    pub adjust_balance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReceipt {
    pub imported: usize,
    pub duplicates_skipped: usize,
    pub balance_change: Decimal,
}
