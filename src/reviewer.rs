use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::categorizer::CategorySuggester;
use crate::duplicates;
use crate::error::{CommitError, ImportError, Result};
use crate::ledger::get_account;
use crate::models::{ReviewResponse, ReviewSummary, TransactionCandidate};
use crate::normalizer::normalize;
use crate::ofx;
use crate::settings::Settings;

const ACCEPTED_EXTENSIONS: &[&str] = &["ofx", "qfx"];

#[derive(Debug, Clone)]
pub struct ReviewOptions {
    pub accept_empty: bool,
    pub min_similarity: f64,
}

impl From<&Settings> for ReviewOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            accept_empty: settings.accept_empty_statements,
            min_similarity: settings.min_similarity,
        }
    }
}

/// Boundary checks applied before any bytes are parsed.
pub fn check_upload(file_name: &str, size: u64, max_bytes: u64) -> Result<()> {
    let supported = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)));
    if !supported {
        return Err(ImportError::UnsupportedFileType(file_name.to_string()));
    }
    if size > max_bytes {
        return Err(ImportError::FileTooLarge { size, max: max_bytes });
    }
    Ok(())
}

/// Reads an upload from disk, rejecting it on name or size before reading.
pub fn read_upload(path: &Path, max_bytes: u64) -> Result<Vec<u8>> {
    let size = std::fs::metadata(path)?.len();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    check_upload(name, size, max_bytes)?;
    Ok(std::fs::read(path)?)
}

pub fn summarize(candidates: &[TransactionCandidate]) -> ReviewSummary {
    let duplicates = candidates.iter().filter(|c| c.is_duplicate).count();
    ReviewSummary {
        total: candidates.len(),
        new: candidates.len() - duplicates,
        duplicates,
    }
}

/// Parse, normalize, flag duplicates and suggest categories. Read-only.
pub fn review(
    conn: &Connection,
    bytes: &[u8],
    account_id: i64,
    options: &ReviewOptions,
) -> Result<ReviewResponse> {
    if get_account(conn, account_id)?.is_none() {
        return Err(CommitError::UnknownAccount(account_id).into());
    }

    let statement = if options.accept_empty {
        ofx::parse_allow_empty(bytes)?
    } else {
        ofx::parse(bytes)?
    };
    debug!(
        entries = statement.entries.len(),
        bank_id = %statement.bank_id,
        "parsed statement"
    );

    let mut candidates: Vec<TransactionCandidate> = statement.entries.iter().map(normalize).collect();
    duplicates::resolve(conn, account_id, &mut candidates)?;
    CategorySuggester::load(conn, options.min_similarity)?.apply(&mut candidates);

    let summary = summarize(&candidates);
    info!(
        account_id,
        total = summary.total,
        new = summary.new,
        duplicates = summary.duplicates,
        "statement reviewed"
    );

    Ok(ReviewResponse {
        bank_id: statement.bank_id,
        bank_account_id: statement.bank_account_id,
        account_type: statement.account_type,
        currency: statement.currency,
        balance: statement.closing_balance,
        start_date: statement.period_start,
        end_date: statement.period_end,
        transactions: candidates,
        summary,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Builds a minimal SGML statement from `(fitid, yyyymmdd, amount, name)`.
    pub fn statement(entries: &[(&str, &str, &str, &str)]) -> String {
        let mut body = String::from(
            "OFXHEADER:100\nDATA:OFXSGML\nVERSION:102\n\n<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><CURDEF>USD\n\
<BANKACCTFROM><BANKID>021000021<ACCTID>998877<ACCTTYPE>CHECKING</BANKACCTFROM>\n\
<BANKTRANLIST><DTSTART>20240101<DTEND>20240131\n",
        );
        for (id, date, amount, name) in entries {
            body.push_str(&format!(
                "<STMTTRN><TRNTYPE>OTHER<DTPOSTED>{date}<TRNAMT>{amount}<FITID>{id}<NAME>{name}</STMTTRN>\n"
            ));
        }
        body.push_str("</BANKTRANLIST><LEDGERBAL><BALAMT>500.00<DTASOF>20240131</LEDGERBAL></STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>\n");
        body
    }
}
