//! OFX/QFX statement parser.
//!
//! Handles both OFX 1.x (SGML, leaf elements without closing tags) and
//! OFX 2.x (XML). Works on a flat token stream rather than a strict tree so
//! that missing or stray closing tags never abort a parse.

use std::str::FromStr;

use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::models::{ParsedStatement, RawEntry};

pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Aggregates that never appear inside a `<STMTTRN>`. Opening one of these
/// while a transaction is still open means its closing tag was left out.
const ENDS_TRANSACTION: &[&str] = &[
    "STMTTRN",
    "BANKTRANLIST",
    "LEDGERBAL",
    "AVAILBAL",
    "BALLIST",
    "STMTRS",
    "CCSTMTRS",
    "STMTTRNRS",
    "CCSTMTTRNRS",
    "BANKACCTFROM",
    "CCACCTFROM",
];

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Best-effort text decode. Strict UTF-8 first. Otherwise the charset the
/// header declares, with windows-1252 for OFX 1.x defaults and Latin-1 when
/// the declaration names nothing we know.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let header = parse_header(header_text(bytes));
    match legacy_encoding(&header) {
        Some(encoding) => {
            debug!(encoding = encoding.name(), "statement is not valid UTF-8");
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            text.into_owned()
        }
        None => {
            debug!(charset = ?header.charset, "unknown charset, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// The header portion before `<OFX>`. Header lines are plain ASCII, so
/// anything undecodable is cut off there.
fn header_text(bytes: &[u8]) -> &str {
    let end = bytes
        .windows(5)
        .position(|w| w.eq_ignore_ascii_case(b"<OFX>"))
        .unwrap_or(bytes.len());
    let head = &bytes[..end];
    match std::str::from_utf8(head) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&head[..e.valid_up_to()]).unwrap_or_default(),
    }
}

/// Encoding to use once UTF-8 has failed. `None` means no usable declaration.
fn legacy_encoding(header: &OfxHeader) -> Option<&'static Encoding> {
    let declared = header
        .charset
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("NONE"));
    let Some(charset) = declared else {
        return Some(WINDOWS_1252);
    };
    if charset == "1252" {
        return Some(WINDOWS_1252);
    }
    match Encoding::for_label(charset.as_bytes()) {
        // The bytes already failed UTF-8; fall back to the OFX 1.x default.
        Some(encoding) if encoding == UTF_8 => Some(WINDOWS_1252),
        other => other,
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct OfxHeader {
    pub version: Option<String>,
    pub encoding: Option<String>,
    pub charset: Option<String>,
}

/// Reads `KEY:VALUE` lines (OFX 1.x) or `KEY="VALUE"` pairs from an
/// `<?OFX ...?>` processing instruction (OFX 2.x). Unknown keys are ignored.
fn parse_header(text: &str) -> OfxHeader {
    let mut header = OfxHeader::default();
    let mut set = |key: &str, value: &str| {
        let value = value.trim().trim_matches('"').to_string();
        match key.trim().to_ascii_uppercase().as_str() {
            "VERSION" => header.version = Some(value),
            "ENCODING" => header.encoding = Some(value),
            "CHARSET" => header.charset = Some(value),
            _ => {}
        }
    };
    for line in text.lines() {
        let line = line.trim();
        if let Some(pi) = line.strip_prefix("<?OFX").or_else(|| line.strip_prefix("<?ofx")) {
            for pair in pi.trim_end_matches("?>").split_whitespace() {
                if let Some((k, v)) = pair.split_once('=') {
                    set(k, v);
                }
            }
        } else if let Some((k, v)) = line.split_once(':') {
            set(k, v);
        }
    }
    header
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Leaf(String, String),
    Close(String),
}

fn tag_name(raw: &str) -> String {
    raw.split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn tokenize(body: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find('<') {
        rest = &rest[start + 1..];
        let Some(end) = rest.find('>') else { break };
        let tag = rest[..end].trim();
        rest = &rest[end + 1..];
        let text_end = rest.find('<').unwrap_or(rest.len());
        let text = rest[..text_end].trim();

        if tag.is_empty() || tag.starts_with('?') || tag.starts_with('!') || tag.ends_with('/') {
            continue;
        }
        if let Some(name) = tag.strip_prefix('/') {
            tokens.push(Token::Close(tag_name(name)));
        } else if text.is_empty() {
            tokens.push(Token::Open(tag_name(tag)));
        } else {
            tokens.push(Token::Leaf(tag_name(tag), unescape(text)));
        }
    }
    tokens
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Exact decimal parse. Accepts a leading `+` and a comma decimal separator;
/// anything else that is not a plain number yields `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let s = s.strip_prefix('+').unwrap_or(&s);
    let s = if s.contains(',') && s.contains('.') {
        s.replace(',', "")
    } else {
        s.replace(',', ".")
    };
    let digits = s.strip_prefix('-').unwrap_or(&s);
    if digits.is_empty()
        || !digits.chars().any(|c| c.is_ascii_digit())
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }
    Decimal::from_str(&s).ok()
}

/// Normalizes the date variants seen in the wild to a calendar date.
/// OFX datetimes (`YYYYMMDD[HHMMSS[.XXX]][[-5:EST]]`) keep only the day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 8 {
        let y: i32 = digits[0..4].parse().ok()?;
        let m: u32 = digits[4..6].parse().ok()?;
        let d: u32 = digits[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    let day = raw.split(['T', ' ']).next().unwrap_or(raw);
    ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// Collapses internal whitespace and caps the length on a char boundary.
pub fn clean_description(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(MAX_DESCRIPTION_LEN) {
        Some((idx, _)) => collapsed[..idx].trim_end().to_string(),
        None => collapsed,
    }
}

// ---------------------------------------------------------------------------
// Statement assembly
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EntryBuilder {
    fitid: Option<String>,
    posted: Option<String>,
    amount: Option<String>,
    name: Option<String>,
    memo: Option<String>,
}

impl EntryBuilder {
    fn set(&mut self, name: &str, value: String) {
        match name {
            "FITID" => self.fitid = Some(value),
            "DTPOSTED" => self.posted = Some(value),
            "TRNAMT" => self.amount = Some(value),
            // PAYEE aggregates carry their own NAME; the first one wins.
            "NAME" if self.name.is_none() => self.name = Some(value),
            "MEMO" => self.memo = Some(value),
            _ => {}
        }
    }

    fn finish(self) -> Result<RawEntry, ParseError> {
        let external_id = self.fitid.map(|s| s.trim().to_string()).unwrap_or_default();
        let raw_amount = self.amount.unwrap_or_default();
        let signed_amount =
            parse_amount(&raw_amount).ok_or_else(|| ParseError::MalformedAmount {
                external_id: external_id.clone(),
                raw: raw_amount.clone(),
            })?;
        let raw_posted = self.posted.unwrap_or_default();
        let posted_date =
            parse_date(&raw_posted).ok_or(ParseError::MalformedDate { raw: raw_posted })?;
        let raw_memo = self
            .memo
            .map(|m| clean_description(&m))
            .filter(|m| !m.is_empty());
        let name = self.name.map(|n| clean_description(&n)).unwrap_or_default();
        let raw_description = if name.is_empty() {
            raw_memo.clone().unwrap_or_default()
        } else {
            name
        };
        Ok(RawEntry {
            external_id,
            posted_date,
            signed_amount,
            raw_description,
            raw_memo,
        })
    }
}

#[derive(Default)]
struct StatementBuilder {
    bank_id: String,
    bank_account_id: String,
    account_type: String,
    currency: String,
    credit_card: bool,
    closing_balance: Option<Decimal>,
    period_start: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
    entries: Vec<RawEntry>,
    current: Option<EntryBuilder>,
}

impl StatementBuilder {
    fn flush(&mut self) -> Result<(), ParseError> {
        if let Some(entry) = self.current.take() {
            self.entries.push(entry.finish()?);
        }
        Ok(())
    }

    fn leaf(&mut self, stack: &[String], name: &str, value: String) {
        if let Some(entry) = self.current.as_mut() {
            entry.set(name, value);
            return;
        }
        match name {
            "BANKID" => self.bank_id = value,
            "ACCTID" => self.bank_account_id = value,
            "ACCTTYPE" => self.account_type = value,
            "CURDEF" => self.currency = value,
            "DTSTART" => self.period_start = optional_date("DTSTART", &value),
            "DTEND" => self.period_end = optional_date("DTEND", &value),
            "BALAMT" if stack.last().is_some_and(|s| s == "LEDGERBAL") => {
                self.closing_balance = parse_amount(&value);
                if self.closing_balance.is_none() {
                    warn!(raw = %value, "ignoring unparseable closing balance");
                }
            }
            _ => {}
        }
    }

    fn build(mut self) -> Result<ParsedStatement, ParseError> {
        self.flush()?;
        if self.account_type.is_empty() && self.credit_card {
            self.account_type = "CREDITCARD".to_string();
        }
        let (mut start, mut end) = (self.period_start, self.period_end);
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                warn!(%s, %e, "statement period is reversed, swapping");
                (start, end) = (Some(e), Some(s));
            }
        }
        Ok(ParsedStatement {
            bank_id: self.bank_id,
            bank_account_id: self.bank_account_id,
            account_type: self.account_type,
            currency: self.currency,
            closing_balance: self.closing_balance,
            period_start: start,
            period_end: end,
            entries: self.entries,
        })
    }
}

fn optional_date(field: &str, raw: &str) -> Option<NaiveDate> {
    let date = parse_date(raw);
    if date.is_none() {
        warn!(field, raw, "ignoring unparseable statement date");
    }
    date
}

/// Parses a statement, surfacing an empty transaction list as
/// `ParseError::EmptyStatement`.
pub fn parse(bytes: &[u8]) -> Result<ParsedStatement, ParseError> {
    let statement = parse_allow_empty(bytes)?;
    if statement.entries.is_empty() {
        return Err(ParseError::EmptyStatement);
    }
    Ok(statement)
}

/// Parses a statement; zero entries is not an error here.
pub fn parse_allow_empty(bytes: &[u8]) -> Result<ParsedStatement, ParseError> {
    let text = decode(bytes);
    let start = text
        .to_ascii_uppercase()
        .find("<OFX>")
        .ok_or(ParseError::NotAStatementFile)?;

    let header = parse_header(&text[..start]);
    debug!(?header, "parsed statement header");

    let mut builder = StatementBuilder::default();
    let mut stack: Vec<String> = Vec::new();

    for token in tokenize(&text[start..]) {
        match token {
            Token::Open(name) => {
                if builder.current.is_some() && ENDS_TRANSACTION.contains(&name.as_str()) {
                    builder.flush()?;
                    if let Some(pos) = stack.iter().rposition(|s| s == "STMTTRN") {
                        stack.truncate(pos);
                    }
                }
                match name.as_str() {
                    "STMTTRN" => builder.current = Some(EntryBuilder::default()),
                    "CCSTMTRS" | "CCACCTFROM" => builder.credit_card = true,
                    _ => {}
                }
                stack.push(name);
            }
            Token::Close(name) => {
                if let Some(pos) = stack.iter().rposition(|s| *s == name) {
                    let closed = stack.split_off(pos);
                    if closed.iter().any(|s| s == "STMTTRN") {
                        builder.flush()?;
                    }
                } else if name == "STMTTRN" {
                    builder.flush()?;
                }
            }
            Token::Leaf(name, value) => builder.leaf(&stack, &name, value),
        }
    }

    builder.build()
}
