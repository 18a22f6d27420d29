use std::collections::{HashMap, HashSet};

use regex::Regex;
use rusqlite::Connection;
use tracing::warn;

use crate::error::Result;
use crate::models::TransactionCandidate;

pub const DEFAULT_MIN_SIMILARITY: f64 = 0.5;

/// Shorter strings than this never count as a substring match.
const MIN_SUBSTRING_LEN: usize = 3;

fn tokens(upper: &str) -> HashSet<String> {
    upper
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2 && !t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

fn normalize_text(description: &str) -> String {
    description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Case-insensitive similarity in `[0, 1]`: a substring hit scores 1.0,
/// otherwise the Jaccard overlap of the word tokens.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize_text(a), normalize_text(b));
    score(&a, &tokens(&a), &b, &tokens(&b))
}

fn score(a: &str, a_tokens: &HashSet<String>, b: &str, b_tokens: &HashSet<String>) -> f64 {
    let shorter = a.chars().count().min(b.chars().count());
    if shorter >= MIN_SUBSTRING_LEN && (a.contains(b) || b.contains(a)) {
        return 1.0;
    }
    let union = a_tokens.union(b_tokens).count();
    if union == 0 {
        return 0.0;
    }
    a_tokens.intersection(b_tokens).count() as f64 / union as f64
}

struct Rule {
    pattern: String,
    match_type: String,
    /// Compiled once at load; `None` for non-regex rules and bad patterns.
    regex: Option<Regex>,
    category_id: i64,
    category_type: String,
}

impl Rule {
    fn matches(&self, description: &str) -> bool {
        match self.match_type.as_str() {
            "contains" => description.to_uppercase().contains(&self.pattern.to_uppercase()),
            "starts_with" => description.to_uppercase().starts_with(&self.pattern.to_uppercase()),
            "regex" => self.regex.as_ref().is_some_and(|re| re.is_match(description)),
            _ => false,
        }
    }
}

fn compile_rule(pattern: &str, match_type: &str) -> Option<Regex> {
    if match_type != "regex" {
        return None;
    }
    Regex::new(pattern)
        .inspect_err(|e| warn!(pattern, error = %e, "skipping rule with invalid regex"))
        .ok()
}

struct HistoryEntry {
    id: i64,
    date: String,
    text: String,
    tokens: HashSet<String>,
    category_id: i64,
    category_type: String,
}

/// Advisory category guesses from a snapshot of rules and past transactions.
pub struct CategorySuggester {
    rules: Vec<Rule>,
    history: Vec<HistoryEntry>,
    min_similarity: f64,
}

impl CategorySuggester {
    pub fn load(conn: &Connection, min_similarity: f64) -> Result<Self> {
        let mut rule_stmt = conn.prepare(
            "SELECT r.pattern, r.match_type, r.category_id, c.category_type \
             FROM rules r JOIN categories c ON r.category_id = c.id \
             WHERE r.is_active = 1 AND c.is_active = 1 ORDER BY r.priority DESC, r.id",
        )?;
        let rules = rule_stmt
            .query_map([], |row| {
                let pattern: String = row.get(0)?;
                let match_type: String = row.get(1)?;
                Ok(Rule {
                    regex: compile_rule(&pattern, &match_type),
                    pattern,
                    match_type,
                    category_id: row.get(2)?,
                    category_type: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut txn_stmt = conn.prepare(
            "SELECT t.id, t.date, t.description, t.category_id, c.category_type \
             FROM transactions t JOIN categories c ON t.category_id = c.id \
             WHERE c.is_active = 1",
        )?;
        let history = txn_stmt
            .query_map([], |row| {
                let description: String = row.get(2)?;
                let text = normalize_text(&description);
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    tokens: tokens(&text),
                    text,
                    category_id: row.get(3)?,
                    category_type: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            history,
            min_similarity,
        })
    }

    pub fn suggest(&self, candidate: &TransactionCandidate) -> Option<i64> {
        let wanted = candidate.direction.category_type();

        if let Some(rule) = self.rules.iter().find(|r| {
            r.category_type == wanted && r.matches(&candidate.description)
        }) {
            return Some(rule.category_id);
        }

        let text = normalize_text(&candidate.description);
        if text.is_empty() {
            return None;
        }
        let text_tokens = tokens(&text);

        let mut best = 0.0_f64;
        let mut closest: Vec<&HistoryEntry> = Vec::new();
        for entry in self.history.iter().filter(|h| h.category_type == wanted) {
            let s = score(&text, &text_tokens, &entry.text, &entry.tokens);
            if s < self.min_similarity {
                continue;
            }
            if s > best + f64::EPSILON {
                best = s;
                closest.clear();
                closest.push(entry);
            } else if (s - best).abs() <= f64::EPSILON {
                closest.push(entry);
            }
        }

        // Most frequent category among the closest matches; ties go to the
        // category used most recently.
        let mut tally: HashMap<i64, (usize, &str, i64)> = HashMap::new();
        for entry in closest {
            let slot = tally
                .entry(entry.category_id)
                .or_insert((0, entry.date.as_str(), entry.id));
            slot.0 += 1;
            if (entry.date.as_str(), entry.id) > (slot.1, slot.2) {
                slot.1 = entry.date.as_str();
                slot.2 = entry.id;
            }
        }
        tally
            .into_iter()
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(category_id, _)| category_id)
    }

    /// Fills `suggested_category_id` for every non-duplicate candidate.
    pub fn apply(&self, candidates: &mut [TransactionCandidate]) {
        for candidate in candidates.iter_mut() {
            candidate.suggested_category_id = if candidate.is_duplicate {
                None
            } else {
                self.suggest(candidate)
            };
        }
    }
}
