//! Predicate parsing and evaluation for ad-hoc scans.
//!
//! A predicate is one `column = value` / `column != value` comparison, or
//! several joined entirely by `and` or entirely by `or`.

use crate::error::{CacheError, Result};

use super::entry::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
}

/// One `column op value` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub column: String,
    pub op: Operator,
    pub value: String,
}

impl Comparison {
    fn parse(raw: &str) -> Result<Self> {
        let (op, index, width) = if let Some(i) = raw.find("!=") {
            (Operator::NotEq, i, 2)
        } else if let Some(i) = raw.find('=') {
            (Operator::Eq, i, 1)
        } else {
            return Err(CacheError::PredicateSyntax(format!(
                "'{}' has no = or != operator",
                raw.trim()
            )));
        };

        let column = raw[..index].trim();
        if column.is_empty() {
            return Err(CacheError::PredicateSyntax(format!(
                "'{}' has no column",
                raw.trim()
            )));
        }
        Ok(Self {
            column: column.to_string(),
            op,
            value: raw[index + width..].trim().to_string(),
        })
    }

    /// Unknown columns never match.
    pub fn matches(&self, row: &Row) -> bool {
        match row.get(&self.column) {
            Some(actual) => match self.op {
                Operator::Eq => *actual == self.value,
                Operator::NotEq => *actual != self.value,
            },
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Single,
    And,
    Or,
}

// == Predicate ==
/// A parsed single-level predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub combinator: Combinator,
    pub terms: Vec<Comparison>,
}

impl Predicate {
    /// Parses predicate text.
    ///
    /// Keywords are matched case-insensitively; columns and values keep their
    /// original case.
    pub fn parse(raw: &str) -> Result<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(CacheError::PredicateSyntax("predicate cannot be empty".to_string()));
        }

        let lower = text.to_ascii_lowercase();
        let has_and = lower.contains(" and ");
        let has_or = lower.contains(" or ");

        let (combinator, pieces) = match (has_and, has_or) {
            (true, true) => {
                return Err(CacheError::PredicateSyntax(format!(
                    "'{}' mixes and / or",
                    text
                )))
            }
            (true, false) => (Combinator::And, split_keyword(text, &lower, " and ")),
            (false, true) => (Combinator::Or, split_keyword(text, &lower, " or ")),
            (false, false) => (Combinator::Single, vec![text]),
        };

        let terms = pieces
            .into_iter()
            .map(Comparison::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { combinator, terms })
    }

    /// Evaluates every term against `row` and combines the results.
    pub fn matches(&self, row: &Row) -> bool {
        let mut outcomes = self.terms.iter().map(|term| term.matches(row));
        match self.combinator {
            Combinator::And => outcomes.all(|hit| hit),
            Combinator::Or => outcomes.any(|hit| hit),
            Combinator::Single => outcomes.next().unwrap_or(false),
        }
    }
}

/// Splits `text` at every occurrence of `keyword` found in its lower-cased
/// twin. Both strings have the same byte layout since only ASCII is folded.
fn split_keyword<'a>(text: &'a str, lower: &str, keyword: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in lower.match_indices(keyword) {
        pieces.push(&text[start..index]);
        start = index + keyword.len();
    }
    pieces.push(&text[start..]);
    pieces
}

// == Assignments ==
/// Parses `col=value[,col=value]*` into ordered pairs. Values may be empty.
pub fn parse_assignments(raw: &str) -> Result<Vec<(String, String)>> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(CacheError::PredicateSyntax("assignment list cannot be empty".to_string()));
    }

    text.split(',')
        .map(|item| {
            let (column, value) = item.split_once('=').ok_or_else(|| {
                CacheError::PredicateSyntax(format!("'{}' is not a col=value pair", item.trim()))
            })?;
            let column = column.trim();
            if column.is_empty() {
                return Err(CacheError::PredicateSyntax(format!(
                    "'{}' has no column",
                    item.trim()
                )));
            }
            Ok((column.to_string(), value.trim().to_string()))
        })
        .collect()
}
