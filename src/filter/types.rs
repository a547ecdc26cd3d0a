use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single condition over one collection. Top-level predicates are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact match; a JSON null matches SQL NULL.
    Eq { column: String, value: Value },
    /// Case-insensitive LIKE with an already-escaped pattern.
    ILike { column: String, pattern: String },
    /// Logical OR over the nested predicates. Empty matches nothing.
    Any(Vec<Predicate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// Escapes LIKE wildcards so user input is matched literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
