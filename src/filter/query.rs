use serde_json::Value;

use super::collection::Collection;
use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{escape_like, FilterOrderInfo, Predicate, SortDirection, SqlResult};

/// Base query over one collection that caller-supplied filter builders refine.
///
/// Every column reference is checked against the collection's allow-list when it is
/// added, so a query that exists is always safe to render.
#[derive(Debug, Clone)]
pub struct PageQuery {
    collection: Collection,
    predicates: Vec<Predicate>,
    order: Vec<FilterOrderInfo>,
}

impl PageQuery {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            predicates: vec![],
            order: vec![],
        }
    }

    pub fn eq(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self, FilterError> {
        self.collection.check_column(column)?;
        self.predicates.push(Predicate::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        Ok(self)
    }

    /// Substring match on any of `columns`, ignoring case. Columns are checked even when a
    /// blank term adds nothing.
    pub fn ilike_any(&mut self, columns: &[&str], term: &str) -> Result<&mut Self, FilterError> {
        if columns.is_empty() {
            return Err(FilterError::InvalidOperatorData("ilike_any requires at least one column".to_string()));
        }
        for column in columns {
            self.collection.check_column(column)?;
        }

        let term = term.trim();
        if term.is_empty() {
            return Ok(self);
        }
        let pattern = format!("%{}%", escape_like(term));
        let mut nested = Vec::with_capacity(columns.len());
        for column in columns {
            nested.push(Predicate::ILike {
                column: column.to_string(),
                pattern: pattern.clone(),
            });
        }
        self.predicates.push(Predicate::Any(nested));
        Ok(self)
    }

    pub fn order_by(&mut self, column: &str, sort: SortDirection) -> Result<&mut Self, FilterError> {
        self.collection.check_column(column)?;
        self.order.push(FilterOrderInfo {
            column: column.to_string(),
            sort,
        });
        Ok(self)
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> &[FilterOrderInfo] {
        &self.order
    }

    pub fn to_sql(&self, limit: i64, offset: i64) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.predicates, 0);
        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.collection.name()),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            FilterOrder::generate(&self.order),
            format!("LIMIT {} OFFSET {}", limit, offset),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.predicates, 0);
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.collection.name())
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.collection.name(), where_clause)
        };
        SqlResult { query, params }
    }
}
