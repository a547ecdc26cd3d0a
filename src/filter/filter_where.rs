use serde_json::Value;

use super::types::Predicate;

/// Renders predicates into a parameterised WHERE body (`$1`, `$2`, ...).
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Returns an empty string when there are no predicates.
    pub fn generate(predicates: &[Predicate], starting_param_index: usize) -> (String, Vec<Value>) {
        let mut filter_where = Self::new(starting_param_index);
        let parts: Vec<String> = predicates.iter().map(|p| filter_where.build_sql_condition(p)).collect();
        (parts.join(" AND "), filter_where.param_values)
    }

    fn build_sql_condition(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Eq { column, value } => {
                match value {
                    Value::Null => format!("\"{}\" IS NULL", column),
                    // Strings bind as TEXT, so non-text columns (uuid, timestamptz) compare as text.
                    Value::String(_) => format!("\"{}\"::text = {}", column, self.param(value.clone())),
                    _ => format!("\"{}\" = {}", column, self.param(value.clone())),
                }
            }
            Predicate::ILike { column, pattern } => {
                format!("\"{}\"::text ILIKE {}", column, self.param(Value::String(pattern.clone())))
            }
            Predicate::Any(nested) => {
                if nested.is_empty() {
                    return "1=0".to_string();
                }
                let parts: Vec<String> = nested.iter().map(|p| self.build_sql_condition(p)).collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}
