use super::error::FilterError;

/// A named table plus the columns callers may filter or sort on.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    name: String,
    columns: Vec<String>,
}

impl Collection {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Result<Self, FilterError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(FilterError::InvalidTableName(name));
        }
        for column in columns {
            if !is_identifier(column) {
                return Err(FilterError::InvalidColumn(column.to_string()));
            }
        }
        Ok(Self {
            name,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check_column(&self, column: &str) -> Result<(), FilterError> {
        if self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(FilterError::UnknownColumn {
                collection: self.name.clone(),
                column: column.to_string(),
            })
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, safe to place inside double quotes.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}
