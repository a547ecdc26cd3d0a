use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Column '{column}' is not filterable on '{collection}'")]
    UnknownColumn { collection: String, column: String },

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),
}
