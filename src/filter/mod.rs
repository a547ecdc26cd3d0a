pub mod collection;
pub mod error;
pub mod filter_order;
pub mod filter_where;
pub mod query;
pub mod types;

pub use collection::Collection;
pub use error::FilterError;
pub use query::PageQuery;
pub use types::*;
