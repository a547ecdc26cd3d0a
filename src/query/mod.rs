use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::filter::{Collection, FilterError, PageQuery};

pub mod postgres;

pub use postgres::PgRowSource;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid page {0}: pages start at 1")]
    InvalidPage(i64),

    #[error("Invalid page size {0}: must be at least 1")]
    InvalidPageSize(i64),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Store error: {0}")]
    Store(String),
}

/// Validated 1-based page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    /// Rejects `page < 1` and `page_size < 1`; caps `page_size` at `max_page_size`.
    pub fn new(page: i64, page_size: i64, max_page_size: i64) -> Result<Self, QueryError> {
        if page < 1 {
            return Err(QueryError::InvalidPage(page));
        }
        if page_size < 1 {
            return Err(QueryError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page,
            page_size: page_size.min(max_page_size.max(1)),
        })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub rows: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub page_count: i64,
    pub total: i64,
}

/// `ceil(total / page_size)`, zero when nothing matches.
pub fn page_count(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

/// Storage behind the executor: one page of rows plus the total match count.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self, query: &PageQuery, limit: i64, offset: i64) -> Result<(Vec<Row>, i64), QueryError>;
}

/// Fetches one page of `collection` after the caller's filter builder has shaped the query.
///
/// Knows nothing about what the collection holds and makes no access decisions; the
/// caller authorizes first. No default ordering is imposed.
pub async fn fetch_page<F>(
    source: &dyn RowSource,
    collection: Collection,
    request: PageRequest,
    build: F,
) -> Result<PageResult<Row>, QueryError>
where
    F: FnOnce(&mut PageQuery) -> Result<(), FilterError>,
{
    let mut query = PageQuery::new(collection);
    build(&mut query)?;

    let (rows, total) = source
        .fetch_rows(&query, request.page_size(), request.offset())
        .await?;

    let page_count = page_count(total, request.page_size());
    tracing::debug!(
        "Fetched page {}/{} of '{}' ({} rows, {} total)",
        request.page(),
        page_count,
        query.collection().name(),
        rows.len(),
        total
    );

    Ok(PageResult {
        rows,
        page: request.page(),
        page_size: request.page_size(),
        page_count,
        total,
    })
}
