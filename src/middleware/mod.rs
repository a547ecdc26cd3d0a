pub mod auth;
pub mod response;

pub use auth::require_session;
pub use response::{ApiResponse, ApiResult};
