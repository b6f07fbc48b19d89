mod boundary;
pub mod cookie;
mod error;
mod handler;
mod router;

pub use boundary::{AuthBoundary, AuthContext, merge_patch, with_auth};
pub use cookie::CookieTransport;
pub use error::{ApiError, ApiErrorCode, recover_error};
pub use handler::ApiResponse;
pub use router::routes;
