mod authenticator;
mod session_service;

pub use authenticator::*;
pub use session_service::*;
