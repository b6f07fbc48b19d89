mod authenticator_impl;
mod oauth2_profile;
mod session_service_impl;
mod token_codec_jwt;

pub use authenticator_impl::*;
pub use oauth2_profile::*;
pub use session_service_impl::*;
pub use token_codec_jwt::*;
