//! Process-local backends for development and tests.

mod credential_repo_memory;
mod revocation_store_memory;

pub use credential_repo_memory::*;
pub use revocation_store_memory::*;
