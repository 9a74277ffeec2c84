mod errors;
mod storage;
mod types;

pub use errors::IdentityError;
pub use storage::{IdentityStore, InMemoryIdentityStore, SqlIdentityStore};
pub use types::{Identity, IdentitySummary, RemoveOutcome};
