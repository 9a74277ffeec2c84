mod memory;
mod postgres;
mod sqlite;
mod store_type;

pub use memory::InMemoryIdentityStore;
pub use store_type::{IdentityStore, SqlIdentityStore};
