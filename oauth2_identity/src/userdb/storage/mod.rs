mod memory;
mod postgres;
mod sqlite;
mod store_type;

pub use memory::InMemoryUserStore;
pub use store_type::{SqlUserStore, UserStore};
