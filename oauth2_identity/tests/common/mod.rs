pub mod fixtures;
pub mod test_setup;

pub use axum_mock_server::MockOAuthServer;
pub use fixtures::*;
pub use mock_provider::{MockFailure, MockProvider};
pub use test_setup::{PROVIDER, TestEnv};
