//! Flow coordination: Start, Callback, Link and Unlink over the stores.

mod callback;
mod controller;
mod errors;
mod resolve;
mod types;

pub use controller::OAuthFlowController;
pub use errors::CoordinationError;
pub use types::{CallbackError, CallbackParams, FlowErrorCode, FlowRedirect};
