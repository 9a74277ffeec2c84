//! oauth2_identity_axum - Axum routes for the oauth2_identity login flow
//!
//! Mount [`oauth2_identity_router`] at the controller's route prefix:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use oauth2_identity::OAuthFlowController;
//! # fn app(controller: Arc<OAuthFlowController>) -> axum::Router {
//! let prefix = controller.config().route_prefix.clone();
//! axum::Router::new().nest(&prefix, oauth2_identity_axum::oauth2_identity_router(controller))
//! # }
//! ```

mod error;
mod handlers;
mod router;
mod session;

pub use error::IntoResponseError;
pub use router::{oauth2_identity_router, oauth2_identity_router_no_trace};
pub use session::{AuthRedirect, AuthUser};
