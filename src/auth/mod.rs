//! Authentication for the app.
//!
//! - [`oauth`]: installing the app on a shop (authorization code flow)
//! - [`AuthScopes`]: requested and granted access scopes
//! - [`SessionToken`]: App Bridge JWTs that authorize admin-only endpoints

pub mod oauth;
mod scopes;
pub mod session_token;

pub use scopes::AuthScopes;
pub use session_token::{SessionToken, SessionTokenError};
