//! OAuth 2.0 authorization code flow for app installation.
//!
//! An install moves through these steps:
//!
//! 1. [`begin_auth`]: validate the shop, issue a [`StateNonce`], build the
//!    authorize URL
//! 2. [`validate_auth_callback`]: check parameters, state, HMAC and shop on
//!    the way back
//! 3. [`TokenExchanger::exchange`]: trade the code for an offline access token
//!
//! The HTTP layer owns the state cookie and the redirect; persistence of the
//! token is handled by [`crate::install::InstallService`].
//!
//! # Security Features
//!
//! - **HMAC Validation**: callbacks are verified with HMAC-SHA256 over the
//!   query in received order
//! - **CSRF Protection**: the `state` nonce must match an encrypted cookie set
//!   by this server and be younger than the configured TTL
//! - **Constant-Time Comparison**: signature and nonce checks do not exit early
//! - **Shop Validation**: only `*.myshopify.com` hosts are ever redirected to
//!   or contacted

mod auth_query;
mod begin_auth;
mod error;
pub mod hmac;
mod state;
mod token_exchange;
mod validate_callback;

pub use auth_query::{AuthQuery, CallbackParams};
pub use begin_auth::{begin_auth, BeginAuthResult};
pub use error::OAuthError;
pub use hmac::{compute_signature, constant_time_compare, verify_callback_hmac};
pub use state::{verify_state, StateNonce};
pub use token_exchange::{AccessTokenResponse, HttpTokenExchanger, TokenExchanger};
pub use validate_callback::{validate_auth_callback, ValidatedCallback};
