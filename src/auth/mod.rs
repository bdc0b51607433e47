//! Auth token handling for real-time channels.

mod token;

pub use token::{AuthToken, TokenClaims};
