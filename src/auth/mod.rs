//! Account credentials: password hashing and bearer tokens.

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 8;
