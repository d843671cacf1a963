//! Authentication primitives: password hashing, session tokens and password resets

mod password;
mod reset;
mod tokens;

pub use password::PasswordHasher;
pub use reset::{digest as reset_digest, LogNotifier, ResetNotifier, ResetToken};
pub use tokens::{Claims, TokenIssuer};
