//! Authentication and account management.
//!
//! Token issuance and validation, the request guard for protected routes,
//! password hashing, and the signup/login/user-read flows built on them.

pub mod guard;
pub mod handlers;
pub mod password;
pub mod service;
pub mod token;
pub mod validation;

pub use guard::{authenticate, check_owner_or_admin, check_user_type, AuthContext};
pub use service::{AccountService, UserPage};
pub use token::{Claims, RefreshClaims, TokenEngine, TokenIdentity, TokenKind, TokenLifetimes, TokenPair};
