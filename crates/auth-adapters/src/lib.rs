//! # auth-adapters
//!
//! Implementations of `IdentityProvider`.
//! Authentication itself happens elsewhere; these adapters only hold the
//! resulting actor and mint pseudonymous ids for anonymous sessions.

pub mod session;

pub use session::{anonymous_uid, FixedIdentityProvider, SessionIdentityProvider};
