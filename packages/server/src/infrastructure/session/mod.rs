//! Session Manager
//!
//! Issues HS256 session tokens and tracks, per user, which of them are
//! active and which were revoked before their expiry.

pub mod manager;

pub use manager::{SESSION_TTL, SessionClaims, SessionManager};
