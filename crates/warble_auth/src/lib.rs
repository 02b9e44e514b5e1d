//! Warble Auth - Credential and token storage for the warble client.
//!
//! This crate owns the persisted bytes of a warble session:
//! - the access/refresh token pair issued by the backend
//! - the cached user profile (best-effort, never an authorization source)
//!
//! # Architecture
//!
//! Credentials live in their own `auth.db` under the warble data directory,
//! separate from anything else the client may cache. Keeping the sensitive
//! material in one small file means it can be inspected and wiped as a unit.
//!
//! The store is a plain key-value table with fixed logical keys. The one
//! non-trivial guarantee it makes is pair atomicity: both tokens from the
//! same issuance are written in a single transaction, so `get_token_pair`
//! can never hand back an access token paired with a refresh token from a
//! different issuance.
//!
//! The session layer in `warble-core` is the sole writer; everything else
//! only reads.

pub mod credentials;
pub mod db;
pub mod error;

pub use credentials::{TokenPair, User};
pub use db::AuthDb;
pub use error::{AuthError, AuthResult};
