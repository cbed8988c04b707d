//! API key storage
//!
//! Persists the key document (regular keys, super user, rate-limit section)
//! and builds the immutable snapshots the auth gate checks requests against.

pub mod models;
pub mod repository;
pub mod store;
pub mod token;

pub use models::{KeyListing, KeyStoreSnapshot, MaskedKey, RateLimitConfig};
pub use repository::{JsonFileRepository, KeyStoreError};
pub use store::{CreatedKey, KeyStore, KeyUpdate};
pub use token::fingerprint;
