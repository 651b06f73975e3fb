//! Authentication module for managing sessions, tokens and credentials.
//!
//! This module provides:
//! - `Session`: token lifecycle, plant discovery and the retry/re-login loop
//! - `TokenStore`: durable token persistence (`FileTokenStore`, `MemoryTokenStore`)
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! Tokens are refreshed a configurable margin before they expire.

pub mod credentials;
pub mod session;
pub mod store;
pub mod token;

pub use credentials::{CredentialStore, Credentials};
pub use session::{AuthState, Session};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{PersistedToken, SessionToken};
