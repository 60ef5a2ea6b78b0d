//! TxVault - An in-memory key-value store with nested transactions
//!
//! This library provides a single-session store with:
//! - Nested BEGIN / ROLLBACK / COMMIT transactions
//! - Constant-time "how many keys hold this value" queries
//! - A line-oriented command session over any async reader/writer

pub mod error;
pub mod frequency;
pub mod pending;
pub mod protocol;
pub mod session;
pub mod store;

pub use error::{TxVaultError, Result};
pub use store::{Database, MemoryStore};
pub use protocol::{Command, Response};
pub use session::{Outcome, Session, SessionConfig};
