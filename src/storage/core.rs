//! The key-value contract backing all ticket kinds.

use crate::errors::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for ticket storage backends.
///
/// Values are opaque bytes keyed by the ticket token; each key carries its
/// own optional time-to-live. No transactional guarantees across keys are
/// assumed. `take` is the one-shot claim primitive: backends must implement
/// it as an atomic remove-and-return so two concurrent claims of the same key
/// can never both succeed.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Store a value under `key`, replacing any previous value. A `ttl` of
    /// `None` keeps the entry until it is deleted.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Retrieve the value stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically remove and return the value stored under `key`.
    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete the value stored under `key`. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Drop expired entries. Backends with native expiry need not override.
    async fn cleanup_expired(&self) -> Result<()> {
        Ok(())
    }
}
