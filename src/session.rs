//! Explicit session context passed between the protocol adapter and the
//! ticket engine.
//!
//! The adapter owns cookie persistence; the engine only reads and updates
//! this value. The session holds a back-reference to the TGT token but never
//! owns ticket content.

use serde::{Deserialize, Serialize};

/// Per-browser-session state relevant to ticket granting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    /// Token of the TGT bound to this session, if any.
    pub tgt: Option<String>,

    /// Username authenticated on this session, if any.
    pub username: Option<String>,

    /// Whether the most recent TGT binding followed an explicit login
    /// initiation. Consumed when a service ticket is granted; gates later
    /// `renew` validation requests.
    pub fresh_credentials: bool,

    /// Set when the adapter initiates an upstream login; consumed by the next
    /// TGT binding. Unset on a session that has never bound a TGT, which
    /// counts as fresh.
    logging_in: Option<bool>,
}

impl SessionContext {
    /// Create an empty session context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark that an explicit login flow is starting.
    pub fn begin_login(&mut self) {
        self.logging_in = Some(true);
    }

    /// Consume the login-initiation marker. A never-set marker counts as an
    /// explicit login (first authentication on this session).
    pub(crate) fn consume_login_marker(&mut self) -> bool {
        let fresh = self.logging_in.take().unwrap_or(true);
        self.logging_in = Some(false);
        fresh
    }

    /// Read and clear the fresh-credentials flag when an ST is granted.
    pub(crate) fn take_fresh_credentials(&mut self) -> bool {
        std::mem::take(&mut self.fresh_credentials)
    }

    /// Wipe all session state at logout.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
