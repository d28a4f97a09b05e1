//! Convenient imports for the common case.
//!
//! ```rust
//! use cas_bridge::prelude::*;
//! ```

pub use crate::config::CasConfig;
pub use crate::errors::{CasError, Result};
pub use crate::manager::TicketManager;
pub use crate::response::{CasResponseBody, Encoding};
pub use crate::saml::SamlValidateRequest;
pub use crate::session::SessionContext;
pub use crate::storage::{MemoryTicketStore, TicketStore};
pub use crate::tickets::{AttributeMap, TicketKind, TicketRecord};
pub use crate::urn::UrnWhitelist;
pub use crate::validation::{Validation, ValidationRequest, ValidationStatus};
