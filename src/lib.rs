/*!
# CAS Bridge

A Central Authentication Service (CAS) protocol broker that bridges an
upstream identity assertion (e.g. a federated SSO login) into CAS tickets
consumable by downstream services and proxies.

The crate is the ticket lifecycle and validation engine only: it grants,
tracks, validates and revokes the short-lived bearer tickets of the CAS
protocol, performs the proxy-granting callback, and sanity-checks inbound
SAML 1.1 backchannel validation requests. HTTP routing, cookie persistence
and the upstream login flow are the embedding application's concern; the
engine exchanges an explicit [`SessionContext`] with that layer instead of
touching any request state itself.

## Features

- Ticket granting tickets bound to a browser session, reused across renewed
  logins
- One-shot service and proxy tickets with atomic claim semantics
- Proxy granting tickets minted only after a synchronous callback
  confirmation, with cascade revocation at logout
- The ordered validation ladder of the CAS protocol with machine-readable
  status codes
- SAML 1.1 validation request parsing with clock-skew and staleness rules
- XML, JSON and plain-text response body rendering for CAS v1/v2/v3

## Quick Start

```rust,no_run
use cas_bridge::{
    CasConfig, MemoryTicketStore, SessionContext, TicketManager, ValidationRequest,
};
use std::collections::HashMap;
use std::sync::Arc;

# #[tokio::main]
# async fn main() -> Result<(), Box<dyn std::error::Error>> {
let config = CasConfig::new().services_allowlist("/etc/cas/services.json");
let manager = TicketManager::new(config, Arc::new(MemoryTicketStore::new()))?;

// upstream login succeeded: bind a TGT to the browser session
let mut session = SessionContext::new();
session.begin_login();
let tgt = manager
    .bind_ticket_granting_ticket("ada", HashMap::new(), &mut session)
    .await?;

// a service asks for a ticket
let granting = manager.lookup_granting_ticket(&tgt).await?.unwrap();
let ticket = manager
    .grant_service_ticket(&granting, "https://svc.example/", &mut session)
    .await?
    .expect("service is authorized");

// the service redeems it on the backchannel
let outcome = manager
    .validate_ticket(&ValidationRequest::new(ticket, "https://svc.example/"))
    .await?;
assert!(outcome.is_ok());
# Ok(())
# }
```
*/

pub mod config;
pub mod errors;
pub mod manager;
pub mod prelude;
pub mod response;
pub mod saml;
pub mod session;
pub mod storage;
pub mod tickets;
pub mod urn;
pub mod validation;

pub use config::CasConfig;
pub use errors::{CasError, Result, SamlError, StorageError};
pub use manager::TicketManager;
pub use response::{CasResponseBody, Encoding};
pub use saml::SamlValidateRequest;
pub use session::SessionContext;
pub use storage::{MemoryTicketStore, TicketStore};
pub use tickets::{AttributeMap, TicketKind, TicketRecord};
pub use urn::UrnWhitelist;
pub use validation::{TicketFault, Validation, ValidationRequest, ValidationStatus};
