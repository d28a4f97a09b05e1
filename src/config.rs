//! Configuration types for the CAS bridge.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the CAS bridge.
///
/// All fields have defaults matching the CAS protocol conventions; use the
/// builder methods to override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasConfig {
    /// Service ticket lifetime (one-shot ST and PT tokens)
    pub service_ticket_lifetime: Duration,

    /// Ticket granting ticket lifetime (one per authenticated session)
    pub ticket_granting_ticket_lifetime: Duration,

    /// Proxy granting ticket lifetime
    pub proxy_granting_ticket_lifetime: Duration,

    /// Optional JSON file holding the authorized service URN prefixes.
    /// Absent means every service URL is authorized.
    pub services_allowlist: Option<PathBuf>,

    /// Optional JSON file holding the authorized proxy callback URN prefixes.
    pub proxies_allowlist: Option<PathBuf>,

    /// Verify TLS certificates when calling the proxy-granting callback URL
    pub verify_tls: bool,

    /// Whether proxy tickets and PGT callbacks are supported at all
    pub proxy_support: bool,

    /// Whether the samlValidate backchannel endpoint is supported
    pub saml_validate_support: bool,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            service_ticket_lifetime: Duration::from_secs(5 * 60),
            ticket_granting_ticket_lifetime: Duration::from_secs(8 * 60 * 60),
            proxy_granting_ticket_lifetime: Duration::from_secs(4 * 60 * 60),
            services_allowlist: None,
            proxies_allowlist: None,
            verify_tls: true,
            proxy_support: true,
            saml_validate_support: false,
        }
    }
}

impl CasConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service ticket lifetime.
    pub fn service_ticket_lifetime(mut self, lifetime: Duration) -> Self {
        self.service_ticket_lifetime = lifetime;
        self
    }

    /// Set the ticket granting ticket lifetime.
    pub fn ticket_granting_ticket_lifetime(mut self, lifetime: Duration) -> Self {
        self.ticket_granting_ticket_lifetime = lifetime;
        self
    }

    /// Set the proxy granting ticket lifetime.
    pub fn proxy_granting_ticket_lifetime(mut self, lifetime: Duration) -> Self {
        self.proxy_granting_ticket_lifetime = lifetime;
        self
    }

    /// Restrict service URLs to the prefixes listed in the given JSON file.
    pub fn services_allowlist(mut self, path: impl Into<PathBuf>) -> Self {
        self.services_allowlist = Some(path.into());
        self
    }

    /// Restrict proxy callback URLs to the prefixes listed in the given JSON file.
    pub fn proxies_allowlist(mut self, path: impl Into<PathBuf>) -> Self {
        self.proxies_allowlist = Some(path.into());
        self
    }

    /// Toggle TLS certificate verification for the PGT callback call.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Enable or disable proxy ticket support.
    pub fn proxy_support(mut self, enabled: bool) -> Self {
        self.proxy_support = enabled;
        self
    }

    /// Enable or disable samlValidate support.
    pub fn saml_validate_support(mut self, enabled: bool) -> Self {
        self.saml_validate_support = enabled;
        self
    }
}
