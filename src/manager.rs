//! Ticket lifecycle management: granting, issuing, claiming, tracking and
//! revoking CAS tickets against the backing store.

use crate::config::CasConfig;
use crate::errors::Result;
use crate::session::SessionContext;
use crate::tickets::{mint_pgtiou, AttributeMap, TicketKind, TicketRecord};
use crate::storage::TicketStore;
use crate::urn::UrnWhitelist;
use crate::validation::{TicketFault, ValidationStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of a one-shot ticket claim: the record, or a protocol-level fault
/// carrying the machine status to propagate.
pub type ClaimOutcome = std::result::Result<TicketRecord, TicketFault>;

/// Issues, claims, tracks and revokes all CAS ticket kinds.
///
/// The manager is the only writer to the ticket store. It is request-scoped
/// and stateless between calls apart from the store itself; share it behind
/// an `Arc` across request handlers.
pub struct TicketManager {
    store: Arc<dyn TicketStore>,
    services: UrnWhitelist,
    proxies: UrnWhitelist,
    config: CasConfig,
    http: reqwest::Client,
}

impl TicketManager {
    /// Build a manager, loading both whitelists and the callback HTTP client.
    ///
    /// Fails when either whitelist file cannot be loaded; a broker must not
    /// degrade to authorizing everything when a whitelist was intended.
    pub fn new(config: CasConfig, store: Arc<dyn TicketStore>) -> Result<Self> {
        let services = UrnWhitelist::load(config.services_allowlist.as_deref())?;
        let proxies = UrnWhitelist::load(config.proxies_allowlist.as_deref())?;
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        Ok(Self {
            store,
            services,
            proxies,
            config,
            http,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    /// Whitelist of authorized service URLs.
    pub fn services(&self) -> &UrnWhitelist {
        &self.services
    }

    /// Whitelist of authorized proxy callback URLs.
    pub fn proxies(&self) -> &UrnWhitelist {
        &self.proxies
    }

    fn pgt_tracking_key(username: &str) -> String {
        format!("sessPGT:{username}")
    }

    async fn put_record(
        &self,
        key: &str,
        record: &TicketRecord,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.store.set(key, &bytes, ttl).await
    }

    /// Establish (or refresh) the ticket granting ticket for an authenticated
    /// user and bind it to the browser session.
    ///
    /// A TGT already referenced by the session is reused, so renewed logins
    /// within the same browser session keep their token. The session's
    /// fresh-credentials flag is derived from whether this binding followed an
    /// explicit login initiation.
    pub async fn bind_ticket_granting_ticket(
        &self,
        username: &str,
        attributes: AttributeMap,
        session: &mut SessionContext,
    ) -> Result<String> {
        let tgt = session
            .tgt
            .clone()
            .unwrap_or_else(|| TicketKind::TicketGranting.mint());

        let record = TicketRecord::TicketGranting {
            username: username.to_string(),
            attributes,
        };
        self.put_record(
            &tgt,
            &record,
            Some(self.config.ticket_granting_ticket_lifetime),
        )
        .await?;

        info!(ticket = %tgt, username, "created ticket granting ticket");

        session.tgt = Some(tgt.clone());
        session.username = Some(username.to_string());
        session.fresh_credentials = session.consume_login_marker();

        Ok(tgt)
    }

    /// Retrieve a granting ticket (TGT or PGT) without consuming it.
    pub async fn lookup_granting_ticket(&self, key: &str) -> Result<Option<TicketRecord>> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Issue a service or proxy ticket bound to `service`, copying identity
    /// from the granting record.
    ///
    /// Proxy tickets inherit the granting PGT's hop chain verbatim and never
    /// count as credential-fresh.
    pub async fn issue_ticket(
        &self,
        granting: &TicketRecord,
        service: &str,
        proxy: bool,
        renewed: bool,
    ) -> Result<String> {
        let record = if proxy {
            TicketRecord::Proxy {
                service: service.to_string(),
                username: granting.username().to_string(),
                attributes: granting.attributes().clone(),
                creds_presented: false,
                proxies: granting.proxies().to_vec(),
            }
        } else {
            TicketRecord::Service {
                service: service.to_string(),
                username: granting.username().to_string(),
                attributes: granting.attributes().clone(),
                creds_presented: renewed,
            }
        };

        let kind = if proxy {
            TicketKind::Proxy
        } else {
            TicketKind::Service
        };
        let token = kind.mint();
        self.put_record(&token, &record, Some(self.config.service_ticket_lifetime))
            .await?;

        Ok(token)
    }

    /// Claim a service or proxy ticket.
    ///
    /// Claims are one-shot: the record is removed from the store atomically
    /// with the read, so a second claim of the same token always reports the
    /// ticket as not found.
    pub async fn claim_ticket(&self, token: &str) -> Result<ClaimOutcome> {
        match self.store.take(token).await? {
            Some(bytes) => Ok(Ok(serde_json::from_slice(&bytes)?)),
            None => Ok(Err(TicketFault::new(
                ValidationStatus::InvalidTicket,
                format!("Can not find ticket \"{token}\""),
            ))),
        }
    }

    /// Create a proxy granting ticket for the service that just validated
    /// `granted`, confirming receipt through the callback URL first.
    ///
    /// Returns the PGTIOU correlation token on success. No callback URL means
    /// no PGT was requested; an unreachable callback or any non-200 answer is
    /// a definitive failure and nothing is persisted.
    pub async fn issue_proxy_granting_ticket(
        &self,
        pgt_url: Option<&str>,
        granted: &TicketRecord,
    ) -> Result<Option<String>> {
        let Some(pgt_url) = pgt_url else {
            return Ok(None);
        };

        let pgt = TicketKind::ProxyGranting.mint();
        let pgtiou = mint_pgtiou();

        let response = self
            .http
            .get(pgt_url)
            .query(&[("pgtId", pgt.as_str()), ("pgtIou", pgtiou.as_str())])
            .send()
            .await;

        match response {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                // callback holder now owns the pgtiou=>pgt mapping
                let mut proxies = vec![pgt_url.to_string()];
                proxies.extend(granted.proxies().iter().cloned());

                let record = TicketRecord::ProxyGranting {
                    username: granted.username().to_string(),
                    attributes: granted.attributes().clone(),
                    proxies,
                };
                self.put_record(
                    &pgt,
                    &record,
                    Some(self.config.proxy_granting_ticket_lifetime),
                )
                .await?;
                self.track_proxy_granting_ticket(&pgt, granted.username())
                    .await?;

                info!(ticket = %pgt, username = granted.username(), url = pgt_url, "issued proxy granting ticket");
                Ok(Some(pgtiou))
            }
            Ok(response) => {
                warn!(status = %response.status(), url = pgt_url, "PgtUrl call back failed");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, url = pgt_url, "PgtUrl call back unreachable");
                Ok(None)
            }
        }
    }

    /// Record a PGT in the per-user tracking list used for cascade
    /// revocation at logout. Last write wins; single writer per request is
    /// assumed.
    pub async fn track_proxy_granting_ticket(&self, pgt: &str, username: &str) -> Result<()> {
        let key = Self::pgt_tracking_key(username);

        let mut tracked: Vec<String> = match self.store.get(&key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };
        tracked.push(pgt.to_string());

        self.store
            .set(&key, &serde_json::to_vec(&tracked)?, None)
            .await
    }

    /// Delete every PGT tracked for `username`, then the tracking list
    /// itself. A missing or empty list is a no-op.
    pub async fn revoke_proxy_granting_tickets(&self, username: &str) -> Result<()> {
        if username.is_empty() {
            return Ok(());
        }

        let key = Self::pgt_tracking_key(username);
        let tracked: Vec<String> = match self.store.get(&key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };

        for pgt in &tracked {
            self.store.delete(pgt).await?;
        }
        self.store.delete(&key).await?;

        if !tracked.is_empty() {
            info!(username, revoked = tracked.len(), "revoked proxy granting tickets");
        }
        Ok(())
    }

    /// Grant a service ticket against an authenticated session's TGT.
    ///
    /// The service must be authorized by the service whitelist. Consumes the
    /// session's fresh-credentials flag into the ticket's `creds_presented`.
    pub async fn grant_service_ticket(
        &self,
        granting: &TicketRecord,
        service: &str,
        session: &mut SessionContext,
    ) -> Result<std::result::Result<String, TicketFault>> {
        if self.services.valid(service).is_none() {
            let fault = TicketFault::new(
                ValidationStatus::InvalidService,
                format!("Invalid service requested: \"{service}\" is not authorized."),
            );
            warn!(service, "{}", fault.reason);
            return Ok(Err(fault));
        }

        let renewed = session.take_fresh_credentials();
        let ticket = self.issue_ticket(granting, service, false, renewed).await?;

        info!(
            username = granting.username(),
            ticket = %ticket,
            service,
            "issued service ticket"
        );
        Ok(Ok(ticket))
    }

    /// Issue a proxy ticket against a previously delivered PGT.
    ///
    /// Both `pgt` and `target_service` are required; the target must be
    /// whitelisted and the token must actually be a PGT.
    pub async fn issue_proxy_ticket(
        &self,
        pgt: Option<&str>,
        target_service: Option<&str>,
    ) -> Result<std::result::Result<String, TicketFault>> {
        let fault = if !self.config.proxy_support {
            TicketFault::new(
                ValidationStatus::InvalidRequest,
                "Proxy support disabled on this server.",
            )
        } else if let (Some(pgt), Some(target_service)) = (pgt, target_service) {
            if self.services.valid(target_service).is_none() {
                TicketFault::new(
                    ValidationStatus::InvalidService,
                    format!("Invalid proxy service request {target_service}"),
                )
            } else if !pgt.starts_with(TicketKind::ProxyGranting.prefix()) {
                TicketFault::new(
                    ValidationStatus::InvalidTicket,
                    format!("{pgt} is not a Proxy Grant Ticket"),
                )
            } else if let Some(granting) = self.lookup_granting_ticket(pgt).await? {
                let proxy_ticket = self.issue_ticket(&granting, target_service, true, false).await?;
                info!(
                    username = granting.username(),
                    ticket = %proxy_ticket,
                    service = target_service,
                    "issued proxy ticket"
                );
                return Ok(Ok(proxy_ticket));
            } else {
                TicketFault::new(
                    ValidationStatus::InvalidTicket,
                    format!("Proxy Grant Ticket {pgt} is Invalid."),
                )
            }
        } else {
            TicketFault::new(
                ValidationStatus::InvalidRequest,
                "Both a pgt and targetService is required.",
            )
        };

        warn!(status = %fault.status, "{}", fault.reason);
        Ok(Err(fault))
    }

    /// Log the session's user out: cascade-delete all tracked PGTs, delete
    /// the TGT and wipe the session context.
    pub async fn logout(&self, session: &mut SessionContext) -> Result<()> {
        let username = session.username.clone();

        if let Some(tgt) = session.tgt.take() {
            if let Some(username) = username.as_deref() {
                self.revoke_proxy_granting_tickets(username).await?;
            }
            self.store.delete(&tgt).await?;
        }

        info!(
            username = username.as_deref().unwrap_or("<unknown>"),
            "user logged out"
        );
        session.clear();
        Ok(())
    }
}
