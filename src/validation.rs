//! The ordered rule chain turning a presented ticket and service URL into an
//! authoritative accept/reject decision.

use crate::errors::Result;
use crate::manager::TicketManager;
use crate::tickets::{TicketKind, TicketRecord};
use crate::urn::UrnWhitelist;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Machine-readable status codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Ok,
    InvalidRequest,
    InvalidTicket,
    InvalidService,
    InvalidTicketSpec,
    InvalidProxyCallback,
    UnauthorizedServiceProxy,
}

impl ValidationStatus {
    /// Protocol wire form of the status code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Ok => "OK",
            ValidationStatus::InvalidRequest => "INVALID_REQUEST",
            ValidationStatus::InvalidTicket => "INVALID_TICKET",
            ValidationStatus::InvalidService => "INVALID_SERVICE",
            ValidationStatus::InvalidTicketSpec => "INVALID_TICKET_SPEC",
            ValidationStatus::InvalidProxyCallback => "INVALID_PROXY_CALLBACK",
            ValidationStatus::UnauthorizedServiceProxy => "UNAUTHORIZED_SERVICE_PROXY",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol-level failure: machine status plus a loggable reason.
#[derive(Debug, Clone)]
pub struct TicketFault {
    pub status: ValidationStatus,
    pub reason: String,
}

impl TicketFault {
    pub fn new(status: ValidationStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

/// Parameters of one backchannel validation attempt, as extracted by the
/// protocol adapter.
#[derive(Debug, Clone, Default)]
pub struct ValidationRequest {
    /// The presented ST or PT token.
    pub ticket: Option<String>,
    /// The service URL the caller claims the ticket was issued for.
    pub service: Option<String>,
    /// Proxy-granting callback URL, when the caller wants a PGT.
    pub pgt_url: Option<String>,
    /// Caller demands the ticket was issued from freshly presented
    /// credentials.
    pub renew: bool,
    /// Whether the entry point used accepts proxy tickets
    /// (`/proxyValidate` does, `/validate` and `/serviceValidate` do not).
    pub proxies_ok: bool,
}

impl ValidationRequest {
    /// A plain service-ticket validation attempt.
    pub fn new(ticket: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            ticket: Some(ticket.into()),
            service: Some(service.into()),
            ..Default::default()
        }
    }
}

/// The authoritative outcome of a validation attempt.
#[derive(Debug, Clone)]
pub struct Validation {
    /// Machine status code.
    pub status: ValidationStatus,
    /// Human-readable reason, suitable for logging.
    pub reason: String,
    /// The claimed record, when one was found.
    pub ticket: Option<TicketRecord>,
    /// PGTIOU correlation token, when a proxy granting ticket was delivered.
    pub pgtiou: Option<String>,
}

impl Validation {
    fn failure(status: ValidationStatus, reason: String, ticket: Option<TicketRecord>) -> Self {
        Self {
            status,
            reason,
            ticket,
            pgtiou: None,
        }
    }

    /// Whether the attempt succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == ValidationStatus::Ok
    }
}

impl TicketManager {
    /// Validate a service or proxy ticket.
    ///
    /// The ticket is claimed before anything else is checked, so a
    /// validation attempt always extinguishes the ticket even when the
    /// attempt itself is malformed; a replayed token can never get a second
    /// chance through a differently-shaped request. Checks run in strict
    /// order and the first failure decides the outcome.
    pub async fn validate_ticket(&self, request: &ValidationRequest) -> Result<Validation> {
        // one shot at validation
        let claim = match request.ticket.as_deref() {
            Some(token) => Some(self.claim_ticket(token).await?),
            None => None,
        };

        let outcome = self.run_ladder(request, claim).await?;
        info!(status = %outcome.status, "{}", outcome.reason);
        Ok(outcome)
    }

    async fn run_ladder(
        &self,
        request: &ValidationRequest,
        claim: Option<crate::manager::ClaimOutcome>,
    ) -> Result<Validation> {
        let (Some(token), Some(service)) =
            (request.ticket.as_deref(), request.service.as_deref())
        else {
            return Ok(Validation::failure(
                ValidationStatus::InvalidRequest,
                format!(
                    "Service and ticket both required for ticket \"{}\"",
                    request.ticket.as_deref().unwrap_or("")
                ),
                None,
            ));
        };

        let record = match claim.expect("ticket was present, so it was claimed") {
            Ok(record) => record,
            Err(fault) => {
                return Ok(Validation::failure(fault.status, fault.reason, None));
            }
        };

        if request.pgt_url.is_some() && !self.config().proxy_support {
            return Ok(Validation::failure(
                ValidationStatus::InvalidProxyCallback,
                "pgtUrl provided, but this server has proxy disabled.".to_string(),
                Some(record),
            ));
        }

        if let Some(pgt_url) = request.pgt_url.as_deref() {
            if self.proxies().valid(pgt_url).is_none() {
                return Ok(Validation::failure(
                    ValidationStatus::InvalidProxyCallback,
                    format!("Proxy service \"{pgt_url}\" is not authorized."),
                    Some(record),
                ));
            }
        }

        let is_proxy_ticket = TicketKind::from_token(token) == Some(TicketKind::Proxy);

        if is_proxy_ticket && !self.config().proxy_support {
            return Ok(Validation::failure(
                ValidationStatus::InvalidRequest,
                "Proxy Ticket can not be validated: this server has proxy disabled.".to_string(),
                Some(record),
            ));
        }

        if is_proxy_ticket && !request.proxies_ok {
            return Ok(Validation::failure(
                ValidationStatus::UnauthorizedServiceProxy,
                format!("Failed to validate: proxy ticket \"{token}\" must use proxyValidate endpoint"),
                Some(record),
            ));
        }

        // a granting ticket presented here has already been consumed by the
        // claim above; it carries no bound service and cannot validate
        let Some(bound_service) = record.service().map(str::to_owned) else {
            return Ok(Validation::failure(
                ValidationStatus::InvalidTicket,
                format!("Failed to validate: \"{token}\" is not a service ticket"),
                Some(record),
            ));
        };

        if !UrnWhitelist::matches(&bound_service, service) {
            return Ok(Validation::failure(
                ValidationStatus::InvalidService,
                format!("Failed to validate: service \"{service}\" incorrect for ticket \"{token}\""),
                Some(record),
            ));
        }

        if request.renew && !record.creds_presented() {
            return Ok(Validation::failure(
                ValidationStatus::InvalidTicketSpec,
                "\"renew\" validation specified but primary credentials were not presented."
                    .to_string(),
                Some(record),
            ));
        }

        // all criteria met
        let mut status = ValidationStatus::Ok;
        let mut reason = format!(
            "Successful validation of {token} by \"{}\" for \"{service}\"",
            record.username()
        );

        let mut pgtiou = None;
        if let Some(pgt_url) = request.pgt_url.as_deref() {
            match self
                .issue_proxy_granting_ticket(Some(pgt_url), &record)
                .await?
            {
                Some(iou) => pgtiou = Some(iou),
                None => {
                    status = ValidationStatus::InvalidProxyCallback;
                    reason = format!("Proxy callback failed for \"{pgt_url}\" with ticket {token}");
                }
            }
        }

        Ok(Validation {
            status,
            reason,
            ticket: Some(record),
            pgtiou,
        })
    }
}
