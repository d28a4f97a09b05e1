//! Inbound SAML 1.1 backchannel validation requests.
//!
//! The samlValidate endpoint receives a SOAP-wrapped `samlp:Request` whose
//! single `AssertionArtifact` carries the service ticket to validate. Only
//! parsing and sanity checks live here; assertion issuance is out of scope.

use crate::errors::SamlError;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Clock skew allowance for requests claiming to originate in the future.
pub const CLOCK_SKEW_SECS: i64 = 10;

/// Requests older than this are rejected.
pub const MAX_AGE_SECS: i64 = 60 * 60;

/// A parsed SAML 1.1 validation request.
#[derive(Debug, Clone)]
pub struct SamlValidateRequest {
    /// When the requester claims to have issued the request.
    pub issue_instant: DateTime<Utc>,
    /// `MajorVersion.MinorVersion` as presented.
    pub version: String,
    /// Requester-chosen ID. Could be echoed as the response's
    /// `InResponseTo`, but no CAS client is known to check it.
    pub request_id: String,
    /// The service ticket from the `AssertionArtifact` element.
    pub ticket: String,
}

impl SamlValidateRequest {
    /// Parse a SOAP/SAML request envelope.
    pub fn parse(xml: &str) -> Result<Self, SamlError> {
        let mut reader = Reader::from_str(xml);

        let mut saw_request = false;
        let mut in_request = false;
        let mut in_artifact = false;
        let mut issue_instant = None;
        let mut version = None;
        let mut request_id = None;
        let mut ticket: Option<String> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| SamlError::Malformed(e.to_string()))?;
            match event {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"Request" => {
                        saw_request = true;
                        in_request = true;

                        let mut major = None;
                        let mut minor = None;
                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| SamlError::Malformed(e.to_string()))?;
                            let value = attr
                                .unescape_value()
                                .map_err(|e| SamlError::Malformed(e.to_string()))?;
                            match attr.key.local_name().as_ref() {
                                b"IssueInstant" => {
                                    issue_instant = Some(parse_saml_instant(&value)?);
                                }
                                b"MajorVersion" => major = Some(value.into_owned()),
                                b"MinorVersion" => minor = Some(value.into_owned()),
                                b"RequestID" => request_id = Some(value.into_owned()),
                                _ => {}
                            }
                        }
                        if let (Some(major), Some(minor)) = (major, minor) {
                            version = Some(format!("{major}.{minor}"));
                        }
                    }
                    b"AssertionArtifact" if in_request => in_artifact = true,
                    _ => {}
                },
                Event::Text(t) if in_artifact => {
                    let text = t
                        .unescape()
                        .map_err(|e| SamlError::Malformed(e.to_string()))?;
                    ticket = Some(text.trim().to_string());
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"AssertionArtifact" => in_artifact = false,
                    b"Request" => in_request = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_request {
            return Err(SamlError::Missing("xml Request"));
        }

        Ok(Self {
            issue_instant: issue_instant.ok_or(SamlError::Missing("Request IssueInstant"))?,
            version: version.ok_or(SamlError::Missing("Request version"))?,
            request_id: request_id.ok_or(SamlError::Missing("RequestID"))?,
            ticket: ticket.ok_or(SamlError::Missing("AssertionArtifact"))?,
        })
    }

    /// Sanity-check the request against the current clock.
    pub fn validate(&self) -> Result<(), SamlError> {
        self.validate_at(Utc::now())
    }

    /// Sanity-check the request as of `now`.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), SamlError> {
        if self.version != "1.1" {
            return Err(SamlError::UnsupportedVersion(self.version.clone()));
        }
        if now + chrono::Duration::seconds(CLOCK_SKEW_SECS) <= self.issue_instant {
            return Err(SamlError::IssueInstantInFuture);
        }
        if now - self.issue_instant >= chrono::Duration::seconds(MAX_AGE_SECS) {
            return Err(SamlError::IssueInstantTooOld);
        }
        if self.ticket.is_empty() {
            return Err(SamlError::EmptyTicket);
        }
        Ok(())
    }
}

/// Parse an ISO-8601 instant, fractional or whole-second, with timezone.
fn parse_saml_instant(raw: &str) -> Result<DateTime<Utc>, SamlError> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| SamlError::BadTimestamp(raw.to_string()))
}
