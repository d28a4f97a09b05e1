//! The samlValidate backchannel: SOAP/SAML 1.1 request in, ticket validation
//! through the same ladder, SAML envelope out.

use cas_bridge::{
    AttributeMap, CasConfig, CasResponseBody, MemoryTicketStore, SamlValidateRequest,
    TicketManager, TicketRecord, ValidationRequest, ValidationStatus,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

fn manager() -> TicketManager {
    let config = CasConfig::default().saml_validate_support(true);
    TicketManager::new(config, Arc::new(MemoryTicketStore::new())).expect("manager builds")
}

fn envelope(ticket: &str) -> String {
    let issue_instant = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <samlp:Request xmlns:samlp="urn:oasis:names:tc:SAML:1.0:protocol"
        MajorVersion="1" MinorVersion="1" RequestID="_sv-test"
        IssueInstant="{issue_instant}">
      <samlp:AssertionArtifact>{ticket}</samlp:AssertionArtifact>
    </samlp:Request>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
    )
}

#[tokio::test]
async fn saml_request_drives_the_validation_ladder() {
    let manager = manager();

    let mut attributes = AttributeMap::new();
    attributes.insert("uid".into(), json!("ada"));
    attributes.insert("authenticated".into(), json!(1_700_000_000));
    let granting = TicketRecord::TicketGranting {
        username: "ada".into(),
        attributes,
    };
    let ticket = manager
        .issue_ticket(&granting, "urn:federation:svc", false, false)
        .await
        .expect("issue st");

    // the adapter parses the POSTed envelope and hands the embedded ticket
    // plus the TARGET parameter to the ladder
    let request = SamlValidateRequest::parse(&envelope(&ticket)).expect("parse");
    request.validate().expect("well-formed request");

    let outcome = manager
        .validate_ticket(&ValidationRequest::new(request.ticket, "urn:federation:svc"))
        .await
        .expect("validate");
    assert_eq!(outcome.status, ValidationStatus::Ok);

    let record = outcome.ticket.expect("record");
    let body = CasResponseBody::saml_success(
        &record,
        "cas.example.com",
        manager.config().ticket_granting_ticket_lifetime,
    );
    assert_eq!(body.content_type, "application/xml");
    assert!(body.body.contains("samlp:Success"));
    assert!(body.body.contains("<NameIdentifier>ada</NameIdentifier>"));
    assert!(body.body.contains("<Audience>urn:federation:svc</Audience>"));
    // upstream authentication instant is carried into the assertion
    assert!(body.body.contains("AuthenticationInstant=\"2023-11-14T"));
}

#[tokio::test]
async fn failed_ladder_outcome_renders_a_requestor_failure() {
    let manager = manager();

    let request = SamlValidateRequest::parse(&envelope("ST-unknown")).expect("parse");
    request.validate().expect("well-formed request");

    let outcome = manager
        .validate_ticket(&ValidationRequest::new(request.ticket, "urn:federation:svc"))
        .await
        .expect("validate");
    assert_eq!(outcome.status, ValidationStatus::InvalidTicket);

    let body = CasResponseBody::saml_failure(&format!(
        "{} : {}",
        outcome.status, outcome.reason
    ));
    assert!(body.body.contains("samlp:Requestor"));
    assert!(body.body.contains("INVALID_TICKET"));
}

#[tokio::test]
async fn stale_saml_request_never_reaches_the_ladder() {
    let stale = format!(
        r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <samlp:Request xmlns:samlp="urn:oasis:names:tc:SAML:1.0:protocol"
        MajorVersion="1" MinorVersion="1" RequestID="_sv-test"
        IssueInstant="{}">
      <samlp:AssertionArtifact>ST-whatever</samlp:AssertionArtifact>
    </samlp:Request>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
        (Utc::now() - chrono::Duration::hours(2)).format("%Y-%m-%dT%H:%M:%S%.3fZ")
    );

    let request = SamlValidateRequest::parse(&stale).expect("parse");
    let err = request.validate().expect_err("stale request");
    let body = CasResponseBody::saml_failure(&err.to_string());
    assert!(body.body.contains("samlp:Requestor"));
    assert!(body.body.contains("IssueInstant too old"));
}
