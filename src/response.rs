//! Machine-readable CAS response bodies.
//!
//! Pure renderers: each constructor returns a content type and a body
//! string, and knows nothing about HTTP. The adapter picks XML or JSON from
//! the request's `format` parameter and wraps the body in a response with
//! its own cache headers.

use crate::tickets::TicketRecord;
use crate::validation::{Validation, ValidationStatus};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::time::Duration;

/// Response encodings offered by the v2/v3 validation endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Xml,
    Json,
}

/// A rendered protocol response body.
#[derive(Debug, Clone)]
pub struct CasResponseBody {
    pub content_type: &'static str,
    pub body: String,
}

impl CasResponseBody {
    fn xml(body: String) -> Self {
        Self {
            content_type: "application/xml",
            body,
        }
    }

    fn json(value: serde_json::Value) -> Self {
        Self {
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    fn text(body: String) -> Self {
        Self {
            content_type: "text/plain",
            body,
        }
    }

    /// Successful `/serviceValidate` / `/proxyValidate` response.
    pub fn auth_success(validation: &Validation, encoding: Encoding) -> Self {
        let record = validation
            .ticket
            .as_ref()
            .expect("success responses carry the validated record");

        match encoding {
            Encoding::Json => {
                let mut auth = json!({
                    "user": record.username(),
                    "attributes": record.attributes(),
                });
                if let Some(pgtiou) = &validation.pgtiou {
                    auth["proxyGrantingTicket"] = json!(pgtiou);
                }
                if record.is_proxy() && !record.proxies().is_empty() {
                    auth["proxies"] = json!(record.proxies());
                }
                Self::json(json!({ "serviceResponse": { "authenticationSuccess": auth } }))
            }
            Encoding::Xml => {
                let mut inner = format!(
                    "        <cas:user>{}</cas:user>\n{}",
                    xml_escape(record.username()),
                    attributes_xml(record)
                );
                if let Some(pgtiou) = &validation.pgtiou {
                    inner.push_str(&format!(
                        "        <cas:proxyGrantingTicket>{}</cas:proxyGrantingTicket>\n",
                        xml_escape(pgtiou)
                    ));
                }
                if record.is_proxy() && !record.proxies().is_empty() {
                    inner.push_str("        <cas:proxies>\n");
                    for proxy in record.proxies() {
                        inner.push_str(&format!(
                            "            <cas:proxy>{}</cas:proxy>\n",
                            xml_escape(proxy)
                        ));
                    }
                    inner.push_str("        </cas:proxies>\n");
                }
                Self::xml(format!(
                    "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\n    <cas:authenticationSuccess>\n{inner}    </cas:authenticationSuccess>\n</cas:serviceResponse>\n"
                ))
            }
        }
    }

    /// Failed `/serviceValidate` / `/proxyValidate` response.
    pub fn auth_failure(status: ValidationStatus, reason: &str, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Json => Self::json(json!({
                "serviceResponse": {
                    "authenticationFailure": {
                        "code": status.as_str(),
                        "description": reason,
                    }
                }
            })),
            Encoding::Xml => Self::xml(format!(
                "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\n    <cas:authenticationFailure code=\"{}\">{}</cas:authenticationFailure>\n</cas:serviceResponse>\n",
                status.as_str(),
                xml_escape(reason)
            )),
        }
    }

    /// Successful `/proxy` response carrying the freshly minted PT.
    pub fn proxy_success(proxy_ticket: &str, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Json => Self::json(json!({
                "serviceResponse": { "proxySuccess": { "proxyTicket": proxy_ticket } }
            })),
            Encoding::Xml => Self::xml(format!(
                "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\n    <cas:proxySuccess>\n        <cas:proxyTicket>{}</cas:proxyTicket>\n    </cas:proxySuccess>\n</cas:serviceResponse>\n",
                xml_escape(proxy_ticket)
            )),
        }
    }

    /// Failed `/proxy` response.
    pub fn proxy_failure(status: ValidationStatus, reason: &str, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Json => Self::json(json!({
                "serviceResponse": {
                    "proxyFailure": {
                        "code": status.as_str(),
                        "description": reason,
                    }
                }
            })),
            Encoding::Xml => Self::xml(format!(
                "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\n    <cas:proxyFailure code=\"{}\">{}</cas:proxyFailure>\n</cas:serviceResponse>\n",
                status.as_str(),
                xml_escape(reason)
            )),
        }
    }

    /// CAS v1 `/validate` plain-text response.
    pub fn v1_validate(validation: &Validation) -> Self {
        match (&validation.status, &validation.ticket) {
            (ValidationStatus::Ok, Some(record)) => {
                Self::text(format!("yes\n{}\n", record.username()))
            }
            _ => Self::text("no\n".to_string()),
        }
    }

    /// Successful `/samlValidate` response: a SOAP envelope with an embedded
    /// unsigned assertion valid for `lifetime`.
    pub fn saml_success(record: &TicketRecord, issuer: &str, lifetime: Duration) -> Self {
        let now = Utc::now();
        let issue_instant = saml_instant(now);
        let not_on_or_after = saml_instant(
            now + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::zero()),
        );
        // the attribute map records the upstream authentication instant as
        // unix seconds; absent that, we lie and use the response time
        let auth_instant = record
            .attributes()
            .get("authenticated")
            .and_then(|value| value.as_i64())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(saml_instant)
            .unwrap_or_else(|| issue_instant.clone());

        let service = xml_escape(record.service().unwrap_or_default());
        let username = xml_escape(record.username());
        let issuer = xml_escape(issuer);

        let mut attribute_xml = String::new();
        for (name, value) in record.attributes() {
            for text in attribute_values(value) {
                attribute_xml.push_str(&format!(
                    "          <Attribute AttributeName=\"{}\" AttributeNamespace=\"http://www.ja-sig.org/products/cas/\">\n            <AttributeValue>{}</AttributeValue>\n          </Attribute>\n",
                    xml_escape(name),
                    xml_escape(&text)
                ));
            }
        }

        let subject = format!(
            "            <Subject>\n              <NameIdentifier>{username}</NameIdentifier>\n              <SubjectConfirmation>\n                <ConfirmationMethod>urn:oasis:names:tc:SAML:1.0:cm:artifact</ConfirmationMethod>\n              </SubjectConfirmation>\n            </Subject>\n"
        );

        Self::xml(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\">\n  <SOAP-ENV:Body>\n    <Response xmlns=\"urn:oasis:names:tc:SAML:1.0:protocol\" xmlns:samlp=\"urn:oasis:names:tc:SAML:1.0:protocol\"\n        IssueInstant=\"{issue_instant}\" MajorVersion=\"1\" MinorVersion=\"1\" ResponseID=\"{response_id}\">\n      <Status>\n        <StatusCode Value=\"samlp:Success\"/>\n      </Status>\n      <Assertion xmlns=\"urn:oasis:names:tc:SAML:1.0:assertion\" AssertionID=\"{assertion_id}\"\n          IssueInstant=\"{issue_instant}\" Issuer=\"{issuer}\" MajorVersion=\"1\" MinorVersion=\"1\">\n        <Conditions NotBefore=\"{issue_instant}\" NotOnOrAfter=\"{not_on_or_after}\">\n          <AudienceRestrictionCondition>\n            <Audience>{service}</Audience>\n          </AudienceRestrictionCondition>\n        </Conditions>\n        <AttributeStatement>\n{subject}{attribute_xml}        </AttributeStatement>\n        <AuthenticationStatement AuthenticationInstant=\"{auth_instant}\"\n            AuthenticationMethod=\"urn:oasis:names:tc:SAML:1.0:am:unspecified\">\n{subject}        </AuthenticationStatement>\n      </Assertion>\n    </Response>\n  </SOAP-ENV:Body>\n</SOAP-ENV:Envelope>\n",
            response_id = new_response_id(),
            assertion_id = new_response_id(),
        ))
    }

    /// Failed `/samlValidate` response: requester-side status with a message.
    pub fn saml_failure(message: &str) -> Self {
        Self::xml(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\">\n  <SOAP-ENV:Body>\n    <Response xmlns=\"urn:oasis:names:tc:SAML:1.0:protocol\" xmlns:samlp=\"urn:oasis:names:tc:SAML:1.0:protocol\"\n        IssueInstant=\"{issue_instant}\" MajorVersion=\"1\" MinorVersion=\"1\" ResponseID=\"{response_id}\">\n      <Status>\n        <StatusCode Value=\"samlp:Requestor\"/>\n        <StatusMessage>{message}</StatusMessage>\n      </Status>\n    </Response>\n  </SOAP-ENV:Body>\n</SOAP-ENV:Envelope>\n",
            issue_instant = saml_instant(Utc::now()),
            response_id = new_response_id(),
            message = xml_escape(message),
        ))
    }
}

fn attributes_xml(record: &TicketRecord) -> String {
    if record.attributes().is_empty() {
        return String::new();
    }
    let mut out = String::from("        <cas:attributes>\n");
    for (name, value) in record.attributes() {
        for text in attribute_values(value) {
            out.push_str(&format!(
                "            <cas:{name}>{}</cas:{name}>\n",
                xml_escape(&text)
            ));
        }
    }
    out.push_str("        </cas:attributes>\n");
    out
}

/// Flatten an attribute value into its released texts; arrays become one
/// entry per element.
fn attribute_values(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items.iter().map(value_text).collect(),
        other => vec![value_text(other)],
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn saml_instant(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn new_response_id() -> String {
    format!("_id{}", uuid::Uuid::new_v4())
}

/// Escape XML-reserved characters.
fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::AttributeMap;
    use serde_json::Value;

    fn service_record() -> TicketRecord {
        let mut attributes = AttributeMap::new();
        attributes.insert("uid".into(), json!("ada"));
        attributes.insert("groups".into(), json!(["staff", "admin"]));
        TicketRecord::Service {
            service: "https://svc.example/".into(),
            username: "ada".into(),
            attributes,
            creds_presented: true,
        }
    }

    fn ok_validation(pgtiou: Option<String>) -> Validation {
        Validation {
            status: ValidationStatus::Ok,
            reason: "ok".into(),
            ticket: Some(service_record()),
            pgtiou,
        }
    }

    #[test]
    fn json_success_shape() {
        let body = CasResponseBody::auth_success(
            &ok_validation(Some("PGTIOU-x".into())),
            Encoding::Json,
        );
        assert_eq!(body.content_type, "application/json");

        let value: Value = serde_json::from_str(&body.body).expect("valid json");
        let auth = &value["serviceResponse"]["authenticationSuccess"];
        assert_eq!(auth["user"], "ada");
        assert_eq!(auth["attributes"]["uid"], "ada");
        assert_eq!(auth["proxyGrantingTicket"], "PGTIOU-x");
        // an ST releases no proxy chain
        assert!(auth.get("proxies").is_none());
    }

    #[test]
    fn json_success_includes_proxy_chain_for_pt() {
        let validation = Validation {
            status: ValidationStatus::Ok,
            reason: "ok".into(),
            ticket: Some(TicketRecord::Proxy {
                service: "https://svc.example/".into(),
                username: "ada".into(),
                attributes: AttributeMap::new(),
                creds_presented: false,
                proxies: vec!["https://proxy.example/cb".into()],
            }),
            pgtiou: None,
        };

        let body = CasResponseBody::auth_success(&validation, Encoding::Json);
        let value: Value = serde_json::from_str(&body.body).expect("valid json");
        assert_eq!(
            value["serviceResponse"]["authenticationSuccess"]["proxies"][0],
            "https://proxy.example/cb"
        );
    }

    #[test]
    fn xml_success_carries_user_and_attributes() {
        let body = CasResponseBody::auth_success(&ok_validation(None), Encoding::Xml);
        assert_eq!(body.content_type, "application/xml");
        assert!(body.body.contains("<cas:authenticationSuccess>"));
        assert!(body.body.contains("<cas:user>ada</cas:user>"));
        assert!(body.body.contains("<cas:uid>ada</cas:uid>"));
        assert!(body.body.contains("<cas:groups>staff</cas:groups>"));
        assert!(body.body.contains("<cas:groups>admin</cas:groups>"));
        assert!(!body.body.contains("proxyGrantingTicket"));
    }

    #[test]
    fn failure_bodies_carry_code_and_description() {
        let xml = CasResponseBody::auth_failure(
            ValidationStatus::InvalidTicket,
            "Can not find ticket \"ST-x\"",
            Encoding::Xml,
        );
        assert!(xml.body.contains("code=\"INVALID_TICKET\""));
        assert!(xml.body.contains("Can not find ticket &quot;ST-x&quot;"));

        let json = CasResponseBody::auth_failure(
            ValidationStatus::InvalidService,
            "wrong service",
            Encoding::Json,
        );
        let value: Value = serde_json::from_str(&json.body).expect("valid json");
        assert_eq!(
            value["serviceResponse"]["authenticationFailure"]["code"],
            "INVALID_SERVICE"
        );
    }

    #[test]
    fn proxy_bodies() {
        let ok = CasResponseBody::proxy_success("PT-abc", Encoding::Xml);
        assert!(ok.body.contains("<cas:proxyTicket>PT-abc</cas:proxyTicket>"));

        let err = CasResponseBody::proxy_failure(
            ValidationStatus::InvalidRequest,
            "Both a pgt and targetService is required.",
            Encoding::Json,
        );
        let value: Value = serde_json::from_str(&err.body).expect("valid json");
        assert_eq!(
            value["serviceResponse"]["proxyFailure"]["code"],
            "INVALID_REQUEST"
        );
    }

    #[test]
    fn v1_yes_and_no() {
        let ok = CasResponseBody::v1_validate(&ok_validation(None));
        assert_eq!(ok.content_type, "text/plain");
        assert_eq!(ok.body, "yes\nada\n");

        let failed = Validation {
            status: ValidationStatus::InvalidTicket,
            reason: "gone".into(),
            ticket: None,
            pgtiou: None,
        };
        assert_eq!(CasResponseBody::v1_validate(&failed).body, "no\n");
    }

    #[test]
    fn saml_success_embeds_assertion() {
        let body = CasResponseBody::saml_success(
            &service_record(),
            "cas.example.com",
            Duration::from_secs(28800),
        );
        assert!(body.body.contains("StatusCode Value=\"samlp:Success\""));
        assert!(body.body.contains("<NameIdentifier>ada</NameIdentifier>"));
        assert!(body.body.contains("AttributeName=\"uid\""));
        assert!(body.body.contains("<Audience>https://svc.example/</Audience>"));
        assert!(body.body.contains("AuthenticationStatement"));
    }

    #[test]
    fn saml_failure_reports_requestor_status() {
        let body = CasResponseBody::saml_failure("Request IssueInstant too old");
        assert!(body.body.contains("StatusCode Value=\"samlp:Requestor\""));
        assert!(body
            .body
            .contains("<StatusMessage>Request IssueInstant too old</StatusMessage>"));
    }

    #[test]
    fn xml_escaping() {
        assert_eq!(
            xml_escape(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&apos;"
        );
    }
}
