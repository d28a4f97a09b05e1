//! The tagged ticket model shared by every broker operation.
//!
//! Tickets are stored under an opaque random token whose prefix (`TGT-`,
//! `PGT-`, `ST-`, `PT-`) is used only for downstream dispatch. The record
//! itself carries an explicit discriminant; trust decisions never depend on
//! parsing the token beyond its prefix.

use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute map released with a ticket, as received from the upstream
/// identity provider.
pub type AttributeMap = HashMap<String, serde_json::Value>;

/// The four ticket kinds of the CAS protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketKind {
    TicketGranting,
    ProxyGranting,
    Service,
    Proxy,
}

impl TicketKind {
    /// Token prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            TicketKind::TicketGranting => "TGT-",
            TicketKind::ProxyGranting => "PGT-",
            TicketKind::Service => "ST-",
            TicketKind::Proxy => "PT-",
        }
    }

    /// Classify a token string by its prefix.
    pub fn from_token(token: &str) -> Option<TicketKind> {
        [
            TicketKind::TicketGranting,
            TicketKind::ProxyGranting,
            TicketKind::Service,
            TicketKind::Proxy,
        ]
        .into_iter()
        .find(|kind| token.starts_with(kind.prefix()))
    }

    /// Mint a fresh token of this kind: prefix plus a 256-bit random suffix.
    pub fn mint(&self) -> String {
        format!("{}{}", self.prefix(), random_suffix())
    }
}

/// Mint a PGTIOU correlation token. The IOU is never stored as a record; it
/// is returned to the validating caller so it can pair the synchronous
/// callback receipt with the later validation response.
pub fn mint_pgtiou() -> String {
    format!("PGTIOU-{}", random_suffix())
}

fn random_suffix() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// A stored ticket record, selected by explicit discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TicketRecord {
    /// Proof of a browser's authenticated session.
    TicketGranting {
        username: String,
        attributes: AttributeMap,
    },

    /// Granting ticket minted for a proxy-capable service after its callback
    /// confirmed receipt. `proxies` records every hop that requested a PGT,
    /// most recent first.
    ProxyGranting {
        username: String,
        attributes: AttributeMap,
        proxies: Vec<String>,
    },

    /// One-shot token redeemed by a service to confirm a user's identity.
    Service {
        service: String,
        username: String,
        attributes: AttributeMap,
        creds_presented: bool,
    },

    /// One-shot token redeemed through a proxy chain. The chain is inherited
    /// verbatim from the parent PGT at issuance and never mutated.
    Proxy {
        service: String,
        username: String,
        attributes: AttributeMap,
        creds_presented: bool,
        proxies: Vec<String>,
    },
}

impl TicketRecord {
    /// Kind discriminant of this record.
    pub fn kind(&self) -> TicketKind {
        match self {
            TicketRecord::TicketGranting { .. } => TicketKind::TicketGranting,
            TicketRecord::ProxyGranting { .. } => TicketKind::ProxyGranting,
            TicketRecord::Service { .. } => TicketKind::Service,
            TicketRecord::Proxy { .. } => TicketKind::Proxy,
        }
    }

    /// Username the ticket vouches for.
    pub fn username(&self) -> &str {
        match self {
            TicketRecord::TicketGranting { username, .. }
            | TicketRecord::ProxyGranting { username, .. }
            | TicketRecord::Service { username, .. }
            | TicketRecord::Proxy { username, .. } => username,
        }
    }

    /// Attribute map released with the ticket.
    pub fn attributes(&self) -> &AttributeMap {
        match self {
            TicketRecord::TicketGranting { attributes, .. }
            | TicketRecord::ProxyGranting { attributes, .. }
            | TicketRecord::Service { attributes, .. }
            | TicketRecord::Proxy { attributes, .. } => attributes,
        }
    }

    /// Bound service URL, present on ST and PT records only.
    pub fn service(&self) -> Option<&str> {
        match self {
            TicketRecord::Service { service, .. } | TicketRecord::Proxy { service, .. } => {
                Some(service)
            }
            _ => None,
        }
    }

    /// Proxy hop chain, empty for non-proxy records.
    pub fn proxies(&self) -> &[String] {
        match self {
            TicketRecord::ProxyGranting { proxies, .. } | TicketRecord::Proxy { proxies, .. } => {
                proxies
            }
            _ => &[],
        }
    }

    /// Whether primary credentials were presented when this ticket was
    /// granted. Gates `renew` validation; always false for granting tickets
    /// and proxy tickets.
    pub fn creds_presented(&self) -> bool {
        match self {
            TicketRecord::Service {
                creds_presented, ..
            }
            | TicketRecord::Proxy {
                creds_presented, ..
            } => *creds_presented,
            _ => false,
        }
    }

    /// Whether this record travelled through a proxy chain.
    pub fn is_proxy(&self) -> bool {
        matches!(
            self,
            TicketRecord::ProxyGranting { .. } | TicketRecord::Proxy { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_carry_prefix_and_entropy() {
        let tgt = TicketKind::TicketGranting.mint();
        let st = TicketKind::Service.mint();
        assert!(tgt.starts_with("TGT-"));
        assert!(st.starts_with("ST-"));
        // 32 bytes of base64url are 43 chars
        assert_eq!(tgt.len(), "TGT-".len() + 43);
        assert_ne!(TicketKind::Service.mint(), st);
    }

    #[test]
    fn token_kind_dispatch_by_prefix() {
        assert_eq!(TicketKind::from_token("ST-abc"), Some(TicketKind::Service));
        assert_eq!(TicketKind::from_token("PT-abc"), Some(TicketKind::Proxy));
        assert_eq!(
            TicketKind::from_token("PGT-abc"),
            Some(TicketKind::ProxyGranting)
        );
        assert_eq!(
            TicketKind::from_token("TGT-abc"),
            Some(TicketKind::TicketGranting)
        );
        assert_eq!(TicketKind::from_token("PGTIOU-abc"), None);
        assert_eq!(TicketKind::from_token("garbage"), None);
    }

    #[test]
    fn record_roundtrips_with_explicit_discriminant() {
        let record = TicketRecord::Proxy {
            service: "https://svc.example/".into(),
            username: "ada".into(),
            attributes: AttributeMap::new(),
            creds_presented: false,
            proxies: vec!["https://proxy.example/cb".into()],
        };

        let bytes = serde_json::to_vec(&record).expect("serialize record");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["kind"], "proxy");

        let back: TicketRecord = serde_json::from_slice(&bytes).expect("deserialize record");
        assert_eq!(back, record);
        assert_eq!(back.kind(), TicketKind::Proxy);
        assert_eq!(back.proxies().len(), 1);
    }

    #[test]
    fn accessors_cover_all_variants() {
        let tgt = TicketRecord::TicketGranting {
            username: "ada".into(),
            attributes: AttributeMap::new(),
        };
        assert_eq!(tgt.username(), "ada");
        assert_eq!(tgt.service(), None);
        assert!(tgt.proxies().is_empty());
        assert!(!tgt.creds_presented());
        assert!(!tgt.is_proxy());

        let pgt = TicketRecord::ProxyGranting {
            username: "ada".into(),
            attributes: AttributeMap::new(),
            proxies: vec!["https://proxy.example/cb".into()],
        };
        assert!(pgt.is_proxy());
        assert_eq!(pgt.proxies(), ["https://proxy.example/cb".to_string()]);
    }
}
