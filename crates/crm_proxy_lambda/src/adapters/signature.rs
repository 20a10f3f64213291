//! WS-Security header construction for outgoing envelopes.

use chrono::{DateTime, Duration, Utc};
use crm_proxy_core::{CrmError, XmlNode};

pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
pub const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const BASE64_ENCODING: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";
pub const X509_VALUE_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3";

const TOKEN_ID: &str = "X509-token";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

pub trait EnvelopeSigner {
    fn apply(&self, envelope: &mut XmlNode) -> Result<(), CrmError>;
}

/// Leaves envelopes untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsignedEnvelope;

impl EnvelopeSigner for UnsignedEnvelope {
    fn apply(&self, _envelope: &mut XmlNode) -> Result<(), CrmError> {
        Ok(())
    }
}

/// Timestamped binary-token security header whose key reference is rewritten
/// into an inline `wsse:KeyIdentifier`, the form the CRM accepts.
#[derive(Debug, Clone)]
pub struct BinarySignatureTimestamp {
    token: String,
    validity: Duration,
}

impl BinarySignatureTimestamp {
    pub fn from_pem(pem: &str) -> Result<Self, CrmError> {
        let start = pem
            .find(PEM_BEGIN)
            .ok_or_else(|| CrmError::Signature("certificate PEM has no BEGIN marker".to_string()))?;
        let body = &pem[start + PEM_BEGIN.len()..];
        let end = body
            .find(PEM_END)
            .ok_or_else(|| CrmError::Signature("certificate PEM has no END marker".to_string()))?;

        let token = body[..end]
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if token.is_empty() {
            return Err(CrmError::Signature("certificate PEM is empty".to_string()));
        }

        Ok(Self {
            token,
            validity: Duration::minutes(5),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Security header as issued before the key-reference rewrite.
    pub fn security_header(&self, created: DateTime<Utc>) -> XmlNode {
        let expires = created + self.validity;
        let timestamp = XmlNode::new("wsu:Timestamp")
            .with_attribute("wsu:Id", "TS-1")
            .with_child(
                XmlNode::new("wsu:Created").with_text(created.format(TIMESTAMP_FORMAT).to_string()),
            )
            .with_child(
                XmlNode::new("wsu:Expires").with_text(expires.format(TIMESTAMP_FORMAT).to_string()),
            );

        let token = XmlNode::new("wsse:BinarySecurityToken")
            .with_attribute("EncodingType", BASE64_ENCODING)
            .with_attribute("ValueType", X509_VALUE_TYPE)
            .with_attribute("wsu:Id", TOKEN_ID)
            .with_text(self.token.clone());

        let key_info = XmlNode::new("ds:KeyInfo").with_child(
            XmlNode::new("wsse:SecurityTokenReference").with_child(
                XmlNode::new("wsse:Reference")
                    .with_attribute("URI", format!("#{TOKEN_ID}"))
                    .with_attribute("ValueType", X509_VALUE_TYPE),
            ),
        );
        let signature = XmlNode::new("ds:Signature")
            .with_attribute("xmlns:ds", DS_NS)
            .with_child(key_info);

        XmlNode::new("wsse:Security")
            .with_attribute("xmlns:wsse", WSSE_NS)
            .with_attribute("xmlns:wsu", WSU_NS)
            .with_child(token)
            .with_child(signature)
            .with_child(timestamp)
    }
}

impl EnvelopeSigner for BinarySignatureTimestamp {
    fn apply(&self, envelope: &mut XmlNode) -> Result<(), CrmError> {
        let mut security = self.security_header(Utc::now());
        rewrite_key_reference(&mut security)?;
        header_of(envelope).children.push(security);
        Ok(())
    }
}

/// Replaces the `wsse:Reference` under the token reference with a
/// `wsse:KeyIdentifier` carrying the token value, then drops the token.
pub fn rewrite_key_reference(security: &mut XmlNode) -> Result<(), CrmError> {
    let token = security
        .child("BinarySecurityToken")
        .and_then(|token| token.text.as_deref())
        .map(|text| text.replace('\n', ""))
        .ok_or_else(|| {
            CrmError::Signature("security header has no BinarySecurityToken".to_string())
        })?;

    let reference = security.descendant_mut("SecurityTokenReference").ok_or_else(|| {
        CrmError::Signature("security header has no SecurityTokenReference".to_string())
    })?;
    reference.remove_child("Reference");
    reference.children.push(
        XmlNode::new("wsse:KeyIdentifier")
            .with_attribute("EncodingType", BASE64_ENCODING)
            .with_attribute("ValueType", X509_VALUE_TYPE)
            .with_text(token),
    );

    security.remove_child("BinarySecurityToken");
    Ok(())
}

fn header_of(envelope: &mut XmlNode) -> &mut XmlNode {
    let position = envelope
        .children
        .iter()
        .position(|child| child.local_name() == "Header");
    let index = match position {
        Some(index) => index,
        None => {
            let prefix = envelope
                .tag
                .split_once(':')
                .map(|(prefix, _)| format!("{prefix}:"))
                .unwrap_or_default();
            envelope
                .children
                .insert(0, XmlNode::new(format!("{prefix}Header")));
            0
        }
    };
    &mut envelope.children[index]
}
