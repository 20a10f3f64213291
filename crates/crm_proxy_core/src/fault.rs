//! SOAP faults and their rendering into reply envelopes.

use serde_json::{Map, Value};

use crate::envelope::ReplyEnvelope;
use crate::xml::XmlNode;

pub const UNDEFINED_ERROR: &str = "Error indefinido.";

/// Location of the business description inside the CRM's fault detail.
pub const DESCRIPTION_PATH: [&str; 4] = [
    "proptechEndPointServiceFaultException",
    "ServiceFaultException",
    "serviceStatus",
    "description",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultDetail {
    Tree(XmlNode),
    /// Detail the server sent as an opaque payload.
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: Option<String>,
    pub message: Option<String>,
    pub actor: Option<String>,
    pub detail: Option<FaultDetail>,
}

impl SoapFault {
    /// Reads a SOAP 1.1 (`faultstring`, `detail`) or SOAP 1.2 (`Reason`,
    /// `Detail`) fault element.
    pub fn from_element(fault: &XmlNode) -> Self {
        let text_of = |node: Option<&XmlNode>| node.and_then(|node| node.text.clone());

        let code = text_of(fault.child("faultcode"))
            .or_else(|| text_of(fault.find_path(&["Code", "Value"])));
        let message = text_of(fault.child("faultstring"))
            .or_else(|| text_of(fault.find_path(&["Reason", "Text"])));
        let actor = text_of(fault.child("faultactor")).or_else(|| text_of(fault.child("Role")));
        let detail = fault
            .child("detail")
            .or_else(|| fault.child("Detail"))
            .cloned()
            .map(FaultDetail::Tree);

        Self {
            code,
            message,
            actor,
            detail,
        }
    }

    pub fn fault_string(&self) -> &str {
        self.message.as_deref().unwrap_or(UNDEFINED_ERROR)
    }

    /// Business description nested in the detail tree, when present.
    pub fn description(&self) -> Option<&str> {
        match &self.detail {
            Some(FaultDetail::Tree(detail)) => detail
                .find_path(&DESCRIPTION_PATH)
                .and_then(|node| node.text.as_deref()),
            _ => None,
        }
    }

    /// Fault string followed by the description, joined with `". "`.
    pub fn combined_message(&self) -> String {
        match self.description() {
            Some(description) => format!("{}. {description}", self.fault_string()),
            None => self.fault_string().to_string(),
        }
    }
}

impl std::fmt::Display for SoapFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.fault_string())
    }
}

impl std::error::Error for SoapFault {}

/// Renders a fault detail as `[tag, value]`, recursively.
pub fn render_detail(detail: &FaultDetail) -> Value {
    match detail {
        FaultDetail::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        FaultDetail::Tree(node) => {
            let (tag, value) = detail_entry(node);
            Value::Array(vec![Value::String(tag), value])
        }
    }
}

// Text-less nodes with attributes render their attributes; everything else
// renders its children keyed by tag, or its text when it has no children.
fn detail_entry(node: &XmlNode) -> (String, Value) {
    if node.text.is_none() && node.has_data_attributes() {
        let attributes: Map<String, Value> = node
            .data_attributes()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        return (node.tag.clone(), Value::Object(attributes));
    }

    let children: Map<String, Value> = node
        .children
        .iter()
        .map(detail_entry)
        .collect();
    if !children.is_empty() {
        return (node.tag.clone(), Value::Object(children));
    }

    let text = node
        .text
        .as_ref()
        .map(|text| Value::String(text.clone()))
        .unwrap_or(Value::Null);
    (node.tag.clone(), text)
}

pub fn render_fault(fault: &SoapFault, function: &str) -> ReplyEnvelope {
    let payload = fault
        .detail
        .as_ref()
        .map(render_detail)
        .unwrap_or(Value::Null);
    ReplyEnvelope::failure(fault.to_string(), payload, function)
}
