//! Pre-approval extraction from a raw `getPreaprobado` response.
//!
//! The schema-aware decoding drops part of this response, so the reply is
//! built from the raw envelope instead: the client result, its detail and the
//! pre-approval letter, each with namespaced keys stripped.

use serde_json::{Map, Value};

use crate::error::CrmError;
use crate::normalize::{element_to_json, get_local, strip_key_prefixes, take_local, KeyPrefixPolicy};
use crate::xml::XmlNode;

pub const RESPONSE_ELEMENT: &str = "getPreaprobadoResponse";

/// Builds `{result_client, result_client_detail, preaproved_letter}`.
pub fn extract_preapproval(
    envelope: &XmlNode,
    policy: &KeyPrefixPolicy,
) -> Result<Value, CrmError> {
    let document = element_to_json(envelope);
    let result = navigate(&document, &["Envelope", "Body", RESPONSE_ELEMENT, "return"])?;
    let result = result.as_object().ok_or_else(|| {
        CrmError::UnexpectedResponse("pre-approval return is not a structure".to_string())
    })?;

    let mut client = match get_local(result, "resultadoCliente") {
        Some(Value::Object(client)) => client.clone(),
        _ => {
            return Err(CrmError::UnexpectedResponse(
                "pre-approval response has no resultadoCliente".to_string(),
            ))
        }
    };
    let detail = match take_local(&mut client, "detalle") {
        Some(Value::Object(detail)) => Value::Object(strip_key_prefixes(detail, policy)),
        Some(other) => other,
        None => Value::Null,
    };
    let letter = get_local(result, "cartaPreaprobado")
        .cloned()
        .unwrap_or(Value::Null);

    let mut response = Map::new();
    response.insert(
        "result_client".to_string(),
        Value::Object(strip_key_prefixes(client, policy)),
    );
    response.insert("result_client_detail".to_string(), detail);
    response.insert("preaproved_letter".to_string(), letter);
    Ok(Value::Object(strip_key_prefixes(response, policy)))
}

fn navigate<'v>(document: &'v Value, path: &[&str]) -> Result<&'v Value, CrmError> {
    path.iter().try_fold(document, |current, segment| {
        current
            .as_object()
            .and_then(|map| get_local(map, segment))
            .ok_or_else(|| {
                CrmError::UnexpectedResponse(format!("pre-approval response is missing {segment}"))
            })
    })
}
