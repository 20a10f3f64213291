//! SOAP client for the CRM service: envelope building, signing and response
//! parsing. Each call returns its own [`SoapResponse`] so the raw document is
//! available to the caller without any shared history.

use std::time::Instant;

use crm_proxy_core::fault::SoapFault;
use crm_proxy_core::normalize::{element_to_json, normalize, RemoteValue};
use crm_proxy_core::xml::parse_document;
use crm_proxy_core::{CrmError, XmlNode};
use serde_json::Value;

use crate::adapters::signature::EnvelopeSigner;
use crate::adapters::transport::SoapTransport;
use crate::config::ServiceDescriptor;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const REQUEST_ELEMENT: &str = "request";
pub const RESULT_ELEMENT: &str = "return";

const ENVELOPE_PREFIX: &str = "soapenv";
const SERVICE_PREFIX: &str = "svc";
const TYPES_PREFIX: &str = "dto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    GetListSelection,
    GetAdresPreguntaRequest,
    PostExisteCliente,
    GetListProyectosByConstructora,
    PostClienteRadicacion,
    PostCliente,
    GetPreaprobado,
}

impl RemoteOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetListSelection => "getListSelection",
            Self::GetAdresPreguntaRequest => "getAdresPreguntaRequest",
            Self::PostExisteCliente => "postExisteCliente",
            Self::GetListProyectosByConstructora => "getListProyectosByConstructora",
            Self::PostClienteRadicacion => "postClienteRadicacion",
            Self::PostCliente => "postCliente",
            Self::GetPreaprobado => "getPreaprobado",
        }
    }
}

/// Raw response of a single remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct SoapResponse {
    pub raw: String,
    pub envelope: XmlNode,
}

impl SoapResponse {
    pub fn parse(raw: String) -> Result<Self, CrmError> {
        let envelope = parse_document(&raw)?;
        if envelope.local_name() != "Envelope" {
            return Err(CrmError::UnexpectedResponse(format!(
                "expected a SOAP Envelope, got <{}>",
                envelope.tag
            )));
        }
        Ok(Self { raw, envelope })
    }

    pub fn body(&self) -> Result<&XmlNode, CrmError> {
        self.envelope
            .child("Body")
            .ok_or_else(|| CrmError::UnexpectedResponse("SOAP envelope has no Body".to_string()))
    }

    pub fn fault(&self) -> Option<SoapFault> {
        self.body()
            .ok()
            .and_then(|body| body.child("Fault"))
            .map(SoapFault::from_element)
    }

    /// Decoded `return` element of the operation response. Operations without
    /// a return value yield [`RemoteValue::Null`]. Elements named in
    /// `repeated` always decode as sequences.
    pub fn result(&self, repeated: &[String]) -> Result<RemoteValue, CrmError> {
        let response = self.body()?.children.first();
        Ok(response
            .and_then(|response| response.child(RESULT_ELEMENT))
            .map(|result| RemoteValue::from_element_with(result, repeated))
            .unwrap_or(RemoteValue::Null))
    }

    /// Document-shaped JSON of the body contents.
    pub fn body_json(&self) -> Result<Value, CrmError> {
        let body = self.body()?;
        Ok(match body.children.first() {
            Some(content) => element_to_json(content),
            None => Value::Null,
        })
    }
}

pub struct SoapClient<'a> {
    transport: &'a dyn SoapTransport,
    signer: &'a dyn EnvelopeSigner,
    descriptor: &'a ServiceDescriptor,
}

impl<'a> SoapClient<'a> {
    pub fn new(
        transport: &'a dyn SoapTransport,
        signer: &'a dyn EnvelopeSigner,
        descriptor: &'a ServiceDescriptor,
    ) -> Self {
        Self {
            transport,
            signer,
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        self.descriptor
    }

    /// Sends the operation and returns the response whether or not it is a
    /// fault.
    pub fn invoke(
        &self,
        operation: RemoteOperation,
        request: Option<&Value>,
    ) -> Result<SoapResponse, CrmError> {
        let mut envelope = build_envelope(self.descriptor, operation, request);
        self.signer.apply(&mut envelope)?;

        let started = Instant::now();
        tracing::info!(operation = operation.as_str(), "remote call started");
        let raw = self
            .transport
            .post_envelope(
                &self.descriptor.soap_action(operation.as_str()),
                &envelope.to_markup(),
            )
            .map_err(|error| {
                tracing::error!(operation = operation.as_str(), %error, "remote call failed");
                CrmError::Transport(error)
            })?;
        let response = SoapResponse::parse(raw)?;

        let duration_ms = started.elapsed().as_millis() as u64;
        if response.fault().is_some() {
            tracing::warn!(operation = operation.as_str(), duration_ms, "remote call faulted");
        } else {
            tracing::info!(operation = operation.as_str(), duration_ms, "remote call completed");
        }
        Ok(response)
    }

    /// Like [`SoapClient::invoke`], with faults raised as [`CrmError::Fault`].
    pub fn call(
        &self,
        operation: RemoteOperation,
        request: Option<&Value>,
    ) -> Result<SoapResponse, CrmError> {
        let response = self.invoke(operation, request)?;
        match response.fault() {
            Some(fault) => Err(CrmError::Fault(fault)),
            None => Ok(response),
        }
    }

    /// Calls the operation and normalizes its return value.
    pub fn call_normalized(
        &self,
        operation: RemoteOperation,
        request: Option<&Value>,
    ) -> Result<Value, CrmError> {
        let response = self.call(operation, request)?;
        Ok(normalize(&response.result(&self.descriptor.repeated_elements)?))
    }
}

/// Builds `<svc:operation><svc:request>...</svc:request></svc:operation>`
/// with request fields qualified in the DTO namespace.
pub fn build_envelope(
    descriptor: &ServiceDescriptor,
    operation: RemoteOperation,
    request: Option<&Value>,
) -> XmlNode {
    let mut call = XmlNode::new(format!("{SERVICE_PREFIX}:{}", operation.as_str()))
        .with_attribute(format!("xmlns:{SERVICE_PREFIX}"), descriptor.service_namespace.as_str())
        .with_attribute(format!("xmlns:{TYPES_PREFIX}"), descriptor.types_namespace.as_str());

    if let Some(request) = request {
        let mut wrapper = XmlNode::new(format!("{SERVICE_PREFIX}:{REQUEST_ELEMENT}"));
        append_fields(&mut wrapper, request);
        call.children.push(wrapper);
    }

    XmlNode::new(format!("{ENVELOPE_PREFIX}:Envelope"))
        .with_attribute(format!("xmlns:{ENVELOPE_PREFIX}"), SOAP_ENV_NS)
        .with_child(XmlNode::new(format!("{ENVELOPE_PREFIX}:Header")))
        .with_child(XmlNode::new(format!("{ENVELOPE_PREFIX}:Body")).with_child(call))
}

fn append_fields(parent: &mut XmlNode, value: &Value) {
    match value {
        Value::Object(fields) => {
            for (name, field) in fields {
                append_field(parent, name, field);
            }
        }
        Value::Null => {}
        scalar => parent.text = scalar_text(scalar),
    }
}

fn append_field(parent: &mut XmlNode, name: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                append_field(parent, name, item);
            }
        }
        _ => {
            let mut element = XmlNode::new(format!("{TYPES_PREFIX}:{name}"));
            append_fields(&mut element, value);
            parent.children.push(element);
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}
