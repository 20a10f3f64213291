#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crm_proxy_lambda::adapters::transport::SoapTransport;
use crm_proxy_lambda::config::ServiceDescriptor;

/// In-memory transport replying with scripted documents per operation.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Result<String, String>>>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, operation: &str, document: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("poisoned mutex")
            .entry(operation.to_string())
            .or_default()
            .push_back(Ok(document.into()));
        self
    }

    pub fn fail(self, operation: &str, error: &str) -> Self {
        self.replies
            .lock()
            .expect("poisoned mutex")
            .entry(operation.to_string())
            .or_default()
            .push_back(Err(error.to_string()));
        self
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.sent
            .lock()
            .expect("poisoned mutex")
            .iter()
            .filter(|(sent, _)| sent == operation)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.sent.lock().expect("poisoned mutex").len()
    }

    pub fn envelopes(&self, operation: &str) -> Vec<String> {
        self.sent
            .lock()
            .expect("poisoned mutex")
            .iter()
            .filter(|(sent, _)| sent == operation)
            .map(|(_, envelope)| envelope.clone())
            .collect()
    }
}

impl SoapTransport for ScriptedTransport {
    fn post_envelope(&self, soap_action: &str, envelope: &str) -> Result<String, String> {
        let operation = soap_action.trim_start_matches("urn:").to_string();
        self.sent
            .lock()
            .expect("poisoned mutex")
            .push((operation.clone(), envelope.to_string()));
        self.replies
            .lock()
            .expect("poisoned mutex")
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(format!("no scripted reply for {operation}")))
    }
}

pub fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor {
        endpoint: "https://crm.test/services/proptech".to_string(),
        service_namespace: "http://service.proptech.crm.credifamilia.com".to_string(),
        types_namespace: "http://dto.proptech.crm.credifamilia.com/xsd".to_string(),
        repeated_elements: vec!["field".to_string(), "proyectos".to_string()],
    }
}

pub fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>{body}</soapenv:Body></soapenv:Envelope>"#
    )
}

pub fn operation_response(operation: &str, fields: &str) -> String {
    envelope(&format!(
        r#"<ns:{operation}Response xmlns:ns="http://service.proptech.crm.credifamilia.com"><ns:return xmlns:ax22="http://dto.proptech.crm.credifamilia.com/xsd">{fields}</ns:return></ns:{operation}Response>"#
    ))
}

pub fn existence_response(exists: bool, message: &str) -> String {
    operation_response(
        "postExisteCliente",
        &format!("<ax22:existe>{exists}</ax22:existe><ax22:mensaje>{message}</ax22:mensaje>"),
    )
}

pub fn created_response(transaction: &str) -> String {
    operation_response(
        "postCliente",
        &format!("<ax22:idTransaccion>{transaction}</ax22:idTransaccion><ax22:mensaje>Cliente registrado</ax22:mensaje>"),
    )
}

pub fn preapproval_response() -> String {
    envelope(
        r#"<ns:getPreaprobadoResponse xmlns:ns="http://service.proptech.crm.credifamilia.com"><ns:return xmlns:ax22="http://dto.proptech.crm.credifamilia.com/xsd" xmlns:ax28="http://dto.proptech.crm.credifamilia.com/xsd/detalle"><ax22:cartaPreaprobado>JVBERi0xLjQK</ax22:cartaPreaprobado><ax22:resultadoCliente><ax28:estado>PREAPROBADO</ax28:estado><ax28:detalle><ax28:tasa>12.5</ax28:tasa></ax28:detalle></ax22:resultadoCliente></ns:return></ns:getPreaprobadoResponse>"#,
    )
}

pub fn fault_response(fault_string: Option<&str>, description: Option<&str>) -> String {
    let fault_string = fault_string
        .map(|text| format!("<faultstring>{text}</faultstring>"))
        .unwrap_or_default();
    let detail = description
        .map(|text| {
            format!(
                r#"<detail><ns:proptechEndPointServiceFaultException xmlns:ns="http://service.proptech.crm.credifamilia.com"><ServiceFaultException xmlns:ax21="urn:fault" xmlns:ax22="urn:status"><ax21:serviceStatus><ax22:code>500</ax22:code><ax22:description>{text}</ax22:description></ax21:serviceStatus></ServiceFaultException></ns:proptechEndPointServiceFaultException></detail>"#
            )
        })
        .unwrap_or_default();
    envelope(&format!(
        "<soapenv:Fault><faultcode>soapenv:Server</faultcode>{fault_string}{detail}</soapenv:Fault>"
    ))
}
