use crm_proxy_core::contract::{encode_output, InvocationRequest, OutputFormat, ServiceName};
use crm_proxy_core::fault::render_fault;
use crm_proxy_core::normalize::KeyPrefixPolicy;
use crm_proxy_core::records::{REASON_MISSING, REASON_NOT_OBJECT};
use crm_proxy_core::{CrmError, ReplyEnvelope, ValidationError};
use serde_json::{Map, Value};

use crate::config::{CrmConfig, FaultMode, DEFAULT_ORIGIN};
use crate::handlers::{create_client, operations};
use crate::soap::SoapClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub origin: String,
    pub key_policy: KeyPrefixPolicy,
    pub fault_mode: FaultMode,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            key_policy: KeyPrefixPolicy::default(),
            fault_mode: FaultMode::default(),
        }
    }
}

impl DispatchSettings {
    pub fn from_config(config: &CrmConfig) -> Self {
        Self {
            origin: config.origin.clone(),
            key_policy: config.key_policy.clone(),
            fault_mode: config.fault_mode,
        }
    }
}

pub struct Dispatcher<'a> {
    client: SoapClient<'a>,
    settings: DispatchSettings,
}

impl<'a> Dispatcher<'a> {
    pub fn new(client: SoapClient<'a>, settings: DispatchSettings) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &SoapClient<'a> {
        &self.client
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn dispatch(
        &self,
        service: ServiceName,
        data: Option<&Value>,
    ) -> Result<ReplyEnvelope, CrmError> {
        let outcome = match service {
            ServiceName::CreateClient => {
                create_client::create_client(self, require_data(data)?)
            }
            ServiceName::GetListSelection => operations::get_list_selection(self),
            ServiceName::GetAddressPregunta => operations::get_address_pregunta(self),
            ServiceName::PostExisteCliente => {
                operations::post_existe_cliente(self, require_data(data)?)
            }
            ServiceName::GetPreaprobado => operations::get_preaprobado(self, require_data(data)?),
            ServiceName::PostClienteRadicacion => {
                operations::post_cliente_radicacion(self, require_data(data)?)
            }
            ServiceName::GetListProyectosByConstructora => {
                operations::get_list_proyectos_by_constructora(self, require_data(data)?)
            }
        };
        let function = match service {
            ServiceName::CreateClient => create_client::CREATE_CLIENT_FUNCTION,
            other => other.as_str(),
        };
        self.capture_fault(function, outcome)
    }

    /// Renders remote faults into a failure envelope when configured to;
    /// otherwise lets them abort the invocation.
    pub fn capture_fault(
        &self,
        function: &str,
        outcome: Result<ReplyEnvelope, CrmError>,
    ) -> Result<ReplyEnvelope, CrmError> {
        match outcome {
            Err(CrmError::Fault(fault)) => {
                tracing::warn!(function, fault = fault.fault_string(), "remote fault");
                match self.settings.fault_mode {
                    FaultMode::Render => Ok(render_fault(&fault, function)),
                    FaultMode::Propagate => Err(CrmError::Fault(fault)),
                }
            }
            other => other,
        }
    }
}

/// Entry point shared by the Lambda binary and tests.
pub fn handle_invocation(event: Value, dispatcher: &Dispatcher<'_>) -> Result<Value, CrmError> {
    let request: InvocationRequest = serde_json::from_value(event)?;
    let format = OutputFormat::from_request(request.format_name());
    tracing::info!(
        service = request.service_name().unwrap_or_default(),
        format = ?format,
        "invocation received"
    );

    let reply = match request.service_name().and_then(ServiceName::parse) {
        Some(service) => dispatcher.dispatch(service, request.data.as_ref())?,
        None => ReplyEnvelope::no_service(),
    };
    tracing::info!(function = %reply.function, error = reply.error, "reply envelope built");

    let reply = serde_json::to_value(&reply)?;
    Ok(encode_output(reply, format)?)
}

fn require_data(data: Option<&Value>) -> Result<&Map<String, Value>, CrmError> {
    match data {
        Some(Value::Object(fields)) => Ok(fields),
        None | Some(Value::Null) => Err(ValidationError::single("data", REASON_MISSING).into()),
        Some(_) => Err(ValidationError::single("data", REASON_NOT_OBJECT).into()),
    }
}
