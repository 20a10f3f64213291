use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format value that asks for a JSON-encoded string reply.
pub const JSON_FORMAT: &str = "json";

/// Invocation event accepted by the handler. `service` and `format` keep
/// whatever JSON the caller sent; only string values select anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvocationRequest {
    #[serde(default)]
    pub service: Option<Value>,
    #[serde(default)]
    pub format: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl InvocationRequest {
    pub fn service_name(&self) -> Option<&str> {
        self.service.as_ref().and_then(Value::as_str)
    }

    pub fn format_name(&self) -> Option<&str> {
        self.format.as_ref().and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceName {
    CreateClient,
    GetListSelection,
    GetAddressPregunta,
    PostExisteCliente,
    GetPreaprobado,
    PostClienteRadicacion,
    GetListProyectosByConstructora,
}

impl ServiceName {
    pub const ALL: [ServiceName; 7] = [
        ServiceName::CreateClient,
        ServiceName::GetListSelection,
        ServiceName::GetAddressPregunta,
        ServiceName::PostExisteCliente,
        ServiceName::GetPreaprobado,
        ServiceName::PostClienteRadicacion,
        ServiceName::GetListProyectosByConstructora,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateClient => "create_client",
            Self::GetListSelection => "get_list_selection",
            Self::GetAddressPregunta => "get_address_pregunta",
            Self::PostExisteCliente => "post_existe_cliente",
            Self::GetPreaprobado => "get_preaprobado",
            Self::PostClienteRadicacion => "post_cliente_radicacion",
            Self::GetListProyectosByConstructora => "get_list_proyectos_by_constructora",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|service| service.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Reply is a JSON-encoded string.
    Json,
    /// Reply is returned as a structure.
    Native,
}

impl OutputFormat {
    /// Only an explicit `"json"` selects encoded output.
    pub fn from_request(format: Option<&str>) -> Self {
        match format {
            Some(JSON_FORMAT) => OutputFormat::Json,
            _ => OutputFormat::Native,
        }
    }
}

/// Applies the format toggle. Textual results pass through untouched.
pub fn encode_output(result: Value, format: OutputFormat) -> Result<Value, serde_json::Error> {
    match (format, result) {
        (OutputFormat::Json, Value::String(text)) => Ok(Value::String(text)),
        (OutputFormat::Json, result) => serde_json::to_string(&result).map(Value::String),
        (OutputFormat::Native, result) => Ok(result),
    }
}
