//! Client registration: existence check, creation, then pre-approval lookup.

use crm_proxy_core::normalize::normalize;
use crm_proxy_core::{CrmError, ReplyEnvelope};
use serde_json::{json, Map, Value};

use crate::handlers::dispatch::Dispatcher;
use crate::handlers::operations::{fetch_preapproval, TRANSACTION_FIELD};
use crate::soap::RemoteOperation;

pub const CREATE_CLIENT_FUNCTION: &str = "service_create_client";
pub const CLIENT_CREATED_MESSAGE: &str = "Cliente creado correctamente";

pub fn create_client(
    dispatcher: &Dispatcher<'_>,
    data: &Map<String, Value>,
) -> Result<ReplyEnvelope, CrmError> {
    let existence_request = json!({
        "tipoDocumento": data.get("tipoDocumento"),
        "numeroDocumento": data.get("numeroDocumento"),
        "origen": dispatcher.settings().origin,
    });
    let existence = dispatcher
        .client()
        .call_normalized(RemoteOperation::PostExisteCliente, Some(&existence_request))?;

    // Anything short of an explicit `existe=false` is treated as registered.
    if existence.get("existe") != Some(&Value::Bool(false)) {
        tracing::info!(branch = "already_registered", "create flow");
        let message = existence
            .get("mensaje")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(ReplyEnvelope::success(message, existence, CREATE_CLIENT_FUNCTION));
    }

    let response = dispatcher
        .client()
        .invoke(RemoteOperation::PostCliente, Some(&Value::Object(data.clone())))?;

    if let Some(fault) = response.fault() {
        tracing::warn!(branch = "create_faulted", "create flow");
        return Ok(ReplyEnvelope::failure(
            format!("Error al crear cliente: (fault = {})", fault.combined_message()),
            response.body_json()?,
            CREATE_CLIENT_FUNCTION,
        ));
    }

    let created = normalize(&response.result(
        &dispatcher.client().descriptor().repeated_elements,
    )?);
    let transaction = created.get(TRANSACTION_FIELD).cloned().unwrap_or(Value::Null);
    tracing::info!(branch = "created", "create flow");

    let mut approved = fetch_preapproval(dispatcher, Some(&transaction))?;
    if let Value::Object(fields) = &mut approved {
        fields.insert(TRANSACTION_FIELD.to_string(), transaction);
    }
    Ok(ReplyEnvelope::success(
        CLIENT_CREATED_MESSAGE,
        approved,
        CREATE_CLIENT_FUNCTION,
    ))
}
