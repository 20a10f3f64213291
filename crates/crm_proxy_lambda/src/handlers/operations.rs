//! Single-call operations. Each wraps one remote call and replies with the
//! normalized result.

use crm_proxy_core::filing::select_filing;
use crm_proxy_core::preapproval::extract_preapproval;
use crm_proxy_core::records::{REASON_MISSING, REASON_NOT_STRING};
use crm_proxy_core::{CrmError, ReplyEnvelope, ValidationError};
use serde_json::{json, Map, Value};

use crate::handlers::dispatch::Dispatcher;
use crate::soap::RemoteOperation;

pub const SUCCESS_MESSAGE: &str = "Operacion exitosa";
pub const TRANSACTION_FIELD: &str = "idTransaccion";
/// Sent when a pre-approval lookup carries an empty transaction id.
pub const FALLBACK_TRANSACTION_ID: &str = "1";

pub fn get_list_selection(dispatcher: &Dispatcher<'_>) -> Result<ReplyEnvelope, CrmError> {
    let result = dispatcher
        .client()
        .call_normalized(RemoteOperation::GetListSelection, None)?;
    Ok(ReplyEnvelope::success(SUCCESS_MESSAGE, result, "get_list_selection"))
}

/// The captcha image address comes back with `&` still encoded as `&amp;`.
pub fn get_address_pregunta(dispatcher: &Dispatcher<'_>) -> Result<ReplyEnvelope, CrmError> {
    let result = dispatcher
        .client()
        .call_normalized(RemoteOperation::GetAdresPreguntaRequest, None)?;
    Ok(ReplyEnvelope::success(
        SUCCESS_MESSAGE,
        decode_ampersands(result),
        "get_address_pregunta",
    ))
}

pub fn post_existe_cliente(
    dispatcher: &Dispatcher<'_>,
    data: &Map<String, Value>,
) -> Result<ReplyEnvelope, CrmError> {
    let result = dispatcher.client().call_normalized(
        RemoteOperation::PostExisteCliente,
        Some(&Value::Object(data.clone())),
    )?;
    Ok(ReplyEnvelope::success(SUCCESS_MESSAGE, result, "post_existe_cliente"))
}

pub fn get_list_proyectos_by_constructora(
    dispatcher: &Dispatcher<'_>,
    data: &Map<String, Value>,
) -> Result<ReplyEnvelope, CrmError> {
    let result = dispatcher.client().call_normalized(
        RemoteOperation::GetListProyectosByConstructora,
        Some(&Value::Object(data.clone())),
    )?;
    Ok(ReplyEnvelope::success(
        SUCCESS_MESSAGE,
        result,
        "get_list_proyectos_by_constructora",
    ))
}

/// Validates the filing against its variant before anything is sent.
pub fn post_cliente_radicacion(
    dispatcher: &Dispatcher<'_>,
    data: &Map<String, Value>,
) -> Result<ReplyEnvelope, CrmError> {
    let filing = select_filing(&Value::Object(data.clone()))?;
    tracing::info!(kind = filing.kind().discriminator(), "filing validated");
    let request = filing.to_request()?;
    let result = dispatcher
        .client()
        .call_normalized(RemoteOperation::PostClienteRadicacion, Some(&request))?;
    Ok(ReplyEnvelope::success(SUCCESS_MESSAGE, result, "post_cliente_radicacion"))
}

pub fn get_preaprobado(
    dispatcher: &Dispatcher<'_>,
    data: &Map<String, Value>,
) -> Result<ReplyEnvelope, CrmError> {
    let transaction = data.get(TRANSACTION_FIELD).ok_or_else(|| {
        CrmError::from(ValidationError::single(TRANSACTION_FIELD, REASON_MISSING))
    })?;
    let result = fetch_preapproval(dispatcher, Some(transaction))?;
    Ok(ReplyEnvelope::success(SUCCESS_MESSAGE, result, "get_preaprobado"))
}

/// Looks up the pre-approval for a transaction and extracts it from the raw
/// response document.
pub fn fetch_preapproval(
    dispatcher: &Dispatcher<'_>,
    transaction: Option<&Value>,
) -> Result<Value, CrmError> {
    let transaction = transaction_id(transaction)?;
    let response = dispatcher.client().call(
        RemoteOperation::GetPreaprobado,
        Some(&json!({ TRANSACTION_FIELD: transaction })),
    )?;
    extract_preapproval(&response.envelope, &dispatcher.settings().key_policy)
}

fn transaction_id(value: Option<&Value>) -> Result<String, CrmError> {
    match value {
        None | Some(Value::Null) => Ok(FALLBACK_TRANSACTION_ID.to_string()),
        Some(Value::String(text)) if text.trim().is_empty() => {
            Ok(FALLBACK_TRANSACTION_ID.to_string())
        }
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(_) => Err(ValidationError::single(TRANSACTION_FIELD, REASON_NOT_STRING).into()),
    }
}

fn decode_ampersands(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(text.replace("&amp;", "&")),
        Value::Array(items) => Value::Array(items.into_iter().map(decode_ampersands).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, field)| (key, decode_ampersands(field)))
                .collect(),
        ),
        other => other,
    }
}
