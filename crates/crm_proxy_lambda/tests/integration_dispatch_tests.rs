mod support;

use crm_proxy_core::{CrmError, SelectorError};
use crm_proxy_lambda::adapters::signature::UnsignedEnvelope;
use crm_proxy_lambda::handlers::dispatch::{handle_invocation, DispatchSettings, Dispatcher};
use crm_proxy_lambda::soap::SoapClient;
use serde_json::{json, Value};
use support::{descriptor, operation_response, preapproval_response, ScriptedTransport};

fn run(transport: &ScriptedTransport, event: Value) -> Result<Value, CrmError> {
    let descriptor = descriptor();
    let client = SoapClient::new(transport, &UnsignedEnvelope, &descriptor);
    let dispatcher = Dispatcher::new(client, DispatchSettings::default());
    handle_invocation(event, &dispatcher)
}

fn pensioner_filing() -> Value {
    json!({
        "type": "pensioner",
        "idTransaccion": "32258d905f9aba15f1e6427249cd18c9",
        "lugarNacimiento": "76001",
        "lugarExpedicionCedula": "76001",
        "fechaExpedicionCedula": "2015-09-20T00:00:00",
        "nacionalidad": "Colombia",
        "nivelEducacion": "Pregrado (Graduado)",
        "activos": "2700000",
        "pasivos": "1000000",
        "egresos": "500000",
        "direccionResidencia": "Calle 74 # 02 - 10",
        "ciudadResidencia": "76001",
        "estrato": 3,
        "tipoViviendaResidencia": "Familiar",
        "manejaRecursosPublicos": false,
        "tieneVinculoPEP": false,
        "ip": "192.168.0.1",
        "canal": "Web",
        "referenciaPersonal": {
            "nombres": "Mauricio Gonzales",
            "parentesco": "Amigo(a)",
            "ciudad": "76001",
            "celular": "3876780000"
        },
        "referenciaFamiliar": {
            "nombres": "Mauricio Gonzales",
            "parentesco": "Hijo(a)",
            "ciudad": "76001",
            "celular": "3876780001"
        },
        "vivienda": {
            "tipoVivienda": "Usada",
            "tipoInmueble": "Casa",
            "destinoInmueble": "Renta",
            "constructora": "Constructora Bolivar S.A",
            "proyecto": "Reserva del Lago",
            "tipoParqueadero": "Cubierto",
            "fechaEstimadaEntrega": "2026-12-01T00:00:00",
            "modalidadCredito": "Uvr",
            "plazoCredito": "20",
            "valorInmueble": "240000000",
            "creditoSolicitadoValorAFinanciar": "120000000",
            "recursosPropios": "24000000",
            "subsidioVivienda": "0"
        },
        "nombreEmpresa": "Colpensiones",
        "nitEmpresa": "900336004",
        "direccionEmpresa": "Carrera 10 # 72 - 33",
        "ciudadEmpresa": "11001",
        "telefonoEmpresa": 6014890909_i64
    })
}

#[test]
fn unknown_service_returns_default_envelope_without_remote_call() {
    let transport = ScriptedTransport::new();

    for event in [
        json!({"service": "delete_client", "format": "native"}),
        json!({"format": "native"}),
        json!({"service": null}),
    ] {
        let reply = run(&transport, event).expect("default reply");
        assert_eq!(
            reply,
            json!({
                "error": true,
                "message": "Ningun servicio utilizado",
                "payload": null,
                "function": "handler"
            })
        );
    }
    assert_eq!(transport.total_calls(), 0);
}

#[test]
fn non_text_service_and_format_fall_back_to_defaults() {
    let transport = ScriptedTransport::new();

    let reply = run(&transport, json!({"service": 5})).expect("default reply");
    assert_eq!(reply["message"], json!("Ningun servicio utilizado"));
    assert_eq!(reply["function"], json!("handler"));

    let reply = run(
        &transport,
        json!({"service": ["get_list_selection"], "format": 1}),
    )
    .expect("native reply");
    assert!(reply.is_object());
    assert_eq!(reply["error"], json!(true));
    assert_eq!(transport.total_calls(), 0);
}

#[test]
fn json_format_encodes_the_reply_as_text() {
    let transport = ScriptedTransport::new();

    let reply = run(&transport, json!({"service": "nope", "format": "json"})).expect("reply");

    let text = reply.as_str().expect("json text");
    let decoded: Value = serde_json::from_str(text).expect("valid json");
    assert_eq!(decoded["message"], json!("Ningun servicio utilizado"));
}

#[test]
fn list_selection_keeps_repeated_fields_in_order() {
    let transport = ScriptedTransport::new().reply(
        "getListSelection",
        operation_response(
            "getListSelection",
            "<ax22:listTipoDocumento><ax22:field><ax22:label>Cedula</ax22:label><ax22:value>CC</ax22:value></ax22:field><ax22:field><ax22:label>Pasaporte</ax22:label><ax22:value>PA</ax22:value></ax22:field><ax22:field><ax22:label>Cedula extranjeria</ax22:label><ax22:value>CE</ax22:value></ax22:field></ax22:listTipoDocumento>",
        ),
    );

    let reply = run(&transport, json!({"service": "get_list_selection"})).expect("reply");

    assert_eq!(reply["error"], json!(false));
    assert_eq!(reply["function"], json!("get_list_selection"));
    let values: Vec<&str> = reply["payload"]["listTipoDocumento"]["field"]
        .as_array()
        .expect("ordered array")
        .iter()
        .filter_map(|field| field["value"].as_str())
        .collect();
    assert_eq!(values, ["CC", "PA", "CE"]);
}

#[test]
fn list_selection_with_one_option_is_an_array() {
    let transport = ScriptedTransport::new().reply(
        "getListSelection",
        operation_response(
            "getListSelection",
            "<ax22:listTipoDocumento><ax22:field><ax22:label>Cedula</ax22:label><ax22:value>CC</ax22:value></ax22:field></ax22:listTipoDocumento>",
        ),
    );

    let reply = run(&transport, json!({"service": "get_list_selection"})).expect("reply");

    assert_eq!(
        reply["payload"]["listTipoDocumento"]["field"],
        json!([{"label": "Cedula", "value": "CC"}])
    );
}

#[test]
fn captcha_address_is_entity_decoded() {
    let transport = ScriptedTransport::new().reply(
        "getAdresPreguntaRequest",
        operation_response(
            "getAdresPreguntaRequest",
            "<ax22:url>http://aplicaciones.adres.gov.co/COM_4023//Telerik.Web.UI.WebResource.axd?type=rca&amp;amp;isc=true&amp;amp;guid=54889294</ax22:url>",
        ),
    );

    let reply = run(&transport, json!({"service": "get_address_pregunta"})).expect("reply");

    assert_eq!(
        reply["payload"]["url"],
        json!("http://aplicaciones.adres.gov.co/COM_4023//Telerik.Web.UI.WebResource.axd?type=rca&isc=true&guid=54889294")
    );
}

#[test]
fn preapproval_requires_transaction_id() {
    let transport = ScriptedTransport::new();

    let error = run(&transport, json!({"service": "get_preaprobado", "data": {}}))
        .expect_err("idTransaccion required");

    match error {
        CrmError::Validation(validation) => assert!(validation.mentions("idTransaccion")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.total_calls(), 0);
}

#[test]
fn preapproval_with_empty_transaction_sends_fallback() {
    let transport = ScriptedTransport::new().reply("getPreaprobado", preapproval_response());

    let reply = run(
        &transport,
        json!({"service": "get_preaprobado", "data": {"idTransaccion": ""}}),
    )
    .expect("reply");

    assert_eq!(reply["payload"]["preaproved_letter"], json!("JVBERi0xLjQK"));
    let sent = transport.envelopes("getPreaprobado");
    assert!(sent[0].contains("<dto:idTransaccion>1</dto:idTransaccion>"));
}

#[test]
fn filing_is_validated_before_sending() {
    let transport = ScriptedTransport::new();
    let mut filing = pensioner_filing();
    if let Some(fields) = filing.as_object_mut() {
        fields.remove("nitEmpresa");
    }

    let error = run(
        &transport,
        json!({"service": "post_cliente_radicacion", "data": filing}),
    )
    .expect_err("missing field");

    match error {
        CrmError::Validation(validation) => assert!(validation.mentions("nitEmpresa")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.total_calls(), 0);
}

#[test]
fn filing_with_unknown_type_fails_with_selector_error() {
    let transport = ScriptedTransport::new();
    let mut filing = pensioner_filing();
    filing["type"] = json!("student");

    let error = run(
        &transport,
        json!({"service": "post_cliente_radicacion", "data": filing}),
    )
    .expect_err("unknown type");

    assert!(matches!(error, CrmError::Selector(SelectorError::UnknownType)));
    assert_eq!(error.to_string(), "Profile type not found");
}

#[test]
fn valid_filing_is_sent_without_discriminator() {
    let transport = ScriptedTransport::new().reply(
        "postClienteRadicacion",
        operation_response(
            "postClienteRadicacion",
            "<ax22:codigo>200</ax22:codigo><ax22:mensaje>Radicacion exitosa</ax22:mensaje>",
        ),
    );

    let reply = run(
        &transport,
        json!({"service": "post_cliente_radicacion", "format": "native", "data": pensioner_filing()}),
    )
    .expect("reply");

    assert_eq!(reply["payload"]["mensaje"], json!("Radicacion exitosa"));
    let sent = transport.envelopes("postClienteRadicacion");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("<dto:nombreEmpresa>Colpensiones</dto:nombreEmpresa>"));
    assert!(sent[0].contains("<dto:plazoCredito>20</dto:plazoCredito>"));
    assert!(!sent[0].contains("<dto:type>"));
    assert!(!sent[0].contains("tieneParqueadero"));
}

#[test]
fn single_project_is_still_returned_as_a_list() {
    let transport = ScriptedTransport::new().reply(
        "getListProyectosByConstructora",
        operation_response(
            "getListProyectosByConstructora",
            "<ax22:proyectos><ax22:nombre>Reserva del Lago</ax22:nombre></ax22:proyectos>",
        ),
    );

    let reply = run(
        &transport,
        json!({
            "service": "get_list_proyectos_by_constructora",
            "data": {"nitConstructora": "860037900"}
        }),
    )
    .expect("reply");

    assert_eq!(
        reply["payload"]["proyectos"],
        json!([{"nombre": "Reserva del Lago"}])
    );
    assert!(transport.envelopes("getListProyectosByConstructora")[0]
        .contains("<dto:nitConstructora>860037900</dto:nitConstructora>"));
}

#[test]
fn transport_failure_aborts_invocation() {
    let transport = ScriptedTransport::new().fail("postExisteCliente", "connection refused");

    let error = run(
        &transport,
        json!({"service": "post_existe_cliente", "data": {"numeroDocumento": "1"}}),
    )
    .expect_err("transport error");

    assert!(matches!(error, CrmError::Transport(_)));
}
