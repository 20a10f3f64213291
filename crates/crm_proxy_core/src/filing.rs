//! Credit filing selection.
//!
//! The `type` discriminator picks exactly one of six filing kinds. Selection is
//! an exhaustive match over [`FilingKind`]; there is no default variant.

use serde::Serialize;
use serde_json::Value;

use crate::error::{CrmError, SelectorError};
use crate::records::{
    read_record, EmployeeFiling, IndependentBusinessOwnerFiling,
    IndependentCapitalAnnuitantFiling, IndependentDriverFiling,
    IndependentServiceProviderFiling, PensionerFiling,
};

pub const TYPE_FIELD: &str = "type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilingKind {
    Employee,
    Pensioner,
    IndependentServiceProvider,
    IndependentCapitalAnnuitant,
    IndependentBusinessOwner,
    IndependentDriver,
}

impl FilingKind {
    pub const ALL: [FilingKind; 6] = [
        FilingKind::Employee,
        FilingKind::Pensioner,
        FilingKind::IndependentServiceProvider,
        FilingKind::IndependentCapitalAnnuitant,
        FilingKind::IndependentBusinessOwner,
        FilingKind::IndependentDriver,
    ];

    /// Wire value of the `type` field. Matching is case-sensitive.
    pub fn discriminator(self) -> &'static str {
        match self {
            Self::Employee => "employe",
            Self::Pensioner => "pensioner",
            Self::IndependentServiceProvider => "independentserviceprovider",
            Self::IndependentCapitalAnnuitant => "independentcapitalannuitant",
            Self::IndependentBusinessOwner => "independentbusinessowner",
            Self::IndependentDriver => "independentdriver",
        }
    }

    pub fn from_discriminator(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.discriminator() == value)
    }
}

/// A validated filing, serialized without the discriminator and without unset
/// optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Filing {
    Employee(EmployeeFiling),
    Pensioner(PensionerFiling),
    IndependentServiceProvider(IndependentServiceProviderFiling),
    IndependentCapitalAnnuitant(IndependentCapitalAnnuitantFiling),
    IndependentBusinessOwner(IndependentBusinessOwnerFiling),
    IndependentDriver(IndependentDriverFiling),
}

impl Filing {
    pub fn kind(&self) -> FilingKind {
        match self {
            Self::Employee(_) => FilingKind::Employee,
            Self::Pensioner(_) => FilingKind::Pensioner,
            Self::IndependentServiceProvider(_) => FilingKind::IndependentServiceProvider,
            Self::IndependentCapitalAnnuitant(_) => FilingKind::IndependentCapitalAnnuitant,
            Self::IndependentBusinessOwner(_) => FilingKind::IndependentBusinessOwner,
            Self::IndependentDriver(_) => FilingKind::IndependentDriver,
        }
    }

    pub fn to_request(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Selects the filing kind named by `type` and validates the profile against it.
pub fn select_filing(profile: &Value) -> Result<Filing, CrmError> {
    let fields = profile.as_object().ok_or(SelectorError::MissingType)?;

    let discriminator = match fields.get(TYPE_FIELD) {
        Some(Value::String(value)) if !value.is_empty() => value.as_str(),
        Some(Value::Null) | None => return Err(SelectorError::MissingType.into()),
        Some(Value::String(_)) => return Err(SelectorError::MissingType.into()),
        Some(_) => return Err(SelectorError::UnknownType.into()),
    };
    let kind = FilingKind::from_discriminator(discriminator).ok_or(SelectorError::UnknownType)?;

    let filing = match kind {
        FilingKind::Employee => read_record(fields, |reader| {
            reader.skip(TYPE_FIELD);
            Filing::Employee(EmployeeFiling::read(reader))
        }),
        FilingKind::Pensioner => read_record(fields, |reader| {
            reader.skip(TYPE_FIELD);
            Filing::Pensioner(PensionerFiling::read(reader))
        }),
        FilingKind::IndependentServiceProvider => read_record(fields, |reader| {
            reader.skip(TYPE_FIELD);
            Filing::IndependentServiceProvider(IndependentServiceProviderFiling::read(reader))
        }),
        FilingKind::IndependentCapitalAnnuitant => read_record(fields, |reader| {
            reader.skip(TYPE_FIELD);
            Filing::IndependentCapitalAnnuitant(IndependentCapitalAnnuitantFiling::read(reader))
        }),
        FilingKind::IndependentBusinessOwner => read_record(fields, |reader| {
            reader.skip(TYPE_FIELD);
            Filing::IndependentBusinessOwner(IndependentBusinessOwnerFiling::read(reader))
        }),
        FilingKind::IndependentDriver => read_record(fields, |reader| {
            reader.skip(TYPE_FIELD);
            Filing::IndependentDriver(IndependentDriverFiling::read(reader))
        }),
    }?;

    Ok(filing)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;
    use crate::records::{REASON_MISSING, REASON_NOT_INTEGER};

    fn base_profile() -> Map<String, Value> {
        let value = json!({
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
                "tieneParqueadero": true,
                "tipoParqueadero": "Cubierto",
                "fechaEstimadaEntrega": "2026-12-01T00:00:00",
                "modalidadCredito": "Uvr",
                "plazoCredito": "20",
                "valorInmueble": "240000000",
                "creditoSolicitadoValorAFinanciar": "120000000",
                "recursosPropios": "24000000",
                "subsidioVivienda": "0"
            }
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn variant_fields(kind: FilingKind) -> Vec<(&'static str, Value)> {
        match kind {
            FilingKind::Employee => vec![
                ("nitEmpresa", json!("764363838")),
                ("nombreEmpresa", json!("LQN")),
                ("direccionEmpresa", json!("Calle 74 # 02 - 10")),
                ("ciudadEmpresa", json!("76001")),
                ("telefonoEmpresa", json!("80000000")),
                ("trabajaSedeDiferente", json!("No")),
                ("cargo", json!("Desarrollador jefe")),
                ("experienciaLaboral", json!(2)),
            ],
            FilingKind::Pensioner => vec![
                ("nombreEmpresa", json!("Colpensiones")),
                ("nitEmpresa", json!("900336004")),
                ("direccionEmpresa", json!("Carrera 10 # 72 - 33")),
                ("ciudadEmpresa", json!("11001")),
                ("telefonoEmpresa", json!(6014890909_i64)),
            ],
            FilingKind::IndependentServiceProvider => vec![
                ("nitEmpresa", json!("764363838")),
                ("nombreEmpresa", json!("Consultores SAS")),
                ("direccionEmpresa", json!("Calle 5 # 38 - 25")),
                ("ciudadEmpresa", json!("76001")),
                ("telefonoEmpresa", json!(6023331111_i64)),
                ("trabajaSedeDiferente", json!("No")),
                ("cargo", json!("Consultor")),
                ("experienciaLaboral", json!("5 anios")),
            ],
            FilingKind::IndependentCapitalAnnuitant => vec![
                ("direccionEmpresa", json!("Avenida 6N # 23 - 45")),
                ("ciudadEmpresa", json!("76001")),
                ("experienciaLaboral", json!("10 anios")),
            ],
            FilingKind::IndependentBusinessOwner => vec![
                ("nitEmpresa", json!("901234567")),
                ("nombreEmpresa", json!("Panaderia La Esquina")),
                ("direccionEmpresa", json!("Calle 13 # 8 - 20")),
                ("ciudadEmpresa", json!("76001")),
                ("telefonoEmpresa", json!(3001234567_i64)),
                ("experienciaLaboral", json!(8)),
            ],
            FilingKind::IndependentDriver => vec![
                ("nombreEmpresa", json!("Taxis Libres")),
                ("telefonoEmpresa", json!(3109876543_i64)),
                ("experienciaLaboral", json!(4)),
            ],
        }
    }

    fn complete_profile(kind: FilingKind) -> Map<String, Value> {
        let mut fields = base_profile();
        fields.insert(TYPE_FIELD.to_string(), json!(kind.discriminator()));
        for (name, value) in variant_fields(kind) {
            fields.insert(name.to_string(), value);
        }
        fields
    }

    #[test]
    fn every_kind_accepts_a_complete_profile() {
        for kind in FilingKind::ALL {
            let filing = select_filing(&Value::Object(complete_profile(kind)))
                .unwrap_or_else(|error| panic!("{kind:?} should validate: {error}"));
            assert_eq!(filing.kind(), kind);
        }
    }

    #[test]
    fn every_required_variant_field_is_enforced() {
        for kind in FilingKind::ALL {
            for (name, _) in variant_fields(kind) {
                let mut fields = complete_profile(kind);
                fields.remove(name);

                let error = select_filing(&Value::Object(fields))
                    .expect_err("missing field should fail");
                match error {
                    CrmError::Validation(validation) => {
                        assert!(
                            validation.errors().iter().any(|field| field.path == name
                                && field.reason == REASON_MISSING),
                            "{kind:?} should report {name}: {validation}"
                        );
                    }
                    other => panic!("unexpected error for {kind:?}/{name}: {other}"),
                }
            }
        }
    }

    #[test]
    fn every_required_base_field_is_enforced() {
        let required: Vec<String> = base_profile().keys().cloned().collect();
        for name in required {
            let mut fields = complete_profile(FilingKind::IndependentDriver);
            fields.remove(&name);

            let error = select_filing(&Value::Object(fields)).expect_err("missing base field");
            let CrmError::Validation(validation) = error else {
                panic!("expected validation error for {name}");
            };
            assert!(validation.mentions(&name), "{name} not reported: {validation}");
        }
    }

    #[test]
    fn every_required_nested_field_is_enforced() {
        let optional = ["vivienda.tieneParqueadero"];
        for record in ["vivienda", "referenciaPersonal", "referenciaFamiliar"] {
            let keys: Vec<String> = base_profile()[record]
                .as_object()
                .expect("nested record")
                .keys()
                .cloned()
                .collect();
            for key in keys {
                let path = format!("{record}.{key}");
                if optional.contains(&path.as_str()) {
                    continue;
                }
                let mut fields = complete_profile(FilingKind::Employee);
                fields
                    .get_mut(record)
                    .and_then(Value::as_object_mut)
                    .expect("nested record")
                    .remove(&key);

                let error = select_filing(&Value::Object(fields)).expect_err("missing nested field");
                let CrmError::Validation(validation) = error else {
                    panic!("expected validation error for {path}");
                };
                assert!(
                    validation
                        .errors()
                        .iter()
                        .any(|field| field.path == path && field.reason == REASON_MISSING),
                    "{path} not reported: {validation}"
                );
            }
        }
    }

    #[test]
    fn nested_fields_are_reported_with_their_path() {
        let mut fields = complete_profile(FilingKind::Employee);
        let vivienda = fields
            .get_mut("vivienda")
            .and_then(Value::as_object_mut)
            .expect("vivienda object");
        vivienda.remove("proyecto");
        vivienda.insert("plazoCredito".to_string(), json!("veinte"));

        let error = select_filing(&Value::Object(fields)).expect_err("invalid vivienda");
        let CrmError::Validation(validation) = error else {
            panic!("expected validation error");
        };
        assert!(validation.mentions("vivienda.proyecto"));
        assert!(validation
            .errors()
            .iter()
            .any(|field| field.path == "vivienda.plazoCredito"
                && field.reason == REASON_NOT_INTEGER));
    }

    #[test]
    fn missing_or_empty_type_is_rejected() {
        let mut fields = complete_profile(FilingKind::Employee);
        fields.remove(TYPE_FIELD);
        assert!(matches!(
            select_filing(&Value::Object(fields.clone())),
            Err(CrmError::Selector(SelectorError::MissingType))
        ));

        fields.insert(TYPE_FIELD.to_string(), json!(""));
        assert!(matches!(
            select_filing(&Value::Object(fields)),
            Err(CrmError::Selector(SelectorError::MissingType))
        ));
    }

    #[test]
    fn unknown_type_never_falls_back() {
        for discriminator in ["Employe", "employee", "PENSIONER", "freelancer"] {
            let mut fields = complete_profile(FilingKind::Employee);
            fields.insert(TYPE_FIELD.to_string(), json!(discriminator));
            assert!(
                matches!(
                    select_filing(&Value::Object(fields)),
                    Err(CrmError::Selector(SelectorError::UnknownType))
                ),
                "{discriminator} should be unknown"
            );
        }
    }

    #[test]
    fn request_omits_type_and_unset_optionals() {
        let filing = select_filing(&Value::Object(complete_profile(FilingKind::Employee)))
            .expect("valid employee filing");
        let request = filing.to_request().expect("serializable filing");

        assert!(request.get(TYPE_FIELD).is_none());
        assert!(request.get("direccionOficina").is_none());
        assert!(request.get("tipoVinculoPEP").is_none());
        assert_eq!(request["telefonoEmpresa"], json!(80000000));
        assert_eq!(request["tieneVinculoPEP"], json!(false));
        assert_eq!(request["vivienda"]["plazoCredito"], json!(20));
        assert_eq!(
            request["vivienda"]["creditoSolicitadoValorAFinanciar"],
            json!(120000000)
        );
    }
}
