//! Applicant profile records submitted with a credit filing.
//!
//! Records are read from untrusted JSON through [`FieldReader`], which collects
//! every offending field instead of stopping at the first one. Integers accept
//! JSON integers, integral floats and numeric strings; strings accept JSON
//! strings and numbers; booleans accept JSON booleans, `0`/`1` and the usual
//! textual spellings. Anything else is rejected with a field-level reason.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{FieldError, ValidationError};

pub const REASON_MISSING: &str = "field required";
pub const REASON_NULL: &str = "none is not an allowed value";
pub const REASON_EXTRA: &str = "extra fields not permitted";
pub const REASON_NOT_OBJECT: &str = "value is not a valid dict";
pub const REASON_NOT_STRING: &str = "str type expected";
pub const REASON_NOT_INTEGER: &str = "value is not a valid integer";
pub const REASON_NOT_BOOLEAN: &str = "value could not be parsed to a boolean";

/// Reads typed fields out of one JSON object, accumulating errors.
pub struct FieldReader<'a> {
    prefix: String,
    fields: &'a Map<String, Value>,
    consumed: Vec<&'static str>,
    errors: &'a mut Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a Map<String, Value>, errors: &'a mut Vec<FieldError>) -> Self {
        Self::nested_in(String::new(), fields, errors)
    }

    fn nested_in(
        prefix: String,
        fields: &'a Map<String, Value>,
        errors: &'a mut Vec<FieldError>,
    ) -> Self {
        Self {
            prefix,
            fields,
            consumed: Vec::new(),
            errors,
        }
    }

    fn path(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }

    fn fail(&mut self, name: &str, reason: &str) {
        let path = self.path(name);
        self.errors.push(FieldError::new(path, reason));
    }

    /// Marks a key as known without reading it.
    pub fn skip(&mut self, name: &'static str) {
        self.consumed.push(name);
    }

    fn required<T: Default>(
        &mut self,
        name: &'static str,
        coerce: fn(&Value) -> Result<T, &'static str>,
    ) -> T {
        self.consumed.push(name);
        let fields = self.fields;
        match fields.get(name) {
            None => {
                self.fail(name, REASON_MISSING);
                T::default()
            }
            Some(Value::Null) => {
                self.fail(name, REASON_NULL);
                T::default()
            }
            Some(value) => coerce(value).unwrap_or_else(|reason| {
                self.fail(name, reason);
                T::default()
            }),
        }
    }

    fn optional<T>(
        &mut self,
        name: &'static str,
        coerce: fn(&Value) -> Result<T, &'static str>,
    ) -> Option<T> {
        self.consumed.push(name);
        let fields = self.fields;
        match fields.get(name) {
            None | Some(Value::Null) => None,
            Some(value) => match coerce(value) {
                Ok(parsed) => Some(parsed),
                Err(reason) => {
                    self.fail(name, reason);
                    None
                }
            },
        }
    }

    pub fn string(&mut self, name: &'static str) -> String {
        self.required(name, coerce_string)
    }

    pub fn integer(&mut self, name: &'static str) -> i64 {
        self.required(name, coerce_integer)
    }

    pub fn boolean(&mut self, name: &'static str) -> bool {
        self.required(name, coerce_boolean)
    }

    pub fn optional_string(&mut self, name: &'static str) -> Option<String> {
        self.optional(name, coerce_string)
    }

    pub fn optional_integer(&mut self, name: &'static str) -> Option<i64> {
        self.optional(name, coerce_integer)
    }

    pub fn optional_boolean(&mut self, name: &'static str) -> Option<bool> {
        self.optional(name, coerce_boolean)
    }

    /// Reads a required sub-record, validating it with the same contract.
    pub fn record<T: Default>(
        &mut self,
        name: &'static str,
        read: fn(&mut FieldReader<'_>) -> T,
    ) -> T {
        self.consumed.push(name);
        let fields = self.fields;
        match fields.get(name) {
            None => {
                self.fail(name, REASON_MISSING);
                T::default()
            }
            Some(Value::Null) => {
                self.fail(name, REASON_NULL);
                T::default()
            }
            Some(Value::Object(inner)) => {
                let prefix = self.path(name);
                let mut reader = FieldReader::nested_in(prefix, inner, &mut *self.errors);
                let record = read(&mut reader);
                reader.finish();
                record
            }
            Some(_) => {
                self.fail(name, REASON_NOT_OBJECT);
                T::default()
            }
        }
    }

    /// Flags every key that no read consumed.
    pub fn finish(self) {
        let mut unknown: Vec<&String> = self
            .fields
            .keys()
            .filter(|key| !self.consumed.iter().any(|name| *name == key.as_str()))
            .collect();
        unknown.sort();
        for key in unknown {
            let path = if self.prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{key}", self.prefix)
            };
            self.errors.push(FieldError::new(path, REASON_EXTRA));
        }
    }
}

/// Reads a top-level record from a JSON object.
pub fn read_record<T>(
    fields: &Map<String, Value>,
    read: impl FnOnce(&mut FieldReader<'_>) -> T,
) -> Result<T, ValidationError> {
    let mut errors = Vec::new();
    let mut reader = FieldReader::new(fields, &mut errors);
    let record = read(&mut reader);
    reader.finish();
    ValidationError::check(errors).map(|()| record)
}

fn coerce_string(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        _ => Err(REASON_NOT_STRING),
    }
}

fn coerce_integer(value: &Value) -> Result<i64, &'static str> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                    .map(|float| float as i64)
            })
            .ok_or(REASON_NOT_INTEGER),
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| REASON_NOT_INTEGER),
        _ => Err(REASON_NOT_INTEGER),
    }
}

fn coerce_boolean(value: &Value) -> Result<bool, &'static str> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(REASON_NOT_BOOLEAN),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(REASON_NOT_BOOLEAN),
        },
        _ => Err(REASON_NOT_BOOLEAN),
    }
}

/// Property being financed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Housing {
    pub tipo_vivienda: String,
    pub tipo_inmueble: String,
    pub destino_inmueble: String,
    pub constructora: String,
    pub proyecto: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiene_parqueadero: Option<bool>,
    pub tipo_parqueadero: String,
    pub fecha_estimada_entrega: String,
    pub modalidad_credito: String,
    pub plazo_credito: i64,
    pub valor_inmueble: i64,
    pub credito_solicitado_valor_a_financiar: i64,
    pub recursos_propios: i64,
    pub subsidio_vivienda: i64,
}

impl Housing {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            tipo_vivienda: reader.string("tipoVivienda"),
            tipo_inmueble: reader.string("tipoInmueble"),
            destino_inmueble: reader.string("destinoInmueble"),
            constructora: reader.string("constructora"),
            proyecto: reader.string("proyecto"),
            tiene_parqueadero: reader.optional_boolean("tieneParqueadero"),
            tipo_parqueadero: reader.string("tipoParqueadero"),
            fecha_estimada_entrega: reader.string("fechaEstimadaEntrega"),
            modalidad_credito: reader.string("modalidadCredito"),
            plazo_credito: reader.integer("plazoCredito"),
            valor_inmueble: reader.integer("valorInmueble"),
            credito_solicitado_valor_a_financiar: reader
                .integer("creditoSolicitadoValorAFinanciar"),
            recursos_propios: reader.integer("recursosPropios"),
            subsidio_vivienda: reader.integer("subsidioVivienda"),
        }
    }
}

/// Personal or family reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub nombres: String,
    pub parentesco: String,
    pub ciudad: String,
    pub celular: String,
}

impl Reference {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            nombres: reader.string("nombres"),
            parentesco: reader.string("parentesco"),
            ciudad: reader.string("ciudad"),
            celular: reader.string("celular"),
        }
    }
}

/// Fields shared by every filing variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantProfile {
    pub activos: i64,
    pub pasivos: i64,
    pub egresos: i64,
    pub maneja_recursos_publicos: bool,
    #[serde(rename = "tieneVinculoPEP")]
    pub tiene_vinculo_pep: bool,
    #[serde(rename = "tipoVinculoPEP", skip_serializing_if = "Option::is_none")]
    pub tipo_vinculo_pep: Option<String>,
    #[serde(rename = "nombrePEP", skip_serializing_if = "Option::is_none")]
    pub nombre_pep: Option<String>,
    #[serde(rename = "cedulaPEP", skip_serializing_if = "Option::is_none")]
    pub cedula_pep: Option<String>,
    pub ip: String,
    pub canal: String,
    pub id_transaccion: String,
    pub lugar_nacimiento: String,
    pub lugar_expedicion_cedula: String,
    pub fecha_expedicion_cedula: String,
    pub nacionalidad: String,
    pub nivel_educacion: String,
    pub direccion_residencia: String,
    pub ciudad_residencia: String,
    pub estrato: i64,
    pub tipo_vivienda_residencia: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_vigencia_cedula_extranjeria: Option<String>,
    pub vivienda: Housing,
    pub referencia_personal: Reference,
    pub referencia_familiar: Reference,
}

impl ApplicantProfile {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            activos: reader.integer("activos"),
            pasivos: reader.integer("pasivos"),
            egresos: reader.integer("egresos"),
            maneja_recursos_publicos: reader.boolean("manejaRecursosPublicos"),
            tiene_vinculo_pep: reader.boolean("tieneVinculoPEP"),
            tipo_vinculo_pep: reader.optional_string("tipoVinculoPEP"),
            nombre_pep: reader.optional_string("nombrePEP"),
            cedula_pep: reader.optional_string("cedulaPEP"),
            ip: reader.string("ip"),
            canal: reader.string("canal"),
            id_transaccion: reader.string("idTransaccion"),
            lugar_nacimiento: reader.string("lugarNacimiento"),
            lugar_expedicion_cedula: reader.string("lugarExpedicionCedula"),
            fecha_expedicion_cedula: reader.string("fechaExpedicionCedula"),
            nacionalidad: reader.string("nacionalidad"),
            nivel_educacion: reader.string("nivelEducacion"),
            direccion_residencia: reader.string("direccionResidencia"),
            ciudad_residencia: reader.string("ciudadResidencia"),
            estrato: reader.integer("estrato"),
            tipo_vivienda_residencia: reader.string("tipoViviendaResidencia"),
            fecha_vigencia_cedula_extranjeria: reader
                .optional_string("fechaVigenciaCedulaExtranjeria"),
            vivienda: reader.record("vivienda", Housing::read),
            referencia_personal: reader.record("referenciaPersonal", Reference::read),
            referencia_familiar: reader.record("referenciaFamiliar", Reference::read),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFiling {
    #[serde(flatten)]
    pub profile: ApplicantProfile,
    pub nit_empresa: String,
    pub nombre_empresa: String,
    pub direccion_empresa: String,
    pub ciudad_empresa: String,
    pub telefono_empresa: i64,
    pub trabaja_sede_diferente: String,
    pub cargo: String,
    pub experiencia_laboral: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion_oficina: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ciudad_oficina: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono_oficina: Option<String>,
}

impl EmployeeFiling {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            profile: ApplicantProfile::read(reader),
            nit_empresa: reader.string("nitEmpresa"),
            nombre_empresa: reader.string("nombreEmpresa"),
            direccion_empresa: reader.string("direccionEmpresa"),
            ciudad_empresa: reader.string("ciudadEmpresa"),
            telefono_empresa: reader.integer("telefonoEmpresa"),
            trabaja_sede_diferente: reader.string("trabajaSedeDiferente"),
            cargo: reader.string("cargo"),
            experiencia_laboral: reader.integer("experienciaLaboral"),
            direccion_oficina: reader.optional_string("direccionOficina"),
            ciudad_oficina: reader.optional_string("ciudadOficina"),
            telefono_oficina: reader.optional_string("telefonoOficina"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionerFiling {
    #[serde(flatten)]
    pub profile: ApplicantProfile,
    pub nombre_empresa: String,
    pub nit_empresa: String,
    pub direccion_empresa: String,
    pub ciudad_empresa: String,
    pub telefono_empresa: i64,
}

impl PensionerFiling {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            profile: ApplicantProfile::read(reader),
            nombre_empresa: reader.string("nombreEmpresa"),
            nit_empresa: reader.string("nitEmpresa"),
            direccion_empresa: reader.string("direccionEmpresa"),
            ciudad_empresa: reader.string("ciudadEmpresa"),
            telefono_empresa: reader.integer("telefonoEmpresa"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndependentServiceProviderFiling {
    #[serde(flatten)]
    pub profile: ApplicantProfile,
    pub nit_empresa: String,
    pub nombre_empresa: String,
    pub direccion_empresa: String,
    pub ciudad_empresa: String,
    pub telefono_empresa: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_telefono_empresa: Option<i64>,
    pub trabaja_sede_diferente: String,
    pub cargo: String,
    // Free text for this variant, unlike the employee/business-owner filings.
    pub experiencia_laboral: String,
}

impl IndependentServiceProviderFiling {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            profile: ApplicantProfile::read(reader),
            nit_empresa: reader.string("nitEmpresa"),
            nombre_empresa: reader.string("nombreEmpresa"),
            direccion_empresa: reader.string("direccionEmpresa"),
            ciudad_empresa: reader.string("ciudadEmpresa"),
            telefono_empresa: reader.integer("telefonoEmpresa"),
            extension_telefono_empresa: reader.optional_integer("extensionTelefonoEmpresa"),
            trabaja_sede_diferente: reader.string("trabajaSedeDiferente"),
            cargo: reader.string("cargo"),
            experiencia_laboral: reader.string("experienciaLaboral"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndependentCapitalAnnuitantFiling {
    #[serde(flatten)]
    pub profile: ApplicantProfile,
    pub direccion_empresa: String,
    pub ciudad_empresa: String,
    pub experiencia_laboral: String,
}

impl IndependentCapitalAnnuitantFiling {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            profile: ApplicantProfile::read(reader),
            direccion_empresa: reader.string("direccionEmpresa"),
            ciudad_empresa: reader.string("ciudadEmpresa"),
            experiencia_laboral: reader.string("experienciaLaboral"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndependentBusinessOwnerFiling {
    #[serde(flatten)]
    pub profile: ApplicantProfile,
    pub nit_empresa: String,
    pub nombre_empresa: String,
    pub direccion_empresa: String,
    pub ciudad_empresa: String,
    pub telefono_empresa: i64,
    pub experiencia_laboral: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_telefono_empresa: Option<i64>,
}

impl IndependentBusinessOwnerFiling {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            profile: ApplicantProfile::read(reader),
            nit_empresa: reader.string("nitEmpresa"),
            nombre_empresa: reader.string("nombreEmpresa"),
            direccion_empresa: reader.string("direccionEmpresa"),
            ciudad_empresa: reader.string("ciudadEmpresa"),
            telefono_empresa: reader.integer("telefonoEmpresa"),
            experiencia_laboral: reader.integer("experienciaLaboral"),
            extension_telefono_empresa: reader.optional_integer("extensionTelefonoEmpresa"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndependentDriverFiling {
    #[serde(flatten)]
    pub profile: ApplicantProfile,
    pub nombre_empresa: String,
    pub telefono_empresa: i64,
    pub experiencia_laboral: i64,
}

impl IndependentDriverFiling {
    pub fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            profile: ApplicantProfile::read(reader),
            nombre_empresa: reader.string("nombreEmpresa"),
            telefono_empresa: reader.integer("telefonoEmpresa"),
            experiencia_laboral: reader.integer("experienciaLaboral"),
        }
    }
}
