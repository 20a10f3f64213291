/// Posts a serialized SOAP envelope and returns the raw response document.
///
/// SOAP faults arrive as HTTP 500 with a fault body; implementations must hand
/// that body back as `Ok` and reserve `Err` for transport failures.
pub trait SoapTransport {
    fn post_envelope(&self, soap_action: &str, envelope: &str) -> Result<String, String>;
}
