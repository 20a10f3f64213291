//! Domain primitives for the CRM SOAP proxy.
//!
//! This crate owns the request/response contracts, the filing record model,
//! and the transformations that turn SOAP payloads into JSON. It intentionally
//! excludes HTTP transport and Lambda runtime concerns, which live in
//! `crm_proxy_lambda`.

pub mod contract;
pub mod envelope;
pub mod error;
pub mod fault;
pub mod filing;
pub mod normalize;
pub mod preapproval;
pub mod records;
pub mod xml;

pub use envelope::ReplyEnvelope;
pub use error::{CrmError, FieldError, SelectorError, ValidationError, XmlError};
pub use xml::XmlNode;
