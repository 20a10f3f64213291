use thiserror::Error;

use crate::fault::SoapFault;

/// Failures raised while reading an XML document into [`crate::XmlNode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed xml near byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("xml document has no root element")]
    Empty,
    #[error("xml document has more than one root element")]
    MultipleRoots,
    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// A single offending input field, addressed by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(path, reason)])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether any recorded error points at `path`.
    pub fn mentions(&self, path: &str) -> bool {
        self.errors.iter().any(|error| error.path == path)
    }

    /// Turns an accumulated error list into a result, failing when non-empty.
    pub fn check(errors: Vec<FieldError>) -> Result<(), ValidationError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::new(errors))
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}: {}", error.path, error.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Filing selection failures. The messages are part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("The type field is required")]
    MissingType,
    #[error("Profile type not found")]
    UnknownType,
}

#[derive(Debug, Error)]
pub enum CrmError {
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error("invalid filing data: {0}")]
    Validation(#[from] ValidationError),
    #[error("remote fault: {0}")]
    Fault(SoapFault),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("signature error: {0}")]
    Signature(String),
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SoapFault> for CrmError {
    fn from(fault: SoapFault) -> Self {
        CrmError::Fault(fault)
    }
}
