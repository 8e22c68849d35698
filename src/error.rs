use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustomizeError {
    #[error("Product configuration is not loaded")]
    NotConfigured,

    #[error("Unknown part '{0}'")]
    UnknownPart(String),

    #[error("Part '{0}' can't be removed")]
    RequiredPart(String),

    #[error("No valid alternative for part '{0}' under the active restrictions")]
    Unsatisfiable(String),

    #[error("Required part '{0}' is missing from the customization")]
    Incomplete(String),

    #[error("Invalid product configuration: {0}")]
    InvalidConfig(String),
}

impl From<CustomizeError> for String {
    fn from(err: CustomizeError) -> Self {
        err.to_string()
    }
}
