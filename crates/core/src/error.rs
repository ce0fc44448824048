use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// The value is neither an action shape nor a property-update shape.
    #[error("Payload is neither an action nor a property update: {0}")]
    Unclassifiable(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}
