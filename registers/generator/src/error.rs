// Licensed under the Apache-2.0 license

/// Failures raised while building or ingesting a device model.
///
/// Every message names the offending value and the entity that owns it.
/// Ingestion wraps these in [`anyhow::Error`] with the file being processed,
/// so callers that need the kind can `downcast_ref::<Error>()`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A required attribute (or child element) is absent.
    #[error("missing \"{attr}\" in <{tag}>")]
    MissingAttribute { tag: String, attr: String },

    /// An attribute is present but is not a valid number or code.
    #[error("malformed {what} ({value:?}) in {entity}")]
    MalformedValue {
        what: String,
        value: String,
        entity: String,
    },

    /// A constructed entity would break a model invariant.
    #[error("{0}")]
    InvariantViolation(String),

    /// Redundant attributes disagree with each other.
    #[error("{0}")]
    CrossReference(String),
}

impl Error {
    pub(crate) fn missing(tag: &str, attr: &str) -> Self {
        Error::MissingAttribute {
            tag: tag.to_string(),
            attr: attr.to_string(),
        }
    }

    pub(crate) fn malformed(what: &str, value: &str, entity: &str) -> Self {
        Error::MalformedValue {
            what: what.to_string(),
            value: value.to_string(),
            entity: entity.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
