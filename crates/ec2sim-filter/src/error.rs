//! Error types for filter compilation.

use ec2sim_core::{Ec2Error, ErrorCode};
use thiserror::Error;

/// Errors raised while compiling a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The filter names an attribute this entity kind does not have.
    #[error("The filter '{name}' is invalid for {kind}")]
    UnknownAttribute {
        /// Entity kind being filtered.
        kind: &'static str,
        /// The unrecognized attribute name.
        name: String,
    },

    /// A value cannot be interpreted for its attribute.
    #[error("The filter value '{value}' is invalid for '{attribute}': {reason}")]
    InvalidValue {
        attribute: &'static str,
        value: String,
        reason: String,
    },

    /// An attribute was named with no values to match against.
    #[error("The filter '{0}' has no values")]
    EmptyValues(String),
}

impl From<FilterError> for Ec2Error {
    fn from(err: FilterError) -> Self {
        Ec2Error::new(ErrorCode::InvalidParameterValue, err.to_string())
    }
}

/// Result type for filter operations.
pub type FilterResult<T> = std::result::Result<T, FilterError>;
