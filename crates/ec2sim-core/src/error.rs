//! Provider error vocabulary.
//!
//! Every expected failure of the engine is an [`Ec2Error`] carrying a stable
//! [`ErrorCode`]. Client code branches on the code (or its coarser
//! [`ErrorKind`]), never on the message text.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error codes, spelled exactly as the provider spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCode {
    /// A referenced security group does not exist.
    #[serde(rename = "InvalidGroup.NotFound")]
    GroupNotFound,
    /// A security group is still referenced and cannot be deleted.
    #[serde(rename = "InvalidGroup.InUse")]
    GroupInUse,
    /// A security group with the requested name already exists.
    #[serde(rename = "InvalidGroup.Duplicate")]
    GroupDuplicate,
    /// A permission is syntactically invalid (e.g. a bad CIDR).
    #[serde(rename = "InvalidPermission.Malformed")]
    PermissionMalformed,
    /// Every source of a permission is already authorized.
    #[serde(rename = "InvalidPermission.Duplicate")]
    PermissionDuplicate,
    /// A revoked source is not present (strict revoke policy only).
    #[serde(rename = "InvalidPermission.NotFound")]
    PermissionNotFound,
    /// A referenced instance does not exist.
    #[serde(rename = "InvalidInstanceID.NotFound")]
    InstanceNotFound,
    /// A parameter value is not acceptable.
    #[serde(rename = "InvalidParameterValue")]
    InvalidParameterValue,
    /// Two parameters contradict each other.
    #[serde(rename = "InvalidParameterCombination")]
    InvalidParameterCombination,
    /// A source group id has the wrong shape.
    #[serde(rename = "InvalidGroupId.Malformed")]
    GroupIdMalformed,
    /// A source group owner id has the wrong shape.
    #[serde(rename = "InvalidUserID.Malformed")]
    UserIdMalformed,
    /// A parameter name is not understood.
    #[serde(rename = "UnknownParameter")]
    UnknownParameter,
    /// A launch asks for more instances than the store allows at once.
    #[serde(rename = "InstanceLimitExceeded")]
    InstanceLimitExceeded,
}

impl ErrorCode {
    /// All codes, in declaration order.
    pub const ALL: [ErrorCode; 13] = [
        ErrorCode::GroupNotFound,
        ErrorCode::GroupInUse,
        ErrorCode::GroupDuplicate,
        ErrorCode::PermissionMalformed,
        ErrorCode::PermissionDuplicate,
        ErrorCode::PermissionNotFound,
        ErrorCode::InstanceNotFound,
        ErrorCode::InvalidParameterValue,
        ErrorCode::InvalidParameterCombination,
        ErrorCode::GroupIdMalformed,
        ErrorCode::UserIdMalformed,
        ErrorCode::UnknownParameter,
        ErrorCode::InstanceLimitExceeded,
    ];

    /// The wire spelling of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::GroupNotFound => "InvalidGroup.NotFound",
            ErrorCode::GroupInUse => "InvalidGroup.InUse",
            ErrorCode::GroupDuplicate => "InvalidGroup.Duplicate",
            ErrorCode::PermissionMalformed => "InvalidPermission.Malformed",
            ErrorCode::PermissionDuplicate => "InvalidPermission.Duplicate",
            ErrorCode::PermissionNotFound => "InvalidPermission.NotFound",
            ErrorCode::InstanceNotFound => "InvalidInstanceID.NotFound",
            ErrorCode::InvalidParameterValue => "InvalidParameterValue",
            ErrorCode::InvalidParameterCombination => "InvalidParameterCombination",
            ErrorCode::GroupIdMalformed => "InvalidGroupId.Malformed",
            ErrorCode::UserIdMalformed => "InvalidUserID.Malformed",
            ErrorCode::UnknownParameter => "UnknownParameter",
            ErrorCode::InstanceLimitExceeded => "InstanceLimitExceeded",
        }
    }

    /// Parse a wire spelling back into a code.
    pub fn from_wire(code: &str) -> Option<ErrorCode> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    /// The failure category this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::GroupNotFound
            | ErrorCode::PermissionNotFound
            | ErrorCode::InstanceNotFound => ErrorKind::NotFound,
            ErrorCode::GroupDuplicate | ErrorCode::PermissionDuplicate => ErrorKind::Duplicate,
            ErrorCode::GroupInUse => ErrorKind::InUse,
            ErrorCode::PermissionMalformed
            | ErrorCode::GroupIdMalformed
            | ErrorCode::UserIdMalformed => ErrorKind::Malformed,
            ErrorCode::InvalidParameterValue
            | ErrorCode::InvalidParameterCombination
            | ErrorCode::UnknownParameter
            | ErrorCode::InstanceLimitExceeded => ErrorKind::InvalidParameter,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The referenced entity is absent.
    NotFound,
    /// The entity, name, or permission already exists in an equivalent form.
    Duplicate,
    /// Deletion is blocked by a live reference.
    InUse,
    /// Input is syntactically invalid.
    Malformed,
    /// A parameter or enum value is not recognized.
    InvalidParameter,
}

/// An expected, recoverable engine failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({code})")]
pub struct Ec2Error {
    /// Stable machine-readable code.
    pub code: ErrorCode,
    /// Human-readable explanation.
    pub message: String,
}

impl Ec2Error {
    /// Create an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for an `InvalidParameterValue` error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameterValue, message)
    }

    /// Shorthand for an `InvalidGroup.NotFound` error.
    pub fn group_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GroupNotFound, message)
    }

    /// Shorthand for an `InvalidInstanceID.NotFound` error.
    pub fn instance_not_found(id: &str) -> Self {
        Self::new(
            ErrorCode::InstanceNotFound,
            format!("The instance ID '{}' does not exist", id),
        )
    }

    /// The failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this is a "duplicate" error.
    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::Duplicate
    }
}

/// Result type alias for engine operations.
pub type Ec2Result<T> = std::result::Result<T, Ec2Error>;
