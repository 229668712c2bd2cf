use thiserror::Error;

/// Errors triggered while mapping, resolving or removing dependencies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Invalid key {key:?}: keys must be non-empty and must not contain '.'")]
    InvalidKey { key: String },
    #[error("Invalid configuration for \"{key}\": {reason}")]
    InvalidConfig { key: String, reason: String },
    #[error("Missing target for \"{key}\"")]
    MissingTarget { key: String },
    #[error("Invalid target for \"{key}\": {reason}")]
    InvalidTarget { key: String, reason: String },
    #[error("Mapping \"{key}\" already exists")]
    MappingExists { key: String },
    #[error("No mapping for \"{key}\"")]
    NoMapping { key: String },
    #[error("Circular dependency while resolving \"{key}\": {}", .chain.join(" -> "))]
    CircularDependency { key: String, chain: Vec<String> },
    #[error("\"{key}\" does not implement interface member \"{member}\"")]
    InterfaceMemberMissing { key: String, member: String },
    #[error(
        "\"{key}\" implements \"{member}\" with {} parameter(s), expected {expected}",
        .actual.map_or_else(|| "no".to_string(), |a| a.to_string())
    )]
    InterfaceArityMismatch {
        key: String,
        member: String,
        expected: usize,
        actual: Option<usize>,
    },
    #[error("Factory for \"{key}\" did not return a value")]
    InvalidFactoryResult { key: String },
    #[error("Mapping \"{key}\" is required by {}", .dependants.join(", "))]
    MappingHasDependants { key: String, dependants: Vec<String> },
    #[error("Invalid key path {path:?}")]
    InvalidKeyType { path: String },
    #[error("\"{key}\" is not of type {expected}")]
    TypeMismatch { key: String, expected: &'static str },
    #[error("\"{key}\" does not accept injected property \"{property}\"")]
    PropertyRejected { key: String, property: String },
}

/// Machine-checkable category of a [ContainerError]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidKey,
    InvalidConfig,
    MissingTarget,
    InvalidTarget,
    MappingExists,
    NoMapping,
    CircularDependency,
    InterfaceMemberMissing,
    InterfaceArityMismatch,
    InvalidFactoryResult,
    MappingHasDependants,
    InvalidKeyType,
    TypeMismatch,
    PropertyRejected,
}

impl ContainerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContainerError::InvalidKey { .. } => ErrorKind::InvalidKey,
            ContainerError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            ContainerError::MissingTarget { .. } => ErrorKind::MissingTarget,
            ContainerError::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            ContainerError::MappingExists { .. } => ErrorKind::MappingExists,
            ContainerError::NoMapping { .. } => ErrorKind::NoMapping,
            ContainerError::CircularDependency { .. } => ErrorKind::CircularDependency,
            ContainerError::InterfaceMemberMissing { .. } => ErrorKind::InterfaceMemberMissing,
            ContainerError::InterfaceArityMismatch { .. } => ErrorKind::InterfaceArityMismatch,
            ContainerError::InvalidFactoryResult { .. } => ErrorKind::InvalidFactoryResult,
            ContainerError::MappingHasDependants { .. } => ErrorKind::MappingHasDependants,
            ContainerError::InvalidKeyType { .. } => ErrorKind::InvalidKeyType,
            ContainerError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ContainerError::PropertyRejected { .. } => ErrorKind::PropertyRejected,
        }
    }

    /// Key (or key path) this error refers to
    pub fn key(&self) -> &str {
        match self {
            ContainerError::InvalidKeyType { path } => path,
            ContainerError::InvalidKey { key }
            | ContainerError::InvalidConfig { key, .. }
            | ContainerError::MissingTarget { key }
            | ContainerError::InvalidTarget { key, .. }
            | ContainerError::MappingExists { key }
            | ContainerError::NoMapping { key }
            | ContainerError::CircularDependency { key, .. }
            | ContainerError::InterfaceMemberMissing { key, .. }
            | ContainerError::InterfaceArityMismatch { key, .. }
            | ContainerError::InvalidFactoryResult { key }
            | ContainerError::MappingHasDependants { key, .. }
            | ContainerError::TypeMismatch { key, .. }
            | ContainerError::PropertyRejected { key, .. } => key,
        }
    }
}

pub type Result<T, E = ContainerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_key() {
        let err = ContainerError::CircularDependency {
            key: "A".into(),
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency while resolving \"A\": A -> B -> A"
        );
        assert_eq!(err.kind(), ErrorKind::CircularDependency);

        let err = ContainerError::InterfaceArityMismatch {
            key: "Runner".into(),
            member: "run".into(),
            expected: 1,
            actual: Some(0),
        };
        assert_eq!(
            err.to_string(),
            "\"Runner\" implements \"run\" with 0 parameter(s), expected 1"
        );
        assert_eq!(err.key(), "Runner");
    }
}
