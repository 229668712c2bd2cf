//! Structural interfaces: named members, optionally with a parameter count, that a produced
//! instance must expose.

use serde::{Deserialize, Serialize};

use crate::component::{Component, Member};
use crate::error::{ContainerError, Result};

/// Descriptor of a required interface member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<usize>,
}

impl ApiMember {
    /// Require a member, whatever its kind
    pub fn property(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arity: None,
        }
    }

    /// Require a method accepting exactly `arity` parameters
    pub fn method(name: &str, arity: usize) -> Self {
        Self {
            name: name.to_string(),
            arity: Some(arity),
        }
    }
}

/// Check that an instance satisfies every member of the interface, in declaration order.
pub fn validate_interface(key: &str, instance: &dyn Component, api: &[ApiMember]) -> Result<()> {
    for required in api {
        let member =
            instance
                .member(&required.name)
                .ok_or_else(|| ContainerError::InterfaceMemberMissing {
                    key: key.to_string(),
                    member: required.name.clone(),
                })?;

        let Some(expected) = required.arity else {
            continue;
        };
        let actual = match member {
            Member::Method { arity } => Some(arity),
            Member::Property => None,
        };
        if actual != Some(expected) {
            return Err(ContainerError::InterfaceArityMismatch {
                key: key.to_string(),
                member: required.name.clone(),
                expected,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{instance, Object};
    use crate::error::ErrorKind;

    fn runner() -> Object {
        Object::new()
            .with("name", instance("runner"))
            .with_method("run", 1, |_| None)
    }

    #[test]
    fn accepts_matching_members() {
        let api = [ApiMember::property("name"), ApiMember::method("run", 1)];
        assert!(validate_interface("Runner", &runner(), &api).is_ok());
    }

    #[test]
    fn reports_the_first_violation() {
        let api = [ApiMember::method("run", 2), ApiMember::property("stop")];
        let err = validate_interface("Runner", &runner(), &api).unwrap_err();
        assert_eq!(
            err,
            ContainerError::InterfaceArityMismatch {
                key: "Runner".into(),
                member: "run".into(),
                expected: 2,
                actual: Some(1),
            }
        );

        let err = validate_interface("Runner", &runner(), &api[1..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InterfaceMemberMissing);
    }

    #[test]
    fn a_property_has_no_arity() {
        let api = [ApiMember::method("name", 0)];
        let err = validate_interface("Runner", &runner(), &api).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InterfaceArityMismatch);
    }
}
