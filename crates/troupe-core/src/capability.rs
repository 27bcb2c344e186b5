//! Capability tokens and the authorization gate.
//!
//! Tokens are issued elsewhere; this module only reads and verifies them.
//! A token names a tenant, a subject, and a set of resource/action grants.
//! Every orchestrator mutation is checked against the gate before any state
//! changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Resource names checked by the orchestrator.
pub mod resources {
    /// Workflow lifecycle operations
    pub const WORKFLOWS: &str = "workflows";
}

/// Action names checked by the orchestrator.
pub mod actions {
    /// Create a workflow record
    pub const CREATE: &str = "create";
    /// Execute a stored workflow
    pub const EXECUTE: &str = "execute";
}

/// Authorization failures, distinct from not-found and internal errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// No grant covers the requested resource/action pair
    #[error("missing grant for {resource}:{action}")]
    MissingGrant { resource: String, action: String },

    /// Token belongs to a different tenant than the target resource
    #[error("token tenant {actual} does not match owning tenant {expected}")]
    TenantMismatch { expected: String, actual: String },

    /// No grant covers a capability an agent declares it needs
    #[error("no grant covers capability {requirement} required by agent {agent_id}")]
    UncoveredRequirement {
        agent_id: String,
        requirement: String,
    },

    /// Token could not be decoded
    #[error("malformed capability token: {0}")]
    MalformedToken(String),
}

/// One resource/action grant inside a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityGrant {
    /// Resource the grant applies to
    pub resource: String,
    /// Actions permitted on the resource
    pub actions: Vec<String>,
    /// Opaque issuer-defined constraints
    #[serde(default)]
    pub constraints: HashMap<String, serde_json::Value>,
}

impl CapabilityGrant {
    /// Create a grant for a resource and a set of actions.
    #[must_use]
    pub fn new(
        resource: impl Into<String>,
        actions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            resource: resource.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            constraints: HashMap::new(),
        }
    }

    /// Whether this grant permits `action` on its resource.
    #[must_use]
    pub fn allows(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }
}

/// An already-issued capability token, consumed by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityToken {
    /// Subject the token was issued to
    pub sub: String,
    /// Tenant the token is scoped to
    pub tenant_id: String,
    /// Resource/action grants
    #[serde(default)]
    pub capabilities: Vec<CapabilityGrant>,
}

impl CapabilityToken {
    /// Create a token with no grants.
    #[must_use]
    pub fn new(sub: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            tenant_id: tenant_id.into(),
            capabilities: Vec::new(),
        }
    }

    /// Attach a grant.
    #[must_use]
    pub fn with_grant(mut self, grant: CapabilityGrant) -> Self {
        self.capabilities.push(grant);
        self
    }

    /// Decode the wire form of a token. Signature verification happens at
    /// issuance, upstream of this engine.
    pub fn from_json(raw: &str) -> Result<Self, CapabilityError> {
        serde_json::from_str(raw).map_err(|e| CapabilityError::MalformedToken(e.to_string()))
    }

    /// Whether any grant permits `action` on `resource`.
    #[must_use]
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.capabilities
            .iter()
            .any(|g| g.resource == resource && g.allows(action))
    }

    /// Whether any grant's resource is a prefix of a `resource.action`
    /// requirement string declared by an agent.
    #[must_use]
    pub fn covers_requirement(&self, requirement: &str) -> bool {
        self.capabilities
            .iter()
            .any(|g| requirement.starts_with(g.resource.as_str()))
    }
}

/// Stateless verifier for capability tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityGate;

impl CapabilityGate {
    /// Create a gate.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Require a grant for `action` on `resource`.
    pub fn verify(
        &self,
        token: &CapabilityToken,
        resource: &str,
        action: &str,
    ) -> Result<(), CapabilityError> {
        if token.allows(resource, action) {
            debug!(sub = %token.sub, resource, action, "capability check passed");
            Ok(())
        } else {
            Err(CapabilityError::MissingGrant {
                resource: resource.to_string(),
                action: action.to_string(),
            })
        }
    }

    /// Require the token to belong to `tenant_id`.
    pub fn ensure_tenant(
        &self,
        token: &CapabilityToken,
        tenant_id: &str,
    ) -> Result<(), CapabilityError> {
        if token.tenant_id == tenant_id {
            Ok(())
        } else {
            Err(CapabilityError::TenantMismatch {
                expected: tenant_id.to_string(),
                actual: token.tenant_id.clone(),
            })
        }
    }

    /// Require every `resource.action` requirement of an agent to be covered
    /// by at least one grant (resource-prefix match).
    pub fn ensure_requirements(
        &self,
        token: &CapabilityToken,
        agent_id: &str,
        requirements: &[String],
    ) -> Result<(), CapabilityError> {
        for requirement in requirements {
            if !token.covers_requirement(requirement) {
                return Err(CapabilityError::UncoveredRequirement {
                    agent_id: agent_id.to_string(),
                    requirement: requirement.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> CapabilityToken {
        CapabilityToken::new("svc-runner", "tenant-1")
            .with_grant(CapabilityGrant::new(
                resources::WORKFLOWS,
                vec![actions::CREATE, actions::EXECUTE],
            ))
            .with_grant(CapabilityGrant::new("llm", vec!["generate"]))
    }

    #[test]
    fn test_verify_grant() {
        let gate = CapabilityGate::new();
        let token = token();

        assert!(gate
            .verify(&token, resources::WORKFLOWS, actions::CREATE)
            .is_ok());
        assert_eq!(
            gate.verify(&token, resources::WORKFLOWS, "delete"),
            Err(CapabilityError::MissingGrant {
                resource: "workflows".into(),
                action: "delete".into(),
            })
        );
        assert!(gate.verify(&token, "billing", "read").is_err());
    }

    #[test]
    fn test_ensure_tenant() {
        let gate = CapabilityGate::new();
        let token = token();

        assert!(gate.ensure_tenant(&token, "tenant-1").is_ok());
        let err = gate.ensure_tenant(&token, "tenant-2").unwrap_err();
        assert!(matches!(err, CapabilityError::TenantMismatch { .. }));
    }

    #[test]
    fn test_requirement_prefix_match() {
        let token = token();

        // Exact and prefix coverage through the "llm" grant
        assert!(token.covers_requirement("llm.generate"));
        assert!(token.covers_requirement("llm.embed"));
        assert!(!token.covers_requirement("integrations.invoke"));
    }

    #[test]
    fn test_ensure_requirements() {
        let gate = CapabilityGate::new();
        let token = token();

        assert!(gate
            .ensure_requirements(&token, "a", &["llm.generate".into()])
            .is_ok());

        let err = gate
            .ensure_requirements(&token, "a", &["data.process".into()])
            .unwrap_err();
        assert_eq!(
            err,
            CapabilityError::UncoveredRequirement {
                agent_id: "a".into(),
                requirement: "data.process".into(),
            }
        );
    }

    #[test]
    fn test_from_json() {
        let raw = r#"{
            "sub": "user-7",
            "tenant_id": "tenant-9",
            "capabilities": [
                {"resource": "workflows", "actions": ["create"]}
            ]
        }"#;

        let token = CapabilityToken::from_json(raw).unwrap();
        assert_eq!(token.tenant_id, "tenant-9");
        assert!(token.allows("workflows", "create"));

        let err = CapabilityToken::from_json("not json").unwrap_err();
        assert!(matches!(err, CapabilityError::MalformedToken(_)));
    }
}
