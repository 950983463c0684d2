//! External collaborators consulted by the bearer authorization engine.
//!
//! Both are I/O-bound and owned by the embedding service. The engine never
//! caches their answers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What an access token was granted, as reported by introspection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Granted scopes
    pub scopes: Vec<String>,
    /// Granted audience
    pub audience: Vec<String>,
    /// Subject that consented to the grant
    pub subject: String,
    /// Client the token was issued to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl AccessGrant {
    /// Whether `scope` was granted
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Token introspection failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntrospectionError {
    /// Token is past its expiry
    #[error("token expired")]
    Expired,
    /// Token was revoked
    #[error("token revoked")]
    Revoked,
    /// Token is not recognised
    #[error("malformed token: {0}")]
    Malformed(String),
    /// Introspection backend failed
    #[error("introspection unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a live authorization evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The subject may access the resource
    Permit,
    /// The subject may not access the resource
    Forbid,
}

/// Authorization evaluator failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluationError {
    /// Subject is not known to the evaluator
    #[error("unknown subject '{0}'")]
    UnknownSubject(String),
    /// Evaluator backend failed
    #[error("evaluator unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a presented bearer token to its grant.
#[async_trait::async_trait]
pub trait TokenIntrospector: Send + Sync + 'static {
    /// Introspect `token`. Expired, revoked and unknown tokens are errors.
    async fn introspect(&self, token: &str) -> Result<AccessGrant, IntrospectionError>;
}

/// Computes a subject's current access to a resource.
///
/// Called once per request; implementations must consult live rules and
/// group membership rather than anything captured at token issuance.
#[async_trait::async_trait]
pub trait AuthorizationEvaluator: Send + Sync + 'static {
    /// Evaluate `subject` against `resource`
    async fn evaluate(&self, subject: &str, resource: &str) -> Result<Verdict, EvaluationError>;
}
