//! Bearer authorization decision engine.
//!
//! Each request walks `Start → TokenIntrospected → ScopeChecked →
//! AudienceChecked → SubjectAuthorized → Allow`. Any failed step denies the
//! request; there are no retries at this layer. The subject's access is
//! evaluated fresh on every request, so group or rule changes apply without
//! revoking tokens.
//!
//! The engine reads the active [`PolicyModel`] snapshot once per request and
//! shares no mutable state between requests.

pub mod audit;
mod collaborators;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use oidc_consts::SCOPE_BEARER_AUTHZ;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::model::PolicyModel;
use crate::reload::LivePolicy;

pub use collaborators::{
    AccessGrant, AuthorizationEvaluator, EvaluationError, IntrospectionError, TokenIntrospector,
    Verdict,
};

/// An inbound request presenting a bearer token
#[derive(Debug, Clone)]
pub struct BearerRequest {
    /// Presented token
    pub token: String,
    /// Requested resource URL
    pub resource: String,
    /// Deadline of the inbound request
    pub deadline: Option<Instant>,
}

impl BearerRequest {
    /// A request without a deadline
    #[must_use]
    pub fn new(token: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            resource: resource.into(),
            deadline: None,
        }
    }

    /// Build from an `Authorization` header value
    #[must_use]
    pub fn from_header(header: &str, resource: impl Into<String>) -> Option<Self> {
        extract_bearer(header).map(|token| Self::new(token, resource))
    }

    /// Bound the request by `deadline`
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Bound the request by `timeout` from now
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// Parse `Bearer <token>`; the scheme is case-insensitive
#[must_use]
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Whether a granted `audience` entry covers `resource`.
///
/// Exact matches always count. A prefix only counts at a path boundary: the
/// audience ends with `/`, or the resource continues with `/`, `?` or `#`.
#[must_use]
pub fn audience_matches(audience: &str, resource: &str) -> bool {
    if audience.is_empty() {
        return false;
    }
    match resource.strip_prefix(audience) {
        Some("") => true,
        Some(rest) => audience.ends_with('/') || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

/// Last stage a request reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing checked yet
    Start,
    /// The token resolved to a grant
    TokenIntrospected,
    /// The grant carries the bearer-authorization scope
    ScopeChecked,
    /// The grant's audience covers the resource
    AudienceChecked,
    /// The subject currently has access
    SubjectAuthorized,
}

/// Why a request was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No client registered the bearer-authorization scope
    Disabled,
    /// Introspection rejected the token
    Introspection(IntrospectionError),
    /// The grant lacks the bearer-authorization scope
    MissingScope,
    /// The token's client is not in the active configuration
    UnknownClient(String),
    /// The token's client no longer registers the bearer-authorization scope
    ClientNotAuthorized(String),
    /// No audience entry covers the resource
    AudienceMismatch,
    /// The evaluator forbade access
    Forbidden,
    /// The evaluator failed
    Evaluation(EvaluationError),
    /// The request deadline elapsed
    Timeout,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("bearer authorization is not enabled"),
            Self::Introspection(e) => write!(f, "introspection failed: {e}"),
            Self::MissingScope => write!(f, "token was not granted the '{SCOPE_BEARER_AUTHZ}' scope"),
            Self::UnknownClient(id) => write!(f, "client '{id}' is not registered"),
            Self::ClientNotAuthorized(id) => {
                write!(f, "client '{id}' is not registered for the '{SCOPE_BEARER_AUTHZ}' scope")
            }
            Self::AudienceMismatch => f.write_str("token audience does not cover the resource"),
            Self::Forbidden => f.write_str("subject is not authorized for the resource"),
            Self::Evaluation(e) => write!(f, "authorization evaluation failed: {e}"),
            Self::Timeout => f.write_str("request deadline elapsed"),
        }
    }
}

/// Result of [`BearerAuthorizer::authorize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzDecision {
    /// Access granted on behalf of `grant.subject`
    Allow(AccessGrant),
    /// Access refused
    Deny {
        /// Last stage reached
        stage: Stage,
        /// Why
        reason: DenyReason,
    },
}

impl AuthzDecision {
    /// Whether access was granted
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// Denial reason, if denied
    #[must_use]
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Allow(_) => None,
            Self::Deny { reason, .. } => Some(reason),
        }
    }
}

struct Denied {
    stage: Stage,
    reason: DenyReason,
    grant: Option<AccessGrant>,
}

impl Denied {
    fn at(stage: Stage, reason: DenyReason) -> Self {
        Self {
            stage,
            reason,
            grant: None,
        }
    }

    fn with_grant(mut self, grant: AccessGrant) -> Self {
        self.grant = Some(grant);
        self
    }
}

/// Bearer authorization decision engine
pub struct BearerAuthorizer {
    policy: Arc<LivePolicy>,
    introspector: Arc<dyn TokenIntrospector>,
    evaluator: Arc<dyn AuthorizationEvaluator>,
}

impl BearerAuthorizer {
    /// Create an engine over the live policy and its collaborators
    #[must_use]
    pub fn new(
        policy: Arc<LivePolicy>,
        introspector: Arc<dyn TokenIntrospector>,
        evaluator: Arc<dyn AuthorizationEvaluator>,
    ) -> Self {
        Self {
            policy,
            introspector,
            evaluator,
        }
    }

    /// Decide one request and emit its audit event.
    pub async fn authorize(&self, request: &BearerRequest) -> AuthzDecision {
        let model = self.policy.get();

        match self.run(&model, request).await {
            Ok(grant) => {
                audit::emit(&audit::AuditEvent::allowed(
                    &request.resource,
                    &grant.subject,
                    grant.client_id.as_deref(),
                ));
                AuthzDecision::Allow(grant)
            }
            Err(denied) => {
                let grant = denied.grant.as_ref();
                audit::emit(&audit::AuditEvent::denied(
                    &request.resource,
                    grant.map(|g| g.subject.as_str()),
                    grant.and_then(|g| g.client_id.as_deref()),
                    denied.stage,
                    &denied.reason,
                ));
                AuthzDecision::Deny {
                    stage: denied.stage,
                    reason: denied.reason,
                }
            }
        }
    }

    async fn run(&self, model: &PolicyModel, request: &BearerRequest) -> Result<AccessGrant, Denied> {
        if !model.bearer_authorization_enabled() {
            return Err(Denied::at(Stage::Start, DenyReason::Disabled));
        }

        let grant = within(request.deadline, self.introspector.introspect(&request.token))
            .await
            .map_err(|reason| Denied::at(Stage::Start, reason))?
            .map_err(|e| {
                warn!(error = %e, "Bearer token introspection failed");
                Denied::at(Stage::Start, DenyReason::Introspection(e))
            })?;
        debug!(subject = %grant.subject, "Bearer token introspected");

        if let Err(reason) = check_scope(model, &grant) {
            return Err(Denied::at(Stage::TokenIntrospected, reason).with_grant(grant));
        }

        if !grant.audience.iter().any(|a| audience_matches(a, &request.resource)) {
            debug!(resource = %request.resource, audience = ?grant.audience, "Audience does not cover resource");
            return Err(Denied::at(Stage::ScopeChecked, DenyReason::AudienceMismatch).with_grant(grant));
        }

        let verdict = match within(
            request.deadline,
            self.evaluator.evaluate(&grant.subject, &request.resource),
        )
        .await
        {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                warn!(subject = %grant.subject, error = %e, "Authorization evaluation failed");
                return Err(Denied::at(Stage::AudienceChecked, DenyReason::Evaluation(e)).with_grant(grant));
            }
            Err(reason) => return Err(Denied::at(Stage::AudienceChecked, reason).with_grant(grant)),
        };

        match verdict {
            Verdict::Permit => {
                debug!(subject = %grant.subject, stage = ?Stage::SubjectAuthorized, "Bearer request allowed");
                Ok(grant)
            }
            Verdict::Forbid => Err(Denied::at(Stage::AudienceChecked, DenyReason::Forbidden).with_grant(grant)),
        }
    }
}

impl fmt::Debug for BearerAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthorizer")
            .field("policy_generation", &self.policy.generation())
            .finish_non_exhaustive()
    }
}

fn check_scope(model: &PolicyModel, grant: &AccessGrant) -> Result<(), DenyReason> {
    if !grant.has_scope(SCOPE_BEARER_AUTHZ) {
        return Err(DenyReason::MissingScope);
    }
    if let Some(id) = &grant.client_id {
        match model.client(id) {
            None => return Err(DenyReason::UnknownClient(id.clone())),
            Some(client) if !client.has_scope(SCOPE_BEARER_AUTHZ) => {
                return Err(DenyReason::ClientNotAuthorized(id.clone()));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Run `fut` within the remaining time before `deadline`.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Result<F::Output, DenyReason> {
    let Some(deadline) = deadline else {
        return Ok(fut.await);
    };
    if Instant::now() >= deadline {
        return Err(DenyReason::Timeout);
    }
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| DenyReason::Timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bearer_config;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StaticIntrospector(Result<AccessGrant, IntrospectionError>);

    #[async_trait::async_trait]
    impl TokenIntrospector for StaticIntrospector {
        async fn introspect(&self, _token: &str) -> Result<AccessGrant, IntrospectionError> {
            self.0.clone()
        }
    }

    struct SlowIntrospector;

    #[async_trait::async_trait]
    impl TokenIntrospector for SlowIntrospector {
        async fn introspect(&self, _token: &str) -> Result<AccessGrant, IntrospectionError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(IntrospectionError::Unavailable("unreachable".to_string()))
        }
    }

    /// Permits while `permit` is set; counts calls
    #[derive(Default)]
    struct SwitchEvaluator {
        permit: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AuthorizationEvaluator for SwitchEvaluator {
        async fn evaluate(&self, _subject: &str, _resource: &str) -> Result<Verdict, EvaluationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.permit.load(Ordering::SeqCst) {
                Ok(Verdict::Permit)
            } else {
                Ok(Verdict::Forbid)
            }
        }
    }

    struct FailingEvaluator;

    #[async_trait::async_trait]
    impl AuthorizationEvaluator for FailingEvaluator {
        async fn evaluate(&self, _subject: &str, _resource: &str) -> Result<Verdict, EvaluationError> {
            Err(EvaluationError::Unavailable("ldap down".to_string()))
        }
    }

    fn grant(scopes: &[&str]) -> AccessGrant {
        AccessGrant {
            scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
            audience: vec!["https://app.example.com".to_string()],
            subject: "john".to_string(),
            client_id: Some("app".to_string()),
        }
    }

    fn live() -> Arc<LivePolicy> {
        Arc::new(LivePolicy::from_config(&bearer_config()).unwrap())
    }

    fn permitting() -> Arc<SwitchEvaluator> {
        let evaluator = Arc::new(SwitchEvaluator::default());
        evaluator.permit.store(true, Ordering::SeqCst);
        evaluator
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("bearer   abc "), Some("abc"));
        assert_eq!(extract_bearer("BEARER abc"), Some("abc"));
        assert_eq!(extract_bearer("Basic abc"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Bearer"), None);
    }

    #[test]
    fn audience_prefix_respects_boundaries() {
        assert!(audience_matches("https://app.example.com", "https://app.example.com"));
        assert!(audience_matches("https://app.example.com", "https://app.example.com/admin"));
        assert!(audience_matches("https://app.example.com", "https://app.example.com?x=1"));
        assert!(audience_matches("https://app.example.com/", "https://app.example.com/admin"));
        assert!(audience_matches("https://app.example.com/api", "https://app.example.com/api/v1"));
        assert!(!audience_matches("https://app.example.com", "https://app.example.com.evil.net"));
        assert!(!audience_matches("https://app.example.com/api", "https://app.example.com/apiary"));
        assert!(!audience_matches("https://app.example.com", "https://other.example.com"));
        assert!(!audience_matches("", "https://app.example.com"));
    }

    #[tokio::test]
    async fn missing_scope_denies_without_evaluating() {
        // GIVEN: a token granted only openid
        let evaluator = permitting();
        let authz = BearerAuthorizer::new(
            live(),
            Arc::new(StaticIntrospector(Ok(grant(&["openid"])))),
            evaluator.clone(),
        );

        // WHEN: authorizing
        let decision = authz
            .authorize(&BearerRequest::new("t", "https://app.example.com/admin"))
            .await;

        // THEN: denied at the scope step, evaluator untouched
        assert_eq!(decision.deny_reason(), Some(&DenyReason::MissingScope));
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn audience_prefix_allows_and_other_host_denies() {
        let authz = BearerAuthorizer::new(
            live(),
            Arc::new(StaticIntrospector(Ok(grant(&["openid", "bearer.authz"])))),
            permitting(),
        );

        let ok = authz
            .authorize(&BearerRequest::new("t", "https://app.example.com/admin"))
            .await;
        assert!(ok.is_allowed());

        let denied = authz
            .authorize(&BearerRequest::new("t", "https://other.example.com"))
            .await;
        assert_eq!(
            denied,
            AuthzDecision::Deny {
                stage: Stage::ScopeChecked,
                reason: DenyReason::AudienceMismatch,
            }
        );
    }

    #[tokio::test]
    async fn evaluation_is_fresh_per_request() {
        // GIVEN: one still-valid token and an evaluator that currently permits
        let evaluator = permitting();
        let authz = BearerAuthorizer::new(
            live(),
            Arc::new(StaticIntrospector(Ok(grant(&["bearer.authz"])))),
            evaluator.clone(),
        );
        let request = BearerRequest::new("t", "https://app.example.com/admin");

        // WHEN: the subject loses access between two requests
        let first = authz.authorize(&request).await;
        evaluator.permit.store(false, Ordering::SeqCst);
        let second = authz.authorize(&request).await;

        // THEN: the first allows and the second denies
        assert!(first.is_allowed());
        assert_eq!(second.deny_reason(), Some(&DenyReason::Forbidden));
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn evaluator_error_denies() {
        let authz = BearerAuthorizer::new(
            live(),
            Arc::new(StaticIntrospector(Ok(grant(&["bearer.authz"])))),
            Arc::new(FailingEvaluator),
        );

        let decision = authz
            .authorize(&BearerRequest::new("t", "https://app.example.com"))
            .await;

        assert!(matches!(
            decision.deny_reason(),
            Some(DenyReason::Evaluation(EvaluationError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn introspection_failure_denies() {
        let authz = BearerAuthorizer::new(
            live(),
            Arc::new(StaticIntrospector(Err(IntrospectionError::Revoked))),
            permitting(),
        );

        let decision = authz
            .authorize(&BearerRequest::new("t", "https://app.example.com"))
            .await;

        assert_eq!(
            decision,
            AuthzDecision::Deny {
                stage: Stage::Start,
                reason: DenyReason::Introspection(IntrospectionError::Revoked),
            }
        );
    }

    #[tokio::test]
    async fn unknown_or_opted_out_client_denies() {
        // GIVEN: a grant naming a client that is not configured
        let mut unknown = grant(&["bearer.authz"]);
        unknown.client_id = Some("ghost".to_string());
        let authz = BearerAuthorizer::new(
            live(),
            Arc::new(StaticIntrospector(Ok(unknown))),
            permitting(),
        );

        // WHEN/THEN: denied as unknown client
        let decision = authz
            .authorize(&BearerRequest::new("t", "https://app.example.com"))
            .await;
        assert_eq!(
            decision.deny_reason(),
            Some(&DenyReason::UnknownClient("ghost".to_string()))
        );

        // GIVEN: the client drops the scope in a reload
        let policy = live();
        let mut config = bearer_config();
        config.clients[0].scopes = vec!["openid".to_string()];
        config.clients.push(crate::test_support::bearer_client("other"));
        policy.reload(&config).unwrap();
        let authz = BearerAuthorizer::new(
            policy,
            Arc::new(StaticIntrospector(Ok(grant(&["bearer.authz"])))),
            permitting(),
        );

        // WHEN/THEN: the old token is refused immediately
        let decision = authz
            .authorize(&BearerRequest::new("t", "https://app.example.com"))
            .await;
        assert_eq!(
            decision.deny_reason(),
            Some(&DenyReason::ClientNotAuthorized("app".to_string()))
        );
    }

    #[tokio::test]
    async fn disabled_without_bearer_clients() {
        let policy = Arc::new(LivePolicy::from_config(&crate::test_support::valid_config()).unwrap());
        let authz = BearerAuthorizer::new(
            policy,
            Arc::new(StaticIntrospector(Ok(grant(&["bearer.authz"])))),
            permitting(),
        );

        let decision = authz
            .authorize(&BearerRequest::new("t", "https://app.example.com"))
            .await;

        assert_eq!(decision.deny_reason(), Some(&DenyReason::Disabled));
    }

    #[tokio::test]
    async fn slow_introspection_times_out() {
        // GIVEN: an introspector slower than the request deadline
        let authz = BearerAuthorizer::new(live(), Arc::new(SlowIntrospector), permitting());
        let request = BearerRequest::new("t", "https://app.example.com")
            .with_timeout(Duration::from_millis(20));

        // WHEN: authorizing
        let decision = authz.authorize(&request).await;

        // THEN: denied with a timeout
        assert_eq!(decision.deny_reason(), Some(&DenyReason::Timeout));
    }

    #[tokio::test]
    async fn elapsed_deadline_denies_before_calling() {
        let evaluator = permitting();
        let authz = BearerAuthorizer::new(
            live(),
            Arc::new(StaticIntrospector(Ok(grant(&["bearer.authz"])))),
            evaluator.clone(),
        );
        let request = BearerRequest::new("t", "https://app.example.com")
            .with_deadline(Instant::now() - Duration::from_millis(1));

        let decision = authz.authorize(&request).await;

        assert_eq!(decision.deny_reason(), Some(&DenyReason::Timeout));
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debug_reports_policy_generation() {
        // GIVEN: an authorizer over a policy reloaded once
        let live = live();
        let authz = BearerAuthorizer::new(
            Arc::clone(&live),
            Arc::new(StaticIntrospector(Ok(grant(&["bearer.authz"])))),
            permitting(),
        );
        live.reload(&bearer_config()).unwrap();

        // THEN: the debug output shows the current generation
        assert_eq!(format!("{authz:?}"), "BearerAuthorizer { policy_generation: 1, .. }");
    }
}
