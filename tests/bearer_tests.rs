//! Bearer authorization against a live policy.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{bearer_client, config_with};
use futures::future::join_all;
use oidc_policy::authz::{
    AccessGrant, AuthorizationEvaluator, AuthzDecision, BearerAuthorizer, BearerRequest, DenyReason,
    EvaluationError, IntrospectionError, TokenIntrospector, Verdict,
};
use oidc_policy::reload::LivePolicy;
use parking_lot::RwLock;

/// Tokens issued up front
struct TokenTable(HashMap<String, AccessGrant>);

#[async_trait::async_trait]
impl TokenIntrospector for TokenTable {
    async fn introspect(&self, token: &str) -> Result<AccessGrant, IntrospectionError> {
        self.0
            .get(token)
            .cloned()
            .ok_or_else(|| IntrospectionError::Malformed(token.to_string()))
    }
}

/// Group directory that can change between requests
#[derive(Default)]
struct Directory {
    admins: RwLock<Vec<String>>,
    calls: RwLock<usize>,
}

#[async_trait::async_trait]
impl AuthorizationEvaluator for Directory {
    async fn evaluate(&self, subject: &str, resource: &str) -> Result<Verdict, EvaluationError> {
        *self.calls.write() += 1;
        if !resource.contains("/admin") {
            return Ok(Verdict::Permit);
        }
        if self.admins.read().iter().any(|a| a == subject) {
            Ok(Verdict::Permit)
        } else {
            Ok(Verdict::Forbid)
        }
    }
}

fn grant(scopes: &[&str], audience: &str) -> AccessGrant {
    AccessGrant {
        scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
        audience: vec![audience.to_string()],
        subject: "john".to_string(),
        client_id: Some("api".to_string()),
    }
}

fn setup() -> (BearerAuthorizer, Arc<Directory>) {
    let live = Arc::new(LivePolicy::from_config(&config_with(vec![bearer_client("api")])).unwrap());

    let tokens = TokenTable(HashMap::from([
        ("plain".to_string(), grant(&["openid"], "https://app.example.com")),
        (
            "bearer".to_string(),
            grant(&["openid", "bearer.authz"], "https://app.example.com"),
        ),
    ]));

    let directory = Arc::new(Directory::default());
    directory.admins.write().push("john".to_string());

    let authz = BearerAuthorizer::new(live, Arc::new(tokens), directory.clone());
    (authz, directory)
}

#[tokio::test]
async fn token_without_bearer_scope_is_denied_before_evaluation() {
    // GIVEN: a token granted only openid
    let (authz, directory) = setup();

    // WHEN: it is presented
    let request = BearerRequest::from_header("Bearer plain", "https://app.example.com/admin").unwrap();
    let decision = authz.authorize(&request).await;

    // THEN: denied without consulting the evaluator
    assert_eq!(decision.deny_reason(), Some(&DenyReason::MissingScope));
    assert_eq!(*directory.calls.read(), 0);
}

#[tokio::test]
async fn audience_prefix_covers_sub_resources_only() {
    let (authz, _) = setup();

    let admin = authz
        .authorize(&BearerRequest::new("bearer", "https://app.example.com/admin"))
        .await;
    assert!(admin.is_allowed());

    let other = authz
        .authorize(&BearerRequest::new("bearer", "https://other.example.com"))
        .await;
    assert_eq!(other.deny_reason(), Some(&DenyReason::AudienceMismatch));
}

#[tokio::test]
async fn group_change_applies_to_the_next_request() {
    // GIVEN: john is an admin and holds a valid token
    let (authz, directory) = setup();
    let request = BearerRequest::new("bearer", "https://app.example.com/admin");

    // WHEN: john is removed from the admins between two requests
    let first = authz.authorize(&request).await;
    directory.admins.write().clear();
    let second = authz.authorize(&request).await;

    // THEN: only the first request is allowed
    assert!(matches!(first, AuthzDecision::Allow(ref g) if g.subject == "john"));
    assert_eq!(second.deny_reason(), Some(&DenyReason::Forbidden));
}

#[tokio::test]
async fn unknown_token_is_denied() {
    let (authz, _) = setup();

    let decision = authz
        .authorize(&BearerRequest::new("forged", "https://app.example.com"))
        .await;

    assert_eq!(
        decision.deny_reason(),
        Some(&DenyReason::Introspection(IntrospectionError::Malformed(
            "forged".to_string()
        )))
    );
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    // GIVEN: a mix of allowed and denied requests
    let (authz, directory) = setup();
    let requests: Vec<_> = (0..16)
        .map(|i| {
            let token = if i % 2 == 0 { "bearer" } else { "plain" };
            BearerRequest::new(token, "https://app.example.com/data")
        })
        .collect();

    // WHEN: evaluated concurrently
    let decisions = join_all(requests.iter().map(|r| authz.authorize(r))).await;

    // THEN: each decision depends only on its own token
    for (i, decision) in decisions.iter().enumerate() {
        assert_eq!(decision.is_allowed(), i % 2 == 0, "request {i}");
    }
    assert_eq!(*directory.calls.read(), 8);
}
