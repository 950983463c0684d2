//! Discovery aggregate.
//!
//! Built in two explicit stages so nothing is mutated behind the client
//! validation pass:
//!
//! 1. [`DiscoveryBuilder`] collects what keys, policies and lifespans
//!    provide and freezes into an immutable [`IssuerDiscovery`].
//! 2. Client validation reads the [`IssuerDiscovery`] and returns a
//!    [`ClientDiscovery`] contribution per client; the merged contributions
//!    finish the published [`DiscoveryAggregate`].

use std::collections::BTreeMap;

use oidc_consts::{ASYMMETRIC_SIGNING_ALGS, BUILTIN_POLICY_NAMES, RESERVED_POLICY_NAMES};
use serde::Serialize;

use crate::keys::KeyRegistry;

/// Accumulates discovery sets from keys, policies and lifespans
#[derive(Debug, Clone, Default)]
pub struct DiscoveryBuilder {
    algorithms: Vec<String>,
    key_ids: Vec<String>,
    default_key_ids: BTreeMap<String, String>,
    policies: Vec<String>,
    lifespans: Vec<String>,
}

impl DiscoveryBuilder {
    /// Start with the reserved policy names, which are always available
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: RESERVED_POLICY_NAMES.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// Take the algorithm and key ID sets from the resolved issuer keys
    #[must_use]
    pub fn with_keys(mut self, registry: &KeyRegistry) -> Self {
        self.algorithms = registry.algorithms().to_vec();
        self.key_ids = registry.key_ids().to_vec();
        self.default_key_ids = registry.default_key_ids().clone();
        self
    }

    /// Add an accepted authorization policy name
    pub fn add_policy(&mut self, name: &str) {
        if !self.policies.iter().any(|p| p == name) {
            self.policies.push(name.to_string());
        }
    }

    /// Add a custom lifespan name
    pub fn add_lifespan(&mut self, name: &str) {
        if !self.lifespans.iter().any(|l| l == name) {
            self.lifespans.push(name.to_string());
        }
    }

    /// Freeze into the read-only view client validation consumes
    #[must_use]
    pub fn freeze(self) -> IssuerDiscovery {
        IssuerDiscovery {
            algorithms: self.algorithms,
            key_ids: self.key_ids,
            default_key_ids: self.default_key_ids,
            policies: self.policies,
            lifespans: self.lifespans,
        }
    }
}

/// Discovery sets available before any client is validated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuerDiscovery {
    algorithms: Vec<String>,
    key_ids: Vec<String>,
    default_key_ids: BTreeMap<String, String>,
    policies: Vec<String>,
    lifespans: Vec<String>,
}

impl IssuerDiscovery {
    /// Issuer signing algorithms, first-seen order
    #[must_use]
    pub fn algorithms(&self) -> &[String] {
        &self.algorithms
    }

    /// Issuer key IDs
    #[must_use]
    pub fn key_ids(&self) -> &[String] {
        &self.key_ids
    }

    /// Whether an issuer key offers `algorithm`
    #[must_use]
    pub fn has_algorithm(&self, algorithm: &str) -> bool {
        self.algorithms.iter().any(|a| a == algorithm)
    }

    /// Whether an issuer key has `key_id`
    #[must_use]
    pub fn has_key_id(&self, key_id: &str) -> bool {
        self.key_ids.iter().any(|k| k == key_id)
    }

    /// Policy names a client may reference
    #[must_use]
    pub fn policies(&self) -> &[String] {
        &self.policies
    }

    /// Whether `name` is a policy a client may reference
    #[must_use]
    pub fn has_policy(&self, name: &str) -> bool {
        self.policies.iter().any(|p| p == name)
    }

    /// Custom lifespan names
    #[must_use]
    pub fn lifespans(&self) -> &[String] {
        &self.lifespans
    }

    /// Whether `name` is a configured custom lifespan
    #[must_use]
    pub fn has_lifespan(&self, name: &str) -> bool {
        self.lifespans.iter().any(|l| l == name)
    }

    /// Merge per-client contributions into the published aggregate
    #[must_use]
    pub fn finish(self, clients: ClientDiscovery) -> DiscoveryAggregate {
        let mut response_object_signing_algs = self.algorithms;
        sort_algorithms(&mut response_object_signing_algs);

        let mut request_object_signing_algs = clients.request_object_signing_algs;
        sort_algorithms(&mut request_object_signing_algs);

        let mut authorization_policies = self.policies;
        authorization_policies.sort();

        let mut lifespans = self.lifespans;
        lifespans.sort();

        DiscoveryAggregate {
            response_object_signing_algs,
            response_object_signing_key_ids: self.key_ids,
            default_key_ids: self.default_key_ids,
            request_object_signing_algs,
            authorization_policies,
            lifespans,
            bearer_authorization: clients.bearer_authorization,
            jwt_response_access_tokens: clients.jwt_response_access_tokens,
        }
    }
}

/// What one or more clients add to discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientDiscovery {
    /// A client registered the bearer-authorization scope
    pub bearer_authorization: bool,
    /// A client receives JWT-formatted access tokens
    pub jwt_response_access_tokens: bool,
    /// Algorithms of inline client public keys, first-seen order
    pub request_object_signing_algs: Vec<String>,
}

impl ClientDiscovery {
    /// Record a request object signing algorithm
    pub fn add_request_object_alg(&mut self, algorithm: &str) {
        if !self.request_object_signing_algs.iter().any(|a| a == algorithm) {
            self.request_object_signing_algs.push(algorithm.to_string());
        }
    }

    /// Fold another contribution into this one
    pub fn merge(&mut self, other: Self) {
        self.bearer_authorization |= other.bearer_authorization;
        self.jwt_response_access_tokens |= other.jwt_response_access_tokens;
        for algorithm in other.request_object_signing_algs {
            self.add_request_object_alg(&algorithm);
        }
    }
}

/// Published, read-only provider metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryAggregate {
    /// Issuer signing algorithms
    pub response_object_signing_algs: Vec<String>,
    /// Issuer key IDs
    pub response_object_signing_key_ids: Vec<String>,
    /// Algorithm to default key ID
    pub default_key_ids: BTreeMap<String, String>,
    /// Request object signing algorithms offered by client keys
    pub request_object_signing_algs: Vec<String>,
    /// Authorization policy names
    pub authorization_policies: Vec<String>,
    /// Custom lifespan names
    pub lifespans: Vec<String>,
    /// Bearer-authorization feature enabled
    pub bearer_authorization: bool,
    /// JWT access tokens in use
    pub jwt_response_access_tokens: bool,
}

impl DiscoveryAggregate {
    /// Whether `name` is a known authorization policy
    #[must_use]
    pub fn has_policy(&self, name: &str) -> bool {
        self.authorization_policies.iter().any(|p| p == name)
            || BUILTIN_POLICY_NAMES.contains(&name)
    }
}

/// Order algorithms by the provider's preference list, unknown names last
fn sort_algorithms(algorithms: &mut [String]) {
    algorithms.sort_by_key(|a| {
        (
            ASYMMETRIC_SIGNING_ALGS
                .iter()
                .position(|known| known == a)
                .unwrap_or(usize::MAX),
            a.clone(),
        )
    });
}
