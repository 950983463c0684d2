//! The immutable policy model snapshot.
//!
//! A [`PolicyModel`] is only ever built from an error-free validation pass
//! and is never mutated afterwards; reloads replace it wholesale.

use std::collections::BTreeMap;
use std::time::Duration;

use oidc_consts::{ENFORCE_PKCE_ALWAYS, ENFORCE_PKCE_NEVER, ENFORCE_PKCE_PUBLIC_CLIENTS_ONLY};
use serde::Serialize;

use crate::clients::Client;
use crate::config::humantime_serde;
use crate::discovery::DiscoveryAggregate;
use crate::keys::KeyRegistry;
use crate::policy::{Decision, PolicyTable, Subject};

/// Token lifespans of one scope (global or a named custom lifespan)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenLifespans {
    /// Access token
    #[serde(with = "humantime_serde")]
    pub access_token: Duration,
    /// Authorization code
    #[serde(with = "humantime_serde")]
    pub authorize_code: Duration,
    /// ID token
    #[serde(with = "humantime_serde")]
    pub id_token: Duration,
    /// Refresh token
    #[serde(with = "humantime_serde")]
    pub refresh_token: Duration,
}

impl Default for TokenLifespans {
    fn default() -> Self {
        Self {
            access_token: Duration::from_secs(60 * 60),
            authorize_code: Duration::from_secs(60),
            id_token: Duration::from_secs(60 * 60),
            refresh_token: Duration::from_secs(90 * 60),
        }
    }
}

/// Global lifespans plus the named custom ones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lifespans {
    /// Provider-wide lifespans
    #[serde(flatten)]
    pub global: TokenLifespans,
    /// Named lifespans clients can opt into
    pub custom: BTreeMap<String, TokenLifespans>,
}

impl Lifespans {
    /// Lifespans for a client's `lifespan` reference; empty or unknown names
    /// get the global values
    #[must_use]
    pub fn for_client(&self, name: &str) -> &TokenLifespans {
        self.custom.get(name).unwrap_or(&self.global)
    }
}

/// When PKCE is mandatory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PkceEnforcement {
    /// Every client
    Always,
    /// No client
    Never,
    /// Public clients only
    #[default]
    PublicClientsOnly,
}

impl PkceEnforcement {
    /// Parse the configuration spelling
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            ENFORCE_PKCE_ALWAYS => Some(Self::Always),
            ENFORCE_PKCE_NEVER => Some(Self::Never),
            ENFORCE_PKCE_PUBLIC_CLIENTS_ONLY => Some(Self::PublicClientsOnly),
            _ => None,
        }
    }

    /// Whether `client` must use PKCE
    #[must_use]
    pub fn required_for(self, client: &Client) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::PublicClientsOnly => client.public,
        }
    }
}

/// Normalized CORS options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cors {
    /// Endpoints with CORS enabled
    pub endpoints: Vec<String>,
    /// Allowed origins, including those derived from client redirect URIs
    pub allowed_origins: Vec<String>,
}

impl Cors {
    /// Whether `origin` may call a CORS-enabled endpoint
    #[must_use]
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }
}

/// Validated provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyModel {
    /// Issuer signing keys
    #[serde(skip)]
    pub keys: KeyRegistry,
    /// Authorization policies
    pub policies: PolicyTable,
    /// Clients, in configuration order
    pub clients: Vec<Client>,
    /// Published discovery metadata
    pub discovery: DiscoveryAggregate,
    /// Token lifespans
    pub lifespans: Lifespans,
    /// CORS options
    pub cors: Cors,
    /// PKCE enforcement
    pub enforce_pkce: PkceEnforcement,
    /// Minimum `state`/`nonce` entropy; `None` when the check is disabled
    pub minimum_parameter_entropy: Option<u32>,
}

impl PolicyModel {
    /// Look up a client by ID, ignoring case
    #[must_use]
    pub fn client(&self, id: &str) -> Option<&Client> {
        let id = id.to_lowercase();
        self.clients.iter().find(|c| c.id.to_lowercase() == id)
    }

    /// Whether any client registered the bearer-authorization scope
    #[must_use]
    pub fn bearer_authorization_enabled(&self) -> bool {
        self.discovery.bearer_authorization
    }

    /// Decide `subject` under the authorization policy of `client`
    #[must_use]
    pub fn decide(&self, client: &Client, subject: &Subject) -> Decision {
        self.policies.decide(&client.authorization_policy, subject)
    }
}
