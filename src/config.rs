//! Configuration management
//!
//! The declarative provider document: issuer keys, authorization policies,
//! lifespans, CORS options and registered clients. Every type here is plain
//! decoded data; nothing is defaulted or checked until
//! [`build_policy_model`](crate::provider::build_policy_model) runs.

use std::{collections::BTreeMap, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::keys::KeyMaterial;
use crate::{Error, Result};

/// OpenID Connect provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcConfig {
    /// Legacy single issuer key. Treated as an RS256 signing key placed
    /// before every entry of `jwks`.
    pub issuer_private_key: Option<KeyMaterial>,
    /// Certificate chain for the legacy issuer key.
    pub issuer_certificate_chain: Vec<String>,
    /// Issuer signing keys
    pub jwks: Vec<JwkConfig>,
    /// PKCE enforcement (`always`, `never`, `public_clients_only`)
    pub enforce_pkce: String,
    /// Minimum entropy of `state`/`nonce` parameters; `-1` disables the check
    pub minimum_parameter_entropy: i64,
    /// Token lifespans
    pub lifespans: LifespansConfig,
    /// Named authorization policies clients can reference
    pub authorization_policies: BTreeMap<String, PolicyConfig>,
    /// CORS options
    pub cors: CorsConfig,
    /// Registered clients
    pub clients: Vec<ClientConfig>,
}

impl OidcConfig {
    /// Load configuration from an optional YAML file, then overlay
    /// `OIDC_POLICY_`-prefixed environment variables (`__` separates levels).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("OIDC_POLICY_").split("__"));

        figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

/// A JSON Web Key entry (issuer key or client public key)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JwkConfig {
    /// Key ID; computed from the key thumbprint when empty (issuer keys only)
    pub key_id: String,
    /// Signing algorithm; inferred from the key when empty
    pub algorithm: String,
    /// Key use; inferred from the key when empty
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key material
    pub key: Option<KeyMaterial>,
    /// Optional X.509 chain, leaf first (PEM blocks or base64 DER)
    pub certificate_chain: Vec<String>,
}

/// Token lifespans
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifespansConfig {
    /// Access token lifespan
    #[serde(with = "humantime_serde")]
    pub access_token: Duration,
    /// Authorization code lifespan
    #[serde(with = "humantime_serde")]
    pub authorize_code: Duration,
    /// ID token lifespan
    #[serde(with = "humantime_serde")]
    pub id_token: Duration,
    /// Refresh token lifespan
    #[serde(with = "humantime_serde")]
    pub refresh_token: Duration,
    /// Named lifespans clients can opt into
    pub custom: BTreeMap<String, LifespanConfig>,
}

/// A named custom lifespan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifespanConfig {
    /// Access token lifespan
    #[serde(with = "humantime_serde")]
    pub access_token: Duration,
    /// Authorization code lifespan
    #[serde(with = "humantime_serde")]
    pub authorize_code: Duration,
    /// ID token lifespan
    #[serde(with = "humantime_serde")]
    pub id_token: Duration,
    /// Refresh token lifespan
    #[serde(with = "humantime_serde")]
    pub refresh_token: Duration,
}

/// A named authorization policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Decision when no rule matches
    pub default_policy: String,
    /// Rules, evaluated in order
    pub rules: Vec<PolicyRuleConfig>,
}

/// One rule of an authorization policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRuleConfig {
    /// Decision when the rule matches
    pub policy: String,
    /// Subject matchers (`user:<name>` or `group:<name>`)
    pub subject: Vec<String>,
}

/// CORS options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Endpoints with CORS enabled
    pub endpoints: Vec<String>,
    /// Allowed origins (`*` alone, or scheme+host origins)
    pub allowed_origins: Vec<String>,
    /// Also allow the origin of every client redirect URI
    pub allowed_origins_from_client_redirect_uris: bool,
}

/// Client public key material: a remote JWKS URI or inline keys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicKeysConfig {
    /// Remote JWKS URI (HTTPS)
    pub uri: Option<String>,
    /// Inline public keys
    pub values: Vec<JwkConfig>,
}

/// A registered client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Client identifier
    pub id: String,
    /// Human readable description (defaults to the ID)
    pub description: String,
    /// Client secret (digest or plaintext)
    pub secret: Option<String>,
    /// Sector identifier host for pairwise subjects
    pub sector_identifier: Option<String>,
    /// Public (non-confidential) client
    pub public: bool,
    /// Authorization policy name
    pub authorization_policy: String,
    /// Custom lifespan name
    pub lifespan: String,
    /// Requested audience mode
    pub requested_audience_mode: String,
    /// Consent mode
    pub consent_mode: String,
    /// Consent remember duration for `pre-configured` consent
    #[serde(with = "humantime_serde::option")]
    pub pre_configured_consent_duration: Option<Duration>,
    /// Audiences (resource identifiers or URL prefixes)
    pub audience: Vec<String>,
    /// Scopes
    pub scopes: Vec<String>,
    /// Grant types
    pub grant_types: Vec<String>,
    /// Response types
    pub response_types: Vec<String>,
    /// Response modes
    pub response_modes: Vec<String>,
    /// Redirect URIs
    pub redirect_uris: Vec<String>,
    /// PKCE challenge method
    pub pkce_challenge_method: String,
    /// Token endpoint authentication method
    pub token_endpoint_auth_method: String,
    /// Signing algorithm for JWT client authentication
    pub token_endpoint_auth_signing_alg: String,
    /// Request object signing algorithm
    pub request_object_signing_alg: String,
    /// Public key material for asymmetric client authentication
    pub public_keys: PublicKeysConfig,
    /// Authorization response (JARM) signing algorithm
    pub authorization_signed_response_alg: String,
    /// Authorization response (JARM) signing key ID
    pub authorization_signed_response_key_id: String,
    /// ID token signing algorithm
    pub id_token_signed_response_alg: String,
    /// ID token signing key ID
    pub id_token_signed_response_key_id: String,
    /// Access token signing algorithm
    pub access_token_signed_response_alg: String,
    /// Access token signing key ID
    pub access_token_signed_response_key_id: String,
    /// Userinfo signing algorithm
    pub userinfo_signed_response_alg: String,
    /// Userinfo signing key ID
    pub userinfo_signed_response_key_id: String,
    /// Introspection signing algorithm
    pub introspection_signed_response_alg: String,
    /// Introspection signing key ID
    pub introspection_signed_response_key_id: String,
}

/// Human readable durations for serde (`"90m"`, `"1h"`, `"100ms"`, `"3600"`)
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    /// Deserialize human-readable duration string
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawDuration::deserialize(deserializer)?
            .into_duration()
            .map_err(serde::de::Error::custom)
    }

    /// A duration string or a bare number of seconds
    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    impl RawDuration {
        pub(super) fn into_duration(self) -> Result<Duration, String> {
            match self {
                Self::Seconds(secs) => Ok(Duration::from_secs(secs)),
                Self::Text(s) => parse(&s),
            }
        }
    }

    /// Parse a duration such as `"100ms"`, `"30s"`, `"5m"`, `"1h"`, `"7d"`,
    /// `"1w"` or a bare number of seconds.
    pub fn parse(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let number = |n: &str| {
            n.trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid duration '{s}': {e}"))
        };
        let scaled = |n: &str, unit: u64| {
            number(n)?
                .checked_mul(unit)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("invalid duration '{s}': value is too large"))
        };

        if let Some(ms) = s.strip_suffix("ms") {
            number(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            number(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            scaled(mins, 60)
        } else if let Some(hours) = s.strip_suffix('h') {
            scaled(hours, 3600)
        } else if let Some(days) = s.strip_suffix('d') {
            scaled(days, 86_400)
        } else if let Some(weeks) = s.strip_suffix('w') {
            scaled(weeks, 604_800)
        } else {
            number(s).map(Duration::from_secs)
        }
    }

    /// `Option<Duration>` variant
    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize an optional duration
        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize an optional duration
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<super::RawDuration>::deserialize(deserializer)?
                .map(|raw| raw.into_duration().map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
