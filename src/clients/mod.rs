//! Client validation engine.
//!
//! Each registered client is normalized by a fixed sequence of steps; later
//! steps read what earlier ones derived, never the other way around:
//!
//! | Step | Module | Produces |
//! |------|--------|----------|
//! | identity | here | description, blank/duplicate ID reports |
//! | options | [`options`] | policy, lifespan, PKCE, audience mode, consent |
//! | flows | [`flows`] | scopes, response types, response modes, grant types |
//! | redirects | [`redirects`] | redirect URIs, sector identifier |
//! | credentials | [`credentials`] | public keys, token endpoint authentication |
//! | signing | [`signing`] | the five response signing selections |
//!
//! Every step is a function from configuration (plus earlier results) to a
//! new value, pushing problems into the shared [`Validator`]. Clients only
//! influence each other through the [`ClientDiscovery`] they return.

pub mod credentials;
pub mod flows;
pub mod options;
pub mod redirects;
pub mod signing;

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::discovery::{ClientDiscovery, IssuerDiscovery};
use crate::keys::KeyRegistry;
use crate::validator::{ConfigIssue, Validator, join_quoted_or};

pub use credentials::{ClientSecret, PublicKeys, TokenEndpointAuth};
pub use options::ConsentMode;
pub use signing::{Resolution, ResponseKind, ResponseSigning, SigningSelection, resolve_signing};

/// A normalized client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    /// Client identifier
    pub id: String,
    /// Description (defaults to the ID)
    pub description: String,
    /// Client secret
    #[serde(skip)]
    pub secret: Option<ClientSecret>,
    /// Public client
    pub public: bool,
    /// Sector identifier host
    pub sector_identifier: Option<String>,
    /// Authorization policy name
    pub authorization_policy: String,
    /// Custom lifespan name (empty for the provider defaults)
    pub lifespan: String,
    /// PKCE challenge method (empty when not enforced per client)
    pub pkce_challenge_method: String,
    /// Requested audience mode
    pub requested_audience_mode: String,
    /// Consent mode
    pub consent: ConsentMode,
    /// Audiences
    pub audience: Vec<String>,
    /// Scopes
    pub scopes: Vec<String>,
    /// Response types
    pub response_types: Vec<String>,
    /// Response modes
    pub response_modes: Vec<String>,
    /// Grant types
    pub grant_types: Vec<String>,
    /// Redirect URIs
    pub redirect_uris: Vec<String>,
    /// Public key material
    pub public_keys: PublicKeys,
    /// Request object signing algorithm
    pub request_object_signing_alg: String,
    /// Algorithms offered by the client's inline keys
    pub request_object_signing_algs: Vec<String>,
    /// Token endpoint authentication
    pub token_endpoint_auth: TokenEndpointAuth,
    /// Response signing selections
    pub signing: ResponseSigning,
}

impl Client {
    /// Whether the client registered `scope`
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.description)
    }
}

/// Result of validating the whole client list
#[derive(Debug, Clone, Default)]
pub struct ClientSet {
    /// Normalized clients, in configuration order
    pub clients: Vec<Client>,
    /// Merged discovery contribution
    pub discovery: ClientDiscovery,
}

/// Validate every client against the frozen issuer discovery.
pub fn validate_clients(
    configs: &[ClientConfig],
    issuer: &IssuerDiscovery,
    keys: &KeyRegistry,
    validator: &mut Validator,
) -> ClientSet {
    let mut set = ClientSet::default();
    let mut seen_ids: Vec<String> = Vec::new();
    let mut blank_ids: Vec<String> = Vec::new();
    let mut duplicate_ids: Vec<String> = Vec::new();
    let deprecations_before = count_deprecations(validator);

    for (i, config) in configs.iter().enumerate() {
        if config.id.trim().is_empty() {
            blank_ids.push(format!("#{}", i + 1));
        } else {
            let lowered = config.id.to_lowercase();
            if seen_ids.contains(&lowered) {
                if !duplicate_ids.contains(&lowered) {
                    duplicate_ids.push(lowered);
                }
            } else {
                seen_ids.push(lowered);
            }
        }

        let (client, discovery) = validate_client(config, issuer, keys, validator);
        debug!(client = %client.id, "Validated client");
        set.discovery.merge(discovery);
        set.clients.push(client);
    }

    if count_deprecations(validator) > deprecations_before {
        validator.push_warning(ConfigIssue::ClientsDeprecated);
    }

    if !blank_ids.is_empty() {
        validator.push(ConfigIssue::ClientsBlankId {
            positions: join_or(&blank_ids),
        });
    }

    if !duplicate_ids.is_empty() {
        validator.push(ConfigIssue::ClientsDuplicateId {
            ids: join_quoted_or(&duplicate_ids),
        });
    }

    set
}

/// Validate a single client. Pure apart from the issues pushed.
pub fn validate_client(
    config: &ClientConfig,
    issuer: &IssuerDiscovery,
    keys: &KeyRegistry,
    validator: &mut Validator,
) -> (Client, ClientDiscovery) {
    let id = config.id.as_str();
    let mut discovery = ClientDiscovery::default();

    let description = if config.description.is_empty() {
        config.id.clone()
    } else {
        config.description.clone()
    };

    let options = options::validate(config, issuer, validator);

    let flows = flows::validate(config, validator);
    discovery.bearer_authorization = flows.bearer_authorization;

    let redirect_uris = redirects::validate_redirect_uris(config, validator);
    let sector_identifier = redirects::validate_sector_identifier(config, validator);

    let public_keys = credentials::validate_public_keys(config, validator);
    for algorithm in &public_keys.algorithms {
        discovery.add_request_object_alg(algorithm);
    }
    let token_endpoint_auth =
        credentials::validate_token_endpoint_auth(config, &flows.response_types, &public_keys, validator);

    let (signing, jwt_access_tokens) = signing::validate(config, keys, issuer, validator);
    discovery.jwt_response_access_tokens = jwt_access_tokens;

    let client = Client {
        id: id.to_string(),
        description,
        secret: config.secret.as_deref().map(ClientSecret::new),
        public: config.public,
        sector_identifier,
        authorization_policy: options.authorization_policy,
        lifespan: options.lifespan,
        pkce_challenge_method: options.pkce_challenge_method,
        requested_audience_mode: options.requested_audience_mode,
        consent: options.consent,
        audience: config.audience.clone(),
        scopes: flows.scopes,
        response_types: flows.response_types,
        response_modes: flows.response_modes,
        grant_types: flows.grant_types,
        redirect_uris,
        public_keys: public_keys.keys,
        request_object_signing_alg: config.request_object_signing_alg.clone(),
        request_object_signing_algs: public_keys.algorithms,
        token_endpoint_auth,
        signing,
    };

    (client, discovery)
}

fn count_deprecations(validator: &Validator) -> usize {
    validator.warnings().iter().filter(|w| w.is_deprecation()).count()
}

fn join_or(values: &[String]) -> String {
    match values {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {last}", init.join(", ")),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared fixtures for the client step tests.

    use crate::config::{ClientConfig, JwkConfig};
    use crate::discovery::{DiscoveryBuilder, IssuerDiscovery};
    use crate::keys::{KeyRegistry, test_keys};
    use crate::validator::Validator;

    /// Issuer keys: `rsa` (RS256) and `ec` (ES256)
    pub fn keys() -> KeyRegistry {
        let jwks = vec![
            JwkConfig {
                key_id: "rsa".to_string(),
                key: Some(test_keys::rsa(2048, true)),
                ..Default::default()
            },
            JwkConfig {
                key_id: "ec".to_string(),
                key: Some(test_keys::ec("P-256", true)),
                ..Default::default()
            },
        ];
        KeyRegistry::resolve_keys(&jwks, &mut Validator::new())
    }

    /// Issuer discovery built from [`keys`] with one custom policy and lifespan
    pub fn issuer() -> IssuerDiscovery {
        let mut builder = DiscoveryBuilder::new().with_keys(&keys());
        builder.add_policy("custom");
        builder.add_lifespan("short");
        builder.freeze()
    }

    /// A confidential client with a digest secret
    pub fn confidential(id: &str) -> ClientConfig {
        ClientConfig {
            id: id.to_string(),
            secret: Some("$pbkdf2-sha512$310000$c8p78n7pUMln0jzvd4aK4Q$JNRBzwAo0ek5qKn50cFzzvE9RXV88h1wJn5KGiHrD0YKtZaR/nCb2CJPOsKaPK0hjf.9yHxzQGZziziccp6Yng".to_string()),
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            ..Default::default()
        }
    }

    /// A public client using `none`
    pub fn public(id: &str) -> ClientConfig {
        ClientConfig {
            id: id.to_string(),
            public: true,
            token_endpoint_auth_method: "none".to_string(),
            redirect_uris: vec!["https://spa.example.com/callback".to_string()],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{confidential, issuer, keys, public};
    use super::*;

    fn run(configs: &[ClientConfig]) -> (ClientSet, Validator) {
        let mut v = Validator::new();
        let set = validate_clients(configs, &issuer(), &keys(), &mut v);
        (set, v)
    }

    #[test]
    fn public_client_with_none_validates_cleanly() {
        // GIVEN: public client, auth method none, code flow
        let mut config = public("spa");
        config.response_types = vec!["code".to_string()];

        // WHEN: validating
        let (set, v) = run(&[config]);

        // THEN: no errors
        assert!(!v.has_errors(), "{:?}", v.errors());
        assert_eq!(set.clients[0].description, "spa");
    }

    #[test]
    fn defaults_applied_to_minimal_confidential_client() {
        let (set, v) = run(&[confidential("app")]);
        assert!(!v.has_errors(), "{:?}", v.errors());

        let client = &set.clients[0];
        assert_eq!(client.authorization_policy, "two_factor");
        assert_eq!(client.scopes, vec!["openid"]);
        assert_eq!(client.response_types, vec!["code"]);
        assert_eq!(client.response_modes, vec!["query"]);
        assert_eq!(client.grant_types, vec!["authorization_code"]);
        assert_eq!(client.consent, ConsentMode::Explicit);
        assert!(client.token_endpoint_auth.requires_secret());
        assert_eq!(client.signing.id_token.algorithm, "RS256");
        assert_eq!(client.signing.id_token.key_id, "rsa");
    }

    #[test]
    fn missing_secret_is_fatal() {
        let mut config = confidential("app");
        config.secret = None;
        let (_, v) = run(&[config]);
        assert_eq!(
            v.errors(),
            &[ConfigIssue::ClientMissingSecret {
                client: "app".to_string()
            }]
        );
        assert_eq!(v.errors()[0].to_string(), "client 'app': option 'secret' is required");
    }

    #[test]
    fn blank_and_duplicate_ids_reported_once() {
        // GIVEN: two blank IDs and a case-insensitive duplicate
        let configs = vec![
            confidential(""),
            confidential("App"),
            confidential("app"),
            confidential("APP"),
            confidential(" "),
        ];

        // WHEN: validating
        let (_, v) = run(&configs);

        // THEN: one report each
        assert!(v.errors().contains(&ConfigIssue::ClientsBlankId {
            positions: "#1 or #5".to_string()
        }));
        assert!(v.errors().contains(&ConfigIssue::ClientsDuplicateId {
            ids: "'app'".to_string()
        }));
    }

    #[test]
    fn deprecation_rollup_emitted_once() {
        let mut a = confidential("a");
        a.scopes = vec!["openid".to_string(), "openid".to_string()];
        let mut b = confidential("b");
        b.response_modes = vec!["query".to_string(), "query".to_string()];

        let (_, v) = run(&[a, b]);
        let rollups = v
            .warnings()
            .iter()
            .filter(|w| **w == ConfigIssue::ClientsDeprecated)
            .count();
        assert_eq!(rollups, 1);
    }

    #[test]
    fn no_rollup_without_deprecations() {
        let (_, v) = run(&[confidential("a")]);
        assert!(!v.warnings().contains(&ConfigIssue::ClientsDeprecated));
    }

    #[test]
    fn bearer_scope_sets_discovery_flag() {
        let mut config = confidential("api");
        config.scopes = vec!["openid".to_string(), "bearer.authz".to_string()];
        let (set, _) = run(&[confidential("plain"), config]);
        assert!(set.discovery.bearer_authorization);
    }
}
