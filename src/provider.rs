//! Provider-level validation and the orchestrating validation pass.
//!
//! ```text
//! OidcConfig
//!   ├─ lifespans, PKCE, entropy, CORS        (this module)
//!   ├─ KeyRegistry::resolve                  (keys)
//!   ├─ PolicyTable::build                    (policy)
//!   ├─ DiscoveryBuilder::freeze              (discovery)
//!   ├─ validate_clients                      (clients)
//!   └─ IssuerDiscovery::finish ──► PolicyModel
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use oidc_consts::VALID_CORS_ENDPOINTS;
use tracing::{debug, info};
use url::Url;

use crate::clients::validate_clients;
use crate::config::{ClientConfig, CorsConfig, LifespanConfig, LifespansConfig, OidcConfig};
use crate::discovery::DiscoveryBuilder;
use crate::keys::KeyRegistry;
use crate::model::{Cors, Lifespans, PkceEnforcement, PolicyModel, TokenLifespans};
use crate::policy::PolicyTable;
use crate::validator::{ConfigIssue, ValidationReport, Validator, join_quoted_or};
use crate::{Error, Result};

/// Entropy used when the option is unset or not positive.
pub const DEFAULT_MINIMUM_PARAMETER_ENTROPY: u32 = 8;

/// Value of `minimum_parameter_entropy` that disables the check.
pub const ENTROPY_DISABLED: i64 = -1;

/// Run the full validation pass. The model is only meaningful when the
/// report has no errors.
pub fn validate(config: &OidcConfig) -> (PolicyModel, ValidationReport) {
    let mut validator = Validator::new();

    let keys = KeyRegistry::resolve(config, &mut validator);
    let mut builder = DiscoveryBuilder::new().with_keys(&keys);

    let policies = PolicyTable::build(&config.authorization_policies, &mut builder, &mut validator);

    let lifespans = resolve_lifespans(&config.lifespans);
    for name in lifespans.custom.keys() {
        builder.add_lifespan(name);
    }

    let minimum_parameter_entropy =
        resolve_entropy(config.minimum_parameter_entropy, &mut validator);
    let enforce_pkce = resolve_enforce_pkce(&config.enforce_pkce, &mut validator);
    let cors = resolve_cors(&config.cors, &config.clients, &mut validator);

    let issuer = builder.freeze();

    let clients = if config.clients.is_empty() {
        validator.push(ConfigIssue::NoClients);
        Default::default()
    } else {
        validate_clients(&config.clients, &issuer, &keys, &mut validator)
    };

    let discovery = issuer.finish(clients.discovery);

    let model = PolicyModel {
        keys,
        policies,
        clients: clients.clients,
        discovery,
        lifespans,
        cors,
        enforce_pkce,
        minimum_parameter_entropy,
    };

    let report = validator.into_report();
    debug!(
        errors = report.errors().len(),
        warnings = report.warnings().len(),
        "Validation pass finished"
    );

    (model, report)
}

/// Validate `config` and build the model, refusing it on any fatal issue.
///
/// On success the report carries the warnings to surface to operators.
pub fn build_policy_model(config: &OidcConfig) -> Result<(PolicyModel, ValidationReport)> {
    let (model, report) = validate(config);

    if !report.is_valid() {
        return Err(Error::Validation(report));
    }

    info!(
        clients = model.clients.len(),
        keys = model.keys.keys().len(),
        policies = model.policies.len(),
        warnings = report.warnings().len(),
        "Policy model built"
    );

    Ok((model, report))
}

/// Apply the default lifespans to every zero value. Custom lifespans
/// inherit the resolved global values.
pub fn resolve_lifespans(config: &LifespansConfig) -> Lifespans {
    let defaults = TokenLifespans::default();
    let global = TokenLifespans {
        access_token: or_default(config.access_token, defaults.access_token),
        authorize_code: or_default(config.authorize_code, defaults.authorize_code),
        id_token: or_default(config.id_token, defaults.id_token),
        refresh_token: or_default(config.refresh_token, defaults.refresh_token),
    };

    let custom: BTreeMap<String, TokenLifespans> = config
        .custom
        .iter()
        .map(|(name, c)| (name.clone(), custom_lifespans(c, &global)))
        .collect();

    Lifespans { global, custom }
}

fn custom_lifespans(config: &LifespanConfig, global: &TokenLifespans) -> TokenLifespans {
    TokenLifespans {
        access_token: or_default(config.access_token, global.access_token),
        authorize_code: or_default(config.authorize_code, global.authorize_code),
        id_token: or_default(config.id_token, global.id_token),
        refresh_token: or_default(config.refresh_token, global.refresh_token),
    }
}

fn or_default(value: Duration, default: Duration) -> Duration {
    if value.is_zero() { default } else { value }
}

/// `-1` disables the check (warning), anything not positive becomes the
/// default, positive values below the default warn.
pub fn resolve_entropy(configured: i64, validator: &mut Validator) -> Option<u32> {
    let minimum = i64::from(DEFAULT_MINIMUM_PARAMETER_ENTROPY);

    match configured {
        ENTROPY_DISABLED => {
            validator.push_warning(ConfigIssue::EntropyDisabled);
            None
        }
        c if c <= 0 => Some(DEFAULT_MINIMUM_PARAMETER_ENTROPY),
        c => {
            if c < minimum {
                validator.push_warning(ConfigIssue::EntropyUnsafe {
                    minimum,
                    configured: c,
                });
            }
            Some(u32::try_from(c).unwrap_or(u32::MAX))
        }
    }
}

/// Empty means `public_clients_only`.
pub fn resolve_enforce_pkce(configured: &str, validator: &mut Validator) -> PkceEnforcement {
    if configured.is_empty() {
        return PkceEnforcement::default();
    }

    PkceEnforcement::parse(configured).unwrap_or_else(|| {
        validator.push(ConfigIssue::EnforcePkceInvalid {
            got: configured.to_string(),
        });
        PkceEnforcement::default()
    })
}

/// Check CORS options and collect the allowed origins, adding the origin
/// of every http(s), non-localhost client redirect URI when requested.
pub fn resolve_cors(config: &CorsConfig, clients: &[ClientConfig], validator: &mut Validator) -> Cors {
    let mut allowed_origins = Vec::with_capacity(config.allowed_origins.len());

    for origin in &config.allowed_origins {
        if origin == "*" {
            if config.allowed_origins.len() != 1 {
                validator.push(ConfigIssue::CorsWildcardNotAlone);
            }
            if config.allowed_origins_from_client_redirect_uris {
                validator.push(ConfigIssue::CorsWildcardWithClients);
            }
            push_unique(&mut allowed_origins, origin);
            continue;
        }

        match Url::parse(origin) {
            Ok(url) => {
                if has_path(origin, &url) {
                    validator.push(ConfigIssue::CorsInvalidOrigin {
                        origin: origin.clone(),
                        component: "path",
                    });
                }
                if url.query().is_some_and(|q| !q.is_empty()) {
                    validator.push(ConfigIssue::CorsInvalidOrigin {
                        origin: origin.clone(),
                        component: "query string",
                    });
                }
                push_unique(&mut allowed_origins, &url.origin().ascii_serialization());
            }
            Err(e) => validator.push(ConfigIssue::CorsUnparseableOrigin {
                origin: origin.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if config.allowed_origins_from_client_redirect_uris {
        for uri in clients.iter().flat_map(|c| &c.redirect_uris) {
            if let Some(origin) = redirect_origin(uri) {
                push_unique(&mut allowed_origins, &origin);
            }
        }
    }

    for endpoint in &config.endpoints {
        if !VALID_CORS_ENDPOINTS.contains(&endpoint.as_str()) {
            validator.push(ConfigIssue::CorsInvalidEndpoint {
                endpoint: endpoint.clone(),
                valid: join_quoted_or(VALID_CORS_ENDPOINTS),
            });
        }
    }

    Cors {
        endpoints: config.endpoints.clone(),
        allowed_origins,
    }
}

fn redirect_origin(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str() == Some("localhost") {
        return None;
    }
    Some(url.origin().ascii_serialization())
}

/// The parser normalizes an empty path to `/`, so look at the raw value.
fn has_path(raw: &str, url: &Url) -> bool {
    if url.path() != "/" {
        return true;
    }
    let after_scheme = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    after_scheme
        .find(['/', '?', '#'])
        .is_some_and(|i| after_scheme[i..].starts_with('/'))
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_lifespans_get_defaults_and_custom_inherit() {
        // GIVEN: a global access token override and a partial custom lifespan
        let mut config = LifespansConfig {
            access_token: Duration::from_secs(7200),
            ..Default::default()
        };
        config.custom.insert(
            "short".to_string(),
            LifespanConfig {
                id_token: Duration::from_secs(60),
                ..Default::default()
            },
        );

        // WHEN: resolved
        let lifespans = resolve_lifespans(&config);

        // THEN: zeros are filled from the level above
        assert_eq!(lifespans.global.access_token, Duration::from_secs(7200));
        assert_eq!(lifespans.global.refresh_token, Duration::from_secs(5400));
        let short = &lifespans.custom["short"];
        assert_eq!(short.id_token, Duration::from_secs(60));
        assert_eq!(short.access_token, Duration::from_secs(7200));
        assert_eq!(short.authorize_code, Duration::from_secs(60));
    }

    #[test]
    fn entropy_rules() {
        let mut v = Validator::new();
        assert_eq!(resolve_entropy(0, &mut v), Some(8));
        assert_eq!(resolve_entropy(-5, &mut v), Some(8));
        assert_eq!(resolve_entropy(32, &mut v), Some(32));
        assert!(v.warnings().is_empty());

        assert_eq!(resolve_entropy(-1, &mut v), None);
        assert_eq!(resolve_entropy(4, &mut v), Some(4));
        assert_eq!(
            v.warnings(),
            &[
                ConfigIssue::EntropyDisabled,
                ConfigIssue::EntropyUnsafe {
                    minimum: 8,
                    configured: 4
                }
            ]
        );
        assert!(!v.has_errors());
    }

    #[test]
    fn enforce_pkce_default_and_invalid() {
        let mut v = Validator::new();
        assert_eq!(resolve_enforce_pkce("", &mut v), PkceEnforcement::PublicClientsOnly);
        assert_eq!(resolve_enforce_pkce("never", &mut v), PkceEnforcement::Never);
        assert!(!v.has_errors());

        resolve_enforce_pkce("sometimes", &mut v);
        assert!(matches!(v.errors(), [ConfigIssue::EnforcePkceInvalid { .. }]));
    }

    #[test]
    fn wildcard_origin_must_stand_alone() {
        let config = CorsConfig {
            allowed_origins: vec!["*".to_string(), "https://a.example.com".to_string()],
            allowed_origins_from_client_redirect_uris: true,
            ..Default::default()
        };
        let mut v = Validator::new();
        resolve_cors(&config, &[], &mut v);
        assert_eq!(
            v.errors(),
            &[ConfigIssue::CorsWildcardNotAlone, ConfigIssue::CorsWildcardWithClients]
        );
    }

    #[test]
    fn origins_must_not_have_path_or_query() {
        let config = CorsConfig {
            allowed_origins: vec![
                "https://ok.example.com".to_string(),
                "https://ok.example.com:8443".to_string(),
                "https://path.example.com/".to_string(),
                "https://query.example.com?x=1".to_string(),
            ],
            ..Default::default()
        };
        let mut v = Validator::new();
        let cors = resolve_cors(&config, &[], &mut v);

        let components: Vec<&str> = v
            .errors()
            .iter()
            .filter_map(|e| match e {
                ConfigIssue::CorsInvalidOrigin { component, .. } => Some(*component),
                _ => None,
            })
            .collect();
        assert_eq!(components, vec!["path", "query string"]);
        assert_eq!(cors.allowed_origins[0], "https://ok.example.com");
        assert_eq!(cors.allowed_origins[1], "https://ok.example.com:8443");
    }

    #[test]
    fn origins_derived_from_client_redirects() {
        // GIVEN: clients with web, localhost and custom-scheme redirects
        let clients = vec![
            ClientConfig {
                redirect_uris: vec![
                    "https://app.example.com/cb".to_string(),
                    "https://app.example.com/other".to_string(),
                    "http://localhost:8080/cb".to_string(),
                ],
                ..Default::default()
            },
            ClientConfig {
                redirect_uris: vec![
                    "com.example.app:/cb".to_string(),
                    "http://intranet.example.com:8080/cb".to_string(),
                ],
                ..Default::default()
            },
        ];
        let config = CorsConfig {
            allowed_origins: vec!["https://app.example.com".to_string()],
            allowed_origins_from_client_redirect_uris: true,
            ..Default::default()
        };

        // WHEN: resolved
        let mut v = Validator::new();
        let cors = resolve_cors(&config, &clients, &mut v);

        // THEN: deduplicated http(s) origins, localhost excluded
        assert!(!v.has_errors());
        assert_eq!(
            cors.allowed_origins,
            vec!["https://app.example.com", "http://intranet.example.com:8080"]
        );
    }

    #[test]
    fn unknown_cors_endpoint_is_error() {
        let config = CorsConfig {
            endpoints: vec!["token".to_string(), "jwks".to_string()],
            ..Default::default()
        };
        let mut v = Validator::new();
        resolve_cors(&config, &[], &mut v);
        assert!(matches!(
            v.errors(),
            [ConfigIssue::CorsInvalidEndpoint { endpoint, .. }] if endpoint == "jwks"
        ));
    }

    #[test]
    fn empty_config_reports_missing_keys_and_clients() {
        let (_, report) = validate(&OidcConfig::default());
        assert!(report.errors().contains(&ConfigIssue::NoIssuerKeys));
        assert!(report.errors().contains(&ConfigIssue::NoClients));
        assert!(matches!(
            build_policy_model(&OidcConfig::default()),
            Err(Error::Validation(_))
        ));
    }
}
