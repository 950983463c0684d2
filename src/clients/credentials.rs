//! Client credentials: secrets, public key material and token endpoint
//! authentication.

use std::fmt;

use oidc_consts::{
    ASYMMETRIC_SIGNING_ALGS, AUTH_METHOD_CLIENT_SECRET_BASIC, AUTH_METHOD_CLIENT_SECRET_JWT,
    AUTH_METHOD_CLIENT_SECRET_POST, AUTH_METHOD_NONE, AUTH_METHOD_PRIVATE_KEY_JWT,
    CONFIDENTIAL_AUTH_METHODS, HMAC_SIGNING_ALGS, RESPONSE_TYPES_IMPLICIT, SIGNING_ALG_HS256,
    VALID_AUTH_METHODS, is_one_of,
};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::keys::{KeyRole, SigningKey, check_key};
use crate::validator::{ConfigIssue, KeyLocation, Validator, join_quoted, join_quoted_or};

const PLAINTEXT_PREFIX: &str = "$plaintext$";

/// A configured client secret. Digests look like `$pbkdf2-sha512$...`;
/// `$plaintext$...` and anything not starting with `$` is plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Wrap a configured value
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    /// Whether the secret is stored in plaintext
    #[must_use]
    pub fn is_plaintext(&self) -> bool {
        self.0.starts_with(PLAINTEXT_PREFIX) || !self.0.starts_with('$')
    }

    /// Digest scheme (`pbkdf2-sha512`, ...) or `plaintext`
    #[must_use]
    pub fn scheme(&self) -> &str {
        if self.is_plaintext() {
            return "plaintext";
        }
        self.0[1..].split('$').next().unwrap_or_default()
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientSecret({}, [REDACTED])", self.scheme())
    }
}

/// Client public key material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicKeys {
    /// Nothing configured
    #[default]
    None,
    /// Remote JWKS document
    Uri(String),
    /// Inline keys
    Values(Vec<SigningKey>),
}

impl PublicKeys {
    /// Whether any key material is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Result of the public key step
#[derive(Debug, Clone, Default)]
pub struct ValidatedPublicKeys {
    /// Key material
    pub keys: PublicKeys,
    /// Algorithms offered by inline keys, first-seen order
    pub algorithms: Vec<String>,
}

/// Check `public_keys`: URI and values are exclusive, a URI must be HTTPS,
/// inline keys go through the same checks as issuer keys.
pub fn validate_public_keys(config: &ClientConfig, validator: &mut Validator) -> ValidatedPublicKeys {
    let client = config.id.as_str();
    let mut result = ValidatedPublicKeys::default();

    match (&config.public_keys.uri, config.public_keys.values.is_empty()) {
        (Some(_), false) => {
            validator.push(ConfigIssue::ClientPublicKeysBothConfigured {
                client: client.to_string(),
            });
        }
        (Some(uri), true) => {
            match Url::parse(uri) {
                Ok(parsed) if parsed.scheme() == "https" => {}
                Ok(parsed) => validator.push(ConfigIssue::ClientPublicKeysUriScheme {
                    client: client.to_string(),
                    scheme: parsed.scheme().to_string(),
                }),
                Err(e) => validator.push(ConfigIssue::ClientPublicKeysUriInvalid {
                    client: client.to_string(),
                    uri: uri.clone(),
                    reason: e.to_string(),
                }),
            }
            result.keys = PublicKeys::Uri(uri.clone());
        }
        (None, false) => {
            let mut key_ids = Vec::new();
            let mut keys = Vec::new();

            for (i, jwk) in config.public_keys.values.iter().enumerate() {
                let location = KeyLocation::Client {
                    client: client.to_string(),
                    index: i + 1,
                };
                let Some(key) = check_key(location, jwk, KeyRole::Client, &mut key_ids, validator)
                else {
                    continue;
                };

                if !key.algorithm.is_empty() && !result.algorithms.contains(&key.algorithm) {
                    result.algorithms.push(key.algorithm.clone());
                }
                keys.push(key);
            }

            let request_object_alg = config.request_object_signing_alg.as_str();
            if !request_object_alg.is_empty()
                && !result.algorithms.iter().any(|a| a == request_object_alg)
            {
                validator.push(ConfigIssue::ClientPublicKeysRequestObjectAlg {
                    client: client.to_string(),
                    valid: join_quoted_or(&result.algorithms),
                });
            }

            debug!(client, keys = keys.len(), "Resolved client public keys");
            result.keys = PublicKeys::Values(keys);
        }
        (None, true) => {}
    }

    result
}

/// What the token endpoint expects from the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    /// No client authentication
    #[default]
    None,
    /// A shared secret (basic, post or HMAC-signed JWT)
    Secret,
    /// A JWT signed with one of the client's private keys
    PrivateKeyJwt,
}

/// Normalized token endpoint authentication
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenEndpointAuth {
    /// Configured method (empty means the provider picks per client type)
    pub method: String,
    /// JWT assertion signing algorithm
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signing_alg: String,
    /// Credential the method relies on
    pub credential: Credential,
}

impl TokenEndpointAuth {
    /// Whether a secret must be configured
    #[must_use]
    pub fn requires_secret(&self) -> bool {
        self.credential == Credential::Secret
    }
}

/// Check the token endpoint authentication method and the secret or keys
/// it depends on.
pub fn validate_token_endpoint_auth(
    config: &ClientConfig,
    response_types: &[String],
    public_keys: &ValidatedPublicKeys,
    validator: &mut Validator,
) -> TokenEndpointAuth {
    let client = config.id.as_str();
    let method = config.token_endpoint_auth_method.as_str();
    let mut auth = TokenEndpointAuth {
        method: method.to_string(),
        signing_alg: config.token_endpoint_auth_signing_alg.clone(),
        credential: Credential::None,
    };

    let implicit_only = !response_types.is_empty()
        && response_types
            .iter()
            .all(|rt| RESPONSE_TYPES_IMPLICIT.contains(&rt.as_str()));

    if !method.is_empty() {
        if !is_one_of(method, VALID_AUTH_METHODS) {
            validator.push(ConfigIssue::ClientInvalidValue {
                client: client.to_string(),
                attr: "token_endpoint_auth_method",
                valid: join_quoted_or(VALID_AUTH_METHODS),
                got: method.to_string(),
            });
            return auth;
        }

        if method == AUTH_METHOD_NONE && !config.public && !implicit_only {
            validator.push(ConfigIssue::ClientAuthMethodNoneConfidential {
                client: client.to_string(),
                valid: join_quoted_or(CONFIDENTIAL_AUTH_METHODS),
                implicit: join_quoted(RESPONSE_TYPES_IMPLICIT),
                got: method.to_string(),
            });
        } else if method != AUTH_METHOD_NONE && config.public {
            validator.push(ConfigIssue::ClientAuthMethodPublic {
                client: client.to_string(),
                got: method.to_string(),
            });
        }
    }

    auth.credential = match method {
        AUTH_METHOD_CLIENT_SECRET_JWT => {
            if auth.signing_alg.is_empty() {
                auth.signing_alg = SIGNING_ALG_HS256.to_string();
            } else if !is_one_of(&auth.signing_alg, HMAC_SIGNING_ALGS) {
                validator.push(ConfigIssue::ClientAuthSigningAlgInvalid {
                    client: client.to_string(),
                    valid: join_quoted_or(HMAC_SIGNING_ALGS),
                    method: method.to_string(),
                });
            }
            Credential::Secret
        }
        "" if !config.public => Credential::Secret,
        AUTH_METHOD_CLIENT_SECRET_BASIC | AUTH_METHOD_CLIENT_SECRET_POST => Credential::Secret,
        AUTH_METHOD_PRIVATE_KEY_JWT => {
            check_private_key_jwt(config, public_keys, validator);
            Credential::PrivateKeyJwt
        }
        _ => Credential::None,
    };

    check_secret(config, &auth, validator);

    auth
}

fn check_private_key_jwt(
    config: &ClientConfig,
    public_keys: &ValidatedPublicKeys,
    validator: &mut Validator,
) {
    let client = config.id.as_str();
    let alg = config.token_endpoint_auth_signing_alg.as_str();

    if alg.is_empty() {
        validator.push(ConfigIssue::ClientAuthSigningAlgMissing {
            client: client.to_string(),
        });
    } else if !is_one_of(alg, ASYMMETRIC_SIGNING_ALGS) {
        validator.push(ConfigIssue::ClientAuthSigningAlgInvalid {
            client: client.to_string(),
            valid: join_quoted_or(ASYMMETRIC_SIGNING_ALGS),
            method: AUTH_METHOD_PRIVATE_KEY_JWT.to_string(),
        });
    }

    if config.public_keys.uri.is_none() {
        if config.public_keys.values.is_empty() {
            validator.push(ConfigIssue::ClientPrivateKeyJwtMissingKeys {
                client: client.to_string(),
            });
        } else if !public_keys.algorithms.is_empty()
            && !public_keys.algorithms.iter().any(|a| a == alg)
        {
            validator.push(ConfigIssue::ClientAuthSigningAlgNotRegistered {
                client: client.to_string(),
                valid: join_quoted_or(&public_keys.algorithms),
                method: AUTH_METHOD_PRIVATE_KEY_JWT.to_string(),
            });
        }
    }
}

fn check_secret(config: &ClientConfig, auth: &TokenEndpointAuth, validator: &mut Validator) {
    let client = config.id.as_str();
    let secret = config.secret.as_deref().map(ClientSecret::new);

    if auth.requires_secret() {
        if config.public {
            return;
        }

        let Some(secret) = secret else {
            validator.push(ConfigIssue::ClientMissingSecret {
                client: client.to_string(),
            });
            return;
        };

        let jwt = auth.method == AUTH_METHOD_CLIENT_SECRET_JWT;
        if secret.is_plaintext() && !jwt {
            validator.push_warning(ConfigIssue::ClientPlaintextSecret {
                client: client.to_string(),
            });
        } else if !secret.is_plaintext() && jwt {
            validator.push(ConfigIssue::ClientSecretNotPlaintext {
                client: client.to_string(),
            });
        }
    } else if secret.is_some() {
        if config.public {
            validator.push(ConfigIssue::ClientPublicWithSecret {
                client: client.to_string(),
            });
        } else {
            validator.push(ConfigIssue::ClientSecretUnused {
                client: client.to_string(),
                method: auth.method.clone(),
            });
        }
    }
}
