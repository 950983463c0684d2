//! Response signing selections.
//!
//! Each client has five independent `(algorithm, key_id)` pairs, one per
//! signed response. Either half may be left empty; [`resolve_signing`]
//! fills in the other half from the issuer keys and checks the result
//! against the issuer discovery sets.

use oidc_consts::{SIGNING_ALG_NONE, SIGNING_ALG_RS256};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::discovery::IssuerDiscovery;
use crate::keys::KeyRegistry;
use crate::validator::{ConfigIssue, Validator, join_quoted_or};

/// The five signed responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Authorization response (JARM)
    Authorization,
    /// ID token
    IdToken,
    /// Access token
    AccessToken,
    /// Userinfo response
    Userinfo,
    /// Introspection response
    Introspection,
}

impl ResponseKind {
    /// Resolution order
    pub const ALL: [Self; 5] = [
        Self::Authorization,
        Self::IdToken,
        Self::AccessToken,
        Self::Userinfo,
        Self::Introspection,
    ];

    /// Algorithm used when neither half is configured
    #[must_use]
    pub fn default_algorithm(self) -> &'static str {
        match self {
            Self::Authorization | Self::IdToken => SIGNING_ALG_RS256,
            Self::AccessToken | Self::Userinfo | Self::Introspection => SIGNING_ALG_NONE,
        }
    }

    /// Algorithms accepted without consulting the discovery set
    #[must_use]
    pub fn implicitly_valid(self) -> &'static [&'static str] {
        match self {
            Self::IdToken => &["", SIGNING_ALG_RS256],
            _ => &["", SIGNING_ALG_NONE, SIGNING_ALG_RS256],
        }
    }

    /// Configuration attribute for the algorithm
    #[must_use]
    pub fn algorithm_attr(self) -> &'static str {
        match self {
            Self::Authorization => "authorization_signed_response_alg",
            Self::IdToken => "id_token_signed_response_alg",
            Self::AccessToken => "access_token_signed_response_alg",
            Self::Userinfo => "userinfo_signed_response_alg",
            Self::Introspection => "introspection_signed_response_alg",
        }
    }

    /// Configuration attribute for the key ID
    #[must_use]
    pub fn key_id_attr(self) -> &'static str {
        match self {
            Self::Authorization => "authorization_signed_response_key_id",
            Self::IdToken => "id_token_signed_response_key_id",
            Self::AccessToken => "access_token_signed_response_key_id",
            Self::Userinfo => "userinfo_signed_response_key_id",
            Self::Introspection => "introspection_signed_response_key_id",
        }
    }

    /// Whether a signed selection means JWT-formatted access tokens
    #[must_use]
    pub fn marks_jwt(self) -> bool {
        matches!(self, Self::AccessToken | Self::Introspection)
    }

    /// Userinfo and introspection list `none` among the valid values when
    /// reporting an unknown algorithm.
    fn lists_none(self) -> bool {
        matches!(self, Self::Userinfo | Self::Introspection)
    }

    fn configured(self, config: &ClientConfig) -> (&str, &str) {
        match self {
            Self::Authorization => (
                &config.authorization_signed_response_alg,
                &config.authorization_signed_response_key_id,
            ),
            Self::IdToken => (
                &config.id_token_signed_response_alg,
                &config.id_token_signed_response_key_id,
            ),
            Self::AccessToken => (
                &config.access_token_signed_response_alg,
                &config.access_token_signed_response_key_id,
            ),
            Self::Userinfo => (
                &config.userinfo_signed_response_alg,
                &config.userinfo_signed_response_key_id,
            ),
            Self::Introspection => (
                &config.introspection_signed_response_alg,
                &config.introspection_signed_response_key_id,
            ),
        }
    }
}

/// A resolved `(algorithm, key_id)` pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SigningSelection {
    /// Signing algorithm (`none` for unsigned)
    pub algorithm: String,
    /// Issuer key ID (empty when unsigned or unmatched)
    pub key_id: String,
}

impl SigningSelection {
    /// Whether the response is signed with an issuer key
    #[must_use]
    pub fn is_signed(&self) -> bool {
        !self.algorithm.is_empty() && self.algorithm != SIGNING_ALG_NONE
    }
}

/// Signing selections of one client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseSigning {
    /// Authorization response (JARM)
    pub authorization: SigningSelection,
    /// ID token
    pub id_token: SigningSelection,
    /// Access token
    pub access_token: SigningSelection,
    /// Userinfo
    pub userinfo: SigningSelection,
    /// Introspection
    pub introspection: SigningSelection,
}

impl ResponseSigning {
    /// Selection for `kind`
    #[must_use]
    pub fn get(&self, kind: ResponseKind) -> &SigningSelection {
        match kind {
            ResponseKind::Authorization => &self.authorization,
            ResponseKind::IdToken => &self.id_token,
            ResponseKind::AccessToken => &self.access_token,
            ResponseKind::Userinfo => &self.userinfo,
            ResponseKind::Introspection => &self.introspection,
        }
    }

    fn set(&mut self, kind: ResponseKind, selection: SigningSelection) {
        match kind {
            ResponseKind::Authorization => self.authorization = selection,
            ResponseKind::IdToken => self.id_token = selection,
            ResponseKind::AccessToken => self.access_token = selection,
            ResponseKind::Userinfo => self.userinfo = selection,
            ResponseKind::Introspection => self.introspection = selection,
        }
    }
}

/// Outcome of one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved pair
    pub selection: SigningSelection,
    /// Problem found, if any
    pub issue: Option<ConfigIssue>,
    /// The pair resolved to an issuer key or a discovered, non-default
    /// algorithm
    pub signed: bool,
}

/// Resolve a partially specified pair. Pure: the same inputs always give
/// the same output and nothing is recorded.
#[must_use]
pub fn resolve_signing(
    client: &str,
    kind: ResponseKind,
    algorithm: &str,
    key_id: &str,
    keys: &KeyRegistry,
    issuer: &IssuerDiscovery,
) -> Resolution {
    let mut alg = algorithm.to_string();
    let mut kid = key_id.to_string();

    if alg.is_empty() && kid.is_empty() {
        alg = kind.default_algorithm().to_string();
    }

    match (alg.is_empty(), kid.is_empty()) {
        (false, true) => {
            if let Some(key) = keys.find_by_algorithm(&alg) {
                kid = key.key_id.clone();
            }
        }
        (true, false) => {
            if let Some(key) = keys.find_by_key_id(&kid) {
                alg = key.algorithm.clone();
            }
        }
        _ => {}
    }

    let mut issue = None;
    let mut signed = false;

    if !kid.is_empty() {
        if issuer.has_key_id(&kid) {
            if let Some(key) = keys.find_by_key_id(&kid) {
                alg = key.algorithm.clone();
            }
            signed = true;
        } else {
            issue = Some(ConfigIssue::ClientInvalidValue {
                client: client.to_string(),
                attr: kind.key_id_attr(),
                valid: join_quoted_or(issuer.key_ids()),
                got: kid.clone(),
            });
        }
    } else if !kind.implicitly_valid().contains(&alg.as_str()) {
        if issuer.has_algorithm(&alg) {
            signed = true;
        } else {
            let mut valid: Vec<&str> = issuer.algorithms().iter().map(String::as_str).collect();
            if kind.lists_none() {
                valid.push(SIGNING_ALG_NONE);
            }
            issue = Some(ConfigIssue::ClientInvalidValue {
                client: client.to_string(),
                attr: kind.algorithm_attr(),
                valid: join_quoted_or(&valid),
                got: alg.clone(),
            });
        }
    }

    Resolution {
        selection: SigningSelection {
            algorithm: alg,
            key_id: kid,
        },
        issue,
        signed,
    }
}

/// Resolve all five selections of `config`. The flag is set when the access
/// token or introspection selection implies JWT-formatted access tokens.
pub fn validate(
    config: &ClientConfig,
    keys: &KeyRegistry,
    issuer: &IssuerDiscovery,
    validator: &mut Validator,
) -> (ResponseSigning, bool) {
    let mut signing = ResponseSigning::default();
    let mut jwt_access_tokens = false;

    for kind in ResponseKind::ALL {
        let (algorithm, key_id) = kind.configured(config);
        let resolution = resolve_signing(&config.id, kind, algorithm, key_id, keys, issuer);

        if let Some(issue) = resolution.issue {
            validator.push(issue);
        }
        if resolution.signed && kind.marks_jwt() {
            jwt_access_tokens = true;
        }
        signing.set(kind, resolution.selection);
    }

    (signing, jwt_access_tokens)
}
