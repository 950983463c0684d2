//! Issuer Key Registry and the per-key checks shared with client keys.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use oidc_consts::{
    ASYMMETRIC_SIGNING_ALGS, KEY_USE_SIGNATURE, SIGNING_ALG_RS256, is_one_of,
};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::{
    KeyMaterial, PublicComponent, RSA_MINIMUM_BITS, chain::CertificateChain, modulus_bits,
};
use crate::config::{JwkConfig, OidcConfig};
use crate::validator::{ConfigIssue, KeyLocation, Validator, join_quoted, join_quoted_or};

/// Maximum key ID length.
pub const KEY_ID_MAX_LENGTH: usize = 100;

fn key_id_pattern() -> &'static Regex {
    static KEY_ID_RE: OnceLock<Regex> = OnceLock::new();
    KEY_ID_RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9]{1,100}$").expect("static key id pattern"))
}

/// Whose key is being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// Provider signing key: must be private, key ID may be derived
    Issuer,
    /// Client public key: must be public, key ID is mandatory
    Client,
}

impl KeyRole {
    fn visibility(self) -> &'static str {
        match self {
            Self::Issuer => "private",
            Self::Client => "public",
        }
    }
}

/// A key that passed the structural checks (it may still carry errors such
/// as an unsupported algorithm; those are reported, not fatal to the key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningKey {
    /// Key ID (configured or thumbprint)
    pub key_id: String,
    /// Signing algorithm
    pub algorithm: String,
    /// Key use
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key material
    #[serde(skip)]
    pub material: KeyMaterial,
    /// Certificate chain, leaf first
    #[serde(skip)]
    pub chain: CertificateChain,
}

/// Check one JWK, recording its key ID in `key_ids`.
///
/// Returns `None` when the key cannot be trusted at all (no usable public
/// component, no derivable key ID, or no inferable properties).
pub fn check_key(
    location: KeyLocation,
    jwk: &JwkConfig,
    role: KeyRole,
    key_ids: &mut Vec<String>,
    validator: &mut Validator,
) -> Option<SigningKey> {
    let Some(material) = jwk.key.as_ref() else {
        validator.push(ConfigIssue::KeyMalformed {
            location,
            reason: "no key material is configured".to_string(),
        });
        return None;
    };

    let public = match material.public_component() {
        Ok(public) => public,
        Err(reason) => {
            validator.push(ConfigIssue::KeyMalformed { location, reason });
            return None;
        }
    };

    let mut key_id = jwk.key_id.clone();
    if key_id.is_empty() {
        match role {
            KeyRole::Issuer => match material.thumbprint() {
                Ok(thumbprint) => key_id = thumbprint,
                Err(reason) => {
                    validator.push(ConfigIssue::KeyThumbprint { location, reason });
                    return None;
                }
            },
            KeyRole::Client => validator.push(ConfigIssue::KeyIdMissing {
                location: location.clone(),
            }),
        }
    } else if key_id.len() > KEY_ID_MAX_LENGTH {
        validator.push(ConfigIssue::KeyIdTooLong {
            location: location.clone(),
            key_id: key_id.clone(),
        });
    }

    if !key_id.is_empty() {
        if key_ids.contains(&key_id) {
            validator.push(ConfigIssue::KeyIdNotUnique {
                location: location.clone(),
                key_id: key_id.clone(),
            });
        } else {
            key_ids.push(key_id.clone());
        }

        if !key_id_pattern().is_match(&key_id) {
            validator.push(ConfigIssue::KeyIdInvalid {
                location: location.clone(),
                key_id: key_id.clone(),
            });
        }
    }

    let properties = match material.properties() {
        Ok(properties) => properties,
        Err(reason) => {
            validator.push(ConfigIssue::KeyProperties {
                location,
                key_id,
                reason,
            });
            return None;
        }
    };

    let key_use = if jwk.key_use.is_empty() {
        properties.key_use.to_string()
    } else {
        jwk.key_use.clone()
    };
    if key_use != KEY_USE_SIGNATURE {
        validator.push(ConfigIssue::KeyInvalidOption {
            location: location.clone(),
            key_id: key_id.clone(),
            attr: "use",
            valid: join_quoted_or(&[KEY_USE_SIGNATURE]),
            got: key_use.clone(),
        });
    }

    let algorithm = if jwk.algorithm.is_empty() {
        properties.algorithm.to_string()
    } else {
        jwk.algorithm.clone()
    };
    if !is_one_of(&algorithm, ASYMMETRIC_SIGNING_ALGS) {
        validator.push(ConfigIssue::KeyInvalidOption {
            location: location.clone(),
            key_id: key_id.clone(),
            attr: "algorithm",
            valid: join_quoted_or(ASYMMETRIC_SIGNING_ALGS),
            got: algorithm.clone(),
        });
    }

    let visibility_ok = match role {
        KeyRole::Issuer => material.is_private(),
        KeyRole::Client => !material.is_private(),
    };
    let mut rsa_too_small = false;
    match &public {
        PublicComponent::Rsa { .. } | PublicComponent::Ec { .. } if !visibility_ok => {
            validator.push(ConfigIssue::KeyNotAsymmetric {
                location: location.clone(),
                key_id: key_id.clone(),
                visibility: role.visibility(),
                kind: material.to_string(),
            });
        }
        PublicComponent::Rsa { modulus, .. } => {
            let bits = modulus_bits(modulus);
            if bits < RSA_MINIMUM_BITS {
                rsa_too_small = true;
                validator.push(ConfigIssue::KeyRsaTooSmall {
                    location: location.clone(),
                    key_id: key_id.clone(),
                    bits,
                });
            }
        }
        PublicComponent::Ec { .. } => {}
        PublicComponent::Other => {
            validator.push(ConfigIssue::KeyNotAsymmetric {
                location: location.clone(),
                key_id: key_id.clone(),
                visibility: role.visibility(),
                kind: material.to_string(),
            });
        }
    }

    let chain = check_chain(
        &location,
        &key_id,
        &jwk.certificate_chain,
        (!rsa_too_small).then_some(&public),
        validator,
    );

    Some(SigningKey {
        key_id,
        algorithm,
        key_use,
        material: material.clone(),
        chain,
    })
}

/// Parse and check a certificate chain. The leaf is compared with `public`
/// when given; the chain itself is validated regardless.
fn check_chain(
    location: &KeyLocation,
    key_id: &str,
    entries: &[String],
    public: Option<&PublicComponent>,
    validator: &mut Validator,
) -> CertificateChain {
    if entries.is_empty() {
        return CertificateChain::default();
    }

    let invalid = |reason: String| ConfigIssue::KeyCertificateChainInvalid {
        location: location.clone(),
        key_id: key_id.to_string(),
        reason,
    };

    let chain = match CertificateChain::parse(entries) {
        Ok(chain) => chain,
        Err(reason) => {
            validator.push(invalid(reason));
            return CertificateChain::default();
        }
    };

    if let Some(public) = public.filter(|p| !matches!(p, PublicComponent::Other)) {
        match chain.leaf_matches(public) {
            Ok(true) => {}
            Ok(false) => validator.push(ConfigIssue::KeyCertificateMismatch {
                location: location.clone(),
                key_id: key_id.to_string(),
            }),
            Err(reason) => validator.push(invalid(reason)),
        }
    }

    if let Err(reason) = chain.validate() {
        validator.push(invalid(reason));
    }

    chain
}

/// Normalized issuer signing keys plus the discovery sets derived from them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRegistry {
    keys: Vec<SigningKey>,
    algorithms: Vec<String>,
    key_ids: Vec<String>,
    default_key_ids: BTreeMap<String, String>,
}

impl KeyRegistry {
    /// Resolve the issuer keys of `config` in declaration order. The legacy
    /// `issuer_private_key` comes first as an RS256 signing key.
    pub fn resolve(config: &OidcConfig, validator: &mut Validator) -> Self {
        let mut jwks = Vec::with_capacity(config.jwks.len() + 1);
        if let Some(key) = &config.issuer_private_key {
            jwks.push(JwkConfig {
                key_id: String::new(),
                algorithm: SIGNING_ALG_RS256.to_string(),
                key_use: KEY_USE_SIGNATURE.to_string(),
                key: Some(key.clone()),
                certificate_chain: config.issuer_certificate_chain.clone(),
            });
        }
        jwks.extend(config.jwks.iter().cloned());

        Self::resolve_keys(&jwks, validator)
    }

    /// Resolve an explicit key list.
    pub fn resolve_keys(jwks: &[JwkConfig], validator: &mut Validator) -> Self {
        let mut registry = Self::default();

        if jwks.is_empty() {
            validator.push(ConfigIssue::NoIssuerKeys);
            return registry;
        }

        for (i, jwk) in jwks.iter().enumerate() {
            let location = KeyLocation::Issuer { index: i + 1 };
            let Some(key) =
                check_key(location, jwk, KeyRole::Issuer, &mut registry.key_ids, validator)
            else {
                continue;
            };

            if is_one_of(&key.algorithm, ASYMMETRIC_SIGNING_ALGS) {
                if !registry.algorithms.contains(&key.algorithm) {
                    registry.algorithms.push(key.algorithm.clone());
                }
                registry
                    .default_key_ids
                    .entry(key.algorithm.clone())
                    .or_insert_with(|| key.key_id.clone());
            }

            debug!(key_id = %key.key_id, algorithm = %key.algorithm, "Resolved issuer key");
            registry.keys.push(key);
        }

        if !registry.algorithms.is_empty()
            && !registry.algorithms.iter().any(|a| a == SIGNING_ALG_RS256)
        {
            validator.push(ConfigIssue::NoBaselineAlgorithm {
                required: SIGNING_ALG_RS256,
                found: join_quoted(&registry.algorithms),
            });
        }

        registry
    }

    /// Keys in resolution order
    #[must_use]
    pub fn keys(&self) -> &[SigningKey] {
        &self.keys
    }

    /// Accepted algorithms, first-seen order
    #[must_use]
    pub fn algorithms(&self) -> &[String] {
        &self.algorithms
    }

    /// Key IDs, first-seen order, without duplicates
    #[must_use]
    pub fn key_ids(&self) -> &[String] {
        &self.key_ids
    }

    /// Algorithm to first key ID offering it
    #[must_use]
    pub fn default_key_ids(&self) -> &BTreeMap<String, String> {
        &self.default_key_ids
    }

    /// First key offering `algorithm`
    #[must_use]
    pub fn find_by_algorithm(&self, algorithm: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.algorithm == algorithm)
    }

    /// Key with `key_id`
    #[must_use]
    pub fn find_by_key_id(&self, key_id: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.key_id == key_id)
    }
}
