//! Scalar client options: authorization policy, lifespan, PKCE challenge
//! method, requested audience mode and consent.

use std::time::Duration;

use oidc_consts::{
    AUDIENCE_MODE_EXPLICIT, CONSENT_MODE_AUTO, CONSENT_MODE_EXPLICIT, CONSENT_MODE_IMPLICIT,
    CONSENT_MODE_PRE_CONFIGURED, POLICY_TWO_FACTOR, VALID_AUDIENCE_MODES, VALID_CONSENT_MODES,
    VALID_PKCE_METHODS, is_one_of,
};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::discovery::IssuerDiscovery;
use crate::validator::{ConfigIssue, Validator, join_quoted_or};

/// How long pre-configured consent is remembered when no duration is set.
pub const DEFAULT_PRE_CONFIGURED_CONSENT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Consent behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ConsentMode {
    /// Ask every time
    Explicit,
    /// Never ask
    Implicit,
    /// Remember consent for a duration
    PreConfigured {
        /// Remember duration
        #[serde(with = "crate::config::humantime_serde")]
        duration: Duration,
    },
}

impl ConsentMode {
    /// Configuration spelling
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => CONSENT_MODE_EXPLICIT,
            Self::Implicit => CONSENT_MODE_IMPLICIT,
            Self::PreConfigured { .. } => CONSENT_MODE_PRE_CONFIGURED,
        }
    }
}

/// Normalized scalar options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Authorization policy name
    pub authorization_policy: String,
    /// Custom lifespan name
    pub lifespan: String,
    /// PKCE challenge method
    pub pkce_challenge_method: String,
    /// Requested audience mode
    pub requested_audience_mode: String,
    /// Consent mode
    pub consent: ConsentMode,
}

/// Validate and default the scalar options of `config`.
pub fn validate(
    config: &ClientConfig,
    issuer: &IssuerDiscovery,
    validator: &mut Validator,
) -> ClientOptions {
    let client = config.id.as_str();

    let authorization_policy = if config.authorization_policy.is_empty() {
        POLICY_TWO_FACTOR.to_string()
    } else {
        if !issuer.has_policy(&config.authorization_policy) {
            validator.push(ConfigIssue::ClientInvalidValue {
                client: client.to_string(),
                attr: "authorization_policy",
                valid: join_quoted_or(issuer.policies()),
                got: config.authorization_policy.clone(),
            });
        }
        config.authorization_policy.clone()
    };

    if !config.lifespan.is_empty() && !issuer.has_lifespan(&config.lifespan) {
        if issuer.lifespans().is_empty() {
            validator.push(ConfigIssue::ClientInvalidLifespan {
                client: client.to_string(),
                lifespan: config.lifespan.clone(),
            });
        } else {
            validator.push(ConfigIssue::ClientInvalidValue {
                client: client.to_string(),
                attr: "lifespan",
                valid: join_quoted_or(issuer.lifespans()),
                got: config.lifespan.clone(),
            });
        }
    }

    if !config.pkce_challenge_method.is_empty()
        && !is_one_of(&config.pkce_challenge_method, VALID_PKCE_METHODS)
    {
        validator.push(ConfigIssue::ClientInvalidValue {
            client: client.to_string(),
            attr: "pkce_challenge_method",
            valid: join_quoted_or(VALID_PKCE_METHODS),
            got: config.pkce_challenge_method.clone(),
        });
    }

    let requested_audience_mode = if config.requested_audience_mode.is_empty() {
        AUDIENCE_MODE_EXPLICIT.to_string()
    } else {
        if !is_one_of(&config.requested_audience_mode, VALID_AUDIENCE_MODES) {
            validator.push(ConfigIssue::ClientInvalidValue {
                client: client.to_string(),
                attr: "requested_audience_mode",
                valid: join_quoted_or(VALID_AUDIENCE_MODES),
                got: config.requested_audience_mode.clone(),
            });
        }
        config.requested_audience_mode.clone()
    };

    ClientOptions {
        authorization_policy,
        lifespan: config.lifespan.clone(),
        pkce_challenge_method: config.pkce_challenge_method.clone(),
        requested_audience_mode,
        consent: consent_mode(config, validator),
    }
}

/// Resolve the consent mode. Empty or `auto` infers pre-configured consent
/// from a configured duration, explicit otherwise.
pub fn consent_mode(config: &ClientConfig, validator: &mut Validator) -> ConsentMode {
    let duration = config.pre_configured_consent_duration;

    match config.consent_mode.as_str() {
        "" | CONSENT_MODE_AUTO => match duration {
            Some(duration) => ConsentMode::PreConfigured { duration },
            None => ConsentMode::Explicit,
        },
        CONSENT_MODE_EXPLICIT => ConsentMode::Explicit,
        CONSENT_MODE_IMPLICIT => ConsentMode::Implicit,
        CONSENT_MODE_PRE_CONFIGURED => ConsentMode::PreConfigured {
            duration: duration.unwrap_or(DEFAULT_PRE_CONFIGURED_CONSENT),
        },
        other => {
            let mut valid: Vec<&str> = VALID_CONSENT_MODES.to_vec();
            valid.push(CONSENT_MODE_AUTO);
            validator.push(ConfigIssue::ClientInvalidConsentMode {
                client: config.id.clone(),
                valid: join_quoted_or(&valid),
                got: other.to_string(),
            });
            ConsentMode::Explicit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fixtures::{confidential, issuer};
    use crate::discovery::DiscoveryBuilder;

    fn run(config: &ClientConfig) -> (ClientOptions, Validator) {
        let mut v = Validator::new();
        let options = validate(config, &issuer(), &mut v);
        (options, v)
    }

    #[test]
    fn unset_options_get_defaults() {
        let (options, v) = run(&confidential("app"));
        assert!(!v.has_errors());
        assert_eq!(options.authorization_policy, "two_factor");
        assert_eq!(options.requested_audience_mode, "explicit");
        assert_eq!(options.consent, ConsentMode::Explicit);
        assert!(options.lifespan.is_empty());
    }

    #[test]
    fn policy_must_be_known() {
        let mut config = confidential("app");
        config.authorization_policy = "custom".to_string();
        assert!(!run(&config).1.has_errors());

        config.authorization_policy = "nope".to_string();
        let (_, v) = run(&config);
        assert!(matches!(
            v.errors(),
            [ConfigIssue::ClientInvalidValue { attr: "authorization_policy", .. }]
        ));
    }

    #[test]
    fn lifespan_error_depends_on_custom_lifespans() {
        // GIVEN: a client referencing an unknown lifespan
        let mut config = confidential("app");
        config.lifespan = "long".to_string();

        // WHEN: custom lifespans exist
        let (_, v) = run(&config);
        // THEN: listed as invalid value
        assert!(matches!(
            v.errors(),
            [ConfigIssue::ClientInvalidValue { attr: "lifespan", .. }]
        ));

        // WHEN: no custom lifespans exist
        let mut v = Validator::new();
        validate(&config, &DiscoveryBuilder::new().freeze(), &mut v);
        // THEN: the dedicated error is used
        assert!(matches!(v.errors(), [ConfigIssue::ClientInvalidLifespan { .. }]));
    }

    #[test]
    fn enumerations_are_checked() {
        let mut config = confidential("app");
        config.pkce_challenge_method = "S512".to_string();
        config.requested_audience_mode = "sometimes".to_string();
        let (_, v) = run(&config);
        assert_eq!(v.errors().len(), 2);
    }

    #[test]
    fn consent_inference() {
        let mut config = confidential("app");
        let mut v = Validator::new();

        config.pre_configured_consent_duration = Some(Duration::from_secs(60));
        assert_eq!(
            consent_mode(&config, &mut v),
            ConsentMode::PreConfigured {
                duration: Duration::from_secs(60)
            }
        );

        config.consent_mode = "auto".to_string();
        assert!(matches!(consent_mode(&config, &mut v), ConsentMode::PreConfigured { .. }));

        config.consent_mode = "pre-configured".to_string();
        config.pre_configured_consent_duration = None;
        assert_eq!(
            consent_mode(&config, &mut v),
            ConsentMode::PreConfigured {
                duration: DEFAULT_PRE_CONFIGURED_CONSENT
            }
        );

        config.consent_mode = "implicit".to_string();
        assert_eq!(consent_mode(&config, &mut v), ConsentMode::Implicit);
        assert!(!v.has_errors());

        config.consent_mode = "always".to_string();
        assert_eq!(consent_mode(&config, &mut v), ConsentMode::Explicit);
        assert!(matches!(v.errors(), [ConfigIssue::ClientInvalidConsentMode { .. }]));
    }
}
