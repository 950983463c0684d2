//! Scopes, response types, response modes and grant types.
//!
//! Unknown response types and every grant/response mismatch are warnings,
//! while unknown scopes, response modes and grant types are errors. The
//! lenient paths keep older client registrations loading.

use oidc_consts::{
    GRANT_TYPE_AUTHORIZATION_CODE, GRANT_TYPE_CLIENT_CREDENTIALS, GRANT_TYPE_IMPLICIT,
    GRANT_TYPE_REFRESH_TOKEN, REFRESH_TOKEN_SCOPES, RESPONSE_MODE_FRAGMENT, RESPONSE_MODE_QUERY,
    RESPONSE_TYPE_CODE, RESPONSE_TYPES_HYBRID, RESPONSE_TYPES_IMPLICIT,
    RESPONSE_TYPES_REFRESH_TOKEN, SCOPE_BEARER_AUTHZ, SCOPE_OFFLINE, SCOPE_OFFLINE_ACCESS,
    SCOPE_OPENID, VALID_GRANT_TYPES, VALID_RESPONSE_MODES, VALID_RESPONSE_TYPES, VALID_SCOPES,
};

use crate::config::ClientConfig;
use crate::validator::{ConfigIssue, Validator, check_list, join_quoted, join_quoted_or};

/// Normalized flow configuration of one client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFlows {
    /// Scopes
    pub scopes: Vec<String>,
    /// Response types
    pub response_types: Vec<String>,
    /// Response modes
    pub response_modes: Vec<String>,
    /// Grant types
    pub grant_types: Vec<String>,
    /// The client registered the bearer-authorization scope
    pub bearer_authorization: bool,
}

/// Run the four flow steps in order.
pub fn validate(config: &ClientConfig, validator: &mut Validator) -> ClientFlows {
    let client = config.id.as_str();
    let response_types = response_types(client, &config.response_types, validator);
    let scopes = scopes(client, &config.scopes, &config.grant_types, &response_types, validator);
    let response_modes = response_modes(client, &config.response_modes, &response_types, validator);
    let grant_types = grant_types(
        client,
        &config.grant_types,
        config.public,
        &scopes,
        &response_types,
        validator,
    );

    ClientFlows {
        bearer_authorization: scopes.iter().any(|s| s == SCOPE_BEARER_AUTHZ),
        scopes,
        response_types,
        response_modes,
        grant_types,
    }
}

/// Default and check scopes.
///
/// A client whose only grant type is `client_credentials` gets no default
/// and may not request `openid` or the refresh-token scopes; every other
/// client always has `openid` and may only use known scopes.
pub fn scopes(
    client: &str,
    configured: &[String],
    grant_types: &[String],
    response_types: &[String],
    validator: &mut Validator,
) -> Vec<String> {
    let client_credentials_only = !grant_types.is_empty()
        && grant_types.iter().all(|g| g == GRANT_TYPE_CLIENT_CREDENTIALS);

    let mut scopes = configured.to_vec();
    let (invalid, duplicates) = check_list(&scopes, Some(VALID_SCOPES));

    if !duplicates.is_empty() {
        validator.push_warning(ConfigIssue::ClientDuplicateEntries {
            client: client.to_string(),
            attr: "scopes",
            duplicates: join_quoted(&duplicates),
        });
    }

    if client_credentials_only {
        let forbidden: Vec<&String> = scopes
            .iter()
            .filter(|s| matches!(s.as_str(), SCOPE_OPENID | SCOPE_OFFLINE | SCOPE_OFFLINE_ACCESS))
            .collect();
        if !forbidden.is_empty() {
            validator.push(ConfigIssue::ClientInvalidScopesClientCredentials {
                client: client.to_string(),
                scopes: join_quoted(&scopes),
                invalid: join_quoted_or(&forbidden),
            });
        }
    } else {
        if !scopes.iter().any(|s| s == SCOPE_OPENID) {
            scopes.insert(0, SCOPE_OPENID.to_string());
        }

        if !invalid.is_empty() {
            validator.push(ConfigIssue::ClientInvalidEntries {
                client: client.to_string(),
                attr: "scopes",
                valid: join_quoted_or(VALID_SCOPES),
                invalid: join_quoted(&invalid),
            });
        }
    }

    if scopes.iter().any(|s| REFRESH_TOKEN_SCOPES.contains(&s.as_str()))
        && !contains_any(response_types, RESPONSE_TYPES_REFRESH_TOKEN)
    {
        validator.push_warning(ConfigIssue::ClientRefreshWithoutCodeResponseType {
            client: client.to_string(),
            attr: "scopes",
            values: join_quoted_or(REFRESH_TOKEN_SCOPES),
            valid: join_quoted_or(RESPONSE_TYPES_REFRESH_TOKEN),
        });
    }

    scopes
}

/// Default and check response types. Unknown values only warn.
pub fn response_types(client: &str, configured: &[String], validator: &mut Validator) -> Vec<String> {
    let response_types = if configured.is_empty() {
        vec![RESPONSE_TYPE_CODE.to_string()]
    } else {
        configured.to_vec()
    };

    let (invalid, duplicates) = check_list(&response_types, Some(VALID_RESPONSE_TYPES));

    if !invalid.is_empty() {
        validator.push_warning(ConfigIssue::ClientInvalidEntries {
            client: client.to_string(),
            attr: "response_types",
            valid: join_quoted_or(VALID_RESPONSE_TYPES),
            invalid: join_quoted(&invalid),
        });
    }

    if !duplicates.is_empty() {
        validator.push_warning(ConfigIssue::ClientDuplicateEntries {
            client: client.to_string(),
            attr: "response_types",
            duplicates: join_quoted(&duplicates),
        });
    }

    response_types
}

/// Default response modes from the response types: `query` for the code
/// flow, `fragment` for implicit and hybrid flows.
pub fn response_modes(
    client: &str,
    configured: &[String],
    response_types: &[String],
    validator: &mut Validator,
) -> Vec<String> {
    let mut response_modes = configured.to_vec();

    if response_modes.is_empty() {
        for response_type in response_types {
            let mode = if response_type == RESPONSE_TYPE_CODE {
                RESPONSE_MODE_QUERY
            } else if RESPONSE_TYPES_IMPLICIT.contains(&response_type.as_str())
                || RESPONSE_TYPES_HYBRID.contains(&response_type.as_str())
            {
                RESPONSE_MODE_FRAGMENT
            } else {
                continue;
            };
            push_unique(&mut response_modes, mode);
        }
    }

    let (invalid, duplicates) = check_list(&response_modes, Some(VALID_RESPONSE_MODES));

    if !invalid.is_empty() {
        validator.push(ConfigIssue::ClientInvalidEntries {
            client: client.to_string(),
            attr: "response_modes",
            valid: join_quoted_or(VALID_RESPONSE_MODES),
            invalid: join_quoted(&invalid),
        });
    }

    if !duplicates.is_empty() {
        validator.push_warning(ConfigIssue::ClientDuplicateEntries {
            client: client.to_string(),
            attr: "response_modes",
            duplicates: join_quoted(&duplicates),
        });
    }

    response_modes
}

/// Default grant types from the response types, then cross-check them.
pub fn grant_types(
    client: &str,
    configured: &[String],
    public: bool,
    scopes: &[String],
    response_types: &[String],
    validator: &mut Validator,
) -> Vec<String> {
    let mut grant_types = configured.to_vec();

    if grant_types.is_empty() {
        for response_type in response_types {
            let rt = response_type.as_str();
            if rt == RESPONSE_TYPE_CODE {
                push_unique(&mut grant_types, GRANT_TYPE_AUTHORIZATION_CODE);
            } else if RESPONSE_TYPES_IMPLICIT.contains(&rt) {
                push_unique(&mut grant_types, GRANT_TYPE_IMPLICIT);
            } else if RESPONSE_TYPES_HYBRID.contains(&rt) {
                push_unique(&mut grant_types, GRANT_TYPE_AUTHORIZATION_CODE);
                push_unique(&mut grant_types, GRANT_TYPE_IMPLICIT);
            }
        }
    }

    let has_code = response_types.iter().any(|rt| rt == RESPONSE_TYPE_CODE);
    let has_implicit = contains_any(response_types, RESPONSE_TYPES_IMPLICIT);
    let has_hybrid = contains_any(response_types, RESPONSE_TYPES_HYBRID);

    for grant_type in &grant_types {
        match grant_type.as_str() {
            GRANT_TYPE_AUTHORIZATION_CODE if !has_code && !has_hybrid => {
                let mut valid = vec![RESPONSE_TYPE_CODE];
                valid.extend_from_slice(RESPONSE_TYPES_HYBRID);
                validator.push_warning(ConfigIssue::ClientGrantTypeMismatch {
                    client: client.to_string(),
                    grant: GRANT_TYPE_AUTHORIZATION_CODE,
                    flow: "for either the authorization code or hybrid flow",
                    valid: join_quoted_or(&valid),
                    response_types: join_quoted(response_types),
                });
            }
            GRANT_TYPE_IMPLICIT if !has_implicit && !has_hybrid => {
                let mut valid = RESPONSE_TYPES_IMPLICIT.to_vec();
                valid.extend_from_slice(RESPONSE_TYPES_HYBRID);
                validator.push_warning(ConfigIssue::ClientGrantTypeMismatch {
                    client: client.to_string(),
                    grant: GRANT_TYPE_IMPLICIT,
                    flow: "for either the implicit or hybrid flow",
                    valid: join_quoted_or(&valid),
                    response_types: join_quoted(response_types),
                });
            }
            GRANT_TYPE_CLIENT_CREDENTIALS if public => {
                validator.push(ConfigIssue::ClientGrantTypePublic {
                    client: client.to_string(),
                    grant: GRANT_TYPE_CLIENT_CREDENTIALS,
                });
            }
            GRANT_TYPE_REFRESH_TOKEN => {
                if !contains_any(scopes, REFRESH_TOKEN_SCOPES) {
                    validator.push_warning(ConfigIssue::ClientGrantTypeRefreshWithoutScope {
                        client: client.to_string(),
                    });
                }
                if !contains_any(response_types, RESPONSE_TYPES_REFRESH_TOKEN) {
                    validator.push_warning(ConfigIssue::ClientRefreshWithoutCodeResponseType {
                        client: client.to_string(),
                        attr: "grant_types",
                        values: join_quoted_or(&[GRANT_TYPE_REFRESH_TOKEN]),
                        valid: join_quoted_or(RESPONSE_TYPES_REFRESH_TOKEN),
                    });
                }
            }
            _ => {}
        }
    }

    let (invalid, duplicates) = check_list(&grant_types, Some(VALID_GRANT_TYPES));

    if !invalid.is_empty() {
        validator.push(ConfigIssue::ClientInvalidEntries {
            client: client.to_string(),
            attr: "grant_types",
            valid: join_quoted_or(VALID_GRANT_TYPES),
            invalid: join_quoted(&invalid),
        });
    }

    if !duplicates.is_empty() {
        validator.push_warning(ConfigIssue::ClientDuplicateEntries {
            client: client.to_string(),
            attr: "grant_types",
            duplicates: join_quoted(&duplicates),
        });
    }

    grant_types
}

fn contains_any(values: &[String], set: &[&str]) -> bool {
    values.iter().any(|v| set.contains(&v.as_str()))
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}
