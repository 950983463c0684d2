//! OpenID Connect / OAuth 2.0 protocol vocabulary.
//!
//! String constants for every enumerated value the policy core validates,
//! grouped into the sets the validator checks against. Keeping them in one
//! crate means the validator, the runtime engine and any discovery publisher
//! agree on spelling.
//!
//! ```rust
//! use oidc_consts::*;
//!
//! assert!(VALID_SCOPES.contains(&SCOPE_OPENID));
//! assert!(RESPONSE_TYPES_REFRESH_TOKEN.contains(&RESPONSE_TYPE_CODE));
//! ```

#![forbid(unsafe_code)]

// ============================================================================
// Signing algorithms
// ============================================================================

/// RSASSA-PKCS1-v1_5 using SHA-256. Every provider must be able to sign with it.
pub const SIGNING_ALG_RS256: &str = "RS256";
/// RSASSA-PKCS1-v1_5 using SHA-384.
pub const SIGNING_ALG_RS384: &str = "RS384";
/// RSASSA-PKCS1-v1_5 using SHA-512.
pub const SIGNING_ALG_RS512: &str = "RS512";
/// RSASSA-PSS using SHA-256.
pub const SIGNING_ALG_PS256: &str = "PS256";
/// RSASSA-PSS using SHA-384.
pub const SIGNING_ALG_PS384: &str = "PS384";
/// RSASSA-PSS using SHA-512.
pub const SIGNING_ALG_PS512: &str = "PS512";
/// ECDSA using P-256 and SHA-256.
pub const SIGNING_ALG_ES256: &str = "ES256";
/// ECDSA using P-384 and SHA-384.
pub const SIGNING_ALG_ES384: &str = "ES384";
/// ECDSA using P-521 and SHA-512.
pub const SIGNING_ALG_ES512: &str = "ES512";
/// HMAC using SHA-256.
pub const SIGNING_ALG_HS256: &str = "HS256";
/// HMAC using SHA-384.
pub const SIGNING_ALG_HS384: &str = "HS384";
/// HMAC using SHA-512.
pub const SIGNING_ALG_HS512: &str = "HS512";
/// Unsigned response.
pub const SIGNING_ALG_NONE: &str = "none";

/// Asymmetric algorithms accepted for issuer keys and client public keys.
pub const ASYMMETRIC_SIGNING_ALGS: &[&str] = &[
    SIGNING_ALG_RS256,
    SIGNING_ALG_RS384,
    SIGNING_ALG_RS512,
    SIGNING_ALG_PS256,
    SIGNING_ALG_PS384,
    SIGNING_ALG_PS512,
    SIGNING_ALG_ES256,
    SIGNING_ALG_ES384,
    SIGNING_ALG_ES512,
];

/// Algorithms accepted for `client_secret_jwt` client authentication.
pub const HMAC_SIGNING_ALGS: &[&str] = &[SIGNING_ALG_HS256, SIGNING_ALG_HS384, SIGNING_ALG_HS512];

// ============================================================================
// JSON Web Keys
// ============================================================================

/// The only key use the provider accepts.
pub const KEY_USE_SIGNATURE: &str = "sig";

/// NIST P-256 curve name.
pub const CURVE_P256: &str = "P-256";
/// NIST P-384 curve name.
pub const CURVE_P384: &str = "P-384";
/// NIST P-521 curve name.
pub const CURVE_P521: &str = "P-521";

// ============================================================================
// Scopes
// ============================================================================

/// OpenID Connect marker scope.
pub const SCOPE_OPENID: &str = "openid";
/// Refresh token scope (OAuth 2.0 spelling).
pub const SCOPE_OFFLINE_ACCESS: &str = "offline_access";
/// Refresh token scope (legacy spelling).
pub const SCOPE_OFFLINE: &str = "offline";
/// Group membership claims.
pub const SCOPE_GROUPS: &str = "groups";
/// Email claims.
pub const SCOPE_EMAIL: &str = "email";
/// Profile claims.
pub const SCOPE_PROFILE: &str = "profile";
/// Address claims.
pub const SCOPE_ADDRESS: &str = "address";
/// Phone claims.
pub const SCOPE_PHONE: &str = "phone";
/// Reserved scope gating bearer-token resource authorization.
pub const SCOPE_BEARER_AUTHZ: &str = "bearer.authz";

/// Every scope a client may register.
pub const VALID_SCOPES: &[&str] = &[
    SCOPE_OPENID,
    SCOPE_OFFLINE_ACCESS,
    SCOPE_OFFLINE,
    SCOPE_GROUPS,
    SCOPE_EMAIL,
    SCOPE_PROFILE,
    SCOPE_ADDRESS,
    SCOPE_PHONE,
    SCOPE_BEARER_AUTHZ,
];

/// Scopes that request refresh tokens.
pub const REFRESH_TOKEN_SCOPES: &[&str] = &[SCOPE_OFFLINE_ACCESS, SCOPE_OFFLINE];

// ============================================================================
// Response types
// ============================================================================

/// Authorization code flow.
pub const RESPONSE_TYPE_CODE: &str = "code";
/// Implicit flow returning an ID token.
pub const RESPONSE_TYPE_ID_TOKEN: &str = "id_token";
/// Implicit flow returning an access token.
pub const RESPONSE_TYPE_TOKEN: &str = "token";
/// Implicit flow returning both tokens.
pub const RESPONSE_TYPE_ID_TOKEN_TOKEN: &str = "id_token token";
/// Hybrid flow: code and ID token.
pub const RESPONSE_TYPE_CODE_ID_TOKEN: &str = "code id_token";
/// Hybrid flow: code and access token.
pub const RESPONSE_TYPE_CODE_TOKEN: &str = "code token";
/// Hybrid flow: code, ID token and access token.
pub const RESPONSE_TYPE_CODE_ID_TOKEN_TOKEN: &str = "code id_token token";

/// Response types of the implicit flow.
pub const RESPONSE_TYPES_IMPLICIT: &[&str] = &[
    RESPONSE_TYPE_ID_TOKEN,
    RESPONSE_TYPE_TOKEN,
    RESPONSE_TYPE_ID_TOKEN_TOKEN,
];

/// Response types of the hybrid flow.
pub const RESPONSE_TYPES_HYBRID: &[&str] = &[
    RESPONSE_TYPE_CODE_ID_TOKEN,
    RESPONSE_TYPE_CODE_TOKEN,
    RESPONSE_TYPE_CODE_ID_TOKEN_TOKEN,
];

/// Response types that hand out an authorization code and can therefore
/// lead to a refresh token.
pub const RESPONSE_TYPES_REFRESH_TOKEN: &[&str] = &[
    RESPONSE_TYPE_CODE,
    RESPONSE_TYPE_CODE_ID_TOKEN,
    RESPONSE_TYPE_CODE_TOKEN,
    RESPONSE_TYPE_CODE_ID_TOKEN_TOKEN,
];

/// Every response type a client may register.
pub const VALID_RESPONSE_TYPES: &[&str] = &[
    RESPONSE_TYPE_CODE,
    RESPONSE_TYPE_ID_TOKEN,
    RESPONSE_TYPE_TOKEN,
    RESPONSE_TYPE_ID_TOKEN_TOKEN,
    RESPONSE_TYPE_CODE_ID_TOKEN,
    RESPONSE_TYPE_CODE_TOKEN,
    RESPONSE_TYPE_CODE_ID_TOKEN_TOKEN,
];

// ============================================================================
// Response modes
// ============================================================================

/// HTML form auto-post.
pub const RESPONSE_MODE_FORM_POST: &str = "form_post";
/// Query string.
pub const RESPONSE_MODE_QUERY: &str = "query";
/// URL fragment.
pub const RESPONSE_MODE_FRAGMENT: &str = "fragment";
/// JARM with the default carrier for the response type.
pub const RESPONSE_MODE_JWT: &str = "jwt";
/// JARM via form post.
pub const RESPONSE_MODE_FORM_POST_JWT: &str = "form_post.jwt";
/// JARM via query string.
pub const RESPONSE_MODE_QUERY_JWT: &str = "query.jwt";
/// JARM via fragment.
pub const RESPONSE_MODE_FRAGMENT_JWT: &str = "fragment.jwt";

/// Every response mode a client may register.
pub const VALID_RESPONSE_MODES: &[&str] = &[
    RESPONSE_MODE_FORM_POST,
    RESPONSE_MODE_QUERY,
    RESPONSE_MODE_FRAGMENT,
    RESPONSE_MODE_JWT,
    RESPONSE_MODE_FORM_POST_JWT,
    RESPONSE_MODE_QUERY_JWT,
    RESPONSE_MODE_FRAGMENT_JWT,
];

// ============================================================================
// Grant types
// ============================================================================

/// Authorization code grant.
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";
/// Implicit grant.
pub const GRANT_TYPE_IMPLICIT: &str = "implicit";
/// Refresh token grant.
pub const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";
/// Client credentials grant.
pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Every grant type a client may register.
pub const VALID_GRANT_TYPES: &[&str] = &[
    GRANT_TYPE_AUTHORIZATION_CODE,
    GRANT_TYPE_IMPLICIT,
    GRANT_TYPE_REFRESH_TOKEN,
    GRANT_TYPE_CLIENT_CREDENTIALS,
];

// ============================================================================
// Client authentication
// ============================================================================

/// No client authentication (public clients).
pub const AUTH_METHOD_NONE: &str = "none";
/// HTTP Basic with the client secret.
pub const AUTH_METHOD_CLIENT_SECRET_BASIC: &str = "client_secret_basic";
/// Client secret in the request body.
pub const AUTH_METHOD_CLIENT_SECRET_POST: &str = "client_secret_post";
/// JWT assertion signed with the client secret (HMAC).
pub const AUTH_METHOD_CLIENT_SECRET_JWT: &str = "client_secret_jwt";
/// JWT assertion signed with the client's private key.
pub const AUTH_METHOD_PRIVATE_KEY_JWT: &str = "private_key_jwt";

/// Every token endpoint authentication method.
pub const VALID_AUTH_METHODS: &[&str] = &[
    AUTH_METHOD_NONE,
    AUTH_METHOD_CLIENT_SECRET_BASIC,
    AUTH_METHOD_CLIENT_SECRET_POST,
    AUTH_METHOD_CLIENT_SECRET_JWT,
    AUTH_METHOD_PRIVATE_KEY_JWT,
];

/// Methods available to confidential clients.
pub const CONFIDENTIAL_AUTH_METHODS: &[&str] = &[
    AUTH_METHOD_CLIENT_SECRET_BASIC,
    AUTH_METHOD_CLIENT_SECRET_POST,
    AUTH_METHOD_CLIENT_SECRET_JWT,
    AUTH_METHOD_PRIVATE_KEY_JWT,
];

// ============================================================================
// Consent, PKCE, audience
// ============================================================================

/// Ask for consent on every authorization.
pub const CONSENT_MODE_EXPLICIT: &str = "explicit";
/// Never ask for consent.
pub const CONSENT_MODE_IMPLICIT: &str = "implicit";
/// Remember consent for a configured duration.
pub const CONSENT_MODE_PRE_CONFIGURED: &str = "pre-configured";
/// Infer the consent mode from the rest of the client configuration.
pub const CONSENT_MODE_AUTO: &str = "auto";

/// Consent modes that may be set explicitly.
pub const VALID_CONSENT_MODES: &[&str] = &[
    CONSENT_MODE_EXPLICIT,
    CONSENT_MODE_IMPLICIT,
    CONSENT_MODE_PRE_CONFIGURED,
];

/// Plain PKCE challenge.
pub const PKCE_METHOD_PLAIN: &str = "plain";
/// SHA-256 PKCE challenge.
pub const PKCE_METHOD_S256: &str = "S256";

/// Valid PKCE challenge methods.
pub const VALID_PKCE_METHODS: &[&str] = &[PKCE_METHOD_PLAIN, PKCE_METHOD_S256];

/// PKCE is required from every client.
pub const ENFORCE_PKCE_ALWAYS: &str = "always";
/// PKCE is never required.
pub const ENFORCE_PKCE_NEVER: &str = "never";
/// PKCE is required from public clients only.
pub const ENFORCE_PKCE_PUBLIC_CLIENTS_ONLY: &str = "public_clients_only";

/// Valid `enforce_pkce` values.
pub const VALID_ENFORCE_PKCE: &[&str] = &[
    ENFORCE_PKCE_ALWAYS,
    ENFORCE_PKCE_NEVER,
    ENFORCE_PKCE_PUBLIC_CLIENTS_ONLY,
];

/// Audiences must be requested explicitly.
pub const AUDIENCE_MODE_EXPLICIT: &str = "explicit";
/// Every registered audience is granted implicitly.
pub const AUDIENCE_MODE_IMPLICIT: &str = "implicit";

/// Valid requested-audience modes.
pub const VALID_AUDIENCE_MODES: &[&str] = &[AUDIENCE_MODE_EXPLICIT, AUDIENCE_MODE_IMPLICIT];

// ============================================================================
// Authorization policies
// ============================================================================

/// Single-factor authentication suffices.
pub const POLICY_ONE_FACTOR: &str = "one_factor";
/// Two-factor authentication is required.
pub const POLICY_TWO_FACTOR: &str = "two_factor";
/// Access is refused.
pub const POLICY_DENY: &str = "deny";

/// Names no custom policy may use.
pub const RESERVED_POLICY_NAMES: &[&str] = &[POLICY_ONE_FACTOR, POLICY_TWO_FACTOR, POLICY_DENY];

/// Built-in policies a client may reference without configuring them.
pub const BUILTIN_POLICY_NAMES: &[&str] = &[POLICY_ONE_FACTOR, POLICY_TWO_FACTOR];

// ============================================================================
// Redirects and CORS
// ============================================================================

/// Out-of-band redirect URI used by installed applications.
pub const REDIRECT_URI_INSTALLED_APP: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Endpoints that may have CORS enabled.
pub const VALID_CORS_ENDPOINTS: &[&str] = &[
    "authorization",
    "pushed-authorization-request",
    "token",
    "revocation",
    "introspection",
    "userinfo",
];

/// Returns `true` when `value` is one of `set`.
#[must_use]
pub fn is_one_of(value: &str, set: &[&str]) -> bool {
    set.iter().any(|v| *v == value)
}
