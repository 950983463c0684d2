//! Configuration issue taxonomy.
//!
//! One variant per distinct problem the validation pass can report. Whether
//! an issue is fatal or a warning is decided where it is pushed, not here:
//! the same variant (for example [`ConfigIssue::ClientInvalidEntries`]) is an
//! error for response modes but only a warning for response types.

use std::fmt;

use thiserror::Error;

/// Where a JSON Web Key was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocation {
    /// Issuer signing key (1-based position in the resolved key list)
    Issuer {
        /// Position, 1-based
        index: usize,
    },
    /// Inline client public key
    Client {
        /// Client ID
        client: String,
        /// Position, 1-based
        index: usize,
    },
}

impl fmt::Display for KeyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issuer { index } => write!(f, "jwks: key #{index}"),
            Self::Client { client, index } => {
                write!(f, "client '{client}': public_keys: values: key #{index}")
            }
        }
    }
}

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    // ── Issuer / client keys ──────────────────────────────────────────────
    /// Key material absent or its public component cannot be decoded
    #[error("{location}: option 'key' is malformed: {reason}")]
    KeyMalformed {
        /// Key location
        location: KeyLocation,
        /// Decoder failure
        reason: String,
    },

    /// Key ID could not be derived from the key material
    #[error("{location}: option 'key_id' could not be calculated from the key thumbprint: {reason}")]
    KeyThumbprint {
        /// Key location
        location: KeyLocation,
        /// Failure
        reason: String,
    },

    /// Key ID longer than 100 characters
    #[error("{location}: option 'key_id' must be 100 characters or less but it's '{key_id}'")]
    KeyIdTooLong {
        /// Key location
        location: KeyLocation,
        /// Offending key ID
        key_id: String,
    },

    /// Key ID contains characters outside `[a-zA-Z0-9]`
    #[error("{location}: option 'key_id' must only contain alphanumeric characters but it's '{key_id}'")]
    KeyIdInvalid {
        /// Key location
        location: KeyLocation,
        /// Offending key ID
        key_id: String,
    },

    /// Key ID reused
    #[error("{location} with key id '{key_id}': option 'key_id' must be unique")]
    KeyIdNotUnique {
        /// Key location
        location: KeyLocation,
        /// Duplicated key ID
        key_id: String,
    },

    /// Client key without a key ID
    #[error("{location}: option 'key_id' must be provided")]
    KeyIdMissing {
        /// Key location
        location: KeyLocation,
    },

    /// Use/algorithm could not be inferred from the key
    #[error("{location} with key id '{key_id}': failed to get key properties: {reason}")]
    KeyProperties {
        /// Key location
        location: KeyLocation,
        /// Key ID
        key_id: String,
        /// Failure
        reason: String,
    },

    /// `use` or `algorithm` outside the accepted set
    #[error("{location} with key id '{key_id}': option '{attr}' must be one of {valid} but it's configured as '{got}'")]
    KeyInvalidOption {
        /// Key location
        location: KeyLocation,
        /// Key ID
        key_id: String,
        /// Attribute name
        attr: &'static str,
        /// Accepted values
        valid: String,
        /// Configured value
        got: String,
    },

    /// Key is neither RSA nor ECDSA (or wrong visibility)
    #[error("{location} with key id '{key_id}': option 'key' must be a RSA or ECDSA {visibility} key but it's a {kind}")]
    KeyNotAsymmetric {
        /// Key location
        location: KeyLocation,
        /// Key ID
        key_id: String,
        /// `private` for issuer keys, `public` for client keys
        visibility: &'static str,
        /// What was found
        kind: String,
    },

    /// RSA modulus below 2048 bits
    #[error("{location} with key id '{key_id}': option 'key' is an RSA {bits} bit key but it must be at minimum a RSA 2048 bit key")]
    KeyRsaTooSmall {
        /// Key location
        location: KeyLocation,
        /// Key ID
        key_id: String,
        /// Modulus size
        bits: usize,
    },

    /// Leaf certificate does not carry this key
    #[error("{location} with key id '{key_id}': option 'certificate_chain' does not contain the public key for the 'key' option")]
    KeyCertificateMismatch {
        /// Key location
        location: KeyLocation,
        /// Key ID
        key_id: String,
    },

    /// Chain fails to parse, is expired, or is out of order
    #[error("{location} with key id '{key_id}': option 'certificate_chain' is invalid: {reason}")]
    KeyCertificateChainInvalid {
        /// Key location
        location: KeyLocation,
        /// Key ID
        key_id: String,
        /// Failure
        reason: String,
    },

    /// Keys exist but none offers RS256
    #[error("jwks: keys must include a key with the '{required}' algorithm but only {found} were configured")]
    NoBaselineAlgorithm {
        /// Mandatory algorithm
        required: &'static str,
        /// Algorithms found
        found: String,
    },

    /// No issuer keys configured
    #[error("option 'jwks' is required")]
    NoIssuerKeys,

    // ── Provider options ──────────────────────────────────────────────────
    /// Entropy check disabled
    #[error("option 'minimum_parameter_entropy' is disabled which is considered unsafe and insecure")]
    EntropyDisabled,

    /// Entropy below the safe minimum
    #[error("option 'minimum_parameter_entropy' is configured to an unsafe and insecure value, it should at least be {minimum} but it's configured to {configured}")]
    EntropyUnsafe {
        /// Safe minimum
        minimum: i64,
        /// Configured value
        configured: i64,
    },

    /// Unknown PKCE enforcement mode
    #[error("option 'enforce_pkce' must be 'never', 'public_clients_only' or 'always', but it's configured as '{got}'")]
    EnforcePkceInvalid {
        /// Configured value
        got: String,
    },

    /// `*` combined with other origins
    #[error("cors: option 'allowed_origins' contains the wildcard origin '*' with more than one origin but the wildcard origin must be defined by itself")]
    CorsWildcardNotAlone,

    /// `*` combined with origins derived from clients
    #[error("cors: option 'allowed_origins' contains the wildcard origin '*' cannot be specified with option 'allowed_origins_from_client_redirect_uris' enabled")]
    CorsWildcardWithClients,

    /// Origin with a path or query
    #[error("cors: option 'allowed_origins' contains an invalid value '{origin}' as it has a {component}: origins must only be the scheme, hostname, and an optional port")]
    CorsInvalidOrigin {
        /// Configured origin
        origin: String,
        /// Offending component
        component: &'static str,
    },

    /// Origin that is not a URL
    #[error("cors: option 'allowed_origins' contains an invalid value '{origin}': {reason}")]
    CorsUnparseableOrigin {
        /// Configured origin
        origin: String,
        /// Parser failure
        reason: String,
    },

    /// Unknown CORS endpoint
    #[error("cors: option 'endpoints' contains an invalid value '{endpoint}': must be one of {valid}")]
    CorsInvalidEndpoint {
        /// Configured endpoint
        endpoint: String,
        /// Accepted values
        valid: String,
    },

    /// No clients registered
    #[error("option 'clients' must have one or more clients configured")]
    NoClients,

    // ── Authorization policies ────────────────────────────────────────────
    /// Empty policy name
    #[error("authorization_policies: authorization policies must have a name but one with a blank name exists")]
    PolicyBlankName,

    /// Policy named after a built-in decision
    #[error("authorization_policies: policy '{name}': option 'name' must not be one of {reserved} but it's configured as '{name}'")]
    PolicyReservedName {
        /// Configured name
        name: String,
        /// Reserved names
        reserved: String,
    },

    /// Unknown default decision
    #[error("authorization_policies: policy '{name}': option 'default_policy' must be one of {valid} but it's configured as '{got}'")]
    PolicyInvalidDefault {
        /// Policy name
        name: String,
        /// Accepted values
        valid: String,
        /// Configured value
        got: String,
    },

    /// Policy with no rules
    #[error("authorization_policies: policy '{name}': option 'rules' is required")]
    PolicyMissingRules {
        /// Policy name
        name: String,
    },

    /// Unknown rule decision
    #[error("authorization_policies: policy '{name}': rules: rule #{rule}: option 'policy' must be one of {valid} but it's configured as '{got}'")]
    PolicyRuleInvalidDecision {
        /// Policy name
        name: String,
        /// Rule position, 1-based
        rule: usize,
        /// Accepted values
        valid: String,
        /// Configured value
        got: String,
    },

    /// Rule without subjects
    #[error("authorization_policies: policy '{name}': rules: rule #{rule}: option 'subject' is required")]
    PolicyRuleMissingSubject {
        /// Policy name
        name: String,
        /// Rule position, 1-based
        rule: usize,
    },

    /// Subject matcher that is not `user:` or `group:`
    #[error("authorization_policies: policy '{name}': rules: rule #{rule}: option 'subject' has an invalid value '{subject}': must start with 'user:' or 'group:'")]
    PolicyRuleInvalidSubject {
        /// Policy name
        name: String,
        /// Rule position, 1-based
        rule: usize,
        /// Configured subject
        subject: String,
    },

    // ── Clients: collection level ─────────────────────────────────────────
    /// Clients with an empty ID
    #[error("clients: option 'id' is required but was absent on the clients in positions {positions}")]
    ClientsBlankId {
        /// Client positions (`#1`, `#2`, ...)
        positions: String,
    },

    /// Case-insensitively duplicated IDs
    #[error("clients: option 'id' must be unique for every client but one or more clients share the following 'id' values {ids}")]
    ClientsDuplicateId {
        /// Lowercased IDs
        ids: String,
    },

    /// Rollup warning for deprecated client configurations
    #[error("clients: one or more clients have configurations that are deprecated and will become errors in a future release")]
    ClientsDeprecated,

    // ── Clients: per client ───────────────────────────────────────────────
    /// Value outside its enumeration or discovery list
    #[error("client '{client}': option '{attr}' must be one of {valid} but it's configured as '{got}'")]
    ClientInvalidValue {
        /// Client ID
        client: String,
        /// Attribute name
        attr: &'static str,
        /// Accepted values
        valid: String,
        /// Configured value
        got: String,
    },

    /// Lifespan referenced with no custom lifespans configured
    #[error("client '{client}': option 'lifespan' must not be configured when no custom lifespans are configured but it's configured as '{lifespan}'")]
    ClientInvalidLifespan {
        /// Client ID
        client: String,
        /// Configured lifespan
        lifespan: String,
    },

    /// Unknown consent mode
    #[error("client '{client}': consent: option 'mode' must be one of {valid} but it's configured as '{got}'")]
    ClientInvalidConsentMode {
        /// Client ID
        client: String,
        /// Accepted values
        valid: String,
        /// Configured value
        got: String,
    },

    /// List with repeated values
    #[error("client '{client}': option '{attr}' must have unique values but the values {duplicates} are duplicated")]
    ClientDuplicateEntries {
        /// Client ID
        client: String,
        /// Attribute name
        attr: &'static str,
        /// Duplicated values
        duplicates: String,
    },

    /// List with unknown values
    #[error("client '{client}': option '{attr}' must only have the values {valid} but the values {invalid} are present")]
    ClientInvalidEntries {
        /// Client ID
        client: String,
        /// Attribute name
        attr: &'static str,
        /// Accepted values
        valid: String,
        /// Unknown values
        invalid: String,
    },

    /// Client-credentials-only client requesting user scopes
    #[error("client '{client}': option 'scopes' has the values {scopes} however when exclusively utilizing the 'client_credentials' value for the 'grant_types' the values {invalid} are not allowed")]
    ClientInvalidScopesClientCredentials {
        /// Client ID
        client: String,
        /// Configured scopes
        scopes: String,
        /// Forbidden scopes present
        invalid: String,
    },

    /// Refresh-token scope or grant with no code-capable response type
    #[error("client '{client}': option '{attr}' should only have the values {values} if the client is also configured with a 'response_types' value of {valid}")]
    ClientRefreshWithoutCodeResponseType {
        /// Client ID
        client: String,
        /// Attribute name
        attr: &'static str,
        /// Refresh-token values
        values: String,
        /// Code-capable response types
        valid: String,
    },

    /// Grant type without a matching response type
    #[error("client '{client}': option 'grant_types' should only have the '{grant}' value if the client is also configured with a 'response_types' value {flow} such as {valid} but the response types are {response_types}")]
    ClientGrantTypeMismatch {
        /// Client ID
        client: String,
        /// Grant type
        grant: &'static str,
        /// Flow description
        flow: &'static str,
        /// Acceptable response types
        valid: String,
        /// Configured response types
        response_types: String,
    },

    /// Confidential-only grant on a public client
    #[error("client '{client}': option 'grant_types' should only have the '{grant}' value if it is of the confidential client type but it's of the public client type")]
    ClientGrantTypePublic {
        /// Client ID
        client: String,
        /// Grant type
        grant: &'static str,
    },

    /// `refresh_token` grant without an offline scope
    #[error("client '{client}': option 'grant_types' should only have the 'refresh_token' value if the client is also configured with the 'offline_access' scope")]
    ClientGrantTypeRefreshWithoutScope {
        /// Client ID
        client: String,
    },

    /// Installed-app redirect on a confidential client
    #[error("client '{client}': option 'redirect_uris' has the redirect uri '{uri}' when option 'public' is false but this is invalid as this uri is not valid for the openid connect confidential client type")]
    ClientRedirectUriPublicOnly {
        /// Client ID
        client: String,
        /// Redirect URI
        uri: String,
    },

    /// Redirect URI that cannot be parsed
    #[error("client '{client}': option 'redirect_uris' has an invalid value: redirect uri '{uri}' could not be parsed: {reason}")]
    ClientRedirectUriUnparseable {
        /// Client ID
        client: String,
        /// Redirect URI
        uri: String,
        /// Parser failure
        reason: String,
    },

    /// Redirect URI without a scheme
    #[error("client '{client}': option 'redirect_uris' has an invalid value: redirect uri '{uri}' must have a scheme but it's absent")]
    ClientRedirectUriNotAbsolute {
        /// Client ID
        client: String,
        /// Redirect URI
        uri: String,
    },

    /// Sector identifier with a component other than host/port
    #[error("client '{client}': option 'sector_identifier' with value '{value}': must be a URL with only the host component for example '{host}' but it has a {component}{detail}")]
    ClientSectorIdentifierComponent {
        /// Client ID
        client: String,
        /// Configured value
        value: String,
        /// Host that should have been configured
        host: String,
        /// Offending component
        component: &'static str,
        /// ` with the value 'x'` or empty
        detail: String,
    },

    /// Sector identifier without a host
    #[error("client '{client}': option 'sector_identifier' with value '{value}': must be a URL with only the host component but appears to be invalid")]
    ClientSectorIdentifierHost {
        /// Client ID
        client: String,
        /// Configured value
        value: String,
    },

    /// Both remote and inline public keys
    #[error("client '{client}': public_keys: option 'uri' must not be defined at the same time as option 'values'")]
    ClientPublicKeysBothConfigured {
        /// Client ID
        client: String,
    },

    /// JWKS URI that cannot be parsed
    #[error("client '{client}': public_keys: option 'uri' with value '{uri}' could not be parsed: {reason}")]
    ClientPublicKeysUriInvalid {
        /// Client ID
        client: String,
        /// Configured URI
        uri: String,
        /// Parser failure
        reason: String,
    },

    /// Non-HTTPS JWKS URI
    #[error("client '{client}': public_keys: option 'uri' must have the 'https' scheme but the scheme is '{scheme}'")]
    ClientPublicKeysUriScheme {
        /// Client ID
        client: String,
        /// Configured scheme
        scheme: String,
    },

    /// Request object algorithm with no matching inline key
    #[error("client '{client}': public_keys: option 'values' must contain at least one key with the algorithm configured in 'request_object_signing_alg', the available algorithms are {valid}")]
    ClientPublicKeysRequestObjectAlg {
        /// Client ID
        client: String,
        /// Algorithms found among the client's keys
        valid: String,
    },

    /// `none` authentication on a confidential, non-implicit client
    #[error("client '{client}': option 'token_endpoint_auth_method' must be one of {valid} when configured as the confidential client type unless it only includes implicit flow response types such as {implicit} but it's configured as '{got}'")]
    ClientAuthMethodNoneConfidential {
        /// Client ID
        client: String,
        /// Confidential methods
        valid: String,
        /// Implicit response types
        implicit: String,
        /// Configured method
        got: String,
    },

    /// Authentication on a public client
    #[error("client '{client}': option 'token_endpoint_auth_method' must be 'none' when configured as the public client type but it's configured as '{got}'")]
    ClientAuthMethodPublic {
        /// Client ID
        client: String,
        /// Configured method
        got: String,
    },

    /// Confidential client without a secret
    #[error("client '{client}': option 'secret' is required")]
    ClientMissingSecret {
        /// Client ID
        client: String,
    },

    /// Secret stored in plaintext
    #[error("client '{client}': option 'secret' is plaintext but for clients not using the 'token_endpoint_auth_method' of 'client_secret_jwt' it should be a hashed value as plaintext values are deprecated")]
    ClientPlaintextSecret {
        /// Client ID
        client: String,
    },

    /// Digest secret with `client_secret_jwt`
    #[error("client '{client}': option 'secret' must be plaintext with option 'token_endpoint_auth_method' with a value of 'client_secret_jwt'")]
    ClientSecretNotPlaintext {
        /// Client ID
        client: String,
    },

    /// Public client with a secret
    #[error("client '{client}': option 'secret' is required to be empty when option 'public' is true")]
    ClientPublicWithSecret {
        /// Client ID
        client: String,
    },

    /// Secret configured for a method that never uses it
    #[error("client '{client}': option 'secret' is required to be empty when option 'token_endpoint_auth_method' is configured as '{method}'")]
    ClientSecretUnused {
        /// Client ID
        client: String,
        /// Configured method
        method: String,
    },

    /// JWT authentication algorithm outside the allowed family
    #[error("client '{client}': option 'token_endpoint_auth_signing_alg' must be one of {valid} when option 'token_endpoint_auth_method' is configured to '{method}'")]
    ClientAuthSigningAlgInvalid {
        /// Client ID
        client: String,
        /// Accepted values
        valid: String,
        /// Configured method
        method: String,
    },

    /// `private_key_jwt` without an algorithm
    #[error("client '{client}': option 'token_endpoint_auth_signing_alg' is required when option 'token_endpoint_auth_method' is configured to 'private_key_jwt'")]
    ClientAuthSigningAlgMissing {
        /// Client ID
        client: String,
    },

    /// `private_key_jwt` with no key material
    #[error("client '{client}': option 'public_keys' is required with 'token_endpoint_auth_method' set to 'private_key_jwt'")]
    ClientPrivateKeyJwtMissingKeys {
        /// Client ID
        client: String,
    },

    /// `private_key_jwt` algorithm not offered by any inline key
    #[error("client '{client}': option 'token_endpoint_auth_signing_alg' must be one of the registered public key algorithm values {valid} when option 'token_endpoint_auth_method' is configured to '{method}'")]
    ClientAuthSigningAlgNotRegistered {
        /// Client ID
        client: String,
        /// Algorithms of the client's keys
        valid: String,
        /// Configured method
        method: String,
    },
}

impl ConfigIssue {
    /// Marks issues whose presence implies the client relies on behaviour
    /// that is deprecated (feeds the [`ConfigIssue::ClientsDeprecated`] rollup).
    #[must_use]
    pub fn is_deprecation(&self) -> bool {
        matches!(
            self,
            Self::ClientDuplicateEntries { .. }
                | Self::ClientRefreshWithoutCodeResponseType { .. }
                | Self::ClientGrantTypeMismatch { .. }
                | Self::ClientGrantTypeRefreshWithoutScope { .. }
        )
    }
}
