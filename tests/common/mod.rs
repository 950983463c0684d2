//! Shared helpers for integration tests.

#![allow(dead_code)]

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use oidc_policy::config::{ClientConfig, JwkConfig, OidcConfig};
use oidc_policy::keys::KeyMaterial;

pub const DIGEST_SECRET: &str = "$pbkdf2-sha512$310000$c8p78n7pUMln0jzvd4aK4Q$JNRBzwAo0ek5qKn50cFzzvE9RXV88h1wJn5KGiHrD0YKtZaR/nCb2CJPOsKaPK0hjf.9yHxzQGZziziccp6Yng";

/// RSA key whose modulus has exactly `bits` bits
pub fn rsa_key(bits: usize, seed: u8, private: bool) -> KeyMaterial {
    let mut modulus = vec![seed; bits / 8];
    modulus[0] = 0xC3;
    KeyMaterial::Rsa {
        n: URL_SAFE_NO_PAD.encode(&modulus),
        e: "AQAB".to_string(),
        d: private.then(|| URL_SAFE_NO_PAD.encode([0x11; 32])),
    }
}

/// Issuer key entry with an explicit key ID
pub fn issuer_jwk(key_id: &str, bits: usize) -> JwkConfig {
    JwkConfig {
        key_id: key_id.to_string(),
        key: Some(rsa_key(bits, 0xA5, true)),
        ..Default::default()
    }
}

/// Parse a client from YAML
pub fn client(yaml: &str) -> ClientConfig {
    serde_yaml::from_str(yaml).expect("client fixture must parse")
}

/// One 2048-bit RS256 issuer key plus `clients`
pub fn config_with(clients: Vec<ClientConfig>) -> OidcConfig {
    OidcConfig {
        jwks: vec![issuer_jwk("main", 2048)],
        clients,
        ..Default::default()
    }
}

/// A confidential client with a digest secret
pub fn confidential(id: &str) -> ClientConfig {
    ClientConfig {
        id: id.to_string(),
        secret: Some(DIGEST_SECRET.to_string()),
        redirect_uris: vec!["https://app.example.com/callback".to_string()],
        ..Default::default()
    }
}

/// [`confidential`] registered for bearer authorization
pub fn bearer_client(id: &str) -> ClientConfig {
    ClientConfig {
        scopes: vec!["openid".to_string(), "bearer.authz".to_string()],
        ..confidential(id)
    }
}
