//! JSON Web Key material and the issuer Key Registry.
//!
//! Keys arrive JWK-shaped from configuration. This module never signs or
//! verifies anything: it decodes the public components, derives key IDs and
//! default algorithms, and checks that the material is fit to be handed to
//! an external signer.
//!
//! - [`KeyMaterial`]: decoded JWK members, tagged by `kty`
//! - [`chain`]: X.509 certificate chain parsing and key matching
//! - [`registry`]: per-key checks and the issuer [`KeyRegistry`]

pub mod chain;
pub mod registry;

use std::fmt;

use base64::{
    Engine,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use oidc_consts::{
    CURVE_P256, CURVE_P384, CURVE_P521, KEY_USE_SIGNATURE, SIGNING_ALG_ES256, SIGNING_ALG_ES384,
    SIGNING_ALG_ES512, SIGNING_ALG_RS256,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use registry::{KeyRegistry, KeyRole, SigningKey, check_key};

/// Minimum accepted RSA modulus size.
pub const RSA_MINIMUM_BITS: usize = 2048;

/// JWK key material
///
/// Members are kept base64url-encoded exactly as configured; decoding happens
/// on demand so a malformed member is reported rather than rejected at parse
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum KeyMaterial {
    /// RSA key
    #[serde(rename = "RSA")]
    Rsa {
        /// Modulus
        #[serde(default)]
        n: String,
        /// Public exponent
        #[serde(default)]
        e: String,
        /// Private exponent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },
    /// Elliptic curve key
    #[serde(rename = "EC")]
    Ec {
        /// Curve name
        #[serde(default)]
        crv: String,
        /// X coordinate
        #[serde(default)]
        x: String,
        /// Y coordinate
        #[serde(default)]
        y: String,
        /// Private scalar
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },
    /// Symmetric key
    #[serde(rename = "oct")]
    Oct {
        /// Key value
        #[serde(default)]
        k: String,
    },
    /// Octet key pair (Ed25519 and friends)
    #[serde(rename = "OKP")]
    Okp {
        /// Curve name
        #[serde(default)]
        crv: String,
        /// Public key
        #[serde(default)]
        x: String,
        /// Private key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },
}

/// Decoded public component of an RSA or EC key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicComponent {
    /// RSA modulus and exponent, big-endian, leading zeros stripped
    Rsa {
        /// Modulus
        modulus: Vec<u8>,
        /// Exponent
        exponent: Vec<u8>,
    },
    /// Uncompressed EC point (`0x04 || x || y`)
    Ec {
        /// Curve name
        curve: String,
        /// SEC1 uncompressed point
        point: Vec<u8>,
    },
    /// Symmetric or OKP material; no RSA/EC checks apply
    Other,
}

/// Use and algorithm inferred from the key itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProperties {
    /// Inferred `use`
    pub key_use: &'static str,
    /// Inferred `alg`
    pub algorithm: &'static str,
}

impl KeyMaterial {
    /// JWK `kty` value
    #[must_use]
    pub fn kty(&self) -> &'static str {
        match self {
            Self::Rsa { .. } => "RSA",
            Self::Ec { .. } => "EC",
            Self::Oct { .. } => "oct",
            Self::Okp { .. } => "OKP",
        }
    }

    /// Whether the private component is present
    #[must_use]
    pub fn is_private(&self) -> bool {
        match self {
            Self::Rsa { d, .. } | Self::Ec { d, .. } | Self::Okp { d, .. } => {
                d.as_deref().is_some_and(|d| !d.is_empty())
            }
            Self::Oct { .. } => true,
        }
    }

    /// Decode and sanity-check the public component.
    ///
    /// # Errors
    ///
    /// Returns a description of the first missing or undecodable member.
    pub fn public_component(&self) -> Result<PublicComponent, String> {
        match self {
            Self::Rsa { n, e, .. } => {
                let modulus = strip_leading_zeros(decode_member("n", n)?);
                let exponent = strip_leading_zeros(decode_member("e", e)?);
                if modulus.is_empty() || exponent.is_empty() {
                    return Err("the RSA modulus and exponent must be non-zero".to_string());
                }
                Ok(PublicComponent::Rsa { modulus, exponent })
            }
            Self::Ec { crv, x, y, .. } => {
                let size = curve_coordinate_size(crv)
                    .ok_or_else(|| format!("the curve '{crv}' is not supported"))?;
                let x = decode_member("x", x)?;
                let y = decode_member("y", y)?;
                if x.len() != size || y.len() != size {
                    return Err(format!(
                        "the coordinates for curve '{crv}' must be {size} bytes each"
                    ));
                }
                let mut point = Vec::with_capacity(1 + 2 * size);
                point.push(0x04);
                point.extend_from_slice(&x);
                point.extend_from_slice(&y);
                Ok(PublicComponent::Ec {
                    curve: crv.clone(),
                    point,
                })
            }
            Self::Oct { k } => {
                decode_member("k", k)?;
                Ok(PublicComponent::Other)
            }
            Self::Okp { x, .. } => {
                decode_member("x", x)?;
                Ok(PublicComponent::Other)
            }
        }
    }

    /// RFC 7638 thumbprint: lowercase hex SHA-256 of the canonical JWK.
    ///
    /// # Errors
    ///
    /// Returns an error if a required member is empty.
    pub fn thumbprint(&self) -> Result<String, String> {
        let canonical = match self {
            Self::Rsa { n, e, .. } => {
                format!(r#"{{"e":{},"kty":"RSA","n":{}}}"#, required("e", e)?, required("n", n)?)
            }
            Self::Ec { crv, x, y, .. } => format!(
                r#"{{"crv":{},"kty":"EC","x":{},"y":{}}}"#,
                required("crv", crv)?,
                required("x", x)?,
                required("y", y)?
            ),
            Self::Oct { k } => format!(r#"{{"k":{},"kty":"oct"}}"#, required("k", k)?),
            Self::Okp { crv, x, .. } => format!(
                r#"{{"crv":{},"kty":"OKP","x":{}}}"#,
                required("crv", crv)?,
                required("x", x)?
            ),
        };

        Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    /// Infer `use` and `alg` from the key type.
    ///
    /// # Errors
    ///
    /// Returns an error for key types or curves with no inferable algorithm.
    pub fn properties(&self) -> Result<KeyProperties, String> {
        let algorithm = match self {
            Self::Rsa { .. } => SIGNING_ALG_RS256,
            Self::Ec { crv, .. } => match crv.as_str() {
                CURVE_P256 => SIGNING_ALG_ES256,
                CURVE_P384 => SIGNING_ALG_ES384,
                CURVE_P521 => SIGNING_ALG_ES512,
                other => return Err(format!("the curve '{other}' is not supported")),
            },
            other => return Err(format!("the key type '{}' is not supported", other.kty())),
        };

        Ok(KeyProperties {
            key_use: KEY_USE_SIGNATURE,
            algorithm,
        })
    }
}

impl fmt::Display for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visibility = if self.is_private() { "private" } else { "public" };
        match self {
            Self::Rsa { .. } => write!(f, "RSA {visibility} key"),
            Self::Ec { crv, .. } => write!(f, "ECDSA {crv} {visibility} key"),
            Self::Oct { .. } => write!(f, "symmetric key"),
            Self::Okp { crv, .. } => write!(f, "OKP {crv} {visibility} key"),
        }
    }
}

/// Bit length of an RSA modulus (leading zeros already stripped)
#[must_use]
pub fn modulus_bits(modulus: &[u8]) -> usize {
    match modulus.first() {
        Some(first) => modulus.len() * 8 - first.leading_zeros() as usize,
        None => 0,
    }
}

fn curve_coordinate_size(crv: &str) -> Option<usize> {
    match crv {
        CURVE_P256 => Some(32),
        CURVE_P384 => Some(48),
        CURVE_P521 => Some(66),
        _ => None,
    }
}

fn decode_member(name: &str, value: &str) -> Result<Vec<u8>, String> {
    if value.is_empty() {
        return Err(format!("the '{name}' member is missing"));
    }
    URL_SAFE_NO_PAD
        .decode(value)
        .or_else(|_| URL_SAFE.decode(value))
        .map_err(|e| format!("the '{name}' member is not valid base64url: {e}"))
}

fn required(name: &str, value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err(format!("the '{name}' member is missing"));
    }
    serde_json::to_string(value).map_err(|e| e.to_string())
}

pub(crate) fn strip_leading_zeros(bytes: Vec<u8>) -> Vec<u8> {
    match bytes.iter().position(|b| *b != 0) {
        Some(0) => bytes,
        Some(start) => bytes[start..].to_vec(),
        None => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod test_keys {
    //! Key fixtures shared by the key, registry and client tests.

    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    use super::KeyMaterial;

    /// RSA key with a modulus of exactly `bits` bits.
    pub fn rsa(bits: usize, private: bool) -> KeyMaterial {
        let mut modulus = vec![0xA5; bits / 8];
        modulus[0] = 0xC3;
        KeyMaterial::Rsa {
            n: URL_SAFE_NO_PAD.encode(&modulus),
            e: "AQAB".to_string(),
            d: private.then(|| URL_SAFE_NO_PAD.encode([0x11; 32])),
        }
    }

    /// RSA key with a distinct modulus so thumbprints differ.
    pub fn rsa_seeded(seed: u8, private: bool) -> KeyMaterial {
        let mut modulus = vec![seed; 256];
        modulus[0] = 0xC3;
        KeyMaterial::Rsa {
            n: URL_SAFE_NO_PAD.encode(&modulus),
            e: "AQAB".to_string(),
            d: private.then(|| URL_SAFE_NO_PAD.encode([0x11; 32])),
        }
    }

    /// EC key on `crv` with synthetic coordinates.
    pub fn ec(crv: &str, private: bool) -> KeyMaterial {
        let size = match crv {
            "P-384" => 48,
            "P-521" => 66,
            _ => 32,
        };
        KeyMaterial::Ec {
            crv: crv.to_string(),
            x: URL_SAFE_NO_PAD.encode(vec![0x01; size]),
            y: URL_SAFE_NO_PAD.encode(vec![0x02; size]),
            d: private.then(|| URL_SAFE_NO_PAD.encode(vec![0x03; size])),
        }
    }

    /// EC P-256 key built from an uncompressed SEC1 point.
    pub fn ec_from_point(point: &[u8], private: bool) -> KeyMaterial {
        KeyMaterial::Ec {
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(&point[1..33]),
            y: URL_SAFE_NO_PAD.encode(&point[33..65]),
            d: private.then(|| URL_SAFE_NO_PAD.encode([0x03; 32])),
        }
    }
}
