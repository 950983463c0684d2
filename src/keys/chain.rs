//! X.509 certificate chains attached to keys.
//!
//! Entries are PEM blocks (one entry may hold several) or bare base64 DER,
//! as in a JWK `x5c` member. The chain is leaf first.

use base64::{Engine, engine::general_purpose::STANDARD};
use x509_parser::{
    certificate::X509Certificate,
    parse_x509_certificate,
    pem::Pem,
    public_key::PublicKey,
};

use super::{PublicComponent, strip_leading_zeros};

/// Parsed certificate chain, leaf first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChain {
    ders: Vec<Vec<u8>>,
}

impl CertificateChain {
    /// Decode configured entries into DER certificates.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is neither PEM nor base64 DER.
    pub fn parse(entries: &[String]) -> Result<Self, String> {
        let mut ders = Vec::new();

        for (i, entry) in entries.iter().enumerate() {
            let entry = entry.trim();
            if entry.starts_with("-----BEGIN") {
                for pem in Pem::iter_from_buffer(entry.as_bytes()) {
                    let pem = pem.map_err(|e| format!("certificate #{}: invalid PEM: {e}", i + 1))?;
                    if pem.label != "CERTIFICATE" {
                        return Err(format!(
                            "certificate #{}: unexpected PEM block '{}'",
                            i + 1,
                            pem.label
                        ));
                    }
                    ders.push(pem.contents);
                }
            } else {
                let compact: String = entry.split_whitespace().collect();
                let der = STANDARD
                    .decode(compact)
                    .map_err(|e| format!("certificate #{}: invalid base64 DER: {e}", i + 1))?;
                ders.push(der);
            }
        }

        Ok(Self { ders })
    }

    /// Number of certificates
    #[must_use]
    pub fn len(&self) -> usize {
        self.ders.len()
    }

    /// Whether the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ders.is_empty()
    }

    /// Check every certificate parses, is currently valid, and was issued by
    /// the certificate that follows it.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let certs = self.certificates()?;

        for (i, cert) in certs.iter().enumerate() {
            if !cert.validity().is_valid() {
                return Err(format!(
                    "certificate #{} for subject '{}' is not valid at the current time (valid from {} until {})",
                    i + 1,
                    cert.subject(),
                    cert.validity().not_before,
                    cert.validity().not_after
                ));
            }

            if let Some(next) = certs.get(i + 1) {
                if cert.issuer().as_raw() != next.subject().as_raw() {
                    return Err(format!(
                        "certificate #{} with subject '{}' was not issued by certificate #{} with subject '{}'",
                        i + 1,
                        cert.subject(),
                        i + 2,
                        next.subject()
                    ));
                }
            }
        }

        Ok(())
    }

    /// Whether the leaf certificate carries `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the leaf or its public key cannot be parsed.
    pub fn leaf_matches(&self, key: &PublicComponent) -> Result<bool, String> {
        let Some(der) = self.ders.first() else {
            return Ok(false);
        };
        let (_, leaf) = parse_x509_certificate(der)
            .map_err(|e| format!("certificate #1 could not be parsed: {e}"))?;
        let parsed = leaf
            .public_key()
            .parsed()
            .map_err(|e| format!("certificate #1 public key could not be parsed: {e}"))?;

        Ok(match (parsed, key) {
            (PublicKey::RSA(rsa), PublicComponent::Rsa { modulus, exponent }) => {
                strip_leading_zeros(rsa.modulus.to_vec()) == *modulus
                    && strip_leading_zeros(rsa.exponent.to_vec()) == *exponent
            }
            (PublicKey::EC(ec), PublicComponent::Ec { point, .. }) => ec.data() == point.as_slice(),
            _ => false,
        })
    }

    fn certificates(&self) -> Result<Vec<X509Certificate<'_>>, String> {
        self.ders
            .iter()
            .enumerate()
            .map(|(i, der)| {
                parse_x509_certificate(der)
                    .map(|(_, cert)| cert)
                    .map_err(|e| format!("certificate #{} could not be parsed: {e}", i + 1))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::test_keys;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, date_time_ymd};

    fn self_signed(cn: &str, expired: bool) -> (rcgen::Certificate, KeyPair) {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, cn);
        params.distinguished_name = dn;
        if expired {
            params.not_before = date_time_ymd(2000, 1, 1);
            params.not_after = date_time_ymd(2001, 1, 1);
        }
        let key_pair = KeyPair::generate().expect("key generation failed");
        let cert = params.self_signed(&key_pair).expect("self-signed cert");
        (cert, key_pair)
    }

    #[test]
    fn parses_pem_and_base64_der() {
        // GIVEN: one certificate as PEM, another as base64 DER
        let (a, _) = self_signed("a", false);
        let (b, _) = self_signed("b", false);
        let entries = vec![a.pem(), STANDARD.encode(b.der())];

        // WHEN: parsing
        let chain = CertificateChain::parse(&entries).unwrap();

        // THEN: both are decoded
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn rejects_garbage() {
        let err = CertificateChain::parse(&["not base64!".to_string()]).unwrap_err();
        assert!(err.contains("certificate #1"), "{err}");
    }

    #[test]
    fn single_self_signed_certificate_validates() {
        let (cert, _) = self_signed("leaf", false);
        let chain = CertificateChain::parse(&[cert.pem()]).unwrap();
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn expired_certificate_is_invalid() {
        let (cert, _) = self_signed("old", true);
        let chain = CertificateChain::parse(&[cert.pem()]).unwrap();
        let err = chain.validate().unwrap_err();
        assert!(err.contains("not valid at the current time"), "{err}");
    }

    #[test]
    fn unrelated_certificates_are_out_of_order() {
        // GIVEN: two independent self-signed certificates
        let (a, _) = self_signed("first", false);
        let (b, _) = self_signed("second", false);
        let chain = CertificateChain::parse(&[a.pem(), b.pem()]).unwrap();

        // WHEN/THEN: the first was not issued by the second
        let err = chain.validate().unwrap_err();
        assert!(err.contains("was not issued by certificate #2"), "{err}");
    }

    #[test]
    fn leaf_matches_its_own_ec_key_only() {
        // GIVEN: a certificate and the JWK form of its key
        let (cert, key_pair) = self_signed("leaf", false);
        let own = test_keys::ec_from_point(key_pair.public_key_raw(), true);
        let other = test_keys::ec("P-256", true);
        let chain = CertificateChain::parse(&[cert.pem()]).unwrap();

        // THEN: only the matching key is accepted
        assert!(chain.leaf_matches(&own.public_component().unwrap()).unwrap());
        assert!(!chain.leaf_matches(&other.public_component().unwrap()).unwrap());
        assert!(
            !chain
                .leaf_matches(&test_keys::rsa(2048, true).public_component().unwrap())
                .unwrap()
        );
    }
}
