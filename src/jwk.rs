//! JOSE-adjacent JSON wire format for keys and ciphertexts (§6), feature-gated
//! behind `serde` (it needs `serde_json` and `base64` beyond the native
//! `serde::Serialize`/`Deserialize` impls in [`crate::serde`]).
//!
//! Big integers in key material are base64url-without-padding of their
//! big-endian unsigned bytes; ciphertext values are plain decimal strings
//! "to match the interoperable wire format" the CLI talks to.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rug::Integer;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{DecryptionKey, EncryptionKey};

fn encode_bigint(x: &Integer) -> String {
    URL_SAFE_NO_PAD.encode(x.to_digits::<u8>(rug::integer::Order::Msf))
}

fn decode_bigint(s: &str) -> Result<Integer> {
    let bytes = URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| Error::InvalidArgument(format!("invalid base64 in key material: {e}")))?;
    Ok(Integer::from_digits(&bytes, rug::integer::Order::Msf))
}

#[derive(Serialize, Deserialize)]
struct PublicKeyWire {
    alg: String,
    kty: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    kid: Option<String>,
    n: String,
    key_ops: Vec<String>,
}

/// The public-key JSON object of §6: `{"alg":"PAI-GN1","kty":"DAJ",...}`.
#[derive(Debug, Clone)]
pub struct PublicKeyDocument {
    pub key: EncryptionKey,
    pub kid: Option<String>,
}

impl PublicKeyDocument {
    pub fn to_json(&self) -> Result<String> {
        let wire = PublicKeyWire {
            alg: "PAI-GN1".to_string(),
            kty: "DAJ".to_string(),
            kid: self.kid.clone(),
            n: encode_bigint(self.key.n()),
            key_ops: vec!["encrypt".to_string()],
        };
        serde_json::to_string(&wire)
            .map_err(|e| Error::InvalidArgument(format!("failed to serialize public key: {e}")))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let wire: PublicKeyWire = serde_json::from_str(s)
            .map_err(|e| Error::InvalidArgument(format!("failed to parse public key: {e}")))?;
        if wire.kty != "DAJ" {
            return Err(Error::InvalidArgument(format!("unsupported kty: {}", wire.kty)));
        }
        if wire.alg != "PAI-GN1" {
            return Err(Error::InvalidArgument(format!("unsupported alg: {}", wire.alg)));
        }
        let n = decode_bigint(&wire.n)?;
        Ok(Self {
            key: EncryptionKey::from_n(n),
            kid: wire.kid,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct PrivateKeyWire {
    kty: String,
    key_ops: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    kid: Option<String>,
    #[serde(rename = "pub")]
    public: PublicKeyWire,
    lambda: String,
    mu: String,
}

/// The private-key JSON object of §6. Stored in the λ/μ (totient) form;
/// `p`, `q` are recovered internally at load time for CRT decryption.
#[derive(Debug, Clone)]
pub struct PrivateKeyDocument {
    pub key: DecryptionKey,
    pub kid: Option<String>,
}

impl PrivateKeyDocument {
    pub fn to_json(&self) -> Result<String> {
        let wire = PrivateKeyWire {
            kty: "DAJ".to_string(),
            key_ops: vec!["decrypt".to_string()],
            kid: self.kid.clone(),
            public: PublicKeyWire {
                alg: "PAI-GN1".to_string(),
                kty: "DAJ".to_string(),
                kid: self.kid.clone(),
                n: encode_bigint(self.key.n()),
                key_ops: vec!["encrypt".to_string()],
            },
            lambda: encode_bigint(self.key.lambda()),
            mu: encode_bigint(self.key.mu()),
        };
        serde_json::to_string(&wire)
            .map_err(|e| Error::InvalidArgument(format!("failed to serialize private key: {e}")))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let wire: PrivateKeyWire = serde_json::from_str(s)
            .map_err(|e| Error::InvalidArgument(format!("failed to parse private key: {e}")))?;
        if wire.kty != "DAJ" {
            return Err(Error::InvalidArgument(format!("unsupported kty: {}", wire.kty)));
        }
        let n = decode_bigint(&wire.public.n)?;
        let lambda = decode_bigint(&wire.lambda)?;
        let key = DecryptionKey::from_totient(n, lambda)?;
        Ok(Self { key, kid: wire.kid })
    }
}

#[derive(Serialize, Deserialize)]
struct CiphertextWire {
    v: String,
    e: i64,
}

/// The ciphertext JSON object of §6: `v` is decimal (not base64url) "to
/// match the interoperable wire format".
pub struct CiphertextDocument {
    pub ciphertext: Integer,
    pub exponent: i64,
}

impl CiphertextDocument {
    pub fn to_json(&self) -> Result<String> {
        let wire = CiphertextWire {
            v: self.ciphertext.to_string(),
            e: self.exponent,
        };
        serde_json::to_string(&wire)
            .map_err(|e| Error::InvalidArgument(format!("failed to serialize ciphertext: {e}")))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let wire: CiphertextWire = serde_json::from_str(s)
            .map_err(|e| Error::InvalidArgument(format!("failed to parse ciphertext: {e}")))?;
        let ciphertext = wire
            .v
            .parse::<Integer>()
            .map_err(|e| Error::InvalidArgument(format!("invalid ciphertext decimal string: {e}")))?;
        Ok(Self {
            ciphertext,
            exponent: wire.e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_round_trips_through_json() {
        let key = EncryptionKey::from_n(Integer::from(101_u32 * 103_u32));
        let doc = PublicKeyDocument {
            key,
            kid: Some("test".to_string()),
        };
        let json = doc.to_json().unwrap();
        assert!(json.contains("PAI-GN1"));
        let parsed = PublicKeyDocument::from_json(&json).unwrap();
        assert_eq!(parsed.key, doc.key);
    }

    #[test]
    fn private_key_round_trips_through_totient_form() {
        let dk = DecryptionKey::from_primes(Integer::from(809), Integer::from(677)).unwrap();
        let doc = PrivateKeyDocument { key: dk.clone(), kid: None };
        let json = doc.to_json().unwrap();
        let parsed = PrivateKeyDocument::from_json(&json).unwrap();
        assert_eq!(parsed.key.n(), dk.n());
        assert_eq!(parsed.key.lambda(), dk.lambda());
    }

    #[test]
    fn ciphertext_uses_decimal_not_base64() {
        let doc = CiphertextDocument {
            ciphertext: Integer::from(12345),
            exponent: -3,
        };
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"12345\""));
        assert!(json.contains("\"e\":-3"));
    }
}
