//! Signed CDN redirect tokens.
//!
//! The downstream CDN admits a redirect only when it can reproduce the HMAC
//! carried in the URL. The message layout is an interoperability contract
//! shared with the CDN's verifier and must not change:
//!
//! ```text
//! message = "exp=<expiry>~url=<path>"
//! key     = hex-decoded shared secret
//! token   = "exp=<expiry>[~algo=<algorithm>]~hmac=<lowercase-hex-digest>"
//! ```
//!
//! The `algo` parameter appears only for non-default algorithms so the common
//! case stays short. Expiry is an absolute epoch-seconds timestamp supplied
//! by the caller; this module performs no clock reads.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, KeyInit, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};

use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Algorithms
// ─────────────────────────────────────────────────────────────────────────────

/// Digest algorithm used for CDN token HMACs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenAlgorithm {
    /// HMAC-SHA256 (the implicit default; omitted from tokens).
    #[default]
    Sha256,
    /// HMAC-SHA512.
    Sha512,
}

impl TokenAlgorithm {
    /// The name used in token parameters and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

impl FromStr for TokenAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(Error::Config(format!("Unknown token algorithm: {other}"))),
        }
    }
}

impl fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token generation
// ─────────────────────────────────────────────────────────────────────────────

/// Compute a signed CDN token for `path`, valid until `expiry`.
///
/// Deterministic for fixed inputs; no side effects.
///
/// # Errors
///
/// Returns a bad-gateway-class error when `secret` is not valid hex, which
/// is a broken deployment configuration rather than a property of the
/// request.
pub fn generate_cdn_token(
    path: &str,
    secret: &str,
    expiry: i64,
    algorithm: TokenAlgorithm,
) -> Result<String> {
    let key = hex::decode(secret)
        .map_err(|_| Error::bad_gateway("CDN token secret is not valid hex"))?;

    let message = format!("exp={expiry}~url={path}");
    let digest = match algorithm {
        TokenAlgorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(&key)
                .map_err(|e| Error::bad_gateway(format!("CDN token secret rejected: {e}")))?;
            mac.update(message.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        TokenAlgorithm::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(&key)
                .map_err(|e| Error::bad_gateway(format!("CDN token secret rejected: {e}")))?;
            mac.update(message.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
    };

    Ok(match algorithm {
        TokenAlgorithm::Sha256 => format!("exp={expiry}~hmac={digest}"),
        other => format!("exp={expiry}~algo={other}~hmac={digest}"),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const VECTOR_PATH: &str = "/content/repo/manifests/123";
    const VECTOR_SECRET: &str = "abc123";
    const VECTOR_EXPIRY: i64 = 1_933_027_200;
    /// Agreed with the CDN verifier; must reproduce byte for byte.
    const VECTOR_HMAC: &str = "d039ac10e019fd13824a3f861b4f55df40e2a402d102b5266194fff6f3a24ed0";

    #[test]
    fn reproduces_the_cdn_interop_vector() {
        let token =
            generate_cdn_token(VECTOR_PATH, VECTOR_SECRET, VECTOR_EXPIRY, TokenAlgorithm::Sha256)
                .unwrap();
        assert!(token.contains(&format!("exp={VECTOR_EXPIRY}")));
        assert!(token.contains(&format!("hmac={VECTOR_HMAC}")));
    }

    #[test]
    fn default_algorithm_is_omitted_from_the_token() {
        let token =
            generate_cdn_token("/content/x", "ab", 100, TokenAlgorithm::Sha256).unwrap();
        assert!(!token.contains("algo="));
        assert_eq!(token.matches('~').count(), 1);
    }

    #[test]
    fn non_default_algorithm_is_named_in_the_token() {
        let token =
            generate_cdn_token("/content/x", "ab", 100, TokenAlgorithm::Sha512).unwrap();
        assert!(token.contains("algo=sha512"));
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate_cdn_token(VECTOR_PATH, VECTOR_SECRET, VECTOR_EXPIRY, TokenAlgorithm::Sha256)
            .unwrap();
        let b = generate_cdn_token(VECTOR_PATH, VECTOR_SECRET, VECTOR_EXPIRY, TokenAlgorithm::Sha256)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn changing_any_input_changes_the_digest() {
        let base =
            generate_cdn_token(VECTOR_PATH, VECTOR_SECRET, VECTOR_EXPIRY, TokenAlgorithm::Sha256)
                .unwrap();
        let digest_of = |token: &str| {
            token
                .split("hmac=")
                .nth(1)
                .map(str::to_string)
                .expect("token carries an hmac parameter")
        };

        let other_path = generate_cdn_token(
            "/content/repo/manifests/124",
            VECTOR_SECRET,
            VECTOR_EXPIRY,
            TokenAlgorithm::Sha256,
        )
        .unwrap();
        let other_secret =
            generate_cdn_token(VECTOR_PATH, "abc124", VECTOR_EXPIRY, TokenAlgorithm::Sha256)
                .unwrap();
        let other_expiry = generate_cdn_token(
            VECTOR_PATH,
            VECTOR_SECRET,
            VECTOR_EXPIRY + 1,
            TokenAlgorithm::Sha256,
        )
        .unwrap();
        let other_algorithm =
            generate_cdn_token(VECTOR_PATH, VECTOR_SECRET, VECTOR_EXPIRY, TokenAlgorithm::Sha512)
                .unwrap();

        assert_ne!(digest_of(&base), digest_of(&other_path));
        assert_ne!(digest_of(&base), digest_of(&other_secret));
        assert_ne!(digest_of(&base), digest_of(&other_expiry));
        assert_ne!(digest_of(&base), digest_of(&other_algorithm));
    }

    #[test]
    fn non_hex_secret_is_a_bad_gateway_error() {
        let err = generate_cdn_token("/content/x", "not-hex!", 100, TokenAlgorithm::Sha256)
            .unwrap_err();
        assert!(matches!(err, Error::BadGateway(Some(_))));
    }

    #[test]
    fn algorithm_parses_from_config_names() {
        assert_eq!("sha256".parse::<TokenAlgorithm>().unwrap(), TokenAlgorithm::Sha256);
        assert_eq!("sha512".parse::<TokenAlgorithm>().unwrap(), TokenAlgorithm::Sha512);
        assert!("md5".parse::<TokenAlgorithm>().is_err());
    }
}
