//! Entitlement client certificates.
//!
//! The mutual-TLS terminator in front of the gateway forwards the client
//! certificate as PEM in a request header. A certificate counts as an
//! entitlement certificate when it carries at least one entitled-content-path
//! extension under the `1.3.6.1.4.1.2312.9.2` arc. Everything else (no
//! header, an empty value, unparsable PEM, a plain TLS client cert) is the
//! normal anonymous state, represented as "no certificate" and never as an
//! error. The authorization engine decides what anonymity means per request.

use axum::http::HeaderMap;
use tracing::debug;
use x509_parser::pem::parse_x509_pem;

/// Request header carrying the client certificate PEM, set by the TLS
/// terminator.
pub const CLIENT_CERT_HEADER: &str = "x-ssl-client-cert";

/// OID arc for entitled-content-path extensions; the full OID is
/// `<arc><content-set-id><leaf>`.
const CONTENT_PATH_ARC: &str = "1.3.6.1.4.1.2312.9.2.";
const CONTENT_PATH_LEAF: &str = ".1.6";

// ─────────────────────────────────────────────────────────────────────────────
// Certificate
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed entitlement certificate.
///
/// The only capability the authorization engine uses is
/// [`EntitlementCertificate::check_path`]; the entitled paths themselves stay
/// private to this module.
#[derive(Debug, Clone)]
pub struct EntitlementCertificate {
    paths: Vec<String>,
}

impl EntitlementCertificate {
    /// Parse a PEM-encoded certificate.
    ///
    /// Returns `None` unless the certificate parses and carries at least one
    /// entitled content path.
    #[must_use]
    pub fn from_pem(pem: &str) -> Option<Self> {
        let (_, parsed) = parse_x509_pem(pem.as_bytes()).ok()?;
        let cert = parsed.parse_x509().ok()?;

        let paths: Vec<String> = cert
            .extensions()
            .iter()
            .filter(|ext| {
                let oid = ext.oid.to_id_string();
                oid.starts_with(CONTENT_PATH_ARC) && oid.ends_with(CONTENT_PATH_LEAF)
            })
            .filter_map(|ext| decode_der_string(ext.value))
            .collect();

        if paths.is_empty() {
            None
        } else {
            Some(Self { paths })
        }
    }

    /// Whether this certificate entitles access to `candidate`.
    ///
    /// A candidate is entitled when any entitled path, compared segment by
    /// segment with `$variable` segments matching any single candidate
    /// segment, is a prefix of (or equal to) the candidate. Surrounding `/`
    /// on either side is ignored.
    #[must_use]
    pub fn check_path(&self, candidate: &str) -> bool {
        let candidate: Vec<&str> = candidate.trim_matches('/').split('/').collect();
        self.paths.iter().any(|p| path_entitles(p, &candidate))
    }

    /// Number of entitled content paths, for startup/debug logging.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    #[cfg(test)]
    pub(crate) fn with_paths(paths: Vec<String>) -> Self {
        Self { paths }
    }
}

fn path_entitles(pattern: &str, candidate: &[&str]) -> bool {
    let pattern: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    if pattern.len() > candidate.len() {
        return false;
    }
    pattern
        .iter()
        .zip(candidate)
        .all(|(p, c)| p.starts_with('$') || p == c)
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction from transport metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Pull the entitlement certificate from request transport metadata.
///
/// Reads [`CLIENT_CERT_HEADER`]; absent, empty, unparsable, or
/// non-entitlement values all yield `None`.
#[must_use]
pub fn extract_certificate(headers: &HeaderMap) -> Option<EntitlementCertificate> {
    let raw = headers.get(CLIENT_CERT_HEADER)?.to_str().ok()?;
    if raw.trim().is_empty() {
        return None;
    }
    let cert = EntitlementCertificate::from_pem(&unfold_pem(raw));
    if cert.is_none() {
        debug!("Client certificate present but not an entitlement certificate");
    }
    cert
}

/// Restore a PEM that a terminator folded onto one header line.
///
/// Header values cannot carry newlines, so terminators replace them with
/// spaces; the base64 body never contains spaces itself, making the reverse
/// substitution unambiguous.
fn unfold_pem(raw: &str) -> String {
    const BEGIN: &str = "-----BEGIN CERTIFICATE-----";
    const END: &str = "-----END CERTIFICATE-----";

    let raw = raw.trim();
    if raw.contains('\n') {
        return raw.to_string();
    }
    match (raw.find(BEGIN), raw.find(END)) {
        (Some(begin), Some(end)) if end > begin => {
            let body = raw[begin + BEGIN.len()..end].trim().replace(' ', "\n");
            format!("{BEGIN}\n{body}\n{END}\n")
        }
        _ => raw.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DER string decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Decode the payload of a content-path extension.
///
/// Payloads in the wild are DER UTF8String, IA5String, or PrintableString,
/// occasionally wrapped in an OCTET STRING; unknown tags fall back to lossy
/// UTF-8 of the raw bytes. Empty payloads decode to `None`.
fn decode_der_string(raw: &[u8]) -> Option<String> {
    let text = match raw {
        [tag @ (0x04 | 0x0c | 0x13 | 0x16), rest @ ..] => {
            let (len, consumed) = der_length(rest)?;
            let body = rest.get(consumed..consumed + len)?;
            if *tag == 0x04 && matches!(body.first(), Some(0x0c | 0x13 | 0x16)) {
                return decode_der_string(body);
            }
            String::from_utf8_lossy(body).into_owned()
        }
        _ => String::from_utf8_lossy(raw).into_owned(),
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse a DER length field, returning `(length, bytes consumed)`.
///
/// Lengths beyond two bytes do not occur in certificate extensions.
fn der_length(raw: &[u8]) -> Option<(usize, usize)> {
    match *raw.first()? {
        n @ 0..=0x7f => Some((n as usize, 1)),
        0x81 => Some((*raw.get(1)? as usize, 2)),
        0x82 => Some(((usize::from(*raw.get(1)?) << 8) | usize::from(*raw.get(2)?), 3)),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
