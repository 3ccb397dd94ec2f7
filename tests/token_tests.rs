//! CDN token contract tests
//!
//! The message layout behind the HMAC is an interoperability contract with
//! the downstream CDN's verifier; the fixed vector here was agreed with that
//! verifier and must never drift.

use registry_gateway::token::{TokenAlgorithm, generate_cdn_token};

const PATH: &str = "/content/repo/manifests/123";
const SECRET: &str = "abc123";
const EXPIRY: i64 = 1_933_027_200;
const EXPECTED_HMAC: &str = "d039ac10e019fd13824a3f861b4f55df40e2a402d102b5266194fff6f3a24ed0";

#[test]
fn fixed_vector_reproduces_exactly() {
    let token = generate_cdn_token(PATH, SECRET, EXPIRY, TokenAlgorithm::Sha256).unwrap();
    assert_eq!(token, format!("exp={EXPIRY}~hmac={EXPECTED_HMAC}"));
}

#[test]
fn tokens_are_deterministic_across_calls() {
    let first = generate_cdn_token(PATH, SECRET, EXPIRY, TokenAlgorithm::Sha256).unwrap();
    for _ in 0..8 {
        let again = generate_cdn_token(PATH, SECRET, EXPIRY, TokenAlgorithm::Sha256).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn adjacent_inputs_never_collide() {
    let digest = |path: &str, secret: &str, expiry: i64| {
        let token = generate_cdn_token(path, secret, expiry, TokenAlgorithm::Sha256).unwrap();
        token.split("hmac=").nth(1).unwrap().to_string()
    };

    let base = digest(PATH, SECRET, EXPIRY);
    assert_ne!(base, digest("/content/repo/manifests/12", SECRET, EXPIRY));
    assert_ne!(base, digest("/content/repo/manifests/1234", SECRET, EXPIRY));
    assert_ne!(base, digest(PATH, "abc124", EXPIRY));
    assert_ne!(base, digest(PATH, SECRET, EXPIRY - 1));
    assert_ne!(base, digest(PATH, SECRET, EXPIRY + 1));
}

#[test]
fn sha512_tokens_name_their_algorithm() {
    let token = generate_cdn_token(PATH, SECRET, EXPIRY, TokenAlgorithm::Sha512).unwrap();
    assert!(token.starts_with(&format!("exp={EXPIRY}~algo=sha512~hmac=")));
    // SHA-512 digests are 128 hex characters.
    assert_eq!(token.split("hmac=").nth(1).unwrap().len(), 128);
}

#[test]
fn digest_is_lowercase_hex() {
    let token = generate_cdn_token(PATH, SECRET, EXPIRY, TokenAlgorithm::Sha256).unwrap();
    let digest = token.split("hmac=").nth(1).unwrap();
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}
