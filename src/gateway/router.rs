//! HTTP router and handlers
//!
//! Every content endpoint runs an [`Authorizer`] guard over one catalog
//! snapshot before touching the record it serves; denials surface as the
//! single `404 Not Found` the error type renders.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::DISTRIBUTION_API_VERSION;
use crate::authz::Authorizer;
use crate::catalog::CatalogStore;
use crate::config::CdnConfig;
use crate::entitlement::extract_certificate;
use crate::token::generate_cdn_token;
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Live catalog store
    pub store: Arc<CatalogStore>,
    /// CDN redirect settings
    pub cdn: CdnConfig,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v2/", get(v2_probe_handler))
        // Repository ids may carry an optional namespace segment, so each v1
        // repository endpoint is registered in both shapes.
        .route("/v1/repositories/{repo}/images", get(repo_images_handler))
        .route(
            "/v1/repositories/{namespace}/{repo}/images",
            get(namespaced_repo_images_handler),
        )
        .route("/v1/repositories/{repo}/tags", get(repo_tags_handler))
        .route(
            "/v1/repositories/{namespace}/{repo}/tags",
            get(namespaced_repo_tags_handler),
        )
        .route("/v1/images/{image_id}/{file}", get(image_file_handler))
        .route("/v2/{*path}", get(v2_redirect_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Probes
// ─────────────────────────────────────────────────────────────────────────────

/// GET /health - liveness probe
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /v2/ - API version probe
async fn v2_probe_handler() -> impl IntoResponse {
    (
        [("Docker-Distribution-API-Version", DISTRIBUTION_API_VERSION)],
        Json(json!({})),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// v1 repository endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// GET /v1/repositories/{repo}/images
async fn repo_images_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(repo): Path<String>,
) -> Result<Json<Value>> {
    repo_images(&state, &headers, &repo)
}

/// GET /v1/repositories/{namespace}/{repo}/images
async fn namespaced_repo_images_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((namespace, repo)): Path<(String, String)>,
) -> Result<Json<Value>> {
    repo_images(&state, &headers, &format!("{namespace}/{repo}"))
}

/// GET /v1/repositories/{repo}/tags
async fn repo_tags_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(repo): Path<String>,
) -> Result<Json<Value>> {
    repo_tags(&state, &headers, &repo)
}

/// GET /v1/repositories/{namespace}/{repo}/tags
async fn namespaced_repo_tags_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((namespace, repo)): Path<(String, String)>,
) -> Result<Json<Value>> {
    repo_tags(&state, &headers, &format!("{namespace}/{repo}"))
}

fn repo_images(state: &AppState, headers: &HeaderMap, raw_id: &str) -> Result<Json<Value>> {
    let snapshot = state.store.snapshot();
    let certificate = extract_certificate(headers);
    let id = Authorizer::new(&snapshot, certificate.as_ref()).authorize_repo_id(raw_id)?;

    let record = snapshot.repo(&id).ok_or(Error::NotFound)?;
    let images: Vec<Value> = record.image_ids.iter().map(|id| json!({ "id": id })).collect();
    Ok(Json(Value::Array(images)))
}

fn repo_tags(state: &AppState, headers: &HeaderMap, raw_id: &str) -> Result<Json<Value>> {
    let snapshot = state.store.snapshot();
    let certificate = extract_certificate(headers);
    let id = Authorizer::new(&snapshot, certificate.as_ref()).authorize_repo_id(raw_id)?;

    let record = snapshot.repo(&id).ok_or(Error::NotFound)?;
    Ok(Json(json!(record.tags)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Redirect endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// GET /v1/images/{image_id}/{file} - signed redirect to the image file
async fn image_file_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((image_id, file)): Path<(String, String)>,
) -> Result<Response> {
    let snapshot = state.store.snapshot();
    let certificate = extract_certificate(&headers);
    let image =
        Authorizer::new(&snapshot, certificate.as_ref()).authorize_image_id(&image_id)?;

    debug!(image_id = %image_id, repo = %image.repo_id, "Redirecting image request");
    signed_redirect(&state.cdn, &format!("{}/{image_id}/{file}", image.content_path))
}

/// GET /v2/{*path} - signed redirect to v2 content
async fn v2_redirect_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Result<Response> {
    let snapshot = state.store.snapshot();
    let certificate = extract_certificate(&headers);
    let resolved = Authorizer::new(&snapshot, certificate.as_ref()).authorize_name(&path)?;

    // The guard already proved the record exists.
    let record = snapshot.v2_repo(&resolved.name).ok_or(Error::NotFound)?;
    debug!(name = %resolved.name, component = %resolved.kind, "Redirecting v2 request");
    signed_redirect(&state.cdn, &format!("{}/{}", record.content_path, resolved.sub_path))
}

/// Build a `302 Found` redirect to the CDN, signed when a secret is
/// configured.
///
/// The token covers the CDN path only, not the absolute URL, and rides as
/// the query string verbatim - both halves of the contract with the CDN's
/// verifier.
fn signed_redirect(cdn: &CdnConfig, content_path: &str) -> Result<Response> {
    let location = if cdn.secret.is_empty() {
        format!("{}{}", cdn.base_url, content_path)
    } else {
        let expiry = Utc::now().timestamp() + cdn.token_ttl_secs as i64;
        let token = generate_cdn_token(content_path, &cdn.secret, expiry, cdn.algorithm)?;
        format!("{}{}?{}", cdn.base_url, content_path, token)
    };

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_redirect_has_no_query_string() {
        let cdn = CdnConfig::default();
        let response = signed_redirect(&cdn, "/content/foo/images/abc").unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(location, "/content/foo/images/abc");
    }

    #[test]
    fn signed_redirect_carries_token_parameters() {
        let cdn = CdnConfig {
            base_url: "https://cdn.example.com".to_string(),
            secret: "abc123".to_string(),
            ..CdnConfig::default()
        };
        let response = signed_redirect(&cdn, "/content/foo/images/abc").unwrap();
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://cdn.example.com/content/foo/images/abc?exp="));
        assert!(location.contains("~hmac="));
    }

    #[test]
    fn bad_secret_surfaces_as_bad_gateway() {
        let cdn = CdnConfig {
            secret: "not-hex!".to_string(),
            ..CdnConfig::default()
        };
        let err = signed_redirect(&cdn, "/content/foo").unwrap_err();
        assert!(matches!(err, Error::BadGateway(Some(_))));
    }
}
