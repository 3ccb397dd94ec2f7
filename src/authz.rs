//! Authorization engine.
//!
//! Composes path normalization, the catalog snapshot, and the client's
//! entitlement certificate into one allow/deny decision per request. Handlers
//! run only after a guard returns `Ok`.
//!
//! # One denial, one status
//!
//! Every non-allow outcome (malformed identifier, unknown record, missing
//! certificate, entitlement mismatch) is the same [`Error::NotFound`].
//! Collapsing the reasons is deliberate: distinct statuses would hand
//! unauthorized callers an oracle for which repositories exist. Do not make
//! these errors more specific.
//!
//! # Decision flow
//!
//! ```text
//! identifier valid? ── no ──▶ NotFound
//!   │ yes
//! record found? ────── no ──▶ NotFound
//!   │ yes
//! protected? ───────── no ──▶ Allow
//!   │ yes
//! certificate present and entitled? ── no ──▶ NotFound
//!   │ yes
//! Allow
//! ```

use tracing::debug;

use crate::catalog::{Catalog, ImageRef};
use crate::entitlement::EntitlementCertificate;
use crate::paths::{self, ResolvedName};
use crate::{Error, Result};

/// Per-request authorization guard.
///
/// Borrows one catalog snapshot and the certificate presented with this
/// request (if any); both live exactly as long as the decision. Certificates
/// are never cached across requests, so a decision always reflects the
/// presenting client.
pub struct Authorizer<'a> {
    catalog: &'a Catalog,
    certificate: Option<&'a EntitlementCertificate>,
}

impl<'a> Authorizer<'a> {
    /// Create a guard over a catalog snapshot and an optional certificate.
    #[must_use]
    pub fn new(catalog: &'a Catalog, certificate: Option<&'a EntitlementCertificate>) -> Self {
        Self {
            catalog,
            certificate,
        }
    }

    /// Authorize access to a legacy repository, returning its canonical id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] on any denial.
    pub fn authorize_repo_id(&self, raw: &str) -> Result<String> {
        let id = paths::normalize_repo_id(raw)?;
        let record = self.catalog.repo(&id).ok_or(Error::NotFound)?;
        if record.protected {
            self.require_entitlement(&id)?;
        }
        Ok(id)
    }

    /// Authorize access to a v2-style path, returning its resolved parts.
    ///
    /// The entitlement is checked against the resolved repository name, not
    /// the component sub-path.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] on any denial.
    pub fn authorize_name(&self, raw: &str) -> Result<ResolvedName> {
        let resolved = paths::normalize_repo_name(raw)?;
        let record = self.catalog.v2_repo(&resolved.name).ok_or(Error::NotFound)?;
        if record.protected {
            self.require_entitlement(&resolved.name)?;
        }
        Ok(resolved)
    }

    /// Authorize access to an image id, returning the first containing
    /// repository that grants it.
    ///
    /// Unprotected membership wins outright; otherwise the certificate must
    /// entitle some containing repository's content path.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] on any denial.
    pub fn authorize_image_id(&self, raw: &str) -> Result<ImageRef> {
        if raw.is_empty() {
            return Err(Error::NotFound);
        }
        let refs = self.catalog.images_for(raw);
        if refs.is_empty() {
            return Err(Error::NotFound);
        }

        if let Some(open) = refs.iter().find(|r| !r.protected) {
            return Ok(open.clone());
        }

        let Some(cert) = self.certificate else {
            debug!(image_id = %raw, "Protected image requested without a certificate");
            return Err(Error::NotFound);
        };
        refs.iter()
            .find(|r| cert.check_path(&r.content_path))
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn require_entitlement(&self, path: &str) -> Result<()> {
        let Some(cert) = self.certificate else {
            debug!(path = %path, "Protected path requested without a certificate");
            return Err(Error::NotFound);
        };
        if cert.check_path(path) {
            Ok(())
        } else {
            debug!(path = %path, "Certificate does not entitle path");
            Err(Error::NotFound)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
