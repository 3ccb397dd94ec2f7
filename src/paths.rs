//! Repository path normalization.
//!
//! The routing layer hands this module raw, untyped path strings. Two shapes
//! exist: legacy repository ids (`centos`, `foo/bar`) and v2-style paths that
//! end in a component keyword plus a remainder (`foo/bar/manifests/latest`).
//! Any segment of a v2-style path, including the name segments, may itself
//! coincide with a component keyword, so resolution tries a fixed, ordered
//! list of interpretations rather than guessing from the names.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Component kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Category of sub-resource requested within a repository.
///
/// Only these three values are representable; a path with any other component
/// keyword never resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Tag list requests.
    Tags,
    /// Manifest requests.
    Manifests,
    /// Blob requests.
    Blobs,
}

impl ComponentKind {
    /// The keyword as it appears in request paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Manifests => "manifests",
            Self::Blobs => "blobs",
        }
    }
}

impl FromStr for ComponentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tags" => Ok(Self::Tags),
            "manifests" => Ok(Self::Manifests),
            "blobs" => Ok(Self::Blobs),
            _ => Err(Error::NotFound),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolved names
// ─────────────────────────────────────────────────────────────────────────────

/// A v2-style path resolved into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Canonical repository name. Empty for bare component paths.
    pub name: String,
    /// Byte-for-byte suffix of the input starting at the component keyword,
    /// trailing separators preserved.
    pub sub_path: String,
    /// The component keyword that anchored the resolution.
    pub kind: ComponentKind,
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize a legacy repository id.
///
/// Ids have at most two `/`-separated segments. The implicit `library/`
/// default namespace is elided.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for an empty id or one with more than two
/// segments.
pub fn normalize_repo_id(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(Error::NotFound);
    }
    if raw.matches('/').count() > 1 {
        return Err(Error::NotFound);
    }
    Ok(raw.strip_prefix("library/").unwrap_or(raw).to_string())
}

/// Resolve a v2-style path into `(name, sub_path, component)`.
///
/// Interpretations are tried in order, longest name first:
///
/// 1. `ns/image/<component>/...`: the two-segment name wins even when the
///    image segment is itself a component keyword.
/// 2. `image/<component>/...`
/// 3. a path whose first segment is a bare component keyword (`tags`,
///    `tags/`), which belongs to the empty name.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when no interpretation places a recognized
/// component keyword.
pub fn normalize_repo_name(raw: &str) -> Result<ResolvedName> {
    let stripped = raw.strip_prefix('/').unwrap_or(raw);
    let segments: Vec<&str> = stripped.split('/').collect();

    if segments.len() >= 3 {
        if let Ok(kind) = segments[2].parse::<ComponentKind>() {
            let offset = segments[0].len() + 1 + segments[1].len() + 1;
            return Ok(ResolvedName {
                name: format!("{}/{}", segments[0], segments[1]),
                sub_path: stripped[offset..].to_string(),
                kind,
            });
        }
    }

    if segments.len() >= 2 {
        if let Ok(kind) = segments[1].parse::<ComponentKind>() {
            let offset = segments[0].len() + 1;
            return Ok(ResolvedName {
                name: segments[0].to_string(),
                sub_path: stripped[offset..].to_string(),
                kind,
            });
        }
    }

    if let Ok(kind) = segments[0].parse::<ComponentKind>() {
        return Ok(ResolvedName {
            name: String::new(),
            sub_path: stripped.to_string(),
            kind,
        });
    }

    Err(Error::NotFound)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
