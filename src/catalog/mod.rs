//! Repository catalog.
//!
//! The catalog is the gateway's read-only view of what content exists and
//! which of it is protected. It is loaded from a directory of JSON files,
//! one repository per file:
//!
//! ```json
//! {
//!   "schema": 1,
//!   "repository": "redhat/rhel7.0",
//!   "protected": true,
//!   "content_path": "/content/redhat/rhel7.0",
//!   "images": [{"id": "8dbd9e392a96"}],
//!   "tags": {"latest": "8dbd9e392a96"}
//! }
//! ```
//!
//! `schema: 1` records are legacy repositories with image/tag listings;
//! `schema: 2` (and `3`) records are v2-style repositories addressed by name.
//!
//! # Snapshot semantics
//!
//! [`CatalogStore`] holds the live catalog behind an atomically-swappable
//! `Arc`. A request clones the `Arc` once and makes its whole authorization
//! decision against that snapshot, so a concurrent reload can never tear a
//! decision between the protection check and the entitlement check.

mod watcher;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

pub use watcher::CatalogWatcher;

// ─────────────────────────────────────────────────────────────────────────────
// File format
// ─────────────────────────────────────────────────────────────────────────────

/// One catalog file, as serialized on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    /// 1 for legacy repositories, 2 or 3 for v2-style repositories.
    pub schema: u8,
    /// Canonical repository name.
    pub repository: String,
    /// Whether access requires a matching entitlement.
    #[serde(default)]
    pub protected: bool,
    /// CDN path prefix the repository's content is served from.
    pub content_path: String,
    /// Images in this repository (legacy schema only).
    #[serde(default)]
    pub images: Vec<ImageEntry>,
    /// Tag name to image id (legacy schema only).
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// One image listed in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEntry {
    /// Image id.
    pub id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Legacy repository record.
#[derive(Debug, Clone)]
pub struct RepoRecord {
    /// Canonical repository id.
    pub repository: String,
    /// Whether access requires a matching entitlement.
    pub protected: bool,
    /// CDN path prefix for this repository's content.
    pub content_path: String,
    /// Ids of the images in this repository.
    pub image_ids: Vec<String>,
    /// Tag name to image id.
    pub tags: HashMap<String, String>,
}

/// v2-style repository record.
#[derive(Debug, Clone)]
pub struct V2RepoRecord {
    /// Canonical repository name.
    pub repository: String,
    /// Whether access requires a matching entitlement.
    pub protected: bool,
    /// CDN path prefix for this repository's content.
    pub content_path: String,
}

/// One repository an image id belongs to. An image may live in several
/// repositories; access is granted if any of them grants it.
#[derive(Debug, Clone)]
pub struct ImageRef {
    /// Id of the containing repository.
    pub repo_id: String,
    /// CDN path prefix of the containing repository.
    pub content_path: String,
    /// Protection flag of the containing repository.
    pub protected: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// An immutable catalog snapshot.
#[derive(Debug, Default)]
pub struct Catalog {
    repos: HashMap<String, RepoRecord>,
    v2_repos: HashMap<String, V2RepoRecord>,
    images: HashMap<String, Vec<ImageRef>>,
}

impl Catalog {
    /// Build a catalog from parsed files. Files with an unknown schema are
    /// skipped with a warning.
    #[must_use]
    pub fn from_files(files: impl IntoIterator<Item = CatalogFile>) -> Self {
        let mut catalog = Self::default();
        for file in files {
            match file.schema {
                1 => catalog.insert_v1(file),
                2 | 3 => catalog.insert_v2(file),
                other => {
                    warn!(repository = %file.repository, schema = other, "Unknown catalog schema, skipping");
                }
            }
        }
        catalog
    }

    /// Load every `*.json` file under `dir`.
    ///
    /// A file that fails to parse is skipped with a warning so one bad
    /// publish cannot take down the rest of the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the directory itself cannot be read.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::Config(format!("Cannot read catalog directory {}: {e}", dir.display()))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| Error::Config(format!("Cannot list catalog directory: {e}")))?
                .path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|text| serde_json::from_str::<CatalogFile>(&text).map_err(Error::from))
            {
                Ok(file) => files.push(file),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping unparsable catalog file");
                }
            }
        }

        Ok(Self::from_files(files))
    }

    /// Look up a legacy repository by canonical id.
    #[must_use]
    pub fn repo(&self, id: &str) -> Option<&RepoRecord> {
        self.repos.get(id)
    }

    /// Look up a v2-style repository by canonical name.
    #[must_use]
    pub fn v2_repo(&self, name: &str) -> Option<&V2RepoRecord> {
        self.v2_repos.get(name)
    }

    /// Repositories containing the given image id; empty for unknown ids.
    #[must_use]
    pub fn images_for(&self, image_id: &str) -> &[ImageRef] {
        self.images.get(image_id).map_or(&[], Vec::as_slice)
    }

    /// Total number of repository records (both schemas).
    #[must_use]
    pub fn len(&self) -> usize {
        self.repos.len() + self.v2_repos.len()
    }

    /// Whether the catalog holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty() && self.v2_repos.is_empty()
    }

    fn insert_v1(&mut self, file: CatalogFile) {
        let image_ids: Vec<String> = file.images.into_iter().map(|i| i.id).collect();
        for image_id in &image_ids {
            self.images.entry(image_id.clone()).or_default().push(ImageRef {
                repo_id: file.repository.clone(),
                content_path: file.content_path.clone(),
                protected: file.protected,
            });
        }
        self.repos.insert(
            file.repository.clone(),
            RepoRecord {
                repository: file.repository,
                protected: file.protected,
                content_path: file.content_path,
                image_ids,
                tags: file.tags,
            },
        );
    }

    fn insert_v2(&mut self, file: CatalogFile) {
        self.v2_repos.insert(
            file.repository.clone(),
            V2RepoRecord {
                repository: file.repository,
                protected: file.protected,
                content_path: file.content_path,
            },
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Live store
// ─────────────────────────────────────────────────────────────────────────────

/// Live, atomically-swappable catalog.
///
/// Readers take a read-lock and clone the inner `Arc`; reloads swap the whole
/// `Arc` under a write-lock, so readers are never blocked for more than a
/// pointer swap.
pub struct CatalogStore {
    inner: RwLock<Arc<Catalog>>,
    data_dir: PathBuf,
}

impl CatalogStore {
    /// Load the catalog from `data_dir` and open a store around it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the directory cannot be read.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let catalog = Catalog::load_dir(&data_dir)?;
        debug!(records = catalog.len(), dir = %data_dir.display(), "Catalog loaded");
        Ok(Self {
            inner: RwLock::new(Arc::new(catalog)),
            data_dir,
        })
    }

    /// Clone the current snapshot. Decisions made against the returned value
    /// are immune to concurrent reloads.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.inner.read())
    }

    /// Re-read the data directory and atomically swap in the new snapshot.
    /// Returns the record count of the new catalog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the directory cannot be read; the old
    /// snapshot stays live in that case.
    pub fn reload(&self) -> Result<usize> {
        let catalog = Catalog::load_dir(&self.data_dir)?;
        let count = catalog.len();
        *self.inner.write() = Arc::new(catalog);
        Ok(count)
    }

    /// The directory this store loads from.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
