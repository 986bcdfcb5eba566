//! Checksum cache manifest
//!
//! The manifest is a JSON document mapping fingerprints to the output that was
//! produced for them. It is loaded once when the cache opens and rewritten
//! after every recorded entry.
//!
//! # Concurrency
//!
//! Partitions share one [`ChecksumCache`]. Lookups take the lock only long
//! enough to clone an entry. Records hold it across the whole rewrite, so two
//! partitions finishing together write the manifest one after the other. The
//! rewrite goes through a temporary file and a rename, so readers never see a
//! half written manifest.

use crate::cache::fingerprint::Fingerprint;
use crate::error::{PrepError, PrepResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Manifest format version written by this build
pub const MANIFEST_VERSION: u32 = 1;

/// A previously processed artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Artifact the entry was recorded for
    pub source: PathBuf,

    /// Where the transformed artifact was written
    pub output: PathBuf,

    /// When the entry was recorded
    pub recorded_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// On-disk manifest layout; `BTreeMap` keeps the key order stable
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    entries: BTreeMap<Fingerprint, CacheEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// Fingerprint keyed cache persisted as a JSON manifest
#[derive(Debug)]
pub struct ChecksumCache {
    path: PathBuf,
    manifest: Mutex<Manifest>,
}

impl ChecksumCache {
    /// Open the manifest at `path`, creating its directory if needed.
    ///
    /// A missing manifest is an empty cache. An unreadable or malformed one
    /// is an error, never silently discarded.
    pub async fn open(path: impl Into<PathBuf>) -> PrepResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                PrepError::cache(format!("creating cache directory {}", parent.display()), e)
            })?;
        }

        let manifest = if fs::try_exists(&path)
            .await
            .map_err(|e| PrepError::cache(format!("probing manifest {}", path.display()), e))?
        {
            Self::load(&path).await?
        } else {
            debug!("No cache manifest at {}, starting empty", path.display());
            Manifest::default()
        };

        debug!(
            "Opened cache manifest {} with {} entries",
            path.display(),
            manifest.entries.len()
        );

        Ok(Self {
            path,
            manifest: Mutex::new(manifest),
        })
    }

    async fn load(path: &Path) -> PrepResult<Manifest> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PrepError::cache(format!("reading manifest {}", path.display()), e))?;

        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|e| PrepError::cache(format!("parsing manifest {}", path.display()), e))?;

        if manifest.version != MANIFEST_VERSION {
            return Err(PrepError::cache_msg(format!(
                "manifest {} has version {}, expected {}",
                path.display(),
                manifest.version,
                MANIFEST_VERSION
            )));
        }

        Ok(manifest)
    }

    /// Manifest location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of recorded entries
    pub async fn len(&self) -> usize {
        self.manifest.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Find the entry for `fingerprint`.
    ///
    /// An entry whose output has since been deleted counts as a miss.
    pub async fn lookup(&self, fingerprint: &Fingerprint) -> PrepResult<Option<CacheEntry>> {
        let entry = self
            .manifest
            .lock()
            .await
            .entries
            .get(fingerprint)
            .cloned();

        let Some(entry) = entry else {
            return Ok(None);
        };

        let output_exists = fs::try_exists(&entry.output).await.map_err(|e| {
            PrepError::cache(format!("checking cached output {}", entry.output.display()), e)
        })?;

        if output_exists {
            Ok(Some(entry))
        } else {
            debug!(
                "Cached output {} for {} is gone, treating as miss",
                entry.output.display(),
                fingerprint.short()
            );
            Ok(None)
        }
    }

    /// Record an entry and persist the manifest
    pub async fn record(&self, fingerprint: Fingerprint, entry: CacheEntry) -> PrepResult<()> {
        let mut manifest = self.manifest.lock().await;
        let previous = manifest.entries.insert(fingerprint.clone(), entry);

        if let Err(e) = self.persist(&manifest).await {
            match previous {
                Some(old) => manifest.entries.insert(fingerprint, old),
                None => manifest.entries.remove(&fingerprint),
            };
            return Err(e);
        }

        trace!("Recorded cache entry {}", fingerprint.short());
        Ok(())
    }

    async fn persist(&self, manifest: &Manifest) -> PrepResult<()> {
        let content = serde_json::to_string_pretty(manifest)
            .map_err(|e| PrepError::cache("serializing manifest", e))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cache-manifest.json".to_string());
        let tmp = self
            .path
            .with_file_name(format!("{}.{}.tmp", file_name, std::process::id()));

        fs::write(&tmp, content)
            .await
            .map_err(|e| PrepError::cache(format!("writing manifest {}", tmp.display()), e))?;

        fs::rename(&tmp, &self.path).await.map_err(|e| {
            PrepError::cache(format!("replacing manifest {}", self.path.display()), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint::fingerprint_bytes;
    use crate::config::Config;
    use crate::source::Artifact;
    use tempfile::TempDir;

    fn fingerprint(content: &[u8]) -> Fingerprint {
        let config = Config::builder().build().unwrap();
        fingerprint_bytes(content, &Artifact::source("/a.jar", ""), &config)
    }

    #[tokio::test]
    async fn record_and_lookup() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("a-inst.jar");
        std::fs::write(&output, b"out").unwrap();

        let cache = ChecksumCache::open(dir.path().join("state/manifest.json"))
            .await
            .unwrap();
        assert!(cache.is_empty().await);

        let fp = fingerprint(b"a");
        cache
            .record(fp.clone(), CacheEntry::new("/a.jar", &output))
            .await
            .unwrap();

        let hit = cache.lookup(&fp).await.unwrap().unwrap();
        assert_eq!(hit.output, output);
        assert!(cache.lookup(&fingerprint(b"b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("a-inst.jar");
        std::fs::write(&output, b"out").unwrap();
        let manifest = dir.path().join("manifest.json");

        let fp = fingerprint(b"a");
        {
            let cache = ChecksumCache::open(&manifest).await.unwrap();
            cache
                .record(fp.clone(), CacheEntry::new("/a.jar", &output))
                .await
                .unwrap();
        }

        let reopened = ChecksumCache::open(&manifest).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert!(reopened.lookup(&fp).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_output_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ChecksumCache::open(dir.path().join("manifest.json"))
            .await
            .unwrap();

        let fp = fingerprint(b"a");
        cache
            .record(fp.clone(), CacheEntry::new("/a.jar", dir.path().join("gone.jar")))
            .await
            .unwrap();

        assert!(cache.lookup(&fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_manifest_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("manifest.json");
        std::fs::write(&manifest, "{ not json").unwrap();

        let err = ChecksumCache::open(&manifest).await.unwrap_err();
        assert!(matches!(err, PrepError::CacheInfrastructure { .. }));
    }

    #[tokio::test]
    async fn unknown_version_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("manifest.json");
        std::fs::write(&manifest, r#"{"version": 99, "entries": {}}"#).unwrap();

        let err = ChecksumCache::open(&manifest).await.unwrap_err();
        assert!(matches!(err, PrepError::CacheInfrastructure { .. }));
    }

    #[tokio::test]
    async fn uncreatable_directory_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not dir").unwrap();

        let err = ChecksumCache::open(blocker.join("manifest.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrepError::CacheInfrastructure { .. }));
    }

    #[tokio::test]
    async fn manifest_keys_are_sorted() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("manifest.json");
        let cache = ChecksumCache::open(&manifest).await.unwrap();

        let mut fps = vec![fingerprint(b"x"), fingerprint(b"y"), fingerprint(b"z")];
        for fp in &fps {
            cache
                .record(fp.clone(), CacheEntry::new("/a.jar", "/out.jar"))
                .await
                .unwrap();
        }

        let content = std::fs::read_to_string(&manifest).unwrap();
        fps.sort();
        let positions: Vec<usize> = fps
            .iter()
            .map(|f| content.find(f.as_str()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
