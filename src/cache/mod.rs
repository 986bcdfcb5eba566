//! Preprocessing cache
//!
//! Avoids transforming an artifact again when neither its bytes nor the
//! transform parameters changed since the last run.
//!
//! # Strategies
//!
//! | Strategy | Lookup | Record |
//! |----------|--------|--------|
//! | `none` | always miss | discarded |
//! | `checksum` | fingerprint in manifest and output still present | manifest rewritten |
//!
//! Failures of the manifest itself are reported as
//! [`crate::error::PrepError::CacheInfrastructure`], never as a miss.

pub mod fingerprint;
pub mod manifest;

pub use fingerprint::{fingerprint_artifact, fingerprint_bytes, Fingerprint};
pub use manifest::{CacheEntry, ChecksumCache, MANIFEST_VERSION};

use crate::config::{CacheStrategy, Config};
use crate::error::PrepResult;
use crate::source::Artifact;
use tracing::debug;

/// Cache selected by the configured [`CacheStrategy`]
#[derive(Debug)]
pub enum CacheStore {
    NoOp,
    Checksum(ChecksumCache),
}

impl CacheStore {
    /// Open the store the configuration asks for
    pub async fn open(config: &Config) -> PrepResult<Self> {
        match config.cache_strategy() {
            CacheStrategy::None => Ok(Self::NoOp),
            CacheStrategy::Checksum => {
                let cache = ChecksumCache::open(config.cache_manifest_path()).await?;
                debug!("Using checksum cache at {}", cache.path().display());
                Ok(Self::Checksum(cache))
            }
        }
    }

    pub fn strategy(&self) -> CacheStrategy {
        match self {
            Self::NoOp => CacheStrategy::None,
            Self::Checksum(_) => CacheStrategy::Checksum,
        }
    }

    /// Fingerprint an artifact, or `None` when this store does not key by
    /// fingerprint. Failing to read the artifact is reported as is.
    pub async fn fingerprint(
        &self,
        artifact: &Artifact,
        config: &Config,
    ) -> PrepResult<Option<Fingerprint>> {
        match self {
            Self::NoOp => Ok(None),
            Self::Checksum(_) => fingerprint_artifact(artifact, config).await.map(Some),
        }
    }

    pub async fn lookup(&self, fingerprint: &Fingerprint) -> PrepResult<Option<CacheEntry>> {
        match self {
            Self::NoOp => Ok(None),
            Self::Checksum(cache) => cache.lookup(fingerprint).await,
        }
    }

    pub async fn record(&self, fingerprint: Fingerprint, entry: CacheEntry) -> PrepResult<()> {
        match self {
            Self::NoOp => Ok(()),
            Self::Checksum(cache) => cache.record(fingerprint, entry).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn noop_never_hits() {
        let config = Config::builder().build().unwrap();
        let store = CacheStore::open(&config).await.unwrap();
        assert_eq!(store.strategy(), CacheStrategy::None);

        let artifact = Artifact::source("/does/not/matter.jar", "");
        assert!(store.fingerprint(&artifact, &config).await.unwrap().is_none());

        let fp = fingerprint_bytes(b"x", &artifact, &config);
        store
            .record(fp.clone(), CacheEntry::new("/a.jar", "/b.jar"))
            .await
            .unwrap();
        assert!(store.lookup(&fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn checksum_store_opens_under_output_dir() {
        let dir = TempDir::new().unwrap();
        let config = Config::builder()
            .output_dir(dir.path())
            .cache_strategy(CacheStrategy::Checksum)
            .build()
            .unwrap();

        let store = CacheStore::open(&config).await.unwrap();
        assert_eq!(store.strategy(), CacheStrategy::Checksum);

        let jar = dir.path().join("a.jar");
        std::fs::write(&jar, b"bytes").unwrap();
        let output = dir.path().join("a-out.jar");
        std::fs::write(&output, b"out").unwrap();

        let artifact = Artifact::source(&jar, "");
        let fp = store.fingerprint(&artifact, &config).await.unwrap().unwrap();
        store
            .record(fp.clone(), CacheEntry::new(&jar, &output))
            .await
            .unwrap();

        assert!(store.lookup(&fp).await.unwrap().is_some());
        assert!(config.cache_manifest_path().is_file());
    }
}
