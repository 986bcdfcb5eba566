//! Artifact fingerprinting for content-addressed caching
//!
//! A fingerprint covers the artifact bytes, its location and every
//! configuration field that changes the transformed output.

use crate::config::Config;
use crate::error::{PrepError, PrepResult};
use crate::source::Artifact;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tokio::fs;

/// Hex encoded SHA-256 cache key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn update_field(hasher: &mut Sha256, name: &str, value: Option<&str>) {
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update((v.len() as u64).to_le_bytes());
            hasher.update(v.as_bytes());
        }
        None => hasher.update([0u8]),
    }
}

fn path_field(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

/// Fingerprint artifact contents together with the transform parameters
pub fn fingerprint_bytes(contents: &[u8], artifact: &Artifact, config: &Config) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update((contents.len() as u64).to_le_bytes());
    hasher.update(contents);

    update_field(
        &mut hasher,
        "path",
        path_field(Some(artifact.path.as_path())).as_deref(),
    );
    update_field(&mut hasher, "group", Some(&artifact.group));
    update_field(
        &mut hasher,
        "agent_path",
        path_field(config.agent_path()).as_deref(),
    );
    update_field(&mut hasher, "agent_arg", config.agent_arg());
    update_field(&mut hasher, "suffix", config.suffix());
    update_field(&mut hasher, "java_version", config.java_version());
    update_field(
        &mut hasher,
        "output_dir",
        path_field(config.output_dir()).as_deref(),
    );

    Fingerprint(hex::encode(hasher.finalize()))
}

/// Read an artifact and fingerprint it
pub async fn fingerprint_artifact(artifact: &Artifact, config: &Config) -> PrepResult<Fingerprint> {
    let contents = fs::read(&artifact.path).await.map_err(|e| {
        PrepError::io(format!("reading artifact {}", artifact.path.display()), e)
    })?;
    Ok(fingerprint_bytes(&contents, artifact, config))
}
