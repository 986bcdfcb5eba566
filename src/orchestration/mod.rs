//! Preprocessing orchestration
//!
//! Runs a configuration to completion:
//! - splits it into partitions when more than one worker is configured
//! - processes each partition as an independent task on a bounded pool
//! - merges partition results in partition order and settles the status
//!
//! Per artifact the pipeline is: signed jar policy, cache lookup, transform,
//! cache record. Artifact errors are collected into the result; only a
//! configuration that cannot run or a cache that cannot open aborts the run.

pub mod result;

pub use result::{ArtifactFailure, FailureKind, PreprocessResult, ProducedArtifact, RunStatus};

use crate::cache::{CacheEntry, CacheStore, Fingerprint};
use crate::config::Config;
use crate::error::{PrepError, PrepResult};
use crate::instrument::{Instrumentor, TransformError};
use crate::partition::partition_config;
use crate::signing::SignedJarDecision;
use crate::source::{resolve_sources, Artifact};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Drives preprocessing runs against an [`Instrumentor`]
pub struct Orchestrator {
    instrumentor: Arc<dyn Instrumentor>,
}

impl Orchestrator {
    pub fn new(instrumentor: Arc<dyn Instrumentor>) -> Self {
        Self { instrumentor }
    }

    /// Preprocess everything `config` names.
    ///
    /// Returns `Err` only when the run cannot start. Once partitions are
    /// running every problem ends up in the returned result.
    pub async fn run(&self, config: &Config) -> PrepResult<PreprocessResult> {
        config.ensure_runnable()?;

        let cache = Arc::new(CacheStore::open(config).await?);

        let partitions = if config.workers() > 1 {
            partition_config(config, config.workers())
        } else {
            vec![config.clone()]
        };

        info!(
            "Preprocessing {} source path(s) in {} partition(s) with {} worker(s) using {}, cache strategy {}",
            config.source_path_count(),
            partitions.len(),
            config.workers(),
            self.instrumentor.name(),
            cache.strategy()
        );

        let pool = Arc::new(Semaphore::new(config.workers()));
        let mut handles = Vec::with_capacity(partitions.len());

        for (index, partition) in partitions.into_iter().enumerate() {
            let pool = Arc::clone(&pool);
            let cache = Arc::clone(&cache);
            let instrumentor = Arc::clone(&self.instrumentor);

            handles.push(tokio::spawn(async move {
                let _permit = pool
                    .acquire_owned()
                    .await
                    .map_err(|e| PrepError::Internal(format!("worker pool closed: {}", e)))?;
                Ok::<_, PrepError>(
                    process_partition(index, &partition, &cache, instrumentor.as_ref()).await,
                )
            }));
        }

        let mut merged = PreprocessResult::default();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(result)) => merged.merge(result),
                Ok(Err(e)) => merged.failures.push(partition_failure(index, e.to_string())),
                Err(e) => {
                    warn!("Partition {} task failed: {}", index, e);
                    merged
                        .failures
                        .push(partition_failure(index, format!("partition task failed: {}", e)));
                }
            }
        }

        merged.finalize(config.fail_on_unresolvable_dependency());

        info!(
            "Preprocessing {}: {} transformed, {} cached, {} passed through, {} unresolved, {} failed",
            if merged.is_success() { "succeeded" } else { "failed" },
            merged.transformed.len(),
            merged.cached.len(),
            merged.passed_through.len(),
            merged.unresolved.len(),
            merged.failures.len()
        );

        Ok(merged)
    }
}

fn partition_failure(index: usize, message: String) -> ArtifactFailure {
    ArtifactFailure::new(
        format!("<partition {}>", index),
        "",
        index,
        FailureKind::Partition,
        message,
    )
}

/// Process one partition to completion
pub async fn process_partition(
    index: usize,
    config: &Config,
    cache: &CacheStore,
    instrumentor: &dyn Instrumentor,
) -> PreprocessResult {
    let mut result = PreprocessResult::default();

    let owned = config.clone();
    let resolved = match tokio::task::spawn_blocking(move || resolve_sources(&owned)).await {
        Ok(resolved) => resolved,
        Err(e) => {
            result.failures.push(partition_failure(
                index,
                format!("source resolution failed: {}", e),
            ));
            return result;
        }
    };

    for problem in resolved.problems {
        let failure = ArtifactFailure::from_error(problem.path, problem.group, index, &problem.error);
        if failure.kind == FailureKind::UnresolvableDependency {
            warn!("{}", failure);
            result.unresolved.push(failure);
        } else {
            result.failures.push(failure);
        }
    }

    debug!(
        "Partition {} resolved {} artifact(s)",
        index,
        resolved.artifacts.len()
    );

    for artifact in &resolved.artifacts {
        process_artifact(index, artifact, config, cache, instrumentor, &mut result).await;
    }

    result
}

fn record_failure(result: &mut PreprocessResult, index: usize, artifact: &Artifact, err: &PrepError) {
    let failure = ArtifactFailure::from_error(&artifact.path, &artifact.group, index, err);
    warn!("{}", failure);
    result.failures.push(failure);
}

async fn process_artifact(
    index: usize,
    artifact: &Artifact,
    config: &Config,
    cache: &CacheStore,
    instrumentor: &dyn Instrumentor,
    result: &mut PreprocessResult,
) {
    let handling = config.signed_jar_handling();
    let owned = artifact.clone();
    let decision = match tokio::task::spawn_blocking(move || handling.decide(&owned)).await {
        Ok(Ok(decision)) => decision,
        Ok(Err(e)) => return record_failure(result, index, artifact, &e),
        Err(e) => {
            let err = PrepError::Internal(format!("signature check failed: {}", e));
            return record_failure(result, index, artifact, &err);
        }
    };

    match decision {
        SignedJarDecision::Proceed => {}
        SignedJarDecision::PassThrough => {
            debug!("Passing signed artifact {} through", artifact);
            result.passed_through.push(artifact.path.clone());
            return;
        }
        SignedJarDecision::Abort => {
            let err = PrepError::SignedArtifactAbort(artifact.path.clone());
            return record_failure(result, index, artifact, &err);
        }
    }

    let fingerprint = match cache.fingerprint(artifact, config).await {
        Ok(fingerprint) => fingerprint,
        Err(e) => return record_failure(result, index, artifact, &e),
    };

    if let Some(ref fingerprint) = fingerprint {
        match cache.lookup(fingerprint).await {
            Ok(Some(entry)) => {
                debug!(
                    "Cache hit for {} ({}), output {}",
                    artifact,
                    fingerprint.short(),
                    entry.output.display()
                );
                result.cached.push(ProducedArtifact::new(artifact, entry.output));
                return;
            }
            Ok(None) => debug!("Cache miss for {} ({})", artifact, fingerprint.short()),
            Err(e) => return record_failure(result, index, artifact, &e),
        }
    }

    match instrumentor.transform(artifact, config).await {
        Ok(output) => {
            debug!("Instrumented {} -> {}", artifact, output.display());
            if let Some(fingerprint) = fingerprint {
                if let Err(e) = record_output(artifact, &output, fingerprint, config, cache).await {
                    record_failure(result, index, artifact, &e);
                }
            }
            result.transformed.push(ProducedArtifact::new(artifact, output));
        }
        Err(TransformError::UnresolvableDependency(reason)) => {
            let err = PrepError::UnresolvableDependency {
                artifact: artifact.path.clone(),
                reason,
            };
            let failure = ArtifactFailure::from_error(&artifact.path, &artifact.group, index, &err);
            warn!("{}", failure);
            result.unresolved.push(failure);
        }
        Err(TransformError::Failed(reason)) => {
            let err = PrepError::Transform {
                artifact: artifact.path.clone(),
                reason,
            };
            record_failure(result, index, artifact, &err);
        }
    }
}

/// Record a produced output in the cache.
///
/// An output written over its own source replaces the bytes `fingerprint`
/// was taken from, so the entry is keyed on the instrumented bytes instead.
/// The next run then finds the artifact already instrumented.
async fn record_output(
    artifact: &Artifact,
    output: &Path,
    fingerprint: Fingerprint,
    config: &Config,
    cache: &CacheStore,
) -> PrepResult<()> {
    let key = if output == artifact.path {
        match cache.fingerprint(artifact, config).await? {
            Some(instrumented) => {
                debug!(
                    "{} was instrumented in place, caching under {}",
                    artifact,
                    instrumented.short()
                );
                instrumented
            }
            None => return Ok(()),
        }
    } else {
        fingerprint
    };

    cache
        .record(key, CacheEntry::new(&artifact.path, output))
        .await
}
