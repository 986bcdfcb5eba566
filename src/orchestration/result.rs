//! Preprocessing outcomes
//!
//! Every artifact a partition looks at ends up in one list of a
//! [`PreprocessResult`]. The exception is a transformed artifact whose cache
//! record could not be written: it is listed as transformed and as a failure.
//! Partition results are merged by appending, so nothing a partition reports
//! is lost.

use crate::error::PrepError;
use crate::source::Artifact;
use std::fmt;
use std::path::PathBuf;

/// Category of an artifact level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    SignedArtifactAbort,
    CacheInfrastructure,
    UnresolvableDependency,
    Transform,
    InvalidArtifact,
    Io,
    Partition,
}

impl FailureKind {
    /// Category of an error raised while processing an artifact
    pub fn of(err: &PrepError) -> Self {
        match err {
            PrepError::SignedArtifactAbort(_) => Self::SignedArtifactAbort,
            PrepError::CacheInfrastructure { .. } => Self::CacheInfrastructure,
            PrepError::UnresolvableDependency { .. } => Self::UnresolvableDependency,
            PrepError::Transform { .. } => Self::Transform,
            PrepError::InvalidArchive { .. } | PrepError::InvalidConfigEntry { .. } => {
                Self::InvalidArtifact
            }
            PrepError::Io { .. } => Self::Io,
            PrepError::ArgumentParsing(_) | PrepError::Internal(_) => {
                Self::Partition
            }
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SignedArtifactAbort => "signed artifact",
            Self::CacheInfrastructure => "cache",
            Self::UnresolvableDependency => "unresolvable",
            Self::Transform => "transform",
            Self::InvalidArtifact => "invalid artifact",
            Self::Io => "io",
            Self::Partition => "partition",
        };
        write!(f, "{}", name)
    }
}

/// An artifact with an instrumented output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedArtifact {
    pub source: PathBuf,
    pub group: String,
    pub output: PathBuf,
}

impl ProducedArtifact {
    pub fn new(artifact: &Artifact, output: impl Into<PathBuf>) -> Self {
        Self {
            source: artifact.path.clone(),
            group: artifact.group.clone(),
            output: output.into(),
        }
    }
}

/// A problem attributed to one artifact (or a whole partition)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFailure {
    pub artifact: PathBuf,
    pub group: String,
    pub partition: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl ArtifactFailure {
    pub fn new(
        artifact: impl Into<PathBuf>,
        group: impl Into<String>,
        partition: usize,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            group: group.into(),
            partition,
            kind,
            message: message.into(),
        }
    }

    pub fn from_error(
        artifact: impl Into<PathBuf>,
        group: impl Into<String>,
        partition: usize,
        err: &PrepError,
    ) -> Self {
        Self::new(artifact, group, partition, FailureKind::of(err), err.to_string())
    }
}

impl fmt::Display for ArtifactFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "[{}] {}: {}", self.kind, self.artifact.display(), self.message)
        } else {
            write!(
                f,
                "[{}] {}@{}: {}",
                self.kind,
                self.artifact.display(),
                self.group,
                self.message
            )
        }
    }
}

/// Overall verdict of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Succeeded,
    Failed,
}

/// What a partition, or a whole run, did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessResult {
    /// Instrumented during this run
    pub transformed: Vec<ProducedArtifact>,
    /// Served from the cache
    pub cached: Vec<ProducedArtifact>,
    /// Left untouched by the signed jar policy
    pub passed_through: Vec<PathBuf>,
    /// Could not be resolved; fatal only with `--failonunresolvabledependency`
    pub unresolved: Vec<ArtifactFailure>,
    pub failures: Vec<ArtifactFailure>,
    pub status: RunStatus,
}

impl PreprocessResult {
    /// Append another result's entries
    pub fn merge(&mut self, other: PreprocessResult) {
        self.transformed.extend(other.transformed);
        self.cached.extend(other.cached);
        self.passed_through.extend(other.passed_through);
        self.unresolved.extend(other.unresolved);
        self.failures.extend(other.failures);
        if other.status == RunStatus::Failed {
            self.status = RunStatus::Failed;
        }
    }

    /// Settle the status once every partition has reported
    pub fn finalize(&mut self, fail_on_unresolvable: bool) {
        let failed = !self.failures.is_empty()
            || (fail_on_unresolvable && !self.unresolved.is_empty());
        self.status = if failed {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Number of artifacts that ended up in any list
    pub fn total(&self) -> usize {
        self.transformed.len()
            + self.cached.len()
            + self.passed_through.len()
            + self.unresolved.len()
            + self.failures.len()
    }
}
