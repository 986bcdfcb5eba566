//! Source path resolution
//!
//! Turns the source path groups of a [`Config`] into the concrete artifacts a
//! partition has to process. A source path may name an artifact directly or a
//! directory that is searched for archives. The partition that owns the JDK
//! path also gets the JDK's runtime artifact.

use crate::config::Config;
use crate::error::PrepError;
use indexmap::IndexSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// File extensions treated as Java archives
pub const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "war", "ear", "zip"];

/// Group that JDK runtime artifacts are reported under
pub const JDK_GROUP: &str = "jdk";

/// Where an artifact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Listed in, or discovered under, a source path
    Source,
    /// The runtime module or jar of the configured JDK
    JdkRuntime,
}

/// A unit of bytecode subject to transformation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub path: PathBuf,
    pub group: String,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn source(path: impl Into<PathBuf>, group: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            group: group.into(),
            kind: ArtifactKind::Source,
        }
    }

    pub fn jdk_runtime(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            group: JDK_GROUP.to_string(),
            kind: ArtifactKind::JdkRuntime,
        }
    }

    /// Whether the artifact is a zip based archive that may carry a signature
    pub fn is_archive(&self) -> bool {
        has_archive_extension(&self.path)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.path.display())
        } else {
            write!(f, "{}@{}", self.path.display(), self.group)
        }
    }
}

/// A source that could not be turned into an artifact
#[derive(Debug)]
pub struct SourceProblem {
    pub path: PathBuf,
    pub group: String,
    pub error: PrepError,
}

/// Outcome of resolving a configuration's sources
#[derive(Debug, Default)]
pub struct ResolvedSources {
    pub artifacts: Vec<Artifact>,
    pub problems: Vec<SourceProblem>,
}

fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ARCHIVE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Resolve every source path group of `config`, plus its JDK runtime artifact
/// when the configuration carries a JDK path.
///
/// Artifacts keep group order and, within a group, source path order.
/// Directories are walked in file name order so the result is stable.
pub fn resolve_sources(config: &Config) -> ResolvedSources {
    let mut resolved = ResolvedSources::default();

    for (group, paths) in config.source_paths() {
        let mut found: IndexSet<PathBuf> = IndexSet::new();

        for raw in paths {
            let path = PathBuf::from(raw);
            if path.is_file() {
                found.insert(path);
            } else if path.is_dir() {
                collect_archives(&path, group, &mut found, &mut resolved.problems);
            } else {
                debug!("Source path {} does not exist", path.display());
                resolved.problems.push(SourceProblem {
                    path: path.clone(),
                    group: group.clone(),
                    error: PrepError::UnresolvableDependency {
                        artifact: path,
                        reason: "source path does not exist".to_string(),
                    },
                });
            }
        }

        resolved
            .artifacts
            .extend(found.into_iter().map(|p| Artifact::source(p, group.as_str())));
    }

    if let Some(jdk) = config.jdk_path() {
        match find_jdk_runtime(jdk) {
            Some(runtime) => {
                debug!("Using JDK runtime artifact {}", runtime.display());
                resolved.artifacts.push(Artifact::jdk_runtime(runtime));
            }
            None => resolved.problems.push(SourceProblem {
                path: jdk.to_path_buf(),
                group: JDK_GROUP.to_string(),
                error: PrepError::invalid_entry(
                    "--jdksupport",
                    format!(
                        "no jmods/java.base.jmod or rt.jar found under {}",
                        jdk.display()
                    ),
                ),
            }),
        }
    }

    resolved
}

fn collect_archives(
    dir: &Path,
    group: &str,
    found: &mut IndexSet<PathBuf>,
    problems: &mut Vec<SourceProblem>,
) {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() && has_archive_extension(entry.path()) => {
                trace!("Discovered {}", entry.path().display());
                found.insert(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => {
                let context = format!("walking source directory {}", dir.display());
                let path = e.path().unwrap_or(dir).to_path_buf();
                problems.push(SourceProblem {
                    path,
                    group: group.to_string(),
                    error: match e.into_io_error() {
                        Some(io) => PrepError::io(context, io),
                        None => PrepError::Internal(format!("{}: filesystem loop", context)),
                    },
                });
            }
        }
    }
}

/// Locate the runtime artifact of a JDK install: the `java.base` module for
/// modular JDKs, `rt.jar` for older JDKs and bare JREs.
pub fn find_jdk_runtime(jdk: &Path) -> Option<PathBuf> {
    [
        jdk.join("jmods").join("java.base.jmod"),
        jdk.join("jre").join("lib").join("rt.jar"),
        jdk.join("lib").join("rt.jar"),
    ]
    .into_iter()
    .find(|p| p.is_file())
}
