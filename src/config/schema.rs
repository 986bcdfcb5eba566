//! Preprocessing configuration schema
//!
//! A [`Config`] is only produced by [`ConfigBuilder::build`], which rejects the
//! first invariant violation it finds. Once built it is never mutated; the
//! partitioner derives copies.

use crate::error::{PrepError, PrepResult};
use crate::signing::SignedJarHandling;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Separator between a source path list and its group qualifier
pub const GROUP_SEPARATOR: char = '@';

/// Separator between individual paths of a source path list
pub const PATH_SEPARATOR: char = ':';

/// Source path groups, both levels kept in insertion order
pub type SourcePaths = IndexMap<String, IndexSet<String>>;

/// Log severity, ordered from least to most verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive for a `tracing_subscriber::EnvFilter`
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Fatal => "jarprep=off",
            Self::Error => "jarprep=error",
            Self::Warn => "jarprep=warn",
            Self::Info => "jarprep=info",
            Self::Debug => "jarprep=debug",
            Self::Trace => "jarprep=trace",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        write!(f, "{}", name)
    }
}

/// How processed artifacts are remembered between runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Every artifact is transformed on every run
    #[default]
    None,
    /// Artifacts are fingerprinted and skipped when already processed
    Checksum,
}

impl FromStr for CacheStrategy {
    type Err = PrepError;

    fn from_str(s: &str) -> PrepResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "checksum" => Ok(Self::Checksum),
            _ => Err(PrepError::invalid_entry(
                "--cachestrategy",
                format!("unknown cache strategy '{}', expected none or checksum", s),
            )),
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Checksum => write!(f, "checksum"),
        }
    }
}

/// Validated preprocessing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub(crate) source_paths: SourcePaths,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) agent_path: Option<PathBuf>,
    pub(crate) agent_arg: Option<String>,
    pub(crate) suffix: Option<String>,
    pub(crate) java_version: Option<String>,
    pub(crate) jdk_path: Option<PathBuf>,
    pub(crate) fail_on_unresolvable_dependency: bool,
    pub(crate) workers: usize,
    pub(crate) log_level: LogLevel,
    pub(crate) signed_jar_handling: SignedJarHandling,
    pub(crate) cache_strategy: CacheStrategy,
}

impl Config {
    /// Start building a configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn source_paths(&self) -> &SourcePaths {
        &self.source_paths
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn agent_path(&self) -> Option<&Path> {
        self.agent_path.as_deref()
    }

    pub fn agent_arg(&self) -> Option<&str> {
        self.agent_arg.as_deref()
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn java_version(&self) -> Option<&str> {
        self.java_version.as_deref()
    }

    /// JDK install to instrument; a singleton resource owned by one partition
    pub fn jdk_path(&self) -> Option<&Path> {
        self.jdk_path.as_deref()
    }

    pub fn fail_on_unresolvable_dependency(&self) -> bool {
        self.fail_on_unresolvable_dependency
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn signed_jar_handling(&self) -> SignedJarHandling {
        self.signed_jar_handling
    }

    pub fn cache_strategy(&self) -> CacheStrategy {
        self.cache_strategy
    }

    /// Total number of source paths across all groups
    pub fn source_path_count(&self) -> usize {
        self.source_paths.values().map(IndexSet::len).sum()
    }

    /// Check that this configuration has something to process
    pub fn ensure_runnable(&self) -> PrepResult<()> {
        if self.source_path_count() == 0 && self.jdk_path.is_none() {
            return Err(PrepError::invalid_entry(
                "--sourcepaths",
                "no source paths or JDK path to preprocess",
            ));
        }
        Ok(())
    }

    /// Derive a copy with different source paths and JDK path
    pub(crate) fn derive(&self, source_paths: SourcePaths, jdk_path: Option<PathBuf>) -> Self {
        Self {
            source_paths,
            jdk_path,
            ..self.clone()
        }
    }
}

/// Incremental, validating construction of a [`Config`]
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    source_paths: SourcePaths,
    output_dir: Option<PathBuf>,
    agent_path: Option<PathBuf>,
    agent_arg: Option<String>,
    suffix: Option<String>,
    java_version: Option<String>,
    jdk_path: Option<PathBuf>,
    fail_on_unresolvable_dependency: bool,
    workers: usize,
    log_level: LogLevel,
    signed_jar_handling: SignedJarHandling,
    cache_strategy: CacheStrategy,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            source_paths: SourcePaths::new(),
            output_dir: None,
            agent_path: None,
            agent_arg: None,
            suffix: None,
            java_version: None,
            jdk_path: None,
            fail_on_unresolvable_dependency: false,
            workers: 1,
            log_level: LogLevel::default(),
            signed_jar_handling: SignedJarHandling::default(),
            cache_strategy: CacheStrategy::default(),
        }
    }
}

impl ConfigBuilder {
    /// Union paths into a group. Empty paths are dropped and a group that ends
    /// up with no paths is not created.
    pub fn source_paths<I, S>(mut self, group: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        if !paths.is_empty() {
            self.source_paths
                .entry(group.into())
                .or_default()
                .extend(paths);
        }
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn agent_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.agent_path = Some(path.into());
        self
    }

    pub fn agent_arg(mut self, arg: impl Into<String>) -> Self {
        self.agent_arg = Some(arg.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn java_version(mut self, version: impl Into<String>) -> Self {
        self.java_version = Some(version.into());
        self
    }

    pub fn jdk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.jdk_path = Some(path.into());
        self
    }

    pub fn fail_on_unresolvable_dependency(mut self, fail: bool) -> Self {
        self.fail_on_unresolvable_dependency = fail;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn signed_jar_handling(mut self, handling: SignedJarHandling) -> Self {
        self.signed_jar_handling = handling;
        self
    }

    pub fn cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> PrepResult<Config> {
        if self.workers == 0 {
            return Err(PrepError::invalid_entry(
                "--workers",
                "worker count must be a positive integer",
            ));
        }

        if let Some(group) = self
            .source_paths
            .keys()
            .find(|g| g.contains(GROUP_SEPARATOR))
        {
            return Err(PrepError::invalid_entry(
                "--sourcepaths",
                format!("group name '{}' contains '{}'", group, GROUP_SEPARATOR),
            ));
        }

        if self
            .jdk_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(PrepError::invalid_entry(
                "--jdksupport",
                "JDK path must not be empty",
            ));
        }

        Ok(Config {
            source_paths: self.source_paths,
            output_dir: self.output_dir,
            agent_path: self.agent_path,
            agent_arg: self.agent_arg,
            suffix: self.suffix,
            java_version: self.java_version,
            jdk_path: self.jdk_path,
            fail_on_unresolvable_dependency: self.fail_on_unresolvable_dependency,
            workers: self.workers,
            log_level: self.log_level,
            signed_jar_handling: self.signed_jar_handling,
            cache_strategy: self.cache_strategy,
        })
    }
}
