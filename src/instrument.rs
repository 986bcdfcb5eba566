//! Instrumentor abstraction
//!
//! The bytecode rewrite itself happens outside this crate. The orchestrator
//! only needs something that turns an artifact into an instrumented output,
//! which is what [`Instrumentor`] describes. [`AgentProcessInstrumentor`]
//! hands each artifact to the agent running in a JVM child process.

use crate::config::Config;
use crate::error::{PrepError, PrepResult};
use crate::source::{Artifact, ArtifactKind, JDK_GROUP};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

/// Max number of output lines kept in a transform failure message
const ERROR_TAIL_LINES: usize = 20;

/// Output markers of a class that could not be loaded during the transform
const UNRESOLVABLE_MARKERS: &[&str] = &["NoClassDefFoundError", "ClassNotFoundException"];

/// Why a transform did not produce an output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A class the artifact depends on could not be found
    #[error("unresolvable dependency: {0}")]
    UnresolvableDependency(String),

    #[error("{0}")]
    Failed(String),
}

/// Something that instruments a single artifact
#[async_trait]
pub trait Instrumentor: Send + Sync {
    /// Instrument `artifact` and return where the output was written
    async fn transform(&self, artifact: &Artifact, config: &Config)
        -> Result<PathBuf, TransformError>;

    /// Human-readable name for log lines
    fn name(&self) -> &'static str;
}

/// Where the instrumented version of `artifact` goes.
///
/// With an output directory, outputs land in `<output>/<group>/`, JDK runtime
/// artifacts in `<output>/jdk/`. Without one they are written next to the
/// source. The suffix is inserted before the extension.
pub fn output_path_for(artifact: &Artifact, config: &Config) -> PathBuf {
    let dir = match config.output_dir() {
        Some(out) => match artifact.kind {
            ArtifactKind::JdkRuntime => out.join(JDK_GROUP),
            ArtifactKind::Source if artifact.group.is_empty() => out.to_path_buf(),
            ArtifactKind::Source => out.join(&artifact.group),
        },
        None => artifact
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    let stem = artifact
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = config.suffix().unwrap_or_default();
    let file_name = match artifact.path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };

    dir.join(file_name)
}

/// Locate the `java` launcher: the configured JDK first, then `JAVA_HOME`,
/// then whatever is on `PATH`.
pub fn java_executable(config: &Config) -> PathBuf {
    let launcher = if cfg!(windows) { "java.exe" } else { "java" };

    if let Some(jdk) = config.jdk_path() {
        let candidate = jdk.join("bin").join(launcher);
        if candidate.is_file() {
            return candidate;
        }
    }

    if let Some(home) = std::env::var_os("JAVA_HOME") {
        let candidate = PathBuf::from(home).join("bin").join(launcher);
        if candidate.is_file() {
            return candidate;
        }
    }

    PathBuf::from(launcher)
}

/// Keep the tail of child process output for error messages
fn output_tail(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Classify a failed transform from its output
fn classify_failure(code: Option<i32>, stdout: &str, stderr: &str) -> TransformError {
    let tail = output_tail(stdout, stderr);

    if let Some(line) = stdout
        .lines()
        .chain(stderr.lines())
        .find(|l| UNRESOLVABLE_MARKERS.iter().any(|m| l.contains(m)))
    {
        return TransformError::UnresolvableDependency(line.trim().to_string());
    }

    match code {
        Some(code) => TransformError::Failed(format!("agent exited with code {}: {}", code, tail)),
        None => TransformError::Failed(format!("agent terminated by signal: {}", tail)),
    }
}

/// Runs the instrumentation agent once per artifact:
///
/// `java -jar <agent> --input <artifact> --output <dest> [--agentarg <arg>] [--javaversion <v>]`
#[derive(Debug, Clone)]
pub struct AgentProcessInstrumentor {
    java: PathBuf,
    agent: PathBuf,
}

impl AgentProcessInstrumentor {
    pub fn new(java: impl Into<PathBuf>, agent: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            agent: agent.into(),
        }
    }

    /// Build from configuration; an agent path is required
    pub fn from_config(config: &Config) -> PrepResult<Self> {
        let agent = config.agent_path().ok_or_else(|| {
            PrepError::invalid_entry("--agentPath", "an instrumentation agent is required")
        })?;
        Ok(Self::new(java_executable(config), agent))
    }

    fn command_args(&self, artifact: &Artifact, output: &Path, config: &Config) -> Vec<String> {
        let mut args = vec![
            "-jar".to_string(),
            self.agent.to_string_lossy().into_owned(),
            "--input".to_string(),
            artifact.path.to_string_lossy().into_owned(),
            "--output".to_string(),
            output.to_string_lossy().into_owned(),
        ];
        if let Some(arg) = config.agent_arg() {
            args.push("--agentarg".to_string());
            args.push(arg.to_string());
        }
        if let Some(version) = config.java_version() {
            args.push("--javaversion".to_string());
            args.push(version.to_string());
        }
        args
    }
}

#[async_trait]
impl Instrumentor for AgentProcessInstrumentor {
    async fn transform(
        &self,
        artifact: &Artifact,
        config: &Config,
    ) -> Result<PathBuf, TransformError> {
        let output = output_path_for(artifact, config);
        if output == artifact.path {
            debug!("Instrumenting {} in place", artifact.path.display());
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TransformError::Failed(format!("creating {}: {}", parent.display(), e))
            })?;
        }

        let args = self.command_args(artifact, &output, config);
        trace!("{} {}", self.java.display(), args.join(" "));

        let result = Command::new(&self.java)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                TransformError::Failed(format!("launching {}: {}", self.java.display(), e))
            })?;

        if result.status.success() {
            return Ok(output);
        }

        let stdout = String::from_utf8_lossy(&result.stdout);
        let stderr = String::from_utf8_lossy(&result.stderr);
        Err(classify_failure(result.status.code(), &stdout, &stderr))
    }

    fn name(&self) -> &'static str {
        "agent-process"
    }
}
