//! Command line parsing
//!
//! Flags are matched case-insensitively and every flag has a long spelling;
//! most also have a short one (`-sps`, `-out`, ...). Response files are
//! expanded before parsing, so their tokens behave exactly like tokens typed
//! on the command line. Later scalar values replace earlier ones, while
//! `--sourcepaths` values accumulate.

use super::args::expand_response_files;
use crate::config::{CacheStrategy, Config, ConfigBuilder, LogLevel, GROUP_SEPARATOR, PATH_SEPARATOR};
use crate::error::{PrepError, PrepResult};
use crate::signing::SignedJarHandling;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    SourcePaths,
    OutputDir,
    AgentPath,
    Suffix,
    JavaVersion,
    AgentArg,
    JdkSupport,
    FailOnUnresolvableDependency,
    SignedJarHandlingStrategy,
    CacheStrategy,
    Workers,
    Silent,
    Verbose,
    ExtraVerbose,
}

struct FlagSpec {
    flag: Flag,
    long: &'static str,
    short: Option<&'static str>,
    /// Placeholder shown in usage; `None` for switches
    value: Option<&'static str>,
    help: &'static str,
}

const FLAGS: &[FlagSpec] = &[
    FlagSpec {
        flag: Flag::SourcePaths,
        long: "--sourcepaths",
        short: Some("-sps"),
        value: Some("<path:path@group>"),
        help: "Artifacts or directories to preprocess, optionally tagged with a group; repeatable",
    },
    FlagSpec {
        flag: Flag::OutputDir,
        long: "--outputDir",
        short: Some("-out"),
        value: Some("<dir>"),
        help: "Root directory for instrumented artifacts",
    },
    FlagSpec {
        flag: Flag::AgentPath,
        long: "--agentPath",
        short: Some("-ap"),
        value: Some("<path>"),
        help: "Instrumentation agent to apply",
    },
    FlagSpec {
        flag: Flag::Suffix,
        long: "--suffix",
        short: Some("-suf"),
        value: Some("<suffix>"),
        help: "Suffix appended to instrumented artifact names",
    },
    FlagSpec {
        flag: Flag::JavaVersion,
        long: "--javaversion",
        short: Some("-jv"),
        value: Some("<version>"),
        help: "Target bytecode version",
    },
    FlagSpec {
        flag: Flag::AgentArg,
        long: "--agentarg",
        short: Some("-arg"),
        value: Some("<arg>"),
        help: "Argument passed to the agent",
    },
    FlagSpec {
        flag: Flag::JdkSupport,
        long: "--jdksupport",
        short: Some("-jdks"),
        value: Some("<jdk>"),
        help: "JDK install whose runtime artifact is instrumented too",
    },
    FlagSpec {
        flag: Flag::FailOnUnresolvableDependency,
        long: "--failonunresolvabledependency",
        short: None,
        value: None,
        help: "Fail the run when a dependency cannot be resolved",
    },
    FlagSpec {
        flag: Flag::SignedJarHandlingStrategy,
        long: "--signedjarhandlingstrategy",
        short: None,
        value: Some("<instrument|skip|fail>"),
        help: "What to do with signed archives (default: instrument)",
    },
    FlagSpec {
        flag: Flag::CacheStrategy,
        long: "--cachestrategy",
        short: Some("-cache"),
        value: Some("<none|checksum>"),
        help: "Skip artifacts that were already instrumented (default: none)",
    },
    FlagSpec {
        flag: Flag::Workers,
        long: "--workers",
        short: None,
        value: Some("<n>"),
        help: "Number of partitions processed concurrently (default: 1)",
    },
    FlagSpec {
        flag: Flag::Silent,
        long: "--silent",
        short: None,
        value: None,
        help: "Only log fatal problems",
    },
    FlagSpec {
        flag: Flag::Verbose,
        long: "--verbose",
        short: None,
        value: None,
        help: "Log debug output",
    },
    FlagSpec {
        flag: Flag::ExtraVerbose,
        long: "--extraverbose",
        short: None,
        value: None,
        help: "Log trace output",
    },
];

fn lookup(token: &str) -> Option<&'static FlagSpec> {
    FLAGS.iter().find(|spec| {
        spec.long.eq_ignore_ascii_case(token)
            || spec.short.is_some_and(|s| s.eq_ignore_ascii_case(token))
    })
}

/// Split a `--sourcepaths` value into its group and paths.
///
/// The grammar is `path(:path)*[@group]`. Empty paths are dropped.
fn parse_source_paths(value: &str) -> PrepResult<(String, Vec<String>)> {
    let parts: Vec<&str> = value.split(GROUP_SEPARATOR).collect();
    if parts.len() > 2 {
        return Err(PrepError::invalid_entry(
            "--sourcepaths",
            format!("'{}' has more than one '{}'", value, GROUP_SEPARATOR),
        ));
    }

    let group = parts.get(1).copied().unwrap_or_default().to_string();
    let paths = parts[0]
        .split(PATH_SEPARATOR)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Ok((group, paths))
}

fn parse_workers(value: &str) -> PrepResult<usize> {
    let invalid = || {
        PrepError::invalid_entry(
            "--workers",
            format!("'{}' is not a positive integer", value),
        )
    };
    let workers: i64 = value.parse().map_err(|_| invalid())?;
    if workers <= 0 {
        return Err(invalid());
    }
    usize::try_from(workers).map_err(|_| invalid())
}

fn apply_value(builder: ConfigBuilder, flag: Flag, value: &str) -> PrepResult<ConfigBuilder> {
    Ok(match flag {
        Flag::SourcePaths => {
            let (group, paths) = parse_source_paths(value)?;
            builder.source_paths(group, paths)
        }
        Flag::OutputDir => builder.output_dir(value),
        Flag::AgentPath => builder.agent_path(value),
        Flag::Suffix => builder.suffix(value),
        Flag::JavaVersion => builder.java_version(value),
        Flag::AgentArg => builder.agent_arg(value),
        Flag::JdkSupport => builder.jdk_path(value),
        Flag::SignedJarHandlingStrategy => {
            builder.signed_jar_handling(value.parse::<SignedJarHandling>()?)
        }
        Flag::CacheStrategy => builder.cache_strategy(value.parse::<CacheStrategy>()?),
        Flag::Workers => builder.workers(parse_workers(value)?),
        Flag::FailOnUnresolvableDependency | Flag::Silent | Flag::Verbose | Flag::ExtraVerbose => {
            return Err(PrepError::Internal(format!("{:?} takes no value", flag)))
        }
    })
}

fn apply_switch(builder: ConfigBuilder, flag: Flag) -> PrepResult<ConfigBuilder> {
    Ok(match flag {
        Flag::FailOnUnresolvableDependency => builder.fail_on_unresolvable_dependency(true),
        Flag::Silent => builder.log_level(LogLevel::Fatal),
        Flag::Verbose => builder.log_level(LogLevel::Debug),
        Flag::ExtraVerbose => builder.log_level(LogLevel::Trace),
        Flag::SourcePaths
        | Flag::OutputDir
        | Flag::AgentPath
        | Flag::Suffix
        | Flag::JavaVersion
        | Flag::AgentArg
        | Flag::JdkSupport
        | Flag::SignedJarHandlingStrategy
        | Flag::CacheStrategy
        | Flag::Workers => return Err(PrepError::Internal(format!("{:?} requires a value", flag))),
    })
}

/// Turns command line arguments into a validated [`Config`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigParser;

impl ConfigParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse command line arguments, expanding `@file` response files.
    ///
    /// `None` stands for a missing argument vector and, like an empty one,
    /// is rejected.
    pub fn parse_command_line<S: AsRef<str>>(&self, args: Option<&[S]>) -> PrepResult<Config> {
        let args = match args {
            Some(args) if !args.is_empty() => args,
            _ => {
                return Err(PrepError::ArgumentParsing(
                    "no arguments given".to_string(),
                ))
            }
        };

        let tokens = expand_response_files(args)?;
        let mut builder = Config::builder();
        let mut iter = tokens.iter();

        while let Some(token) = iter.next() {
            let spec = lookup(token).ok_or_else(|| {
                PrepError::ArgumentParsing(format!("unknown flag '{}'", token))
            })?;

            if spec.value.is_none() {
                builder = apply_switch(builder, spec.flag)?;
                continue;
            }

            let value = iter
                .next()
                .filter(|v| !v.starts_with("--") && lookup(v).is_none())
                .ok_or_else(|| {
                    PrepError::ArgumentParsing(format!("flag '{}' requires a value", token))
                })?;
            builder = apply_value(builder, spec.flag, value)?;
        }

        builder.build()
    }
}

/// Usage text listing every flag
pub fn usage() -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Usage: jarprep [flags] [@response-file ...]\n\nPreprocesses Java artifacts with an instrumentation agent ahead of time.\n\nFlags:"
    );

    for spec in FLAGS {
        let names = match spec.short {
            Some(short) => format!("{}, {}", spec.long, short),
            None => spec.long.to_string(),
        };
        let names = match spec.value {
            Some(value) => format!("{} {}", names, value),
            None => names,
        };
        let _ = writeln!(out, "  {:<48} {}", names, spec.help);
    }

    let _ = writeln!(out, "  {:<48} {}", "--help, -h", "Print this help");
    let _ = writeln!(out, "  {:<48} {}", "--version, -V", "Print the version");
    let _ = writeln!(
        out,
        "\nA token of the form @<file> is replaced by the whitespace separated tokens of <file>."
    );
    out
}
