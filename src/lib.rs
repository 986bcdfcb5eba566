//! jarprep - ahead-of-time Java artifact instrumentation
//!
//! Applies an instrumentation agent to jars, directories of jars and a JDK
//! runtime before deployment, optionally splitting the work over concurrent
//! partitions and skipping artifacts that were already instrumented.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod instrument;
pub mod orchestration;
pub mod partition;
pub mod signing;
pub mod source;

pub use error::{PrepError, PrepResult};
