//! Run command - preprocess the configured artifacts

use crate::cli::summary;
use crate::config::Config;
use crate::error::PrepResult;
use crate::instrument::AgentProcessInstrumentor;
use crate::orchestration::{Orchestrator, RunStatus};
use std::sync::Arc;
use tracing::debug;

/// Execute a preprocessing run with the instrumentation agent
pub async fn execute(config: &Config) -> PrepResult<RunStatus> {
    config.ensure_runnable()?;

    let instrumentor = AgentProcessInstrumentor::from_config(config)?;
    debug!("Using instrumentor {:?}", instrumentor);

    let orchestrator = Orchestrator::new(Arc::new(instrumentor));
    let result = orchestrator.run(config).await?;

    summary::print_summary(&result, config.log_level());
    Ok(result.status)
}
