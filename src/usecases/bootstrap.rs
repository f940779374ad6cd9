use std::{path::Path, sync::Arc};

use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    infra::{self, config::FileConfigAdapter, contracts::ConfigAdapter, error::AppError},
    platform::{
        fixtures::{demo_directory, seed_demo_history},
        LoopbackBroker,
    },
    usecases::context::AppContext,
};

#[derive(Debug)]
pub struct Bootstrap {
    pub context: AppContext,
    /// Flushes file logs on drop; keep it alive for the whole run.
    pub log_guard: Option<WorkerGuard>,
}

pub fn bootstrap(config_path: Option<&Path>) -> Result<Bootstrap, AppError> {
    let context = build_context(&FileConfigAdapter::new(config_path))?;
    let log_guard = infra::logging::init(&context.config.logging)?;

    Ok(Bootstrap { context, log_guard })
}

fn build_context(config_adapter: &dyn ConfigAdapter) -> Result<AppContext, AppError> {
    let config = config_adapter.load()?;
    let broker = LoopbackBroker::new();
    seed_demo_history(&broker).map_err(|error| AppError::Other(error.into()))?;

    Ok(AppContext::new(
        config,
        Arc::new(broker),
        Arc::new(demo_directory()),
    ))
}
