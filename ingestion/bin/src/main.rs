mod di;

use crate::di::create_app_module;
use anyhow::Context;
use futures::future::join_all;
use ingestion_application::{
    CandleRepository, Clock, IngestionService, InstrumentCatalog, Scheduler, SchedulerConfig,
};
use ingestion_domain::Granularity;
use ingestion_infrastructure::{init_logging, Settings};
use shaku::HasComponent;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("Failed to load settings")?;
    init_logging("candle-ingestion", settings.log_dir.as_deref())?;

    info!("Starting candle ingestion");
    info!(
        "API token is {}",
        if settings.api.token.is_empty() { "not set" } else { "set" }
    );
    info!(
        "Database {}:{}/{} as {}",
        settings.database.host,
        settings.database.port,
        settings.database.name,
        settings.database.user
    );

    let module = create_app_module(&settings);
    let repository: Arc<dyn CandleRepository> = module.resolve();
    let catalog: Arc<dyn InstrumentCatalog> = module.resolve();
    let service: Arc<dyn IngestionService> = module.resolve();
    let clock: Arc<dyn Clock> = module.resolve();

    let configs = [
        SchedulerConfig::standard(Granularity::TenMinutes),
        SchedulerConfig::standard(Granularity::Hour),
    ];

    for config in &configs {
        for scheduled in &config.targets {
            repository
                .ensure_table(scheduled.target.table())
                .await
                .with_context(|| format!("Failed to create table {}", scheduled.target.table()))?;
        }
    }

    let mut handles = Vec::with_capacity(configs.len());
    for config in configs {
        let scheduler = Scheduler::new(config, catalog.clone(), service.clone(), clock.clone())
            .context("Invalid scheduler configuration")?;
        handles.push(tokio::spawn(async move { scheduler.run_forever().await }));
    }

    info!("Schedulers running (Press Ctrl+C to stop)");

    tokio::select! {
        results = join_all(handles.iter_mut()) => {
            for result in results {
                if let Err(e) = result {
                    error!("Scheduler task ended: {}", e);
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping gracefully...");
        }
    }

    for handle in &handles {
        handle.abort();
    }
    info!("Shutdown complete");

    Ok(())
}
