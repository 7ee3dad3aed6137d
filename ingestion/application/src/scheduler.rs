use crate::catalog::InstrumentCatalog;
use crate::ports::Clock;
use crate::services::{IngestionService, RunReport};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use ingestion_domain::{
    next_boundary, CalendarError, Granularity, IngestionTarget, Segment, SessionGate, TRADING_TZ,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// A target together with the session gate that decides whether it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTarget {
    pub target: IngestionTarget,
    pub gate: SessionGate,
}

impl ScheduledTarget {
    pub fn standard(segment: Segment, granularity: Granularity) -> Self {
        let gate = match segment {
            Segment::Regular => SessionGate::regular(),
            Segment::Weekend => SessionGate::weekend(),
        };
        Self {
            target: IngestionTarget::standard(segment, granularity),
            gate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub granularity: Granularity,
    pub targets: Vec<ScheduledTarget>,
    pub timezone: Tz,
    pub failure_cooldown: Duration,
}

impl SchedulerConfig {
    /// Regular and weekend targets at `granularity`, Moscow session hours.
    pub fn standard(granularity: Granularity) -> Self {
        Self {
            granularity,
            targets: vec![
                ScheduledTarget::standard(Segment::Regular, granularity),
                ScheduledTarget::standard(Segment::Weekend, granularity),
            ],
            timezone: TRADING_TZ,
            failure_cooldown: Duration::from_secs(60),
        }
    }

    fn validate(&self) -> Result<(), SchedulerError> {
        if self.targets.is_empty() {
            return Err(SchedulerError::InvalidConfig(
                "at least one target is required".to_string(),
            ));
        }
        if let Some(mismatch) = self
            .targets
            .iter()
            .find(|t| t.target.granularity() != self.granularity)
        {
            return Err(SchedulerError::InvalidConfig(format!(
                "target {} has granularity {}, scheduler runs at {}",
                mismatch.target.table(),
                mismatch.target.granularity(),
                self.granularity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Waiting { until: DateTime<Utc> },
    Running { boundary: DateTime<Utc> },
}

/// Cooperative loop: wait for the next aligned boundary, run every gated
/// target sequentially, repeat.
pub struct Scheduler {
    config: SchedulerConfig,
    catalog: Arc<dyn InstrumentCatalog>,
    service: Arc<dyn IngestionService>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        catalog: Arc<dyn InstrumentCatalog>,
        service: Arc<dyn IngestionService>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            config,
            catalog,
            service,
            clock,
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.config.granularity
    }

    pub fn next_boundary(&self) -> Result<DateTime<Utc>, SchedulerError> {
        Ok(next_boundary(
            self.clock.now(),
            self.config.granularity,
            &self.config.timezone,
        )?)
    }

    /// Targets whose gate is open at `boundary`, in configuration order.
    pub fn due_targets(&self, boundary: DateTime<Utc>) -> Vec<IngestionTarget> {
        let local = boundary.with_timezone(&self.config.timezone);
        self.config
            .targets
            .iter()
            .filter(|scheduled| scheduled.gate.is_open(&local))
            .map(|scheduled| scheduled.target.clone())
            .collect()
    }

    /// Runs one boundary. The pass executes on its own task so a panic inside
    /// it surfaces here as an error instead of tearing down the loop.
    pub async fn run_boundary(
        &self,
        boundary: DateTime<Utc>,
    ) -> Result<Vec<RunReport>, SchedulerError> {
        let due = self.due_targets(boundary);
        if due.is_empty() {
            debug!(
                "No target open at {}, skipping",
                boundary.with_timezone(&self.config.timezone)
            );
            return Ok(Vec::new());
        }

        let catalog = self.catalog.clone();
        let service = self.service.clone();
        let pass = tokio::spawn(async move {
            let instruments = catalog.snapshot().await;
            let mut reports = Vec::with_capacity(due.len());
            for target in &due {
                reports.push(service.run_with_catalog(target, &instruments).await);
            }
            reports
        });

        pass.await
            .map_err(|e| SchedulerError::PassFailed(e.to_string()))
    }

    pub async fn run_forever(&self) {
        info!(
            "Scheduler started for {} candles ({} targets)",
            self.config.granularity,
            self.config.targets.len()
        );

        loop {
            let boundary = match self.next_boundary() {
                Ok(boundary) => boundary,
                Err(e) => {
                    self.cool_down(&e).await;
                    continue;
                }
            };

            self.transition(SchedulerState::Waiting { until: boundary });
            self.sleep_until(boundary).await;

            self.transition(SchedulerState::Running { boundary });
            if let Err(e) = self.run_boundary(boundary).await {
                self.cool_down(&e).await;
            }
        }
    }

    /// Runs until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run_forever() => {}
            _ = shutdown => {
                info!("{} scheduler stopping", self.config.granularity);
            }
        }
    }

    fn transition(&self, state: SchedulerState) {
        match state {
            SchedulerState::Waiting { until } => {
                let wait = until - self.clock.now();
                debug!(
                    "Sleeping for {} seconds until next {} boundary at {}",
                    wait.num_seconds(),
                    self.config.granularity,
                    until.with_timezone(&self.config.timezone)
                );
            }
            SchedulerState::Running { boundary } => {
                info!(
                    "Boundary {} reached",
                    boundary.with_timezone(&self.config.timezone)
                );
            }
        }
    }

    async fn sleep_until(&self, instant: DateTime<Utc>) {
        let wait = (instant - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;
    }

    async fn cool_down(&self, e: &SchedulerError) {
        error!(
            "Scheduler encountered an error: {}. Retrying in {} seconds.",
            e,
            self.config.failure_cooldown.as_secs()
        );
        tokio::time::sleep(self.config.failure_cooldown).await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    #[error("Boundary computation failed: {0}")]
    Boundary(#[from] CalendarError),

    #[error("Ingestion pass failed: {0}")]
    PassFailed(String),
}
