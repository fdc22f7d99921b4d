//! Background sweeps: overdue flagging, pre-registration expiry, no-show
//! marking, and ledger retention, each on its own interval.
//!
//! Sweeps run in-process; the services they call are single-flight, so a
//! tick that lands while the previous pass is still running is a no-op.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::audit_service::AuditService;
use crate::visit_service::VisitService;

/// Sweep cadence, read once at startup.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Interval between overdue-visit passes.
    pub overdue_interval: Duration,
    /// Interval between pre-registration expiry passes.
    pub expiry_interval: Duration,
    /// Interval between no-show passes.
    pub no_show_interval: Duration,
    /// Interval between ledger retention passes.
    pub retention_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            overdue_interval: Duration::from_secs(60),
            expiry_interval: Duration::from_secs(300),
            no_show_interval: Duration::from_secs(300),
            retention_interval: Duration::from_secs(3600),
        }
    }
}

/// Spawns the periodic sweep tasks and keeps their join handles.
pub struct SweepScheduler {
    handles: Vec<JoinHandle<()>>,
}

impl SweepScheduler {
    /// Starts all four sweep loops on the current runtime.
    #[must_use]
    pub fn start(visits: VisitService, audit: AuditService, config: SweepConfig) -> Self {
        let mut handles = Vec::with_capacity(4);

        {
            let visits = visits.clone();
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(config.overdue_interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    match visits.sweep_overdue(Utc::now()).await {
                        Ok(report) if report.affected > 0 => {
                            info!(flagged = report.affected, "overdue sweep complete");
                        }
                        Ok(_) => {}
                        Err(err) => error!(%err, "overdue sweep failed"),
                    }
                }
            }));
        }

        {
            let visits = visits.clone();
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(config.expiry_interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    match visits.sweep_expired_pre_registrations(Utc::now()).await {
                        Ok(report) if report.affected > 0 => {
                            info!(expired = report.affected, "expiry sweep complete");
                        }
                        Ok(_) => {}
                        Err(err) => error!(%err, "expiry sweep failed"),
                    }
                }
            }));
        }

        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.no_show_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match visits.sweep_no_shows(Utc::now()).await {
                    Ok(report) if report.affected > 0 => {
                        info!(marked = report.affected, "no-show sweep complete");
                    }
                    Ok(_) => {}
                    Err(err) => error!(%err, "no-show sweep failed"),
                }
            }
        }));

        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.retention_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match audit.sweep_retention(Utc::now()).await {
                    Ok(report) if report.anonymized > 0 || report.deleted > 0 => {
                        info!(
                            anonymized = report.anonymized,
                            deleted = report.deleted,
                            "retention sweep complete"
                        );
                    }
                    Ok(_) => {}
                    Err(err) => error!(%err, "retention sweep failed"),
                }
            }
        }));

        Self { handles }
    }

    /// Aborts all sweep loops.
    pub fn shutdown(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
