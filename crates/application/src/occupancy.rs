//! Live occupancy projection.
//!
//! A read-optimized counter over `checked_in` visits, updated synchronously
//! inside the same unit of work as each transition and rebuildable at any
//! time by recounting the visit repository. The ≥90% threshold alert to the
//! admin role is computed here and nowhere else.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use gatehouse_core::AppResult;
use gatehouse_domain::{
    NotificationEvent, NotificationKind, NotificationPriority, NotificationTarget, StaffRole,
    VisitStatus,
};
use serde_json::json;

use crate::visit_ports::VisitRepository;

/// Point-in-time occupancy reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancySnapshot {
    /// Visits currently checked in.
    pub current: usize,
    /// Configured maximum occupancy.
    pub max: usize,
    /// `current / max`, or zero when no maximum is configured.
    pub rate: f64,
}

/// Lock-free occupancy counter with an edge-triggered threshold alert.
pub struct OccupancyTracker {
    current: AtomicUsize,
    max_occupancy: usize,
    // True while below the alert threshold; crossing it fires once and
    // disarms until occupancy falls back under the line.
    alert_armed: AtomicBool,
}

impl OccupancyTracker {
    /// Creates an empty tracker for the configured maximum.
    #[must_use]
    pub fn new(max_occupancy: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max_occupancy,
            alert_armed: AtomicBool::new(true),
        }
    }

    /// Returns the current occupancy count.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Returns the configured maximum.
    #[must_use]
    pub fn max_occupancy(&self) -> usize {
        self.max_occupancy
    }

    /// Returns the occupancy rate in `[0, ∞)`; zero when unconfigured.
    #[must_use]
    pub fn rate(&self) -> f64 {
        if self.max_occupancy == 0 {
            return 0.0;
        }

        #[allow(clippy::cast_precision_loss)]
        {
            self.current() as f64 / self.max_occupancy as f64
        }
    }

    /// Returns a point-in-time reading.
    #[must_use]
    pub fn snapshot(&self) -> OccupancySnapshot {
        OccupancySnapshot {
            current: self.current(),
            max: self.max_occupancy,
            rate: self.rate(),
        }
    }

    /// Applies a check-in. Returns the admin alert event when this update
    /// crosses the 90% threshold.
    pub fn on_checked_in(&self) -> Option<NotificationEvent> {
        let new_count = self.current.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.threshold_reached(new_count) {
            return None;
        }

        if self.alert_armed.swap(false, Ordering::SeqCst) {
            return Some(self.alert_event(new_count));
        }

        None
    }

    /// Applies a check-out, re-arming the alert once occupancy falls back
    /// below the threshold. Saturates at zero.
    pub fn on_checked_out(&self) {
        let previous = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                Some(count.saturating_sub(1))
            })
            .unwrap_or(0);

        let new_count = previous.saturating_sub(1);
        if !self.threshold_reached(new_count) {
            self.alert_armed.store(true, Ordering::SeqCst);
        }
    }

    /// Rebuilds the projection by recounting checked-in visits. The visit
    /// repository is the only source of truth.
    pub async fn rebuild(&self, visits: &dyn VisitRepository) -> AppResult<()> {
        let count = visits.count_by_status(VisitStatus::CheckedIn).await?;
        self.current.store(count, Ordering::SeqCst);
        self.alert_armed
            .store(!self.threshold_reached(count), Ordering::SeqCst);
        Ok(())
    }

    /// Builds the broadcast event for a changed count.
    #[must_use]
    pub fn changed_event(&self) -> NotificationEvent {
        let snapshot = self.snapshot();
        NotificationEvent::new(
            NotificationKind::OccupancyChanged,
            vec![NotificationTarget::Broadcast],
            "Occupancy changed",
            format!("{} of {} currently inside", snapshot.current, snapshot.max),
            json!({
                "current": snapshot.current,
                "max": snapshot.max,
                "rate": snapshot.rate,
            }),
            NotificationPriority::Low,
        )
    }

    fn threshold_reached(&self, count: usize) -> bool {
        self.max_occupancy > 0 && count * 10 >= self.max_occupancy * 9
    }

    fn alert_event(&self, count: usize) -> NotificationEvent {
        NotificationEvent::new(
            NotificationKind::OccupancyAlert,
            vec![NotificationTarget::Role {
                role: StaffRole::Admin,
            }],
            "Occupancy alert",
            format!(
                "Occupancy reached {count} of {} (≥90% of capacity)",
                self.max_occupancy
            ),
            json!({
                "current": count,
                "max": self.max_occupancy,
            }),
            NotificationPriority::High,
        )
    }
}
