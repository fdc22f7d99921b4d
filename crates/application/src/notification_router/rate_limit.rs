use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use gatehouse_core::ConnectionId;
use gatehouse_domain::NotificationKind;

struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Per-connection, per-kind rolling-window limiter.
///
/// Over-limit events are rejected, never queued, so a chatty event source
/// cannot grow unbounded per-connection buffers.
pub(super) struct ConnectionRateLimiter {
    max_events: u32,
    window: Duration,
    windows: Mutex<HashMap<(ConnectionId, NotificationKind), Window>>,
}

impl ConnectionRateLimiter {
    pub(super) fn new(max_events: u32, window: Duration) -> Self {
        Self {
            max_events,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records an event against the window and returns whether it may be
    /// delivered.
    pub(super) fn allow(
        &self,
        connection_id: ConnectionId,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> bool {
        let Ok(mut windows) = self.windows.lock() else {
            // A poisoned lock means another thread panicked mid-update;
            // failing open would lift the memory bound, so reject.
            return false;
        };

        let window = windows.entry((connection_id, kind)).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now - window.started_at >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.max_events {
            return false;
        }

        window.count += 1;
        true
    }

    /// Drops state for a closed connection.
    pub(super) fn forget(&self, connection_id: ConnectionId) {
        if let Ok(mut windows) = self.windows.lock() {
            windows.retain(|(stored, _), _| *stored != connection_id);
        }
    }
}
