//! Console SMS service. Outbound SMS transport is an external capability;
//! this adapter logs the message so development and tests can observe the
//! escalation path end to end.

use async_trait::async_trait;
use gatehouse_application::SmsService;
use gatehouse_core::AppResult;
use tracing::info;

/// Development SMS service that logs messages to the console.
#[derive(Clone)]
pub struct ConsoleSmsService;

impl ConsoleSmsService {
    /// Creates a new console SMS service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleSmsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsService for ConsoleSmsService {
    async fn send_sms(&self, to: &str, body: &str) -> AppResult<()> {
        info!(to = to, "--- SMS (console) ---\nTo: {}\n\n{}\n--- END SMS ---", to, body);
        Ok(())
    }
}
