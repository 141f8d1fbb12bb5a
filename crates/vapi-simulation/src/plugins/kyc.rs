use crate::clock::Clock;
use crate::definition::SimulationConfig;
use crate::error::SimulationResult;
use crate::plugin::SimulationPlugin;
use crate::state::{load_user, store_user, StateMap};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use vapi_types::MockRequest;

const DEFAULT_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KycStatus {
    Pending,
    Approved,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KycState {
    status: KycStatus,
    started_at: u64,
}

/// Verification that completes after a delay
///
/// The first request of a user starts the clock and answers `pending`. Once
/// `delayMs` (default 5000) has elapsed the status flips to `approved` and
/// stays there.
#[derive(Debug, Clone)]
pub struct KycPlugin {
    clock: Arc<dyn Clock>,
}

impl KycPlugin {
    /// Create plugin reading time from `clock`
    #[inline]
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn response(status: KycStatus) -> Value {
        match status {
            KycStatus::Pending => json!({"status": "pending", "message": "KYC in progress"}),
            KycStatus::Approved => json!({"status": "approved", "message": "KYC complete"}),
        }
    }
}

impl SimulationPlugin for KycPlugin {
    fn name(&self) -> &'static str {
        "kyc"
    }

    fn execute(
        &self,
        config: &SimulationConfig,
        request: &MockRequest,
        state: &mut StateMap,
    ) -> SimulationResult<Option<Value>> {
        let user = request.requesting_user();
        let now = self.clock.now_ms();

        let Some(mut current) = load_user::<KycState>(state, user) else {
            store_user(
                state,
                user,
                &KycState {
                    status: KycStatus::Pending,
                    started_at: now,
                },
            )?;
            return Ok(Some(Self::response(KycStatus::Pending)));
        };

        let delay = config
            .number("delayMs")
            .filter(|v| v.is_finite() && *v > 0.0)
            .map_or(DEFAULT_DELAY_MS, |v| v.ceil() as u64);
        if current.status == KycStatus::Pending && now.saturating_sub(current.started_at) >= delay {
            current.status = KycStatus::Approved;
            store_user(state, user, &current)?;
        }
        Ok(Some(Self::response(current.status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn pending_until_delay_then_approved() {
        let clock = Arc::new(ManualClock::new(1_000));
        let plugin = KycPlugin::new(clock.clone());
        let config = SimulationConfig::plugin("kyc").with_option("delayMs", json!(200));
        let req = MockRequest::with_body(json!({"userId": "u"}));
        let mut state = StateMap::new();

        let status = |state: &mut StateMap| {
            plugin.execute(&config, &req, state).unwrap().unwrap()["status"].clone()
        };

        assert_eq!(status(&mut state), json!("pending"));
        clock.advance(100);
        assert_eq!(status(&mut state), json!("pending"));
        clock.advance(100);
        assert_eq!(status(&mut state), json!("approved"));
        clock.advance(10_000);
        assert_eq!(status(&mut state), json!("approved"));
        assert_eq!(state["u"]["status"], json!("approved"));
    }

    #[test]
    fn messages_match_status() {
        let plugin = KycPlugin::new(Arc::new(ManualClock::new(0)));
        let out = plugin
            .execute(&SimulationConfig::plugin("kyc"), &MockRequest::default(), &mut StateMap::new())
            .unwrap()
            .unwrap();
        assert_eq!(out, json!({"status": "pending", "message": "KYC in progress"}));
    }

    #[test]
    fn default_delay_is_five_seconds() {
        let clock = Arc::new(ManualClock::new(0));
        let plugin = KycPlugin::new(clock.clone());
        let config = SimulationConfig::plugin("kyc");
        let req = MockRequest::default();
        let mut state = StateMap::new();
        plugin.execute(&config, &req, &mut state).unwrap();
        clock.set(4_999);
        assert_eq!(
            plugin.execute(&config, &req, &mut state).unwrap().unwrap()["status"],
            json!("pending")
        );
        clock.set(5_000);
        assert_eq!(
            plugin.execute(&config, &req, &mut state).unwrap().unwrap()["status"],
            json!("approved")
        );
    }

    #[test]
    fn float_delay_is_honored() {
        for delay in [json!(200.0), json!(199.5)] {
            let clock = Arc::new(ManualClock::new(0));
            let plugin = KycPlugin::new(clock.clone());
            let config = SimulationConfig::plugin("kyc").with_option("delayMs", delay.clone());
            let req = MockRequest::default();
            let mut state = StateMap::new();
            plugin.execute(&config, &req, &mut state).unwrap();
            clock.set(199);
            assert_eq!(
                plugin.execute(&config, &req, &mut state).unwrap().unwrap()["status"],
                json!("pending"),
                "{delay}"
            );
            clock.set(200);
            assert_eq!(
                plugin.execute(&config, &req, &mut state).unwrap().unwrap()["status"],
                json!("approved"),
                "{delay}"
            );
        }
    }
}
