use super::json_number;
use crate::definition::SimulationConfig;
use crate::error::SimulationResult;
use crate::plugin::SimulationPlugin;
use crate::state::{load_user, store_user, StateMap};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vapi_types::MockRequest;

const DEFAULT_THRESHOLD: f64 = 70.0;

#[derive(Debug, Serialize, Deserialize)]
struct FraudState {
    score: u8,
}

/// Risk score per user
///
/// The score is drawn uniformly from `0..=100` the first time a user is seen
/// and stays fixed. Risk is `high` when the score exceeds `threshold`
/// (default 70).
#[derive(Debug, Default, Clone, Copy)]
pub struct FraudPlugin;

impl SimulationPlugin for FraudPlugin {
    fn name(&self) -> &'static str {
        "fraud"
    }

    fn execute(
        &self,
        config: &SimulationConfig,
        request: &MockRequest,
        state: &mut StateMap,
    ) -> SimulationResult<Option<Value>> {
        let user = request.requesting_user();
        let current = match load_user::<FraudState>(state, user) {
            Some(existing) => existing,
            None => {
                let fresh = FraudState {
                    score: rand::rng().random_range(0..=100),
                };
                store_user(state, user, &fresh)?;
                fresh
            }
        };

        let threshold = config
            .number("threshold")
            .filter(|v| *v != 0.0)
            .unwrap_or(DEFAULT_THRESHOLD);
        let risk = if f64::from(current.score) > threshold {
            "high"
        } else {
            "low"
        };

        Ok(Some(json!({
            "userId": user,
            "score": json_number(f64::from(current.score)),
            "risk": risk,
        })))
    }
}
