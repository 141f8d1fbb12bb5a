use super::json_number;
use crate::definition::SimulationConfig;
use crate::error::SimulationResult;
use crate::plugin::SimulationPlugin;
use crate::state::{load_user, store_user, StateMap};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vapi_types::MockRequest;

const DEFAULT_INITIAL: f64 = 1000.0;

#[derive(Debug, Serialize, Deserialize)]
struct BalanceState {
    balance: f64,
}

/// Running balance per user
///
/// Body `{amount, type}` with `type` of `debit` or `credit` moves the balance;
/// anything else only reads it. A zero or non-numeric amount is ignored.
/// Options: `initial` (default 1000).
#[derive(Debug, Default, Clone, Copy)]
pub struct BalancePlugin;

impl SimulationPlugin for BalancePlugin {
    fn name(&self) -> &'static str {
        "balance"
    }

    fn execute(
        &self,
        config: &SimulationConfig,
        request: &MockRequest,
        state: &mut StateMap,
    ) -> SimulationResult<Option<Value>> {
        let user = request.requesting_user();
        let mut current = load_user::<BalanceState>(state, user).unwrap_or(BalanceState {
            balance: config
                .number("initial")
                .filter(|v| *v != 0.0)
                .unwrap_or(DEFAULT_INITIAL),
        });

        let amount = request
            .body_field("amount")
            .and_then(Value::as_f64)
            .filter(|v| *v != 0.0);
        match (amount, request.body_field("type").and_then(Value::as_str)) {
            (Some(amount), Some("debit")) => current.balance -= amount,
            (Some(amount), Some("credit")) => current.balance += amount,
            _ => {}
        }

        store_user(state, user, &current)?;
        Ok(Some(json!({
            "userId": user,
            "balance": json_number(current.balance),
        })))
    }
}
