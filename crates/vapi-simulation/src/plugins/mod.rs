//! Built-in simulation plugins
//!
//! - [`BalancePlugin`]: running account balance per user
//! - [`FraudPlugin`]: sticky random risk score per user
//! - [`KycPlugin`]: time-driven verification status per user

mod balance;
mod fraud;
mod kyc;

pub use balance::BalancePlugin;
pub use fraud::FraudPlugin;
pub use kyc::KycPlugin;

use serde_json::{Number, Value};

/// JSON number that stays an integer when the value is whole
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub(crate) fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Value::from(value as i64);
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}
