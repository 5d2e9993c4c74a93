// libs/appointment-cell/src/services/pricing.rs
use serde::{Deserialize, Serialize};
use tracing::debug;

use shared_store::{Doctor, Schedule};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeQuote {
    pub base_fee: i64,
    pub discount_percent: i32,
    pub final_fee: i64,
}

impl FeeQuote {
    pub fn is_free(&self) -> bool {
        self.final_fee == 0
    }
}

/// Resolve the fee for a booking: the schedule's fee wins, then the doctor's
/// default, then zero. The discount comes from the schedule and is applied
/// with integer flooring.
pub fn quote(schedule: Option<&Schedule>, doctor: Option<&Doctor>) -> FeeQuote {
    let base_fee = schedule
        .and_then(|s| s.consultation_fee)
        .or_else(|| doctor.and_then(|d| d.default_fee))
        .unwrap_or(0);
    let discount_percent = schedule.map(|s| s.discount_percent).unwrap_or(0).clamp(0, 100);
    let final_fee = apply_discount(base_fee, discount_percent);

    debug!(
        "fee quote: base {} discount {}% -> {}",
        base_fee, discount_percent, final_fee
    );
    FeeQuote {
        base_fee,
        discount_percent,
        final_fee,
    }
}

/// `floor(base * (100 - discount) / 100)` in minor currency units.
pub fn apply_discount(base: i64, discount_percent: i32) -> i64 {
    let discount = discount_percent.clamp(0, 100) as i64;
    base * (100 - discount) / 100
}
