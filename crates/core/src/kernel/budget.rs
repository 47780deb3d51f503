//! Budget charging: `Charge(step-cost, monetary-cost, now)` (spec.md §4.1).

use crate::types::{BudgetPolicy, BudgetUsage, ChargeResult, ExhaustionKind};

/// Charge advances usage atomically and reports exhaustion if any limit is
/// reached after charging (spec.md §4.1). Charging is durable: once committed
/// it is never reversed on downstream error (spec.md §4.1 Failure semantics).
pub fn charge(
    usage: &mut BudgetUsage,
    policy: &BudgetPolicy,
    step_cost: u32,
    monetary_cost_cents: u64,
) -> ChargeResult {
    usage.steps_consumed += step_cost;
    usage.cost_accumulated_cents += monetary_cost_cents;

    if usage.steps_consumed >= policy.max_steps {
        return ChargeResult::Exhausted(ExhaustionKind::Steps);
    }
    if usage.cost_accumulated_cents >= policy.max_cost_cents {
        return ChargeResult::Exhausted(ExhaustionKind::Cost);
    }
    if let Ok(elapsed) = usage.start.elapsed() {
        if elapsed >= policy.max_wall_clock {
            return ChargeResult::Exhausted(ExhaustionKind::Time);
        }
    }
    ChargeResult::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn charge_reports_step_exhaustion() {
        let policy = BudgetPolicy {
            max_steps: 2,
            max_cost_cents: u64::MAX,
            max_wall_clock: Duration::from_secs(3600),
        };
        let mut usage = BudgetUsage::new();
        assert_eq!(charge(&mut usage, &policy, 1, 0), ChargeResult::Ok);
        assert_eq!(
            charge(&mut usage, &policy, 1, 0),
            ChargeResult::Exhausted(ExhaustionKind::Steps)
        );
        assert_eq!(usage.steps_consumed, 2);
    }

    #[test]
    fn usage_never_decreases() {
        let policy = BudgetPolicy::default();
        let mut usage = BudgetUsage::new();
        charge(&mut usage, &policy, 1, 10);
        let steps_after_first = usage.steps_consumed;
        let cost_after_first = usage.cost_accumulated_cents;
        charge(&mut usage, &policy, 1, 10);
        assert!(usage.steps_consumed >= steps_after_first);
        assert!(usage.cost_accumulated_cents >= cost_after_first);
    }
}
