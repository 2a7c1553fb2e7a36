//! Device subsidy allocation across the contract.

use rust_decimal::Decimal;

use crate::domain::hardware::{AllocationStrategy, HardwareAllocation, HardwareItem, SubsidyRule};
use crate::domain::money::{checked_mul, checked_sub, clamp_non_negative, Rounding};
use crate::domain::tariff::TariffDefinition;
use crate::errors::EngineError;

/// Most specific matching rule; ties go to the smallest rule id.
pub fn select_subsidy_rule<'a>(
    item: &'a HardwareItem,
    tariff: &TariffDefinition,
) -> Option<&'a SubsidyRule> {
    item.subsidy_rules
        .iter()
        .filter(|rule| rule.matches(tariff))
        .min_by(|a, b| b.specificity().cmp(&a.specificity()).then_with(|| a.id.cmp(&b.id)))
}

/// Spreads `total` over `contract_months` so the shares sum to `total` exactly.
pub fn allocate(
    strategy: AllocationStrategy,
    total: Decimal,
    contract_months: u32,
    rounding: Rounding,
) -> Result<Vec<Decimal>, EngineError> {
    let mut monthly = vec![Decimal::ZERO; contract_months as usize];
    if monthly.is_empty() || total.is_zero() {
        return Ok(monthly);
    }

    let spread_over = match strategy {
        AllocationStrategy::FrontLoaded => 1,
        AllocationStrategy::StraightLine => contract_months,
        AllocationStrategy::Deferred { months } => months.clamp(1, contract_months),
    };

    let share = rounding.truncate(total / Decimal::from(spread_over));
    let last = spread_over as usize - 1;
    for slot in monthly.iter_mut().take(last) {
        *slot = share;
    }
    let allocated = checked_mul(share, Decimal::from(spread_over - 1), "subsidy allocation")?;
    monthly[last] = checked_sub(total, allocated, "subsidy allocation")?;
    Ok(monthly)
}

/// Subsidy cost per month and the customer's upfront payment for `quantity` devices.
pub fn hardware_allocation(
    hardware: Option<&HardwareItem>,
    tariff: &TariffDefinition,
    quantity: u32,
    rounding: Rounding,
) -> Result<HardwareAllocation, EngineError> {
    let Some(item) = hardware else {
        return Ok(HardwareAllocation::none(tariff.contract_months));
    };

    let quantity = Decimal::from(quantity);
    let rule = select_subsidy_rule(item, tariff);
    let unit_subsidy = rule.map_or(Decimal::ZERO, |rule| rule.amount.min(item.retail_price));
    let total_subsidy = checked_mul(unit_subsidy, quantity, "hardware subsidy")?;
    let unit_upfront = clamp_non_negative(checked_sub(item.retail_price, unit_subsidy, "upfront")?);
    let upfront_payment = checked_mul(unit_upfront, quantity, "hardware upfront")?;

    let strategy = rule.map_or(AllocationStrategy::StraightLine, |rule| rule.allocation);
    let monthly = allocate(strategy, total_subsidy, tariff.contract_months, rounding)?;

    Ok(HardwareAllocation {
        hardware_id: Some(item.id.clone()),
        subsidy_rule: rule.map(|rule| rule.id.clone()),
        total_subsidy,
        upfront_payment,
        monthly,
    })
}
