use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use super::CatalogRecords;
use crate::domain::discount::{DiscountKind, DiscountTier};
use crate::domain::hardware::AllocationStrategy;
use crate::domain::period::check_coverage;
use crate::domain::promotion::PromoEffect;
use crate::domain::PromoId;
use crate::errors::{
    ValidationError, ASYMMETRIC_EXCLUSION, DUPLICATE_ID, DUPLICATE_PRIORITY, INVALID_CONTRACT,
    INVALID_PERCENT, INVALID_SCHEDULE, INVALID_TIERS, INVALID_WINDOW, NEGATIVE_AMOUNT,
    UNKNOWN_EXCLUSION, UNKNOWN_REFERENCE,
};

/// Runs every load-time check and returns all defects found.
pub fn check_records(records: &CatalogRecords) -> Vec<ValidationError> {
    let mut defects = Vec::new();
    check_duplicates(records, &mut defects);
    check_tariffs(records, &mut defects);
    check_hardware(records, &mut defects);
    check_promotions(records, &mut defects);
    check_discounts(records, &mut defects);
    check_commissions(records, &mut defects);
    check_sub_variants(records, &mut defects);
    defects
}

fn check_duplicates(records: &CatalogRecords, defects: &mut Vec<ValidationError>) {
    report_duplicates("tariff", records.tariffs.iter().map(|t| t.id.as_str()), defects);
    report_duplicates("hardware", records.hardware.iter().map(|h| h.id.as_str()), defects);
    report_duplicates("promotion", records.promotions.iter().map(|p| p.id.as_str()), defects);
    report_duplicates("discount rule", records.discounts.iter().map(|d| d.id.as_str()), defects);
    report_duplicates(
        "commission rule",
        records.commissions.iter().map(|c| c.id.as_str()),
        defects,
    );
    report_duplicates(
        "sub-variant rule",
        records.sub_variants.iter().map(|s| s.id.as_str()),
        defects,
    );
    for item in &records.hardware {
        report_duplicates(
            "subsidy rule",
            item.subsidy_rules.iter().map(|rule| rule.id.as_str()),
            defects,
        );
    }
}

fn report_duplicates<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
    defects: &mut Vec<ValidationError>,
) {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            defects.push(ValidationError::new(DUPLICATE_ID, format!("duplicate {kind} id `{id}`")));
        }
    }
}

fn check_tariffs(records: &CatalogRecords, defects: &mut Vec<ValidationError>) {
    for tariff in &records.tariffs {
        if tariff.contract_months == 0 {
            defects.push(ValidationError::new(
                INVALID_CONTRACT,
                format!("tariff `{}` must have a positive contract duration", tariff.id),
            ));
            continue;
        }
        if let Err(defect) = check_coverage(&tariff.base_schedule, tariff.contract_months) {
            defects.push(ValidationError::new(
                INVALID_SCHEDULE,
                format!("tariff `{}` base schedule: {defect}", tariff.id),
            ));
        }
        let negative_price =
            tariff.base_schedule.iter().any(|period| period.price.is_sign_negative());
        if negative_price
            || tariff.monthly_cost.is_sign_negative()
            || tariff.one_time_fee.is_sign_negative()
        {
            defects.push(ValidationError::new(
                NEGATIVE_AMOUNT,
                format!("tariff `{}` carries a negative price, cost or fee", tariff.id),
            ));
        }
    }
}

fn check_hardware(records: &CatalogRecords, defects: &mut Vec<ValidationError>) {
    for item in &records.hardware {
        if item.retail_price.is_sign_negative() {
            defects.push(ValidationError::new(
                NEGATIVE_AMOUNT,
                format!("hardware `{}` has a negative retail price", item.id),
            ));
        }
        for rule in &item.subsidy_rules {
            if rule.amount.is_sign_negative() {
                defects.push(ValidationError::new(
                    NEGATIVE_AMOUNT,
                    format!("subsidy rule `{}` of `{}` is negative", rule.id, item.id),
                ));
            }
            if matches!(rule.allocation, AllocationStrategy::Deferred { months: 0 }) {
                defects.push(ValidationError::new(
                    INVALID_SCHEDULE,
                    format!("subsidy rule `{}` of `{}` defers over zero months", rule.id, item.id),
                ));
            }
        }
    }
}

fn check_promotions(records: &CatalogRecords, defects: &mut Vec<ValidationError>) {
    let declared: BTreeMap<&PromoId, &BTreeSet<PromoId>> =
        records.promotions.iter().map(|promotion| (&promotion.id, &promotion.excludes)).collect();

    for promotion in &records.promotions {
        if promotion.valid_from > promotion.valid_until {
            defects.push(ValidationError::new(
                INVALID_WINDOW,
                format!(
                    "promotion `{}` is valid from {} until {}",
                    promotion.id, promotion.valid_from, promotion.valid_until
                ),
            ));
        }

        match &promotion.effect {
            PromoEffect::IntroPrice { price } if price.is_sign_negative() => {
                defects.push(ValidationError::new(
                    NEGATIVE_AMOUNT,
                    format!("promotion `{}` has a negative intro price", promotion.id),
                ));
            }
            PromoEffect::AbsoluteOffBase { amount } if amount.is_sign_negative() => {
                defects.push(ValidationError::new(
                    NEGATIVE_AMOUNT,
                    format!("promotion `{}` has a negative reduction", promotion.id),
                ));
            }
            PromoEffect::PercentOffBase { percent } if !is_percent(*percent) => {
                defects.push(percent_defect("promotion", promotion.id.as_str()));
            }
            _ => {}
        }

        for excluded in &promotion.excludes {
            match declared.get(excluded) {
                None => defects.push(ValidationError::new(
                    UNKNOWN_EXCLUSION,
                    format!("promotion `{}` excludes unknown promotion `{excluded}`", promotion.id),
                )),
                Some(reverse) if !reverse.contains(&promotion.id) => {
                    defects.push(ValidationError::new(
                        ASYMMETRIC_EXCLUSION,
                        format!(
                            "promotion `{}` excludes `{excluded}` but not the other way round",
                            promotion.id
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

fn check_discounts(records: &CatalogRecords, defects: &mut Vec<ValidationError>) {
    let promotions: BTreeSet<&PromoId> = records.promotions.iter().map(|p| &p.id).collect();
    let mut priorities = BTreeMap::new();

    for rule in &records.discounts {
        if let Some(previous) = priorities.insert(rule.priority, &rule.id) {
            defects.push(ValidationError::new(
                DUPLICATE_PRIORITY,
                format!(
                    "discount rules `{previous}` and `{}` share stacking priority {}",
                    rule.id, rule.priority
                ),
            ));
        }

        match &rule.kind {
            DiscountKind::Percentage { percent } if !is_percent(*percent) => {
                defects.push(percent_defect("discount rule", rule.id.as_str()));
            }
            DiscountKind::FixedAmount { amount } if amount.is_sign_negative() => {
                defects.push(ValidationError::new(
                    NEGATIVE_AMOUNT,
                    format!("discount rule `{}` has a negative amount", rule.id),
                ));
            }
            DiscountKind::TieredByQuantity { tiers } => {
                if let Some(problem) = tier_problem(tiers) {
                    defects.push(ValidationError::new(
                        INVALID_TIERS,
                        format!("discount rule `{}`: {problem}", rule.id),
                    ));
                }
                if tiers.iter().any(|tier| !is_percent(tier.percent)) {
                    defects.push(percent_defect("discount rule", rule.id.as_str()));
                }
            }
            _ => {}
        }

        if let Some(promo) = &rule.condition.requires_promo {
            if !promotions.contains(promo) {
                defects.push(ValidationError::new(
                    UNKNOWN_REFERENCE,
                    format!("discount rule `{}` requires unknown promotion `{promo}`", rule.id),
                ));
            }
        }
    }
}

fn tier_problem(tiers: &[DiscountTier]) -> Option<&'static str> {
    if tiers.is_empty() {
        return Some("tiered discount has no tiers");
    }
    for tier in tiers {
        if tier.max_quantity.is_some_and(|max| max < tier.min_quantity) {
            return Some("tier upper bound is below its lower bound");
        }
    }
    for pair in tiers.windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        if upper.min_quantity <= lower.min_quantity {
            return Some("tiers are not ordered by quantity");
        }
        match lower.max_quantity {
            Some(max) if max < upper.min_quantity => {}
            _ => return Some("tiers overlap"),
        }
    }
    None
}

fn check_commissions(records: &CatalogRecords, defects: &mut Vec<ValidationError>) {
    let tariffs: BTreeSet<_> = records.tariffs.iter().map(|t| &t.id).collect();
    let promotions: BTreeSet<_> = records.promotions.iter().map(|p| &p.id).collect();

    for rule in &records.commissions {
        match (&rule.tariff_id, &rule.category) {
            (None, None) => defects.push(ValidationError::new(
                UNKNOWN_REFERENCE,
                format!("commission rule `{}` names neither tariff nor category", rule.id),
            )),
            (Some(tariff), _) if !tariffs.contains(tariff) => defects.push(ValidationError::new(
                UNKNOWN_REFERENCE,
                format!("commission rule `{}` references unknown tariff `{tariff}`", rule.id),
            )),
            _ => {}
        }
        if let Some(promo) = &rule.promo_id {
            if !promotions.contains(promo) {
                defects.push(ValidationError::new(
                    UNKNOWN_REFERENCE,
                    format!("commission rule `{}` references unknown promotion `{promo}`", rule.id),
                ));
            }
        }
        let percents = [rule.airtime_percent, rule.hardware_percent, rule.deduction_percent];
        if !percents.into_iter().all(is_percent) {
            defects.push(percent_defect("commission rule", rule.id.as_str()));
        }
        if rule.activation_amount.is_sign_negative() {
            defects.push(ValidationError::new(
                NEGATIVE_AMOUNT,
                format!("commission rule `{}` has a negative activation amount", rule.id),
            ));
        }
    }
}

fn check_sub_variants(records: &CatalogRecords, defects: &mut Vec<ValidationError>) {
    let tariffs: BTreeSet<_> = records.tariffs.iter().map(|t| &t.id).collect();

    for rule in &records.sub_variants {
        match (&rule.base_tariff, &rule.base_category) {
            (None, None) => defects.push(ValidationError::new(
                UNKNOWN_REFERENCE,
                format!("sub-variant rule `{}` names neither base tariff nor category", rule.id),
            )),
            (Some(tariff), _) if !tariffs.contains(tariff) => defects.push(ValidationError::new(
                UNKNOWN_REFERENCE,
                format!("sub-variant rule `{}` references unknown tariff `{tariff}`", rule.id),
            )),
            _ => {}
        }
    }
}

fn is_percent(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE_HUNDRED
}

fn percent_defect(kind: &str, id: &str) -> ValidationError {
    ValidationError::new(INVALID_PERCENT, format!("{kind} `{id}` has a percent outside 0..=100"))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::check_records;
    use crate::catalog::CatalogSnapshot;
    use crate::domain::discount::{DiscountKind, DiscountTier};
    use crate::domain::period::PricePeriod;
    use crate::domain::PromoId;
    use crate::errors::{
        ASYMMETRIC_EXCLUSION, DUPLICATE_ID, DUPLICATE_PRIORITY, INVALID_PERCENT, INVALID_SCHEDULE,
        INVALID_TIERS, INVALID_WINDOW, UNKNOWN_EXCLUSION,
    };
    use crate::fixtures;

    fn codes(records: &crate::catalog::CatalogRecords) -> Vec<String> {
        check_records(records).into_iter().map(|defect| defect.code).collect()
    }

    #[test]
    fn fixture_catalogs_are_clean() {
        assert!(check_records(&fixtures::catalog_2025_09()).is_empty());
        assert!(check_records(&fixtures::catalog_2025_10()).is_empty());
    }

    #[test]
    fn asymmetric_exclusion_is_a_catalog_defect() {
        let mut records = fixtures::catalog_2025_10();
        let promo = records
            .promotions
            .iter_mut()
            .find(|promotion| !promotion.excludes.is_empty())
            .expect("fixture has an exclusion");
        let target = promo.excludes.iter().next().cloned().expect("excluded id");
        let source = promo.id.clone();
        let reverse = records
            .promotions
            .iter_mut()
            .find(|promotion| promotion.id == target)
            .expect("excluded promotion exists");
        reverse.excludes.remove(&source);

        assert!(codes(&records).contains(&ASYMMETRIC_EXCLUSION.to_owned()));
        let error = CatalogSnapshot::from_records(records).expect_err("snapshot is rejected");
        assert!(error.has_code(ASYMMETRIC_EXCLUSION));
    }

    #[test]
    fn unknown_exclusion_target_is_reported() {
        let mut records = fixtures::catalog_2025_10();
        records.promotions[0].excludes.insert(PromoId::from("ghost"));
        assert!(codes(&records).contains(&UNKNOWN_EXCLUSION.to_owned()));
    }

    #[test]
    fn broken_schedules_and_windows_are_reported() {
        let mut records = fixtures::catalog_2025_10();
        records.tariffs[0].base_schedule = vec![PricePeriod::new(0, 12, Decimal::new(40, 0))];
        let promo = &mut records.promotions[0];
        std::mem::swap(&mut promo.valid_from, &mut promo.valid_until);

        let found = codes(&records);
        assert!(found.contains(&INVALID_SCHEDULE.to_owned()));
        assert!(found.contains(&INVALID_WINDOW.to_owned()));
    }

    #[test]
    fn discount_priorities_and_tiers_are_checked() {
        let mut records = fixtures::catalog_2025_10();
        let mut clone = records.discounts[0].clone();
        clone.id = "copy".into();
        clone.kind = DiscountKind::TieredByQuantity {
            tiers: vec![
                DiscountTier { min_quantity: 1, max_quantity: Some(5), percent: Decimal::ONE },
                DiscountTier { min_quantity: 4, max_quantity: None, percent: Decimal::TWO },
            ],
        };
        records.discounts.push(clone);
        records.tariffs.push(records.tariffs[0].clone());

        let found = codes(&records);
        assert!(found.contains(&DUPLICATE_PRIORITY.to_owned()));
        assert!(found.contains(&INVALID_TIERS.to_owned()));
        assert!(found.contains(&DUPLICATE_ID.to_owned()));
    }

    #[test]
    fn commission_deduction_must_be_a_percent() {
        let mut records = fixtures::catalog_2025_10();
        records.commissions[0].deduction_percent = Decimal::new(101, 0);
        assert!(codes(&records).contains(&INVALID_PERCENT.to_owned()));

        records.commissions[0].deduction_percent = Decimal::new(25, 0);
        assert!(check_records(&records).is_empty());
    }
}
