//! Promotion eligibility and compatibility.

use std::collections::BTreeSet;

use tracing::debug;

use crate::catalog::CatalogSnapshot;
use crate::domain::basket::CustomerContext;
use crate::domain::promotion::Promotion;
use crate::domain::tariff::TariffDefinition;
use crate::domain::PromoId;
use crate::errors::{
    EngineError, PROMO_ELIGIBILITY_MISSING, PROMO_NOT_APPLICABLE, PROMO_OUT_OF_WINDOW,
};

/// Resolves the requested promotions for one selection.
///
/// Duplicates collapse and the result is ordered by id. Eligibility is checked for every
/// promotion before any pair is tested for compatibility, so an ineligible promotion is
/// always reported as a validation failure, never as a conflict.
pub fn resolve_promotions<'a>(
    catalog: &'a CatalogSnapshot,
    tariff: &TariffDefinition,
    requested: &[PromoId],
    customer: &CustomerContext,
) -> Result<Vec<&'a Promotion>, EngineError> {
    let unique: BTreeSet<&PromoId> = requested.iter().collect();

    let mut resolved = Vec::with_capacity(unique.len());
    for id in unique {
        let promotion = catalog.promotion(id)?;
        if let Err(error) = check_eligibility(promotion, tariff, customer) {
            debug!(
                event_name = "engine.promo.rejected",
                promo_id = %id,
                tariff_id = %tariff.id,
                reason = error.class(),
                "promotion is not eligible"
            );
            return Err(error);
        }
        resolved.push(promotion);
    }

    let ids: Vec<PromoId> = resolved.iter().map(|promotion| promotion.id.clone()).collect();
    if let Some((first, second)) = catalog.exclusions().first_conflict(&ids) {
        debug!(
            event_name = "engine.promo.conflict",
            first = %first,
            second = %second,
            "requested promotions exclude each other"
        );
        return Err(EngineError::incompatible(first, second));
    }

    Ok(resolved)
}

pub fn check_eligibility(
    promotion: &Promotion,
    tariff: &TariffDefinition,
    customer: &CustomerContext,
) -> Result<(), EngineError> {
    if !promotion.is_valid_on(customer.as_of) {
        return Err(EngineError::validation(
            PROMO_OUT_OF_WINDOW,
            format!(
                "promotion `{}` is valid from {} until {}, not on {}",
                promotion.id, promotion.valid_from, promotion.valid_until, customer.as_of
            ),
        ));
    }
    if !promotion.applies_to(tariff) {
        return Err(EngineError::validation(
            PROMO_NOT_APPLICABLE,
            format!("promotion `{}` does not apply to tariff `{}`", promotion.id, tariff.id),
        ));
    }
    if promotion.requires_eligibility && !customer.has_eligibility {
        return Err(EngineError::validation(
            PROMO_ELIGIBILITY_MISSING,
            format!("promotion `{}` requires confirmed customer eligibility", promotion.id),
        ));
    }
    Ok(())
}

/// Whether `candidate` could join `others` without an exclusion conflict.
pub fn is_promo_compatible(
    catalog: &CatalogSnapshot,
    candidate: &PromoId,
    others: &[PromoId],
) -> bool {
    others.iter().all(|other| !catalog.exclusions().excludes(candidate, other))
}

/// Catalog promotions the customer could add to `selected` for this tariff.
pub fn available_promotions<'a>(
    catalog: &'a CatalogSnapshot,
    tariff: &TariffDefinition,
    selected: &[PromoId],
    customer: &CustomerContext,
) -> Vec<&'a Promotion> {
    catalog
        .promotions()
        .filter(|promotion| !selected.contains(&promotion.id))
        .filter(|promotion| check_eligibility(promotion, tariff, customer).is_ok())
        .filter(|promotion| is_promo_compatible(catalog, &promotion.id, selected))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{available_promotions, is_promo_compatible, resolve_promotions};
    use crate::catalog::CatalogSnapshot;
    use crate::domain::basket::CustomerContext;
    use crate::domain::{PromoId, TariffId};
    use crate::errors::{
        EngineError, PROMO_ELIGIBILITY_MISSING, PROMO_NOT_APPLICABLE, PROMO_OUT_OF_WINDOW,
        UNKNOWN_PROMOTION,
    };
    use crate::fixtures;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::from_records(fixtures::catalog_2025_10()).expect("fixture catalog")
    }

    fn ids(values: &[&str]) -> Vec<PromoId> {
        values.iter().map(|value| PromoId::from(*value)).collect()
    }

    fn code(error: &EngineError) -> &str {
        match error {
            EngineError::Validation(validation) => &validation.code,
            other => other.class(),
        }
    }

    #[test]
    fn duplicates_collapse_and_result_is_sorted() {
        let catalog = snapshot();
        let tariff = catalog.tariff(&TariffId::from("mobile-m")).expect("tariff");
        let resolved = resolve_promotions(
            &catalog,
            tariff,
            &ids(&["young-people", "intro-6", "young-people"]),
            &fixtures::october_customer(),
        )
        .expect("compatible promotions");

        let resolved: Vec<&str> = resolved.iter().map(|promotion| promotion.id.as_str()).collect();
        assert_eq!(resolved, vec!["intro-6", "young-people"]);
    }

    #[test]
    fn conflict_names_both_promotions_in_either_order() {
        let catalog = snapshot();
        let tariff = catalog.tariff(&TariffId::from("mobile-m")).expect("tariff");
        let customer = fixtures::october_customer();

        let forward =
            resolve_promotions(&catalog, tariff, &ids(&["young-people", "gigadeal"]), &customer)
                .expect_err("exclusive group conflict");
        let reverse =
            resolve_promotions(&catalog, tariff, &ids(&["gigadeal", "young-people"]), &customer)
                .expect_err("exclusive group conflict");

        assert_eq!(forward, reverse);
        assert_eq!(
            forward,
            EngineError::IncompatiblePromo {
                first: PromoId::from("gigadeal"),
                second: PromoId::from("young-people"),
            }
        );
    }

    #[test]
    fn ineligibility_wins_over_conflict() {
        let catalog = snapshot();
        let tariff = catalog.tariff(&TariffId::from("mobile-m")).expect("tariff");
        let error = resolve_promotions(
            &catalog,
            tariff,
            &ids(&["intro-6", "loyalty-10"]),
            &fixtures::october_customer(),
        )
        .expect_err("loyalty needs eligibility");

        assert_eq!(code(&error), PROMO_ELIGIBILITY_MISSING);

        let mut eligible = fixtures::october_customer();
        eligible.has_eligibility = true;
        let requested = ids(&["intro-6", "loyalty-10"]);
        let error = resolve_promotions(&catalog, tariff, &requested, &eligible)
            .expect_err("explicit exclusion");
        assert!(matches!(error, EngineError::IncompatiblePromo { .. }));
    }

    #[test]
    fn window_category_and_unknown_ids_are_validation_errors() {
        let catalog = snapshot();
        let mobile = catalog.tariff(&TariffId::from("mobile-m")).expect("tariff");
        let fiber = catalog.tariff(&TariffId::from("fixed-250")).expect("tariff");
        let september =
            CustomerContext::on(NaiveDate::from_ymd_opt(2025, 9, 20).expect("valid date"));

        let expired = resolve_promotions(&catalog, mobile, &ids(&["intro-6"]), &september)
            .expect_err("outside window");
        assert_eq!(code(&expired), PROMO_OUT_OF_WINDOW);

        let wrong_category =
            resolve_promotions(&catalog, fiber, &ids(&["intro-6"]), &fixtures::october_customer())
                .expect_err("fiber is not prime");
        assert_eq!(code(&wrong_category), PROMO_NOT_APPLICABLE);

        let unknown =
            resolve_promotions(&catalog, mobile, &ids(&["ghost"]), &fixtures::october_customer())
                .expect_err("unknown promotion");
        assert_eq!(code(&unknown), UNKNOWN_PROMOTION);
    }

    #[test]
    fn compatibility_helpers_respect_exclusions() {
        let catalog = snapshot();
        let tariff = catalog.tariff(&TariffId::from("mobile-m")).expect("tariff");

        let youth = ids(&["young-people"]);
        assert!(!is_promo_compatible(&catalog, &PromoId::from("gigadeal"), &youth));
        assert!(is_promo_compatible(&catalog, &PromoId::from("intro-6"), &youth));

        let available = available_promotions(
            &catalog,
            tariff,
            &ids(&["young-people"]),
            &fixtures::october_customer(),
        );
        let available: Vec<&str> =
            available.iter().map(|promotion| promotion.id.as_str()).collect();
        assert_eq!(available, vec!["dealer-bonus", "intro-6"]);
    }
}
