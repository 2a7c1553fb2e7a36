//! Demo catalogs and baskets for tests, behind the `test-support` feature.
//!
//! Two releases coexist: `2025-09` with September pricing and `2025-10` with the
//! October promotions, business tariff and sub-variant rules.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::catalog::CatalogRecords;
use crate::domain::basket::{Basket, BasketItem, CustomerContext};
use crate::domain::commission::CommissionRule;
use crate::domain::discount::{DiscountCondition, DiscountKind, DiscountRule, DiscountTier};
use crate::domain::hardware::{AllocationStrategy, HardwareItem, SubsidyRule};
use crate::domain::period::PricePeriod;
use crate::domain::promotion::{PromoEffect, Promotion};
use crate::domain::tariff::{Segment, SubVariantRule, TariffDefinition, TariffTier};
use crate::domain::{
    CatalogVersion, CommissionRuleId, DiscountRuleId, HardwareId, LineId, OfferId, PromoId,
    SubVariantRuleId, TariffId,
};

pub const CONTRACT_MONTHS: u32 = 24;

fn money(units: i64, cents: u32) -> Decimal {
    Decimal::new(units * 100 + i64::from(cents), 2)
}

fn whole(units: i64) -> Decimal {
    Decimal::new(units, 0)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

fn promo_ids(values: &[&str]) -> BTreeSet<PromoId> {
    values.iter().map(|value| PromoId::from(*value)).collect()
}

#[allow(clippy::too_many_arguments)]
fn tariff(
    id: &str,
    name: &str,
    segment: Segment,
    family: &str,
    categories: &[&str],
    tier: TariffTier,
    price: Decimal,
    monthly_cost: Decimal,
    subsidy_level: u8,
) -> TariffDefinition {
    TariffDefinition {
        id: TariffId::from(id),
        name: name.to_owned(),
        segment,
        family: family.to_owned(),
        categories: tags(categories),
        tier: Some(tier),
        contract_months: CONTRACT_MONTHS,
        base_schedule: vec![PricePeriod::new(0, CONTRACT_MONTHS, price)],
        monthly_cost,
        one_time_fee: Decimal::ZERO,
        subsidy_level: Some(subsidy_level),
    }
}

fn mobile_tariffs(s: Decimal, m: Decimal, l: Decimal) -> Vec<TariffDefinition> {
    let prime = ["mobile", "prime"];
    let mobile = Segment::Mobile;
    vec![
        tariff("mobile-s", "Prime S", mobile, "prime", &prime, TariffTier::S, s, whole(9), 1),
        tariff("mobile-m", "Prime M", mobile, "prime", &prime, TariffTier::M, m, whole(10), 2),
        tariff("mobile-l", "Prime L", mobile, "prime", &prime, TariffTier::L, l, whole(12), 3),
    ]
}

fn fiber_tariff() -> TariffDefinition {
    TariffDefinition {
        one_time_fee: money(49, 99),
        subsidy_level: None,
        ..tariff(
            "fixed-250",
            "Fiber 250",
            Segment::FixedNet,
            "fiber",
            &["fixed", "fiber"],
            TariffTier::M,
            whole(45),
            whole(20),
            0,
        )
    }
}

fn business_tariff() -> TariffDefinition {
    tariff(
        "business-pro",
        "Business Pro",
        Segment::Business,
        "business",
        &["business", "mobile"],
        TariffTier::L,
        whole(60),
        whole(15),
        3,
    )
}

fn hardware() -> Vec<HardwareItem> {
    vec![
        HardwareItem {
            id: HardwareId::from("phone-x"),
            name: "Phone X 128GB".to_owned(),
            category: "smartphone".to_owned(),
            retail_price: whole(499),
            subsidy_rules: vec![
                SubsidyRule {
                    id: "any-short".to_owned(),
                    tariff_categories: BTreeSet::new(),
                    contract_months: None,
                    subsidy_level: None,
                    amount: whole(100),
                    allocation: AllocationStrategy::Deferred { months: 12 },
                },
                SubsidyRule {
                    id: "prime-24".to_owned(),
                    tariff_categories: tags(&["prime"]),
                    contract_months: Some(CONTRACT_MONTHS),
                    subsidy_level: None,
                    amount: whole(240),
                    allocation: AllocationStrategy::StraightLine,
                },
                SubsidyRule {
                    id: "prime-24-l3".to_owned(),
                    tariff_categories: tags(&["prime"]),
                    contract_months: Some(CONTRACT_MONTHS),
                    subsidy_level: Some(3),
                    amount: whole(360),
                    allocation: AllocationStrategy::StraightLine,
                },
            ],
        },
        HardwareItem {
            id: HardwareId::from("tablet-a"),
            name: "Tablet A 10\"".to_owned(),
            category: "tablet".to_owned(),
            retail_price: whole(299),
            subsidy_rules: vec![SubsidyRule {
                id: "mobile-upfront".to_owned(),
                tariff_categories: tags(&["mobile"]),
                contract_months: None,
                subsidy_level: None,
                amount: whole(150),
                allocation: AllocationStrategy::FrontLoaded,
            }],
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn promotion(
    id: &str,
    label: &str,
    categories: &[&str],
    window: (NaiveDate, NaiveDate),
    effect: PromoEffect,
    months: (u32, u32),
    priority: u32,
    excludes: &[&str],
) -> Promotion {
    Promotion {
        id: PromoId::from(id),
        label: label.to_owned(),
        categories: tags(categories),
        valid_from: window.0,
        valid_until: window.1,
        effect,
        start_month: months.0,
        duration_months: months.1,
        priority,
        excludes: promo_ids(excludes),
        exclusive_group: None,
        requires_eligibility: false,
        customer_visible: true,
    }
}

fn discounts() -> Vec<DiscountRule> {
    vec![
        DiscountRule {
            id: DiscountRuleId::from("team-deal"),
            label: "TeamDeal".to_owned(),
            kind: DiscountKind::TieredByQuantity { tiers: team_deal_tiers() },
            condition: DiscountCondition { categories: tags(&["prime"]), ..Default::default() },
            priority: 10,
        },
        DiscountRule {
            id: DiscountRuleId::from("soho"),
            label: "SOHO rebate".to_owned(),
            kind: DiscountKind::Percentage { percent: whole(10) },
            condition: DiscountCondition { required_flags: tags(&["soho"]), ..Default::default() },
            priority: 20,
        },
        DiscountRule {
            id: DiscountRuleId::from("fixed-combo"),
            label: "Fixed + mobile combination".to_owned(),
            kind: DiscountKind::FixedAmount { amount: whole(5) },
            condition: DiscountCondition {
                segments: [Segment::Mobile].into_iter().collect(),
                required_flags: tags(&["fixed_net"]),
                ..Default::default()
            },
            priority: 30,
        },
    ]
}

/// 1 line 0 %, 2-4 lines 5 %, 5-9 lines 10 %, 10-19 lines 15 %, 20+ lines 20 %.
pub fn team_deal_tiers() -> Vec<DiscountTier> {
    [(1, Some(1), 0), (2, Some(4), 5), (5, Some(9), 10), (10, Some(19), 15), (20, None, 20)]
        .into_iter()
        .map(|(min_quantity, max_quantity, percent)| DiscountTier {
            min_quantity,
            max_quantity,
            percent: whole(percent),
        })
        .collect()
}

fn commission(
    id: &str,
    tariff_id: Option<&str>,
    category: Option<&str>,
    promo_id: Option<&str>,
    figures: (Decimal, Decimal, Decimal),
) -> CommissionRule {
    CommissionRule {
        id: CommissionRuleId::from(id),
        tariff_id: tariff_id.map(TariffId::from),
        category: category.map(str::to_owned),
        promo_id: promo_id.map(PromoId::from),
        airtime_percent: figures.0,
        activation_amount: figures.1,
        hardware_percent: figures.2,
        deduction_percent: Decimal::ZERO,
    }
}

fn commissions(with_business: bool) -> Vec<CommissionRule> {
    let mut rules = vec![
        commission("c-prime", None, Some("prime"), None, (whole(5), whole(50), Decimal::ZERO)),
        commission("c-mobile-m", Some("mobile-m"), None, None, (whole(5), whole(60), whole(1))),
        commission(
            "c-mobile-m-intro",
            Some("mobile-m"),
            None,
            Some("intro-6"),
            (whole(5), whole(80), whole(2)),
        ),
        commission("c-fiber", None, Some("fiber"), None, (whole(8), whole(30), Decimal::ZERO)),
    ];
    if with_business {
        rules.push(commission(
            "c-business",
            None,
            Some("business"),
            None,
            (whole(6), whole(100), whole(1)),
        ));
    }
    rules
}

fn sub_variants() -> Vec<SubVariantRule> {
    vec![
        SubVariantRule {
            id: SubVariantRuleId::from("family-2"),
            label: "Family".to_owned(),
            base_tariff: None,
            base_category: Some("prime".to_owned()),
            min_lines: 2,
            required_flags: BTreeSet::new(),
            monthly_delta: whole(-5),
            added_categories: tags(&["family"]),
        },
        SubVariantRule {
            id: SubVariantRuleId::from("family-5"),
            label: "Family XL".to_owned(),
            base_tariff: None,
            base_category: Some("prime".to_owned()),
            min_lines: 5,
            required_flags: BTreeSet::new(),
            monthly_delta: whole(-8),
            added_categories: tags(&["family"]),
        },
        SubVariantRule {
            id: SubVariantRuleId::from("business-team"),
            label: "Business Team".to_owned(),
            base_tariff: Some(TariffId::from("business-pro")),
            base_category: None,
            min_lines: 3,
            required_flags: tags(&["soho"]),
            monthly_delta: whole(-10),
            added_categories: tags(&["team"]),
        },
    ]
}

/// September release: higher base prices, a single intro offer.
pub fn catalog_2025_09() -> CatalogRecords {
    let window = (date(2025, 9, 1), date(2025, 9, 30));
    CatalogRecords {
        version: CatalogVersion::from("2025-09"),
        tariffs: {
            let mut tariffs = mobile_tariffs(whole(35), whole(45), whole(60));
            tariffs.push(fiber_tariff());
            tariffs
        },
        hardware: hardware(),
        promotions: vec![promotion(
            "intro-6",
            "Six months at 25",
            &["prime"],
            window,
            PromoEffect::IntroPrice { price: whole(25) },
            (0, 6),
            10,
            &[],
        )],
        discounts: discounts(),
        commissions: commissions(false),
        sub_variants: Vec::new(),
    }
}

/// October release with the full promotion set.
pub fn catalog_2025_10() -> CatalogRecords {
    let window = (date(2025, 10, 1), date(2025, 10, 31));
    let mut promotions = vec![
        promotion(
            "intro-6",
            "Six months at 20",
            &["prime"],
            window,
            PromoEffect::IntroPrice { price: whole(20) },
            (0, 6),
            10,
            &["loyalty-10"],
        ),
        promotion(
            "loyalty-10",
            "Loyalty 10 %",
            &["mobile"],
            window,
            PromoEffect::PercentOffBase { percent: whole(10) },
            (0, 0),
            5,
            &["intro-6"],
        ),
        promotion(
            "young-people",
            "Young People 25 %",
            &["mobile"],
            window,
            PromoEffect::PercentOffBase { percent: whole(25) },
            (0, 0),
            20,
            &[],
        ),
        promotion(
            "gigadeal",
            "GigaDeal 5 off",
            &["mobile"],
            window,
            PromoEffect::AbsoluteOffBase { amount: whole(5) },
            (0, 12),
            15,
            &[],
        ),
        promotion(
            "fiber-start",
            "Fiber start 19.99",
            &["fiber"],
            window,
            PromoEffect::IntroPrice { price: money(19, 99) },
            (0, 3),
            10,
            &[],
        ),
        promotion(
            "dealer-bonus",
            "Dealer bonus",
            &["prime"],
            window,
            PromoEffect::AbsoluteOffBase { amount: whole(2) },
            (12, 12),
            30,
            &[],
        ),
    ];
    for promo in &mut promotions {
        match promo.id.as_str() {
            "loyalty-10" => promo.requires_eligibility = true,
            "young-people" | "gigadeal" => promo.exclusive_group = Some("youth".to_owned()),
            "dealer-bonus" => promo.customer_visible = false,
            _ => {}
        }
    }

    let mut tariffs = mobile_tariffs(whole(30), whole(40), whole(55));
    tariffs.push(fiber_tariff());
    tariffs.push(business_tariff());

    CatalogRecords {
        version: CatalogVersion::from("2025-10"),
        tariffs,
        hardware: hardware(),
        promotions,
        discounts: discounts(),
        commissions: commissions(true),
        sub_variants: sub_variants(),
    }
}

pub fn october_customer() -> CustomerContext {
    CustomerContext::on(date(2025, 10, 15))
}

pub fn item(line_id: &str, tariff_id: &str, quantity: u32) -> BasketItem {
    BasketItem {
        line_id: LineId::from(line_id),
        tariff_id: TariffId::from(tariff_id),
        hardware_id: None,
        quantity,
        promotions: Vec::new(),
        customer: october_customer(),
    }
}

/// 24-month Prime M at 40 with six months at 20 and a phone subsidised at 10 per month.
pub fn scenario_item() -> BasketItem {
    BasketItem {
        hardware_id: Some(HardwareId::from("phone-x")),
        promotions: vec![PromoId::from("intro-6")],
        ..item("line-1", "mobile-m", 1)
    }
}

pub fn basket(items: Vec<BasketItem>) -> Basket {
    Basket {
        offer_id: OfferId::from("offer-demo"),
        catalog_version: CatalogVersion::from("2025-10"),
        items,
    }
}

pub fn scenario_basket() -> Basket {
    basket(vec![scenario_item()])
}

/// Mobile family bundle plus a fiber line on a shorter timeline footprint.
pub fn family_basket() -> Basket {
    let mut fiber = item("line-fiber", "fixed-250", 1);
    fiber.promotions = vec![PromoId::from("fiber-start")];
    let mut family = item("line-family", "mobile-m", 3);
    family.hardware_id = Some(HardwareId::from("phone-x"));
    basket(vec![family, fiber])
}
