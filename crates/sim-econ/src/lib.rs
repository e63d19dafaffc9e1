#![deny(warnings)]

//! Economic models: inflation, demand scoring and finance helpers.
//!
//! This module provides pure, validated formulas for:
//! - The global economic multiplier and tiered inflation of base prices
//! - Market size, segment split and per-model desirability
//! - Model design: base cost, inflation sensitivity and synergy score
//! - Wages, maintenance, loan service and term deposits
//! - Prestige tiers, contract pricing and land values

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sim_core::{CarClass, CarModel, City, Part, PartId, Priority, SegmentSplit};
use thiserror::Error;

/// First simulated year; multipliers are 1.0 here.
pub const BASE_YEAR: i32 = 1950;
/// Running costs paid by an idle facility, relative to an active one.
pub const IDLE_COST_RATE: f64 = 0.15;
/// Demand seasonality by zero-based month.
pub const SEASONALITY: [f64; 12] = [0.8, 0.8, 1.0, 1.1, 1.2, 1.2, 1.0, 1.0, 1.1, 1.1, 0.9, 0.8];
/// Desirability never drops below this.
pub const MIN_DESIRABILITY: f64 = 5.0;
/// Months over which a loan is serviced.
pub const LOAN_TERM_MONTHS: u32 = 120;

/// Errors produced by economic helpers.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EconError {
    /// Monetary values must be non-negative and finite; bands must be ordered.
    #[error("invalid price or cost value")]
    InvalidPrice,
    /// Numeric conversion to or from floating point failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// Convert a finite float into a decimal.
pub fn to_decimal(v: f64) -> Result<Decimal, EconError> {
    if !v.is_finite() {
        return Err(EconError::NonFinite);
    }
    Decimal::from_f64(v).ok_or(EconError::NonFinite)
}

/// Convert a decimal into a float for scoring.
pub fn to_f64(d: Decimal) -> Result<f64, EconError> {
    d.to_f64().ok_or(EconError::NonFinite)
}

/// `floor(base × factor)`.
pub fn scale_floor(base: Decimal, factor: f64) -> Result<Decimal, EconError> {
    Ok((base * to_decimal(factor)?).floor())
}

/// Global price level: `1.008^(year − 1950)`.
pub fn economic_multiplier(year: i32) -> f64 {
    1.008f64.powi(year - BASE_YEAR)
}

/// Inflate a base price. Above a multiplier of 1 only `sensitivity` of the
/// growth applies: `floor(base × (1 + (m − 1)·s))`; otherwise `floor(base × m)`.
pub fn apply_inflation(base: Decimal, sensitivity: f64, multiplier: f64) -> Result<Decimal, EconError> {
    let factor = if multiplier > 1.0 {
        1.0 + (multiplier - 1.0) * sensitivity
    } else {
        multiplier
    };
    scale_floor(base, factor)
}

pub fn seasonality(month0: u32) -> f64 {
    SEASONALITY[(month0 % 12) as usize]
}

/// Buyers this month: `round(pop/1000 × 1.5 × season × noise)`.
pub fn market_size(population: u64, month0: u32, noise: f64) -> u32 {
    let raw = (population as f64 / 1000.0) * 1.5 * seasonality(month0) * noise;
    if raw.is_finite() && raw > 0.0 {
        raw.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Split buyers 30% Lower, 54% Middle, 16% Higher, each floored.
pub fn split_segments(total: u32) -> SegmentSplit<u32> {
    let t = u64::from(total);
    SegmentSplit {
        lower: (t * 30 / 100) as u32,
        middle: (t * 54 / 100) as u32,
        higher: (t * 16 / 100) as u32,
    }
}

/// One month of logistic city growth. Returns the new population and the
/// annual rate used.
pub fn population_step(city: &City) -> (u64, f64) {
    let saturation = if city.capacity == 0 {
        1.0
    } else {
        city.population as f64 / city.capacity as f64
    };
    let rate = (city.base_growth_rate * (1.0 - saturation)).max(city.min_growth_rate);
    let next = (city.population as f64 * (1.0 + rate / 12.0)).floor();
    (next.max(0.0) as u64, rate)
}

/// A prestige tier unlocked by lifetime sales.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrestigeTier {
    pub rank: u32,
    pub name: &'static str,
    pub min_sales: u64,
}

const fn tier(rank: u32, name: &'static str, min_sales: u64) -> PrestigeTier {
    PrestigeTier { rank, name, min_sales }
}

pub const PRESTIGE_TIERS: [PrestigeTier; 21] = [
    tier(1, "Backyard Garage", 0),
    tier(2, "Local Workshop", 1_500),
    tier(3, "Regional Assembler", 3_500),
    tier(4, "Known Brand", 8_000),
    tier(5, "Established Maker", 15_000),
    tier(6, "National Supplier", 25_000),
    tier(7, "Trusted Manufacturer", 40_000),
    tier(8, "Household Name", 60_000),
    tier(9, "Industry Player", 90_000),
    tier(10, "Export Ready", 130_000),
    tier(11, "Continental Brand", 180_000),
    tier(12, "Major Manufacturer", 250_000),
    tier(13, "Market Leader", 350_000),
    tier(14, "Automotive Group", 500_000),
    tier(15, "International Group", 700_000),
    tier(16, "Global Manufacturer", 1_000_000),
    tier(17, "Industry Giant", 1_500_000),
    tier(18, "Automotive Empire", 2_500_000),
    tier(19, "World Leader", 4_000_000),
    tier(20, "Legend", 7_000_000),
    tier(21, "Icon of the Century", 10_000_000),
];

/// Highest tier whose threshold `sold` has reached.
pub fn prestige_tier(sold: u64) -> PrestigeTier {
    PRESTIGE_TIERS
        .iter()
        .rev()
        .find(|t| sold >= t.min_sales)
        .copied()
        .unwrap_or(PRESTIGE_TIERS[0])
}

pub fn prestige_rank(sold: u64) -> u32 {
    prestige_tier(sold).rank
}

/// Multiplier for prices above a class's band. 1.0 up to `max_price`, linear
/// down to 0.5 at `hard_cap` (floored at 0.1), quartic decay beyond it.
pub fn price_penalty(price: f64, max_price: f64, hard_cap: f64) -> Result<f64, EconError> {
    if !(price.is_finite() && max_price.is_finite() && hard_cap.is_finite()) {
        return Err(EconError::NonFinite);
    }
    if max_price <= 0.0 || hard_cap <= max_price {
        return Err(EconError::InvalidPrice);
    }
    if price > hard_cap {
        Ok(1.0 / (price / hard_cap).powi(4))
    } else if price > max_price {
        let excess = price - max_price;
        let range = hard_cap - max_price;
        Ok((1.0 - 0.5 * excess / range).max(0.1))
    } else {
        Ok(1.0)
    }
}

/// Retail desirability of a model within its class at the current price level.
pub fn desirability(model: &CarModel, class: &CarClass, multiplier: f64) -> Result<f64, EconError> {
    let price = to_f64(model.price)?;
    let mut score = 100.0;
    match class.priority {
        Priority::Economy => score += (f64::max(0.0, 1500.0 - price) / 10.0).min(50.0),
        Priority::Performance | Priority::Power => score += (f64::from(model.stats.power) - 50.0) * 0.5,
        Priority::Luxury | Priority::Status => score += f64::from(model.stats.style) - 20.0,
        _ => {}
    }
    let max_price = to_f64(class.max_price)? * multiplier;
    let hard_cap = to_f64(class.hard_cap)? * multiplier;
    score *= price_penalty(price, max_price, hard_cap)?;
    score *= class.engine_fit.multiplier(model.stats.power);
    score *= 1.0 + (f64::from(model.interior_quality) - 10.0) / 200.0;
    score *= f64::from(model.synergy_score) / 100.0;
    Ok(score.max(MIN_DESIRABILITY))
}

/// How much of a model's desirability lands in each segment: 1.0 in the
/// class's own segment plus any secondary markets.
pub fn segment_weights(class: &CarClass) -> SegmentSplit<f64> {
    let mut w = SegmentSplit::<f64>::default();
    *w.get_mut(class.social_class) = 1.0;
    for m in &class.secondary_markets {
        *w.get_mut(m.social_class) += m.multiplier;
    }
    w
}

/// Whether a model may sell at all. Prices beyond 1.5× the inflated hard cap
/// or 10× the inflated production cost find no buyers.
pub fn within_sales_guillotine(
    model: &CarModel,
    class: &CarClass,
    multiplier: f64,
) -> Result<bool, EconError> {
    let cap = apply_inflation(class.hard_cap, class.inflation_sensitivity, multiplier)?
        * Decimal::new(15, 1);
    let cost_ceiling = scale_floor(model.production_cost, multiplier * 10.0)?;
    Ok(model.price <= cap && model.price <= cost_ceiling)
}

/// Popularity drifts 10% toward desirability each month.
pub fn next_popularity(previous: u32, desirability: f64) -> u32 {
    let p = 0.9 * f64::from(previous) + 0.1 * desirability;
    if p.is_finite() && p > 0.0 {
        p.floor() as u32
    } else {
        0
    }
}

/// Base unit cost of a design: `round(Σ part cost + 3000 × complexity)`.
pub fn model_base_cost(parts: &[&Part], complexity: f64) -> Result<Decimal, EconError> {
    let sum: Decimal = parts.iter().map(|p| p.cost).sum();
    Ok((sum + to_decimal(3000.0 * complexity)?).round())
}

/// Cost-weighted inflation sensitivity of a set of parts.
pub fn weighted_sensitivity(parts: &[&Part]) -> Result<f64, EconError> {
    let total: Decimal = parts.iter().map(|p| p.cost).sum();
    if total.is_zero() {
        return Ok(1.0);
    }
    let mut weighted = 0.0;
    for p in parts {
        weighted += to_f64(p.cost)? * p.inflation_sensitivity;
    }
    Ok(weighted / to_f64(total)?)
}

/// Fit between a design's parts and its class, clamped to `0..=150`.
/// +10 per part with a preferred tag, −25 per part with a forbidden tag, and
/// 0 outright if the body is not one the class requires.
pub fn synergy_score(class: &CarClass, parts: &[&Part], body: &PartId) -> u32 {
    if !class.required_body_types.is_empty() && !class.required_body_types.contains(body) {
        return 0;
    }
    let mut score: i64 = 100;
    for p in parts {
        if p.has_any_tag(&class.preferred_tags) {
            score += 10;
        }
        if p.has_any_tag(&class.forbidden_tags) {
            score -= 25;
        }
    }
    score.clamp(0, 150) as u32
}

fn idle_factor(active: bool) -> f64 {
    if active {
        1.0
    } else {
        IDLE_COST_RATE
    }
}

/// Monthly factory payroll.
pub fn factory_wages(
    workers: u32,
    multiplier: f64,
    wage_level: f64,
    complexity: f64,
    active: bool,
) -> Result<Decimal, EconError> {
    let base = f64::from(workers) * 2500.0 * multiplier * wage_level * complexity;
    scale_floor(Decimal::ONE, base * idle_factor(active))
}

/// Monthly showroom payroll.
pub fn dealership_wages(workers: u32, multiplier: f64, active: bool) -> Result<Decimal, EconError> {
    let base = f64::from(workers) * 4000.0 * multiplier;
    scale_floor(Decimal::ONE, base * idle_factor(active))
}

/// Monthly factory upkeep, growing 1% per level above the first.
pub fn factory_maintenance(
    level: u32,
    multiplier: f64,
    complexity: f64,
    active: bool,
) -> Result<Decimal, EconError> {
    let level_factor = 1.0 + 0.01 * f64::from(level.saturating_sub(1));
    let base = 50_000.0 * level_factor * multiplier * complexity;
    scale_floor(Decimal::ONE, base * idle_factor(active))
}

/// Monthly showroom upkeep.
pub fn dealership_maintenance(multiplier: f64, active: bool) -> Result<Decimal, EconError> {
    scale_floor(Decimal::ONE, 15_000.0 * multiplier * idle_factor(active))
}

/// Monthly loan service: `ceil(balance / 120)`, never more than the
/// balance itself.
pub fn loan_payment(balance: Decimal) -> Decimal {
    if balance <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (balance / Decimal::from(LOAN_TERM_MONTHS)).ceil().min(balance)
}

/// Term deposit rate.
pub fn deposit_rate() -> Decimal {
    Decimal::new(5, 2)
}

/// Early withdrawal value: `floor(initial × 1.05^years)`, computed exactly.
pub fn deposit_payout(initial: Decimal, years: u32) -> Result<Decimal, EconError> {
    if initial < Decimal::ZERO {
        return Err(EconError::InvalidPrice);
    }
    let growth = Decimal::ONE + deposit_rate();
    let mut value = initial;
    for _ in 0..years {
        value = value.checked_mul(growth).ok_or(EconError::NonFinite)?;
    }
    Ok(value.floor())
}

/// Fleet unit price: negotiated list price, never below 105% of unit cost.
pub fn contract_unit_price(
    list_price: Decimal,
    negotiation: f64,
    unit_cost: Decimal,
) -> Result<Decimal, EconError> {
    if list_price <= Decimal::ZERO || unit_cost < Decimal::ZERO {
        return Err(EconError::InvalidPrice);
    }
    let negotiated = scale_floor(list_price, 1.0 + negotiation)?;
    let floor = (unit_cost * Decimal::new(105, 2)).floor();
    Ok(negotiated.max(floor))
}

/// Crisis cost multiplier by prestige rank.
pub fn crisis_multiplier(rank: u32) -> u32 {
    if rank <= 5 {
        1
    } else {
        4 * (rank - 5)
    }
}

/// Land value in an auction year: `floor(500000 × 1.03^(year − 1950))`.
pub fn land_value(year: i32) -> Result<Decimal, EconError> {
    scale_floor(Decimal::new(500_000, 0), 1.03f64.powi(year - BASE_YEAR))
}

/// Developer price for a plot, bypassing the auction: five times land value,
/// with growth capped at a century.
pub fn developer_price(year: i32) -> Result<Decimal, EconError> {
    let years = (year - BASE_YEAR).min(100);
    Ok(scale_floor(Decimal::new(500_000, 0), 1.03f64.powi(years))? * Decimal::from(5))
}

/// Expansion permit price: `base × 1.2^level`, rounded to the million.
pub fn expansion_cost(base: Decimal, level: u32) -> Result<Decimal, EconError> {
    let raw = base * to_decimal(1.2f64.powi(level as i32))?;
    let million = Decimal::new(1_000_000, 0);
    Ok((raw / million).round() * million)
}

/// Split `total` across `weights` so parts sum exactly to `total` (when any
/// weight is positive), using cumulative floors to avoid rounding drift.
pub fn cumulative_split(total: u32, weights: &[u32]) -> Vec<u32> {
    let sum: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if sum == 0 {
        return vec![0; weights.len()];
    }
    let mut cumulative = 0u64;
    let mut allocated = 0u64;
    weights
        .iter()
        .map(|&w| {
            cumulative += u64::from(w);
            let upto = u64::from(total) * cumulative / sum;
            let share = upto - allocated;
            allocated = upto;
            share as u32
        })
        .collect()
}

/// Scale a segment split so it sums to `sales`, floors per segment with the
/// rounding remainder assigned to Middle.
pub fn scale_breakdown(demand: SegmentSplit<u32>, sales: u32) -> SegmentSplit<u32> {
    let total = demand.total();
    if total == 0 || sales == 0 {
        return SegmentSplit {
            lower: 0,
            middle: sales,
            higher: 0,
        };
    }
    let part = |v: u32| (u64::from(v) * u64::from(sales) / u64::from(total)) as u32;
    let lower = part(demand.lower);
    let higher = part(demand.higher);
    let middle = part(demand.middle);
    let remainder = sales - (lower + middle + higher);
    SegmentSplit {
        lower,
        middle: middle + remainder,
        higher,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{Catalog, ClassId, ModelParts};

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn parts<'a>(cat: &'a Catalog, ids: [&str; 4]) -> Vec<&'a Part> {
        ids.iter().map(|id| cat.part(&PartId::from(*id)).unwrap()).collect()
    }

    fn model(class: &str, price: i64, power: u32, style: u32, iq: u32, synergy: u32) -> CarModel {
        CarModel {
            id: "m".into(),
            name: "Test".into(),
            class: ClassId::from(class),
            parts: ModelParts {
                engine: "small-i4".into(),
                chassis: "frame".into(),
                body: "small".into(),
                interior: "spartan".into(),
            },
            price: Decimal::new(price, 0),
            production_cost: Decimal::new(7900, 0),
            stats: sim_core::CarStats {
                power,
                weight: 900,
                safety: 10,
                style,
                reliability: 80,
            },
            interior_quality: iq,
            inflation_sensitivity: 0.15,
            synergy_score: synergy,
            popularity: 50,
            sales_this_month: 0,
            sales_breakdown: SegmentSplit::default(),
            total_sales: 0,
            total_profit: Decimal::ZERO,
            year_introduced: 1950,
            this_year: Default::default(),
            last_year: Default::default(),
        }
    }

    #[test]
    fn multiplier_is_one_in_base_year() {
        assert_eq!(economic_multiplier(1950), 1.0);
        assert!((economic_multiplier(1951) - 1.008).abs() < 1e-12);
    }

    #[test]
    fn inflation_is_tiered() {
        let base = Decimal::new(10_000, 0);
        assert_eq!(apply_inflation(base, 0.5, 1.0).unwrap(), base);
        assert_eq!(apply_inflation(base, 0.5, 1.2).unwrap(), Decimal::new(11_000, 0));
        assert_eq!(apply_inflation(base, 0.5, 0.9).unwrap(), Decimal::new(9_000, 0));
    }

    #[test]
    fn segments_floor_each_share() {
        let s = split_segments(101);
        assert_eq!((s.lower, s.middle, s.higher), (30, 54, 16));
        assert!(s.total() <= 101);
    }

    #[test]
    fn population_grows_toward_capacity() {
        let city = City::default();
        let (next, rate) = population_step(&city);
        assert!(next > city.population);
        assert!(rate < city.base_growth_rate);
        let full = City {
            population: city.capacity,
            ..City::default()
        };
        let (_, rate) = population_step(&full);
        assert_eq!(rate, full.min_growth_rate);
    }

    #[test]
    fn prestige_thresholds() {
        assert_eq!(prestige_rank(0), 1);
        assert_eq!(prestige_rank(14_999), 4);
        assert_eq!(prestige_rank(15_000), 5);
        assert_eq!(prestige_rank(130_000), 10);
        assert_eq!(prestige_rank(u64::MAX), 21);
    }

    #[test]
    fn penalty_bands() {
        assert_eq!(price_penalty(900.0, 1000.0, 2000.0).unwrap(), 1.0);
        assert!((price_penalty(1500.0, 1000.0, 2000.0).unwrap() - 0.75).abs() < 1e-12);
        assert!((price_penalty(4000.0, 1000.0, 2000.0).unwrap() - 1.0 / 16.0).abs() < 1e-12);
        assert_eq!(price_penalty(1.0, 2.0, 2.0), Err(EconError::InvalidPrice));
    }

    #[test]
    fn desirability_for_starting_car() {
        let cat = catalog();
        let class = cat.class(&ClassId::from("A")).unwrap();
        // 100 × fit 1.0 × interior (1 − 5/200) × synergy 1.2
        let m = model("A", 9000, 50, 15, 5, 120);
        let d = desirability(&m, class, 1.0).unwrap();
        assert!((d - 100.0 * 0.975 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn desirability_has_a_floor() {
        let cat = catalog();
        let class = cat.class(&ClassId::from("A")).unwrap();
        let m = model("A", 9000, 50, 15, 5, 0);
        assert_eq!(desirability(&m, class, 1.0).unwrap(), MIN_DESIRABILITY);
    }

    #[test]
    fn guillotine_blocks_absurd_prices() {
        let cat = catalog();
        let class = cat.class(&ClassId::from("A")).unwrap();
        assert!(within_sales_guillotine(&model("A", 9000, 50, 15, 5, 100), class, 1.0).unwrap());
        assert!(!within_sales_guillotine(&model("A", 17_300, 50, 15, 5, 100), class, 1.0).unwrap());
    }

    #[test]
    fn secondary_markets_add_weight() {
        let cat = catalog();
        let w = segment_weights(cat.class(&ClassId::from("A")).unwrap());
        assert_eq!((w.lower, w.middle, w.higher), (1.0, 0.2, 0.0));
    }

    #[test]
    fn starter_design() {
        let cat = catalog();
        let class = cat.class(&ClassId::from("A")).unwrap();
        let p = parts(&cat, ["small-i4", "frame", "small", "spartan"]);
        assert_eq!(model_base_cost(&p, class.complexity).unwrap(), Decimal::new(7900, 0));
        // economy engine +10, body +10, spartan (minimal) +10, frame (heavy) −25
        assert_eq!(synergy_score(class, &p, &PartId::from("small")), 105);
        let s = weighted_sensitivity(&p).unwrap();
        assert!((s - (2500.0 * 0.2 + 1500.0 * 0.1 + 1000.0 * 0.1 + 500.0 * 0.2) / 5500.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_body_zeroes_synergy() {
        let cat = catalog();
        let class = cat.class(&ClassId::from("A")).unwrap();
        let p = parts(&cat, ["small-i4", "frame", "sedan", "spartan"]);
        assert_eq!(synergy_score(class, &p, &PartId::from("sedan")), 0);
    }

    #[test]
    fn running_costs() {
        assert_eq!(factory_wages(50, 1.0, 1.0, 0.8, true).unwrap(), Decimal::new(100_000, 0));
        assert_eq!(factory_wages(50, 1.0, 1.0, 0.8, false).unwrap(), Decimal::new(15_000, 0));
        assert_eq!(dealership_wages(20, 1.0, true).unwrap(), Decimal::new(80_000, 0));
        assert_eq!(factory_maintenance(1, 1.0, 1.0, true).unwrap(), Decimal::new(50_000, 0));
        assert_eq!(dealership_maintenance(1.0, true).unwrap(), Decimal::new(15_000, 0));
    }

    #[test]
    fn contract_price_has_cost_floor() {
        let p = contract_unit_price(Decimal::new(10_000, 0), -0.15, Decimal::new(9_000, 0)).unwrap();
        assert_eq!(p, Decimal::new(9_450, 0));
        let p = contract_unit_price(Decimal::new(10_000, 0), 0.1, Decimal::new(5_000, 0)).unwrap();
        assert_eq!(p, Decimal::new(11_000, 0));
    }

    #[test]
    fn crisis_multiplier_by_rank() {
        assert_eq!(crisis_multiplier(5), 1);
        assert_eq!(crisis_multiplier(6), 4);
        assert_eq!(crisis_multiplier(20), 60);
    }

    #[test]
    fn land_and_expansion_prices() {
        assert_eq!(land_value(1950).unwrap(), Decimal::new(500_000, 0));
        assert_eq!(developer_price(1950).unwrap(), Decimal::new(2_500_000, 0));
        assert_eq!(
            expansion_cost(Decimal::new(500_000_000, 0), 1).unwrap(),
            Decimal::new(600_000_000, 0)
        );
    }

    #[test]
    fn breakdown_remainder_goes_to_middle() {
        let b = scale_breakdown(SegmentSplit { lower: 1, middle: 1, higher: 1 }, 2);
        assert_eq!(b.total(), 2);
        assert_eq!(b.middle, 2);
    }

    #[test]
    fn loan_payment_never_exceeds_balance() {
        assert_eq!(loan_payment(Decimal::new(1_200_000, 0)), Decimal::new(10_000, 0));
        assert_eq!(loan_payment(Decimal::new(121, 0)), Decimal::new(2, 0));
        assert_eq!(loan_payment(Decimal::new(5, 1)), Decimal::new(5, 1));
        assert_eq!(loan_payment(Decimal::ZERO), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn loan_payment_clears_in_term(cents in 0i64..100_000_000_000) {
            let b = Decimal::new(cents, 2);
            let p = loan_payment(b);
            prop_assert!(p * Decimal::from(LOAN_TERM_MONTHS) >= b);
            prop_assert!(b - p >= Decimal::ZERO);
        }

        #[test]
        fn deposit_payout_is_monotonic(initial in 0i64..100_000_000, years in 0u32..40) {
            let d = Decimal::new(initial, 0);
            let a = deposit_payout(d, years).unwrap();
            let b = deposit_payout(d, years + 1).unwrap();
            prop_assert!(a >= d);
            prop_assert!(b >= a);
        }

        #[test]
        fn cumulative_split_sums_exactly(total in 0u32..100_000, weights in proptest::collection::vec(0u32..500, 1..20)) {
            let parts = cumulative_split(total, &weights);
            prop_assert_eq!(parts.len(), weights.len());
            let sum: u32 = parts.iter().sum();
            if weights.iter().any(|&w| w > 0) {
                prop_assert_eq!(sum, total);
            } else {
                prop_assert_eq!(sum, 0);
            }
            for (p, w) in parts.iter().zip(&weights) {
                if *w == 0 { prop_assert_eq!(*p, 0); }
            }
        }

        #[test]
        fn market_size_scales_with_population(pop in 0u64..10_000_000, month in 0u32..12) {
            let lo = market_size(pop, month, 0.8);
            let hi = market_size(pop, month, 1.2);
            prop_assert!(lo <= hi);
            prop_assert!(split_segments(hi).total() <= hi);
        }
    }
}
