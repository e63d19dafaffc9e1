//! Read-only figures for dashboards and the headless driver.

use crate::stocks::portfolio_value;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{ClassId, SimulationState};
use sim_econ::{prestige_tier, PRESTIGE_TIERS};
use std::collections::BTreeMap;

/// Book value per owned plant.
pub const FACTORY_BOOK_VALUE: i64 = 150_000;
/// Book value per owned showroom.
pub const DEALERSHIP_BOOK_VALUE: i64 = 75_000;

/// What the company is worth.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Valuation {
    /// Cash plus the deposit's current amount.
    pub liquid_assets: Decimal,
    /// Book value of plants and showrooms.
    pub real_estate: Decimal,
    /// Parked cars at list price.
    pub inventory: Decimal,
    /// Holdings at the latest weekly price.
    pub portfolio: Decimal,
    /// Sum of the above.
    pub total: Decimal,
}

/// Company worth at book and market values.
pub fn valuation(state: &SimulationState) -> Valuation {
    let deposit = state
        .bank
        .deposit
        .as_ref()
        .map_or(Decimal::ZERO, |d| d.current_amount);
    let liquid_assets = state.money + deposit;
    let real_estate = Decimal::from(FACTORY_BOOK_VALUE) * Decimal::from(state.factories.len())
        + Decimal::from(DEALERSHIP_BOOK_VALUE) * Decimal::from(state.dealerships.len());
    let inventory = state
        .factories
        .iter()
        .filter_map(|f| {
            let model = state.model(f.producing_model.as_ref()?)?;
            Some(model.price * Decimal::from(f.inventory))
        })
        .sum();
    let portfolio = portfolio_value(state);
    Valuation {
        liquid_assets,
        real_estate,
        inventory,
        portfolio,
        total: liquid_assets + real_estate + inventory + portfolio,
    }
}

/// Lifetime retail figures for one car class.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassDominance {
    /// Units sold at retail.
    pub units: u64,
    /// Units times list price.
    pub revenue: Decimal,
    /// Revenue minus recorded profit.
    pub cogs: Decimal,
}

/// Lifetime retail totals per class, summed over the player's models.
pub fn market_dominance(state: &SimulationState) -> BTreeMap<ClassId, ClassDominance> {
    let mut out: BTreeMap<ClassId, ClassDominance> = BTreeMap::new();
    for m in &state.car_models {
        let entry = out.entry(m.class.clone()).or_default();
        let revenue = m.price * Decimal::from(m.total_sales);
        entry.units += m.total_sales;
        entry.revenue += revenue;
        if m.total_sales > 0 {
            entry.cogs += revenue - m.total_profit;
        }
    }
    out
}

/// Company standing derived from lifetime sales.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prestige {
    /// Tier rank, 1..=21.
    pub rank: u32,
    /// Tier title.
    pub name: &'static str,
    /// Lifetime sales needed for the next tier; `None` at the top.
    pub next_threshold: Option<u64>,
}

/// Tier for the company's lifetime sales.
pub fn prestige(state: &SimulationState) -> Prestige {
    let tier = prestige_tier(state.stats.cars_sold);
    Prestige {
        rank: tier.rank,
        name: tier.name,
        next_threshold: PRESTIGE_TIERS
            .iter()
            .find(|t| t.rank == tier.rank + 1)
            .map(|t| t.min_sales),
    }
}

/// Headline numbers at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimSnapshot {
    /// Game date.
    pub date: NaiveDate,
    /// Cash on hand.
    pub money: Decimal,
    /// Revenue of the last closed month.
    pub monthly_revenue: Decimal,
    /// Expenses of the last closed month.
    pub monthly_expenses: Decimal,
    /// Revenue minus expenses of the last closed month.
    pub monthly_profit: Decimal,
    /// City population.
    pub population: u64,
    /// Lifetime cars built.
    pub cars_produced: u64,
    /// Lifetime cars sold, fleet orders included.
    pub cars_sold: u64,
    /// Cars parked across all factories.
    pub inventory: u32,
    /// Plants owned.
    pub factories: usize,
    /// Showrooms owned.
    pub dealerships: usize,
    /// Outstanding loan balance.
    pub loan: Decimal,
    /// Current standing.
    pub prestige: Prestige,
    /// Company worth.
    pub valuation: Valuation,
}

impl SimSnapshot {
    pub fn capture(state: &SimulationState) -> Self {
        Self {
            date: state.clock.date.date(),
            money: state.money,
            monthly_revenue: state.last_month.revenue,
            monthly_expenses: state.last_month.expenses,
            monthly_profit: state.last_month.profit(),
            population: state.city.population,
            cars_produced: state.stats.cars_produced,
            cars_sold: state.stats.cars_sold,
            inventory: state.factories.iter().map(|f| f.inventory).sum(),
            factories: state.factories.len(),
            dealerships: state.dealerships.len(),
            loan: state.bank.loan,
            prestige: prestige(state),
            valuation: valuation(state),
        }
    }
}
